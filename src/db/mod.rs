//! Database access layer
//!
//! Plain query functions over `sqlx::PgPool`, one module per table.
//! Transactions are the only mutation discipline; the invariant-sensitive
//! operations (`orders::upsert`, `withdrawals::insert`) run entirely inside
//! one.

pub mod balance;
pub mod orders;
pub mod users;
pub mod withdrawals;
