//! Domain services: admission, balance and account logic between the HTTP
//! adapters and the store

pub mod balance;
pub mod orders;
pub mod users;
