pub mod account;
pub mod employee;
pub mod role;
