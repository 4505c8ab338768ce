//! API handlers module

pub mod health;
pub mod requests;
pub mod research;
