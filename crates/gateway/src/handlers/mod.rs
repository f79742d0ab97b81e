//! API handlers module

pub mod contacts;
pub mod health;
