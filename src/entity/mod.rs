//! Entity module for database models

pub mod prelude;
pub mod tip_deposits;
