//! Prelude module for convenient imports

pub use super::tip_deposits::Entity as TipDeposits;
