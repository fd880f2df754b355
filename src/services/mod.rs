// Business logic service implementations

pub mod address;
pub mod health;
pub mod tip_ledger;

pub use tip_ledger::TipLedger;
