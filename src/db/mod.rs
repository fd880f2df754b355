// Database Module
// Connection pooling and the tip deposit persistence port with its adapters

pub mod error;
pub mod pool;
pub mod repositories;

pub use error::DbError;
pub use pool::DbPool;
pub use repositories::{InMemoryTipDepositStore, TipDepositRepository, TipDepositStore};
