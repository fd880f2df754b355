// Tip deposit persistence port and its adapters

mod memory_repository;
mod tip_deposit_repository;

pub use memory_repository::InMemoryTipDepositStore;
pub use tip_deposit_repository::TipDepositRepository;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::DbError;
use crate::models::{DepositFilter, DepositState, Page, TipDeposit};

/// Storage operations the tip ledger depends on.
///
/// Every mutation after insert goes through a conditional update: `transition`
/// only succeeds while both terminal flags are still false, so concurrent
/// callers racing on one deposit see at most one `true`.
#[async_trait]
pub trait TipDepositStore: Send + Sync {
    /// Persists a new deposit; fails if the id is already taken
    async fn insert(&self, deposit: TipDeposit) -> Result<TipDeposit, DbError>;

    async fn find_by_id(&self, deposit_id: &str) -> Result<Option<TipDeposit>, DbError>;

    /// Newest first, windowed by `page`
    async fn list(&self, filter: &DepositFilter, page: Page) -> Result<Vec<TipDeposit>, DbError>;

    /// Moves a pending deposit to `to`. Returns false when the deposit is
    /// missing or no longer pending; nothing is written in that case.
    async fn transition(
        &self,
        deposit_id: &str,
        to: DepositState,
        at: DateTime<Utc>,
    ) -> Result<bool, DbError>;

    /// Sets the resolved payee of a pending deposit that has none yet
    async fn set_starknet_recipient(
        &self,
        deposit_id: &str,
        starknet_recipient: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, DbError>;

    /// Pending deposits created strictly before `cutoff`, oldest first
    async fn find_pending_before(
        &self,
        cutoff: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<TipDeposit>, DbError>;
}
