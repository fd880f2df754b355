//! In-memory tip deposit store
//!
//! Process-local adapter for tests and local runs without postgres. Each
//! operation takes the lock once and releases it before returning, so no
//! guard ever lives across an `.await`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::db::repositories::TipDepositStore;
use crate::db::DbError;
use crate::models::{DepositFilter, DepositState, Page, TipDeposit};

/// Thread-safe map of deposits keyed by deposit id
#[derive(Default)]
pub struct InMemoryTipDepositStore {
    deposits: RwLock<HashMap<String, TipDeposit>>,
    /// When set, every call fails as if the database were down
    unavailable: AtomicBool,
}

impl InMemoryTipDepositStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates a storage outage for subsequent calls
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of stored deposits
    pub fn len(&self) -> usize {
        self.deposits.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> Result<(), DbError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DbError::ConnectionError(
                "in-memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, TipDeposit>>, DbError> {
        self.check_available()?;
        self.deposits
            .read()
            .map_err(|_| DbError::QueryError("deposit map lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, TipDeposit>>, DbError> {
        self.check_available()?;
        self.deposits
            .write()
            .map_err(|_| DbError::QueryError("deposit map lock poisoned".to_string()))
    }
}

fn newest_first(a: &TipDeposit, b: &TipDeposit) -> std::cmp::Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.deposit_id.cmp(&a.deposit_id))
}

#[async_trait]
impl TipDepositStore for InMemoryTipDepositStore {
    async fn insert(&self, deposit: TipDeposit) -> Result<TipDeposit, DbError> {
        let mut deposits = self.write()?;
        if deposits.contains_key(&deposit.deposit_id) {
            return Err(DbError::QueryError(format!(
                "duplicate key value violates unique constraint: deposit_id {}",
                deposit.deposit_id
            )));
        }
        deposits.insert(deposit.deposit_id.clone(), deposit.clone());
        Ok(deposit)
    }

    async fn find_by_id(&self, deposit_id: &str) -> Result<Option<TipDeposit>, DbError> {
        Ok(self.read()?.get(deposit_id).cloned())
    }

    async fn list(&self, filter: &DepositFilter, page: Page) -> Result<Vec<TipDeposit>, DbError> {
        let deposits = self.read()?;
        let mut matching: Vec<TipDeposit> = deposits
            .values()
            .filter(|d| match filter {
                DepositFilter::All => true,
                DepositFilter::Sender(sender) => &d.sender == sender,
                DepositFilter::Recipient(recipient) => &d.nostr_recipient == recipient,
            })
            .cloned()
            .collect();
        drop(deposits);

        matching.sort_by(newest_first);
        Ok(matching
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect())
    }

    async fn transition(
        &self,
        deposit_id: &str,
        to: DepositState,
        at: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let mut deposits = self.write()?;
        let Some(deposit) = deposits.get_mut(deposit_id) else {
            return Ok(false);
        };
        if deposit.is_claimed || deposit.is_cancelled {
            return Ok(false);
        }

        match to {
            DepositState::Claimed => deposit.is_claimed = true,
            DepositState::Cancelled => deposit.is_cancelled = true,
            DepositState::Pending => return Ok(false),
        }
        deposit.updated_at = at;
        Ok(true)
    }

    async fn set_starknet_recipient(
        &self,
        deposit_id: &str,
        starknet_recipient: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let mut deposits = self.write()?;
        match deposits.get_mut(deposit_id) {
            Some(d) if d.state() == DepositState::Pending && d.starknet_recipient.is_none() => {
                d.starknet_recipient = Some(starknet_recipient.to_string());
                d.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_pending_before(
        &self,
        cutoff: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<TipDeposit>, DbError> {
        let deposits = self.read()?;
        let mut stale: Vec<TipDeposit> = deposits
            .values()
            .filter(|d| d.state() == DepositState::Pending && d.created_at < cutoff)
            .cloned()
            .collect();
        drop(deposits);

        stale.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        stale.truncate(limit as usize);
        Ok(stale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn deposit(id: &str, sender: &str, created_at: DateTime<Utc>) -> TipDeposit {
        TipDeposit {
            deposit_id: id.to_string(),
            sender: sender.to_string(),
            nostr_recipient: "0xrecipient".to_string(),
            starknet_recipient: None,
            token_address: "0xtoken".to_string(),
            amount: 10,
            gas_amount: None,
            gas_token_address: None,
            is_claimed: false,
            is_cancelled: false,
            created_at,
            updated_at: created_at,
        }
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_id() {
        let store = InMemoryTipDepositStore::new();
        let now = Utc::now();
        store.insert(deposit("a", "0xs", now)).await.unwrap();

        let err = store.insert(deposit("a", "0xs", now)).await.unwrap_err();
        assert!(matches!(err, DbError::QueryError(_)));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_transition_only_once() {
        let store = InMemoryTipDepositStore::new();
        let now = Utc::now();
        store.insert(deposit("a", "0xs", now)).await.unwrap();

        let later = now + Duration::seconds(5);
        assert!(store.transition("a", DepositState::Claimed, later).await.unwrap());
        assert!(!store.transition("a", DepositState::Cancelled, later).await.unwrap());
        assert!(!store.transition("missing", DepositState::Claimed, later).await.unwrap());

        let stored = store.find_by_id("a").await.unwrap().unwrap();
        assert!(stored.is_claimed);
        assert!(!stored.is_cancelled);
        assert_eq!(stored.updated_at, later);
    }

    #[tokio::test]
    async fn test_list_filters_and_pages_newest_first() {
        let store = InMemoryTipDepositStore::new();
        let base = Utc::now();
        for i in 0..5 {
            let sender = if i % 2 == 0 { "0xeven" } else { "0xodd" };
            store
                .insert(deposit(&format!("d{}", i), sender, base + Duration::seconds(i)))
                .await
                .unwrap();
        }

        let all = store
            .list(&DepositFilter::All, Page { offset: 0, limit: 10 })
            .await
            .unwrap();
        let ids: Vec<_> = all.iter().map(|d| d.deposit_id.as_str()).collect();
        assert_eq!(ids, vec!["d4", "d3", "d2", "d1", "d0"]);

        let even = store
            .list(
                &DepositFilter::Sender("0xeven".to_string()),
                Page { offset: 1, limit: 1 },
            )
            .await
            .unwrap();
        assert_eq!(even.len(), 1);
        assert_eq!(even[0].deposit_id, "d2");
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_every_call() {
        let store = InMemoryTipDepositStore::new();
        store.set_unavailable(true);

        let err = store.find_by_id("a").await.unwrap_err();
        assert!(matches!(err, DbError::ConnectionError(_)));
    }
}
