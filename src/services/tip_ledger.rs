//! Tip ledger - lifecycle of tip deposits
//!
//! States: Pending -> Claimed | Cancelled. Both targets are terminal.
//!
//! Inputs are validated and canonicalized before the store is touched.
//! Transitions read the deposit to check existence, state and authorization,
//! then commit through the store's conditional update; when that update
//! reports no change another caller won the race and the loser gets
//! `InvalidState` with the deposit left as the winner wrote it.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::LedgerConfig;
use crate::db::TipDepositStore;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    Actor, DepositFilter, DepositState, NewTipDeposit, Page, TipDeposit, MAX_AMOUNT,
};
use crate::services::address::{canonical_chain_address, canonical_recipient_key};

/// Postgres binds OFFSET as a signed 64-bit integer
const MAX_OFFSET: u64 = i64::MAX as u64;

/// Owns every read and write of tip deposits
#[derive(Clone)]
pub struct TipLedger {
    store: Arc<dyn TipDepositStore>,
    config: LedgerConfig,
}

fn validate_amount(field: &str, amount: u128) -> LedgerResult<()> {
    if amount > MAX_AMOUNT {
        return Err(LedgerError::InvalidAmount(format!(
            "{} exceeds the maximum of {}",
            field, MAX_AMOUNT
        )));
    }
    Ok(())
}

/// Timestamp for a mutation of `deposit`, strictly after its last update
fn next_timestamp(deposit: &TipDeposit) -> DateTime<Utc> {
    Utc::now().max(deposit.updated_at + Duration::microseconds(1))
}

impl TipLedger {
    pub fn new(store: Arc<dyn TipDepositStore>, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Turns 1-based page number and optional size into a bounded window.
    /// Windows starting past the largest offset SQL accepts are rejected.
    pub fn page(&self, page: u64, limit: Option<u64>) -> LedgerResult<Page> {
        let limit = limit
            .unwrap_or(self.config.default_list_limit)
            .clamp(1, self.config.max_list_limit);
        let offset = page
            .saturating_sub(1)
            .checked_mul(limit)
            .filter(|offset| *offset <= MAX_OFFSET)
            .ok_or_else(|| LedgerError::InvalidRequest(format!("page {} is out of range", page)))?;
        Ok(Page { offset, limit })
    }

    fn bounded(&self, page: Page) -> Page {
        Page {
            offset: page.offset.min(MAX_OFFSET),
            limit: page.limit.clamp(1, self.config.max_list_limit),
        }
    }

    /// Records a new pending deposit and returns it
    pub async fn create(&self, new: NewTipDeposit) -> LedgerResult<TipDeposit> {
        let sender = canonical_chain_address(&new.sender)
            .map_err(|e| LedgerError::invalid_address("sender", e))?;
        let nostr_recipient = canonical_recipient_key(&new.nostr_recipient)
            .map_err(|e| LedgerError::invalid_address("recipient", e))?;
        let token_address = canonical_chain_address(&new.token_address)
            .map_err(|e| LedgerError::invalid_address("token", e))?;
        let gas_token_address = new
            .gas_token_address
            .as_deref()
            .map(canonical_chain_address)
            .transpose()
            .map_err(|e| LedgerError::invalid_address("gas token", e))?;
        let starknet_recipient = new
            .starknet_recipient
            .as_deref()
            .map(canonical_chain_address)
            .transpose()
            .map_err(|e| LedgerError::invalid_address("starknet recipient", e))?;

        if new.amount == 0 {
            return Err(LedgerError::InvalidAmount(
                "amount must be greater than zero".to_string(),
            ));
        }
        validate_amount("amount", new.amount)?;
        if let Some(gas) = new.gas_amount {
            validate_amount("gas amount", gas)?;
        }

        let now = Utc::now();
        let deposit = TipDeposit {
            deposit_id: Uuid::new_v4().to_string(),
            sender,
            nostr_recipient,
            starknet_recipient,
            token_address,
            amount: new.amount,
            gas_amount: new.gas_amount,
            gas_token_address,
            is_claimed: false,
            is_cancelled: false,
            created_at: now,
            updated_at: now,
        };

        let stored = self.store.insert(deposit).await?;
        tracing::info!(
            deposit_id = %stored.deposit_id,
            sender = %stored.sender,
            amount = %stored.amount,
            "Tip deposit created"
        );
        Ok(stored)
    }

    pub async fn get_by_id(&self, deposit_id: &str) -> LedgerResult<TipDeposit> {
        self.store
            .find_by_id(deposit_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(deposit_id.to_string()))
    }

    /// Newest first, bounded by the configured maximum page size
    pub async fn list_all(&self, page: Page) -> LedgerResult<Vec<TipDeposit>> {
        Ok(self.store.list(&DepositFilter::All, self.bounded(page)).await?)
    }

    pub async fn list_by_sender(&self, sender: &str, page: Page) -> LedgerResult<Vec<TipDeposit>> {
        let sender = canonical_chain_address(sender)
            .map_err(|e| LedgerError::invalid_address("sender", e))?;
        Ok(self
            .store
            .list(&DepositFilter::Sender(sender), self.bounded(page))
            .await?)
    }

    pub async fn list_by_recipient(
        &self,
        nostr_recipient: &str,
        page: Page,
    ) -> LedgerResult<Vec<TipDeposit>> {
        let recipient = canonical_recipient_key(nostr_recipient)
            .map_err(|e| LedgerError::invalid_address("recipient", e))?;
        Ok(self
            .store
            .list(&DepositFilter::Recipient(recipient), self.bounded(page))
            .await?)
    }

    /// Recipient claims a pending deposit. The claimant may present either
    /// the recipient key or the resolved payee address.
    pub async fn claim(&self, deposit_id: &str, claimant: &str) -> LedgerResult<TipDeposit> {
        let claimant = canonical_recipient_key(claimant)
            .map_err(|e| LedgerError::invalid_address("claimant", e))?;

        let deposit = self.pending(deposit_id).await?;
        let authorized = deposit.nostr_recipient == claimant
            || deposit.starknet_recipient.as_deref() == Some(claimant.as_str());
        if !authorized {
            tracing::debug!(deposit_id, "Claim rejected: claimant is not the recipient");
            return Err(LedgerError::Unauthorized(format!(
                "claim tip deposit {}",
                deposit_id
            )));
        }

        self.commit(&deposit, DepositState::Claimed).await
    }

    /// Voids a pending deposit. Parties must be the sender; `Actor::System`
    /// is the administrative path and skips that check.
    pub async fn cancel(&self, deposit_id: &str, actor: &Actor) -> LedgerResult<TipDeposit> {
        let requester = match actor {
            Actor::Party(address) => Some(
                canonical_chain_address(address)
                    .map_err(|e| LedgerError::invalid_address("requester", e))?,
            ),
            Actor::System => None,
        };

        let deposit = self.pending(deposit_id).await?;
        if let Some(requester) = requester {
            if requester != deposit.sender {
                tracing::debug!(deposit_id, "Cancel rejected: requester is not the sender");
                return Err(LedgerError::Unauthorized(format!(
                    "cancel tip deposit {}",
                    deposit_id
                )));
            }
        }

        self.commit(&deposit, DepositState::Cancelled).await
    }

    /// Records the payee address behind the recipient key. Only a pending,
    /// unresolved deposit can be resolved; repeating the same value is a no-op.
    pub async fn resolve_recipient(
        &self,
        deposit_id: &str,
        starknet_recipient: &str,
    ) -> LedgerResult<TipDeposit> {
        let address = canonical_chain_address(starknet_recipient)
            .map_err(|e| LedgerError::invalid_address("starknet recipient", e))?;

        let deposit = self.pending(deposit_id).await?;
        match deposit.starknet_recipient.as_deref() {
            Some(existing) if existing == address => return Ok(deposit),
            Some(_) => {
                return Err(LedgerError::RecipientAlreadyResolved(deposit_id.to_string()));
            }
            None => {}
        }

        let at = next_timestamp(&deposit);
        if self
            .store
            .set_starknet_recipient(deposit_id, &address, at)
            .await?
        {
            tracing::info!(deposit_id, starknet_recipient = %address, "Tip recipient resolved");
            return self.get_by_id(deposit_id).await;
        }

        // Lost to a concurrent transition or resolution
        let current = self.get_by_id(deposit_id).await?;
        match current.starknet_recipient.as_deref() {
            Some(existing) if existing == address && current.state() == DepositState::Pending => {
                Ok(current)
            }
            _ if current.state().is_terminal() => Err(LedgerError::InvalidState {
                deposit_id: deposit_id.to_string(),
                state: current.state(),
            }),
            _ => Err(LedgerError::RecipientAlreadyResolved(deposit_id.to_string())),
        }
    }

    /// Cancels pending deposits older than the configured expiry window
    pub async fn expire_stale(&self) -> LedgerResult<Vec<String>> {
        let max_age = Duration::from_std(self.config.expiry_after)
            .map_err(|e| LedgerError::InternalError(format!("invalid expiry window: {}", e)))?;
        self.expire_created_before(Utc::now() - max_age).await
    }

    /// Cancels every pending deposit created before `cutoff` as `Actor::System`
    /// and returns the ids it cancelled. Deposits claimed in the meantime are skipped.
    pub async fn expire_created_before(&self, cutoff: DateTime<Utc>) -> LedgerResult<Vec<String>> {
        let batch = self.config.max_list_limit;
        let mut cancelled = Vec::new();

        loop {
            let stale = self.store.find_pending_before(cutoff, batch).await?;
            let fetched = stale.len() as u64;

            for deposit in stale {
                match self.commit(&deposit, DepositState::Cancelled).await {
                    Ok(_) => cancelled.push(deposit.deposit_id),
                    Err(LedgerError::InvalidState { .. }) => {}
                    Err(e) => return Err(e),
                }
            }

            if fetched < batch {
                break;
            }
        }

        if !cancelled.is_empty() {
            tracing::info!(count = cancelled.len(), %cutoff, "Expired stale tip deposits");
        }
        Ok(cancelled)
    }

    /// Loads a deposit and requires it to still be pending
    async fn pending(&self, deposit_id: &str) -> LedgerResult<TipDeposit> {
        let deposit = self.get_by_id(deposit_id).await?;
        let state = deposit.state();
        if state.is_terminal() {
            tracing::debug!(deposit_id, %state, "Transition rejected: deposit is terminal");
            return Err(LedgerError::InvalidState {
                deposit_id: deposit_id.to_string(),
                state,
            });
        }
        Ok(deposit)
    }

    /// Applies the terminal transition through the store's conditional update
    async fn commit(&self, deposit: &TipDeposit, to: DepositState) -> LedgerResult<TipDeposit> {
        let deposit_id = deposit.deposit_id.as_str();
        let at = next_timestamp(deposit);

        if self.store.transition(deposit_id, to, at).await? {
            tracing::info!(deposit_id, state = %to, "Tip deposit transitioned");
            return self.get_by_id(deposit_id).await;
        }

        let current = self.get_by_id(deposit_id).await?;
        tracing::warn!(
            deposit_id,
            attempted = %to,
            state = %current.state(),
            "Concurrent transition lost"
        );
        Err(LedgerError::InvalidState {
            deposit_id: deposit_id.to_string(),
            state: current.state(),
        })
    }
}
