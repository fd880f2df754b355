// Domain model for tip deposits

use chrono::{DateTime, Utc};

/// Lifecycle state of a deposit, derived from its two terminal flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepositState {
    Pending,
    Claimed,
    Cancelled,
}

impl DepositState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, DepositState::Pending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DepositState::Pending => "pending",
            DepositState::Claimed => "claimed",
            DepositState::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for DepositState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tip transfer, in flight or settled.
///
/// Addresses held here are always in canonical form (see `services::address`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TipDeposit {
    pub deposit_id: String,
    pub sender: String,
    pub nostr_recipient: String,
    pub starknet_recipient: Option<String>,
    pub token_address: String,
    pub amount: u128,
    pub gas_amount: Option<u128>,
    pub gas_token_address: Option<String>,
    pub is_claimed: bool,
    pub is_cancelled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TipDeposit {
    pub fn state(&self) -> DepositState {
        match (self.is_claimed, self.is_cancelled) {
            (false, false) => DepositState::Pending,
            (true, _) => DepositState::Claimed,
            (false, true) => DepositState::Cancelled,
        }
    }
}

/// Caller-supplied fields for a new deposit, before validation
#[derive(Debug, Clone, Default)]
pub struct NewTipDeposit {
    pub sender: String,
    pub nostr_recipient: String,
    pub token_address: String,
    pub amount: u128,
    pub gas_amount: Option<u128>,
    pub gas_token_address: Option<String>,
    pub starknet_recipient: Option<String>,
}

/// Who is asking for a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    /// A caller acting as the given address or recipient key
    Party(String),
    /// Administrative path (expiry policy); bypasses the sender check on cancel
    System,
}

/// Selection applied to list queries
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepositFilter {
    All,
    Sender(String),
    Recipient(String),
}

/// Offset/limit window over a newest-first listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: u64,
    pub limit: u64,
}

/// Largest quantity the ledger accepts; bounded by the 96-bit mantissa of the
/// NUMERIC mapping used in storage
pub const MAX_AMOUNT: u128 = (1u128 << 96) - 1;
