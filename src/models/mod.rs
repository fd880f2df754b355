// API request/response models

mod tip_deposit;

pub use tip_deposit::{
    Actor, DepositFilter, DepositState, NewTipDeposit, Page, TipDeposit, MAX_AMOUNT,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{LedgerError, LedgerResult};

/// Integer quantity as sent by the client, either a JSON string or number.
/// Parsed into the domain type after deserialization so that every bad
/// quantity surfaces as `InvalidAmount`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Text(String),
    Number(serde_json::Number),
}

impl AmountInput {
    /// Whole, non-negative quantity in the token's smallest unit
    pub fn parse(&self, field: &str) -> LedgerResult<u128> {
        let invalid = |reason: &str| LedgerError::InvalidAmount(format!("{} {}", field, reason));

        match self {
            AmountInput::Text(text) => {
                let text = text.trim();
                if text.starts_with('-') {
                    return Err(invalid("must not be negative"));
                }
                if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid("must be a whole number"));
                }
                text.parse::<u128>()
                    .map_err(|_| invalid("is too large"))
            }
            AmountInput::Number(number) => {
                if let Some(n) = number.as_u64() {
                    Ok(u128::from(n))
                } else if number.as_i64().is_some() || number.as_f64().is_some_and(|f| f < 0.0) {
                    Err(invalid("must not be negative"))
                } else {
                    // Integers above u64 arrive as floats; send them as strings
                    Err(invalid("must be a whole number; send large values as a string"))
                }
            }
        }
    }
}

/// Integer quantities can exceed 2^53, so they travel as decimal strings
fn serialize_u128<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

fn serialize_opt_u128<S: Serializer>(value: &Option<u128>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => serializer.serialize_str(&v.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Custom deserializer to convert string to u64
fn deserialize_string_to_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = String::deserialize(deserializer)?;
    s.parse::<u64>().map_err(serde::de::Error::custom)
}

fn deserialize_opt_string_to_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    s.map(|s| s.parse::<u64>().map_err(serde::de::Error::custom))
        .transpose()
}

/// Pagination parameters for list endpoints
#[derive(Debug, Deserialize, Default)]
pub struct PaginationParams {
    #[serde(default = "default_page", deserialize_with = "deserialize_string_to_u64")]
    pub page: u64,
    #[serde(default, deserialize_with = "deserialize_opt_string_to_u64")]
    pub limit: Option<u64>,
}

fn default_page() -> u64 {
    1
}

/// Success envelope shared by every endpoint
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Public projection of a deposit
#[derive(Debug, Serialize)]
pub struct TipDepositData {
    pub deposit_id: String,
    pub sender: String,
    pub nostr_recipient: String,
    pub starknet_recipient: Option<String>,
    pub token_address: String,
    #[serde(serialize_with = "serialize_u128")]
    pub amount: u128,
    #[serde(serialize_with = "serialize_opt_u128")]
    pub gas_amount: Option<u128>,
    pub gas_token_address: Option<String>,
    pub is_claimed: bool,
    pub is_cancelled: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<TipDeposit> for TipDepositData {
    fn from(d: TipDeposit) -> Self {
        Self {
            deposit_id: d.deposit_id,
            sender: d.sender,
            nostr_recipient: d.nostr_recipient,
            starknet_recipient: d.starknet_recipient,
            token_address: d.token_address,
            amount: d.amount,
            gas_amount: d.gas_amount,
            gas_token_address: d.gas_token_address,
            is_claimed: d.is_claimed,
            is_cancelled: d.is_cancelled,
            created_at: d.created_at.to_rfc3339(),
            updated_at: d.updated_at.to_rfc3339(),
        }
    }
}

/// Request body for POST /tips
#[derive(Debug, Deserialize)]
pub struct CreateTipRequest {
    pub sender: String,
    pub nostr_recipient: String,
    pub token_address: String,
    pub amount: AmountInput,
    #[serde(default)]
    pub gas_amount: Option<AmountInput>,
    #[serde(default)]
    pub gas_token_address: Option<String>,
    #[serde(default)]
    pub starknet_recipient: Option<String>,
}

impl TryFrom<CreateTipRequest> for NewTipDeposit {
    type Error = LedgerError;

    fn try_from(r: CreateTipRequest) -> LedgerResult<Self> {
        Ok(Self {
            amount: r.amount.parse("amount")?,
            gas_amount: r.gas_amount.map(|g| g.parse("gas amount")).transpose()?,
            sender: r.sender,
            nostr_recipient: r.nostr_recipient,
            token_address: r.token_address,
            gas_token_address: r.gas_token_address,
            starknet_recipient: r.starknet_recipient,
        })
    }
}

/// Request body for POST /tips/{deposit_id}/claim
#[derive(Debug, Deserialize)]
pub struct ClaimTipRequest {
    pub claimant: String,
}

/// Request body for POST /tips/{deposit_id}/cancel
#[derive(Debug, Deserialize)]
pub struct CancelTipRequest {
    pub requester: String,
}

/// Request body for POST /tips/{deposit_id}/recipient
#[derive(Debug, Deserialize)]
pub struct ResolveRecipientRequest {
    pub starknet_recipient: String,
}

/// Response payload for POST /tips/expire
#[derive(Debug, Serialize)]
pub struct ExpiredTipsResponse {
    pub cancelled: Vec<String>,
    pub count: usize,
}
