// Repository for tip deposit queries and state transitions

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use std::fmt;

use crate::db::repositories::TipDepositStore;
use crate::db::DbError;
use crate::entity::tip_deposits;
use crate::models::{DepositFilter, DepositState, Page, TipDeposit};

/// SeaORM-backed tip deposit store
#[derive(Clone)]
pub struct TipDepositRepository {
    conn: DatabaseConnection,
}

impl fmt::Debug for TipDepositRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TipDepositRepository").finish_non_exhaustive()
    }
}

impl TipDepositRepository {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }
}

fn to_decimal(deposit_id: &str, value: u128) -> Result<Decimal, DbError> {
    Decimal::from_u128(value).ok_or_else(|| {
        DbError::QueryError(format!(
            "quantity {} for deposit {} exceeds NUMERIC range",
            value, deposit_id
        ))
    })
}

fn from_decimal(deposit_id: &str, value: Decimal) -> Result<u128, DbError> {
    if !value.fract().is_zero() {
        return Err(DbError::CorruptRow {
            deposit_id: deposit_id.to_string(),
            reason: format!("non-integral quantity {}", value),
        });
    }
    value.to_u128().ok_or_else(|| DbError::CorruptRow {
        deposit_id: deposit_id.to_string(),
        reason: format!("negative quantity {}", value),
    })
}

fn to_domain(m: tip_deposits::Model) -> Result<TipDeposit, DbError> {
    let amount = from_decimal(&m.deposit_id, m.amount)?;
    let gas_amount = m
        .gas_amount
        .map(|g| from_decimal(&m.deposit_id, g))
        .transpose()?;

    Ok(TipDeposit {
        deposit_id: m.deposit_id,
        sender: m.sender,
        nostr_recipient: m.nostr_recipient,
        starknet_recipient: m.starknet_recipient,
        token_address: m.token_address,
        amount,
        gas_amount,
        gas_token_address: m.gas_token_address,
        is_claimed: m.is_claimed,
        is_cancelled: m.is_cancelled,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}

#[async_trait]
impl TipDepositStore for TipDepositRepository {
    async fn insert(&self, deposit: TipDeposit) -> Result<TipDeposit, DbError> {
        let amount = to_decimal(&deposit.deposit_id, deposit.amount)?;
        let gas_amount = deposit
            .gas_amount
            .map(|g| to_decimal(&deposit.deposit_id, g))
            .transpose()?;

        let model = tip_deposits::ActiveModel {
            deposit_id: Set(deposit.deposit_id),
            sender: Set(deposit.sender),
            nostr_recipient: Set(deposit.nostr_recipient),
            starknet_recipient: Set(deposit.starknet_recipient),
            token_address: Set(deposit.token_address),
            amount: Set(amount),
            gas_amount: Set(gas_amount),
            gas_token_address: Set(deposit.gas_token_address),
            is_claimed: Set(deposit.is_claimed),
            is_cancelled: Set(deposit.is_cancelled),
            created_at: Set(deposit.created_at),
            updated_at: Set(deposit.updated_at),
        };

        let inserted = model.insert(&self.conn).await?;
        to_domain(inserted)
    }

    async fn find_by_id(&self, deposit_id: &str) -> Result<Option<TipDeposit>, DbError> {
        tip_deposits::Entity::find_by_id(deposit_id.to_string())
            .one(&self.conn)
            .await?
            .map(to_domain)
            .transpose()
    }

    async fn list(&self, filter: &DepositFilter, page: Page) -> Result<Vec<TipDeposit>, DbError> {
        let mut query = tip_deposits::Entity::find();

        match filter {
            DepositFilter::All => {}
            DepositFilter::Sender(sender) => {
                query = query.filter(tip_deposits::Column::Sender.eq(sender.as_str()));
            }
            DepositFilter::Recipient(recipient) => {
                query = query.filter(tip_deposits::Column::NostrRecipient.eq(recipient.as_str()));
            }
        }

        query
            .order_by_desc(tip_deposits::Column::CreatedAt)
            .order_by_desc(tip_deposits::Column::DepositId)
            .offset(page.offset)
            .limit(page.limit)
            .all(&self.conn)
            .await?
            .into_iter()
            .map(to_domain)
            .collect()
    }

    async fn transition(
        &self,
        deposit_id: &str,
        to: DepositState,
        at: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let flag = match to {
            DepositState::Claimed => tip_deposits::Column::IsClaimed,
            DepositState::Cancelled => tip_deposits::Column::IsCancelled,
            DepositState::Pending => return Ok(false),
        };

        // Single conditional UPDATE: the row lock taken by postgres serializes
        // racing callers and only the first one still matches the flag filter.
        let result = tip_deposits::Entity::update_many()
            .col_expr(flag, Expr::value(true))
            .col_expr(tip_deposits::Column::UpdatedAt, Expr::value(at))
            .filter(tip_deposits::Column::DepositId.eq(deposit_id))
            .filter(tip_deposits::Column::IsClaimed.eq(false))
            .filter(tip_deposits::Column::IsCancelled.eq(false))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected == 1)
    }

    async fn set_starknet_recipient(
        &self,
        deposit_id: &str,
        starknet_recipient: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let result = tip_deposits::Entity::update_many()
            .col_expr(
                tip_deposits::Column::StarknetRecipient,
                Expr::value(starknet_recipient),
            )
            .col_expr(tip_deposits::Column::UpdatedAt, Expr::value(at))
            .filter(tip_deposits::Column::DepositId.eq(deposit_id))
            .filter(tip_deposits::Column::StarknetRecipient.is_null())
            .filter(tip_deposits::Column::IsClaimed.eq(false))
            .filter(tip_deposits::Column::IsCancelled.eq(false))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected == 1)
    }

    async fn find_pending_before(
        &self,
        cutoff: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<TipDeposit>, DbError> {
        tip_deposits::Entity::find()
            .filter(tip_deposits::Column::IsClaimed.eq(false))
            .filter(tip_deposits::Column::IsCancelled.eq(false))
            .filter(tip_deposits::Column::CreatedAt.lt(cutoff))
            .order_by_asc(tip_deposits::Column::CreatedAt)
            .limit(limit)
            .all(&self.conn)
            .await?
            .into_iter()
            .map(to_domain)
            .collect()
    }
}
