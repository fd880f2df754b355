//! SeaORM Entity for tip_deposits table

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tip_deposits")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub deposit_id: String,

    #[sea_orm(column_type = "Text")]
    pub sender: String,
    #[sea_orm(column_type = "Text")]
    pub nostr_recipient: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub starknet_recipient: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub token_address: String,
    #[sea_orm(column_type = "Decimal(Some((39, 0)))")]
    pub amount: Decimal,

    #[sea_orm(column_type = "Decimal(Some((39, 0)))", nullable)]
    pub gas_amount: Option<Decimal>,
    #[sea_orm(column_type = "Text", nullable)]
    pub gas_token_address: Option<String>,

    pub is_claimed: bool,
    pub is_cancelled: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
