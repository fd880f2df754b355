use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20241001_000001_create_tip_deposits_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TipDeposits::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TipDeposits::DepositId)
                            .text()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TipDeposits::Sender).text().not_null())
                    .col(ColumnDef::new(TipDeposits::NostrRecipient).text().not_null())
                    .col(ColumnDef::new(TipDeposits::StarknetRecipient).text().null())
                    .col(ColumnDef::new(TipDeposits::TokenAddress).text().not_null())
                    .col(
                        ColumnDef::new(TipDeposits::Amount)
                            .decimal_len(39, 0)
                            .not_null(),
                    )
                    .col(ColumnDef::new(TipDeposits::GasAmount).decimal_len(39, 0).null())
                    .col(ColumnDef::new(TipDeposits::GasTokenAddress).text().null())
                    .col(
                        ColumnDef::new(TipDeposits::IsClaimed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(TipDeposits::IsCancelled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(TipDeposits::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(TipDeposits::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    // A deposit can end up claimed or cancelled, never both
                    .check(Expr::cust("NOT (is_claimed AND is_cancelled)"))
                    .check(Expr::cust("amount > 0"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tip_deposits_sender")
                    .table(TipDeposits::Table)
                    .col(TipDeposits::Sender)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tip_deposits_nostr_recipient")
                    .table(TipDeposits::Table)
                    .col(TipDeposits::NostrRecipient)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tip_deposits_created_at")
                    .table(TipDeposits::Table)
                    .col(TipDeposits::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TipDeposits::Table).to_owned())
            .await
    }
}

/// Tip deposits table definition
#[derive(Iden)]
enum TipDeposits {
    Table,
    DepositId,
    Sender,
    NostrRecipient,
    StarknetRecipient,
    TokenAddress,
    Amount,
    GasAmount,
    GasTokenAddress,
    IsClaimed,
    IsCancelled,
    CreatedAt,
    UpdatedAt,
}
