use entity::{payment, receipt};
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = Table::create()
            .table(receipt::Entity)
            .if_not_exists()
            .col(
                ColumnDef::new(receipt::Column::Id)
                    .integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(
                ColumnDef::new(receipt::Column::PaymentId)
                    .integer()
                    .not_null(),
            )
            .col(
                ColumnDef::new(receipt::Column::ReceiptNumber)
                    .string_len(20)
                    .not_null(),
            )
            .col(
                ColumnDef::new(receipt::Column::Document)
                    .string_len(255)
                    .not_null(),
            )
            .col(
                ColumnDef::new(receipt::Column::EmailSent)
                    .boolean()
                    .not_null()
                    .default(false),
            )
            .col(
                ColumnDef::new(receipt::Column::EmailSentAt)
                    .big_integer()
                    .null(),
            )
            .col(ColumnDef::new(receipt::Column::EmailError).text().null())
            .col(
                ColumnDef::new(receipt::Column::ClaimedAt)
                    .big_integer()
                    .null(),
            )
            .col(
                ColumnDef::new(receipt::Column::CreatedAt)
                    .big_integer()
                    .not_null(),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_receipt_payment")
                    .from(receipt::Entity, receipt::Column::PaymentId)
                    .to(payment::Entity, payment::Column::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();

        manager.create_table(table).await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_receipt_receipt_number")
                    .col(receipt::Column::ReceiptNumber)
                    .table(receipt::Entity)
                    .unique()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_receipt_payment_id")
                    .col(receipt::Column::PaymentId)
                    .table(receipt::Entity)
                    .unique()
                    .to_owned(),
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("uq_receipt_receipt_number").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("uq_receipt_payment_id").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(receipt::Entity).to_owned())
            .await
    }
}
