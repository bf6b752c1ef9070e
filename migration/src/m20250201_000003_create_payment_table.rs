use entity::{donation_type, donor, payment};
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = Table::create()
            .table(payment::Entity)
            .if_not_exists()
            .col(
                ColumnDef::new(payment::Column::Id)
                    .integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(ColumnDef::new(payment::Column::DonorId).integer().not_null())
            .col(
                ColumnDef::new(payment::Column::DonationTypeId)
                    .integer()
                    .not_null(),
            )
            .col(
                ColumnDef::new(payment::Column::Amount)
                    .big_integer()
                    .not_null(),
            )
            .col(
                ColumnDef::new(payment::Column::Currency)
                    .string_len(3)
                    .not_null(),
            )
            .col(
                ColumnDef::new(payment::Column::TransactionId)
                    .string_len(100)
                    .not_null(),
            )
            .col(
                ColumnDef::new(payment::Column::ExternalRef)
                    .string_len(40)
                    .not_null(),
            )
            .col(
                ColumnDef::new(payment::Column::GatewayPaymentId)
                    .string_len(100)
                    .null(),
            )
            .col(
                ColumnDef::new(payment::Column::Status)
                    .integer()
                    .not_null()
                    .default(0),
            )
            .col(ColumnDef::new(payment::Column::Invoice).string_len(255).null())
            .col(
                ColumnDef::new(payment::Column::Notes)
                    .text()
                    .not_null()
                    .default("".to_owned()),
            )
            .col(
                ColumnDef::new(payment::Column::CreatedAt)
                    .big_integer()
                    .not_null(),
            )
            .col(
                ColumnDef::new(payment::Column::UpdatedAt)
                    .big_integer()
                    .not_null(),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_payment_donor")
                    .from(payment::Entity, payment::Column::DonorId)
                    .to(donor::Entity, donor::Column::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_payment_donation_type")
                    .from(payment::Entity, payment::Column::DonationTypeId)
                    .to(donation_type::Entity, donation_type::Column::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();

        manager.create_table(table).await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_payment_transaction_id")
                    .col(payment::Column::TransactionId)
                    .table(payment::Entity)
                    .unique()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_payment_donor_id")
                    .col(payment::Column::DonorId)
                    .table(payment::Entity)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("uq_payment_transaction_id").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_payment_donor_id").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(payment::Entity).to_owned())
            .await
    }
}
