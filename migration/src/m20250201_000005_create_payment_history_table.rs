use entity::{payment, payment_history};
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(payment_history::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(payment_history::Column::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(payment_history::Column::PaymentId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(payment_history::Column::Status)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(payment_history::Column::Notes).text().null())
                    .col(
                        ColumnDef::new(payment_history::Column::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_history_payment")
                            .from(payment_history::Entity, payment_history::Column::PaymentId)
                            .to(payment::Entity, payment::Column::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_payment_history_payment_id")
                    .col(payment_history::Column::PaymentId)
                    .table(payment_history::Entity)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_payment_history_payment_id")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(payment_history::Entity).to_owned())
            .await
    }
}
