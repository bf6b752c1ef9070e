use entity::receipt_counter;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(receipt_counter::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(receipt_counter::Column::Period)
                            .string_len(4)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(receipt_counter::Column::LastSeq)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(receipt_counter::Entity).to_owned())
            .await
    }
}
