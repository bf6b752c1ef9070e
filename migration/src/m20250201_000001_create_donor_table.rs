use entity::donor;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = Table::create()
            .table(donor::Entity)
            .if_not_exists()
            .col(
                ColumnDef::new(donor::Column::Id)
                    .integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(ColumnDef::new(donor::Column::Name).string_len(200).not_null())
            .col(ColumnDef::new(donor::Column::Contact).string_len(20).not_null())
            .col(ColumnDef::new(donor::Column::Email).string_len(254).null())
            .col(ColumnDef::new(donor::Column::Address).text().null())
            .col(ColumnDef::new(donor::Column::TaxId).string_len(20).null())
            .col(
                ColumnDef::new(donor::Column::CreatedAt)
                    .big_integer()
                    .not_null(),
            )
            .col(
                ColumnDef::new(donor::Column::UpdatedAt)
                    .big_integer()
                    .not_null(),
            )
            .to_owned();

        manager.create_table(table).await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_donor_contact")
                    .col(donor::Column::Contact)
                    .table(donor::Entity)
                    .unique()
                    .to_owned(),
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("uq_donor_contact").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(donor::Entity).to_owned())
            .await
    }
}
