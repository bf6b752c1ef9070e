pub use sea_orm_migration::prelude::*;

mod m20250201_000001_create_donor_table;
mod m20250201_000002_create_donation_type_table;
mod m20250201_000003_create_payment_table;
mod m20250201_000004_create_receipt_table;
mod m20250201_000005_create_payment_history_table;
mod m20250201_000006_create_receipt_counter_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250201_000001_create_donor_table::Migration),
            Box::new(m20250201_000002_create_donation_type_table::Migration),
            Box::new(m20250201_000003_create_payment_table::Migration),
            Box::new(m20250201_000004_create_receipt_table::Migration),
            Box::new(m20250201_000005_create_payment_history_table::Migration),
            Box::new(m20250201_000006_create_receipt_counter_table::Migration),
        ]
    }
}
