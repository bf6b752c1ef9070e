use sea_orm::entity::prelude::*;
use serde::Serialize;

/// Issued donation receipts, at most one per payment

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize)]
#[sea_orm(table_name = "receipts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// unique
    pub payment_id: i32,

    /// TRyymmNNNN, unique
    pub receipt_number: String,

    /// stored pdf path
    pub document: String,

    pub email_sent: bool,

    pub email_sent_at: Option<i64>,

    /// last delivery failure, an attempted but unsent receipt
    #[sea_orm(column_type = "Text", nullable)]
    pub email_error: Option<String>,

    /// set while a worker renders and delivers the receipt
    pub claimed_at: Option<i64>,

    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::payment::Entity",
        from = "Column::PaymentId",
        to = "super::payment::Column::Id",
        on_delete = "Cascade"
    )]
    Payment,
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
