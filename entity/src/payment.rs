use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(EnumIter, DeriveActiveEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Pending = 0,
    Success = 1,
    Failed = 2,
}

impl Status {
    /// Label used in the payment history.
    pub fn label(&self) -> &'static str {
        match self {
            Status::Pending => "PENDING",
            Status::Success => "SUCCESS",
            Status::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Status::Pending)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Donation payments

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub donor_id: i32,

    pub donation_type_id: i32,

    /// amount in minor units
    pub amount: i64,

    pub currency: String,

    /// gateway order id, unique
    pub transaction_id: String,

    /// reference sent with the gateway order
    pub external_ref: String,

    /// gateway payment id from the confirmed notification
    pub gateway_payment_id: Option<String>,

    pub status: Status,

    /// stored invoice document path
    pub invoice: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub notes: String,

    /// data create time
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::donor::Entity",
        from = "Column::DonorId",
        to = "super::donor::Column::Id",
        on_delete = "Cascade"
    )]
    Donor,
    #[sea_orm(
        belongs_to = "super::donation_type::Entity",
        from = "Column::DonationTypeId",
        to = "super::donation_type::Column::Id",
        on_delete = "Cascade"
    )]
    DonationType,
    #[sea_orm(has_many = "super::receipt::Entity")]
    Receipt,
    #[sea_orm(has_many = "super::payment_history::Entity")]
    PaymentHistory,
}

impl Related<super::donor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Donor.def()
    }
}

impl Related<super::donation_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DonationType.def()
    }
}

impl Related<super::receipt::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Receipt.def()
    }
}

impl Related<super::payment_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentHistory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
