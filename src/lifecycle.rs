//! Payment state machine.
//!
//! `PENDING -> SUCCESS | FAILED`, terminal states never move again. Every
//! applied transition appends one row to the payment history in the same
//! transaction.

use crate::{now, Error, Result, Service};
use entity::{donation_type, donor, payment, payment_history};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, NotSet, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};
use tracing::{info, warn};

pub const LABEL_ERROR: &str = "ERROR";
pub const INITIATED: &str = "Payment initiated.";

/// Result of a guarded transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// the payment moved, holds the updated record
    Applied(payment::Model),
    /// the payment was not pending, nothing changed
    Rejected { current: payment::Status },
}

async fn append_history<C: ConnectionTrait>(
    conn: &C,
    payment_id: i32,
    status: &str,
    notes: Option<String>,
) -> Result<payment_history::Model> {
    Ok(payment_history::ActiveModel {
        id: NotSet,
        payment_id: Set(payment_id),
        status: Set(status.to_owned()),
        notes: Set(notes),
        created_at: Set(now() as i64),
    }
    .insert(conn)
    .await?)
}

impl Service {
    /// Persist a new pending payment for a created gateway order.
    pub async fn record_initiation(
        &self,
        donor: &donor::Model,
        donation_type: &donation_type::Model,
        amount: i64,
        order_id: &str,
        external_ref: &str,
    ) -> Result<payment::Model> {
        let time = now() as i64;
        let txn = self.db().begin().await?;
        let model = payment::ActiveModel {
            id: NotSet,
            donor_id: Set(donor.id),
            donation_type_id: Set(donation_type.id),
            amount: Set(amount),
            currency: Set(self.options().currency.clone()),
            transaction_id: Set(order_id.to_owned()),
            external_ref: Set(external_ref.to_owned()),
            gateway_payment_id: Set(None),
            status: Set(payment::Status::Pending),
            invoice: Set(None),
            notes: Set(String::new()),
            created_at: Set(time),
            updated_at: Set(time),
        }
        .insert(&txn)
        .await?;
        append_history(
            &txn,
            model.id,
            payment::Status::Pending.label(),
            Some(INITIATED.to_owned()),
        )
        .await?;
        txn.commit().await?;
        info!(payment_id = model.id, order_id, amount, "payment initiated");
        Ok(model)
    }

    /// PENDING -> SUCCESS
    pub async fn mark_succeeded(
        &self,
        payment: &payment::Model,
        gateway_payment_id: &str,
    ) -> Result<Transition> {
        self.transition(
            payment,
            payment::ActiveModel {
                status: Set(payment::Status::Success),
                gateway_payment_id: Set(Some(gateway_payment_id.to_owned())),
                ..Default::default()
            },
            payment::Status::Success,
            format!("Payment successful, gateway payment id {}", gateway_payment_id),
        )
        .await
    }

    /// PENDING -> FAILED
    pub async fn mark_failed(&self, payment: &payment::Model, reason: &str) -> Result<Transition> {
        self.transition(
            payment,
            payment::ActiveModel {
                status: Set(payment::Status::Failed),
                ..Default::default()
            },
            payment::Status::Failed,
            reason.to_owned(),
        )
        .await
    }

    async fn transition(
        &self,
        payment: &payment::Model,
        mut update: payment::ActiveModel,
        to: payment::Status,
        notes: String,
    ) -> Result<Transition> {
        update.updated_at = Set(now() as i64);

        let txn = self.db().begin().await?;
        let res = payment::Entity::update_many()
            .set(update)
            .filter(payment::Column::Id.eq(payment.id))
            .filter(payment::Column::Status.eq(payment::Status::Pending))
            .exec(&txn)
            .await?;

        if res.rows_affected != 1 {
            txn.rollback().await?;
            let current = payment::Entity::find_by_id(payment.id)
                .one(self.db())
                .await?
                .ok_or_else(|| Error::UnknownPayment(payment.transaction_id.clone()))?
                .status;
            warn!(
                payment_id = payment.id,
                order_id = %payment.transaction_id,
                attempted = %to,
                current = %current,
                "rejected transition of a non pending payment"
            );
            return Ok(Transition::Rejected { current });
        }

        append_history(&txn, payment.id, to.label(), Some(notes)).await?;
        let model = payment::Entity::find_by_id(payment.id)
            .one(&txn)
            .await?
            .ok_or(Error::Str("payment vanished during transition"))?;
        txn.commit().await?;
        info!(payment_id = payment.id, order_id = %payment.transaction_id, status = %to, "payment transition");
        Ok(Transition::Applied(model))
    }

    /// Audit an unexpected failure without touching the status.
    pub async fn record_error(&self, payment: &payment::Model, err: &Error) -> Result<()> {
        append_history(
            self.db(),
            payment.id,
            LABEL_ERROR,
            Some(format!("Error: {}", err)),
        )
        .await?;
        Ok(())
    }

    /// Audit trail of the payment, oldest first.
    pub async fn payment_history(&self, payment_id: i32) -> Result<Vec<payment_history::Model>> {
        Ok(payment_history::Entity::find()
            .filter(payment_history::Column::PaymentId.eq(payment_id))
            .order_by_asc(payment_history::Column::CreatedAt)
            .order_by_asc(payment_history::Column::Id)
            .all(self.db())
            .await?)
    }
}
