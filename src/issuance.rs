//! Webhook driven receipt issuance.
//!
//! verify signature -> mark SUCCESS -> allocate receipt number -> render pdf ->
//! store documents -> email, each step ordered after the previous one so a crash
//! can leave a SUCCESS payment without receipt, or a receipt without documents or
//! delivery, but never a receipt without a SUCCESS payment. Redelivering the
//! notification resumes where the previous attempt stopped. The worker finishing
//! a receipt holds a claim on it, expired after [`CLAIM_TIMEOUT_SECS`].

use crate::{
    document::{render_receipt_pdf, ReceiptDocument},
    lifecycle::Transition,
    mailer::OutgoingEmail,
    now, numbering,
    storage::{INVOICES, RECEIPTS},
    Error, Result, Service,
};
use chrono::Utc;
use entity::{donor, payment, receipt};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, NotSet, QueryFilter, Set,
    TransactionTrait,
};
use serde::Deserialize;
use tracing::{error, info, warn};

/// Payment outcome posted by the checkout / gateway.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Notification {
    pub razorpay_payment_id: Option<String>,
    pub razorpay_order_id: Option<String>,
    pub razorpay_signature: Option<String>,
}

impl Notification {
    pub fn new(order_id: &str, payment_id: &str, signature: &str) -> Self {
        Self {
            razorpay_payment_id: Some(payment_id.to_owned()),
            razorpay_order_id: Some(order_id.to_owned()),
            razorpay_signature: Some(signature.to_owned()),
        }
    }

    /// (order id, payment id, signature)
    fn fields(&self) -> Result<(&str, &str, &str)> {
        fn get<'a>(v: &'a Option<String>, name: &str) -> Result<&'a str> {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| Error::MalformedNotification(format!("missing {}", name)))
        }
        Ok((
            get(&self.razorpay_order_id, "razorpay_order_id")?,
            get(&self.razorpay_payment_id, "razorpay_payment_id")?,
            get(&self.razorpay_signature, "razorpay_signature")?,
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// left unsent, can be retried with `resend_receipt`
    Failed(String),
    /// the donor has no email
    NoAddress,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Issuance {
    /// this notification created or finished the receipt
    Issued {
        receipt: receipt::Model,
        delivery: Delivery,
    },
    /// the payment already had its receipt, or another worker is finishing it
    AlreadyIssued { receipt: receipt::Model },
    /// the payment had already failed
    PreviouslyFailed,
}

impl Issuance {
    pub fn receipt(&self) -> Option<&receipt::Model> {
        match self {
            Issuance::Issued { receipt, .. } | Issuance::AlreadyIssued { receipt } => {
                Some(receipt)
            }
            Issuance::PreviouslyFailed => None,
        }
    }
}

/// Seconds a worker owns an unfinished receipt before a redelivery may take it over.
pub const CLAIM_TIMEOUT_SECS: i64 = 300;

enum Allocated {
    New(receipt::Model),
    Existing(receipt::Model),
}

impl Service {
    /// Handle one webhook notification.
    pub async fn process_notification(&self, notification: &Notification) -> Result<Issuance> {
        let (order_id, payment_id, signature) = notification.fields()?;

        let payment = self
            .get_payment(order_id)
            .await?
            .ok_or_else(|| Error::UnknownPayment(order_id.to_owned()))?;

        if !self.verifier().verify(order_id, payment_id, signature) {
            warn!(payment_id = payment.id, order_id, "invalid payment signature");
            self.mark_failed(&payment, "invalid signature").await?;
            return Err(Error::SignatureInvalid);
        }

        let payment = match payment.status {
            payment::Status::Pending => match self.mark_succeeded(&payment, payment_id).await? {
                Transition::Applied(model) => model,
                Transition::Rejected { current } => {
                    return self.settled(&payment, current).await;
                }
            },
            status => return self.settled(&payment, status).await,
        };

        self.issue(&payment, None).await
    }

    /// The payment left PENDING before this notification got to it.
    async fn settled(
        &self,
        payment: &payment::Model,
        status: payment::Status,
    ) -> Result<Issuance> {
        if status == payment::Status::Failed {
            return Ok(Issuance::PreviouslyFailed);
        }
        let payment = self.reload_payment(payment).await?;
        let receipt = self.get_receipt(payment.id).await?;
        self.issue(&payment, receipt).await
    }

    /// Steps after SUCCESS. Failures are audited and never revert the status.
    async fn issue(
        &self,
        payment: &payment::Model,
        existing: Option<receipt::Model>,
    ) -> Result<Issuance> {
        match self.issue_receipt(payment, existing).await {
            Ok(issuance) => Ok(issuance),
            Err(err) => {
                error!(
                    payment_id = payment.id,
                    order_id = %payment.transaction_id,
                    error = %err,
                    "receipt issuance failed"
                );
                if let Err(e) = self.record_error(payment, &err).await {
                    error!(payment_id = payment.id, error = %e, "failed to audit issuance error");
                }
                Err(Error::Issuance(Box::new(err)))
            }
        }
    }

    async fn issue_receipt(
        &self,
        payment: &payment::Model,
        existing: Option<receipt::Model>,
    ) -> Result<Issuance> {
        let allocated = match existing {
            Some(receipt) => Allocated::Existing(receipt),
            None => self.allocate_receipt(payment).await?,
        };
        let donor = self.payment_donor(payment).await?;

        let (payment, receipt) = match allocated {
            Allocated::New(receipt) => {
                info!(
                    payment_id = payment.id,
                    receipt_number = %receipt.receipt_number,
                    "receipt allocated"
                );
                (payment.clone(), receipt)
            }
            Allocated::Existing(receipt) => {
                if is_finished(payment, &donor, &receipt) || !self.claim(&receipt).await? {
                    return Ok(Issuance::AlreadyIssued { receipt });
                }
                // another worker may have finished before the claim
                let payment = self.reload_payment(payment).await?;
                let receipt = self.reload_receipt(&receipt).await?;
                if is_finished(&payment, &donor, &receipt) {
                    return Ok(Issuance::AlreadyIssued { receipt });
                }
                info!(
                    payment_id = payment.id,
                    receipt_number = %receipt.receipt_number,
                    "resuming unfinished receipt"
                );
                (payment, receipt)
            }
        };

        let delivery = match self.finish(&payment, &donor, &receipt).await {
            Ok(delivery) => delivery,
            Err(err) => {
                if let Err(e) = self.release(&receipt).await {
                    error!(receipt_number = %receipt.receipt_number, error = %e, "failed to release receipt");
                }
                return Err(err);
            }
        };
        let receipt = self.reload_receipt(&receipt).await?;
        Ok(Issuance::Issued { receipt, delivery })
    }

    /// Render, store and deliver whatever the receipt still lacks.
    async fn finish(
        &self,
        payment: &payment::Model,
        donor: &donor::Model,
        receipt: &receipt::Model,
    ) -> Result<Delivery> {
        let doc = self.receipt_document(payment, donor, receipt);
        let pdf = if payment.invoice.is_none() {
            let pdf = render_receipt_pdf(&doc);
            self.store_documents(payment, &doc, &pdf).await?;
            pdf
        } else {
            self.receipt_pdf(receipt, &doc).await?
        };

        if receipt.email_sent {
            return Ok(Delivery::Sent);
        }
        if let Some(err) = &receipt.email_error {
            return Ok(Delivery::Failed(err.clone()));
        }
        self.deliver(donor, receipt, &doc, pdf).await
    }

    /// Number and persist the receipt in one transaction, at most one per payment.
    async fn allocate_receipt(&self, payment: &payment::Model) -> Result<Allocated> {
        let period = numbering::period(Utc::now());
        let txn = self.db().begin().await?;
        // counter first, it holds the period lock until commit
        let number = match numbering::allocate(&txn, &period).await {
            Ok(number) => number,
            Err(err) => {
                txn.rollback().await?;
                return Err(err);
            }
        };

        let existing = receipt::Entity::find()
            .filter(receipt::Column::PaymentId.eq(payment.id))
            .one(&txn)
            .await?;
        if let Some(receipt) = existing {
            txn.rollback().await?;
            return Ok(Allocated::Existing(receipt));
        }

        let at = now() as i64;
        let res = receipt::ActiveModel {
            id: NotSet,
            payment_id: Set(payment.id),
            document: Set(format!(
                "{}/{}",
                RECEIPTS,
                crate::document::file_name(&number)
            )),
            receipt_number: Set(number),
            email_sent: Set(false),
            email_sent_at: Set(None),
            email_error: Set(None),
            claimed_at: Set(Some(at)),
            created_at: Set(at),
        }
        .insert(&txn)
        .await;

        match res {
            Ok(receipt) => {
                txn.commit().await?;
                Ok(Allocated::New(receipt))
            }
            Err(err) => {
                txn.rollback().await?;
                match self.get_receipt(payment.id).await? {
                    Some(receipt) => Ok(Allocated::Existing(receipt)),
                    None => Err(err.into()),
                }
            }
        }
    }

    /// Take over an unfinished receipt unless another worker holds a live claim.
    async fn claim(&self, receipt: &receipt::Model) -> Result<bool> {
        let at = now() as i64;
        let res = receipt::Entity::update_many()
            .set(receipt::ActiveModel {
                claimed_at: Set(Some(at)),
                ..Default::default()
            })
            .filter(receipt::Column::Id.eq(receipt.id))
            .filter(
                Condition::any()
                    .add(receipt::Column::ClaimedAt.is_null())
                    .add(receipt::Column::ClaimedAt.lt(at - CLAIM_TIMEOUT_SECS)),
            )
            .exec(self.db())
            .await?;
        Ok(res.rows_affected == 1)
    }

    async fn release(&self, receipt: &receipt::Model) -> Result<()> {
        receipt::ActiveModel {
            id: Set(receipt.id),
            claimed_at: Set(None),
            ..Default::default()
        }
        .update(self.db())
        .await?;
        Ok(())
    }

    async fn reload_payment(&self, payment: &payment::Model) -> Result<payment::Model> {
        payment::Entity::find_by_id(payment.id)
            .one(self.db())
            .await?
            .ok_or_else(|| Error::UnknownPayment(payment.transaction_id.clone()))
    }

    async fn reload_receipt(&self, receipt: &receipt::Model) -> Result<receipt::Model> {
        receipt::Entity::find_by_id(receipt.id)
            .one(self.db())
            .await?
            .ok_or(Error::Str("receipt vanished"))
    }

    async fn payment_donor(&self, payment: &payment::Model) -> Result<donor::Model> {
        donor::Entity::find_by_id(payment.donor_id)
            .one(self.db())
            .await?
            .ok_or(Error::Str("payment donor not found"))
    }

    fn receipt_document(
        &self,
        payment: &payment::Model,
        donor: &donor::Model,
        receipt: &receipt::Model,
    ) -> ReceiptDocument {
        ReceiptDocument {
            organization: self.options().organization.clone(),
            receipt_number: receipt.receipt_number.clone(),
            donor_name: donor.name.clone(),
            amount: payment.amount,
            currency: payment.currency.clone(),
            transaction_id: payment.transaction_id.clone(),
            issued_at: receipt.created_at,
        }
    }

    /// Write the pdf to both namespaces and link the invoice to the payment.
    async fn store_documents(
        &self,
        payment: &payment::Model,
        doc: &ReceiptDocument,
        pdf: &[u8],
    ) -> Result<()> {
        let invoice = self.store().save(INVOICES, &doc.file_name(), pdf).await?;
        self.store().save(RECEIPTS, &doc.file_name(), pdf).await?;
        payment::ActiveModel {
            id: Set(payment.id),
            invoice: Set(Some(invoice)),
            updated_at: Set(now() as i64),
            ..Default::default()
        }
        .update(self.db())
        .await?;
        Ok(())
    }

    /// The stored receipt pdf, rendered and saved again when it is gone.
    async fn receipt_pdf(&self, receipt: &receipt::Model, doc: &ReceiptDocument) -> Result<Vec<u8>> {
        match self.store().read(&receipt.document).await {
            Ok(pdf) => Ok(pdf),
            Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(receipt_number = %receipt.receipt_number, "stored receipt missing, rendering again");
                let pdf = render_receipt_pdf(doc);
                self.store().save(RECEIPTS, &doc.file_name(), &pdf).await?;
                Ok(pdf)
            }
            Err(e) => Err(e),
        }
    }

    /// Best effort email, a failure leaves the receipt unsent.
    async fn deliver(
        &self,
        donor: &donor::Model,
        receipt: &receipt::Model,
        doc: &ReceiptDocument,
        pdf: Vec<u8>,
    ) -> Result<Delivery> {
        let to = match email_address(donor) {
            Some(to) => to,
            None => return Ok(Delivery::NoAddress),
        };
        let email = OutgoingEmail::receipt(to, &self.options().mail_subject, doc, pdf);
        match self.mailer().send(&email).await {
            Ok(()) => {
                receipt::ActiveModel {
                    id: Set(receipt.id),
                    email_sent: Set(true),
                    email_sent_at: Set(Some(now() as i64)),
                    email_error: Set(None),
                    ..Default::default()
                }
                .update(self.db())
                .await?;
                info!(receipt_number = %receipt.receipt_number, "receipt email sent");
                Ok(Delivery::Sent)
            }
            Err(err) => {
                warn!(
                    receipt_number = %receipt.receipt_number,
                    error = %err,
                    "receipt email delivery failed"
                );
                receipt::ActiveModel {
                    id: Set(receipt.id),
                    email_error: Set(Some(err.to_string())),
                    ..Default::default()
                }
                .update(self.db())
                .await?;
                Ok(Delivery::Failed(err.to_string()))
            }
        }
    }

    /// Email an issued receipt again, restoring any document that is gone.
    pub async fn resend_receipt(&self, receipt_number: &str) -> Result<Delivery> {
        let receipt = receipt::Entity::find()
            .filter(receipt::Column::ReceiptNumber.eq(receipt_number))
            .one(self.db())
            .await?
            .ok_or_else(|| Error::InvalidParam(format!("unknown receipt {}", receipt_number)))?;
        let payment = payment::Entity::find_by_id(receipt.payment_id)
            .one(self.db())
            .await?
            .ok_or(Error::Str("receipt payment not found"))?;
        let donor = self.payment_donor(&payment).await?;
        let doc = self.receipt_document(&payment, &donor, &receipt);

        let pdf = self.receipt_pdf(&receipt, &doc).await?;
        let invoice_missing = match &payment.invoice {
            None => true,
            Some(path) => matches!(
                self.store().read(path).await,
                Err(Error::Io(ref e)) if e.kind() == std::io::ErrorKind::NotFound
            ),
        };
        if invoice_missing {
            warn!(receipt_number, "invoice missing, storing again");
            self.store_documents(&payment, &doc, &pdf).await?;
        }
        self.deliver(&donor, &receipt, &doc, pdf).await
    }
}

fn email_address(donor: &donor::Model) -> Option<&str> {
    donor
        .email
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Documents stored and delivery attempted.
fn is_finished(payment: &payment::Model, donor: &donor::Model, receipt: &receipt::Model) -> bool {
    payment.invoice.is_some()
        && (receipt.email_sent || receipt.email_error.is_some() || email_address(donor).is_none())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_fields() {
        let n: Notification = serde_json::from_str(
            r#"{"razorpay_payment_id": "pay_1", "razorpay_order_id": "order_1", "razorpay_signature": "ab"}"#,
        )
        .unwrap();
        assert_eq!(n.fields().unwrap(), ("order_1", "pay_1", "ab"));

        let n: Notification =
            serde_json::from_str(r#"{"razorpay_payment_id": "pay_1", "razorpay_signature": "ab"}"#)
                .unwrap();
        assert!(matches!(n.fields(), Err(Error::MalformedNotification(m)) if m == "missing razorpay_order_id"));

        let n = Notification::new("order_1", " ", "ab");
        assert!(matches!(n.fields(), Err(Error::MalformedNotification(_))));
        assert!(Notification::default().fields().is_err());
    }
}
