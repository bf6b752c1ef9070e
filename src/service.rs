use crate::{
    mailer::Mailer, now, setting::Setting, storage::DocumentStore, Error, Result,
};
use entity::{donation_type, donor, payment, payment_history, receipt};
use razorpay_client::{Gateway, NewOrder, Verifier};
use rand::RngCore;
use rust_decimal::{prelude::ToPrimitive, Decimal};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbConn, EntityTrait, NotSet, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;
use tracing::{debug, info};

/// Service wide options taken from the setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub currency: String,
    pub organization: Option<String>,
    pub default_type: String,
    pub pending_reuse_secs: u64,
    pub mail_subject: String,
}

impl From<&Setting> for Options {
    fn from(setting: &Setting) -> Self {
        Self {
            currency: setting.razorpay.currency.trim().to_uppercase(),
            organization: setting.receipt.organization.clone(),
            default_type: setting.donation.default_type.clone(),
            pending_reuse_secs: setting.donation.pending_reuse_secs,
            mail_subject: setting.mail.subject.clone(),
        }
    }
}

/// Donation form input.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewDonation {
    pub name: String,
    /// mobile number
    pub contact: String,
    pub email: Option<String>,
    /// major units, at most two decimals
    #[serde(deserialize_with = "string_or_number")]
    pub amount: String,
    pub donation_type: Option<String>,
    pub address: Option<String>,
    /// PAN
    pub tax_id: Option<String>,
}

fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Str(String),
        Num(serde_json::Number),
    }
    Ok(match Amount::deserialize(d)? {
        Amount::Str(s) => s,
        Amount::Num(n) => n.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Donation {
    pub payment: payment::Model,
    pub donor: donor::Model,
    /// an in flight pending payment was handed out again
    pub reused: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentSummary {
    pub payment: payment::Model,
    pub receipt: Option<receipt::Model>,
    pub history: Vec<payment_history::Model>,
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(ToOwned::to_owned)
}

/// Parse a major unit amount into minor units.
pub fn parse_amount(s: &str) -> Result<i64> {
    let s = s.trim();
    if s.is_empty() {
        return Err(Error::InvalidParam("amount is required".to_owned()));
    }
    if !is_plain_decimal(s) {
        return Err(Error::InvalidParam(format!("invalid amount {}", s)));
    }
    let amount = Decimal::from_str(s)
        .map_err(|_| Error::InvalidParam(format!("invalid amount {}", s)))?
        .normalize();
    if amount.scale() > 2 {
        return Err(Error::InvalidParam(
            "amount can have at most two decimals".to_owned(),
        ));
    }
    if amount <= Decimal::ZERO {
        return Err(Error::InvalidParam("amount must be positive".to_owned()));
    }
    (amount * Decimal::ONE_HUNDRED)
        .to_i64()
        .ok_or_else(|| Error::InvalidParam("amount is too large".to_owned()))
}

/// `digits[.digits]`, no sign, exponent or separators.
fn is_plain_decimal(s: &str) -> bool {
    let (int, frac) = match s.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (s, None),
    };
    let digits = |p: &str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());
    digits(int) && frac.map_or(true, digits)
}

/// `don_` + 16 hex chars, sent as the gateway order receipt
pub fn external_reference() -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("don_{}", hex::encode(bytes))
}

/// Donation service
pub struct Service {
    conn: DbConn,
    gateway: Box<dyn Gateway + Send + Sync>,
    verifier: Verifier,
    mailer: Box<dyn Mailer + Send + Sync>,
    store: DocumentStore,
    options: Options,
}

impl Service {
    pub fn new(
        conn: DbConn,
        gateway: Box<dyn Gateway + Send + Sync>,
        verifier: Verifier,
        mailer: Box<dyn Mailer + Send + Sync>,
        store: DocumentStore,
        options: Options,
    ) -> Self {
        Self {
            conn,
            gateway,
            verifier,
            mailer,
            store,
            options,
        }
    }

    pub fn db(&self) -> &DbConn {
        &self.conn
    }

    pub fn gateway(&self) -> &(dyn Gateway + Send + Sync) {
        self.gateway.as_ref()
    }

    pub fn verifier(&self) -> &Verifier {
        &self.verifier
    }

    pub fn mailer(&self) -> &(dyn Mailer + Send + Sync) {
        self.mailer.as_ref()
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub async fn get_payment(&self, order_id: &str) -> Result<Option<payment::Model>> {
        Ok(payment::Entity::find()
            .filter(payment::Column::TransactionId.eq(order_id))
            .one(self.db())
            .await?)
    }

    pub async fn get_receipt(&self, payment_id: i32) -> Result<Option<receipt::Model>> {
        Ok(receipt::Entity::find()
            .filter(receipt::Column::PaymentId.eq(payment_id))
            .one(self.db())
            .await?)
    }

    pub async fn get_donor(&self, contact: &str) -> Result<Option<donor::Model>> {
        Ok(donor::Entity::find()
            .filter(donor::Column::Contact.eq(contact))
            .one(self.db())
            .await?)
    }

    pub async fn get_donation_type(&self, name: &str) -> Result<Option<donation_type::Model>> {
        Ok(donation_type::Entity::find()
            .filter(donation_type::Column::Name.eq(name))
            .one(self.db())
            .await?)
    }

    /// Payment with its receipt and audit trail.
    pub async fn payment_summary(&self, order_id: &str) -> Result<PaymentSummary> {
        let payment = self
            .get_payment(order_id)
            .await?
            .ok_or_else(|| Error::UnknownPayment(order_id.to_owned()))?;
        let receipt = self.get_receipt(payment.id).await?;
        let history = self.payment_history(payment.id).await?;
        Ok(PaymentSummary {
            payment,
            receipt,
            history,
        })
    }

    async fn get_or_create_donation_type(&self, name: &str) -> Result<donation_type::Model> {
        if let Some(t) = self.get_donation_type(name).await? {
            return Ok(t);
        }
        let time = now() as i64;
        let res = donation_type::ActiveModel {
            id: NotSet,
            name: Set(name.to_owned()),
            min_amount: Set(0),
            active: Set(true),
            created_at: Set(time),
            updated_at: Set(time),
        }
        .insert(self.db())
        .await;
        match res {
            Ok(t) => {
                info!(name, "donation type created");
                Ok(t)
            }
            // lost a creation race on the unique name
            Err(err) => self
                .get_donation_type(name)
                .await?
                .ok_or_else(|| Error::from(err)),
        }
    }

    async fn upsert_donor(&self, input: &NewDonation) -> Result<donor::Model> {
        let contact = input.contact.trim();
        let email = non_empty(input.email.as_deref());
        let time = now() as i64;

        if let Some(donor) = self.get_donor(contact).await? {
            return self.backfill_email(donor, email).await;
        }

        let res = donor::ActiveModel {
            id: NotSet,
            name: Set(input.name.trim().to_owned()),
            contact: Set(contact.to_owned()),
            email: Set(email.clone()),
            address: Set(non_empty(input.address.as_deref())),
            tax_id: Set(non_empty(input.tax_id.as_deref()).map(|s| s.to_uppercase())),
            created_at: Set(time),
            updated_at: Set(time),
        }
        .insert(self.db())
        .await;
        match res {
            Ok(donor) => Ok(donor),
            Err(err) => match self.get_donor(contact).await? {
                Some(donor) => self.backfill_email(donor, email).await,
                None => Err(err.into()),
            },
        }
    }

    /// Set the email of a donor who had none.
    async fn backfill_email(
        &self,
        donor: donor::Model,
        email: Option<String>,
    ) -> Result<donor::Model> {
        match (&donor.email, email) {
            (None, Some(email)) => {
                debug!(donor_id = donor.id, "backfill donor email");
                Ok(donor::ActiveModel {
                    id: Set(donor.id),
                    email: Set(Some(email)),
                    updated_at: Set(now() as i64),
                    ..Default::default()
                }
                .update(self.db())
                .await?)
            }
            _ => Ok(donor),
        }
    }

    async fn find_pending(
        &self,
        donor: &donor::Model,
        donation_type: &donation_type::Model,
        amount: i64,
    ) -> Result<Option<payment::Model>> {
        if self.options.pending_reuse_secs == 0 {
            return Ok(None);
        }
        let since = now().saturating_sub(self.options.pending_reuse_secs) as i64;
        Ok(payment::Entity::find()
            .filter(payment::Column::DonorId.eq(donor.id))
            .filter(payment::Column::DonationTypeId.eq(donation_type.id))
            .filter(payment::Column::Amount.eq(amount))
            .filter(payment::Column::Status.eq(payment::Status::Pending))
            .filter(payment::Column::CreatedAt.gte(since))
            .order_by_desc(payment::Column::Id)
            .one(self.db())
            .await?)
    }

    /// Validate the form, create a gateway order and persist a pending payment.
    ///
    /// Nothing is written when the gateway order can not be created. A repeated
    /// submission while the previous payment is still pending gets that payment back.
    pub async fn initiate_donation(&self, input: NewDonation) -> Result<Donation> {
        if input.name.trim().is_empty() {
            return Err(Error::InvalidParam("name is required".to_owned()));
        }
        let contact = input.contact.trim();
        if contact.is_empty() {
            return Err(Error::InvalidParam("contact is required".to_owned()));
        }
        if let Some(email) = non_empty(input.email.as_deref()) {
            if !email.contains('@') {
                return Err(Error::InvalidParam(format!("invalid email {}", email)));
            }
        }
        let amount = parse_amount(&input.amount)?;

        let type_name = non_empty(input.donation_type.as_deref())
            .unwrap_or_else(|| self.options.default_type.clone());
        let donation_type = self.get_donation_type(&type_name).await?;
        match &donation_type {
            Some(t) if !t.active => {
                return Err(Error::InvalidParam(format!(
                    "donation type {} is not active",
                    t.name
                )))
            }
            Some(t) if amount < t.min_amount => {
                return Err(Error::InvalidParam(format!(
                    "minimum amount for {} is {}",
                    t.name,
                    Decimal::new(t.min_amount, 2)
                )))
            }
            None if type_name != self.options.default_type => {
                return Err(Error::InvalidParam(format!(
                    "unknown donation type {}",
                    type_name
                )))
            }
            _ => {}
        }

        if let (Some(donor), Some(donation_type)) =
            (self.get_donor(contact).await?, donation_type.as_ref())
        {
            if let Some(payment) = self.find_pending(&donor, donation_type, amount).await? {
                info!(
                    payment_id = payment.id,
                    order_id = %payment.transaction_id,
                    "reuse pending payment"
                );
                let donor = self
                    .backfill_email(donor, non_empty(input.email.as_deref()))
                    .await?;
                return Ok(Donation {
                    payment,
                    donor,
                    reused: true,
                });
            }
        }

        let external_ref = external_reference();
        let order = NewOrder::new(amount as u64, self.options.currency.clone(), &external_ref)
            .note("donor_name", input.name.trim())
            .note("contact", contact)
            .note("donation_type", &type_name);
        let order = self.gateway.create_order(&order).await?;

        let donation_type = match donation_type {
            Some(t) => t,
            None => self.get_or_create_donation_type(&type_name).await?,
        };
        let donor = self.upsert_donor(&input).await?;
        let payment = self
            .record_initiation(&donor, &donation_type, amount, &order.id, &external_ref)
            .await?;
        Ok(Donation {
            payment,
            donor,
            reused: false,
        })
    }
}
