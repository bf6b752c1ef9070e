use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// An order to create on the gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewOrder {
    /// amount in minor units (paise)
    pub amount: u64,
    pub currency: String,
    /// merchant side reference, echoed back by the gateway
    pub receipt: String,
    pub notes: BTreeMap<String, String>,
}

impl NewOrder {
    pub fn new(amount: u64, currency: impl Into<String>, receipt: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
            receipt: receipt.into(),
            notes: BTreeMap::new(),
        }
    }

    pub fn note(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.notes.insert(key.into(), value.into());
        self
    }
}

/// A gateway side order.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: String,
    /// the full gateway response
    pub raw: Value,
}

/// the payment gateway trait for multiple backends
#[async_trait::async_trait]
pub trait Gateway {
    /// Create an order to collect `order.amount`.
    ///
    /// The gateway does not deduplicate on `receipt`, calling this twice creates two orders.
    async fn create_order(&self, order: &NewOrder) -> Result<Order>;

    /// public key id handed to the checkout page
    fn key_id(&self) -> &str;
}
