//! razorpay orders api v1

use crate::{gateway::*, Error, Result, Verifier};
use serde_json::Value;
use std::{fmt, time::Duration};
use tracing::{debug, warn};

pub const DEFAULT_API_URL: &str = "https://api.razorpay.com/v1";

#[derive(Clone)]
pub struct Razorpay {
    client: reqwest::Client,
    api_url: String,
    key_id: String,
    key_secret: String,
}

impl fmt::Debug for Razorpay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Razorpay")
            .field("api_url", &self.api_url)
            .field("key_id", &self.key_id)
            .finish()
    }
}

impl Razorpay {
    /// Build a client, every request is bounded by `timeout`.
    pub fn connect(
        api_url: impl Into<String>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Invalid(e.to_string()))?;
        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_owned(),
            key_id: key_id.into(),
            key_secret: key_secret.into(),
        })
    }

    /// Signature verifier sharing the api key secret.
    pub fn verifier(&self) -> Verifier {
        Verifier::new(self.key_secret.clone())
    }
}

#[async_trait::async_trait]
impl Gateway for Razorpay {
    async fn create_order(&self, order: &NewOrder) -> Result<Order> {
        if order.amount == 0 {
            return Err(Error::Invalid("order amount must be positive".to_owned()));
        }
        let url = format!("{}/orders", self.api_url);
        let res = self
            .client
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(order)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "razorpay order creation rejected");
            return Err(Error::Unavailable(format!("status {}", status)));
        }

        let raw: Value = res.json().await?;
        let id = raw
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::InvalidResponse("missing order id".to_owned()))?
            .to_owned();
        debug!(order_id = %id, receipt = %order.receipt, "razorpay order created");
        Ok(Order { id, raw })
    }

    fn key_id(&self) -> &str {
        &self.key_id
    }
}
