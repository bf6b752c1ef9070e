//! Payment webhook.
//!
//! Always answers HTTP 200, the outcome is in the `status` field. Messages are
//! generic, the caller is untrusted.

use crate::{AppState, Error, Issuance, Notification};
use actix_web::{http::StatusCode, post, web, HttpResponse, ResponseError, Scope};
use serde_json::json;
use tracing::{info, warn};

#[derive(thiserror::Error, Debug)]
pub enum WebhookError {
    #[error(transparent)]
    Base(#[from] Error),
    #[error("Payment failed")]
    PaymentFailed,
}

impl WebhookError {
    pub fn message(&self) -> &'static str {
        match self {
            WebhookError::Base(Error::MalformedNotification(_)) => "Missing payment parameters",
            WebhookError::Base(Error::UnknownPayment(_)) => "Payment not found",
            WebhookError::Base(Error::SignatureInvalid) => "Invalid signature",
            WebhookError::PaymentFailed => "Payment failed",
            WebhookError::Base(_) => "Payment processing failed",
        }
    }
}

impl ResponseError for WebhookError {
    fn status_code(&self) -> StatusCode {
        StatusCode::OK
    }

    /// Creates full response for error.
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "status": "error",
            "message": self.message()
        }))
    }
}

pub fn scope() -> Scope {
    web::scope("/webhook").service(payment)
}

#[post("/payment")]
pub async fn payment(
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, WebhookError> {
    let notification: Notification = serde_json::from_slice(&body)
        .map_err(|e| Error::MalformedNotification(e.to_string()))?;
    let issuance = state
        .service
        .process_notification(&notification)
        .await
        .map_err(|err| {
            warn!(error = %err, "payment notification rejected");
            err
        })?;

    match issuance {
        Issuance::PreviouslyFailed => Err(WebhookError::PaymentFailed),
        issuance => {
            let receipt_number = issuance.receipt().map(|r| r.receipt_number.clone());
            info!(receipt_number = ?receipt_number, "payment notification processed");
            Ok(HttpResponse::Ok().json(json!({
                "status": "SUCCESS",
                "message": "Payment successful",
                "receipt_number": receipt_number,
            })))
        }
    }
}
