use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use std::time::{SystemTime, UNIX_EPOCH};
pub mod api;
mod app;
pub mod document;
pub mod issuance;
pub mod lifecycle;
pub mod mailer;
pub mod numbering;
mod service;
pub mod setting;
pub mod storage;
pub mod webhook;

pub use {
    app::*,
    issuance::{Delivery, Issuance, Notification},
    lifecycle::Transition,
    service::{Donation, NewDonation, Options, PaymentSummary, Service},
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    DbErr(#[from] sea_orm::DbErr),
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("malformed notification: {0}")]
    MalformedNotification(String),
    #[error("unknown payment: {0}")]
    UnknownPayment(String),
    #[error("invalid signature")]
    SignatureInvalid,
    #[error("payment gateway unavailable, please try again")]
    GatewayUnavailable(#[from] razorpay_client::Error),
    #[error("receipt sequence exhausted for period {0}")]
    SequenceExhausted(String),
    #[error("email delivery failed: {0}")]
    DeliveryFailure(String),
    #[error("{0}")]
    InvalidParam(String),
    #[error("invalid setting: {0}")]
    InvalidSetting(String),
    #[error("receipt issuance failed: {0}")]
    Issuance(#[source] Box<Error>),
    #[error("{0}")]
    Message(String),
    #[error("{0}")]
    Str(&'static str),
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidParam(_) | Error::MalformedNotification(_) | Error::SignatureInvalid => {
                StatusCode::BAD_REQUEST
            }
            Error::UnknownPayment(_) => StatusCode::NOT_FOUND,
            Error::GatewayUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Creates full response for error.
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": true,
            "status_code": self.status_code().as_u16(),
            "message": self.to_string()
        }))
    }
}

pub type Result<T, E = Error> = core::result::Result<T, E>;

pub fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
