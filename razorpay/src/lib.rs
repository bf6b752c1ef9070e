#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("gateway unavailable: {0}")]
    Unavailable(String),
    #[error("invalid gateway response: {0}")]
    InvalidResponse(String),
    #[error("invalid: {0}")]
    Invalid(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

pub type Result<T, E = Error> = core::result::Result<T, E>;

pub mod client;
pub use client::Razorpay;

pub mod gateway;
pub use gateway::{Gateway, NewOrder, Order};

pub mod signature;
pub use signature::Verifier;
