//! Payment signature verification.
//!
//! The checkout sends back `razorpay_signature`, the hex encoded HMAC-SHA256 of
//! `"{order_id}|{payment_id}"` keyed with the api key secret.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

/// Hex length of a SHA-256 mac.
const SIGNATURE_LEN: usize = 64;

#[derive(Clone)]
pub struct Verifier {
    secret: String,
}

impl fmt::Debug for Verifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Verifier").field("secret", &"****").finish()
    }
}

impl Verifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn mac(&self, order_id: &str, payment_id: &str) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(order_id.as_bytes());
        mac.update(b"|");
        mac.update(payment_id.as_bytes());
        mac
    }

    /// Hex signature for the order and payment pair.
    pub fn sign(&self, order_id: &str, payment_id: &str) -> String {
        hex::encode(self.mac(order_id, payment_id).finalize().into_bytes())
    }

    /// Check a caller supplied signature in constant time.
    ///
    /// Only the exact form produced by [`Verifier::sign`] is accepted, lowercase
    /// hex without surrounding whitespace.
    pub fn verify(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        if signature.len() != SIGNATURE_LEN
            || !signature
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        {
            return false;
        }
        let signature = match hex::decode(signature) {
            Ok(s) => s,
            Err(_) => return false,
        };
        self.mac(order_id, payment_id)
            .verify_slice(&signature)
            .is_ok()
    }
}
