//! Receipt email delivery.

use crate::{document::ReceiptDocument, Error, Result};
use base64::engine::{general_purpose, Engine};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

pub const RESEND_API_URL: &str = "https://api.resend.com/emails";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub attachments: Vec<Attachment>,
}

impl OutgoingEmail {
    /// Receipt email with the pdf attached as `receipt_{number}.pdf`.
    pub fn receipt(to: &str, subject: &str, doc: &ReceiptDocument, pdf: Vec<u8>) -> Self {
        Self {
            to: to.to_owned(),
            subject: subject.to_owned(),
            html: receipt_html(doc),
            attachments: vec![Attachment {
                filename: doc.file_name(),
                content_type: "application/pdf".to_owned(),
                content: pdf,
            }],
        }
    }
}

/// the email transport trait for multiple backends
#[async_trait::async_trait]
pub trait Mailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()>;
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn receipt_html(doc: &ReceiptDocument) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: Helvetica, Arial, sans-serif; color: #222;">
<h2>{title}</h2>
<p>Dear {donor_name},</p>
<p>Thank you for your generous donation of <strong>{amount}</strong>.</p>
<table cellpadding="4">
<tr><td>Receipt Number</td><td>{receipt_number}</td></tr>
<tr><td>Transaction ID</td><td>{transaction_id}</td></tr>
<tr><td>Date</td><td>{date}</td></tr>
</table>
<p>Your receipt is attached to this email.</p>
</body>
</html>
"#,
        title = escape(doc.title()),
        donor_name = escape(&doc.donor_name),
        amount = escape(&doc.amount_text()),
        receipt_number = escape(&doc.receipt_number),
        transaction_id = escape(&doc.transaction_id),
        date = escape(&doc.date_text()),
    )
}

#[derive(Serialize)]
struct ResendAttachment<'a> {
    filename: &'a str,
    content: String,
}

#[derive(Serialize)]
struct ResendRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    html: &'a str,
    attachments: Vec<ResendAttachment<'a>>,
}

/// Sends through the Resend email api.
#[derive(Clone)]
pub struct ResendMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl std::fmt::Debug for ResendMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResendMailer")
            .field("api_url", &self.api_url)
            .field("from", &self.from)
            .finish_non_exhaustive()
    }
}

impl ResendMailer {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        from: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Message(e.to_string()))?;
        Ok(Self {
            client,
            api_url: api_url.into(),
            api_key: api_key.into(),
            from: from.into(),
        })
    }
}

#[async_trait::async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        let body = ResendRequest {
            from: &self.from,
            to: vec![&email.to],
            subject: &email.subject,
            html: &email.html,
            attachments: email
                .attachments
                .iter()
                .map(|a| ResendAttachment {
                    filename: &a.filename,
                    content: general_purpose::STANDARD.encode(&a.content),
                })
                .collect(),
        };
        let res = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::DeliveryFailure(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            warn!(status = %status, body = %text, "email api rejected the message");
            return Err(Error::DeliveryFailure(format!("status {}", status)));
        }
        debug!(to = %email.to, subject = %email.subject, "email sent");
        Ok(())
    }
}

/// Used when no email api key is configured.
#[derive(Debug, Clone, Default)]
pub struct DisabledMailer;

#[async_trait::async_trait]
impl Mailer for DisabledMailer {
    async fn send(&self, _email: &OutgoingEmail) -> Result<()> {
        Err(Error::DeliveryFailure(
            "email delivery is not configured".to_owned(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> ReceiptDocument {
        ReceiptDocument {
            organization: None,
            receipt_number: "TR25020001".to_owned(),
            donor_name: "Ravi <b>&</b>".to_owned(),
            amount: 50_000,
            currency: "INR".to_owned(),
            transaction_id: "order_Nk1".to_owned(),
            issued_at: 1_739_527_200,
        }
    }

    #[test]
    fn html_context() {
        let html = receipt_html(&doc());
        assert!(html.contains("<h2>Donation Receipt</h2>"));
        assert!(html.contains("Dear Ravi &lt;b&gt;&amp;&lt;/b&gt;,"));
        assert!(html.contains("<strong>₹500.00</strong>"));
        assert!(html.contains("<td>TR25020001</td>"));
        assert!(html.contains("<td>order_Nk1</td>"));
        assert!(html.contains("<td>14-02-2025</td>"));
    }

    #[test]
    fn receipt_email() {
        let email = OutgoingEmail::receipt("a@b.c", "Receipt", &doc(), b"%PDF".to_vec());
        assert_eq!(email.to, "a@b.c");
        assert_eq!(email.attachments.len(), 1);
        assert_eq!(email.attachments[0].filename, "receipt_TR25020001.pdf");
        assert_eq!(email.attachments[0].content_type, "application/pdf");
    }

    #[tokio::test]
    async fn disabled() {
        let email = OutgoingEmail::receipt("a@b.c", "Receipt", &doc(), vec![]);
        assert!(matches!(
            DisabledMailer.send(&email).await,
            Err(Error::DeliveryFailure(_))
        ));
    }
}
