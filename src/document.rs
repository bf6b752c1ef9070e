//! Receipt document rendering.
//!
//! A single page PDF 1.4 built from the base-14 Helvetica fonts, no embedded
//! fonts or images. Output only depends on the input so a lost document can be
//! rendered again byte for byte.

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use std::fmt::Write;

const PAGE_WIDTH: u32 = 595;
const PAGE_HEIGHT: u32 = 842;

/// Everything printed on a receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptDocument {
    pub organization: Option<String>,
    pub receipt_number: String,
    pub donor_name: String,
    /// minor units
    pub amount: i64,
    pub currency: String,
    pub transaction_id: String,
    /// unix seconds
    pub issued_at: i64,
}

impl ReceiptDocument {
    pub fn title(&self) -> &str {
        self.organization
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("Donation Receipt")
    }

    pub fn amount_text(&self) -> String {
        format_amount(self.amount, &self.currency)
    }

    pub fn date_text(&self) -> String {
        format_date(self.issued_at)
    }

    pub fn file_name(&self) -> String {
        file_name(&self.receipt_number)
    }

    fn rows(&self) -> [(&'static str, String); 5] {
        [
            ("Receipt Number", self.receipt_number.clone()),
            ("Donor Name", self.donor_name.clone()),
            ("Amount", self.amount_text()),
            ("Transaction ID", self.transaction_id.clone()),
            ("Date", self.date_text()),
        ]
    }
}

pub fn file_name(receipt_number: &str) -> String {
    format!("receipt_{}.pdf", receipt_number)
}

pub fn currency_symbol(code: &str) -> &str {
    match code {
        "INR" => "₹",
        "USD" => "$",
        "EUR" => "€",
        "GBP" => "£",
        _ => code,
    }
}

/// Minor units to `₹1234.50` style text.
pub fn format_amount(minor: i64, currency: &str) -> String {
    let symbol = currency_symbol(currency);
    let major = Decimal::new(minor, 2);
    if symbol == currency {
        format!("{} {}", currency, major)
    } else {
        format!("{}{}", symbol, major)
    }
}

/// `dd-mm-YYYY` in UTC.
pub fn format_date(ts: i64) -> String {
    Utc.timestamp_opt(ts, 0)
        .single()
        .map(|dt| dt.format("%d-%m-%Y").to_string())
        .unwrap_or_default()
}

/// Encode text as a PDF literal string body in WinAnsiEncoding.
fn pdf_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        let byte = match c {
            '₹' => {
                out.push_str("Rs.");
                continue;
            }
            '€' => 0x80,
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(c);
                continue;
            }
            c if (c as u32) < 0x20 => b' ',
            c if (c as u32) < 0x7f => c as u8,
            c if (0xa0..=0xff).contains(&(c as u32)) => c as u32 as u8,
            _ => b'?',
        };
        if byte < 0x80 {
            out.push(byte as char);
        } else {
            let _ = write!(out, "\\{:03o}", byte);
        }
    }
    out
}

fn text(content: &mut String, font: &str, size: u32, x: u32, y: u32, s: &str) {
    let _ = writeln!(
        content,
        "BT /{} {} Tf {} {} Td ({}) Tj ET",
        font,
        size,
        x,
        y,
        pdf_text(s)
    );
}

fn content_stream(doc: &ReceiptDocument) -> String {
    let mut content = String::new();
    text(&mut content, "F2", 20, 72, 770, doc.title());
    text(
        &mut content,
        "F1",
        11,
        72,
        745,
        "Thank you for your donation.",
    );
    let _ = writeln!(content, "72 730 m {} 730 l S", PAGE_WIDTH - 72);
    let mut y = 700;
    for (label, value) in doc.rows() {
        text(&mut content, "F2", 12, 72, y, label);
        text(&mut content, "F1", 12, 220, y, &value);
        y -= 24;
    }
    text(
        &mut content,
        "F1",
        9,
        72,
        100,
        "This is a computer generated receipt and does not require a signature.",
    );
    content
}

/// Render the receipt as PDF bytes.
pub fn render_receipt_pdf(doc: &ReceiptDocument) -> Vec<u8> {
    let content = content_stream(doc);
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_owned(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_owned(),
        format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
             /Resources << /Font << /F1 4 0 R /F2 5 0 R >> >> /Contents 6 0 R >>",
            PAGE_WIDTH, PAGE_HEIGHT
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_owned(),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>"
            .to_owned(),
        format!(
            "<< /Length {} >>\nstream\n{}endstream",
            content.len(),
            content
        ),
    ];

    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, obj) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, obj).as_bytes());
    }

    let xref = out.len();
    let mut tail = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for off in offsets {
        let _ = write!(tail, "{:010} 00000 n \n", off);
    }
    let _ = write!(
        tail,
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref
    );
    out.extend_from_slice(tail.as_bytes());
    out
}
