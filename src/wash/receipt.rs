//! Receipt numbering and rendering.
//!
//! A receipt number is `R`, six random characters from `[0-9A-Z]`, then the
//! last three digits of the settlement time in milliseconds, e.g. `R4K2Z9Q417`.
//! Receipts render to plain text (email body) and to a self-contained HTML page
//! suitable for printing or saving as PDF from a browser.

use super::{model::Wash, CURRENCY};
use chrono::{DateTime, FixedOffset};
use rand::Rng;
use std::fmt::Write;

const RECEIPT_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const RECEIPT_RANDOM_LEN: usize = 6;
const FALLBACK_BUSINESS_NAME: &str = "Car Wash";

#[must_use]
pub fn receipt_number(now_ms: i64) -> String {
    let mut rng = rand::thread_rng();
    let mut number = String::with_capacity(1 + RECEIPT_RANDOM_LEN + 3);
    number.push('R');
    for _ in 0..RECEIPT_RANDOM_LEN {
        number.push(char::from(
            RECEIPT_ALPHABET[rng.gen_range(0..RECEIPT_ALPHABET.len())],
        ));
    }
    let _ = write!(number, "{:03}", now_ms.rem_euclid(1000));
    number
}

/// Whole amounts print without decimals, anything else with two.
#[must_use]
pub fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{amount:.0}")
    } else {
        format!("{amount:.2}")
    }
}

/// Convert epoch milliseconds to a local time in `offset`.
#[must_use]
pub fn local_time(timestamp_ms: i64, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    DateTime::from_timestamp_millis(timestamp_ms).map(|utc| utc.with_timezone(&offset))
}

/// A wash viewed as a receipt.
#[derive(Debug, Clone, Copy)]
pub struct Receipt<'a> {
    wash: &'a Wash,
    business_name: &'a str,
    offset: FixedOffset,
}

impl<'a> Receipt<'a> {
    #[must_use]
    pub fn new(wash: &'a Wash, business_name: &'a str, offset: FixedOffset) -> Self {
        Self {
            wash,
            business_name,
            offset,
        }
    }

    /// Receipt number, or the wash id while the wash is unpaid.
    #[must_use]
    pub fn number(&self) -> &str {
        self.wash.receipt_no.as_deref().unwrap_or(&self.wash.id)
    }

    #[must_use]
    pub fn business_name(&self) -> &str {
        let name = self.business_name.trim();
        if name.is_empty() {
            FALLBACK_BUSINESS_NAME
        } else {
            name
        }
    }

    #[must_use]
    pub fn date(&self) -> String {
        local_time(self.wash.timestamp, self.offset)
            .map(|time| time.format("%d/%m/%Y").to_string())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn time(&self) -> String {
        local_time(self.wash.timestamp, self.offset)
            .map(|time| time.format("%H:%M").to_string())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn amount(&self) -> String {
        format!("{CURRENCY} {}", format_amount(self.wash.amount))
    }

    #[must_use]
    pub fn subject(&self) -> String {
        format!(
            "{} Receipt {}",
            self.business_name(),
            self.wash.receipt_no.as_deref().unwrap_or_default()
        )
        .trim()
        .to_string()
    }

    fn rows(&self) -> [(&'static str, String); 6] {
        [
            ("Plate", self.wash.plate.clone()),
            ("Model", self.wash.model.clone()),
            ("Services", self.wash.services_display()),
            ("Amount", self.amount()),
            ("Method", self.wash.method.to_string()),
            ("Date", format!("{} {}", self.date(), self.time())),
        ]
    }

    /// Plain-text body used for receipt emails.
    #[must_use]
    pub fn text(&self) -> String {
        let mut text = format!(
            "Thank you for your payment.\n\nReceipt: {}",
            self.number()
        );
        for (key, value) in self.rows() {
            let _ = write!(text, "\n{key}: {value}");
        }
        text
    }

    /// Printable HTML document.
    #[must_use]
    pub fn html(&self) -> String {
        let mut rows = String::new();
        for (key, value) in self.rows() {
            let _ = writeln!(
                rows,
                r#"    <div class="row"><div class="key">{key}</div><div class="value">{}</div></div>"#,
                escape_html(&value)
            );
        }

        format!(
            r#"<!doctype html>
<html>
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>{title}</title>
    <style>
      body {{ font-family: -apple-system, Segoe UI, Roboto, sans-serif; padding: 24px; color: #0f172a; }}
      .business {{ font-size: 14px; color: #475569; margin-bottom: 4px; }}
      .title {{ font-size: 20px; font-weight: 700; margin-bottom: 16px; }}
      .row {{ display: flex; justify-content: space-between; padding: 8px 0; border-bottom: 1px solid #e2e8f0; }}
      .key {{ color: #475569; }}
      .value {{ font-weight: 600; }}
      .footer {{ margin-top: 24px; font-size: 12px; color: #64748b; }}
    </style>
  </head>
  <body>
    <div class="business">{business}</div>
    <div class="title">{title}</div>
{rows}    <div class="footer">Thank you for your business.</div>
  </body>
</html>
"#,
            title = escape_html(&format!("Receipt {}", self.number())),
            business = escape_html(self.business_name()),
        )
    }
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
