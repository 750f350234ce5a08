//! # Carwash (wash log, payments & receipts)
//!
//! `carwash` is the backend of a small car-wash business. Attendants log each
//! wash (plate, model, services, amount, payment method), the wash is later
//! marked paid and receives a receipt number, and the receipt can be emailed
//! to the customer or rendered as a printable page.
//!
//! ## Storage
//!
//! Every wash is a flat record in a single collection. The service runs against
//! `PostgreSQL` when a DSN is configured and falls back to an in-memory store
//! otherwise, which is what local development and the test-suite use.
//!
//! ## Payments
//!
//! Washes are settled either by the attendant (`/markPaid`) or by the M-Pesa
//! payment callback (`/mpesaCallback`). Settling is idempotent: a wash that is
//! already paid keeps the receipt number it was first given.
//!
//! ## Client
//!
//! The [`client`] module holds a typed HTTP client for the API and `WashBook`,
//! an observable in-process copy of the washes and settings that front-ends can
//! subscribe to.

pub mod api;
pub mod cli;
pub mod client;
pub mod wash;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
