//! Wash domain: records, receipts, reports and storage.
//!
//! Everything in here is independent of HTTP so the same rules apply whether a
//! wash arrives through the API, the CLI or a test.

pub mod catalog;
pub mod model;
pub mod receipt;
pub mod report;
pub mod settings;
pub mod store;

pub use self::model::{CreateWashRequest, NewWash, PaymentMethod, Wash};
pub use self::settings::{Settings, SettingsPatch};
pub use self::store::{MemoryWashStore, PaymentOutcome, PgWashStore, WashStore};

/// Currency every amount is expressed in.
pub const CURRENCY: &str = "KES";

/// Current wall-clock time in epoch milliseconds.
#[must_use]
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
