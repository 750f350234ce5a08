//! Wash persistence.
//!
//! `WashStore` is the seam between the HTTP layer and the database. Two
//! implementations exist: `PgWashStore` for `PostgreSQL` and `MemoryWashStore`
//! for local runs without a DSN and for tests. Both share the same settlement
//! rule: marking a wash paid twice keeps the first receipt number.

use super::{
    model::{NewWash, Wash},
    settings::{Settings, SettingsPatch},
};
use anyhow::Result;
use async_trait::async_trait;

mod memory;
mod postgres;

pub use self::memory::MemoryWashStore;
pub use self::postgres::PgWashStore;

/// Result of settling a wash.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentOutcome {
    pub wash: Wash,
    /// `false` when the wash had already been paid before this call.
    pub newly_paid: bool,
}

#[async_trait]
pub trait WashStore: Send + Sync {
    /// Store a validated wash and return the persisted record.
    async fn insert(&self, wash: NewWash) -> Result<Wash>;

    async fn get(&self, id: &str) -> Result<Option<Wash>>;

    /// All washes, most recent `timestamp` first.
    async fn list(&self) -> Result<Vec<Wash>>;

    /// Mark a wash paid with `receipt_no` unless it already is.
    /// Returns `None` when no wash has this id.
    async fn mark_paid(&self, id: &str, receipt_no: &str) -> Result<Option<PaymentOutcome>>;

    async fn settings(&self) -> Result<Settings>;

    async fn update_settings(&self, patch: SettingsPatch) -> Result<Settings>;

    /// Cheap liveness probe for `/health`.
    async fn ping(&self) -> Result<()>;
}
