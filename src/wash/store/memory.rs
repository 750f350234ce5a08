use super::{PaymentOutcome, WashStore};
use crate::wash::{
    model::{new_wash_id, NewWash, Wash},
    now_ms,
    settings::{Settings, SettingsPatch},
};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct State {
    washes: HashMap<String, Wash>,
    settings: Settings,
}

/// Process-local store. Data is lost on restart.
#[derive(Debug, Default)]
pub struct MemoryWashStore {
    state: RwLock<State>,
}

impl MemoryWashStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully-formed record, keeping its id and payment state.
    pub async fn seed(&self, wash: Wash) {
        self.state.write().await.washes.insert(wash.id.clone(), wash);
    }
}

#[async_trait]
impl WashStore for MemoryWashStore {
    async fn insert(&self, wash: NewWash) -> Result<Wash> {
        let wash = Wash::from_new(wash, new_wash_id(), now_ms());
        self.state
            .write()
            .await
            .washes
            .insert(wash.id.clone(), wash.clone());
        Ok(wash)
    }

    async fn get(&self, id: &str) -> Result<Option<Wash>> {
        Ok(self.state.read().await.washes.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<Wash>> {
        let mut washes: Vec<Wash> = self.state.read().await.washes.values().cloned().collect();
        washes.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(washes)
    }

    async fn mark_paid(&self, id: &str, receipt_no: &str) -> Result<Option<PaymentOutcome>> {
        let mut state = self.state.write().await;
        let Some(wash) = state.washes.get_mut(id) else {
            return Ok(None);
        };

        let newly_paid = !wash.paid;
        wash.paid = true;
        if wash.receipt_no.is_none() {
            wash.receipt_no = Some(receipt_no.to_string());
        }

        Ok(Some(PaymentOutcome {
            wash: wash.clone(),
            newly_paid,
        }))
    }

    async fn settings(&self) -> Result<Settings> {
        Ok(self.state.read().await.settings.clone())
    }

    async fn update_settings(&self, patch: SettingsPatch) -> Result<Settings> {
        let mut state = self.state.write().await;
        state.settings.apply(patch);
        Ok(state.settings.clone())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
