use super::ApiClient;
use crate::wash::{now_ms, receipt::local_time, CreateWashRequest, NewWash, Settings, SettingsPatch, Wash};
use anyhow::{Context, Result};
use chrono::FixedOffset;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

/// How many of today's washes the dashboard lists.
const TODAY_LIMIT: usize = 3;

/// Washes in the order they were added, plus the business settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookState {
    pub washes: Vec<Wash>,
    pub settings: Settings,
}

impl BookState {
    /// Mark `id` paid, keeping a receipt number it already has.
    /// Returns false when the wash is not in the book.
    pub fn settle(&mut self, id: &str, receipt_no: &str) -> bool {
        let Some(wash) = self.washes.iter_mut().find(|wash| wash.id == id) else {
            return false;
        };
        wash.paid = true;
        if wash.receipt_no.is_none() && !receipt_no.is_empty() {
            wash.receipt_no = Some(receipt_no.to_string());
        }
        true
    }

    /// The newest washes logged on the same local day as `now_ms`.
    #[must_use]
    pub fn today(&self, now_ms: i64, offset: FixedOffset) -> Vec<Wash> {
        let Some(today) = local_time(now_ms, offset).map(|time| time.date_naive()) else {
            return Vec::new();
        };

        self.washes
            .iter()
            .rev()
            .filter(|wash| {
                local_time(wash.timestamp, offset).is_some_and(|time| time.date_naive() == today)
            })
            .take(TODAY_LIMIT)
            .cloned()
            .collect()
    }
}

/// Observable, in-process copy of the wash log.
///
/// Cheap to clone. Every change is broadcast to subscribers through a watch
/// channel, so a UI can re-render from `subscribe()` without polling.
#[derive(Clone)]
pub struct WashBook {
    api: ApiClient,
    tx: Arc<watch::Sender<BookState>>,
}

impl WashBook {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        let (tx, _rx) = watch::channel(BookState::default());
        Self {
            api,
            tx: Arc::new(tx),
        }
    }

    /// Subscribe to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<BookState> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> BookState {
        self.tx.borrow().clone()
    }

    /// Replace the local copy with what the server holds.
    ///
    /// # Errors
    /// Returns an error if either request fails.
    pub async fn refresh(&self) -> Result<()> {
        let mut washes = self.api.list_washes(None, None).await?;
        // the server lists newest first, the book keeps insertion order
        washes.reverse();
        let settings = self.api.settings().await?;

        debug!("loaded {} washes", washes.len());
        self.tx.send_replace(BookState { washes, settings });
        Ok(())
    }

    /// Log a wash through the API and append it to the book.
    ///
    /// # Errors
    /// Returns the validation message without calling the API when the entry
    /// is incomplete, or the server's error when the request fails.
    pub async fn add_wash(&self, request: CreateWashRequest) -> Result<Wash> {
        let new_wash = NewWash::validate(request.clone())
            .map_err(anyhow::Error::msg)
            .context("Failed to create wash")?;

        let id = self.api.create_wash(&request).await?;
        let wash = Wash::from_new(new_wash, id, now_ms());

        info!(wash_id = %wash.id, "wash added");
        self.tx.send_modify(|state| state.washes.push(wash.clone()));
        Ok(wash)
    }

    /// Mark a wash paid through the API and return its receipt number.
    ///
    /// # Errors
    /// Returns the server's error when the request fails.
    pub async fn mark_paid(&self, id: &str) -> Result<String> {
        let response = self.api.mark_paid(id).await?;

        let mut receipt_no = response.receipt_no;
        self.tx.send_modify(|state| {
            state.settle(id, &receipt_no);
            if let Some(kept) = state
                .washes
                .iter()
                .find(|wash| wash.id == id)
                .and_then(|wash| wash.receipt_no.clone())
            {
                receipt_no = kept;
            }
        });

        Ok(receipt_no)
    }

    /// Merge settings locally.
    pub fn update_settings(&self, patch: SettingsPatch) {
        self.tx.send_modify(|state| state.settings.apply(patch));
    }

    /// Drop every local wash. Settings are kept.
    pub fn clear(&self) {
        self.tx.send_modify(|state| state.washes.clear());
    }

    #[must_use]
    pub fn today(&self, now_ms: i64, offset: FixedOffset) -> Vec<Wash> {
        self.tx.borrow().today(now_ms, offset)
    }
}
