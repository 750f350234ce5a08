//! Typed HTTP client for the carwash API.
//!
//! [`ApiClient`] wraps every endpoint the front-ends use. [`WashBook`] keeps an
//! observable copy of the washes and settings on top of it.

mod book;

pub use book::{BookState, WashBook};

use crate::{
    api::types::{
        CreateWashResponse, MarkPaidRequest, MarkPaidResponse, OkResponse,
        SendReceiptEmailRequest,
    },
    wash::{catalog::ServiceItem, CreateWashRequest, Settings, SettingsPatch, Wash},
    APP_USER_AGENT,
};
use anyhow::{anyhow, Context, Result};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, instrument};
use url::Url;

pub const DEFAULT_API_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    /// # Errors
    /// Returns an error if `base_url` is not an http(s) URL or the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = base_url_of(base_url)?;
        let client = Client::builder().user_agent(APP_USER_AGENT).build()?;

        Ok(Self { base_url, client })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        let url = format!("{}{endpoint}", self.base_url);
        debug!("endpoint URL: {}", url);
        url
    }

    /// `{base}/{collection}/{id}` with `id` percent-encoded as one path segment.
    fn resource_url(&self, collection: &str, id: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|()| anyhow!("Error building URL: {} cannot be a base", self.base_url))?
            .pop_if_empty()
            .push(collection)
            .push(id);
        debug!("endpoint URL: {}", url);
        Ok(url)
    }

    /// Log a wash and return its id.
    ///
    /// # Errors
    /// Returns the server's error message on a non-2xx response.
    #[instrument(skip(self, request))]
    pub async fn create_wash(&self, request: &CreateWashRequest) -> Result<String> {
        let response: CreateWashResponse =
            send(self.client.post(self.url("/createWash")).json(request)).await?;
        Ok(response.id)
    }

    /// # Errors
    /// Returns the server's error message on a non-2xx response.
    #[instrument(skip(self))]
    pub async fn mark_paid(&self, id: &str) -> Result<MarkPaidResponse> {
        let request = MarkPaidRequest {
            id: Some(id.to_string()),
        };
        send(self.client.post(self.url("/markPaid")).json(&request)).await
    }

    /// # Errors
    /// Returns the server's error message on a non-2xx response.
    #[instrument(skip(self, business_name))]
    pub async fn send_receipt_email(
        &self,
        wash_id: &str,
        to: &str,
        business_name: Option<&str>,
    ) -> Result<()> {
        let request = SendReceiptEmailRequest {
            wash_id: Some(wash_id.to_string()),
            to: Some(to.to_string()),
            business_name: business_name.map(str::to_string),
        };
        let _: OkResponse =
            send(self.client.post(self.url("/sendReceiptEmail")).json(&request)).await?;
        Ok(())
    }

    /// Washes, most recent first.
    ///
    /// # Errors
    /// Returns the server's error message on a non-2xx response.
    #[instrument(skip(self))]
    pub async fn list_washes(&self, query: Option<&str>, limit: Option<usize>) -> Result<Vec<Wash>> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(query) = query {
            params.push(("q", query.to_string()));
        }
        if let Some(limit) = limit {
            params.push(("limit", limit.to_string()));
        }
        send(self.client.get(self.url("/washes")).query(&params)).await
    }

    /// # Errors
    /// Returns the server's error message on a non-2xx response.
    #[instrument(skip(self))]
    pub async fn wash(&self, id: &str) -> Result<Wash> {
        send(self.client.get(self.resource_url("washes", id)?)).await
    }

    /// # Errors
    /// Returns the server's error message on a non-2xx response.
    pub async fn services(&self) -> Result<Vec<ServiceItem>> {
        send(self.client.get(self.url("/services"))).await
    }

    /// # Errors
    /// Returns the server's error message on a non-2xx response.
    pub async fn settings(&self) -> Result<Settings> {
        send(self.client.get(self.url("/settings"))).await
    }

    /// # Errors
    /// Returns the server's error message on a non-2xx response.
    #[instrument(skip(self))]
    pub async fn update_settings(&self, patch: &SettingsPatch) -> Result<Settings> {
        send(self.client.put(self.url("/settings")).json(patch)).await
    }
}

async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
    let response = request.send().await?;

    if !response.status().is_success() {
        let status = response.status();
        let body: Value = response.json().await.unwrap_or_default();
        let error_message = body["error"].as_str().unwrap_or_default();

        error!("Request failed: {} {}", status, error_message);

        return Err(if error_message.is_empty() {
            anyhow!("{status}")
        } else {
            anyhow!("{status}, {error_message}")
        });
    }

    response
        .json()
        .await
        .context("Failed to decode API response")
}

/// Normalise the API base URL: http(s) only, explicit port, no trailing slash.
fn base_url_of(raw: &str) -> Result<String> {
    let url = Url::parse(raw.trim()).with_context(|| format!("Invalid API URL: {raw}"))?;

    let scheme = url.scheme();
    let host = url
        .host_str()
        .ok_or_else(|| anyhow!("Error parsing URL: no host specified"))?;

    let port = match url.port() {
        Some(p) => p,
        None => match scheme {
            "http" => 80,
            "https" => 443,
            _ => return Err(anyhow!("Error parsing URL: unsupported scheme {}", scheme)),
        },
    };

    let path = url.path().trim_end_matches('/');

    Ok(format!("{scheme}://{host}:{port}{path}"))
}
