//! Router-level tests for the HTTP API.
//!
//! Each test builds the full application (middleware included) over a
//! `MemoryWashStore` and drives it with `tower::ServiceExt::oneshot`.

use crate::{
    api::{
        app,
        email::{EmailMessage, EmailSender},
        AppState,
    },
    wash::{
        MemoryWashStore, NewWash, PaymentMethod, PaymentOutcome, Settings, SettingsPatch, Wash,
        WashStore,
    },
};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    Router,
};
use chrono::FixedOffset;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

#[derive(Default)]
struct RecordingSender {
    sent: Mutex<Vec<EmailMessage>>,
    fail: bool,
}

impl RecordingSender {
    fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl EmailSender for RecordingSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        if self.fail {
            return Err(anyhow!("smtp down"));
        }
        self.sent
            .lock()
            .map_err(|_| anyhow!("poisoned"))?
            .push(message.clone());
        Ok(())
    }
}

/// Delegates to a `MemoryWashStore` but never answers the liveness check.
struct UnreachableStore(MemoryWashStore);

#[async_trait]
impl WashStore for UnreachableStore {
    async fn insert(&self, wash: NewWash) -> Result<Wash> {
        self.0.insert(wash).await
    }

    async fn get(&self, id: &str) -> Result<Option<Wash>> {
        self.0.get(id).await
    }

    async fn list(&self) -> Result<Vec<Wash>> {
        self.0.list().await
    }

    async fn mark_paid(&self, id: &str, receipt_no: &str) -> Result<Option<PaymentOutcome>> {
        self.0.mark_paid(id, receipt_no).await
    }

    async fn settings(&self) -> Result<Settings> {
        self.0.settings().await
    }

    async fn update_settings(&self, patch: SettingsPatch) -> Result<Settings> {
        self.0.update_settings(patch).await
    }

    async fn ping(&self) -> Result<()> {
        Err(anyhow!("connection refused"))
    }
}

struct TestApp {
    store: Arc<MemoryWashStore>,
    sender: Arc<RecordingSender>,
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        Self::build(RecordingSender::default(), true)
    }

    fn without_email() -> Self {
        Self::build(RecordingSender::default(), false)
    }

    fn failing() -> Self {
        Self::build(
            RecordingSender {
                fail: true,
                ..RecordingSender::default()
            },
            true,
        )
    }

    fn build(sender: RecordingSender, configured: bool) -> Self {
        let store = Arc::new(MemoryWashStore::new());
        let sender = Arc::new(sender);
        let email: Option<Arc<dyn EmailSender>> = if configured {
            Some(sender.clone())
        } else {
            None
        };
        let state = AppState::new(
            store.clone(),
            email,
            FixedOffset::east_opt(3 * 3600).expect("valid offset"),
        );
        Self {
            store,
            sender,
            router: app(Arc::new(state)),
        }
    }

    async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> Result<(StatusCode, Vec<u8>)> {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body)?)
            .await
            .context("router call failed")?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        Ok((status, bytes.to_vec()))
    }

    async fn json(&self, method: Method, uri: &str, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let (status, bytes) = self.call(method, uri, body).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, value))
    }

    /// Wait for background deliveries, then give stragglers a moment.
    async fn wait_for_emails(&self, expected: usize) -> Vec<EmailMessage> {
        for _ in 0..100 {
            if self.sender.sent().len() >= expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.sender.sent()
    }

    async fn create(&self, plate: &str, timestamp: i64) -> Result<String> {
        let (status, body) = self
            .json(
                Method::POST,
                "/createWash",
                Some(json!({
                    "plate": plate,
                    "model": "Toyota Vitz",
                    "services": ["Body Wash", "Tire Shine"],
                    "amount": 600,
                    "method": "mpesa",
                    "timestamp": timestamp,
                })),
            )
            .await?;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["id"]
            .as_str()
            .map(str::to_string)
            .context("id missing from response")
    }
}

// 2023-11-14T22:13:20Z
const TIMESTAMP: i64 = 1_700_000_000_000;

#[tokio::test]
async fn create_wash_stores_unpaid_record() -> Result<()> {
    let app = TestApp::new();
    let id = app.create("KDA 123A", TIMESTAMP).await?;

    let wash = app.store.get(&id).await?.context("stored")?;
    assert_eq!(wash.plate, "KDA 123A");
    assert_eq!(wash.amount, 600.0);
    assert_eq!(wash.method, PaymentMethod::Mpesa);
    assert!(!wash.paid);
    assert_eq!(wash.receipt_no, None);

    let (status, body) = app.json(Method::GET, &format!("/washes/{id}"), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id.as_str());
    assert_eq!(body["paid"], false);
    Ok(())
}

#[tokio::test]
async fn create_wash_accepts_legacy_service() -> Result<()> {
    let app = TestApp::new();
    let (status, body) = app
        .json(
            Method::POST,
            "/createWash",
            Some(json!({
                "plate": "KBB 222B",
                "model": "Subaru",
                "service": "Engine Wash",
                "amount": 200,
                "method": "cash",
                "timestamp": TIMESTAMP,
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    let id = body["id"].as_str().context("id")?;
    let wash = app.store.get(id).await?.context("stored")?;
    assert_eq!(wash.services, vec!["Engine Wash"]);
    Ok(())
}

#[tokio::test]
async fn create_wash_rejects_bad_input() -> Result<()> {
    let app = TestApp::new();

    let (status, body) = app
        .json(Method::POST, "/createWash", Some(json!({ "plate": "KDA 123A" })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields");

    // amount must be a number
    let (status, body) = app
        .json(
            Method::POST,
            "/createWash",
            Some(json!({
                "plate": "KDA 123A",
                "model": "Vitz",
                "services": ["Body Wash"],
                "amount": "400",
                "method": "mpesa",
                "timestamp": TIMESTAMP,
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields");

    let (status, _) = app.call(Method::POST, "/createWash", None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.call(Method::GET, "/createWash", None).await?;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    assert!(app.store.list().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn mark_paid_assigns_receipt_once() -> Result<()> {
    let app = TestApp::new();
    let id = app.create("KDA 123A", TIMESTAMP).await?;

    let (status, first) = app
        .json(Method::POST, "/markPaid", Some(json!({ "id": id })))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["ok"], true);
    let receipt_no = first["receiptNo"].as_str().context("receiptNo")?.to_string();
    assert!(receipt_no.starts_with('R'));
    assert_eq!(receipt_no.len(), 10);
    assert_eq!(first["data"]["paid"], true);
    assert_eq!(first["data"]["receiptNo"], receipt_no.as_str());

    let (status, second) = app
        .json(Method::POST, "/markPaid", Some(json!({ "id": id })))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["receiptNo"], receipt_no.as_str());
    Ok(())
}

#[tokio::test]
async fn mark_paid_errors() -> Result<()> {
    let app = TestApp::new();

    let (status, body) = app.json(Method::POST, "/markPaid", Some(json!({}))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing id");

    let (status, body) = app
        .json(Method::POST, "/markPaid", Some(json!({ "id": "nope" })))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not found");
    Ok(())
}

#[tokio::test]
async fn mpesa_callback_settles_on_success_only() -> Result<()> {
    let app = TestApp::new();
    let id = app.create("KDA 123A", TIMESTAMP).await?;

    let (status, body) = app
        .json(
            Method::POST,
            "/mpesaCallback",
            Some(json!({ "orderId": id, "status": "FAILED" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert!(!app.store.get(&id).await?.context("stored")?.paid);

    let (status, _) = app
        .json(
            Method::POST,
            "/mpesaCallback",
            Some(json!({ "orderId": id, "status": "SUCCESS", "amount": 600 })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    let wash = app.store.get(&id).await?.context("stored")?;
    assert!(wash.paid);
    assert!(wash.receipt_no.is_some());

    // unknown orders are acknowledged
    let (status, _) = app
        .json(
            Method::POST,
            "/mpesaCallback",
            Some(json!({ "orderId": "unknown", "status": "SUCCESS" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .json(Method::POST, "/mpesaCallback", Some(json!({ "status": "SUCCESS" })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing orderId");
    Ok(())
}

#[tokio::test]
async fn send_receipt_email_renders_receipt() -> Result<()> {
    let app = TestApp::new();
    let id = app.create("KDA 123A", TIMESTAMP).await?;
    app.json(Method::POST, "/markPaid", Some(json!({ "id": id })))
        .await?;

    let (status, body) = app
        .json(
            Method::POST,
            "/sendReceiptEmail",
            Some(json!({ "washId": id, "to": "customer@example.com", "businessName": "Splash" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "{body}");

    let sent = app.sender.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "customer@example.com");
    assert!(sent[0].subject.starts_with("Splash Receipt R"));
    assert!(sent[0].text.contains("Plate: KDA 123A"));
    assert!(sent[0].text.contains("Amount: KES 600"));
    assert!(sent[0].text.contains("Date: 15/11/2023 01:13"));
    Ok(())
}

#[tokio::test]
async fn send_receipt_email_errors() -> Result<()> {
    let app = TestApp::new();

    let (status, body) = app
        .json(Method::POST, "/sendReceiptEmail", Some(json!({ "washId": "x" })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing washId or to");

    let (status, _) = app
        .json(
            Method::POST,
            "/sendReceiptEmail",
            Some(json!({ "washId": "x", "to": "a@b.co" })),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let unconfigured = TestApp::without_email();
    let (status, body) = unconfigured
        .json(
            Method::POST,
            "/sendReceiptEmail",
            Some(json!({ "washId": "x", "to": "a@b.co" })),
        )
        .await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Email not configured");

    let failing = TestApp::failing();
    let id = failing.create("KDA 123A", TIMESTAMP).await?;
    let (status, body) = failing
        .json(
            Method::POST,
            "/sendReceiptEmail",
            Some(json!({ "washId": id, "to": "a@b.co" })),
        )
        .await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Server error");
    Ok(())
}

#[tokio::test]
async fn auto_email_on_first_payment() -> Result<()> {
    let app = TestApp::new();
    let (status, _) = app
        .json(
            Method::PUT,
            "/settings",
            Some(json!({
                "businessName": "Splash",
                "defaultReceiptEmail": "owner@splash.co.ke",
                "autoEmailReceipts": true,
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let id = app.create("KDA 123A", TIMESTAMP).await?;
    app.json(Method::POST, "/markPaid", Some(json!({ "id": id })))
        .await?;
    app.json(Method::POST, "/markPaid", Some(json!({ "id": id })))
        .await?;

    // delivery runs in a background task
    let sent = app.wait_for_emails(1).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "owner@splash.co.ke");
    assert!(sent[0].subject.starts_with("Splash Receipt R"));
    Ok(())
}

#[tokio::test]
async fn auto_email_needs_opt_in_and_recipient() -> Result<()> {
    let patches = [
        json!({ "defaultReceiptEmail": "owner@splash.co.ke", "autoEmailReceipts": false }),
        json!({ "autoEmailReceipts": true }),
    ];

    for patch in patches {
        let app = TestApp::new();
        let (status, _) = app.json(Method::PUT, "/settings", Some(patch.clone())).await?;
        assert_eq!(status, StatusCode::OK);

        let id = app.create("KDA 123A", TIMESTAMP).await?;
        let (status, _) = app
            .json(Method::POST, "/markPaid", Some(json!({ "id": id })))
            .await?;
        assert_eq!(status, StatusCode::OK);

        assert!(app.wait_for_emails(1).await.is_empty(), "{patch}");
    }
    Ok(())
}

#[tokio::test]
async fn mpesa_success_sends_auto_email() -> Result<()> {
    let app = TestApp::new();
    app.json(
        Method::PUT,
        "/settings",
        Some(json!({
            "defaultReceiptEmail": "owner@splash.co.ke",
            "autoEmailReceipts": true,
        })),
    )
    .await?;

    let id = app.create("KDA 123A", TIMESTAMP).await?;
    let (status, _) = app
        .json(
            Method::POST,
            "/mpesaCallback",
            Some(json!({ "orderId": id, "status": "SUCCESS" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    // a retried callback does not send twice
    app.json(
        Method::POST,
        "/mpesaCallback",
        Some(json!({ "orderId": id, "status": "SUCCESS" })),
    )
    .await?;

    let sent = app.wait_for_emails(1).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "owner@splash.co.ke");
    assert!(sent[0].text.contains("Plate: KDA 123A"));
    Ok(())
}

#[tokio::test]
async fn list_washes_searches_and_limits() -> Result<()> {
    let app = TestApp::new();
    app.create("KAA 001A", TIMESTAMP).await?;
    app.create("KBB 002B", TIMESTAMP + 1_000).await?;
    app.create("KCC 003C", TIMESTAMP + 2_000).await?;

    let (status, body) = app.json(Method::GET, "/washes", None).await?;
    assert_eq!(status, StatusCode::OK);
    let plates: Vec<&str> = body
        .as_array()
        .context("array")?
        .iter()
        .filter_map(|wash| wash["plate"].as_str())
        .collect();
    assert_eq!(plates, vec!["KCC 003C", "KBB 002B", "KAA 001A"]);

    let (_, body) = app.json(Method::GET, "/washes?q=kbb", None).await?;
    assert_eq!(body.as_array().map(Vec::len), Some(1));

    let (_, body) = app.json(Method::GET, "/washes?q=tire&limit=2", None).await?;
    assert_eq!(body.as_array().map(Vec::len), Some(2));

    let (status, body) = app.json(Method::GET, "/washes?limit=abc", None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid query");

    let (status, _) = app.json(Method::GET, "/washes/missing", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn receipt_page_and_text() -> Result<()> {
    let app = TestApp::new();
    app.store
        .seed(Wash {
            id: "w-1".to_string(),
            plate: "KDA 123A".to_string(),
            model: "Toyota Vitz".to_string(),
            services: vec!["Waxing".to_string()],
            amount: 800.0,
            method: PaymentMethod::Card,
            timestamp: TIMESTAMP,
            paid: true,
            receipt_no: Some("RXYZ789012".to_string()),
            created_at: TIMESTAMP,
        })
        .await;

    let (status, html) = app.call(Method::GET, "/receipts/w-1", None).await?;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(html)?;
    assert!(html.starts_with("<!doctype html>"));
    assert!(html.contains("Receipt RXYZ789012"));
    assert!(html.contains("My Car Wash"));

    let (status, text) = app
        .call(Method::GET, "/receipts/w-1?format=text", None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(text)?;
    assert!(text.contains("Method: CARD"));

    let (status, body) = app
        .json(Method::GET, "/receipts/w-1?format=pdf", None)
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid query");

    let (status, _) = app.call(Method::GET, "/receipts/nope", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn reports_summary_and_csv() -> Result<()> {
    let app = TestApp::new();
    let now = crate::wash::now_ms();
    app.create("KAA 001A", now).await?;
    app.create("KBB 002B", now).await?;

    let (status, body) = app
        .json(Method::GET, "/reports/summary?range=7d", None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["range"], "7d");
    assert_eq!(body["daily"].as_array().map(Vec::len), Some(7));
    assert_eq!(body["daily"][6]["washes"], 2);
    assert_eq!(body["totalWashes"], 2);
    assert_eq!(body["revenue"]["mpesa"], 1200.0);
    assert_eq!(body["unpaid"], 2);

    let (_, body) = app.json(Method::GET, "/reports/summary", None).await?;
    assert_eq!(body["range"], "30d");

    let (status, body) = app
        .json(Method::GET, "/reports/summary?range=1y", None)
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid query");

    let (status, csv) = app.call(Method::GET, "/reports/washes.csv", None).await?;
    assert_eq!(status, StatusCode::OK);
    let csv = String::from_utf8(csv)?;
    assert_eq!(csv.lines().count(), 3);
    assert!(csv.starts_with("\"Receipt ID\""));
    Ok(())
}

#[tokio::test]
async fn settings_roundtrip_and_validation() -> Result<()> {
    let app = TestApp::new();

    let (status, body) = app.json(Method::GET, "/settings", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["businessName"], "My Car Wash");
    assert_eq!(body["autoEmailReceipts"], false);

    let (status, body) = app
        .json(
            Method::PUT,
            "/settings",
            Some(json!({ "defaultReceiptEmail": "not-an-email" })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid email");

    let (status, body) = app
        .json(Method::PUT, "/settings", Some(json!({ "businessName": "Splash" })))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["businessName"], "Splash");
    assert_eq!(body["defaultReceiptEmail"], "");
    Ok(())
}

#[tokio::test]
async fn catalog_health_and_openapi() -> Result<()> {
    let app = TestApp::new();

    let (status, body) = app.json(Method::GET, "/services", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["name"], "Body Wash");
    assert_eq!(body[0]["price"], 400.0);

    let (status, body) = app.json(Method::GET, "/health", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "carwash");
    assert_eq!(body["store"], "ok");

    let (status, body) = app.json(Method::GET, "/openapi.json", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/createWash"].is_object());
    Ok(())
}

#[tokio::test]
async fn health_reports_unreachable_store() -> Result<()> {
    let state = AppState::new(
        Arc::new(UnreachableStore(MemoryWashStore::new())),
        None,
        FixedOffset::east_opt(3 * 3600).context("offset")?,
    );
    let response = app(Arc::new(state))
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = to_bytes(response.into_body(), usize::MAX).await?;
    let body: Value = serde_json::from_slice(&body)?;
    assert_eq!(body["store"], "error");
    assert_eq!(body["name"], "carwash");
    Ok(())
}

#[tokio::test]
async fn responses_carry_request_id() -> Result<()> {
    let app = TestApp::new();
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/services")
                .header("x-request-id", "req-123")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|value| value.to_str().ok()),
        Some("req-123")
    );

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/services").body(Body::empty())?)
        .await?;
    assert!(response.headers().contains_key("x-request-id"));
    Ok(())
}
