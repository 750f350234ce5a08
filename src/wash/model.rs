use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

pub const MISSING_FIELDS: &str = "Missing required fields";
pub const INVALID_AMOUNT: &str = "Invalid amount";
pub const INVALID_METHOD: &str = "Invalid payment method";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Mpesa,
    Card,
    Cash,
}

impl PaymentMethod {
    pub const ALL: [Self; 3] = [Self::Mpesa, Self::Card, Self::Cash];

    /// Wire and storage representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mpesa => "mpesa",
            Self::Card => "card",
            Self::Cash => "cash",
        }
    }

    /// Case-insensitive parse of the wire representation.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for PaymentMethod {
    // Receipts print the method upper-cased.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_ascii_uppercase())
    }
}

/// A logged wash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Wash {
    pub id: String,
    pub plate: String,
    pub model: String,
    pub services: Vec<String>,
    pub amount: f64,
    pub method: PaymentMethod,
    /// When the wash happened, epoch milliseconds.
    pub timestamp: i64,
    pub paid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_no: Option<String>,
    /// When the record was stored, epoch milliseconds.
    pub created_at: i64,
}

impl Wash {
    #[must_use]
    pub fn from_new(new: NewWash, id: String, created_at: i64) -> Self {
        Self {
            id,
            plate: new.plate,
            model: new.model,
            services: new.services,
            amount: new.amount,
            method: new.method,
            timestamp: new.timestamp,
            paid: false,
            receipt_no: None,
            created_at,
        }
    }

    #[must_use]
    pub fn services_display(&self) -> String {
        self.services.join(", ")
    }

    /// Case-insensitive substring search over plate, model and services.
    /// A blank query matches every wash.
    #[must_use]
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }

        self.plate.to_lowercase().contains(&query)
            || self.model.to_lowercase().contains(&query)
            || self
                .services
                .iter()
                .any(|service| service.to_lowercase().contains(&query))
    }
}

/// Generate the identifier of a new wash record.
#[must_use]
pub fn new_wash_id() -> String {
    Uuid::now_v7().to_string()
}

/// Body of `POST /createWash`.
///
/// Every field is optional at the wire level so that missing fields are
/// reported with one stable message instead of a deserializer error.
/// `service` is the legacy single-service field, used only when `services`
/// is absent or empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateWashRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

/// A validated wash that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewWash {
    pub plate: String,
    pub model: String,
    pub services: Vec<String>,
    pub amount: f64,
    pub method: PaymentMethod,
    pub timestamp: i64,
}

impl NewWash {
    /// Validate a create request.
    ///
    /// # Errors
    /// Returns the client-facing message describing why the request was rejected.
    pub fn validate(request: CreateWashRequest) -> Result<Self, &'static str> {
        let plate = required_text(request.plate).ok_or(MISSING_FIELDS)?;
        let model = required_text(request.model).ok_or(MISSING_FIELDS)?;

        let mut services: Vec<String> = request
            .services
            .unwrap_or_default()
            .into_iter()
            .filter_map(|service| required_text(Some(service)))
            .collect();
        if services.is_empty() {
            services.extend(required_text(request.service));
        }
        if services.is_empty() {
            return Err(MISSING_FIELDS);
        }

        let amount = request.amount.ok_or(MISSING_FIELDS)?;
        if !amount.is_finite() || amount < 0.0 {
            return Err(INVALID_AMOUNT);
        }

        let method = required_text(request.method).ok_or(MISSING_FIELDS)?;
        let method = PaymentMethod::parse(&method).ok_or(INVALID_METHOD)?;

        let timestamp = request
            .timestamp
            .filter(|timestamp| *timestamp > 0)
            .ok_or(MISSING_FIELDS)?;

        Ok(Self {
            plate,
            model,
            services,
            amount,
            method,
            timestamp,
        })
    }
}

fn required_text(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateWashRequest {
        CreateWashRequest {
            plate: Some(" KDA 123A ".to_string()),
            model: Some("Toyota Vitz".to_string()),
            services: Some(vec!["Body Wash".to_string(), "Waxing".to_string()]),
            service: None,
            amount: Some(1200.0),
            method: Some("mpesa".to_string()),
            timestamp: Some(1_700_000_000_000),
        }
    }

    #[test]
    fn validate_accepts_complete_request() {
        let wash = NewWash::validate(request()).expect("valid request");
        assert_eq!(wash.plate, "KDA 123A");
        assert_eq!(wash.services, vec!["Body Wash", "Waxing"]);
        assert_eq!(wash.method, PaymentMethod::Mpesa);
        assert_eq!(wash.amount, 1200.0);
    }

    #[test]
    fn validate_falls_back_to_legacy_service() {
        let mut req = request();
        req.services = Some(vec![]);
        req.service = Some("Engine Wash".to_string());
        let wash = NewWash::validate(req).expect("legacy service accepted");
        assert_eq!(wash.services, vec!["Engine Wash"]);
    }

    #[test]
    fn validate_rejects_missing_fields() {
        let cases: [fn(&mut CreateWashRequest); 7] = [
            |r| r.plate = None,
            |r| r.model = Some("   ".to_string()),
            |r| r.services = None,
            |r| r.amount = None,
            |r| r.method = None,
            |r| r.timestamp = None,
            |r| r.timestamp = Some(0),
        ];
        for mutate in cases {
            let mut req = request();
            mutate(&mut req);
            assert_eq!(NewWash::validate(req), Err(MISSING_FIELDS));
        }
    }

    #[test]
    fn validate_rejects_bad_amount_and_method() {
        let mut req = request();
        req.amount = Some(-1.0);
        assert_eq!(NewWash::validate(req), Err(INVALID_AMOUNT));

        let mut req = request();
        req.method = Some("bitcoin".to_string());
        assert_eq!(NewWash::validate(req), Err(INVALID_METHOD));
    }

    #[test]
    fn method_parse_is_case_insensitive() {
        assert_eq!(PaymentMethod::parse(" CARD "), Some(PaymentMethod::Card));
        assert_eq!(PaymentMethod::parse("ussd"), None);
        assert_eq!(PaymentMethod::Mpesa.to_string(), "MPESA");
    }

    #[test]
    fn matches_searches_plate_model_and_services() {
        let wash = Wash::from_new(
            NewWash::validate(request()).expect("valid request"),
            new_wash_id(),
            1,
        );
        assert!(wash.matches(""));
        assert!(wash.matches("kda"));
        assert!(wash.matches("VITZ"));
        assert!(wash.matches("wax"));
        assert!(!wash.matches("subaru"));
    }

    #[test]
    fn wash_serializes_camel_case() {
        let mut wash = Wash::from_new(NewWash::validate(request()).expect("valid"), "w1".into(), 5);
        wash.receipt_no = Some("RABC123456".to_string());
        let json = serde_json::to_value(&wash).expect("serialize");
        assert_eq!(json["receiptNo"], "RABC123456");
        assert_eq!(json["createdAt"], 5);
        assert_eq!(json["method"], "mpesa");
    }
}
