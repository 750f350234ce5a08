//! Fixed service price list.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

const SERVICE_PRICES: [(&str, f64); 5] = [
    ("Body Wash", 400.0),
    ("Interior Cleaning", 500.0),
    ("Waxing", 800.0),
    ("Tire Shine", 200.0),
    ("Engine Wash", 200.0),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ServiceItem {
    pub name: String,
    pub price: f64,
}

#[must_use]
pub fn catalog() -> Vec<ServiceItem> {
    SERVICE_PRICES
        .iter()
        .map(|(name, price)| ServiceItem {
            name: (*name).to_string(),
            price: *price,
        })
        .collect()
}

/// Price of a service, matched case-insensitively.
#[must_use]
pub fn price_of(service: &str) -> Option<f64> {
    let service = service.trim();
    SERVICE_PRICES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(service))
        .map(|(_, price)| *price)
}

/// Sum of catalog prices; unknown services count as zero.
#[must_use]
pub fn catalog_total<S: AsRef<str>>(services: &[S]) -> f64 {
    services
        .iter()
        .filter_map(|service| price_of(service.as_ref()))
        .sum()
}
