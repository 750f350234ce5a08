use crate::api::handlers::{health, payments, receipts, reports, settings, washes};
use utoipa::openapi::{Contact, InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    // Reuse the same router wiring and only return the generated OpenAPI spec.
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Build the router that also drives the `OpenAPI` document.
///
/// Add new endpoints here via `.routes(routes!(...))` so they are both served
/// and included in the generated `OpenAPI` spec.
pub(crate) fn api_router() -> OpenApiRouter {
    let mut router = OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(washes::create_wash))
        .routes(routes!(washes::list_washes))
        .routes(routes!(washes::get_wash))
        .routes(routes!(washes::service_catalog))
        .routes(routes!(payments::mark_paid))
        .routes(routes!(payments::mpesa_callback))
        .routes(routes!(receipts::send_receipt_email))
        .routes(routes!(receipts::receipt))
        .routes(routes!(reports::summary))
        .routes(routes!(reports::export_csv))
        .routes(routes!(settings::get_settings, settings::put_settings));

    // utoipa-axum 0.1 has no `get_openapi_mut`; take the spec out, edit it, and put it back.
    let mut openapi = router.to_openapi();
    openapi.tags = Some(
        [
            ("washes", "Wash logging and lookup"),
            ("payments", "Settling washes"),
            ("receipts", "Receipt email and printing"),
            ("reports", "Dashboard figures and exports"),
            ("settings", "Business settings"),
            ("health", "Service health"),
        ]
        .into_iter()
        .map(|(name, description)| {
            let mut tag = Tag::new(name);
            tag.description = Some(description.to_string());
            tag
        })
        .collect(),
    );
    router = OpenApiRouter::with_openapi(openapi).merge(router);

    router
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    // Use Cargo.toml metadata instead of the utoipa-axum crate info defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = optional_str(env!("CARGO_PKG_LICENSE")).map(|identifier| {
        let mut license = License::new(identifier);
        license.identifier = Some(identifier.to_string());
        license
    });

    OpenApiBuilder::new().info(info).build()
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `:` separated and may include "Name <email>".
    let primary = env!("CARGO_PKG_AUTHORS").split(':').next().map(str::trim)?;
    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    match author.find('<') {
        Some(start) => (
            non_empty(&author[..start]),
            non_empty(author[start + 1..].trim_end_matches('>')),
        ),
        None => (non_empty(author), None),
    }
}
