use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const DEFAULT_BUSINESS_NAME: &str = "My Car Wash";

/// Business-wide settings, stored as a single document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub business_name: String,
    pub default_receipt_email: String,
    pub auto_email_receipts: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            business_name: DEFAULT_BUSINESS_NAME.to_string(),
            default_receipt_email: String::new(),
            auto_email_receipts: false,
        }
    }
}

impl Settings {
    /// Merge the fields present in `patch`.
    pub fn apply(&mut self, patch: SettingsPatch) {
        let patch = patch.trimmed();
        if let Some(business_name) = patch.business_name {
            self.business_name = business_name;
        }
        if let Some(email) = patch.default_receipt_email {
            self.default_receipt_email = email;
        }
        if let Some(auto) = patch.auto_email_receipts {
            self.auto_email_receipts = auto;
        }
    }

    /// Address receipts go to automatically, if auto-email is on.
    #[must_use]
    pub fn auto_email_recipient(&self) -> Option<&str> {
        if self.auto_email_receipts && !self.default_receipt_email.is_empty() {
            Some(&self.default_receipt_email)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_receipt_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_email_receipts: Option<bool>,
}

impl SettingsPatch {
    /// Same patch with surrounding whitespace removed from text fields.
    #[must_use]
    pub fn trimmed(self) -> Self {
        Self {
            business_name: self.business_name.map(|name| name.trim().to_string()),
            default_receipt_email: self
                .default_receipt_email
                .map(|email| email.trim().to_string()),
            auto_email_receipts: self.auto_email_receipts,
        }
    }

    /// # Errors
    /// Returns the client-facing message when a field is unacceptable.
    pub fn validate(&self) -> Result<(), &'static str> {
        if let Some(email) = self.default_receipt_email.as_deref() {
            let email = email.trim();
            if !email.is_empty() && !valid_email(email) {
                return Err("Invalid email");
            }
        }
        Ok(())
    }
}

#[must_use]
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").map_or(false, |re| re.is_match(email))
}
