use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::validation::{validate_email, validate_lead_field, validate_lead_message};

/// Contact-form submission payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    /// Which form produced the lead, e.g. "contact", "schedule-tour"
    pub form_type: String,
    /// Marketing attribution, e.g. "community-page"
    #[serde(default)]
    pub source: Option<String>,
    /// Community the visitor was browsing, if any
    #[serde(default)]
    pub community_slug: Option<String>,
}

impl LeadRequest {
    /// Validate required fields and formats before the CRM sees anything.
    pub fn validate(&self) -> AppResult<()> {
        validate_lead_field(&self.name, "Name")?;
        validate_email(&self.email)?;
        validate_lead_field(&self.form_type, "Form type")?;

        if let Some(phone) = &self.phone {
            validate_lead_field(phone, "Phone")?;
        }
        if let Some(message) = &self.message {
            validate_lead_message(message)?;
        }

        Ok(())
    }
}

/// Lead submission response.
///
/// `success` is `true` even when the CRM hand-off failed: integration
/// failures are logged server-side and never shown to the visitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadResponse {
    pub success: bool,
    /// CRM person record, when the hand-off succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person_id: Option<String>,
}
