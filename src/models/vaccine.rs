//! Vaccination record model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Vaccination record, owned by exactly one pet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vaccine {
    /// Vaccine record id (also the document id)
    pub vaccine_id: String,
    /// Owning pet id
    pub pet_id: String,
    /// Date of the first dose
    pub first_dose: NaiveDate,
    /// Scheduled next dose, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_dose: Option<NaiveDate>,
    /// Whether the dose has been applied
    #[serde(default)]
    pub applied: bool,
    /// Free-text note
    #[serde(default)]
    pub notes: String,
    /// Photo of the vaccination card
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    /// When the record was created (epoch ms); records written before this
    /// field existed deserialize as 0 and sort first.
    #[serde(default)]
    pub created_at: i64,
}
