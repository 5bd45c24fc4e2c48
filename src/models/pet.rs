//! Pet model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Species a pet profile can be registered as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    Dog,
    Cat,
    Horse,
    Hamster,
    Rabbit,
    Bird,
    Fish,
    Other,
}

/// Pet profile document, owned by exactly one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pet {
    /// Pet id (also the document id)
    pub pet_id: String,
    /// Owning user id
    pub owner_id: String,
    /// Pet name
    pub name: String,
    pub species: Species,
    /// Breed free text; "Unknown" when not provided
    #[serde(default = "default_breed")]
    pub breed: String,
    /// Birth date (calendar date, no time component)
    pub birth_date: NaiveDate,
    /// Weight in kilograms; always positive
    pub weight_kg: f64,
    /// Photo URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    /// When the profile was created (epoch ms)
    pub created_at: i64,
}

pub fn default_breed() -> String {
    "Unknown".to_string()
}
