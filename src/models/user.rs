//! User model for storage, sessions and API responses.

use serde::{Deserialize, Serialize};

/// Subscription tier gating feature access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Free,
    Monthly,
    Annual,
}

impl PlanTier {
    /// Paid-plan duration in days; `None` for the free tier.
    pub fn duration_days(self) -> Option<i64> {
        match self {
            PlanTier::Free => None,
            PlanTier::Monthly => Some(30),
            PlanTier::Annual => Some(365),
        }
    }

    pub fn is_paid(self) -> bool {
        self != PlanTier::Free
    }
}

/// Consumption counters for gated features.
///
/// Older user documents may lack this struct entirely; every read path
/// treats a missing value as all-zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStats {
    /// Assistant questions asked while on the free tier
    pub ai_questions: u32,
    /// Feeding-calculator runs while on the free tier
    pub calc_tests: u32,
}

/// User profile document.
///
/// Instants are integer epoch milliseconds throughout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Opaque user id (also the document id)
    pub uid: String,
    /// Display name
    pub name: String,
    /// Email address (unique across users)
    pub email: String,
    /// Profile picture URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    /// Subscription tier
    pub plan: PlanTier,
    /// When the paid plan expires (epoch ms); absent for free tier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_expires_at: Option<i64>,
    /// When the account was created (epoch ms)
    pub created_at: i64,
    /// Last login (epoch ms)
    pub last_login: i64,
    /// Gated-feature counters; may be absent on old documents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageStats>,
}

impl User {
    /// Usage counters with the zero default applied.
    pub fn usage_or_default(&self) -> UsageStats {
        self.usage.unwrap_or_default()
    }
}

/// Password credential for the built-in identity provider.
///
/// Stored in its own collection keyed by uid, never embedded in the
/// user document (and never returned by any API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordRecord {
    /// Owning user id (also the document id)
    pub uid: String,
    /// Random salt (hex)
    pub salt: String,
    /// PBKDF2-HMAC-SHA256 output (hex)
    pub hash: String,
    /// Iteration count the hash was derived with
    pub iterations: u32,
}
