//! Entitlement gate for the free tier, plus plan transitions.
//!
//! Two features are gated: assistant messages and feeding-calculator runs.
//! `check_limit` is a pure read; consumption is recorded separately via
//! [`EntitlementEngine::consume`] after the gated action has completed.
//! Callers must check before consuming — the engine does not enforce the
//! ordering itself.

use crate::error::AppError;
use crate::models::{PlanTier, UsageStats, User};
use crate::session::SessionManager;
use crate::store::PetStore;
use crate::time_utils::{now_millis, DAY_MS};
use std::sync::Arc;

/// Free-tier cap on assistant questions.
pub const FREE_ASSISTANT_LIMIT: u32 = 2;
/// Free-tier cap on feeding-calculator runs.
pub const FREE_CALCULATOR_LIMIT: u32 = 1;

/// The two capped features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatedFeature {
    Assistant,
    Calculator,
}

/// Tier as the gate sees it: an expired paid plan counts as free.
///
/// Expiration is enforced lazily at read time; the stored record keeps its
/// tier and expiry so the subscription page can still display them.
pub fn effective_tier(user: &User, now_ms: i64) -> PlanTier {
    if !user.plan.is_paid() {
        return PlanTier::Free;
    }
    match user.plan_expires_at {
        Some(expires_at) if expires_at <= now_ms => PlanTier::Free,
        _ => user.plan,
    }
}

/// Whether the user may perform one more gated action. Pure read, no side
/// effects. Missing usage counters count as zero, never as blocked.
pub fn check_limit(user: &User, feature: GatedFeature, now_ms: i64) -> bool {
    if effective_tier(user, now_ms).is_paid() {
        return true;
    }
    let usage = user.usage_or_default();
    match feature {
        GatedFeature::Assistant => usage.ai_questions < FREE_ASSISTANT_LIMIT,
        GatedFeature::Calculator => usage.calc_tests < FREE_CALCULATOR_LIMIT,
    }
}

/// Whole days until the paid plan expires (ceiling), for display.
pub fn days_remaining(user: &User, now_ms: i64) -> Option<i64> {
    if !user.plan.is_paid() {
        return None;
    }
    let expires_at = user.plan_expires_at?;
    Some(((expires_at - now_ms).max(0) + DAY_MS - 1) / DAY_MS)
}

/// Records consumption and performs plan transitions against the
/// authoritative store, keeping the session snapshot in step.
pub struct EntitlementEngine {
    store: Arc<dyn PetStore>,
    sessions: Arc<SessionManager>,
}

impl EntitlementEngine {
    pub fn new(store: Arc<dyn PetStore>, sessions: Arc<SessionManager>) -> Self {
        Self { store, sessions }
    }

    /// Increment the feature's counter by exactly one.
    ///
    /// Persists to the store first, then refreshes the session snapshot.
    /// Any failure surfaces; consumption is never silently dropped. The
    /// read-modify-write is unguarded, so two racing consumptions for the
    /// same user can lose one increment (accepted for this client profile).
    pub async fn consume(
        &self,
        uid: &str,
        feature: GatedFeature,
    ) -> Result<UsageStats, AppError> {
        let mut user = self
            .store
            .get_user(uid)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", uid)))?;

        let mut usage = user.usage_or_default();
        match feature {
            GatedFeature::Assistant => usage.ai_questions += 1,
            GatedFeature::Calculator => usage.calc_tests += 1,
        }
        user.usage = Some(usage);

        self.store.upsert_user(&user).await?;
        self.sessions.refresh(&user).await?;

        tracing::debug!(
            uid,
            ai_questions = usage.ai_questions,
            calc_tests = usage.calc_tests,
            "Usage recorded"
        );

        Ok(usage)
    }

    /// Move the user to `tier`.
    ///
    /// Paid tiers get an expiry of now + 30 days (monthly) or now + 365
    /// days (annual); the free tier clears any expiry. No payment logic
    /// lives here — callers gate this on the receipt classifier's verdict.
    pub async fn update_plan(&self, uid: &str, tier: PlanTier) -> Result<User, AppError> {
        let mut user = self
            .store
            .get_user(uid)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", uid)))?;

        user.plan = tier;
        user.plan_expires_at = tier.duration_days().map(|days| now_millis() + days * DAY_MS);

        self.store.upsert_user(&user).await?;
        self.sessions.refresh(&user).await?;

        tracing::info!(uid, plan = ?tier, expires_at = ?user.plan_expires_at, "Plan updated");

        Ok(user)
    }
}
