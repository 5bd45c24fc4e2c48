//! API routes for authenticated users.

use crate::entitlement::{
    check_limit, days_remaining, effective_tier, GatedFeature, FREE_ASSISTANT_LIMIT,
    FREE_CALCULATOR_LIMIT,
};
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{ChatMessage, ChatRole, Pet, PlanTier, Species, UsageStats, User, Vaccine};
use crate::services::assistant::FoodAnalysis;
use crate::services::places::{maps_search_url, Clinic, DEFAULT_RADIUS_M, DEMO_LAT, DEMO_LNG};
use crate::time_utils::{format_millis_rfc3339, now_millis};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Extension, Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Payment details shown to the user and checked against uploaded receipts.
const RECEIPT_PAYEE: &str = "Petfolio";
const RECEIPT_PIX_KEY: &str = "payments@petfolio.app";
const MONTHLY_AMOUNTS: &[&str] = &["R$ 10,99", "10,99", "10.99"];
const ANNUAL_AMOUNTS: &[&str] = &["R$ 119,99", "119,99", "119.99"];

const ASSISTANT_FALLBACK_REPLY: &str =
    "Sorry, I could not process your question right now. Please try again in a moment.";

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/pets", get(list_pets).post(create_pet))
        .route("/api/pets/{pet_id}", delete(delete_pet))
        .route(
            "/api/pets/{pet_id}/vaccines",
            get(list_vaccines).post(create_vaccine),
        )
        .route(
            "/api/pets/{pet_id}/vaccines/{vaccine_id}",
            delete(delete_vaccine),
        )
        .route("/api/chat", get(get_chat).post(post_chat))
        .route("/api/tools/food", post(analyze_food))
        .route("/api/clinics", get(get_clinics))
        .route("/api/plan", get(get_plan))
        .route("/api/plan/verify", post(verify_plan))
}

// ─── User Profile ────────────────────────────────────────────

#[derive(Serialize)]
pub struct MeResponse {
    pub user: User,
    /// Tier after lazy expiry is applied; the stored tier is left alone.
    pub effective_plan: PlanTier,
    pub days_remaining: Option<i64>,
}

/// Get current user profile, read through the session cache.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<MeResponse>> {
    let user = match state.sessions.current(&auth.uid).await? {
        Some(user) => user,
        None => {
            // No snapshot for this device yet. Rebuild it from the store.
            let user = state
                .store
                .get_user(&auth.uid)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("User {} not found", auth.uid)))?;
            state.sessions.establish(&user).await?;
            user
        }
    };

    let now = now_millis();
    Ok(Json(MeResponse {
        effective_plan: effective_tier(&user, now),
        days_remaining: days_remaining(&user, now),
        user,
    }))
}

// ─── Pets ────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreatePetRequest {
    /// Client-supplied id accepted; generated when absent.
    #[serde(default)]
    pub pet_id: Option<String>,
    pub name: String,
    pub species: Species,
    #[serde(default)]
    pub breed: Option<String>,
    pub birth_date: NaiveDate,
    pub weight_kg: f64,
    #[serde(default)]
    pub photo_url: Option<String>,
}

async fn list_pets(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<Pet>>> {
    Ok(Json(state.store.list_pets(&auth.uid).await?))
}

async fn create_pet(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreatePetRequest>,
) -> Result<Json<Pet>> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Pet name is required".to_string()));
    }
    if !(body.weight_kg > 0.0) {
        return Err(AppError::BadRequest("Weight must be positive".to_string()));
    }

    let breed = match body.breed.as_deref().map(str::trim) {
        Some(b) if !b.is_empty() => b.to_string(),
        _ => crate::models::pet::default_breed(),
    };

    let pet = Pet {
        pet_id: body
            .pet_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        owner_id: auth.uid.clone(),
        name: name.to_string(),
        species: body.species,
        breed,
        birth_date: body.birth_date,
        weight_kg: body.weight_kg,
        photo_url: body.photo_url,
        created_at: now_millis(),
    };

    state.store.upsert_pet(&pet).await?;
    tracing::debug!(uid = %auth.uid, pet_id = %pet.pet_id, "Pet saved");

    Ok(Json(pet))
}

#[derive(Serialize)]
pub struct DeletedResponse {
    pub deleted: bool,
}

/// Delete a pet and all of its vaccine records.
async fn delete_pet(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(pet_id): Path<String>,
) -> Result<Json<DeletedResponse>> {
    state.store.delete_pet(&auth.uid, &pet_id).await?;
    tracing::debug!(uid = %auth.uid, pet_id = %pet_id, "Pet deleted");
    Ok(Json(DeletedResponse { deleted: true }))
}

// ─── Vaccines ────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateVaccineRequest {
    #[serde(default)]
    pub vaccine_id: Option<String>,
    pub first_dose: NaiveDate,
    #[serde(default)]
    pub next_dose: Option<NaiveDate>,
    #[serde(default)]
    pub applied: bool,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub photo_url: Option<String>,
}

/// Pet must belong to the authenticated user.
async fn require_owned_pet(state: &AppState, uid: &str, pet_id: &str) -> Result<()> {
    let owned = state
        .store
        .list_pets(uid)
        .await?
        .iter()
        .any(|p| p.pet_id == pet_id);
    if !owned {
        return Err(AppError::NotFound(format!("Pet {} not found", pet_id)));
    }
    Ok(())
}

async fn list_vaccines(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(pet_id): Path<String>,
) -> Result<Json<Vec<Vaccine>>> {
    require_owned_pet(&state, &auth.uid, &pet_id).await?;
    Ok(Json(state.store.list_vaccines(&auth.uid, &pet_id).await?))
}

async fn create_vaccine(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(pet_id): Path<String>,
    Json(body): Json<CreateVaccineRequest>,
) -> Result<Json<Vaccine>> {
    require_owned_pet(&state, &auth.uid, &pet_id).await?;

    let vaccine = Vaccine {
        vaccine_id: body
            .vaccine_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        pet_id: pet_id.clone(),
        first_dose: body.first_dose,
        next_dose: body.next_dose,
        applied: body.applied,
        notes: body.notes,
        photo_url: body.photo_url,
        created_at: now_millis(),
    };

    state.store.upsert_vaccine(&auth.uid, &vaccine).await?;
    tracing::debug!(uid = %auth.uid, pet_id = %pet_id, vaccine_id = %vaccine.vaccine_id, "Vaccine saved");

    Ok(Json(vaccine))
}

async fn delete_vaccine(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path((pet_id, vaccine_id)): Path<(String, String)>,
) -> Result<Json<DeletedResponse>> {
    require_owned_pet(&state, &auth.uid, &pet_id).await?;
    state
        .store
        .delete_vaccine(&auth.uid, &pet_id, &vaccine_id)
        .await?;
    Ok(Json(DeletedResponse { deleted: true }))
}

// ─── Assistant Chat ──────────────────────────────────────────

#[derive(Deserialize)]
pub struct ChatRequest {
    pub text: String,
    /// Base64 JPEG attached to the question
    #[serde(default)]
    pub image_base64: Option<String>,
}

#[derive(Serialize)]
pub struct ChatResponse {
    /// Free-tier quota exhausted; no reply was produced or charged.
    pub limit_reached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<ChatMessage>,
    pub usage: UsageStats,
}

async fn get_chat(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<ChatMessage>>> {
    Ok(Json(state.store.chat_history(&auth.uid).await?))
}

/// One assistant turn. The user message is always appended to the log;
/// usage is charged only when a real reply came back, so a failed upstream
/// call neither corrupts the conversation nor costs a question.
async fn post_chat(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    let text = body.text.trim().to_string();
    if text.is_empty() && body.image_base64.is_none() {
        return Err(AppError::BadRequest("Message is empty".to_string()));
    }

    let user = state
        .store
        .get_user(&auth.uid)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", auth.uid)))?;

    let now = now_millis();
    if !check_limit(&user, GatedFeature::Assistant, now) {
        return Ok(Json(ChatResponse {
            limit_reached: true,
            reply: None,
            usage: user.usage_or_default(),
        }));
    }

    let user_message = ChatMessage {
        id: uuid::Uuid::new_v4().to_string(),
        role: ChatRole::User,
        text: text.clone(),
        image_url: body
            .image_base64
            .as_deref()
            .map(|b64| format!("data:image/jpeg;base64,{}", b64)),
        timestamp: now,
    };
    state.store.append_chat(&auth.uid, &user_message).await?;

    let (reply_text, usage) = match state
        .assistant
        .send_message(&text, body.image_base64.as_deref())
        .await
    {
        Ok(reply) => {
            let usage = state
                .entitlements
                .consume(&auth.uid, GatedFeature::Assistant)
                .await?;
            (reply, usage)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Assistant call failed, substituting fallback reply");
            (ASSISTANT_FALLBACK_REPLY.to_string(), user.usage_or_default())
        }
    };

    let reply = ChatMessage {
        id: uuid::Uuid::new_v4().to_string(),
        role: ChatRole::Model,
        text: reply_text,
        image_url: None,
        timestamp: now_millis(),
    };
    state.store.append_chat(&auth.uid, &reply).await?;

    Ok(Json(ChatResponse {
        limit_reached: false,
        reply: Some(reply),
        usage,
    }))
}

// ─── Food Calculator ─────────────────────────────────────────

#[derive(Deserialize)]
pub struct FoodRequest {
    pub weight_kg: f64,
    pub food_name: String,
}

#[derive(Serialize)]
pub struct FoodResponse {
    pub limit_reached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<FoodAnalysis>,
    /// True when the numbers are the local estimate, not an AI analysis.
    pub estimated: bool,
}

/// Portion calculator. A degraded local estimate still counts as a run.
async fn analyze_food(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<FoodRequest>,
) -> Result<Json<FoodResponse>> {
    if !(body.weight_kg > 0.0) {
        return Err(AppError::BadRequest("Weight must be positive".to_string()));
    }

    let user = state
        .store
        .get_user(&auth.uid)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", auth.uid)))?;

    if !check_limit(&user, GatedFeature::Calculator, now_millis()) {
        return Ok(Json(FoodResponse {
            limit_reached: true,
            analysis: None,
            estimated: false,
        }));
    }

    let (analysis, estimated) = match state
        .assistant
        .analyze_food(body.weight_kg, body.food_name.trim())
        .await
    {
        Ok(analysis) => (analysis, false),
        Err(e) => {
            tracing::warn!(error = %e, "Food analysis failed, using local estimate");
            (
                crate::services::GeminiClient::fallback_estimate(body.weight_kg),
                true,
            )
        }
    };

    state
        .entitlements
        .consume(&auth.uid, GatedFeature::Calculator)
        .await?;

    Ok(Json(FoodResponse {
        limit_reached: false,
        analysis: Some(analysis),
        estimated,
    }))
}

// ─── Clinic Finder ───────────────────────────────────────────

#[derive(Deserialize)]
pub struct ClinicsParams {
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lng: Option<f64>,
    #[serde(default)]
    radius: Option<u32>,
}

#[derive(Serialize)]
pub struct ClinicsResponse {
    pub available: bool,
    pub clinics: Vec<Clinic>,
    /// Manual search link offered when the live results are unavailable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maps_url: Option<String>,
}

/// Nearby veterinary clinics. Failures degrade to a manual maps link
/// instead of an error so the screen stays usable.
async fn get_clinics(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ClinicsParams>,
) -> Result<Json<ClinicsResponse>> {
    // Demo location when the client could not provide coordinates.
    let lat = params.lat.unwrap_or(DEMO_LAT);
    let lng = params.lng.unwrap_or(DEMO_LNG);
    let radius = params.radius.unwrap_or(DEFAULT_RADIUS_M);

    if !state.places.is_configured() {
        return Ok(Json(ClinicsResponse {
            available: false,
            clinics: Vec::new(),
            maps_url: Some(maps_search_url(lat, lng)),
        }));
    }

    match state.places.nearby_search(lat, lng, radius, None).await {
        Ok(clinics) => Ok(Json(ClinicsResponse {
            available: true,
            clinics,
            maps_url: None,
        })),
        Err(e) => {
            tracing::warn!(error = %e, "Places lookup failed, falling back to maps link");
            Ok(Json(ClinicsResponse {
                available: false,
                clinics: Vec::new(),
                maps_url: Some(maps_search_url(lat, lng)),
            }))
        }
    }
}

// ─── Subscription ────────────────────────────────────────────

#[derive(Serialize)]
pub struct PlanLimits {
    pub assistant: u32,
    pub calculator: u32,
}

#[derive(Serialize)]
pub struct PlanResponse {
    pub plan: PlanTier,
    pub effective_plan: PlanTier,
    pub plan_expires_at: Option<i64>,
    pub expires_at_display: Option<String>,
    pub days_remaining: Option<i64>,
    pub usage: UsageStats,
    pub free_limits: PlanLimits,
    pub payee: String,
    pub payment_key: String,
    pub monthly_price: String,
    pub annual_price: String,
}

/// Subscription display data for the plans screen.
async fn get_plan(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<PlanResponse>> {
    let user = state
        .store
        .get_user(&auth.uid)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", auth.uid)))?;

    let now = now_millis();
    Ok(Json(PlanResponse {
        plan: user.plan,
        effective_plan: effective_tier(&user, now),
        plan_expires_at: user.plan_expires_at,
        expires_at_display: user.plan_expires_at.and_then(format_millis_rfc3339),
        days_remaining: days_remaining(&user, now),
        usage: user.usage_or_default(),
        free_limits: PlanLimits {
            assistant: FREE_ASSISTANT_LIMIT,
            calculator: FREE_CALCULATOR_LIMIT,
        },
        payee: RECEIPT_PAYEE.to_string(),
        payment_key: RECEIPT_PIX_KEY.to_string(),
        monthly_price: MONTHLY_AMOUNTS[0].to_string(),
        annual_price: ANNUAL_AMOUNTS[0].to_string(),
    }))
}

#[derive(Deserialize)]
pub struct VerifyPlanRequest {
    pub plan: PlanTier,
    pub receipt_base64: String,
}

#[derive(Serialize)]
pub struct VerifyPlanResponse {
    pub approved: bool,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

/// Verify a payment receipt and activate the paid plan on approval.
/// The classifier's verdict is the only input trusted to change the tier.
async fn verify_plan(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<VerifyPlanRequest>,
) -> Result<Json<VerifyPlanResponse>> {
    let amounts = match body.plan {
        PlanTier::Monthly => MONTHLY_AMOUNTS,
        PlanTier::Annual => ANNUAL_AMOUNTS,
        PlanTier::Free => {
            return Err(AppError::BadRequest(
                "The free plan needs no receipt".to_string(),
            ))
        }
    };

    let verdict = match state
        .assistant
        .classify_receipt(&body.receipt_base64, RECEIPT_PAYEE, RECEIPT_PIX_KEY, amounts)
        .await
    {
        Ok(verdict) => verdict,
        Err(e) => {
            tracing::warn!(error = %e, "Receipt classification failed");
            return Ok(Json(VerifyPlanResponse {
                approved: false,
                reason: "Could not verify the receipt right now. Please try again.".to_string(),
                user: None,
            }));
        }
    };

    if !verdict.approved {
        tracing::info!(uid = %auth.uid, plan = ?body.plan, "Receipt rejected");
        return Ok(Json(VerifyPlanResponse {
            approved: false,
            reason: verdict.reason,
            user: None,
        }));
    }

    let user = state.entitlements.update_plan(&auth.uid, body.plan).await?;

    Ok(Json(VerifyPlanResponse {
        approved: true,
        reason: verdict.reason,
        user: Some(user),
    }))
}
