//! Gemini API client for the assistant, receipt checks and food analysis.
//!
//! Thin REST wrapper over `generateContent`. Handlers own the degraded
//! behavior on failure (apologetic chat reply, "could not verify" receipt
//! outcome, local feeding estimate); this client only reports errors.

use crate::error::AppError;
use serde::Deserialize;
use serde_json::json;

const MODEL: &str = "gemini-2.5-flash";

const SYSTEM_INSTRUCTION: &str = "You are a friendly and helpful virtual veterinary \
    assistant for the Petfolio app. Give tips about pet health, feeding and care. \
    For any serious medical emergency, always recommend seeing a veterinarian in person.";

/// Gemini REST client. Missing API key degrades every call to an
/// `unconfigured` error instead of failing at startup.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

/// Receipt classification outcome.
#[derive(Debug, Clone)]
pub struct ReceiptVerdict {
    pub approved: bool,
    pub reason: String,
}

/// Daily feeding portion analysis.
#[derive(Debug, Clone, serde::Serialize, Deserialize)]
pub struct FoodAnalysis {
    /// Daily portion in grams
    pub grams: f64,
    /// Human-readable cup measure
    pub cups: String,
    pub calories_per_kg: f64,
    pub protein_pct: f64,
    /// Grams of protein in the daily portion
    #[serde(default)]
    pub protein_grams: f64,
    pub fiber_pct: f64,
    /// Short quality remark about the food
    pub quality_note: String,
    /// Food classification, e.g. "Super Premium"
    pub food_type: String,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn api_key(&self) -> Result<&str, AppError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| AppError::Assistant(AppError::UNCONFIGURED.to_string()))
    }

    /// One assistant turn: user text plus an optional inline JPEG.
    pub async fn send_message(
        &self,
        text: &str,
        image_base64: Option<&str>,
    ) -> Result<String, AppError> {
        let mut parts = Vec::new();
        if let Some(data) = image_base64 {
            parts.push(json!({
                "inlineData": { "mimeType": "image/jpeg", "data": data }
            }));
        }
        parts.push(json!({ "text": text }));

        let body = json!({
            "contents": [{ "role": "user", "parts": parts }],
            "systemInstruction": { "parts": [{ "text": SYSTEM_INSTRUCTION }] }
        });

        let response = self.generate_content(&body).await?;
        first_text(&response)
            .ok_or_else(|| AppError::Assistant("Empty assistant response".to_string()))
    }

    /// Classify a payment receipt image against the expected payment data.
    ///
    /// The model is asked for a strict field-by-field check; approval is
    /// additionally enforced here so a confused model cannot approve a
    /// receipt with missing fields.
    pub async fn classify_receipt(
        &self,
        image_base64: &str,
        payee: &str,
        payment_key: &str,
        amounts: &[&str],
    ) -> Result<ReceiptVerdict, AppError> {
        let today = chrono::Utc::now().format("%d/%m/%Y").to_string();
        let prompt = format!(
            "Analyze this image of a payment receipt.\n\
             Today's date is: {today}.\n\n\
             Strictly verify the following:\n\
             1. The recipient name must contain: \"{payee}\" (partial match allowed if very similar).\n\
             2. The amount must be exactly one of: {amounts}.\n\
             3. The receipt date must EQUAL today's date ({today}). Accept DD/MM/YYYY, DD/MM/YY or spelled-out forms.\n\
             4. It must mention the payment key: \"{payment_key}\".\n\n\
             Respond in JSON only. \"approved\" must be true only if ALL checks pass.",
            today = today,
            payee = payee,
            amounts = amounts.join(" or "),
            payment_key = payment_key,
        );

        let body = json!({
            "contents": [{
                "parts": [
                    { "inlineData": { "mimeType": "image/jpeg", "data": image_base64 } },
                    { "text": prompt }
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "found_payee": { "type": "BOOLEAN" },
                        "found_amount": { "type": "BOOLEAN" },
                        "found_date": { "type": "BOOLEAN" },
                        "found_key": { "type": "BOOLEAN" },
                        "approved": { "type": "BOOLEAN" },
                        "reason": { "type": "STRING" }
                    }
                }
            }
        });

        let response = self.generate_content(&body).await?;
        let raw = first_text(&response)
            .ok_or_else(|| AppError::Assistant("Empty receipt verdict".to_string()))?;

        let verdict: RawReceiptVerdict = serde_json::from_str(strip_code_fences(&raw))
            .map_err(|e| AppError::Assistant(format!("Unparseable receipt verdict: {}", e)))?;

        let approved = verdict.approved
            && verdict.found_payee
            && verdict.found_amount
            && verdict.found_date
            && verdict.found_key;

        Ok(ReceiptVerdict {
            approved,
            reason: if verdict.reason.is_empty() {
                if approved {
                    "Receipt verified successfully.".to_string()
                } else {
                    "Receipt data did not match. Check that the date is today's.".to_string()
                }
            } else {
                verdict.reason
            },
        })
    }

    /// Daily feeding portion analysis for a pet on a named food.
    pub async fn analyze_food(
        &self,
        weight_kg: f64,
        food_name: &str,
    ) -> Result<FoodAnalysis, AppError> {
        let prompt = format!(
            "Act as an expert veterinary nutritionist.\n\
             I have a pet weighing {weight_kg} kg that eats the food: \"{food_name}\".\n\n\
             Your job is to calculate the daily portion.\n\
             1. Determine whether it is dog or cat food from the name (assume dog if unclear).\n\
             2. Calculate the daily amount in grams.\n\
             3. Convert to cups (200 ml).\n\
             4. Estimate protein (%) and fiber (%).\n\n\
             Respond in JSON only. quality_note must be at most 15 words.",
        );

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "grams": { "type": "NUMBER" },
                        "cups": { "type": "STRING" },
                        "calories_per_kg": { "type": "NUMBER" },
                        "protein_pct": { "type": "NUMBER" },
                        "fiber_pct": { "type": "NUMBER" },
                        "quality_note": { "type": "STRING" },
                        "food_type": { "type": "STRING" }
                    }
                }
            }
        });

        let response = self.generate_content(&body).await?;
        let raw = first_text(&response)
            .ok_or_else(|| AppError::Assistant("Empty food analysis".to_string()))?;

        let mut analysis: FoodAnalysis = serde_json::from_str(strip_code_fences(&raw))
            .map_err(|e| AppError::Assistant(format!("Unparseable food analysis: {}", e)))?;

        // Protein grams from portion size and percentage.
        analysis.protein_grams = (analysis.grams * analysis.protein_pct / 100.0).round();

        Ok(analysis)
    }

    /// Local estimate used when the remote analysis is unavailable:
    /// 25 g/kg of body weight, typical adult maintenance numbers.
    pub fn fallback_estimate(weight_kg: f64) -> FoodAnalysis {
        let grams = (weight_kg * 25.0).round();
        FoodAnalysis {
            grams,
            cups: format!("About {:.1} cups", grams / 100.0),
            calories_per_kg: 3500.0,
            protein_pct: 22.0,
            protein_grams: (grams * 0.22).round(),
            fiber_pct: 4.0,
            quality_note: "Generic estimate. Check the package instructions.".to_string(),
            food_type: "Standard estimate".to_string(),
        }
    }

    async fn generate_content(
        &self,
        body: &serde_json::Value,
    ) -> Result<GenerateContentResponse, AppError> {
        let key = self.api_key()?;
        let url = format!("{}/models/{}:generateContent", self.base_url, MODEL);

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", key)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Assistant(e.to_string()))?;

        check_response_json(response).await
    }
}

/// Check response status and parse the JSON body.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.as_u16() == 429 {
            tracing::warn!("Gemini rate limit hit (429)");
            return Err(AppError::Assistant("Rate limit exceeded".to_string()));
        }

        return Err(AppError::Assistant(format!("HTTP {}: {}", status, body)));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Assistant(format!("JSON parse error: {}", e)))
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawReceiptVerdict {
    #[serde(default)]
    found_payee: bool,
    #[serde(default)]
    found_amount: bool,
    #[serde(default)]
    found_date: bool,
    #[serde(default)]
    found_key: bool,
    #[serde(default)]
    approved: bool,
    #[serde(default)]
    reason: String,
}

/// Concatenated text of the first candidate, if any.
fn first_text(response: &GenerateContentResponse) -> Option<String> {
    let content = response.candidates.first()?.content.as_ref()?;
    let text: String = content
        .parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Models sometimes wrap JSON replies in Markdown fences despite the
/// response MIME type; strip them before parsing.
fn strip_code_fences(raw: &str) -> &str {
    raw.trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}
