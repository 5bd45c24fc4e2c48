//! Google Places nearby search for veterinary clinics.

use crate::error::AppError;
use serde::{Deserialize, Serialize};

/// Demo fallback location (Goiânia, Brazil) used when the caller supplies
/// no coordinates.
pub const DEMO_LAT: f64 = -16.6869;
pub const DEMO_LNG: f64 = -49.2648;

pub const DEFAULT_RADIUS_M: u32 = 5000;

/// A clinic result trimmed to what the client renders.
#[derive(Debug, Clone, Serialize)]
pub struct Clinic {
    pub id: String,
    pub name: String,
    pub vicinity: String,
    pub rating: Option<f64>,
    pub ratings_total: Option<u32>,
    pub open_now: Option<bool>,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Clone)]
pub struct PlacesClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl PlacesClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: "https://maps.googleapis.com/maps/api/place".to_string(),
            api_key,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Veterinary-care places near the given point. `ZERO_RESULTS` is an
    /// empty list, any other non-OK status is an upstream error.
    pub async fn nearby_search(
        &self,
        lat: f64,
        lng: f64,
        radius_m: u32,
        keyword: Option<&str>,
    ) -> Result<Vec<Clinic>, AppError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Places(AppError::UNCONFIGURED.to_string()))?;

        let mut query = vec![
            ("location", format!("{},{}", lat, lng)),
            ("radius", radius_m.to_string()),
            ("type", "veterinary_care".to_string()),
            ("key", key.to_string()),
        ];
        if let Some(keyword) = keyword {
            query.push(("keyword", keyword.to_string()));
        }

        let url = format!("{}/nearbysearch/json", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| AppError::Places(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Places(format!("HTTP {}: {}", status, body)));
        }

        let body: NearbySearchResponse = response
            .json()
            .await
            .map_err(|e| AppError::Places(format!("JSON parse error: {}", e)))?;

        match body.status.as_str() {
            "OK" | "ZERO_RESULTS" => {}
            other => {
                return Err(AppError::Places(format!(
                    "Places status {}: {}",
                    other,
                    body.error_message.unwrap_or_default()
                )))
            }
        }

        Ok(body
            .results
            .into_iter()
            .map(|r| Clinic {
                id: r.place_id,
                name: r.name,
                vicinity: r.vicinity.unwrap_or_default(),
                rating: r.rating,
                ratings_total: r.user_ratings_total,
                open_now: r.opening_hours.and_then(|h| h.open_now),
                lat: r.geometry.location.lat,
                lng: r.geometry.location.lng,
            })
            .collect())
    }
}

/// Google Maps search link offered when the Places API is unavailable.
pub fn maps_search_url(lat: f64, lng: f64) -> String {
    format!(
        "https://www.google.com/maps/search/{}/@{},{},14z",
        urlencoding::encode("veterinary clinic near me"),
        lat,
        lng
    )
}

#[derive(Debug, Deserialize)]
struct NearbySearchResponse {
    status: String,
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<PlaceResult>,
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    place_id: String,
    name: String,
    vicinity: Option<String>,
    rating: Option<f64>,
    user_ratings_total: Option<u32>,
    opening_hours: Option<OpeningHours>,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct OpeningHours {
    open_now: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maps_search_url_encodes_query() {
        let url = maps_search_url(DEMO_LAT, DEMO_LNG);
        assert!(url.contains("veterinary%20clinic"));
        assert!(url.contains("-16.6869"));
    }

    #[test]
    fn test_zero_results_parses_to_empty_list() {
        let body: NearbySearchResponse =
            serde_json::from_str(r#"{"status": "ZERO_RESULTS"}"#).unwrap();
        assert_eq!(body.status, "ZERO_RESULTS");
        assert!(body.results.is_empty());
    }

    #[test]
    fn test_result_parsing() {
        let body: NearbySearchResponse = serde_json::from_str(
            r#"{
                "status": "OK",
                "results": [{
                    "place_id": "abc123",
                    "name": "PetCare Clinic",
                    "vicinity": "Av. T-63, 1234",
                    "rating": 4.7,
                    "user_ratings_total": 210,
                    "opening_hours": {"open_now": true},
                    "geometry": {"location": {"lat": -16.7, "lng": -49.26}}
                }]
            }"#,
        )
        .unwrap();
        assert_eq!(body.results.len(), 1);
        assert_eq!(body.results[0].place_id, "abc123");
        assert_eq!(body.results[0].user_ratings_total, Some(210));
        assert_eq!(
            body.results[0].opening_hours.as_ref().unwrap().open_now,
            Some(true)
        );
    }
}
