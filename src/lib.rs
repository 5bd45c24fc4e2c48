//! Petfolio: pet care backend
//!
//! This crate provides the backend API for pet profiles, vaccination
//! records, the AI vet assistant and the subscription entitlement gate.

pub mod config;
pub mod entitlement;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod session;
pub mod store;
pub mod time_utils;

use config::Config;
use entitlement::EntitlementEngine;
use services::{GeminiClient, GoogleAuthClient, PlacesClient};
use session::SessionManager;
use std::sync::Arc;
use store::PetStore;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn PetStore>,
    pub sessions: Arc<SessionManager>,
    pub entitlements: EntitlementEngine,
    pub assistant: GeminiClient,
    pub places: PlacesClient,
    pub google_auth: GoogleAuthClient,
}
