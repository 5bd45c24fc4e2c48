//! Storage layer: one trait, two backends.
//!
//! `PetStore` abstracts the durable store behind get/upsert/list/delete
//! primitives. The backend is selected exactly once at startup by
//! [`select_backend`] and never changes for the process lifetime:
//!
//! - `FirestoreStore` when a GCP project is configured (documents nested
//!   under the owning user),
//! - `LocalStore` otherwise (flat JSON arrays under fixed keys on disk).
//!
//! Both backends must stay behaviorally equivalent: idempotent upserts
//! keyed by id, missing collections read as empty, identical filtering.

pub mod firestore;
pub mod local;

pub use firestore::FirestoreStore;
pub use local::LocalStore;

use crate::config::Config;
use crate::error::AppError;
use crate::models::{ChatMessage, PasswordRecord, Pet, User, Vaccine};
use async_trait::async_trait;
use std::sync::Arc;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const CREDENTIALS: &str = "credentials";
    pub const PETS: &str = "pets";
    pub const VACCINES: &str = "vaccines";
    pub const CHAT_HISTORY: &str = "chat_history";
}

/// Durable store for users, pets, vaccines and chat logs.
///
/// All writes are idempotent upserts (same id overwrites). Every list
/// operation returns an empty `Vec` for a missing collection, never an
/// error. Backend failures surface as `AppError::Database`; there is no
/// silent fallback between backends.
#[async_trait]
pub trait PetStore: Send + Sync {
    async fn get_user(&self, uid: &str) -> Result<Option<User>, AppError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn upsert_user(&self, user: &User) -> Result<(), AppError>;

    async fn get_credentials(&self, uid: &str) -> Result<Option<PasswordRecord>, AppError>;

    async fn set_credentials(&self, record: &PasswordRecord) -> Result<(), AppError>;

    /// Pets owned by `owner_id`, in insertion order.
    async fn list_pets(&self, owner_id: &str) -> Result<Vec<Pet>, AppError>;

    async fn upsert_pet(&self, pet: &Pet) -> Result<(), AppError>;

    /// Deletes the pet and cascades to all of its vaccine records.
    async fn delete_pet(&self, owner_id: &str, pet_id: &str) -> Result<(), AppError>;

    /// Vaccine records for one pet, in insertion order.
    async fn list_vaccines(&self, owner_id: &str, pet_id: &str) -> Result<Vec<Vaccine>, AppError>;

    async fn upsert_vaccine(&self, owner_id: &str, vaccine: &Vaccine) -> Result<(), AppError>;

    async fn delete_vaccine(
        &self,
        owner_id: &str,
        pet_id: &str,
        vaccine_id: &str,
    ) -> Result<(), AppError>;

    /// Append one message to the user's conversation log.
    async fn append_chat(&self, uid: &str, message: &ChatMessage) -> Result<(), AppError>;

    /// Full conversation log, sorted ascending by timestamp.
    async fn chat_history(&self, uid: &str) -> Result<Vec<ChatMessage>, AppError>;
}

/// Pick the storage backend from configuration. Called once at startup.
pub async fn select_backend(config: &Config) -> Result<Arc<dyn PetStore>, AppError> {
    match &config.gcp_project_id {
        Some(project) => {
            tracing::info!(project = %project, "Storage backend: Firestore");
            Ok(Arc::new(FirestoreStore::new(project).await?))
        }
        None => {
            tracing::info!(dir = %config.data_dir.display(), "Storage backend: local files");
            Ok(Arc::new(LocalStore::new(&config.data_dir).await?))
        }
    }
}
