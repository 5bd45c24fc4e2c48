//! Firestore store (remote mode).
//!
//! Document layout follows the owning-user nesting:
//! - `users/{uid}` — profile documents
//! - `credentials/{uid}` — password records
//! - `users/{uid}/pets/{pet_id}` — pet profiles
//! - `users/{uid}/pets/{pet_id}/vaccines/{vaccine_id}` — vaccine records
//! - `users/{uid}/chat_history/{message_id}` — conversation log
//!
//! Failures propagate to the caller as `AppError::Database`; there is no
//! fallback to the local store once this backend is selected.

use crate::error::AppError;
use crate::models::{ChatMessage, PasswordRecord, Pet, User, Vaccine};
use crate::store::{collections, PetStore};
use async_trait::async_trait;

// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Firestore-backed store.
#[derive(Clone)]
pub struct FirestoreStore {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreStore {
    /// Create a new Firestore store.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock store for testing (offline mode).
    ///
    /// All operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Parent path for a user's own subcollections.
    fn user_path(&self, uid: &str) -> Result<firestore::ParentPathBuilder, AppError> {
        self.get_client()?
            .parent_path(collections::USERS, uid)
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Parent path for one pet's subcollections.
    fn pet_path(
        &self,
        uid: &str,
        pet_id: &str,
    ) -> Result<firestore::ParentPathBuilder, AppError> {
        self.user_path(uid)?
            .at(collections::PETS, pet_id)
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[async_trait]
impl PetStore for FirestoreStore {
    async fn get_user(&self, uid: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(uid)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = email.to_string();
        let mut users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.for_all([q.field("email").eq(email.clone())]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(users.pop())
    }

    async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.uid)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn get_credentials(&self, uid: &str) -> Result<Option<PasswordRecord>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::CREDENTIALS)
            .obj()
            .one(uid)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn set_credentials(&self, record: &PasswordRecord) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::CREDENTIALS)
            .document_id(&record.uid)
            .object(record)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn list_pets(&self, owner_id: &str) -> Result<Vec<Pet>, AppError> {
        let parent = self.user_path(owner_id)?;
        let mut pets: Vec<Pet> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::PETS)
            .parent(&parent)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        // Firestore yields document-id order; sort by creation instant so
        // both backends return the same ordering.
        pets.sort_by(|a, b| (a.created_at, &a.pet_id).cmp(&(b.created_at, &b.pet_id)));
        Ok(pets)
    }

    async fn upsert_pet(&self, pet: &Pet) -> Result<(), AppError> {
        let parent = self.user_path(&pet.owner_id)?;
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PETS)
            .document_id(&pet.pet_id)
            .parent(&parent)
            .object(pet)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn delete_pet(&self, owner_id: &str, pet_id: &str) -> Result<(), AppError> {
        let client = self.get_client()?;

        // Cascade: collect the pet's vaccine records so the pet and its
        // children go away together. Batched transactions keep each commit
        // under the Firestore write limit.
        let vaccines = self.list_vaccines(owner_id, pet_id).await?;
        let user_parent = self.user_path(owner_id)?;
        let pet_parent = self.pet_path(owner_id, pet_id)?;

        let mut chunks = vaccines.chunks(BATCH_SIZE).peekable();
        if chunks.peek().is_none() {
            // No vaccines, just delete the pet document.
            client
                .fluent()
                .delete()
                .from(collections::PETS)
                .parent(&user_parent)
                .document_id(pet_id)
                .execute()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            return Ok(());
        }

        while let Some(chunk) = chunks.next() {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for vaccine in chunk {
                client
                    .fluent()
                    .delete()
                    .from(collections::VACCINES)
                    .parent(&pet_parent)
                    .document_id(&vaccine.vaccine_id)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add vaccine deletion to transaction: {}",
                            e
                        ))
                    })?;
            }

            // The pet document rides in the final batch.
            if chunks.peek().is_none() {
                client
                    .fluent()
                    .delete()
                    .from(collections::PETS)
                    .parent(&user_parent)
                    .document_id(pet_id)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add pet deletion to transaction: {}",
                            e
                        ))
                    })?;
            }

            transaction
                .commit()
                .await
                .map_err(|e| AppError::Database(format!("Cascade delete commit failed: {}", e)))?;
        }

        tracing::debug!(
            owner_id,
            pet_id,
            vaccines = vaccines.len(),
            "Pet deleted with vaccine cascade"
        );

        Ok(())
    }

    async fn list_vaccines(&self, owner_id: &str, pet_id: &str) -> Result<Vec<Vaccine>, AppError> {
        let parent = self.pet_path(owner_id, pet_id)?;
        let mut vaccines: Vec<Vaccine> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::VACCINES)
            .parent(&parent)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        vaccines.sort_by(|a, b| (a.created_at, &a.vaccine_id).cmp(&(b.created_at, &b.vaccine_id)));
        Ok(vaccines)
    }

    async fn upsert_vaccine(&self, owner_id: &str, vaccine: &Vaccine) -> Result<(), AppError> {
        let parent = self.pet_path(owner_id, &vaccine.pet_id)?;
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::VACCINES)
            .document_id(&vaccine.vaccine_id)
            .parent(&parent)
            .object(vaccine)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn delete_vaccine(
        &self,
        owner_id: &str,
        pet_id: &str,
        vaccine_id: &str,
    ) -> Result<(), AppError> {
        let parent = self.pet_path(owner_id, pet_id)?;
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::VACCINES)
            .parent(&parent)
            .document_id(vaccine_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn append_chat(&self, uid: &str, message: &ChatMessage) -> Result<(), AppError> {
        let parent = self.user_path(uid)?;
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::CHAT_HISTORY)
            .document_id(&message.id)
            .parent(&parent)
            .object(message)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn chat_history(&self, uid: &str) -> Result<Vec<ChatMessage>, AppError> {
        let parent = self.user_path(uid)?;
        let mut history: Vec<ChatMessage> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::CHAT_HISTORY)
            .parent(&parent)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        // Sort in memory so both backends return the same ordering.
        history.sort_by_key(|m| m.timestamp);
        Ok(history)
    }
}
