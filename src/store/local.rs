//! Local file-backed store (fallback mode).
//!
//! Mirrors the on-device storage model: each entity type is one flat JSON
//! array under a fixed key, read and rewritten whole on every operation.
//! Pets and vaccines are filtered by owner/pet id at read time. Suitable
//! for single-device development and offline use; durability is limited
//! to this machine.

use crate::error::AppError;
use crate::models::{ChatMessage, PasswordRecord, Pet, User, Vaccine};
use crate::store::PetStore;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

// Fixed record-set keys, one JSON array file per key.
const USERS_KEY: &str = "users";
const CREDENTIALS_KEY: &str = "credentials";
const PETS_KEY: &str = "pets";
const VACCINES_KEY: &str = "vaccines";

/// File-backed key-value store over flat JSON arrays.
pub struct LocalStore {
    dir: PathBuf,
    // Serializes read-modify-write cycles against the array files.
    lock: RwLock<()>,
}

impl LocalStore {
    /// Create a local store rooted at `dir`, creating it if needed.
    pub async fn new(dir: &Path) -> Result<Self, AppError> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| AppError::Database(format!("Failed to create data dir: {}", e)))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            lock: RwLock::new(()),
        })
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn chat_key(uid: &str) -> String {
        format!("chat_{}", uid)
    }

    /// Read the full array for a key; a missing file is an empty array.
    async fn read_array<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, AppError> {
        match tokio::fs::read(self.key_path(key)).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| AppError::Database(format!("Corrupt local data for {}: {}", key, e))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(AppError::Database(format!(
                "Failed to read local data for {}: {}",
                key, e
            ))),
        }
    }

    /// Rewrite the full array for a key.
    async fn write_array<T: Serialize>(&self, key: &str, items: &[T]) -> Result<(), AppError> {
        let bytes = serde_json::to_vec(items)
            .map_err(|e| AppError::Database(format!("Failed to serialize {}: {}", key, e)))?;
        tokio::fs::write(self.key_path(key), bytes)
            .await
            .map_err(|e| AppError::Database(format!("Failed to write local data for {}: {}", key, e)))
    }

    /// Replace-or-append by id, preserving insertion order.
    async fn upsert_by<T, F>(&self, key: &str, item: &T, matches: F) -> Result<(), AppError>
    where
        T: Serialize + DeserializeOwned + Clone,
        F: Fn(&T) -> bool,
    {
        let _guard = self.lock.write().await;
        let mut items: Vec<T> = self.read_array(key).await?;
        match items.iter_mut().find(|existing| matches(existing)) {
            Some(existing) => *existing = item.clone(),
            None => items.push(item.clone()),
        }
        self.write_array(key, &items).await
    }
}

#[async_trait]
impl PetStore for LocalStore {
    async fn get_user(&self, uid: &str) -> Result<Option<User>, AppError> {
        let _guard = self.lock.read().await;
        let users: Vec<User> = self.read_array(USERS_KEY).await?;
        Ok(users.into_iter().find(|u| u.uid == uid))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let _guard = self.lock.read().await;
        let users: Vec<User> = self.read_array(USERS_KEY).await?;
        Ok(users.into_iter().find(|u| u.email == email))
    }

    async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let uid = user.uid.clone();
        self.upsert_by(USERS_KEY, user, |u: &User| u.uid == uid).await
    }

    async fn get_credentials(&self, uid: &str) -> Result<Option<PasswordRecord>, AppError> {
        let _guard = self.lock.read().await;
        let records: Vec<PasswordRecord> = self.read_array(CREDENTIALS_KEY).await?;
        Ok(records.into_iter().find(|r| r.uid == uid))
    }

    async fn set_credentials(&self, record: &PasswordRecord) -> Result<(), AppError> {
        let uid = record.uid.clone();
        self.upsert_by(CREDENTIALS_KEY, record, |r: &PasswordRecord| r.uid == uid)
            .await
    }

    async fn list_pets(&self, owner_id: &str) -> Result<Vec<Pet>, AppError> {
        let _guard = self.lock.read().await;
        let pets: Vec<Pet> = self.read_array(PETS_KEY).await?;
        let mut pets: Vec<Pet> = pets.into_iter().filter(|p| p.owner_id == owner_id).collect();
        pets.sort_by(|a, b| (a.created_at, &a.pet_id).cmp(&(b.created_at, &b.pet_id)));
        Ok(pets)
    }

    async fn upsert_pet(&self, pet: &Pet) -> Result<(), AppError> {
        let pet_id = pet.pet_id.clone();
        self.upsert_by(PETS_KEY, pet, |p: &Pet| p.pet_id == pet_id).await
    }

    async fn delete_pet(&self, owner_id: &str, pet_id: &str) -> Result<(), AppError> {
        let _guard = self.lock.write().await;

        let mut pets: Vec<Pet> = self.read_array(PETS_KEY).await?;
        pets.retain(|p| !(p.owner_id == owner_id && p.pet_id == pet_id));
        self.write_array(PETS_KEY, &pets).await?;

        // Cascade: drop the pet's vaccine records with it.
        let mut vaccines: Vec<Vaccine> = self.read_array(VACCINES_KEY).await?;
        let before = vaccines.len();
        vaccines.retain(|v| v.pet_id != pet_id);
        if vaccines.len() != before {
            self.write_array(VACCINES_KEY, &vaccines).await?;
        }

        Ok(())
    }

    async fn list_vaccines(&self, _owner_id: &str, pet_id: &str) -> Result<Vec<Vaccine>, AppError> {
        let _guard = self.lock.read().await;
        let vaccines: Vec<Vaccine> = self.read_array(VACCINES_KEY).await?;
        let mut vaccines: Vec<Vaccine> =
            vaccines.into_iter().filter(|v| v.pet_id == pet_id).collect();
        vaccines.sort_by(|a, b| (a.created_at, &a.vaccine_id).cmp(&(b.created_at, &b.vaccine_id)));
        Ok(vaccines)
    }

    async fn upsert_vaccine(&self, _owner_id: &str, vaccine: &Vaccine) -> Result<(), AppError> {
        let vaccine_id = vaccine.vaccine_id.clone();
        self.upsert_by(VACCINES_KEY, vaccine, |v: &Vaccine| {
            v.vaccine_id == vaccine_id
        })
        .await
    }

    async fn delete_vaccine(
        &self,
        _owner_id: &str,
        pet_id: &str,
        vaccine_id: &str,
    ) -> Result<(), AppError> {
        let _guard = self.lock.write().await;
        let mut vaccines: Vec<Vaccine> = self.read_array(VACCINES_KEY).await?;
        vaccines.retain(|v| !(v.pet_id == pet_id && v.vaccine_id == vaccine_id));
        self.write_array(VACCINES_KEY, &vaccines).await
    }

    async fn append_chat(&self, uid: &str, message: &ChatMessage) -> Result<(), AppError> {
        let key = Self::chat_key(uid);
        let _guard = self.lock.write().await;
        let mut history: Vec<ChatMessage> = self.read_array(&key).await?;
        history.push(message.clone());
        self.write_array(&key, &history).await
    }

    async fn chat_history(&self, uid: &str) -> Result<Vec<ChatMessage>, AppError> {
        let key = Self::chat_key(uid);
        let _guard = self.lock.read().await;
        let mut history: Vec<ChatMessage> = self.read_array(&key).await?;
        history.sort_by_key(|m| m.timestamp);
        Ok(history)
    }
}
