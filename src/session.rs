//! Session snapshot cache.
//!
//! Tracks "who is logged in" independently of the durable backend: the
//! last-established `User` snapshot per uid, held in memory and mirrored
//! to one JSON file per uid so it survives restarts. The snapshot may be
//! stale for fields mutated elsewhere, but never for mutations made
//! through this process — every authoritative write is followed by a
//! [`SessionManager::refresh`].

use crate::error::AppError;
use crate::models::{UsageStats, User};
use dashmap::DashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Per-uid cached user snapshots, memory-first with file persistence.
pub struct SessionManager {
    dir: PathBuf,
    cache: DashMap<String, User>,
}

impl SessionManager {
    /// Create a session manager persisting under `<data_dir>/sessions`.
    pub async fn new(data_dir: &Path) -> Result<Self, AppError> {
        let dir = data_dir.join("sessions");
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::Database(format!("Failed to create session dir: {}", e)))?;
        Ok(Self {
            dir,
            cache: DashMap::new(),
        })
    }

    fn snapshot_path(&self, uid: &str) -> PathBuf {
        self.dir.join(format!("{}.json", uid))
    }

    /// Persist a full user snapshot, replacing any previous one.
    pub async fn establish(&self, user: &User) -> Result<(), AppError> {
        let bytes = serde_json::to_vec(user)
            .map_err(|e| AppError::Database(format!("Failed to serialize session: {}", e)))?;
        tokio::fs::write(self.snapshot_path(&user.uid), bytes)
            .await
            .map_err(|e| AppError::Database(format!("Failed to write session: {}", e)))?;
        self.cache.insert(user.uid.clone(), user.clone());
        Ok(())
    }

    /// Re-persist the snapshot after an authoritative-record mutation.
    ///
    /// Callers pass the merged, post-mutation user so the cache never lags
    /// this device's own writes.
    pub async fn refresh(&self, user: &User) -> Result<(), AppError> {
        tracing::debug!(uid = %user.uid, "Refreshing session snapshot");
        self.establish(user).await
    }

    /// The last-established snapshot for `uid`, or `None`.
    ///
    /// Missing usage counters are repaired to zero defaults on the returned
    /// copy only; neither the cache nor the persisted snapshot is rewritten.
    pub async fn current(&self, uid: &str) -> Result<Option<User>, AppError> {
        if let Some(user) = self.cache.get(uid) {
            return Ok(Some(repair_usage(user.clone())));
        }

        match tokio::fs::read(self.snapshot_path(uid)).await {
            Ok(bytes) => {
                let user: User = serde_json::from_slice(&bytes)
                    .map_err(|e| AppError::Database(format!("Corrupt session snapshot: {}", e)))?;
                self.cache.insert(uid.to_string(), user.clone());
                Ok(Some(repair_usage(user)))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Database(format!(
                "Failed to read session: {}",
                e
            ))),
        }
    }

    /// Remove the snapshot unconditionally. Clearing an absent session is
    /// not an error.
    pub async fn clear(&self, uid: &str) -> Result<(), AppError> {
        self.cache.remove(uid);
        match tokio::fs::remove_file(self.snapshot_path(uid)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Database(format!(
                "Failed to clear session: {}",
                e
            ))),
        }
    }
}

/// Zero-default repair for snapshots persisted before usage tracking.
fn repair_usage(mut user: User) -> User {
    if user.usage.is_none() {
        user.usage = Some(UsageStats::default());
    }
    user
}
