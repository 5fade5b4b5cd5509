use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::entities::{Profile, ProfileUpdate};
use crate::domain::ports::repository::*;

// ============================================================================
// JSON PROFILE STORE IMPLEMENTATION
// ============================================================================

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProfileDocument {
    #[serde(default)]
    profiles: Vec<Profile>,
}

/// Profiles kept in a single `{ "profiles": [...] }` JSON document.
///
/// A missing file reads as an empty list. Every mutation rewrites the whole
/// document through a sibling temp file and a rename.
pub struct JsonProfileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> crate::Result<ProfileDocument> {
        match fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(ProfileDocument::default()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ProfileDocument::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn persist(&self, document: &ProfileDocument) -> crate::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(document)?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, content).await?;
        fs::rename(&staging, &self.path).await?;

        debug!(path = %self.path.display(), count = document.profiles.len(), "profiles saved");
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for JsonProfileStore {
    async fn list(&self) -> crate::Result<Vec<Profile>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.profiles)
    }

    async fn create(&self, name: Option<&str>) -> crate::Result<Profile> {
        let _guard = self.lock.lock().await;
        let mut document = self.load().await?;

        let profile = Profile::new(uuid::Uuid::new_v4().to_string(), name);
        document.profiles.push(profile.clone());
        self.persist(&document).await?;

        Ok(profile)
    }

    async fn update(&self, update: &ProfileUpdate) -> crate::Result<Profile> {
        let _guard = self.lock.lock().await;
        let mut document = self.load().await?;

        let index = match document.profiles.iter().position(|p| p.id == update.id) {
            Some(index) => index,
            None => {
                document.profiles.push(Profile::new(update.id.clone(), None));
                document.profiles.len() - 1
            }
        };

        let profile = &mut document.profiles[index];
        profile.apply_update(update);
        let updated = profile.clone();

        self.persist(&document).await?;
        Ok(updated)
    }

    async fn remove(&self, id: &str) -> crate::Result<RemoveAck> {
        let _guard = self.lock.lock().await;
        let mut document = self.load().await?;

        let before = document.profiles.len();
        document.profiles.retain(|p| p.id != id);
        if document.profiles.len() != before {
            self.persist(&document).await?;
        }

        Ok(RemoveAck { ok: true })
    }
}
