use async_trait::async_trait;
use crate::domain::entities::{Profile, ProfileUpdate};

// ============================================================================
// REPOSITORY PORTS
// ============================================================================

/// Named-profile persistence. Consumed by the command layer only: it resolves
/// which identifier to apply before calling into the agent or the scheduler.
#[async_trait]
pub trait ProfileStore {
    /// All profiles in insertion order
    async fn list(&self) -> crate::Result<Vec<Profile>>;

    /// Create a profile with an empty saved identifier; blank names become "Profile"
    async fn create(&self, name: Option<&str>) -> crate::Result<Profile>;

    /// Upsert: unknown ids are inserted, known ids get the present fields replaced
    async fn update(&self, update: &ProfileUpdate) -> crate::Result<Profile>;

    /// Delete by id; deleting an unknown id still reports ok
    async fn remove(&self, id: &str) -> crate::Result<RemoveAck>;

    /// Look a single profile up by id
    async fn get(&self, id: &str) -> crate::Result<Profile> {
        self.list()
            .await?
            .into_iter()
            .find(|p| p.id == id)
            .ok_or_else(|| crate::PoserError::ProfileNotFound(id.to_string()))
    }
}

/// `{ok}` acknowledgement returned by [`ProfileStore::remove`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct RemoveAck {
    pub ok: bool,
}
