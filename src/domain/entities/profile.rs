use serde::{Deserialize, Serialize};

pub const DEFAULT_PROFILE_NAME: &str = "Profile";

/// A named, saved identifier. Owned by the profile store; the scheduler and
/// the configuration agent never see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    /// Saved identifier in display form, or empty when nothing was saved yet.
    #[serde(default)]
    pub mac: String,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
}

impl Profile {
    pub fn new(id: impl Into<String>, name: Option<&str>) -> Self {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_PROFILE_NAME);
        Self {
            id: id.into(),
            name: name.to_string(),
            mac: String::new(),
        }
    }

    pub fn has_saved_identifier(&self) -> bool {
        !self.mac.trim().is_empty()
    }

    pub fn apply_update(&mut self, update: &ProfileUpdate) {
        if let Some(ref name) = update.name {
            self.name = name.clone();
        }
        if let Some(ref mac) = update.mac {
            self.mac = mac.clone();
        }
    }
}

impl ProfileUpdate {
    pub fn rename(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            mac: None,
        }
    }

    pub fn save_identifier(id: impl Into<String>, mac: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            mac: Some(mac.into()),
        }
    }
}

/// First unused "Profile N" name, counting from 1.
pub fn next_profile_name<'a>(existing: impl IntoIterator<Item = &'a str>) -> String {
    let taken: Vec<&str> = existing.into_iter().map(str::trim).collect();
    (1..)
        .map(|n| format!("{} {}", DEFAULT_PROFILE_NAME, n))
        .find(|candidate| !taken.contains(&candidate.as_str()))
        .unwrap_or_else(|| DEFAULT_PROFILE_NAME.to_string())
}
