use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::Deref;

#[derive(Eq, PartialEq, Clone, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub(crate) String);

impl From<&str> for ChannelId {
    fn from(id: &str) -> Self {
        ChannelId(id.to_string())
    }
}

impl Deref for ChannelId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelDescriptor {
    pub id: ChannelId,
    pub display_name: String,
    pub icon_ref: String,
    pub source_url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Sound catalog has no channels")]
    Empty,
    #[error("Sound catalog contains channel {0} more than once")]
    DuplicateId(ChannelId),
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),
}

/// Fixed, ordered set of channels a mixer is built from.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct SoundCatalog(Vec<ChannelDescriptor>);

impl SoundCatalog {
    pub fn new(channels: Vec<ChannelDescriptor>) -> Result<Self, CatalogError> {
        if channels.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen = HashSet::new();
        if let Some(duplicate) = channels.iter().find(|c| !seen.insert(&c.id)) {
            return Err(CatalogError::DuplicateId(duplicate.id.clone()));
        }

        Ok(Self(channels))
    }

    pub fn from_json(raw_json: &str) -> Result<Self, CatalogError> {
        Self::new(serde_json::from_str(raw_json)?)
    }

    pub fn channels(&self) -> &[ChannelDescriptor] {
        &self.0
    }
}
