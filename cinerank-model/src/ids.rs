use std::str::FromStr;

use uuid::Uuid;

use crate::error::ModelError;

/// Strongly typed ID for a ranked item (one user's rating of one movie)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct RankedItemId(pub Uuid);

impl Default for RankedItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl RankedItemId {
    pub fn new() -> Self {
        RankedItemId(Uuid::now_v7())
    }

    pub fn to_uuid(&self) -> Uuid {
        self.0
    }
}

impl AsRef<Uuid> for RankedItemId {
    fn as_ref(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for RankedItemId {
    fn from(id: Uuid) -> Self {
        RankedItemId(id)
    }
}

impl FromStr for RankedItemId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(RankedItemId)
            .map_err(|_| ModelError::InvalidId(s.to_string()))
    }
}

impl std::fmt::Display for RankedItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
