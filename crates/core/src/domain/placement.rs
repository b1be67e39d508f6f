use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlacementId(pub String);

impl std::fmt::Display for PlacementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of a background order placement. The submitting caller only
/// ever sees the 202 acknowledgment; this record is how placement outcome
/// stays queryable afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementStatus {
    Queued,
    Running,
    Placed,
    Failed,
}

impl PlacementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Placed => "placed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "queued" => Some(Self::Queued),
            "running" => Some(Self::Running),
            "placed" => Some(Self::Placed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub id: PlacementId,
    pub status: PlacementStatus,
    pub shopping_list: Vec<String>,
    pub error: Option<String>,
    pub order_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use crate::domain::placement::PlacementStatus;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            PlacementStatus::Queued,
            PlacementStatus::Running,
            PlacementStatus::Placed,
            PlacementStatus::Failed,
        ] {
            assert_eq!(PlacementStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PlacementStatus::parse("cancelled"), None);
    }
}
