use serde::{Deserialize, Serialize};

use super::de::{lenient_count, null_as_default, string_or_number};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JourneyStatus {
    Draft,
    Active,
    Inactive,
}

impl std::fmt::Display for JourneyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JourneyStatus::Draft => write!(f, "Draft"),
            JourneyStatus::Active => write!(f, "Active"),
            JourneyStatus::Inactive => write!(f, "Inactive"),
        }
    }
}

/// One page of `campaign.list`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JourneyPage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub records: Vec<Journey>,
    #[serde(default, alias = "total_pages", deserialize_with = "lenient_count")]
    pub page_count: Option<u64>,
    #[serde(default, alias = "total_count", deserialize_with = "lenient_count")]
    pub record_count: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Journey {
    #[serde(default, deserialize_with = "string_or_number")]
    pub campaign_id: Option<String>,
    // Older listings only carry `id`
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub active: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub draft: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Journey {
    /// Draft wins over the active flag.
    pub fn status(&self) -> JourneyStatus {
        if self.draft {
            JourneyStatus::Draft
        } else if self.active {
            JourneyStatus::Active
        } else {
            JourneyStatus::Inactive
        }
    }

    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or("Unnamed Journey")
    }

    pub fn display_id(&self) -> &str {
        self.campaign_id
            .as_deref()
            .or(self.id.as_deref())
            .unwrap_or("Unknown ID")
    }
}
