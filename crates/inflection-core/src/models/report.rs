//! Response bodies of the email report endpoints.

use serde::{Deserialize, Serialize};

use super::de::{lenient_count, null_as_default, string_or_number};

// ===== Aggregate =====

/// `stats.aggregate` wraps its counters in `data` (older deployments use `stats`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregateEnvelope {
    #[serde(default, alias = "stats", deserialize_with = "null_as_default")]
    pub data: AggregateStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    #[serde(default, deserialize_with = "lenient_count")]
    pub sent: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub delivered: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub opened: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub clicked: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub bounced: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub unsubscribed: Option<u64>,
}

/// Percentage of `part` over `whole`; `None` when either side is unknown or
/// the denominator is zero.
fn rate(part: Option<u64>, whole: Option<u64>) -> Option<f64> {
    match (part, whole) {
        (Some(p), Some(w)) if w > 0 => Some(p as f64 * 100.0 / w as f64),
        _ => None,
    }
}

impl AggregateStats {
    pub fn delivery_rate(&self) -> Option<f64> {
        rate(self.delivered, self.sent)
    }

    pub fn open_rate(&self) -> Option<f64> {
        rate(self.opened, self.delivered)
    }

    pub fn click_rate(&self) -> Option<f64> {
        rate(self.clicked, self.delivered)
    }

    pub fn bounce_rate(&self) -> Option<f64> {
        rate(self.bounced, self.sent)
    }

    pub fn unsubscribe_rate(&self) -> Option<f64> {
        rate(self.unsubscribed, self.delivered)
    }
}

// ===== Runs =====

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportRunsEnvelope {
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: ReportRuns,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportRuns {
    #[serde(default, deserialize_with = "null_as_default")]
    pub runs: Vec<ReportRun>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_count: Option<u64>,
}

impl ReportRuns {
    /// Total reported by the server, falling back to the page length.
    pub fn total(&self) -> u64 {
        self.total_count.unwrap_or(self.runs.len() as u64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRun {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

// ===== Breakdowns =====

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BounceStats {
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Vec<BounceBucket>,
}

impl BounceStats {
    pub fn total(&self) -> u64 {
        self.data.iter().filter_map(|b| b.count).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BounceBucket {
    #[serde(default)]
    pub bounce_classification: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub count: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmailClientStats {
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Vec<EmailClientStat>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailClientStat {
    #[serde(default)]
    pub email_client: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub count: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopLinks {
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Vec<LinkStat>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkStat {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub clicks: Option<u64>,
}

// ===== Recipient engagement =====

/// The engagement endpoint has shipped both with and without a `data` wrapper.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RecipientEngagementEnvelope {
    Wrapped { data: RecipientEngagement },
    Bare(RecipientEngagement),
}

impl RecipientEngagementEnvelope {
    pub fn into_inner(self) -> RecipientEngagement {
        match self {
            RecipientEngagementEnvelope::Wrapped { data } => data,
            RecipientEngagementEnvelope::Bare(inner) => inner,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipientEngagement {
    #[serde(default, deserialize_with = "null_as_default")]
    pub records: Vec<RecipientRecord>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_count: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipientRecord {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub opened: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub clicked: Option<u64>,
}
