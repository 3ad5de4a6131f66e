//! Upstream response models.
//!
//! Every field the vendor might omit is optional or defaulted, so a missing
//! field becomes "unknown" at render time rather than a parse failure.

pub mod auth;
mod de;
pub mod journey;
pub mod report;

pub use auth::{LoginAccount, LoginResponse, LoginSession};
pub use journey::{Journey, JourneyPage, JourneyStatus};
pub use report::{
    AggregateEnvelope, AggregateStats, BounceBucket, BounceStats, EmailClientStat, EmailClientStats,
    LinkStat, RecipientEngagement, RecipientEngagementEnvelope, RecipientRecord, ReportRun,
    ReportRuns, ReportRunsEnvelope, TopLinks,
};
