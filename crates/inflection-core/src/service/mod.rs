//! Business operations built on the authenticated gateway.
//!
//! Each operation validates its arguments, issues one or more calls through
//! `Gateway` and returns a typed result whose `Display` is the user-facing
//! text shared by the MCP, HTTP and Slack front-ends.

pub mod journeys;
pub mod reports;

use thiserror::Error;

use crate::api::ApiError;
use crate::validation::ValidationError;

pub use journeys::{list_journeys, JourneyListing, JourneyQuery};
pub use reports::{get_email_reports, EmailClients, EmailReport, ReportDetails, ReportRequest, Section};

/// Failure of a whole operation: bad arguments or a gateway error.
#[derive(Error, Debug)]
pub enum OperationError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl OperationError {
    pub fn is_validation(&self) -> bool {
        matches!(self, OperationError::Invalid(_))
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, OperationError::Api(e) if e.is_auth())
    }
}
