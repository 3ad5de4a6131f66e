//! Core library for inflection-mcp.
//!
//! Talks to the Inflection.io marketing automation API: session-token login,
//! the authenticated request gateway with re-login on 401, typed response
//! models, and the two read operations exposed by every front-end
//! (`list_journeys` and `get_email_reports`).

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod service;
pub mod utils;
pub mod validation;

pub use api::{ApiError, Gateway, RequestFailure};
pub use auth::Credentials;
pub use config::ApiConfig;
pub use service::{
    get_email_reports, list_journeys, EmailReport, JourneyListing, JourneyQuery, OperationError,
    ReportRequest, Section,
};
pub use validation::ValidationError;
