//! REST API access for Inflection.io.
//!
//! `ApiClient` is the raw transport (pooled client, login call, network
//! retries). `Gateway` layers the cached session on top and owns the
//! re-authenticate-once-on-401 contract. Business operations only ever talk
//! to `Gateway`.

pub mod client;
pub mod error;
pub mod gateway;
pub mod request;

pub use client::ApiClient;
pub use error::{ApiError, RequestFailure};
pub use gateway::Gateway;
pub use request::{Method, RequestDescriptor};
