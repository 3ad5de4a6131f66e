use std::fmt;

use serde_json::{json, Value};
use tracing::info;

use crate::api::{ApiError, Gateway, RequestDescriptor};
use crate::config::endpoints;
use crate::models::{Journey, JourneyPage};
use crate::utils::format_timestamp;
use crate::validation::{validate_page_number, validate_page_size, ValidationError};

/// Default page size for journey listings
pub const DEFAULT_PAGE_SIZE: u32 = 30;

/// Validated arguments of `list_journeys`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JourneyQuery {
    pub page_size: u32,
    pub page_number: u32,
    pub search_keyword: String,
}

impl Default for JourneyQuery {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            page_number: 1,
            search_keyword: String::new(),
        }
    }
}

impl JourneyQuery {
    pub fn new(
        page_size: Option<i64>,
        page_number: Option<i64>,
        search_keyword: Option<&str>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            page_size: page_size.map(validate_page_size).transpose()?.unwrap_or(DEFAULT_PAGE_SIZE),
            page_number: page_number.map(validate_page_number).transpose()?.unwrap_or(1),
            search_keyword: search_keyword.unwrap_or_default().trim().to_string(),
        })
    }

    fn payload(&self) -> Value {
        json!({
            "page_size": self.page_size,
            "page_number": self.page_number,
            "query": {
                "search": {
                    "keyword": self.search_keyword,
                    "fields": ["name"]
                }
            }
        })
    }
}

/// One page of journeys plus the query that produced it.
#[derive(Debug, Clone)]
pub struct JourneyListing {
    pub query: JourneyQuery,
    pub page: JourneyPage,
}

impl JourneyListing {
    pub fn journeys(&self) -> &[Journey] {
        &self.page.records
    }

    pub fn total_pages(&self) -> u64 {
        self.page.page_count.unwrap_or(1)
    }

    pub fn total_count(&self) -> u64 {
        self.page.record_count.unwrap_or(self.page.records.len() as u64)
    }
}

impl fmt::Display for JourneyListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let journeys = self.journeys();
        if journeys.is_empty() {
            return write!(f, "📭 No journeys found.");
        }

        write!(
            f,
            "📊 Found {} journeys (Page {} of {}, Total: {})",
            journeys.len(),
            self.query.page_number,
            self.total_pages(),
            self.total_count()
        )?;
        if !self.query.search_keyword.is_empty() {
            write!(f, " matching '{}'", self.query.search_keyword)?;
        }

        for (i, journey) in journeys.iter().enumerate() {
            let created = journey
                .created_at
                .as_deref()
                .map(format_timestamp)
                .unwrap_or_else(|| "Unknown".to_string());
            write!(
                f,
                "\n\n{}. **{}** (ID: `{}`)\n   - Status: {}\n   - Created: {}",
                i + 1,
                journey.display_name(),
                journey.display_id(),
                journey.status(),
                created
            )?;
        }
        Ok(())
    }
}

/// List marketing journeys, optionally filtered by name.
pub async fn list_journeys(gateway: &Gateway, query: &JourneyQuery) -> Result<JourneyListing, ApiError> {
    info!(
        page_size = query.page_size,
        page_number = query.page_number,
        search_keyword = %query.search_keyword,
        "Listing journeys"
    );

    let request = RequestDescriptor::post(
        gateway.config().campaign_url(endpoints::JOURNEYS),
        query.payload(),
    );
    let page: JourneyPage = gateway.fetch(&request).await?;

    let listing = JourneyListing {
        query: query.clone(),
        page,
    };
    info!(
        count = listing.journeys().len(),
        total_pages = listing.total_pages(),
        total_count = listing.total_count(),
        "Journeys listed"
    );
    Ok(listing)
}
