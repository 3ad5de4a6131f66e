//! Input validation for tool and route arguments.

use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use regex::Regex;
use thiserror::Error;

/// Largest page the campaign listing endpoint accepts
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid email format")]
    InvalidEmail,

    #[error("Password is required")]
    MissingPassword,

    #[error("Invalid journey ID format")]
    InvalidJourneyId,

    #[error("Invalid {field} '{value}': expected YYYY-MM-DD or an ISO 8601 timestamp")]
    InvalidDate { field: &'static str, value: String },

    #[error("start_date must not be after end_date")]
    InvalidDateRange,

    #[error("page_size must be between 1 and {max}, got {value}")]
    PageSizeOutOfRange { value: i64, max: u32 },

    #[error("page_number must be at least 1, got {0}")]
    PageNumberOutOfRange(i64),
}

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
static JOURNEY_ID_RE: OnceLock<Regex> = OnceLock::new();

fn email_re() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("static regex")
    })
}

fn journey_id_re() -> &'static Regex {
    JOURNEY_ID_RE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("static regex"))
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email_re().is_match(email) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail)
    }
}

pub fn validate_journey_id(journey_id: &str) -> Result<(), ValidationError> {
    if journey_id_re().is_match(journey_id) {
        Ok(())
    } else {
        Err(ValidationError::InvalidJourneyId)
    }
}

pub fn validate_page_size(page_size: i64) -> Result<u32, ValidationError> {
    if (1..=i64::from(MAX_PAGE_SIZE)).contains(&page_size) {
        Ok(page_size as u32)
    } else {
        Err(ValidationError::PageSizeOutOfRange {
            value: page_size,
            max: MAX_PAGE_SIZE,
        })
    }
}

pub fn validate_page_number(page_number: i64) -> Result<u32, ValidationError> {
    if page_number >= 1 && page_number <= i64::from(u32::MAX) {
        Ok(page_number as u32)
    } else {
        Err(ValidationError::PageNumberOutOfRange(page_number))
    }
}

/// Parse a user-supplied report boundary.
///
/// Accepts `YYYY-MM-DD` (start of day, or end of day when `end_of_day`),
/// RFC 3339, or a naive `YYYY-MM-DDTHH:MM:SS` that is read in `offset`.
pub fn parse_report_date(
    field: &'static str,
    value: &str,
    offset: FixedOffset,
    end_of_day: bool,
) -> Result<DateTime<FixedOffset>, ValidationError> {
    let value = value.trim();
    let invalid = || ValidationError::InvalidDate {
        field,
        value: value.to_string(),
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&offset));
    }

    let naive = if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        let (h, m, s) = if end_of_day { (23, 59, 59) } else { (0, 0, 0) };
        let time = NaiveTime::from_hms_opt(h, m, s).ok_or_else(invalid)?;
        NaiveDateTime::new(date, time)
    } else {
        NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").map_err(|_| invalid())?
    };

    offset.from_local_datetime(&naive).single().ok_or_else(invalid)
}
