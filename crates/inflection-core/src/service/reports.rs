//! Comprehensive email report for one journey.
//!
//! The report fans out to up to seven report endpoints concurrently. Every
//! sub-call is independent: a failure turns its section into
//! `Section::Unavailable` and the rest of the report is still returned.
//! Only the authentication pre-flight can fail the whole operation.

use std::fmt;

use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::api::{ApiError, Gateway, RequestDescriptor};
use crate::config::endpoints;
use crate::models::{
    AggregateEnvelope, AggregateStats, BounceStats, EmailClientStats, RecipientEngagement,
    RecipientEngagementEnvelope, ReportRuns, ReportRunsEnvelope, TopLinks,
};
use crate::utils::{format_count, format_optional_count, format_percent, format_timestamp, truncate_string};
use crate::validation::{parse_report_date, validate_journey_id, ValidationError};

// ===== Constants =====

/// Default lookback when no start date is given
const DEFAULT_LOOKBACK_DAYS: i64 = 30;

/// Wire format of report boundaries: `2025-06-07T12:38:40+05:30`
const REPORT_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

const RUNS_PAGE_SIZE: u32 = 15;
const EMAIL_CLIENT_PAGE_SIZE: u32 = 1000;
const TOP_LINKS_PAGE_SIZE: u32 = 5;
const ENGAGEMENT_PAGE_SIZE: u32 = 15;

/// How many runs / clients / recipients are listed in the text output
const RUNS_SHOWN: usize = 5;
const EMAIL_CLIENTS_SHOWN: usize = 3;
const RECIPIENTS_SHOWN: usize = 5;

const MAX_LINK_DISPLAY_LEN: usize = 60;
const MAX_REASON_LEN: usize = 160;

// ===== Request =====

/// Validated arguments of `get_email_reports`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRequest {
    pub journey_id: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub include_details: bool,
}

impl ReportRequest {
    /// Validate the journey id and resolve the date range in `offset`.
    /// Missing start is thirty days before now, missing end is now.
    pub fn new(
        journey_id: &str,
        start_date: Option<&str>,
        end_date: Option<&str>,
        include_details: Option<bool>,
        offset: FixedOffset,
    ) -> Result<Self, ValidationError> {
        let journey_id = journey_id.trim();
        validate_journey_id(journey_id)?;

        let now = Utc::now().with_timezone(&offset);
        let start = match non_blank(start_date) {
            Some(raw) => parse_report_date("start_date", raw, offset, false)?,
            None => now - Duration::days(DEFAULT_LOOKBACK_DAYS),
        };
        let end = match non_blank(end_date) {
            Some(raw) => parse_report_date("end_date", raw, offset, true)?,
            None => now,
        };
        if start > end {
            return Err(ValidationError::InvalidDateRange);
        }

        Ok(Self {
            journey_id: journey_id.to_string(),
            start,
            end,
            include_details: include_details.unwrap_or(true),
        })
    }

    pub fn start_param(&self) -> String {
        self.start.format(REPORT_DATE_FORMAT).to_string()
    }

    pub fn end_param(&self) -> String {
        self.end.format(REPORT_DATE_FORMAT).to_string()
    }

    fn base_payload(&self) -> serde_json::Map<String, Value> {
        let mut payload = serde_json::Map::new();
        payload.insert("campaign_id".into(), json!(self.journey_id));
        payload.insert("start_date".into(), json!(self.start_param()));
        payload.insert("end_date".into(), json!(self.end_param()));
        payload
    }

    fn paged_payload(&self, page_size: u32) -> Value {
        let mut payload = self.base_payload();
        payload.insert("page_number".into(), json!(1));
        payload.insert("page_size".into(), json!(page_size));
        Value::Object(payload)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// ===== Sections =====

/// Outcome of one sub-report.
#[derive(Debug, Clone, PartialEq)]
pub enum Section<T> {
    Available(T),
    Unavailable(String),
}

impl<T> Section<T> {
    fn from_result(name: &str, result: Result<T, ApiError>) -> Self {
        match result {
            Ok(data) => Section::Available(data),
            Err(e) => {
                warn!(section = name, error = %e, "Report section unavailable");
                Section::Unavailable(truncate_string(&e.to_string(), MAX_REASON_LEN))
            }
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Section::Available(_))
    }

    pub fn available(&self) -> Option<&T> {
        match self {
            Section::Available(data) => Some(data),
            Section::Unavailable(_) => None,
        }
    }
}

/// Email client rankings by click and by open.
#[derive(Debug, Clone, Default)]
pub struct EmailClients {
    pub by_click: EmailClientStats,
    pub by_open: EmailClientStats,
}

#[derive(Debug, Clone)]
pub struct ReportDetails {
    pub bounces: Section<BounceStats>,
    pub email_clients: Section<EmailClients>,
    pub top_links: Section<TopLinks>,
    pub engagement: Section<RecipientEngagement>,
}

#[derive(Debug, Clone)]
pub struct EmailReport {
    pub request: ReportRequest,
    pub aggregate: Section<AggregateStats>,
    pub runs: Section<ReportRuns>,
    pub details: Option<ReportDetails>,
}

impl EmailReport {
    /// Number of sections that could not be fetched
    pub fn unavailable_count(&self) -> usize {
        let mut count = [self.aggregate.is_available(), self.runs.is_available()]
            .iter()
            .filter(|ok| !**ok)
            .count();
        if let Some(ref d) = self.details {
            count += [
                d.bounces.is_available(),
                d.email_clients.is_available(),
                d.top_links.is_available(),
                d.engagement.is_available(),
            ]
            .iter()
            .filter(|ok| !**ok)
            .count();
        }
        count
    }
}

// ===== Operation =====

/// Build the comprehensive email report for `request.journey_id`.
///
/// Fails only when authentication fails up front; every sub-call failure is
/// captured in its section.
pub async fn get_email_reports(gateway: &Gateway, request: &ReportRequest) -> Result<EmailReport, ApiError> {
    info!(
        journey_id = %request.journey_id,
        start_date = %request.start_param(),
        end_date = %request.end_param(),
        include_details = request.include_details,
        "Fetching email reports"
    );

    gateway.ensure_authenticated().await?;

    let report = if request.include_details {
        let (aggregate, runs, bounces, email_clients, top_links, engagement) = tokio::join!(
            fetch_aggregate(gateway, request),
            fetch_runs(gateway, request),
            fetch_bounces(gateway, request),
            fetch_email_clients(gateway, request),
            fetch_top_links(gateway, request),
            fetch_engagement(gateway, request),
        );
        EmailReport {
            request: request.clone(),
            aggregate: Section::from_result("aggregate", aggregate),
            runs: Section::from_result("runs", runs),
            details: Some(ReportDetails {
                bounces: Section::from_result("bounces", bounces),
                email_clients: Section::from_result("email_clients", email_clients),
                top_links: Section::from_result("top_links", top_links),
                engagement: Section::from_result("engagement", engagement),
            }),
        }
    } else {
        let (aggregate, runs) = tokio::join!(
            fetch_aggregate(gateway, request),
            fetch_runs(gateway, request),
        );
        EmailReport {
            request: request.clone(),
            aggregate: Section::from_result("aggregate", aggregate),
            runs: Section::from_result("runs", runs),
            details: None,
        }
    };

    info!(
        journey_id = %request.journey_id,
        unavailable_sections = report.unavailable_count(),
        "Email report generated"
    );
    Ok(report)
}

async fn post<T: DeserializeOwned>(gateway: &Gateway, path: &str, payload: Value) -> Result<T, ApiError> {
    let request = RequestDescriptor::post(gateway.config().campaign_url(path), payload);
    gateway.fetch(&request).await
}

async fn fetch_aggregate(gateway: &Gateway, request: &ReportRequest) -> Result<AggregateStats, ApiError> {
    let payload = Value::Object(request.base_payload());
    let envelope: AggregateEnvelope = post(gateway, endpoints::AGGREGATE_STATS, payload).await?;
    Ok(envelope.data)
}

async fn fetch_runs(gateway: &Gateway, request: &ReportRequest) -> Result<ReportRuns, ApiError> {
    let mut payload = request.paged_payload(RUNS_PAGE_SIZE);
    payload["show_non_empty_runs"] = json!(false);
    let envelope: ReportRunsEnvelope = post(gateway, endpoints::REPORT_RUNS, payload).await?;
    Ok(envelope.data)
}

async fn fetch_bounces(gateway: &Gateway, request: &ReportRequest) -> Result<BounceStats, ApiError> {
    let url = gateway
        .config()
        .campaign_v3_url(&endpoints::bounce_stats(&request.journey_id));
    let descriptor = RequestDescriptor::get(url)
        .with_query("view", "aggregate")
        .with_query("group_by", "bounce_classification")
        .with_query("event", "bounce")
        .with_query("start_date", request.start_param())
        .with_query("end_date", request.end_param());
    gateway.fetch(&descriptor).await
}

async fn fetch_email_clients(gateway: &Gateway, request: &ReportRequest) -> Result<EmailClients, ApiError> {
    let (by_click, by_open) = tokio::join!(
        post::<EmailClientStats>(
            gateway,
            endpoints::TOP_EMAIL_CLIENT_CLICK,
            request.paged_payload(EMAIL_CLIENT_PAGE_SIZE),
        ),
        post::<EmailClientStats>(
            gateway,
            endpoints::TOP_EMAIL_CLIENT_OPEN,
            request.paged_payload(EMAIL_CLIENT_PAGE_SIZE),
        ),
    );
    Ok(EmailClients {
        by_click: by_click?,
        by_open: by_open?,
    })
}

async fn fetch_top_links(gateway: &Gateway, request: &ReportRequest) -> Result<TopLinks, ApiError> {
    post(gateway, endpoints::TOP_LINK, request.paged_payload(TOP_LINKS_PAGE_SIZE)).await
}

async fn fetch_engagement(gateway: &Gateway, request: &ReportRequest) -> Result<RecipientEngagement, ApiError> {
    let mut payload = request.paged_payload(ENGAGEMENT_PAGE_SIZE);
    payload["query"] = json!({"search": {"keyword": "", "fields": ["email", "name"]}});
    let envelope: RecipientEngagementEnvelope =
        post(gateway, endpoints::RECIPIENT_ENGAGEMENT, payload).await?;
    Ok(envelope.into_inner())
}

// ===== Rendering =====

fn write_section<T>(
    f: &mut fmt::Formatter<'_>,
    title: &str,
    section: &Section<T>,
    render: impl Fn(&T) -> String,
) -> fmt::Result {
    match section {
        Section::Available(data) => write!(f, "\n\n**{}:**\n{}", title, render(data)),
        Section::Unavailable(reason) => write!(f, "\n\n**{}:** Data unavailable ({})", title, reason),
    }
}

fn render_aggregate(stats: &AggregateStats) -> String {
    format!(
        "📧 **Sent:** {}\n\
         ✅ **Delivered:** {} ({})\n\
         👁️ **Opened:** {} ({})\n\
         🔗 **Clicked:** {} ({})\n\
         📤 **Bounced:** {} ({})\n\
         🚫 **Unsubscribed:** {} ({})",
        format_optional_count(stats.sent),
        format_optional_count(stats.delivered),
        format_percent(stats.delivery_rate()),
        format_optional_count(stats.opened),
        format_percent(stats.open_rate()),
        format_optional_count(stats.clicked),
        format_percent(stats.click_rate()),
        format_optional_count(stats.bounced),
        format_percent(stats.bounce_rate()),
        format_optional_count(stats.unsubscribed),
        format_percent(stats.unsubscribe_rate()),
    )
}

fn render_runs(runs: &ReportRuns) -> String {
    if runs.runs.is_empty() {
        return "No report runs found for the specified date range.".to_string();
    }

    let mut lines = vec![format!("**Total Runs:** {}", format_count(runs.total()))];
    for (i, run) in runs.runs.iter().take(RUNS_SHOWN).enumerate() {
        let created = run
            .created_at
            .as_deref()
            .map(format_timestamp)
            .unwrap_or_else(|| "Unknown".to_string());
        lines.push(format!(
            "{}. **{}** - {} ({})",
            i + 1,
            run.id.as_deref().unwrap_or("Unknown"),
            run.status.as_deref().unwrap_or("Unknown"),
            created
        ));
    }
    if runs.runs.len() > RUNS_SHOWN {
        lines.push(format!("... and {} more runs", runs.runs.len() - RUNS_SHOWN));
    }
    lines.join("\n")
}

fn render_bounces(stats: &BounceStats) -> String {
    if stats.data.is_empty() {
        return "No bounce data available for the specified date range.".to_string();
    }

    let mut lines = Vec::with_capacity(stats.data.len() + 1);
    let total = stats.total();
    if total > 0 {
        lines.push(format!("**Total Bounces:** {}", format_count(total)));
    }
    for bucket in &stats.data {
        lines.push(format!(
            "• **{}:** {}",
            bucket.bounce_classification.as_deref().unwrap_or("Unknown"),
            format_optional_count(bucket.count)
        ));
    }
    lines.join("\n")
}

fn render_email_clients(clients: &EmailClients) -> String {
    let mut lines = Vec::new();
    for (label, unit, stats) in [
        ("Clicks", "clicks", &clients.by_click),
        ("Opens", "opens", &clients.by_open),
    ] {
        if stats.data.is_empty() {
            continue;
        }
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push(format!("**Top Email Clients ({}):**", label));
        for (i, client) in stats.data.iter().take(EMAIL_CLIENTS_SHOWN).enumerate() {
            lines.push(format!(
                "{}. {}: {} {}",
                i + 1,
                client.email_client.as_deref().unwrap_or("Unknown"),
                format_optional_count(client.count),
                unit
            ));
        }
    }

    if lines.is_empty() {
        "No email client data available.".to_string()
    } else {
        lines.join("\n")
    }
}

fn render_top_links(links: &TopLinks) -> String {
    if links.data.is_empty() {
        return "No link performance data available for the specified date range.".to_string();
    }

    links
        .data
        .iter()
        .enumerate()
        .map(|(i, link)| {
            format!(
                "{}. **{}** - {} clicks",
                i + 1,
                truncate_string(link.url.as_deref().unwrap_or("Unknown"), MAX_LINK_DISPLAY_LEN),
                format_optional_count(link.clicks)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_engagement(engagement: &RecipientEngagement) -> String {
    if engagement.records.is_empty() {
        return "No recipient engagement data available.".to_string();
    }

    let total = engagement
        .total_count
        .unwrap_or(engagement.records.len() as u64);
    let mut lines = vec![format!("**Engaged Recipients:** {}", format_count(total))];
    for (i, record) in engagement.records.iter().take(RECIPIENTS_SHOWN).enumerate() {
        let who = record
            .email
            .as_deref()
            .or(record.name.as_deref())
            .unwrap_or("Unknown");
        lines.push(format!(
            "{}. {} - {} opens, {} clicks",
            i + 1,
            who,
            format_optional_count(record.opened),
            format_optional_count(record.clicked)
        ));
    }
    lines.join("\n")
}

impl fmt::Display for EmailReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "📊 **Comprehensive Email Performance Report** - Journey `{}`\n\n**📅 Date Range:** {} to {}",
            self.request.journey_id,
            self.request.start.format("%Y-%m-%d"),
            self.request.end.format("%Y-%m-%d"),
        )?;

        write_section(f, "📈 Aggregate Performance Metrics", &self.aggregate, render_aggregate)?;
        write_section(f, "📋 Report Runs Summary", &self.runs, render_runs)?;

        if let Some(ref details) = self.details {
            write_section(f, "📤 Bounce Analysis", &details.bounces, render_bounces)?;
            write_section(f, "💻 Top Email Clients", &details.email_clients, render_email_clients)?;
            write_section(f, "🔗 Top Performing Links", &details.top_links, render_top_links)?;
            write_section(f, "👥 Recipient Engagement", &details.engagement, render_engagement)?;
        }
        Ok(())
    }
}
