//! Server-sent event fan-out and the periodic tasks that feed it.

use std::time::Duration;

use chrono::{DateTime, Utc};
use inflection_core::{list_journeys, Gateway, JourneyQuery};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info, warn};

/// Journeys sampled by each `journey_update` event
const JOURNEY_SAMPLE_SIZE: u32 = 5;

#[derive(Debug, Clone, Serialize)]
pub struct ServerEvent {
    pub id: String,
    pub event: String,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

impl ServerEvent {
    pub fn new(event: &str, data: Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event: event.to_string(),
            data,
            timestamp: Utc::now(),
        }
    }

    pub fn connection() -> Self {
        Self::new(
            "connection",
            json!({"status": "connected", "message": "Connected to inflection-mcp event stream"}),
        )
    }
}

#[derive(Clone)]
pub struct EventBroadcaster {
    tx: broadcast::Sender<ServerEvent>,
}

impl EventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Returns the number of subscribers reached; zero when nobody listens.
    pub fn broadcast(&self, event: ServerEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

pub async fn health_event(gateway: &Gateway) -> ServerEvent {
    match gateway.ensure_authenticated().await {
        Ok(session) => ServerEvent::new(
            "health_check",
            json!({
                "status": "healthy",
                "authenticated": true,
                "session_expires_at": session.expires_at,
            }),
        ),
        Err(e) => {
            warn!(error = %e, "Health check failed");
            ServerEvent::new(
                "health_check",
                json!({"status": "unhealthy", "authenticated": false, "error": e.to_string()}),
            )
        }
    }
}

pub async fn journey_event(gateway: &Gateway) -> ServerEvent {
    let query = JourneyQuery {
        page_size: JOURNEY_SAMPLE_SIZE,
        ..JourneyQuery::default()
    };
    match list_journeys(gateway, &query).await {
        Ok(listing) => {
            let journeys: Vec<Value> = listing
                .journeys()
                .iter()
                .map(|j| json!({"id": j.display_id(), "name": j.display_name(), "status": j.status().to_string()}))
                .collect();
            ServerEvent::new(
                "journey_update",
                json!({
                    "count": journeys.len(),
                    "total_count": listing.total_count(),
                    "journeys": journeys,
                }),
            )
        }
        Err(e) => {
            warn!(error = %e, "Journey update failed");
            ServerEvent::new("error", json!({"message": format!("Failed to fetch journeys: {}", e)}))
        }
    }
}

/// Spawn the health and journey publishers. Both stop when `shutdown`
/// flips to `true`.
pub fn spawn_publishers(
    gateway: Gateway,
    events: EventBroadcaster,
    health_every: Duration,
    journeys_every: Duration,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    let health = {
        let gateway = gateway.clone();
        let events = events.clone();
        spawn_periodic("health_check", health_every, shutdown.clone(), move || {
            let gateway = gateway.clone();
            let events = events.clone();
            async move {
                if events.subscriber_count() > 0 {
                    events.broadcast(health_event(&gateway).await);
                }
            }
        })
    };

    let journeys = spawn_periodic("journey_update", journeys_every, shutdown, move || {
        let gateway = gateway.clone();
        let events = events.clone();
        async move {
            if events.subscriber_count() > 0 {
                events.broadcast(journey_event(&gateway).await);
            }
        }
    });

    vec![health, journeys]
}

fn spawn_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    tick: F,
) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send,
{
    tokio::spawn(async move {
        info!(task = name, period_secs = period.as_secs(), "Background task started");
        let mut interval = interval_at(Instant::now() + period, period);
        loop {
            tokio::select! {
                _ = interval.tick() => tick().await,
                // The watch guard is not Send; drop it inside the branch future
                _ = async { let _ = shutdown.wait_for(|&stop| stop).await; } => {
                    debug!(task = name, "Background task received shutdown signal");
                    break;
                }
            }
        }
    })
}
