//! # Prometheus Metrics
//!
//! Counters for the admin API, scraped at `GET /metrics`.
//!
//! All metrics live in a dedicated [`prometheus::Registry`] with the
//! `verity` prefix, so they never collide with the default global registry.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, IntCounter, Registry, TextEncoder};
use std::sync::Arc;

/// Metric handles for the admin API. Handles are cheap to clone.
#[derive(Clone)]
pub struct DiscoveryMetrics {
    registry: Registry,
    /// Known-credentials probes received.
    pub discovery_requests_total: IntCounter,
    /// Probes that answered `found: true`.
    pub discovery_found_total: IntCounter,
    /// Probes rejected as bad requests.
    pub discovery_rejected_total: IntCounter,
    /// Verified-email identity lookups received.
    pub identity_lookups_total: IntCounter,
}

impl DiscoveryMetrics {
    /// Create and register every counter. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("verity".into()), None)?;

        let discovery_requests_total = counter(
            &registry,
            "discovery_requests_total",
            "Total number of known-credentials probes received",
        )?;
        let discovery_found_total = counter(
            &registry,
            "discovery_found_total",
            "Total number of probes that found a registered identifier",
        )?;
        let discovery_rejected_total = counter(
            &registry,
            "discovery_rejected_total",
            "Total number of probes rejected as bad requests",
        )?;
        let identity_lookups_total = counter(
            &registry,
            "identity_lookups_total",
            "Total number of verified-email identity lookups",
        )?;

        Ok(Self {
            registry,
            discovery_requests_total,
            discovery_found_total,
            discovery_rejected_total,
            identity_lookups_total,
        })
    }

    /// All registered metrics in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

fn counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounter, prometheus::Error> {
    let counter = IntCounter::new(name, help)?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

/// Shared metrics handle passed to axum handlers.
pub type SharedMetrics = Arc<DiscoveryMetrics>;

/// `GET /metrics`. Returns 500 if encoding fails.
pub async fn metrics_handler(State(metrics): State<SharedMetrics>) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
