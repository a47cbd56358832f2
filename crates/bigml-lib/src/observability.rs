//! Observability for the client SDK
//!
//! Provides:
//! - Prometheus metrics (remote request latency and outcomes, local prediction
//!   latency, resource cache hits)
//! - Structured JSON logging of walkthrough and client events with tracing

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for local predictions (in seconds)
const LOCAL_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1,
];

/// Histogram buckets for remote requests (in seconds)
const REMOTE_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Global metrics instance; `None` if registration failed
static GLOBAL_METRICS: OnceLock<Option<SdkMetricsInner>> = OnceLock::new();

struct SdkMetricsInner {
    registry: Registry,
    remote_request_seconds: HistogramVec,
    remote_requests: IntCounterVec,
    local_prediction_seconds: HistogramVec,
    local_predictions: IntCounterVec,
    cache_hits: IntCounterVec,
    resources_cached: IntGauge,
}

impl SdkMetricsInner {
    fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let remote_request_seconds = HistogramVec::new(
            HistogramOpts::new(
                "bigml_remote_request_seconds",
                "Time spent waiting for the prediction service",
            )
            .buckets(REMOTE_BUCKETS.to_vec()),
            &["method"],
        )?;
        let remote_requests = IntCounterVec::new(
            Opts::new("bigml_remote_requests_total", "Requests sent to the prediction service"),
            &["method", "outcome"],
        )?;
        let local_prediction_seconds = HistogramVec::new(
            HistogramOpts::new(
                "bigml_local_prediction_seconds",
                "Time spent predicting with local resources",
            )
            .buckets(LOCAL_BUCKETS.to_vec()),
            &["kind"],
        )?;
        let local_predictions = IntCounterVec::new(
            Opts::new("bigml_local_predictions_total", "Predictions computed locally"),
            &["kind"],
        )?;
        let cache_hits = IntCounterVec::new(
            Opts::new("bigml_cache_hits_total", "Resources served without a request"),
            &["tier"],
        )?;
        let resources_cached = IntGauge::new(
            "bigml_resources_cached",
            "Resources held in the in-memory cache",
        )?;

        registry.register(Box::new(remote_request_seconds.clone()))?;
        registry.register(Box::new(remote_requests.clone()))?;
        registry.register(Box::new(local_prediction_seconds.clone()))?;
        registry.register(Box::new(local_predictions.clone()))?;
        registry.register(Box::new(cache_hits.clone()))?;
        registry.register(Box::new(resources_cached.clone()))?;

        Ok(Self {
            registry,
            remote_request_seconds,
            remote_requests,
            local_prediction_seconds,
            local_predictions,
            cache_hits,
            resources_cached,
        })
    }
}

/// SDK metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct SdkMetrics {
    _private: (),
}

impl Default for SdkMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SdkMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(|| match SdkMetricsInner::new() {
            Ok(inner) => Some(inner),
            Err(e) => {
                warn!(error = %e, "Metrics registration failed, metrics disabled");
                None
            }
        });
        Self { _private: () }
    }

    fn inner(&self) -> Option<&SdkMetricsInner> {
        GLOBAL_METRICS.get().and_then(Option::as_ref)
    }

    /// Record a finished request to the service
    pub fn observe_remote_request(&self, method: &str, success: bool, duration_secs: f64) {
        if let Some(m) = self.inner() {
            m.remote_request_seconds
                .with_label_values(&[method])
                .observe(duration_secs);
            let outcome = if success { "ok" } else { "error" };
            m.remote_requests.with_label_values(&[method, outcome]).inc();
        }
    }

    /// Record a prediction made by a local model, ensemble, anomaly or cluster
    pub fn observe_local_prediction(&self, kind: &str, duration_secs: f64) {
        if let Some(m) = self.inner() {
            m.local_prediction_seconds
                .with_label_values(&[kind])
                .observe(duration_secs);
            m.local_predictions.with_label_values(&[kind]).inc();
        }
    }

    /// Count a resource served from the `memory` or `disk` cache
    pub fn inc_cache_hit(&self, tier: &str) {
        if let Some(m) = self.inner() {
            m.cache_hits.with_label_values(&[tier]).inc();
        }
    }

    pub fn set_resources_cached(&self, count: usize) {
        if let Some(m) = self.inner() {
            m.resources_cached.set(count as i64);
        }
    }

    /// Requests sent so far with the given method and outcome
    pub fn remote_requests(&self, method: &str, success: bool) -> u64 {
        let outcome = if success { "ok" } else { "error" };
        self.inner()
            .map(|m| m.remote_requests.with_label_values(&[method, outcome]).get())
            .unwrap_or(0)
    }

    /// Local predictions made so far of the given kind
    pub fn local_predictions(&self, kind: &str) -> u64 {
        self.inner()
            .map(|m| m.local_predictions.with_label_values(&[kind]).get())
            .unwrap_or(0)
    }

    pub fn cache_hits(&self, tier: &str) -> u64 {
        self.inner()
            .map(|m| m.cache_hits.with_label_values(&[tier]).get())
            .unwrap_or(0)
    }

    /// Prometheus text exposition of every SDK metric
    pub fn render(&self) -> String {
        let Some(m) = self.inner() else {
            return String::new();
        };
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&m.registry.gather(), &mut buffer) {
            warn!(error = %e, "Failed to encode metrics");
            return String::new();
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

/// Structured logger for walkthrough events
///
/// Provides consistent JSON-formatted logging of the scripted steps.
#[derive(Clone)]
pub struct StructuredLogger {
    domain: String,
}

impl StructuredLogger {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
        }
    }

    /// Log walkthrough startup
    pub fn log_startup(&self, version: &str, dev_mode: bool) {
        info!(
            event = "walkthrough_started",
            domain = %self.domain,
            version = %version,
            dev_mode = dev_mode,
            "Walkthrough started"
        );
    }

    /// Log one step of the walkthrough
    pub fn log_step(&self, step: usize, description: &str) {
        info!(
            event = "walkthrough_step",
            domain = %self.domain,
            step = step,
            description = %description,
            "Running step"
        );
    }

    /// Log the error that aborted the run
    pub fn log_failure(&self, error: &str) {
        warn!(
            event = "walkthrough_failed",
            domain = %self.domain,
            error = %error,
            "Walkthrough aborted"
        );
    }

    /// Log the end of the run with request and prediction totals
    pub fn log_summary(&self, metrics: &SdkMetrics) {
        info!(
            event = "walkthrough_finished",
            domain = %self.domain,
            remote_get_ok = metrics.remote_requests("GET", true),
            remote_post_ok = metrics.remote_requests("POST", true),
            local_model = metrics.local_predictions("model"),
            local_ensemble = metrics.local_predictions("ensemble"),
            local_anomaly = metrics.local_predictions("anomaly"),
            "Walkthrough finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sdk_metrics_record() {
        let metrics = SdkMetrics::new();

        let before = metrics.local_predictions("metrics-test");
        metrics.observe_local_prediction("metrics-test", 0.0002);
        assert_eq!(metrics.local_predictions("metrics-test"), before + 1);

        let before = metrics.remote_requests("PATCH", false);
        metrics.observe_remote_request("PATCH", false, 0.3);
        assert_eq!(metrics.remote_requests("PATCH", false), before + 1);

        metrics.inc_cache_hit("metrics-test");
        assert!(metrics.cache_hits("metrics-test") >= 1);
        metrics.set_resources_cached(3);
    }

    #[test]
    fn test_render_exposition() {
        let metrics = SdkMetrics::new();
        metrics.observe_local_prediction("render-test", 0.001);

        let text = metrics.render();
        assert!(text.contains("bigml_local_predictions_total"));
        assert!(text.contains("render-test"));
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("https://bigml.io");
        assert_eq!(logger.domain, "https://bigml.io");
    }
}
