//! Metrics collection and Prometheus export.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

use tts_core::TtsResult;

/// Metrics recorder for synthesis operations.
///
/// All methods are safe no-ops when no recorder is installed, so components
/// can record unconditionally.
#[derive(Debug, Clone, Copy, Default)]
pub struct TtsMetrics;

impl TtsMetrics {
    /// Initialize the metrics system and start the Prometheus exporter.
    pub fn init(port: u16) -> TtsResult<Self> {
        let addr: SocketAddr = ([0, 0, 0, 0], port).into();

        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .map_err(|e| tts_core::TtsError::internal(format!("metrics init failed: {e}")))?;

        Self::register_metrics();

        Ok(Self)
    }

    /// Metrics handle without an exporter (for tests and disabled configs).
    pub fn init_noop() -> Self {
        Self
    }

    fn register_metrics() {
        describe_counter!(
            "tts_requests_total",
            "Total number of synthesis requests received"
        );
        describe_counter!(
            "tts_requests_rejected",
            "Requests rejected at admission (validation, overload, unavailable)"
        );
        describe_counter!(
            "tts_requests_completed",
            "Jobs that delivered their final chunk"
        );
        describe_counter!("tts_requests_failed", "Jobs that failed during synthesis");
        describe_counter!(
            "tts_requests_timeout",
            "Jobs cancelled after exceeding the queue wait bound"
        );
        describe_counter!(
            "tts_requests_cancelled",
            "Jobs abandoned by their consumer"
        );

        describe_gauge!("tts_active_jobs", "Admitted jobs not yet terminal");

        describe_histogram!(
            "tts_first_chunk_latency_ms",
            "Time from admission to first delivered chunk in milliseconds"
        );
    }

    /// Record a request received at admission.
    pub fn request_received(&self) {
        counter!("tts_requests_total").increment(1);
    }

    /// Record an admission rejection.
    pub fn request_rejected(&self) {
        counter!("tts_requests_rejected").increment(1);
    }

    /// Record a completed job.
    pub fn request_completed(&self) {
        counter!("tts_requests_completed").increment(1);
    }

    /// Record a failed job.
    pub fn request_failed(&self) {
        counter!("tts_requests_failed").increment(1);
    }

    /// Record a queue-wait timeout.
    pub fn request_timeout(&self) {
        counter!("tts_requests_timeout").increment(1);
    }

    /// Record a consumer-cancelled job.
    pub fn request_cancelled(&self) {
        counter!("tts_requests_cancelled").increment(1);
    }

    /// Set the number of admitted, non-terminal jobs.
    pub fn set_active_jobs(&self, count: f64) {
        gauge!("tts_active_jobs").set(count);
    }

    /// Record time to first delivered chunk.
    pub fn record_first_chunk_ms(&self, ms: f64) {
        histogram!("tts_first_chunk_latency_ms").record(ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_noop() {
        let metrics = TtsMetrics::init_noop();

        // These must not panic without a recorder installed.
        metrics.request_received();
        metrics.request_completed();
        metrics.request_rejected();
        metrics.record_first_chunk_ms(12.5);
        metrics.set_active_jobs(3.0);
    }
}
