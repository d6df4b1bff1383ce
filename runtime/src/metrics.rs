//! Prometheus metrics for the store runtime.
//!
//! Covers reducer execution, effect handling and repeating timers. Business
//! metrics (tickets created, rejected, listed) are registered by the
//! application crate on top of the same recorder.
//!
//! # Example
//!
//! ```rust,no_run
//! use helpdesk_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//!
//! // Serve `server.render()` from GET /metrics
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub use metrics::{counter, gauge, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus recorder plus the address its scrape endpoint is served on.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server for `addr`.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Address the scrape endpoint should bind to.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Describe the runtime metrics and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError`] if the exporter cannot be built or installed.
    /// A recorder that is already installed is not an error.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!(addr = %self.addr, "Metrics available at http://{}/metrics", self.addr);
                Ok(())
            },
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            },
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus text format.
    ///
    /// Returns `None` if this server did not install the recorder.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

fn register_metrics() {
    describe_counter!("store.commands.total", "Actions sent to a store");
    describe_counter!(
        "store.shutdown.rejected_actions",
        "Actions rejected because the store was closed"
    );
    describe_histogram!(
        "store.reducer.duration_seconds",
        "Time taken to run a reducer"
    );
    describe_counter!("store.effects.executed", "Effects executed, by type");
    describe_counter!(
        "store.effects.dropped",
        "Effect results discarded because the store was closed"
    );
    describe_counter!("timer.ticks.total", "Repeating timer ticks dispatched");
    describe_counter!("timer.cancelled.total", "Repeating timers cancelled");
}

/// Store metrics recorder.
pub struct StoreMetrics;

impl StoreMetrics {
    /// Record an action processed by the reducer.
    pub fn record_action(duration: Duration) {
        counter!("store.commands.total").increment(1);
        histogram!("store.reducer.duration_seconds").record(duration.as_secs_f64());
    }

    /// Record an effect execution of the given kind.
    pub fn record_effect(kind: &'static str) {
        counter!("store.effects.executed", "type" => kind).increment(1);
    }

    /// Record an effect result dropped after close.
    pub fn record_dropped() {
        counter!("store.effects.dropped").increment(1);
    }

    /// Record an action rejected after close.
    pub fn record_rejected() {
        counter!("store.shutdown.rejected_actions").increment(1);
    }
}

/// Repeating timer metrics recorder.
pub struct TimerMetrics;

impl TimerMetrics {
    /// Record a dispatched tick.
    pub fn record_tick() {
        counter!("timer.ticks.total").increment(1);
    }

    /// Record a cancellation.
    pub fn record_cancel() {
        counter!("timer.cancelled.total").increment(1);
    }
}
