use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

/// Histogram bucket boundaries for latency metrics (seconds).
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

/// Thin handle around the global metrics recorder.
///
/// After `Metrics::install()` the `metrics` crate macros (`counter!`, `gauge!`,
/// `histogram!`) can be used anywhere in the codebase. The `PrometheusHandle`
/// is retained solely for rendering the `/metrics` endpoint.
#[derive(Clone)]
pub struct Metrics {
    handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder and register metric descriptions.
    ///
    /// Must be called **once** at startup; a second call fails because the
    /// global recorder is already set.
    pub fn install() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("_duration_seconds".to_string()),
                LATENCY_BUCKETS,
            )?
            .install_recorder()?;

        describe();
        Ok(Self { handle })
    }

    /// Recorder that is not installed globally. Used where a handle is needed
    /// but macros may be no-ops, e.g. tests that build several gateways.
    pub fn detached() -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        Self {
            handle: recorder.handle(),
        }
    }

    /// Render all metrics in Prometheus text exposition format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

fn describe() {
    // request path
    describe_counter!(
        "tent_http_requests_total",
        Unit::Count,
        "Total HTTP requests processed, by rule, method and status"
    );
    describe_histogram!(
        "tent_http_request_duration_seconds",
        Unit::Seconds,
        "Total request duration from client perspective"
    );
    describe_counter!(
        "tent_http_request_body_rejected_total",
        Unit::Count,
        "Inbound requests rejected because the body exceeded max_body_bytes"
    );

    // upstream
    describe_histogram!(
        "tent_upstream_request_duration_seconds",
        Unit::Seconds,
        "Time spent waiting for the upstream, by host"
    );
    describe_counter!(
        "tent_upstream_errors_total",
        Unit::Count,
        "Upstream transfer failures, by host and kind"
    );

    // cache
    describe_counter!(
        "tent_cache_lookups_total",
        Unit::Count,
        "File cache lookups, by result (hit/miss)"
    );
    describe_counter!(
        "tent_cache_stores_total",
        Unit::Count,
        "File cache store attempts, by result (stored/skipped/failed)"
    );

    // static files
    describe_counter!(
        "tent_static_files_total",
        Unit::Count,
        "Static file requests, by result (served/forbidden/missing)"
    );

    // connections
    describe_gauge!(
        "tent_connections_active",
        Unit::Count,
        "Number of active downstream connections"
    );
    describe_counter!(
        "tent_connections_total",
        Unit::Count,
        "Total connections accepted"
    );

    // config
    describe_gauge!(
        "tent_config_rules_total",
        Unit::Count,
        "Number of routing rules loaded, including the catch-all"
    );
}
