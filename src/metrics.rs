//! Prometheus metrics and tracing spans.
//!
//! Metrics are recorded through OpenTelemetry and exported into a private
//! `prometheus::Registry`; [`CategoryMetrics::render`] produces the text exposition
//! format for whatever endpoint the embedding service serves.

#[cfg(feature = "metrics")]
pub use self::otel::{CategoryMetrics, METRICS};

#[cfg(feature = "metrics")]
mod otel {
    use once_cell::sync::Lazy;
    use opentelemetry::{
        global,
        metrics::{Counter, Histogram, Meter, MeterProvider as _},
        KeyValue,
    };
    use opentelemetry_sdk::metrics::SdkMeterProvider;
    use prometheus::{Encoder, Registry, TextEncoder};
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };
    use std::time::Duration;

    pub static METRICS: Lazy<CategoryMetrics> = Lazy::new(CategoryMetrics::init);

    pub struct CategoryMetrics {
        pub registry: Registry,
        pub operations_total: Counter<u64>,
        pub operation_duration: Histogram<f64>,
        pub tree_build_duration: Histogram<f64>,
        pub query_duration: Histogram<f64>,
        pub query_errors_total: Counter<u64>,
        pub tree_nodes: Arc<AtomicUsize>,
        // Keeps the reader alive for the lifetime of the process
        _provider: Option<SdkMeterProvider>,
    }

    fn meter_with_registry(registry: &Registry) -> (Meter, Option<SdkMeterProvider>) {
        match opentelemetry_prometheus::exporter()
            .with_registry(registry.clone())
            .build()
        {
            Ok(exporter) => {
                let provider = SdkMeterProvider::builder().with_reader(exporter).build();
                (provider.meter("docwiki"), Some(provider))
            }
            Err(e) => {
                log::error!("Failed to build prometheus exporter, metrics disabled: {}", e);
                (global::meter("docwiki"), None)
            }
        }
    }

    impl CategoryMetrics {
        pub fn init() -> Self {
            let registry = Registry::new();
            let (meter, provider) = meter_with_registry(&registry);

            let operations_total = meter
                .u64_counter("docwiki_category_operations_total")
                .with_description("Category operations by name and outcome")
                .build();

            let operation_duration = meter
                .f64_histogram("docwiki_category_operation_duration_seconds")
                .with_description("Duration of category operations")
                .build();

            let tree_build_duration = meter
                .f64_histogram("docwiki_tree_build_duration_seconds")
                .with_description("Time spent rebuilding the category forest")
                .build();

            let query_duration = meter
                .f64_histogram("docwiki_query_duration_seconds")
                .with_description("Duration of store queries")
                .build();

            let query_errors_total = meter
                .u64_counter("docwiki_query_errors_total")
                .with_description("Store queries that failed")
                .build();

            let tree_nodes = Arc::new(AtomicUsize::new(0));
            let nodes_clone = Arc::clone(&tree_nodes);

            let _gauge = meter
                .u64_observable_gauge("docwiki_category_tree_nodes")
                .with_description("Nodes in the most recently built category forest")
                .with_callback(move |observer| {
                    observer.observe(nodes_clone.load(Ordering::Relaxed) as u64, &[]);
                })
                .build();

            Self {
                registry,
                operations_total,
                operation_duration,
                tree_build_duration,
                query_duration,
                query_errors_total,
                tree_nodes,
                _provider: provider,
            }
        }

        pub fn record_operation(&self, operation: &'static str, outcome: &'static str, elapsed: Duration) {
            let attributes = [
                KeyValue::new("operation", operation),
                KeyValue::new("outcome", outcome),
            ];
            self.operations_total.add(1, &attributes);
            self.operation_duration
                .record(elapsed.as_secs_f64(), &attributes[..1]);
        }

        pub fn record_tree_build(&self, elapsed: Duration, nodes: usize) {
            self.tree_build_duration.record(elapsed.as_secs_f64(), &[]);
            self.tree_nodes.store(nodes, Ordering::Relaxed);
        }

        pub fn record_query(&self, elapsed: Duration) {
            self.query_duration.record(elapsed.as_secs_f64(), &[]);
        }

        pub fn record_query_error(&self) {
            self.query_errors_total.add(1, &[]);
        }

        /// Current values in the Prometheus text format.
        pub fn render(&self) -> String {
            let mut buffer = Vec::new();
            if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
                log::warn!("Failed to encode metrics: {}", e);
            }
            String::from_utf8_lossy(&buffer).into_owned()
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_tree_build_updates_gauge() {
            METRICS.record_tree_build(Duration::from_millis(2), 42);
            assert_eq!(METRICS.tree_nodes.load(Ordering::Relaxed), 42);
        }

        #[test]
        fn test_recording_does_not_panic() {
            METRICS.record_operation("create_category", "ok", Duration::from_millis(1));
            METRICS.record_query(Duration::from_micros(300));
            METRICS.record_query_error();
            let _ = METRICS.render();
        }
    }
}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::Span;

    pub fn execute_query_span(query: &str) -> Span {
        // Statement text only; parameters never reach the span
        tracing::debug_span!("docwiki.execute_query", db.statement = query)
    }

    pub fn acquire_connection_span() -> Span {
        tracing::info_span!("docwiki.acquire_connection")
    }

    pub fn category_operation_span(operation: &'static str) -> Span {
        tracing::info_span!(
            "docwiki.category_operation",
            operation,
            actor = tracing::field::Empty,
        )
    }

    pub fn tree_build_span(records: usize) -> Span {
        tracing::debug_span!("docwiki.build_tree", records)
    }
}
