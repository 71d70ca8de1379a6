#[cfg(feature = "metrics")]
pub use prometheus_metrics::*;

#[cfg(feature = "metrics")]
mod prometheus_metrics {
    use once_cell::sync::Lazy;
    use opentelemetry::metrics::{Counter, Histogram, MeterProvider};
    use opentelemetry_sdk::metrics::SdkMeterProvider;
    use prometheus::{Registry, TextEncoder};

    pub static METRICS: Lazy<SluiceMetrics> = Lazy::new(SluiceMetrics::init);

    pub struct SluiceMetrics {
        pub registry: Registry,
        pub provider: SdkMeterProvider,
        pub queries_built: Counter<u64>,
        pub count_queries: Counter<u64>,
        pub cache_invalidations: Counter<u64>,
        pub query_errors: Counter<u64>,
        pub query_duration: Histogram<f64>,
    }

    impl SluiceMetrics {
        pub fn init() -> Self {
            let registry = Registry::new();
            let exporter = opentelemetry_prometheus::exporter()
                .with_registry(registry.clone())
                .build()
                .expect("failed to build prometheus exporter");
            let provider = SdkMeterProvider::builder().with_reader(exporter).build();
            let meter = provider.meter("sluice");

            let queries_built = meter.u64_counter("sluice_queries_built")
                .with_description("Data and count queries assembled").build();

            let count_queries = meter.u64_counter("sluice_count_queries")
                .with_description("COUNT queries sent to an executor").build();

            let cache_invalidations = meter.u64_counter("sluice_cache_invalidations")
                .with_description("Cached counts dropped because late-bound values changed").build();

            let query_errors = meter.u64_counter("sluice_query_errors")
                .with_description("Queries that failed in the executor").build();

            let query_duration = meter.f64_histogram("sluice_query_duration_seconds")
                .with_description("Duration of executed queries").build();

            Self {
                registry,
                provider,
                queries_built,
                count_queries,
                cache_invalidations,
                query_errors,
                query_duration,
            }
        }

        pub fn record_build(&self) {
            self.queries_built.add(1, &[]);
        }

        pub fn record_count_query(&self) {
            self.count_queries.add(1, &[]);
        }

        pub fn record_invalidation(&self) {
            self.cache_invalidations.add(1, &[]);
        }

        pub fn record_query_error(&self) {
            self.query_errors.add(1, &[]);
        }

        pub fn record_query_duration(&self, elapsed: std::time::Duration) {
            self.query_duration.record(elapsed.as_secs_f64(), &[]);
        }

        /// Current metrics in the Prometheus text exposition format
        pub fn render(&self) -> String {
            let families = self.registry.gather();
            TextEncoder::new().encode_to_string(&families).unwrap_or_else(|e| {
                log::warn!("failed to encode metrics: {e}");
                String::new()
            })
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_recorded_build_is_exported() {
            METRICS.record_build();
            METRICS.record_invalidation();
            let text = METRICS.render();
            assert!(text.contains("sluice_queries_built"));
            assert!(text.contains("sluice_cache_invalidations"));
        }
    }
}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::Span;

    pub fn build_query_span(template: &str) -> Span {
        tracing::debug_span!("sluice.build", template = template)
    }

    pub fn count_query_span(template: &str) -> Span {
        tracing::debug_span!("sluice.count", template = template)
    }

    pub fn execute_query_span(sql: &str) -> Span {
        tracing::info_span!("sluice.execute", sql = sql)
    }
}
