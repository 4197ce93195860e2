use prometheus::{
    Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
    register_int_counter_vec_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry,
};
use lazy_static::lazy_static;
use std::sync::Arc;

pub struct MetricsRegistry {
    registry: Registry,

    /// outcome = exported | idle | failed
    pub poll_cycles: IntCounterVec,
    pub processes_exported: IntGauge,
    /// result = queued | dropped
    pub export_deliveries: IntCounterVec,
    pub serialization_failures: IntCounter,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        let registry = Registry::new();

        let poll_cycles = register_int_counter_vec_with_registry!(
            Opts::new("collector_poll_cycles_total", "Poll ticks by outcome"),
            &["outcome"],
            registry
        ).expect("poll cycle counter registers once");

        let processes_exported = register_int_gauge_with_registry!(
            Opts::new("collector_processes_exported", "Processes in the last exported snapshot"),
            registry
        ).expect("process gauge registers once");

        let export_deliveries = register_int_counter_vec_with_registry!(
            Opts::new("collector_export_deliveries_total", "Snapshots handed to the delivery queue"),
            &["result"],
            registry
        ).expect("delivery counter registers once");

        let serialization_failures = register_int_counter_with_registry!(
            Opts::new("collector_serialization_failures_total", "Snapshots that could not be encoded"),
            registry
        ).expect("serialization counter registers once");

        Self {
            registry,
            poll_cycles,
            processes_exported,
            export_deliveries,
            serialization_failures,
        }
    }

    pub fn render(&self) -> Result<String, Box<dyn std::error::Error>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static! {
    pub static ref METRICS: Arc<MetricsRegistry> = Arc::new(MetricsRegistry::new());
}
