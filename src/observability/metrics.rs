use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub booking_operations_total: IntCounterVec,
    pub booking_operation_latency_seconds: HistogramVec,
    pub booking_conflicts_total: IntCounter,
    pub availability_checks_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let booking_operations_total = IntCounterVec::new(
            Opts::new(
                "booking_operations_total",
                "Total booking operations by operation and outcome",
            ),
            &["operation", "outcome"],
        )
        .expect("valid booking_operations_total metric");

        let booking_operation_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "booking_operation_latency_seconds",
                "Latency of booking write operations in seconds",
            ),
            &["operation"],
        )
        .expect("valid booking_operation_latency_seconds metric");

        let booking_conflicts_total = IntCounter::new(
            "booking_conflicts_total",
            "Writes rejected because the vehicle was already booked",
        )
        .expect("valid booking_conflicts_total metric");

        let availability_checks_total = IntCounterVec::new(
            Opts::new("availability_checks_total", "Availability checks by result"),
            &["result"],
        )
        .expect("valid availability_checks_total metric");

        registry
            .register(Box::new(booking_operations_total.clone()))
            .expect("register booking_operations_total");
        registry
            .register(Box::new(booking_operation_latency_seconds.clone()))
            .expect("register booking_operation_latency_seconds");
        registry
            .register(Box::new(booking_conflicts_total.clone()))
            .expect("register booking_conflicts_total");
        registry
            .register(Box::new(availability_checks_total.clone()))
            .expect("register availability_checks_total");

        Self {
            registry,
            booking_operations_total,
            booking_operation_latency_seconds,
            booking_conflicts_total,
            availability_checks_total,
        }
    }

    pub fn observe_operation(&self, operation: &str, succeeded: bool, elapsed_secs: f64) {
        let outcome = if succeeded { "success" } else { "error" };
        self.booking_operations_total
            .with_label_values(&[operation, outcome])
            .inc();
        self.booking_operation_latency_seconds
            .with_label_values(&[operation])
            .observe(elapsed_secs);
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
