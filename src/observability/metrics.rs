use prometheus::{
    Encoder, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub jobs_total: IntCounterVec,
    pub jobs_in_queue: IntGaugeVec,
    pub job_latency_seconds: HistogramVec,
    pub alerts_created_total: IntCounterVec,
    pub import_rows_total: IntCounterVec,
    pub ws_connections: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let jobs_total = IntCounterVec::new(
            Opts::new("jobs_total", "Total processed jobs by queue and outcome"),
            &["queue", "outcome"],
        )
        .expect("valid jobs_total metric");

        let jobs_in_queue = IntGaugeVec::new(
            Opts::new("jobs_in_queue", "Current number of queued jobs per queue"),
            &["queue"],
        )
        .expect("valid jobs_in_queue metric");

        let job_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "job_latency_seconds",
                "Latency of job processing in seconds",
            ),
            &["queue", "outcome"],
        )
        .expect("valid job_latency_seconds metric");

        let alerts_created_total = IntCounterVec::new(
            Opts::new("alerts_created_total", "Alerts created by severity"),
            &["severity"],
        )
        .expect("valid alerts_created_total metric");

        let import_rows_total = IntCounterVec::new(
            Opts::new("import_rows_total", "Processed CSV import rows by outcome"),
            &["outcome"],
        )
        .expect("valid import_rows_total metric");

        let ws_connections = IntGauge::new(
            "ws_connections",
            "Currently connected websocket clients",
        )
        .expect("valid ws_connections metric");

        registry
            .register(Box::new(jobs_total.clone()))
            .expect("register jobs_total");
        registry
            .register(Box::new(jobs_in_queue.clone()))
            .expect("register jobs_in_queue");
        registry
            .register(Box::new(job_latency_seconds.clone()))
            .expect("register job_latency_seconds");
        registry
            .register(Box::new(alerts_created_total.clone()))
            .expect("register alerts_created_total");
        registry
            .register(Box::new(import_rows_total.clone()))
            .expect("register import_rows_total");
        registry
            .register(Box::new(ws_connections.clone()))
            .expect("register ws_connections");

        Self {
            registry,
            jobs_total,
            jobs_in_queue,
            job_latency_seconds,
            alerts_created_total,
            import_rows_total,
            ws_connections,
        }
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
