use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub location_updates_total: IntCounterVec,
    pub route_requests_total: IntCounterVec,
    pub notifications_total: IntCounterVec,
    pub active_sessions: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let location_updates_total = IntCounterVec::new(
            Opts::new(
                "location_updates_total",
                "Location payloads ingested by outcome",
            ),
            &["outcome"],
        )
        .expect("valid location_updates_total metric");

        let route_requests_total = IntCounterVec::new(
            Opts::new(
                "route_requests_total",
                "Route computations by outcome (success/skipped/error)",
            ),
            &["outcome"],
        )
        .expect("valid route_requests_total metric");

        let notifications_total = IntCounterVec::new(
            Opts::new("notifications_total", "Notifications dispatched by priority"),
            &["priority"],
        )
        .expect("valid notifications_total metric");

        let active_sessions = IntGauge::new("active_sessions", "Currently open tracking sessions")
            .expect("valid active_sessions metric");

        registry
            .register(Box::new(location_updates_total.clone()))
            .expect("register location_updates_total");
        registry
            .register(Box::new(route_requests_total.clone()))
            .expect("register route_requests_total");
        registry
            .register(Box::new(notifications_total.clone()))
            .expect("register notifications_total");
        registry
            .register(Box::new(active_sessions.clone()))
            .expect("register active_sessions");

        Self {
            registry,
            location_updates_total,
            route_requests_total,
            notifications_total,
            active_sessions,
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
