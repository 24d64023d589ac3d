//! ## netforge-telemetry::metrics
//! **Prometheus counters for simulation runs**

use std::time::Duration;

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    pub events: IntCounterVec,
    pub messages_dropped: IntCounter,
    pub actor_faults: IntCounter,
    pub rounds: IntCounter,
    pub round_latency: Histogram,
}

impl MetricsRecorder {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let events = IntCounterVec::new(
            Opts::new("netforge_events_total", "Simulation events committed, by kind"),
            &["kind"],
        )?;
        let messages_dropped = IntCounter::new(
            "netforge_messages_dropped_total",
            "Messages lost in transit, on down links or after close",
        )?;
        let actor_faults =
            IntCounter::new("netforge_actor_faults_total", "Actors isolated after a fault")?;
        let rounds = IntCounter::new("netforge_rounds_total", "Simulation rounds executed")?;
        let round_latency = Histogram::with_opts(
            HistogramOpts::new(
                "netforge_round_latency_seconds",
                "Wall time for all actors to commit one round",
            )
            .buckets(vec![0.000_1, 0.001, 0.01, 0.1, 1.0]),
        )?;

        registry.register(Box::new(events.clone()))?;
        registry.register(Box::new(messages_dropped.clone()))?;
        registry.register(Box::new(actor_faults.clone()))?;
        registry.register(Box::new(rounds.clone()))?;
        registry.register(Box::new(round_latency.clone()))?;

        Ok(Self {
            registry,
            events,
            messages_dropped,
            actor_faults,
            rounds,
            round_latency,
        })
    }

    pub fn record_event(&self, kind: &str) {
        self.events.with_label_values(&[kind]).inc();
    }

    pub fn record_drops(&self, count: u64) {
        self.messages_dropped.inc_by(count);
    }

    pub fn record_actor_fault(&self) {
        self.actor_faults.inc();
    }

    pub fn record_round(&self, elapsed: Duration) {
        self.rounds.inc();
        self.round_latency.observe(elapsed.as_secs_f64());
    }

    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
