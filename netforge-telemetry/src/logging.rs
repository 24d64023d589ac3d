//! ## netforge-telemetry::logging
//! **Structured logging with tracing and OpenTelemetry attributes**
//!
//! Actor threads are named `actor-<device>`, so thread names are always
//! printed; a node's log lines can be followed with a simple grep.

use opentelemetry::KeyValue;
use tracing::{info_span, Instrument};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone)]
pub struct EventLogger;

impl EventLogger {
    /// Installs the global subscriber. `RUST_LOG` wins over `default_filter`.
    /// Returns false if a subscriber was already installed.
    pub fn init(default_filter: &str, json: bool) -> bool {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_filter))
            .unwrap_or_else(|_| EnvFilter::new("info"));
        let builder = fmt()
            .with_env_filter(filter)
            .with_thread_names(true)
            .with_span_events(FmtSpan::CLOSE);
        let installed = if json {
            builder.json().try_init()
        } else {
            builder.try_init()
        };
        installed.is_ok()
    }

    /// Emits one structured record for a completed operation, such as a
    /// finished simulation run.
    pub async fn log_event(event_type: &str, metadata: Vec<KeyValue>) {
        let span = info_span!(
            "netforge_event",
            event_type = event_type,
            otel.kind = "INTERNAL"
        );

        async {
            let fields: Vec<String> = metadata
                .iter()
                .map(|kv| format!("{}={}", kv.key, kv.value))
                .collect();
            tracing::info!(metadata = %fields.join(" "), "Netforge event recorded");
        }
        .instrument(span)
        .await
    }
}
