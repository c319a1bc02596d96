//! Logging setup for the ClientApp process.

use std::sync::Once;

use tracing::Span;
use tracing_subscriber::registry::Registry;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Filter used when `RUST_LOG` is unset. Keeps tonic's transport stack quiet.
const DEFAULT_FILTER: &str = "info,h2=warn,hyper=warn,tower=warn";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// One JSON object per event, carrying the `clientapp` span fields.
    Json,
    /// Human-readable logs.
    #[default]
    Pretty,
}

/// Installs the global subscriber. Later calls are no-ops.
///
/// Events are written to stderr; the SuperNode that spawned the process owns
/// its stdout.
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let base = fmt::layer().with_writer(std::io::stderr).with_target(false);
        let layer: Box<dyn Layer<Registry> + Send + Sync> = match format {
            LogFormat::Json => base
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .boxed(),
            LogFormat::Pretty => base.boxed(),
        };
        tracing_subscriber::registry()
            .with(layer)
            .with(env_filter())
            .init();
    });
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Span wrapping one ClientApp process run.
#[must_use]
pub fn clientapp_span(supernode: &str) -> Span {
    tracing::info_span!("clientapp", supernode = supernode)
}
