//! Log subscriber setup.
//!
//! `RUST_LOG` takes precedence over the level passed in. Both initialisers
//! return `false` when a global subscriber is already installed.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Settings;

fn filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
}

/// Human-readable logs.
pub fn init_tracing(log_level: &str) -> bool {
    tracing_subscriber::registry()
        .with(filter(log_level))
        .with(tracing_subscriber::fmt::layer().with_thread_names(true))
        .try_init()
        .is_ok()
}

/// One JSON object per line, including the fields of entered spans.
pub fn init_tracing_json(log_level: &str) -> bool {
    tracing_subscriber::registry()
        .with(filter(log_level))
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false),
        )
        .try_init()
        .is_ok()
}

/// Pick the format from `settings.log_json`.
pub fn init_from_settings(settings: &Settings) -> bool {
    if settings.log_json {
        init_tracing_json(&settings.log_level)
    } else {
        init_tracing(&settings.log_level)
    }
}
