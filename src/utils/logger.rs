//! Process-wide tracing setup.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither `RUST_LOG` nor the config names one.
pub const DEFAULT_FILTER: &str = "info,vulkano=warn";

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `level`; an empty `level` falls back to [`DEFAULT_FILTER`].
/// Calling this twice is harmless (the second install is ignored).
pub fn init(level: &str) {
    let filter_str = if level.trim().is_empty() {
        DEFAULT_FILTER
    } else {
        level
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_str));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_keeps_vulkano_quiet() {
        let filter = EnvFilter::new(DEFAULT_FILTER);
        let s = format!("{filter}");
        assert!(s.contains("vulkano=warn"));
        assert!(s.contains("info"));
    }

    #[test]
    fn init_twice_does_not_panic() {
        init("");
        init("debug");
    }
}
