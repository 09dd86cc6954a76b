use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Log output encoding.
#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Compact,
}

/// Settings for the global tracing subscriber.
#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: tracing::level_filters::LevelFilter,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: tracing::level_filters::LevelFilter::INFO,
            format: LogFormat::Compact,
        }
    }
}

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "vampa_feed_insert_total",
            Unit::Count,
            "Total number of items inserted into the hot feed."
        );
        describe_counter!(
            "vampa_feed_duplicate_total",
            Unit::Count,
            "Total number of inserts rejected because the key was resident."
        );
        describe_counter!(
            "vampa_feed_evict_total",
            Unit::Count,
            "Total number of items evicted due to capacity."
        );
        describe_counter!(
            "vampa_feed_notify_total",
            Unit::Count,
            "Total number of comment notifications applied to resident items."
        );
        describe_counter!(
            "vampa_feed_notify_miss_total",
            Unit::Count,
            "Total number of comment notifications for items outside the hot set."
        );
        describe_counter!(
            "vampa_feed_snapshot_refresh_total",
            Unit::Count,
            "Total number of successful snapshot recomputations."
        );
        describe_counter!(
            "vampa_feed_snapshot_error_total",
            Unit::Count,
            "Total number of snapshot recomputations that kept stale payloads."
        );
        describe_gauge!(
            "vampa_feed_resident_items",
            Unit::Count,
            "Current number of items resident in the hot feed."
        );
        describe_gauge!(
            "vampa_feed_snapshot_bytes",
            Unit::Bytes,
            "Size of the cached plain snapshot payload."
        );
    });
}
