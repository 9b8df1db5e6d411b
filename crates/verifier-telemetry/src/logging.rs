//! Structured logging setup.
//!
//! Log lines carry consistent fields so a run can be filtered after the fact:
//! - `phase`: orchestrator phase (wait-min-height, locate-span, checkpoint, ...)
//! - `block_height`: block the line is about, when there is one
//! - `producer`: producer address involved, when there is one

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{TelemetryConfig, TelemetryError};

/// Install the global tracing subscriber.
///
/// Fails if a subscriber is already installed or the level filter is invalid.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::try_new(&config.log_level)
        .map_err(|e| TelemetryError::Config(format!("log level '{}': {}", config.log_level, e)))?;

    if config.json_logs {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_file(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggerInit(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_ansi(config.ansi);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggerInit(e.to_string()))?;
    }

    tracing::debug!(
        service = %config.service_name,
        json_logs = config.json_logs,
        "Structured logging initialized"
    );

    Ok(())
}

/// Log an orchestrator phase transition.
#[macro_export]
macro_rules! log_phase {
    ($level:ident, $phase:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            phase = %$phase,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a block-related event with standard fields.
#[macro_export]
macro_rules! log_block_event {
    ($level:ident, $phase:expr, $msg:expr, $block_height:expr, $producer:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            phase = %$phase,
            block_height = $block_height,
            producer = %$producer,
            $($($field)*,)?
            $msg
        )
    };
}
