use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter,
    filter::{Directive, LevelFilter},
    fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// HTTP stack targets capped at `warn` so `--log-level debug` stays readable.
const QUIET_TARGETS: [&str; 3] = ["hyper_util=warn", "reqwest=warn", "rustls=warn"];

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = env_filter(logging.level)?;

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .with_writer(std::io::stderr)
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
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

/// `RUST_LOG` directives win over the configured level and the quiet targets.
fn env_filter(level: LevelFilter) -> Result<EnvFilter, InfraError> {
    let mut filter = EnvFilter::builder().with_default_directive(level.into()).parse_lossy("");
    for target in QUIET_TARGETS {
        let directive: Directive = target
            .parse()
            .map_err(|err| InfraError::telemetry(format!("bad directive `{target}`: {err}")))?;
        filter = filter.add_directive(directive);
    }
    if let Ok(from_env) = std::env::var(EnvFilter::DEFAULT_ENV) {
        for directive in from_env.split(',').filter_map(|part| part.parse().ok()) {
            filter = filter.add_directive(directive);
        }
    }
    Ok(filter)
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_histogram!(
            "postboard_api_request_ms",
            Unit::Milliseconds,
            "Round-trip latency of content API requests in milliseconds."
        );
        describe_counter!(
            "postboard_modal_save_total",
            Unit::Count,
            "Editor save attempts, labelled by outcome."
        );
        describe_counter!(
            "postboard_modal_generate_total",
            Unit::Count,
            "Editor content generation attempts, labelled by outcome."
        );
    });
}
