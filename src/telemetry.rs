use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "info,kicksight_gateway=debug";

/// Initialize structured logging.
///
/// - `RUST_LOG` overrides the default filter.
/// - `LOG_FORMAT=json` switches to one JSON object per line.
pub fn init() {
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    let compact_layer = (!json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
            .compact()
    });
    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(false)
            .with_target(true)
    });

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(compact_layer)
        .with(json_layer)
        .init();
}
