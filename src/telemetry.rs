use opentelemetry::trace::TraceError;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{trace as sdktrace, Resource};
use opentelemetry_semantic_conventions::resource;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "info,outfit_rater=info,sqlx=warn,sea_orm=warn,sea_orm_migration=warn";

/// Installs the global subscriber.
///
/// `RUST_LOG` sets the filter and `RUST_LOG_FORMAT=json` switches to flattened JSON
/// lines. When `OTEL_EXPORTER_OTLP_ENDPOINT` is set, spans are also exported over
/// OTLP/gRPC.
pub fn init_telemetry(service_name: &str) -> Result<(), TraceError> {
    let json_logs = std::env::var("RUST_LOG_FORMAT").is_ok_and(|f| f == "json");
    let otlp_endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_FILTER));

    let registry = tracing_subscriber::registry().with(env_filter);

    let otel_layer = otlp_endpoint
        .map(|endpoint| otlp_tracer(endpoint, service_name))
        .transpose()?
        .map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));

    if json_logs {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true);
        registry.with(otel_layer).with(fmt_layer).init();
    } else {
        registry
            .with(otel_layer)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    Ok(())
}

fn otlp_tracer(endpoint: String, service_name: &str) -> Result<sdktrace::Tracer, TraceError> {
    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(endpoint);
    let config = sdktrace::config()
        .with_sampler(sdktrace::Sampler::AlwaysOn)
        .with_resource(Resource::new([
            KeyValue::new(resource::SERVICE_NAME, service_name.to_string()),
            KeyValue::new(resource::SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
        ]));

    opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(exporter)
        .with_trace_config(config)
        .install_batch(opentelemetry_sdk::runtime::Tokio)
}

/// Flush pending spans before exit.
pub fn shutdown_telemetry() {
    opentelemetry::global::shutdown_tracer_provider();
}
