use std::sync::Arc;

use axum::{routing::get, Router};
use outfit_rater::analyzer::OpenAiAnalyzer;
use outfit_rater::config::AppConfig;
use outfit_rater::storage::LocalImageStore;
use outfit_rater::workflow::AnalysisWorkflow;
use outfit_rater::{api, migrator};
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env if present (dotenvy)
    dotenvy::dotenv().ok();

    outfit_rater::telemetry::init_telemetry("outfit-rater")?;

    let config = AppConfig::from_env()?;

    let (prometheus_layer, metric_handle) = axum_prometheus::PrometheusMetricLayer::pair();

    let db = Database::connect(&config.database_url).await?;
    migrator::Migrator::up(&db, None).await?;

    outfit_rater::metrics::init_metrics(&db).await;

    tokio::fs::create_dir_all(&config.media_root).await?;
    let images = Arc::new(LocalImageStore::new(config.media_root.clone()));
    let analyzer = Arc::new(OpenAiAnalyzer::new(&config.analyzer)?);
    tracing::info!(
        "Using vision model {} at {}",
        config.analyzer.model,
        config.analyzer.base_url
    );

    let workflow = Arc::new(AnalysisWorkflow::new(
        db,
        analyzer,
        images,
        config.analyzer.timeout,
    ));

    let app = app(
        api::router(workflow, &config.cors_origin),
        prometheus_layer,
        metric_handle,
    );

    tracing::info!("listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    outfit_rater::telemetry::shutdown_telemetry();
    Ok(())
}

fn app(
    router: Router,
    prometheus_layer: axum_prometheus::PrometheusMetricLayer<'static>,
    metric_handle: metrics_exporter_prometheus::PrometheusHandle,
) -> Router {
    router
        .layer(prometheus_layer)
        .route("/metrics", get(|| async move { metric_handle.render() }))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutting down server"),
        Err(err) => tracing::error!("Unable to listen for shutdown signal: {}", err),
    }
}
