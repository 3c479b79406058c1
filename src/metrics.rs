use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};

use crate::entities::{outfit_analysis, Occasion, OutfitAnalysis};

/// Seed gauges from what is already stored.
pub async fn init_metrics(db: &DatabaseConnection) {
    let total = OutfitAnalysis::find().count(db).await.unwrap_or(0);
    metrics::gauge!("outfit_analyses_total").set(total as f64);

    for occasion in Occasion::ALL {
        let count = OutfitAnalysis::find()
            .filter(outfit_analysis::Column::Occasion.eq(occasion.as_str()))
            .count(db)
            .await
            .unwrap_or(0);
        metrics::gauge!("outfit_analyses_by_occasion", "occasion" => occasion.as_str())
            .set(count as f64);
    }

    tracing::info!("Initialized metrics: analyses={}", total);
}

pub fn record_validation_failure() {
    metrics::counter!("outfit_submissions_invalid_total").increment(1);
}

pub fn record_completed(occasion: Occasion, rating: f64, processing_secs: f64) {
    metrics::counter!("outfit_analyses_completed_total", "occasion" => occasion.as_str())
        .increment(1);
    metrics::gauge!("outfit_analyses_total").increment(1.0);
    metrics::gauge!("outfit_analyses_by_occasion", "occasion" => occasion.as_str())
        .increment(1.0);
    metrics::histogram!("outfit_analysis_rating").record(rating);
    metrics::histogram!("outfit_analysis_duration_seconds", "success" => "true")
        .record(processing_secs);
}

pub fn record_rejected(kind: &'static str, processing_secs: f64) {
    metrics::counter!("outfit_analyses_rejected_total", "reason" => kind).increment(1);
    metrics::histogram!("outfit_analysis_duration_seconds", "success" => "false")
        .record(processing_secs);
}
