use std::sync::Arc;

use axum::{
    extract::{Extension, Multipart, Path, Query},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::error::ApiError;
use crate::entities::{outfit_analysis, Gender, Occasion};
use crate::intake::{
    SubmissionForm, UploadedImage, ALLOWED_EXTENSIONS, MAX_AGE, MAX_UPLOAD_BYTES, MIN_AGE,
};
use crate::records::{self, ListQuery, Page};
use crate::workflow::{AnalysisWorkflow, Outcome};

/// A stored analysis plus its display labels.
#[derive(Debug, Serialize)]
pub struct AnalysisView {
    #[serde(flatten)]
    pub record: outfit_analysis::Model,
    pub status: &'static str,
    pub label: String,
    pub occasion_label: Option<&'static str>,
    pub gender_label: Option<&'static str>,
}

impl From<outfit_analysis::Model> for AnalysisView {
    fn from(record: outfit_analysis::Model) -> Self {
        Self {
            status: if record.is_completed() { "completed" } else { "pending" },
            label: record.label(),
            occasion_label: record.occasion.parse::<Occasion>().ok().map(Occasion::label),
            gender_label: record.gender.parse::<Gender>().ok().map(Gender::label),
            record,
        }
    }
}

fn result_url(id: Uuid) -> String {
    format!("/result/{id}")
}

// GET /
pub async fn form_options() -> Json<Value> {
    let occasions: Vec<Value> = Occasion::ALL
        .into_iter()
        .map(|o| json!({"value": o.as_str(), "label": o.label()}))
        .collect();
    let genders: Vec<Value> = Gender::ALL
        .into_iter()
        .map(|g| json!({"value": g.as_str(), "label": g.label()}))
        .collect();

    Json(json!({
        "occasions": occasions,
        "genders": genders,
        "age": {"min": MIN_AGE, "max": MAX_AGE},
        "image": {
            "extensions": ALLOWED_EXTENSIONS,
            "max_bytes": MAX_UPLOAD_BYTES,
        },
    }))
}

// POST /analyze
pub async fn analyze_outfit(
    Extension(workflow): Extension<Arc<AnalysisWorkflow>>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let span = tracing::Span::current();
    span.record("action", "analyze_outfit");

    let mut form = SubmissionForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "image" => {
                let file_name = field.file_name().unwrap_or("").to_string();
                let data = field.bytes().await?;
                // Browsers send an empty part when no file was picked
                if !(file_name.is_empty() && data.is_empty()) {
                    form.image = Some(UploadedImage::new(file_name, data.to_vec()));
                }
            }
            "occasion" => form.occasion = Some(field.text().await?),
            "gender" => form.gender = Some(field.text().await?),
            "age" => form.age = Some(field.text().await?),
            _ => {}
        }
    }

    let submission = match form.validate() {
        Ok(s) => s,
        Err(errors) => {
            crate::metrics::record_validation_failure();
            span.record("business_event", "Submission failed validation");
            return Err(errors.into());
        }
    };

    match workflow.process(submission).await? {
        Outcome::Completed(record) => {
            let url = result_url(record.id);
            span.record("analysis_id", tracing::field::display(record.id))
                .record("business_event", "Outfit analyzed");

            Ok((
                StatusCode::CREATED,
                [(header::LOCATION, url.clone())],
                Json(json!({
                    "message": "Your outfit has been analyzed!",
                    "result_url": url,
                    "analysis": AnalysisView::from(record),
                })),
            )
                .into_response())
        }
        Outcome::Rejected { reason } => {
            span.record("business_event", "Outfit analysis rejected");
            Err(ApiError::Analysis(reason))
        }
    }
}

// GET /result/:id
pub async fn get_result(
    Extension(workflow): Extension<Arc<AnalysisWorkflow>>,
    Path(id): Path<String>,
) -> Result<Json<AnalysisView>, ApiError> {
    tracing::Span::current().record("action", "get_result");

    let id = Uuid::parse_str(&id).map_err(|_| ApiError::NotFound("Analysis"))?;
    let record = records::find(workflow.db(), id)
        .await?
        .ok_or(ApiError::NotFound("Analysis"))?;

    tracing::Span::current().record("analysis_id", tracing::field::display(record.id));
    Ok(Json(record.into()))
}

// GET /admin/analyses
pub async fn list_analyses(
    Extension(workflow): Extension<Arc<AnalysisWorkflow>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<AnalysisView>>, ApiError> {
    tracing::Span::current().record("action", "list_analyses");

    let page = records::list(workflow.db(), &query).await?;
    Ok(Json(Page {
        items: page.items.into_iter().map(AnalysisView::from).collect(),
        total: page.total,
        page: page.page,
        per_page: page.per_page,
        total_pages: page.total_pages,
    }))
}
