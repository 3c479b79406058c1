//! Submission lifecycle: `Received -> Pending -> Completed | Rejected`.
//!
//! A validated [`Submission`] is stored as a pending record, handed to the
//! analyzer, and then either completed in a single update or deleted together
//! with its image. A record is never left half-populated.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, Set};
use tracing::Instrument;
use uuid::Uuid;

use crate::analyzer::{AnalysisError, AnalysisResult, OutfitAnalyzer};
use crate::entities::{outfit_analysis, OutfitAnalysis};
use crate::intake::Submission;
use crate::storage::ImageStore;

/// Terminal state of one submission.
#[derive(Debug)]
pub enum Outcome {
    Completed(outfit_analysis::Model),
    Rejected { reason: AnalysisError },
}

/// Infrastructure failures outside the analysis call.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("database error: {0}")]
    Database(#[from] DbErr),
    #[error("image storage error: {0}")]
    Storage(#[from] std::io::Error),
    #[error("analysis task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub struct AnalysisWorkflow {
    db: DatabaseConnection,
    analyzer: Arc<dyn OutfitAnalyzer>,
    images: Arc<dyn ImageStore>,
    timeout: Duration,
}

impl AnalysisWorkflow {
    pub fn new(
        db: DatabaseConnection,
        analyzer: Arc<dyn OutfitAnalyzer>,
        images: Arc<dyn ImageStore>,
        timeout: Duration,
    ) -> Self {
        Self {
            db,
            analyzer,
            images,
            timeout,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Runs the submission to a terminal state on its own task, so dropping the
    /// returned future (a client hanging up) cannot strand a pending record.
    pub async fn process(self: &Arc<Self>, submission: Submission) -> Result<Outcome, WorkflowError> {
        let span = tracing::info_span!(
            "process_submission",
            analysis_id = tracing::field::Empty,
            occasion = %submission.occasion(),
            model = self.analyzer.model_name(),
        );

        let workflow = Arc::clone(self);
        tokio::spawn(async move { workflow.run(submission).await }.instrument(span)).await?
    }

    async fn run(&self, submission: Submission) -> Result<Outcome, WorkflowError> {
        let pending = self.create_pending(&submission).await?;
        tracing::Span::current().record("analysis_id", tracing::field::display(pending.id));
        tracing::info!("Created pending analysis {}", pending.id);

        let started = Instant::now();
        let result = match tokio::time::timeout(
            self.timeout,
            self.analyzer.analyze(
                &submission.image().bytes,
                submission.occasion(),
                submission.gender(),
                submission.age(),
            ),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(AnalysisError::Timeout(self.timeout)),
        };
        let elapsed = started.elapsed().as_secs_f64();

        match result {
            Ok(analysis) => {
                let record = self.complete(pending, analysis, elapsed).await?;
                tracing::info!(
                    "Analysis {} completed: rating={:?} in {:.2}s",
                    record.id,
                    record.rating,
                    elapsed
                );
                crate::metrics::record_completed(
                    submission.occasion(),
                    record.rating.unwrap_or_default(),
                    elapsed,
                );
                Ok(Outcome::Completed(record))
            }
            Err(reason) => {
                tracing::error!("Analysis {} failed: {}", pending.id, reason);
                crate::metrics::record_rejected(reason.kind(), elapsed);
                self.discard(&pending).await?;
                Ok(Outcome::Rejected { reason })
            }
        }
    }

    async fn create_pending(
        &self,
        submission: &Submission,
    ) -> Result<outfit_analysis::Model, WorkflowError> {
        let image = submission.image();
        let reference = self.images.save(&image.extension(), &image.bytes).await?;

        let pending = outfit_analysis::ActiveModel {
            id: Set(Uuid::new_v4()),
            image: Set(reference.clone()),
            occasion: Set(submission.occasion().as_str().to_string()),
            gender: Set(submission.gender().as_str().to_string()),
            age: Set(submission.age()),
            rating: Set(None),
            suggestions: Set(None),
            analysis_details: Set(None),
            created_at: Set(Utc::now().fixed_offset()),
            processing_time: Set(None),
        };

        match pending.insert(&self.db).await {
            Ok(model) => Ok(model),
            Err(e) => {
                self.delete_image(&reference).await;
                Err(e.into())
            }
        }
    }

    /// Writes every output column in one update.
    async fn complete(
        &self,
        pending: outfit_analysis::Model,
        analysis: AnalysisResult,
        elapsed: f64,
    ) -> Result<outfit_analysis::Model, WorkflowError> {
        let mut active: outfit_analysis::ActiveModel = pending.clone().into();
        active.rating = Set(Some(analysis.rating));
        active.suggestions = Set(Some(analysis.suggestions));
        active.analysis_details = Set(Some(analysis.details));
        active.processing_time = Set(Some(elapsed));

        match active.update(&self.db).await {
            Ok(record) => Ok(record),
            Err(e) => {
                tracing::error!("Failed to complete analysis {}: {}", pending.id, e);
                if let Err(cleanup) = self.discard(&pending).await {
                    tracing::error!("Failed to discard analysis {}: {}", pending.id, cleanup);
                }
                Err(e.into())
            }
        }
    }

    async fn discard(&self, pending: &outfit_analysis::Model) -> Result<(), WorkflowError> {
        OutfitAnalysis::delete_by_id(pending.id)
            .exec(&self.db)
            .await?;
        self.delete_image(&pending.image).await;
        tracing::info!("Discarded pending analysis {}", pending.id);
        Ok(())
    }

    async fn delete_image(&self, reference: &str) {
        if let Err(e) = self.images.delete(reference).await {
            tracing::warn!("Failed to delete image {}: {}", reference, e);
        }
    }
}
