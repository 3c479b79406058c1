#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use outfit_rater::analyzer::{result_from_reply, AnalysisError, AnalysisResult, OutfitAnalyzer};
use outfit_rater::entities::{Gender, Occasion};
use outfit_rater::intake::{Submission, SubmissionForm, UploadedImage};
use outfit_rater::migrator::Migrator;
use outfit_rater::storage::LocalImageStore;
use outfit_rater::workflow::AnalysisWorkflow;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

pub const SAMPLE_REPLY: &str = r#"{"rating": 8, "overall_impression": "Great", "strengths": ["Good color match"], "improvements": [], "specific_suggestions": {"colors": "Add a belt", "fit": "", "styling": "", "accessories": ""}}"#;

/// Enough of a PNG header for content sniffing.
pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDRoutfit";

pub async fn setup_db() -> DatabaseConnection {
    // One connection, otherwise every pooled connection gets its own empty database
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(opts).await.expect("connect sqlite");
    Migrator::up(&db, None).await.expect("run migrations");
    db
}

pub enum Behavior {
    Reply(String),
    Fail,
    Hang,
}

/// Stand-in for the vision model.
pub struct FakeAnalyzer {
    behavior: Behavior,
    calls: AtomicUsize,
}

impl FakeAnalyzer {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            behavior: Behavior::Reply(reply.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            behavior: Behavior::Fail,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn hanging() -> Arc<Self> {
        Arc::new(Self {
            behavior: Behavior::Hang,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OutfitAnalyzer for FakeAnalyzer {
    async fn analyze(
        &self,
        _image: &[u8],
        _occasion: Occasion,
        _gender: Gender,
        _age: i32,
    ) -> Result<AnalysisResult, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Reply(reply) => result_from_reply(reply),
            Behavior::Fail => Err(AnalysisError::UnexpectedStatus {
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                body: "overloaded".into(),
            }),
            Behavior::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }

    fn model_name(&self) -> &str {
        "fake"
    }
}

pub struct TestApp {
    pub workflow: Arc<AnalysisWorkflow>,
    pub images: LocalImageStore,
    // Keeps the media root alive for the test
    pub media: tempfile::TempDir,
}

pub async fn test_app(analyzer: Arc<dyn OutfitAnalyzer>) -> TestApp {
    test_app_with_timeout(analyzer, Duration::from_secs(5)).await
}

pub async fn test_app_with_timeout(analyzer: Arc<dyn OutfitAnalyzer>, timeout: Duration) -> TestApp {
    let media = tempfile::tempdir().expect("tempdir");
    let images = LocalImageStore::new(media.path());
    let db = setup_db().await;
    let workflow = Arc::new(AnalysisWorkflow::new(
        db,
        analyzer,
        Arc::new(images.clone()),
        timeout,
    ));
    TestApp {
        workflow,
        images,
        media,
    }
}

pub fn submission(occasion: &str, gender: &str, age: i32) -> Submission {
    SubmissionForm {
        image: Some(UploadedImage::new("outfit.png", PNG)),
        occasion: Some(occasion.into()),
        gender: Some(gender.into()),
        age: Some(age.to_string()),
    }
    .validate()
    .expect("valid submission")
}

/// Number of files stored under the media root.
pub fn stored_images(app: &TestApp) -> usize {
    fn count(dir: &std::path::Path) -> usize {
        std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .flatten()
                    .map(|e| {
                        let path = e.path();
                        if path.is_dir() {
                            count(&path)
                        } else {
                            1
                        }
                    })
                    .sum()
            })
            .unwrap_or(0)
    }
    count(app.media.path())
}
