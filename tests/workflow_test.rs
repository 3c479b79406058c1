mod common;

use std::time::Duration;

use common::*;
use outfit_rater::analyzer::{AnalysisError, OpenAiAnalyzer};
use outfit_rater::config::AnalyzerConfig;
use outfit_rater::entities::{outfit_analysis, OutfitAnalysis};
use outfit_rater::records;
use outfit_rater::workflow::Outcome;
use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn record_count(app: &TestApp) -> u64 {
    OutfitAnalysis::find()
        .count(app.workflow.db())
        .await
        .unwrap()
}

#[tokio::test]
async fn successful_analysis_completes_the_record() {
    let analyzer = FakeAnalyzer::replying(SAMPLE_REPLY);
    let app = test_app(analyzer.clone()).await;

    let outcome = app
        .workflow
        .process(submission("casual", "male", 25))
        .await
        .unwrap();

    let record = match outcome {
        Outcome::Completed(record) => record,
        other => panic!("expected completion, got {other:?}"),
    };
    assert_eq!(analyzer.calls(), 1);
    assert_eq!(record.rating, Some(8.0));
    assert_eq!(
        record.analysis_details,
        Some(serde_json::from_str::<Value>(SAMPLE_REPLY).unwrap())
    );
    let suggestions = record.suggestions.as_deref().unwrap();
    assert!(suggestions.contains("Great"));
    assert!(suggestions.contains("Good color match"));
    assert!(!suggestions.contains("Areas for Improvement"));
    assert!(suggestions.contains("**Colors:** Add a belt"));
    assert!(!suggestions.contains("**Fit:**"));
    assert!(record.processing_time.is_some_and(|t| t >= 0.0));
    assert!(record.is_completed());

    // The stored row matches what the workflow returned
    let stored = records::find(app.workflow.db(), record.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, record);
    assert_eq!(stored_images(&app), 1);
    assert!(app.images.resolve(&stored.image).unwrap().exists());
}

#[tokio::test]
async fn completed_record_round_trips_inputs_and_rating() {
    let app = test_app(FakeAnalyzer::replying(r#"{"rating": 7.5, "overall_impression": "Neat"}"#)).await;

    let Outcome::Completed(record) = app
        .workflow
        .process(submission("office", "female", 30))
        .await
        .unwrap()
    else {
        panic!("expected completion");
    };

    let stored = records::find(app.workflow.db(), record.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.occasion, "office");
    assert_eq!(stored.gender, "female");
    assert_eq!(stored.age, 30);
    assert_eq!(stored.rating, Some(7.5));
    assert_eq!(stored.created_at, record.created_at);
}

#[tokio::test]
async fn reading_a_record_twice_returns_the_same_fields() {
    let app = test_app(FakeAnalyzer::replying(SAMPLE_REPLY)).await;
    let Outcome::Completed(record) = app
        .workflow
        .process(submission("party", "other", 19))
        .await
        .unwrap()
    else {
        panic!("expected completion");
    };

    let first = records::find(app.workflow.db(), record.id).await.unwrap();
    let second = records::find(app.workflow.db(), record.id).await.unwrap();
    assert_eq!(first, second);
    assert!(first.is_some());
}

#[tokio::test]
async fn analyzer_failure_rejects_and_removes_record_and_image() {
    let analyzer = FakeAnalyzer::failing();
    let app = test_app(analyzer.clone()).await;

    let outcome = app
        .workflow
        .process(submission("date", "female", 22))
        .await
        .unwrap();

    match outcome {
        Outcome::Rejected { reason } => {
            assert!(matches!(reason, AnalysisError::UnexpectedStatus { .. }))
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    assert_eq!(analyzer.calls(), 1);
    assert_eq!(record_count(&app).await, 0);
    assert_eq!(stored_images(&app), 0);
}

#[tokio::test]
async fn unparseable_reply_rejects_without_leaving_a_record() {
    let app = test_app(FakeAnalyzer::replying("Sorry, I can't help with that.")).await;

    let outcome = app
        .workflow
        .process(submission("college", "male", 18))
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        Outcome::Rejected {
            reason: AnalysisError::MalformedJson(_)
        }
    ));
    assert_eq!(record_count(&app).await, 0);
}

#[tokio::test]
async fn reply_without_rating_is_rejected() {
    let app = test_app(FakeAnalyzer::replying(r#"{"overall_impression": "Nice"}"#)).await;

    let outcome = app
        .workflow
        .process(submission("formal", "male", 40))
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        Outcome::Rejected {
            reason: AnalysisError::MissingField("rating")
        }
    ));
    assert_eq!(record_count(&app).await, 0);
}

#[tokio::test]
async fn slow_analysis_times_out_and_is_rejected() {
    let app = test_app_with_timeout(FakeAnalyzer::hanging(), Duration::from_millis(50)).await;

    let outcome = app
        .workflow
        .process(submission("office", "male", 50))
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        Outcome::Rejected {
            reason: AnalysisError::Timeout(_)
        }
    ));
    assert_eq!(record_count(&app).await, 0);
    assert_eq!(stored_images(&app), 0);
}

#[tokio::test]
async fn abandoned_request_still_cleans_up_its_pending_record() {
    let analyzer = FakeAnalyzer::hanging();
    let app = test_app_with_timeout(analyzer.clone(), Duration::from_millis(300)).await;

    // The caller gives up long before the analysis times out
    let abandoned = tokio::time::timeout(
        Duration::from_millis(50),
        app.workflow.process(submission("casual", "male", 29)),
    )
    .await;
    assert!(abandoned.is_err());

    let mut remaining = u64::MAX;
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        remaining = record_count(&app).await;
        if remaining == 0 && stored_images(&app) == 0 {
            break;
        }
    }
    assert_eq!(remaining, 0);
    assert_eq!(stored_images(&app), 0);
    assert_eq!(analyzer.calls(), 1);
}

#[tokio::test]
async fn transport_error_from_real_client_is_rejected() {
    // Nothing listens on the discard port
    let analyzer = OpenAiAnalyzer::new(&AnalyzerConfig {
        api_key: "sk-test".into(),
        base_url: "http://127.0.0.1:9".into(),
        model: "gpt-4o".into(),
        timeout: Duration::from_secs(5),
    })
    .unwrap();
    let app = test_app(Arc::new(analyzer)).await;

    let outcome = app
        .workflow
        .process(submission("casual", "female", 33))
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        Outcome::Rejected {
            reason: AnalysisError::Request(_) | AnalysisError::Timeout(_)
        }
    ));
    assert_eq!(record_count(&app).await, 0);
}

#[tokio::test]
async fn garbage_from_model_endpoint_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "I'd rate it highly!"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let analyzer = OpenAiAnalyzer::new(&AnalyzerConfig {
        api_key: "sk-test".into(),
        base_url: format!("{}/v1", server.uri()),
        model: "gpt-4o".into(),
        timeout: Duration::from_secs(5),
    })
    .unwrap();
    let app = test_app(Arc::new(analyzer)).await;

    let outcome = app
        .workflow
        .process(submission("party", "male", 27))
        .await
        .unwrap();

    assert!(matches!(outcome, Outcome::Rejected { .. }));
    assert_eq!(record_count(&app).await, 0);
}

async fn insert_record(
    app: &TestApp,
    occasion: &str,
    gender: &str,
    created_at: &str,
    suggestions: Option<&str>,
) -> outfit_analysis::Model {
    outfit_analysis::ActiveModel {
        id: Set(Uuid::new_v4()),
        image: Set("outfit_images/2026/01/01/x.png".into()),
        occasion: Set(occasion.into()),
        gender: Set(gender.into()),
        age: Set(30),
        rating: Set(suggestions.map(|_| 6.0)),
        suggestions: Set(suggestions.map(String::from)),
        analysis_details: Set(suggestions.map(|_| serde_json::json!({"rating": 6}))),
        created_at: Set(chrono::DateTime::parse_from_rfc3339(created_at).unwrap()),
        processing_time: Set(suggestions.map(|_| 1.5)),
    }
    .insert(app.workflow.db())
    .await
    .unwrap()
}

#[tokio::test]
async fn listing_is_newest_first_and_filters() {
    let app = test_app(FakeAnalyzer::failing()).await;
    let oldest = insert_record(&app, "office", "female", "2026-01-01T09:00:00+00:00", Some("**Overall:** Crisp blazer")).await;
    let middle = insert_record(&app, "party", "male", "2026-01-02T09:00:00+00:00", Some("**Overall:** Loud shirt")).await;
    let newest = insert_record(&app, "office", "male", "2026-01-03T09:00:00+00:00", None).await;

    let all = records::list(app.workflow.db(), &records::ListQuery {
        page: 1,
        per_page: 20,
        ..Default::default()
    })
    .await
    .unwrap();
    let ids: Vec<Uuid> = all.items.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![newest.id, middle.id, oldest.id]);
    assert_eq!(all.total, 3);
    assert_eq!(all.total_pages, 1);

    let office = records::list(app.workflow.db(), &records::ListQuery {
        occasion: Some(outfit_rater::entities::Occasion::Office),
        page: 1,
        per_page: 20,
        ..Default::default()
    })
    .await
    .unwrap();
    let ids: Vec<Uuid> = office.items.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![newest.id, oldest.id]);

    let searched = records::list(app.workflow.db(), &records::ListQuery {
        search: Some("blazer".into()),
        page: 1,
        per_page: 20,
        ..Default::default()
    })
    .await
    .unwrap();
    assert_eq!(searched.items.len(), 1);
    assert_eq!(searched.items[0].id, oldest.id);

    let windowed = records::list(app.workflow.db(), &records::ListQuery {
        gender: Some(outfit_rater::entities::Gender::Male),
        created_after: Some(chrono::DateTime::parse_from_rfc3339("2026-01-02T00:00:00+00:00").unwrap()),
        created_before: Some(chrono::DateTime::parse_from_rfc3339("2026-01-02T23:59:59+00:00").unwrap()),
        page: 1,
        per_page: 20,
        ..Default::default()
    })
    .await
    .unwrap();
    assert_eq!(windowed.items.len(), 1);
    assert_eq!(windowed.items[0].id, middle.id);

    let paged = records::list(app.workflow.db(), &records::ListQuery {
        page: 2,
        per_page: 2,
        ..Default::default()
    })
    .await
    .unwrap();
    assert_eq!(paged.total_pages, 2);
    assert_eq!(paged.items.len(), 1);
    assert_eq!(paged.items[0].id, oldest.id);
}

async fn search(app: &TestApp, text: &str) -> Vec<Uuid> {
    records::list(app.workflow.db(), &records::ListQuery {
        search: Some(text.into()),
        page: 1,
        per_page: 20,
        ..Default::default()
    })
    .await
    .unwrap()
    .items
    .iter()
    .map(|r| r.id)
    .collect()
}

#[tokio::test]
async fn search_ignores_case_and_treats_wildcards_literally() {
    let app = test_app(FakeAnalyzer::failing()).await;
    let blazer = insert_record(&app, "office", "female", "2026-01-01T09:00:00+00:00", Some("**Overall:** Crisp Blazer")).await;
    let crowd = insert_record(&app, "party", "male", "2026-01-02T09:00:00+00:00", Some("**Overall:** 1000 compliments")).await;
    let percent = insert_record(&app, "party", "male", "2026-01-03T09:00:00+00:00", Some("**Overall:** 100% on point")).await;

    assert_eq!(search(&app, "CRISP blazer").await, vec![blazer.id]);
    assert_eq!(search(&app, "100%").await, vec![percent.id]);
    assert_eq!(search(&app, "1000").await, vec![crowd.id]);
    assert!(search(&app, "crisp_blazer").await.is_empty());
}

#[tokio::test]
async fn page_past_the_end_returns_the_last_page() {
    let app = test_app(FakeAnalyzer::failing()).await;
    let older = insert_record(&app, "office", "female", "2026-01-01T09:00:00+00:00", None).await;
    insert_record(&app, "office", "female", "2026-01-02T09:00:00+00:00", None).await;

    let page = records::list(app.workflow.db(), &records::ListQuery {
        page: u64::MAX,
        per_page: 1,
        ..Default::default()
    })
    .await
    .unwrap();
    assert_eq!(page.page, 2);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].id, older.id);

    let empty = test_app(FakeAnalyzer::failing()).await;
    let page = records::list(empty.workflow.db(), &records::ListQuery {
        page: u64::MAX,
        per_page: 20,
        ..Default::default()
    })
    .await
    .unwrap();
    assert_eq!(page.page, 1);
    assert!(page.items.is_empty());
}
