//! Outfit critique by an external vision model.

mod critique;
mod openai;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::entities::{Gender, Occasion};

pub use critique::{
    build_prompt, extract_json, format_suggestions, parse_critique, result_from_reply, Critique,
};
pub use openai::OpenAiAnalyzer;

/// Parsed critique, ready to be written to a record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub rating: f64,
    pub suggestions: String,
    pub details: Value,
}

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("request to vision model failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("vision model did not answer within {0:?}")]
    Timeout(Duration),
    #[error("vision model returned {status}: {body}")]
    UnexpectedStatus {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("vision model returned an empty reply")]
    EmptyReply,
    #[error("model reply is not valid JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),
    #[error("model reply is not a JSON object")]
    NotAnObject,
    #[error("model reply is missing '{0}'")]
    MissingField(&'static str),
    #[error("model rating is not a number: {0}")]
    InvalidRating(String),
    #[error("model rating {0} is outside 1-10")]
    RatingOutOfRange(f64),
}

impl AnalysisError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::Request(_) => "request",
            AnalysisError::Timeout(_) => "timeout",
            AnalysisError::UnexpectedStatus { .. } => "status",
            AnalysisError::EmptyReply => "empty_reply",
            AnalysisError::MalformedJson(_) | AnalysisError::NotAnObject => "malformed_json",
            AnalysisError::MissingField(_) => "missing_field",
            AnalysisError::InvalidRating(_) | AnalysisError::RatingOutOfRange(_) => "invalid_rating",
        }
    }
}

#[async_trait]
pub trait OutfitAnalyzer: Send + Sync {
    /// Rate one outfit photo. Makes a single attempt; errors are never retried here.
    async fn analyze(
        &self,
        image: &[u8],
        occasion: Occasion,
        gender: Gender,
        age: i32,
    ) -> Result<AnalysisResult, AnalysisError>;

    fn model_name(&self) -> &str;
}
