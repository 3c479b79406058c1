use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde_json::{json, Value};

use super::{critique, AnalysisError, AnalysisResult, OutfitAnalyzer};
use crate::config::AnalyzerConfig;
use crate::entities::{Gender, Occasion};

const MAX_TOKENS: u32 = 1000;
const TEMPERATURE: f64 = 0.7;

/// Client for an OpenAI-compatible `/chat/completions` endpoint with image input.
pub struct OpenAiAnalyzer {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl OpenAiAnalyzer {
    pub fn new(config: &AnalyzerConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout: config.timeout,
        })
    }

    fn request_body(&self, image: &[u8], prompt: &str) -> Value {
        let mime_type = infer::get(image)
            .map(|kind| kind.mime_type())
            .filter(|mime| mime.starts_with("image/"))
            .unwrap_or("image/jpeg");
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);

        json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": prompt },
                    { "type": "image_url", "image_url": {
                        "url": format!("data:{};base64,{}", mime_type, encoded)
                    }}
                ]
            }],
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE,
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> AnalysisError {
        if e.is_timeout() {
            AnalysisError::Timeout(self.timeout)
        } else {
            AnalysisError::Request(e)
        }
    }
}

#[async_trait]
impl OutfitAnalyzer for OpenAiAnalyzer {
    async fn analyze(
        &self,
        image: &[u8],
        occasion: Occasion,
        gender: Gender,
        age: i32,
    ) -> Result<AnalysisResult, AnalysisError> {
        let prompt = critique::build_prompt(occasion, gender, age);
        let body = self.request_body(image, &prompt);
        let url = format!("{}/chat/completions", self.base_url);

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(AnalysisError::UnexpectedStatus { status, body });
        }

        let json: Value = res.json().await.map_err(|e| self.transport_error(e))?;

        // choices[0].message.content
        let reply = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or(AnalysisError::EmptyReply)?;

        tracing::debug!(model = %self.model, reply_len = reply.len(), "vision model replied");

        critique::result_from_reply(reply)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
