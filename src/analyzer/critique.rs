use serde_json::{Map, Value};

use super::{AnalysisError, AnalysisResult};
use crate::entities::{Gender, Occasion};

/// Model reply: a required `rating` plus whatever else the model sent.
#[derive(Debug, Clone, PartialEq)]
pub struct Critique {
    pub rating: f64,
    pub fields: Map<String, Value>,
}

impl Critique {
    fn text(&self, key: &str) -> Option<String> {
        match self.fields.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    fn list(&self, key: &str) -> Vec<String> {
        self.fields
            .get(key)
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn overall_impression(&self) -> Option<String> {
        self.text("overall_impression")
    }

    pub fn strengths(&self) -> Vec<String> {
        self.list("strengths")
    }

    pub fn improvements(&self) -> Vec<String> {
        self.list("improvements")
    }

    pub fn specific_suggestions(&self) -> Option<&Map<String, Value>> {
        self.fields
            .get("specific_suggestions")
            .and_then(|v| v.as_object())
    }
}

pub fn build_prompt(occasion: Occasion, gender: Gender, age: i32) -> String {
    format!(
        r#"You are a professional fashion consultant. Analyze this outfit image and provide:

1. A rating from 1 to 10 (where 10 is perfect for the occasion)
2. Detailed improvement suggestions

Context:
- Occasion: {occasion}
- Gender: {gender}
- Age: {age}

Consider:
- Color coordination and contrast
- Fit and proportion
- Appropriateness for the occasion
- Style and current fashion trends
- Accessories and overall presentation

Respond with a single JSON object and nothing else, in exactly this format:
{{
    "rating": <number between 1-10>,
    "overall_impression": "<brief overall assessment>",
    "strengths": ["<strength 1>", "<strength 2>", ...],
    "improvements": ["<improvement 1>", "<improvement 2>", ...],
    "specific_suggestions": {{
        "colors": "<color suggestions>",
        "fit": "<fit suggestions>",
        "styling": "<styling suggestions>",
        "accessories": "<accessory suggestions>"
    }}
}}

Be constructive, specific, and helpful in your feedback."#,
        occasion = occasion.as_str(),
        gender = gender.as_str(),
        age = age,
    )
}

/// Pull the JSON object out of a reply that may be fenced (```json or ```) or bare.
pub fn extract_json(reply: &str) -> &str {
    let fenced = reply
        .split_once("```json")
        .or_else(|| reply.split_once("```"))
        .map(|(_, rest)| rest.split("```").next().unwrap_or(rest));

    let candidate = fenced.unwrap_or(reply).trim();
    if candidate.starts_with('{') {
        return candidate;
    }

    // Prose around a bare object
    match (candidate.find('{'), candidate.rfind('}')) {
        (Some(start), Some(end)) if start < end => &candidate[start..=end],
        _ => candidate,
    }
}

pub fn parse_critique(reply: &str) -> Result<(Critique, Value), AnalysisError> {
    let json = extract_json(reply);
    if json.is_empty() {
        return Err(AnalysisError::EmptyReply);
    }

    let value: Value = serde_json::from_str(json)?;
    let mut fields = value.as_object().ok_or(AnalysisError::NotAnObject)?.clone();

    let rating = match fields.remove("rating") {
        None | Some(Value::Null) => return Err(AnalysisError::MissingField("rating")),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| AnalysisError::InvalidRating(n.to_string()))?,
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| AnalysisError::InvalidRating(s))?,
        Some(other) => return Err(AnalysisError::InvalidRating(other.to_string())),
    };

    if !(1.0..=10.0).contains(&rating) {
        return Err(AnalysisError::RatingOutOfRange(rating));
    }

    Ok((Critique { rating, fields }, value))
}

pub fn format_suggestions(critique: &Critique) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(overall) = critique.overall_impression() {
        parts.push(format!("**Overall:** {overall}\n"));
    }

    let strengths = critique.strengths();
    if !strengths.is_empty() {
        parts.push("**What's Working Well:**".to_string());
        parts.extend(strengths.iter().map(|s| format!("• {s}")));
        parts.push(String::new());
    }

    let improvements = critique.improvements();
    if !improvements.is_empty() {
        parts.push("**Areas for Improvement:**".to_string());
        parts.extend(improvements.iter().map(|s| format!("• {s}")));
        parts.push(String::new());
    }

    if let Some(specific) = critique.specific_suggestions() {
        parts.push("**Specific Recommendations:**".to_string());
        for (key, marker, label) in [
            ("colors", "🎨", "Colors"),
            ("fit", "👔", "Fit"),
            ("styling", "✨", "Styling"),
            ("accessories", "💍", "Accessories"),
        ] {
            if let Some(text) = specific.get(key).and_then(|v| v.as_str()) {
                if !text.trim().is_empty() {
                    parts.push(format!("{marker} **{label}:** {text}"));
                }
            }
        }
    }

    parts.join("\n")
}

/// Parse a raw model reply into the stored result.
pub fn result_from_reply(reply: &str) -> Result<AnalysisResult, AnalysisError> {
    let (critique, details) = parse_critique(reply)?;
    Ok(AnalysisResult {
        // Stored with one decimal place
        rating: (critique.rating * 10.0).round() / 10.0,
        suggestions: format_suggestions(&critique),
        details,
    })
}
