//! Transcript classification.
//!
//! The model is asked for a strict JSON object. Missing fields are errors;
//! out-of-vocabulary type or priority values are not, they fall back to
//! `other` and `medium`.

use civic_map_incident_models::{IncidentPriority, IncidentType};
use serde::{Deserialize, Serialize};

use crate::AiError;
use crate::providers::{CompletionRequest, LlmProvider, Message};

const SYSTEM_PROMPT: &str = r#"You are an AI assistant that analyzes citizen incident reports for South African municipalities.

Extract and classify the following from the speech transcript:
1. Title: A clear, concise title (max 100 chars)
2. Description: A detailed description of the incident
3. Type: Classify as one of: water, electricity, roads, waste, other
4. Priority: Classify as: low, medium, high, critical

Consider these factors for priority:
- Critical: Safety hazards, major infrastructure failures, emergencies
- High: Service disruptions affecting many people
- Medium: Standard maintenance issues
- Low: Minor cosmetic or non-urgent issues

Respond ONLY with a valid JSON object in this exact format:
{
  "title": "Brief incident title",
  "description": "Detailed description of the incident",
  "type": "water|electricity|roads|waste|other",
  "priority": "low|medium|high|critical"
}"#;

const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 500;

/// A structured report extracted from a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceReport {
    /// Short title.
    pub title: String,
    /// Detailed description.
    pub description: String,
    /// Incident category.
    #[serde(rename = "type")]
    pub incident_type: IncidentType,
    /// Triage priority.
    pub priority: IncidentPriority,
}

fn classification_error(message: impl Into<String>) -> AiError {
    AiError::Classification {
        message: message.into(),
    }
}

/// Builds the completion request sent for `transcript`.
#[must_use]
pub fn build_request(transcript: &str) -> CompletionRequest {
    CompletionRequest {
        system: SYSTEM_PROMPT.to_string(),
        messages: vec![Message::user(format!(
            "Please analyze this incident report: \"{transcript}\""
        ))],
        temperature: TEMPERATURE,
        max_tokens: MAX_TOKENS,
    }
}

fn required_field<'a>(value: &'a serde_json::Value, name: &str) -> Result<&'a str, AiError> {
    value
        .get(name)
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| classification_error(format!("Missing required field: {name}")))
}

/// Strips a surrounding Markdown code fence, which some models add even
/// when told not to.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parses and validates a model answer.
///
/// # Errors
///
/// Returns [`AiError::Classification`] if the answer is not JSON or a
/// required field is missing or empty.
pub fn parse_report(content: &str) -> Result<VoiceReport, AiError> {
    let value: serde_json::Value = serde_json::from_str(strip_code_fence(content))
        .map_err(|e| {
            log::error!("Failed to parse model response ({e}): {content}");
            classification_error("Invalid response format from AI")
        })?;

    let title = required_field(&value, "title")?;
    let description = required_field(&value, "description")?;
    let raw_type = required_field(&value, "type")?;
    let raw_priority = required_field(&value, "priority")?;

    let incident_type = raw_type.parse().unwrap_or_else(|_| {
        log::debug!("Model returned unknown type '{raw_type}', using other");
        IncidentType::Other
    });
    let priority = raw_priority.parse().unwrap_or_else(|_| {
        log::debug!("Model returned unknown priority '{raw_priority}', using medium");
        IncidentPriority::Medium
    });

    Ok(VoiceReport {
        title: title.to_string(),
        description: description.to_string(),
        incident_type,
        priority,
    })
}

/// Classifies a spoken report.
///
/// # Errors
///
/// Returns [`AiError::Classification`] for an empty transcript or an
/// unusable answer, and the provider's error if the request fails.
pub async fn classify_transcript(
    provider: &dyn LlmProvider,
    transcript: &str,
) -> Result<VoiceReport, AiError> {
    let transcript = transcript.trim();
    if transcript.is_empty() {
        return Err(classification_error("No transcript provided"));
    }

    log::info!(
        "Classifying {}-char transcript with {}",
        transcript.len(),
        provider.model()
    );

    let content = provider.complete(&build_request(transcript)).await?;
    let report = parse_report(&content)?;

    log::debug!(
        "Classified transcript as {} / {}",
        report.incident_type,
        report.priority
    );

    Ok(report)
}
