//! Structured output — the typed shape a turn must end with.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A named JSON schema the completion service must conform to.
///
/// Mirrors the `json_schema` object of OpenAI-style `response_format`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredOutputFormat {
    /// Name of the schema (also used as the tool name in tool strategy)
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// The JSON schema for the structured output
    pub schema: serde_json::Value,

    /// Whether to request strict schema adherence
    #[serde(default)]
    pub strict: bool,
}

/// A type a turn can terminate with.
pub trait StructuredOutput: Serialize + DeserializeOwned + Send + Sync + Sized {
    /// The schema advertised to the completion service.
    fn output_format() -> StructuredOutputFormat;

    /// Validate a raw payload into the typed output.
    fn validate(value: &serde_json::Value) -> Result<Self, String> {
        serde_json::from_value(value.clone()).map_err(|e| e.to_string())
    }
}

/// The final answer of a forecaster turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResponseFormat {
    /// A punny response (always required)
    pub punny_response: String,

    /// Weather conditions, present only when the turn concerned weather
    #[serde(default)]
    pub weather_conditions: Option<String>,
}

impl StructuredOutput for ResponseFormat {
    fn output_format() -> StructuredOutputFormat {
        StructuredOutputFormat {
            name: "ResponseFormat".into(),
            description: Some("Response schema for the agent.".into()),
            schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "punny_response": {
                        "type": "string",
                        "description": "A punny response (always required)"
                    },
                    "weather_conditions": {
                        "type": ["string", "null"],
                        "description": "Any interesting information about the weather if available"
                    }
                },
                "required": ["punny_response", "weather_conditions"],
                "additionalProperties": false
            }),
            strict: true,
        }
    }

    fn validate(value: &serde_json::Value) -> Result<Self, String> {
        let parsed: Self = serde_json::from_value(value.clone()).map_err(|e| e.to_string())?;
        if parsed.punny_response.trim().is_empty() {
            return Err("punny_response must not be empty".into());
        }
        Ok(parsed)
    }
}

/// Parse a model's free-text answer as a JSON payload.
///
/// A single surrounding Markdown code fence (```json ... ```) is accepted;
/// anything else that is not valid JSON is an error.
pub fn parse_structured_text(text: &str) -> Result<serde_json::Value, String> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    if body.is_empty() {
        return Err("model returned an empty answer".into());
    }
    serde_json::from_str(body).map_err(|e| format!("answer is not valid JSON: {e}"))
}
