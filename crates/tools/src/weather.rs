//! Weather tool — a canned forecast for any city.
//!
//! The forecaster persona only needs a deterministic answer, so no weather
//! API is called.

use async_trait::async_trait;
use sunnyside_core::context::Context;
use sunnyside_core::error::ToolError;
use sunnyside_core::tool::{Tool, ToolOutput};
use tracing::debug;

pub struct GetWeatherForLocationTool;

#[async_trait]
impl Tool for GetWeatherForLocationTool {
    fn name(&self) -> &str {
        "get_weather_for_location"
    }

    fn description(&self) -> &str {
        "Get weather for a given city."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "city": {
                    "type": "string",
                    "description": "The city to get the weather for"
                }
            },
            "required": ["city"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        _context: &Context,
    ) -> Result<ToolOutput, ToolError> {
        let city = arguments["city"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'city' argument".into()))?;

        debug!(city, "Weather lookup");

        Ok(ToolOutput {
            content: format!("It's always sunny in {city}!"),
            data: Some(serde_json::json!({ "city": city, "conditions": "sunny" })),
        })
    }
}
