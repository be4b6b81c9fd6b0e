//! User location tool — resolves where the caller is from the turn context.

use async_trait::async_trait;
use sunnyside_core::context::Context;
use sunnyside_core::error::ToolError;
use sunnyside_core::tool::{Tool, ToolOutput};

pub struct GetUserLocationTool;

#[async_trait]
impl Tool for GetUserLocationTool {
    fn name(&self) -> &str {
        "get_user_location"
    }

    fn description(&self) -> &str {
        "Retrieve user information based on user ID."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    /// The location comes from `context.user_id`; arguments are ignored.
    async fn execute(
        &self,
        _arguments: serde_json::Value,
        context: &Context,
    ) -> Result<ToolOutput, ToolError> {
        let location = if context.user_id == "1" { "Florida" } else { "SF" };
        Ok(ToolOutput::text(location))
    }
}
