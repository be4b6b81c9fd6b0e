//! Built-in tool implementations for Sunnyside.
//!
//! The forecaster needs two capabilities: finding out where the user is,
//! and looking up the weather there.

pub mod user_location;
pub mod weather;

pub use user_location::GetUserLocationTool;
pub use weather::GetWeatherForLocationTool;

use sunnyside_core::error::ToolError;
use sunnyside_core::tool::ToolRegistry;

/// Create a tool registry with all built-in tools.
pub fn default_registry() -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(GetUserLocationTool))?;
    registry.register(Box::new(GetWeatherForLocationTool))?;
    Ok(registry)
}
