//! How a turn obtains its structured final answer.

use std::fmt;
use std::str::FromStr;

/// Structured-output strategy of the agent loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputStrategy {
    /// `Native` if the provider supports it, `Tool` otherwise.
    #[default]
    Auto,

    /// Send the schema as the provider's `response_format`.
    Native,

    /// Advertise the schema as an extra tool; calling it ends the turn.
    Tool,
}

impl OutputStrategy {
    /// Pick a concrete strategy for a provider.
    pub fn resolve(self, provider_supports_native: bool) -> Self {
        match self {
            Self::Auto if provider_supports_native => Self::Native,
            Self::Auto => Self::Tool,
            other => other,
        }
    }
}

impl FromStr for OutputStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "native" => Ok(Self::Native),
            "tool" => Ok(Self::Tool),
            other => Err(format!(
                "Unknown output strategy '{other}' (expected auto, native or tool)"
            )),
        }
    }
}

impl fmt::Display for OutputStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Auto => "auto",
            Self::Native => "native",
            Self::Tool => "tool",
        };
        f.write_str(s)
    }
}
