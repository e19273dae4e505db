//! Current time tool: reports the UTC clock.

use async_trait::async_trait;
use chrono::format::{Item, StrftimeItems};
use chrono::Utc;
use switchboard_core::error::ToolError;
use switchboard_core::tool::Tool;

pub struct CurrentTimeTool;

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &str {
        "current_time"
    }

    fn description(&self) -> &str {
        "Get the current date and time in UTC. Optionally format it with a strftime pattern."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "format": {
                    "type": "string",
                    "description": "strftime pattern, e.g. '%A %d %B %Y %H:%M'. Defaults to RFC 3339."
                }
            }
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let now = Utc::now();
        let mut result = serde_json::json!({
            "utc": now.to_rfc3339(),
            "unix": now.timestamp(),
            "weekday": now.format("%A").to_string(),
        });

        if let Some(pattern) = arguments["format"].as_str() {
            // Formatting an invalid pattern panics inside Display, so check first
            if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
                return Err(ToolError::InvalidArguments(format!(
                    "Invalid strftime pattern: {pattern}"
                )));
            }
            result["formatted"] = serde_json::json!(
                now.format_with_items(StrftimeItems::new(pattern)).to_string()
            );
        }

        Ok(result)
    }
}
