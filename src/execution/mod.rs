//! Ordered tool dispatch
//!
//! This is where tool requests become tool results.
//! The decision capability is NOT allowed here; it only sees the
//! rendered result text on its next round.

use crate::error::OrchestrationError;
use crate::models::{Message, ToolCall};
use crate::tools::ToolRegistry;
use crate::Result;
use std::time::Instant;
use tracing::{debug, warn};

/// Executes the calls of a single tool request in order.
pub struct ToolExecutor {
    registry: ToolRegistry,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Every call yields exactly one ToolResult carrying the same
    /// tool_name, in request order. A failing call becomes failure text
    /// without suppressing the calls after it. A tool name missing from
    /// the registry fails the whole pass: the catalogue is closed, so a
    /// miss is a programming error, not a model mistake to converse about.
    pub async fn execute_calls(&self, calls: &[ToolCall]) -> Result<Vec<Message>> {
        let mut results = Vec::with_capacity(calls.len());

        for call in calls {
            let tool = self
                .registry
                .get(&call.tool_name)
                .ok_or_else(|| OrchestrationError::UnknownTool(call.tool_name.clone()))?;

            let start = Instant::now();

            let content = match tool.execute(&call.arguments).await {
                Ok(text) => text,
                Err(e) if e.is_tool_recoverable() => {
                    warn!(tool_name = %call.tool_name, error = %e, "Tool call failed");
                    format!("TOOL ERROR ({}): {}", call.tool_name, e)
                }
                Err(e) => return Err(e),
            };

            debug!(
                tool_name = %call.tool_name,
                execution_time_ms = start.elapsed().as_millis() as u64,
                "Tool call completed"
            );

            results.push(Message::tool_result(call.tool_name.clone(), content));
        }

        Ok(results)
    }
}
