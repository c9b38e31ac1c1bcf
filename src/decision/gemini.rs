//! Gemini-backed decision engine
//!
//! Maps thread history onto generateContent turns and decodes the reply
//! into a `Decision`. The tool catalogue is fixed at construction and
//! advertised as function declarations on every round.

use crate::decision::{Decision, DecisionEngine};
use crate::error::OrchestrationError;
use crate::gemini::{Content, FunctionCall, FunctionDeclaration, GeminiClient, ModelReply, Part};
use crate::models::{Message, ToolCall, UserId};
use crate::tools::ToolSpec;
use crate::Result;
use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

pub struct GeminiDecisionEngine {
    client: GeminiClient,
    declarations: Vec<FunctionDeclaration>,
}

impl GeminiDecisionEngine {
    pub fn new(api_key: String, catalogue: Vec<ToolSpec>) -> Self {
        let declarations = catalogue
            .into_iter()
            .map(|spec| FunctionDeclaration {
                name: spec.name,
                description: spec.description,
                parameters: spec.parameters,
            })
            .collect();

        Self {
            client: GeminiClient::new(api_key),
            declarations,
        }
    }
}

#[async_trait]
impl DecisionEngine for GeminiDecisionEngine {
    async fn decide(
        &self,
        system_instructions: &str,
        history: &[Message],
        identified_user: Option<&UserId>,
    ) -> Result<Decision> {
        let instructions = fold_system_messages(system_instructions, history);
        let contents = history_to_contents(history);

        debug!(
            history_len = history.len(),
            identified_user = ?identified_user.map(|u| u.as_str()),
            "Requesting decision from Gemini"
        );

        let reply = self
            .client
            .generate(&instructions, contents, &self.declarations)
            .await?;

        reply_to_decision(reply)
    }
}

/// Map thread history onto Gemini contents. The API only knows `user`
/// and `model` roles: tool results travel as functionResponse parts under
/// `user`, and consecutive results merge into one content so parallel
/// calls come back as a single round.
fn history_to_contents(history: &[Message]) -> Vec<Content> {
    let mut contents: Vec<Content> = Vec::with_capacity(history.len());

    for message in history {
        match message {
            // Folded into the instruction block; contents have no system role.
            Message::System { .. } => {}
            Message::Human { content } => {
                contents.push(Content::user(vec![Part::text(content)]));
            }
            Message::AgentFinal { content } => {
                contents.push(Content::model(vec![Part::text(content)]));
            }
            Message::ToolRequest { content, calls } => {
                let mut parts = Vec::with_capacity(calls.len() + 1);
                if !content.is_empty() {
                    parts.push(Part::text(content));
                }
                parts.extend(calls.iter().map(|call| {
                    Part::function_call(FunctionCall {
                        name: call.tool_name.clone(),
                        args: call.arguments.clone(),
                    })
                }));
                contents.push(Content::model(parts));
            }
            Message::ToolResult { tool_name, content } => {
                let part =
                    Part::function_response(tool_name.clone(), json!({ "content": content }));
                match contents.last_mut() {
                    Some(last)
                        if last.role == "user"
                            && last.parts.iter().all(|p| p.function_response.is_some()) =>
                    {
                        last.parts.push(part);
                    }
                    _ => contents.push(Content::user(vec![part])),
                }
            }
        }
    }

    contents
}

/// Stray System messages in the history join the instruction block.
fn fold_system_messages(base: &str, history: &[Message]) -> String {
    let extras: Vec<&str> = history
        .iter()
        .filter_map(|m| match m {
            Message::System { content } => Some(content.as_str()),
            _ => None,
        })
        .collect();

    if extras.is_empty() {
        base.to_string()
    } else {
        format!("{}\n\n{}", base, extras.join("\n\n"))
    }
}

/// A reply with calls is a tool request; prose alone is final; neither is
/// a protocol violation the caller can retry.
fn reply_to_decision(reply: ModelReply) -> Result<Decision> {
    if !reply.calls.is_empty() {
        let calls = reply
            .calls
            .into_iter()
            .map(|call| ToolCall {
                tool_name: call.name,
                arguments: call.args,
            })
            .collect();
        Ok(Decision::CallTools {
            content: reply.text,
            calls,
        })
    } else if !reply.text.is_empty() {
        Ok(Decision::Final {
            content: reply.text,
        })
    } else {
        Err(OrchestrationError::DecisionUnavailable(
            "Gemini returned neither text nor tool calls".to_string(),
        ))
    }
}
