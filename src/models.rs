//! Core data models for the loan agent

use serde::{Deserialize, Serialize};
use std::fmt;

//
// ================= Identifiers =================
//

/// Opaque conversation key. Minted once per UI session and supplied on
/// every pass; the orchestrator never inspects its contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(String);

impl ThreadId {
    pub fn new(id: impl Into<String>) -> Self {
        ThreadId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Verified customer identifier (`user_` followed by digits, lowercase).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        UserId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//
// ================= Messages =================
//

/// One entry in a conversation history. The set of variants is closed:
/// every consumer matches exhaustively, and adding a variant is a
/// compile-visible change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    System { content: String },
    Human { content: String },
    AgentFinal { content: String },
    ToolRequest { content: String, calls: Vec<ToolCall> },
    ToolResult { tool_name: String, content: String },
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message::System { content: content.into() }
    }

    pub fn human(content: impl Into<String>) -> Self {
        Message::Human { content: content.into() }
    }

    pub fn agent_final(content: impl Into<String>) -> Self {
        Message::AgentFinal { content: content.into() }
    }

    pub fn tool_request(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Message::ToolRequest { content: content.into(), calls }
    }

    pub fn tool_result(tool_name: impl Into<String>, content: impl Into<String>) -> Self {
        Message::ToolResult { tool_name: tool_name.into(), content: content.into() }
    }

    /// Short tag for logs and transcripts.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::System { .. } => "system",
            Message::Human { .. } => "human",
            Message::AgentFinal { .. } => "agent_final",
            Message::ToolRequest { .. } => "tool_request",
            Message::ToolResult { .. } => "tool_result",
        }
    }
}

/// A single tool invocation requested by the decision capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool_name: String,
    pub arguments: serde_json::Map<String, serde_json::Value>,
}

//
// ================= Conversation Thread =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationThread {
    pub thread_id: ThreadId,
    /// Null until the identity phase captures a user id; set at most once.
    pub identified_user: Option<UserId>,
    /// Append-only ordered history.
    pub messages: Vec<Message>,
}

impl ConversationThread {
    pub fn new(thread_id: ThreadId) -> Self {
        ConversationThread {
            thread_id,
            identified_user: None,
            messages: Vec::new(),
        }
    }
}

//
// ================= Risk =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskVerdict {
    Approved,
    Rejected,
    ManualReview,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskDecision {
    pub verdict: RiskVerdict,
    pub reason: String,
}

//
// ================= Banking Records =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub name: String,
    pub income: f64,
    pub employment_status: String,
    pub active_loans: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditReport {
    pub user_id: String,
    pub credit_score: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisbursementReceipt {
    pub status: String,
    pub transaction_id: String,
    pub message: String,
}

//
// ================= Turn Outcome =================
//

/// What one orchestration pass produced. `messages` is the full updated
/// history; `new_messages` is the tail appended by this pass, which is
/// what a UI renders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub thread_id: ThreadId,
    pub messages: Vec<Message>,
    pub new_messages: Vec<Message>,
}

impl TurnOutcome {
    /// The last final reply of this pass, if the pass produced one.
    pub fn reply(&self) -> Option<&str> {
        self.new_messages.iter().rev().find_map(|m| match m {
            Message::AgentFinal { content } => Some(content.as_str()),
            _ => None,
        })
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RiskVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskVerdict::Approved => "APPROVED",
            RiskVerdict::Rejected => "REJECTED",
            RiskVerdict::ManualReview => "MANUAL_REVIEW",
        };
        write!(f, "{}", s)
    }
}
