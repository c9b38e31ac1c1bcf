//! Turn orchestrator - runs exactly one pass per human turn
//!
//! AWAITING_ID → TURN_COMPLETE (identity phase)
//! DECIDING → EXECUTING_TOOLS → DECIDING → ... → TURN_COMPLETE (decision phase)

use crate::decision::{build_system_instructions, Decision, DecisionEngine};
use crate::error::OrchestrationError;
use crate::execution::ToolExecutor;
use crate::identity::extract_user_id;
use crate::models::{Message, ThreadId, ToolCall, TurnOutcome, UserId};
use crate::state::{ThreadLocks, ThreadStore, TurnDelta};
use crate::Result;
use std::time::Instant;
use tracing::{debug, info};

pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 8;

const ACCESS_DENIED_REPLY: &str = "⚠️ **Access Denied**: I need your User ID to proceed.\n\nPlease type it exactly like this: **user_123**";

fn identity_verified_reply(user: &UserId) -> String {
    format!(
        "✅ Identity Verified. Accessing secure profile for **{}**.\n\nHow can I help you with your finances today?",
        user
    )
}

// ================= Pass State Machine =================

/// Processing phase within a single pass. Derived from the thread record
/// at entry, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    AwaitingId,
    Deciding,
    ExecutingTools,
    TurnComplete,
}

/// What just happened inside the pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    IdentityFound(UserId),
    IdentityMissing,
    FinalDecision,
    ToolsRequested,
    ToolsCompleted,
}

/// The single transition table for the pass machine. Any pair not listed
/// is a driver bug and surfaces as `InvalidThreadState`.
pub fn transition(state: TurnState, event: &TurnEvent) -> Result<TurnState> {
    match (state, event) {
        (TurnState::AwaitingId, TurnEvent::IdentityFound(_)) => Ok(TurnState::TurnComplete),
        (TurnState::AwaitingId, TurnEvent::IdentityMissing) => Ok(TurnState::TurnComplete),
        (TurnState::Deciding, TurnEvent::FinalDecision) => Ok(TurnState::TurnComplete),
        (TurnState::Deciding, TurnEvent::ToolsRequested) => Ok(TurnState::ExecutingTools),
        (TurnState::ExecutingTools, TurnEvent::ToolsCompleted) => Ok(TurnState::Deciding),
        (state, event) => Err(OrchestrationError::InvalidThreadState(format!(
            "illegal transition: {:?} in state {:?}",
            event, state
        ))),
    }
}

// ================= Orchestrator =================

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Upper bound on decide/execute rounds within one pass.
    pub max_tool_rounds: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }
}

/// Main orchestrator that coordinates one full pass per human turn
pub struct Orchestrator {
    decision_engine: Box<dyn DecisionEngine>,
    tool_executor: ToolExecutor,
    store: Box<dyn ThreadStore>,
    locks: ThreadLocks,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        decision_engine: Box<dyn DecisionEngine>,
        tool_executor: ToolExecutor,
        store: Box<dyn ThreadStore>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            decision_engine,
            tool_executor,
            store,
            locks: ThreadLocks::new(),
            config,
        }
    }

    /// Run one pass: one human turn in, one committed delta out.
    ///
    /// The pass works on a private copy of the thread and commits it with a
    /// single `append` once it reaches TURN_COMPLETE. Any error before that
    /// point leaves the store exactly as it was, so the caller can resend
    /// the same turn.
    pub async fn run_turn(&self, thread_id: &ThreadId, user_text: &str) -> Result<TurnOutcome> {
        let _guard = self.locks.acquire(thread_id).await;
        let start_time = Instant::now();

        let thread = self.store.get_or_create(thread_id).await?;

        info!(
            thread_id = %thread_id,
            identified = thread.identified_user.is_some(),
            "Orchestrator: starting pass"
        );

        // Working copy. Everything past base_len is this pass's delta.
        let mut messages = thread.messages.clone();
        let base_len = messages.len();
        messages.push(Message::human(user_text));

        let mut newly_identified: Option<UserId> = None;
        let mut pending_calls: Vec<ToolCall> = Vec::new();
        let mut tool_rounds = 0usize;

        let mut state = if thread.identified_user.is_none() {
            TurnState::AwaitingId
        } else {
            TurnState::Deciding
        };

        loop {
            match state {
                TurnState::AwaitingId => {
                    let event = match extract_user_id(user_text) {
                        Some(user) => {
                            info!(thread_id = %thread_id, user_id = %user, "Identity captured");
                            messages.push(Message::agent_final(identity_verified_reply(&user)));
                            newly_identified = Some(user.clone());
                            TurnEvent::IdentityFound(user)
                        }
                        None => {
                            debug!(thread_id = %thread_id, "No user id in turn, access denied");
                            messages.push(Message::agent_final(ACCESS_DENIED_REPLY));
                            TurnEvent::IdentityMissing
                        }
                    };
                    state = transition(state, &event)?;
                }
                TurnState::Deciding => {
                    let instructions = build_system_instructions(thread.identified_user.as_ref());

                    debug!(
                        thread_id = %thread_id,
                        round = tool_rounds,
                        history_len = messages.len(),
                        "Requesting decision"
                    );

                    let decision = self
                        .decision_engine
                        .decide(&instructions, &messages, thread.identified_user.as_ref())
                        .await?;

                    let event = match decision {
                        Decision::Final { content } => {
                            messages.push(Message::agent_final(content));
                            TurnEvent::FinalDecision
                        }
                        Decision::CallTools { content, calls } => {
                            tool_rounds += 1;
                            if tool_rounds > self.config.max_tool_rounds {
                                return Err(OrchestrationError::ToolLoopExceeded(
                                    self.config.max_tool_rounds,
                                ));
                            }

                            debug!(
                                thread_id = %thread_id,
                                round = tool_rounds,
                                call_count = calls.len(),
                                "Decision requested tools"
                            );

                            pending_calls = calls.clone();
                            messages.push(Message::tool_request(content, calls));
                            TurnEvent::ToolsRequested
                        }
                    };
                    state = transition(state, &event)?;
                }
                TurnState::ExecutingTools => {
                    let results = self.tool_executor.execute_calls(&pending_calls).await?;
                    messages.extend(results);
                    pending_calls.clear();
                    state = transition(state, &TurnEvent::ToolsCompleted)?;
                }
                TurnState::TurnComplete => break,
            }
        }

        let new_messages: Vec<Message> = messages[base_len..].to_vec();

        self.store
            .append(
                thread_id,
                TurnDelta {
                    messages: new_messages.clone(),
                    identified_user: newly_identified,
                },
            )
            .await?;

        info!(
            thread_id = %thread_id,
            new_messages = new_messages.len(),
            rounds = tool_rounds,
            execution_time_ms = start_time.elapsed().as_millis() as u64,
            "Pass complete"
        );

        Ok(TurnOutcome {
            thread_id: thread_id.clone(),
            messages,
            new_messages,
        })
    }

    /// Full transcript of an existing thread.
    pub async fn history(&self, thread_id: &ThreadId) -> Result<Vec<Message>> {
        self.store.snapshot(thread_id).await
    }
}
