//! Loan Desk Orchestrator
//!
//! A conversational banking agent that:
//! - Runs exactly one orchestration pass per human turn
//! - Gates every thread behind a user-id identity phase
//! - Lets an LLM decide, while tools and risk scoring stay deterministic
//! - Executes tool calls in request order with bounded decide/execute rounds
//! - Commits each pass to the thread store atomically, or not at all
//!
//! PASS SHAPE:
//! HUMAN TURN → AWAITING_ID | (DECIDING ⇄ EXECUTING_TOOLS) → TURN_COMPLETE

pub mod agent;
pub mod api;
pub mod bank;
pub mod decision;
pub mod error;
pub mod execution;
pub mod gemini;
pub mod identity;
pub mod models;
pub mod risk;
pub mod state;
pub mod tools;

pub use error::Result;

// Re-export common types
pub use models::*;
