//! Reasoning orchestration: conversation state, the bounded run state machine,
//! final-answer validation, and the `search_candidates` boundary.

pub mod conversation;
pub mod engine;
pub mod error;
pub mod formatter;
pub mod prompts;
pub mod service;

pub use engine::{Orchestrator, OrchestratorLimits};
pub use error::SearchError;
pub use service::SearchService;
