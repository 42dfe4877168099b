//! Conversation state for one orchestration run.
//!
//! Invariant: every tool-result turn answers an invocation emitted by an earlier
//! assistant turn, and each invocation is answered at most once.

use std::collections::HashSet;

use serde_json::Value;
use thiserror::Error;

use crate::tools::CapabilitySchema;

/// A tool call requested by the reasoning service.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocationRequest {
    pub id: String,
    pub tool_name: String,
    pub arguments: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Turn {
    User {
        text: String,
    },
    Assistant {
        text: Option<String>,
        invocations: Vec<ToolInvocationRequest>,
    },
    ToolResult {
        invocation_id: String,
        content: String,
        is_error: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversationError {
    #[error("tool result for unknown invocation '{0}'")]
    UnknownInvocation(String),

    #[error("invocation '{0}' already has a tool result")]
    DuplicateResult(String),

    #[error("invocation id '{0}' was emitted twice")]
    DuplicateInvocation(String),
}

#[derive(Debug, Clone)]
pub struct Conversation {
    system: String,
    capabilities: Vec<CapabilitySchema>,
    turns: Vec<Turn>,
    issued: HashSet<String>,
    answered: HashSet<String>,
}

impl Conversation {
    /// Seeds a conversation with the caller's query and the declared capabilities.
    pub fn new(
        system: impl Into<String>,
        query: impl Into<String>,
        capabilities: Vec<CapabilitySchema>,
    ) -> Self {
        Self {
            system: system.into(),
            capabilities,
            turns: vec![Turn::User { text: query.into() }],
            issued: HashSet::new(),
            answered: HashSet::new(),
        }
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    pub fn capabilities(&self) -> &[CapabilitySchema] {
        &self.capabilities
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.turns.push(Turn::User { text: text.into() });
    }

    pub fn push_assistant(
        &mut self,
        text: Option<String>,
        invocations: Vec<ToolInvocationRequest>,
    ) -> Result<(), ConversationError> {
        let mut fresh = HashSet::new();
        for invocation in &invocations {
            if self.issued.contains(&invocation.id) || !fresh.insert(invocation.id.clone()) {
                return Err(ConversationError::DuplicateInvocation(invocation.id.clone()));
            }
        }
        self.issued.extend(fresh);
        self.turns.push(Turn::Assistant { text, invocations });
        Ok(())
    }

    pub fn push_tool_result(
        &mut self,
        invocation_id: &str,
        content: impl Into<String>,
        is_error: bool,
    ) -> Result<(), ConversationError> {
        if !self.issued.contains(invocation_id) {
            return Err(ConversationError::UnknownInvocation(invocation_id.to_string()));
        }
        if !self.answered.insert(invocation_id.to_string()) {
            return Err(ConversationError::DuplicateResult(invocation_id.to_string()));
        }
        self.turns.push(Turn::ToolResult {
            invocation_id: invocation_id.to_string(),
            content: content.into(),
            is_error,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn invocation(id: &str) -> ToolInvocationRequest {
        ToolInvocationRequest {
            id: id.to_string(),
            tool_name: "search_resume_database".to_string(),
            arguments: json!({"query": "rust"}),
        }
    }

    #[test]
    fn test_seeded_with_user_query() {
        let conversation = Conversation::new("system", "find a rust engineer", vec![]);
        assert_eq!(
            conversation.turns(),
            &[Turn::User {
                text: "find a rust engineer".to_string()
            }]
        );
    }

    #[test]
    fn test_tool_result_must_match_invocation() {
        let mut conversation = Conversation::new("system", "q", vec![]);
        let err = conversation.push_tool_result("toolu_1", "x", false).unwrap_err();
        assert_eq!(err, ConversationError::UnknownInvocation("toolu_1".to_string()));
    }

    #[test]
    fn test_tool_result_answered_once() {
        let mut conversation = Conversation::new("system", "q", vec![]);
        conversation
            .push_assistant(None, vec![invocation("toolu_1")])
            .unwrap();
        conversation.push_tool_result("toolu_1", "ok", false).unwrap();
        let err = conversation.push_tool_result("toolu_1", "again", false).unwrap_err();
        assert_eq!(err, ConversationError::DuplicateResult("toolu_1".to_string()));
        assert_eq!(conversation.turns().len(), 3);
    }

    #[test]
    fn test_invocation_ids_are_unique_across_turns() {
        let mut conversation = Conversation::new("system", "q", vec![]);
        conversation
            .push_assistant(None, vec![invocation("toolu_1")])
            .unwrap();
        let err = conversation
            .push_assistant(None, vec![invocation("toolu_1")])
            .unwrap_err();
        assert_eq!(err, ConversationError::DuplicateInvocation("toolu_1".to_string()));
    }

    #[test]
    fn test_duplicate_ids_within_one_turn_are_rejected() {
        let mut conversation = Conversation::new("system", "q", vec![]);
        let err = conversation
            .push_assistant(None, vec![invocation("a"), invocation("a")])
            .unwrap_err();
        assert_eq!(err, ConversationError::DuplicateInvocation("a".to_string()));
        assert_eq!(conversation.turns().len(), 1);
    }

    #[test]
    fn test_multiple_invocations_each_answered() {
        let mut conversation = Conversation::new("system", "q", vec![]);
        conversation
            .push_assistant(
                Some("Let me search twice.".to_string()),
                vec![invocation("a"), invocation("b")],
            )
            .unwrap();
        conversation.push_tool_result("b", "second", false).unwrap();
        conversation.push_tool_result("a", "first", true).unwrap();
        assert_eq!(conversation.turns().len(), 4);
    }
}
