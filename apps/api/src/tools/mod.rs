//! Capability registry — tools the reasoning service may invoke, dispatched by name.
//!
//! Each tool declares a `CapabilitySchema` (name, description, argument schema). Arguments
//! are validated against the schema before the handler ever runs; adding a tool is one
//! `register` call.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::embedding::EmbeddingError;
use crate::index::IndexError;

pub mod retrieval;

// ────────────────────────────────────────────────────────────────────────────
// Argument schema
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentKind {
    String,
}

impl ArgumentKind {
    fn json_type(self) -> &'static str {
        match self {
            ArgumentKind::String => "string",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            ArgumentKind::String => value.is_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentField {
    pub name: String,
    pub kind: ArgumentKind,
    pub description: String,
}

/// Declared arguments of a tool, all required. Extra arguments are ignored;
/// string arguments must be non-blank.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgumentSchema {
    fields: Vec<ArgumentField>,
}

impl ArgumentSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, name: &str, kind: ArgumentKind, description: &str) -> Self {
        self.fields.push(ArgumentField {
            name: name.to_string(),
            kind,
            description: description.to_string(),
        });
        self
    }

    /// Renders the schema as a JSON Schema object (the `input_schema` of a tool definition).
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| {
                (
                    f.name.clone(),
                    json!({ "type": f.kind.json_type(), "description": f.description }),
                )
            })
            .collect();
        let required: Vec<&str> = self.fields.iter().map(|f| f.name.as_str()).collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Checks `arguments` against the schema, collecting every problem found.
    pub fn validate(&self, arguments: &Value) -> Result<(), Vec<String>> {
        let Some(object) = arguments.as_object() else {
            return Err(vec![format!(
                "arguments must be a JSON object, got {}",
                json_kind(arguments)
            )]);
        };

        let mut problems = Vec::new();
        for field in &self.fields {
            match object.get(&field.name) {
                None | Some(Value::Null) => {
                    problems.push(format!("missing required field '{}'", field.name));
                }
                Some(value) if !field.kind.accepts(value) => problems.push(format!(
                    "field '{}' must be a {}, got {}",
                    field.name,
                    field.kind.json_type(),
                    json_kind(value)
                )),
                Some(Value::String(s)) if s.trim().is_empty() => {
                    problems.push(format!("field '{}' must not be empty", field.name));
                }
                Some(_) => {}
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// What the reasoning service is told about a tool.
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilitySchema {
    pub name: String,
    pub description: String,
    pub argument_schema: ArgumentSchema,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers and registry
// ────────────────────────────────────────────────────────────────────────────

/// Per-run parameters handed to every tool invocation.
#[derive(Debug, Clone, Copy)]
pub struct ToolContext {
    pub top_k: usize,
}

/// Tool output as fed back to the reasoning service.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    /// Text placed in the tool-result turn.
    pub content: String,
    /// Profile ids surfaced by this invocation, in rank order.
    pub evidence_ids: Vec<String>,
}

/// Failures while executing a validated invocation. These abort the run.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("embedding service error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("vector index error: {0}")]
    Index(#[from] IndexError),
}

#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn capability(&self) -> &CapabilitySchema;

    /// Runs the tool. `arguments` have already passed schema validation.
    async fn invoke(&self, arguments: &Value, ctx: &ToolContext) -> Result<ToolOutput, ToolError>;
}

/// Why an invocation request was refused before execution.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvocationRejection {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("invalid arguments for '{tool}': {}", .problems.join("; "))]
    InvalidArguments { tool: String, problems: Vec<String> },
}

/// Registered tools in registration order.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tool, replacing any tool registered under the same name.
    pub fn register(mut self, handler: Arc<dyn ToolHandler>) -> Self {
        let name = handler.capability().name.clone();
        self.tools.retain(|t| t.capability().name != name);
        self.tools.push(handler);
        self
    }

    pub fn capabilities(&self) -> Vec<CapabilitySchema> {
        self.tools.iter().map(|t| t.capability().clone()).collect()
    }

    /// Looks up `tool_name` and validates `arguments` against its schema.
    pub fn resolve(
        &self,
        tool_name: &str,
        arguments: &Value,
    ) -> Result<Arc<dyn ToolHandler>, InvocationRejection> {
        let handler = self
            .tools
            .iter()
            .find(|t| t.capability().name == tool_name)
            .ok_or_else(|| InvocationRejection::UnknownTool(tool_name.to_string()))?;

        handler
            .capability()
            .argument_schema
            .validate(arguments)
            .map_err(|problems| InvocationRejection::InvalidArguments {
                tool: tool_name.to_string(),
                problems,
            })?;

        Ok(Arc::clone(handler))
    }
}
