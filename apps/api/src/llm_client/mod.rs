/// LLM Client — the single point of entry for all Claude API calls in Lark.
///
/// ARCHITECTURAL RULE: No other module may call the Anthropic API directly.
/// The orchestrator only sees this client through the `ReasoningService` trait.
///
/// Model: claude-sonnet-4-5 (hardcoded — do not make configurable to prevent drift)
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::analysis::TokenUsage;
use crate::orchestrator::conversation::{Conversation, ToolInvocationRequest, Turn};
use crate::orchestrator::engine::{ReasoningService, ReplyEnvelope, ServiceReply};
use crate::orchestrator::error::ReasoningFailure;

pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The model used for all LLM calls in Lark.
/// This is intentionally hardcoded to prevent accidental drift.
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 4096;
const MAX_RETRIES: u32 = 3;
const HTTP_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("LLM call timed out after {0}s")]
    Timeout(u64),

    #[error("Malformed LLM response: {0}")]
    MalformedEnvelope(String),
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolDefinition<'a>>,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ToolDefinition<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: Value,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: Vec<RequestBlock<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RequestBlock<'a> {
    Text {
        text: &'a str,
    },
    ToolUse {
        id: &'a str,
        name: &'a str,
        input: &'a Value,
    },
    ToolResult {
        tool_use_id: &'a str,
        content: &'a str,
        is_error: bool,
    },
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
    pub id: Option<String>,
    pub name: Option<String>,
    pub input: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl From<&Usage> for TokenUsage {
    fn from(usage: &Usage) -> Self {
        TokenUsage {
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
        }
    }
}

impl LlmResponse {
    /// Concatenated text of every text block, if any is non-blank.
    pub fn text(&self) -> Option<String> {
        let text: String = self
            .content
            .iter()
            .filter(|b| b.block_type == "text")
            .filter_map(|b| b.text.as_deref())
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }

    /// Classifies the reply: any `tool_use` block makes it a tool-invocation envelope,
    /// otherwise its text is the final answer.
    pub fn into_reply(self) -> Result<ServiceReply, LlmError> {
        let usage = TokenUsage::from(&self.usage);
        let text = self.text();

        let mut invocations = Vec::new();
        for block in self.content {
            if block.block_type != "tool_use" {
                continue;
            }
            let (Some(id), Some(name)) = (block.id, block.name) else {
                return Err(LlmError::MalformedEnvelope(
                    "tool_use block without id or name".to_string(),
                ));
            };
            invocations.push(ToolInvocationRequest {
                id,
                tool_name: name,
                arguments: block.input.unwrap_or(Value::Null),
            });
        }

        let envelope = if !invocations.is_empty() {
            ReplyEnvelope::ToolInvocations { text, invocations }
        } else {
            let text = text.ok_or(LlmError::EmptyContent)?;
            ReplyEnvelope::FinalAnswer { text }
        };

        Ok(ServiceReply { envelope, usage })
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Serializes the conversation as Messages API turns. Consecutive turns on the same
/// side merge into one message so that roles alternate.
fn build_messages(conversation: &Conversation) -> Vec<AnthropicMessage<'_>> {
    let mut messages: Vec<AnthropicMessage<'_>> = Vec::new();

    for turn in conversation.turns() {
        let (role, blocks) = match turn {
            Turn::User { text } => ("user", vec![RequestBlock::Text { text }]),
            Turn::Assistant { text, invocations } => {
                let mut blocks = Vec::with_capacity(invocations.len() + 1);
                if let Some(text) = text.as_deref().filter(|t| !t.trim().is_empty()) {
                    blocks.push(RequestBlock::Text { text });
                }
                blocks.extend(invocations.iter().map(|inv| RequestBlock::ToolUse {
                    id: &inv.id,
                    name: &inv.tool_name,
                    input: &inv.arguments,
                }));
                ("assistant", blocks)
            }
            Turn::ToolResult {
                invocation_id,
                content,
                is_error,
            } => (
                "user",
                vec![RequestBlock::ToolResult {
                    tool_use_id: invocation_id,
                    content,
                    is_error: *is_error,
                }],
            ),
        };

        if blocks.is_empty() {
            continue;
        }
        match messages.last_mut() {
            Some(last) if last.role == role => last.content.extend(blocks),
            _ => messages.push(AnthropicMessage {
                role,
                content: blocks,
            }),
        }
    }

    messages
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// The single LLM client used by Lark.
/// Wraps the Anthropic Messages API with retry logic and tool-use support.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, api_key })
    }

    /// Posts one request to the Claude API, returning the full response object.
    /// Retries on 429 (rate limit) and 5xx errors with exponential backoff.
    async fn send(&self, request_body: &AnthropicRequest<'_>) -> Result<LlmResponse, LlmError> {
        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) if e.is_timeout() => {
                    last_error = Some(LlmError::Timeout(HTTP_TIMEOUT_SECS));
                    continue;
                }
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                // Try to parse error message
                let message = serde_json::from_str::<AnthropicError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let body = response.text().await?;
            debug!("LLM response body: {} bytes", body.len());
            let llm_response: LlmResponse = serde_json::from_str(&body)?;

            debug!(
                "LLM call succeeded: input_tokens={}, output_tokens={}",
                llm_response.usage.input_tokens, llm_response.usage.output_tokens
            );

            return Ok(llm_response);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

#[async_trait]
impl ReasoningService for LlmClient {
    async fn respond(&self, conversation: &Conversation) -> Result<ServiceReply, ReasoningFailure> {
        let tools = conversation
            .capabilities()
            .iter()
            .map(|c| ToolDefinition {
                name: &c.name,
                description: &c.description,
                input_schema: c.argument_schema.to_json_schema(),
            })
            .collect();

        let request = AnthropicRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system: conversation.system(),
            tools,
            messages: build_messages(conversation),
        };
        debug!(
            "Sending {} messages to the reasoning service",
            request.messages.len()
        );

        let response = self.send(&request).await?;
        Ok(response.into_reply()?)
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub(crate) fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::tools::{ArgumentKind, ArgumentSchema, CapabilitySchema};

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    fn conversation_with_tool_round() -> Conversation {
        let capability = CapabilitySchema {
            name: "search_resume_database".to_string(),
            description: "Search resumes".to_string(),
            argument_schema: ArgumentSchema::new().required("query", ArgumentKind::String, "q"),
        };
        let mut conversation = Conversation::new("system", "find python devs", vec![capability]);
        conversation
            .push_assistant(
                Some("Searching.".to_string()),
                vec![
                    ToolInvocationRequest {
                        id: "toolu_a".to_string(),
                        tool_name: "search_resume_database".to_string(),
                        arguments: json!({"query": "python"}),
                    },
                    ToolInvocationRequest {
                        id: "toolu_b".to_string(),
                        tool_name: "search_resume_database".to_string(),
                        arguments: json!({}),
                    },
                ],
            )
            .unwrap();
        conversation.push_tool_result("toolu_a", "{\"profiles\": []}", false).unwrap();
        conversation.push_tool_result("toolu_b", "missing query", true).unwrap();
        conversation
    }

    #[test]
    fn test_messages_alternate_and_carry_tool_blocks() {
        let conversation = conversation_with_tool_round();
        let messages = serde_json::to_value(build_messages(&conversation)).unwrap();

        assert_eq!(
            messages,
            json!([
                {"role": "user", "content": [{"type": "text", "text": "find python devs"}]},
                {"role": "assistant", "content": [
                    {"type": "text", "text": "Searching."},
                    {"type": "tool_use", "id": "toolu_a", "name": "search_resume_database", "input": {"query": "python"}},
                    {"type": "tool_use", "id": "toolu_b", "name": "search_resume_database", "input": {}}
                ]},
                {"role": "user", "content": [
                    {"type": "tool_result", "tool_use_id": "toolu_a", "content": "{\"profiles\": []}", "is_error": false},
                    {"type": "tool_result", "tool_use_id": "toolu_b", "content": "missing query", "is_error": true}
                ]}
            ])
        );
    }

    #[test]
    fn test_request_declares_tools() {
        let conversation = conversation_with_tool_round();
        let capability = &conversation.capabilities()[0];
        let request = AnthropicRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system: conversation.system(),
            tools: vec![ToolDefinition {
                name: &capability.name,
                description: &capability.description,
                input_schema: capability.argument_schema.to_json_schema(),
            }],
            messages: build_messages(&conversation),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["tools"][0]["name"], "search_resume_database");
        assert_eq!(value["tools"][0]["input_schema"]["required"], json!(["query"]));
        assert_eq!(value["system"], "system");
    }

    fn response(body: Value) -> LlmResponse {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_tool_use_reply_is_invocation_envelope() {
        let reply = response(json!({
            "content": [
                {"type": "text", "text": "Let me search."},
                {"type": "tool_use", "id": "toolu_1", "name": "search_resume_database", "input": {"query": "aws"}}
            ],
            "usage": {"input_tokens": 310, "output_tokens": 42}
        }))
        .into_reply()
        .unwrap();

        assert_eq!(reply.usage.input_tokens, 310);
        match reply.envelope {
            ReplyEnvelope::ToolInvocations { text, invocations } => {
                assert_eq!(text.as_deref(), Some("Let me search."));
                assert_eq!(invocations.len(), 1);
                assert_eq!(invocations[0].id, "toolu_1");
                assert_eq!(invocations[0].arguments, json!({"query": "aws"}));
            }
            other => panic!("expected tool invocations, got {other:?}"),
        }
    }

    #[test]
    fn test_text_reply_is_final_answer() {
        let reply = response(json!({
            "content": [{"type": "text", "text": "{\"summary\": \"s\", \"candidates\": []}"}],
            "usage": {"input_tokens": 1, "output_tokens": 1}
        }))
        .into_reply()
        .unwrap();

        assert!(matches!(reply.envelope, ReplyEnvelope::FinalAnswer { ref text } if text.contains("summary")));
    }

    #[test]
    fn test_empty_reply_is_malformed() {
        let err = response(json!({
            "content": [],
            "usage": {"input_tokens": 1, "output_tokens": 0}
        }))
        .into_reply()
        .unwrap_err();

        assert!(matches!(err, LlmError::EmptyContent));
        assert_eq!(ReasoningFailure::from(err).code(), "malformed_envelope");
    }

    #[test]
    fn test_tool_use_without_id_is_malformed() {
        let err = response(json!({
            "content": [{"type": "tool_use", "name": "search_resume_database", "input": {}}],
            "usage": {"input_tokens": 1, "output_tokens": 1}
        }))
        .into_reply()
        .unwrap_err();

        assert!(matches!(err, LlmError::MalformedEnvelope(_)));
    }
}
