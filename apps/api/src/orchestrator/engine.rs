//! Reasoning Orchestrator — a bounded state machine driving one search run.
//!
//! ```text
//! AwaitResponse ──final answer ok──────────────▶ Done
//!      │  ▲  ▲──schema failure (repair budget)──┘
//!      │  │
//!      │  └──tool results / argument errors──┐
//!      └──tool invocations──▶ ExecuteTools ──┘
//! ```
//!
//! Every call to the reasoning service consumes one turn, whether it succeeds or not.
//! Transport failures, timeouts, and malformed envelopes share the transport retry budget;
//! rejected final answers share the schema repair budget; rejected tool invocations share
//! the tool correction budget. Exhausting any budget ends the run with a typed error.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::models::analysis::{AnalysisOutcome, AnalysisResult, TokenUsage};
use crate::orchestrator::conversation::{Conversation, ConversationError, ToolInvocationRequest};
use crate::orchestrator::error::{ReasoningFailure, SearchError};
use crate::orchestrator::{formatter, prompts};
use crate::tools::{ToolContext, ToolRegistry};

/// What the reasoning service decided to do with the conversation so far.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyEnvelope {
    FinalAnswer {
        text: String,
    },
    ToolInvocations {
        text: Option<String>,
        invocations: Vec<ToolInvocationRequest>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceReply {
    pub envelope: ReplyEnvelope,
    pub usage: TokenUsage,
}

/// The external reasoning service. Implementations must not retain the conversation.
#[async_trait]
pub trait ReasoningService: Send + Sync {
    async fn respond(&self, conversation: &Conversation) -> Result<ServiceReply, ReasoningFailure>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorLimits {
    pub max_turns: u32,
    pub max_schema_repairs: u32,
    pub max_tool_corrections: u32,
    pub max_transport_retries: u32,
    pub reasoning_timeout: Duration,
}

impl Default for OrchestratorLimits {
    fn default() -> Self {
        Self {
            max_turns: 6,
            max_schema_repairs: 1,
            max_tool_corrections: 2,
            max_transport_retries: 1,
            reasoning_timeout: Duration::from_secs(90),
        }
    }
}

enum RunState {
    AwaitResponse,
    ExecuteTools(Vec<ToolInvocationRequest>),
    Done(AnalysisResult),
}

/// Mutable bookkeeping for a single run. Never shared between runs.
#[derive(Default)]
struct Run {
    turns: u32,
    schema_repairs: u32,
    tool_corrections: u32,
    transport_retries: u32,
    usage: TokenUsage,
    evidence: HashSet<String>,
}

pub struct Orchestrator {
    reasoning: Arc<dyn ReasoningService>,
    registry: ToolRegistry,
    limits: OrchestratorLimits,
}

impl Orchestrator {
    pub fn new(
        reasoning: Arc<dyn ReasoningService>,
        registry: ToolRegistry,
        limits: OrchestratorLimits,
    ) -> Self {
        Self {
            reasoning,
            registry,
            limits,
        }
    }

    /// Runs one query to completion. All-or-nothing: no partial result on failure.
    pub async fn run(&self, query: &str, top_k: usize) -> Result<AnalysisOutcome, SearchError> {
        let mut conversation = Conversation::new(
            prompts::system_prompt(),
            prompts::query_prompt(query, top_k),
            self.registry.capabilities(),
        );
        let ctx = ToolContext { top_k };
        let mut run = Run::default();
        let mut state = RunState::AwaitResponse;

        loop {
            state = match state {
                RunState::AwaitResponse => {
                    self.await_response(&mut conversation, &mut run, top_k).await?
                }
                RunState::ExecuteTools(invocations) => {
                    self.execute_tools(&mut conversation, &mut run, invocations, &ctx)
                        .await?
                }
                RunState::Done(result) => {
                    return Ok(AnalysisOutcome {
                        result,
                        turns: run.turns,
                        usage: run.usage,
                    });
                }
            };
        }
    }

    async fn await_response(
        &self,
        conversation: &mut Conversation,
        run: &mut Run,
        top_k: usize,
    ) -> Result<RunState, SearchError> {
        if run.turns >= self.limits.max_turns {
            return Err(turn_limit(run));
        }
        run.turns += 1;

        let reply = match tokio::time::timeout(
            self.limits.reasoning_timeout,
            self.reasoning.respond(conversation),
        )
        .await
        {
            Ok(Ok(reply)) => reply,
            Ok(Err(failure)) => return self.retry_transport(run, failure),
            Err(_) => {
                let secs = self.limits.reasoning_timeout.as_secs();
                return self.retry_transport(run, ReasoningFailure::Timeout(secs));
            }
        };
        run.usage.add(reply.usage);

        match reply.envelope {
            ReplyEnvelope::FinalAnswer { text } => {
                let checked = formatter::normalize_text(&text)
                    .map_err(|violation| violation.0)
                    .and_then(|result| reconcile(result, top_k, &run.evidence));

                match checked {
                    Ok(result) => Ok(RunState::Done(result)),
                    Err(problem) if run.schema_repairs < self.limits.max_schema_repairs => {
                        run.schema_repairs += 1;
                        warn!(
                            "Final answer rejected on turn {} ({}), requesting repair",
                            run.turns, problem
                        );
                        conversation.push_assistant(Some(text), Vec::new())?;
                        conversation.push_user(prompts::schema_repair_prompt(&problem));
                        Ok(RunState::AwaitResponse)
                    }
                    Err(problem) => Err(SearchError::SchemaValidation(problem)),
                }
            }
            ReplyEnvelope::ToolInvocations { invocations, .. } if invocations.is_empty() => self
                .retry_transport(
                    run,
                    ReasoningFailure::MalformedEnvelope(
                        "tool invocation envelope carried no invocations".to_string(),
                    ),
                ),
            ReplyEnvelope::ToolInvocations { text, invocations } => {
                // No turn would be left to read the results.
                if run.turns >= self.limits.max_turns {
                    return Err(turn_limit(run));
                }
                match conversation.push_assistant(text, invocations.clone()) {
                    Ok(()) => Ok(RunState::ExecuteTools(invocations)),
                    Err(ConversationError::DuplicateInvocation(id)) => self.retry_transport(
                        run,
                        ReasoningFailure::MalformedEnvelope(format!(
                            "tool invocation id '{id}' was already used"
                        )),
                    ),
                    Err(e) => Err(e.into()),
                }
            }
        }
    }

    fn retry_transport(&self, run: &mut Run, failure: ReasoningFailure) -> Result<RunState, SearchError> {
        let can_retry = run.transport_retries < self.limits.max_transport_retries
            && run.turns < self.limits.max_turns;
        if !can_retry {
            return Err(SearchError::ReasoningService { reason: failure });
        }
        run.transport_retries += 1;
        warn!(
            "Reasoning service failed on turn {} ({}), retrying",
            run.turns, failure
        );
        Ok(RunState::AwaitResponse)
    }

    async fn execute_tools(
        &self,
        conversation: &mut Conversation,
        run: &mut Run,
        invocations: Vec<ToolInvocationRequest>,
        ctx: &ToolContext,
    ) -> Result<RunState, SearchError> {
        for invocation in invocations {
            let handler = match self
                .registry
                .resolve(&invocation.tool_name, &invocation.arguments)
            {
                Ok(handler) => handler,
                Err(rejection) => {
                    if run.tool_corrections >= self.limits.max_tool_corrections {
                        return Err(SearchError::ToolContractViolation {
                            tool: invocation.tool_name,
                            message: rejection.to_string(),
                        });
                    }
                    run.tool_corrections += 1;
                    warn!(
                        "Rejected tool invocation {} ({}), asking for corrected arguments",
                        invocation.id, rejection
                    );
                    conversation.push_tool_result(
                        &invocation.id,
                        prompts::tool_argument_error(&rejection.to_string()),
                        true,
                    )?;
                    continue;
                }
            };

            info!("Executing tool {} ({})", invocation.tool_name, invocation.id);
            let output = handler.invoke(&invocation.arguments, ctx).await?;
            debug!(
                "Tool {} returned {} bytes, {} profiles",
                invocation.tool_name,
                output.content.len(),
                output.evidence_ids.len()
            );

            run.evidence.extend(output.evidence_ids);
            conversation.push_tool_result(&invocation.id, output.content, false)?;
        }

        Ok(RunState::AwaitResponse)
    }
}

fn turn_limit(run: &Run) -> SearchError {
    SearchError::ReasoningService {
        reason: ReasoningFailure::TurnLimitExceeded { turns: run.turns },
    }
}

/// Checks a structurally valid answer against what this run actually retrieved.
fn reconcile(
    result: AnalysisResult,
    top_k: usize,
    evidence: &HashSet<String>,
) -> Result<AnalysisResult, String> {
    if result.candidates.len() > top_k {
        return Err(format!(
            "answer lists {} candidates but at most {top_k} may be returned",
            result.candidates.len()
        ));
    }

    let mut seen = HashSet::new();
    for candidate in &result.candidates {
        if !evidence.contains(&candidate.profile_id) {
            return Err(format!(
                "profile_id '{}' was not returned by the search tool",
                candidate.profile_id
            ));
        }
        if !seen.insert(candidate.profile_id.as_str()) {
            return Err(format!(
                "profile_id '{}' is listed more than once",
                candidate.profile_id
            ));
        }
    }

    Ok(result)
}
