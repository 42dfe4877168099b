// Shared prompt fragments.
// Each component that talks to the reasoning service defines its own prompts.rs alongside it.
// This file contains cross-cutting fragments only.

/// System prompt fragment that enforces JSON-only final answers.
pub const JSON_ONLY_SYSTEM: &str = "\
    Your final answer MUST be valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Keeps every cited candidate traceable to retrieved evidence.
pub const GROUNDING_INSTRUCTION: &str = "\
    CRITICAL: Every candidate you mention must come from a search tool result in this \
    conversation. Do NOT invent candidates, profile_ids, skills, or experience. \
    If the search results do not support a claim, omit it.";
