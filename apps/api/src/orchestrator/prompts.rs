// Talent search prompt templates.
// All prompts for the orchestrator are defined here.

use crate::llm_client::prompts::{GROUNDING_INSTRUCTION, JSON_ONLY_SYSTEM};

const SEARCH_ROLE: &str = "\
You are an expert HR recruitment assistant. Your task is to evaluate candidate profiles \
from a proprietary resume database against a hiring manager's query and provide insightful \
analysis and recommendations. Focus on core skills, experience, and leadership where relevant. \
Be concise but thorough.";

const FINAL_ANSWER_SCHEMA: &str = r#"When you have the evidence you need, reply with ONLY this JSON object:
{
  "summary": "string: overall assessment of the candidate pool for this query",
  "candidates": [
    {
      "profile_id": "string: exactly as returned by the search tool",
      "justification": "string: why this candidate does or does not fit",
      "recommendation": "strong_fit" | "possible_fit" | "weak_fit"
    }
  ]
}
Rank candidates best first. Only use profile_ids returned by the search tool.
If the search returned no profiles, answer with an empty "candidates" list and say so in "summary"."#;

const QUERY_PROMPT_TEMPLATE: &str = "\
The hiring manager is looking for candidates with the following requirements: '{query}'

Use the search tool to retrieve candidate profiles (it returns up to {top_k} profiles per search), \
then evaluate how well each candidate matches the requirements.";

const SCHEMA_REPAIR_TEMPLATE: &str = "\
Your previous answer did not match the required output format: {error}

Reply again with ONLY the JSON object described in your instructions. \
Do not include any text outside the JSON object.";

const TOOL_ARGUMENT_ERROR_TEMPLATE: &str = "\
The tool call was rejected and NOT executed: {error}. \
Call the tool again with arguments that match its input schema.";

pub fn system_prompt() -> String {
    format!("{SEARCH_ROLE}\n\n{GROUNDING_INSTRUCTION}\n\n{FINAL_ANSWER_SCHEMA}\n\n{JSON_ONLY_SYSTEM}")
}

pub fn query_prompt(query: &str, top_k: usize) -> String {
    QUERY_PROMPT_TEMPLATE
        .replace("{query}", query)
        .replace("{top_k}", &top_k.to_string())
}

pub fn schema_repair_prompt(error: &str) -> String {
    SCHEMA_REPAIR_TEMPLATE.replace("{error}", error)
}

pub fn tool_argument_error(error: &str) -> String {
    TOOL_ARGUMENT_ERROR_TEMPLATE.replace("{error}", error)
}
