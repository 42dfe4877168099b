use serde::{Deserialize, Serialize};

/// How strongly a candidate matches the hiring query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    StrongFit,
    PossibleFit,
    WeakFit,
}

/// One ranked entry in the final analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub profile_id: String,
    pub justification: String,
    pub recommendation: Recommendation,
}

/// Final structured output of a search run. Produced once per query.
///
/// Unknown fields in the reasoning service's answer are dropped on deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: String,
    pub candidates: Vec<RankedCandidate>,
}

/// Token usage summed across every reasoning-service turn of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn add(&mut self, other: TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// A completed run: the analysis plus the bookkeeping used for cost logging.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisOutcome {
    pub result: AnalysisResult,
    pub turns: u32,
    pub usage: TokenUsage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommendation_uses_snake_case() {
        let json = serde_json::to_string(&Recommendation::StrongFit).unwrap();
        assert_eq!(json, r#""strong_fit""#);
        let parsed: Recommendation = serde_json::from_str(r#""weak_fit""#).unwrap();
        assert_eq!(parsed, Recommendation::WeakFit);
    }

    #[test]
    fn test_unknown_recommendation_is_rejected() {
        let parsed: Result<Recommendation, _> = serde_json::from_str(r#""perfect_fit""#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_usage_accumulates() {
        let mut usage = TokenUsage::default();
        usage.add(TokenUsage {
            input_tokens: 100,
            output_tokens: 20,
        });
        usage.add(TokenUsage {
            input_tokens: 50,
            output_tokens: 5,
        });
        assert_eq!(usage.input_tokens, 150);
        assert_eq!(usage.output_tokens, 25);
    }
}
