use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::orchestrator::OrchestratorLimits;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub anthropic_api_key: String,
    pub openai_api_key: String,
    /// Bearer keys accepted on `/v1/*`.
    pub api_keys: Vec<String>,
    pub port: u16,
    pub rust_log: String,
    pub embedding_model: String,
    pub embedding_cache_ttl_secs: u64,
    pub reasoning_timeout_secs: u64,
    pub embedding_timeout_secs: u64,
    pub index_timeout_secs: u64,
    pub max_turns: u32,
    pub max_schema_repairs: u32,
    pub max_tool_corrections: u32,
    pub max_transport_retries: u32,
    pub default_top_k: usize,
    pub max_top_k: usize,
    /// Searches allowed per API key per minute.
    pub search_rate_limit_per_minute: u32,
    /// Mock resumes to seed when the index is empty at startup.
    pub seed_mock_resumes: Option<usize>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let config = Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            openai_api_key: require_env("OPENAI_API_KEY")?,
            api_keys: parse_api_keys(&require_env("API_KEYS")?)?,
            port: env_or("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            embedding_model: std::env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
            embedding_cache_ttl_secs: env_or("EMBEDDING_CACHE_TTL_SECS", 86_400)?,
            reasoning_timeout_secs: env_or("REASONING_TIMEOUT_SECS", 90)?,
            embedding_timeout_secs: env_or("EMBEDDING_TIMEOUT_SECS", 20)?,
            index_timeout_secs: env_or("INDEX_TIMEOUT_SECS", 5)?,
            max_turns: env_or("MAX_TURNS", 6)?,
            max_schema_repairs: env_or("MAX_SCHEMA_REPAIRS", 1)?,
            max_tool_corrections: env_or("MAX_TOOL_CORRECTIONS", 2)?,
            max_transport_retries: env_or("MAX_TRANSPORT_RETRIES", 1)?,
            default_top_k: env_or("DEFAULT_TOP_K", 7)?,
            max_top_k: env_or("MAX_TOP_K", 15)?,
            search_rate_limit_per_minute: env_or("SEARCH_RATE_LIMIT_PER_MINUTE", 20)?,
            seed_mock_resumes: parse_optional("SEED_MOCK_RESUMES", std::env::var("SEED_MOCK_RESUMES").ok())?,
        };

        anyhow::ensure!(config.max_turns > 0, "MAX_TURNS must be at least 1");
        anyhow::ensure!(
            config.search_rate_limit_per_minute > 0,
            "SEARCH_RATE_LIMIT_PER_MINUTE must be at least 1"
        );
        anyhow::ensure!(
            (1..=config.max_top_k).contains(&config.default_top_k),
            "DEFAULT_TOP_K must be between 1 and MAX_TOP_K ({})",
            config.max_top_k
        );

        Ok(config)
    }

    pub fn limits(&self) -> OrchestratorLimits {
        OrchestratorLimits {
            max_turns: self.max_turns,
            max_schema_repairs: self.max_schema_repairs,
            max_tool_corrections: self.max_tool_corrections,
            max_transport_retries: self.max_transport_retries,
            reasoning_timeout: Duration::from_secs(self.reasoning_timeout_secs),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    Ok(parse_optional(key, std::env::var(key).ok())?.unwrap_or(default))
}

fn parse_optional<T>(key: &str, raw: Option<String>) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("Environment variable '{key}' has invalid value '{value}'")),
    }
}

fn parse_api_keys(raw: &str) -> Result<Vec<String>> {
    let keys: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect();
    anyhow::ensure!(!keys.is_empty(), "API_KEYS must contain at least one key");
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_optional_defaults_on_missing_or_blank() {
        assert_eq!(parse_optional::<u32>("MAX_TURNS", None).unwrap(), None);
        assert_eq!(parse_optional::<u32>("MAX_TURNS", Some("  ".into())).unwrap(), None);
        assert_eq!(parse_optional::<u32>("MAX_TURNS", Some(" 4 ".into())).unwrap(), Some(4));
    }

    #[test]
    fn test_parse_optional_names_the_variable() {
        let err = parse_optional::<u16>("PORT", Some("eighty".into())).unwrap_err();
        assert!(err.to_string().contains("'PORT'"));
    }

    #[test]
    fn test_api_keys_are_split_and_trimmed() {
        assert_eq!(parse_api_keys("k1, k2,,k3 ").unwrap(), vec!["k1", "k2", "k3"]);
        assert!(parse_api_keys(" , ").is_err());
    }
}
