use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::challenge::parser::JudgeFormat;
use crate::challenge::scoring::{AccuracySource, CombinationPolicy, ScoreFloor, ScoringConfig};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub scoring: ScoringConfig,
    pub judge_format: JudgeFormat,
    pub rounds_total: usize,
    /// Fixed seed for round selection. `None` draws from OS entropy per session.
    pub round_seed: Option<u64>,
    /// Sessions idle longer than this are dropped from memory.
    pub session_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let policy = parse_policy(&optional_env("SCORING_POLICY", "sum"))?;
        let floor = parse_floor(&optional_env("SCORE_FLOOR", "0"))?;
        let accuracy = parse_accuracy_source(&optional_env("ACCURACY_SOURCE", "judge"))?;

        let rounds_total = optional_env("ROUNDS_TOTAL", "3")
            .parse::<usize>()
            .context("ROUNDS_TOTAL must be a positive integer")?;
        if rounds_total == 0 {
            bail!("ROUNDS_TOTAL must be at least 1");
        }

        let round_seed = match std::env::var("ROUND_SEED") {
            Ok(raw) => Some(
                raw.parse::<u64>()
                    .context("ROUND_SEED must be an unsigned integer")?,
            ),
            Err(_) => None,
        };

        let session_ttl = parse_ttl(&optional_env("SESSION_TTL_SECS", "3600"))?;

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: optional_env("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: optional_env("RUST_LOG", "info"),
            scoring: ScoringConfig {
                policy,
                floor,
                accuracy,
            },
            judge_format: parse_judge_format(&optional_env("JUDGE_FORMAT", "text"))?,
            rounds_total,
            round_seed,
            session_ttl,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_policy(raw: &str) -> Result<CombinationPolicy> {
    match raw.trim().to_lowercase().as_str() {
        "sum" => Ok(CombinationPolicy::Sum),
        "weighted" => Ok(CombinationPolicy::Weighted(Default::default())),
        other => bail!("SCORING_POLICY must be 'sum' or 'weighted', got '{other}'"),
    }
}

fn parse_floor(raw: &str) -> Result<ScoreFloor> {
    match raw.trim() {
        "0" => Ok(ScoreFloor::Zero),
        "1" => Ok(ScoreFloor::One),
        other => bail!("SCORE_FLOOR must be 0 or 1, got '{other}'"),
    }
}

fn parse_accuracy_source(raw: &str) -> Result<AccuracySource> {
    match raw.trim().to_lowercase().as_str() {
        "overlap" => Ok(AccuracySource::Overlap),
        "judge" => Ok(AccuracySource::Judge),
        other => bail!("ACCURACY_SOURCE must be 'overlap' or 'judge', got '{other}'"),
    }
}

fn parse_judge_format(raw: &str) -> Result<JudgeFormat> {
    match raw.trim().to_lowercase().as_str() {
        "text" => Ok(JudgeFormat::Text),
        "json" => Ok(JudgeFormat::Json),
        other => bail!("JUDGE_FORMAT must be 'text' or 'json', got '{other}'"),
    }
}

fn parse_ttl(raw: &str) -> Result<Duration> {
    let secs = raw
        .trim()
        .parse::<u64>()
        .context("SESSION_TTL_SECS must be a positive integer")?;
    if secs == 0 {
        bail!("SESSION_TTL_SECS must be at least 1");
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_policy_accepts_both_variants() {
        assert_eq!(parse_policy("sum").unwrap(), CombinationPolicy::Sum);
        assert!(matches!(
            parse_policy(" Weighted ").unwrap(),
            CombinationPolicy::Weighted(_)
        ));
    }

    #[test]
    fn test_parse_policy_rejects_unknown() {
        let err = parse_policy("average").unwrap_err();
        assert!(err.to_string().contains("average"));
    }

    #[test]
    fn test_parse_floor() {
        assert_eq!(parse_floor("0").unwrap(), ScoreFloor::Zero);
        assert_eq!(parse_floor("1").unwrap(), ScoreFloor::One);
        assert!(parse_floor("2").is_err());
    }

    #[test]
    fn test_parse_accuracy_source_and_judge_format() {
        assert_eq!(
            parse_accuracy_source("overlap").unwrap(),
            AccuracySource::Overlap
        );
        assert_eq!(parse_judge_format("JSON").unwrap(), JudgeFormat::Json);
        assert!(parse_judge_format("yaml").is_err());
    }

    #[test]
    fn test_parse_ttl() {
        assert_eq!(parse_ttl("90").unwrap(), Duration::from_secs(90));
        assert!(parse_ttl("0").is_err());
        assert!(parse_ttl("soon").is_err());
    }
}
