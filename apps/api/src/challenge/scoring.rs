//! Scoring: combines local lexical heuristics with a judged (or overlap-based)
//! accuracy score into a bounded total plus per-criterion breakdown.
//!
//! Two combination policies exist and exactly one is active per deployment:
//! - `Sum`: all five criteria, unweighted, total in 0..=50
//! - `Weighted`: accuracy/creativity/clarity at 0.4/0.3/0.3, rounded, total in 0..=10
//!
//! Scoring never fails outward. `ScoringEngine::score` always returns a
//! `ScoreResult`; its `status` says whether defaults or a zeroed error
//! breakdown were used.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::challenge::boundary::Judge;
use crate::challenge::catalog::RoundKind;
use crate::challenge::filter::contains_forbidden;
use crate::challenge::parser::{JudgmentParser, TextJudgmentParser, NEUTRAL_SCORE};

pub const MAX_SCORE: u32 = 10;
pub const ROUND_BONUS: u32 = 2;

const IDEAL_WORD_COUNT: f64 = 15.0;
const CLARITY_PENALTY_PER_WORD: f64 = 0.5;
const EFFICIENCY_THRESHOLD: usize = 25;
const EFFICIENCY_PENALTY_PER_WORD: f64 = 0.25;
/// Distinct words needed before lexical diversity counts in full.
const CREATIVITY_VOCAB_TARGET: f64 = 10.0;

/// Words ignored when measuring reference/response overlap.
const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "was", "that", "this", "with", "what", "how", "its", "into",
    "from", "about", "without", "using", "word", "you", "your", "can", "has", "have", "who",
    "explain", "describe", "write", "tell", "generate",
];

// ────────────────────────────────────────────────────────────────────────────
// Criteria and bounds
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    Accuracy,
    Creativity,
    Clarity,
    Efficiency,
    RuleCompliance,
}

impl Criterion {
    pub const ALL: [Criterion; 5] = [
        Criterion::Accuracy,
        Criterion::Creativity,
        Criterion::Clarity,
        Criterion::Efficiency,
        Criterion::RuleCompliance,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Criterion::Accuracy => "accuracy",
            Criterion::Creativity => "creativity",
            Criterion::Clarity => "clarity",
            Criterion::Efficiency => "efficiency",
            Criterion::RuleCompliance => "rule_compliance",
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type Breakdown = BTreeMap<Criterion, u32>;

/// Lowest score a non-rule criterion may take once a submission is scored.
/// `rule_compliance` is always exactly 0 or 10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoreFloor {
    #[default]
    Zero,
    One,
}

impl ScoreFloor {
    pub fn min(self) -> u32 {
        match self {
            ScoreFloor::Zero => 0,
            ScoreFloor::One => 1,
        }
    }

    pub fn clamp(self, raw: i64) -> u32 {
        raw.clamp(self.min() as i64, MAX_SCORE as i64) as u32
    }

    fn clamp_f64(self, raw: f64) -> u32 {
        if raw.is_nan() {
            return self.min();
        }
        let rounded = raw.round().clamp(self.min() as f64, MAX_SCORE as f64);
        rounded as u32
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub accuracy: f64,
    pub creativity: f64,
    pub clarity: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            accuracy: 0.4,
            creativity: 0.3,
            clarity: 0.3,
        }
    }
}

impl ScoringWeights {
    fn validate(&self) -> Result<(), ScoringError> {
        let parts = [self.accuracy, self.creativity, self.clarity];
        if parts.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ScoringError::InvalidWeights(format!(
                "weights must be finite and non-negative, got {self:?}"
            )));
        }
        let sum: f64 = parts.iter().sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(ScoringError::InvalidWeights(format!(
                "weights must sum to 1.0, got {sum}"
            )));
        }
        Ok(())
    }
}

/// How criterion scores become a total.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CombinationPolicy {
    #[default]
    Sum,
    Weighted(ScoringWeights),
}

impl CombinationPolicy {
    const SUM_CRITERIA: &'static [Criterion] = &Criterion::ALL;
    const WEIGHTED_CRITERIA: &'static [Criterion] =
        &[Criterion::Accuracy, Criterion::Creativity, Criterion::Clarity];

    /// Criteria present in every breakdown under this policy.
    pub fn criteria(&self) -> &'static [Criterion] {
        match self {
            CombinationPolicy::Sum => Self::SUM_CRITERIA,
            CombinationPolicy::Weighted(_) => Self::WEIGHTED_CRITERIA,
        }
    }

    pub fn max_total(&self) -> u32 {
        match self {
            CombinationPolicy::Sum => MAX_SCORE * Self::SUM_CRITERIA.len() as u32,
            CombinationPolicy::Weighted(_) => MAX_SCORE,
        }
    }

    pub fn combine(&self, breakdown: &Breakdown) -> Result<u32, ScoringError> {
        let get = |c: Criterion| {
            breakdown
                .get(&c)
                .copied()
                .ok_or(ScoringError::MissingCriterion(c))
        };
        match self {
            CombinationPolicy::Sum => Self::SUM_CRITERIA
                .iter()
                .map(|&c| get(c))
                .sum::<Result<u32, _>>(),
            CombinationPolicy::Weighted(w) => {
                w.validate()?;
                let total = w.accuracy * get(Criterion::Accuracy)? as f64
                    + w.creativity * get(Criterion::Creativity)? as f64
                    + w.clarity * get(Criterion::Clarity)? as f64;
                Ok((total.round() as u32).min(MAX_SCORE))
            }
        }
    }
}

/// Where the accuracy criterion comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccuracySource {
    /// Shared content words between the round's reference text and the response.
    #[default]
    Overlap,
    /// External judge call, parsed by the configured `JudgmentParser`.
    /// Falls back to `Overlap` when the judge is unreachable.
    Judge,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScoringConfig {
    pub policy: CombinationPolicy,
    pub floor: ScoreFloor,
    pub accuracy: AccuracySource,
}

// ────────────────────────────────────────────────────────────────────────────
// Results
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("invalid scoring weights: {0}")]
    InvalidWeights(String),

    #[error("breakdown is missing criterion '{0}'")]
    MissingCriterion(Criterion),
}

/// How a score was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoreStatus {
    Scored,
    /// At least one criterion used a fallback value.
    Defaulted { reason: String },
    /// Scoring broke; the breakdown is all zeros.
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub total: u32,
    pub breakdown: Breakdown,
    pub status: ScoreStatus,
}

impl ScoreResult {
    fn zeroed(policy: &CombinationPolicy, status: ScoreStatus) -> Self {
        Self {
            total: 0,
            breakdown: policy.criteria().iter().map(|&c| (c, 0)).collect(),
            status,
        }
    }
}

/// Inputs for one scoring pass.
#[derive(Debug, Clone, Copy)]
pub struct ScoreRequest<'a> {
    pub submission_text: &'a str,
    /// `None` when the generation call failed.
    pub generated_text: Option<&'a str>,
    pub forbidden_words: &'a [String],
    pub round_kind: RoundKind,
    /// Text the response is measured against: the round's question, AI output or challenge.
    pub reference_text: &'a str,
}

// ────────────────────────────────────────────────────────────────────────────
// Heuristics
// ────────────────────────────────────────────────────────────────────────────

/// Lower-cased words with surrounding punctuation removed.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Lexical diversity: distinct/total, scaled down for very small vocabularies.
pub fn creativity_score(text: &str, floor: ScoreFloor) -> u32 {
    let words = tokenize(text);
    if words.is_empty() {
        return floor.min();
    }
    let distinct = words.iter().collect::<HashSet<_>>().len() as f64;
    let ratio = distinct / words.len() as f64;
    let richness = (distinct / CREATIVITY_VOCAB_TARGET).min(1.0);
    floor.clamp_f64(ratio * richness * MAX_SCORE as f64)
}

/// Peaks at the ideal length and drops half a point per word either side.
pub fn clarity_score(text: &str, floor: ScoreFloor) -> u32 {
    let count = tokenize(text).len() as f64;
    let distance = (count - IDEAL_WORD_COUNT).abs();
    floor.clamp_f64(MAX_SCORE as f64 - CLARITY_PENALTY_PER_WORD * distance)
}

/// Full marks up to the threshold, then a quarter point off per extra word.
pub fn efficiency_score(text: &str, floor: ScoreFloor) -> u32 {
    let count = tokenize(text).len();
    let excess = count.saturating_sub(EFFICIENCY_THRESHOLD) as f64;
    floor.clamp_f64(MAX_SCORE as f64 - EFFICIENCY_PENALTY_PER_WORD * excess)
}

pub fn rule_compliance_score(text: &str, forbidden_words: &[String]) -> u32 {
    if contains_forbidden(text, forbidden_words) {
        0
    } else {
        MAX_SCORE
    }
}

fn content_words(text: &str) -> HashSet<String> {
    tokenize(text)
        .into_iter()
        .filter(|w| w.chars().count() > 2 && !STOPWORDS.contains(&w.as_str()))
        .collect()
}

/// Share of the reference's content words that reappear in the response.
pub fn overlap_accuracy(reference_text: &str, generated_text: &str, floor: ScoreFloor) -> u32 {
    let reference = content_words(reference_text);
    if reference.is_empty() {
        return floor.clamp(NEUTRAL_SCORE as i64);
    }
    let generated = content_words(generated_text);
    let shared = reference.intersection(&generated).count() as f64;
    floor.clamp_f64(shared / reference.len() as f64 * MAX_SCORE as f64)
}

/// The criterion a round kind rewards with `ROUND_BONUS`.
pub fn bonus_criterion(kind: RoundKind) -> Criterion {
    match kind {
        RoundKind::Standard => Criterion::Creativity,
        RoundKind::Inverse => Criterion::Accuracy,
        RoundKind::Creative => Criterion::Clarity,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Engine
// ────────────────────────────────────────────────────────────────────────────

pub struct ScoringEngine {
    config: ScoringConfig,
    judge: Option<Arc<dyn Judge>>,
    parser: Arc<dyn JudgmentParser>,
}

impl ScoringEngine {
    /// Engine without a judge; accuracy always uses word overlap.
    pub fn new(config: ScoringConfig) -> Self {
        Self {
            config,
            judge: None,
            parser: Arc::new(TextJudgmentParser),
        }
    }

    pub fn with_judge(mut self, judge: Arc<dyn Judge>, parser: Arc<dyn JudgmentParser>) -> Self {
        self.judge = Some(judge);
        self.parser = parser;
        self
    }

    pub fn max_total(&self) -> u32 {
        self.config.policy.max_total()
    }

    /// Scores one submission. Internal failures come back as a zeroed
    /// breakdown with `ScoreStatus::Failed`.
    pub async fn score(&self, request: ScoreRequest<'_>) -> ScoreResult {
        match self.try_score(request).await {
            Ok(result) => result,
            Err(e) => {
                error!("Scoring failed, recording zero breakdown: {e}");
                ScoreResult::zeroed(
                    &self.config.policy,
                    ScoreStatus::Failed {
                        reason: e.to_string(),
                    },
                )
            }
        }
    }

    async fn try_score(&self, request: ScoreRequest<'_>) -> Result<ScoreResult, ScoringError> {
        let policy = &self.config.policy;
        let floor = self.config.floor;

        if request.submission_text.trim().is_empty() {
            return Ok(ScoreResult::zeroed(policy, ScoreStatus::Scored));
        }
        if let CombinationPolicy::Weighted(weights) = policy {
            weights.validate()?;
        }

        let text = request.submission_text;
        let mut notes: Vec<String> = Vec::new();
        let mut breakdown = Breakdown::new();

        for &criterion in policy.criteria() {
            let value = match criterion {
                Criterion::Accuracy => {
                    let (value, note) = self.accuracy(&request).await;
                    notes.extend(note);
                    value
                }
                Criterion::Creativity => creativity_score(text, floor),
                Criterion::Clarity => clarity_score(text, floor),
                Criterion::Efficiency => efficiency_score(text, floor),
                Criterion::RuleCompliance => rule_compliance_score(text, request.forbidden_words),
            };
            breakdown.insert(criterion, value);
        }

        if let Some(value) = breakdown.get_mut(&bonus_criterion(request.round_kind)) {
            *value = (*value + ROUND_BONUS).min(MAX_SCORE);
        }

        let total = policy.combine(&breakdown)?;
        debug!(
            "Scored {:?} submission: total={total}, breakdown={breakdown:?}",
            request.round_kind
        );

        let status = if notes.is_empty() {
            ScoreStatus::Scored
        } else {
            ScoreStatus::Defaulted {
                reason: notes.join("; "),
            }
        };

        Ok(ScoreResult {
            total,
            breakdown,
            status,
        })
    }

    /// Accuracy plus a note when a fallback was used.
    async fn accuracy(&self, request: &ScoreRequest<'_>) -> (u32, Option<String>) {
        let floor = self.config.floor;

        let Some(generated) = request.generated_text else {
            return (
                floor.clamp(NEUTRAL_SCORE as i64),
                Some("generation failed; accuracy set to neutral".to_string()),
            );
        };

        let overlap = || overlap_accuracy(request.reference_text, generated, floor);

        match (self.config.accuracy, &self.judge) {
            (AccuracySource::Overlap, _) => (overlap(), None),
            (AccuracySource::Judge, None) => (
                overlap(),
                Some("no judge configured; accuracy from word overlap".to_string()),
            ),
            (AccuracySource::Judge, Some(judge)) => {
                match judge.judge(request.reference_text, generated).await {
                    Ok(raw) => {
                        let judgment = self.parser.parse(&raw, &[Criterion::Accuracy], floor);
                        let value = judgment
                            .score(Criterion::Accuracy)
                            .unwrap_or_else(|| floor.clamp(NEUTRAL_SCORE as i64));
                        if judgment.defaulted {
                            warn!("Judge output had no readable score, using neutral: {raw:?}");
                            (value, Some("judge output unreadable; accuracy set to neutral".to_string()))
                        } else {
                            (value, None)
                        }
                    }
                    Err(e) => {
                        warn!("Judge call failed, falling back to word overlap: {e}");
                        (
                            overlap(),
                            Some(format!("judge unavailable ({e}); accuracy from word overlap")),
                        )
                    }
                }
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
