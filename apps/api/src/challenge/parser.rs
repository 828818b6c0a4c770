//! Judgment parsing: turns a judge's free-text (or JSON) reply into bounded
//! criterion scores.
//!
//! Parsers never fail outward. Anything unreadable becomes the neutral score
//! with `defaulted = true`, so the caller can warn without failing the round.

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::Value;

use crate::challenge::scoring::{Criterion, ScoreFloor};

/// Score used for any criterion the judge did not (legibly) rate.
pub const NEUTRAL_SCORE: u32 = 5;

/// Label words that mean "the whole answer" rather than one criterion.
const OVERALL_WORDS: [&str; 5] = ["score", "rating", "overall", "total", "grade"];

/// `<label>: <number>` with an optional `/10`, tolerating markdown bold around the label.
static LABELED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([a-z][a-z_ ]*?)\**\s*[:=]\s*\**\s*(-?\d+(?:\.\d+)?)(?:\s*/\s*10)?")
        .unwrap()
});

/// Label-free `<number>/10`.
static OUT_OF_TEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(-?\d+(?:\.\d+)?)\s*/\s*10\b").unwrap());

/// Parsed judge output.
#[derive(Debug, Clone, PartialEq)]
pub struct Judgment {
    pub scores: BTreeMap<Criterion, u32>,
    /// True when at least one expected criterion fell back to `NEUTRAL_SCORE`.
    pub defaulted: bool,
}

impl Judgment {
    /// Every expected criterion at the neutral midpoint.
    pub fn neutral(expected: &[Criterion], floor: ScoreFloor) -> Self {
        Self {
            scores: expected
                .iter()
                .map(|&c| (c, floor.clamp(NEUTRAL_SCORE as i64)))
                .collect(),
            defaulted: true,
        }
    }

    pub fn score(&self, criterion: Criterion) -> Option<u32> {
        self.scores.get(&criterion).copied()
    }

    /// Resolves raw findings against the expected criteria: a labeled value
    /// wins, then an unlabeled overall value, then the neutral score.
    fn resolve(
        labeled: &BTreeMap<Criterion, i64>,
        overall: Option<i64>,
        expected: &[Criterion],
        floor: ScoreFloor,
    ) -> Self {
        let mut defaulted = false;
        let scores = expected
            .iter()
            .map(|&c| {
                let raw = labeled.get(&c).copied().or(overall).unwrap_or_else(|| {
                    defaulted = true;
                    NEUTRAL_SCORE as i64
                });
                (c, floor.clamp(raw))
            })
            .collect();
        Self { scores, defaulted }
    }
}

/// Reads a judge reply. Implementations also describe the reply format they
/// expect, which is forwarded to the judge verbatim.
pub trait JudgmentParser: Send + Sync {
    fn format_instruction(&self) -> &'static str;

    fn parse(&self, text: &str, expected: &[Criterion], floor: ScoreFloor) -> Judgment;
}

/// Which reply format the judge is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JudgeFormat {
    #[default]
    Text,
    Json,
}

impl JudgeFormat {
    pub fn parser(self) -> Arc<dyn JudgmentParser> {
        match self {
            JudgeFormat::Text => Arc::new(TextJudgmentParser),
            JudgeFormat::Json => Arc::new(JsonJudgmentParser),
        }
    }
}

/// Maps a free-text label onto a criterion.
///
/// Only the word next to the separator counts (ignoring trailing "score" or
/// "rating"), so prose in front of the label cannot redirect the value:
/// "dull so creativity" is creativity, "Accuracy score" is accuracy. Labels
/// made only of overall words return `None`.
pub fn criterion_for_label(label: &str) -> Option<Criterion> {
    let normalized = label.to_lowercase().replace(['_', '-'], " ");
    let word = normalized
        .split_whitespace()
        .rev()
        .find(|w| !OVERALL_WORDS.contains(w))?;

    match word {
        "rule" | "rules" | "compliance" => Some(Criterion::RuleCompliance),
        "accuracy" | "accurate" | "relevance" | "relevant" => Some(Criterion::Accuracy),
        "creativity" | "creative" | "originality" => Some(Criterion::Creativity),
        "clarity" | "clear" => Some(Criterion::Clarity),
        "efficiency" | "efficient" | "concision" | "conciseness" => Some(Criterion::Efficiency),
        _ => None,
    }
}

fn is_overall_label(label: &str) -> bool {
    let normalized = label.to_lowercase();
    normalized
        .split_whitespace()
        .any(|t| OVERALL_WORDS.contains(&t))
}

/// Reads a judge number, rounding decimals.
fn parse_score(raw: &str) -> Option<i64> {
    raw.trim().parse::<f64>().ok().and_then(round_score)
}

/// Non-finite values and values outside `i64` are unreadable.
fn round_score(f: f64) -> Option<i64> {
    (f.is_finite() && f.abs() <= i64::MAX as f64).then(|| f.round() as i64)
}

/// Line-oriented parser for replies like `Relevance: 7/10`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextJudgmentParser;

impl JudgmentParser for TextJudgmentParser {
    fn format_instruction(&self) -> &'static str {
        "Give a one-sentence explanation, then finish with a final line of the exact form \
         `Relevance: N/10`, where N is an integer from 0 to 10."
    }

    fn parse(&self, text: &str, expected: &[Criterion], floor: ScoreFloor) -> Judgment {
        let mut labeled: BTreeMap<Criterion, i64> = BTreeMap::new();
        let mut overall: Option<i64> = None;

        for caps in LABELED_RE.captures_iter(text) {
            let Some(value) = parse_score(&caps[2]) else {
                continue;
            };
            let label = &caps[1];
            match criterion_for_label(label) {
                // Last occurrence wins.
                Some(criterion) => {
                    labeled.insert(criterion, value);
                }
                None if is_overall_label(label) => overall = Some(value),
                None => {}
            }
        }

        if overall.is_none() {
            overall = OUT_OF_TEN_RE
                .captures_iter(text)
                .filter_map(|caps| parse_score(&caps[1]))
                .last();
        }

        if labeled.is_empty() && overall.is_none() {
            return Judgment::neutral(expected, floor);
        }
        Judgment::resolve(&labeled, overall, expected, floor)
    }
}

/// Structured parser for replies like `{"relevance": 7}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonJudgmentParser;

impl JudgmentParser for JsonJudgmentParser {
    fn format_instruction(&self) -> &'static str {
        "Respond with JSON only, exactly of the form {\"relevance\": N, \"explanation\": \"...\"}, \
         where N is an integer from 0 to 10. Do NOT use markdown code fences."
    }

    fn parse(&self, text: &str, expected: &[Criterion], floor: ScoreFloor) -> Judgment {
        let Ok(value) = serde_json::from_str::<Value>(extract_json(text)) else {
            return Judgment::neutral(expected, floor);
        };

        let mut labeled: BTreeMap<Criterion, i64> = BTreeMap::new();
        let mut overall: Option<i64> = None;

        match &value {
            Value::Object(map) => {
                for (key, v) in map {
                    let Some(n) = json_number(v) else {
                        continue;
                    };
                    match criterion_for_label(key) {
                        Some(criterion) => {
                            labeled.insert(criterion, n);
                        }
                        None if is_overall_label(key) => overall = Some(n),
                        None => {}
                    }
                }
            }
            other => overall = json_number(other),
        }

        if labeled.is_empty() && overall.is_none() {
            return Judgment::neutral(expected, floor);
        }
        Judgment::resolve(&labeled, overall, expected, floor)
    }
}

fn json_number(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(round_score)),
        Value::String(s) => parse_score(s),
        _ => None,
    }
}

/// Strips markdown code fences and any prose around the outermost JSON object.
fn extract_json(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .map(|s| s.trim().strip_suffix("```").unwrap_or(s).trim())
        .unwrap_or(text);

    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}
