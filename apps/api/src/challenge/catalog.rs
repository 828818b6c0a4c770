//! Round content: the three round kinds and the pools they draw from.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

/// The presentation style of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundKind {
    /// Explain a topic without its key vocabulary.
    Standard,
    /// Shown an AI output, guess the prompt that produced it.
    Inverse,
    /// Open-ended creative task with words to avoid.
    Creative,
}

impl RoundKind {
    const SEQUENCE: [RoundKind; 3] = [RoundKind::Standard, RoundKind::Inverse, RoundKind::Creative];

    /// Kind of the round at 1-based `index`. Kinds cycle when a game has more
    /// than three rounds.
    pub fn for_round_index(index: usize) -> RoundKind {
        Self::SEQUENCE[index.saturating_sub(1) % Self::SEQUENCE.len()]
    }

    pub fn title(self) -> &'static str {
        match self {
            RoundKind::Standard => "Forbidden Words Challenge",
            RoundKind::Inverse => "Guess the Prompt",
            RoundKind::Creative => "Ultimate Prompt Hack",
        }
    }

    pub fn instruction(self) -> &'static str {
        match self {
            RoundKind::Inverse => "Guess the prompt",
            RoundKind::Standard | RoundKind::Creative => "Enter your prompt",
        }
    }
}

/// One materialized round. Content never changes after selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Round {
    kind: RoundKind,
    prompt_text: String,
    forbidden_words: Vec<String>,
}

impl Round {
    pub fn new(kind: RoundKind, prompt_text: impl Into<String>, forbidden_words: Vec<String>) -> Self {
        Self {
            kind,
            prompt_text: prompt_text.into(),
            forbidden_words,
        }
    }

    pub fn kind(&self) -> RoundKind {
        self.kind
    }

    /// The question, AI output or challenge shown to the player.
    pub fn prompt_text(&self) -> &str {
        &self.prompt_text
    }

    pub fn forbidden_words(&self) -> &[String] {
        &self.forbidden_words
    }
}

/// Source of round content. Selection randomness is injected so that a seeded
/// RNG gives reproducible games.
pub trait RoundCatalog: Send + Sync {
    fn select_round(&self, kind: RoundKind, rng: &mut dyn RngCore) -> Round;
}

type Entry = (&'static str, &'static [&'static str]);

const STANDARD_POOL: &[Entry] = &[
    (
        "Explain what photosynthesis is.",
        &["photosynthesis", "plants", "sunlight", "energy", "chlorophyll"],
    ),
    (
        "Describe how a computer works.",
        &["computer", "hardware", "software", "CPU", "memory"],
    ),
    (
        "What is the significance of the Eiffel Tower?",
        &["Eiffel Tower", "Paris", "landmark", "France", "iron"],
    ),
    (
        "Explain the concept of gravity.",
        &["gravity", "force", "Earth", "mass", "Newton"],
    ),
    (
        "Describe the process of making coffee.",
        &["coffee", "beans", "brew", "grind", "caffeine"],
    ),
];

const INVERSE_POOL: &[Entry] = &[
    (
        "A metallic creature that can assist humans with tasks, has sensors, and moves independently.",
        &["robot", "AI", "automation", "machine", "humanoid"],
    ),
    (
        "A device that uses lenses to capture and store visual memories.",
        &["camera", "lens", "photo", "image", "capture"],
    ),
    (
        "A natural phenomenon where water falls from the sky in droplets.",
        &["rain", "water", "sky", "droplets", "weather"],
    ),
    (
        "A structure that connects two land masses over a body of water.",
        &["bridge", "structure", "connect", "land", "water"],
    ),
    (
        "A process where plants convert sunlight into energy.",
        &["photosynthesis", "plants", "sunlight", "energy", "chlorophyll"],
    ),
];

const CREATIVE_POOL: &[Entry] = &[
    (
        "Generate a bedtime story about an astronaut exploring Mars.",
        &["astronaut", "space", "Mars", "rocket", "planet"],
    ),
    (
        "Write a poem about the ocean without mentioning water.",
        &["water", "ocean", "sea", "waves", "liquid"],
    ),
    (
        "Describe a futuristic city without using the word 'technology'.",
        &["technology", "future", "AI", "robot", "smart"],
    ),
    (
        "Explain how a tree grows without using the word 'photosynthesis'.",
        &["photosynthesis", "sunlight", "chlorophyll", "energy", "plants"],
    ),
    (
        "Tell a story about a dragon and a knight without using the word 'fire'.",
        &["fire", "flame", "burn", "heat", "dragon"],
    ),
];

/// The built-in question bank.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticCatalog;

impl StaticCatalog {
    fn pool(kind: RoundKind) -> &'static [Entry] {
        match kind {
            RoundKind::Standard => STANDARD_POOL,
            RoundKind::Inverse => INVERSE_POOL,
            RoundKind::Creative => CREATIVE_POOL,
        }
    }
}

impl RoundCatalog for StaticCatalog {
    fn select_round(&self, kind: RoundKind, rng: &mut dyn RngCore) -> Round {
        let pool = Self::pool(kind);
        let (prompt_text, words) = pool[rng.gen_range(0..pool.len())];
        Round::new(
            kind,
            prompt_text,
            words.iter().map(|w| w.to_string()).collect(),
        )
    }
}
