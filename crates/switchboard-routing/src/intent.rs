//! Keyword-weighted intent classification
//!
//! Scores a prompt against a static keyword table. Pure heuristics, no
//! model involved.

use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator};

use crate::keywords::KEYWORD_INDEX;

/// Coarse subject-matter category used to pick a backend pool
///
/// Declaration order is the tie-break order: when two categories share the
/// top score the one declared first wins.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum IntentCategory {
    /// Programming, tooling, debugging
    Coding,
    /// Calculation and mathematical reasoning
    Math,
    /// Stories, poems and other creative writing
    Creative,
    /// Analysis, comparison and explanation
    Reasoning,
    /// Anything that matched no keyword
    General,
}

impl IntentCategory {
    /// Number of categories
    pub const COUNT: usize = 5;

    /// Position in declaration order
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Name as used in configuration and responses
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Characters that separate tokens besides whitespace
const DELIMITERS: &[char] = &['.', ',', ';', ':', '!', '?', '(', ')', '[', ']', '{', '}', '\'', '"'];

/// Classify prompt text into an intent category
///
/// Returns [`IntentCategory::General`] when no token matches any keyword.
pub fn classify(prompt: &str) -> IntentCategory {
    let scores = classify_scores(prompt);

    let mut best = IntentCategory::General;
    let mut best_score = 0;

    // strict comparison keeps the earliest category on ties
    for category in IntentCategory::iter() {
        let score = scores[category.index()];
        if score > best_score {
            best = category;
            best_score = score;
        }
    }

    best
}

/// Per-category keyword scores, indexed by [`IntentCategory::index`]
pub fn classify_scores(prompt: &str) -> [u32; IntentCategory::COUNT] {
    let lowered = prompt.to_lowercase();
    let mut scores = [0_u32; IntentCategory::COUNT];

    for token in tokenize(&lowered) {
        let Some(memberships) = KEYWORD_INDEX.get(token) else {
            continue;
        };

        for (category, tier) in memberships {
            scores[category.index()] += tier.weight();
        }
    }

    scores
}

fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| c.is_whitespace() || DELIMITERS.contains(&c))
        .filter(|token| !token.is_empty())
}
