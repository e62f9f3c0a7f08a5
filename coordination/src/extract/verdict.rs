//! Critic verdict detection.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static VERDICT_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)VERDICT:\s*\**\s*(INCORRECT|CORRECT)\b").expect("VERDICT_TAG regex should compile")
});

static POSITIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:correct|accurate|right|agreed?|looks good)\b")
        .expect("POSITIVE regex should compile")
});

static NEGATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:incorrect|wrong|errors?|mistakes?)\b")
        .expect("NEGATIVE regex should compile")
});

/// Phrases the legacy protocol treats as approval (plain substring test on
/// the lower-cased critic response).
const LEGACY_APPROVAL: &[&str] = &[
    "correct",
    "looks good",
    "well done",
    "accurate",
    "solution is right",
    "i agree",
    "no errors",
];

/// Critic's categorical judgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Correct,
    Incorrect,
    Unclear,
}

impl Verdict {
    /// Whether this verdict ends the debate.
    pub fn is_consensus(self) -> bool {
        self == Self::Correct
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Correct => write!(f, "CORRECT"),
            Self::Incorrect => write!(f, "INCORRECT"),
            Self::Unclear => write!(f, "UNCLEAR"),
        }
    }
}

/// The last explicit `VERDICT:` tag wins; otherwise compare whole-word
/// counts of approval and disapproval keywords. Ties and silence are
/// `Unclear`.
pub fn extract_verdict(text: &str) -> Verdict {
    if let Some(tag) = VERDICT_TAG.captures_iter(text).last().and_then(|c| c.get(1)) {
        return if tag.as_str().eq_ignore_ascii_case("CORRECT") {
            Verdict::Correct
        } else {
            Verdict::Incorrect
        };
    }

    let positive = POSITIVE.find_iter(text).count();
    let negative = NEGATIVE.find_iter(text).count();
    match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => Verdict::Correct,
        std::cmp::Ordering::Less => Verdict::Incorrect,
        std::cmp::Ordering::Equal => Verdict::Unclear,
    }
}

/// Legacy consensus test. Any approval phrase counts, including inside
/// words such as "incorrect".
pub fn is_legacy_approval(text: &str) -> bool {
    let lower = text.to_lowercase();
    LEGACY_APPROVAL.iter().any(|phrase| lower.contains(phrase))
}
