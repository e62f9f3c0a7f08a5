//! Text extraction: answer tokens and verdicts from free-form model output.
//!
//! Extraction never interprets magnitude: tokens are returned as the literal
//! substrings found (`"1,250"`, `"$56.10"`, `"480 miles"`). Misses are not
//! errors; callers get `None` from [`MatcherChain::find`] or a sentinel
//! string from the `extract*` functions.
//!
//! # Strategy order
//!
//! ```text
//! structured:  marker ─▶ last 5 non-empty lines ─▶ "Unable to extract"
//! legacy:      final answer ─▶ answer ─▶ therefore ─▶ result ─▶ "=" ─▶ last number
//!              ─▶ "Unable to extract answer"
//! ```

pub mod matchers;
pub mod verdict;

pub use matchers::{Matcher, MatcherChain, NumberStyle};
pub use verdict::{extract_verdict, is_legacy_approval, Verdict};

/// Sentinel of the structured-marker extraction mode.
pub const NO_STRUCTURED_ANSWER: &str = "Unable to extract";

/// Sentinel of the legacy keyword extraction mode.
pub const NO_LEGACY_ANSWER: &str = "Unable to extract answer";

/// Final answer used when neither debate role produced a usable token.
pub const UNDETERMINED: &str = "Unable to determine";

/// Marker the proposer is asked to end with.
pub const PROPOSER_MARKER: &str = "MY PROPOSED ANSWER:";

/// Marker the critic is asked to end with.
pub const CRITIC_MARKER: &str = "MY ANSWER:";

/// Structured extraction returning the sentinel on a miss.
pub fn extract(text: &str, marker: Option<&str>) -> String {
    MatcherChain::structured(marker).extract(text)
}

/// Legacy keyword extraction returning the sentinel on a miss.
pub fn extract_legacy(text: &str) -> String {
    MatcherChain::legacy().extract(text)
}
