//! Ordered answer-matcher chains.
//!
//! Every [`Matcher`] is total: it inspects text and returns `Some(token)` or
//! `None`, never an error. A [`MatcherChain`] tries its matchers in order and
//! the first hit wins; when all of them miss the chain's sentinel is used.

use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;
use tracing::debug;

use super::{NO_LEGACY_ANSWER, NO_STRUCTURED_ANSWER};

/// Numeric token: optional currency, digits with `,`/`.` inside, optional `%`.
const NUMBER: &str = r"[$€£]?\d(?:[\d,.]*\d)?%?";

/// Numeric token followed by an optional unit word on the same line.
const NUMBER_WITH_UNIT: &str = r"[$€£]?\d(?:[\d,.]*\d)?%?(?:[ \t]+[A-Za-z]+)?";

/// Bare number, as the legacy protocol understands it.
const BARE_NUMBER: &str = r"\d(?:[\d,.]*\d)?";

static ANSWER_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(NUMBER_WITH_UNIT).expect("ANSWER_TOKEN regex should compile")
});

static NUMBER_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(NUMBER).expect("NUMBER_TOKEN regex should compile"));

static BARE_NUMBER_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(BARE_NUMBER).expect("BARE_NUMBER_TOKEN regex should compile"));

/// Which numeric alphabet a [`Matcher::LastNumber`] scan uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberStyle {
    /// Currency and percent aware.
    Rich,
    /// Digits, commas and decimal points only.
    Bare,
}

/// One extraction strategy.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// `marker` (case-insensitive), optional whitespace, then an answer token.
    Marker { marker: String, pattern: Regex },
    /// First answer token on each of the last `lines` non-empty lines,
    /// most recent line first.
    TrailingLines { lines: usize },
    /// First capture group of a case-insensitive pattern.
    Capture { name: &'static str, pattern: Regex },
    /// Last numeric token anywhere in the text.
    LastNumber(NumberStyle),
}

impl Matcher {
    /// Marker matcher. Returns `None` only if the escaped marker cannot be
    /// compiled, in which case callers skip the strategy.
    pub fn marker(marker: &str) -> Option<Self> {
        let source = format!(r"{}\s*({})", regex::escape(marker.trim()), NUMBER_WITH_UNIT);
        let pattern = RegexBuilder::new(&source)
            .case_insensitive(true)
            .build()
            .ok()?;
        Some(Self::Marker {
            marker: marker.trim().to_string(),
            pattern,
        })
    }

    /// Capture matcher over a literal pattern. `{num}` in `template` expands
    /// to the bare numeric token and `{answer}` to number-with-unit.
    fn capture(name: &'static str, template: &str) -> Self {
        let source = template
            .replace("{num}", BARE_NUMBER)
            .replace("{answer}", NUMBER_WITH_UNIT);
        let pattern = RegexBuilder::new(&source)
            .case_insensitive(true)
            .build()
            .expect("capture matcher templates are literals and should compile");
        Self::Capture { name, pattern }
    }

    /// Short identifier used in logs.
    pub fn name(&self) -> &str {
        match self {
            Self::Marker { marker, .. } => marker,
            Self::TrailingLines { .. } => "trailing_lines",
            Self::Capture { name, .. } => name,
            Self::LastNumber(_) => "last_number",
        }
    }

    /// Apply the strategy.
    pub fn find(&self, text: &str) -> Option<String> {
        match self {
            Self::Marker { pattern, .. } | Self::Capture { pattern, .. } => pattern
                .captures(text)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim().to_string())
                .filter(|s| !s.is_empty()),
            Self::TrailingLines { lines } => text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .rev()
                .take(*lines)
                .find_map(|line| ANSWER_TOKEN.find(line))
                .map(|m| m.as_str().trim().to_string()),
            Self::LastNumber(style) => {
                let token = match style {
                    NumberStyle::Rich => &*NUMBER_TOKEN,
                    NumberStyle::Bare => &*BARE_NUMBER_TOKEN,
                };
                token.find_iter(text).last().map(|m| m.as_str().to_string())
            }
        }
    }
}

/// Ordered list of matchers with the sentinel returned on a total miss.
#[derive(Debug, Clone)]
pub struct MatcherChain {
    name: String,
    matchers: Vec<Matcher>,
    sentinel: &'static str,
}

impl MatcherChain {
    /// Empty chain.
    pub fn new(name: &str, sentinel: &'static str) -> Self {
        Self {
            name: name.to_string(),
            matchers: Vec::new(),
            sentinel,
        }
    }

    /// Append a matcher at the lowest priority.
    pub fn then(mut self, matcher: Matcher) -> Self {
        self.matchers.push(matcher);
        self
    }

    /// Structured-marker chain: `marker` (when given) → last 5 non-empty
    /// lines → `"Unable to extract"`.
    pub fn structured(marker: Option<&str>) -> Self {
        let mut chain = Self::new("structured", NO_STRUCTURED_ANSWER);
        if let Some(m) = marker.filter(|m| !m.trim().is_empty()).and_then(Matcher::marker) {
            chain = chain.then(m);
        }
        chain.then(Matcher::TrailingLines { lines: 5 })
    }

    /// Legacy keyword chain used by the free-text protocol.
    pub fn legacy() -> Self {
        Self::new("legacy", NO_LEGACY_ANSWER)
            .then(Matcher::capture("final_answer", r"final answer[:\s]+({num})"))
            .then(Matcher::capture("answer", r"answer[:\s]+({num})"))
            .then(Matcher::capture("therefore", r"therefore[,\s]+({num})"))
            .then(Matcher::capture("result", r"result[:\s]+({num})"))
            .then(Matcher::capture("equals_sign", r"=\s*({num})"))
            .then(Matcher::LastNumber(NumberStyle::Bare))
    }

    /// Chain for the single small-model solver, which is asked to finish
    /// with `FINAL ANSWER: [number]`.
    pub fn small_model() -> Self {
        Self::new("small_model", NO_LEGACY_ANSWER)
            .then(Matcher::capture("final_answer", r"FINAL ANSWER:\s*({answer})"))
            .then(Matcher::capture(
                "answer_phrase",
                r"(?:the answer is|answer:|result:|total:)\s*({num})",
            ))
            .then(Matcher::capture(
                "conclusion",
                r"(?:therefore|thus|so),?\s+(?:the answer is|there (?:are|is))\s*({num})",
            ))
            .then(Matcher::capture("equals", r"(?:=|equals)\s*({num})"))
            .then(Matcher::LastNumber(NumberStyle::Bare))
    }

    /// First matcher hit, if any.
    pub fn find(&self, text: &str) -> Option<String> {
        for matcher in &self.matchers {
            if let Some(found) = matcher.find(text) {
                debug!(chain = %self.name, matcher = matcher.name(), found = %found, "answer extracted");
                return Some(found);
            }
        }
        debug!(chain = %self.name, tried = self.matchers.len(), "no answer token found");
        None
    }

    /// First matcher hit, or the sentinel.
    pub fn extract(&self, text: &str) -> String {
        self.find(text)
            .unwrap_or_else(|| self.sentinel.to_string())
    }

    pub fn sentinel(&self) -> &'static str {
        self.sentinel
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    /// Matcher names in evaluation order.
    pub fn order(&self) -> Vec<&str> {
        self.matchers.iter().map(Matcher::name).collect()
    }
}
