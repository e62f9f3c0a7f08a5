//! Deterministic keyword arithmetic.
//!
//! Picks one operation from trigger words in the problem and folds it over
//! every number the problem mentions. Good enough for one-step problems and
//! wrong for anything else, which is the point of a baseline.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use crate::extract::UNDETERMINED;
use crate::solver::Solver;
use crate::trace::{ReasoningTrace, SolveResult, Speaker};

static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d[\d,]*(?:\.\d+)?").expect("NUMBER regex should compile")
});

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z]+").expect("WORD regex should compile"));

/// Arithmetic applied across the numbers of a problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
    /// No trigger word: answer with the last number.
    LastNumber,
}

impl Operation {
    /// Trigger words, checked in declaration order.
    const TRIGGERS: [(Operation, &'static [&'static str]); 4] = [
        (Operation::Add, &["total", "sum", "altogether", "all", "combined"]),
        (
            Operation::Subtract,
            &["left", "remain", "remaining", "difference", "fewer", "less"],
        ),
        (Operation::Multiply, &["times", "product", "each"]),
        (Operation::Divide, &["divide", "divided", "per", "split", "share", "shared"]),
    ];

    /// Operation selected by `problem`, with the word that triggered it.
    pub fn detect(problem: &str) -> (Self, Option<&'static str>) {
        let lower = problem.to_lowercase();
        let words: Vec<&str> = WORD.find_iter(&lower).map(|m| m.as_str()).collect();
        for (op, triggers) in Self::TRIGGERS {
            if let Some(word) = triggers.iter().copied().find(|t| words.contains(t)) {
                return (op, Some(word));
            }
        }
        (Self::LastNumber, None)
    }

    fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::LastNumber => "",
        }
    }

    fn apply(self, numbers: &[f64]) -> Option<f64> {
        let (&first, rest) = numbers.split_first()?;
        match self {
            Self::LastNumber => numbers.last().copied(),
            Self::Add => Some(rest.iter().fold(first, |acc, n| acc + n)),
            Self::Subtract => Some(rest.iter().fold(first, |acc, n| acc - n)),
            Self::Multiply => Some(rest.iter().fold(first, |acc, n| acc * n)),
            Self::Divide => rest
                .iter()
                .try_fold(first, |acc, n| (*n != 0.0).then(|| acc / n)),
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Add => write!(f, "addition"),
            Self::Subtract => write!(f, "subtraction"),
            Self::Multiply => write!(f, "multiplication"),
            Self::Divide => write!(f, "division"),
            Self::LastNumber => write!(f, "last number"),
        }
    }
}

/// Numbers in `problem`, commas removed.
pub fn numbers_in(problem: &str) -> Vec<f64> {
    NUMBER
        .find_iter(problem)
        .filter_map(|m| m.as_str().replace(',', "").parse().ok())
        .collect()
}

/// Render without a trailing `.0`, otherwise rounded to two decimals.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let s = format!("{:.2}", value);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Model-free solver.
#[derive(Debug, Clone, Default)]
pub struct RuleBasedSolver {
    timestamps: bool,
}

impl RuleBasedSolver {
    pub fn new(timestamps: bool) -> Self {
        Self { timestamps }
    }

    /// Synchronous core; the [`Solver`] impl just wraps it.
    pub fn solve_now(&self, problem: &str) -> SolveResult {
        let mut trace = ReasoningTrace::new(self.timestamps);
        trace.push(Speaker::RuleBased, format!("Received problem: {}", problem));

        let numbers = numbers_in(problem);
        if numbers.is_empty() {
            trace.push(Speaker::RuleBased, "ERROR: no numbers found in problem");
            return SolveResult::failed(UNDETERMINED, trace, "no numbers found in problem");
        }
        let listed: Vec<String> = numbers.iter().map(|n| format_number(*n)).collect();
        trace.push(Speaker::RuleBased, format!("Found numbers: {}", listed.join(", ")));

        let (op, trigger) = Operation::detect(problem);
        match trigger {
            Some(word) => trace.push(
                Speaker::RuleBased,
                format!("Detected operation: {} (keyword '{}')", op, word),
            ),
            None => trace.push(
                Speaker::RuleBased,
                "No operation keyword found; using the last number",
            ),
        };

        let Some(value) = op.apply(&numbers) else {
            trace.push(Speaker::RuleBased, "ERROR: division by zero");
            return SolveResult::failed(UNDETERMINED, trace, "division by zero");
        };
        let answer = format_number(value);
        if op != Operation::LastNumber {
            trace.push(
                Speaker::RuleBased,
                format!("Computed {} = {}", listed.join(&format!(" {} ", op.symbol())), answer),
            );
        }
        trace.push(Speaker::RuleBased, format!("FINAL ANSWER: {}", answer));
        debug!(operation = %op, answer = %answer, "rule-based solve finished");

        SolveResult::completed(answer, trace, None)
    }
}

#[async_trait]
impl Solver for RuleBasedSolver {
    fn name(&self) -> &'static str {
        "rule_based"
    }

    async fn solve(&self, problem: &str) -> SolveResult {
        self.solve_now(problem)
    }
}
