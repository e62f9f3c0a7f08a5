//! Reasoning trace: the ordered audit log of one solve attempt.
//!
//! A [`ReasoningTrace`] is created fresh for every solve call and threaded
//! through the solver by `&mut`. Step numbers are assigned on push, so the
//! trace is always numbered `1..=len` with no gaps, and the only way to turn
//! it into a [`SolveResult`] keeps `total_steps` equal to the step count.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Who produced a reasoning step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Speaker {
    /// Orchestration messages (round markers, consensus, final answer).
    #[serde(rename = "System")]
    System,
    /// Debate role that proposes and revises solutions.
    #[serde(rename = "Agent 1 (Proposer)")]
    Proposer,
    /// Debate role that reviews the proposer and issues a verdict.
    #[serde(rename = "Agent 2 (Critic)")]
    Critic,
    /// Single small-model solver.
    #[serde(rename = "Small Model Agent")]
    SmallModel,
    /// Deterministic keyword arithmetic solver.
    #[serde(rename = "Rule-Based Solver")]
    RuleBased,
}

impl Speaker {
    /// Label as it appears in serialized traces.
    pub fn label(self) -> &'static str {
        match self {
            Self::System => "System",
            Self::Proposer => "Agent 1 (Proposer)",
            Self::Critic => "Agent 2 (Critic)",
            Self::SmallModel => "Small Model Agent",
            Self::RuleBased => "Rule-Based Solver",
        }
    }
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One logged event in a trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningStep {
    /// Which role produced the step.
    pub agent: Speaker,
    /// Free text: a model response, a marker, or a system message.
    pub content: String,
    /// 1-based position in the trace.
    pub step_number: u32,
    /// RFC 3339 emission time, when the trace records timestamps.
    pub timestamp: Option<String>,
}

/// Append-only, exclusively owned log of reasoning steps.
#[derive(Debug, Clone, Default)]
pub struct ReasoningTrace {
    steps: Vec<ReasoningStep>,
    timestamps: bool,
}

impl ReasoningTrace {
    /// Empty trace. `timestamps` controls whether steps carry an emission time.
    pub fn new(timestamps: bool) -> Self {
        Self {
            steps: Vec::new(),
            timestamps,
        }
    }

    /// Append a step and return its step number.
    pub fn push(&mut self, agent: Speaker, content: impl Into<String>) -> u32 {
        let step_number = self.steps.len() as u32 + 1;
        let timestamp = self.timestamps.then(|| Utc::now().to_rfc3339());
        self.steps.push(ReasoningStep {
            agent,
            content: content.into(),
            step_number,
            timestamp,
        });
        step_number
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[ReasoningStep] {
        &self.steps
    }

    /// Most recent step, if any.
    pub fn last(&self) -> Option<&ReasoningStep> {
        self.steps.last()
    }
}

/// Final structured outcome of a solve attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveResult {
    pub success: bool,
    /// Untyped answer: a bare number, a number with a unit, or a sentinel.
    pub final_answer: String,
    pub reasoning_steps: Vec<ReasoningStep>,
    pub total_steps: u32,
    /// Diagnostic text. Always set when `success` is false; on success it
    /// lists recoverable faults that happened mid-run.
    pub error: Option<String>,
}

impl SolveResult {
    /// Successful result. `warning` carries recoverable faults, if any.
    pub fn completed(
        final_answer: impl Into<String>,
        trace: ReasoningTrace,
        warning: Option<String>,
    ) -> Self {
        Self::build(true, final_answer.into(), trace, warning)
    }

    /// Failed result. An empty `error` is replaced so the field is never blank.
    pub fn failed(
        final_answer: impl Into<String>,
        trace: ReasoningTrace,
        error: impl Into<String>,
    ) -> Self {
        let mut error = error.into();
        if error.trim().is_empty() {
            error = "unknown error".to_string();
        }
        Self::build(false, final_answer.into(), trace, Some(error))
    }

    fn build(
        success: bool,
        final_answer: String,
        trace: ReasoningTrace,
        error: Option<String>,
    ) -> Self {
        let reasoning_steps = trace.steps;
        Self {
            success,
            final_answer,
            total_steps: reasoning_steps.len() as u32,
            reasoning_steps,
            error,
        }
    }

    /// Step contents without numbering or timestamps, for comparing runs.
    pub fn transcript(&self) -> Vec<(Speaker, &str)> {
        self.reasoning_steps
            .iter()
            .map(|s| (s.agent, s.content.as_str()))
            .collect()
    }
}
