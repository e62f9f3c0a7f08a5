//! Single-shot solvers: the baselines the debate is compared against.
//!
//! [`SmallModelSolver`] sends the problem to a small hosted model once and
//! extracts a `FINAL ANSWER:` token. [`RuleBasedSolver`] never calls a model.

pub mod rules;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::debate::RoleSettings;
use crate::extract::MatcherChain;
use crate::llm::{ModelCaller, ModelReply, ModelRequest};
use crate::solver::Solver;
use crate::trace::{ReasoningTrace, SolveResult, Speaker};

pub use rules::{Operation, RuleBasedSolver};

/// Default model for the single-agent baseline.
pub const SMALL_MODEL_ID: &str = "katanemo/Arch-Router-1.5B:hf-inference";

/// Answer reported when the model returned no text.
pub const NO_RESPONSE: &str = "No response";

/// Answer reported when the model call faulted.
pub const ERROR_OCCURRED: &str = "Error occurred";

const SMALL_MODEL_INSTRUCTIONS: &str = "You are a math problem solver. Solve problems step by step \
and show your reasoning clearly. Always end your response with 'FINAL ANSWER: [number]'";

/// Model settings the small-model baseline uses by default.
pub fn small_model_settings() -> RoleSettings {
    RoleSettings {
        model_id: SMALL_MODEL_ID.to_string(),
        ..RoleSettings::default()
    }
}

/// One-call solver backed by a small model.
pub struct SmallModelSolver {
    caller: Arc<dyn ModelCaller>,
    settings: RoleSettings,
    chain: MatcherChain,
    timestamps: bool,
}

impl SmallModelSolver {
    pub fn new(caller: Arc<dyn ModelCaller>) -> Self {
        Self::with_settings(caller, small_model_settings())
    }

    pub fn with_settings(caller: Arc<dyn ModelCaller>, settings: RoleSettings) -> Self {
        Self {
            caller,
            settings,
            chain: MatcherChain::small_model(),
            timestamps: true,
        }
    }

    /// Disable step timestamps (deterministic traces in tests).
    pub fn without_timestamps(mut self) -> Self {
        self.timestamps = false;
        self
    }

    pub fn model_id(&self) -> &str {
        &self.settings.model_id
    }

    async fn solve_inner(&self, problem: &str) -> SolveResult {
        let mut trace = ReasoningTrace::new(self.timestamps);
        trace.push(Speaker::SmallModel, format!("Received problem: {}", problem));

        let request = ModelRequest {
            role_instructions: SMALL_MODEL_INSTRUCTIONS.to_string(),
            prompt: format!(
                "Solve this math problem step by step:\n\n{}\n\n\
                 Remember to show your work and end with 'FINAL ANSWER: [number]'",
                problem
            ),
            model_id: self.settings.model_id.clone(),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };
        trace.push(
            Speaker::SmallModel,
            format!("Sending problem to {}...", self.settings.model_id),
        );

        let text = match self.caller.call(&request).await {
            ModelReply::Text(text) => text,
            ModelReply::Fault(fault) => {
                warn!(kind = %fault.kind, "small model call failed");
                let message = fault.to_string();
                trace.push(Speaker::SmallModel, format!("ERROR: {}", message));
                return SolveResult::failed(ERROR_OCCURRED, trace, message);
            }
        };

        trace.push(Speaker::SmallModel, "Received response from model");
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            trace.push(Speaker::SmallModel, line);
        }

        let answer = if text.trim().is_empty() {
            NO_RESPONSE.to_string()
        } else {
            self.chain.extract(&text)
        };
        trace.push(Speaker::SmallModel, format!("Extracted Answer: {}", answer));
        info!(answer = %answer, steps = trace.len(), "small model solve finished");

        SolveResult::completed(answer, trace, None)
    }
}

#[async_trait]
impl Solver for SmallModelSolver {
    fn name(&self) -> &'static str {
        "small_model"
    }

    async fn solve(&self, problem: &str) -> SolveResult {
        let span = info_span!(
            "single",
            solve_id = %Uuid::new_v4(),
            model = %self.settings.model_id
        );
        self.solve_inner(problem).instrument(span).await
    }
}
