//! Debate orchestrator: drives the proposer→critic refinement loop.
//!
//! Each run owns a fresh [`ReasoningTrace`] and [`DebateState`], calls the
//! model twice per round, extracts answers and verdicts, and stops on a
//! CORRECT verdict or at the round cap. The outermost boundary is total:
//! errors and panics inside the loop become a `success = false` result.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use super::prompts;
use super::state::{DebatePhase, DebateState, RoundRecord, Role, TransitionError};
use crate::extract::{extract_verdict, is_legacy_approval, MatcherChain, Verdict, UNDETERMINED};
use crate::llm::{ModelCaller, ModelReply, ModelRequest, TransportFault};
use crate::solver::Solver;
use crate::trace::{ReasoningTrace, SolveResult, Speaker};

/// `final_answer` of a run that ended in an orchestration fault.
pub const FAILED_ANSWER: &str = "Error in multi-agent processing";

/// Which generation of the debate protocol to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolVariant {
    /// Marker-based answers and explicit `VERDICT:` tags.
    #[default]
    Structured,
    /// Free-text prompts, approval-keyword termination, keyword extraction.
    Legacy,
}

impl std::fmt::Display for ProtocolVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Structured => write!(f, "structured"),
            Self::Legacy => write!(f, "legacy"),
        }
    }
}

impl FromStr for ProtocolVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "structured" | "structured_marker" | "structured-marker" => Ok(Self::Structured),
            "legacy" | "legacy_keyword" | "legacy-keyword" => Ok(Self::Legacy),
            other => Err(format!("unknown protocol variant '{}'", other)),
        }
    }
}

/// What to do when a model call comes back as a transport fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultPolicy {
    /// Use the rendered fault text as the response and keep debating.
    #[default]
    FeedForward,
    /// Abort the run on the first fault.
    ShortCircuit,
}

impl std::fmt::Display for FaultPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FeedForward => write!(f, "feed_forward"),
            Self::ShortCircuit => write!(f, "short_circuit"),
        }
    }
}

impl FromStr for FaultPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "feed_forward" => Ok(Self::FeedForward),
            "short_circuit" => Ok(Self::ShortCircuit),
            other => Err(format!("unknown fault policy '{}'", other)),
        }
    }
}

/// Model parameters for one debate role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleSettings {
    pub model_id: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for RoleSettings {
    fn default() -> Self {
        Self {
            model_id: "gpt-4o-mini".to_string(),
            max_tokens: 500,
            temperature: 0.7,
        }
    }
}

/// Configuration for the debate orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebateConfig {
    /// Upper bound on proposer→critic rounds.
    pub max_rounds: u32,
    pub protocol: ProtocolVariant,
    pub fault_policy: FaultPolicy,
    pub proposer: RoleSettings,
    pub critic: RoleSettings,
    /// Stamp trace steps with their emission time.
    pub timestamps: bool,
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            protocol: ProtocolVariant::default(),
            fault_policy: FaultPolicy::default(),
            proposer: RoleSettings::default(),
            critic: RoleSettings::default(),
            timestamps: true,
        }
    }
}

/// Orchestration-level faults. These end a run with `success = false`.
#[derive(Debug, Error)]
pub enum DebateError {
    #[error("max_rounds must be at least 1")]
    NoRounds,

    #[error("transition failed: {0}")]
    TransitionFailed(#[from] TransitionError),

    #[error("{role} call failed in round {round}: {fault}")]
    Transport {
        role: Role,
        round: u32,
        fault: TransportFault,
    },

    #[error("debate panicked: {0}")]
    Panicked(String),
}

/// Everything a finished run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateOutcome {
    /// Identifier attached to the run's tracing span.
    pub solve_id: String,
    pub result: SolveResult,
    pub terminal_phase: DebatePhase,
    pub consensus_reached: bool,
    pub rounds: Vec<RoundRecord>,
}

impl DebateOutcome {
    pub fn rounds_completed(&self) -> usize {
        self.rounds.len()
    }

    /// Compact summary line.
    pub fn summary_line(&self) -> String {
        let status = match self.terminal_phase {
            DebatePhase::Resolved => "CONSENSUS",
            DebatePhase::Exhausted => "EXHAUSTED",
            _ => "ABORTED",
        };
        format!(
            "[{}] {} rounds | answer={}",
            status,
            self.rounds.len(),
            self.result.final_answer
        )
    }
}

/// Drives the two-role debate against a [`ModelCaller`].
pub struct DebateOrchestrator {
    caller: Arc<dyn ModelCaller>,
    config: DebateConfig,
    proposer_chain: MatcherChain,
    critic_chain: MatcherChain,
    legacy_chain: MatcherChain,
}

impl DebateOrchestrator {
    /// Orchestrator with the default configuration.
    pub fn new(caller: Arc<dyn ModelCaller>) -> Self {
        Self::with_config(caller, DebateConfig::default())
    }

    pub fn with_config(caller: Arc<dyn ModelCaller>, config: DebateConfig) -> Self {
        Self {
            caller,
            config,
            proposer_chain: MatcherChain::structured(Some(Role::Proposer.marker())),
            critic_chain: MatcherChain::structured(Some(Role::Critic.marker())),
            legacy_chain: MatcherChain::legacy(),
        }
    }

    pub fn config(&self) -> &DebateConfig {
        &self.config
    }

    /// Run the debate and keep only the structured result.
    pub async fn solve(&self, problem: &str) -> SolveResult {
        self.run(problem).await.result
    }

    /// Run the debate and return the result with round-level detail.
    pub async fn run(&self, problem: &str) -> DebateOutcome {
        let solve_id = Uuid::new_v4().to_string();
        let span = info_span!(
            "debate",
            solve_id = %solve_id,
            protocol = %self.config.protocol,
            max_rounds = self.config.max_rounds
        );
        self.run_in_span(problem, solve_id).instrument(span).await
    }

    async fn run_in_span(&self, problem: &str, solve_id: String) -> DebateOutcome {
        let mut trace = ReasoningTrace::new(self.config.timestamps);
        let mut state = DebateState::new(self.config.max_rounds);

        trace.push(
            Speaker::System,
            format!("Starting multi-agent debate for problem: {}", problem),
        );

        let attempt = AssertUnwindSafe(self.debate(problem, &mut state, &mut trace))
            .catch_unwind()
            .await;
        let failure = match attempt {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(err),
            Err(payload) => Some(DebateError::Panicked(panic_message(payload.as_ref()))),
        };

        let result = match failure {
            None => {
                let final_answer = self.final_answer(&state);
                trace.push(Speaker::System, format!("FINAL ANSWER: {}", final_answer));
                info!(
                    phase = %state.phase,
                    rounds = state.rounds.len(),
                    final_answer = %final_answer,
                    faults = state.faults.len(),
                    "debate finished"
                );
                SolveResult::completed(final_answer, trace, state.fault_summary())
            }
            Some(err) => {
                let message = err.to_string();
                warn!(error = %message, status = %state.status_line(), "debate aborted");
                state.abort(&message);
                trace.push(Speaker::System, format!("ERROR: {}", message));
                SolveResult::failed(FAILED_ANSWER, trace, message)
            }
        };

        DebateOutcome {
            solve_id,
            consensus_reached: state.phase == DebatePhase::Resolved,
            terminal_phase: state.phase,
            rounds: state.rounds,
            result,
        }
    }

    /// The round loop. Any `Err` here is an orchestration fault.
    async fn debate(
        &self,
        problem: &str,
        state: &mut DebateState,
        trace: &mut ReasoningTrace,
    ) -> Result<(), DebateError> {
        if self.config.max_rounds == 0 {
            return Err(DebateError::NoRounds);
        }
        let protocol = self.config.protocol;
        state.start()?;

        loop {
            let round = state.current_round;
            trace.push(Speaker::System, format!("--- Round {} ---", round));
            info!(round, "round started");

            let prompt = prompts::proposer_prompt(protocol, problem, state);
            let reply = self.consult(Role::Proposer, prompt, state).await?;
            let faulted = reply.is_fault();
            let proposal = reply.into_text();
            trace.push(Role::Proposer.speaker(), proposal.as_str());
            // Fault text is transcript only; its digits are never an answer.
            let proposed = match (faulted, protocol) {
                (true, _) => None,
                (false, ProtocolVariant::Structured) => self.proposer_chain.find(&proposal),
                (false, ProtocolVariant::Legacy) => self.legacy_chain.find(&proposal),
            };
            state.record_proposal(proposal, proposed);
            state.transition(DebatePhase::CriticTurn, "proposal submitted")?;

            let prompt = prompts::critic_prompt(protocol, problem, state);
            let reply = self.consult(Role::Critic, prompt, state).await?;
            let faulted = reply.is_fault();
            let critique = reply.into_text();
            trace.push(Role::Critic.speaker(), critique.as_str());
            let (answer, verdict, consensus) = if faulted {
                (None, Verdict::Unclear, false)
            } else {
                self.assess(&critique)
            };
            info!(
                round,
                verdict = %verdict,
                proposer_answer = state.proposer_answer.as_deref().unwrap_or("-"),
                critic_answer = answer.as_deref().unwrap_or("-"),
                "critic responded"
            );
            state.record_critique(critique, answer, verdict, consensus);

            if consensus {
                trace.push(Speaker::System, "Agents reached consensus!");
                state.transition(DebatePhase::Resolved, "critic approved")?;
                return Ok(());
            }

            trace.push(
                Speaker::System,
                format!("Critic verdict: {}. No consensus in round {}.", verdict, round),
            );

            if !state.has_rounds_remaining() {
                let note = match protocol {
                    ProtocolVariant::Structured => {
                        "Max rounds reached. Using the critic's last answer."
                    }
                    ProtocolVariant::Legacy => {
                        "Max rounds reached. Using Agent 1's final proposal."
                    }
                };
                trace.push(Speaker::System, note);
                state.transition(DebatePhase::Exhausted, "max rounds reached")?;
                return Ok(());
            }

            state.transition(DebatePhase::ProposerTurn, "critic requested revision")?;
        }
    }

    /// One model call for `role`, applying the fault policy. Under
    /// `FeedForward` a fault comes back as-is for the transcript.
    async fn consult(
        &self,
        role: Role,
        prompt: String,
        state: &mut DebateState,
    ) -> Result<ModelReply, DebateError> {
        let settings = match role {
            Role::Proposer => &self.config.proposer,
            Role::Critic => &self.config.critic,
        };
        let request = ModelRequest {
            role_instructions: prompts::role_instructions(self.config.protocol, role).to_string(),
            prompt,
            model_id: settings.model_id.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        };

        match self.caller.call(&request).await {
            ModelReply::Text(text) => Ok(ModelReply::Text(text)),
            ModelReply::Fault(fault) => {
                state.record_fault(role, &fault);
                match self.config.fault_policy {
                    FaultPolicy::FeedForward => {
                        warn!(%role, round = state.current_round, kind = %fault.kind, "feeding model fault forward as content");
                        Ok(ModelReply::Fault(fault))
                    }
                    FaultPolicy::ShortCircuit => Err(DebateError::Transport {
                        role,
                        round: state.current_round,
                        fault,
                    }),
                }
            }
        }
    }

    /// Critic answer, verdict and whether the debate should stop.
    fn assess(&self, critique: &str) -> (Option<String>, Verdict, bool) {
        match self.config.protocol {
            ProtocolVariant::Structured => {
                let verdict = extract_verdict(critique);
                (
                    self.critic_chain.find(critique),
                    verdict,
                    verdict.is_consensus(),
                )
            }
            ProtocolVariant::Legacy => {
                let approved = is_legacy_approval(critique);
                let verdict = if approved {
                    Verdict::Correct
                } else {
                    Verdict::Unclear
                };
                (None, verdict, approved)
            }
        }
    }

    fn final_answer(&self, state: &DebateState) -> String {
        match self.config.protocol {
            ProtocolVariant::Structured => state.best_answer().unwrap_or(UNDETERMINED).to_string(),
            ProtocolVariant::Legacy => state
                .proposer_answer
                .clone()
                .unwrap_or_else(|| self.legacy_chain.sentinel().to_string()),
        }
    }
}

#[async_trait]
impl Solver for DebateOrchestrator {
    fn name(&self) -> &'static str {
        "debate"
    }

    async fn solve(&self, problem: &str) -> SolveResult {
        DebateOrchestrator::solve(self, problem).await
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
