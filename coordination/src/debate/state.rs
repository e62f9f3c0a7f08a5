//! Debate state machine: phases, transitions, and per-run state.
//!
//! A [`DebateState`] is created fresh for every solve call, mutated round by
//! round, and dropped once the result is built. Nothing in it is shared
//! between runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::extract::{Verdict, CRITIC_MARKER, PROPOSER_MARKER};
use crate::llm::TransportFault;
use crate::trace::Speaker;

/// Phase of a debate run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebatePhase {
    /// Created but not started.
    Idle,
    /// Waiting for the proposer's solution.
    ProposerTurn,
    /// Waiting for the critic's review.
    CriticTurn,
    /// Critic returned CORRECT.
    Resolved,
    /// Round cap hit without consensus.
    Exhausted,
    /// Stopped by an orchestration fault.
    Aborted,
}

impl DebatePhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Exhausted | Self::Aborted)
    }

    /// Valid transitions from this phase.
    pub fn valid_transitions(self) -> &'static [DebatePhase] {
        match self {
            Self::Idle => &[Self::ProposerTurn, Self::Aborted],
            Self::ProposerTurn => &[Self::CriticTurn, Self::Aborted],
            Self::CriticTurn => &[
                Self::ProposerTurn,
                Self::Resolved,
                Self::Exhausted,
                Self::Aborted,
            ],
            Self::Resolved | Self::Exhausted | Self::Aborted => &[],
        }
    }
}

impl std::fmt::Display for DebatePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::ProposerTurn => write!(f, "proposer_turn"),
            Self::CriticTurn => write!(f, "critic_turn"),
            Self::Resolved => write!(f, "resolved"),
            Self::Exhausted => write!(f, "exhausted"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// Debate role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Proposer,
    Critic,
}

impl Role {
    /// Trace label for this role.
    pub fn speaker(self) -> Speaker {
        match self {
            Self::Proposer => Speaker::Proposer,
            Self::Critic => Speaker::Critic,
        }
    }

    /// Answer marker this role is asked to emit.
    pub fn marker(self) -> &'static str {
        match self {
            Self::Proposer => PROPOSER_MARKER,
            Self::Critic => CRITIC_MARKER,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Proposer => write!(f, "proposer"),
            Self::Critic => write!(f, "critic"),
        }
    }
}

/// Record of one proposer→critic exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    /// Round number (1-indexed).
    pub round: u32,
    pub proposer_answer: Option<String>,
    pub critic_answer: Option<String>,
    pub verdict: Verdict,
    /// Whether this round ended the debate with consensus.
    pub consensus: bool,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

/// A phase transition record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateTransition {
    pub from: DebatePhase,
    pub to: DebatePhase,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}

/// Error for invalid state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub from: DebatePhase,
    pub to: DebatePhase,
    pub reason: String,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid transition {} → {}: {}",
            self.from, self.to, self.reason
        )
    }
}

impl std::error::Error for TransitionError {}

/// Accumulated state of one debate run.
#[derive(Debug, Clone)]
pub struct DebateState {
    pub phase: DebatePhase,
    /// Current round (1-indexed once started).
    pub current_round: u32,
    pub max_rounds: u32,
    /// Latest raw proposer response.
    pub last_proposal: Option<String>,
    /// Latest answer extracted from the proposer.
    pub proposer_answer: Option<String>,
    /// Latest raw critic response.
    pub last_critique: Option<String>,
    /// Latest answer extracted from the critic.
    pub critic_answer: Option<String>,
    pub verdict: Option<Verdict>,
    /// Running transcript fed into later prompts.
    pub history: String,
    pub rounds: Vec<RoundRecord>,
    pub transitions: Vec<DebateTransition>,
    /// Model call faults seen so far, already rendered.
    pub faults: Vec<String>,
    round_started_at: Option<DateTime<Utc>>,
}

impl DebateState {
    pub fn new(max_rounds: u32) -> Self {
        Self {
            phase: DebatePhase::Idle,
            current_round: 0,
            max_rounds,
            last_proposal: None,
            proposer_answer: None,
            last_critique: None,
            critic_answer: None,
            verdict: None,
            history: String::new(),
            rounds: Vec::new(),
            transitions: Vec::new(),
            faults: Vec::new(),
            round_started_at: None,
        }
    }

    /// Transition to a new phase with a reason.
    pub fn transition(&mut self, to: DebatePhase, reason: &str) -> Result<(), TransitionError> {
        if !self.phase.valid_transitions().contains(&to) {
            return Err(TransitionError {
                from: self.phase,
                to,
                reason: format!(
                    "not a valid transition (allowed: {:?})",
                    self.phase.valid_transitions()
                ),
            });
        }

        self.transitions.push(DebateTransition {
            from: self.phase,
            to,
            timestamp: Utc::now(),
            reason: reason.to_string(),
        });
        self.phase = to;

        // Each proposer turn opens a new round
        if to == DebatePhase::ProposerTurn {
            self.current_round += 1;
            self.round_started_at = Some(Utc::now());
        }

        Ok(())
    }

    /// Idle → ProposerTurn.
    pub fn start(&mut self) -> Result<(), TransitionError> {
        self.transition(DebatePhase::ProposerTurn, "debate started")
    }

    /// Move to `Aborted` unless the run already ended.
    pub fn abort(&mut self, reason: &str) {
        if !self.phase.is_terminal() {
            let _ = self.transition(DebatePhase::Aborted, reason);
        }
    }

    /// Whether this is the first round.
    pub fn is_opening_round(&self) -> bool {
        self.current_round <= 1
    }

    pub fn has_rounds_remaining(&self) -> bool {
        self.current_round < self.max_rounds
    }

    /// Store the proposer's turn and extend the transcript.
    pub fn record_proposal(&mut self, response: String, answer: Option<String>) {
        self.history
            .push_str(&format!("\n\nAgent 1's response:\n{}", response));
        self.last_proposal = Some(response);
        self.proposer_answer = answer;
    }

    /// Store the critic's turn, extend the transcript and close the round.
    pub fn record_critique(
        &mut self,
        response: String,
        answer: Option<String>,
        verdict: Verdict,
        consensus: bool,
    ) {
        self.history
            .push_str(&format!("\n\nAgent 2's feedback:\n{}", response));
        self.last_critique = Some(response);
        self.critic_answer = answer;
        self.verdict = Some(verdict);

        let started_at = self.round_started_at.unwrap_or_else(Utc::now);
        let duration_ms = (Utc::now() - started_at).num_milliseconds().max(0) as u64;
        self.rounds.push(RoundRecord {
            round: self.current_round,
            proposer_answer: self.proposer_answer.clone(),
            critic_answer: self.critic_answer.clone(),
            verdict,
            consensus,
            started_at,
            duration_ms,
        });
    }

    pub fn record_fault(&mut self, role: Role, fault: &TransportFault) {
        self.faults
            .push(format!("round {} {}: {}", self.current_round, role, fault));
    }

    /// Faults joined for `SolveResult.error`, if any happened.
    pub fn fault_summary(&self) -> Option<String> {
        if self.faults.is_empty() {
            return None;
        }
        Some(format!(
            "{} model call fault(s): {}",
            self.faults.len(),
            self.faults.join("; ")
        ))
    }

    /// Critic's last answer, else the proposer's.
    pub fn best_answer(&self) -> Option<&str> {
        self.critic_answer
            .as_deref()
            .or(self.proposer_answer.as_deref())
    }

    /// Compact status line.
    pub fn status_line(&self) -> String {
        format!(
            "[{}] round {}/{} | {} rounds recorded | verdict={}",
            self.phase,
            self.current_round,
            self.max_rounds,
            self.rounds.len(),
            self.verdict
                .map(|v| v.to_string())
                .unwrap_or_else(|| "none".to_string())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::FaultKind;

    #[test]
    fn test_new_state() {
        let state = DebateState::new(3);
        assert_eq!(state.phase, DebatePhase::Idle);
        assert_eq!(state.current_round, 0);
        assert!(state.history.is_empty());
        assert!(!state.phase.is_terminal());
    }

    #[test]
    fn test_start_opens_round_one() {
        let mut state = DebateState::new(3);
        state.start().unwrap();
        assert_eq!(state.phase, DebatePhase::ProposerTurn);
        assert_eq!(state.current_round, 1);
        assert!(state.is_opening_round());
    }

    #[test]
    fn test_full_round_cycle() {
        let mut state = DebateState::new(3);
        state.start().unwrap();
        state.transition(DebatePhase::CriticTurn, "proposal").unwrap();
        state.transition(DebatePhase::ProposerTurn, "revise").unwrap();
        assert_eq!(state.current_round, 2);
        assert!(!state.is_opening_round());
        state.transition(DebatePhase::CriticTurn, "proposal").unwrap();
        state.transition(DebatePhase::Resolved, "approved").unwrap();
        assert!(state.phase.is_terminal());
        assert_eq!(state.transitions.len(), 5);
    }

    #[test]
    fn test_invalid_transition() {
        let mut state = DebateState::new(3);
        let err = state.transition(DebatePhase::Resolved, "skip").unwrap_err();
        assert_eq!(err.from, DebatePhase::Idle);
        assert_eq!(err.to, DebatePhase::Resolved);
        assert!(err.to_string().contains("idle"));
    }

    #[test]
    fn test_terminal_phases_have_no_exits() {
        for phase in [DebatePhase::Resolved, DebatePhase::Exhausted, DebatePhase::Aborted] {
            assert!(phase.is_terminal());
            assert!(phase.valid_transitions().is_empty());
        }
    }

    #[test]
    fn test_abort_is_noop_when_terminal() {
        let mut state = DebateState::new(1);
        state.start().unwrap();
        state.transition(DebatePhase::CriticTurn, "p").unwrap();
        state.transition(DebatePhase::Exhausted, "cap").unwrap();
        state.abort("late failure");
        assert_eq!(state.phase, DebatePhase::Exhausted);

        let mut fresh = DebateState::new(1);
        fresh.abort("boom");
        assert_eq!(fresh.phase, DebatePhase::Aborted);
    }

    #[test]
    fn test_rounds_remaining() {
        let mut state = DebateState::new(2);
        state.start().unwrap();
        assert!(state.has_rounds_remaining());
        state.transition(DebatePhase::CriticTurn, "p").unwrap();
        state.transition(DebatePhase::ProposerTurn, "r").unwrap();
        assert!(!state.has_rounds_remaining());
    }

    #[test]
    fn test_history_accumulates_in_order() {
        let mut state = DebateState::new(3);
        state.start().unwrap();
        state.record_proposal("x is 5".into(), Some("5".into()));
        state.record_critique("x is 6".into(), Some("6".into()), Verdict::Incorrect, false);

        let p = state.history.find("Agent 1's response:\nx is 5").unwrap();
        let c = state.history.find("Agent 2's feedback:\nx is 6").unwrap();
        assert!(p < c);
        assert_eq!(state.rounds.len(), 1);
        assert_eq!(state.rounds[0].round, 1);
        assert_eq!(state.rounds[0].critic_answer.as_deref(), Some("6"));
    }

    #[test]
    fn test_best_answer_prefers_critic() {
        let mut state = DebateState::new(3);
        assert_eq!(state.best_answer(), None);
        state.proposer_answer = Some("5".into());
        assert_eq!(state.best_answer(), Some("5"));
        state.critic_answer = Some("6".into());
        assert_eq!(state.best_answer(), Some("6"));
    }

    #[test]
    fn test_fault_summary() {
        let mut state = DebateState::new(3);
        assert!(state.fault_summary().is_none());
        state.start().unwrap();
        state.record_fault(Role::Critic, &TransportFault::new(FaultKind::Timeout, "60s"));
        let summary = state.fault_summary().unwrap();
        assert!(summary.starts_with("1 model call fault(s)"));
        assert!(summary.contains("round 1 critic: Error: timeout: 60s"));
    }

    #[test]
    fn test_status_line() {
        let mut state = DebateState::new(3);
        state.start().unwrap();
        let line = state.status_line();
        assert!(line.contains("[proposer_turn]"));
        assert!(line.contains("round 1/3"));
        assert!(line.contains("verdict=none"));
    }

    #[test]
    fn test_role_labels() {
        assert_eq!(Role::Proposer.speaker(), Speaker::Proposer);
        assert_eq!(Role::Critic.marker(), "MY ANSWER:");
        assert_eq!(Role::Proposer.to_string(), "proposer");
    }
}
