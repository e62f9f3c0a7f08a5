//! Debate Orchestration: Proposer/Critic Refinement Loop
//!
//! Two roles of the same model take turns on a math word problem: the
//! proposer solves it, the critic reviews the solution and either accepts it
//! or answers with its own. The loop ends on consensus or at the round cap.
//!
//! # Debate Flow
//!
//! ```text
//! Idle → ProposerTurn → CriticTurn → [verdict CORRECT?]
//!   │         │              │              │
//!   │         └──────────────┘              ├─ Yes → Resolved
//!   │           (revise)                    ├─ No, rounds left → ProposerTurn
//!   │                                       └─ No, max rounds → Exhausted
//!   └─ orchestration fault at any point → Aborted
//! ```

pub mod orchestrator;
pub mod prompts;
pub mod state;

pub use orchestrator::{
    DebateConfig, DebateError, DebateOrchestrator, DebateOutcome, FaultPolicy, ProtocolVariant,
    RoleSettings, FAILED_ANSWER,
};
pub use state::{DebatePhase, DebateState, DebateTransition, Role, RoundRecord, TransitionError};
