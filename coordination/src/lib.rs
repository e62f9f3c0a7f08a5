//! Math Word Problem Coordination Library
//!
//! This library provides:
//! - A proposer/critic debate loop that refines a solution over bounded rounds
//! - Answer and verdict extraction from free-form model output
//! - An OpenAI-compatible model caller that reports faults as values
//! - Single-shot baselines (small hosted model, keyword arithmetic)
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use coordination::{ChatCompletionsCaller, DebateOrchestrator};
//!
//! # async fn demo() -> Result<(), reqwest::Error> {
//! let caller = ChatCompletionsCaller::new(
//!     "https://api.openai.com/v1/chat/completions",
//!     "sk-...",
//!     Duration::from_secs(60),
//! )?;
//! let result = DebateOrchestrator::new(Arc::new(caller))
//!     .solve("Bobby has 8 marbles...")
//!     .await;
//! println!("{}", result.final_answer);
//! # Ok(())
//! # }
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod debate;
pub mod extract;
pub mod llm;
pub mod single;
pub mod solver;
pub mod trace;

// Re-export debate types
pub use debate::{
    DebateConfig, DebateError, DebateOrchestrator, DebateOutcome, DebatePhase, FaultPolicy,
    ProtocolVariant, Role, RoleSettings, RoundRecord,
};

// Re-export extraction types
pub use extract::{extract, extract_legacy, extract_verdict, Matcher, MatcherChain, Verdict};

// Re-export model caller types
pub use llm::{ChatCompletionsCaller, FaultKind, ModelCaller, ModelReply, ModelRequest, TransportFault};

// Re-export single-shot solver types
pub use single::{RuleBasedSolver, SmallModelSolver};

pub use solver::Solver;
pub use trace::{ReasoningStep, ReasoningTrace, SolveResult, Speaker};
