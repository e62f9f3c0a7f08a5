//! Mocked debate integration test: exercises the full debate loop
//! with deterministic stub model callers (no network).
//!
//! Covers: orchestrator ↔ prompts ↔ extraction ↔ trace running together,
//! including faults, panics and concurrent runs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use coordination::debate::FAILED_ANSWER;
use coordination::{
    DebateConfig, DebateOrchestrator, DebatePhase, FaultKind, FaultPolicy, ModelCaller,
    ModelReply, ModelRequest, ProtocolVariant, Speaker, TransportFault, Verdict,
};

/// Answers by role. Each role replays its script and then repeats the last
/// entry, so the reply depends only on the role and its call count.
struct RoleScript {
    proposer: Vec<ModelReply>,
    critic: Vec<ModelReply>,
    proposer_calls: AtomicUsize,
    critic_calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl RoleScript {
    fn new(proposer: &[&str], critic: &[&str]) -> Arc<Self> {
        Self::replies(
            proposer.iter().map(|t| ModelReply::Text(t.to_string())).collect(),
            critic.iter().map(|t| ModelReply::Text(t.to_string())).collect(),
        )
    }

    fn replies(proposer: Vec<ModelReply>, critic: Vec<ModelReply>) -> Arc<Self> {
        Arc::new(Self {
            proposer,
            critic,
            proposer_calls: AtomicUsize::new(0),
            critic_calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn total_calls(&self) -> usize {
        self.proposer_calls.load(Ordering::SeqCst) + self.critic_calls.load(Ordering::SeqCst)
    }

    fn pick(script: &[ModelReply], counter: &AtomicUsize) -> ModelReply {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        script[n.min(script.len() - 1)].clone()
    }
}

#[async_trait]
impl ModelCaller for RoleScript {
    async fn call(&self, request: &ModelRequest) -> ModelReply {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        if request.role_instructions.contains("Agent 2 (Critic)") {
            Self::pick(&self.critic, &self.critic_calls)
        } else {
            Self::pick(&self.proposer, &self.proposer_calls)
        }
    }
}

/// Answers by role, stateless.
struct Stateless;

#[async_trait]
impl ModelCaller for Stateless {
    async fn call(&self, request: &ModelRequest) -> ModelReply {
        if request.role_instructions.contains("Agent 2 (Critic)") {
            ModelReply::Text("Step 3 is off.\nVERDICT: INCORRECT\nMY ANSWER: 47".into())
        } else {
            ModelReply::Text("8 + 13 + 26 = 46\nMY PROPOSED ANSWER: 46".into())
        }
    }
}

struct Panicking;

#[async_trait]
impl ModelCaller for Panicking {
    async fn call(&self, _request: &ModelRequest) -> ModelReply {
        panic!("stub caller exploded");
    }
}

fn config(max_rounds: u32) -> DebateConfig {
    DebateConfig {
        max_rounds,
        timestamps: false,
        ..Default::default()
    }
}

const MARBLES: &str = "Tom has twice as many marbles as Jerry. Jerry has 5 more marbles than \
Bobby. If Bobby has 8 marbles, how many marbles do they have in total?";

#[tokio::test]
async fn test_consensus_stops_the_loop() {
    let caller = RoleScript::new(
        &["MY PROPOSED ANSWER: 46", "Fixed Tom.\nMY PROPOSED ANSWER: 47"],
        &[
            "Tom has 26.\nVERDICT: INCORRECT\nMY ANSWER: 47",
            "Now right.\nVERDICT: CORRECT\nMY ANSWER: 47",
        ],
    );
    let orch = DebateOrchestrator::with_config(caller.clone(), config(5));
    let outcome = orch.run(MARBLES).await;

    assert!(outcome.result.success);
    assert_eq!(outcome.result.final_answer, "47");
    assert_eq!(outcome.terminal_phase, DebatePhase::Resolved);
    assert_eq!(outcome.rounds_completed(), 2);
    assert_eq!(caller.total_calls(), 4);
    assert_eq!(outcome.rounds[0].verdict, Verdict::Incorrect);
    assert!(outcome.rounds[1].consensus);
    assert!(outcome.result.error.is_none());
}

#[tokio::test]
async fn test_exhaustion_uses_critic_last_answer() {
    let caller = RoleScript::new(
        &["MY PROPOSED ANSWER: 46"],
        &["VERDICT: INCORRECT\nMY ANSWER: 48", "VERDICT: INCORRECT\nMY ANSWER: 49"],
    );
    let orch = DebateOrchestrator::with_config(caller.clone(), config(3));
    let outcome = orch.run(MARBLES).await;

    assert!(outcome.result.success);
    assert_eq!(outcome.result.final_answer, "49");
    assert_eq!(outcome.terminal_phase, DebatePhase::Exhausted);
    assert_eq!(caller.total_calls(), 6);
    assert_eq!(outcome.rounds_completed(), 3);
    assert!(!outcome.consensus_reached);
}

#[tokio::test]
async fn test_exhaustion_falls_back_to_proposer_then_sentinel() {
    let caller = RoleScript::new(&["MY PROPOSED ANSWER: 46"], &["VERDICT: INCORRECT"]);
    let orch = DebateOrchestrator::with_config(caller, config(2));
    assert_eq!(orch.solve(MARBLES).await.final_answer, "46");

    let caller = RoleScript::new(&["I cannot work this out."], &["VERDICT: INCORRECT"]);
    let orch = DebateOrchestrator::with_config(caller, config(2));
    assert_eq!(orch.solve(MARBLES).await.final_answer, "Unable to determine");
}

#[tokio::test]
async fn test_steps_are_numbered_without_gaps() {
    let orch = DebateOrchestrator::with_config(Arc::new(Stateless), config(3));
    let result = orch.solve(MARBLES).await;

    assert_eq!(result.total_steps as usize, result.reasoning_steps.len());
    for (i, step) in result.reasoning_steps.iter().enumerate() {
        assert_eq!(step.step_number as usize, i + 1);
    }
    assert_eq!(result.reasoning_steps[0].agent, Speaker::System);
    assert_eq!(
        result.reasoning_steps.last().unwrap().content,
        "FINAL ANSWER: 47"
    );
}

#[tokio::test]
async fn test_repeat_runs_are_identical() {
    let orch = DebateOrchestrator::with_config(Arc::new(Stateless), config(2));
    let first = orch.solve(MARBLES).await;
    let second = orch.solve(MARBLES).await;

    assert_eq!(first.final_answer, second.final_answer);
    assert_eq!(first.total_steps, second.total_steps);
    assert_eq!(first.transcript(), second.transcript());
}

#[tokio::test]
async fn test_concurrent_runs_share_nothing() {
    let orch = DebateOrchestrator::with_config(Arc::new(Stateless), config(2));
    let (a, b) = tokio::join!(orch.run("problem A: 1 + 1"), orch.run("problem B: 2 + 2"));

    assert_ne!(a.solve_id, b.solve_id);
    assert_eq!(a.result.total_steps, b.result.total_steps);
    assert!(a.result.reasoning_steps[0].content.ends_with("problem A: 1 + 1"));
    assert!(b.result.reasoning_steps[0].content.ends_with("problem B: 2 + 2"));
}

#[tokio::test]
async fn test_revision_prompt_carries_critic_feedback() {
    let caller = RoleScript::new(
        &["MY PROPOSED ANSWER: 46"],
        &["You forgot Bobby.\nVERDICT: INCORRECT\nMY ANSWER: 47"],
    );
    let orch = DebateOrchestrator::with_config(caller.clone(), config(2));
    orch.solve(MARBLES).await;

    let prompts = caller.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 4);
    assert!(prompts[0].contains(MARBLES));
    assert!(prompts[1].contains("MY PROPOSED ANSWER: 46"));
    assert!(prompts[2].contains("You forgot Bobby."));
}

#[tokio::test]
async fn test_fault_is_fed_forward_as_content() {
    let fault = TransportFault::new(FaultKind::Network, "connection refused");
    let caller = RoleScript::replies(
        vec![ModelReply::Fault(fault)],
        vec![ModelReply::Text("VERDICT: INCORRECT".into())],
    );
    let orch = DebateOrchestrator::with_config(caller.clone(), config(2));
    let result = orch.solve(MARBLES).await;

    assert!(result.success);
    assert_eq!(caller.total_calls(), 4);
    assert_eq!(result.final_answer, "Unable to determine");
    assert!(result
        .reasoning_steps
        .iter()
        .any(|s| s.agent == Speaker::Proposer && s.content == "Error: network: connection refused"));
    let error = result.error.unwrap();
    assert!(error.starts_with("2 model call fault(s)"));
}

#[tokio::test]
async fn test_fault_digits_never_become_the_answer() {
    let status = TransportFault::new(FaultKind::Status, "503 - Service Unavailable");
    let network = TransportFault::new(
        FaultKind::Network,
        "error sending request for url (http://127.0.0.1:8080/v1/chat/completions)",
    );
    let caller = RoleScript::replies(
        vec![ModelReply::Fault(status)],
        vec![ModelReply::Fault(network)],
    );
    let outcome = DebateOrchestrator::with_config(caller.clone(), config(2))
        .run(MARBLES)
        .await;

    assert!(outcome.result.success);
    assert_eq!(outcome.result.final_answer, "Unable to determine");
    assert_eq!(outcome.terminal_phase, DebatePhase::Exhausted);
    assert_eq!(caller.total_calls(), 4);
    for round in &outcome.rounds {
        assert_eq!(round.proposer_answer, None);
        assert_eq!(round.critic_answer, None);
        assert_eq!(round.verdict, Verdict::Unclear);
    }
    assert!(outcome
        .result
        .reasoning_steps
        .iter()
        .any(|s| s.agent == Speaker::Proposer
            && s.content == "Error: status: 503 - Service Unavailable"));
    assert!(outcome.result.error.unwrap().starts_with("4 model call fault(s)"));
}

#[tokio::test]
async fn test_critic_fault_falls_back_to_proposer_answer() {
    let caller = RoleScript::replies(
        vec![ModelReply::Text("8 + 13 + 26 = 47\nMY PROPOSED ANSWER: 47".into())],
        vec![ModelReply::Fault(TransportFault::new(
            FaultKind::RateLimited,
            "429 - retry after 20s",
        ))],
    );
    let result = DebateOrchestrator::with_config(caller, config(1))
        .solve(MARBLES)
        .await;

    assert!(result.success);
    assert_eq!(result.final_answer, "47");
}

#[tokio::test]
async fn test_short_circuit_on_critic_fault() {
    let caller = RoleScript::replies(
        vec![ModelReply::Text("MY PROPOSED ANSWER: 46".into())],
        vec![
            ModelReply::Text("VERDICT: INCORRECT\nMY ANSWER: 47".into()),
            ModelReply::Fault(TransportFault::new(FaultKind::RateLimited, "slow down")),
        ],
    );
    let mut cfg = config(3);
    cfg.fault_policy = FaultPolicy::ShortCircuit;
    let outcome = DebateOrchestrator::with_config(caller.clone(), cfg)
        .run(MARBLES)
        .await;

    assert!(!outcome.result.success);
    assert_eq!(outcome.result.final_answer, FAILED_ANSWER);
    assert_eq!(outcome.terminal_phase, DebatePhase::Aborted);
    assert_eq!(outcome.rounds_completed(), 1);
    assert_eq!(caller.total_calls(), 4);
    assert!(outcome.result.error.unwrap().contains("critic call failed in round 2"));
}

#[tokio::test]
async fn test_panicking_caller_becomes_failed_result() {
    let orch = DebateOrchestrator::with_config(Arc::new(Panicking), config(3));
    let outcome = orch.run(MARBLES).await;

    assert!(!outcome.result.success);
    assert_eq!(outcome.result.final_answer, FAILED_ANSWER);
    assert_eq!(outcome.terminal_phase, DebatePhase::Aborted);
    let error = outcome.result.error.as_deref().unwrap();
    assert!(error.contains("stub caller exploded"));
    let last = outcome.result.reasoning_steps.last().unwrap();
    assert!(last.content.starts_with("ERROR: "));
    assert_eq!(outcome.result.total_steps as usize, outcome.result.reasoning_steps.len());
}

#[tokio::test]
async fn test_legacy_protocol_approval_and_extraction() {
    let caller = RoleScript::new(
        &["Bobby 8, Jerry 13, Tom 26.\nThe final answer: 47"],
        &["Looks good to me."],
    );
    let mut cfg = config(3);
    cfg.protocol = ProtocolVariant::Legacy;
    let outcome = DebateOrchestrator::with_config(caller.clone(), cfg)
        .run(MARBLES)
        .await;

    assert!(outcome.result.success);
    assert_eq!(outcome.result.final_answer, "47");
    assert!(outcome.consensus_reached);
    assert_eq!(caller.total_calls(), 2);
}

#[tokio::test]
async fn test_legacy_protocol_exhaustion_uses_last_proposal() {
    let caller = RoleScript::new(
        &["Maybe 40", "Then 45 = 45"],
        &["Recheck Tom, he needs doubling."],
    );
    let mut cfg = config(2);
    cfg.protocol = ProtocolVariant::Legacy;
    let result = DebateOrchestrator::with_config(caller, cfg).solve(MARBLES).await;

    assert!(result.success);
    assert_eq!(result.final_answer, "45");
    assert!(result
        .reasoning_steps
        .iter()
        .any(|s| s.content == "Max rounds reached. Using Agent 1's final proposal."));
}
