//! Role instructions and per-round prompt builders.

use super::orchestrator::ProtocolVariant;
use super::state::{DebateState, Role};

const PROPOSER_INSTRUCTIONS: &str = "You are Agent 1 (Proposer). Your role is to:
1. Carefully analyze math word problems
2. Break down the problem step-by-step
3. Propose a solution with clear reasoning
4. Accept criticism and correct your approach when it is justified

Be thorough and show your work clearly.
Always end your response with a single line of the form:
MY PROPOSED ANSWER: <number> <unit, if any>";

const CRITIC_INSTRUCTIONS: &str = "You are Agent 2 (Critic). Your role is to:
1. Carefully review Agent 1's reasoning
2. Solve the problem independently and compare results
3. Identify any logical errors or arithmetic mistakes
4. Check that every part of the problem was addressed

Be constructive and specific in your feedback.
Always end your response with exactly these two lines:
VERDICT: CORRECT or VERDICT: INCORRECT
MY ANSWER: <number> <unit, if any>";

const LEGACY_PROPOSER_INSTRUCTIONS: &str = "You are Agent 1 (Proposer). Your role is to:
1. Carefully analyze math word problems
2. Break down the problem step-by-step
3. Propose a solution with clear reasoning
4. Be open to criticism and refine your approach

Be thorough and show your work clearly.";

const LEGACY_CRITIC_INSTRUCTIONS: &str = "You are Agent 2 (Critic). Your role is to:
1. Carefully review Agent 1's reasoning
2. Identify any logical errors or mistakes
3. Check if all parts of the problem were addressed
4. Suggest improvements or confirm if the solution is correct

Be constructive and specific in your feedback.";

/// System-level instructions for a role.
pub fn role_instructions(protocol: ProtocolVariant, role: Role) -> &'static str {
    match (protocol, role) {
        (ProtocolVariant::Structured, Role::Proposer) => PROPOSER_INSTRUCTIONS,
        (ProtocolVariant::Structured, Role::Critic) => CRITIC_INSTRUCTIONS,
        (ProtocolVariant::Legacy, Role::Proposer) => LEGACY_PROPOSER_INSTRUCTIONS,
        (ProtocolVariant::Legacy, Role::Critic) => LEGACY_CRITIC_INSTRUCTIONS,
    }
}

/// Proposer prompt: a fresh solution in the opening round, a correction
/// seeded with the critic's feedback afterwards.
pub fn proposer_prompt(protocol: ProtocolVariant, problem: &str, state: &DebateState) -> String {
    match protocol {
        ProtocolVariant::Structured if state.is_opening_round() => format!(
            "Solve this problem step by step:\n\n{problem}\n\n\
             Show your reasoning clearly and finish with 'MY PROPOSED ANSWER: <answer>'."
        ),
        ProtocolVariant::Structured => format!(
            "Agent 2 reviewed your previous solution and replied:\n\n{feedback}\n\n\
             Problem: {problem}\n\nDebate so far:{history}\n\n\
             Fix any mistakes the critic found (or explain why your answer stands) \
             and finish with 'MY PROPOSED ANSWER: <answer>'.",
            feedback = state.last_critique.as_deref().unwrap_or("(no feedback)"),
            history = state.history,
        ),
        ProtocolVariant::Legacy if state.is_opening_round() => format!(
            "Solve this problem step by step:\n\n{problem}\n\nShow your reasoning clearly."
        ),
        ProtocolVariant::Legacy => format!(
            "Based on Agent 2's feedback, refine your solution:\n\n{}",
            state.history
        ),
    }
}

/// Critic prompt. The structured protocol shows only the latest proposal;
/// the legacy protocol shows the whole transcript.
pub fn critic_prompt(protocol: ProtocolVariant, problem: &str, state: &DebateState) -> String {
    match protocol {
        ProtocolVariant::Structured => format!(
            "Review Agent 1's solution to this problem.\n\n\
             Problem: {problem}\n\n\
             Agent 1's latest solution:\n{proposal}\n\n\
             Solve the problem yourself, then decide whether Agent 1's final answer is right. \
             End with 'VERDICT: CORRECT' or 'VERDICT: INCORRECT', then 'MY ANSWER: <answer>'.",
            proposal = state.last_proposal.as_deref().unwrap_or(""),
        ),
        ProtocolVariant::Legacy => format!(
            "Review Agent 1's solution for this problem:\n\nProblem: {problem}\n\n{history}\n\n\
             Provide feedback: Is it correct? Any errors? Should anything be improved?",
            history = state.history,
        ),
    }
}
