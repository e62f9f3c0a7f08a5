//! Common interface of every problem solver.

use async_trait::async_trait;

use crate::trace::SolveResult;

/// A total function from a problem statement to a [`SolveResult`].
///
/// Implementations never fail outward: faults become `success = false`
/// results with a populated `error`.
#[async_trait]
pub trait Solver: Send + Sync {
    /// Short identifier for logs.
    fn name(&self) -> &'static str;

    async fn solve(&self, problem: &str) -> SolveResult;
}
