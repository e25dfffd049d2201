use crate::problem::InvalidProblem;

/// The minimizing allocation found for a valid problem
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Solution {
    /// Optimal allocation per task, all entries non-negative
    pub allocation: Vec<f64>,
    /// Total weighted execution time `Σ cost[i] * allocation[i]`
    pub objective_value: f64,
}

/// The result of one solve call.
///
/// Always an explicit value: a missing solution is never collapsed into a
/// default number, so callers can tell "no solution exists" apart from
/// "the input was bad" and from a valid zero-cost optimum.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum SolveOutcome {
    /// An optimal allocation was found
    Solved(Solution),
    /// No allocation satisfies all constraints
    Infeasible,
    /// The objective has no finite minimum
    Unbounded,
    /// The problem was malformed or the solver hit its pivot cap
    Invalid(InvalidProblem),
}

impl Solution {
    /// The trivial solution to the zero-task problem
    pub fn empty() -> Self {
        Self {
            allocation: Vec::new(),
            objective_value: 0.0,
        }
    }
}

impl SolveOutcome {
    pub fn is_solved(&self) -> bool {
        matches!(self, SolveOutcome::Solved(_))
    }

    pub fn solution(&self) -> Option<&Solution> {
        match self {
            SolveOutcome::Solved(solution) => Some(solution),
            _ => None,
        }
    }
}
