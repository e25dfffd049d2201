mod problem;
mod simplex;
mod solution;

pub use problem::{validate, Constraint, ConstraintOp, InvalidProblem, LinearProgram};
pub use simplex::Solver;
pub use solution::{Solution, SolveOutcome};
