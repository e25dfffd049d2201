use thiserror::Error;

/// Why a problem definition was rejected instead of solved
#[derive(Error, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum InvalidProblem {
    #[error("costs must contain at least one task")]
    NoTasks,
    #[error("cost for task {index} is not a finite number")]
    NonFiniteCost { index: usize },
    #[error("cost for task {index} must be strictly positive, got {value}")]
    NonPositiveCost { index: usize, value: f64 },
    #[error("limit for resource {index} is not a finite number")]
    NonFiniteLimit { index: usize },
    #[error("limit for resource {index} must be non-negative, got {value}")]
    NegativeLimit { index: usize, value: f64 },
    #[error("{limits} resource limits for {tasks} tasks: each limit must bound an existing task")]
    TooManyLimits { limits: usize, tasks: usize },
    #[error("constraint '{name}' has {coefficients} coefficients for {tasks} tasks")]
    ConstraintArity {
        name: String,
        coefficients: usize,
        tasks: usize,
    },
    #[error("constraint '{name}' has a non-finite coefficient or bound")]
    NonFiniteConstraint { name: String },
    #[error("solver did not converge within {max_iterations} pivots")]
    NotConverged { max_iterations: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ConstraintOp {
    /// Less than or equal (<=)
    Le,
    /// Greater than or equal (>=)
    Ge,
    /// Equal (=)
    Eq,
}

/// A general linear constraint `Σ coefficients[i] * x[i] op rhs`
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Constraint {
    /// Name/label for the constraint (for diagnostics)
    pub name: String,
    /// Coefficients for each task variable
    pub coefficients: Vec<f64>,
    /// Comparison operator
    pub op: ConstraintOp,
    /// Right-hand side value
    pub rhs: f64,
}

/// A validated minimum-time allocation problem.
///
/// Minimize `Σ costs[i] * x[i]` subject to `x[j] <= limits[j]` for `j`
/// below the number of limits, any added general constraints, and
/// `x[i] >= 0` for every task. Constructed through [`validate`], which
/// guarantees strictly positive costs, non-negative limits, and no more
/// limits than tasks.
#[derive(Debug, Clone, Default)]
pub struct LinearProgram {
    costs: Vec<f64>,
    limits: Vec<f64>,
    constraints: Vec<Constraint>,
}

/// Normalize raw cost/limit sequences into a well-formed [`LinearProgram`].
///
/// Policy: every cost must be finite and strictly positive (a zero or
/// negative unit cost makes the objective ill-posed); every limit must be
/// finite and non-negative; a limit with no task to bound is rejected.
/// Pure function, never panics.
pub fn validate(costs: &[f64], limits: &[f64]) -> Result<LinearProgram, InvalidProblem> {
    if costs.is_empty() {
        return Err(InvalidProblem::NoTasks);
    }
    if limits.len() > costs.len() {
        return Err(InvalidProblem::TooManyLimits {
            limits: limits.len(),
            tasks: costs.len(),
        });
    }

    for (index, &value) in costs.iter().enumerate() {
        if !value.is_finite() {
            return Err(InvalidProblem::NonFiniteCost { index });
        }
        if value <= 0.0 {
            return Err(InvalidProblem::NonPositiveCost { index, value });
        }
    }

    for (index, &value) in limits.iter().enumerate() {
        if !value.is_finite() {
            return Err(InvalidProblem::NonFiniteLimit { index });
        }
        if value < 0.0 {
            return Err(InvalidProblem::NegativeLimit { index, value });
        }
    }

    Ok(LinearProgram {
        costs: costs.to_vec(),
        limits: limits.to_vec(),
        constraints: Vec::new(),
    })
}

impl LinearProgram {
    pub fn costs(&self) -> &[f64] {
        &self.costs
    }

    pub fn limits(&self) -> &[f64] {
        &self.limits
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn num_tasks(&self) -> usize {
        self.costs.len()
    }

    pub fn num_limits(&self) -> usize {
        self.limits.len()
    }

    /// Add a general constraint on top of the per-task limits.
    ///
    /// The base formulation has none; callers with external requirements
    /// (e.g. a minimum total allocation) express them here.
    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        coefficients: Vec<f64>,
        op: ConstraintOp,
        rhs: f64,
    ) -> Result<(), InvalidProblem> {
        let name = name.into();
        if coefficients.len() != self.costs.len() {
            return Err(InvalidProblem::ConstraintArity {
                name,
                coefficients: coefficients.len(),
                tasks: self.costs.len(),
            });
        }
        if !rhs.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            return Err(InvalidProblem::NonFiniteConstraint { name });
        }
        self.constraints.push(Constraint {
            name,
            coefficients,
            op,
            rhs,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_input() {
        let program = validate(&[12.5, 8.0, 3.2, 1.0, 7.7], &[40.0, 35.0, 20.0]).unwrap();
        assert_eq!(program.num_tasks(), 5);
        assert_eq!(program.num_limits(), 3);
        assert!(program.constraints().is_empty());
    }

    #[test]
    fn accepts_zero_limit() {
        // a zero capacity pins the task at zero but is still well-formed
        let program = validate(&[2.0, 3.0], &[5.0, 0.0]).unwrap();
        assert_eq!(program.limits(), &[5.0, 0.0]);
    }

    #[test]
    fn rejects_empty_costs() {
        assert_eq!(validate(&[], &[]).unwrap_err(), InvalidProblem::NoTasks);
    }

    #[test]
    fn rejects_negative_cost() {
        let err = validate(&[1.0, -1.0], &[]).unwrap_err();
        assert_eq!(
            err,
            InvalidProblem::NonPositiveCost {
                index: 1,
                value: -1.0
            }
        );
        assert!(err.to_string().contains("task 1"));
    }

    #[test]
    fn rejects_zero_cost() {
        let err = validate(&[0.0], &[]).unwrap_err();
        assert_eq!(err, InvalidProblem::NonPositiveCost { index: 0, value: 0.0 });
    }

    #[test]
    fn rejects_non_finite_cost() {
        let err = validate(&[1.0, f64::NAN], &[]).unwrap_err();
        assert_eq!(err, InvalidProblem::NonFiniteCost { index: 1 });
    }

    #[test]
    fn rejects_negative_limit() {
        let err = validate(&[1.0], &[-2.0]).unwrap_err();
        assert_eq!(
            err,
            InvalidProblem::NegativeLimit {
                index: 0,
                value: -2.0
            }
        );
        assert!(err.to_string().contains("limit for resource 0"));
    }

    #[test]
    fn rejects_non_finite_limit() {
        let err = validate(&[1.0], &[f64::INFINITY]).unwrap_err();
        assert_eq!(err, InvalidProblem::NonFiniteLimit { index: 0 });
    }

    #[test]
    fn rejects_more_limits_than_tasks() {
        let err = validate(&[1.0], &[2.0, 3.0]).unwrap_err();
        assert_eq!(err, InvalidProblem::TooManyLimits { limits: 2, tasks: 1 });
    }

    #[test]
    fn rejects_constraint_with_wrong_arity() {
        let mut program = validate(&[1.0, 2.0], &[]).unwrap();
        let err = program
            .add_constraint("demand", vec![1.0], ConstraintOp::Ge, 4.0)
            .unwrap_err();
        assert!(matches!(err, InvalidProblem::ConstraintArity { .. }));
    }

    #[test]
    fn rejects_constraint_with_non_finite_rhs() {
        let mut program = validate(&[1.0], &[]).unwrap();
        let err = program
            .add_constraint("demand", vec![1.0], ConstraintOp::Ge, f64::NAN)
            .unwrap_err();
        assert!(matches!(err, InvalidProblem::NonFiniteConstraint { .. }));
    }
}
