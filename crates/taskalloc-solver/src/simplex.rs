use tracing::{debug, trace};

use crate::problem::{Constraint, ConstraintOp, InvalidProblem, LinearProgram};
use crate::solution::{Solution, SolveOutcome};

/// Two-phase simplex solver for minimum-time allocation problems
pub struct Solver {
    /// Maximum pivots before the solve is reported as non-convergent
    max_iterations: usize,
    /// Tolerance for floating point comparisons
    tolerance: f64,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            max_iterations: 10000,
            tolerance: 1e-9,
        }
    }
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    /// Solve the program with the two-phase simplex method.
    ///
    /// Each call is independent and reads only immutable data, so a single
    /// `Solver` may be shared freely across threads.
    pub fn solve(&self, program: &LinearProgram) -> SolveOutcome {
        let n = program.num_tasks();
        if n == 0 {
            return SolveOutcome::Solved(Solution::empty());
        }

        // Presolve: a task outside every constraint has a strictly positive
        // cost and a lower bound of zero, so its optimum is zero. Fix it
        // there instead of carrying a column through the tableau.
        let active = self.active_variables(program);
        if active.len() < n {
            debug!(
                fixed = n - active.len(),
                active = active.len(),
                "presolve: tasks outside every constraint allocate zero"
            );
        }
        if active.is_empty() {
            return SolveOutcome::Solved(Solution {
                allocation: vec![0.0; n],
                objective_value: 0.0,
            });
        }

        let mut position = vec![usize::MAX; n];
        for (k, &i) in active.iter().enumerate() {
            position[i] = k;
        }

        let costs: Vec<f64> = active.iter().map(|&i| program.costs()[i]).collect();
        let mut rows = Vec::with_capacity(program.num_limits() + program.constraints().len());

        for (j, &limit) in program.limits().iter().enumerate() {
            let mut coefficients = vec![0.0; active.len()];
            coefficients[position[j]] = 1.0;
            rows.push(Constraint {
                name: format!("limit[{j}]"),
                coefficients,
                op: ConstraintOp::Le,
                rhs: limit,
            });
        }
        for c in program.constraints() {
            let mut coefficients = vec![0.0; active.len()];
            for (i, &coef) in c.coefficients.iter().enumerate() {
                if coef.abs() > self.tolerance {
                    coefficients[position[i]] = coef;
                }
            }
            rows.push(Constraint {
                name: c.name.clone(),
                coefficients,
                op: c.op,
                rhs: c.rhs,
            });
        }

        match self.minimize(&costs, &rows) {
            SimplexOutcome::Optimal(values) => {
                let mut allocation = vec![0.0; n];
                for (k, &i) in active.iter().enumerate() {
                    allocation[i] = values[k];
                }
                let objective_value = program
                    .costs()
                    .iter()
                    .zip(&allocation)
                    .map(|(cost, x)| cost * x)
                    .sum();
                SolveOutcome::Solved(Solution {
                    allocation,
                    objective_value,
                })
            }
            SimplexOutcome::Infeasible => SolveOutcome::Infeasible,
            SimplexOutcome::Unbounded => SolveOutcome::Unbounded,
            SimplexOutcome::IterationLimit => SolveOutcome::Invalid(InvalidProblem::NotConverged {
                max_iterations: self.max_iterations,
            }),
        }
    }

    /// Indices of tasks that appear in at least one constraint
    fn active_variables(&self, program: &LinearProgram) -> Vec<usize> {
        let n = program.num_tasks();
        let mut active = vec![false; n];
        for flag in active.iter_mut().take(program.num_limits()) {
            *flag = true;
        }
        for c in program.constraints() {
            for (i, &coef) in c.coefficients.iter().enumerate() {
                if coef.abs() > self.tolerance {
                    active[i] = true;
                }
            }
        }
        active
            .iter()
            .enumerate()
            .filter_map(|(i, &a)| a.then_some(i))
            .collect()
    }

    /// Minimize `Σ costs[i] * x[i]` over `x >= 0` subject to `constraints`
    fn minimize(&self, costs: &[f64], constraints: &[Constraint]) -> SimplexOutcome {
        if constraints.is_empty() {
            if costs.iter().any(|&c| c < -self.tolerance) {
                return SimplexOutcome::Unbounded;
            }
            return SimplexOutcome::Optimal(vec![0.0; costs.len()]);
        }

        let mut tableau = self.build_tableau(costs, constraints);
        debug!(
            n_vars = tableau.n_vars,
            n_constraints = constraints.len(),
            n_slack = tableau.n_slack,
            n_artificial = tableau.n_artificial,
            "tableau built"
        );

        if tableau.has_artificial {
            match self.phase1(&mut tableau) {
                Phase1Result::Feasible => {}
                Phase1Result::Infeasible => return SimplexOutcome::Infeasible,
                Phase1Result::IterationLimit => return SimplexOutcome::IterationLimit,
            }
        }

        let art_start = tableau.n_vars + tableau.n_slack;
        match self.run_phase(&mut tableau, art_start) {
            PhaseResult::Optimal => {}
            PhaseResult::Unbounded => return SimplexOutcome::Unbounded,
            PhaseResult::IterationLimit => return SimplexOutcome::IterationLimit,
        }

        SimplexOutcome::Optimal(self.extract_values(&tableau, costs.len()))
    }

    fn build_tableau(&self, costs: &[f64], constraints: &[Constraint]) -> Tableau {
        let n_vars = costs.len();
        let n_constraints = constraints.len();

        let mut n_slack = 0;
        let mut n_artificial = 0;
        for c in constraints {
            match c.op {
                ConstraintOp::Le => n_slack += 1,
                ConstraintOp::Ge => {
                    n_slack += 1; // surplus
                    n_artificial += 1;
                }
                ConstraintOp::Eq => n_artificial += 1,
            }
        }

        let total_cols = n_vars + n_slack + n_artificial + 1; // +1 for RHS
        let total_rows = n_constraints + 1; // +1 for objective

        let mut tableau = Tableau {
            data: vec![vec![0.0; total_cols]; total_rows],
            basic_vars: vec![0; n_constraints],
            n_vars,
            n_slack,
            n_artificial,
            has_artificial: n_artificial > 0,
        };

        let mut slack_idx = n_vars;
        let mut artificial_idx = n_vars + n_slack;

        for (i, c) in constraints.iter().enumerate() {
            trace!(name = %c.name, op = ?c.op, rhs = c.rhs, "constraint row");
            for (j, &coef) in c.coefficients.iter().enumerate() {
                tableau.data[i][j] = coef;
            }

            // RHS must be non-negative; flip the row if it is not
            let mut rhs = c.rhs;
            let mut flip = false;
            if rhs < 0.0 {
                rhs = -rhs;
                flip = true;
                for j in 0..n_vars {
                    tableau.data[i][j] = -tableau.data[i][j];
                }
            }
            tableau.data[i][total_cols - 1] = rhs;

            match c.op {
                ConstraintOp::Le => {
                    let sign = if flip { -1.0 } else { 1.0 };
                    tableau.data[i][slack_idx] = sign;
                    tableau.basic_vars[i] = slack_idx;
                    slack_idx += 1;
                }
                ConstraintOp::Ge => {
                    let sign = if flip { 1.0 } else { -1.0 };
                    tableau.data[i][slack_idx] = sign; // surplus
                    slack_idx += 1;
                    tableau.data[i][artificial_idx] = 1.0;
                    tableau.basic_vars[i] = artificial_idx;
                    artificial_idx += 1;
                }
                ConstraintOp::Eq => {
                    tableau.data[i][artificial_idx] = 1.0;
                    tableau.basic_vars[i] = artificial_idx;
                    artificial_idx += 1;
                }
            }
        }

        // Simplex maximizes, so minimization negates the coefficients; the
        // objective row holds the reduced costs
        let obj_row = n_constraints;
        for (j, &cost) in costs.iter().enumerate() {
            tableau.data[obj_row][j] = -cost;
        }

        tableau
    }

    /// Drive the artificial variables out of the basis
    fn phase1(&self, tableau: &mut Tableau) -> Phase1Result {
        let n_constraints = tableau.data.len() - 1;
        let n_cols = tableau.data[0].len();
        let art_start = tableau.n_vars + tableau.n_slack;

        let orig_obj = tableau.data[n_constraints].clone();

        // Auxiliary objective: maximize -Σ artificials (= minimize Σ)
        for j in 0..n_cols {
            tableau.data[n_constraints][j] = 0.0;
        }
        for j in art_start..(art_start + tableau.n_artificial) {
            tableau.data[n_constraints][j] = -1.0;
        }

        // Cancel the -1 coefficients of the basic artificials
        for i in 0..n_constraints {
            if tableau.basic_vars[i] >= art_start {
                for j in 0..n_cols {
                    tableau.data[n_constraints][j] += tableau.data[i][j];
                }
            }
        }

        match self.run_phase(tableau, n_cols - 1) {
            PhaseResult::Optimal => {}
            // The auxiliary objective is bounded, so a missing pivot row
            // means the original constraints cannot be satisfied
            PhaseResult::Unbounded => return Phase1Result::Infeasible,
            PhaseResult::IterationLimit => return Phase1Result::IterationLimit,
        }

        // Any artificial still positive means no feasible point exists
        let rhs_col = n_cols - 1;
        for i in 0..n_constraints {
            if tableau.basic_vars[i] >= art_start && tableau.data[i][rhs_col].abs() > self.tolerance
            {
                debug!("phase 1 left a positive artificial, problem is infeasible");
                return Phase1Result::Infeasible;
            }
        }

        // Restore the original objective, re-expressed in the current basis
        tableau.data[n_constraints] = orig_obj;
        for i in 0..n_constraints {
            let basic = tableau.basic_vars[i];
            if tableau.data[n_constraints][basic].abs() > self.tolerance {
                let ratio = tableau.data[n_constraints][basic];
                for j in 0..n_cols {
                    tableau.data[n_constraints][j] -= ratio * tableau.data[i][j];
                }
            }
        }

        Phase1Result::Feasible
    }

    /// Pivot until optimal, unbounded, or the iteration cap is reached.
    /// Columns at `active_cols` and beyond never enter the basis.
    fn run_phase(&self, tableau: &mut Tableau, active_cols: usize) -> PhaseResult {
        let mut pivots = 0;
        for _ in 0..self.max_iterations {
            let Some(col) = self.entering_column(tableau, active_cols) else {
                debug!(pivots, "phase complete");
                return PhaseResult::Optimal;
            };
            let Some(row) = self.leaving_row(tableau, col) else {
                return PhaseResult::Unbounded;
            };
            trace!(row, col, "pivot");
            self.pivot(tableau, row, col);
            pivots += 1;
        }
        if self.entering_column(tableau, active_cols).is_none() {
            PhaseResult::Optimal
        } else {
            // Improvement is still possible; never pass off the current
            // vertex as the optimum
            PhaseResult::IterationLimit
        }
    }

    /// Bland's rule under descending column order: deterministic and
    /// cycle-free, and it keeps low-index tasks out of the basis, so
    /// degenerate ties resolve toward the lexicographically smallest
    /// allocation.
    fn entering_column(&self, tableau: &Tableau, active_cols: usize) -> Option<usize> {
        let obj_row = tableau.data.len() - 1;
        (0..active_cols)
            .rev()
            .find(|&j| tableau.data[obj_row][j] > self.tolerance)
    }

    fn leaving_row(&self, tableau: &Tableau, col: usize) -> Option<usize> {
        let n_constraints = tableau.data.len() - 1;
        let rhs_col = tableau.data[0].len() - 1;

        let mut best: Option<(f64, usize)> = None;
        for i in 0..n_constraints {
            let val = tableau.data[i][col];
            if val <= self.tolerance {
                continue;
            }
            let ratio = tableau.data[i][rhs_col] / val;
            if ratio < 0.0 {
                continue;
            }
            match best {
                None => best = Some((ratio, i)),
                Some((best_ratio, best_row)) => {
                    if ratio < best_ratio - self.tolerance {
                        best = Some((ratio, i));
                    } else if (ratio - best_ratio).abs() <= self.tolerance
                        && tableau.basic_vars[i] > tableau.basic_vars[best_row]
                    {
                        // Same descending order as the entering rule
                        best = Some((ratio, i));
                    }
                }
            }
        }
        best.map(|(_, i)| i)
    }

    fn pivot(&self, tableau: &mut Tableau, row: usize, col: usize) {
        let n_rows = tableau.data.len();
        let n_cols = tableau.data[0].len();

        tableau.basic_vars[row] = col;

        let pivot_val = tableau.data[row][col];
        for j in 0..n_cols {
            tableau.data[row][j] /= pivot_val;
        }

        for i in 0..n_rows {
            if i != row {
                let factor = tableau.data[i][col];
                for j in 0..n_cols {
                    tableau.data[i][j] -= factor * tableau.data[row][j];
                }
            }
        }
    }

    fn extract_values(&self, tableau: &Tableau, n_vars: usize) -> Vec<f64> {
        let n_constraints = tableau.data.len() - 1;
        let rhs_col = tableau.data[0].len() - 1;

        let mut values = vec![0.0; n_vars];
        for i in 0..n_constraints {
            let basic = tableau.basic_vars[i];
            if basic < n_vars {
                let value = tableau.data[i][rhs_col];
                values[basic] = if value.abs() < self.tolerance { 0.0 } else { value };
            }
        }
        values
    }
}

struct Tableau {
    data: Vec<Vec<f64>>,
    basic_vars: Vec<usize>,
    n_vars: usize,
    n_slack: usize,
    n_artificial: usize,
    has_artificial: bool,
}

#[derive(Debug, PartialEq)]
enum SimplexOutcome {
    Optimal(Vec<f64>),
    Infeasible,
    Unbounded,
    IterationLimit,
}

enum PhaseResult {
    Optimal,
    Unbounded,
    IterationLimit,
}

enum Phase1Result {
    Feasible,
    Infeasible,
    IterationLimit,
}
