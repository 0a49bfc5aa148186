//! Thin wrapper around tiny-solver's Levenberg-Marquardt optimizer.

use std::collections::HashMap;

use crate::problem::PoseProblem;
use crate::EgoPose;
use serde::{Deserialize, Serialize};
use tiny_solver::factors::na as ts_na;
use tiny_solver::linear::sparse::LinearSolverType;
use tiny_solver::optimizer::{Optimizer, OptimizerOptions};
use tiny_solver::problem::Problem;
use tiny_solver::LevenbergMarquardtOptimizer;

/// Solver settings mapped onto tiny-solver's optimizer options.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveOptions {
    pub max_iters: usize,
    /// Stop once an iteration lowers the cost by less than this.
    pub min_abs_decrease: f64,
    /// Same, relative to the current cost.
    pub min_rel_decrease: f64,
    /// Stop once the cost falls below this.
    pub min_error: f64,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            max_iters: 100,
            min_abs_decrease: 1e-10,
            min_rel_decrease: 1e-10,
            min_error: 1e-12,
        }
    }
}

impl SolveOptions {
    fn to_optimizer_options(self) -> OptimizerOptions {
        OptimizerOptions {
            max_iteration: self.max_iters,
            verbosity_level: 0,
            linear_solver_type: LinearSolverType::SparseCholesky,
            min_abs_error_decrease_threshold: self.min_abs_decrease,
            min_rel_error_decrease_threshold: self.min_rel_decrease,
            min_error_threshold: self.min_error,
            ..OptimizerOptions::default()
        }
    }
}

/// Diagnostics of one pose solve. Costs are `0.5 * sum(rho(|r|^2))`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveReport {
    pub initial_cost: f64,
    pub final_cost: f64,
    /// `false` when the optimizer gave up without a solution; the start
    /// pose is kept then.
    pub converged: bool,
    pub residual_blocks: usize,
}

/// Robust cost of `problem` at `values`.
fn robust_cost(problem: &Problem, values: &HashMap<String, ts_na::DVector<f64>>) -> f64 {
    let blocks = problem.initialize_parameter_blocks(values);
    let residuals = problem.compute_residuals(&blocks, true);
    0.5 * residuals.as_ref().squared_norm_l2()
}

/// Refine `start` against the residuals of `problem`.
pub fn solve(
    problem: &PoseProblem,
    start: &EgoPose,
    options: &SolveOptions,
) -> (EgoPose, SolveReport) {
    if problem.residual_count() == 0 {
        let report = SolveReport {
            initial_cost: 0.0,
            final_cost: 0.0,
            converged: true,
            residual_blocks: 0,
        };
        return (*start, report);
    }

    let (tiny, initial) = problem.build(start);
    let initial_cost = robust_cost(&tiny, &initial);

    let optimizer = LevenbergMarquardtOptimizer::default();
    let solved = optimizer
        .optimize(&tiny, &initial, Some(options.to_optimizer_options()))
        .and_then(|values| {
            let pose = problem.read_pose(&values)?;
            Some((pose, robust_cost(&tiny, &values)))
        });

    let (pose, final_cost, converged) = match solved {
        Some((pose, cost)) => (pose, cost, true),
        None => {
            log::debug!("optimizer returned no solution; keeping the start pose");
            (*start, initial_cost, false)
        }
    };
    let report = SolveReport {
        initial_cost,
        final_cost,
        converged,
        residual_blocks: problem.residual_count(),
    };
    (pose, report)
}
