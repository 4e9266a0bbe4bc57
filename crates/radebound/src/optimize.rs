use crate::combinatorics::LogSum;
use crate::constants::{
    DEFAULT_INITIAL_STEP, DEFAULT_LOWER_BOUND, DEFAULT_MAX_ITERS, DEFAULT_OBJECTIVE_TOLERANCE,
    DEFAULT_PARAM_TOLERANCE,
};
use crate::weights::OptimizationPoint;

use argmin::core::{
    CostFunction, Error, Executor, IterState, KV, Problem, Solver, State, TerminationReason,
    TerminationStatus,
};
use log::{debug, warn};
use serde::Serialize;

/// f(s) = ln(1 + Σ (1 + w)·exp(s²·c)) / s over the data points.
#[derive(Debug, Clone, Copy)]
pub struct MgfObjective<'a> {
    points: &'a [OptimizationPoint],
}

impl<'a> MgfObjective<'a> {
    pub fn new(points: &'a [OptimizationPoint]) -> Self {
        Self { points }
    }

    pub fn value(&self, s: f64) -> f64 {
        let s_square = s * s;
        let mut sum = LogSum::zero();
        sum.add_ln(0.0);
        for point in self.points {
            sum.add_ln(point.ln_mass + s_square * point.factor);
        }
        sum.ln() / s
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub lower: f64,
    pub upper: f64,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            lower: DEFAULT_LOWER_BOUND,
            upper: f64::INFINITY,
        }
    }
}

/// Stopping rules handed to a [`Minimizer`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    /// Stop once the simplex vertices lie closer than this.
    pub param_abs: f64,
    /// Stop once a step that finds a new best point improves it by less than this.
    pub objective_abs: f64,
    pub max_iters: u64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            param_abs: DEFAULT_PARAM_TOLERANCE,
            objective_abs: DEFAULT_OBJECTIVE_TOLERANCE,
            max_iters: DEFAULT_MAX_ITERS,
        }
    }
}

impl Tolerances {
    fn is_valid(&self) -> bool {
        self.param_abs.is_finite()
            && self.param_abs > 0.0
            && self.objective_abs.is_finite()
            && self.objective_abs > 0.0
            && self.max_iters > 0
    }
}

/// Outcome of a minimization run. Only the two tolerance stops are successes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverStatus {
    ObjectiveToleranceReached,
    ParamToleranceReached,
    MaxItersReached,
    Failure,
    InvalidArgs,
    NonFinite,
}

impl SolverStatus {
    pub fn code(&self) -> i32 {
        match self {
            SolverStatus::ObjectiveToleranceReached => 3,
            SolverStatus::ParamToleranceReached => 4,
            SolverStatus::MaxItersReached => 5,
            SolverStatus::Failure => -1,
            SolverStatus::InvalidArgs => -2,
            SolverStatus::NonFinite => -3,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self,
            SolverStatus::ObjectiveToleranceReached | SolverStatus::ParamToleranceReached
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Minimum {
    pub argument: f64,
    pub value: f64,
    pub status: SolverStatus,
    pub iterations: u64,
}

impl Minimum {
    fn failed(status: SolverStatus, argument: f64) -> Self {
        Self {
            argument,
            value: f64::NAN,
            status,
            iterations: 0,
        }
    }
}

/// Gradient-free local minimizer of a scalar function over an interval.
pub trait Minimizer {
    fn minimize(
        &self,
        objective: &dyn Fn(f64) -> f64,
        initial_guess: f64,
        bounds: Bounds,
        tolerances: &Tolerances,
    ) -> Minimum;
}

/// Nelder-Mead on a two-vertex simplex, driven by argmin's executor.
#[derive(Debug, Clone, Copy)]
pub struct NelderMeadMinimizer {
    initial_step: f64,
}

impl Default for NelderMeadMinimizer {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_STEP)
    }
}

impl NelderMeadMinimizer {
    pub fn new(initial_step: f64) -> Self {
        Self { initial_step }
    }

    fn run(
        &self,
        objective: &dyn Fn(f64) -> f64,
        initial_guess: f64,
        bounds: Bounds,
        tolerances: &Tolerances,
    ) -> Result<Minimum, Error> {
        let problem = BoundedProblem { objective, bounds };
        let start = initial_guess.clamp(bounds.lower, bounds.upper);
        let solver = SimplexSearch::new(start, start + self.initial_step, tolerances);

        let result = Executor::new(problem, solver)
            .configure(|state| state.max_iters(tolerances.max_iters))
            .run()?;
        let state = &result.state;

        let status = match state.get_termination_status() {
            TerminationStatus::Terminated(TerminationReason::SolverConverged) => {
                match result.solver.stopped_by {
                    Some(StopRule::Param) => SolverStatus::ParamToleranceReached,
                    _ => SolverStatus::ObjectiveToleranceReached,
                }
            }
            TerminationStatus::Terminated(TerminationReason::MaxItersReached) => {
                SolverStatus::MaxItersReached
            }
            other => {
                debug!("Nelder-Mead stopped unexpectedly: {other:?}");
                SolverStatus::Failure
            }
        };

        let Some(&argument) = state.get_best_param() else {
            return Ok(Minimum::failed(SolverStatus::Failure, start));
        };
        let argument = argument.clamp(bounds.lower, bounds.upper);
        let value = objective(argument);
        if !value.is_finite() {
            return Ok(Minimum::failed(SolverStatus::NonFinite, argument));
        }

        Ok(Minimum {
            argument,
            value,
            status,
            iterations: state.get_iter(),
        })
    }
}

impl Minimizer for NelderMeadMinimizer {
    fn minimize(
        &self,
        objective: &dyn Fn(f64) -> f64,
        initial_guess: f64,
        bounds: Bounds,
        tolerances: &Tolerances,
    ) -> Minimum {
        let step_ok = self.initial_step.is_finite() && self.initial_step > 0.0;
        let bounds_ok = bounds.lower.is_finite() && bounds.lower < bounds.upper;
        if !step_ok || !bounds_ok || !initial_guess.is_finite() || !tolerances.is_valid() {
            return Minimum::failed(SolverStatus::InvalidArgs, initial_guess);
        }

        match self.run(objective, initial_guess, bounds, tolerances) {
            Ok(minimum) => {
                if minimum.status == SolverStatus::MaxItersReached {
                    warn!(
                        "Iteration budget of {} exhausted at s = {} without converging",
                        tolerances.max_iters, minimum.argument
                    );
                }
                minimum
            }
            Err(e) => {
                warn!("Nelder-Mead error: {e}");
                Minimum::failed(SolverStatus::Failure, initial_guess)
            }
        }
    }
}

/// The objective seen by the solver: projected onto the bounds, plus a penalty
/// that grows with the distance outside them.
struct BoundedProblem<'a> {
    objective: &'a dyn Fn(f64) -> f64,
    bounds: Bounds,
}

impl CostFunction for BoundedProblem<'_> {
    type Param = f64;
    type Output = f64;

    fn cost(&self, s: &Self::Param) -> Result<Self::Output, Error> {
        let projected = s.clamp(self.bounds.lower, self.bounds.upper);
        Ok((self.objective)(projected) + (s - projected).abs())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopRule {
    Objective,
    Param,
}

type SimplexState = IterState<f64, (), (), (), (), f64>;

/// One-dimensional Nelder-Mead (reflection 1, expansion 2, contraction and
/// shrink 1/2).
///
/// Invariant: `vertices[0]` is the best vertex after every step.
struct SimplexSearch {
    vertices: [(f64, f64); 2],
    /// decrease of the best value in the last step, if that step moved the best vertex
    improvement: Option<f64>,
    param_abs: f64,
    objective_abs: f64,
    stopped_by: Option<StopRule>,
}

impl SimplexSearch {
    fn new(a: f64, b: f64, tolerances: &Tolerances) -> Self {
        Self {
            vertices: [(a, f64::NAN), (b, f64::NAN)],
            improvement: None,
            param_abs: tolerances.param_abs,
            objective_abs: tolerances.objective_abs,
            stopped_by: None,
        }
    }

    /// Restores the best-first order and reports whether the best vertex changed.
    fn sort(&mut self) -> bool {
        let swap = self.vertices[1].1.total_cmp(&self.vertices[0].1).is_lt();
        if swap {
            self.vertices.swap(0, 1);
        }
        swap
    }

    fn state_of(&self, state: SimplexState) -> SimplexState {
        let (x, f) = self.vertices[0];
        state.param(x).cost(f)
    }
}

impl<O> Solver<O, SimplexState> for SimplexSearch
where
    O: CostFunction<Param = f64, Output = f64>,
{
    const NAME: &'static str = "Nelder-Mead (1-D)";

    fn init(
        &mut self,
        problem: &mut Problem<O>,
        state: SimplexState,
    ) -> Result<(SimplexState, Option<KV>), Error> {
        for vertex in &mut self.vertices {
            vertex.1 = problem.cost(&vertex.0)?;
        }
        self.sort();
        Ok((self.state_of(state), None))
    }

    fn next_iter(
        &mut self,
        problem: &mut Problem<O>,
        state: SimplexState,
    ) -> Result<(SimplexState, Option<KV>), Error> {
        let [(best, f_best), (worst, f_worst)] = self.vertices;

        let reflected = best + (best - worst);
        let f_reflected = problem.cost(&reflected)?;

        let replacement = if f_reflected < f_best {
            let expanded = best + 2.0 * (reflected - best);
            let f_expanded = problem.cost(&expanded)?;
            Some(if f_expanded < f_reflected {
                (expanded, f_expanded)
            } else {
                (reflected, f_reflected)
            })
        } else if f_reflected < f_worst {
            let contracted = best + 0.5 * (reflected - best);
            let f_contracted = problem.cost(&contracted)?;
            (f_contracted <= f_reflected).then_some((contracted, f_contracted))
        } else {
            let contracted = best + 0.5 * (worst - best);
            let f_contracted = problem.cost(&contracted)?;
            (f_contracted < f_worst).then_some((contracted, f_contracted))
        };

        self.vertices[1] = match replacement {
            Some(vertex) => vertex,
            None => {
                let shrunk = best + 0.5 * (worst - best);
                (shrunk, problem.cost(&shrunk)?)
            }
        };
        self.improvement = self.sort().then(|| f_best - self.vertices[0].1);
        Ok((self.state_of(state), None))
    }

    fn terminate(&mut self, _state: &SimplexState) -> TerminationStatus {
        let [(x0, _), (x1, _)] = self.vertices;
        self.stopped_by = if self.improvement.is_some_and(|d| d < self.objective_abs) {
            Some(StopRule::Objective)
        } else if (x0 - x1).abs() < self.param_abs {
            Some(StopRule::Param)
        } else {
            None
        };
        match self.stopped_by {
            Some(_) => TerminationStatus::Terminated(TerminationReason::SolverConverged),
            None => TerminationStatus::NotTerminated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn example_points() -> Vec<OptimizationPoint> {
        // two-transaction dataset `1 2 -1 -2` / `1 -1 -2` at threshold 1
        vec![
            OptimizationPoint { factor: 0.25, ln_mass: 0.0 },
            OptimizationPoint { factor: 0.125, ln_mass: 0.0 },
            OptimizationPoint { factor: 0.25, ln_mass: 3f64.ln() },
        ]
    }

    fn wide_points() -> Vec<OptimizationPoint> {
        (1..=50)
            .map(|i| OptimizationPoint {
                factor: i as f64 / (2.0 * 1000.0 * 1000.0),
                ln_mass: (i as f64 * 7.0).ln_1p() * 40.0,
            })
            .collect()
    }

    fn assert_unimodal(values: &[f64]) {
        let (argmin, _) = values
            .iter()
            .enumerate()
            .fold((0, f64::INFINITY), |acc, (i, &v)| if v < acc.1 { (i, v) } else { acc });
        for w in values[..=argmin].windows(2) {
            assert!(w[1] <= w[0] + 1e-12, "not non-increasing before the minimum");
        }
        for w in values[argmin..].windows(2) {
            assert!(w[1] + 1e-12 >= w[0], "not non-decreasing after the minimum");
        }
    }

    #[test]
    fn test_objective_direct_formula() {
        let points = example_points();
        let objective = MgfObjective::new(&points);
        for s in [1.0f64, 2.0, 3.5] {
            let e4 = (s * s / 4.0).exp();
            let e8 = (s * s / 8.0).exp();
            let want = (1.0 + e4 + e8 + 3.0 * e4).ln() / s;
            assert!((objective.value(s) - want).abs() < 1e-12);
        }
    }

    #[test]
    fn test_objective_finite_at_large_s() {
        let points = example_points();
        let objective = MgfObjective::new(&points);
        let v = objective.value(1000.0);
        assert!(v.is_finite());
        // dominated by 4·exp(s²/4)
        assert!((v - (250_000.0 + 4f64.ln()) / 1000.0).abs() < 1e-6);
    }

    #[test]
    fn test_objective_is_unimodal() {
        for points in [example_points(), wide_points()] {
            let objective = MgfObjective::new(&points);
            let values: Vec<f64> = (0..4000)
                .map(|i| objective.value(1.0 + i as f64 * 0.5))
                .collect();
            assert_unimodal(&values);
        }
    }

    #[test]
    fn test_nelder_mead_finds_sweep_minimum() {
        let points = example_points();
        let objective = MgfObjective::new(&points);
        let f = |s: f64| objective.value(s);
        let minimum =
            NelderMeadMinimizer::default().minimize(&f, 1000.0, Bounds::default(), &Tolerances::default());

        assert!(minimum.status.is_success());
        let swept = (0..20_000)
            .map(|i| objective.value(1.0 + i as f64 * 1e-3))
            .fold(f64::INFINITY, f64::min);
        assert!(minimum.value <= swept + 1e-6);
        assert!(minimum.argument > 2.0 && minimum.argument < 3.5);
    }

    #[test]
    fn test_nelder_mead_respects_lower_bound() {
        // minimum of (s - 0.2)^2 lies below the bound
        let f = |s: f64| (s - 0.2) * (s - 0.2);
        let minimum =
            NelderMeadMinimizer::default().minimize(&f, 50.0, Bounds::default(), &Tolerances::default());
        assert!(minimum.status.is_success());
        assert!(minimum.argument >= 1.0);
        assert!((minimum.argument - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_invalid_configuration() {
        let f = |s: f64| s;
        let tolerances = Tolerances {
            objective_abs: -1.0,
            ..Tolerances::default()
        };
        let minimum = NelderMeadMinimizer::default().minimize(&f, 10.0, Bounds::default(), &tolerances);
        assert_eq!(minimum.status, SolverStatus::InvalidArgs);
        assert_eq!(minimum.status.code(), -2);

        let minimum = NelderMeadMinimizer::new(0.0).minimize(
            &f,
            10.0,
            Bounds::default(),
            &Tolerances::default(),
        );
        assert!(!minimum.status.is_success());
    }

    #[test]
    fn test_iteration_budget_exhausted_is_a_failure() {
        let points = wide_points();
        let objective = MgfObjective::new(&points);
        let f = |s: f64| objective.value(s);
        let tolerances = Tolerances {
            max_iters: 2,
            ..Tolerances::default()
        };
        let minimum = NelderMeadMinimizer::default().minimize(&f, 1000.0, Bounds::default(), &tolerances);
        assert_eq!(minimum.status, SolverStatus::MaxItersReached);
        assert_eq!(minimum.status.code(), 5);
        assert!(!minimum.status.is_success());
        assert_eq!(minimum.iterations, 2);
    }

    #[test]
    fn test_param_tolerance_stops_the_search() {
        let f = |s: f64| (s - PI) * (s - PI);
        let loose = Tolerances {
            param_abs: 1e-3,
            objective_abs: 1e-300,
            max_iters: 10_000,
        };
        let stopped = NelderMeadMinimizer::new(1.0).minimize(&f, 10.0, Bounds::default(), &loose);
        assert_eq!(stopped.status, SolverStatus::ParamToleranceReached);
        assert_eq!(stopped.status.code(), 4);
        assert!((stopped.argument - PI).abs() < 1e-2);

        let tight = Tolerances {
            param_abs: 1e-9,
            ..loose
        };
        let refined = NelderMeadMinimizer::new(1.0).minimize(&f, 10.0, Bounds::default(), &tight);
        assert_eq!(refined.status, SolverStatus::ParamToleranceReached);
        assert!(refined.iterations > stopped.iterations);
        assert!((refined.argument - PI).abs() < 1e-8);
    }

    #[test]
    fn test_objective_tolerance_stops_the_search() {
        let f = |s: f64| (s - PI) * (s - PI);
        let tolerances = Tolerances {
            param_abs: 1e-300,
            objective_abs: 1e-6,
            max_iters: 10_000,
        };
        let minimum = NelderMeadMinimizer::new(1.0).minimize(&f, 10.0, Bounds::default(), &tolerances);
        assert_eq!(minimum.status, SolverStatus::ObjectiveToleranceReached);
        assert!(minimum.value < 1e-4);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(SolverStatus::ObjectiveToleranceReached.code(), 3);
        assert_eq!(SolverStatus::ParamToleranceReached.code(), 4);
        assert_eq!(SolverStatus::MaxItersReached.code(), 5);
        assert!(SolverStatus::ParamToleranceReached.is_success());
        assert!(!SolverStatus::MaxItersReached.is_success());
        assert_eq!(SolverStatus::Failure.code(), -1);
        assert_eq!(SolverStatus::NonFinite.code(), -3);
        assert!(!SolverStatus::NonFinite.is_success());
    }
}
