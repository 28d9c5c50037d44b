//! Provides data structures and functions for formulating and solving linear programs.
//!
//! Problems are described with a [`LinearProgram`], which is independent of any particular solver,
//! and handed to an [`LpBackend`] to be solved. All problems are minimisations.
use crate::error::{OptimisationError, ProblemKind};
use log::debug;
use std::ops::{Bound, RangeBounds};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;

mod highs_backend;
pub use highs_backend::HighsBackend;

/// A decision variable in a [`LinearProgram`].
///
/// Note that this type does **not** include the value of the variable; it just refers to a
/// particular column of the problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Variable(usize);

impl Variable {
    /// The column index of the variable
    pub fn index(self) -> usize {
        self.0
    }
}

/// The definition of a variable to be optimised.
///
/// The coefficient is the multiplying factor of the variable in the objective function, i.e. the Cs
/// in:
///
/// f = c1*x1 + c2*x2 + ...
///
/// with x1, x2... taking values between min and max.
#[derive(PartialEq, Debug, Clone)]
pub struct VariableDefinition {
    /// The variable's minimum value
    pub min: f64,
    /// The variable's maximum value
    pub max: f64,
    /// The coefficient of the variable in the objective
    pub coefficient: f64,
}

/// A constraint for an optimisation.
///
/// Each constraint adds an inequality of the form:
///
/// min <= a1*x1 + a2*x2 + ... <= max
///
/// Often, constraints will impose only a min or a max value, with the other set to infinity or
/// minus infinity. Equality constraints have min == max.
#[derive(PartialEq, Debug, Clone)]
pub struct Constraint {
    /// The minimum value for the constraint
    pub min: f64,
    /// The maximum value for the constraint
    pub max: f64,
    /// Variables with a non-zero coefficient in this constraint
    pub terms: Vec<(Variable, f64)>,
}

/// Convert a range into lower and upper bounds, using infinities for open ends
fn range_to_bounds<B: RangeBounds<f64>>(bounds: &B) -> (f64, f64) {
    let min = match bounds.start_bound() {
        Bound::Included(x) | Bound::Excluded(x) => *x,
        Bound::Unbounded => f64::NEG_INFINITY,
    };
    let max = match bounds.end_bound() {
        Bound::Included(x) | Bound::Excluded(x) => *x,
        Bound::Unbounded => f64::INFINITY,
    };

    (min, max)
}

/// A linear program to be minimised
#[derive(Default, Debug, Clone, PartialEq)]
pub struct LinearProgram {
    variables: Vec<VariableDefinition>,
    constraints: Vec<Constraint>,
}

impl LinearProgram {
    /// Add a variable with the given objective coefficient and bounds
    pub fn add_variable<B: RangeBounds<f64>>(&mut self, coefficient: f64, bounds: B) -> Variable {
        let (min, max) = range_to_bounds(&bounds);
        self.variables.push(VariableDefinition {
            min,
            max,
            coefficient,
        });

        Variable(self.variables.len() - 1)
    }

    /// Add a constraint bounding a linear combination of variables
    pub fn add_constraint<B, I>(&mut self, bounds: B, terms: I)
    where
        B: RangeBounds<f64>,
        I: IntoIterator<Item = (Variable, f64)>,
    {
        let (min, max) = range_to_bounds(&bounds);
        let terms: Vec<_> = terms.into_iter().collect();
        assert!(
            terms.iter().all(|(var, _)| var.0 < self.variables.len()),
            "Constraint refers to a variable which is not in the problem"
        );

        self.constraints.push(Constraint { min, max, terms });
    }

    /// The variables in the problem, in the order they were added
    pub fn variables(&self) -> &[VariableDefinition] {
        &self.variables
    }

    /// The constraints in the problem, in the order they were added
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// The number of variables
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// The number of constraints
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }
}

/// The terminal status of a solve
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum LpStatus {
    /// An optimal solution was found
    #[display("optimal")]
    Optimal,
    /// No solution satisfies the constraints
    #[display("infeasible")]
    Infeasible,
    /// The objective can be decreased without limit
    #[display("unbounded")]
    Unbounded,
    /// The solver could only establish that the problem is unbounded or infeasible
    #[display("unbounded or infeasible")]
    UnboundedOrInfeasible,
    /// The time limit was reached before the solve finished
    #[display("time limit reached")]
    TimeLimit,
    /// The iteration limit was reached before the solve finished
    #[display("iteration limit reached")]
    IterationLimit,
    /// The caller cancelled the solve
    #[display("cancelled")]
    Cancelled,
    /// Any other non-optimal status, as reported by the backend
    #[display("{_0}")]
    Other(String),
}

impl LpStatus {
    /// Whether the solve was stopped early rather than running to completion
    pub fn is_interrupted(&self) -> bool {
        matches!(
            self,
            LpStatus::TimeLimit | LpStatus::IterationLimit | LpStatus::Cancelled
        )
    }
}

/// The result of a solve
#[derive(Debug, Clone, PartialEq)]
pub struct LpSolution {
    /// The terminal status
    pub status: LpStatus,
    /// The value of each variable. Empty unless the status is optimal.
    pub values: Vec<f64>,
    /// The objective value. Only meaningful if the status is optimal.
    pub objective_value: f64,
}

impl LpSolution {
    /// A solution with a non-optimal status and no values
    pub fn without_values(status: LpStatus) -> Self {
        Self {
            status,
            values: Vec::new(),
            objective_value: f64::NAN,
        }
    }

    /// The value of the given variable
    pub fn value(&self, var: Variable) -> f64 {
        self.values[var.0]
    }
}

/// Indicates that the LP backend itself failed, as opposed to reporting a non-optimal status
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{backend}: {message}")]
pub struct BackendError {
    /// The name of the backend
    pub backend: String,
    /// A description of the failure
    pub message: String,
}

impl BackendError {
    /// Create a new [`BackendError`]
    pub fn new(backend: &str, message: impl Into<String>) -> Self {
        Self {
            backend: backend.to_string(),
            message: message.into(),
        }
    }
}

/// A flag which can be used to cancel a solve from another thread.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Create a new token which has not been cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Caller-supplied limits for a solve
#[derive(Debug, Clone, Default)]
pub struct SolveOptions {
    /// The maximum time the backend may spend solving
    pub time_limit: Option<Duration>,
    /// A token which, once cancelled, stops the solve from starting
    pub cancel: Option<CancellationToken>,
}

impl SolveOptions {
    /// Set a time limit for the solve
    pub fn with_time_limit(self, time_limit: Duration) -> Self {
        Self {
            time_limit: Some(time_limit),
            ..self
        }
    }

    /// Attach a cancellation token
    pub fn with_cancellation(self, token: CancellationToken) -> Self {
        Self {
            cancel: Some(token),
            ..self
        }
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

/// An LP solver
pub trait LpBackend: Send + Sync {
    /// A human-readable name for the backend
    fn name(&self) -> &str;

    /// Minimise the given problem.
    ///
    /// A non-optimal outcome (e.g. infeasibility) is reported through [`LpSolution::status`]. An
    /// `Err` is only returned if the backend itself failed.
    fn solve(
        &self,
        problem: &LinearProgram,
        options: &SolveOptions,
    ) -> Result<LpSolution, BackendError>;
}

/// Solve a problem, returning an error unless an optimal solution was found.
///
/// # Arguments
///
/// * `backend` - The LP solver to use
/// * `problem` - The problem to minimise
/// * `options` - Time limit and cancellation
/// * `kind` - Which problem this is, for error reporting
/// * `horizon` - The number of periods covered by the problem, for error reporting
pub fn solve_optimal(
    backend: &dyn LpBackend,
    problem: &LinearProgram,
    options: &SolveOptions,
    kind: ProblemKind,
    horizon: usize,
) -> Result<LpSolution, OptimisationError> {
    if options.is_cancelled() {
        return Err(OptimisationError::Interrupted {
            problem: kind,
            status: LpStatus::Cancelled,
            horizon,
        });
    }

    debug!(
        "Solving {kind} problem with {} variables and {} constraints using {}",
        problem.num_variables(),
        problem.num_constraints(),
        backend.name()
    );
    let start = Instant::now();
    let solution =
        backend
            .solve(problem, options)
            .map_err(|source| OptimisationError::Backend {
                problem: kind,
                horizon,
                source,
            })?;
    debug!(
        "{} finished {kind} solve in {:.3}s with status: {}",
        backend.name(),
        start.elapsed().as_secs_f64(),
        solution.status
    );

    match solution.status {
        LpStatus::Optimal => Ok(solution),
        status if status.is_interrupted() => Err(OptimisationError::Interrupted {
            problem: kind,
            status,
            horizon,
        }),
        status => Err(OptimisationError::Infeasible {
            problem: kind,
            status,
            horizon,
        }),
    }
}
