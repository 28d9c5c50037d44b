//! An [`LpBackend`] which uses the HiGHS solver.
use super::{BackendError, LinearProgram, LpBackend, LpSolution, LpStatus, SolveOptions};
use crate::log::solver_output_enabled;
use highs::{HighsModelStatus, Model, RowProblem, Sense};
use log::warn;

/// Solves problems with HiGHS.
///
/// A new HiGHS instance is created for every solve, so a single backend can be shared between
/// threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct HighsBackend;

/// Convert a HiGHS model status into an [`LpStatus`].
///
/// Statuses indicating that HiGHS itself went wrong are returned as an error.
fn convert_status(status: HighsModelStatus) -> Result<LpStatus, String> {
    match status {
        HighsModelStatus::Optimal => Ok(LpStatus::Optimal),
        HighsModelStatus::Infeasible => Ok(LpStatus::Infeasible),
        HighsModelStatus::Unbounded => Ok(LpStatus::Unbounded),
        HighsModelStatus::UnboundedOrInfeasible => Ok(LpStatus::UnboundedOrInfeasible),
        HighsModelStatus::ReachedTimeLimit => Ok(LpStatus::TimeLimit),
        HighsModelStatus::ReachedIterationLimit => Ok(LpStatus::IterationLimit),
        HighsModelStatus::LoadError
        | HighsModelStatus::ModelError
        | HighsModelStatus::PresolveError
        | HighsModelStatus::SolveError
        | HighsModelStatus::PostsolveError => Err(format!("model status {status:?}")),
        other => Ok(LpStatus::Other(format!("{other:?}"))),
    }
}

/// Apply solver options to the model
fn configure(model: &mut Model, options: &SolveOptions) {
    // HiGHS writes to stdout, so only let it do so when debugging
    let output = solver_output_enabled();
    model.set_option("output_flag", output);
    model.set_option("log_to_console", output);

    if let Some(time_limit) = options.time_limit {
        model.set_option("time_limit", time_limit.as_secs_f64());
    }
}

impl LpBackend for HighsBackend {
    fn name(&self) -> &str {
        "HiGHS"
    }

    fn solve(
        &self,
        problem: &LinearProgram,
        options: &SolveOptions,
    ) -> Result<LpSolution, BackendError> {
        // The token may have been cancelled while the problem was being built
        if options.is_cancelled() {
            return Ok(LpSolution::without_values(LpStatus::Cancelled));
        }

        let mut highs_problem = RowProblem::default();
        let columns: Vec<_> = problem
            .variables()
            .iter()
            .map(|var| highs_problem.add_column(var.coefficient, var.min..=var.max))
            .collect();
        for constraint in problem.constraints() {
            highs_problem.add_row(
                constraint.min..=constraint.max,
                constraint
                    .terms
                    .iter()
                    .map(|(var, coeff)| (columns[var.index()], *coeff)),
            );
        }

        let mut model = highs_problem.optimise(Sense::Minimise);
        configure(&mut model, options);

        let solved = model.try_solve().map_err(|status| {
            BackendError::new(self.name(), format!("solve failed with status {status:?}"))
        })?;
        let status = convert_status(solved.status())
            .map_err(|message| BackendError::new(self.name(), message))?;
        if status != LpStatus::Optimal {
            return Ok(LpSolution::without_values(status));
        }

        let values = solved.get_solution().columns().to_vec();
        if values.len() != problem.num_variables() {
            warn!(
                "HiGHS returned {} values for {} variables",
                values.len(),
                problem.num_variables()
            );
            return Err(BackendError::new(
                self.name(),
                "solution has the wrong number of values",
            ));
        }

        Ok(LpSolution {
            status,
            values,
            objective_value: solved.objective_value(),
        })
    }
}
