//! The stages of a planning run: ingest, validate, solve and report.
//!
//! Each stage is a function of the output of the previous one, so the stages can also be used
//! separately (e.g. the `validate` command stops after [`prepare`]).
use crate::battery::BatterySpec;
use crate::dispatch::{DispatchSchedule, DispatchScheduler, validate_dispatch_inputs};
use crate::error::{InvalidInput, OptimisationError};
use crate::lp::{LpBackend, SolveOptions};
use crate::output::write_results;
use crate::project::Project;
use crate::sizing::{
    CapacityPlan, CapacitySizingSolver, GenerationPeriod, YieldFactors, validate_demand,
};
use crate::time_series::TimeSeriesInput;
use anyhow::{Context, Result};
use log::{info, warn};
use std::path::Path;

/// Validated inputs for the capacity sizing problem
#[derive(Debug, Clone, PartialEq)]
pub struct SizingTask {
    /// Hourly demand
    pub demand: TimeSeriesInput,
    /// Yield factor for each source
    pub yield_factors: YieldFactors,
}

/// Validated inputs for the battery dispatch problem
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchTask {
    /// Hourly generation, truncated to the forecast horizon
    pub generation: TimeSeriesInput,
    /// The battery to schedule
    pub battery: BatterySpec,
}

/// The problems to solve for a project
#[derive(Debug, Clone, PartialEq)]
pub struct SolveTasks {
    /// Capacity sizing, if the project has demand data
    pub sizing: Option<SizingTask>,
    /// Battery dispatch, if the project has generation data
    pub dispatch: Option<DispatchTask>,
}

/// The outcome of solving a project
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectResults {
    /// The capacity plan and resulting generation in each period
    pub sizing: Option<(CapacityPlan, Vec<GenerationPeriod>)>,
    /// The battery schedule
    pub dispatch: Option<DispatchSchedule>,
}

/// Validate a project's inputs and assemble the problems to solve.
///
/// Parameters are only required for the problems which have time series data.
pub fn prepare(project: &Project) -> Result<SolveTasks, InvalidInput> {
    let sizing = project
        .demand
        .as_ref()
        .map(|demand| {
            let yield_factors = project.parameters.yield_factors();
            validate_demand(demand)?;
            yield_factors.validate()?;
            Ok::<_, InvalidInput>(SizingTask {
                demand: demand.clone(),
                yield_factors,
            })
        })
        .transpose()?;

    let dispatch = project
        .generation
        .as_ref()
        .map(|generation| {
            let battery = project.parameters.battery_spec()?;
            let generation = match project.parameters.forecast_horizon_periods()? {
                Some(periods) => {
                    if periods > generation.len() {
                        warn!(
                            "Forecast horizon of {periods} periods is longer than the {} periods \
                            of generation data",
                            generation.len()
                        );
                    }
                    generation.truncated(periods)?
                }
                None => generation.clone(),
            };
            validate_dispatch_inputs(&generation, &battery)?;
            Ok::<_, InvalidInput>(DispatchTask {
                generation,
                battery,
            })
        })
        .transpose()?;

    Ok(SolveTasks { sizing, dispatch })
}

/// Solve every problem in `tasks`
pub fn solve(
    tasks: &SolveTasks,
    backend: &dyn LpBackend,
    options: &SolveOptions,
) -> Result<ProjectResults, OptimisationError> {
    let sizing = match &tasks.sizing {
        Some(task) => {
            let plan = CapacitySizingSolver::new(backend)
                .with_options(options.clone())
                .solve(&task.demand, &task.yield_factors)?;
            let profile = plan.generation_profile(&task.demand)?;
            Some((plan, profile))
        }
        None => None,
    };

    let dispatch = tasks
        .dispatch
        .as_ref()
        .map(|task| {
            DispatchScheduler::new(backend)
                .with_options(options.clone())
                .schedule(&task.generation, &task.battery)
        })
        .transpose()?;

    Ok(ProjectResults { sizing, dispatch })
}

/// Load, validate and solve the project in `project_dir`
pub fn run(
    project_dir: &Path,
    backend: &dyn LpBackend,
    options: &SolveOptions,
) -> Result<(Project, ProjectResults)> {
    let project = Project::from_path(project_dir).context("Failed to load project.")?;
    info!(
        "Loaded project {} from {}",
        project.config.name,
        project_dir.display()
    );

    let tasks = prepare(&project).context("Invalid project inputs.")?;
    let results = solve(&tasks, backend, options)?;

    Ok((project, results))
}

/// Load, validate, solve and write the results of the project in `project_dir`
pub fn run_and_report(
    project_dir: &Path,
    output_path: &Path,
    backend: &dyn LpBackend,
    options: &SolveOptions,
) -> Result<ProjectResults> {
    let (project, results) = run(project_dir, backend, options)?;
    write_results(output_path, &project, &results)?;
    info!("Results written to {}", output_path.display());

    Ok(results)
}
