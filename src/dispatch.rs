//! Scheduling battery charge and discharge against a contracted capacity.
//!
//! For each period `t` the problem has variables for charge, discharge, state of charge and
//! shortage. The state of charge evolves as:
//!
//! ```text
//! soc[t] = soc[t-1] + charge[t] - discharge[t],   soc[-1] = initial_soc
//! ```
//!
//! and shortage covers whatever generation and discharge cannot deliver of the contracted
//! capacity. The objective is to minimise the total penalty for shortages.
//!
//! Charging is not limited by generation and the battery may charge and discharge in the same
//! period. Round-trip losses are not modelled.
use crate::battery::BatterySpec;
use crate::error::{InvalidInput, OptimisationError, ProblemKind};
use crate::lp::{LinearProgram, LpBackend, LpStatus, SolveOptions, Variable, solve_optimal};
use crate::time_series::{PeriodLabel, TimeSeriesInput};
use crate::units::{Energy, Money, Power};
use log::info;

/// The name of the series containing total generation
pub const TOTAL_GENERATION_SERIES: &str = "total";

/// Shortages smaller than this are treated as zero when counting periods with a shortage
const SHORTAGE_TOLERANCE: f64 = 1e-9;

/// The schedule for a single period
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchPeriod {
    /// The period
    pub label: PeriodLabel,
    /// Total generation
    pub generation: Power,
    /// Charging power
    pub charge: Power,
    /// Discharging power
    pub discharge: Power,
    /// State of charge at the end of the period
    pub soc: Energy,
    /// Contracted capacity which could not be delivered
    pub shortage: Power,
    /// The penalty incurred for the shortage
    pub penalty: Money,
}

/// A battery schedule over the whole horizon
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchSchedule {
    /// One entry per input period, in order
    pub periods: Vec<DispatchPeriod>,
    /// The objective value, i.e. the total penalty
    pub objective_value: Money,
    /// The status reported by the LP backend
    pub status: LpStatus,
}

/// Summary metrics for a [`DispatchSchedule`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatchSummary {
    /// Total energy not delivered
    pub total_shortage: Energy,
    /// Total penalty for shortages
    pub total_penalty: Money,
    /// Total energy charged
    pub total_charge: Energy,
    /// Total energy discharged
    pub total_discharge: Energy,
    /// State of charge at the end of the horizon
    pub final_soc: Energy,
    /// The number of periods in which there was a shortage
    pub shortage_periods: usize,
}

impl DispatchSchedule {
    /// The number of periods
    pub fn len(&self) -> usize {
        self.periods.len()
    }

    /// Whether the schedule has no periods
    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    /// Compute summary metrics over the horizon
    pub fn summary(&self) -> DispatchSummary {
        DispatchSummary {
            total_shortage: self.periods.iter().map(|p| p.shortage.over_period()).sum(),
            total_penalty: self.periods.iter().map(|p| p.penalty).sum(),
            total_charge: self.periods.iter().map(|p| p.charge.over_period()).sum(),
            total_discharge: self.periods.iter().map(|p| p.discharge.over_period()).sum(),
            final_soc: self.periods.last().map(|p| p.soc).unwrap_or_default(),
            shortage_periods: self
                .periods
                .iter()
                .filter(|p| p.shortage.value() > SHORTAGE_TOLERANCE)
                .count(),
        }
    }
}

/// Check that a generation series and battery are suitable for scheduling, returning the total
/// generation in each period
pub fn validate_dispatch_inputs<'a>(
    generation: &'a TimeSeriesInput,
    battery: &BatterySpec,
) -> Result<&'a [f64], InvalidInput> {
    battery.validate()?;
    generation.require_series(TOTAL_GENERATION_SERIES)
}

/// The LP variables for a single period
struct PeriodVariables {
    charge: Variable,
    discharge: Variable,
    soc: Variable,
    shortage: Variable,
}

/// Formulate the dispatch problem
fn formulate(generation: &[f64], battery: &BatterySpec) -> (LinearProgram, Vec<PeriodVariables>) {
    let penalty = battery.penalty_rate().value();
    let mut problem = LinearProgram::default();
    let mut variables: Vec<PeriodVariables> = Vec::with_capacity(generation.len());
    for gen_t in generation {
        let vars = PeriodVariables {
            charge: problem.add_variable(0.0, 0.0..=battery.max_charge_rate.value()),
            discharge: problem.add_variable(0.0, 0.0..=battery.max_discharge_rate.value()),
            soc: problem.add_variable(0.0, 0.0..=battery.energy_capacity.value()),
            shortage: problem.add_variable(penalty, 0.0..),
        };

        // State of charge continuity
        match variables.last() {
            None => problem.add_constraint(
                battery.initial_soc.value()..=battery.initial_soc.value(),
                [(vars.soc, 1.0), (vars.charge, -1.0), (vars.discharge, 1.0)],
            ),
            Some(prev) => problem.add_constraint(
                0.0..=0.0,
                [
                    (vars.soc, 1.0),
                    (prev.soc, -1.0),
                    (vars.charge, -1.0),
                    (vars.discharge, 1.0),
                ],
            ),
        }

        // Contracted capacity must be delivered or counted as a shortage
        problem.add_constraint(
            (battery.contracted_capacity.value() - gen_t)..,
            [(vars.discharge, 1.0), (vars.shortage, 1.0)],
        );

        variables.push(vars);
    }

    (problem, variables)
}

/// Schedules a battery to minimise penalties for failing to deliver a contracted capacity
pub struct DispatchScheduler<'a> {
    backend: &'a dyn LpBackend,
    options: SolveOptions,
}

impl<'a> DispatchScheduler<'a> {
    /// Create a scheduler which uses the given backend
    pub fn new(backend: &'a dyn LpBackend) -> Self {
        Self {
            backend,
            options: SolveOptions::default(),
        }
    }

    /// Set the time limit and cancellation token for solves
    pub fn with_options(self, options: SolveOptions) -> Self {
        Self { options, ..self }
    }

    /// Find the battery schedule with the lowest total penalty.
    ///
    /// # Arguments
    ///
    /// * `generation` - A time series with a `total` generation series
    /// * `battery` - The battery to schedule
    pub fn schedule(
        &self,
        generation: &TimeSeriesInput,
        battery: &BatterySpec,
    ) -> Result<DispatchSchedule, OptimisationError> {
        let total = validate_dispatch_inputs(generation, battery)?;
        let horizon = total.len();
        let (problem, variables) = formulate(total, battery);
        let solution = solve_optimal(
            self.backend,
            &problem,
            &self.options,
            ProblemKind::Dispatch,
            horizon,
        )?;

        let penalty_rate = battery.penalty_rate();
        let periods = generation
            .labels()
            .iter()
            .zip(total)
            .zip(&variables)
            .map(|((label, gen_t), vars)| {
                let shortage = Power(solution.value(vars.shortage));
                DispatchPeriod {
                    label: *label,
                    generation: Power(*gen_t),
                    charge: Power(solution.value(vars.charge)),
                    discharge: Power(solution.value(vars.discharge)),
                    soc: Energy(solution.value(vars.soc)),
                    shortage,
                    penalty: shortage.over_period() * penalty_rate,
                }
            })
            .collect();
        let schedule = DispatchSchedule {
            periods,
            objective_value: Money(solution.objective_value),
            status: solution.status,
        };

        let summary = schedule.summary();
        info!(
            "Scheduled battery over {horizon} periods: {} with a shortage, total penalty {:.2}",
            summary.shortage_periods,
            summary.total_penalty.value()
        );

        Ok(schedule)
    }
}
