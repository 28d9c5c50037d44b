//! Sizing the installed capacity of each generation source against a demand series.
//!
//! The problem is a linear program with one variable per source:
//!
//! ```text
//! minimise    sum_s capacity[s]
//! subject to  sum_s capacity[s] * yield[s] >= demand[t]   for every period t
//!             capacity[s] >= 0
//! ```
use crate::error::{InvalidInput, OptimisationError, ProblemKind};
use crate::id::{SourceID, names_match};
use crate::lp::{LinearProgram, LpBackend, LpStatus, SolveOptions, solve_optimal};
use crate::time_series::{PeriodLabel, TimeSeriesInput};
use crate::units::{Dimensionless, Power};
use indexmap::IndexMap;
use log::{debug, info};

/// The name of the series containing demand
pub const DEMAND_SERIES: &str = "demand";

/// The fraction of installed capacity which each source delivers, assumed constant over time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct YieldFactors(IndexMap<SourceID, Dimensionless>);

impl FromIterator<(SourceID, Dimensionless)> for YieldFactors {
    fn from_iter<I: IntoIterator<Item = (SourceID, Dimensionless)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl YieldFactors {
    /// Get the yield factor for a source, matching the name case-insensitively
    pub fn get(&self, source: &str) -> Option<Dimensionless> {
        self.iter()
            .find(|(id, _)| names_match(id.as_str(), source))
            .map(|(_, factor)| factor)
    }

    /// Iterate over sources and their yield factors
    pub fn iter(&self) -> impl Iterator<Item = (&SourceID, Dimensionless)> {
        self.0.iter().map(|(id, factor)| (id, *factor))
    }

    /// The number of sources
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no sources
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check that there is at least one source and all factors are finite and non-negative
    pub fn validate(&self) -> Result<(), InvalidInput> {
        if self.is_empty() {
            return Err(InvalidInput::Parameter(
                "At least one generation source with a yield factor is required".into(),
            ));
        }
        for (id, factor) in self.iter() {
            if !factor.is_finite() || factor.value() < 0.0 {
                return Err(InvalidInput::Parameter(format!(
                    "Yield factor for {id} must be a finite, non-negative number (got {factor})"
                )));
            }
        }

        Ok(())
    }
}

/// Check that a demand series is present and non-negative, returning its values
pub fn validate_demand(demand: &TimeSeriesInput) -> Result<&[f64], InvalidInput> {
    let values = demand.require_series(DEMAND_SERIES)?;
    if let Some((label, value)) = demand
        .labels()
        .iter()
        .zip(values)
        .find(|(_, value)| **value < 0.0)
    {
        return Err(InvalidInput::InvalidSeriesValue {
            series: DEMAND_SERIES.into(),
            period: label.to_string(),
            value: *value,
        });
    }

    Ok(values)
}

/// The capacity to install for each source
#[derive(Debug, Clone, PartialEq)]
pub struct CapacityPlan {
    /// Installed capacity per source, in the same order as the yield factors
    pub capacities: IndexMap<SourceID, Power>,
    /// The yield factors the plan was sized with
    pub yield_factors: YieldFactors,
    /// The objective value, i.e. the total installed capacity
    pub objective_value: Power,
    /// The status reported by the LP backend
    pub status: LpStatus,
}

/// Generation in a single period under a [`CapacityPlan`]
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationPeriod {
    /// The period
    pub label: PeriodLabel,
    /// Demand in this period
    pub demand: Power,
    /// Generation from each source
    pub generation: IndexMap<SourceID, Power>,
    /// Total generation from all sources
    pub total: Power,
    /// Generation in excess of demand
    pub surplus: Power,
}

impl CapacityPlan {
    /// The capacity for a source, matching the name case-insensitively
    pub fn capacity(&self, source: &str) -> Option<Power> {
        self.capacities
            .iter()
            .find(|(id, _)| names_match(id.as_str(), source))
            .map(|(_, capacity)| *capacity)
    }

    /// Total installed capacity across sources
    pub fn total_capacity(&self) -> Power {
        self.capacities.values().copied().sum()
    }

    /// Compute generation from each source in every period of a demand series
    pub fn generation_profile(
        &self,
        demand: &TimeSeriesInput,
    ) -> Result<Vec<GenerationPeriod>, InvalidInput> {
        let values = demand.require_series(DEMAND_SERIES)?;
        let profile = demand
            .labels()
            .iter()
            .zip(values)
            .map(|(label, demand)| {
                let generation: IndexMap<_, _> = self
                    .capacities
                    .iter()
                    .map(|(id, capacity)| {
                        let factor = self.yield_factors.get(id.as_str()).unwrap_or_default();
                        (id.clone(), *capacity * factor)
                    })
                    .collect();
                let total: Power = generation.values().copied().sum();

                GenerationPeriod {
                    label: *label,
                    demand: Power(*demand),
                    generation,
                    total,
                    surplus: total - Power(*demand),
                }
            })
            .collect();

        Ok(profile)
    }
}

/// Sizes generation capacity so that demand is met in every period
pub struct CapacitySizingSolver<'a> {
    backend: &'a dyn LpBackend,
    options: SolveOptions,
}

impl<'a> CapacitySizingSolver<'a> {
    /// Create a solver which uses the given backend
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

    /// Find the minimum total capacity which meets demand in every period.
    ///
    /// # Arguments
    ///
    /// * `demand` - A time series with a `demand` series
    /// * `yield_factors` - The yield factor for each source
    ///
    /// # Returns
    ///
    /// The optimal capacity plan, or an error if the input is invalid or no plan can meet demand.
    pub fn solve(
        &self,
        demand: &TimeSeriesInput,
        yield_factors: &YieldFactors,
    ) -> Result<CapacityPlan, OptimisationError> {
        let values = validate_demand(demand)?;
        yield_factors.validate()?;
        let horizon = demand.len();

        // No amount of capacity can meet positive demand if nothing yields anything
        if yield_factors.iter().all(|(_, factor)| factor.value() == 0.0)
            && values.iter().any(|value| *value > 0.0)
        {
            debug!("All yield factors are zero but demand is positive");
            return Err(OptimisationError::Infeasible {
                problem: ProblemKind::CapacitySizing,
                status: LpStatus::Infeasible,
                horizon,
            });
        }

        let mut problem = LinearProgram::default();
        let variables: Vec<_> = yield_factors
            .iter()
            .map(|(_, factor)| (problem.add_variable(1.0, 0.0..), factor))
            .collect();
        for demand in values {
            let terms = variables
                .iter()
                .filter(|(_, factor)| factor.value() != 0.0)
                .map(|(var, factor)| (*var, factor.value()));
            problem.add_constraint((*demand).., terms);
        }

        let solution = solve_optimal(
            self.backend,
            &problem,
            &self.options,
            ProblemKind::CapacitySizing,
            horizon,
        )?;

        let capacities = yield_factors
            .iter()
            .zip(&variables)
            .map(|((id, _), (var, _))| (id.clone(), Power(solution.value(*var))))
            .collect();
        let plan = CapacityPlan {
            capacities,
            yield_factors: yield_factors.clone(),
            objective_value: Power(solution.objective_value),
            status: solution.status,
        };
        info!(
            "Sized {} sources over {horizon} periods: total capacity {:.3} MW",
            yield_factors.len(),
            plan.total_capacity().value()
        );

        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{CountingBackend, assert_error_matches, yield_factors};
    use crate::lp::{CancellationToken, HighsBackend};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    const TOLERANCE: f64 = 1e-6;

    fn demand(values: &[f64]) -> TimeSeriesInput {
        TimeSeriesInput::from_values(DEMAND_SERIES, values.to_vec()).unwrap()
    }

    /// Check that the plan meets demand in every period and is binding in at least one
    fn assert_covers_demand(plan: &CapacityPlan, demand: &TimeSeriesInput) {
        let profile = plan.generation_profile(demand).unwrap();
        for period in &profile {
            assert!(
                period.surplus.value() >= -TOLERANCE,
                "Demand not met in period {}",
                period.label
            );
        }
        assert!(
            profile
                .iter()
                .any(|period| period.surplus.value().abs() <= TOLERANCE)
        );
    }

    #[rstest]
    fn test_solve_flat_demand(yield_factors: YieldFactors) {
        let demand = demand(&[10.0, 10.0, 10.0]);
        let plan = CapacitySizingSolver::new(&HighsBackend)
            .solve(&demand, &yield_factors)
            .unwrap();

        assert_eq!(plan.status, LpStatus::Optimal);
        assert_approx_eq!(
            f64,
            plan.capacity("wind").unwrap().value(),
            100.0 / 3.0,
            epsilon = TOLERANCE
        );
        assert_approx_eq!(
            f64,
            plan.capacity("solar").unwrap().value(),
            0.0,
            epsilon = TOLERANCE
        );
        assert_approx_eq!(
            f64,
            plan.objective_value.value(),
            100.0 / 3.0,
            epsilon = TOLERANCE
        );
        assert_covers_demand(&plan, &demand);
    }

    #[rstest]
    fn test_solve_peak_is_binding(yield_factors: YieldFactors) {
        let demand = demand(&[5.0, 15.0, 5.0]);
        let plan = CapacitySizingSolver::new(&HighsBackend)
            .solve(&demand, &yield_factors)
            .unwrap();

        assert_approx_eq!(
            f64,
            plan.capacity("wind").unwrap().value(),
            50.0,
            epsilon = TOLERANCE
        );
        let profile = plan.generation_profile(&demand).unwrap();
        assert_approx_eq!(f64, profile[1].surplus.value(), 0.0, epsilon = TOLERANCE);
        assert_approx_eq!(f64, profile[0].surplus.value(), 10.0, epsilon = TOLERANCE);
    }

    #[rstest]
    fn test_solve_is_minimal(yield_factors: YieldFactors) {
        let demand = demand(&[3.0, 7.5, 12.0, 0.0, 9.0]);
        let plan = CapacitySizingSolver::new(&HighsBackend)
            .solve(&demand, &yield_factors)
            .unwrap();
        assert_covers_demand(&plan, &demand);

        // Reducing any positive capacity must leave some period short
        for (id, capacity) in &plan.capacities {
            if capacity.value() <= TOLERANCE {
                continue;
            }
            let mut reduced = plan.clone();
            reduced.capacities[id] = *capacity - Power(1e-3);
            let profile = reduced.generation_profile(&demand).unwrap();
            assert!(profile.iter().any(|period| period.surplus.value() < 0.0));
        }
    }

    #[test]
    fn test_solve_capacities_non_negative() {
        let yield_factors: YieldFactors = [
            (SourceID::new("solar"), Dimensionless(0.25)),
            (SourceID::new("wind"), Dimensionless(0.25)),
            (SourceID::new("hydro"), Dimensionless(0.0)),
        ]
        .into_iter()
        .collect();
        let plan = CapacitySizingSolver::new(&HighsBackend)
            .solve(&demand(&[1.0, 2.0]), &yield_factors)
            .unwrap();

        assert!(plan.capacities.values().all(|c| c.value() >= -TOLERANCE));
        assert_approx_eq!(f64, plan.total_capacity().value(), 8.0, epsilon = TOLERANCE);
    }

    #[test]
    fn test_solve_all_zero_yields() {
        let yield_factors: YieldFactors = [
            (SourceID::new("solar"), Dimensionless(0.0)),
            (SourceID::new("wind"), Dimensionless(0.0)),
        ]
        .into_iter()
        .collect();
        let backend = CountingBackend::default();
        let result =
            CapacitySizingSolver::new(&backend).solve(&demand(&[0.0, 1.0]), &yield_factors);

        assert_error_matches!(
            result,
            OptimisationError::Infeasible {
                problem: ProblemKind::CapacitySizing,
                horizon: 2,
                ..
            }
        );
        assert_eq!(backend.calls(), 0);
    }

    #[test]
    fn test_solve_all_zero_yields_zero_demand() {
        let yield_factors: YieldFactors = [(SourceID::new("solar"), Dimensionless(0.0))]
            .into_iter()
            .collect();
        let plan = CapacitySizingSolver::new(&HighsBackend)
            .solve(&demand(&[0.0, 0.0]), &yield_factors)
            .unwrap();
        assert_approx_eq!(f64, plan.total_capacity().value(), 0.0, epsilon = TOLERANCE);
    }

    #[rstest]
    #[case(-0.1)]
    #[case(f64::NAN)]
    fn test_solve_bad_yield_factor(#[case] factor: f64) {
        let yield_factors: YieldFactors = [
            (SourceID::new("solar"), Dimensionless(0.2)),
            (SourceID::new("wind"), Dimensionless(factor)),
        ]
        .into_iter()
        .collect();
        let backend = CountingBackend::default();
        let result = CapacitySizingSolver::new(&backend).solve(&demand(&[1.0]), &yield_factors);

        assert_error_matches!(
            result,
            OptimisationError::InvalidInput(InvalidInput::Parameter(_))
        );
        assert_eq!(backend.calls(), 0);
    }

    #[test]
    fn test_solve_no_sources() {
        let result = CapacitySizingSolver::new(&HighsBackend)
            .solve(&demand(&[1.0]), &YieldFactors::default());
        assert_error_matches!(result, OptimisationError::InvalidInput(_));
    }

    #[rstest]
    fn test_solve_negative_demand(yield_factors: YieldFactors) {
        let backend = CountingBackend::default();
        let result =
            CapacitySizingSolver::new(&backend).solve(&demand(&[1.0, -2.0]), &yield_factors);

        assert_error_matches!(
            result,
            OptimisationError::InvalidInput(InvalidInput::InvalidSeriesValue { .. })
        );
        assert_eq!(backend.calls(), 0);
    }

    #[rstest]
    fn test_solve_missing_demand_series(yield_factors: YieldFactors) {
        let series = TimeSeriesInput::from_values("total", vec![1.0]).unwrap();
        let result = CapacitySizingSolver::new(&HighsBackend).solve(&series, &yield_factors);
        assert_error_matches!(
            result,
            OptimisationError::InvalidInput(InvalidInput::MissingSeries(_))
        );
    }

    #[rstest]
    fn test_solve_cancelled(yield_factors: YieldFactors) {
        let token = CancellationToken::new();
        token.cancel();
        let backend = CountingBackend::default();
        let result = CapacitySizingSolver::new(&backend)
            .with_options(SolveOptions::default().with_cancellation(token))
            .solve(&demand(&[1.0]), &yield_factors);

        assert_error_matches!(result, OptimisationError::Interrupted { .. });
        assert_eq!(backend.calls(), 0);
    }

    #[rstest]
    fn test_generation_profile(yield_factors: YieldFactors) {
        let plan = CapacityPlan {
            capacities: IndexMap::from([
                (SourceID::new("solar"), Power(10.0)),
                (SourceID::new("wind"), Power(20.0)),
            ]),
            yield_factors,
            objective_value: Power(30.0),
            status: LpStatus::Optimal,
        };
        let profile = plan.generation_profile(&demand(&[7.0])).unwrap();

        assert_eq!(profile.len(), 1);
        assert_approx_eq!(f64, profile[0].generation["solar"].value(), 2.0);
        assert_approx_eq!(f64, profile[0].generation["wind"].value(), 6.0);
        assert_approx_eq!(f64, profile[0].total.value(), 8.0);
        assert_approx_eq!(f64, profile[0].surplus.value(), 1.0);
    }
}
