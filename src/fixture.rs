//! Fixtures for tests
use crate::battery::BatterySpec;
use crate::id::SourceID;
use crate::lp::{
    BackendError, HighsBackend, LinearProgram, LpBackend, LpSolution, LpStatus, SolveOptions,
};
use crate::sizing::YieldFactors;
use crate::units::{Dimensionless, Energy, MoneyPerEnergy, Power};
use rstest::fixture;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// Assert that a result is an error matching the given pattern
macro_rules! assert_error_matches {
    ($result:expr, $pattern:pat) => {
        match $result {
            Err(err) => assert!(matches!(err, $pattern), "Unexpected error: {err:?}"),
            Ok(_) => panic!("Expected an error"),
        }
    };
}
pub(crate) use assert_error_matches;

/// A backend which solves with HiGHS and counts how many times it was invoked
#[derive(Default)]
pub struct CountingBackend {
    calls: AtomicUsize,
}

impl CountingBackend {
    /// The number of solves requested so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LpBackend for CountingBackend {
    fn name(&self) -> &str {
        "counting"
    }

    fn solve(
        &self,
        problem: &LinearProgram,
        options: &SolveOptions,
    ) -> Result<LpSolution, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        HighsBackend.solve(problem, options)
    }
}

/// A backend which always reports the same non-optimal status
pub struct FixedStatusBackend(pub LpStatus);

impl LpBackend for FixedStatusBackend {
    fn name(&self) -> &str {
        "fixed"
    }

    fn solve(&self, _: &LinearProgram, _: &SolveOptions) -> Result<LpSolution, BackendError> {
        Ok(LpSolution::without_values(self.0.clone()))
    }
}

/// A backend which always fails
pub struct FailingBackend;

impl LpBackend for FailingBackend {
    fn name(&self) -> &str {
        "failing"
    }

    fn solve(&self, _: &LinearProgram, _: &SolveOptions) -> Result<LpSolution, BackendError> {
        Err(BackendError::new(self.name(), "out of memory"))
    }
}

#[fixture]
pub fn battery() -> BatterySpec {
    BatterySpec {
        energy_capacity: Energy(10.0),
        max_charge_rate: Power(5.0),
        max_discharge_rate: Power(5.0),
        initial_soc: Energy(5.0),
        degradation_rate: Dimensionless(2.0),
        penalty_multiplier: Dimensionless(2.0),
        tariff: MoneyPerEnergy(8.0),
        contracted_capacity: Power(10.0),
    }
}

#[fixture]
pub fn yield_factors() -> YieldFactors {
    [
        (SourceID::new("solar"), Dimensionless(0.2)),
        (SourceID::new("wind"), Dimensionless(0.3)),
    ]
    .into_iter()
    .collect()
}
