//! Code for reading the flat table of named project parameters.
//!
//! Parameters are stored as `parameter,value[,unit]` rows, with the unit column being purely
//! informational. Only the parameters used by the solvers are consumed; anything else (costs used
//! for financial summaries, for example) is ignored.
use super::{input_err_msg, read_csv};
use crate::battery::BatterySpec;
use crate::error::InvalidInput;
use crate::id::SourceID;
use crate::sizing::YieldFactors;
use crate::units::{Dimensionless, Energy, MoneyPerEnergy, Power};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use log::debug;
use serde::Deserialize;
use std::path::Path;
use unicase::UniCase;

/// Prefix for capacity utilisation factor parameters, followed by the source name
pub const YIELD_FACTOR_PREFIX: &str = "cuf_";

/// The parameter giving the length of the dispatch horizon in days
pub const FORECAST_HORIZON_PARAMETER: &str = "forecast_horizon_days";

/// Parameters which make up a [`BatterySpec`], in field order
const BATTERY_PARAMETERS: [&str; 8] = [
    "battery_capacity",
    "max_charge_rate",
    "max_discharge_rate",
    "initial_soc",
    "degradation_rate",
    "penalty_multiplier",
    "tariff",
    "contracted_capacity",
];

/// The number of periods in a day
const PERIODS_PER_DAY: usize = 24;

#[derive(Debug, Deserialize, PartialEq)]
struct ParameterRow {
    parameter: String,
    value: f64,
}

/// A table of named numeric parameters. Names are matched case-insensitively.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterTable(IndexMap<UniCase<String>, f64>);

impl ParameterTable {
    /// Create a parameter table from name/value pairs.
    ///
    /// Returns an error if a name is repeated or a value is not finite.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, InvalidInput>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let mut map = IndexMap::new();
        for (name, value) in pairs {
            let name = name.as_ref().trim();
            if !value.is_finite() {
                return Err(InvalidInput::Parameter(format!(
                    "Parameter {name} has non-finite value {value}"
                )));
            }
            if map.insert(UniCase::new(name.to_string()), value).is_some() {
                return Err(InvalidInput::Parameter(format!(
                    "Parameter {name} is defined more than once"
                )));
            }
        }

        Ok(Self(map))
    }

    /// Get the value of a parameter
    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(&UniCase::new(name.trim().to_string())).copied()
    }

    /// The number of parameters
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the values of several parameters, reporting all missing parameters together
    fn get_all<const N: usize>(&self, names: [&str; N]) -> Result<[f64; N], InvalidInput> {
        let missing: Vec<_> = names
            .iter()
            .filter(|name| self.get(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(InvalidInput::MissingParameters(missing));
        }

        Ok(names.map(|name| self.get(name).unwrap_or_default()))
    }

    /// Extract the capacity utilisation factor for each source.
    ///
    /// Factors are given in percent and converted to fractions. Sources appear in the order of
    /// their parameters.
    pub fn yield_factors(&self) -> YieldFactors {
        self.0
            .iter()
            .filter_map(|(name, value)| {
                let source = strip_prefix_ignore_case(name, YIELD_FACTOR_PREFIX)?;
                Some((SourceID::new(source), Dimensionless(value / 100.0)))
            })
            .collect()
    }

    /// Extract the battery parameters. The returned spec has not been validated.
    pub fn battery_spec(&self) -> Result<BatterySpec, InvalidInput> {
        let [
            energy_capacity,
            max_charge_rate,
            max_discharge_rate,
            initial_soc,
            degradation_rate,
            penalty_multiplier,
            tariff,
            contracted_capacity,
        ] = self.get_all(BATTERY_PARAMETERS)?;

        Ok(BatterySpec {
            energy_capacity: Energy(energy_capacity),
            max_charge_rate: Power(max_charge_rate),
            max_discharge_rate: Power(max_discharge_rate),
            initial_soc: Energy(initial_soc),
            degradation_rate: Dimensionless(degradation_rate),
            penalty_multiplier: Dimensionless(penalty_multiplier),
            tariff: MoneyPerEnergy(tariff),
            contracted_capacity: Power(contracted_capacity),
        })
    }

    /// The number of periods in the dispatch horizon, if a forecast horizon was given
    pub fn forecast_horizon_periods(&self) -> Result<Option<usize>, InvalidInput> {
        let Some(days) = self.get(FORECAST_HORIZON_PARAMETER) else {
            return Ok(None);
        };
        if days < 1.0 || days.fract() != 0.0 {
            return Err(InvalidInput::Parameter(format!(
                "{FORECAST_HORIZON_PARAMETER} must be a positive whole number of days (got {days})"
            )));
        }

        // The cast saturates, so out-of-range values are caught by the multiplication
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let periods = (days as usize).checked_mul(PERIODS_PER_DAY).ok_or_else(|| {
            InvalidInput::Parameter(format!(
                "{FORECAST_HORIZON_PARAMETER} is too large (got {days})"
            ))
        })?;

        Ok(Some(periods))
    }

    /// Whether the named parameter is consumed by any solver
    fn is_recognised(name: &str) -> bool {
        strip_prefix_ignore_case(name, YIELD_FACTOR_PREFIX).is_some()
            || UniCase::new(name) == UniCase::new(FORECAST_HORIZON_PARAMETER)
            || BATTERY_PARAMETERS
                .iter()
                .any(|param| UniCase::new(*param) == UniCase::new(name))
    }
}

/// Remove a prefix from a name, ignoring case. Returns `None` if the prefix is absent or nothing
/// follows it.
fn strip_prefix_ignore_case<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    let head = name.get(..prefix.len())?;
    let rest = &name[prefix.len()..];
    (UniCase::new(head) == UniCase::new(prefix) && !rest.is_empty()).then_some(rest)
}

/// Read the parameter table from a CSV file
pub fn read_parameters(file_path: &Path) -> Result<ParameterTable> {
    let rows = read_csv::<ParameterRow>(file_path)?;
    let table = ParameterTable::from_pairs(rows.map(|row| (row.parameter, row.value)))
        .with_context(|| input_err_msg(file_path))?;

    for (name, _) in &table.0 {
        if !ParameterTable::is_recognised(name) {
            debug!("Ignoring parameter {name}, which is not used by the optimisation");
        }
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error_matches, battery};
    use float_cmp::assert_approx_eq;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn battery_parameters() -> Vec<(&'static str, f64)> {
        vec![
            ("battery_capacity", 10.0),
            ("max_charge_rate", 5.0),
            ("max_discharge_rate", 5.0),
            ("initial_soc", 5.0),
            ("degradation_rate", 2.0),
            ("penalty_multiplier", 2.0),
            ("tariff", 8.0),
            ("contracted_capacity", 10.0),
        ]
    }

    #[test]
    fn test_from_pairs_duplicate() {
        assert_error_matches!(
            ParameterTable::from_pairs([("tariff", 1.0), ("Tariff", 2.0)]),
            InvalidInput::Parameter(_)
        );
    }

    #[test]
    fn test_get_case_insensitive() {
        let table = ParameterTable::from_pairs([("Tariff", 8.0)]).unwrap();
        assert_eq!(table.get("tariff"), Some(8.0));
        assert_eq!(table.get(" TARIFF "), Some(8.0));
        assert_eq!(table.get("penalty_multiplier"), None);
    }

    #[test]
    fn test_yield_factors() {
        let table = ParameterTable::from_pairs([
            ("CUF_Solar", 20.0),
            ("capital_cost", 1e6),
            ("cuf_wind", 30.0),
            ("cuf_", 50.0),
        ])
        .unwrap();
        let factors = table.yield_factors();
        assert_eq!(factors.len(), 2);
        assert_approx_eq!(f64, factors.get("solar").unwrap().value(), 0.2);
        assert_approx_eq!(f64, factors.get("wind").unwrap().value(), 0.3);
    }

    #[rstest::rstest]
    fn test_battery_spec(battery: BatterySpec) {
        let table = ParameterTable::from_pairs(battery_parameters()).unwrap();
        assert_eq!(table.battery_spec().unwrap(), battery);
    }

    #[test]
    fn test_battery_spec_missing() {
        let mut params = battery_parameters();
        params.retain(|(name, _)| !["tariff", "initial_soc"].contains(name));
        let table = ParameterTable::from_pairs(params).unwrap();
        assert_eq!(
            table.battery_spec().unwrap_err(),
            InvalidInput::MissingParameters(vec!["initial_soc".into(), "tariff".into()])
        );
    }

    #[rstest::rstest]
    #[case(None, Ok(None))]
    #[case(Some(7.0), Ok(Some(168)))]
    #[case(Some(0.0), Err(()))]
    #[case(Some(1.5), Err(()))]
    #[case(Some(1e18), Err(()))]
    #[case(Some(f64::MAX), Err(()))]
    fn test_forecast_horizon_periods(
        #[case] days: Option<f64>,
        #[case] expected: Result<Option<usize>, ()>,
    ) {
        let table = ParameterTable::from_pairs(days.map(|days| (FORECAST_HORIZON_PARAMETER, days)))
            .unwrap();
        assert_eq!(table.forecast_horizon_periods().map_err(|_| ()), expected);
    }

    #[test]
    fn test_is_recognised() {
        assert!(ParameterTable::is_recognised("cuf_solar"));
        assert!(ParameterTable::is_recognised("Tariff"));
        assert!(ParameterTable::is_recognised("forecast_horizon_days"));
        assert!(!ParameterTable::is_recognised("capital_cost"));
    }

    #[test]
    fn test_read_parameters() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("parameters.csv");
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(
                file,
                "parameter,value,unit\ncuf_solar,20,%\ntariff,8.0,INR/MWh\nlifetime,25,years"
            )
            .unwrap();
        }

        let table = read_parameters(&file_path).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get("tariff"), Some(8.0));
    }

    #[test]
    fn test_read_parameters_bad_value() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("parameters.csv");
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "parameter,value\ntariff,cheap").unwrap();
        }

        assert!(read_parameters(&file_path).is_err());
    }
}
