//! Battery storage parameters.
use crate::error::InvalidInput;
use crate::units::{Dimensionless, Energy, MoneyPerEnergy, Power};
use serde::{Deserialize, Serialize};

/// The physical and commercial parameters of a battery
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatterySpec {
    /// Energy storage capacity (MWh)
    pub energy_capacity: Energy,
    /// Maximum charging power (MW)
    pub max_charge_rate: Power,
    /// Maximum discharging power (MW)
    pub max_discharge_rate: Power,
    /// State of charge at the start of the horizon (MWh)
    pub initial_soc: Energy,
    /// Capacity degradation in percent per year.
    ///
    /// Reported alongside results but not used by the dispatch problem, which covers a horizon of
    /// days.
    pub degradation_rate: Dimensionless,
    /// Factor applied to the tariff when penalising shortages
    pub penalty_multiplier: Dimensionless,
    /// Tariff per MWh
    pub tariff: MoneyPerEnergy,
    /// Power which must be delivered in every period (MW)
    pub contracted_capacity: Power,
}

impl BatterySpec {
    /// Check that all parameters are finite and within range
    pub fn validate(&self) -> Result<(), InvalidInput> {
        let fields = [
            ("battery_capacity", self.energy_capacity.value()),
            ("max_charge_rate", self.max_charge_rate.value()),
            ("max_discharge_rate", self.max_discharge_rate.value()),
            ("initial_soc", self.initial_soc.value()),
            ("degradation_rate", self.degradation_rate.value()),
            ("penalty_multiplier", self.penalty_multiplier.value()),
            ("tariff", self.tariff.value()),
            ("contracted_capacity", self.contracted_capacity.value()),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(InvalidInput::Parameter(format!(
                    "{name} must be a finite, non-negative number (got {value})"
                )));
            }
        }

        if self.initial_soc > self.energy_capacity {
            return Err(InvalidInput::Parameter(format!(
                "initial_soc ({}) cannot exceed battery_capacity ({})",
                self.initial_soc, self.energy_capacity
            )));
        }

        Ok(())
    }

    /// The cost of each MWh of shortage
    pub fn penalty_rate(&self) -> MoneyPerEnergy {
        self.tariff * self.penalty_multiplier
    }
}
