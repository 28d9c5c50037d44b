//! This module defines various unit types and their conversions.
//!
//! All time series are hourly, so a power sustained over one period corresponds to the same
//! number of energy units (MW over one hour is MWh).
use serde::{Deserialize, Serialize};

/// The length of a single period in hours
pub const PERIOD_HOURS: f64 = 1.0;

macro_rules! unit_struct {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            Default,
            PartialEq,
            PartialOrd,
            Serialize,
            Deserialize,
            derive_more::Add,
            derive_more::Sub,
            derive_more::AddAssign,
            derive_more::SubAssign,
            derive_more::Display,
        )]
        #[serde(transparent)]
        pub struct $name(pub f64);

        impl $name {
            /// Create a new instance of the unit type from an `f64` value.
            pub fn new(value: f64) -> Self {
                Self(value)
            }

            /// Return the value of the unit type as an `f64`.
            pub fn value(self) -> f64 {
                self.0
            }

            /// Whether the value is finite (i.e. not infinite or NaN)
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }
        }

        impl std::ops::Mul<Dimensionless> for $name {
            type Output = $name;
            fn mul(self, rhs: Dimensionless) -> $name {
                $name(self.0 * rhs.0)
            }
        }

        impl std::iter::Sum for $name {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                $name(iter.map(|x| x.0).sum())
            }
        }
    };
}

macro_rules! impl_mul {
    ($Lhs:ty, $Rhs:ty, $Out:ty) => {
        impl std::ops::Mul<$Rhs> for $Lhs {
            type Output = $Out;
            fn mul(self, rhs: $Rhs) -> $Out {
                <$Out>::new(self.0 * rhs.0)
            }
        }
        impl std::ops::Mul<$Lhs> for $Rhs {
            type Output = $Out;
            fn mul(self, lhs: $Lhs) -> $Out {
                <$Out>::new(self.0 * lhs.0)
            }
        }
    };
}

unit_struct!(
    /// A dimensionless quantity, e.g. a fraction or a multiplier
    Dimensionless
);
unit_struct!(
    /// Power in MW
    Power
);
unit_struct!(
    /// Energy in MWh
    Energy
);
unit_struct!(
    /// An amount of money in the project currency
    Money
);
unit_struct!(
    /// A price or tariff per MWh
    MoneyPerEnergy
);

impl_mul!(Energy, MoneyPerEnergy, Money);

impl Power {
    /// The energy corresponding to this power sustained over a single period
    pub fn over_period(self) -> Energy {
        Energy(self.0 * PERIOD_HOURS)
    }
}
