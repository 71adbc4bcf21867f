// ap-core/src/units.rs

use core::fmt;
use core::str::FromStr;

use uom::si::f64::{Pressure as UomPressure, ThermodynamicTemperature as UomTemperature};
use uom::si::pressure::{bar, pascal, pound_force_per_square_inch};
use uom::si::thermodynamic_temperature::{degree_celsius, degree_fahrenheit, kelvin};

use crate::error::{CoreError, CoreResult};

// Public canonical unit types (SI, f64)
pub type Pressure = UomPressure;
pub type Temperature = UomTemperature;

/// Aspen Plus base unit set a case reports its values in.
///
/// Only temperature and pressure differ between the sets in a way the wrapper
/// cares about; flows are passed through untouched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "UPPERCASE")
)]
pub enum UnitSet {
    /// K, Pa
    #[default]
    Si,
    /// °C, bar
    Met,
    /// °F, psi
    Eng,
}

impl UnitSet {
    pub const ALL: [UnitSet; 3] = [UnitSet::Si, UnitSet::Met, UnitSet::Eng];

    /// Interpret a raw temperature reported in this unit set.
    pub fn temperature(self, v: f64) -> Temperature {
        match self {
            UnitSet::Si => Temperature::new::<kelvin>(v),
            UnitSet::Met => Temperature::new::<degree_celsius>(v),
            UnitSet::Eng => Temperature::new::<degree_fahrenheit>(v),
        }
    }

    /// Interpret a raw pressure reported in this unit set.
    pub fn pressure(self, v: f64) -> Pressure {
        match self {
            UnitSet::Si => Pressure::new::<pascal>(v),
            UnitSet::Met => Pressure::new::<bar>(v),
            UnitSet::Eng => Pressure::new::<pound_force_per_square_inch>(v),
        }
    }

    /// Express a temperature as a raw number in this unit set.
    pub fn raw_temperature(self, t: Temperature) -> f64 {
        match self {
            UnitSet::Si => t.get::<kelvin>(),
            UnitSet::Met => t.get::<degree_celsius>(),
            UnitSet::Eng => t.get::<degree_fahrenheit>(),
        }
    }

    /// Express a pressure as a raw number in this unit set.
    pub fn raw_pressure(self, p: Pressure) -> f64 {
        match self {
            UnitSet::Si => p.get::<pascal>(),
            UnitSet::Met => p.get::<bar>(),
            UnitSet::Eng => p.get::<pound_force_per_square_inch>(),
        }
    }

    pub fn temperature_label(self) -> &'static str {
        match self {
            UnitSet::Si => "K",
            UnitSet::Met => "C",
            UnitSet::Eng => "F",
        }
    }

    pub fn pressure_label(self) -> &'static str {
        match self {
            UnitSet::Si => "Pa",
            UnitSet::Met => "bar",
            UnitSet::Eng => "psi",
        }
    }
}

impl fmt::Display for UnitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UnitSet::Si => "SI",
            UnitSet::Met => "MET",
            UnitSet::Eng => "ENG",
        };
        f.write_str(name)
    }
}

impl FromStr for UnitSet {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SI" => Ok(UnitSet::Si),
            "MET" => Ok(UnitSet::Met),
            "ENG" => Ok(UnitSet::Eng),
            _ => Err(CoreError::UnknownUnitSet {
                name: s.to_string(),
            }),
        }
    }
}
