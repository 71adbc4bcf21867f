//! Process stream record.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{CoreError, CoreResult};
use crate::numeric::{Tolerances, nearly_equal};
use crate::units::{Pressure, Temperature, UnitSet};

/// Component name -> amount (mole/mass fraction or component flow, whatever
/// the case uses).
pub type Composition = BTreeMap<String, f64>;

/// One named material or energy flow in a case.
///
/// A `Stream` is a value: streams handed out by a backend are snapshots, and
/// changing one does nothing to the case until it is written back with
/// `set_stream`. Values are in the unit set of the case they came from.
/// Nothing here checks physical plausibility (negative flows are accepted);
/// the simulation engine is the authority on that.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stream {
    /// Unique within a case.
    pub name: String,
    /// Total mass or molar flow.
    pub flow: f64,
    /// `None` means not set / not retrieved.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub temperature: Option<f64>,
    /// `None` means not set / not retrieved.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub pressure: Option<f64>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub composition: Option<Composition>,
}

impl Stream {
    pub fn new(name: impl Into<String>, flow: f64) -> Self {
        Self {
            name: name.into(),
            flow,
            temperature: None,
            pressure: None,
            composition: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_pressure(mut self, pressure: f64) -> Self {
        self.pressure = Some(pressure);
        self
    }

    /// Replace the whole composition.
    pub fn with_composition<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        self.composition = Some(items.into_iter().map(|(c, v)| (c.into(), v)).collect());
        self
    }

    /// Add or overwrite a single component amount.
    pub fn with_component(mut self, component: impl Into<String>, amount: f64) -> Self {
        self.composition
            .get_or_insert_with(Composition::new)
            .insert(component.into(), amount);
        self
    }

    /// Same properties under a different name.
    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Amount of one component, if the composition lists it.
    pub fn component(&self, component: &str) -> Option<f64> {
        self.composition.as_ref()?.get(component).copied()
    }

    /// Sum over all component amounts.
    pub fn composition_total(&self) -> Option<f64> {
        self.composition.as_ref().map(|c| c.values().sum())
    }

    /// True when a composition is present and sums to one within `tol`.
    ///
    /// Informational only: backends accept any composition.
    pub fn is_normalized(&self, tol: Tolerances) -> bool {
        self.composition_total()
            .is_some_and(|total| nearly_equal(total, 1.0, tol))
    }

    /// Temperature as a uom quantity, reading the raw value in `units`.
    pub fn temperature_in(&self, units: UnitSet) -> Option<Temperature> {
        self.temperature.map(|t| units.temperature(t))
    }

    /// Pressure as a uom quantity, reading the raw value in `units`.
    pub fn pressure_in(&self, units: UnitSet) -> Option<Pressure> {
        self.pressure.map(|p| units.pressure(p))
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: flow={}", self.name, self.flow)?;
        match self.temperature {
            Some(t) => write!(f, ", T={}", t)?,
            None => write!(f, ", T=-")?,
        }
        match self.pressure {
            Some(p) => write!(f, ", P={}", p)?,
            None => write!(f, ", P=-")?,
        }
        if let Some(comp) = &self.composition {
            let items: Vec<String> = comp.iter().map(|(c, v)| format!("{}: {}", c, v)).collect();
            write!(f, ", composition={{{}}}", items.join(", "))?;
        }
        Ok(())
    }
}

/// Parse a `NAME=VALUE` component amount, as typed on a command line.
pub fn parse_component(input: &str) -> CoreResult<(String, f64)> {
    let invalid = || CoreError::InvalidComponent {
        input: input.to_string(),
    };
    let (name, value) = input.split_once('=').ok_or_else(invalid)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(invalid());
    }
    let value: f64 = value.trim().parse().map_err(|_| invalid())?;
    Ok((name.to_string(), value))
}
