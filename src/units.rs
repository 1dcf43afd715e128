//! Physical units of model inputs and outputs.
//!
//! Units are written as strings in the usual engineering notation, e.g.
//! `"cm"`, `"rad/s"`, `"kg/m**3"` or `"N/m**2*s"`. Every unit has a
//! [dimension](Dimension) and a factor to the SI unit of that dimension.
//! Conversion is only allowed between units of the same dimension.
//!
//! ```rust
//! use bemopt::units::convert;
//!
//! assert_eq!(convert(150.0, "cm", "m").unwrap(), 1.5);
//! assert!(convert(1.0, "cm", "rad").is_err());
//! ```

use std::{f64::consts::PI, fmt, str::FromStr};

use thiserror::Error;

/// Physical dimension of a quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    /// Dimensionless quantity.
    Dimensionless,
    /// Length.
    Length,
    /// Plane angle.
    Angle,
    /// Velocity.
    Velocity,
    /// Angular velocity.
    AngularVelocity,
    /// Mass density.
    Density,
    /// Dynamic viscosity.
    DynamicViscosity,
    /// Force.
    Force,
    /// Force per unit length, e.g. blade loading.
    ForcePerLength,
    /// Moment of force.
    Torque,
    /// Power.
    Power,
}

impl Dimension {
    /// Name of the SI unit of the dimension.
    pub fn si_unit(&self) -> &'static str {
        match self {
            Dimension::Dimensionless => "",
            Dimension::Length => "m",
            Dimension::Angle => "rad",
            Dimension::Velocity => "m/s",
            Dimension::AngularVelocity => "rad/s",
            Dimension::Density => "kg/m**3",
            Dimension::DynamicViscosity => "N/m**2*s",
            Dimension::Force => "N",
            Dimension::ForcePerLength => "N/m",
            Dimension::Torque => "N*m",
            Dimension::Power => "W",
        }
    }
}

/// Error when parsing or converting units.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnitError {
    /// The unit is not recognized.
    #[error("unknown unit '{0}'")]
    UnknownUnit(String),
    /// The units have different dimensions.
    #[error("cannot convert '{from}' to '{to}'")]
    IncompatibleUnits {
        /// Source unit.
        from: String,
        /// Target unit.
        to: String,
    },
}

/// A physical unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Unit {
    name: &'static str,
    dimension: Dimension,
    factor: f64,
}

// Name, dimension and factor to SI.
const UNITS: &[(&str, Dimension, f64)] = &[
    ("", Dimension::Dimensionless, 1.0),
    ("m", Dimension::Length, 1.0),
    ("cm", Dimension::Length, 1e-2),
    ("mm", Dimension::Length, 1e-3),
    ("km", Dimension::Length, 1e3),
    ("ft", Dimension::Length, 0.3048),
    ("inch", Dimension::Length, 0.0254),
    ("rad", Dimension::Angle, 1.0),
    ("deg", Dimension::Angle, PI / 180.0),
    ("m/s", Dimension::Velocity, 1.0),
    ("km/h", Dimension::Velocity, 1.0 / 3.6),
    ("ft/s", Dimension::Velocity, 0.3048),
    ("rad/s", Dimension::AngularVelocity, 1.0),
    ("deg/s", Dimension::AngularVelocity, PI / 180.0),
    ("rpm", Dimension::AngularVelocity, 2.0 * PI / 60.0),
    ("kg/m**3", Dimension::Density, 1.0),
    ("N/m**2*s", Dimension::DynamicViscosity, 1.0),
    ("N", Dimension::Force, 1.0),
    ("kN", Dimension::Force, 1e3),
    ("lbf", Dimension::Force, 4.448_221_615_260_5),
    ("N/m", Dimension::ForcePerLength, 1.0),
    ("N*m", Dimension::Torque, 1.0),
    ("W", Dimension::Power, 1.0),
    ("kW", Dimension::Power, 1e3),
    ("hp", Dimension::Power, 745.699_871_582_270_2),
];

// Alternative spellings.
const ALIASES: &[(&str, &str)] = &[
    ("unitless", ""),
    ("1", ""),
    ("in", "inch"),
    ("degree", "deg"),
    ("kg/m^3", "kg/m**3"),
    ("Pa*s", "N/m**2*s"),
    ("N*s/m**2", "N/m**2*s"),
    ("m*N", "N*m"),
    ("rev/min", "rpm"),
];

impl Unit {
    /// Parses a unit from its string representation.
    pub fn parse(s: &str) -> Result<Self, UnitError> {
        let trimmed = s.trim();
        let name = ALIASES
            .iter()
            .find(|(alias, _)| *alias == trimmed)
            .map(|(_, name)| *name)
            .unwrap_or(trimmed);

        UNITS
            .iter()
            .find(|(candidate, _, _)| *candidate == name)
            .map(|&(name, dimension, factor)| Unit {
                name,
                dimension,
                factor,
            })
            .ok_or_else(|| UnitError::UnknownUnit(s.to_string()))
    }

    /// Canonical name of the unit.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Dimension of the unit.
    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    /// Converts a value in this unit to the SI unit.
    pub fn to_si(&self, value: f64) -> f64 {
        value * self.factor
    }

    /// Converts a value in the SI unit to this unit.
    pub fn from_si(&self, value: f64) -> f64 {
        value / self.factor
    }

    /// Converts a value in this unit to another unit.
    pub fn convert(&self, value: f64, to: &Unit) -> Result<f64, UnitError> {
        if self.dimension != to.dimension {
            return Err(UnitError::IncompatibleUnits {
                from: self.name.to_string(),
                to: to.name.to_string(),
            });
        }

        Ok(to.from_si(self.to_si(value)))
    }
}

impl FromStr for Unit {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Unit::parse(s)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            f.write_str("unitless")
        } else {
            f.write_str(self.name)
        }
    }
}

/// Converts a value between units given by their string representation.
pub fn convert(value: f64, from: &str, to: &str) -> Result<f64, UnitError> {
    Unit::parse(from)?.convert(value, &Unit::parse(to)?)
}

/// Checks that the unit is of given dimension, returning the parsed unit.
pub(crate) fn expect_dimension(unit: &str, dimension: Dimension) -> Result<Unit, UnitError> {
    let parsed = Unit::parse(unit)?;

    if parsed.dimension == dimension {
        Ok(parsed)
    } else {
        Err(UnitError::IncompatibleUnits {
            from: parsed.to_string(),
            to: format!("{:?}", dimension).to_lowercase(),
        })
    }
}
