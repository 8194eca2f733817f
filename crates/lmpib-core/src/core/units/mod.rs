//! # Units Module
//!
//! Physical quantities and their conversion into the numeric conventions of the
//! simulation engine.
//!
//! ## Overview
//!
//! Every unit-aware building block stores its arguments as a [`Quantity`] (a
//! magnitude plus a unit expression such as `"(kcal/mol)/angstrom"`). Quantities
//! are resolved against an explicit [`UnitRegistry`] owned by the caller, checked
//! against the dimension their kind expects, and later rendered in the unit
//! convention selected by a [`UnitSystem`] tag.
//!
//! ## Conventions
//!
//! - Dimensions are tracked over mass, length, time and temperature.
//! - Amount of substance is a pure count: `mol` is Avogadro's number, so molar
//!   energies share the dimension of per-particle energies.
//! - Internal factors are expressed relative to g/mol, angstrom, femtosecond and
//!   kelvin, which keeps conversions between identical unit expressions exact.

mod parser;
pub mod quantity;
pub mod registry;

pub use quantity::{
    Energy, EnergyQuantity, Force, ForceQuantity, Length, LengthQuantity, Quantity,
    QuantityKind, Temperature, TemperatureQuantity, Time, TimeQuantity, Torque, TorqueQuantity,
    Velocity, VelocityQuantity,
};
pub use registry::UnitRegistry;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Div, Mul};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UnitError {
    #[error("Unknown unit '{0}'")]
    UnknownUnit(String),

    #[error("Invalid unit expression '{expression}': {reason}")]
    Syntax { expression: String, reason: String },

    #[error("Unit '{units}' has dimension {found}, but a {kind} expects {expected}")]
    DimensionMismatch {
        kind: &'static str,
        units: String,
        expected: Dimension,
        found: Dimension,
    },

    #[error("Unit '{0}' is already defined")]
    Duplicate(String),

    #[error("Invalid unit name '{0}'")]
    InvalidName(String),

    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

/// Selects the unit convention numeric arguments are rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    Real,
    Metal,
}

impl UnitSystem {
    /// The keyword of the engine's `units` command.
    pub fn keyword(&self) -> &'static str {
        match self {
            UnitSystem::Real => "real",
            UnitSystem::Metal => "metal",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_lowercase().as_str() {
            "real" => Some(UnitSystem::Real),
            "metal" => Some(UnitSystem::Metal),
            _ => None,
        }
    }

    /// The native unit this convention uses for a physical kind.
    pub fn native_unit(&self, kind: PhysicalKind) -> Unit {
        use registry::builtin::*;
        match (self, kind) {
            (_, PhysicalKind::Mass) => GRAM / MOLE,
            (_, PhysicalKind::Length) => ANGSTROM,
            (_, PhysicalKind::Temperature) => KELVIN,
            (UnitSystem::Real, PhysicalKind::Time) => FEMTOSECOND,
            (UnitSystem::Real, PhysicalKind::Energy | PhysicalKind::Torque) => KILOCALORIE / MOLE,
            (UnitSystem::Real, PhysicalKind::Velocity) => ANGSTROM / FEMTOSECOND,
            (UnitSystem::Real, PhysicalKind::Force) => (KILOCALORIE / MOLE) / ANGSTROM,
            (UnitSystem::Metal, PhysicalKind::Time) => PICOSECOND,
            (UnitSystem::Metal, PhysicalKind::Energy | PhysicalKind::Torque) => ELECTRON_VOLT,
            (UnitSystem::Metal, PhysicalKind::Velocity) => ANGSTROM / PICOSECOND,
            (UnitSystem::Metal, PhysicalKind::Force) => ELECTRON_VOLT / ANGSTROM,
        }
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// The physical kinds a quantity argument can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhysicalKind {
    Mass,
    Length,
    Time,
    Energy,
    Velocity,
    Force,
    Torque,
    Temperature,
}

impl PhysicalKind {
    pub const ALL: [PhysicalKind; 8] = [
        PhysicalKind::Mass,
        PhysicalKind::Length,
        PhysicalKind::Time,
        PhysicalKind::Energy,
        PhysicalKind::Velocity,
        PhysicalKind::Force,
        PhysicalKind::Torque,
        PhysicalKind::Temperature,
    ];

    pub fn dimension(&self) -> Dimension {
        match self {
            PhysicalKind::Mass => Dimension::MASS,
            PhysicalKind::Length => Dimension::LENGTH,
            PhysicalKind::Time => Dimension::TIME,
            PhysicalKind::Energy | PhysicalKind::Torque => Dimension::ENERGY,
            PhysicalKind::Velocity => Dimension::VELOCITY,
            PhysicalKind::Force => Dimension::FORCE,
            PhysicalKind::Temperature => Dimension::TEMPERATURE,
        }
    }

    /// Suffix of the `lmp_<system>_<suffix>` unit names.
    pub fn suffix(&self) -> &'static str {
        match self {
            PhysicalKind::Mass => "mass",
            PhysicalKind::Length => "length",
            PhysicalKind::Time => "time",
            PhysicalKind::Energy => "energy",
            PhysicalKind::Velocity => "velocity",
            PhysicalKind::Force => "force",
            PhysicalKind::Torque => "torque",
            PhysicalKind::Temperature => "temperature",
        }
    }
}

/// Exponents of the base dimensions (mass, length, time, temperature).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Dimension {
    pub mass: i8,
    pub length: i8,
    pub time: i8,
    pub temperature: i8,
}

impl Dimension {
    pub const NONE: Dimension = Dimension::new(0, 0, 0, 0);
    pub const MASS: Dimension = Dimension::new(1, 0, 0, 0);
    pub const LENGTH: Dimension = Dimension::new(0, 1, 0, 0);
    pub const TIME: Dimension = Dimension::new(0, 0, 1, 0);
    pub const TEMPERATURE: Dimension = Dimension::new(0, 0, 0, 1);
    pub const VELOCITY: Dimension = Dimension::new(0, 1, -1, 0);
    pub const FORCE: Dimension = Dimension::new(1, 1, -2, 0);
    pub const ENERGY: Dimension = Dimension::new(1, 2, -2, 0);

    pub const fn new(mass: i8, length: i8, time: i8, temperature: i8) -> Self {
        Self {
            mass,
            length,
            time,
            temperature,
        }
    }

    pub fn powi(self, exponent: i8) -> Self {
        Self::new(
            self.mass * exponent,
            self.length * exponent,
            self.time * exponent,
            self.temperature * exponent,
        )
    }
}

impl Mul for Dimension {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Self::new(
            self.mass + rhs.mass,
            self.length + rhs.length,
            self.time + rhs.time,
            self.temperature + rhs.temperature,
        )
    }
}

impl Div for Dimension {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        Self::new(
            self.mass - rhs.mass,
            self.length - rhs.length,
            self.time - rhs.time,
            self.temperature - rhs.temperature,
        )
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = [
            ("mass", self.mass),
            ("length", self.length),
            ("time", self.time),
            ("temperature", self.temperature),
        ]
        .iter()
        .filter(|(_, exp)| *exp != 0)
        .map(|(name, exp)| match exp {
            1 => format!("[{name}]"),
            _ => format!("[{name}]^{exp}"),
        })
        .collect();

        if parts.is_empty() {
            f.write_str("[dimensionless]")
        } else {
            f.write_str(&parts.join(" * "))
        }
    }
}

/// A resolved unit: a scale factor relative to the internal base units and a dimension.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Unit {
    pub factor: f64,
    pub dimension: Dimension,
}

impl Unit {
    pub const fn new(factor: f64, dimension: Dimension) -> Self {
        Self { factor, dimension }
    }

    pub fn powi(self, exponent: i8) -> Self {
        Self::new(self.factor.powi(exponent as i32), self.dimension.powi(exponent))
    }
}

impl Mul for Unit {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Self::new(self.factor * rhs.factor, self.dimension * rhs.dimension)
    }
}

impl Div for Unit {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        Self::new(self.factor / rhs.factor, self.dimension / rhs.dimension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_mul_and_div_add_and_subtract_exponents() {
        let force = Dimension::MASS * Dimension::LENGTH / Dimension::TIME.powi(2);
        assert_eq!(force, Dimension::FORCE);
        assert_eq!(Dimension::ENERGY / Dimension::LENGTH, Dimension::FORCE);
    }

    #[test]
    fn dimension_display_lists_nonzero_exponents() {
        assert_eq!(Dimension::NONE.to_string(), "[dimensionless]");
        assert_eq!(Dimension::VELOCITY.to_string(), "[length] * [time]^-1");
    }

    #[test]
    fn native_units_have_the_kind_dimension() {
        for system in [UnitSystem::Real, UnitSystem::Metal] {
            for kind in PhysicalKind::ALL {
                assert_eq!(system.native_unit(kind).dimension, kind.dimension());
            }
        }
    }

    #[test]
    fn unit_system_keyword_round_trips() {
        assert_eq!(UnitSystem::from_keyword("REAL"), Some(UnitSystem::Real));
        assert_eq!(UnitSystem::from_keyword(UnitSystem::Metal.keyword()), Some(UnitSystem::Metal));
        assert_eq!(UnitSystem::from_keyword("lj"), None);
    }
}
