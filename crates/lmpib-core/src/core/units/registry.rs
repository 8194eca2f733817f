use super::parser;
use super::{PhysicalKind, Unit, UnitError, UnitSystem};
use phf::{Map, phf_map};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Built-in unit constants, relative to g/mol, angstrom, femtosecond and kelvin.
pub mod builtin {
    use super::super::{Dimension, Unit};

    pub const AVOGADRO: f64 = 6.02214076e23;
    const JOULE_FACTOR: f64 = AVOGADRO * 1e-7;

    pub const DALTON: Unit = Unit::new(1.0, Dimension::MASS);
    pub const GRAM: Unit = Unit::new(AVOGADRO, Dimension::MASS);
    pub const KILOGRAM: Unit = Unit::new(1000.0 * AVOGADRO, Dimension::MASS);
    pub const MOLE: Unit = Unit::new(AVOGADRO, Dimension::NONE);

    pub const ANGSTROM: Unit = Unit::new(1.0, Dimension::LENGTH);
    pub const PICOMETER: Unit = Unit::new(1e-2, Dimension::LENGTH);
    pub const NANOMETER: Unit = Unit::new(10.0, Dimension::LENGTH);
    pub const MICROMETER: Unit = Unit::new(1e4, Dimension::LENGTH);
    pub const CENTIMETER: Unit = Unit::new(1e8, Dimension::LENGTH);
    pub const METER: Unit = Unit::new(1e10, Dimension::LENGTH);
    pub const BOHR: Unit = Unit::new(0.529177210903, Dimension::LENGTH);

    pub const FEMTOSECOND: Unit = Unit::new(1.0, Dimension::TIME);
    pub const PICOSECOND: Unit = Unit::new(1e3, Dimension::TIME);
    pub const NANOSECOND: Unit = Unit::new(1e6, Dimension::TIME);
    pub const SECOND: Unit = Unit::new(1e15, Dimension::TIME);

    pub const KELVIN: Unit = Unit::new(1.0, Dimension::TEMPERATURE);

    pub const JOULE: Unit = Unit::new(JOULE_FACTOR, Dimension::ENERGY);
    pub const KILOJOULE: Unit = Unit::new(1000.0 * JOULE_FACTOR, Dimension::ENERGY);
    pub const CALORIE: Unit = Unit::new(4.184 * JOULE_FACTOR, Dimension::ENERGY);
    pub const KILOCALORIE: Unit = Unit::new(4184.0 * JOULE_FACTOR, Dimension::ENERGY);
    pub const ELECTRON_VOLT: Unit = Unit::new(1.602176634e-19 * JOULE_FACTOR, Dimension::ENERGY);
    pub const HARTREE: Unit = Unit::new(4.3597447222071e-18 * JOULE_FACTOR, Dimension::ENERGY);

    pub const NEWTON: Unit = Unit::new(AVOGADRO * 1e-17, Dimension::FORCE);
}

use builtin::*;

static BUILTIN_UNITS: Map<&'static str, Unit> = phf_map! {
    "amu" => DALTON,
    "Da" => DALTON,
    "dalton" => DALTON,
    "g" => GRAM,
    "gram" => GRAM,
    "kg" => KILOGRAM,
    "kilogram" => KILOGRAM,
    "mol" => MOLE,
    "mole" => MOLE,

    "angstrom" => ANGSTROM,
    "Angstrom" => ANGSTROM,
    "pm" => PICOMETER,
    "nm" => NANOMETER,
    "nanometer" => NANOMETER,
    "um" => MICROMETER,
    "cm" => CENTIMETER,
    "m" => METER,
    "meter" => METER,
    "bohr" => BOHR,

    "fs" => FEMTOSECOND,
    "femtosecond" => FEMTOSECOND,
    "ps" => PICOSECOND,
    "picosecond" => PICOSECOND,
    "ns" => NANOSECOND,
    "nanosecond" => NANOSECOND,
    "s" => SECOND,
    "second" => SECOND,

    "K" => KELVIN,
    "kelvin" => KELVIN,

    "J" => JOULE,
    "joule" => JOULE,
    "kJ" => KILOJOULE,
    "cal" => CALORIE,
    "calorie" => CALORIE,
    "kcal" => KILOCALORIE,
    "kilocalorie" => KILOCALORIE,
    "eV" => ELECTRON_VOLT,
    "electron_volt" => ELECTRON_VOLT,
    "hartree" => HARTREE,

    "N" => NEWTON,
    "newton" => NEWTON,
};

#[derive(Debug, Deserialize)]
struct DefinitionsFile {
    #[serde(default)]
    units: HashMap<String, String>,
}

/// Resolves unit expressions for quantity construction.
///
/// A registry starts with the built-in table plus the native unit of every
/// physical kind under each [`UnitSystem`] (for example `lmp_real_force`), and
/// can be extended with user definitions.
#[derive(Debug, Clone)]
pub struct UnitRegistry {
    defined: HashMap<String, Unit>,
}

impl Default for UnitRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitRegistry {
    pub fn new() -> Self {
        let mut defined = HashMap::new();
        for system in [UnitSystem::Real, UnitSystem::Metal] {
            for kind in PhysicalKind::ALL {
                defined.insert(
                    native_unit_name(system, kind),
                    system.native_unit(kind),
                );
            }
        }
        Self { defined }
    }

    pub fn lookup(&self, name: &str) -> Option<Unit> {
        self.defined
            .get(name)
            .copied()
            .or_else(|| BUILTIN_UNITS.get(name).copied())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Parses a unit expression such as `"(kcal/mol)/angstrom"` or `"angstrom/fs**2"`.
    pub fn parse(&self, expression: &str) -> Result<Unit, UnitError> {
        parser::parse(expression, &|name| self.lookup(name))
    }

    /// Adds a named unit defined by an expression over already-known units.
    pub fn define(&mut self, name: &str, expression: &str) -> Result<(), UnitError> {
        if !is_unit_name(name) {
            return Err(UnitError::InvalidName(name.to_string()));
        }
        if self.contains(name) {
            return Err(UnitError::Duplicate(name.to_string()));
        }
        let unit = self.parse(expression)?;
        debug!(name, expression, factor = unit.factor, "Defined unit");
        self.defined.insert(name.to_string(), unit);
        Ok(())
    }

    /// Loads `[units] name = "expression"` definitions from a TOML file.
    ///
    /// Definitions may refer to each other in any order; each pass resolves
    /// whatever its dependencies allow until nothing is left.
    pub fn load_definitions(&mut self, path: &Path) -> Result<usize, UnitError> {
        let content = fs::read_to_string(path).map_err(|e| UnitError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let file: DefinitionsFile = toml::from_str(&content).map_err(|e| UnitError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;

        let mut pending: Vec<(String, String)> = file.units.into_iter().collect();
        pending.sort();
        let total = pending.len();

        while !pending.is_empty() {
            let before = pending.len();
            let mut deferred = Vec::new();
            let mut last_error = None;
            for (name, expression) in pending {
                match self.define(&name, &expression) {
                    Ok(()) => {}
                    Err(UnitError::UnknownUnit(missing)) => {
                        last_error = Some(UnitError::UnknownUnit(missing));
                        deferred.push((name, expression));
                    }
                    Err(e) => return Err(e),
                }
            }
            if deferred.len() == before {
                if let Some(e) = last_error {
                    return Err(e);
                }
                break;
            }
            pending = deferred;
        }

        debug!(path = %path.display(), count = total, "Loaded unit definitions");
        Ok(total)
    }
}

/// The registry name of a unit system's native unit, e.g. `lmp_metal_energy`.
pub fn native_unit_name(system: UnitSystem, kind: PhysicalKind) -> String {
    format!("lmp_{}_{}", system.keyword(), kind.suffix())
}

fn is_unit_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
