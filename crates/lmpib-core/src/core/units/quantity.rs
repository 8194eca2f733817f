use super::registry::native_unit_name;
use super::{PhysicalKind, UnitError, UnitRegistry, UnitSystem};
use crate::core::io::dict::{LegacyShape, LoadContext, decode, with_class};
use crate::core::io::traits::DictNode;
use crate::error::Result;
use serde::Deserialize;
use serde_json::{Value, json};
use std::fmt;
use std::marker::PhantomData;

/// Marker for the physical kind a [`Quantity`] carries.
pub trait QuantityKind: fmt::Debug + Clone + Copy + PartialEq {
    const KIND: PhysicalKind;
    /// Discriminator of the serialized quantity.
    const CLASS: &'static str;
}

macro_rules! quantity_kinds {
    ($($marker:ident => $alias:ident, $kind:ident;)*) => {
        $(
            #[derive(Debug, Clone, Copy, PartialEq, Eq)]
            pub struct $marker;

            impl QuantityKind for $marker {
                const KIND: PhysicalKind = PhysicalKind::$kind;
                const CLASS: &'static str = stringify!($alias);
            }

            pub type $alias = Quantity<$marker>;
        )*
    };
}

quantity_kinds! {
    Force => ForceQuantity, Force;
    Temperature => TemperatureQuantity, Temperature;
    Torque => TorqueQuantity, Torque;
    Time => TimeQuantity, Time;
    Energy => EnergyQuantity, Energy;
    Length => LengthQuantity, Length;
    Velocity => VelocityQuantity, Velocity;
}

/// A magnitude paired with the unit expression it was written in.
///
/// The unit is resolved and dimension-checked once, at construction; the scale
/// factors into both native unit systems are kept so that rendering never fails.
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity<K: QuantityKind> {
    magnitude: f64,
    units: String,
    real_scale: f64,
    metal_scale: f64,
    kind: PhantomData<K>,
}

#[derive(Deserialize)]
struct RawQuantity {
    magnitude: f64,
    units: String,
}

impl<K: QuantityKind> Quantity<K> {
    /// Resolves `units` against `registry` and checks it has the dimension of `K`.
    ///
    /// # Errors
    ///
    /// Returns [`UnitError::UnknownUnit`] or [`UnitError::Syntax`] if the expression
    /// does not resolve, and [`UnitError::DimensionMismatch`] if it describes another
    /// physical kind.
    pub fn new(registry: &UnitRegistry, magnitude: f64, units: &str) -> std::result::Result<Self, UnitError> {
        let unit = registry.parse(units)?;
        let expected = K::KIND.dimension();
        if unit.dimension != expected {
            return Err(UnitError::DimensionMismatch {
                kind: K::CLASS,
                units: units.to_string(),
                expected,
                found: unit.dimension,
            });
        }

        Ok(Self {
            magnitude,
            units: units.to_string(),
            real_scale: unit.factor / UnitSystem::Real.native_unit(K::KIND).factor,
            metal_scale: unit.factor / UnitSystem::Metal.native_unit(K::KIND).factor,
            kind: PhantomData,
        })
    }

    /// Builds a quantity expressed directly in the native unit of `system`.
    pub fn native(magnitude: f64, system: UnitSystem) -> Self {
        let factor = system.native_unit(K::KIND).factor;
        Self {
            magnitude,
            units: native_unit_name(system, K::KIND),
            real_scale: factor / UnitSystem::Real.native_unit(K::KIND).factor,
            metal_scale: factor / UnitSystem::Metal.native_unit(K::KIND).factor,
            kind: PhantomData,
        }
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    pub fn units(&self) -> &str {
        &self.units
    }

    /// The magnitude expressed in the native unit of `system`.
    pub fn convert_to(&self, system: UnitSystem) -> f64 {
        match system {
            UnitSystem::Real => self.magnitude * self.real_scale,
            UnitSystem::Metal => self.magnitude * self.metal_scale,
        }
    }
}

impl<K: QuantityKind> DictNode for Quantity<K> {
    const CLASS: &'static str = K::CLASS;

    fn to_dict(&self) -> Value {
        with_class(
            Self::CLASS,
            json!({ "magnitude": self.magnitude, "units": self.units }),
        )
    }

    fn from_dict(dict: &Value, cx: &LoadContext) -> Result<Self> {
        let raw: RawQuantity = decode(Self::CLASS, dict, cx, &LegacyShape::UNCHANGED)?;
        Ok(Self::new(cx.units, raw.magnitude, &raw.units)?)
    }
}

impl<K: QuantityKind> fmt::Display for Quantity<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.magnitude, self.units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn convert_to_is_identity_in_native_units() {
        let registry = UnitRegistry::new();
        let t = TemperatureQuantity::new(&registry, 300.0, "K").unwrap();
        assert_eq!(t.convert_to(UnitSystem::Real), 300.0);
        assert_eq!(t.convert_to(UnitSystem::Metal), 300.0);

        let f = ForceQuantity::new(&registry, 2.5, "lmp_real_force").unwrap();
        assert_eq!(f.convert_to(UnitSystem::Real), 2.5);
    }

    #[test]
    fn convert_to_scales_between_systems() {
        let registry = UnitRegistry::new();
        let dt = TimeQuantity::new(&registry, 1.0, "fs").unwrap();
        assert_eq!(dt.convert_to(UnitSystem::Real), 1.0);
        assert!((dt.convert_to(UnitSystem::Metal) - 0.001).abs() < 1e-15);

        let e = EnergyQuantity::new(&registry, 1.0, "eV").unwrap();
        assert!((e.convert_to(UnitSystem::Real) - 23.0605478).abs() < 1e-6);
    }

    #[test]
    fn new_rejects_mismatched_dimension() {
        let registry = UnitRegistry::new();
        let err = ForceQuantity::new(&registry, 1.0, "K").unwrap_err();
        assert!(matches!(
            err,
            UnitError::DimensionMismatch {
                kind: "ForceQuantity",
                ..
            }
        ));
    }

    #[test]
    fn native_quantity_converts_in_its_own_system_exactly() {
        let zero = ForceQuantity::native(0.0, UnitSystem::Real);
        assert_eq!(zero.units(), "lmp_real_force");
        assert_eq!(zero.convert_to(UnitSystem::Metal), 0.0);

        let v = VelocityQuantity::native(1.0, UnitSystem::Metal);
        assert_eq!(v.convert_to(UnitSystem::Metal), 1.0);
    }

    #[test]
    fn dict_round_trip_preserves_units_text() {
        let registry = UnitRegistry::new();
        let cx = LoadContext::new(&registry);
        let q = VelocityQuantity::new(&registry, 0.5, "angstrom/ps").unwrap();
        let dict = q.to_dict();
        assert_eq!(dict["class"], "VelocityQuantity");
        let back = VelocityQuantity::from_dict(&dict, &cx).unwrap();
        assert_eq!(back.to_dict(), dict);
    }

    #[test]
    fn from_dict_rejects_other_quantity_kinds() {
        let registry = UnitRegistry::new();
        let cx = LoadContext::new(&registry);
        let dict = TimeQuantity::new(&registry, 1.0, "fs").unwrap().to_dict();
        assert!(matches!(
            LengthQuantity::from_dict(&dict, &cx),
            Err(Error::ClassMismatch { .. })
        ));
    }
}
