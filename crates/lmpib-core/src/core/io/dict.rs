use crate::core::units::UnitRegistry;
use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Key of the type discriminator in every serialized node.
pub const CLASS_KEY: &str = "class";

/// Schema version written by this library.
pub const CURRENT_VERSION: u32 = 1;

/// Schema version of documents that predate string enum codes and snake_case keys.
pub const LEGACY_VERSION: u32 = 0;

/// Everything a node needs while being rebuilt from its dictionary form.
#[derive(Debug, Clone, Copy)]
pub struct LoadContext<'a> {
    pub version: u32,
    pub units: &'a UnitRegistry,
}

impl<'a> LoadContext<'a> {
    pub fn new(units: &'a UnitRegistry) -> Self {
        Self {
            version: CURRENT_VERSION,
            units,
        }
    }

    pub fn with_version(self, version: u32) -> Self {
        Self { version, ..self }
    }

    pub fn is_legacy(&self) -> bool {
        self.version < CURRENT_VERSION
    }
}

/// Field shape changes between the legacy schema and the current one.
///
/// `renames` maps old keys to new keys. `codes` maps a key holding an integer
/// enum code (optionally wrapped in a one-element array) to the names indexed by
/// that code.
#[derive(Debug, Clone, Copy)]
pub struct LegacyShape {
    pub renames: &'static [(&'static str, &'static str)],
    pub codes: &'static [(&'static str, &'static [&'static str])],
}

impl LegacyShape {
    pub const UNCHANGED: LegacyShape = LegacyShape {
        renames: &[],
        codes: &[],
    };

    /// Rewrites a legacy dictionary into the current field shape.
    pub fn upgrade(&self, dict: &Value) -> Value {
        let Value::Object(source) = dict else {
            return dict.clone();
        };
        let mut upgraded = source.clone();

        for (old, new) in self.renames {
            if upgraded.contains_key(*new) {
                continue;
            }
            if let Some(value) = upgraded.remove(*old) {
                upgraded.insert((*new).to_string(), value);
            }
        }

        for (key, names) in self.codes {
            let code = match upgraded.get(*key) {
                Some(Value::Array(items)) if items.len() == 1 => items[0].as_u64(),
                Some(value) => value.as_u64(),
                None => None,
            };
            if let Some(name) = code.and_then(|c| names.get(c as usize)) {
                upgraded.insert((*key).to_string(), Value::String((*name).to_string()));
            }
        }

        Value::Object(upgraded)
    }
}

/// Reads the discriminator of a dictionary belonging to `family`.
pub fn class_of<'d>(dict: &'d Value, family: &'static str) -> Result<&'d str> {
    dict.get(CLASS_KEY)
        .and_then(Value::as_str)
        .ok_or(Error::MissingClass { family })
}

/// Fails with [`Error::ClassMismatch`] unless the dictionary carries `expected`.
pub fn expect_class(dict: &Value, expected: &'static str) -> Result<()> {
    let found = class_of(dict, expected)?;
    if found == expected {
        Ok(())
    } else {
        Err(Error::ClassMismatch {
            expected,
            found: found.to_string(),
        })
    }
}

/// Checks the discriminator, migrates legacy shapes and decodes the raw fields of a node.
pub fn decode<T: DeserializeOwned>(
    class: &'static str,
    dict: &Value,
    cx: &LoadContext,
    legacy: &LegacyShape,
) -> Result<T> {
    expect_class(dict, class)?;
    let body = if cx.is_legacy() {
        legacy.upgrade(dict)
    } else {
        dict.clone()
    };
    serde_json::from_value(body).map_err(|e| Error::malformed(class, e))
}

/// Builds a dictionary whose first key is the discriminator.
pub fn with_class(class: &str, body: Value) -> Value {
    let mut dict = Map::new();
    dict.insert(CLASS_KEY.to_string(), Value::String(class.to_string()));
    if let Value::Object(fields) = body {
        dict.extend(fields);
    }
    Value::Object(dict)
}
