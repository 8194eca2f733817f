use super::dict::{LoadContext, class_of};
use super::traits::DictNode;
use crate::error::{Error, Result};
use serde_json::Value;
use tracing::trace;

/// Builds one concrete family member from its dictionary.
pub type Factory<T> = fn(&Value, &LoadContext) -> Result<T>;

/// A registration table from discriminator to constructor for one node family.
///
/// Each family declares a single `static` loader listing every concrete type it
/// knows; composites use it to rebuild children whose type is only known once
/// the dictionary is read.
pub struct Loader<T: 'static> {
    family: &'static str,
    entries: &'static [(&'static str, Factory<T>)],
}

impl<T: 'static> Loader<T> {
    pub const fn new(family: &'static str, entries: &'static [(&'static str, Factory<T>)]) -> Self {
        Self { family, entries }
    }

    pub fn family(&self) -> &'static str {
        self.family
    }

    pub fn classes(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(class, _)| *class)
    }

    pub fn is_registered(&self, class: &str) -> bool {
        self.entries.iter().any(|(name, _)| *name == class)
    }

    /// Dispatches on the discriminator and builds the matching family member.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingClass`] if the dictionary has no discriminator,
    /// [`Error::UnknownClass`] if nothing is registered under it, or whatever the
    /// matching constructor reports.
    pub fn load(&self, dict: &Value, cx: &LoadContext) -> Result<T> {
        let class = class_of(dict, self.family)?;
        let (_, factory) = self
            .entries
            .iter()
            .find(|(name, _)| *name == class)
            .ok_or_else(|| Error::UnknownClass {
                family: self.family,
                class: class.to_string(),
            })?;
        trace!(family = self.family, class, "Loading node");
        factory(dict, cx)
    }

    /// Loads every element of a JSON array, in order.
    pub fn load_all(&self, dicts: &[Value], cx: &LoadContext) -> Result<Vec<T>> {
        dicts.iter().map(|d| self.load(d, cx)).collect()
    }
}

/// Registration entry adapting a concrete node into its family type.
pub fn load_as<N, T>(dict: &Value, cx: &LoadContext) -> Result<T>
where
    N: DictNode + Into<T>,
{
    N::from_dict(dict, cx).map(Into::into)
}
