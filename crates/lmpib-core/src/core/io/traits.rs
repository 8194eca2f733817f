use super::dict::LoadContext;
use crate::error::{Error, Result};
use serde_json::Value;

/// Defines the lossless dictionary round-trip every persisted node supports.
///
/// Implementors emit their fields together with their discriminator and rebuild
/// themselves in one step from a dictionary, validating exactly as their
/// constructors do.
pub trait DictNode: Sized {
    /// The discriminator written under the `class` key.
    const CLASS: &'static str;

    /// Serializes the node, discriminator first.
    fn to_dict(&self) -> Value;

    /// Rebuilds a node from its dictionary form.
    ///
    /// # Arguments
    ///
    /// * `dict` - The dictionary produced by [`DictNode::to_dict`] (or a legacy equivalent).
    /// * `cx` - The schema version and unit registry to load against.
    ///
    /// # Return
    ///
    /// Returns the fully constructed node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClassMismatch`] if the discriminator names another type,
    /// [`Error::Malformed`] if fields do not parse, or any error the node's
    /// constructor raises.
    fn from_dict(dict: &Value, cx: &LoadContext) -> Result<Self>;

    /// Serializes the node to a pretty-printed JSON string.
    fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.to_dict()).map_err(|e| Error::malformed(Self::CLASS, e))
    }

    /// Parses a JSON string and rebuilds the node from it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if the text is not JSON, or any error of
    /// [`DictNode::from_dict`].
    fn from_json_str(text: &str, cx: &LoadContext) -> Result<Self> {
        let dict: Value = serde_json::from_str(text).map_err(|e| Error::malformed(Self::CLASS, e))?;
        Self::from_dict(&dict, cx)
    }
}
