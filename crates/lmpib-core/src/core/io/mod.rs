//! Provides the persisted dictionary form of workflow trees.
//!
//! Every node serializes to a JSON object tagged with a `class` discriminator.
//! Each node family owns one [`loader::Loader`], a static registration table
//! that maps discriminators to constructors, so composites can rebuild children
//! of any registered concrete type. Older document shapes are migrated on load
//! according to the schema version carried by [`dict::LoadContext`].

pub mod dict;
pub mod loader;
pub mod traits;
