//! # Core Module
//!
//! The building blocks every compiled workflow is made of: the leaf command
//! families, the physical unit system they are expressed in, the compile-time
//! context, and the dictionary serialization layer.
//!
//! ## Architecture
//!
//! - **Leaf Nodes** ([`models`]) - Groups, file outputs, extensions, instructions and integrators
//! - **Units** ([`units`]) - Dimensioned quantities converted to the engine's unit style
//! - **Serialization** ([`io`]) - Versioned, class-tagged dictionaries and their loaders
//! - **Context** ([`context`]) - Unit style, element table and annotation settings
//! - **Utilities** ([`utils`]) - Identifier validation and command text conventions

pub mod context;
pub mod io;
pub mod models;
pub mod units;
pub mod utils;
