//! # Core Models Module
//!
//! The five leaf families a workflow is assembled from. Each family is a
//! closed enum over its concrete node types, registered with a [`Loader`]
//! keyed by the `class` discriminator of its dictionary form.
//!
//! ## Key Components
//!
//! - [`group`] - Named atom selections (`group` / `group delete`)
//! - [`fileio`] - Periodic output streams (`dump`, `fix reaxff/bonds`, `thermo_style`)
//! - [`extension`] - Persistent modifiers of the dynamics (`fix` / `unfix`)
//! - [`instruction`] - One-shot commands with nothing to undo
//! - [`integrator`] - The run phase of a section (`run`, `minimize`)
//!
//! [`Loader`]: crate::core::io::loader::Loader

pub mod extension;
pub mod fileio;
pub mod group;
pub mod instruction;
pub mod integrator;
