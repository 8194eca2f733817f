//! # lmpib Core Library
//!
//! A declarative compiler for LAMMPS input scripts. Simulation workflows are
//! described as trees of reusable building blocks (atom groups, persistent
//! modifiers, output writers, one-shot commands and integrators) and compiled
//! into a procedural script inside a job folder.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture:
//!
//! - **[`core`]: The Foundation.** The leaf building blocks, physical quantities
//!   and their unit conventions, and the versioned dictionary serialization every
//!   node supports.
//!
//! - **[`engine`]: The Logic Core.** Sections and their scoped declare, run, undo
//!   lifecycle, including template sections that expand into concrete ones at
//!   compile time.
//!
//! - **[`workflows`]: The Public API.** The molecular system a workflow runs on
//!   and the `WorkflowBuilder` that writes job folders and persisted workflow
//!   documents.

pub mod core;
pub mod engine;
pub mod error;
pub mod workflows;

use crate::core::models::extension::EXTENSION_LOADER;
use crate::core::models::fileio::FILEIO_LOADER;
use crate::core::models::group::GROUP_LOADER;
use crate::core::models::instruction::INSTRUCTION_LOADER;
use crate::core::models::integrator::INTEGRATOR_LOADER;
use crate::engine::section::SECTION_LOADER;
use crate::workflows::system::MOLECULAR_SYSTEM_LOADER;

/// Every registered discriminator, grouped by node family.
pub fn registered_classes() -> Vec<(&'static str, Vec<&'static str>)> {
    vec![
        (GROUP_LOADER.family(), GROUP_LOADER.classes().collect()),
        (FILEIO_LOADER.family(), FILEIO_LOADER.classes().collect()),
        (EXTENSION_LOADER.family(), EXTENSION_LOADER.classes().collect()),
        (INSTRUCTION_LOADER.family(), INSTRUCTION_LOADER.classes().collect()),
        (INTEGRATOR_LOADER.family(), INTEGRATOR_LOADER.classes().collect()),
        (SECTION_LOADER.family(), SECTION_LOADER.classes().collect()),
        (MOLECULAR_SYSTEM_LOADER.family(), MOLECULAR_SYSTEM_LOADER.classes().collect()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_classes_cover_every_family() {
        let classes = registered_classes();
        let families: Vec<&str> = classes.iter().map(|(f, _)| *f).collect();
        assert_eq!(
            families,
            ["Group", "FileIO", "Extension", "Instruction", "Integrator", "Section", "MolecularSystem"]
        );
        let sections = &classes[5].1;
        assert!(sections.contains(&"MinimizeTemplate"));
        assert!(classes.iter().all(|(_, c)| !c.is_empty()));
    }
}
