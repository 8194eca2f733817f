//! # Engine Module
//!
//! Compiles trees of sections into engine command text.
//!
//! ## Overview
//!
//! Every section compiles into a declare, run, undo block. Resources declared by
//! a section stay live while its run phase or its child sections execute, and
//! are released in strict last-in, first-out order afterwards, so a compiled
//! section leaves the engine's named-object bookkeeping as it found it.
//!
//! ## Architecture
//!
//! - **Sections** ([`section`]) - Integrator, instruction, recursive and template scopes
//! - **Scopes** ([`scope`]) - Declaration and release of a section's local resources
//! - **Progress Monitoring** ([`progress`]) - Progress events for long job generation

pub mod progress;
pub mod scope;
pub mod section;
