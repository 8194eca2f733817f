//! Small helpers shared by every emitter: identifier validation and the
//! textual conventions of the generated script.

pub mod identifiers;
pub mod text;
