//! # Workflows Module
//!
//! The top-level entry points: a [`WorkflowBuilder`](builder::WorkflowBuilder)
//! owns one molecular system and the ordered sections run on it, and turns them
//! into a job folder ready for the simulation engine.
//!
//! ## Architecture
//!
//! - **Workflow Builder** ([`builder`]) - Job folder generation and the persisted workflow document
//! - **Molecular Systems** ([`system`]) - The model the workflow runs on and its declaration script

pub mod builder;
pub mod system;
