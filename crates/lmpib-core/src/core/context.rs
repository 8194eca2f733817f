use crate::core::units::UnitSystem;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
}

/// Axis-aligned simulation box bounds, in angstrom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub xlo: f64,
    pub xhi: f64,
    pub ylo: f64,
    pub yhi: f64,
    pub zlo: f64,
    pub zhi: f64,
}

impl BoundingBox {
    pub fn new(lo: [f64; 3], hi: [f64; 3]) -> Self {
        Self {
            xlo: lo[0],
            xhi: hi[0],
            ylo: lo[1],
            yhi: hi[1],
            zlo: lo[2],
            zhi: hi[2],
        }
    }

    pub fn lengths(&self) -> [f64; 3] {
        [
            self.xhi - self.xlo,
            self.yhi - self.ylo,
            self.zhi - self.zlo,
        ]
    }
}

/// Read-only information every emitter may consult while rendering commands.
///
/// Produced by the molecular-system collaborator when it materializes its data
/// file, or assembled directly through [`CompileContextBuilder`].
#[derive(Debug, Clone, PartialEq)]
pub struct CompileContext {
    unit_system: UnitSystem,
    element_table: BTreeMap<u32, String>,
    bounding_box: Option<BoundingBox>,
    annotate: bool,
}

impl CompileContext {
    /// An annotated context with no element table and no bounding box.
    pub fn new(unit_system: UnitSystem) -> Self {
        Self {
            unit_system,
            element_table: BTreeMap::new(),
            bounding_box: None,
            annotate: true,
        }
    }

    pub fn builder() -> CompileContextBuilder {
        CompileContextBuilder::new()
    }

    pub fn unit_system(&self) -> UnitSystem {
        self.unit_system
    }

    pub fn element_table(&self) -> &BTreeMap<u32, String> {
        &self.element_table
    }

    /// Element symbols ordered by atom type index.
    pub fn element_symbols(&self) -> Vec<&str> {
        self.element_table.values().map(String::as_str).collect()
    }

    pub fn bounding_box(&self) -> Option<&BoundingBox> {
        self.bounding_box.as_ref()
    }

    /// Whether comment banners bracket sections and phases in the compiled text.
    pub fn annotate(&self) -> bool {
        self.annotate
    }

    pub fn with_annotate(self, annotate: bool) -> Self {
        Self { annotate, ..self }
    }
}

#[derive(Default)]
pub struct CompileContextBuilder {
    unit_system: Option<UnitSystem>,
    element_table: BTreeMap<u32, String>,
    bounding_box: Option<BoundingBox>,
    annotate: Option<bool>,
}

impl CompileContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unit_system(mut self, unit_system: UnitSystem) -> Self {
        self.unit_system = Some(unit_system);
        self
    }
    pub fn element(mut self, index: u32, symbol: impl Into<String>) -> Self {
        self.element_table.insert(index, symbol.into());
        self
    }
    pub fn elements(mut self, table: BTreeMap<u32, String>) -> Self {
        self.element_table.extend(table);
        self
    }
    pub fn bounding_box(mut self, bounding_box: BoundingBox) -> Self {
        self.bounding_box = Some(bounding_box);
        self
    }
    pub fn annotate(mut self, annotate: bool) -> Self {
        self.annotate = Some(annotate);
        self
    }

    pub fn build(self) -> Result<CompileContext, ConfigError> {
        Ok(CompileContext {
            unit_system: self
                .unit_system
                .ok_or(ConfigError::MissingParameter("unit_system"))?,
            element_table: self.element_table,
            bounding_box: self.bounding_box,
            annotate: self.annotate.unwrap_or(true),
        })
    }
}
