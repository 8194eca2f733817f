//! Scopes of the compiled script.
//!
//! A [`Section`] owns the building blocks that live for its duration and
//! compiles into a declare, run, undo block. Sections nest: a
//! [`RecursiveSection`] compiles each child in full while its own resources are
//! live, and a [`TemplateSection`] does the same with children generated on
//! demand.

mod instructions;
mod integrator;
mod recursive;
mod template;

pub use instructions::InstructionsSection;
pub use integrator::IntegratorSection;
pub use recursive::RecursiveSection;
pub use template::{MinimizeTemplate, SectionTemplate, TEMPLATE_LOADER, TemplateSection};

use crate::core::context::CompileContext;
use crate::core::io::dict::LoadContext;
use crate::core::io::loader::{Loader, load_as};
use crate::core::io::traits::DictNode;
use crate::core::models::instruction::Instruction;
use crate::core::utils::identifiers::Identifier;
use crate::error::Result;
use serde_json::Value;
use tracing::debug;

/// Key renames shared by every section in legacy documents.
const SECTION_KEYS_LEGACY: &[(&str, &str)] = &[("fileIOs", "fileios"), ("sectionName", "section_name")];

/// A scope of the compiled script.
#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    Integrator(IntegratorSection),
    Instructions(InstructionsSection),
    Recursive(RecursiveSection),
    Template(TemplateSection),
}

pub static SECTION_LOADER: Loader<Section> = Loader::new(
    "Section",
    &[
        (IntegratorSection::CLASS, load_as::<IntegratorSection, Section>),
        (InstructionsSection::CLASS, load_as::<InstructionsSection, Section>),
        (RecursiveSection::CLASS, load_as::<RecursiveSection, Section>),
        (MinimizeTemplate::CLASS, load_template),
    ],
);

fn load_template(dict: &Value, cx: &LoadContext) -> Result<Section> {
    TemplateSection::from_dict(dict, cx).map(Section::Template)
}

impl Section {
    pub fn id(&self) -> &Identifier {
        match self {
            Section::Integrator(s) => s.id(),
            Section::Instructions(s) => s.id(),
            Section::Recursive(s) => s.id(),
            Section::Template(s) => s.id(),
        }
    }

    pub fn class(&self) -> &'static str {
        match self {
            Section::Integrator(_) => IntegratorSection::CLASS,
            Section::Instructions(_) => InstructionsSection::CLASS,
            Section::Recursive(_) => RecursiveSection::CLASS,
            Section::Template(s) => s.template().class(),
        }
    }

    /// Compiles the section into its full command block.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a building block during emission,
    /// such as [`Error::MissingContext`](crate::error::Error::MissingContext).
    /// No partial text is returned.
    pub fn compile(&self, ctx: &CompileContext) -> Result<String> {
        let mut out = String::new();
        self.compile_into(ctx, &mut out)?;
        Ok(out)
    }

    pub(crate) fn compile_into(&self, ctx: &CompileContext, out: &mut String) -> Result<()> {
        debug!(section = %self.id(), class = self.class(), "compiling section");
        match self {
            Section::Integrator(s) => s.compile_into(ctx, out),
            Section::Instructions(s) => s.compile_into(ctx, out),
            Section::Recursive(s) => s.compile_into(ctx, out),
            Section::Template(s) => s.compile_into(ctx, out),
        }
    }

    /// The sections this one runs as children: stored children for a
    /// [`RecursiveSection`], freshly generated ones for a [`TemplateSection`].
    pub fn generated_sections(&self) -> Result<Vec<Section>> {
        match self {
            Section::Recursive(s) => Ok(s.sections().to_vec()),
            Section::Template(s) => s.generate_sections(),
            Section::Integrator(_) | Section::Instructions(_) => Ok(Vec::new()),
        }
    }

    pub fn to_dict(&self) -> Value {
        match self {
            Section::Integrator(s) => s.to_dict(),
            Section::Instructions(s) => s.to_dict(),
            Section::Recursive(s) => s.to_dict(),
            Section::Template(s) => s.to_dict(),
        }
    }

    pub fn from_dict(dict: &Value, cx: &LoadContext) -> Result<Self> {
        SECTION_LOADER.load(dict, cx)
    }
}

impl From<IntegratorSection> for Section {
    fn from(s: IntegratorSection) -> Self {
        Section::Integrator(s)
    }
}

impl From<InstructionsSection> for Section {
    fn from(s: InstructionsSection) -> Self {
        Section::Instructions(s)
    }
}

impl From<RecursiveSection> for Section {
    fn from(s: RecursiveSection) -> Self {
        Section::Recursive(s)
    }
}

impl From<TemplateSection> for Section {
    fn from(s: TemplateSection) -> Self {
        Section::Template(s)
    }
}

fn open_banner(ctx: &CompileContext, out: &mut String, name: &Identifier) {
    comment(ctx, out, &format!(">>> section {name}"));
}

fn close_banner(ctx: &CompileContext, out: &mut String, name: &Identifier) {
    comment(ctx, out, &format!("<<< section {name}"));
}

fn comment(ctx: &CompileContext, out: &mut String, text: &str) {
    if ctx.annotate() {
        out.push_str("# ");
        out.push_str(text);
        out.push('\n');
    }
}

fn emit_instructions(instructions: &[Instruction], ctx: &CompileContext, out: &mut String) {
    for instruction in instructions {
        out.push_str(&instruction.command(ctx));
    }
}
