use super::{SECTION_KEYS_LEGACY, SECTION_LOADER, Section, close_banner, comment, emit_instructions, open_banner};
use crate::core::context::CompileContext;
use crate::core::io::dict::{LegacyShape, LoadContext, decode, with_class};
use crate::core::io::traits::DictNode;
use crate::core::models::extension::Extension;
use crate::core::models::fileio::FileIo;
use crate::core::models::group::Group;
use crate::core::models::instruction::{INSTRUCTION_LOADER, Instruction};
use crate::core::utils::identifiers::Identifier;
use crate::engine::scope::{LocalResources, RawResources};
use crate::error::Result;
use serde::Deserialize;
use serde_json::{Value, json};

/// The general composite: child sections compiled in order inside a local scope.
///
/// Children see the resources declared here and never re-declare them.
#[derive(Debug, Clone, PartialEq)]
pub struct RecursiveSection {
    name: Identifier,
    sections: Vec<Section>,
    resources: LocalResources,
    instructions: Vec<Instruction>,
}

#[derive(Deserialize)]
struct RawRecursiveSection {
    section_name: Identifier,
    #[serde(default)]
    sections: Vec<Value>,
    #[serde(flatten)]
    resources: RawResources,
    #[serde(default)]
    instructions: Vec<Value>,
}

const RECURSIVE_SECTION_LEGACY: LegacyShape = LegacyShape {
    renames: SECTION_KEYS_LEGACY,
    codes: &[],
};

impl RecursiveSection {
    pub fn new(name: &str) -> Result<Self> {
        Ok(Self {
            name: Identifier::new(name)?,
            sections: Vec::new(),
            resources: LocalResources::new(),
            instructions: Vec::new(),
        })
    }

    pub fn id(&self) -> &Identifier {
        &self.name
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn resources(&self) -> &LocalResources {
        &self.resources
    }

    pub fn add_section(&mut self, section: impl Into<Section>) {
        self.sections.push(section.into());
    }

    pub fn add_group(&mut self, group: impl Into<Group>) {
        self.resources.add_group(group);
    }

    pub fn add_extension(&mut self, extension: impl Into<Extension>) {
        self.resources.add_extension(extension);
    }

    pub fn add_fileio(&mut self, fileio: impl Into<FileIo>) {
        self.resources.add_fileio(fileio);
    }

    /// Adds a one-shot command, emitted after the local declarations and
    /// before the first child section.
    pub fn add_instruction(&mut self, instruction: impl Into<Instruction>) {
        self.instructions.push(instruction.into());
    }

    pub(super) fn compile_into(&self, ctx: &CompileContext, out: &mut String) -> Result<()> {
        open_banner(ctx, out, &self.name);
        comment(ctx, out, "declare");
        self.resources.scoped(ctx, out, |out| {
            emit_instructions(&self.instructions, ctx, out);
            for section in &self.sections {
                section.compile_into(ctx, out)?;
            }
            comment(ctx, out, "undo");
            Ok(())
        })?;
        close_banner(ctx, out, &self.name);
        Ok(())
    }
}

impl DictNode for RecursiveSection {
    const CLASS: &'static str = "RecursiveSection";

    fn to_dict(&self) -> Value {
        let mut dict = with_class(
            Self::CLASS,
            json!({
                "section_name": self.name,
                "sections": self.sections.iter().map(Section::to_dict).collect::<Vec<_>>(),
            }),
        );
        if let Value::Object(map) = &mut dict {
            self.resources.write_dict(map);
            map.insert(
                "instructions".to_string(),
                Value::Array(self.instructions.iter().map(Instruction::to_dict).collect()),
            );
        }
        dict
    }

    fn from_dict(dict: &Value, cx: &LoadContext) -> Result<Self> {
        let raw: RawRecursiveSection = decode(Self::CLASS, dict, cx, &RECURSIVE_SECTION_LEGACY)?;
        Ok(Self {
            name: raw.section_name,
            sections: SECTION_LOADER.load_all(&raw.sections, cx)?,
            resources: LocalResources::from_raw(raw.resources, cx)?,
            instructions: INSTRUCTION_LOADER.load_all(&raw.instructions, cx)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::fileio::{DumpStyle, DumpTrajectoryFileIo};
    use crate::core::models::group::{AllGroup, ReferenceGroup};
    use crate::core::models::integrator::RunZeroIntegrator;
    use crate::core::units::UnitSystem;
    use crate::engine::section::IntegratorSection;
    use crate::error::Error;

    #[test]
    fn empty_recursive_section_emits_no_commands() {
        let section = RecursiveSection::new("empty_scope").unwrap();
        let ctx = CompileContext::builder()
            .unit_system(UnitSystem::Real)
            .annotate(false)
            .build()
            .unwrap();
        let mut out = String::new();
        section.compile_into(&ctx, &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn child_failure_aborts_the_parent() {
        let mut section = RecursiveSection::new("outer").unwrap();
        let mut inner = IntegratorSection::new("inner", RunZeroIntegrator::new("probe").unwrap()).unwrap();
        inner.add_fileio(
            DumpTrajectoryFileIo::new("traj", DumpStyle::Custom, &["element"], true, 10, &AllGroup::new().into())
                .unwrap(),
        );
        section.add_section(inner);

        let mut out = String::new();
        let err = section
            .compile_into(&CompileContext::new(UnitSystem::Real), &mut out)
            .unwrap_err();
        assert!(matches!(err, Error::MissingContext { ref node, .. } if node == "traj"));
    }

    #[test]
    fn reference_group_passes_outer_handle_to_children() {
        let outer_group: Group = crate::core::models::group::IndicesGroup::new("mobile", &[1, 2, 3])
            .unwrap()
            .into();
        let alias: Group = ReferenceGroup::new("moving", &outer_group).unwrap().into();

        let mut inner = IntegratorSection::new(
            "md",
            crate::core::models::integrator::NveIntegrator::new("md", &alias, 10).unwrap(),
        )
        .unwrap();
        inner.add_group(alias);

        let mut section = RecursiveSection::new("outer").unwrap();
        section.add_group(outer_group);
        section.add_section(inner);

        let ctx = CompileContext::builder()
            .unit_system(UnitSystem::Real)
            .annotate(false)
            .build()
            .unwrap();
        let mut out = String::new();
        section.compile_into(&ctx, &mut out).unwrap();
        assert_eq!(
            out,
            "group mobile id 1 2 3\nfix md mobile nve\nrun 10\nunfix md\ngroup mobile delete\n"
        );
    }
}
