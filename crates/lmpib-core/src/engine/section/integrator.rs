use super::{SECTION_KEYS_LEGACY, close_banner, comment, emit_instructions, open_banner};
use crate::core::context::CompileContext;
use crate::core::io::dict::{LegacyShape, LoadContext, decode, with_class};
use crate::core::io::traits::DictNode;
use crate::core::models::extension::Extension;
use crate::core::models::fileio::FileIo;
use crate::core::models::group::Group;
use crate::core::models::instruction::{INSTRUCTION_LOADER, Instruction};
use crate::core::models::integrator::Integrator;
use crate::core::utils::identifiers::Identifier;
use crate::engine::scope::{LocalResources, RawResources};
use crate::error::Result;
use serde::Deserialize;
use serde_json::{Value, json};

/// A leaf scope that runs one integrator while its local resources are live.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegratorSection {
    name: Identifier,
    integrator: Integrator,
    resources: LocalResources,
    instructions: Vec<Instruction>,
}

#[derive(Deserialize)]
struct RawIntegratorSection {
    section_name: Identifier,
    integrator: Value,
    #[serde(flatten)]
    resources: RawResources,
    #[serde(default)]
    instructions: Vec<Value>,
}

const INTEGRATOR_SECTION_LEGACY: LegacyShape = LegacyShape {
    renames: SECTION_KEYS_LEGACY,
    codes: &[],
};

impl IntegratorSection {
    pub fn new(name: &str, integrator: impl Into<Integrator>) -> Result<Self> {
        Ok(Self {
            name: Identifier::new(name)?,
            integrator: integrator.into(),
            resources: LocalResources::new(),
            instructions: Vec::new(),
        })
    }

    pub fn id(&self) -> &Identifier {
        &self.name
    }

    pub fn integrator(&self) -> &Integrator {
        &self.integrator
    }

    pub fn set_integrator(&mut self, integrator: impl Into<Integrator>) {
        self.integrator = integrator.into();
    }

    pub fn resources(&self) -> &LocalResources {
        &self.resources
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
    /// before the integrator is set up.
    pub fn add_instruction(&mut self, instruction: impl Into<Instruction>) {
        self.instructions.push(instruction.into());
    }

    pub(super) fn compile_into(&self, ctx: &CompileContext, out: &mut String) -> Result<()> {
        open_banner(ctx, out, &self.name);
        comment(ctx, out, "declare");
        self.resources.scoped(ctx, out, |out| {
            emit_instructions(&self.instructions, ctx, out);
            out.push_str(&self.integrator.do_commands(ctx)?);
            comment(ctx, out, "run");
            out.push_str(&self.integrator.run_commands());
            comment(ctx, out, "undo");
            out.push_str(&self.integrator.undo_commands());
            Ok(())
        })?;
        close_banner(ctx, out, &self.name);
        Ok(())
    }
}

impl DictNode for IntegratorSection {
    const CLASS: &'static str = "IntegratorSection";

    fn to_dict(&self) -> Value {
        let mut dict = with_class(
            Self::CLASS,
            json!({
                "section_name": self.name,
                "integrator": self.integrator.to_dict(),
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
        let raw: RawIntegratorSection = decode(Self::CLASS, dict, cx, &INTEGRATOR_SECTION_LEGACY)?;
        Ok(Self {
            name: raw.section_name,
            integrator: Integrator::from_dict(&raw.integrator, cx)?,
            resources: LocalResources::from_raw(raw.resources, cx)?,
            instructions: INSTRUCTION_LOADER.load_all(&raw.instructions, cx)?,
        })
    }
}
