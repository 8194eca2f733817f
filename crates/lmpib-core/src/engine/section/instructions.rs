use super::{SECTION_KEYS_LEGACY, close_banner, emit_instructions, open_banner};
use crate::core::context::CompileContext;
use crate::core::io::dict::{LegacyShape, LoadContext, decode, with_class};
use crate::core::io::traits::DictNode;
use crate::core::models::instruction::{INSTRUCTION_LOADER, Instruction};
use crate::core::utils::identifiers::Identifier;
use crate::error::Result;
use serde::Deserialize;
use serde_json::{Value, json};

/// A flat list of one-shot commands with no declare or undo phase.
#[derive(Debug, Clone, PartialEq)]
pub struct InstructionsSection {
    name: Identifier,
    instructions: Vec<Instruction>,
}

#[derive(Deserialize)]
struct RawInstructionsSection {
    section_name: Identifier,
    #[serde(default)]
    instructions: Vec<Value>,
}

const INSTRUCTIONS_SECTION_LEGACY: LegacyShape = LegacyShape {
    renames: SECTION_KEYS_LEGACY,
    codes: &[],
};

impl InstructionsSection {
    pub fn new(name: &str) -> Result<Self> {
        Ok(Self {
            name: Identifier::new(name)?,
            instructions: Vec::new(),
        })
    }

    pub fn id(&self) -> &Identifier {
        &self.name
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn add_instruction(&mut self, instruction: impl Into<Instruction>) {
        self.instructions.push(instruction.into());
    }

    pub(super) fn compile_into(&self, ctx: &CompileContext, out: &mut String) -> Result<()> {
        open_banner(ctx, out, &self.name);
        emit_instructions(&self.instructions, ctx, out);
        close_banner(ctx, out, &self.name);
        Ok(())
    }
}

impl DictNode for InstructionsSection {
    const CLASS: &'static str = "InstructionsSection";

    fn to_dict(&self) -> Value {
        with_class(
            Self::CLASS,
            json!({
                "section_name": self.name,
                "instructions": self.instructions.iter().map(Instruction::to_dict).collect::<Vec<_>>(),
            }),
        )
    }

    fn from_dict(dict: &Value, cx: &LoadContext) -> Result<Self> {
        let raw: RawInstructionsSection =
            decode(Self::CLASS, dict, cx, &INSTRUCTIONS_SECTION_LEGACY)?;
        Ok(Self {
            name: raw.section_name,
            instructions: INSTRUCTION_LOADER.load_all(&raw.instructions, cx)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::instruction::{
        ManualInstruction, ResetTimestepInstruction, SetTimestepInstruction,
    };
    use crate::core::units::{TimeQuantity, UnitRegistry, UnitSystem};

    #[test]
    fn instructions_emit_in_append_order() {
        let registry = UnitRegistry::new();
        let mut section = InstructionsSection::new("setup").unwrap();
        section.add_instruction(ResetTimestepInstruction::new("reset", 0).unwrap());
        section.add_instruction(
            SetTimestepInstruction::new("dt", TimeQuantity::new(&registry, 1.0, "fs").unwrap())
                .unwrap(),
        );
        section.add_instruction(ManualInstruction::new("neigh", "neighbor 2.0 bin").unwrap());

        let ctx = CompileContext::builder()
            .unit_system(UnitSystem::Metal)
            .annotate(false)
            .build()
            .unwrap();
        let mut out = String::new();
        section.compile_into(&ctx, &mut out).unwrap();
        assert_eq!(out, "reset_timestep 0\ntimestep 0.001\nneighbor 2.0 bin\n");
    }

    #[test]
    fn empty_instructions_section_only_carries_banners() {
        let section = InstructionsSection::new("noop").unwrap();
        let mut out = String::new();
        section
            .compile_into(&CompileContext::new(UnitSystem::Real), &mut out)
            .unwrap();
        assert_eq!(out, "# >>> section noop\n# <<< section noop\n");
    }

    #[test]
    fn missing_instruction_list_loads_as_empty() {
        let registry = UnitRegistry::new();
        let cx = LoadContext::new(&registry);
        let dict = json!({"class": "InstructionsSection", "section_name": "s"});
        let section = InstructionsSection::from_dict(&dict, &cx).unwrap();
        assert!(section.instructions().is_empty());
    }
}
