use super::group::{ALL_GROUP_NAME, Group};
use crate::core::context::CompileContext;
use crate::core::io::dict::{LegacyShape, LoadContext, decode, with_class};
use crate::core::io::loader::{Loader, load_as};
use crate::core::io::traits::DictNode;
use crate::core::units::{LengthQuantity, TemperatureQuantity, TimeQuantity};
use crate::core::utils::identifiers::Identifier;
use crate::core::utils::text::{command_lines, fmt_number};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// A one-shot command with no undo.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    ResetTimestep(ResetTimestepInstruction),
    SetTimestep(SetTimestepInstruction),
    VelocityCreate(VelocityCreateInstruction),
    Variable(VariableInstruction),
    DisplaceAtoms(DisplaceAtomsInstruction),
    Manual(ManualInstruction),
}

pub static INSTRUCTION_LOADER: Loader<Instruction> = Loader::new(
    "Instruction",
    &[
        (ResetTimestepInstruction::CLASS, load_as::<ResetTimestepInstruction, Instruction>),
        (SetTimestepInstruction::CLASS, load_as::<SetTimestepInstruction, Instruction>),
        (VelocityCreateInstruction::CLASS, load_as::<VelocityCreateInstruction, Instruction>),
        (VariableInstruction::CLASS, load_as::<VariableInstruction, Instruction>),
        (DisplaceAtomsInstruction::CLASS, load_as::<DisplaceAtomsInstruction, Instruction>),
        (ManualInstruction::CLASS, load_as::<ManualInstruction, Instruction>),
    ],
);

impl Instruction {
    pub fn id(&self) -> &Identifier {
        match self {
            Instruction::ResetTimestep(i) => &i.name,
            Instruction::SetTimestep(i) => &i.name,
            Instruction::VelocityCreate(i) => &i.name,
            Instruction::Variable(i) => &i.name,
            Instruction::DisplaceAtoms(i) => &i.name,
            Instruction::Manual(i) => &i.name,
        }
    }

    /// Renders the instruction as a newline-terminated command line.
    pub fn command(&self, ctx: &CompileContext) -> String {
        let units = ctx.unit_system();
        match self {
            Instruction::ResetTimestep(i) => format!("reset_timestep {}\n", i.timestep),
            Instruction::SetTimestep(i) => {
                format!("timestep {}\n", fmt_number(i.timestep.convert_to(units)))
            }
            Instruction::VelocityCreate(i) => format!(
                "velocity {} create {} {} dist gaussian\n",
                i.group_name,
                fmt_number(i.temp.convert_to(units)),
                i.seed
            ),
            Instruction::Variable(i) => {
                if i.args.is_empty() {
                    format!("variable {} {}\n", i.variable_name, i.style.keyword())
                } else {
                    format!("variable {} {} {}\n", i.variable_name, i.style.keyword(), i.args)
                }
            }
            Instruction::DisplaceAtoms(i) => format!(
                "displace_atoms {} move {} {} {}\n",
                i.group_name,
                fmt_number(i.dx.convert_to(units)),
                fmt_number(i.dy.convert_to(units)),
                fmt_number(i.dz.convert_to(units))
            ),
            Instruction::Manual(i) => command_lines(&i.cmd),
        }
    }

    pub fn to_dict(&self) -> Value {
        match self {
            Instruction::ResetTimestep(i) => i.to_dict(),
            Instruction::SetTimestep(i) => i.to_dict(),
            Instruction::VelocityCreate(i) => i.to_dict(),
            Instruction::Variable(i) => i.to_dict(),
            Instruction::DisplaceAtoms(i) => i.to_dict(),
            Instruction::Manual(i) => i.to_dict(),
        }
    }

    pub fn from_dict(dict: &Value, cx: &LoadContext) -> Result<Self> {
        INSTRUCTION_LOADER.load(dict, cx)
    }
}

macro_rules! instruction_variant {
    ($($variant:ident($ty:ident)),* $(,)?) => {
        $(
            impl From<$ty> for Instruction {
                fn from(instruction: $ty) -> Self {
                    Instruction::$variant(instruction)
                }
            }
        )*
    };
}

instruction_variant!(
    ResetTimestep(ResetTimestepInstruction),
    SetTimestep(SetTimestepInstruction),
    VelocityCreate(VelocityCreateInstruction),
    Variable(VariableInstruction),
    DisplaceAtoms(DisplaceAtomsInstruction),
    Manual(ManualInstruction),
);

fn default_group() -> Identifier {
    Identifier::predefined(ALL_GROUP_NAME)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResetTimestepInstruction {
    name: Identifier,
    timestep: u64,
}

#[derive(Deserialize)]
struct RawResetTimestep {
    instruction_name: Identifier,
    #[serde(default)]
    timestep: u64,
}

impl ResetTimestepInstruction {
    pub fn new(name: &str, timestep: u64) -> Result<Self> {
        Ok(Self {
            name: Identifier::new(name)?,
            timestep,
        })
    }
}

impl DictNode for ResetTimestepInstruction {
    const CLASS: &'static str = "ResetTimestepInstruction";

    fn to_dict(&self) -> Value {
        with_class(
            Self::CLASS,
            json!({ "instruction_name": self.name, "timestep": self.timestep }),
        )
    }

    fn from_dict(dict: &Value, cx: &LoadContext) -> Result<Self> {
        let raw: RawResetTimestep = decode(Self::CLASS, dict, cx, &LegacyShape::UNCHANGED)?;
        Ok(Self {
            name: raw.instruction_name,
            timestep: raw.timestep,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetTimestepInstruction {
    name: Identifier,
    timestep: TimeQuantity,
}

#[derive(Deserialize)]
struct RawSetTimestep {
    instruction_name: Identifier,
    timestep: Value,
}

impl SetTimestepInstruction {
    /// Fails if the timestep magnitude is negative.
    pub fn new(name: &str, timestep: TimeQuantity) -> Result<Self> {
        let name = Identifier::new(name)?;
        if timestep.magnitude() < 0.0 {
            return Err(Error::configuration(
                name.as_str(),
                format!("timestep {timestep} must not be negative"),
            ));
        }
        Ok(Self { name, timestep })
    }

    pub fn timestep(&self) -> &TimeQuantity {
        &self.timestep
    }
}

impl DictNode for SetTimestepInstruction {
    const CLASS: &'static str = "SetTimestepInstruction";

    fn to_dict(&self) -> Value {
        with_class(
            Self::CLASS,
            json!({ "instruction_name": self.name, "timestep": self.timestep.to_dict() }),
        )
    }

    fn from_dict(dict: &Value, cx: &LoadContext) -> Result<Self> {
        let raw: RawSetTimestep = decode(Self::CLASS, dict, cx, &LegacyShape::UNCHANGED)?;
        Self::new(
            raw.instruction_name.as_str(),
            TimeQuantity::from_dict(&raw.timestep, cx)?,
        )
    }
}

/// Draws initial velocities from a Gaussian distribution at a temperature.
#[derive(Debug, Clone, PartialEq)]
pub struct VelocityCreateInstruction {
    name: Identifier,
    group_name: Identifier,
    temp: TemperatureQuantity,
    seed: u64,
}

#[derive(Deserialize)]
struct RawVelocityCreate {
    instruction_name: Identifier,
    #[serde(default = "default_group")]
    group_name: Identifier,
    temp: Value,
    #[serde(default = "default_velocity_seed")]
    seed: u64,
}

fn default_velocity_seed() -> u64 {
    12335
}

const VELOCITY_LEGACY: LegacyShape = LegacyShape {
    renames: &[("group", "group_name")],
    codes: &[],
};

impl VelocityCreateInstruction {
    /// Fails if the temperature magnitude is negative.
    pub fn new(name: &str, group: &Group, temp: TemperatureQuantity, seed: u64) -> Result<Self> {
        Self::with_group_name(name, Identifier::new(group.handle())?, temp, seed)
    }

    fn with_group_name(
        name: &str,
        group_name: Identifier,
        temp: TemperatureQuantity,
        seed: u64,
    ) -> Result<Self> {
        let name = Identifier::new(name)?;
        if temp.magnitude() < 0.0 {
            return Err(Error::configuration(
                name.as_str(),
                format!("temperature {temp} must not be negative"),
            ));
        }
        Ok(Self {
            name,
            group_name,
            temp,
            seed,
        })
    }
}

impl DictNode for VelocityCreateInstruction {
    const CLASS: &'static str = "VelocityCreateInstruction";

    fn to_dict(&self) -> Value {
        with_class(
            Self::CLASS,
            json!({
                "instruction_name": self.name,
                "group_name": self.group_name,
                "temp": self.temp.to_dict(),
                "seed": self.seed,
            }),
        )
    }

    fn from_dict(dict: &Value, cx: &LoadContext) -> Result<Self> {
        let raw: RawVelocityCreate = decode(Self::CLASS, dict, cx, &VELOCITY_LEGACY)?;
        Self::with_group_name(
            raw.instruction_name.as_str(),
            raw.group_name,
            TemperatureQuantity::from_dict(&raw.temp, cx)?,
            raw.seed,
        )
    }
}

/// Styles of the engine's `variable` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableStyle {
    Delete,
    Atomfile,
    File,
    Format,
    Getenv,
    Index,
    Internal,
    Loop,
    Python,
    String,
    Timer,
    Uloop,
    Universe,
    World,
    Equal,
    Vector,
    Atom,
}

const VARIABLE_STYLE_KEYWORDS: [&str; 17] = [
    "delete", "atomfile", "file", "format", "getenv", "index", "internal", "loop", "python",
    "string", "timer", "uloop", "universe", "world", "equal", "vector", "atom",
];

impl VariableStyle {
    pub fn keyword(&self) -> &'static str {
        VARIABLE_STYLE_KEYWORDS[*self as usize]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableInstruction {
    name: Identifier,
    variable_name: Identifier,
    style: VariableStyle,
    args: String,
}

#[derive(Deserialize)]
struct RawVariable {
    instruction_name: Identifier,
    variable_name: Identifier,
    #[serde(default = "default_variable_style")]
    style: VariableStyle,
    #[serde(default)]
    args: String,
}

fn default_variable_style() -> VariableStyle {
    VariableStyle::Equal
}

const VARIABLE_LEGACY: LegacyShape = LegacyShape {
    renames: &[],
    codes: &[("style", &VARIABLE_STYLE_KEYWORDS)],
};

impl VariableInstruction {
    pub fn new(name: &str, variable_name: &str, style: VariableStyle, args: &str) -> Result<Self> {
        Ok(Self {
            name: Identifier::new(name)?,
            variable_name: Identifier::new(variable_name)?,
            style,
            args: args.trim().to_string(),
        })
    }
}

impl DictNode for VariableInstruction {
    const CLASS: &'static str = "VariableInstruction";

    fn to_dict(&self) -> Value {
        with_class(
            Self::CLASS,
            json!({
                "instruction_name": self.name,
                "variable_name": self.variable_name,
                "style": self.style,
                "args": self.args,
            }),
        )
    }

    fn from_dict(dict: &Value, cx: &LoadContext) -> Result<Self> {
        let raw: RawVariable = decode(Self::CLASS, dict, cx, &VARIABLE_LEGACY)?;
        Ok(Self {
            name: raw.instruction_name,
            variable_name: raw.variable_name,
            style: raw.style,
            args: raw.args.trim().to_string(),
        })
    }
}

/// Rigidly translates a group of atoms.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplaceAtomsInstruction {
    name: Identifier,
    group_name: Identifier,
    dx: LengthQuantity,
    dy: LengthQuantity,
    dz: LengthQuantity,
}

#[derive(Deserialize)]
struct RawDisplaceAtoms {
    instruction_name: Identifier,
    #[serde(default = "default_group")]
    group_name: Identifier,
    dx: Value,
    dy: Value,
    dz: Value,
}

const DISPLACE_LEGACY: LegacyShape = LegacyShape {
    renames: &[("group", "group_name")],
    codes: &[],
};

impl DisplaceAtomsInstruction {
    pub fn new(
        name: &str,
        group: &Group,
        dx: LengthQuantity,
        dy: LengthQuantity,
        dz: LengthQuantity,
    ) -> Result<Self> {
        Ok(Self {
            name: Identifier::new(name)?,
            group_name: Identifier::new(group.handle())?,
            dx,
            dy,
            dz,
        })
    }
}

impl DictNode for DisplaceAtomsInstruction {
    const CLASS: &'static str = "DisplaceAtomsInstruction";

    fn to_dict(&self) -> Value {
        with_class(
            Self::CLASS,
            json!({
                "instruction_name": self.name,
                "group_name": self.group_name,
                "dx": self.dx.to_dict(),
                "dy": self.dy.to_dict(),
                "dz": self.dz.to_dict(),
            }),
        )
    }

    fn from_dict(dict: &Value, cx: &LoadContext) -> Result<Self> {
        let raw: RawDisplaceAtoms = decode(Self::CLASS, dict, cx, &DISPLACE_LEGACY)?;
        Ok(Self {
            name: raw.instruction_name,
            group_name: raw.group_name,
            dx: LengthQuantity::from_dict(&raw.dx, cx)?,
            dy: LengthQuantity::from_dict(&raw.dy, cx)?,
            dz: LengthQuantity::from_dict(&raw.dz, cx)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ManualInstruction {
    name: Identifier,
    cmd: String,
}

#[derive(Deserialize)]
struct RawManualInstruction {
    instruction_name: Identifier,
    #[serde(default)]
    cmd: String,
}

impl ManualInstruction {
    pub fn new(name: &str, cmd: &str) -> Result<Self> {
        Ok(Self {
            name: Identifier::new(name)?,
            cmd: cmd.to_string(),
        })
    }
}

impl DictNode for ManualInstruction {
    const CLASS: &'static str = "ManualInstruction";

    fn to_dict(&self) -> Value {
        with_class(
            Self::CLASS,
            json!({ "instruction_name": self.name, "cmd": self.cmd }),
        )
    }

    fn from_dict(dict: &Value, cx: &LoadContext) -> Result<Self> {
        let raw: RawManualInstruction = decode(Self::CLASS, dict, cx, &LegacyShape::UNCHANGED)?;
        Ok(Self {
            name: raw.instruction_name,
            cmd: raw.cmd,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::dict::LEGACY_VERSION;
    use crate::core::models::group::{AllGroup, IndicesGroup};
    use crate::core::units::{UnitRegistry, UnitSystem};

    fn ctx(units: UnitSystem) -> CompileContext {
        CompileContext::new(units)
    }

    #[test]
    fn reset_timestep_renders_integer_step() {
        let i: Instruction = ResetTimestepInstruction::new("reset", 0).unwrap().into();
        assert_eq!(i.command(&ctx(UnitSystem::Real)), "reset_timestep 0\n");
    }

    #[test]
    fn set_timestep_converts_to_the_context_unit_system() {
        let registry = UnitRegistry::new();
        let dt = TimeQuantity::new(&registry, 1.0, "fs").unwrap();
        let i: Instruction = SetTimestepInstruction::new("dt", dt).unwrap().into();
        assert_eq!(i.command(&ctx(UnitSystem::Real)), "timestep 1.0\n");
        assert_eq!(i.command(&ctx(UnitSystem::Metal)), "timestep 0.001\n");
    }

    #[test]
    fn set_timestep_rejects_negative_magnitude() {
        let registry = UnitRegistry::new();
        let dt = TimeQuantity::new(&registry, -0.5, "fs").unwrap();
        assert!(matches!(
            SetTimestepInstruction::new("dt", dt),
            Err(Error::Configuration { ref node, .. }) if node == "dt"
        ));
    }

    #[test]
    fn velocity_create_renders_gaussian_distribution() {
        let registry = UnitRegistry::new();
        let temp = TemperatureQuantity::new(&registry, 300.0, "K").unwrap();
        let i: Instruction = VelocityCreateInstruction::new("vel", &AllGroup::new().into(), temp, 42)
            .unwrap()
            .into();
        assert_eq!(
            i.command(&ctx(UnitSystem::Real)),
            "velocity all create 300.0 42 dist gaussian\n"
        );

        let cold = TemperatureQuantity::new(&registry, -1.0, "K").unwrap();
        assert!(VelocityCreateInstruction::new("vel", &AllGroup::new().into(), cold, 1).is_err());
    }

    #[test]
    fn variable_renders_style_keyword_and_args() {
        let i: Instruction = VariableInstruction::new("v", "ene", VariableStyle::Equal, "pe")
            .unwrap()
            .into();
        assert_eq!(i.command(&ctx(UnitSystem::Real)), "variable ene equal pe\n");

        let delete: Instruction = VariableInstruction::new("v", "ene", VariableStyle::Delete, "")
            .unwrap()
            .into();
        assert_eq!(delete.command(&ctx(UnitSystem::Real)), "variable ene delete\n");
    }

    #[test]
    fn displace_atoms_converts_each_component() {
        let registry = UnitRegistry::new();
        let len = |v: f64| LengthQuantity::new(&registry, v, "nm").unwrap();
        let group: Group = IndicesGroup::new("tip", &[1]).unwrap().into();
        let i: Instruction = DisplaceAtomsInstruction::new("shift", &group, len(0.1), len(0.0), len(-0.2))
            .unwrap()
            .into();
        assert_eq!(
            i.command(&ctx(UnitSystem::Real)),
            "displace_atoms tip move 1.0 0.0 -2.0\n"
        );
    }

    #[test]
    fn manual_instruction_with_empty_text_emits_nothing() {
        let i: Instruction = ManualInstruction::new("noop", "").unwrap().into();
        assert_eq!(i.command(&ctx(UnitSystem::Real)), "");
    }

    #[test]
    fn instruction_dicts_round_trip_through_loader() {
        let registry = UnitRegistry::new();
        let cx = LoadContext::new(&registry);
        let all: Group = AllGroup::new().into();
        let instructions: Vec<Instruction> = vec![
            ResetTimestepInstruction::new("r", 10).unwrap().into(),
            SetTimestepInstruction::new("t", TimeQuantity::new(&registry, 0.5, "fs").unwrap())
                .unwrap()
                .into(),
            VelocityCreateInstruction::new(
                "v",
                &all,
                TemperatureQuantity::new(&registry, 10.0, "kelvin").unwrap(),
                7,
            )
            .unwrap()
            .into(),
            VariableInstruction::new("x", "i", VariableStyle::Loop, "100").unwrap().into(),
            DisplaceAtomsInstruction::new(
                "d",
                &all,
                LengthQuantity::new(&registry, 1.0, "angstrom").unwrap(),
                LengthQuantity::new(&registry, 2.0, "angstrom").unwrap(),
                LengthQuantity::new(&registry, 3.0, "angstrom").unwrap(),
            )
            .unwrap()
            .into(),
            ManualInstruction::new("m", "print done").unwrap().into(),
        ];
        for instruction in instructions {
            let dict = instruction.to_dict();
            let back = Instruction::from_dict(&dict, &cx).unwrap();
            assert_eq!(back.to_dict(), dict);
        }
    }

    #[test]
    fn variable_loads_legacy_style_codes() {
        let registry = UnitRegistry::new();
        let cx = LoadContext::new(&registry).with_version(LEGACY_VERSION);
        let legacy = json!({
            "class": "VariableInstruction",
            "instruction_name": "v",
            "variable_name": "i",
            "style": 7,
            "args": "100",
        });
        let i = Instruction::from_dict(&legacy, &cx).unwrap();
        assert_eq!(i.command(&ctx(UnitSystem::Real)), "variable i loop 100\n");
    }

    #[test]
    fn variable_loaded_args_are_trimmed_like_built_ones() {
        let registry = UnitRegistry::new();
        let cx = LoadContext::new(&registry);
        let dict = json!({
            "class": "VariableInstruction",
            "instruction_name": "v",
            "variable_name": "v",
            "style": "equal",
            "args": "  1  ",
        });
        let loaded = Instruction::from_dict(&dict, &cx).unwrap();
        let built: Instruction = VariableInstruction::new("v", "v", VariableStyle::Equal, "  1  ")
            .unwrap()
            .into();
        assert_eq!(loaded.command(&ctx(UnitSystem::Real)), "variable v equal 1\n");
        assert_eq!(loaded, built);
    }
}
