use super::group::{ALL_GROUP_NAME, Group};
use super::instruction::Instruction;
use crate::core::context::CompileContext;
use crate::core::io::dict::{LegacyShape, LoadContext, decode, with_class};
use crate::core::io::loader::{Loader, load_as};
use crate::core::io::traits::DictNode;
use crate::core::units::{ForceQuantity, TemperatureQuantity, TimeQuantity, VelocityQuantity};
use crate::core::utils::identifiers::Identifier;
use crate::core::utils::text::{command_lines, fmt_number};
use crate::error::Result;
use serde::Deserialize;
use serde_json::{Value, json};

/// A persistent modifier with a paired declaration and undo.
#[derive(Debug, Clone, PartialEq)]
pub enum Extension {
    Langevin(LangevinExtension),
    SetForce(SetForceExtension),
    Move(MoveExtension),
    Instruction(InstructionExtension),
    Manual(ManualExtension),
}

pub static EXTENSION_LOADER: Loader<Extension> = Loader::new(
    "Extension",
    &[
        (LangevinExtension::CLASS, load_as::<LangevinExtension, Extension>),
        (SetForceExtension::CLASS, load_as::<SetForceExtension, Extension>),
        (MoveExtension::CLASS, load_as::<MoveExtension, Extension>),
        (InstructionExtension::CLASS, load_as::<InstructionExtension, Extension>),
        (ManualExtension::CLASS, load_as::<ManualExtension, Extension>),
    ],
);

impl Extension {
    pub fn id(&self) -> &Identifier {
        match self {
            Extension::Langevin(e) => &e.name,
            Extension::SetForce(e) => &e.name,
            Extension::Move(e) => &e.name,
            Extension::Instruction(e) => e.instruction.id(),
            Extension::Manual(e) => &e.name,
        }
    }

    pub fn do_commands(&self, ctx: &CompileContext) -> Result<String> {
        let units = ctx.unit_system();
        let commands = match self {
            Extension::Langevin(e) => format!(
                "fix {} {} langevin {} {} {} {}\n",
                e.name,
                e.group_name,
                fmt_number(e.start_temp.convert_to(units)),
                fmt_number(e.end_temp.convert_to(units)),
                fmt_number(e.damp.convert_to(units)),
                e.seed
            ),
            Extension::SetForce(e) => format!(
                "fix {} {} setforce {} {} {}\n",
                e.name,
                e.group_name,
                fmt_number(e.fx.convert_to(units)),
                fmt_number(e.fy.convert_to(units)),
                fmt_number(e.fz.convert_to(units))
            ),
            Extension::Move(e) => format!(
                "fix {} {} move linear {} {} {}\n",
                e.name,
                e.group_name,
                fmt_number(e.vx.convert_to(units)),
                fmt_number(e.vy.convert_to(units)),
                fmt_number(e.vz.convert_to(units))
            ),
            Extension::Instruction(e) => e.instruction.command(ctx),
            Extension::Manual(e) => command_lines(&e.do_cmd),
        };
        Ok(commands)
    }

    pub fn undo_commands(&self) -> String {
        match self {
            Extension::Langevin(e) => format!("unfix {}\n", e.name),
            Extension::SetForce(e) => format!("unfix {}\n", e.name),
            Extension::Move(e) => format!("unfix {}\n", e.name),
            Extension::Instruction(_) => String::new(),
            Extension::Manual(e) => command_lines(&e.undo_cmd),
        }
    }

    pub fn to_dict(&self) -> Value {
        match self {
            Extension::Langevin(e) => e.to_dict(),
            Extension::SetForce(e) => e.to_dict(),
            Extension::Move(e) => e.to_dict(),
            Extension::Instruction(e) => e.to_dict(),
            Extension::Manual(e) => e.to_dict(),
        }
    }

    pub fn from_dict(dict: &Value, cx: &LoadContext) -> Result<Self> {
        EXTENSION_LOADER.load(dict, cx)
    }
}

impl From<LangevinExtension> for Extension {
    fn from(e: LangevinExtension) -> Self {
        Extension::Langevin(e)
    }
}

impl From<SetForceExtension> for Extension {
    fn from(e: SetForceExtension) -> Self {
        Extension::SetForce(e)
    }
}

impl From<MoveExtension> for Extension {
    fn from(e: MoveExtension) -> Self {
        Extension::Move(e)
    }
}

impl From<InstructionExtension> for Extension {
    fn from(e: InstructionExtension) -> Self {
        Extension::Instruction(e)
    }
}

impl From<ManualExtension> for Extension {
    fn from(e: ManualExtension) -> Self {
        Extension::Manual(e)
    }
}

fn default_group() -> Identifier {
    Identifier::predefined(ALL_GROUP_NAME)
}

const GROUP_KEY_LEGACY: LegacyShape = LegacyShape {
    renames: &[("group", "group_name")],
    codes: &[],
};

/// Langevin thermostat ramping from a start to an end temperature.
#[derive(Debug, Clone, PartialEq)]
pub struct LangevinExtension {
    name: Identifier,
    group_name: Identifier,
    start_temp: TemperatureQuantity,
    end_temp: TemperatureQuantity,
    damp: TimeQuantity,
    seed: u64,
}

#[derive(Deserialize)]
struct RawLangevin {
    extension_name: Identifier,
    #[serde(default = "default_group")]
    group_name: Identifier,
    start_temp: Value,
    end_temp: Value,
    damp: Value,
    #[serde(default = "default_langevin_seed")]
    seed: u64,
}

fn default_langevin_seed() -> u64 {
    122345
}

const LANGEVIN_LEGACY: LegacyShape = LegacyShape {
    renames: &[
        ("group", "group_name"),
        ("startTemp", "start_temp"),
        ("endTemp", "end_temp"),
    ],
    codes: &[],
};

impl LangevinExtension {
    pub fn new(
        name: &str,
        group: &Group,
        start_temp: TemperatureQuantity,
        end_temp: TemperatureQuantity,
        damp: TimeQuantity,
        seed: u64,
    ) -> Result<Self> {
        Ok(Self {
            name: Identifier::new(name)?,
            group_name: Identifier::new(group.handle())?,
            start_temp,
            end_temp,
            damp,
            seed,
        })
    }
}

impl DictNode for LangevinExtension {
    const CLASS: &'static str = "LangevinExtension";

    fn to_dict(&self) -> Value {
        with_class(
            Self::CLASS,
            json!({
                "extension_name": self.name,
                "group_name": self.group_name,
                "start_temp": self.start_temp.to_dict(),
                "end_temp": self.end_temp.to_dict(),
                "damp": self.damp.to_dict(),
                "seed": self.seed,
            }),
        )
    }

    fn from_dict(dict: &Value, cx: &LoadContext) -> Result<Self> {
        let raw: RawLangevin = decode(Self::CLASS, dict, cx, &LANGEVIN_LEGACY)?;
        Ok(Self {
            name: raw.extension_name,
            group_name: raw.group_name,
            start_temp: TemperatureQuantity::from_dict(&raw.start_temp, cx)?,
            end_temp: TemperatureQuantity::from_dict(&raw.end_temp, cx)?,
            damp: TimeQuantity::from_dict(&raw.damp, cx)?,
            seed: raw.seed,
        })
    }
}

/// Overrides the force on every atom of a group at each step.
#[derive(Debug, Clone, PartialEq)]
pub struct SetForceExtension {
    name: Identifier,
    group_name: Identifier,
    fx: ForceQuantity,
    fy: ForceQuantity,
    fz: ForceQuantity,
}

#[derive(Deserialize)]
struct RawSetForce {
    extension_name: Identifier,
    #[serde(default = "default_group")]
    group_name: Identifier,
    fx: Value,
    fy: Value,
    fz: Value,
}

impl SetForceExtension {
    pub fn new(
        name: &str,
        group: &Group,
        fx: ForceQuantity,
        fy: ForceQuantity,
        fz: ForceQuantity,
    ) -> Result<Self> {
        Ok(Self {
            name: Identifier::new(name)?,
            group_name: Identifier::new(group.handle())?,
            fx,
            fy,
            fz,
        })
    }
}

impl DictNode for SetForceExtension {
    const CLASS: &'static str = "SetForceExtension";

    fn to_dict(&self) -> Value {
        with_class(
            Self::CLASS,
            json!({
                "extension_name": self.name,
                "group_name": self.group_name,
                "fx": self.fx.to_dict(),
                "fy": self.fy.to_dict(),
                "fz": self.fz.to_dict(),
            }),
        )
    }

    fn from_dict(dict: &Value, cx: &LoadContext) -> Result<Self> {
        let raw: RawSetForce = decode(Self::CLASS, dict, cx, &GROUP_KEY_LEGACY)?;
        Ok(Self {
            name: raw.extension_name,
            group_name: raw.group_name,
            fx: ForceQuantity::from_dict(&raw.fx, cx)?,
            fy: ForceQuantity::from_dict(&raw.fy, cx)?,
            fz: ForceQuantity::from_dict(&raw.fz, cx)?,
        })
    }
}

/// Moves a group at constant velocity, ignoring interatomic forces.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveExtension {
    name: Identifier,
    group_name: Identifier,
    vx: VelocityQuantity,
    vy: VelocityQuantity,
    vz: VelocityQuantity,
}

#[derive(Deserialize)]
struct RawMove {
    extension_name: Identifier,
    #[serde(default = "default_group")]
    group_name: Identifier,
    vx: Value,
    vy: Value,
    vz: Value,
}

impl MoveExtension {
    pub fn new(
        name: &str,
        group: &Group,
        vx: VelocityQuantity,
        vy: VelocityQuantity,
        vz: VelocityQuantity,
    ) -> Result<Self> {
        Ok(Self {
            name: Identifier::new(name)?,
            group_name: Identifier::new(group.handle())?,
            vx,
            vy,
            vz,
        })
    }
}

impl DictNode for MoveExtension {
    const CLASS: &'static str = "MoveExtension";

    fn to_dict(&self) -> Value {
        with_class(
            Self::CLASS,
            json!({
                "extension_name": self.name,
                "group_name": self.group_name,
                "vx": self.vx.to_dict(),
                "vy": self.vy.to_dict(),
                "vz": self.vz.to_dict(),
            }),
        )
    }

    fn from_dict(dict: &Value, cx: &LoadContext) -> Result<Self> {
        let raw: RawMove = decode(Self::CLASS, dict, cx, &GROUP_KEY_LEGACY)?;
        Ok(Self {
            name: raw.extension_name,
            group_name: raw.group_name,
            vx: VelocityQuantity::from_dict(&raw.vx, cx)?,
            vy: VelocityQuantity::from_dict(&raw.vy, cx)?,
            vz: VelocityQuantity::from_dict(&raw.vz, cx)?,
        })
    }
}

/// Runs a one-shot instruction in the declaration phase. Its name is the
/// instruction's name and it has nothing to undo.
#[derive(Debug, Clone, PartialEq)]
pub struct InstructionExtension {
    instruction: Instruction,
}

#[derive(Deserialize)]
struct RawInstructionExtension {
    instruction: Value,
}

impl InstructionExtension {
    pub fn new(instruction: Instruction) -> Self {
        Self { instruction }
    }

    pub fn instruction(&self) -> &Instruction {
        &self.instruction
    }
}

impl DictNode for InstructionExtension {
    const CLASS: &'static str = "InstructionExtension";

    fn to_dict(&self) -> Value {
        with_class(
            Self::CLASS,
            json!({
                "extension_name": self.instruction.id(),
                "instruction": self.instruction.to_dict(),
            }),
        )
    }

    fn from_dict(dict: &Value, cx: &LoadContext) -> Result<Self> {
        let raw: RawInstructionExtension = decode(Self::CLASS, dict, cx, &LegacyShape::UNCHANGED)?;
        Ok(Self::new(Instruction::from_dict(&raw.instruction, cx)?))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ManualExtension {
    name: Identifier,
    do_cmd: String,
    undo_cmd: String,
}

#[derive(Deserialize)]
struct RawManualExtension {
    extension_name: Identifier,
    #[serde(default)]
    do_cmd: String,
    #[serde(default)]
    undo_cmd: String,
}

impl ManualExtension {
    pub fn new(name: &str, do_cmd: &str, undo_cmd: &str) -> Result<Self> {
        Ok(Self {
            name: Identifier::new(name)?,
            do_cmd: do_cmd.to_string(),
            undo_cmd: undo_cmd.to_string(),
        })
    }
}

impl DictNode for ManualExtension {
    const CLASS: &'static str = "ManualExtension";

    fn to_dict(&self) -> Value {
        with_class(
            Self::CLASS,
            json!({
                "extension_name": self.name,
                "do_cmd": self.do_cmd,
                "undo_cmd": self.undo_cmd,
            }),
        )
    }

    fn from_dict(dict: &Value, cx: &LoadContext) -> Result<Self> {
        let raw: RawManualExtension = decode(Self::CLASS, dict, cx, &LegacyShape::UNCHANGED)?;
        Ok(Self {
            name: raw.extension_name,
            do_cmd: raw.do_cmd,
            undo_cmd: raw.undo_cmd,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::dict::LEGACY_VERSION;
    use crate::core::models::group::{AllGroup, IndicesGroup};
    use crate::core::models::instruction::ResetTimestepInstruction;
    use crate::core::units::{UnitRegistry, UnitSystem};

    fn ctx() -> CompileContext {
        CompileContext::new(UnitSystem::Real)
    }

    fn all() -> Group {
        AllGroup::new().into()
    }

    fn langevin(registry: &UnitRegistry) -> Extension {
        LangevinExtension::new(
            "thermostat",
            &all(),
            TemperatureQuantity::new(registry, 300.0, "K").unwrap(),
            TemperatureQuantity::new(registry, 350.0, "K").unwrap(),
            TimeQuantity::new(registry, 100.0, "fs").unwrap(),
            48279,
        )
        .unwrap()
        .into()
    }

    #[test]
    fn langevin_renders_ramp_damping_and_seed() {
        let registry = UnitRegistry::new();
        let ext = langevin(&registry);
        assert_eq!(
            ext.do_commands(&ctx()).unwrap(),
            "fix thermostat all langevin 300.0 350.0 100.0 48279\n"
        );
        assert_eq!(ext.undo_commands(), "unfix thermostat\n");
    }

    #[test]
    fn set_force_renders_components_in_native_units() {
        let registry = UnitRegistry::new();
        let f = |v: f64| ForceQuantity::new(&registry, v, "(kcal/mol)/angstrom").unwrap();
        let group: Group = IndicesGroup::new("anchor", &[1, 2]).unwrap().into();
        let ext: Extension = SetForceExtension::new("hold", &group, f(0.0), f(0.0), f(1.5))
            .unwrap()
            .into();
        assert_eq!(
            ext.do_commands(&ctx()).unwrap(),
            "fix hold anchor setforce 0.0 0.0 1.5\n"
        );
        assert_eq!(ext.undo_commands(), "unfix hold\n");
    }

    #[test]
    fn move_renders_linear_velocity() {
        let registry = UnitRegistry::new();
        let v = |x: f64| VelocityQuantity::new(&registry, x, "angstrom/ps").unwrap();
        let ext: Extension = MoveExtension::new("push", &all(), v(0.0), v(0.0), v(-2.0))
            .unwrap()
            .into();
        let metal = CompileContext::new(UnitSystem::Metal);
        assert_eq!(
            ext.do_commands(&metal).unwrap(),
            "fix push all move linear 0.0 0.0 -2.0\n"
        );
    }

    #[test]
    fn instruction_extension_takes_instruction_name_and_has_no_undo() {
        let inner: Instruction = ResetTimestepInstruction::new("reset", 0).unwrap().into();
        let ext: Extension = InstructionExtension::new(inner).into();
        assert_eq!(ext.id(), "reset");
        assert_eq!(ext.do_commands(&ctx()).unwrap(), "reset_timestep 0\n");
        assert_eq!(ext.undo_commands(), "");
    }

    #[test]
    fn extension_dicts_round_trip_through_loader() {
        let registry = UnitRegistry::new();
        let cx = LoadContext::new(&registry);
        let zero = || ForceQuantity::native(0.0, UnitSystem::Real);
        let still = || VelocityQuantity::native(0.0, UnitSystem::Metal);
        let extensions: Vec<Extension> = vec![
            langevin(&registry),
            SetForceExtension::new("sf", &all(), zero(), zero(), zero()).unwrap().into(),
            MoveExtension::new("mv", &all(), still(), still(), still()).unwrap().into(),
            InstructionExtension::new(ResetTimestepInstruction::new("r", 5).unwrap().into()).into(),
            ManualExtension::new("man", "fix man all nve", "unfix man").unwrap().into(),
        ];
        for extension in extensions {
            let dict = extension.to_dict();
            let back = Extension::from_dict(&dict, &cx).unwrap();
            assert_eq!(back.to_dict(), dict);
        }
    }

    #[test]
    fn langevin_loads_legacy_camel_case_keys() {
        let registry = UnitRegistry::new();
        let cx = LoadContext::new(&registry).with_version(LEGACY_VERSION);
        let temp = |v: f64| json!({"class": "TemperatureQuantity", "magnitude": v, "units": "kelvin"});
        let legacy = json!({
            "class": "LangevinExtension",
            "extension_name": "thermo",
            "group": "mobile",
            "startTemp": temp(10.0),
            "endTemp": temp(20.0),
            "damp": {"class": "TimeQuantity", "magnitude": 1.0, "units": "ps"},
            "seed": 3,
        });
        let ext = Extension::from_dict(&legacy, &cx).unwrap();
        assert_eq!(
            ext.do_commands(&ctx()).unwrap(),
            "fix thermo mobile langevin 10.0 20.0 1000.0 3\n"
        );
    }
}
