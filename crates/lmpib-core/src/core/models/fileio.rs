use super::group::{ALL_GROUP_NAME, Group};
use crate::core::context::CompileContext;
use crate::core::io::dict::{LegacyShape, LoadContext, decode, with_class};
use crate::core::io::loader::{Loader, load_as};
use crate::core::io::traits::DictNode;
use crate::core::utils::identifiers::Identifier;
use crate::core::utils::text::command_lines;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::PathBuf;

pub const DUMP_DEFAULT_FIELDS: [&str; 5] = ["id", "type", "x", "y", "z"];
pub const THERMO_DEFAULT_FIELDS: [&str; 6] = ["step", "temp", "pe", "ke", "etotal", "press"];
pub const THERMO_LOG_FILE: &str = "lammps.log";

/// A periodic output writer bound to a group.
#[derive(Debug, Clone, PartialEq)]
pub enum FileIo {
    DumpTrajectory(DumpTrajectoryFileIo),
    ReaxBond(ReaxBondFileIo),
    Thermo(ThermoFileIo),
    Manual(ManualFileIo),
}

pub static FILEIO_LOADER: Loader<FileIo> = Loader::new(
    "FileIO",
    &[
        (DumpTrajectoryFileIo::CLASS, load_as::<DumpTrajectoryFileIo, FileIo>),
        (ReaxBondFileIo::CLASS, load_as::<ReaxBondFileIo, FileIo>),
        (ThermoFileIo::CLASS, load_as::<ThermoFileIo, FileIo>),
        (ManualFileIo::CLASS, load_as::<ManualFileIo, FileIo>),
    ],
);

impl FileIo {
    pub fn id(&self) -> &Identifier {
        match self {
            FileIo::DumpTrajectory(f) => &f.name,
            FileIo::ReaxBond(f) => &f.name,
            FileIo::Thermo(f) => &f.name,
            FileIo::Manual(f) => &f.name,
        }
    }

    /// Path of the file the engine writes, relative to the job folder.
    pub fn associated_file_path(&self) -> PathBuf {
        match self {
            FileIo::DumpTrajectory(f) => f.associated_file_path(),
            FileIo::ReaxBond(f) => PathBuf::from(format!("bonds.{}.txt", f.name)),
            FileIo::Thermo(_) => PathBuf::from(THERMO_LOG_FILE),
            FileIo::Manual(f) => f.associated_file_path.clone(),
        }
    }

    pub fn do_commands(&self, ctx: &CompileContext) -> Result<String> {
        match self {
            FileIo::DumpTrajectory(f) => f.do_commands(ctx),
            FileIo::ReaxBond(f) => Ok(format!(
                "fix {} {} reaxff/bonds {} bonds.{}.txt\n",
                f.name, f.group_name, f.interval, f.name
            )),
            FileIo::Thermo(f) => Ok(f.do_commands()),
            FileIo::Manual(f) => Ok(command_lines(&f.do_cmd)),
        }
    }

    pub fn undo_commands(&self) -> String {
        match self {
            FileIo::DumpTrajectory(f) => format!("undump {}\n", f.name),
            FileIo::ReaxBond(f) => format!("unfix {}\n", f.name),
            FileIo::Thermo(_) => String::new(),
            FileIo::Manual(f) => command_lines(&f.undo_cmd),
        }
    }

    pub fn to_dict(&self) -> Value {
        match self {
            FileIo::DumpTrajectory(f) => f.to_dict(),
            FileIo::ReaxBond(f) => f.to_dict(),
            FileIo::Thermo(f) => f.to_dict(),
            FileIo::Manual(f) => f.to_dict(),
        }
    }

    pub fn from_dict(dict: &Value, cx: &LoadContext) -> Result<Self> {
        FILEIO_LOADER.load(dict, cx)
    }
}

impl From<DumpTrajectoryFileIo> for FileIo {
    fn from(f: DumpTrajectoryFileIo) -> Self {
        FileIo::DumpTrajectory(f)
    }
}

impl From<ReaxBondFileIo> for FileIo {
    fn from(f: ReaxBondFileIo) -> Self {
        FileIo::ReaxBond(f)
    }
}

impl From<ThermoFileIo> for FileIo {
    fn from(f: ThermoFileIo) -> Self {
        FileIo::Thermo(f)
    }
}

impl From<ManualFileIo> for FileIo {
    fn from(f: ManualFileIo) -> Self {
        FileIo::Manual(f)
    }
}

fn default_interval() -> u64 {
    100
}

fn default_true() -> bool {
    true
}

fn default_group() -> Identifier {
    Identifier::predefined(ALL_GROUP_NAME)
}

/// Appends `extra` to `fields`, skipping names already present.
/// Appends `extra` in order, skipping any field already present.
///
/// Repeats inside `extra` itself are dropped too.
fn merge_fields(fields: &mut Vec<String>, extra: &[String]) {
    for field in extra {
        if !fields.contains(field) {
            fields.push(field.clone());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DumpStyle {
    Custom, // Columnar per-atom fields
    Xyz,    // Element and coordinates only
}

/// Periodic per-atom snapshots of a group.
#[derive(Debug, Clone, PartialEq)]
pub struct DumpTrajectoryFileIo {
    name: Identifier,
    style: DumpStyle,
    user_fields: Vec<String>,
    add_default_fields: bool,
    interval: u64,
    group_name: Identifier,
}

#[derive(Deserialize)]
struct RawDump {
    fileio_name: Identifier,
    #[serde(default = "default_custom")]
    style: DumpStyle,
    #[serde(default)]
    user_fields: Vec<String>,
    #[serde(default = "default_true")]
    add_default_fields: bool,
    #[serde(default = "default_interval")]
    interval: u64,
    #[serde(default = "default_group")]
    group_name: Identifier,
}

fn default_custom() -> DumpStyle {
    DumpStyle::Custom
}

const DUMP_LEGACY: LegacyShape = LegacyShape {
    renames: &[],
    codes: &[("style", &["", "custom", "xyz"])],
};

impl DumpTrajectoryFileIo {
    pub fn new(
        name: &str,
        style: DumpStyle,
        user_fields: &[&str],
        add_default_fields: bool,
        interval: u64,
        group: &Group,
    ) -> Result<Self> {
        Ok(Self {
            name: Identifier::new(name)?,
            style,
            user_fields: user_fields.iter().map(|f| f.to_string()).collect(),
            add_default_fields,
            interval,
            group_name: Identifier::new(group.handle())?,
        })
    }

    /// Columns of a custom dump: defaults, then new user fields, with `id` always first.
    pub fn fields(&self) -> Vec<String> {
        let mut fields = Vec::new();
        if self.add_default_fields {
            fields.extend(DUMP_DEFAULT_FIELDS.iter().map(|f| f.to_string()));
        }
        merge_fields(&mut fields, &self.user_fields);
        if !fields.iter().any(|f| f == "id") {
            fields.insert(0, "id".to_string());
        }
        fields
    }

    pub fn associated_file_path(&self) -> PathBuf {
        match self.style {
            DumpStyle::Custom => PathBuf::from(format!("dump.{}.lammpstrj", self.name)),
            DumpStyle::Xyz => PathBuf::from(format!("dump.{}.xyz", self.name)),
        }
    }

    fn do_commands(&self, ctx: &CompileContext) -> Result<String> {
        let path = self.associated_file_path();
        match self.style {
            DumpStyle::Xyz => Ok(format!(
                "dump {} {} xyz {} {}\n",
                self.name,
                self.group_name,
                self.interval,
                path.display()
            )),
            DumpStyle::Custom => {
                let fields = self.fields();
                let mut commands = format!(
                    "dump {} {} custom {} {} {}\n",
                    self.name,
                    self.group_name,
                    self.interval,
                    path.display(),
                    fields.join(" ")
                );
                commands.push_str(&format!("dump_modify {} sort id\n", self.name));
                if fields.iter().any(|f| f == "element") {
                    let symbols = ctx.element_symbols();
                    if symbols.is_empty() {
                        return Err(Error::MissingContext {
                            node: self.name.to_string(),
                            reason: "the 'element' dump field needs a non-empty element table"
                                .to_string(),
                        });
                    }
                    commands.push_str(&format!(
                        "dump_modify {} element {}\n",
                        self.name,
                        symbols.join(" ")
                    ));
                }
                Ok(commands)
            }
        }
    }
}

impl DictNode for DumpTrajectoryFileIo {
    const CLASS: &'static str = "DumpTrajectoryFileIO";

    fn to_dict(&self) -> Value {
        with_class(
            Self::CLASS,
            json!({
                "fileio_name": self.name,
                "style": self.style,
                "user_fields": self.user_fields,
                "add_default_fields": self.add_default_fields,
                "interval": self.interval,
                "group_name": self.group_name,
            }),
        )
    }

    fn from_dict(dict: &Value, cx: &LoadContext) -> Result<Self> {
        let raw: RawDump = decode(Self::CLASS, dict, cx, &DUMP_LEGACY)?;
        Ok(Self {
            name: raw.fileio_name,
            style: raw.style,
            user_fields: raw.user_fields,
            add_default_fields: raw.add_default_fields,
            interval: raw.interval,
            group_name: raw.group_name,
        })
    }
}

/// Periodic bond-order output of the reactive force field.
#[derive(Debug, Clone, PartialEq)]
pub struct ReaxBondFileIo {
    name: Identifier,
    group_name: Identifier,
    interval: u64,
}

#[derive(Deserialize)]
struct RawReaxBond {
    fileio_name: Identifier,
    #[serde(default = "default_group")]
    group_name: Identifier,
    #[serde(default = "default_interval")]
    interval: u64,
}

impl ReaxBondFileIo {
    pub fn new(name: &str, group: &Group, interval: u64) -> Result<Self> {
        Ok(Self {
            name: Identifier::new(name)?,
            group_name: Identifier::new(group.handle())?,
            interval,
        })
    }
}

impl DictNode for ReaxBondFileIo {
    const CLASS: &'static str = "ReaxBondFileIO";

    fn to_dict(&self) -> Value {
        with_class(
            Self::CLASS,
            json!({
                "fileio_name": self.name,
                "group_name": self.group_name,
                "interval": self.interval,
            }),
        )
    }

    fn from_dict(dict: &Value, cx: &LoadContext) -> Result<Self> {
        let raw: RawReaxBond = decode(Self::CLASS, dict, cx, &LegacyShape::UNCHANGED)?;
        Ok(Self {
            name: raw.fileio_name,
            group_name: raw.group_name,
            interval: raw.interval,
        })
    }
}

/// Periodic scalar log. Thermo output is global to the engine, so it is never undone.
#[derive(Debug, Clone, PartialEq)]
pub struct ThermoFileIo {
    name: Identifier,
    interval: u64,
    add_default_fields: bool,
    user_fields: Vec<String>,
}

#[derive(Deserialize)]
struct RawThermo {
    fileio_name: Identifier,
    #[serde(default = "default_thermo_interval")]
    interval: u64,
    #[serde(default = "default_true")]
    add_default_fields: bool,
    #[serde(default)]
    user_fields: Vec<String>,
}

fn default_thermo_interval() -> u64 {
    10
}

impl ThermoFileIo {
    pub fn new(name: &str, interval: u64, add_default_fields: bool, user_fields: &[&str]) -> Result<Self> {
        Ok(Self {
            name: Identifier::new(name)?,
            interval,
            add_default_fields,
            user_fields: user_fields.iter().map(|f| f.to_string()).collect(),
        })
    }

    /// Default fields (when enabled) followed by the user fields, each field once.
    pub fn fields(&self) -> Vec<String> {
        let mut fields = Vec::new();
        if self.add_default_fields {
            fields.extend(THERMO_DEFAULT_FIELDS.iter().map(|f| f.to_string()));
        }
        merge_fields(&mut fields, &self.user_fields);
        fields
    }

    fn do_commands(&self) -> String {
        let mut style = String::from("thermo_style custom");
        for field in self.fields() {
            style.push(' ');
            style.push_str(&field);
        }
        format!("thermo {}\n{}\n", self.interval, style)
    }
}

impl DictNode for ThermoFileIo {
    const CLASS: &'static str = "ThermoFileIO";

    fn to_dict(&self) -> Value {
        with_class(
            Self::CLASS,
            json!({
                "fileio_name": self.name,
                "user_fields": self.user_fields,
                "add_default_fields": self.add_default_fields,
                "interval": self.interval,
            }),
        )
    }

    fn from_dict(dict: &Value, cx: &LoadContext) -> Result<Self> {
        let raw: RawThermo = decode(Self::CLASS, dict, cx, &LegacyShape::UNCHANGED)?;
        Ok(Self {
            name: raw.fileio_name,
            interval: raw.interval,
            add_default_fields: raw.add_default_fields,
            user_fields: raw.user_fields,
        })
    }
}

/// An output writer declared by raw command text.
#[derive(Debug, Clone, PartialEq)]
pub struct ManualFileIo {
    name: Identifier,
    do_cmd: String,
    undo_cmd: String,
    associated_file_path: PathBuf,
}

#[derive(Deserialize)]
struct RawManualFileIo {
    fileio_name: Identifier,
    #[serde(default)]
    do_cmd: String,
    #[serde(default)]
    undo_cmd: String,
    #[serde(default)]
    associated_file_path: PathBuf,
}

impl ManualFileIo {
    pub fn new(
        name: &str,
        do_cmd: &str,
        undo_cmd: &str,
        associated_file_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        Ok(Self {
            name: Identifier::new(name)?,
            do_cmd: do_cmd.to_string(),
            undo_cmd: undo_cmd.to_string(),
            associated_file_path: associated_file_path.into(),
        })
    }
}

impl DictNode for ManualFileIo {
    const CLASS: &'static str = "ManualFileIO";

    fn to_dict(&self) -> Value {
        with_class(
            Self::CLASS,
            json!({
                "fileio_name": self.name,
                "do_cmd": self.do_cmd,
                "undo_cmd": self.undo_cmd,
                "associated_file_path": self.associated_file_path,
            }),
        )
    }

    fn from_dict(dict: &Value, cx: &LoadContext) -> Result<Self> {
        let raw: RawManualFileIo = decode(Self::CLASS, dict, cx, &LegacyShape::UNCHANGED)?;
        Ok(Self {
            name: raw.fileio_name,
            do_cmd: raw.do_cmd,
            undo_cmd: raw.undo_cmd,
            associated_file_path: raw.associated_file_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::dict::LEGACY_VERSION;
    use crate::core::models::group::{AllGroup, IndicesGroup};
    use crate::core::units::{UnitRegistry, UnitSystem};

    fn all() -> Group {
        AllGroup::new().into()
    }

    fn ctx() -> CompileContext {
        CompileContext::new(UnitSystem::Real)
    }

    #[test]
    fn custom_dump_appends_user_fields_after_defaults_without_duplicates() {
        let dump: FileIo = DumpTrajectoryFileIo::new("traj", DumpStyle::Custom, &["vx", "x"], true, 100, &all())
            .unwrap()
            .into();
        assert_eq!(
            dump.do_commands(&ctx()).unwrap(),
            "dump traj all custom 100 dump.traj.lammpstrj id type x y z vx\n\
             dump_modify traj sort id\n"
        );
        assert_eq!(dump.undo_commands(), "undump traj\n");
        assert_eq!(dump.associated_file_path(), PathBuf::from("dump.traj.lammpstrj"));
    }

    #[test]
    fn custom_dump_always_lists_id_first() {
        let dump = DumpTrajectoryFileIo::new("d", DumpStyle::Custom, &["x", "vx"], false, 10, &all()).unwrap();
        assert_eq!(dump.fields(), ["id", "x", "vx"]);
    }

    #[test]
    fn custom_dump_element_field_needs_element_table() {
        let dump: FileIo = DumpTrajectoryFileIo::new("d", DumpStyle::Custom, &["element"], true, 10, &all())
            .unwrap()
            .into();
        assert!(matches!(
            dump.do_commands(&ctx()),
            Err(Error::MissingContext { ref node, .. }) if node == "d"
        ));

        let with_elements = CompileContext::builder()
            .unit_system(UnitSystem::Real)
            .element(2, "H")
            .element(1, "C")
            .build()
            .unwrap();
        let commands = dump.do_commands(&with_elements).unwrap();
        assert!(commands.ends_with("dump_modify d element C H\n"));
    }

    #[test]
    fn xyz_dump_uses_xyz_path() {
        let group: Group = IndicesGroup::new("tip", &[1, 2]).unwrap().into();
        let dump: FileIo = DumpTrajectoryFileIo::new("snap", DumpStyle::Xyz, &[], true, 50, &group)
            .unwrap()
            .into();
        assert_eq!(dump.do_commands(&ctx()).unwrap(), "dump snap tip xyz 50 dump.snap.xyz\n");
    }

    #[test]
    fn reax_bond_declares_fix_and_unfixes() {
        let bonds: FileIo = ReaxBondFileIo::new("bo", &all(), 25).unwrap().into();
        assert_eq!(
            bonds.do_commands(&ctx()).unwrap(),
            "fix bo all reaxff/bonds 25 bonds.bo.txt\n"
        );
        assert_eq!(bonds.undo_commands(), "unfix bo\n");
        assert_eq!(bonds.associated_file_path(), PathBuf::from("bonds.bo.txt"));
    }

    #[test]
    fn thermo_merges_user_fields_and_has_no_undo() {
        let thermo: FileIo = ThermoFileIo::new("log", 10, true, &["pe", "cpu"]).unwrap().into();
        assert_eq!(
            thermo.do_commands(&ctx()).unwrap(),
            "thermo 10\nthermo_style custom step temp pe ke etotal press cpu\n"
        );
        assert_eq!(thermo.undo_commands(), "");
        assert_eq!(thermo.associated_file_path(), PathBuf::from("lammps.log"));
    }

    #[test]
    fn thermo_drops_repeated_user_fields() {
        let thermo = ThermoFileIo::new("log", 10, false, &["cpu", "pe", "cpu"]).unwrap();
        assert_eq!(thermo.fields(), ["cpu", "pe"]);
    }

    #[test]
    fn fileio_dicts_round_trip_through_loader() {
        let units = UnitRegistry::new();
        let cx = LoadContext::new(&units);
        let fileios: Vec<FileIo> = vec![
            DumpTrajectoryFileIo::new("d", DumpStyle::Xyz, &["vx"], false, 7, &all()).unwrap().into(),
            ReaxBondFileIo::new("b", &all(), 3).unwrap().into(),
            ThermoFileIo::new("t", 5, false, &["cpu"]).unwrap().into(),
            ManualFileIo::new("m", "print hi", "", "out.txt").unwrap().into(),
        ];
        for fileio in fileios {
            let dict = fileio.to_dict();
            let back = FileIo::from_dict(&dict, &cx).unwrap();
            assert_eq!(back.to_dict(), dict);
        }
    }

    #[test]
    fn dump_loads_legacy_style_codes() {
        let units = UnitRegistry::new();
        let cx = LoadContext::new(&units).with_version(LEGACY_VERSION);
        let legacy = json!({"class": "DumpTrajectoryFileIO", "fileio_name": "d", "style": 2});
        let dump = FileIo::from_dict(&legacy, &cx).unwrap();
        assert_eq!(dump.associated_file_path(), PathBuf::from("dump.d.xyz"));
    }
}
