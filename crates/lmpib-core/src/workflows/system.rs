use crate::core::context::{BoundingBox, CompileContext};
use crate::core::io::dict::{LegacyShape, LoadContext, decode, with_class};
use crate::core::io::loader::Loader;
use crate::core::io::traits::DictNode;
use crate::core::units::UnitSystem;
use crate::core::utils::text::command_lines;
use crate::error::{Error, Result};
use crate::workflows::builder::WORKFLOW_FILENAME;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the system declaration script written into every job folder.
pub const INPUT_FILENAME: &str = "lammps.input";

/// File name of the engine data file written by [`DataFileMolecularSystem`].
pub const DATA_FILENAME: &str = "model.data";

/// An already prepared molecular model the engine can read.
///
/// Implementors materialize the model into a job folder and write the script
/// that declares it; the compiled sections are appended after that declaration.
pub trait MolecularSystem: fmt::Debug {
    /// Discriminator of the serialized system.
    fn class(&self) -> &'static str;

    fn is_loaded(&self) -> bool;

    /// File name of the engine data file, relative to the job folder.
    fn data_filename(&self) -> &str;

    /// Writes the data file and every support file into `job_folder`.
    ///
    /// # Return
    ///
    /// The compile context describing the written model.
    fn generate_data_file(&self, job_folder: &Path) -> Result<CompileContext>;

    /// Writes the system declaration script and returns its path.
    fn generate_input_file(&self, job_folder: &Path, ctx: &CompileContext) -> Result<PathBuf>;

    fn to_dict(&self) -> Value;
}

pub static MOLECULAR_SYSTEM_LOADER: Loader<Box<dyn MolecularSystem>> = Loader::new(
    "MolecularSystem",
    &[(DataFileMolecularSystem::CLASS, load_data_file_system)],
);

fn load_data_file_system(dict: &Value, cx: &LoadContext) -> Result<Box<dyn MolecularSystem>> {
    Ok(Box::new(DataFileMolecularSystem::from_dict(dict, cx)?))
}

/// Boundary conditions applied to every box face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryStyle {
    #[default]
    Periodic,
    ShrinkWrapped,
}

impl BoundaryStyle {
    pub fn keyword(&self) -> &'static str {
        match self {
            BoundaryStyle::Periodic => "p p p",
            BoundaryStyle::ShrinkWrapped => "s s s",
        }
    }
}

/// A verbatim file copied into the job folder, such as force-field parameters.
///
/// The name is a bare file name that cannot shadow a file the job folder
/// already receives; this is checked on construction and on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSupportFile")]
pub struct SupportFile {
    file_name: String,
    content: String,
}

#[derive(Deserialize)]
struct RawSupportFile {
    file_name: String,
    content: String,
}

impl TryFrom<RawSupportFile> for SupportFile {
    type Error = Error;

    fn try_from(raw: RawSupportFile) -> Result<Self> {
        Self::new(raw.file_name, raw.content)
    }
}

impl SupportFile {
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `file_name` is empty, is not a single
    /// path component, or is reserved for a generated job file.
    pub fn new(file_name: impl Into<String>, content: impl Into<String>) -> Result<Self> {
        let file_name = file_name.into();
        let is_bare = Path::new(&file_name).file_name().and_then(|n| n.to_str())
            == Some(file_name.as_str());
        if file_name.is_empty() || !is_bare {
            return Err(Error::configuration(
                &file_name,
                "support file names must be a single file name without directories",
            ));
        }
        if [DATA_FILENAME, INPUT_FILENAME, WORKFLOW_FILENAME].contains(&file_name.as_str()) {
            return Err(Error::configuration(
                &file_name,
                "support file name is reserved for a generated job file",
            ));
        }
        Ok(Self {
            file_name,
            content: content.into(),
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// A molecular system backed by an engine data file prepared elsewhere.
///
/// The data file content is held in memory, so a loaded system serializes into
/// a self-contained workflow document. Molecules and force fields are not
/// parsed: the element table, box and force-field setup commands are supplied
/// by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct DataFileMolecularSystem {
    record: DataFileRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct DataFileRecord {
    unit_system: UnitSystem,
    #[serde(default)]
    data_content: Option<String>,
    #[serde(default)]
    elements: BTreeMap<u32, String>,
    #[serde(default)]
    bounding_box: Option<BoundingBox>,
    #[serde(default)]
    boundary: BoundaryStyle,
    #[serde(default = "default_atom_style")]
    atom_style: String,
    #[serde(default)]
    support_files: Vec<SupportFile>,
    #[serde(default)]
    setup_commands: String,
}

fn default_atom_style() -> String {
    "full".to_string()
}

const DATA_FILE_LEGACY: LegacyShape = LegacyShape {
    renames: &[("unitSystem", "unit_system"), ("bboxStyle", "boundary")],
    codes: &[("boundary", &["periodic", "shrink_wrapped"])],
};

impl DataFileMolecularSystem {
    /// An empty system; load a data file before generating inputs.
    pub fn new(unit_system: UnitSystem) -> Self {
        Self {
            record: DataFileRecord {
                unit_system,
                data_content: None,
                elements: BTreeMap::new(),
                bounding_box: None,
                boundary: BoundaryStyle::default(),
                atom_style: default_atom_style(),
                support_files: Vec::new(),
                setup_commands: String::new(),
            },
        }
    }

    /// Reads the engine data file at `path`.
    pub fn load_from_file(&mut self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        debug!(path = %path.display(), bytes = content.len(), "loaded data file");
        self.record.data_content = Some(content);
        Ok(())
    }

    pub fn load_from_string(&mut self, content: impl Into<String>) {
        self.record.data_content = Some(content.into());
    }

    pub fn unit_system(&self) -> UnitSystem {
        self.record.unit_system
    }

    pub fn element(mut self, index: u32, symbol: impl Into<String>) -> Self {
        self.record.elements.insert(index, symbol.into());
        self
    }

    pub fn bounding_box(mut self, bounding_box: BoundingBox) -> Self {
        self.record.bounding_box = Some(bounding_box);
        self
    }

    pub fn boundary(mut self, boundary: BoundaryStyle) -> Self {
        self.record.boundary = boundary;
        self
    }

    pub fn atom_style(mut self, atom_style: impl Into<String>) -> Self {
        self.record.atom_style = atom_style.into();
        self
    }

    /// Commands emitted after `read_data`, typically the force-field setup.
    pub fn setup_commands(mut self, commands: impl Into<String>) -> Self {
        self.record.setup_commands = commands.into();
        self
    }

    /// Adds a file written verbatim into the job folder.
    ///
    /// Only the final path component of `file_name` is kept. Fails if nothing
    /// is left or the name is reserved, see [`SupportFile::new`].
    pub fn add_support_file(&mut self, file_name: &str, content: impl Into<String>) -> Result<()> {
        let bare = Path::new(file_name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.record.support_files.push(SupportFile::new(bare, content)?);
        Ok(())
    }

    /// Reads a support file from disk and adds it under its own file name.
    pub fn add_support_file_from_path(&mut self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        self.add_support_file(&path.to_string_lossy(), content)
    }

    pub fn support_files(&self) -> &[SupportFile] {
        &self.record.support_files
    }

    fn write(path: &Path, content: &str) -> Result<()> {
        fs::write(path, content).map_err(|e| Error::io(path, e))?;
        debug!(path = %path.display(), "wrote file");
        Ok(())
    }
}

impl MolecularSystem for DataFileMolecularSystem {
    fn class(&self) -> &'static str {
        Self::CLASS
    }

    fn is_loaded(&self) -> bool {
        self.record.data_content.is_some()
    }

    fn data_filename(&self) -> &str {
        DATA_FILENAME
    }

    fn generate_data_file(&self, job_folder: &Path) -> Result<CompileContext> {
        let content = self.record.data_content.as_deref().ok_or_else(|| {
            Error::Precondition("the molecular system has no data file loaded".to_string())
        })?;
        Self::write(&job_folder.join(self.data_filename()), content)?;
        for file in &self.record.support_files {
            Self::write(&job_folder.join(&file.file_name), &file.content)?;
        }

        let mut builder = CompileContext::builder()
            .unit_system(self.record.unit_system)
            .elements(self.record.elements.clone());
        if let Some(bounding_box) = self.record.bounding_box {
            builder = builder.bounding_box(bounding_box);
        }
        Ok(builder.build()?)
    }

    fn generate_input_file(&self, job_folder: &Path, ctx: &CompileContext) -> Result<PathBuf> {
        let mut script = format!(
            "units {}\natom_style {}\nboundary {}\nread_data {}\n",
            ctx.unit_system(),
            self.record.atom_style,
            self.record.boundary.keyword(),
            self.data_filename()
        );
        script.push_str(&command_lines(&self.record.setup_commands));

        let path = job_folder.join(INPUT_FILENAME);
        Self::write(&path, &script)?;
        Ok(path)
    }

    fn to_dict(&self) -> Value {
        DictNode::to_dict(self)
    }
}

impl DictNode for DataFileMolecularSystem {
    const CLASS: &'static str = "DataFileMolecularSystem";

    fn to_dict(&self) -> Value {
        with_class(Self::CLASS, json!(self.record))
    }

    fn from_dict(dict: &Value, cx: &LoadContext) -> Result<Self> {
        Ok(Self {
            record: decode(Self::CLASS, dict, cx, &DATA_FILE_LEGACY)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::units::UnitRegistry;
    use tempfile::tempdir;

    const DATA: &str = "LAMMPS data file\n\n2 atoms\n1 atom types\n";

    fn loaded() -> DataFileMolecularSystem {
        let mut system = DataFileMolecularSystem::new(UnitSystem::Real)
            .element(1, "C")
            .element(2, "H")
            .bounding_box(BoundingBox::new([0.0; 3], [10.0; 3]))
            .setup_commands("pair_style reaxff NULL\npair_coeff * * ffield.reax C H");
        system.load_from_string(DATA);
        system
            .add_support_file("forcefields/ffield.reax", "reax parameters")
            .unwrap();
        system
    }

    #[test]
    fn unloaded_system_refuses_to_generate() {
        let dir = tempdir().unwrap();
        let system = DataFileMolecularSystem::new(UnitSystem::Metal);
        assert!(!system.is_loaded());
        assert!(matches!(
            system.generate_data_file(dir.path()),
            Err(Error::Precondition(_))
        ));
    }

    #[test]
    fn data_file_and_support_files_are_written() {
        let dir = tempdir().unwrap();
        let system = loaded();
        let ctx = system.generate_data_file(dir.path()).unwrap();

        assert_eq!(fs::read_to_string(dir.path().join("model.data")).unwrap(), DATA);
        assert_eq!(
            fs::read_to_string(dir.path().join("ffield.reax")).unwrap(),
            "reax parameters"
        );
        assert_eq!(ctx.unit_system(), UnitSystem::Real);
        assert_eq!(ctx.element_symbols(), ["C", "H"]);
        assert_eq!(ctx.bounding_box().unwrap().lengths(), [10.0; 3]);
    }

    #[test]
    fn input_file_declares_the_system() {
        let dir = tempdir().unwrap();
        let system = loaded().boundary(BoundaryStyle::ShrinkWrapped);
        let ctx = system.generate_data_file(dir.path()).unwrap();
        let path = system.generate_input_file(dir.path(), &ctx).unwrap();
        assert_eq!(path, dir.path().join(INPUT_FILENAME));
        assert_eq!(
            fs::read_to_string(path).unwrap(),
            "units real\natom_style full\nboundary s s s\nread_data model.data\n\
             pair_style reaxff NULL\npair_coeff * * ffield.reax C H\n"
        );
    }

    #[test]
    fn load_from_file_reads_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("input.data");
        fs::write(&path, DATA).unwrap();
        let mut system = DataFileMolecularSystem::new(UnitSystem::Real);
        system.load_from_file(&path).unwrap();
        assert!(system.is_loaded());

        let missing = system.load_from_file(&dir.path().join("missing.data"));
        assert!(matches!(missing, Err(Error::Io { .. })));
    }

    #[test]
    fn system_round_trips_through_loader() {
        let registry = UnitRegistry::new();
        let cx = LoadContext::new(&registry);
        let system = loaded();
        let dict = DictNode::to_dict(&system);
        let back = MOLECULAR_SYSTEM_LOADER.load(&dict, &cx).unwrap();
        assert_eq!(back.class(), "DataFileMolecularSystem");
        assert!(back.is_loaded());
        assert_eq!(back.to_dict(), dict);
    }

    #[test]
    fn support_file_names_reserved_for_job_files_are_rejected() {
        let mut system = DataFileMolecularSystem::new(UnitSystem::Real);
        for name in ["model.data", "inputs/lammps.input", "workflow.input", "", ".."] {
            assert!(
                matches!(
                    system.add_support_file(name, "x"),
                    Err(Error::Configuration { .. })
                ),
                "{name:?} was accepted"
            );
        }
        assert!(system.support_files().is_empty());
    }

    #[test]
    fn loaded_support_files_are_written_inside_the_job_folder() {
        let dir = tempdir().unwrap();
        let job = dir.path().join("job");
        fs::create_dir(&job).unwrap();
        let registry = UnitRegistry::new();
        let cx = LoadContext::new(&registry);
        let dict = json!({
            "class": "DataFileMolecularSystem",
            "unit_system": "real",
            "data_content": DATA,
            "support_files": [{"file_name": "ffield.reax", "content": "params"}],
        });

        let system = DataFileMolecularSystem::from_dict(&dict, &cx).unwrap();
        assert_eq!(system.support_files()[0].file_name(), "ffield.reax");
        system.generate_data_file(&job).unwrap();
        assert_eq!(fs::read_to_string(job.join("ffield.reax")).unwrap(), "params");
    }

    #[test]
    fn loading_rejects_escaping_or_clobbering_support_files() {
        let registry = UnitRegistry::new();
        let cx = LoadContext::new(&registry);
        for name in ["../escaped.txt", "/tmp/abs.txt", "sub/dir.txt", "model.data", "lammps.input", ""] {
            let dict = json!({
                "class": "DataFileMolecularSystem",
                "unit_system": "real",
                "data_content": DATA,
                "support_files": [{"file_name": name, "content": "clobbered"}],
            });
            let result = MOLECULAR_SYSTEM_LOADER.load(&dict, &cx);
            assert!(
                matches!(result, Err(Error::Malformed { .. })),
                "{name:?} was accepted"
            );
        }
    }
}
