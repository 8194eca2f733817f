use super::system::{MOLECULAR_SYSTEM_LOADER, MolecularSystem};
use crate::core::context::CompileContext;
use crate::core::io::dict::LoadContext;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::section::{SECTION_LOADER, Section};
use crate::error::{Error, Result};
use serde_json::{Map, Value, json};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};
use uuid::Uuid;

pub const DOCUMENT_FORMAT: &str = "WorkflowBuilder";
pub const DOCUMENT_MAJOR_VERSION: u64 = 1;
pub const DOCUMENT_MINOR_VERSION: u64 = 0;
pub const DOCUMENT_GENERATOR: &str = "lmpib";

/// Name of the script holding the system declaration followed by every compiled section.
pub const WORKFLOW_FILENAME: &str = "workflow.input";

/// The root of a workflow: one molecular system and the sections run on it, in order.
#[derive(Debug)]
pub struct WorkflowBuilder {
    system: Option<Box<dyn MolecularSystem>>,
    sections: Vec<Section>,
    annotate: bool,
}

impl Default for WorkflowBuilder {
    fn default() -> Self {
        Self {
            system: None,
            sections: Vec::new(),
            annotate: true,
        }
    }
}

impl WorkflowBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches the molecular system the workflow runs on.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Precondition`] if the system has not been loaded.
    pub fn set_molecular_system(&mut self, system: impl MolecularSystem + 'static) -> Result<()> {
        self.set_boxed_molecular_system(Box::new(system))
    }

    pub fn set_boxed_molecular_system(&mut self, system: Box<dyn MolecularSystem>) -> Result<()> {
        if !system.is_loaded() {
            return Err(Error::Precondition(format!(
                "the {} must be loaded before it is attached to a workflow",
                system.class()
            )));
        }
        self.system = Some(system);
        Ok(())
    }

    pub fn molecular_system(&self) -> Option<&dyn MolecularSystem> {
        self.system.as_deref()
    }

    /// Appends a top-level section. Names are not checked for collisions.
    pub fn add_section(&mut self, section: impl Into<Section>) {
        self.sections.push(section.into());
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Whether comment banners are written around sections (on by default).
    pub fn set_annotate(&mut self, annotate: bool) {
        self.annotate = annotate;
    }

    /// Compiles every top-level section, in order, without touching the disk.
    pub fn render_sections(&self, ctx: &CompileContext) -> Result<String> {
        self.render_with_progress(ctx, &ProgressReporter::new())
    }

    fn render_with_progress(&self, ctx: &CompileContext, reporter: &ProgressReporter) -> Result<String> {
        reporter.report(Progress::TaskStart {
            total_steps: self.sections.len() as u64,
        });
        let mut out = String::new();
        for section in &self.sections {
            section.compile_into(ctx, &mut out)?;
            reporter.report(Progress::TaskIncrement);
        }
        reporter.report(Progress::TaskFinish);
        Ok(out)
    }

    /// Writes a complete job folder and returns its path.
    ///
    /// See [`WorkflowBuilder::generate_inputs_with_progress`].
    pub fn generate_inputs(&self, prefix: Option<&Path>) -> Result<PathBuf> {
        self.generate_inputs_with_progress(prefix, &ProgressReporter::new())
    }

    /// Writes a complete job folder and returns its path.
    ///
    /// The folder is a fresh UUID-named directory under `prefix` (the system
    /// temporary directory by default). It receives the model files of the
    /// molecular system, its declaration script, and `workflow.input`: a copy of
    /// that declaration with every compiled section appended in a single write.
    ///
    /// # Arguments
    ///
    /// * `prefix` - The directory to create the job folder in.
    /// * `reporter` - Receives phase and per-section progress events.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Precondition`] if no molecular system is attached, any
    /// error raised while compiling a section, or [`Error::Io`] if a file cannot
    /// be written. Sections are compiled before `workflow.input` is created, so a
    /// compile failure never leaves a partial workflow script behind.
    #[instrument(skip_all, name = "generate_inputs")]
    pub fn generate_inputs_with_progress(
        &self,
        prefix: Option<&Path>,
        reporter: &ProgressReporter,
    ) -> Result<PathBuf> {
        let system = self.system.as_deref().ok_or_else(|| {
            Error::Precondition(
                "a molecular system must be attached before generating inputs".to_string(),
            )
        })?;

        let prefix = prefix.map(Path::to_path_buf).unwrap_or_else(std::env::temp_dir);
        let job_folder = prefix.join(Uuid::new_v4().to_string());
        fs::create_dir_all(&job_folder).map_err(|e| Error::io(&job_folder, e))?;
        info!(job_folder = %job_folder.display(), "Allocated job folder.");

        let (ctx, input_path) = reporter.phase("Declaring System", || {
            let ctx = system.generate_data_file(&job_folder)?.with_annotate(self.annotate);
            let input_path = system.generate_input_file(&job_folder, &ctx)?;
            Ok::<_, Error>((ctx, input_path))
        })?;

        let body = reporter.phase("Compiling Sections", || self.render_with_progress(&ctx, reporter))?;

        reporter.phase("Writing Workflow", || {
            let workflow_path = job_folder.join(WORKFLOW_FILENAME);
            fs::copy(&input_path, &workflow_path).map_err(|e| Error::io(&workflow_path, e))?;
            let mut file = OpenOptions::new()
                .append(true)
                .open(&workflow_path)
                .map_err(|e| Error::io(&workflow_path, e))?;
            file.write_all(body.as_bytes())
                .map_err(|e| Error::io(&workflow_path, e))?;
            debug!(path = %workflow_path.display(), bytes = body.len(), "Appended compiled sections.");
            Ok::<_, Error>(())
        })?;

        info!(
            sections = self.sections.len(),
            "Workflow inputs generated in {}.",
            job_folder.display()
        );
        Ok(job_folder)
    }

    pub fn to_dict(&self) -> Value {
        let mut dict = Map::new();
        dict.insert(
            "header".to_string(),
            json!({
                "format": DOCUMENT_FORMAT,
                "major_version": DOCUMENT_MAJOR_VERSION,
                "minor_version": DOCUMENT_MINOR_VERSION,
                "generator": DOCUMENT_GENERATOR,
            }),
        );
        if let Some(system) = &self.system {
            dict.insert("molecular_system".to_string(), system.to_dict());
        }
        dict.insert(
            "sections".to_string(),
            Value::Array(self.sections.iter().map(Section::to_dict).collect()),
        );
        Value::Object(dict)
    }

    /// Rebuilds a workflow from its persisted document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedDocument`] if the header is missing or names
    /// another format, major version or minor version, and any loader error of
    /// the molecular system or sections.
    pub fn from_dict(dict: &Value, cx: &LoadContext) -> Result<Self> {
        check_header(dict)?;

        let mut builder = Self::new();
        if let Some(system) = dict.get("molecular_system") {
            builder.system = Some(MOLECULAR_SYSTEM_LOADER.load(system, cx)?);
        }
        if let Some(sections) = dict.get("sections") {
            let sections = sections.as_array().ok_or_else(|| {
                Error::UnsupportedDocument("'sections' must be an array".to_string())
            })?;
            builder.sections = SECTION_LOADER.load_all(sections, cx)?;
        }
        debug!(sections = builder.sections.len(), "Loaded workflow document.");
        Ok(builder)
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.to_dict())
            .map_err(|e| Error::malformed(DOCUMENT_FORMAT, e))
    }

    pub fn from_json_str(text: &str, cx: &LoadContext) -> Result<Self> {
        let dict: Value = serde_json::from_str(text)
            .map_err(|e| Error::UnsupportedDocument(format!("not a JSON document: {e}")))?;
        Self::from_dict(&dict, cx)
    }

    pub fn read_from_path(path: &Path, cx: &LoadContext) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_json_str(&text, cx)
    }

    pub fn write_to_path(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json_string()?).map_err(|e| Error::io(path, e))
    }
}

fn check_header(dict: &Value) -> Result<()> {
    let header = dict
        .get("header")
        .ok_or_else(|| Error::UnsupportedDocument("no header in document".to_string()))?;

    let format = header
        .get("format")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::UnsupportedDocument("no format in header".to_string()))?;
    if format != DOCUMENT_FORMAT {
        return Err(Error::UnsupportedDocument(format!("unsupported format '{format}'")));
    }

    for (key, expected) in [
        ("major_version", DOCUMENT_MAJOR_VERSION),
        ("minor_version", DOCUMENT_MINOR_VERSION),
    ] {
        let found = header
            .get(key)
            .and_then(Value::as_u64)
            .ok_or_else(|| Error::UnsupportedDocument(format!("no {key} in header")))?;
        if found != expected {
            return Err(Error::UnsupportedDocument(format!(
                "unsupported {key} {found}, expected {expected}"
            )));
        }
    }
    Ok(())
}
