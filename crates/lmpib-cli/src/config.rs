use crate::cli::{CompileArgs, RenderArgs};
use crate::error::{CliError, Result};
use crate::utils::parser;
use lmpib::core::units::UnitSystem;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialOutputConfig {
    job_prefix: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialUnitsConfig {
    definitions: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialRenderConfig {
    unit_system: Option<UnitSystem>,
    /// Element symbols in atom type order, starting at type 1.
    elements: Option<Vec<String>>,
    annotate: Option<bool>,
}

/// Values read from the `--config` TOML file. Every key is optional.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    output: Option<PartialOutputConfig>,
    units: Option<PartialUnitsConfig>,
    render: Option<PartialRenderConfig>,

    /// Directory relative paths in the file are resolved against.
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

/// Fully resolved inputs of the `compile` command.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileSettings {
    pub workflow: PathBuf,
    pub job_prefix: Option<PathBuf>,
    pub unit_definitions: Option<PathBuf>,
    pub annotate: bool,
}

/// Fully resolved inputs of the `render` command.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub workflow: PathBuf,
    pub unit_system: UnitSystem,
    pub elements: BTreeMap<u32, String>,
    pub annotate: bool,
    pub unit_definitions: Option<PathBuf>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Loads `path` when given, or starts from an empty configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::from_file)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    fn unit_definitions(&self) -> Option<PathBuf> {
        self.units
            .as_ref()
            .and_then(|u| u.definitions.as_deref())
            .map(|p| self.resolve(p))
    }

    pub fn merge_compile(&self, args: &CompileArgs) -> CompileSettings {
        let job_prefix = args.job_prefix.clone().or_else(|| {
            self.output
                .as_ref()
                .and_then(|o| o.job_prefix.as_deref())
                .map(|p| self.resolve(p))
        });
        let annotate = !args.no_annotate
            && self.render.as_ref().and_then(|r| r.annotate).unwrap_or(true);

        CompileSettings {
            workflow: args.workflow.clone(),
            job_prefix,
            unit_definitions: args.units.clone().or_else(|| self.unit_definitions()),
            annotate,
        }
    }

    /// Combines the file values with the `render` flags; flags win.
    ///
    /// `--element` flags replace the file's element list as a whole.
    pub fn merge_render(&self, args: &RenderArgs) -> Result<RenderSettings> {
        let render = self.render.as_ref();

        let unit_system = args
            .unit_system
            .map(UnitSystem::from)
            .or_else(|| render.and_then(|r| r.unit_system))
            .unwrap_or(UnitSystem::Real);

        let elements = if args.elements.is_empty() {
            let symbols = render.and_then(|r| r.elements.clone()).unwrap_or_default();
            let mut table = BTreeMap::new();
            for (index, symbol) in (1u32..).zip(symbols) {
                if symbol.trim().is_empty() {
                    return Err(CliError::Config(format!(
                        "Element symbol for atom type {index} cannot be empty."
                    )));
                }
                table.insert(index, symbol);
            }
            table
        } else {
            parser::parse_elements(&args.elements)
                .map_err(|e| CliError::Argument(e.to_string()))?
        };

        let annotate = !args.no_annotate && render.and_then(|r| r.annotate).unwrap_or(true);

        Ok(RenderSettings {
            workflow: args.workflow.clone(),
            unit_system,
            elements,
            annotate,
            unit_definitions: args.units.clone().or_else(|| self.unit_definitions()),
        })
    }
}
