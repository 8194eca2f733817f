use super::unit_registry;
use crate::config::CompileSettings;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use lmpib::core::io::dict::LoadContext;
use lmpib::engine::progress::ProgressReporter;
use lmpib::workflows::builder::{WORKFLOW_FILENAME, WorkflowBuilder};
use std::path::PathBuf;
use tracing::info;

pub fn run(settings: CompileSettings, quiet: bool) -> Result<()> {
    let progress_handler = if quiet {
        CliProgressHandler::hidden()
    } else {
        CliProgressHandler::new()
    };
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    let job_folder = compile(&settings, &reporter)?;
    println!(
        "✓ Workflow written to: {}",
        job_folder.join(WORKFLOW_FILENAME).display()
    );
    Ok(())
}

/// Loads the workflow document and writes its job folder.
pub fn compile(settings: &CompileSettings, reporter: &ProgressReporter) -> Result<PathBuf> {
    let registry = unit_registry(settings.unit_definitions.as_deref())?;
    let cx = LoadContext::new(&registry);

    info!("Loading workflow document from {:?}", &settings.workflow);
    let mut workflow = WorkflowBuilder::read_from_path(&settings.workflow, &cx)?;
    workflow.set_annotate(settings.annotate);

    info!(
        "Compiling {} top-level section(s)...",
        workflow.sections().len()
    );
    let job_folder =
        workflow.generate_inputs_with_progress(settings.job_prefix.as_deref(), reporter)?;
    Ok(job_folder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use lmpib::core::models::group::AllGroup;
    use lmpib::core::models::integrator::NveIntegrator;
    use lmpib::core::units::UnitSystem;
    use lmpib::engine::section::IntegratorSection;
    use lmpib::workflows::system::DataFileMolecularSystem;
    use std::path::Path;

    fn write_workflow(dir: &Path) -> PathBuf {
        let mut system = DataFileMolecularSystem::new(UnitSystem::Real).element(1, "C");
        system.load_from_string("LAMMPS data file\n");
        let mut workflow = WorkflowBuilder::new();
        workflow.set_molecular_system(system).unwrap();
        workflow.add_section(
            IntegratorSection::new(
                "NVE",
                NveIntegrator::new("NVE", &AllGroup::new().into(), 10).unwrap(),
            )
            .unwrap(),
        );
        let path = dir.join("flow.json");
        workflow.write_to_path(&path).unwrap();
        path
    }

    #[test]
    fn compile_writes_job_folder_under_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let settings = CompileSettings {
            workflow: write_workflow(dir.path()),
            job_prefix: Some(dir.path().join("jobs")),
            unit_definitions: None,
            annotate: false,
        };

        let job_folder = compile(&settings, &ProgressReporter::new()).unwrap();
        assert!(job_folder.starts_with(dir.path().join("jobs")));

        let script = std::fs::read_to_string(job_folder.join(WORKFLOW_FILENAME)).unwrap();
        assert!(script.starts_with("units real\n"));
        assert!(script.contains("fix NVE all nve\nrun 10\nunfix NVE\n"));
        assert!(!script.contains("# >>>"));
    }

    #[test]
    fn compile_reports_missing_workflow() {
        let dir = tempfile::tempdir().unwrap();
        let settings = CompileSettings {
            workflow: dir.path().join("absent.json"),
            job_prefix: Some(dir.path().to_path_buf()),
            unit_definitions: None,
            annotate: true,
        };
        assert!(matches!(
            compile(&settings, &ProgressReporter::new()),
            Err(CliError::Core(lmpib::error::Error::Io { .. }))
        ));
    }
}
