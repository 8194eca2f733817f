use super::unit_registry;
use crate::config::RenderSettings;
use crate::error::Result;
use lmpib::core::context::CompileContext;
use lmpib::core::io::dict::LoadContext;
use lmpib::workflows::builder::WorkflowBuilder;
use tracing::info;

pub fn run(settings: RenderSettings) -> Result<()> {
    print!("{}", render(&settings)?);
    Ok(())
}

/// Compiles the workflow's sections against a context built from `settings`.
///
/// The molecular system, if any, is not materialized.
pub fn render(settings: &RenderSettings) -> Result<String> {
    let registry = unit_registry(settings.unit_definitions.as_deref())?;
    let cx = LoadContext::new(&registry);

    info!("Loading workflow document from {:?}", &settings.workflow);
    let workflow = WorkflowBuilder::read_from_path(&settings.workflow, &cx)?;

    let ctx = CompileContext::builder()
        .unit_system(settings.unit_system)
        .elements(settings.elements.clone())
        .annotate(settings.annotate)
        .build()
        .map_err(lmpib::error::Error::from)?;
    info!(
        "Rendering {} section(s) in {} units.",
        workflow.sections().len(),
        settings.unit_system
    );
    Ok(workflow.render_sections(&ctx)?)
}
