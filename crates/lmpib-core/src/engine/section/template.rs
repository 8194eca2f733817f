use super::{IntegratorSection, SECTION_KEYS_LEGACY, Section, close_banner, comment, open_banner};
use crate::core::context::CompileContext;
use crate::core::io::dict::{LegacyShape, LoadContext, decode, with_class};
use crate::core::io::loader::{Loader, load_as};
use crate::core::io::traits::DictNode;
use crate::core::models::extension::{Extension, SetForceExtension};
use crate::core::models::fileio::FileIo;
use crate::core::models::group::{AllGroup, GROUP_LOADER, Group};
use crate::core::models::integrator::{
    MINIMIZE_STYLE_LEGACY_CODES, MinimizeIntegrator, MinimizeSettings,
};
use crate::core::units::{ForceQuantity, UnitSystem};
use crate::core::utils::identifiers::Identifier;
use crate::engine::scope::{LocalResources, RawResources};
use crate::error::Result;
use serde::Deserialize;
use serde_json::{Value, json};

/// The macro a [`TemplateSection`] expands into concrete sections.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionTemplate {
    Minimize(MinimizeTemplate),
}

pub static TEMPLATE_LOADER: Loader<SectionTemplate> = Loader::new(
    "SectionTemplate",
    &[(MinimizeTemplate::CLASS, load_as::<MinimizeTemplate, SectionTemplate>)],
);

impl SectionTemplate {
    pub fn class(&self) -> &'static str {
        match self {
            SectionTemplate::Minimize(_) => MinimizeTemplate::CLASS,
        }
    }

    fn generate(&self, name: &Identifier) -> Result<Vec<Section>> {
        match self {
            SectionTemplate::Minimize(t) => t.generate(name),
        }
    }

    fn to_dict(&self) -> Value {
        match self {
            SectionTemplate::Minimize(t) => t.to_dict(),
        }
    }
}

impl From<MinimizeTemplate> for SectionTemplate {
    fn from(t: MinimizeTemplate) -> Self {
        SectionTemplate::Minimize(t)
    }
}

/// A scope whose children are generated from a template each time it compiles.
///
/// Shares the local resource lifecycle of a recursive section. The serialized
/// discriminator is the template kind, and the template's own fields sit beside
/// the shared ones in the same dictionary.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateSection {
    name: Identifier,
    resources: LocalResources,
    template: SectionTemplate,
}

#[derive(Deserialize)]
struct RawTemplateSection {
    section_name: Identifier,
    #[serde(flatten)]
    resources: RawResources,
}

const TEMPLATE_SECTION_LEGACY: LegacyShape = LegacyShape {
    renames: SECTION_KEYS_LEGACY,
    codes: &[],
};

impl TemplateSection {
    pub fn new(name: &str, template: impl Into<SectionTemplate>) -> Result<Self> {
        Ok(Self {
            name: Identifier::new(name)?,
            resources: LocalResources::new(),
            template: template.into(),
        })
    }

    pub fn id(&self) -> &Identifier {
        &self.name
    }

    pub fn template(&self) -> &SectionTemplate {
        &self.template
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

    /// Expands the template into the concrete sections it stands for.
    ///
    /// The list is computed on every call and never stored.
    pub fn generate_sections(&self) -> Result<Vec<Section>> {
        self.template.generate(&self.name)
    }

    pub(super) fn compile_into(&self, ctx: &CompileContext, out: &mut String) -> Result<()> {
        let sections = self.generate_sections()?;
        open_banner(ctx, out, &self.name);
        comment(ctx, out, "declare");
        self.resources.scoped(ctx, out, |out| {
            for section in &sections {
                section.compile_into(ctx, out)?;
            }
            comment(ctx, out, "undo");
            Ok(())
        })?;
        close_banner(ctx, out, &self.name);
        Ok(())
    }

    pub fn to_dict(&self) -> Value {
        let mut dict = self.template.to_dict();
        if let Value::Object(map) = &mut dict {
            map.insert("section_name".to_string(), json!(self.name));
            self.resources.write_dict(map);
        }
        dict
    }

    /// Rebuilds a template section of any registered template kind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownClass`](crate::error::Error::UnknownClass) for an
    /// unregistered template kind, or any error of the shared fields.
    pub fn from_dict(dict: &Value, cx: &LoadContext) -> Result<Self> {
        let template = TEMPLATE_LOADER.load(dict, cx)?;
        let raw: RawTemplateSection = decode(template.class(), dict, cx, &TEMPLATE_SECTION_LEGACY)?;
        Ok(Self {
            name: raw.section_name,
            resources: LocalResources::from_raw(raw.resources, cx)?,
            template,
        })
    }
}

/// Expands into one energy minimization, optionally holding an anchor group in place.
///
/// Anchoring zeroes the force on every atom of the anchor group for the
/// duration of the minimization, so the minimizer cannot displace them.
#[derive(Debug, Clone, PartialEq)]
pub struct MinimizeTemplate {
    settings: MinimizeSettings,
    use_anchors: bool,
    anchor_group: Group,
}

#[derive(Deserialize)]
struct RawMinimizeTemplate {
    #[serde(flatten)]
    settings: MinimizeSettings,
    #[serde(default)]
    use_anchors: bool,
    #[serde(default)]
    anchor_group: Option<Value>,
}

const MINIMIZE_TEMPLATE_LEGACY: LegacyShape = LegacyShape {
    renames: &[("useAnchors", "use_anchors"), ("anchorGroup", "anchor_group")],
    codes: &[("style", MINIMIZE_STYLE_LEGACY_CODES)],
};

impl MinimizeTemplate {
    /// Fails if either tolerance is negative.
    pub fn new(settings: MinimizeSettings) -> Result<Self> {
        settings.validate(MinimizeTemplate::CLASS)?;
        Ok(Self {
            settings,
            use_anchors: false,
            anchor_group: AllGroup::new().into(),
        })
    }

    /// Keeps the atoms of `group` fixed during the minimization.
    pub fn with_anchors(mut self, group: impl Into<Group>) -> Self {
        self.use_anchors = true;
        self.anchor_group = group.into();
        self
    }

    pub fn settings(&self) -> &MinimizeSettings {
        &self.settings
    }

    pub fn anchor_group(&self) -> Option<&Group> {
        self.use_anchors.then_some(&self.anchor_group)
    }

    fn generate(&self, name: &Identifier) -> Result<Vec<Section>> {
        let minimizer = MinimizeIntegrator::new(name.suffixed("minimizer")?.as_str(), self.settings)?;
        let mut section = IntegratorSection::new(name.suffixed("minimize")?.as_str(), minimizer)?;
        if self.use_anchors {
            // Zero is the same in every unit system.
            let zero = ForceQuantity::native(0.0, UnitSystem::Real);
            section.add_group(self.anchor_group.clone());
            section.add_extension(SetForceExtension::new(
                name.suffixed("anchor")?.as_str(),
                &self.anchor_group,
                zero.clone(),
                zero.clone(),
                zero,
            )?);
        }
        Ok(vec![section.into()])
    }
}

impl DictNode for MinimizeTemplate {
    const CLASS: &'static str = "MinimizeTemplate";

    fn to_dict(&self) -> Value {
        let mut dict = with_class(Self::CLASS, json!(self.settings));
        if let Value::Object(map) = &mut dict {
            map.insert("use_anchors".to_string(), json!(self.use_anchors));
            map.insert("anchor_group".to_string(), self.anchor_group.to_dict());
        }
        dict
    }

    fn from_dict(dict: &Value, cx: &LoadContext) -> Result<Self> {
        let raw: RawMinimizeTemplate = decode(Self::CLASS, dict, cx, &MINIMIZE_TEMPLATE_LEGACY)?;
        let mut template = Self::new(raw.settings)?;
        template.use_anchors = raw.use_anchors;
        if let Some(group) = raw.anchor_group {
            template.anchor_group = GROUP_LOADER.load(&group, cx)?;
        }
        Ok(template)
    }
}
