use crate::core::context::CompileContext;
use crate::core::io::dict::LoadContext;
use crate::core::models::extension::{EXTENSION_LOADER, Extension};
use crate::core::models::fileio::{FILEIO_LOADER, FileIo};
use crate::core::models::group::{GROUP_LOADER, Group};
use crate::error::Result;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::trace;

/// Groups, extensions and file outputs whose lifetime is bounded by one section.
///
/// Resources are declared groups first, then extensions, then file outputs, each
/// kind in append order. They are released in the exact reverse order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalResources {
    groups: Vec<Group>,
    extensions: Vec<Extension>,
    fileios: Vec<FileIo>,
}

/// Serialized resource lists, decoded alongside a section's own fields.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawResources {
    #[serde(default)]
    groups: Vec<Value>,
    #[serde(default)]
    extensions: Vec<Value>,
    #[serde(default)]
    fileios: Vec<Value>,
}

impl LocalResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn extensions(&self) -> &[Extension] {
        &self.extensions
    }

    pub fn fileios(&self) -> &[FileIo] {
        &self.fileios
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.extensions.is_empty() && self.fileios.is_empty()
    }

    pub fn add_group(&mut self, group: impl Into<Group>) {
        self.groups.push(group.into());
    }

    pub fn add_extension(&mut self, extension: impl Into<Extension>) {
        self.extensions.push(extension.into());
    }

    pub fn add_fileio(&mut self, fileio: impl Into<FileIo>) {
        self.fileios.push(fileio.into());
    }

    /// Appends the declaration of every resource to `out`.
    pub fn declare(&self, ctx: &CompileContext, out: &mut String) -> Result<()> {
        for group in &self.groups {
            trace!(group = %group.id(), "declaring group");
            out.push_str(&group.do_commands(ctx)?);
        }
        for extension in &self.extensions {
            trace!(extension = %extension.id(), "declaring extension");
            out.push_str(&extension.do_commands(ctx)?);
        }
        for fileio in &self.fileios {
            trace!(fileio = %fileio.id(), "declaring file output");
            out.push_str(&fileio.do_commands(ctx)?);
        }
        Ok(())
    }

    /// Appends the release of every resource to `out`, last declared first.
    pub fn undo(&self, out: &mut String) {
        for fileio in self.fileios.iter().rev() {
            out.push_str(&fileio.undo_commands());
        }
        for extension in self.extensions.iter().rev() {
            out.push_str(&extension.undo_commands());
        }
        for group in self.groups.iter().rev() {
            out.push_str(&group.undo_commands());
        }
    }

    /// Declares the resources, runs `body` while they are live, then releases them.
    ///
    /// Nothing is released if `body` fails: the partial text is discarded by the
    /// caller together with the error.
    pub fn scoped<F>(&self, ctx: &CompileContext, out: &mut String, body: F) -> Result<()>
    where
        F: FnOnce(&mut String) -> Result<()>,
    {
        self.declare(ctx, out)?;
        body(out)?;
        self.undo(out);
        Ok(())
    }

    pub(crate) fn write_dict(&self, dict: &mut Map<String, Value>) {
        dict.insert(
            "fileios".to_string(),
            Value::Array(self.fileios.iter().map(FileIo::to_dict).collect()),
        );
        dict.insert(
            "extensions".to_string(),
            Value::Array(self.extensions.iter().map(Extension::to_dict).collect()),
        );
        dict.insert(
            "groups".to_string(),
            Value::Array(self.groups.iter().map(Group::to_dict).collect()),
        );
    }

    pub(crate) fn from_raw(raw: RawResources, cx: &LoadContext) -> Result<Self> {
        Ok(Self {
            groups: GROUP_LOADER.load_all(&raw.groups, cx)?,
            extensions: EXTENSION_LOADER.load_all(&raw.extensions, cx)?,
            fileios: FILEIO_LOADER.load_all(&raw.fileios, cx)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::extension::ManualExtension;
    use crate::core::models::fileio::ManualFileIo;
    use crate::core::models::group::IndicesGroup;
    use crate::core::units::{UnitRegistry, UnitSystem};

    fn resources() -> LocalResources {
        let mut res = LocalResources::new();
        res.add_group(IndicesGroup::new("g1", &[1]).unwrap());
        res.add_group(IndicesGroup::new("g2", &[2]).unwrap());
        res.add_extension(ManualExtension::new("e1", "fix e1 all nve", "unfix e1").unwrap());
        res.add_fileio(ManualFileIo::new("f1", "dump f1", "undump f1", "f1.txt").unwrap());
        res
    }

    #[test]
    fn scoped_releases_in_reverse_declaration_order() {
        let ctx = CompileContext::new(UnitSystem::Real);
        let mut out = String::new();
        resources()
            .scoped(&ctx, &mut out, |out| {
                out.push_str("run 0\n");
                Ok(())
            })
            .unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            [
                "group g1 id 1",
                "group g2 id 2",
                "fix e1 all nve",
                "dump f1",
                "run 0",
                "undump f1",
                "unfix e1",
                "group g2 delete",
                "group g1 delete",
            ]
        );
    }

    #[test]
    fn scoped_skips_release_when_body_fails() {
        let ctx = CompileContext::new(UnitSystem::Real);
        let mut out = String::new();
        let result = resources().scoped(&ctx, &mut out, |_| {
            Err(crate::error::Error::Precondition("boom".into()))
        });
        assert!(result.is_err());
        assert!(!out.contains("delete"));
    }

    #[test]
    fn resources_round_trip_through_raw_lists() {
        let registry = UnitRegistry::new();
        let cx = LoadContext::new(&registry);
        let original = resources();
        let mut dict = Map::new();
        original.write_dict(&mut dict);
        let raw: RawResources = serde_json::from_value(Value::Object(dict)).unwrap();
        assert_eq!(LocalResources::from_raw(raw, &cx).unwrap(), original);
    }
}
