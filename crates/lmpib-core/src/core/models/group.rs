use crate::core::context::CompileContext;
use crate::core::io::dict::{LegacyShape, LoadContext, decode, expect_class, with_class};
use crate::core::io::loader::{Loader, load_as};
use crate::core::io::traits::DictNode;
use crate::core::utils::identifiers::Identifier;
use crate::core::utils::text::command_lines;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;

pub const ALL_GROUP_NAME: &str = "all";
pub const EMPTY_GROUP_NAME: &str = "empty";

/// A named subset of atoms that other building blocks bind to by name.
#[derive(Debug, Clone, PartialEq)]
pub enum Group {
    All(AllGroup),             // Every atom; predefined by the engine
    Empty(EmptyGroup),         // No atom; predefined by the engine
    Indices(IndicesGroup),     // Explicit 1-based atom ids
    Operation(OperationGroup), // Set operation over other groups
    Reference(ReferenceGroup), // Alias of a group declared in an outer scope
    Manual(ManualGroup),       // Raw commands
}

pub static GROUP_LOADER: Loader<Group> = Loader::new(
    "Group",
    &[
        (AllGroup::CLASS, load_as::<AllGroup, Group>),
        (EmptyGroup::CLASS, load_as::<EmptyGroup, Group>),
        (IndicesGroup::CLASS, load_as::<IndicesGroup, Group>),
        (OperationGroup::CLASS, load_as::<OperationGroup, Group>),
        (ReferenceGroup::CLASS, load_as::<ReferenceGroup, Group>),
        (ManualGroup::CLASS, load_as::<ManualGroup, Group>),
    ],
);

impl Group {
    /// The group's own display name.
    pub fn id(&self) -> &Identifier {
        match self {
            Group::All(g) => &g.name,
            Group::Empty(g) => &g.name,
            Group::Indices(g) => &g.name,
            Group::Operation(g) => &g.name,
            Group::Reference(g) => &g.name,
            Group::Manual(g) => &g.name,
        }
    }

    /// The engine-side name other building blocks use to refer to this group.
    ///
    /// Identical to [`Group::id`] except for a [`ReferenceGroup`], whose handle is
    /// the name of the group it aliases.
    pub fn handle(&self) -> &str {
        match self {
            Group::Reference(g) => g.reference.as_str(),
            other => other.id().as_str(),
        }
    }

    pub fn class(&self) -> &'static str {
        match self {
            Group::All(_) => AllGroup::CLASS,
            Group::Empty(_) => EmptyGroup::CLASS,
            Group::Indices(_) => IndicesGroup::CLASS,
            Group::Operation(_) => OperationGroup::CLASS,
            Group::Reference(_) => ReferenceGroup::CLASS,
            Group::Manual(_) => ManualGroup::CLASS,
        }
    }

    pub fn do_commands(&self, _ctx: &CompileContext) -> Result<String> {
        match self {
            Group::All(_) | Group::Empty(_) | Group::Reference(_) => Ok(String::new()),
            Group::Indices(g) => Ok(g.do_commands()),
            Group::Operation(g) => g.do_commands(),
            Group::Manual(g) => Ok(command_lines(&g.do_cmd)),
        }
    }

    pub fn undo_commands(&self) -> String {
        match self {
            Group::All(_) | Group::Empty(_) | Group::Reference(_) => String::new(),
            Group::Indices(g) => format!("group {} delete\n", g.name),
            Group::Operation(g) => format!("group {} delete\n", g.name),
            Group::Manual(g) => command_lines(&g.undo_cmd),
        }
    }

    pub fn to_dict(&self) -> Value {
        match self {
            Group::All(g) => g.to_dict(),
            Group::Empty(g) => g.to_dict(),
            Group::Indices(g) => g.to_dict(),
            Group::Operation(g) => g.to_dict(),
            Group::Reference(g) => g.to_dict(),
            Group::Manual(g) => g.to_dict(),
        }
    }

    pub fn from_dict(dict: &Value, cx: &LoadContext) -> Result<Self> {
        GROUP_LOADER.load(dict, cx)
    }
}

macro_rules! group_variant {
    ($($variant:ident($ty:ident)),* $(,)?) => {
        $(
            impl From<$ty> for Group {
                fn from(group: $ty) -> Self {
                    Group::$variant(group)
                }
            }
        )*
    };
}

group_variant!(
    All(AllGroup),
    Empty(EmptyGroup),
    Indices(IndicesGroup),
    Operation(OperationGroup),
    Reference(ReferenceGroup),
    Manual(ManualGroup),
);

/// The engine's predefined group of every atom.
#[derive(Debug, Clone, PartialEq)]
pub struct AllGroup {
    name: Identifier,
}

impl AllGroup {
    pub fn new() -> Self {
        Self {
            name: Identifier::predefined(ALL_GROUP_NAME),
        }
    }
}

impl Default for AllGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl DictNode for AllGroup {
    const CLASS: &'static str = "AllGroup";

    fn to_dict(&self) -> Value {
        with_class(Self::CLASS, json!({ "group_name": self.name }))
    }

    fn from_dict(dict: &Value, _cx: &LoadContext) -> Result<Self> {
        expect_class(dict, Self::CLASS)?;
        Ok(Self::new())
    }
}

/// The engine's predefined empty group.
#[derive(Debug, Clone, PartialEq)]
pub struct EmptyGroup {
    name: Identifier,
}

impl EmptyGroup {
    pub fn new() -> Self {
        Self {
            name: Identifier::predefined(EMPTY_GROUP_NAME),
        }
    }
}

impl Default for EmptyGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl DictNode for EmptyGroup {
    const CLASS: &'static str = "EmptyGroup";

    fn to_dict(&self) -> Value {
        with_class(Self::CLASS, json!({ "group_name": self.name }))
    }

    fn from_dict(dict: &Value, _cx: &LoadContext) -> Result<Self> {
        expect_class(dict, Self::CLASS)?;
        Ok(Self::new())
    }
}

/// A group listing explicit atom ids.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicesGroup {
    name: Identifier,
    indices: Vec<u64>,
}

#[derive(Deserialize)]
struct RawIndices {
    group_name: Identifier,
    #[serde(default)]
    indices: Vec<i64>,
}

impl IndicesGroup {
    /// Fails if any index is zero or negative; atom ids are 1-based.
    pub fn new(name: &str, indices: &[i64]) -> Result<Self> {
        let name = Identifier::new(name)?;
        let indices = indices
            .iter()
            .map(|&index| {
                u64::try_from(index).ok().filter(|&i| i > 0).ok_or_else(|| {
                    Error::configuration(
                        name.as_str(),
                        format!("atom index {index} is not positive; indices start at 1"),
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { name, indices })
    }

    pub fn indices(&self) -> &[u64] {
        &self.indices
    }

    fn do_commands(&self) -> String {
        if self.indices.is_empty() {
            return format!("group {} empty\n", self.name);
        }
        let ids: Vec<String> = self.indices.iter().map(u64::to_string).collect();
        format!("group {} id {}\n", self.name, ids.join(" "))
    }
}

impl DictNode for IndicesGroup {
    const CLASS: &'static str = "IndicesGroup";

    fn to_dict(&self) -> Value {
        with_class(
            Self::CLASS,
            json!({ "group_name": self.name, "indices": self.indices }),
        )
    }

    fn from_dict(dict: &Value, cx: &LoadContext) -> Result<Self> {
        let raw: RawIndices = decode(Self::CLASS, dict, cx, &LegacyShape::UNCHANGED)?;
        Self::new(raw.group_name.as_str(), &raw.indices)
    }
}

/// The set operation an [`OperationGroup`] applies to its operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupOperation {
    Subtract,
    Union,
    Intersect,
}

impl GroupOperation {
    pub fn keyword(&self) -> &'static str {
        match self {
            GroupOperation::Subtract => "subtract",
            GroupOperation::Union => "union",
            GroupOperation::Intersect => "intersect",
        }
    }

    pub fn min_operands(&self) -> usize {
        match self {
            GroupOperation::Union => 1,
            GroupOperation::Subtract | GroupOperation::Intersect => 2,
        }
    }
}

impl fmt::Display for GroupOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A group derived from other groups by union, subtraction or intersection.
///
/// Operands are captured by handle when the group is built, so later changes to
/// the operand groups are not seen.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationGroup {
    name: Identifier,
    op: GroupOperation,
    operands: Vec<Identifier>,
}

#[derive(Deserialize)]
struct RawOperation {
    group_name: Identifier,
    op: GroupOperation,
    #[serde(default)]
    operands: Vec<Identifier>,
}

const OPERATION_LEGACY: LegacyShape = LegacyShape {
    renames: &[("otherGroups", "operands")],
    codes: &[("op", &["subtract", "union", "intersect"])],
};

impl OperationGroup {
    pub fn new(name: &str, op: GroupOperation, operands: &[&Group]) -> Result<Self> {
        let operands = operands
            .iter()
            .map(|g| Identifier::new(g.handle()))
            .collect::<Result<Vec<_>>>()?;
        Self::from_operand_names(name, op, operands)
    }

    pub fn from_operand_names(name: &str, op: GroupOperation, operands: Vec<Identifier>) -> Result<Self> {
        let group = Self {
            name: Identifier::new(name)?,
            op,
            operands,
        };
        group.validate()?;
        Ok(group)
    }

    pub fn operation(&self) -> GroupOperation {
        self.op
    }

    pub fn operands(&self) -> &[Identifier] {
        &self.operands
    }

    fn validate(&self) -> Result<()> {
        let required = self.op.min_operands();
        if self.operands.len() < required {
            return Err(Error::configuration(
                self.name.as_str(),
                format!(
                    "{} requires at least {} operand group(s), got {}",
                    self.op,
                    required,
                    self.operands.len()
                ),
            ));
        }
        Ok(())
    }

    fn do_commands(&self) -> Result<String> {
        self.validate()?;
        let mut line = format!("group {} {}", self.name, self.op);
        for operand in &self.operands {
            line.push(' ');
            line.push_str(operand.as_str());
        }
        line.push('\n');
        Ok(line)
    }
}

impl DictNode for OperationGroup {
    const CLASS: &'static str = "OperationGroup";

    fn to_dict(&self) -> Value {
        with_class(
            Self::CLASS,
            json!({ "group_name": self.name, "op": self.op, "operands": self.operands }),
        )
    }

    fn from_dict(dict: &Value, cx: &LoadContext) -> Result<Self> {
        let raw: RawOperation = decode(Self::CLASS, dict, cx, &OPERATION_LEGACY)?;
        Self::from_operand_names(raw.group_name.as_str(), raw.op, raw.operands)
    }
}

/// An alias passing an outer group into a nested scope without re-declaring it.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceGroup {
    name: Identifier,
    reference: Identifier,
}

#[derive(Deserialize)]
struct RawReference {
    group_name: Identifier,
    reference: Identifier,
}

impl ReferenceGroup {
    pub fn new(name: &str, reference: &Group) -> Result<Self> {
        Ok(Self {
            name: Identifier::new(name)?,
            reference: Identifier::new(reference.handle())?,
        })
    }

    pub fn reference(&self) -> &Identifier {
        &self.reference
    }
}

impl DictNode for ReferenceGroup {
    const CLASS: &'static str = "ReferenceGroup";

    fn to_dict(&self) -> Value {
        with_class(
            Self::CLASS,
            json!({ "group_name": self.name, "reference": self.reference }),
        )
    }

    fn from_dict(dict: &Value, cx: &LoadContext) -> Result<Self> {
        let raw: RawReference = decode(Self::CLASS, dict, cx, &LegacyShape::UNCHANGED)?;
        Ok(Self {
            name: raw.group_name,
            reference: raw.reference,
        })
    }
}

/// A group declared by raw command text.
#[derive(Debug, Clone, PartialEq)]
pub struct ManualGroup {
    name: Identifier,
    do_cmd: String,
    undo_cmd: String,
}

#[derive(Deserialize)]
struct RawManual {
    group_name: Identifier,
    #[serde(default)]
    do_cmd: String,
    #[serde(default)]
    undo_cmd: String,
}

impl ManualGroup {
    pub fn new(name: &str, do_cmd: &str, undo_cmd: &str) -> Result<Self> {
        Ok(Self {
            name: Identifier::new(name)?,
            do_cmd: do_cmd.to_string(),
            undo_cmd: undo_cmd.to_string(),
        })
    }
}

impl DictNode for ManualGroup {
    const CLASS: &'static str = "ManualGroup";

    fn to_dict(&self) -> Value {
        with_class(
            Self::CLASS,
            json!({ "group_name": self.name, "do_cmd": self.do_cmd, "undo_cmd": self.undo_cmd }),
        )
    }

    fn from_dict(dict: &Value, cx: &LoadContext) -> Result<Self> {
        let raw: RawManual = decode(Self::CLASS, dict, cx, &LegacyShape::UNCHANGED)?;
        Ok(Self {
            name: raw.group_name,
            do_cmd: raw.do_cmd,
            undo_cmd: raw.undo_cmd,
        })
    }
}
