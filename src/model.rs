//! Canonical tree: category → symbol name → [`Record`].
//!
//! Records serialize to the flat upper-case key layout downstream tools read
//! (`SEARCH`, `LINK`, `DEPRECATED`, `MEMBERS`, ...). The shape-specific part of
//! a record lives in [`Kind`], flattened into the same JSON object.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub type Members = BTreeMap<String, Record>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Globals,
    Hooks,
    Panels,
    Enums,
    Classes,
    Libraries,
    Structs,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Globals,
        Category::Hooks,
        Category::Panels,
        Category::Enums,
        Category::Classes,
        Category::Libraries,
        Category::Structs,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Category::Globals => "GLOBALS",
            Category::Hooks => "HOOKS",
            Category::Panels => "PANELS",
            Category::Enums => "ENUMS",
            Category::Classes => "CLASSES",
            Category::Libraries => "LIBRARIES",
            Category::Structs => "STRUCTS",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    #[serde(rename = "GLOBALS", default)]
    pub globals: Members,
    #[serde(rename = "HOOKS", default)]
    pub hooks: Members,
    #[serde(rename = "PANELS", default)]
    pub panels: Members,
    #[serde(rename = "ENUMS", default)]
    pub enums: Members,
    #[serde(rename = "CLASSES", default)]
    pub classes: Members,
    #[serde(rename = "LIBRARIES", default)]
    pub libraries: Members,
    #[serde(rename = "STRUCTS", default)]
    pub structs: Members,
}

impl Tree {
    pub fn category(&self, category: Category) -> &Members {
        match category {
            Category::Globals => &self.globals,
            Category::Hooks => &self.hooks,
            Category::Panels => &self.panels,
            Category::Enums => &self.enums,
            Category::Classes => &self.classes,
            Category::Libraries => &self.libraries,
            Category::Structs => &self.structs,
        }
    }

    pub fn category_mut(&mut self, category: Category) -> &mut Members {
        match category {
            Category::Globals => &mut self.globals,
            Category::Hooks => &mut self.hooks,
            Category::Panels => &mut self.panels,
            Category::Enums => &mut self.enums,
            Category::Classes => &mut self.classes,
            Category::Libraries => &mut self.libraries,
            Category::Structs => &mut self.structs,
        }
    }

    #[cfg(test)]
    pub fn get(&self, path: &RecordPath) -> Option<&Record> {
        let (first, rest) = path.keys.split_first()?;
        let mut record = self.category(path.category).get(first)?;
        for key in rest {
            record = record.members()?.get(key)?;
        }
        Some(record)
    }

    pub fn get_mut(&mut self, path: &RecordPath) -> Option<&mut Record> {
        let (first, rest) = path.keys.split_first()?;
        let mut record = self.category_mut(path.category).get_mut(first)?;
        for key in rest {
            record = record.members_mut()?.get_mut(key)?;
        }
        Some(record)
    }
}

/// Address of a record: its category plus the key chain through `MEMBERS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPath {
    pub category: Category,
    pub keys: Vec<String>,
}

impl RecordPath {
    pub fn new(category: Category, key: impl Into<String>) -> Self {
        Self {
            category,
            keys: vec![key.into()],
        }
    }

    pub fn member(&self, key: impl Into<String>) -> Self {
        let mut keys = self.keys.clone();
        keys.push(key.into());
        Self {
            category: self.category,
            keys,
        }
    }
}

// ── Records ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "SEARCH", default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(rename = "LINK", default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(flatten)]
    pub flags: Flags,
    #[serde(flatten)]
    pub docs: Annotations,
    #[serde(flatten)]
    pub kind: Kind,
}

/// Shape of a record. Variant order matters for deserialization: each
/// variant is tried in turn, and `Callable` accepts anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Kind {
    Container(Container),
    EnumValue(EnumValue),
    Field(Field),
    Callable(Callable),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Container {
    #[serde(rename = "MEMBERS")]
    pub members: Members,
    #[serde(rename = "PARENT", default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(rename = "PREVIEW", default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnumValue {
    #[serde(rename = "VALUE")]
    pub value: String,
    #[serde(rename = "FAMILY", default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(rename = "BASE_DESCRIPTION", default, skip_serializing_if = "Option::is_none")]
    pub base_description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Field {
    #[serde(rename = "NAME")]
    pub name: String,
    #[serde(rename = "TYPE", default, skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,
    #[serde(rename = "DEFAULT", default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Callable {
    #[serde(rename = "ARGUMENTS", default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<Param>,
    #[serde(rename = "RETURNS", default, skip_serializing_if = "Vec::is_empty")]
    pub returns: Vec<Param>,
    #[serde(rename = "SRC", default, skip_serializing_if = "Option::is_none")]
    pub src: Option<Src>,
}

/// `[file, "start-end"]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Src(pub String, pub String);

/// One declared argument or return value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Param {
    #[serde(rename = "NAME", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "TYPE", default, skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,
    #[serde(rename = "ENUM", default, skip_serializing_if = "Option::is_none")]
    pub enum_name: Option<String>,
    #[serde(flatten)]
    pub docs: Annotations,
}

impl Record {
    fn with_kind(search: Option<String>, kind: Kind) -> Self {
        Self {
            search,
            link: None,
            flags: Flags::default(),
            docs: Annotations::default(),
            kind,
        }
    }

    pub fn callable(search: impl Into<String>) -> Self {
        Self::with_kind(Some(search.into()), Kind::Callable(Callable::default()))
    }

    pub fn container(search: Option<String>) -> Self {
        Self::with_kind(search, Kind::Container(Container::default()))
    }

    pub fn field(search: impl Into<String>, name: impl Into<String>) -> Self {
        Self::with_kind(
            Some(search.into()),
            Kind::Field(Field {
                name: name.into(),
                ..Field::default()
            }),
        )
    }

    /// Enum template; `SEARCH` is filled in per value.
    pub fn enum_value(value: EnumValue) -> Self {
        Self::with_kind(None, Kind::EnumValue(value))
    }

    pub fn members(&self) -> Option<&Members> {
        match &self.kind {
            Kind::Container(c) => Some(&c.members),
            _ => None,
        }
    }

    pub fn members_mut(&mut self) -> Option<&mut Members> {
        match &mut self.kind {
            Kind::Container(c) => Some(&mut c.members),
            _ => None,
        }
    }

    pub fn callable_mut(&mut self) -> Option<&mut Callable> {
        match &mut self.kind {
            Kind::Callable(c) => Some(c),
            _ => None,
        }
    }

    /// Records that can carry a source location.
    pub fn takes_src(&self) -> bool {
        self.flags.function || self.flags.method
    }

    /// Set capability flags from a navigation node's class list.
    pub fn apply_classes<'a>(
        &mut self,
        classes: impl IntoIterator<Item = &'a str>,
        force_non_deprecated: bool,
    ) {
        for class in classes {
            match class {
                "depr" if !force_non_deprecated => self.docs.deprecated.flag(),
                "rm" => self.flags.menu = true,
                "rc" => self.flags.client = true,
                "rs" => self.flags.server = true,
                "intrn" => self.flags.internal = true,
                "event" => self.flags.event = true,
                "method" => self.flags.method = true,
                "f" => self.flags.function = true,
                "new" => self.flags.new = true,
                _ => {}
            }
        }
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flags {
    #[serde(rename = "MENU", default, skip_serializing_if = "is_false")]
    pub menu: bool,
    #[serde(rename = "CLIENT", default, skip_serializing_if = "is_false")]
    pub client: bool,
    #[serde(rename = "SERVER", default, skip_serializing_if = "is_false")]
    pub server: bool,
    #[serde(rename = "INTERNAL", default, skip_serializing_if = "is_false")]
    pub internal: bool,
    #[serde(rename = "EVENT", default, skip_serializing_if = "is_false")]
    pub event: bool,
    #[serde(rename = "METHOD", default, skip_serializing_if = "is_false")]
    pub method: bool,
    #[serde(rename = "FUNCTION", default, skip_serializing_if = "is_false")]
    pub function: bool,
    #[serde(rename = "NEW", default, skip_serializing_if = "is_false")]
    pub new: bool,
    #[serde(rename = "PREDICTED", default, skip_serializing_if = "is_false")]
    pub predicted: bool,
    #[serde(rename = "REF_ONLY", default, skip_serializing_if = "is_false")]
    pub ref_only: bool,
}

// ── Free-text annotations ──

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotations {
    #[serde(rename = "DEPRECATED", default, skip_serializing_if = "Deprecation::is_none")]
    pub deprecated: Deprecation,
    #[serde(rename = "DESCRIPTION", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "NOTES", default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    #[serde(rename = "WARNINGS", default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(rename = "BUGS", default, skip_serializing_if = "Vec::is_empty")]
    pub bugs: Vec<Bug>,
}

impl Annotations {
    /// Later fragments are appended after a blank line.
    pub fn append_description(&mut self, text: &str) {
        match &mut self.description {
            Some(existing) => {
                existing.push_str("\n\n");
                existing.push_str(text);
            }
            None => self.description = Some(text.to_string()),
        }
    }

    /// Fold another fragment into this one, keeping list ordering invariants.
    pub fn absorb(&mut self, other: &Annotations) {
        if let Some(text) = &other.description {
            self.append_description(text);
        }
        match &other.deprecated {
            Deprecation::None => {}
            Deprecation::Flagged => self.deprecated.flag(),
            Deprecation::Detailed(details) => {
                for d in details {
                    self.deprecated.push_detail(d.clone());
                }
            }
        }
        self.notes.extend(other.notes.iter().cloned());
        self.warnings.extend(other.warnings.iter().cloned());
        self.bugs.extend(other.bugs.iter().cloned());
        self.sort();
    }

    /// Sort list annotations by character length; ties keep discovery order.
    pub fn sort(&mut self) {
        sort_by_len(&mut self.notes);
        sort_by_len(&mut self.warnings);
        if let Deprecation::Detailed(details) = &mut self.deprecated {
            sort_by_len(details);
        }
    }
}

pub fn sort_by_len(list: &mut [String]) {
    list.sort_by_key(|s| s.chars().count());
}

/// `DEPRECATED`: absent, a bare `true`, or a list of explanations.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Deprecation {
    #[default]
    None,
    Flagged,
    Detailed(Vec<String>),
}

impl Deprecation {
    pub fn is_none(&self) -> bool {
        matches!(self, Deprecation::None)
    }

    /// Mark deprecated without detail; never downgrades a detailed marker.
    pub fn flag(&mut self) {
        if self.is_none() {
            *self = Deprecation::Flagged;
        }
    }

    /// Attach explanatory text, switching a bare flag to the list form.
    pub fn push_detail(&mut self, text: String) {
        match self {
            Deprecation::Detailed(details) => details.push(text),
            _ => *self = Deprecation::Detailed(vec![text]),
        }
    }
}

impl Serialize for Deprecation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Deprecation::None => serializer.serialize_bool(false),
            Deprecation::Flagged => serializer.serialize_bool(true),
            Deprecation::Detailed(details) => details.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Deprecation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Details(Vec<String>),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Flag(false) => Deprecation::None,
            Raw::Flag(true) => Deprecation::Flagged,
            Raw::Details(details) => Deprecation::Detailed(details),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bug {
    #[serde(rename = "PULL", default, skip_serializing_if = "Option::is_none")]
    pub pull: Option<String>,
    #[serde(rename = "ISSUE", default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,
    #[serde(rename = "DESCRIPTION", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
