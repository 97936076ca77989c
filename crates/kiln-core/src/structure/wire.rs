//! JSON wire format for layout payloads.
//!
//! ```json
//! {
//!   "directories": { "<name>": { "description": "...", "directories": {...}, "files": {...} } },
//!   "files":       { "<name>": { "description": "...", "type": "module", "content_template": "..." } }
//! }
//! ```
//!
//! Maps are decoded into ordered entry lists so duplicate keys survive to
//! validation instead of being silently collapsed. Lists of named objects
//! are accepted too:
//!
//! ```json
//! {
//!   "directories": [ { "name": "<name>", "purpose": "...", "subdirectories": [...], "files": [...] } ],
//!   "files":       [ { "name": "<name>", "purpose": "...", "content_type": "module", "content_summary": "..." } ]
//! }
//! ```

use std::fmt;
use std::marker::PhantomData;

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use super::types::{DirectoryNode, FileNode, StructureNode, StructureTree};

/// An ordered JSON object that keeps duplicate keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entries<T>(pub Vec<(String, T)>);

impl<T> Default for Entries<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> Entries<T> {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, T)> {
        self.0.iter()
    }
}

impl<T: Serialize> Serialize for Entries<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct EntriesVisitor<T>(PhantomData<T>);

impl<'de, T: Deserialize<'de>> Visitor<'de> for EntriesVisitor<T> {
    type Value = Entries<T>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object keyed by name or a list of named objects")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, T>()? {
            entries.push((key, value));
        }
        Ok(Entries(entries))
    }

    /// Each item is an object carrying its own `name`, or a bare name.
    /// An item without a name gets an empty one, which validation rejects.
    fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some(item) = access.next_element::<serde_json::Value>()? {
            let (name, body) = match item {
                serde_json::Value::Object(mut fields) => {
                    let name = match fields.remove("name") {
                        Some(serde_json::Value::String(s)) => s,
                        Some(serde_json::Value::Null) | None => String::new(),
                        Some(other) => other.to_string(),
                    };
                    (name, serde_json::Value::Object(fields))
                }
                serde_json::Value::String(name) => {
                    (name, serde_json::Value::Object(serde_json::Map::new()))
                }
                other => {
                    return Err(de::Error::invalid_type(
                        de::Unexpected::Other(&other.to_string()),
                        &"a named object or a name",
                    ));
                }
            };
            let value = T::deserialize(body).map_err(<A::Error as de::Error>::custom)?;
            entries.push((name, value));
        }
        Ok(Entries(entries))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(Entries::default())
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(Entries::default())
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Entries<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(EntriesVisitor(PhantomData))
    }
}

/// Accept strings, numbers, booleans, or null where text is expected.
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "WireDirectoryRepr")]
pub struct WireDirectory {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub directories: Entries<WireDirectory>,
    pub files: Entries<WireFile>,
}

#[derive(Deserialize)]
struct WireDirectoryFields {
    #[serde(default, deserialize_with = "lenient_text", alias = "purpose")]
    description: Option<String>,
    #[serde(default, alias = "subdirectories")]
    directories: Entries<WireDirectory>,
    #[serde(default)]
    files: Entries<WireFile>,
}

/// A directory entry may be a full object, a description string, or null.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireDirectoryRepr {
    Empty(()),
    Described(String),
    Full(WireDirectoryFields),
}

impl From<WireDirectoryRepr> for WireDirectory {
    fn from(repr: WireDirectoryRepr) -> Self {
        match repr {
            WireDirectoryRepr::Empty(()) => Self::default(),
            WireDirectoryRepr::Described(description) => Self {
                description: Some(description),
                ..Self::default()
            },
            WireDirectoryRepr::Full(d) => Self {
                description: d.description,
                directories: d.directories,
                files: d.files,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "WireFileRepr")]
pub struct WireFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_template: Option<String>,
}

#[derive(Deserialize)]
struct WireFileFields {
    #[serde(default, deserialize_with = "lenient_text", alias = "purpose")]
    description: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", rename = "type", alias = "kind")]
    kind: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    content_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", alias = "content")]
    content_template: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    content_summary: Option<String>,
}

/// A file entry may be a full object or just a description string.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireFileRepr {
    Described(String),
    Full(WireFileFields),
}

impl From<WireFileRepr> for WireFile {
    fn from(repr: WireFileRepr) -> Self {
        match repr {
            WireFileRepr::Described(description) => Self {
                description: Some(description),
                ..Self::default()
            },
            WireFileRepr::Full(f) => Self {
                description: f.description,
                kind: f.kind.or(f.content_type),
                content_template: f.content_template.or(f.content_summary),
            },
        }
    }
}

/// The top-level layout object.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WireStructure {
    #[serde(default)]
    pub directories: Entries<WireDirectory>,
    #[serde(default)]
    pub files: Entries<WireFile>,
}

/// What a candidate payload decodes to before it is accepted as a layout.
///
/// At least one of the members must be present; `structure` and its
/// aliases wrap a nested layout object.
#[derive(Debug, Deserialize)]
pub(crate) struct WirePayload {
    #[serde(default)]
    directories: Option<Entries<WireDirectory>>,
    #[serde(default)]
    files: Option<Entries<WireFile>>,
    #[serde(default, alias = "file_structure", alias = "project_structure")]
    structure: Option<Box<WirePayload>>,
}

impl WirePayload {
    /// Unwrap into a layout, or `None` if this object is not one.
    pub(crate) fn into_structure(self) -> Option<WireStructure> {
        if self.directories.is_some() || self.files.is_some() {
            return Some(WireStructure {
                directories: self.directories.unwrap_or_default(),
                files: self.files.unwrap_or_default(),
            });
        }
        self.structure.and_then(|inner| inner.into_structure())
    }
}

// ---------------------------------------------------------------------------
// Tree -> wire
// ---------------------------------------------------------------------------

fn split_children(children: &[StructureNode]) -> (Entries<WireDirectory>, Entries<WireFile>) {
    let mut dirs = Vec::new();
    let mut files = Vec::new();
    for child in children {
        match child {
            StructureNode::Directory(d) => dirs.push((d.name.clone(), WireDirectory::from(d))),
            StructureNode::File(f) => files.push((f.name.clone(), WireFile::from(f))),
        }
    }
    (Entries(dirs), Entries(files))
}

impl From<&DirectoryNode> for WireDirectory {
    fn from(dir: &DirectoryNode) -> Self {
        let (directories, files) = split_children(&dir.children);
        Self {
            description: dir.purpose.clone(),
            directories,
            files,
        }
    }
}

impl From<&FileNode> for WireFile {
    fn from(file: &FileNode) -> Self {
        Self {
            description: file.purpose.clone(),
            kind: Some(file.kind.as_str().to_owned()),
            content_template: file.intent.clone(),
        }
    }
}

impl From<&StructureTree> for WireStructure {
    fn from(tree: &StructureTree) -> Self {
        let (directories, files) = split_children(&tree.roots);
        Self { directories, files }
    }
}

impl StructureTree {
    /// The tree in wire format.
    pub fn to_wire(&self) -> WireStructure {
        WireStructure::from(self)
    }

    /// Pretty-printed wire JSON. Parsing it back yields an equal tree.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.to_wire()).unwrap_or_else(|_| "{}".to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_keys_are_kept_in_order() {
        let json = r#"{"files": {"a.txt": {"type": "other"}, "b.txt": {}, "a.txt": {"description": "second"}}}"#;
        let payload: WirePayload = serde_json::from_str(json).unwrap();
        let wire = payload.into_structure().unwrap();
        let names: Vec<_> = wire.files.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "a.txt"]);
        assert_eq!(wire.files.0[2].1.description.as_deref(), Some("second"));
    }

    #[test]
    fn string_file_entries_are_descriptions() {
        let json = r#"{"files": {"main.py": "entry point"}}"#;
        let wire = serde_json::from_str::<WirePayload>(json)
            .unwrap()
            .into_structure()
            .unwrap();
        assert_eq!(
            wire.files.0[0].1,
            WireFile {
                description: Some("entry point".into()),
                kind: None,
                content_template: None,
            }
        );
    }

    #[test]
    fn null_members_are_empty() {
        let json = r#"{"directories": null, "files": {"x": {"description": null, "type": 5}}}"#;
        let wire = serde_json::from_str::<WirePayload>(json)
            .unwrap()
            .into_structure()
            .unwrap();
        assert!(wire.directories.is_empty());
        assert_eq!(wire.files.0[0].1.kind.as_deref(), Some("5"));
        assert_eq!(wire.files.0[0].1.description, None);
    }

    #[test]
    fn directory_shorthands() {
        let json = r#"{"directories": {"a": null, "b": "assets", "c": {"subdirectories": {"d": {}}}}}"#;
        let wire = serde_json::from_str::<WirePayload>(json)
            .unwrap()
            .into_structure()
            .unwrap();
        let dirs = &wire.directories.0;
        assert_eq!(dirs[0].1, WireDirectory::default());
        assert_eq!(dirs[1].1.description.as_deref(), Some("assets"));
        assert_eq!(dirs[2].1.directories.0[0].0, "d");
    }

    #[test]
    fn named_lists_are_entries() {
        let json = r#"{"structure": {
            "directories": [
                {"name": "src", "purpose": "code", "subdirectories": [{"name": "api"}],
                 "files": [{"name": "main.py", "purpose": "entry", "content_type": "module", "content_summary": "main loop"}]}
            ],
            "files": ["README.md", {"name": "setup.py"}, {"name": "setup.py", "purpose": "again"}]
        }}"#;
        let wire = serde_json::from_str::<WirePayload>(json)
            .unwrap()
            .into_structure()
            .unwrap();

        let (name, src) = &wire.directories.0[0];
        assert_eq!(name, "src");
        assert_eq!(src.description.as_deref(), Some("code"));
        assert_eq!(src.directories.0[0].0, "api");
        assert_eq!(
            src.files.0[0],
            (
                "main.py".to_owned(),
                WireFile {
                    description: Some("entry".into()),
                    kind: Some("module".into()),
                    content_template: Some("main loop".into()),
                }
            )
        );

        let names: Vec<_> = wire.files.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["README.md", "setup.py", "setup.py"]);
    }

    #[test]
    fn list_item_without_name_gets_empty_name() {
        let json = r#"{"files": [{"purpose": "orphan"}]}"#;
        let wire = serde_json::from_str::<WirePayload>(json)
            .unwrap()
            .into_structure()
            .unwrap();
        assert_eq!(wire.files.0[0].0, "");
    }

    #[test]
    fn content_type_and_summary_fill_tag_and_intent() {
        let json = r#"{"files": {"app.py": {"purpose": "entry", "content_type": "test", "content_summary": "main loop"}}}"#;
        let wire = serde_json::from_str::<WirePayload>(json)
            .unwrap()
            .into_structure()
            .unwrap();
        let file = &wire.files.0[0].1;
        assert_eq!(file.kind.as_deref(), Some("test"));
        assert_eq!(file.content_template.as_deref(), Some("main loop"));
    }

    #[test]
    fn wrapped_structure_is_unwrapped() {
        let json = r#"{"project_structure": {"directories": {"src": {}}}}"#;
        let wire = serde_json::from_str::<WirePayload>(json)
            .unwrap()
            .into_structure()
            .unwrap();
        assert_eq!(wire.directories.0[0].0, "src");
    }

    #[test]
    fn unrelated_object_is_not_a_structure() {
        let payload: WirePayload = serde_json::from_str(r#"{"name": "x", "version": 1}"#).unwrap();
        assert!(payload.into_structure().is_none());
    }

    #[test]
    fn serializes_with_type_key_and_no_nulls() {
        let wire = WireStructure {
            directories: Entries::default(),
            files: Entries(vec![(
                "main.x".into(),
                WireFile {
                    description: Some("d".into()),
                    kind: Some("other".into()),
                    content_template: None,
                },
            )]),
        };
        let json = serde_json::to_string(&wire).unwrap();
        assert_eq!(
            json,
            r#"{"directories":{},"files":{"main.x":{"description":"d","type":"other"}}}"#
        );
    }
}
