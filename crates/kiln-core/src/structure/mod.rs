//! Project layouts: parse a generated layout payload into a tree, then
//! materialize the tree on disk.
//!
//! ```text
//! layout text --parse--> StructureTree --materialize--> files + .structure
//! ```

pub mod content;
pub mod materialize;
pub mod parser;
pub mod types;
pub mod wire;

pub use content::{CommentStyle, render_stub, sidecar, stub_artifact};
pub use materialize::{
    EntryKind, EntryStatus, MANIFEST_FILE, Manifest, ManifestEntry, MaterializeMeta, SIDECAR_FILE,
    fingerprint, materialize,
};
pub use parser::{
    DEFAULT_MAX_DEPTH, ParsedStructure, StructureParseError, StructureParser, StructureWarning,
    is_safe_name, parse,
};
pub use types::{
    ContentKind, ContentKindParseError, DirectoryNode, FileNode, GeneratedArtifact, StructureNode,
    StructureTree,
};
pub use wire::{Entries, WireDirectory, WireFile, WireStructure};
