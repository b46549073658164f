//! Intermediate tree discovery.
//!
//! Reads the on-disk tree produced by the upstream extraction step and turns
//! it into an [`IntermediateTree`]. Only the class level is enumerated here;
//! node files are discovered by [`ClassEntry::nodes`] when the assembly
//! pipeline reaches that class.
//!
//! ## Directory Structure
//!
//! ```text
//! intermediate/
//! ├── index.xml                # Whole doc set descriptor
//! ├── Actor/                   # Class (title = directory name)
//! │   ├── Actor.xml            # Class descriptor
//! │   ├── nodes/               # Optional: one XML file per node
//! │   │   ├── BeginPlay.xml
//! │   │   └── Tick.xml
//! │   └── img/                 # Optional: copied verbatim
//! │       └── nd_img_Tick.png
//! └── Math/
//!     └── Math.xml             # No nodes/ → no pages, images still copied
//! ```
//!
//! Absence of `nodes/`, `img/` or the class descriptor is never an error at
//! this layer. The assembly pipeline decides what each absence means.

use serde::Serialize;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Intermediate directory not found: {0}")]
    NotFound(PathBuf),
    #[error("Intermediate path is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Cannot read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub const INDEX_DESCRIPTOR: &str = "index.xml";
pub const NODES_DIR: &str = "nodes";
pub const IMAGES_DIR: &str = "img";

/// The whole intermediate tree, as discovered by [`scan`].
#[derive(Debug, Clone, Serialize)]
pub struct IntermediateTree {
    pub root: PathBuf,
    /// `<root>/index.xml`. May not exist; the index transform reports that.
    pub index_descriptor: PathBuf,
    pub classes: Vec<ClassEntry>,
}

/// One documented class: an immediate subdirectory of the tree root.
#[derive(Debug, Clone, Serialize)]
pub struct ClassEntry {
    /// Directory name for display. Never read from the XML content.
    pub title: String,
    /// Directory name as stored on disk; output paths are built from it.
    #[serde(skip)]
    pub name: OsString,
    pub dir: PathBuf,
    /// `<dir>/<name>.xml`
    pub descriptor_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_dir: Option<PathBuf>,
}

/// One documented node, backed by a single XML file in its class's `nodes/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeEntry {
    /// File name without extension, for display.
    pub title: String,
    /// File stem as stored on disk.
    #[serde(skip)]
    pub name: OsString,
    pub descriptor_path: PathBuf,
}

/// A class together with its resolved node list, for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct ClassInventory {
    #[serde(flatten)]
    pub class: ClassEntry,
    pub nodes: Vec<NodeEntry>,
}

impl IntermediateTree {
    pub fn has_index(&self) -> bool {
        self.index_descriptor.is_file()
    }

    /// Resolve the node list of every class. Reads every `nodes/` directory.
    pub fn inventory(&self) -> Result<Vec<ClassInventory>, ScanError> {
        self.classes
            .iter()
            .map(|class| {
                Ok(ClassInventory {
                    nodes: class.nodes()?,
                    class: class.clone(),
                })
            })
            .collect()
    }
}

impl ClassEntry {
    fn from_dir(dir: PathBuf, name: &OsStr) -> Self {
        let node_dir = Some(dir.join(NODES_DIR)).filter(|p| p.is_dir());
        let image_dir = Some(dir.join(IMAGES_DIR)).filter(|p| p.is_dir());
        Self {
            title: name.to_string_lossy().into_owned(),
            name: name.to_os_string(),
            descriptor_path: dir.join(with_extension(name, "xml")),
            dir,
            node_dir,
            image_dir,
        }
    }

    /// Enumerate the node descriptors of this class.
    ///
    /// Non-recursive; only `*.xml` files (extension compared case-insensitively),
    /// sorted by file name. Returns an empty list when the class has no `nodes/`.
    pub fn nodes(&self) -> Result<Vec<NodeEntry>, ScanError> {
        let Some(node_dir) = &self.node_dir else {
            return Ok(Vec::new());
        };

        let mut nodes: Vec<NodeEntry> = list_dir(node_dir)?
            .into_iter()
            .filter(|p| p.is_file() && is_xml(p))
            .filter_map(|p| {
                let name = p.file_stem()?.to_os_string();
                Some(NodeEntry {
                    title: name.to_string_lossy().into_owned(),
                    name,
                    descriptor_path: p,
                })
            })
            .collect();

        nodes.sort_by(|a, b| a.descriptor_path.cmp(&b.descriptor_path));
        Ok(nodes)
    }
}

/// Discover the classes of the intermediate tree rooted at `root`.
pub fn scan(root: &Path) -> Result<IntermediateTree, ScanError> {
    if !root.exists() {
        return Err(ScanError::NotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }

    let mut dirs: Vec<PathBuf> = list_dir(root)?
        .into_iter()
        .filter(|p| p.is_dir() && !is_hidden(p))
        .collect();
    dirs.sort();

    let classes = dirs
        .into_iter()
        .filter_map(|dir| {
            let name = dir.file_name()?.to_os_string();
            Some(ClassEntry::from_dir(dir, &name))
        })
        .collect();

    Ok(IntermediateTree {
        root: root.to_path_buf(),
        index_descriptor: root.join(INDEX_DESCRIPTOR),
        classes,
    })
}

/// Every entry of `dir`. An unreadable entry fails the whole listing.
fn list_dir(dir: &Path) -> Result<Vec<PathBuf>, ScanError> {
    let read_error = |source| ScanError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };
    fs::read_dir(dir)
        .map_err(read_error)?
        .map(|entry| entry.map(|e| e.path()).map_err(read_error))
        .collect()
}

/// `name.ext`, keeping any dots already in `name`.
pub(crate) fn with_extension(name: &OsStr, ext: &str) -> OsString {
    let mut file = name.to_os_string();
    file.push(".");
    file.push(ext);
    file
}

fn is_xml(path: &Path) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case("xml"))
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}
