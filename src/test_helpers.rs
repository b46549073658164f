//! Shared test utilities for the docweave test suite.
//!
//! Fixture writers build small intermediate trees and base directories in a
//! temp dir; lookup helpers panic with a readable message on a miss.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_index(tmp.path());
//! write_class(tmp.path(), "Actor", &["BeginPlay", "Tick"]);
//! write_images(tmp.path(), "Actor", &["nd_img_Tick.png"]);
//!
//! let tree = scan(tmp.path()).unwrap();
//! assert_eq!(class_titles(&tree), vec!["Actor"]);
//! let actor = find_class(&tree, "Actor");
//! ```

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::assemble::Stylesheets;
use crate::scan::{ClassEntry, IMAGES_DIR, INDEX_DESCRIPTOR, IntermediateTree, NODES_DIR};
use crate::transform::Transformer;
use crate::transform::backend::tests::{MockTransformer, RecordedOp};

// =========================================================================
// Intermediate tree fixtures
// =========================================================================

/// Write `<root>/index.xml`.
pub fn write_index(root: &Path) {
    fs::create_dir_all(root).unwrap();
    fs::write(
        root.join(INDEX_DESCRIPTOR),
        "<root><display_name>Test Docs</display_name></root>",
    )
    .unwrap();
}

/// Write a class directory with its descriptor and one XML file per node.
///
/// `nodes/` is always created, even for an empty list.
pub fn write_class(root: &Path, title: &str, nodes: &[&str]) {
    let dir = root.join(title);
    let nodes_dir = dir.join(NODES_DIR);
    fs::create_dir_all(&nodes_dir).unwrap();
    fs::write(
        dir.join(format!("{title}.xml")),
        format!("<root><display_name>{title}</display_name></root>"),
    )
    .unwrap();
    for node in nodes {
        fs::write(
            nodes_dir.join(format!("{node}.xml")),
            format!("<root><shorttitle>{node}</shorttitle></root>"),
        )
        .unwrap();
    }
}

/// Write a node file that no XML parser will accept.
pub fn write_malformed_node(root: &Path, class: &str, node: &str) {
    let nodes_dir = root.join(class).join(NODES_DIR);
    fs::create_dir_all(&nodes_dir).unwrap();
    fs::write(
        nodes_dir.join(format!("{node}.xml")),
        "<root><shorttitle>unterminated</root>",
    )
    .unwrap();
}

/// Write image files under `<root>/<class>/img`. Entries may contain `/`.
pub fn write_images(root: &Path, class: &str, files: &[&str]) {
    let img = root.join(class).join(IMAGES_DIR);
    for file in files {
        let path = img.join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, format!("PNG:{file}")).unwrap();
    }
}

// =========================================================================
// Base directory fixtures
// =========================================================================

/// Identity-ish stylesheet: copies the input document into an HTML body.
pub const PASSTHROUGH_XSL: &str = r#"<?xml version="1.0"?>
<xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform">
  <xsl:output method="html"/>
  <xsl:template match="/">
    <html><body><xsl:copy-of select="."/></body></html>
  </xsl:template>
</xsl:stylesheet>
"#;

/// Lay out `<base>/xslt/{index,class_docs,node_docs}_xform.xsl` and
/// `<base>/css/style.css`, the default base directory shape.
pub fn write_base_dir(base: &Path) {
    let xslt = base.join("xslt");
    fs::create_dir_all(&xslt).unwrap();
    for name in ["index_xform.xsl", "class_docs_xform.xsl", "node_docs_xform.xsl"] {
        fs::write(xslt.join(name), PASSTHROUGH_XSL).unwrap();
    }
    let css = base.join("css");
    fs::create_dir_all(&css).unwrap();
    fs::write(css.join("style.css"), "body { margin: 0; }").unwrap();
}

/// The stylesheet paths [`write_base_dir`] creates.
pub fn base_stylesheets(base: &Path) -> Stylesheets {
    let xslt = base.join("xslt");
    Stylesheets {
        index: xslt.join("index_xform.xsl"),
        class: xslt.join("class_docs_xform.xsl"),
        node: xslt.join("node_docs_xform.xsl"),
    }
}

// =========================================================================
// Mock engines
// =========================================================================

/// A factory for mock transformers that all record into `log`.
pub fn mock_factory(
    log: &Arc<Mutex<Vec<RecordedOp>>>,
) -> impl Fn() -> Box<dyn Transformer> + use<> {
    let log = log.clone();
    move || Box::new(MockTransformer::with_log(log.clone())) as Box<dyn Transformer>
}

// =========================================================================
// Tree lookups (panic with a clear message on miss)
// =========================================================================

/// Find a class by title. Panics if not found.
pub fn find_class<'a>(tree: &'a IntermediateTree, title: &str) -> &'a ClassEntry {
    tree.classes
        .iter()
        .find(|c| c.title == title)
        .unwrap_or_else(|| {
            let titles = class_titles(tree);
            panic!("class '{title}' not found. Available: {titles:?}")
        })
}

/// All class titles in processing order.
pub fn class_titles(tree: &IntermediateTree) -> Vec<&str> {
    tree.classes.iter().map(|c| c.title.as_str()).collect()
}
