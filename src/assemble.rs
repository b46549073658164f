//! Documentation assembly.
//!
//! Walks an [`IntermediateTree`] and writes the HTML tree:
//!
//! ```text
//! <out>/
//! ├── index.html                   # index.xml     → index transform
//! ├── css/                         # <base>/css    → copied once, at the end
//! └── Actor/
//!     ├── Actor.html               # Actor.xml     → class transform
//!     ├── img/                     # Actor/img     → copied if present
//!     └── nodes/
//!         ├── BeginPlay.html       # nodes/*.xml   → node transform
//!         └── Tick.html
//! ```
//!
//! ## Failure isolation
//!
//! Every item is attempted exactly once. A failing node is logged, counted,
//! and skipped; the rest of the class and every later class still run. Class
//! and index pages are logged and listed separately, never counted with
//! nodes. Only a failure to create output directories, to build the worker
//! pool, or to copy the shared CSS stops the run.
//!
//! ## Parallel Processing
//!
//! Classes are handled one after another. Within a class, node transforms are
//! spread over a dedicated [rayon](https://docs.rs/rayon) pool; the class page
//! and image copy follow once every node of that class has finished.

use crate::copy::{CopyError, copy_dir};
use crate::report::{Failure, RunReport, Tally};
use crate::scan::{ClassEntry, IMAGES_DIR, IntermediateTree, NODES_DIR, NodeEntry, with_extension};
use crate::transform::{TransformError, Transformer};
use rayon::prelude::*;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum AssembleError {
    #[error("Failed to load {kind} stylesheet: {source}")]
    StylesheetLoad {
        kind: StylesheetKind,
        #[source]
        source: TransformError,
    },
    #[error("Failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("Failed to copy shared CSS: {source}")]
    CssCopy {
        #[source]
        source: CopyError,
        /// Everything else already ran; the report is still worth printing.
        report: Box<RunReport>,
    },
}

/// The three stylesheet roles of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StylesheetKind {
    Index,
    Class,
    Node,
}

impl fmt::Display for StylesheetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StylesheetKind::Index => "index",
            StylesheetKind::Class => "class",
            StylesheetKind::Node => "node",
        })
    }
}

/// Stylesheet paths for the three transforms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stylesheets {
    pub index: PathBuf,
    pub class: PathBuf,
    pub node: PathBuf,
}

/// One loaded transformer per stylesheet role.
pub struct Transforms {
    pub index: Box<dyn Transformer>,
    pub class: Box<dyn Transformer>,
    pub node: Box<dyn Transformer>,
}

impl Transforms {
    /// Create and load all three transformers, index first.
    ///
    /// Any failure is fatal: nothing has been written when this returns `Err`.
    pub fn load(
        stylesheets: &Stylesheets,
        make: impl Fn() -> Box<dyn Transformer>,
    ) -> Result<Self, AssembleError> {
        let load = |kind: StylesheetKind,
                    path: &Path|
         -> Result<Box<dyn Transformer>, AssembleError> {
            let mut xform = make();
            xform
                .initialize(path)
                .map_err(|source| AssembleError::StylesheetLoad { kind, source })?;
            debug!(%kind, stylesheet = %path.display(), "loaded stylesheet");
            Ok(xform)
        };

        Ok(Self {
            index: load(StylesheetKind::Index, &stylesheets.index)?,
            class: load(StylesheetKind::Class, &stylesheets.class)?,
            node: load(StylesheetKind::Node, &stylesheets.node)?,
        })
    }
}

/// Knobs for one assembly pass.
#[derive(Debug, Clone)]
pub struct AssembleOptions {
    /// Shared stylesheet bundle copied to `<out>/css`.
    pub css_dir: PathBuf,
    /// Worker threads for node transforms.
    pub threads: usize,
}

/// Progress events, in the order a class is processed.
#[derive(Debug, Clone, PartialEq)]
pub enum AssembleEvent {
    /// Sent for every class. `node_count` is `None` without a `nodes/` dir.
    ClassStarted {
        index: usize,
        title: String,
        node_count: Option<usize>,
    },
    /// Sent from worker threads; arrives in completion order.
    NodeFinished {
        index: usize,
        title: String,
        status: ItemStatus,
    },
    ClassPage {
        title: String,
        status: ItemStatus,
    },
    ImagesCopied {
        class: String,
        files: usize,
    },
    IndexPage {
        status: ItemStatus,
    },
    CssCopied {
        files: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Written,
    Failed,
}

impl ItemStatus {
    fn of<T, E>(result: &Result<T, E>) -> Self {
        match result {
            Ok(_) => ItemStatus::Written,
            Err(_) => ItemStatus::Failed,
        }
    }
}

fn send(events: Option<&Sender<AssembleEvent>>, event: AssembleEvent) {
    if let Some(tx) = events {
        // A dropped receiver only means nobody is listening
        let _ = tx.send(event);
    }
}

fn create_dir(path: &Path) -> Result<(), AssembleError> {
    std::fs::create_dir_all(path).map_err(|source| AssembleError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

/// Assemble the HTML tree for `tree` into `output_dir`.
pub fn assemble(
    tree: &IntermediateTree,
    transforms: &Transforms,
    output_dir: &Path,
    options: &AssembleOptions,
    events: Option<Sender<AssembleEvent>>,
) -> Result<RunReport, AssembleError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.threads.max(1))
        .build()?;
    create_dir(output_dir)?;

    let tally = Tally::new();
    let mut page_failures = Vec::new();
    let mut class_pages = 0;
    let mut images_copied = 0;

    for (idx, class) in tree.classes.iter().enumerate() {
        let out_class_dir = output_dir.join(&class.name);
        create_dir(&out_class_dir)?;

        let nodes = class.node_dir.as_ref().map(|_| list_nodes(class));
        let node_count = nodes.as_ref().map(Vec::len);
        debug!(class = %class.title, nodes = ?node_count, "assembling class");
        send(
            events.as_ref(),
            AssembleEvent::ClassStarted {
                index: idx + 1,
                title: class.title.clone(),
                node_count,
            },
        );

        if let Some(nodes) = nodes {
            assemble_nodes(
                &pool,
                &nodes,
                transforms.node.as_ref(),
                &out_class_dir,
                &tally,
                events.as_ref(),
            )?;

            let out_page = out_class_dir.join(with_extension(&class.name, "html"));
            let result = transforms
                .class
                .transform(&class.descriptor_path, &out_page);
            send(
                events.as_ref(),
                AssembleEvent::ClassPage {
                    title: class.title.clone(),
                    status: ItemStatus::of(&result),
                },
            );
            match result {
                Ok(()) => class_pages += 1,
                Err(e) => {
                    warn!(
                        file = %class.descriptor_path.display(),
                        "class transform failed: {e}"
                    );
                    page_failures.push(Failure::new(&class.descriptor_path, e));
                }
            }
        } else {
            debug!(class = %class.title, "no nodes directory, skipping pages");
        }

        images_copied += copy_class_images(class, &out_class_dir, events.as_ref());
    }

    let out_index = output_dir.join("index.html");
    let result = transforms.index.transform(&tree.index_descriptor, &out_index);
    send(
        events.as_ref(),
        AssembleEvent::IndexPage {
            status: ItemStatus::of(&result),
        },
    );
    let index_written = match result {
        Ok(()) => true,
        Err(e) => {
            warn!(file = %tree.index_descriptor.display(), "index transform failed: {e}");
            page_failures.push(Failure::new(&tree.index_descriptor, e));
            false
        }
    };

    let mut report = tally.into_report();
    report.page_failures = page_failures;
    report.class_pages = class_pages;
    report.index_written = index_written;
    report.images_copied = images_copied;

    match copy_dir(&options.css_dir, &output_dir.join("css")) {
        Ok(stats) => {
            send(events.as_ref(), AssembleEvent::CssCopied { files: stats.files });
            Ok(report)
        }
        Err(source) => Err(AssembleError::CssCopy {
            source,
            report: Box::new(report),
        }),
    }
}

/// The node files of `class`. An unreadable `nodes/` yields none.
fn list_nodes(class: &ClassEntry) -> Vec<NodeEntry> {
    class.nodes().unwrap_or_else(|e| {
        warn!(class = %class.title, "could not list node files: {e}");
        Vec::new()
    })
}

/// Transform `nodes` on the pool. Returns once all are done.
fn assemble_nodes(
    pool: &rayon::ThreadPool,
    nodes: &[NodeEntry],
    node_xform: &dyn Transformer,
    out_class_dir: &Path,
    tally: &Tally,
    events: Option<&Sender<AssembleEvent>>,
) -> Result<(), AssembleError> {
    let out_nodes_dir = out_class_dir.join(NODES_DIR);
    create_dir(&out_nodes_dir)?;

    pool.install(|| {
        nodes.par_iter().enumerate().for_each_with(
            events.cloned(),
            |tx, (i, node)| {
                let out_page = out_nodes_dir.join(with_extension(&node.name, "html"));
                let result = node_xform.transform(&node.descriptor_path, &out_page);
                send(
                    tx.as_ref(),
                    AssembleEvent::NodeFinished {
                        index: i + 1,
                        title: node.title.clone(),
                        status: ItemStatus::of(&result),
                    },
                );
                match result {
                    Ok(()) => tally.success(),
                    Err(e) => {
                        warn!(
                            file = %node.descriptor_path.display(),
                            "xsl transform failed, skipping: {e}"
                        );
                        tally.failure(Failure::new(&node.descriptor_path, e));
                    }
                }
            },
        );
    });

    Ok(())
}

/// Copy `<class>/img` next to the class's pages. Returns the number of files.
fn copy_class_images(
    class: &ClassEntry,
    out_class_dir: &Path,
    events: Option<&Sender<AssembleEvent>>,
) -> usize {
    let src = class.dir.join(IMAGES_DIR);
    match copy_dir(&src, &out_class_dir.join(IMAGES_DIR)) {
        Ok(stats) => {
            send(
                events,
                AssembleEvent::ImagesCopied {
                    class: class.title.clone(),
                    files: stats.files,
                },
            );
            stats.files
        }
        Err(CopyError::SourceMissing(_)) => {
            debug!(class = %class.title, "no images");
            0
        }
        Err(e) => {
            warn!(class = %class.title, "image copy failed: {e}");
            0
        }
    }
}
