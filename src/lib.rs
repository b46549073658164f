//! # docweave
//!
//! Assembles a browsable HTML documentation site from an intermediate XML
//! tree. An upstream extraction step writes one XML descriptor per class and
//! per node; docweave runs each through an XSLT stylesheet and lays the
//! results out next to the images and shared CSS they reference.
//!
//! # Architecture: One Pass, Three Stylesheets
//!
//! ```text
//! intermediate/                       <output>/<title>/
//! ├── index.xml       ─ index xsl →   ├── index.html
//! ├── Actor/                          ├── Actor/
//! │   ├── Actor.xml   ─ class xsl →   │   ├── Actor.html
//! │   ├── nodes/*.xml ─ node xsl  →   │   ├── nodes/*.html
//! │   └── img/        ─ copy      →   │   └── img/
//! └── ...                             └── css/   ← <base>/css
//! ```
//!
//! Every item is attempted exactly once. Individual pages that fail are
//! logged and counted, never fatal; missing inputs, unloadable stylesheets,
//! an output directory that cannot be cleared, and a failed CSS copy are.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Discovers classes and nodes in the intermediate tree |
//! | [`transform`] | The `Transformer` seam and the external-process XSLT engine |
//! | [`assemble`] | The per-class pipeline: node pages on a worker pool, then class page, images, index, CSS |
//! | [`run`] | Fatal precondition checks and output directory cleaning around one assembly |
//! | [`copy`] | Recursive, overwriting directory copy for images and CSS |
//! | [`report`] | Thread-safe success/failure tally and the final run report |
//! | [`config`] | `config.toml` loading, validation, and merging over stock defaults |
//! | [`output`] | CLI output formatting for inventories, progress, and the report |
//!
//! # Design Decisions
//!
//! ## External XSLT Processors
//!
//! Transformation goes through the [`transform::Transformer`] trait. The
//! shipped implementation drives an external processor (xsltproc, Saxon,
//! msxsl, or any command line with `{stylesheet}`, `{input}` and `{output}`
//! placeholders). Stylesheets are checked for well-formedness up front so a
//! broken stylesheet fails the run once instead of once per file.
//!
//! ## Node-Level Parallelism
//!
//! Classes are processed in order; the nodes of one class fan out over a
//! [rayon](https://docs.rs/rayon) pool sized by `processing.max_processes`.
//! A class page is produced only after all of its nodes are done.
//!
//! ## Page Failures Are Counted Apart
//!
//! The success/failure counters cover node pages only. Class and index page
//! failures are listed separately in the report.

pub mod assemble;
pub mod config;
pub mod copy;
pub mod output;
pub mod report;
pub mod run;
pub mod scan;
pub mod transform;

#[cfg(test)]
pub(crate) mod test_helpers;
