//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Every entity (class, node, page) is shown by its positional index and
//! title first, with filesystem paths as indented context lines. The output
//! reads as a documentation inventory while still letting users trace data
//! back to specific files.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! Index
//!     Source: index.xml
//!
//! Classes
//! 001 Actor (2 nodes)
//!     Source: Actor/
//!     001 BeginPlay
//!     002 Tick
//!     Images: Actor/img/
//! 002 Math (no nodes)
//!     Source: Math/
//! ```
//!
//! ## Build
//!
//! ```text
//! 001 Actor (2 nodes)
//!     002 Tick
//!     001 BeginPlay: FAILED
//!     Class page: Actor/Actor.html
//!     Images: 3 files
//! Index: index.html
//! CSS: 4 files
//!
//! 1 node docs successfully transformed.
//! 1 failed.
//!     Actor/nodes/BeginPlay.xml
//!         engine exited with status 6
//! ```
//!
//! Node lines arrive in completion order, so their indices may interleave.
//!
//! # Architecture
//!
//! Each section has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::assemble::{AssembleEvent, ItemStatus};
use crate::report::{Failure, RunReport};
use crate::scan::ClassInventory;
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

/// Show `path` relative to `root` when possible.
fn display_rel(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

fn class_header(index: usize, title: &str, node_count: Option<usize>) -> String {
    match node_count {
        Some(n) => format!("{} {} ({})", format_index(index), title, plural(n, "node", "nodes")),
        None => format!("{} {} (no nodes)", format_index(index), title),
    }
}

fn failure_lines(failure: &Failure, root: &Path, depth: usize) -> Vec<String> {
    vec![
        format!("{}{}", indent(depth), display_rel(&failure.path, root)),
        format!("{}{}", indent(depth + 1), failure.reason),
    ]
}

// ============================================================================
// Check output
// ============================================================================

/// Format the discovered intermediate tree.
pub fn format_scan_output(root: &Path, has_index: bool, classes: &[ClassInventory]) -> Vec<String> {
    let mut lines = vec!["Index".to_string()];
    if has_index {
        lines.push(format!("{}Source: index.xml", indent(1)));
    } else {
        lines.push(format!("{}Missing: index.xml", indent(1)));
    }

    lines.push(String::new());
    lines.push("Classes".to_string());
    if classes.is_empty() {
        lines.push(format!("{}(none)", indent(1)));
    }

    for (i, inv) in classes.iter().enumerate() {
        let class = &inv.class;
        let count = class.node_dir.as_ref().map(|_| inv.nodes.len());
        lines.push(class_header(i + 1, &class.title, count));
        lines.push(format!("{}Source: {}/", indent(1), display_rel(&class.dir, root)));
        if !class.descriptor_path.is_file() {
            lines.push(format!(
                "{}Missing: {}",
                indent(1),
                display_rel(&class.descriptor_path, root)
            ));
        }
        for (j, node) in inv.nodes.iter().enumerate() {
            lines.push(format!("{}{} {}", indent(1), format_index(j + 1), node.title));
        }
        if let Some(img) = &class.image_dir {
            lines.push(format!("{}Images: {}/", indent(1), display_rel(img, root)));
        }
    }

    lines
}

/// Print the discovered intermediate tree to stdout.
pub fn print_scan_output(root: &Path, has_index: bool, classes: &[ClassInventory]) {
    for line in format_scan_output(root, has_index, classes) {
        println!("{}", line);
    }
}

// ============================================================================
// Build progress
// ============================================================================

fn status_suffix(status: ItemStatus) -> &'static str {
    match status {
        ItemStatus::Written => "",
        ItemStatus::Failed => ": FAILED",
    }
}

/// Format a single assembly progress event as display lines.
pub fn format_assemble_event(event: &AssembleEvent) -> Vec<String> {
    match event {
        AssembleEvent::ClassStarted {
            index,
            title,
            node_count,
        } => vec![class_header(*index, title, *node_count)],
        AssembleEvent::NodeFinished {
            index,
            title,
            status,
        } => vec![format!(
            "{}{} {}{}",
            indent(1),
            format_index(*index),
            title,
            status_suffix(*status)
        )],
        AssembleEvent::ClassPage { title, status } => match status {
            ItemStatus::Written => vec![format!("{}Class page: {title}/{title}.html", indent(1))],
            ItemStatus::Failed => vec![format!("{}Class page: FAILED", indent(1))],
        },
        AssembleEvent::ImagesCopied { files, .. } => {
            vec![format!("{}Images: {}", indent(1), plural(*files, "file", "files"))]
        }
        AssembleEvent::IndexPage { status } => match status {
            ItemStatus::Written => vec!["Index: index.html".to_string()],
            ItemStatus::Failed => vec!["Index: FAILED".to_string()],
        },
        AssembleEvent::CssCopied { files } => {
            vec![format!("CSS: {}", plural(*files, "file", "files"))]
        }
    }
}

/// Print a single assembly progress event to stdout.
pub fn print_assemble_event(event: &AssembleEvent) {
    for line in format_assemble_event(event) {
        println!("{}", line);
    }
}

// ============================================================================
// Final report
// ============================================================================

/// Format the end-of-run summary. Paths are shown relative to `root`.
pub fn format_report(report: &RunReport, root: &Path) -> Vec<String> {
    let mut lines = vec![
        format!("{} node docs successfully transformed.", report.succeeded),
        format!("{} failed.", report.failed),
    ];
    for failure in &report.failures {
        lines.extend(failure_lines(failure, root, 1));
    }

    if !report.page_failures.is_empty() {
        lines.push(format!(
            "{} could not be written:",
            plural(report.page_failures.len(), "page", "pages")
        ));
        for failure in &report.page_failures {
            lines.extend(failure_lines(failure, root, 1));
        }
    }

    lines
}

/// Print the end-of-run summary to stdout.
pub fn print_report(report: &RunReport, root: &Path) {
    println!();
    for line in format_report(report, root) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
