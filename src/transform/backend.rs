//! Transformer trait and shared types.
//!
//! The [`Transformer`] trait is the only thing the assembly pipeline knows
//! about the XSLT engine: load a stylesheet once, then apply it to many input
//! files. The production implementation is
//! [`ProcessTransformer`](super::process_engine::ProcessTransformer), which
//! drives an external executable. An in-process engine plugs in the same way.

use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Stylesheet not found: {0}")]
    StylesheetNotFound(PathBuf),
    #[error("Invalid stylesheet {path}: {reason}")]
    InvalidStylesheet { path: PathBuf, reason: String },
    #[error("Transform called before a stylesheet was loaded")]
    NotInitialized,
    #[error("Input not found: {0}")]
    InputNotFound(PathBuf),
    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} failed ({status}) on {input}")]
    EngineFailed {
        program: String,
        status: ExitStatus,
        input: PathBuf,
    },
    #[error("Transform failed: {0}")]
    Failed(String),
}

/// Receives engine diagnostics one line at a time.
///
/// The pipeline forwards these and never inspects them.
pub type LineSink = Arc<dyn Fn(&str) + Send + Sync>;

/// A sink that drops every line.
pub fn discard_lines() -> LineSink {
    Arc::new(|_| {})
}

/// An XSLT engine bound to one stylesheet.
///
/// `transform` takes `&self` and implementations must be `Sync`: the node
/// transformer is shared by every worker of the pipeline's thread pool.
/// Engines that cannot run concurrently from one loaded instance must
/// serialize or pool internally.
pub trait Transformer: Send + Sync {
    /// Load (or compile) the stylesheet used by every later `transform` call.
    fn initialize(&mut self, stylesheet: &Path) -> Result<(), TransformError>;

    /// Apply the loaded stylesheet to `input`, writing (or overwriting) `output`.
    ///
    /// Must not modify `input`.
    fn transform(&self, input: &Path, output: &Path) -> Result<(), TransformError>;
}
