//! XSLT transformation: the engine seam of the pipeline.
//!
//! | Piece | Role |
//! |---|---|
//! | [`Transformer`] | `initialize(stylesheet)` once, `transform(input, output)` many times |
//! | [`ProcessTransformer`] | Runs xsltproc / Saxon / msxsl / a custom command per file |
//! | [`check_stylesheet`] | Well-formedness + XSLT root check done at load time |
//! | [`LineSink`] | Receives engine stdout/stderr, one line per call |
//!
//! The concrete engine is picked once at startup from configuration via
//! [`build_transformer`].

pub mod backend;
pub mod process_engine;
mod stylesheet;

pub use backend::{LineSink, TransformError, Transformer, discard_lines};
pub use process_engine::{EngineCommand, EngineKind, ProcessTransformer};
pub use stylesheet::check_stylesheet;

/// Build an unloaded transformer for `command`, streaming diagnostics to `sink`.
pub fn build_transformer(command: &EngineCommand, sink: LineSink) -> Box<dyn Transformer> {
    Box::new(ProcessTransformer::new(command.clone(), sink))
}
