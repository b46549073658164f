//! One complete documentation run.
//!
//! Checks the fatal preconditions in order, each before anything is written:
//!
//! 1. A non-empty title that is usable as a directory name
//! 2. An intermediate directory that exists
//! 3. Three stylesheets that load
//! 4. An output directory that can be cleaned per [`CleanMode`]
//!
//! then hands over to [`assemble`](crate::assemble::assemble).

use crate::assemble::{
    AssembleError, AssembleEvent, AssembleOptions, Stylesheets, Transforms, assemble,
};
use crate::config::CleanMode;
use crate::report::RunReport;
use crate::scan::{ScanError, scan};
use crate::transform::Transformer;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum RunError {
    #[error("A documentation title is required")]
    MissingTitle,
    #[error("Title {0:?} cannot be used as a directory name")]
    InvalidTitle(String),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Assemble(#[from] AssembleError),
    #[error("Could not clear output directory {path}: {source}")]
    OutputNotClean {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Everything a run needs, already resolved from config and flags.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub title: String,
    /// The output tree is written to `<output_root>/<title>`.
    pub output_root: PathBuf,
    pub intermediate_dir: PathBuf,
    pub stylesheets: Stylesheets,
    pub css_dir: PathBuf,
    pub clean: CleanMode,
    pub threads: usize,
}

impl RunRequest {
    pub fn output_dir(&self) -> PathBuf {
        self.output_root.join(self.title.trim())
    }
}

fn check_title(title: &str) -> Result<(), RunError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(RunError::MissingTitle);
    }
    if title == "." || title == ".." || title.contains(['/', '\\']) {
        return Err(RunError::InvalidTitle(title.to_string()));
    }
    Ok(())
}

/// Remove a pre-existing output directory according to `mode`.
pub fn prepare_output_dir(path: &Path, mode: CleanMode) -> Result<(), RunError> {
    if !path.exists() {
        return Ok(());
    }
    let result = match mode {
        CleanMode::Keep => return Ok(()),
        CleanMode::Empty => fs::remove_dir(path),
        CleanMode::Recursive => fs::remove_dir_all(path),
    };
    result.map_err(|source| RunError::OutputNotClean {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), ?mode, "removed previous output");
    Ok(())
}

/// Run the whole pipeline for `request`.
///
/// `make_transformer` is called three times, once per stylesheet role.
pub fn run(
    request: &RunRequest,
    make_transformer: impl Fn() -> Box<dyn Transformer>,
    events: Option<Sender<AssembleEvent>>,
) -> Result<RunReport, RunError> {
    check_title(&request.title)?;
    let tree = scan(&request.intermediate_dir)?;
    debug!(
        root = %tree.root.display(),
        classes = tree.classes.len(),
        "scanned intermediate tree"
    );

    let transforms = Transforms::load(&request.stylesheets, make_transformer)?;

    let output_dir = request.output_dir();
    prepare_output_dir(&output_dir, request.clean)?;

    let options = AssembleOptions {
        css_dir: request.css_dir.clone(),
        threads: request.threads,
    };
    Ok(assemble(&tree, &transforms, &output_dir, &options, events)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::StylesheetKind;
    use crate::test_helpers::*;
    use crate::transform::backend::tests::RecordedOp;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    fn setup() -> (TempDir, RunRequest) {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join("base");
        write_base_dir(&base);
        let intermediate = tmp.path().join("intermediate");
        write_index(&intermediate);
        write_class(&intermediate, "Actor", &["BeginPlay", "Tick"]);

        let request = RunRequest {
            title: "Blueprints".into(),
            output_root: tmp.path().join("out"),
            intermediate_dir: intermediate,
            stylesheets: base_stylesheets(&base),
            css_dir: base.join("css"),
            clean: CleanMode::Empty,
            threads: 2,
        };
        (tmp, request)
    }

    fn run_mock(request: &RunRequest) -> Result<RunReport, RunError> {
        let log: Arc<Mutex<Vec<RecordedOp>>> = Arc::default();
        run(request, mock_factory(&log), None)
    }

    #[test]
    fn writes_under_output_root_and_title() {
        let (_tmp, request) = setup();
        let report = run_mock(&request).unwrap();

        assert_eq!(report.succeeded, 2);
        let out = request.output_dir();
        assert!(out.ends_with("out/Blueprints"));
        assert!(out.join("index.html").is_file());
        assert!(out.join("Actor/nodes/Tick.html").is_file());
    }

    #[test]
    fn blank_title_rejected() {
        let (_tmp, mut request) = setup();
        request.title = "   ".into();
        assert!(matches!(run_mock(&request), Err(RunError::MissingTitle)));
        assert!(!request.output_root.exists());
    }

    #[test]
    fn path_like_title_rejected() {
        let (_tmp, mut request) = setup();
        request.title = "../escape".into();
        assert!(matches!(run_mock(&request), Err(RunError::InvalidTitle(_))));
    }

    #[test]
    fn missing_intermediate_is_fatal() {
        let (tmp, mut request) = setup();
        request.intermediate_dir = tmp.path().join("nowhere");
        assert!(matches!(
            run_mock(&request),
            Err(RunError::Scan(ScanError::NotFound(_)))
        ));
    }

    #[test]
    fn stylesheet_failure_leaves_output_absent() {
        for kind in [StylesheetKind::Index, StylesheetKind::Class, StylesheetKind::Node] {
            let (tmp, mut request) = setup();
            let missing = tmp.path().join("missing.xsl");
            match kind {
                StylesheetKind::Index => request.stylesheets.index = missing,
                StylesheetKind::Class => request.stylesheets.class = missing,
                StylesheetKind::Node => request.stylesheets.node = missing,
            }

            match run_mock(&request) {
                Err(RunError::Assemble(AssembleError::StylesheetLoad { kind: k, .. })) => {
                    assert_eq!(k, kind)
                }
                other => panic!("expected StylesheetLoad for {kind}, got {other:?}"),
            }
            assert!(!request.output_dir().exists());
        }
    }

    #[test]
    fn stylesheet_failure_keeps_previous_output() {
        let (tmp, mut request) = setup();
        run_mock(&request).unwrap();
        request.clean = CleanMode::Recursive;
        request.stylesheets.node = tmp.path().join("missing.xsl");

        assert!(run_mock(&request).is_err());
        assert!(request.output_dir().join("index.html").is_file());
    }

    #[test]
    fn non_empty_output_aborts_by_default() {
        let (_tmp, request) = setup();
        run_mock(&request).unwrap();

        let result = run_mock(&request);
        assert!(matches!(result, Err(RunError::OutputNotClean { .. })));
        // Previous output untouched
        assert!(request.output_dir().join("Actor/Actor.html").is_file());
    }

    #[test]
    fn empty_output_dir_is_replaced() {
        let (_tmp, request) = setup();
        fs::create_dir_all(request.output_dir()).unwrap();

        let report = run_mock(&request).unwrap();
        assert_eq!(report.succeeded, 2);
    }

    #[test]
    fn recursive_clean_removes_prior_content() {
        let (_tmp, mut request) = setup();
        run_mock(&request).unwrap();
        let stale = request.output_dir().join("Gone/Gone.html");
        fs::create_dir_all(stale.parent().unwrap()).unwrap();
        fs::write(&stale, "old").unwrap();

        request.clean = CleanMode::Recursive;
        let report = run_mock(&request).unwrap();

        assert_eq!(report.succeeded, 2);
        assert!(!stale.exists());
        assert!(request.output_dir().join("Actor/nodes/BeginPlay.html").is_file());
    }

    #[test]
    fn keep_overwrites_in_place() {
        let (_tmp, mut request) = setup();
        run_mock(&request).unwrap();
        let extra = request.output_dir().join("notes.txt");
        fs::write(&extra, "keep me").unwrap();

        request.clean = CleanMode::Keep;
        run_mock(&request).unwrap();

        assert_eq!(fs::read_to_string(&extra).unwrap(), "keep me");
    }

    #[test]
    fn prepare_missing_dir_is_noop() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("absent");
        for mode in [CleanMode::Keep, CleanMode::Empty, CleanMode::Recursive] {
            prepare_output_dir(&path, mode).unwrap();
        }
    }
}
