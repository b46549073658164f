//! External-process XSLT engine.
//!
//! Each `transform` call spawns the configured executable with an argument
//! template expanded for that file. Both of the child's output streams are
//! forwarded line by line to the [`LineSink`].
//!
//! ## Presets
//!
//! | Kind | Program | Arguments |
//! |---|---|---|
//! | `xsltproc` | `xsltproc` | `--output {output} {stylesheet} {input}` |
//! | `saxon` | `saxon` | `-s:{input} -xsl:{stylesheet} -o:{output}` |
//! | `msxsl` | `msxsl` | `{input} {stylesheet} -o {output}` |
//! | `custom` | configured | configured |

use super::backend::{LineSink, TransformError, Transformer};
use super::stylesheet::check_stylesheet;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

pub const STYLESHEET_TOKEN: &str = "{stylesheet}";
pub const INPUT_TOKEN: &str = "{input}";
pub const OUTPUT_TOKEN: &str = "{output}";

/// Which engine command line to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    #[default]
    Xsltproc,
    Saxon,
    Msxsl,
    Custom,
}

/// Program plus argument template for one engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl EngineCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// The stock command line for `kind`. `None` for [`EngineKind::Custom`].
    pub fn preset(kind: EngineKind) -> Option<Self> {
        let (program, args) = match kind {
            EngineKind::Xsltproc => (
                "xsltproc",
                vec!["--output", OUTPUT_TOKEN, STYLESHEET_TOKEN, INPUT_TOKEN],
            ),
            EngineKind::Saxon => ("saxon", vec!["-s:{input}", "-xsl:{stylesheet}", "-o:{output}"]),
            EngineKind::Msxsl => ("msxsl", vec![INPUT_TOKEN, STYLESHEET_TOKEN, "-o", OUTPUT_TOKEN]),
            EngineKind::Custom => return None,
        };
        Some(Self::new(program, args.into_iter().map(String::from).collect()))
    }

    /// Substitute the three path tokens into the argument template.
    ///
    /// An argument that is exactly one token is passed through as the raw
    /// path, so non-UTF-8 paths survive. Tokens embedded in a larger argument
    /// are replaced textually.
    pub fn expand(&self, stylesheet: &Path, input: &Path, output: &Path) -> Vec<OsString> {
        let tokens = [
            (STYLESHEET_TOKEN, stylesheet),
            (INPUT_TOKEN, input),
            (OUTPUT_TOKEN, output),
        ];

        self.args
            .iter()
            .map(|template| {
                if let Some((_, path)) = tokens.iter().find(|(t, _)| *t == template.as_str()) {
                    return path.as_os_str().to_owned();
                }
                let mut arg = template.clone();
                for (token, path) in &tokens {
                    arg = arg.replace(token, &path.to_string_lossy());
                }
                OsString::from(arg)
            })
            .collect()
    }
}

/// Runs an external XSLT processor once per input file.
pub struct ProcessTransformer {
    command: EngineCommand,
    stylesheet: Option<PathBuf>,
    sink: LineSink,
}

impl ProcessTransformer {
    pub fn new(command: EngineCommand, sink: LineSink) -> Self {
        Self {
            command,
            stylesheet: None,
            sink,
        }
    }
}

/// Forward every line of `stream` to `sink` until EOF. Lines that are not
/// UTF-8 are decoded lossily.
fn forward_lines(stream: impl Read, sink: &(dyn Fn(&str) + Send + Sync)) {
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                sink(line.trim_end_matches(['\n', '\r']));
            }
        }
    }
}

impl Transformer for ProcessTransformer {
    fn initialize(&mut self, stylesheet: &Path) -> Result<(), TransformError> {
        check_stylesheet(stylesheet)?;
        self.stylesheet = Some(std::path::absolute(stylesheet)?);
        Ok(())
    }

    fn transform(&self, input: &Path, output: &Path) -> Result<(), TransformError> {
        let stylesheet = self
            .stylesheet
            .as_deref()
            .ok_or(TransformError::NotInitialized)?;
        if !input.is_file() {
            return Err(TransformError::InputNotFound(input.to_path_buf()));
        }

        let args = self.command.expand(stylesheet, input, output);
        debug!(
            program = %self.command.program,
            args = ?args,
            "running xslt engine"
        );

        let mut child = Command::new(&self.command.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| TransformError::Spawn {
                program: self.command.program.clone(),
                source,
            })?;

        // Drain both pipes concurrently so neither can fill up and stall the child
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let sink = self.sink.as_ref();
        std::thread::scope(|s| {
            if let Some(stderr) = stderr {
                s.spawn(move || forward_lines(stderr, sink));
            }
            if let Some(stdout) = stdout {
                forward_lines(stdout, sink);
            }
        });

        let status = child.wait()?;
        if !status.success() {
            return Err(TransformError::EngineFailed {
                program: self.command.program.clone(),
                status,
                input: input.to_path_buf(),
            });
        }
        Ok(())
    }
}
