//! Run configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! overridden by a sparse user file in the base directory, which in turn is
//! overridden by command-line flags.
//!
//! ## Config File Location
//!
//! ```text
//! <base>/
//! ├── config.toml              # Overrides stock defaults
//! ├── css/                     # Shared stylesheet bundle
//! └── xslt/
//!     ├── index_xform.xsl
//!     ├── class_docs_xform.xsl
//!     └── node_docs_xform.xsl
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [stylesheets]             # Relative paths resolve against the base dir
//! index = "xslt/index_xform.xsl"
//! class = "xslt/class_docs_xform.xsl"
//! node = "xslt/node_docs_xform.xsl"
//!
//! [engine]
//! kind = "xsltproc"         # xsltproc | saxon | msxsl | custom
//! # program = "xsltproc"    # Override the executable
//! # args = ["{input}", "{stylesheet}", "{output}"]  # Required for custom
//!
//! [assets]
//! css_dir = "css"
//!
//! [output]
//! clean = "empty"           # keep | empty | recursive
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::assemble::Stylesheets;
use crate::transform::process_engine::{INPUT_TOKEN, OUTPUT_TOKEN};
use crate::transform::{EngineCommand, EngineKind};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Run configuration loaded from `config.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DocConfig {
    /// The three XSLT stylesheets.
    pub stylesheets: StylesheetsConfig,
    /// Which XSLT processor to run.
    pub engine: EngineConfig,
    /// Shared assets copied into every output tree.
    pub assets: AssetsConfig,
    /// What to do with a pre-existing output directory.
    pub output: OutputConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl DocConfig {
    /// Validate config values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("stylesheets.index", &self.stylesheets.index),
            ("stylesheets.class", &self.stylesheets.class),
            ("stylesheets.node", &self.stylesheets.node),
            ("assets.css_dir", &self.assets.css_dir),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        self.engine.command()?;
        Ok(())
    }

    /// Stylesheet paths, resolved against `base_dir`.
    pub fn stylesheet_paths(&self, base_dir: &Path) -> Stylesheets {
        Stylesheets {
            index: base_dir.join(&self.stylesheets.index),
            class: base_dir.join(&self.stylesheets.class),
            node: base_dir.join(&self.stylesheets.node),
        }
    }

    /// CSS bundle directory, resolved against `base_dir`.
    pub fn css_dir(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(&self.assets.css_dir)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StylesheetsConfig {
    pub index: String,
    pub class: String,
    pub node: String,
}

impl Default for StylesheetsConfig {
    fn default() -> Self {
        Self {
            index: "xslt/index_xform.xsl".to_string(),
            class: "xslt/class_docs_xform.xsl".to_string(),
            node: "xslt/node_docs_xform.xsl".to_string(),
        }
    }
}

/// Engine selection. `program` and `args` override the preset for `kind`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub kind: EngineKind,
    pub program: Option<String>,
    pub args: Option<Vec<String>>,
}

impl EngineConfig {
    /// Resolve the command line to run.
    ///
    /// Presets may have their program or arguments replaced. `custom` needs
    /// both, and the arguments must mention `{input}` and `{output}`.
    pub fn command(&self) -> Result<EngineCommand, ConfigError> {
        let mut command = match EngineCommand::preset(self.kind) {
            Some(preset) => preset,
            None => {
                let program = self.program.clone().ok_or_else(|| {
                    ConfigError::Validation("engine.program is required for custom".into())
                })?;
                let args = self.args.clone().ok_or_else(|| {
                    ConfigError::Validation("engine.args is required for custom".into())
                })?;
                EngineCommand::new(program, args)
            }
        };
        if let Some(program) = &self.program {
            command.program = program.clone();
        }
        if let Some(args) = &self.args {
            command.args = args.clone();
        }

        if command.program.trim().is_empty() {
            return Err(ConfigError::Validation(
                "engine.program must not be empty".into(),
            ));
        }
        for token in [INPUT_TOKEN, OUTPUT_TOKEN] {
            if !command.args.iter().any(|a| a.contains(token)) {
                return Err(ConfigError::Validation(format!(
                    "engine.args must contain {token}"
                )));
            }
        }
        Ok(command)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssetsConfig {
    pub css_dir: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            css_dir: "css".to_string(),
        }
    }
}

/// Handling of an output directory left by an earlier run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CleanMode {
    /// Leave it; pages are overwritten in place.
    Keep,
    /// Remove it only when empty, otherwise abort.
    #[default]
    Empty,
    /// Remove it and everything in it.
    Recursive,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub clean: CleanMode,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel node transforms. `None` means auto-detect
    /// (= number of CPU cores). Each transform is an external process, so
    /// values above the core count are honored.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `n`, even above the core count
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    config.max_processes.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    })
}

/// Default base directory: the parent of the directory holding the executable.
///
/// An installed `bin/docweave` therefore finds `xslt/`, `css/` and
/// `config.toml` one level up. Falls back to the current directory.
pub fn default_base_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent()?.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Serialize stock defaults as a TOML value for merging.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(DocConfig::default()).expect("default config must serialize")
}

/// Deep-merge two TOML values. Tables merge recursively; everything else
/// in `overlay` replaces the value in `base`.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read `config.toml` from `dir` as a raw TOML value, if present.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay over `base`, deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<DocConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: DocConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the configuration for `base_dir`: stock defaults plus its `config.toml`.
pub fn load_config(base_dir: &Path) -> Result<DocConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(base_dir)?;
    resolve_config(base, overlay)
}

/// The documented stock `config.toml`, printed by `gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# docweave Configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# This file lives in the base directory (see --base-dir). Relative paths
# below are resolved against that directory. Command-line flags override
# anything set here. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Stylesheets
# ---------------------------------------------------------------------------
[stylesheets]
# Renders <intermediate>/index.xml into index.html.
index = "xslt/index_xform.xsl"

# Renders <Class>/<Class>.xml into <Class>/<Class>.html.
class = "xslt/class_docs_xform.xsl"

# Renders <Class>/nodes/<Node>.xml into <Class>/nodes/<Node>.html.
node = "xslt/node_docs_xform.xsl"

# ---------------------------------------------------------------------------
# XSLT engine
# ---------------------------------------------------------------------------
[engine]
# One of: xsltproc, saxon, msxsl, custom.
kind = "xsltproc"

# Executable to run instead of the preset's.
# program = "xsltproc"

# Argument template. Required for "custom"; replaces the preset otherwise.
# {stylesheet}, {input} and {output} are substituted per file, also inside
# a larger argument such as "-s:{input}".
# args = ["--output", "{output}", "{stylesheet}", "{input}"]

# ---------------------------------------------------------------------------
# Shared assets
# ---------------------------------------------------------------------------
[assets]
# Copied to <output>/css after all pages are written.
css_dir = "css"

# ---------------------------------------------------------------------------
# Output directory
# ---------------------------------------------------------------------------
[output]
# What to do when <output>/<title> already exists:
#   keep      - leave it, overwrite pages in place
#   empty     - remove it if empty, otherwise abort
#   recursive - remove it and everything in it
clean = "empty"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel node transforms. Each one runs the XSLT processor as a
# separate process, so values above the core count are allowed.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
