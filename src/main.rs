use clap::{Parser, Subcommand};
use docweave::assemble::AssembleError;
use docweave::config::{self, CleanMode, DocConfig};
use docweave::run::{RunError, RunRequest};
use docweave::transform::{EngineKind, LineSink, build_transformer};
use docweave::{output, run, scan};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn version_string() -> &'static str {
    let on_tag = env!("DOCWEAVE_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("DOCWEAVE_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Called once per process
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "docweave")]
#[command(about = "Assemble HTML documentation from an intermediate XML tree")]
#[command(long_about = "\
Assemble HTML documentation from an intermediate XML tree

Every XML descriptor is run through one of three XSLT stylesheets; images
and the shared CSS bundle are copied alongside.

Intermediate structure:

  intermediate/
  ├── index.xml                    # → index.html
  ├── Actor/                       # Class (title = directory name)
  │   ├── Actor.xml                # → Actor/Actor.html
  │   ├── nodes/                   # Optional
  │   │   ├── BeginPlay.xml        # → Actor/nodes/BeginPlay.html
  │   │   └── Tick.xml
  │   └── img/                     # Optional, copied verbatim
  └── Math/
      └── Math.xml                 # No nodes/ → no pages, images still copied

Base directory (--base-dir, default: one level above the executable):

  <base>/
  ├── config.toml                  # Optional, see 'docweave gen-config'
  ├── css/                         # → <output>/<title>/css
  └── xslt/
      ├── index_xform.xsl
      ├── class_docs_xform.xsl
      └── node_docs_xform.xsl

Set RUST_LOG to override the -v log filter.")]
#[command(version = version_string())]
struct Cli {
    /// Directory holding config.toml, xslt/ and css/
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

/// Flags for a full documentation run.
#[derive(clap::Args)]
struct BuildArgs {
    /// Documentation title; also the name of the output subdirectory
    #[arg(long)]
    title: String,

    /// Root of the intermediate XML tree
    #[arg(long)]
    intermediate: PathBuf,

    /// Output root; docs are written to <OUTPUT>/<TITLE>
    #[arg(long, default_value = ".")]
    output: PathBuf,

    /// Stylesheet for index.xml (overrides config)
    #[arg(long)]
    index_xsl: Option<PathBuf>,

    /// Stylesheet for class descriptors (overrides config)
    #[arg(long)]
    class_xsl: Option<PathBuf>,

    /// Stylesheet for node descriptors (overrides config)
    #[arg(long)]
    node_xsl: Option<PathBuf>,

    /// XSLT processor preset (overrides config)
    #[arg(long, value_enum)]
    engine: Option<EngineKind>,

    /// Executable to run for the chosen engine (overrides config)
    #[arg(long)]
    engine_program: Option<String>,

    /// Remove an existing output directory with all its contents
    #[arg(long, conflicts_with = "keep_output")]
    clean_output: bool,

    /// Leave an existing output directory in place and overwrite pages
    #[arg(long)]
    keep_output: bool,

    /// Maximum parallel node transforms, may exceed the CPU count (overrides config)
    #[arg(long)]
    jobs: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Transform the intermediate tree into an HTML documentation tree
    Build(BuildArgs),
    /// Scan the intermediate tree and list what would be built
    Check {
        /// Root of the intermediate XML tree
        #[arg(long)]
        intermediate: PathBuf,

        /// Print the inventory as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Build(args) => {
            let base_dir = cli.base_dir.unwrap_or_else(config::default_base_dir);
            let mut doc_config = config::load_config(&base_dir)?;
            apply_overrides(&mut doc_config, &args);
            doc_config.validate()?;

            let request = build_request(&doc_config, &base_dir, &args);
            let command = doc_config.engine.command()?;
            tracing::debug!(
                program = %command.program,
                args = ?command.args,
                "using xslt engine"
            );

            println!(
                "==> Building {} → {}",
                request.title.trim(),
                request.output_dir().display()
            );
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    output::print_assemble_event(&event);
                }
            });
            let sink = engine_sink();
            let result = run::run(
                &request,
                || build_transformer(&command, sink.clone()),
                Some(tx),
            );
            printer.join().map_err(|_| "progress printer panicked")?;

            match result {
                Ok(report) => {
                    output::print_report(&report, &request.intermediate_dir);
                    println!("==> Build complete: {}", request.output_dir().display());
                }
                Err(RunError::Assemble(AssembleError::CssCopy { source, report })) => {
                    output::print_report(&report, &request.intermediate_dir);
                    tracing::error!("shared CSS was not copied: {source}");
                    return Err(RunError::Assemble(AssembleError::CssCopy { source, report }).into());
                }
                Err(e) => return Err(e.into()),
            }
        }
        Command::Check { intermediate, json } => {
            let tree = scan::scan(&intermediate)?;
            let inventory = tree.inventory()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&inventory)?);
            } else {
                println!("==> Checking {}", intermediate.display());
                output::print_scan_output(&tree.root, tree.has_index(), &inventory);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Initialize tracing from `RUST_LOG`, falling back to the `-v` count.
fn init_tracing(verbose: u8) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match verbose {
        0 => "docweave=info",
        1 => "docweave=debug",
        _ => "docweave=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Log each non-blank engine output line.
fn engine_sink() -> LineSink {
    Arc::new(|line: &str| {
        let line = line.trim_end();
        if !line.trim().is_empty() {
            tracing::info!(target: "docweave::engine", "{line}");
        }
    })
}

/// Fold command-line flags over the loaded configuration.
fn apply_overrides(doc_config: &mut DocConfig, args: &BuildArgs) {
    if let Some(kind) = args.engine {
        doc_config.engine.kind = kind;
    }
    if let Some(program) = &args.engine_program {
        doc_config.engine.program = Some(program.clone());
    }
    if let Some(jobs) = args.jobs {
        doc_config.processing.max_processes = Some(jobs);
    }
    if args.clean_output {
        doc_config.output.clean = CleanMode::Recursive;
    } else if args.keep_output {
        doc_config.output.clean = CleanMode::Keep;
    }
}

fn build_request(doc_config: &DocConfig, base_dir: &Path, args: &BuildArgs) -> RunRequest {
    let mut stylesheets = doc_config.stylesheet_paths(base_dir);
    if let Some(p) = &args.index_xsl {
        stylesheets.index = p.clone();
    }
    if let Some(p) = &args.class_xsl {
        stylesheets.class = p.clone();
    }
    if let Some(p) = &args.node_xsl {
        stylesheets.node = p.clone();
    }

    RunRequest {
        title: args.title.clone(),
        output_root: args.output.clone(),
        intermediate_dir: args.intermediate.clone(),
        stylesheets,
        css_dir: doc_config.css_dir(base_dir),
        clean: doc_config.output.clean,
        threads: config::effective_threads(&doc_config.processing),
    }
}
