use clap::{Parser, Subcommand};
use docuverify::analyzer::DocumentAnalyzer;
use docuverify::config::{self, AnalyzerConfig};
use docuverify::imaging::{RustBackend, supported_input_extensions};
use docuverify::output;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

/// Config source shared by every command that reads one.
#[derive(clap::Args, Clone)]
struct ConfigArgs {
    /// Config file (default: ./docuverify.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser)]
#[command(name = "docuverify")]
#[command(about = "Heuristic tamper detection for document images")]
#[command(long_about = "\
Heuristic tamper detection for document images

Runs three independent forensic checks over each image and combines their
scores into one weighted fake probability (0-100%):

  Metadata        EXIF Software tag names an editor, or capture date missing
  ELA             Error level analysis: residual after JPEG re-encoding
  Noise Variance  Tiles with far less sensor noise than the rest of the frame

A side-by-side ELA | noise map is written to debug_report.jpg for review.

Scores are heuristics, not proof. Warnings mean a check could not run and
are not evidence either way.

Run 'docuverify gen-config' to generate a documented docuverify.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Log detector progress (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze one or more images
    Analyze {
        /// Images to analyze
        #[arg(required = true)]
        images: Vec<PathBuf>,

        #[command(flatten)]
        config: ConfigArgs,

        /// Where to write the side-by-side debug image
        #[arg(long)]
        debug_output: Option<PathBuf>,

        /// Print results as JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Run the detectors one after another instead of concurrently
        #[arg(long)]
        sequential: bool,
    },
    /// Validate the config file and print the effective settings
    CheckConfig(ConfigArgs),
    /// Print a stock docuverify.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Analyze {
            images,
            config: config_args,
            debug_output,
            json,
            sequential,
        } => {
            let mut analyzer_config = resolve_config(&config_args)?;
            if let Some(path) = debug_output {
                analyzer_config.output.debug_report = path;
            }
            if sequential {
                analyzer_config.processing.parallel_detectors = false;
            }
            analyzer_config.validate()?;
            warn_on_unknown_extensions(&images);
            init_thread_pool(&analyzer_config.processing);

            let backend = RustBackend::new();
            let analyzer = DocumentAnalyzer::new(&backend, &analyzer_config);

            if let [single] = images.as_slice() {
                let outcome = analyzer.analyze(single)?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&outcome)?);
                } else {
                    output::print_report(&outcome);
                }
                return Ok(());
            }

            let results = analyzer.analyze_batch(&images);
            let mut outcomes = Vec::new();
            let mut failed = 0;
            for (path, result) in images.iter().zip(results) {
                match result {
                    Ok(outcome) => {
                        if !json {
                            output::print_report(&outcome);
                            println!();
                        }
                        outcomes.push(outcome);
                    }
                    Err(e) => {
                        failed += 1;
                        for line in output::format_failure(path, &e) {
                            eprintln!("{}", line);
                        }
                    }
                }
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&outcomes)?);
            } else {
                println!("{}", output::format_batch_summary(images.len(), failed));
            }
            if failed > 0 {
                return Err(format!("{failed} of {} image(s) could not be analyzed", images.len()).into());
            }
        }
        Command::CheckConfig(config_args) => {
            let analyzer_config = resolve_config(&config_args)?;
            print!("{}", toml::to_string_pretty(&analyzer_config)?);
            println!("==> Config is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Log to stderr so stdout stays clean for the report and `--json`.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// `--config` wins; otherwise `docuverify.toml` in the working directory, if any.
fn resolve_config(args: &ConfigArgs) -> Result<AnalyzerConfig, config::ConfigError> {
    match &args.config {
        Some(path) => config::load_config_file(path),
        None => config::load_config(Path::new(".")),
    }
}

/// The decoder sniffs content, so an odd extension is not fatal, just worth a note.
fn warn_on_unknown_extensions(images: &[PathBuf]) {
    let known = supported_input_extensions();
    for path in images {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        if !ext.is_some_and(|e| known.iter().any(|k| *k == e)) {
            tracing::warn!(path = %path.display(), "unrecognized image extension");
        }
    }
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores: the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
