mod config;
mod declarations;
mod logging;
mod writer;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use entigen_generate::{GenerationEngine, GenerationError, GeneratorRegistry};
use thiserror::Error;

use config::Settings;
use declarations::{declaration_json_schema, load_registry};
use logging::{LogFormat, init_logging};
use writer::{write_artifacts, write_bytes_atomic};

#[derive(Debug, Error)]
pub enum CliError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid declaration {path}: {message}")]
    Declaration { path: String, message: String },
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("logging error: {0}")]
    Logging(String),
}

#[derive(Parser, Debug)]
#[command(name = "entigen", version, about = "Generate schemas, types, validators and mocks from entity declarations")]
struct Cli {
    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,
    /// Default log level when RUST_LOG is unset.
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate artifacts from declaration files.
    Generate(GenerateArgs),
    /// List the available generator backends.
    ListGenerators,
    /// Print the JSON Schema that declaration files must satisfy.
    DeclarationSchema(SchemaArgs),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Declaration files or directories (defaults to `inputs` from the config).
    #[arg(value_name = "PATH")]
    inputs: Vec<PathBuf>,
    /// Config file (defaults to ./entigen.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Output directory.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Generator to run; repeat to select several.
    #[arg(long = "generator", value_name = "NAME")]
    generators: Vec<String>,
    /// Mock records per entity.
    #[arg(long)]
    mock_count: Option<usize>,
    /// Mock data seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Prisma datasource provider.
    #[arg(long)]
    provider: Option<String>,
    /// Omit the "generated" banner from text artifacts.
    #[arg(long, default_value_t = false)]
    no_banner: bool,
    /// Print artifact paths without writing anything.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
    /// Treat generation warnings as errors.
    #[arg(long, default_value_t = false)]
    strict: bool,
    /// Write the generation report as JSON to this path.
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SchemaArgs {
    /// Write the schema here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    init_logging(cli.log_format, &cli.log_level)?;

    match cli.command {
        Command::Generate(args) => run_generate(args),
        Command::ListGenerators => {
            for name in GeneratorRegistry::with_defaults().names() {
                println!("{name}");
            }
            Ok(())
        }
        Command::DeclarationSchema(args) => {
            let mut encoded = serde_json::to_string_pretty(&declaration_json_schema())?;
            encoded.push('\n');
            match args.out {
                Some(path) => write_bytes_atomic(&path, encoded.as_bytes()),
                None => {
                    print!("{encoded}");
                    Ok(())
                }
            }
        }
    }
}

fn run_generate(args: GenerateArgs) -> Result<(), CliError> {
    let timer = Instant::now();
    let mut settings = Settings::load(args.config.as_deref())?;

    if !args.generators.is_empty() {
        settings.generate.generators = args.generators;
    }
    if let Some(count) = args.mock_count {
        settings.generate.mock_count = count;
    }
    if let Some(seed) = args.seed {
        settings.generate.seed = seed;
    }
    if let Some(provider) = args.provider {
        settings.generate.database_provider = provider;
    }
    if args.no_banner {
        settings.generate.banner = false;
    }
    if let Some(out) = args.out {
        settings.output_dir = Some(out);
    }

    let inputs = if args.inputs.is_empty() {
        settings.inputs.clone()
    } else {
        args.inputs
    };
    if inputs.is_empty() {
        return Err(CliError::InvalidConfig(
            "no declaration inputs given on the command line or in the config".to_string(),
        ));
    }

    let registry = load_registry(&inputs)?;
    tracing::info!(event = "declarations_loaded", entities = registry.len());

    let engine = GenerationEngine::new(settings.generate.clone());
    let output = match engine.run_registry(&registry) {
        Ok(output) => output,
        Err(GenerationError::Failed(report)) => {
            for issue in &report.errors {
                tracing::error!(
                    code = %issue.code,
                    entity = issue.entity.as_deref().unwrap_or(""),
                    field = issue.field.as_deref().unwrap_or(""),
                    "{}",
                    issue.message
                );
            }
            if let Some(path) = &args.report {
                write_bytes_atomic(path, &serde_json::to_vec_pretty(&report)?)?;
            }
            return Err(GenerationError::Failed(report).into());
        }
        Err(err) => return Err(err.into()),
    };

    if let Some(path) = &args.report {
        write_bytes_atomic(path, &serde_json::to_vec_pretty(&output.report)?)?;
    }

    if args.strict && !output.report.warnings.is_empty() {
        return Err(CliError::InvalidConfig(format!(
            "{} generation warning(s) with --strict",
            output.report.warnings.len()
        )));
    }

    if args.dry_run {
        for artifact in &output.artifacts {
            println!("{}", artifact.path);
        }
        return Ok(());
    }

    let out_dir = settings.output_dir();
    let summary = write_artifacts(&out_dir, &output.artifacts)?;
    tracing::info!(
        event = "run_finished",
        out_dir = %out_dir.display(),
        written = summary.written.len(),
        unchanged = summary.unchanged.len(),
        duration_ms = timer.elapsed().as_millis() as u64
    );
    Ok(())
}
