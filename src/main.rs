use anyhow::{Context, Result};
use braid_preview::converter::ConverterOutcome;
use braid_preview::engine::RunOutcome;
use braid_preview::{render_document, serve, PreviewConfig};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "braid-preview")]
#[command(about = "Live document preview with executable code", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert the files once and print the result
    Render(RenderArgs),
    /// Serve the JSON line protocol on stdin/stdout
    Serve,
}

#[derive(Args)]
struct RenderArgs {
    /// Source files, concatenated in order
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Run the code first and include its output
    #[arg(long)]
    execute: bool,
}

fn load_config(path: Option<&Path>) -> Result<PreviewConfig> {
    match path {
        Some(path) => PreviewConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(PreviewConfig::default()),
    }
}

fn render(config: &PreviewConfig, args: RenderArgs) -> Result<ExitCode> {
    let report = render_document(config, &args.files, args.execute)?;

    match report.run {
        Some(RunOutcome::RolledBack(message)) => log::warn!("{}", message),
        Some(RunOutcome::Failed(message)) => log::error!("{}", message),
        Some(RunOutcome::Completed) | None => {}
    }

    match report.outcome {
        ConverterOutcome::Rendered(output) => {
            print!("{output}");
            Ok(ExitCode::SUCCESS)
        }
        ConverterOutcome::ParseError(diagnostic) => {
            let file = diagnostic
                .file
                .as_ref()
                .map(|f| f.to_string())
                .unwrap_or_else(|| "<input>".to_string());
            match (diagnostic.line, diagnostic.column) {
                (Some(line), Some(column)) => {
                    eprintln!("{file}:{line}:{column}: {}", diagnostic.message)
                }
                (Some(line), None) => eprintln!("{file}:{line}: {}", diagnostic.message),
                _ => eprintln!("{file}: {}", diagnostic.message),
            }
            Ok(ExitCode::FAILURE)
        }
        ConverterOutcome::Fatal(message) => {
            eprintln!("{message}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Render(args) => render(&config, args),
        Commands::Serve => {
            serve::serve(config)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
