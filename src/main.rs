use clap::{Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use document_enhancer::config::Mode;

fn parse_mode(s: &str) -> Result<Mode, String> {
    match s.to_lowercase().as_str() {
        "basic" => Ok(Mode::Basic),
        "performance" => Ok(Mode::Performance),
        "secure" => Ok(Mode::Secure),
        "enterprise" => Ok(Mode::Enterprise),
        _ => Err(format!(
            "invalid mode '{s}'. Valid values: basic, performance, secure, enterprise"
        )),
    }
}

#[derive(Parser)]
#[command(name = "enhance")]
#[command(version, about = "Document quality enhancement pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, short, default_value = ".enhance/config.toml")]
    config: PathBuf,

    #[arg(long)]
    verbose: bool,

    #[arg(long, short)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Enhance a single document
    Document {
        #[arg(help = "Path to the document")]
        path: PathBuf,

        #[arg(long = "strategy", help = "Restrict to specific strategies (repeatable)")]
        strategies: Vec<String>,

        #[arg(long)]
        max_passes: Option<u32>,

        #[arg(long)]
        quality_threshold: Option<f64>,

        #[arg(long, value_parser = parse_mode)]
        mode: Option<Mode>,

        #[arg(long, short, help = "Write enhanced content here instead of stdout")]
        output: Option<PathBuf>,

        #[arg(long, help = "Write a .bak copy of the original before overwriting")]
        backup: bool,

        #[arg(long = "dry-run", help = "Report what would change without writing")]
        dry_run: bool,
    },

    /// Enhance every matching document in a directory
    Batch {
        #[arg(help = "Directory to scan")]
        dir: PathBuf,

        #[arg(long, default_value = "**/*.md", help = "Glob pattern for matching files")]
        pattern: String,

        #[arg(long, help = "Recurse into subdirectories")]
        recursive: bool,

        #[arg(long = "strategy", help = "Restrict to specific strategies (repeatable)")]
        strategies: Vec<String>,

        #[arg(long, help = "Override max_parallel_docs")]
        parallel: Option<usize>,

        #[arg(long, help = "Write a JSON report to this path")]
        report: Option<PathBuf>,
    },

    /// Manage saved configuration presets
    Pipeline {
        #[command(subcommand)]
        action: PipelineAction,
    },
}

#[derive(Subcommand)]
enum PipelineAction {
    /// List saved presets
    List,
    /// Save the current effective settings as a named preset
    Create {
        name: String,
        #[arg(long, value_parser = parse_mode)]
        mode: Option<Mode>,
    },
    /// Apply a named preset to `.enhance/config.toml`
    Apply { name: String },
}

fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };

        eprintln!("\n{}", style("panic").red().bold());
        eprintln!("{} {message}", style("enhance encountered an unexpected error:").red());
        if let Some(location) = panic_info.location() {
            eprintln!("{}", style(format!("location: {}:{}:{}", location.file(), location.line(), location.column())).dim());
        }
        default_hook(panic_info);
    }));
}

#[tokio::main]
async fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli().await {
        Ok(success) => {
            if success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("{} {e}", style("Error:").red().bold());
            ExitCode::FAILURE
        }
    }
}

async fn run_cli() -> anyhow::Result<bool> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Document {
            path,
            strategies,
            max_passes,
            quality_threshold,
            mode,
            output,
            backup,
            dry_run,
        } => {
            document_enhancer::cli::commands::document::run(document_enhancer::cli::commands::document::DocumentArgs {
                path,
                strategies,
                max_passes,
                quality_threshold,
                mode,
                output,
                backup,
                dry_run,
            })
            .await
        }
        Commands::Batch {
            dir,
            pattern,
            recursive,
            strategies,
            parallel,
            report,
        } => {
            document_enhancer::cli::commands::batch::run(document_enhancer::cli::commands::batch::BatchArgs {
                dir,
                pattern,
                recursive,
                strategies,
                parallel,
                report,
            })
            .await
        }
        Commands::Pipeline { action } => match action {
            PipelineAction::List => document_enhancer::cli::commands::pipeline::list(),
            PipelineAction::Create { name, mode } => document_enhancer::cli::commands::pipeline::create(&name, mode),
            PipelineAction::Apply { name } => document_enhancer::cli::commands::pipeline::apply(&name),
        },
    }
}
