use anyhow::Result;
use clap::{Parser, Subcommand};
use kestrel_cli::OutputFormat;
use kestrel_cli::commands;
use kestrel_cli::commands::serve::ServeArgs;
use kestrel_cli::engine::EngineArgs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kestrel")]
#[command(author, version, long_about = None)]
#[command(
    about = "Accessibility, responsiveness and performance analysis for web pages",
    long_about = "Kestrel scans HTML documents or live URLs with axe-core in headless Chrome, \
                  checks layout across desktop, tablet and phone viewports, and optionally \
                  runs a Lighthouse performance audit."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Pretty)]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP analysis service
    Serve {
        #[command(flatten)]
        server: ServeArgs,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Analyse a single HTML file or URL and print the report
    Analyze {
        /// Path to an HTML file
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        /// URL of a live page to analyse instead of a file
        #[arg(long)]
        url: Option<String>,

        /// Also run a Lighthouse performance audit
        #[arg(long)]
        performance: bool,

        #[command(flatten)]
        engine: EngineArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    match cli.command {
        Commands::Serve { server, engine } => commands::serve::execute(&server, &engine),
        Commands::Analyze {
            file,
            url,
            performance,
            engine,
        } => commands::analyze::execute(file.as_deref(), url, performance, &engine, cli.format),
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new(
            "kestrel=debug,kestrel_cli=debug,kestrel_core=debug,kestrel_browser=debug,kestrel_server=debug,tower_http=debug",
        )
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("kestrel=info,kestrel_cli=info,kestrel_core=info,kestrel_browser=info,kestrel_server=info")
        })
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}
