//! Pinscout CLI - local business lookup by pincode
//!
//! The application logic is contained in lib.rs, and this file is responsible
//! for parsing arguments and handling top-level errors.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use pinscout::report::SearchReport;
use pinscout::{ui, Config, GeminiFinder, SearchController};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "pinscout")]
#[command(author, version, about = "Find local businesses by pincode", long_about = None)]
struct Cli {
    /// Path to a pinscout.toml config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for businesses in a pincode
    Search {
        /// 6-digit postal pincode
        pincode: String,
        /// Optional area or locality name
        #[arg(long, default_value = "")]
        area: String,
        /// Maximum number of pages to fetch
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
        pages: u16,
        /// Print the results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut command = Cli::command();
            let name = command.get_name().to_string();
            clap_complete::generate(shell, &mut command, name, &mut std::io::stdout());
        }
        Some(Commands::Search {
            pincode,
            area,
            pages,
            json,
        }) => {
            let controller = build_controller(cli.config.as_deref())?;
            let status = (!json).then(|| ui::spawn_status_printer(controller.subscribe()));
            ui::search_pages(&controller, pincode.trim(), area.trim(), usize::from(pages)).await;
            if let Some(status) = status {
                status.abort();
            }

            let state = controller.snapshot();
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&SearchReport::from(&state))?
                );
            } else {
                ui::render(&state, 0);
            }

            // Nothing to show: the failure has already been printed
            if state.error.is_some() && state.businesses.is_empty() {
                return Ok(ExitCode::FAILURE);
            }
        }
        None => {
            // Default: interactive mode
            ui::run(build_controller(cli.config.as_deref())?).await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Load config and wire the Gemini finder into a controller
fn build_controller(config_path: Option<&Path>) -> anyhow::Result<SearchController<GeminiFinder>> {
    let config = match config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let finder = GeminiFinder::from_config(&config)?;
    Ok(SearchController::new(finder, config.search.page_size))
}
