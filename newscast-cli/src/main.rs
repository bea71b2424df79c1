//! Newscast - generate today's tech news podcast episode.

#![allow(clippy::print_stdout, clippy::print_stderr)] // CLI program intentionally uses stdout

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use newscast::Result;
use newscast::config::{CONFIG_PATH_ENV, Config};
use newscast::pipeline::{Pipeline, PipelineResult};
use newscast_cli::{logging, report};

/// Fetch the top technology headlines, script them and narrate the script.
#[derive(Parser)]
#[command(name = "newscast")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file path
    #[arg(short, long, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,

    /// Directory for the script and audio files (overrides config)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to create tokio runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    exit_code(&rt.block_on(run(cli)))
}

/// Report the outcome and map it to the process exit status.
fn exit_code(outcome: &Result<PipelineResult>) -> ExitCode {
    match outcome {
        Ok(result) => {
            println!("{}", report::render_summary(result));
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", report::render_failure(e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<PipelineResult> {
    let config = Config::load(cli.config.as_deref()).await?;
    generate(config, cli.output_dir).await
}

async fn generate(mut config: Config, output_dir: Option<PathBuf>) -> Result<PipelineResult> {
    if let Some(dir) = output_dir {
        config = config.with_output_dir(dir);
    }
    tracing::debug!(?config, "configuration loaded");

    Pipeline::from_config(config)?.run().await
}
