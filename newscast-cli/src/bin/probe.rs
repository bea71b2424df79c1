//! Newscast probe - check each upstream service in isolation.

#![allow(clippy::print_stdout, clippy::print_stderr)] // CLI program intentionally uses stdout

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use newscast::config::{CONFIG_PATH_ENV, Config};
use newscast::probe::{Probe, run_probe};
use newscast_cli::{logging, report};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Selector {
    /// NewsAPI headlines
    #[value(alias = "headlines", alias = "fetch")]
    News,
    /// OpenAI chat completion
    #[value(alias = "openai", alias = "generate", alias = "script")]
    Llm,
    /// ElevenLabs speech synthesis
    #[value(alias = "elevenlabs", alias = "synthesize", alias = "audio")]
    Tts,
}

impl From<Selector> for Probe {
    fn from(selector: Selector) -> Self {
        match selector {
            Selector::News => Self::News,
            Selector::Llm => Self::Llm,
            Selector::Tts => Self::Tts,
        }
    }
}

/// Exercise the upstream services one at a time.
#[derive(Parser)]
#[command(name = "newscast-probe")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Service to probe; all three run in order when omitted
    #[arg(value_enum, ignore_case = true)]
    selector: Option<Selector>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file path
    #[arg(short, long, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,
}

impl Cli {
    fn probes(&self) -> Vec<Probe> {
        self.selector
            .map_or_else(|| Probe::ALL.to_vec(), |selector| vec![selector.into()])
    }
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

    if rt.block_on(run(&cli)) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Run the selected probes, returning whether all passed.
async fn run(cli: &Cli) -> bool {
    let config = match Config::load(cli.config.as_deref()).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", report::render_failure(&e));
            return false;
        }
    };

    let mut failed = 0;
    for probe in cli.probes() {
        println!("--- {probe} ({}) ---", probe.provider());
        match run_probe(&config, probe).await {
            Ok(outcome) => println!("PASS {outcome}"),
            Err(e) => {
                failed += 1;
                println!("FAIL");
                eprintln!("{}", report::render_failure(&e));
            }
        }
    }

    failed == 0
}
