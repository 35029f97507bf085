use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use colored::*;

use song_vocab::logging;
use song_vocab::{AgentConfig, AgentError, SongVocabService};

/// Find Spanish song lyrics and build a vocabulary list from them
#[derive(Parser, Debug)]
#[command(name = "song-vocab", version, about)]
struct Cli {
    /// Request, e.g. "Find lyrics for Despacito by Luis Fonsi"
    #[arg(required = true, num_args = 1..)]
    request: Vec<String>,

    /// Turn budget for the agent
    #[arg(long)]
    max_turns: Option<usize>,

    /// Directory for lyrics files
    #[arg(long)]
    lyrics_dir: Option<PathBuf>,

    /// Directory for vocabulary files
    #[arg(long)]
    vocabulary_dir: Option<PathBuf>,

    /// Chat model to use
    #[arg(long)]
    model: Option<String>,
}

impl Cli {
    fn apply(&self, mut config: AgentConfig) -> AgentConfig {
        if let Some(turns) = self.max_turns {
            config = config.with_max_turns(turns);
        }
        if let Some(dir) = &self.lyrics_dir {
            config = config.with_lyrics_dir(dir);
        }
        if let Some(dir) = &self.vocabulary_dir {
            config = config.with_vocabulary_dir(dir);
        }
        if let Some(model) = &self.model {
            config = config.with_model(model);
        }
        config
    }
}

async fn run(cli: &Cli) -> Result<String, AgentError> {
    let config = cli.apply(AgentConfig::from_env()?);
    let service = SongVocabService::from_config(&config)?;

    let artifact = service.handle(&cli.request.join(" ")).await?;
    Ok(serde_json::to_string_pretty(&artifact)?)
}

#[tokio::main]
async fn main() -> ExitCode {
    // Missing .env is fine; the environment may already be set
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let _guard = match logging::init_logging() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{} failed to initialise logging: {:#}", "warning:".yellow().bold(), e);
            None
        }
    };

    tracing::info!("=== Song Vocab Starting ===");

    match run(&cli).await {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Request failed: {}", e);
            eprintln!(
                "{} {}",
                format!("Error {}:", e.status_code()).red().bold(),
                e.to_response().detail
            );
            ExitCode::FAILURE
        }
    }
}
