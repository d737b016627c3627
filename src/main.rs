use std::io;

use anyhow::{Context, Result};
use clap::Parser;

use kira_engine::{
    cli::Cli,
    config::EngineConfig,
    session::{farewell, SessionController},
    utils::setup_logging,
    EngineBuilder, Features,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    cli.apply(&mut config);
    setup_logging(&config.logging)?;

    let assistant_name = config.prompt.assistant_name.clone();
    let question = cli.one_shot_question().map(str::to_string);

    // Generation blocks, so the session runs off the runtime while the
    // interrupt listener stays responsive.
    let session = tokio::task::spawn_blocking(move || run_session(config, question));

    tokio::select! {
        joined = session => joined.context("Session task panicked")?,
        _ = tokio::signal::ctrl_c() => {
            println!("\n\n{}", farewell(&assistant_name));
            std::process::exit(0);
        }
    }
}

fn run_session(config: EngineConfig, question: Option<String>) -> Result<()> {
    tracing::info!("kira-engine v{}", kira_engine::VERSION);
    tracing::debug!("Detected backends:\n{}", Features::detect());

    let name = config.prompt.assistant_name.clone();
    println!("Loading {name} Health Assistant...");
    let assistant = EngineBuilder::new()
        .with_config(config)
        .build()
        .context("Failed to load model")?;
    println!("✅ {name} is ready!\n");

    // Never hold the stdout lock across a read or a generation; the interrupt
    // handler prints the farewell from another thread.
    let mut controller = SessionController::new(assistant);
    let mut out = io::stdout();
    match question {
        Some(question) => {
            controller.run_once(&question, &mut out)?;
        }
        None => {
            controller.run_interactive(io::stdin().lock(), &mut out)?;
        }
    }

    Ok(())
}
