//! Study Companion - Terminal Surface
//!
//! Line-oriented front end for the learning session engine. Reads one
//! command per line from stdin, forwards it to the engine and prints the
//! state changes the engine publishes. Logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Bundled text, key from the environment
//! GEMINI_API_KEY=... study-companion --content demos/tengwangge.toml
//!
//! # Custom config file and model
//! study-companion --config ./companion.toml --text-model gemini-2.5-flash
//!
//! # Verbose logging
//! RUST_LOG=companion_core=debug study-companion
//! ```

mod commands;
mod render;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use companion_core::{
    load_config_from_path, load_work, AudioPlayer, AudioSink, Companion, CompanionMessage,
    ConfigOverrides, GeminiGateway, MemorySink, PromptBook, StudyEvent,
};

use commands::{Command, HELP};
use render::View;

/// Study Companion - AI explanations, tutoring, narration and quizzes for a classical text
#[derive(Parser, Debug)]
#[command(name = "study-companion")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Content file with passages and quiz
    #[arg(
        long,
        env = "COMPANION_CONTENT",
        value_name = "FILE",
        default_value = "demos/tengwangge.toml"
    )]
    content: PathBuf,

    /// Configuration file path
    #[arg(short = 'c', long, env = "COMPANION_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// API key for the generative service
    #[arg(long, value_name = "KEY")]
    api_key: Option<String>,

    /// REST endpoint root
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Model for explanations and tutoring
    #[arg(long, value_name = "MODEL")]
    text_model: Option<String>,

    /// Model for narration
    #[arg(long, value_name = "MODEL")]
    speech_model: Option<String>,

    /// Per-request deadline in seconds
    #[arg(long, value_name = "SECS")]
    request_timeout: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "COMPANION_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            text_model: self.text_model.clone(),
            speech_model: self.speech_model.clone(),
            request_timeout_secs: self.request_timeout,
        }
    }
}

/// Initialize logging with the specified level
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "companion_cli={level},companion_core={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Pick the output device
fn audio_sink() -> Arc<dyn AudioSink> {
    #[cfg(feature = "playback")]
    {
        match companion_core::RodioSink::spawn() {
            Ok(sink) => return Arc::new(sink),
            Err(e) => warn!(error = %e, "No audio output, narration will be silent"),
        }
    }
    info!("Narration is decoded but not played");
    Arc::new(MemorySink::new())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    info!("Study companion starting");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config_path = args.config.clone().or_else(companion_core::default_config_path);
    let mut config = load_config_from_path(config_path).context("Failed to load configuration")?;
    args.overrides().apply(&mut config);
    config.validate().context("Invalid configuration")?;
    info!(source = %config.source(), gateway = ?config.gateway, "Configuration loaded");

    let work = load_work(&args.content)
        .with_context(|| format!("Failed to load content from {}", args.content.display()))?;

    let prompts = PromptBook::new(work.title.clone())
        .with_temperatures(config.explain_temperature, config.tutor_temperature);
    let gateway = GeminiGateway::new(&config.gateway, prompts)
        .context("Set GEMINI_API_KEY or pass --api-key")?;
    let player = AudioPlayer::new(audio_sink());

    let (msg_tx, mut msg_rx) = mpsc::channel::<CompanionMessage>(256);
    let (event_tx, event_rx) = mpsc::channel::<StudyEvent>(32);

    let mut view = View::new(work.clone());
    let mut companion = Companion::new(work, gateway, player, &config, msg_tx);
    let engine = tokio::spawn(async move {
        companion.start().await;
        companion.run(event_rx).await;
    });

    println!("{}\n\n{HELP}", view.reading_text());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            msg = msg_rx.recv() => match msg {
                Some(CompanionMessage::Quit { message }) => {
                    if let Some(message) = message {
                        println!("{message}");
                    }
                    break;
                }
                Some(msg) => {
                    if let Some(text) = view.apply(msg) {
                        println!("{text}");
                    }
                }
                None => break,
            },
            line = lines.next_line(), if stdin_open => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    stdin_open = false;
                    send(&event_tx, StudyEvent::Quit).await;
                    continue;
                };
                handle_line(&line, &view, &event_tx).await;
            }
        }
    }

    drop(event_tx);
    if let Err(e) = engine.await {
        warn!(error = %e, "Engine task ended abnormally");
    }
    info!("Study companion stopped");
    Ok(())
}

async fn handle_line(line: &str, view: &View, events: &mpsc::Sender<StudyEvent>) {
    let command = match commands::parse(line) {
        Ok(command) => command,
        Err(commands::ParseError::Empty) => return,
        Err(e) => {
            println!("{e}");
            return;
        }
    };

    if let Some(section) = command.section() {
        send(events, StudyEvent::Navigate { section }).await;
    }

    match command {
        Command::Read => println!("{}", view.reading_text()),
        Command::Analysis => println!("{}", view.analysis_text()),
        Command::Chat => println!("{}", view.chat_text()),
        Command::Quiz => println!("{}", view.quiz_text()),
        Command::Help => println!("{HELP}"),
        Command::Event(event) => send(events, event).await,
    }
}

async fn send(events: &mpsc::Sender<StudyEvent>, event: StudyEvent) {
    if let Err(e) = events.send(event).await {
        warn!("Failed to send event to engine: {}", e);
    }
}
