//! academy - the Gemini Academy admissions assistant in a terminal

mod config;
mod ui;

use academy_chat::{Assistant, StreamingClient, TurnOutcome, ValidationError};
use clap::Parser;
use std::io::{self, IsTerminal, Write};
use std::sync::Arc;
use std::time::Duration;

/// How long to wait for the renderer to catch up with a finished turn
const RENDER_GRACE: Duration = Duration::from_secs(2);

/// How long an aborted turn gets to wind down before Ctrl+C exits anyway
const ABORT_GRACE: Duration = Duration::from_secs(1);

/// academy - ask the Gemini Academy admissions assistant
#[derive(Parser, Debug)]
#[command(name = "academy")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Model to use (default: gemini-2.5-flash)
    #[arg(short, long)]
    model: Option<String>,

    /// Sampling temperature (default: 0.7)
    #[arg(short, long)]
    temperature: Option<f32>,

    /// Ask a single question and exit
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("academy=debug,academy_ai=debug,academy_chat=debug")
    } else {
        match tracing_subscriber::EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => return,
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_tracing(args.verbose);

    // Initialize config and exit
    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let cfg = config::Config::load();
    let settings = cfg.session_settings(args.model.as_deref(), args.temperature)?;
    tracing::debug!(model = %settings.model.id, "starting assistant");

    let client = StreamingClient::gemini(settings, cfg.api_key.clone());
    let mut assistant = Assistant::new(Arc::new(client));

    let interactive = io::stdout().is_terminal();
    let mut turn_done = ui::spawn_renderer(
        assistant.messages().to_vec(),
        assistant.subscribe(),
        interactive,
    );

    // Ctrl+C stops the reply in flight; when idle it exits
    let handle = assistant.handle();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if !handle.is_running() {
                std::process::exit(130);
            }
            handle.abort();
            if !handle.wait_for_idle_timeout(ABORT_GRACE).await {
                tracing::warn!("turn did not stop after abort");
                std::process::exit(130);
            }
        }
    });

    if let Some(question) = args.command {
        if interactive {
            println!("> {}", question.trim());
        }
        let outcome = ask(&mut assistant, &question, &mut turn_done).await;
        if outcome != Some(TurnOutcome::Completed) {
            std::process::exit(1);
        }
        return Ok(());
    }

    run_interactive(&mut assistant, &mut turn_done).await
}

/// Run one turn and wait until the renderer has drawn its end.
/// Returns `None` when the input was rejected.
async fn ask(
    assistant: &mut Assistant,
    input: &str,
    turn_done: &mut ui::TurnSignals,
) -> Option<TurnOutcome> {
    turn_done.clear();
    match assistant.submit(input).await {
        Ok(outcome) => {
            if !turn_done.wait(RENDER_GRACE).await {
                tracing::warn!("renderer did not finish the turn in time");
            }
            Some(outcome)
        }
        Err(ValidationError::EmptyInput) => None,
        Err(e) => {
            tracing::warn!("input rejected: {}", e);
            None
        }
    }
}

async fn run_interactive(
    assistant: &mut Assistant,
    turn_done: &mut ui::TurnSignals,
) -> anyhow::Result<()> {
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            // EOF
            break;
        }

        if matches!(input.trim(), "/exit" | "/quit") {
            break;
        }

        ask(assistant, &input, turn_done).await;
    }

    Ok(())
}
