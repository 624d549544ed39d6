use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use pomo_core::Clock;
use services::{
    Command, ControllerUpdate, NoteLibrary, QuizGenerator, SessionController, TerminalNotifier,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};

mod cli;
mod input;
mod render;

use input::Input;

#[tokio::main]
async fn main() {
    let code = match run().await {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("pomo error: {error:#}");
            1
        }
    };
    // The stdin reader may still be parked in a blocking read.
    std::process::exit(code);
}

async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = cli::Args::parse();
    init_tracing(&args.log_level)?;

    let (settings, clamped) = args.settings_draft().clamped();
    for adjusted in clamped {
        tracing::warn!(
            field = %adjusted.field,
            requested = adjusted.requested,
            applied = adjusted.applied,
            "setting out of range, clamped"
        );
    }

    let generator = QuizGenerator::from_env().context("invalid AI provider configuration")?;
    if let Some(config) = generator.config() {
        tracing::info!(provider = %config.provider, model = %config.model, "quiz generation enabled");
    } else {
        tracing::warn!("POMO_AI_API_KEY is not set; quizzes will be unavailable");
    }

    let mut controller = SessionController::new(
        settings,
        Clock::system(),
        NoteLibrary::default(),
        Arc::new(generator),
        Arc::new(TerminalNotifier::new()),
    );
    controller.set_muted(args.muted);

    if !args.files.is_empty() {
        let report = controller.add_note_paths(&args.files).await;
        println!("{report}");
    }
    if controller.session().has_notes() {
        controller.apply(Command::EnterTimer).await?;
    }
    println!("{}", input::HELP);

    let (commands_tx, commands_rx) = mpsc::channel(16);
    let (updates_tx, updates_rx) = watch::channel(ControllerUpdate::new(controller.snapshot()));
    let controller_task = tokio::spawn(controller.run(commands_rx, updates_tx));
    let input_task = tokio::spawn(read_commands(commands_tx));

    render_updates(updates_rx).await;
    input_task.abort();
    controller_task
        .await
        .context("session controller stopped unexpectedly")?;
    Ok(())
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_env("POMO_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

async fn read_commands(commands: mpsc::Sender<Command>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(error) => {
                tracing::error!(%error, "failed to read from stdin");
                break;
            }
        };
        match input::parse_line(&line) {
            Ok(Input::Command(command)) => {
                let quit = command == Command::Quit;
                if commands.send(command).await.is_err() || quit {
                    break;
                }
            }
            Ok(Input::Help) => println!("{}", input::HELP),
            Ok(Input::Empty) => {}
            Err(error) => eprintln!("{error}"),
        }
    }
}

async fn render_updates(mut updates: watch::Receiver<ControllerUpdate>) {
    let mut last = String::new();
    loop {
        let frame = render::render(&updates.borrow_and_update());
        if frame != last {
            println!("{frame}");
            last = frame;
        }
        if updates.changed().await.is_err() {
            break;
        }
    }
}
