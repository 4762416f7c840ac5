//! `toolpilot chat` — Interactive or single-message chat mode.

use std::io::{BufRead, Write};
use std::pin::pin;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio_util::sync::CancellationToken;
use toolpilot_agent::{AgentLoop, TurnError, TurnEvent, TurnOutcome};
use toolpilot_config::AppConfig;
use toolpilot_core::memory::ContextStore;
use toolpilot_core::message::Session;

use crate::display;

const EXIT_COMMANDS: [&str; 3] = ["exit", "quit", "bye"];

pub async fn run(config: &AppConfig, message: Option<String>) -> anyhow::Result<()> {
    let provider = super::build_provider(config)?;
    let tools = super::build_registry(config)?;
    let store: Option<Arc<dyn ContextStore>> = if config.memory.enabled {
        Some(super::open_store(config).await?)
    } else {
        None
    };

    let (tx, mut events) = mpsc::unbounded_channel();
    let agent = AgentLoop::from_config(config, provider, tools, store).with_events(tx);
    let mut session = Session::new();

    if let Some(msg) = message {
        // Single message mode
        let result = run_turn(&agent, &mut session, &msg, &mut events).await;
        return match result {
            Ok(outcome) => {
                println!("{}", outcome.response);
                Ok(())
            }
            Err(TurnError::Persist { outcome, source }) => {
                println!("{}", outcome.response);
                eprintln!("  ⚠️  {source}");
                Ok(())
            }
            Err(e) => Err(e.into()),
        };
    }

    // Interactive mode
    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║       toolpilot — Ollama AI Assistant        ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Model:     {}", config.ollama.model);
    println!("  Search:    {}", config.search.provider.as_str());
    println!("  Tools:     {}", agent.tools().names().join(", "));
    println!(
        "  Memory:    {}",
        if config.memory.enabled {
            config.store_path().display().to_string()
        } else {
            "disabled".to_string()
        }
    );
    println!();
    println!("  Type 'exit', 'quit', or 'bye' to end the conversation.");
    println!("  Ctrl+C cancels a running turn; at the prompt it exits.");
    println!();

    let mut input = spawn_stdin_reader();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = input.recv() => line,
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };
        let Some(line) = line else {
            break; // EOF (Ctrl+D)
        };
        let line = line?;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if is_exit_command(text) {
            break;
        }

        println!();
        match run_turn(&agent, &mut session, text, &mut events).await {
            Ok(outcome) => print_reply(&outcome),
            Err(TurnError::Persist { outcome, source }) => {
                print_reply(&outcome);
                eprintln!("  ⚠️  {source}");
            }
            Err(TurnError::Cancelled) => eprintln!("  [Cancelled]"),
            Err(e) if e.is_retryable() => eprintln!("  [Error] {e} (you can try again)"),
            Err(e) => eprintln!("  [Error] {e}"),
        }
        println!();
    }

    println!();
    println!("  Goodbye! 👋");
    println!();
    Ok(())
}

/// Run one turn, printing events as they arrive. Ctrl+C cancels the turn.
async fn run_turn(
    agent: &AgentLoop,
    session: &mut Session,
    input: &str,
    events: &mut UnboundedReceiver<TurnEvent>,
) -> Result<TurnOutcome, TurnError> {
    let cancel = CancellationToken::new();
    let mut turn = pin!(agent.run_turn(session, input, &cancel));

    loop {
        tokio::select! {
            result = &mut turn => {
                while let Ok(event) = events.try_recv() {
                    print_event(&event);
                }
                return result;
            }
            Some(event) = events.recv() => print_event(&event),
            _ = tokio::signal::ctrl_c(), if !cancel.is_cancelled() => {
                eprintln!("  Cancelling...");
                cancel.cancel();
            }
        }
    }
}

fn print_event(event: &TurnEvent) {
    if let Some(text) = display::render_event(event) {
        println!("{text}");
    }
}

fn print_reply(outcome: &TurnOutcome) {
    for line in outcome.response.lines() {
        println!("  Assistant > {line}");
    }
}

fn is_exit_command(text: &str) -> bool {
    EXIT_COMMANDS.contains(&text.to_lowercase().as_str())
}

/// Read stdin lines on a dedicated thread so a pending read never holds up
/// shutdown.
fn spawn_stdin_reader() -> UnboundedReceiver<std::io::Result<String>> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}
