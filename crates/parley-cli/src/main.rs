use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use parley::store::SessionStore;
use parley::{Answer, Bot, Domain, Session};

#[derive(Debug, Parser)]
#[command(name = "parley", version, about = "Chat with a YAML-defined parley bot")]
struct Args {
    /// Directory holding fsm.yml, and optionally bot.yml and clf.yml.
    #[arg(long, default_value = ".")]
    path: PathBuf,

    /// Sender id used for this session.
    #[arg(long, default_value = "cli")]
    sender: String,

    /// Enable debug logging and per-turn details.
    #[arg(long, env = "PARLEY_DEBUG")]
    debug: bool,
}

fn init_tracing(debug: bool) {
    let default_filter = if debug { "parley=debug" } else { "parley=info" };
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string()))
        .with_writer(io::stderr)
        .init();
}

fn render(answer: &Answer) -> String {
    match &answer.image {
        Some(image) if answer.text.is_empty() => format!("[image: {}]", image),
        Some(image) => format!("{} [image: {}]", answer.text, image),
        None => answer.text.clone(),
    }
}

/// Read-only view of a stored session for `/state`.
fn describe_session(domain: &Domain, session: Option<&Session>) -> Vec<String> {
    let Some(session) = session else {
        return vec!["no session".to_string()];
    };
    let name = domain.state_name(session.state).unwrap_or("?");
    let mut lines = vec![format!("state: {} ({})", name, session.state)];
    let mut slots: Vec<_> = session.slots.iter().collect();
    slots.sort();
    lines.extend(slots.into_iter().map(|(slot, value)| format!("  {} = {}", slot, value)));
    lines
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.debug);

    let bot = Bot::load(&args.path)
        .with_context(|| format!("failed to load bot from {}", args.path.display()))?;

    tracing::debug!(sender = %args.sender, path = %args.path.display(), "Starting chat");
    println!("=== {} ===", bot.name());
    println!("Commands: '/state' (show session), '/reset', '/quit'\n");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("You > ");
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        match input {
            "/quit" | "/exit" => break,
            "/state" => {
                let session = bot.store().get(&args.sender).await?;
                for line in describe_session(bot.domain(), session.as_ref()) {
                    println!("{}", line);
                }
                continue;
            }
            "/reset" => {
                bot.store().delete(&args.sender).await?;
                println!("Session reset.");
                continue;
            }
            _ => {}
        }

        let turn = bot.turn(&args.sender, input).await?;
        if args.debug {
            println!(
                "  [{} {:.2}] {:?} -> state {}",
                if turn.prediction.label.is_empty() {
                    "-"
                } else {
                    turn.prediction.label.as_str()
                },
                turn.prediction.confidence,
                turn.outcome,
                turn.session.state
            );
        }
        for answer in &turn.answers {
            println!("{} > {}", bot.name(), render(answer));
        }
    }

    println!("Goodbye!");
    Ok(())
}
