//! Subcommand: `palmreader run`, the interactive shell.
//!
//! Each line is one user action against the session: screen changes,
//! platform back/forward, onboarding, profile and reading entry, and chat.

use std::io::{self, Write as _};
use std::sync::Arc;

use anyhow::Result;
use palmreader_session::{App, HistorySignal, InMemoryHistory, MutationOutcome, View};
use palmreader_store::{NewReading, Profile, ReadingResult};
use tracing::{info, warn};

use crate::config::Config;
use crate::helpers::start_app;

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// One parsed shell line.
#[derive(Debug, PartialEq)]
enum Command {
    Help,
    Status,
    Go(View),
    Back,
    Forward,
    Onboard,
    Profile(Profile),
    Reading(ReadingResult),
    Readings,
    ClearReadings,
    Chat(String),
    ChatHistory,
    ClearChat,
    Language(String),
    Quit,
}

fn parse(line: &str) -> Result<Command, String> {
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match (word, rest) {
        ("help" | "?", _) => Command::Help,
        ("status", _) => Command::Status,
        ("quit" | "exit", _) => Command::Quit,
        ("back", _) => Command::Back,
        ("forward", _) => Command::Forward,
        ("onboard", _) => Command::Onboard,
        ("go", view) => Command::Go(view.parse().map_err(|e| format!("{e}"))?),
        ("lang", "") => return Err("usage: lang <code>".into()),
        ("lang", code) => Command::Language(code.to_owned()),
        ("profile", args) => Command::Profile(parse_profile(args)?),
        ("reading", args) => Command::Reading(parse_reading(args)?),
        ("readings", "") => Command::Readings,
        ("readings", "clear") => Command::ClearReadings,
        ("chat", "") => Command::ChatHistory,
        ("chat", "clear") => Command::ClearChat,
        ("chat", message) => Command::Chat(message.to_owned()),
        _ => return Err(format!("unknown command '{line}', try 'help'")),
    };
    Ok(command)
}

/// `profile <name> <dob> [tob] [gender]`
fn parse_profile(args: &str) -> Result<Profile, String> {
    let mut parts = args.split_whitespace();
    let (Some(name), Some(dob)) = (parts.next(), parts.next()) else {
        return Err("usage: profile <name> <dob> [tob] [gender]".into());
    };
    Ok(Profile {
        name: name.to_owned(),
        date_of_birth: dob.to_owned(),
        time_of_birth: parts.next().unwrap_or_default().to_owned(),
        gender: parts.next().unwrap_or_default().to_owned(),
    })
}

/// `reading palm <analysis>`, `reading tarot <card,card,..> <text>` or
/// `reading horoscope <sign> <text>`.
fn parse_reading(args: &str) -> Result<ReadingResult, String> {
    const USAGE: &str = "usage: reading palm <analysis> | reading tarot <cards> <text> \
                         | reading horoscope <sign> <text>";

    let (kind, rest) = args.split_once(char::is_whitespace).ok_or(USAGE)?;
    let rest = rest.trim();
    match kind {
        "palm" if !rest.is_empty() => Ok(ReadingResult::Palm {
            analysis: rest.to_owned(),
        }),
        "tarot" => {
            let (cards, text) = rest.split_once(char::is_whitespace).ok_or(USAGE)?;
            Ok(ReadingResult::Tarot {
                question: None,
                cards: cards.split(',').map(str::to_owned).collect(),
                interpretation: text.trim().to_owned(),
            })
        }
        "horoscope" => {
            let (sign, text) = rest.split_once(char::is_whitespace).ok_or(USAGE)?;
            Ok(ReadingResult::Horoscope {
                sign: sign.to_owned(),
                guidance: text.trim().to_owned(),
            })
        }
        _ => Err(USAGE.into()),
    }
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------

/// Run the interactive shell.
pub async fn cmd_run(config: &Config) -> Result<()> {
    info!("starting Palm Reader");

    let history = Arc::new(InMemoryHistory::new());
    let app = start_app(config, history.clone()).await?;

    println!();
    println!("  Palm Reader v{}", env!("CARGO_PKG_VERSION"));
    println!("  Screen: {}", app.session.current_view());
    println!("  Type 'help' for commands, or 'quit' to exit.");
    println!();

    let stdin = io::stdin();
    let mut line_buf = String::new();

    loop {
        print!("[{}]> ", app.session.current_view());
        io::stdout().flush().ok();

        line_buf.clear();
        match stdin.read_line(&mut line_buf) {
            Ok(0) => {
                println!();
                info!("EOF received, exiting");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("  Error reading input: {e}");
                continue;
            }
        }

        let trimmed = line_buf.trim();
        if trimmed.is_empty() {
            continue;
        }

        let command = match parse(trimmed) {
            Ok(command) => command,
            Err(msg) => {
                println!("  {msg}");
                continue;
            }
        };
        if command == Command::Quit {
            info!("user requested exit");
            break;
        }

        dispatch(&app, &history, command).await;
    }

    info!("shutting down");
    Ok(())
}

async fn dispatch(app: &App, history: &InMemoryHistory, command: Command) {
    match command {
        Command::Help => print_help(),
        Command::Status => {
            let state = app.session.snapshot();
            println!("  Screen:   {}", state.view);
            println!("  Language: {}", state.language);
            let profile = if app.user.is_profile_complete() {
                "complete"
            } else {
                "missing"
            };
            println!("  Profile:  {profile}");
            println!("  Readings: {}", app.user.readings().len());
        }
        Command::Go(view) => app.session.navigate_to(view, true),
        Command::Back => {
            // At the bottom of the stack the gesture still reaches the app.
            if !history.back() {
                app.session.handle_history(HistorySignal::back(None));
            }
            if app.session.exit().should_prompt() {
                println!("  Press back again to exit");
            }
        }
        Command::Forward => {
            if !history.forward() {
                println!("  (no later screen)");
            }
        }
        Command::Onboard => {
            if let Err(e) = app.session.complete_onboarding().await {
                println!("  Error: {e}");
            }
        }
        Command::Profile(profile) => {
            let complete = profile.is_complete();
            let outcome = app.user.update_profile(profile).await;
            match outcome {
                MutationOutcome::Saved => {
                    println!("  Profile saved.");
                    if complete && app.session.current_view() == View::ProfileSetup {
                        app.session.navigate_to(View::Dashboard, true);
                    }
                }
                MutationOutcome::Failed { reason } => {
                    println!("  Could not save profile: {reason}");
                }
            }
        }
        Command::Reading(result) => match app.user.add_reading(NewReading::new(result)).await {
            Ok(reading) => println!("  Saved {} reading {}", reading.kind(), reading.id),
            Err(e) => println!("  Error: {e}"),
        },
        Command::Readings => {
            let readings = app.user.readings();
            if readings.is_empty() {
                println!("  No readings yet.");
            }
            for reading in readings {
                println!("  {}  {:<9}  {}", reading.timestamp, reading.kind(), reading.id);
            }
        }
        Command::ClearReadings => match app.user.clear_readings().await {
            Ok(()) => println!("  Reading history cleared."),
            Err(e) => println!("  Error: {e}"),
        },
        Command::Chat(message) => {
            let language = app.session.language();
            match app.conversation.send(&message, &language).await {
                Ok(reply) => println!("  {}", reply.content),
                Err(e) => {
                    warn!(error = %e, "chat failed");
                    println!("  The guide is unavailable: {e}");
                }
            }
        }
        Command::ChatHistory => match app.conversation.history().await {
            Ok(messages) => {
                for m in messages {
                    println!("  [{}] {}", m.role.as_str(), m.content);
                }
            }
            Err(e) => println!("  Error: {e}"),
        },
        Command::ClearChat => match app.conversation.clear().await {
            Ok(()) => println!("  Chat history cleared."),
            Err(e) => println!("  Error: {e}"),
        },
        Command::Language(code) => {
            if let Err(e) = app.session.change_language(&code).await {
                println!("  Error: {e}");
            }
        }
        Command::Quit => {}
    }
}

fn print_help() {
    println!();
    println!("  Available commands:");
    println!("    go <screen>                   - Open a screen (dashboard, tarot, ...)");
    println!("    back / forward                - Platform history navigation");
    println!("    onboard                       - Finish onboarding");
    println!("    profile <name> <dob> [tob] [gender]");
    println!("    reading palm <analysis>");
    println!("    reading tarot <cards> <text>");
    println!("    reading horoscope <sign> <text>");
    println!("    readings [clear]              - List or clear saved readings");
    println!("    chat [<message> | clear]      - Talk to the guide, or show history");
    println!("    lang <code>                   - Change language");
    println!("    status                        - Show session state");
    println!("    quit / exit                   - Leave the shell");
    println!();
}

// ── tests ────────────────────────────────────────────────────────────
