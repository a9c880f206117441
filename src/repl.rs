// src/repl.rs
use log::{debug, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::task::JoinHandle;

use crate::app::{App, PendingGeneration};
use crate::errors::ImagineError;
use crate::models::{AspectRatio, ImagePayload};
use crate::services::{ErrorKind, GenerationError};

const HELP: &str = "\
Type a description and press Enter to generate.
  /ratio <w:h>     choose 1:1, 16:9, 9:16, 4:3 or 3:4
  /go              generate from the current draft
  /voice           dictate, appending to the draft
  /pick <n>        show history entry n
  /history [json]  list the session history
  /full            toggle fullscreen
  /download        save the current image
  /share           share the current image
  /quit            leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Prompt(String),
    Generate,
    Ratio(AspectRatio),
    Voice,
    Pick(usize),
    History { json: bool },
    Fullscreen,
    Download,
    Share,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Option<Command>, ImagineError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Some(Command::Prompt(line.to_string())));
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        let command = match name {
            "go" | "generate" => Command::Generate,
            "ratio" => Command::Ratio(arg.parse()?),
            "voice" | "mic" => Command::Voice,
            "pick" => Command::Pick(arg.parse().map_err(|_| {
                ImagineError::Validation(format!("Expected a history number, got '{}'", arg))
            })?),
            "history" => Command::History { json: arg == "json" },
            "full" | "fullscreen" => Command::Fullscreen,
            "download" | "save" => Command::Download,
            "share" => Command::Share,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => {
                return Err(ImagineError::Validation(format!(
                    "Unknown command '/{}', try /help",
                    other
                )));
            }
        };
        Ok(Some(command))
    }
}

type InFlight = (PendingGeneration, JoinHandle<Result<ImagePayload, GenerationError>>);

fn spawn_generation(app: &mut App) -> Result<InFlight, String> {
    let pending = app.begin_generation().map_err(|e| e.to_string())?;
    let generator = app.generator();
    let prompt = pending.prompt.clone();
    let ratio = pending.aspect_ratio;
    let handle = tokio::spawn(async move { generator.generate(&prompt, ratio).await });
    Ok((pending, handle))
}

async fn print(text: &str) -> std::io::Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(text.as_bytes()).await?;
    if !text.ends_with('\n') {
        stdout.write_all(b"\n").await?;
    }
    stdout.flush().await
}

/// Runs the interactive session until `/quit` or end of input. A generation
/// runs in the background, so history can be browsed while it is pending.
pub async fn run(mut app: App) -> Result<(), ImagineError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut in_flight: Option<InFlight> = None;

    print(&app.render()).await?;

    loop {
        let finished = async {
            match in_flight.as_mut() {
                Some((_, handle)) => handle.await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            joined = finished => {
                if let Some((pending, _)) = in_flight.take() {
                    let result = joined.unwrap_or_else(|e| {
                        warn!("Generation task ended abnormally: {}", e);
                        Err(GenerationError::new(ErrorKind::Unknown, 0))
                    });
                    app.finish_generation(pending, result);
                    print(&app.render()).await?;
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("End of input");
                    break;
                };

                let command = match Command::parse(&line) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(e) => {
                        print(&e.to_string()).await?;
                        continue;
                    }
                };

                let notice = match command {
                    Command::Quit => break,
                    Command::Help => Some(HELP.to_string()),
                    Command::Prompt(text) => {
                        if app.state().accepts_submit() {
                            app.set_draft(text);
                        }
                        match spawn_generation(&mut app) {
                            Ok(started) => {
                                in_flight = Some(started);
                                None
                            }
                            Err(message) => Some(message),
                        }
                    }
                    Command::Generate => match spawn_generation(&mut app) {
                        Ok(started) => {
                            in_flight = Some(started);
                            None
                        }
                        Err(message) => Some(message),
                    },
                    Command::Ratio(ratio) => app.select_ratio(ratio).err().map(|e| e.to_string()),
                    Command::Voice => app.dictate().await.err().map(|e| e.to_string()),
                    Command::Pick(index) => app.pick_history(index).err().map(|e| e.to_string()),
                    Command::History { json: true } => Some(app.history_json()?),
                    Command::History { json: false } => None,
                    Command::Fullscreen => {
                        app.toggle_fullscreen();
                        None
                    }
                    Command::Download => Some(match app.download().await {
                        Ok(path) => format!("Saved to {}", path.display()),
                        Err(e) => e.to_string(),
                    }),
                    Command::Share => app.share().await.err().map(|e| e.to_string()),
                };

                print(&app.render()).await?;
                if let Some(notice) = notice {
                    print(&notice).await?;
                }
            }
        }
    }

    if let Some((pending, handle)) = in_flight {
        debug!("Waiting for request {} before exit", pending.ticket);
        if let Ok(result) = handle.await {
            app.finish_generation(pending, result);
        }
    }

    Ok(())
}
