//! Line-oriented player console.
//!
//! The desktop binary has no play screen; these commands stand in for the
//! taps and form submissions a mobile shell would send.

use std::path::PathBuf;
use std::str::FromStr;

use geoquest_domain::{DomainError, EntityId, HintSlot, PursuitKind};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const HELP: &str = "\
commands:
  select <treasure|quest> <entityId>   make a known pursuit active
  refresh <treasure|quest>             reload play records from the backend
  ack                                  finish a TALK step
  answer <text>                        answer an input puzzle
  here                                 answer a location puzzle from the current position
  photo <path>                         answer a photo puzzle
  hint <1|2|3>                         buy a hint
  retry                                retry a failed step advance
  resume                               re-query the backend cursor
  leave                                leave the play screen
  abandon                              forget the active pursuit
  background | foreground              toggle app visibility
  status                               print where play stands
  help";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Select(PursuitKind, EntityId),
    Refresh(PursuitKind),
    Ack,
    Answer(String),
    Here,
    Photo(PathBuf),
    Hint(HintSlot),
    Retry,
    Resume,
    Leave,
    Abandon,
    Background,
    Foreground,
    Status,
    Help,
}

impl FromStr for Command {
    type Err = DomainError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };
        let require = |what: &str| -> Result<&str, DomainError> {
            if rest.is_empty() {
                Err(DomainError::parse(format!("{} expects {}", verb, what)))
            } else {
                Ok(rest)
            }
        };

        match verb.to_ascii_lowercase().as_str() {
            "select" => {
                let mut parts = require("<kind> <entityId>")?.split_whitespace();
                let kind = parts.next().unwrap_or_default().parse()?;
                let entity = parts
                    .next()
                    .ok_or_else(|| DomainError::parse("select expects <kind> <entityId>"))?;
                Ok(Command::Select(kind, EntityId::from(entity)))
            }
            "refresh" => Ok(Command::Refresh(require("<kind>")?.parse()?)),
            "ack" | "ok" => Ok(Command::Ack),
            "answer" => Ok(Command::Answer(require("<text>")?.to_string())),
            "here" => Ok(Command::Here),
            "photo" => Ok(Command::Photo(PathBuf::from(require("<path>")?))),
            "hint" => {
                let index: u8 = require("<1|2|3>")?
                    .parse()
                    .map_err(|_| DomainError::parse(format!("not a hint number: {}", rest)))?;
                Ok(Command::Hint(HintSlot::new(index)?))
            }
            "retry" => Ok(Command::Retry),
            "resume" => Ok(Command::Resume),
            "leave" => Ok(Command::Leave),
            "abandon" => Ok(Command::Abandon),
            "background" | "bg" => Ok(Command::Background),
            "foreground" | "fg" => Ok(Command::Foreground),
            "status" => Ok(Command::Status),
            "help" | "?" => Ok(Command::Help),
            other => Err(DomainError::parse(format!("unknown command: {}", other))),
        }
    }
}

/// Read commands from stdin until EOF or until the receiver goes away.
pub fn spawn_stdin_reader(commands: mpsc::Sender<Command>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => match line.parse::<Command>() {
                    Ok(command) => {
                        if commands.send(command).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => eprintln!("{}", e),
                },
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "Reading console input failed");
                    break;
                }
            }
        }
        tracing::debug!("Console input closed");
    })
}

/// Guess an image content type from a file extension.
pub fn image_content_type(path: &std::path::Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        _ => "image/jpeg",
    }
}
