//! Line-based chat on stdin.
//!
//! Every prompt starts a new request. A prompt entered while a reply is
//! still streaming supersedes that reply; nothing more of it is printed.

use std::error::Error;
use std::io::{self, Write};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::cli::{build_session, prompt_messages};
use crate::core::builtin_models::find_builtin_model;
use crate::core::config::ResolvedConfig;
use crate::core::session::{StreamSession, StreamUpdate};
use crate::utils::logging::LoggingState;

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ChatInput {
    Empty,
    Quit,
    Model(Option<String>),
    Log(Option<String>),
    Prompt(String),
}

pub(crate) fn parse_input(line: &str) -> ChatInput {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ChatInput::Empty;
    }

    let Some(command) = trimmed.strip_prefix('/') else {
        return ChatInput::Prompt(trimmed.to_string());
    };
    let (name, rest) = command
        .split_once(char::is_whitespace)
        .map_or((command, ""), |(name, rest)| (name, rest.trim()));
    let argument = (!rest.is_empty()).then(|| rest.to_string());

    match name {
        "quit" | "exit" | "q" => ChatInput::Quit,
        "model" => ChatInput::Model(argument),
        "log" => ChatInput::Log(argument),
        // Unknown slash words go to the model as-is.
        _ => ChatInput::Prompt(trimmed.to_string()),
    }
}

pub async fn run_chat(
    settings: &ResolvedConfig,
    log_file: Option<String>,
) -> Result<(), Box<dyn Error>> {
    let mut logging = LoggingState::new(log_file)?;
    let mut session = build_session(settings)?;

    eprintln!(
        "💬 Chatting with {} at {} (/quit to leave)",
        session.model(),
        session.endpoint()
    );
    if logging.is_active() {
        eprintln!("📝 Transcript: {}", logging.get_status_string());
    }

    let stdin = BufReader::new(tokio::io::stdin());
    chat_loop(stdin, &mut io::stdout(), &mut session, settings, &mut logging).await?;
    session.cancel_current_stream();
    Ok(())
}

/// Drive a chat from `input` until `/quit` or end of input.
///
/// End of input stops reading but not the reply in flight: it is drained to
/// its terminal update before returning.
pub(crate) async fn chat_loop<R, W>(
    input: R,
    out: &mut W,
    session: &mut StreamSession,
    settings: &ResolvedConfig,
    logging: &mut LoggingState,
) -> Result<(), Box<dyn Error>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    let mut input_open = true;

    while input_open || session.is_streaming() {
        tokio::select! {
            line = lines.next_line(), if input_open => {
                let Some(line) = line? else {
                    input_open = false;
                    continue;
                };
                match parse_input(&line) {
                    ChatInput::Empty => {}
                    ChatInput::Quit => break,
                    ChatInput::Model(None) => eprintln!("Current model: {}", session.model()),
                    ChatInput::Model(Some(model)) => {
                        if find_builtin_model(&model).is_none() {
                            eprintln!("⚠️  {model} is not in the built-in catalog; using it anyway");
                        }
                        session.set_model(model);
                        eprintln!("Model set to {}", session.model());
                    }
                    ChatInput::Log(path) => {
                        let result = match path {
                            Some(path) => logging.set_log_file(path),
                            None => logging.toggle_logging(),
                        };
                        match result {
                            Ok(message) => eprintln!("{message}"),
                            Err(err) => eprintln!("❌ {err}"),
                        }
                        eprintln!("📝 Transcript: {}", logging.get_status_string());
                    }
                    ChatInput::Prompt(prompt) => {
                        if session.is_streaming() {
                            writeln!(out)?;
                            eprintln!("↪ previous reply abandoned");
                        }
                        if let Err(err) = logging.log_message(&format!("> {prompt}")) {
                            eprintln!("Failed to log prompt: {err}");
                        }
                        session.start_with_messages(prompt_messages(&prompt, settings));
                    }
                }
            }
            Some(update) = session.next_update(), if session.is_streaming() => {
                match update {
                    StreamUpdate::Fragment { text, .. } => {
                        write!(out, "{text}")?;
                        out.flush()?;
                    }
                    StreamUpdate::Completed { text, .. } => {
                        writeln!(out)?;
                        if let Err(err) = logging.log_message(&text) {
                            eprintln!("Failed to log response: {err}");
                        }
                    }
                    StreamUpdate::Failed { error, partial } => {
                        if !partial.is_empty() {
                            writeln!(out)?;
                            eprintln!("⚠️  Reply incomplete");
                        }
                        eprintln!("❌ Error: {error}");
                    }
                }
            }
            else => break,
        }
    }

    Ok(())
}
