//! One-shot "say" command

use std::error::Error;
use std::io::{self, Write};

use tracing::info;

use crate::cli::{build_session, prompt_messages};
use crate::core::config::ResolvedConfig;
use crate::core::session::StreamUpdate;
use crate::utils::logging::LoggingState;

pub async fn run_say(
    prompt: Vec<String>,
    settings: &ResolvedConfig,
    log_file: Option<String>,
) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        eprintln!("Usage: promptstream say <prompt>");
        std::process::exit(1);
    }

    let logging = LoggingState::new(log_file)?;
    let mut session = build_session(settings)?;
    session.start_with_messages(prompt_messages(&prompt, settings));
    logging.log_message(&format!("> {prompt}"))?;

    let mut stdout = io::stdout();
    while let Some(update) = session.next_update().await {
        match update {
            StreamUpdate::Fragment { text, .. } => {
                write!(stdout, "{text}")?;
                stdout.flush()?;
            }
            StreamUpdate::Completed { text, completion } => {
                writeln!(stdout)?;
                logging.log_message(&text)?;
                if let Some(completion) = completion {
                    info!(
                        done_reason = completion.done_reason.as_deref().unwrap_or("-"),
                        eval_count = completion.eval_count,
                        prompt_eval_count = completion.prompt_eval_count,
                        "reply finished"
                    );
                }
                return Ok(());
            }
            StreamUpdate::Failed { error, partial } => {
                if !partial.is_empty() {
                    writeln!(stdout)?;
                    eprintln!("⚠️  Reply incomplete");
                    logging.log_message(&partial)?;
                }
                eprintln!("❌ Error: {error}");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
