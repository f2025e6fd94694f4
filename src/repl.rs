//! Line-oriented chat loop.
//!
//! Input lines are read while a request runs in its own task, so slash
//! commands stay responsive. Normal output goes to `out`; failures go to
//! stderr.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::JoinHandle;

use crate::ai::ChatReply;
use crate::config::Settings;
use crate::error::ChatError;
use crate::export::ExportFormat;
use crate::render::Renderer;
use crate::session::ChatSession;
use crate::state::ChatMessage;

pub const CHAT_HELP: &str = "\
Commands:
  /export <json|md|txt|pdf|doc> [dir]   save the conversation
  /clear                                clear the conversation
  /history                              print the conversation
  /settings                             print settings
  /set <key> <value>                    change a setting
  /quit                                 leave";

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

type PendingReply = JoinHandle<crate::error::Result<ChatReply>>;

/// Parse an export format name, rejecting unknown ones.
pub fn parse_format(name: &str) -> Result<ExportFormat> {
    ExportFormat::from_name(name)
        .ok_or_else(|| anyhow!("Invalid format selected: {:?}. Choose json, md, txt, pdf or doc.", name))
}

/// Print a reply, ringing the bell when sound is on.
pub fn write_reply<W: Write>(
    out: &mut W,
    message: &ChatMessage,
    settings: &Settings,
    renderer: &Renderer,
) -> Result<()> {
    writeln!(out, "{}\n", renderer.render(message, settings))?;
    if settings.sound {
        write!(out, "\x07")?;
    }
    Ok(())
}

pub fn write_history<W: Write>(out: &mut W, session: &ChatSession, renderer: &Renderer) -> Result<()> {
    if session.messages().is_empty() {
        writeln!(out, "No messages yet.")?;
        return Ok(());
    }
    for message in session.messages() {
        writeln!(out, "{}\n", renderer.render(message, session.settings()))?;
    }
    Ok(())
}

/// Run the chat loop until `/quit` or end of input. At end of input a
/// request still in flight is waited for and its outcome shown; `/quit`
/// abandons it.
pub async fn run_chat<R, W>(session: &mut ChatSession, input: R, out: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let renderer = Renderer::new();
    let mut lines = input.lines();
    let mut pending: Option<PendingReply> = None;
    let mut input_open = true;

    writeln!(
        out,
        "devchat: {} ({} messages). /help for commands.",
        session.client().base_url(),
        session.messages().len()
    )?;

    while input_open || pending.is_some() {
        tokio::select! {
            line = lines.next_line(), if input_open => {
                let Some(line) = line? else {
                    input_open = false;
                    continue;
                };
                let line = line.trim_end();

                if let Some(command) = line.strip_prefix('/') {
                    if handle_command(session, &renderer, command, out).await? == Flow::Quit {
                        if let Some(handle) = pending.take() {
                            handle.abort();
                            session.cancel_submit();
                        }
                        break;
                    }
                    // /clear drops the in-flight turn
                    if !session.is_busy() {
                        if let Some(handle) = pending.take() {
                            handle.abort();
                        }
                    }
                    continue;
                }

                match session.begin_submit(line) {
                    Ok(request) => {
                        let client = session.client().clone();
                        pending = Some(tokio::spawn(async move { client.send(&request).await }));
                        writeln!(out, "Thinking...")?;
                    }
                    Err(ChatError::EmptyInput) => {}
                    Err(e) => eprintln!("{}", e.user_message()),
                }
            }
            joined = async {
                match pending.as_mut() {
                    Some(handle) => handle.await,
                    None => std::future::pending().await,
                }
            }, if pending.is_some() => {
                pending = None;
                let result = joined.unwrap_or_else(|e| Err(ChatError::Transport(e.to_string())));
                match session.finish_submit(result) {
                    Ok(reply) => write_reply(out, &reply, session.settings(), &renderer)?,
                    Err(e) => eprintln!("{}", e.user_message()),
                }
            }
        }
    }

    out.flush()?;
    Ok(())
}

async fn handle_command<W: Write>(
    session: &mut ChatSession,
    renderer: &Renderer,
    command: &str,
    out: &mut W,
) -> Result<Flow> {
    let mut parts = command.split_whitespace();
    match parts.next().unwrap_or("") {
        "quit" | "exit" | "q" => return Ok(Flow::Quit),
        "help" => writeln!(out, "{}", CHAT_HELP)?,
        "history" => write_history(out, session, renderer)?,
        "settings" => writeln!(out, "{}", serde_json::to_string_pretty(session.settings())?)?,
        "set" => {
            let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
                eprintln!("usage: /set <key> <value>");
                return Ok(Flow::Continue);
            };
            let mut next = session.settings().clone();
            let outcome = next
                .set(key, value)
                .map_err(anyhow::Error::from)
                .and_then(|_| session.update_settings(next));
            match outcome {
                Ok(()) => writeln!(out, "{} updated", key)?,
                Err(e) => eprintln!("{:#}", e),
            }
        }
        "clear" => match session.clear_history().await {
            Ok(()) => writeln!(out, "Chat history cleared")?,
            Err(e) => eprintln!("Failed to clear history ({})", e),
        },
        "export" => {
            let name = parts.next().unwrap_or("json");
            let dir = parts.next().map_or_else(|| PathBuf::from("."), PathBuf::from);
            match parse_format(name) {
                Ok(format) => match session.export(format, &dir) {
                    Ok(path) => writeln!(out, "Chat exported successfully! {}", path.display())?,
                    Err(e) => eprintln!("{}", e.user_message()),
                },
                Err(e) => eprintln!("{}", e),
            }
        }
        other => eprintln!("unknown command /{}\n{}", other, CHAT_HELP),
    }
    Ok(Flow::Continue)
}
