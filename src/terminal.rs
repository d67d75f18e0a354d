//! Line-oriented terminal front end for the chat client.
//!
//! Each stdin line is either a command (`/group <name>`, `/quit`) or message
//! text to submit. The rendered view is reprinted whenever it changes.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast::error::RecvError;

use crate::chat::{ChatClient, ChatView, ClientEvent, SubmitOutcome};
use crate::message::{Group, UnknownGroup};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Send(String),
    SelectGroup(Group),
    Quit,
}

/// Parse one input line. Group names match case-insensitively.
///
/// # Errors
///
/// Returns [`UnknownGroup`] when `/group` names no known group.
pub fn parse_line(line: &str) -> Result<Command, UnknownGroup> {
    let trimmed = line.trim();
    if trimmed == "/quit" {
        return Ok(Command::Quit);
    }
    if let Some(name) = trimmed.strip_prefix("/group") {
        let name = name.trim();
        return Group::ALL
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(name))
            .map(Command::SelectGroup)
            .ok_or_else(|| UnknownGroup(name.to_owned()));
    }
    Ok(Command::Send(line.to_owned()))
}

/// Drive `client` from `input` until `/quit` or end of input, writing views
/// and notices to `output`.
///
/// # Errors
///
/// Returns an error if reading input or writing output fails.
pub async fn run_session<R, W>(client: &ChatClient, input: R, mut output: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut snapshots = client.subscribe();
    let mut events = client.events();

    let mut last_view = ChatView::from_state(&snapshots.borrow_and_update());
    write_out(&mut output, &last_view.to_text()).await?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match parse_line(&line) {
                    Ok(Command::Quit) => break,
                    Ok(Command::SelectGroup(group)) => client.select_group(group),
                    Ok(Command::Send(text)) => {
                        client.set_input(text);
                        if client.submit() == SubmitOutcome::Ignored {
                            client.set_input(String::new());
                        }
                    }
                    Err(e) => write_out(&mut output, &format!("! {e}\n")).await?,
                }
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = ChatView::from_state(&snapshots.borrow_and_update());
                if view != last_view {
                    write_out(&mut output, &view.to_text()).await?;
                    last_view = view;
                }
            }
            event = events.recv() => match event {
                Ok(ClientEvent::SendFailed { id, error }) => {
                    write_out(&mut output, &format!("! send #{id} failed: {error}\n")).await?;
                }
                Ok(ClientEvent::FocusInput) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
        }
    }
    Ok(())
}

async fn write_out<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> std::io::Result<()> {
    output.write_all(text.as_bytes()).await?;
    output.flush().await
}

#[cfg(test)]
#[path = "terminal_test.rs"]
mod tests;
