use std::iter;

use ansi_term::Style;
use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{info, trace};

use crate::{
    entry::{CommandEntry, EntryEvent, EntryState, EventKind},
    matcher::FuzzyMatcher,
    utils::console::Console,
};

use super::{Args, Commands};

const HELP: &str = "Type to search commands. Empty line accepts, '+'/'-' move the selection, \
                    '.' hides suggestions, 'quit' leaves.";

/// Terminal input is line based, so each line maps to one entry event.
fn line_to_event(line: &str) -> EntryEvent {
    match line {
        "" => EntryEvent::Enter,
        "+" => EntryEvent::Down,
        "-" => EntryEvent::Up,
        "." => EntryEvent::Escape,
        _ => EntryEvent::TextChanged(line.to_string()),
    }
}

/// Renders the suggestion list with the selected entry highlighted.
pub fn render_suggestions(state: &EntryState) -> Vec<String> {
    if !state.is_visible() {
        return vec![];
    }
    state
        .suggestions()
        .iter()
        .enumerate()
        .map(|(i, suggestion)| {
            if state.selected() == Some(i) {
                Style::new().reverse().paint(format!("> {suggestion}")).to_string()
            } else {
                format!("  {suggestion}")
            }
        })
        .collect()
}

/// Parses a committed entry the same way the command line would be parsed.
fn parse_entry(accepted: &str) -> Result<Commands, clap::Error> {
    Args::try_parse_from(iter::once("jotter").chain(accepted.split_whitespace()))
        .map(|args| args.commands)
}

/// Runs the command entry until a command is accepted (returned) or the user leaves (`None`).
pub async fn run_prompt_session<R, W>(
    vocabulary: FuzzyMatcher,
    console: &mut Console<R, W>,
) -> Result<Option<Commands>>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut entry = CommandEntry::new(vocabulary);
    entry
        .on(EventKind::TextChanged, |state| {
            trace!(
                "{} suggestions for {:?}",
                state.suggestions().len(),
                state.query()
            )
        })
        .on_accept(|accepted| info!("Running {accepted:?} from the prompt"));

    console.println(HELP).await?;
    loop {
        let Some(line) = console.prompt("jotter> ").await? else {
            return Ok(None);
        };
        if matches!(line.trim(), "quit" | "exit") {
            return Ok(None);
        }

        let Some(accepted) = entry.dispatch(line_to_event(&line)) else {
            for suggestion in render_suggestions(entry.state()) {
                console.println(suggestion).await?;
            }
            continue;
        };

        match parse_entry(&accepted) {
            Ok(command) => return Ok(Some(command)),
            Err(e) => console.println(e.to_string()).await?,
        }
    }
}
