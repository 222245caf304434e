//! Append-only to-do log.
//!
//!  - Entries are single lines in a plain text file, oldest first.
//!  - There is a single writer. Every write opens the file, takes an exclusive lock, appends and
//!    releases the lock before the handle is dropped.
//!  - Reading the most recent entries only touches the tail of the file.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use fs4::tokio::AsyncFileExt;
use tokio::{fs::File, io::AsyncWriteExt};
use tracing::{debug, info};

use crate::{fs::operations::read_last_lines, utils::console::Console};

pub const TODO_FILE_NAME: &str = "todo.txt";

pub struct TodoLog {
    path: PathBuf,
}

impl TodoLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `text` as a new entry. Blank text is ignored and `false` is returned.
    pub async fn append(&self, text: &str) -> Result<bool> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(false);
        }
        // One entry per line, always.
        let mut line = text.replace(['\n', '\r'], " ");
        line.push('\n');

        let mut file = File::options()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Couldn't open to-do log {:?}", self.path))?;

        file.lock_exclusive()?;
        let result = async {
            file.write_all(line.as_bytes()).await?;
            file.flush().await
        }
        .await;
        file.unlock_async().await?;
        result?;

        info!("Added to-do entry {text:?}");
        Ok(true)
    }

    /// Returns up to `limit` entries, newest first. A missing log has no entries.
    pub async fn recent(&self, limit: usize) -> Result<Vec<String>> {
        let mut file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("To-do log {:?} doesn't exist yet", self.path);
                return Ok(vec![]);
            }
            Err(e) => return Err(e.into()),
        };

        file.lock_shared()?;
        let result = read_last_lines(&mut file, limit).await;
        file.unlock_async().await?;
        Ok(result?)
    }
}

/// Reads entries from the console until `quit`/`exit` or end of input.
pub async fn run_todo_session<R, W>(log: &TodoLog, console: &mut Console<R, W>) -> Result<()>
where
    R: tokio::io::AsyncBufRead + Unpin,
    W: tokio::io::AsyncWrite + Unpin,
{
    console.println("--- Simple To-Do ---").await?;
    console
        .println("Type what you want to do and press Enter. Type 'quit' or 'exit' to stop.")
        .await?;

    while let Some(input) = console.prompt("> ").await? {
        if matches!(input.trim().to_lowercase().as_str(), "quit" | "exit") {
            break;
        }
        log.append(&input).await?;
    }

    console.println("Goodbye!").await?;
    Ok(())
}
