//! Time tracking log. The log is a JSON object mapping the moment a task was started to the task
//! itself. Keys are local RFC 3339 timestamps, see [timestamp_to_log_key].

use std::{collections::BTreeMap, io::ErrorKind, path::PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use fs4::tokio::AsyncFileExt;
use serde::Serialize;
use tokio::{
    fs::File,
    io::{AsyncBufRead, AsyncWrite, AsyncWriteExt},
};
use tracing::{info, warn};

use crate::utils::{
    clock::Clock,
    console::Console,
    time::{display_log_key, timestamp_to_log_key},
};

pub const TIME_LOG_FILE_NAME: &str = "time_log.json";

pub struct TimeLog {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl TimeLog {
    /// Loads the log from `path`. Missing and undecodable files both start an empty log; the
    /// latter is reported and will be overwritten on the next save.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Could not decode {path:?}, starting with an empty log: {e}");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("Couldn't read time log {path:?}"));
            }
        };
        Ok(Self { path, entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records `task` as started at `moment` and returns the key it was stored under.
    pub fn log(&mut self, task: &str, moment: DateTime<Local>) -> Result<String> {
        let task = task.trim();
        if task.is_empty() {
            bail!("Task cannot be empty");
        }
        let key = timestamp_to_log_key(&moment);
        self.entries.insert(key.clone(), task.to_string());
        Ok(key)
    }

    /// Up to `limit` entries, most recent first.
    pub fn recent(&self, limit: usize) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .rev()
            .take(limit)
            .map(|(key, task)| (key.as_str(), task.as_str()))
    }

    /// Writes the whole log as JSON indented with 4 spaces.
    pub async fn save(&self) -> Result<()> {
        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        self.entries.serialize(&mut serializer)?;

        let mut file = File::options()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .await
            .with_context(|| format!("Couldn't open time log {:?}", self.path))?;

        // Truncate only once the lock is held.
        file.lock_exclusive()?;
        let result = async {
            file.set_len(0).await?;
            file.write_all(&buffer).await?;
            file.flush().await
        }
        .await;
        file.unlock_async().await?;
        result?;
        Ok(())
    }
}

/// Formats recent entries as `[YYYY-MM-DD HH:MM:SS] task` lines.
pub fn format_recent(log: &TimeLog, limit: usize) -> Vec<String> {
    log.recent(limit)
        .map(|(key, task)| format!("[{}] {task}", display_log_key(key)))
        .collect()
}

/// Logs a single task right away and persists the log.
pub async fn track_once(log: &mut TimeLog, task: &str, clock: &dyn Clock) -> Result<String> {
    let key = log.log(task, clock.time())?;
    log.save().await?;
    info!("Logged task {task:?} at {key}");
    Ok(key)
}

/// Interactive tracking loop: each line is a task, `view` lists recent tasks, `exit` quits.
pub async fn run_tracker_session<R, W>(
    log: &mut TimeLog,
    clock: &dyn Clock,
    recent_limit: usize,
    console: &mut Console<R, W>,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    console.println("--- Time Tracker ---").await?;
    console
        .println("Type your task and press Enter to log it. Type 'view' to see recent tasks, 'exit' to quit.")
        .await?;

    while let Some(input) = console.prompt("What are you doing? > ").await? {
        let input = input.trim();
        match input.to_lowercase().as_str() {
            "exit" => break,
            "view" => print_recent(log, recent_limit, console).await?,
            "" => {
                console
                    .println("Task cannot be empty. Please enter something or type 'exit'.")
                    .await?
            }
            _ => {
                let moment = clock.time();
                log.log(input, moment)?;
                log.save().await?;
                console
                    .println(format!(
                        "Logged: '{input}' at {}",
                        moment.format("%Y-%m-%dT%H:%M:%S")
                    ))
                    .await?;
            }
        }
    }

    console.println("Exiting Time Tracker. Happy tracking!").await?;
    Ok(())
}

pub async fn print_recent<R, W>(
    log: &TimeLog,
    limit: usize,
    console: &mut Console<R, W>,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    if log.is_empty() {
        return console.println("No tasks logged yet.").await;
    }
    console.println("--- Recent Tasks ---").await?;
    for line in format_recent(log, limit) {
        console.println(line).await?;
    }
    console.println("--------------------").await
}
