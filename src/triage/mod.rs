//! Line triage: walk through a text file and move each line into a category file named after a
//! letter (`storedU.txt`, `storedD.txt`, ...). The source file is rewritten with the lines that
//! are left once the session finishes.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{AsyncBufRead, AsyncWrite, AsyncWriteExt},
};
use tracing::{debug, error, info};

use crate::utils::console::Console;

/// File a line sorted under `letter` is appended to.
pub fn category_file_name(letter: char) -> String {
    format!("stored{}.txt", letter.to_ascii_uppercase())
}

pub struct LineTriage {
    source: PathBuf,
    output_dir: PathBuf,
    lines: Vec<String>,
    current: usize,
    modified: bool,
}

/// Where a sorted line went.
#[derive(Debug, PartialEq, Eq)]
pub struct SortedLine {
    pub line: String,
    pub category_file: PathBuf,
}

impl LineTriage {
    pub async fn load(source: PathBuf, output_dir: PathBuf) -> Result<Self> {
        let content = tokio::fs::read_to_string(&source)
            .await
            .with_context(|| format!("Could not open file {source:?}"))?;
        let lines = content.lines().map(str::to_string).collect::<Vec<_>>();
        info!("Loaded {} lines from {source:?}", lines.len());
        Ok(Self {
            source,
            output_dir,
            lines,
            current: 0,
            modified: false,
        })
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn current_line(&self) -> Option<&str> {
        self.lines.get(self.current).map(String::as_str)
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn up(&mut self) {
        self.current = self.current.saturating_sub(1);
    }

    pub fn down(&mut self) {
        if self.current + 1 < self.lines.len() {
            self.current += 1;
        }
    }

    /// Moves the current line into the category file for `letter`. Returns `None` when there
    /// is nothing left to sort.
    pub async fn sort_current(&mut self, letter: char) -> Result<Option<SortedLine>> {
        if !letter.is_ascii_alphabetic() {
            bail!("Lines can only be sorted by a letter, got {letter:?}");
        }
        let Some(line) = self.lines.get(self.current).cloned() else {
            return Ok(None);
        };

        let category_file = self.output_dir.join(category_file_name(letter));
        append_line(&category_file, &line).await?;

        self.lines.remove(self.current);
        self.modified = true;
        self.current = self.current.min(self.lines.len().saturating_sub(1));
        debug!("Moved {line:?} to {category_file:?}");

        Ok(Some(SortedLine {
            line,
            category_file,
        }))
    }

    /// Rewrites the source file with the remaining lines.
    pub async fn save(&mut self) -> Result<()> {
        let mut content = self.lines.join("\n");
        if !self.lines.is_empty() {
            content.push('\n');
        }
        tokio::fs::write(&self.source, content)
            .await
            .with_context(|| format!("Could not save file {:?}", self.source))?;
        self.modified = false;
        info!("Saved {} remaining lines to {:?}", self.lines.len(), self.source);
        Ok(())
    }

    /// Saves the source file if anything was sorted out of it.
    pub async fn finish(&mut self) -> Result<()> {
        if self.modified {
            self.save().await?;
        }
        Ok(())
    }
}

async fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut file = File::options()
        .create(true)
        .append(true)
        .open(path)
        .await
        .with_context(|| format!("Could not write to {path:?}"))?;
    file.lock_exclusive()?;
    let result = async {
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await
    }
    .await;
    file.unlock_async().await?;
    Ok(result?)
}

/// A single command typed during a triage session.
#[derive(Debug, PartialEq, Eq)]
pub enum TriageCommand {
    Up,
    Down,
    Sort(char),
    Save,
    Quit,
    Help,
}

impl TriageCommand {
    /// `k`/`j` would collide with category letters, so navigation uses `-`/`+`
    /// (or `<`/`>`), and the remaining commands start with `:`.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        match input {
            "-" | "<" => Some(Self::Up),
            "+" | ">" | "" => Some(Self::Down),
            ":w" | ":save" => Some(Self::Save),
            ":q" | ":quit" => Some(Self::Quit),
            "?" | ":help" => Some(Self::Help),
            _ => {
                let mut chars = input.chars();
                match (chars.next(), chars.next()) {
                    (Some(letter), None) if letter.is_ascii_alphabetic() => {
                        Some(Self::Sort(letter.to_ascii_lowercase()))
                    }
                    _ => None,
                }
            }
        }
    }
}

/// Runs an interactive triage session. The source file is saved on exit when modified, also
/// when the session fails, so sorted lines never stay in both files.
pub async fn run_triage_session<R, W>(
    triage: &mut LineTriage,
    labels: &BTreeMap<char, String>,
    console: &mut Console<R, W>,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let result = triage_loop(triage, labels, console).await;
    let finished = triage.finish().await;
    if let (Err(_), Err(e)) = (&result, &finished) {
        error!("Could not save triaged file after a failed session {e:?}");
    }
    result.and(finished)
}

async fn triage_loop<R, W>(
    triage: &mut LineTriage,
    labels: &BTreeMap<char, String>,
    console: &mut Console<R, W>,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let file_name = triage
        .source()
        .file_name()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_default();
    console
        .println(format!("File: {file_name} ({} lines)", triage.lines().len()))
        .await?;
    print_help(labels, console).await?;

    loop {
        let Some(line) = triage.current_line().map(str::to_string) else {
            console.println("No lines left.").await?;
            break;
        };
        let prompt = format!(
            "{:4}/{}: {}\n> ",
            triage.current() + 1,
            triage.lines().len(),
            ansi_term::Style::new().reverse().paint(line)
        );
        let Some(input) = console.prompt(&prompt).await? else {
            break;
        };

        match TriageCommand::parse(&input) {
            Some(TriageCommand::Up) => triage.up(),
            Some(TriageCommand::Down) => triage.down(),
            Some(TriageCommand::Sort(letter)) => {
                if let Some(sorted) = triage.sort_current(letter).await? {
                    let label = labels
                        .get(&letter)
                        .map(|v| format!(" ({v})"))
                        .unwrap_or_default();
                    console
                        .println(format!(
                            "Line moved to {}{label}. {} lines remaining.",
                            category_file_name(letter),
                            triage.lines().len()
                        ))
                        .await?;
                    debug!("Sorted {:?}", sorted.line);
                }
            }
            Some(TriageCommand::Save) => {
                triage.save().await?;
                console.println("File saved successfully").await?;
            }
            Some(TriageCommand::Quit) => break,
            Some(TriageCommand::Help) => print_help(labels, console).await?,
            None => console.println(format!("Unknown command {input:?}")).await?,
        }
    }
    Ok(())
}

async fn print_help<R, W>(labels: &BTreeMap<char, String>, console: &mut Console<R, W>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    console
        .println("Type a letter (a-z) to sort the line into its file, '-'/'+' to move, ':w' to save, ':q' to quit.")
        .await?;
    let categories = labels
        .iter()
        .map(|(letter, label)| format!("{letter}={label}"))
        .collect::<Vec<_>>()
        .join(" ");
    if !categories.is_empty() {
        console.println(format!("Categories: {categories}")).await?;
    }
    Ok(())
}
