pub mod prompt;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use prompt::run_prompt_session;
use tokio::{
    io::{AsyncBufRead, AsyncWrite},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter};

use crate::{
    config::Settings,
    matcher::FuzzyMatcher,
    timer::{Countdown, CountdownOutcome, SystemAlarm},
    todo::{run_todo_session, TodoLog, TODO_FILE_NAME},
    tracker::{print_recent, run_tracker_session, track_once, TimeLog, TIME_LOG_FILE_NAME},
    triage::{run_triage_session, LineTriage},
    utils::{
        clock::DefaultClock,
        console::Console,
        dir::{create_application_default_path, ensure_dir},
        logging::enable_logging,
        minutes::Minutes,
        shutdown::detect_shutdown,
    },
};

#[derive(Parser, Debug)]
#[command(name = "jotter", version, long_about = None)]
#[command(about = "Small productivity tools: fuzzy command entry, to-do log, time tracker, line triage and a timer", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub commands: Commands,
    #[arg(
        long,
        global = true,
        env = "JOTTER_DIR",
        help = "Application directory. By default $XDG_DATA_HOME/jotter or $HOME/.local/share/jotter"
    )]
    pub dir: Option<PathBuf>,
    #[arg(long, global = true, help = "Print trace logs to the console")]
    pub log: bool,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    #[command(about = "Print the commands matching a fuzzy query, best first")]
    Complete {
        #[arg(default_value = "")]
        query: String,
    },
    #[command(about = "Interactive command entry with fuzzy autocompletion")]
    Prompt,
    #[command(about = "Add to the to-do log. Without text starts an interactive session")]
    Todo {
        text: Vec<String>,
        #[arg(short, long, help = "Show the most recent entries")]
        list: bool,
        #[arg(short = 'n', long, help = "How many entries to show")]
        limit: Option<usize>,
    },
    #[command(about = "Log what you are doing right now. Without a task starts an interactive session")]
    Track {
        task: Vec<String>,
        #[arg(short, long, help = "Show recently logged tasks")]
        view: bool,
        #[arg(short = 'n', long, help = "How many tasks to show")]
        limit: Option<usize>,
    },
    #[command(about = "Sort the lines of a text file into per-letter category files")]
    Triage {
        file: PathBuf,
        #[arg(long, help = "Directory for the category files. Defaults to the directory of FILE")]
        out: Option<PathBuf>,
    },
    #[command(about = "Count down the given amount of minutes and ring an alarm")]
    Timer { minutes: Minutes },
}

/// State shared by every command for the duration of one invocation.
pub struct App<R, W> {
    pub dir: PathBuf,
    pub settings: Settings,
    pub console: Console<R, W>,
}

impl<R: AsyncBufRead + Unpin, W: AsyncWrite + Unpin> App<R, W> {
    pub fn new(dir: PathBuf, console: Console<R, W>) -> Result<Self> {
        let settings = Settings::load(&dir)?;
        Ok(Self {
            dir,
            settings,
            console,
        })
    }

    /// Built in commands followed by the user's own vocabulary.
    pub fn vocabulary(&self) -> FuzzyMatcher {
        let builtin = Args::command()
            .get_subcommands()
            .map(|v| v.get_name().to_string())
            .filter(|v| v != "prompt")
            .collect::<Vec<_>>();
        FuzzyMatcher::new(builtin.into_iter().chain(self.settings.vocabulary.clone()))
    }

    /// Runs `command`. Commands accepted in the prompt return to the prompt afterwards; their
    /// failures are reported without ending the session.
    pub async fn run(&mut self, command: Commands) -> Result<()> {
        let mut pending = Some(command);
        let mut interactive = false;

        while let Some(command) = pending.take() {
            if command == Commands::Prompt {
                interactive = true;
                let vocabulary = self.vocabulary();
                pending = run_prompt_session(vocabulary, &mut self.console).await?;
                continue;
            }

            let result = self.execute(command).await;
            if interactive {
                if let Err(e) = result {
                    error!("Command failed {e:?}");
                    self.console.println(format!("Error: {e:#}")).await?;
                }
                pending = Some(Commands::Prompt);
            } else {
                result?;
            }
        }
        Ok(())
    }

    async fn execute(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Complete { query } => {
                for candidate in self.vocabulary().rank(&query) {
                    self.console.println(candidate).await?;
                }
                Ok(())
            }
            Commands::Prompt => Ok(()),
            Commands::Todo { text, list, limit } => {
                let log = TodoLog::new(self.dir.join(TODO_FILE_NAME));
                if list {
                    let limit = limit.unwrap_or(self.settings.recent_limit);
                    for entry in log.recent(limit).await? {
                        self.console.println(entry).await?;
                    }
                } else if text.is_empty() {
                    run_todo_session(&log, &mut self.console).await?;
                } else {
                    log.append(&text.join(" ")).await?;
                }
                Ok(())
            }
            Commands::Track { task, view, limit } => {
                let mut log = TimeLog::load(self.dir.join(TIME_LOG_FILE_NAME)).await?;
                let limit = limit.unwrap_or(self.settings.recent_limit);
                if view {
                    print_recent(&log, limit, &mut self.console).await?;
                } else if task.is_empty() {
                    run_tracker_session(&mut log, &DefaultClock, limit, &mut self.console).await?;
                } else {
                    let task = task.join(" ");
                    let key = track_once(&mut log, &task, &DefaultClock).await?;
                    self.console
                        .println(format!("Logged: '{task}' at {key}"))
                        .await?;
                }
                Ok(())
            }
            Commands::Triage { file, out } => {
                let out = match out {
                    Some(out) => ensure_dir(out)?,
                    None => file
                        .parent()
                        .filter(|v| !v.as_os_str().is_empty())
                        .map(|v| v.to_path_buf())
                        .unwrap_or_else(|| PathBuf::from(".")),
                };
                let mut triage = LineTriage::load(file, out).await?;
                run_triage_session(&mut triage, &self.settings.triage_labels, &mut self.console)
                    .await
            }
            Commands::Timer { minutes } => {
                let shutdown = CancellationToken::new();
                let watcher = tokio::spawn(detect_shutdown(shutdown.clone()));
                let countdown = Countdown::new(
                    minutes,
                    Box::new(DefaultClock),
                    Arc::new(SystemAlarm::new(self.settings.alarm_command.clone())),
                    shutdown.clone(),
                );

                let result = run_timer(countdown, &mut self.console).await;
                shutdown.cancel();
                watcher.await.context("Shutdown watcher panicked")?;
                result
            }
        }
    }
}

/// Shows the countdown on a single redrawn line, then waits for the alarm to finish.
async fn run_timer<R, W>(countdown: Countdown, console: &mut Console<R, W>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (ticks, mut received) = mpsc::unbounded_channel::<String>();
    let countdown = countdown.run(move |tick| {
        // The receiver outlives the countdown.
        ticks.send(tick.to_string()).ok();
    });
    let printer = async {
        while let Some(tick) = received.recv().await {
            // Redraw in place, padding over the longer previous text.
            console.write(&format!("\r{tick:<8}")).await?;
        }
        console.println("").await
    };
    let (outcome, ()) = tokio::try_join!(countdown, printer)?;

    match outcome {
        CountdownOutcome::Finished(alarm) => {
            console.println("ALARM! Time's up.").await?;
            alarm.wait().await;
        }
        CountdownOutcome::Stopped => info!("Timer stopped"),
    }
    Ok(())
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let dir = args
        .dir
        .map_or_else(create_application_default_path, ensure_dir)?;

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(&dir, logging_level, args.log)?;

    let mut app = App::new(dir, Console::stdio())?;
    app.run(args.commands).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;
    use clap::Parser;
    use tempfile::tempdir;
    use tokio_util::sync::CancellationToken;

    use super::{run_timer, App, Args, Commands};
    use crate::{
        config::SETTINGS_FILE_NAME,
        timer::{Countdown, MockAlarm},
        todo::{TodoLog, TODO_FILE_NAME},
        utils::{
            clock::DefaultClock,
            console::test_console::{output_of, scripted},
        },
    };

    #[test]
    fn test_parse_arguments() {
        let args = Args::try_parse_from(["jotter", "todo", "buy", "milk"]).unwrap();
        assert_eq!(
            args.commands,
            Commands::Todo {
                text: vec!["buy".into(), "milk".into()],
                list: false,
                limit: None,
            }
        );

        let args = Args::try_parse_from(["jotter", "timer", "1.5", "--log"]).unwrap();
        assert!(args.log);
        assert!(
            matches!(args.commands, Commands::Timer { minutes } if minutes.as_seconds() == 90)
        );

        assert!(Args::try_parse_from(["jotter", "timer", "0"]).is_err());
        assert!(Args::try_parse_from(["jotter", "triage"]).is_err());
    }

    #[tokio::test]
    async fn test_complete_ranks_vocabulary() -> Result<()> {
        let dir = tempdir()?;
        std::fs::write(
            dir.path().join(SETTINGS_FILE_NAME),
            r#"{ "vocabulary": ["show version", "set variable"] }"#,
        )?;
        let mut app = App::new(dir.path().to_path_buf(), scripted(""))?;

        app.run(Commands::Complete { query: "t".into() }).await?;
        app.run(Commands::Complete { query: "SV".into() }).await?;

        let output = output_of(app.console);
        assert_eq!(
            output,
            "todo\ntrack\ntimer\ntriage\ncomplete\nset variable\n\
             show version\nset variable\n"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_prompt_dispatches_accepted_command() -> Result<()> {
        let dir = tempdir()?;
        let mut app = App::new(
            dir.path().to_path_buf(),
            scripted("tod\n\nbuy milk\nexit\nquit\n"),
        )?;

        app.run(Commands::Prompt).await?;

        let log = TodoLog::new(dir.path().join(TODO_FILE_NAME));
        assert_eq!(log.recent(10).await?, vec!["buy milk"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_prompt_reports_failures_and_continues() -> Result<()> {
        let dir = tempdir()?;
        let mut app = App::new(
            dir.path().to_path_buf(),
            scripted("triage missing.txt\n\ntodo from prompt\n\nquit\n"),
        )?;

        app.run(Commands::Prompt).await?;

        let log = TodoLog::new(dir.path().join(TODO_FILE_NAME));
        assert_eq!(log.recent(10).await?, vec!["from prompt"]);
        assert!(output_of(app.console).contains("Error: Could not open file"));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_redraws_ticks_and_announces_alarm() -> Result<()> {
        let mut alarm = MockAlarm::new();
        alarm.expect_ring().times(1).returning(|| Ok(()));
        let countdown = Countdown::new(
            "0.05".parse()?,
            Box::new(DefaultClock),
            Arc::new(alarm),
            CancellationToken::new(),
        );
        let mut console = scripted("");

        run_timer(countdown, &mut console).await?;

        assert_eq!(
            output_of(console),
            "\r00:03   \r00:02   \r00:01   \r00:00   \rDone!   \nALARM! Time's up.\n"
        );
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_timer_does_not_announce_alarm() -> Result<()> {
        let mut alarm = MockAlarm::new();
        alarm.expect_ring().never();
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let countdown = Countdown::new(
            "1".parse()?,
            Box::new(DefaultClock),
            Arc::new(alarm),
            shutdown,
        );
        let mut console = scripted("");

        run_timer(countdown, &mut console).await?;

        assert_eq!(output_of(console), "\r01:00   \r00:00   \n");
        Ok(())
    }
}
