//! Countdown timer with an alarm.
//!
//! The countdown ticks once per second through [Clock] so tests can run it on paused time. When
//! it reaches zero the alarm is rung on a blocking background task that nobody has to wait for;
//! the returned [AlarmHandle] only exists so the binary can let the sound finish before exiting.

use std::{io::Write, process::Command, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::utils::{clock::Clock, minutes::Minutes, time::format_countdown};

pub const DONE_MESSAGE: &str = "Done!";

const TICK: Duration = Duration::from_secs(1);

/// Something that makes noise when a countdown finishes.
#[cfg_attr(test, mockall::automock)]
pub trait Alarm: Send + Sync + 'static {
    fn ring(&self) -> Result<()>;
}

/// Runs the configured alarm command and falls back to the terminal bell.
pub struct SystemAlarm {
    command: Option<Vec<String>>,
}

impl SystemAlarm {
    pub fn new(command: Option<Vec<String>>) -> Self {
        Self { command }
    }

    fn run_command(argv: &[String]) -> Result<()> {
        let Some((program, args)) = argv.split_first() else {
            bail!("Alarm command is empty");
        };
        let status = Command::new(program)
            .args(args)
            .status()
            .with_context(|| format!("Couldn't start alarm command {program:?}"))?;
        if !status.success() {
            bail!("Alarm command {program:?} exited with {status}");
        }
        Ok(())
    }

    fn bell() -> Result<()> {
        let mut stdout = std::io::stdout();
        stdout.write_all(b"\x07")?;
        stdout.flush()?;
        Ok(())
    }
}

impl Alarm for SystemAlarm {
    fn ring(&self) -> Result<()> {
        if let Some(argv) = &self.command {
            match Self::run_command(argv) {
                Ok(()) => return Ok(()),
                Err(e) => warn!("Falling back to the terminal bell: {e:?}"),
            }
        }
        Self::bell()
    }
}

/// Background alarm started by a finished countdown.
pub struct AlarmHandle(JoinHandle<()>);

impl AlarmHandle {
    /// Waits for the alarm to stop ringing. Alarm failures were already logged.
    pub async fn wait(self) {
        if let Err(e) = self.0.await {
            warn!("Alarm task failed {e:?}");
        }
    }
}

pub enum CountdownOutcome {
    Finished(AlarmHandle),
    Stopped,
}

pub struct Countdown {
    total_seconds: u64,
    clock: Box<dyn Clock>,
    alarm: Arc<dyn Alarm>,
    shutdown: CancellationToken,
}

impl Countdown {
    pub fn new(
        minutes: Minutes,
        clock: Box<dyn Clock>,
        alarm: Arc<dyn Alarm>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            total_seconds: minutes.as_seconds(),
            clock,
            alarm,
            shutdown,
        }
    }

    /// Counts down to zero, reporting `MM:SS` through `on_tick` once per second, then reports
    /// [DONE_MESSAGE] and rings the alarm in the background. Cancelling the shutdown token stops
    /// the countdown without an alarm.
    pub async fn run(self, mut on_tick: impl FnMut(&str)) -> Result<CountdownOutcome> {
        info!("Starting countdown of {}s", self.total_seconds);
        let mut remaining = self.total_seconds;
        let mut next_tick = self.clock.instant();
        on_tick(&format_countdown(remaining));

        while remaining > 0 {
            next_tick += TICK;
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Countdown stopped with {remaining}s left");
                    on_tick(&format_countdown(0));
                    return Ok(CountdownOutcome::Stopped);
                }
                _ = self.clock.sleep_until(next_tick) => ()
            }
            remaining -= 1;
            on_tick(&format_countdown(remaining));
        }

        on_tick(DONE_MESSAGE);
        info!("Countdown finished, ringing alarm");
        let alarm = self.alarm.clone();
        let task = tokio::task::spawn_blocking(move || {
            if let Err(e) = alarm.ring() {
                warn!("Could not play alarm {e:?}");
            }
        });
        Ok(CountdownOutcome::Finished(AlarmHandle(task)))
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use anyhow::{anyhow, Result};
    use tokio_util::sync::CancellationToken;

    use super::{Countdown, CountdownOutcome, MockAlarm, DONE_MESSAGE};
    use crate::utils::{clock::DefaultClock, logging::TEST_LOGGING, minutes::Minutes};

    fn countdown(minutes: &str, alarm: MockAlarm, shutdown: &CancellationToken) -> Countdown {
        Countdown::new(
            minutes.parse::<Minutes>().unwrap(),
            Box::new(DefaultClock),
            Arc::new(alarm),
            shutdown.clone(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_finishes_and_rings_once() -> Result<()> {
        *TEST_LOGGING;
        let mut alarm = MockAlarm::new();
        alarm.expect_ring().times(1).returning(|| Ok(()));
        let shutdown = CancellationToken::new();

        let start = tokio::time::Instant::now();
        let mut ticks = Vec::new();
        let outcome = countdown("0.05", alarm, &shutdown)
            .run(|tick| ticks.push(tick.to_string()))
            .await?;

        assert_eq!(ticks, ["00:03", "00:02", "00:01", "00:00", DONE_MESSAGE]);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
        match outcome {
            CountdownOutcome::Finished(alarm) => alarm.wait().await,
            CountdownOutcome::Stopped => panic!("Countdown should have finished"),
        }
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_alarm_does_not_fail_countdown() -> Result<()> {
        let mut alarm = MockAlarm::new();
        alarm
            .expect_ring()
            .times(1)
            .returning(|| Err(anyhow!("no speakers")));
        let shutdown = CancellationToken::new();

        let outcome = countdown("0.02", alarm, &shutdown).run(|_| ()).await?;

        let CountdownOutcome::Finished(alarm) = outcome else {
            panic!("Countdown should have finished");
        };
        alarm.wait().await;
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_countdown_stops_without_alarm() -> Result<()> {
        let mut alarm = MockAlarm::new();
        alarm.expect_ring().never();
        let shutdown = CancellationToken::new();

        let stopper = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            stopper.cancel();
        });

        let mut ticks = Vec::new();
        let outcome = countdown("1", alarm, &shutdown)
            .run(|tick| ticks.push(tick.to_string()))
            .await?;

        assert!(matches!(outcome, CountdownOutcome::Stopped));
        assert_eq!(ticks, ["01:00", "00:59", "00:58", "00:00"]);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_sub_second_countdown_is_done_immediately() -> Result<()> {
        let mut alarm = MockAlarm::new();
        alarm.expect_ring().times(1).returning(|| Ok(()));
        let shutdown = CancellationToken::new();

        let mut ticks = Vec::new();
        let outcome = countdown("0.01", alarm, &shutdown)
            .run(|tick| ticks.push(tick.to_string()))
            .await?;

        assert_eq!(ticks, ["00:00", DONE_MESSAGE]);
        if let CountdownOutcome::Finished(alarm) = outcome {
            alarm.wait().await;
        }
        Ok(())
    }
}
