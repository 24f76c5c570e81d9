//! Fixed-period trigger for the mirror job
//!
//! Runs on the calling thread. The first run starts immediately, later runs
//! start on period boundaries measured from the previous tick. Ticks that
//! elapse while a run is still in progress are dropped, never queued.

use serde::Serialize;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::error::{FerryError, Result};
use crate::job::JobExecution;

/// What a scheduler loop did before it stopped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScheduleSummary {
    pub runs: u64,
    pub failed_runs: u64,
    pub missed_ticks: u64,
}

#[derive(Debug, Clone)]
pub struct MirrorScheduler {
    period: Duration,
    max_runs: Option<u64>,
}

impl MirrorScheduler {
    pub fn new(period: Duration) -> Result<Self> {
        if period.is_zero() {
            return Err(FerryError::Config(
                "schedule period must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            period,
            max_runs: None,
        })
    }

    /// Stop after `max_runs` runs instead of looping forever
    pub fn with_max_runs(mut self, max_runs: Option<u64>) -> Self {
        self.max_runs = max_runs;
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Run `job` once per tick until the run limit is reached
    ///
    /// A run that returns `Err` or a failed execution is logged and the
    /// schedule continues.
    pub fn run<F>(&self, mut job: F) -> ScheduleSummary
    where
        F: FnMut() -> Result<JobExecution>,
    {
        info!(
            period_secs = self.period.as_secs(),
            max_runs = ?self.max_runs,
            "Mirror schedule started"
        );

        let mut summary = ScheduleSummary::default();
        let mut tick = Instant::now();

        loop {
            summary.runs += 1;
            match job() {
                Ok(execution) if execution.is_success() => {}
                Ok(execution) => {
                    summary.failed_runs += 1;
                    warn!(
                        run = summary.runs,
                        failure = execution.failure.as_deref().unwrap_or("unknown"),
                        "Scheduled mirror run failed"
                    );
                }
                Err(e) => {
                    summary.failed_runs += 1;
                    error!(run = summary.runs, "Scheduled mirror run aborted: {}", e);
                }
            }

            if self.max_runs.is_some_and(|max| summary.runs >= max) {
                break;
            }

            let (next, missed) = next_deadline(tick, self.period, Instant::now());
            if missed > 0 {
                summary.missed_ticks += missed;
                warn!(missed, "Run overlapped the schedule, dropping missed ticks");
            }
            thread::sleep(next.saturating_duration_since(Instant::now()));
            tick = next;
        }

        info!(
            runs = summary.runs,
            failed = summary.failed_runs,
            missed_ticks = summary.missed_ticks,
            "Mirror schedule stopped"
        );
        summary
    }
}

/// Next tick after `now`, and how many boundaries were passed on the way
///
/// Boundaries lie at `last_tick + k * period`. Every boundary in
/// `(last_tick, now]` counts as missed.
pub fn next_deadline(last_tick: Instant, period: Duration, now: Instant) -> (Instant, u64) {
    let elapsed = now.saturating_duration_since(last_tick);
    let passed = (elapsed.as_nanos() / period.as_nanos().max(1)) as u64;
    let steps = u32::try_from(passed + 1).unwrap_or(u32::MAX);
    (last_tick + period.saturating_mul(steps), passed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{self, JobParameters};
    use crate::pipeline::StepStats;

    fn execution(ok: bool) -> JobExecution {
        job::execute("tick", JobParameters::for_tick(), |_| {
            let result = if ok {
                Ok(())
            } else {
                Err(FerryError::Other("remote down".to_string()))
            };
            (StepStats::default(), result)
        })
    }

    #[test]
    fn test_next_deadline_on_time() {
        let start = Instant::now();
        let period = Duration::from_secs(60);

        let (next, missed) = next_deadline(start, period, start + Duration::from_secs(5));
        assert_eq!(next, start + period);
        assert_eq!(missed, 0);
    }

    #[test]
    fn test_next_deadline_skips_overlapped_ticks() {
        let start = Instant::now();
        let period = Duration::from_secs(60);

        // Run took 2.5 periods: boundaries at 60s and 120s are dropped
        let (next, missed) = next_deadline(start, period, start + Duration::from_secs(150));
        assert_eq!(next, start + Duration::from_secs(180));
        assert_eq!(missed, 2);
    }

    #[test]
    fn test_zero_period_rejected() {
        assert!(MirrorScheduler::new(Duration::ZERO).is_err());
    }

    #[test]
    fn test_runs_until_limit_and_survives_failures() {
        let scheduler = MirrorScheduler::new(Duration::from_millis(5))
            .unwrap()
            .with_max_runs(Some(3));

        let mut calls = 0;
        let summary = scheduler.run(|| {
            calls += 1;
            match calls {
                1 => Ok(execution(false)),
                2 => Err(FerryError::Connection {
                    endpoint: "host:22".to_string(),
                    message: "refused".to_string(),
                }),
                _ => Ok(execution(true)),
            }
        });

        assert_eq!(calls, 3);
        assert_eq!(summary.runs, 3);
        assert_eq!(summary.failed_runs, 2);
    }

    #[test]
    fn test_slow_run_drops_ticks() {
        let scheduler = MirrorScheduler::new(Duration::from_millis(10))
            .unwrap()
            .with_max_runs(Some(2));

        let mut first = true;
        let summary = scheduler.run(|| {
            if first {
                first = false;
                thread::sleep(Duration::from_millis(35));
            }
            Ok(execution(true))
        });

        assert_eq!(summary.runs, 2);
        assert!(summary.missed_ticks >= 3);
    }
}
