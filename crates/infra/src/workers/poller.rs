//! Bounded execution-status poller.
//!
//! ```text
//!            fetch → terminal
//! Polling ─────────────────────────▶ TerminalObserved
//!    │  fetch → non-terminal / error
//!    ├──── wait(interval) ──▶ Polling
//!    │  deadline reached
//!    ├─────────────────────────────▶ TimedOut
//!    │  shutdown during wait
//!    └─────────────────────────────▶ Cancelled
//! ```
//!
//! Fetch errors never leave `Polling`: they are counted and logged only.
//! The deadline is checked by elapsed time before every fetch, and both the
//! fetch and the wait are cut off at the deadline, so the loop never runs
//! past it whatever the remote's latency.

use std::time::Duration;

use tokio::time::{Instant, sleep_until, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use flowsweep_core::{ExecutionSid, FlowSid};

use crate::external::RemoteApi;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Polling,
    TerminalObserved,
    TimedOut,
    /// Process shutdown interrupted a wait.
    Cancelled,
}

impl PollState {
    pub fn is_final(self) -> bool {
        !matches!(self, Self::Polling)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollReport {
    pub outcome: PollState,
    /// Status fetches issued, including failed ones.
    pub fetches: u32,
    /// Fetches that failed and were treated as non-terminal.
    pub fetch_errors: u32,
    pub elapsed: Duration,
}

impl PollReport {
    /// Whether terminal status was observed. Informational only: cleanup runs
    /// either way.
    pub fn completed(&self) -> bool {
        self.outcome == PollState::TerminalObserved
    }
}

/// Polls one execution until it ends, the deadline passes, or shutdown.
pub struct StatusPoller<'a> {
    api: &'a dyn RemoteApi,
    settings: PollSettings,
    shutdown: CancellationToken,
}

impl<'a> StatusPoller<'a> {
    pub fn new(api: &'a dyn RemoteApi, settings: PollSettings, shutdown: CancellationToken) -> Self {
        Self {
            api,
            settings,
            shutdown,
        }
    }

    /// Run the state machine to a final state.
    pub async fn poll_until_terminal(
        &self,
        flow_sid: &FlowSid,
        execution_sid: &ExecutionSid,
    ) -> PollReport {
        let started = Instant::now();
        let deadline = started + self.settings.timeout;

        info!(
            %execution_sid,
            timeout_ms = self.settings.timeout.as_millis() as u64,
            "starting execution poll"
        );

        let mut fetches = 0u32;
        let mut fetch_errors = 0u32;
        let mut state = PollState::Polling;

        while !state.is_final() {
            if Instant::now() >= deadline {
                state = PollState::TimedOut;
                break;
            }

            fetches += 1;
            let fetch = self.api.fetch_execution_status(flow_sid, execution_sid);
            match timeout_at(deadline, fetch).await {
                Ok(Ok(status)) if status.is_terminal() => {
                    state = PollState::TerminalObserved;
                    break;
                }
                Ok(Ok(status)) => {
                    debug!(
                        %execution_sid,
                        status = status.as_str(),
                        attempt = fetches,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "execution still running"
                    );
                }
                Ok(Err(e)) => {
                    fetch_errors += 1;
                    warn!(%execution_sid, attempt = fetches, error = %e, "execution status fetch failed");
                }
                Err(_) => {
                    fetch_errors += 1;
                    warn!(%execution_sid, attempt = fetches, "execution status fetch cut off at poll deadline");
                }
            }

            state = self.wait(deadline).await;
        }

        let report = PollReport {
            outcome: state,
            fetches,
            fetch_errors,
            elapsed: started.elapsed(),
        };

        match report.outcome {
            PollState::TerminalObserved => info!(
                %execution_sid,
                fetches,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "execution ended"
            ),
            PollState::TimedOut => warn!(
                %execution_sid,
                fetches,
                fetch_errors,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "execution poll timed out"
            ),
            PollState::Cancelled => warn!(%execution_sid, fetches, "execution poll cancelled by shutdown"),
            PollState::Polling => {}
        }

        report
    }

    async fn wait(&self, deadline: Instant) -> PollState {
        let wake = (Instant::now() + self.settings.interval).min(deadline);

        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => PollState::Cancelled,
            _ = sleep_until(wake) => PollState::Polling,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::{ExecutionStatus, InMemoryRemote, RemoteError};

    fn sids() -> (FlowSid, ExecutionSid) {
        (FlowSid::new("FW1").unwrap(), ExecutionSid::new("FN1").unwrap())
    }

    fn active() -> Result<ExecutionStatus, RemoteError> {
        Ok(ExecutionStatus::Active)
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_on_first_fetch_returns_immediately() {
        let remote = InMemoryRemote::new();
        remote.script_statuses([Ok(ExecutionStatus::Ended)]);
        let (flow, exec) = sids();

        let report = StatusPoller::new(&remote, PollSettings::default(), CancellationToken::new())
            .poll_until_terminal(&flow, &exec)
            .await;

        assert!(report.completed());
        assert_eq!(report.fetches, 1);
        assert_eq!(report.elapsed, Duration::ZERO);
        assert_eq!(remote.status_fetches(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_on_nth_fetch_issues_exactly_n_fetches() {
        for n in 1..=15u32 {
            let remote = InMemoryRemote::new();
            remote.script_statuses((1..n).map(|_| active()));
            remote.set_fallback_status(ExecutionStatus::Ended);
            let (flow, exec) = sids();

            let report = StatusPoller::new(&remote, PollSettings::default(), CancellationToken::new())
                .poll_until_terminal(&flow, &exec)
                .await;

            assert!(report.completed(), "n = {n}");
            assert_eq!(report.fetches, n);
            assert_eq!(remote.status_fetches(), n as usize);
            assert_eq!(report.elapsed, Duration::from_secs(u64::from(n - 1)));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn never_terminal_times_out_at_deadline() {
        let remote = InMemoryRemote::new();
        let (flow, exec) = sids();
        let settings = PollSettings::default();

        let report = StatusPoller::new(&remote, settings, CancellationToken::new())
            .poll_until_terminal(&flow, &exec)
            .await;

        assert_eq!(report.outcome, PollState::TimedOut);
        assert!(!report.completed());
        assert_eq!(report.fetches, 15);
        assert!(report.elapsed >= settings.timeout);
        assert!(report.elapsed <= settings.timeout + settings.interval);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_errors_do_not_abort_the_loop() {
        let remote = InMemoryRemote::new();
        remote.script_statuses([
            Err(RemoteError::Transport("connection reset".into())),
            Err(RemoteError::Status { status: 500, message: "boom".into() }),
            Ok(ExecutionStatus::Ended),
        ]);
        let (flow, exec) = sids();

        let report = StatusPoller::new(&remote, PollSettings::default(), CancellationToken::new())
            .poll_until_terminal(&flow, &exec)
            .await;

        assert!(report.completed());
        assert_eq!(report.fetches, 3);
        assert_eq!(report.fetch_errors, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn uneven_interval_is_clipped_to_deadline() {
        let remote = InMemoryRemote::new();
        let (flow, exec) = sids();
        let settings = PollSettings {
            interval: Duration::from_millis(400),
            timeout: Duration::from_secs(1),
        };

        let report = StatusPoller::new(&remote, settings, CancellationToken::new())
            .poll_until_terminal(&flow, &exec)
            .await;

        // fetches at 0ms, 400ms, 800ms; the last wait ends at the 1s deadline.
        assert_eq!(report.fetches, 3);
        assert_eq!(report.elapsed, settings.timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_fetch_is_cut_off_at_deadline() {
        let remote = InMemoryRemote::new();
        remote.set_fetch_delay(Duration::from_secs(10));
        let (flow, exec) = sids();
        let settings = PollSettings::default();

        let report = StatusPoller::new(&remote, settings, CancellationToken::new())
            .poll_until_terminal(&flow, &exec)
            .await;

        // fetch at 0s answers at 10s; fetch at 11s is abandoned at 15s.
        assert_eq!(report.outcome, PollState::TimedOut);
        assert_eq!(report.fetches, 2);
        assert_eq!(report.fetch_errors, 1);
        assert_eq!(report.elapsed, settings.timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_interrupts_the_wait() {
        let remote = InMemoryRemote::new();
        let (flow, exec) = sids();
        let shutdown = CancellationToken::new();

        let canceller = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            canceller.cancel();
        });

        let report = StatusPoller::new(&remote, PollSettings::default(), shutdown)
            .poll_until_terminal(&flow, &exec)
            .await;

        assert_eq!(report.outcome, PollState::Cancelled);
        assert_eq!(report.fetches, 3);
        assert_eq!(report.elapsed, Duration::from_millis(2500));
    }
}
