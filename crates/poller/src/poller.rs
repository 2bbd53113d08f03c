//! The polling loop itself.
//!
//! One [`JobPoller`] owns at most one active polling session at a time.
//! `start` cancels any session already running, so a submission form can
//! call it back-to-back without leaking timers; `stop` is always safe.
//!
//! Scheduling is fixed-period: a [`tokio::time::interval`] with
//! [`MissedTickBehavior::Delay`] fires every period, and the status
//! request is awaited inside the loop body, so requests never overlap.
//! Under a slow network the schedule degrades to fixed-delay instead of
//! bursting to catch up.

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use modelgen_core::types::{JobId, JobStatus, JobStatusResponse, JobType};

use crate::client::StatusClient;

/// Delay between status queries.
pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_millis(2000);

/// Broadcast channel capacity for poll events.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Tunable parameters for a [`JobPoller`].
pub struct PollerConfig {
    /// Delay between status queries (default: 2000 ms).
    pub period: Duration,
    /// Optional cap on how long a session may keep polling. `None`
    /// preserves the historical behavior: the loop runs until a terminal
    /// status is observed or the caller stops it.
    pub max_duration: Option<Duration>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_POLL_PERIOD,
            max_duration: None,
        }
    }
}

/// One observed job snapshot plus the time elapsed since `start`.
#[derive(Debug, Clone)]
pub struct JobObservation {
    pub job: JobStatusResponse,
    pub elapsed: Duration,
}

/// Events published to subscribers.
#[derive(Debug, Clone)]
pub enum PollEvent {
    /// A non-terminal snapshot; the loop keeps polling.
    Update(JobObservation),
    /// The terminal snapshot. Published exactly once per session; the
    /// loop stops synchronously with this event.
    Terminal(JobObservation),
    /// The configured `max_duration` elapsed before a terminal status
    /// was observed. The loop stops; the job may still be running
    /// remotely.
    TimedOut { job_id: JobId, elapsed: Duration },
}

/// Bookkeeping for the active session.
struct PollSession {
    job_id: JobId,
    cancel: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
}

/// Polls a job-status endpoint until the job finishes.
///
/// Subscribers receive [`PollEvent`]s over a broadcast channel, so the
/// loop has no knowledge of who is rendering the updates. The poller
/// task is the only publisher; consumers only read.
pub struct JobPoller<C: StatusClient> {
    client: Arc<C>,
    config: PollerConfig,
    event_tx: broadcast::Sender<PollEvent>,
    session: Mutex<Option<PollSession>>,
}

impl<C: StatusClient> JobPoller<C> {
    pub fn new(client: C, config: PollerConfig) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            client: Arc::new(client),
            config,
            event_tx,
            session: Mutex::new(None),
        }
    }

    /// Subscribe to poll events. Safe to call before or after `start`.
    pub fn subscribe(&self) -> broadcast::Receiver<PollEvent> {
        self.event_tx.subscribe()
    }

    /// Begin polling `job_id`.
    ///
    /// Cancels any session already running (idempotent: safe with
    /// nothing running), resets the elapsed-time baseline to now, and
    /// issues the first status query immediately, so the first update
    /// arrives before the first period elapses.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, job_id: impl Into<JobId>, job_type: JobType) {
        let job_id = job_id.into();
        let mut session = self.session.lock().expect("poller session lock poisoned");

        if let Some(previous) = session.take() {
            tracing::debug!(
                job_id = %previous.job_id,
                "Superseding active polling session",
            );
            previous.cancel.cancel();
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_session(
            Arc::clone(&self.client),
            job_id.clone(),
            job_type,
            self.config.period,
            self.config.max_duration,
            self.event_tx.clone(),
            cancel.clone(),
        ));

        tracing::info!(job_id = %job_id, job_type = %job_type, "Polling started");
        *session = Some(PollSession {
            job_id,
            cancel,
            handle,
        });
    }

    /// Stop the active session, if any. A no-op when nothing is running.
    pub fn stop(&self) {
        let mut session = self.session.lock().expect("poller session lock poisoned");
        if let Some(active) = session.take() {
            tracing::info!(job_id = %active.job_id, "Polling stopped");
            active.cancel.cancel();
        }
    }

    /// Whether a polling session is currently running.
    pub fn is_polling(&self) -> bool {
        self.session
            .lock()
            .expect("poller session lock poisoned")
            .as_ref()
            .is_some_and(|s| !s.handle.is_finished())
    }
}

impl<C: StatusClient> Drop for JobPoller<C> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One polling session: fixed-period status queries until a terminal
/// snapshot, cancellation, or the optional duration cap.
async fn run_session<C: StatusClient>(
    client: Arc<C>,
    job_id: JobId,
    job_type: JobType,
    period: Duration,
    max_duration: Option<Duration>,
    event_tx: broadcast::Sender<PollEvent>,
    cancel: CancellationToken,
) {
    let started = tokio::time::Instant::now();
    let mut interval = tokio::time::interval(period);
    // Queries are awaited inside the loop body; if one runs long, skip
    // the backlog instead of bursting.
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        // The first tick completes immediately. Cancellation is checked
        // first so a superseded session never issues another query even
        // when a tick is already due.
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = interval.tick() => {}
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            result = client.fetch_status(&job_id) => result,
        };
        let elapsed = started.elapsed();

        match result {
            Err(e) => {
                // Transient by policy: log and let the next tick retry.
                tracing::warn!(
                    job_id = %job_id,
                    job_type = %job_type,
                    error = %e,
                    "Status query failed; retrying on the next tick",
                );
            }
            Ok(job) => {
                if job.job_id != job_id {
                    // A response for a job this session never asked about
                    // (stale proxy, misbehaving server). Never render it.
                    tracing::warn!(
                        job_id = %job_id,
                        received = %job.job_id,
                        "Discarding status response for a different job",
                    );
                } else {
                    if job.status == JobStatus::Unknown {
                        tracing::warn!(
                            job_id = %job_id,
                            "Server reported an unrecognized status; continuing to poll",
                        );
                    }

                    // A session superseded between request and response
                    // must not publish a stale snapshot.
                    if cancel.is_cancelled() {
                        return;
                    }

                    let terminal = job.status.is_terminal();
                    let observation = JobObservation { job, elapsed };

                    if terminal {
                        tracing::info!(
                            job_id = %job_id,
                            status = %observation.job.status,
                            elapsed_ms = elapsed.as_millis() as u64,
                            "Job reached a terminal state",
                        );
                        let _ = event_tx.send(PollEvent::Terminal(observation));
                        return;
                    }
                    let _ = event_tx.send(PollEvent::Update(observation));
                }
            }
        }

        if let Some(max) = max_duration {
            let elapsed = started.elapsed();
            if elapsed >= max {
                tracing::warn!(
                    job_id = %job_id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Polling budget exhausted before a terminal status",
                );
                let _ = event_tx.send(PollEvent::TimedOut {
                    job_id: job_id.clone(),
                    elapsed,
                });
                return;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    use crate::client::StatusClientError;

    /// Scripted transport: plays back a queue of responses, then echoes
    /// an endless `processing` status for whatever job is asked about.
    /// Records the job id of every query it receives.
    struct ScriptedClient {
        script: StdMutex<VecDeque<Result<JobStatusResponse, ()>>>,
        calls: StdMutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn new(script: Vec<Result<JobStatusResponse, ()>>) -> Self {
            Self {
                script: StdMutex::new(script.into()),
                calls: StdMutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StatusClient for Arc<ScriptedClient> {
        async fn fetch_status(&self, job_id: &str) -> Result<JobStatusResponse, StatusClientError> {
            self.calls.lock().unwrap().push(job_id.to_string());
            match self.script.lock().unwrap().pop_front() {
                Some(Ok(response)) => Ok(response),
                Some(Err(())) => Err(StatusClientError::Api {
                    status: 502,
                    body: "bad gateway".into(),
                }),
                None => Ok(response(job_id, "processing", 50, None, None)),
            }
        }
    }

    fn response(
        job_id: &str,
        status: &str,
        progress: u8,
        result_url: Option<&str>,
        error: Option<&str>,
    ) -> JobStatusResponse {
        JobStatusResponse {
            job_id: job_id.into(),
            job_type: JobType::Face,
            status: JobStatus::from_wire(status),
            progress,
            message: format!("{status}..."),
            created_at: None,
            completed_at: None,
            result_url: result_url.map(String::from),
            error: error.map(String::from),
        }
    }

    fn poller(
        script: Vec<Result<JobStatusResponse, ()>>,
        config: PollerConfig,
    ) -> (JobPoller<Arc<ScriptedClient>>, Arc<ScriptedClient>) {
        let client = Arc::new(ScriptedClient::new(script));
        (JobPoller::new(Arc::clone(&client), config), client)
    }

    async fn next_event(rx: &mut broadcast::Receiver<PollEvent>) -> PollEvent {
        tokio::time::timeout(Duration::from_secs(60), rx.recv())
            .await
            .expect("timed out waiting for a poll event")
            .expect("event channel closed")
    }

    #[tokio::test(start_paused = true)]
    async fn first_query_is_issued_immediately() {
        let (poller, client) = poller(
            vec![Ok(response("job-1", "completed", 100, Some("/out.png"), None))],
            PollerConfig::default(),
        );
        let mut rx = poller.subscribe();

        poller.start("job-1", JobType::Face);

        let event = next_event(&mut rx).await;
        assert_matches!(event, PollEvent::Terminal(obs) => {
            assert_eq!(obs.job.status, JobStatus::Completed);
            // Observed on the immediate first tick, not after a period.
            assert!(obs.elapsed < DEFAULT_POLL_PERIOD);
        });
        assert_eq!(client.call_count(), 1);
    }

    // Happy path: processing at 40, then completed with a result URL.
    // Exactly one terminal observation, no third tick.
    #[tokio::test(start_paused = true)]
    async fn processing_then_completed_delivers_terminal_once() {
        let (poller, client) = poller(
            vec![
                Ok(response("job-1", "processing", 40, None, None)),
                Ok(response(
                    "job-1",
                    "completed",
                    100,
                    Some("/storage/faces/job-1.png"),
                    None,
                )),
            ],
            PollerConfig::default(),
        );
        let mut rx = poller.subscribe();

        poller.start("job-1", JobType::Face);

        assert_matches!(next_event(&mut rx).await, PollEvent::Update(obs) => {
            assert_eq!(obs.job.progress, 40);
        });
        assert_matches!(next_event(&mut rx).await, PollEvent::Terminal(obs) => {
            assert_eq!(obs.job.status, JobStatus::Completed);
            assert_eq!(obs.job.result_url.as_deref(), Some("/storage/faces/job-1.png"));
        });

        // Let many periods pass: the loop must be gone.
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(client.call_count(), 2, "no tick may run after the terminal one");
        assert_matches!(rx.try_recv(), Err(broadcast::error::TryRecvError::Empty));
        assert!(!poller.is_polling());
    }

    // Three transport failures are swallowed; the fourth tick observes
    // the failed job.
    #[tokio::test(start_paused = true)]
    async fn transient_failures_do_not_stop_the_loop() {
        let (poller, client) = poller(
            vec![
                Err(()),
                Err(()),
                Err(()),
                Ok(response("job-1", "failed", 0, None, Some("upstream timeout"))),
            ],
            PollerConfig::default(),
        );
        let mut rx = poller.subscribe();

        poller.start("job-1", JobType::Face);

        // The first event of any kind must be the terminal failure: the
        // three transport errors produce no events at all.
        assert_matches!(next_event(&mut rx).await, PollEvent::Terminal(obs) => {
            assert_eq!(obs.job.status, JobStatus::Failed);
            assert_eq!(obs.job.error.as_deref(), Some("upstream timeout"));
        });
        assert_eq!(client.call_count(), 4);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(client.call_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_supersedes_the_first_session() {
        let (poller, client) = poller(Vec::new(), PollerConfig::default());
        let mut rx = poller.subscribe();

        poller.start("job-1", JobType::Face);
        assert_matches!(next_event(&mut rx).await, PollEvent::Update(obs) => {
            assert_eq!(obs.job.job_id, "job-1");
        });

        poller.start("job-2", JobType::Video);
        assert!(poller.is_polling());

        // Give both (hypothetical) loops room to run.
        tokio::time::sleep(Duration::from_secs(20)).await;

        let calls = client.calls();
        let first_job2 = calls
            .iter()
            .position(|id| id == "job-2")
            .expect("the new session must query job-2");
        assert!(
            calls[first_job2..].iter().all(|id| id == "job-2"),
            "the superseded session must issue no further queries: {calls:?}",
        );
        poller.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_without_start_is_a_noop() {
        let (poller, client) = poller(Vec::new(), PollerConfig::default());
        poller.stop();
        poller.stop();
        assert!(!poller.is_polling());
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_halts_future_ticks() {
        let (poller, client) = poller(Vec::new(), PollerConfig::default());
        let mut rx = poller.subscribe();

        poller.start("job-1", JobType::Face);
        assert_matches!(next_event(&mut rx).await, PollEvent::Update(_));

        poller.stop();
        let frozen = client.call_count();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(client.call_count(), frozen);
        assert!(!poller.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_time_is_monotonically_non_decreasing() {
        let (poller, _client) = poller(Vec::new(), PollerConfig::default());
        let mut rx = poller.subscribe();

        poller.start("job-1", JobType::Face);

        let mut last = Duration::ZERO;
        for _ in 0..5 {
            let event = next_event(&mut rx).await;
            let PollEvent::Update(obs) = event else {
                panic!("expected updates only");
            };
            assert!(obs.elapsed >= last, "elapsed went backwards");
            last = obs.elapsed;
        }
        poller.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn unrecognized_status_keeps_the_loop_polling() {
        let (poller, _client) = poller(
            vec![Ok(response("job-1", "archived", 70, None, None))],
            PollerConfig::default(),
        );
        let mut rx = poller.subscribe();

        poller.start("job-1", JobType::Face);

        assert_matches!(next_event(&mut rx).await, PollEvent::Update(obs) => {
            assert_eq!(obs.job.status, JobStatus::Unknown);
        });
        // A further event arrives: the loop did not treat it as terminal.
        assert_matches!(next_event(&mut rx).await, PollEvent::Update(_));
        poller.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn mismatched_job_id_responses_are_discarded() {
        let (poller, client) = poller(
            vec![
                Ok(response("some-other-job", "completed", 100, None, None)),
                Ok(response("job-1", "completed", 100, None, None)),
            ],
            PollerConfig::default(),
        );
        let mut rx = poller.subscribe();

        poller.start("job-1", JobType::Face);

        // The stray response produces no event and, critically, its
        // terminal status does not stop the loop.
        assert_matches!(next_event(&mut rx).await, PollEvent::Terminal(obs) => {
            assert_eq!(obs.job.job_id, "job-1");
        });
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn max_duration_ends_the_session_with_timed_out() {
        let (poller, client) = poller(
            Vec::new(),
            PollerConfig {
                period: Duration::from_secs(2),
                max_duration: Some(Duration::from_secs(5)),
            },
        );
        let mut rx = poller.subscribe();

        poller.start("job-1", JobType::Face);

        let timed_out = loop {
            match next_event(&mut rx).await {
                PollEvent::Update(_) => continue,
                PollEvent::TimedOut { job_id, elapsed } => break (job_id, elapsed),
                PollEvent::Terminal(_) => panic!("no terminal status was ever served"),
            }
        };
        assert_eq!(timed_out.0, "job-1");
        assert!(timed_out.1 >= Duration::from_secs(5));

        let frozen = client.call_count();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(client.call_count(), frozen);
        assert!(!poller.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_after_terminal_state_works() {
        let (poller, _client) = poller(
            vec![
                Ok(response("job-1", "completed", 100, None, None)),
                Ok(response("job-2", "processing", 10, None, None)),
            ],
            PollerConfig::default(),
        );
        let mut rx = poller.subscribe();

        poller.start("job-1", JobType::Face);
        assert_matches!(next_event(&mut rx).await, PollEvent::Terminal(_));

        poller.start("job-2", JobType::Lipsync);
        assert_matches!(next_event(&mut rx).await, PollEvent::Update(obs) => {
            assert_eq!(obs.job.job_id, "job-2");
        });
        poller.stop();
    }
}
