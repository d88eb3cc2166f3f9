//! Scan sessions and their state machine.
//!
//! [`ScanSession`] is the aggregate root: it binds a validated
//! configuration, the enumerator cursor, the worker pool, and the result
//! aggregator into one restartable unit. States move
//! `Idle → Running ⇄ Paused → {Completed | Cancelled | Failed}`; invalid
//! transitions are signaled as [`StateError`]s and leave the state
//! untouched. Individual probe failures never fail a session; only
//! unrecoverable configuration or storage errors do.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::aggregate::{ResultAggregator, ScanSnapshot};
use crate::enumerate::{AddressEnumerator, Cursor};
use crate::error::{ConfigError, ConfigResult, StateError};
use crate::resolver::DnsProber;
use crate::scheduler::{Control, ProbeScheduler, RateLimiter, SchedulerContext};
use crate::types::{HostPolicy, RangeList, RecordType, ScanId};

/// Cadence of incremental durable flushes.
const FLUSH_INTERVAL: Duration = Duration::from_millis(500);

/// Lifecycle state of a scan session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Running,
    Paused,
    Completed,
    Cancelled,
    Failed,
}

impl SessionState {
    /// Whether the session can still make progress.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Validated configuration for one scan.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Domain queried against every candidate.
    pub domain: String,
    /// Record type for every probe.
    pub record_type: RecordType,
    /// Number of concurrently outstanding probes.
    pub concurrency: usize,
    /// Prefix each query with a fresh random label to defeat caching.
    pub random_label: bool,
    /// The address ranges to sweep.
    pub ranges: RangeList,
    /// Which addresses each range yields.
    pub host_policy: HostPolicy,
    /// Hard per-probe deadline, enforced by the resolver.
    pub probe_timeout: Duration,
    /// How long in-flight probes may drain after a cancel.
    pub drain_grace: Duration,
    /// Probes per second across the pool, 0 for unlimited.
    pub rate_limit: u32,
}

impl ScanConfig {
    /// Configuration with the standard defaults.
    pub fn new(domain: impl Into<String>, ranges: RangeList) -> Self {
        Self {
            domain: domain.into(),
            record_type: RecordType::A,
            concurrency: 100,
            random_label: false,
            ranges,
            host_policy: HostPolicy::default(),
            probe_timeout: Duration::from_secs(2),
            drain_grace: Duration::from_secs(5),
            rate_limit: 0,
        }
    }

    pub fn with_record_type(mut self, record_type: RecordType) -> Self {
        self.record_type = record_type;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_random_label(mut self, enabled: bool) -> Self {
        self.random_label = enabled;
        self
    }

    pub fn with_host_policy(mut self, policy: HostPolicy) -> Self {
        self.host_policy = policy;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_rate_limit(mut self, rate: u32) -> Self {
        self.rate_limit = rate;
        self
    }

    /// Reject configurations that must never reach the network.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.domain.trim().is_empty() {
            return Err(ConfigError::EmptyDomain);
        }
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency(self.concurrency));
        }
        if self.ranges.is_empty() {
            return Err(ConfigError::EmptyRangeList);
        }
        Ok(())
    }
}

/// Dispatch/completion counters shared with the worker pool.
#[derive(Debug, Default)]
pub struct SessionCounters {
    pub dispatched: AtomicU64,
    pub completed: AtomicU64,
}

/// A point-in-time progress view for presentation layers.
#[derive(Debug, Clone)]
pub struct Progress {
    pub state: SessionState,
    pub dispatched: u64,
    pub completed: u64,
    pub found: u64,
    pub total_candidates: u64,
    pub elapsed: Duration,
}

/// Cloneable control-and-observation surface over a running session.
///
/// Lets an observer (signal handler, progress bar) pause, resume, cancel,
/// and poll progress without holding the session itself.
#[derive(Clone)]
pub struct SessionHandle {
    state: Arc<Mutex<SessionState>>,
    control: Arc<watch::Sender<Control>>,
    counters: Arc<SessionCounters>,
    aggregator: Arc<ResultAggregator>,
    total_candidates: u64,
    started_at: Arc<OnceLock<Instant>>,
}

impl SessionHandle {
    pub fn state(&self) -> SessionState {
        *self.state.lock().expect("state lock poisoned")
    }

    /// Current progress, cheap enough to poll at display rates.
    pub fn progress(&self) -> Progress {
        let (_, found) = self.aggregator.counts();
        Progress {
            state: self.state(),
            dispatched: self.counters.dispatched.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            found,
            total_candidates: self.total_candidates,
            elapsed: self
                .started_at
                .get()
                .map(|t| t.elapsed())
                .unwrap_or_default(),
        }
    }

    /// Stop issuing new probes; in-flight probes finish or time out.
    pub fn pause(&self) -> Result<(), StateError> {
        let mut state = self.state.lock().expect("state lock poisoned");
        if *state != SessionState::Running {
            return Err(StateError {
                action: "pause",
                state: *state,
            });
        }
        *state = SessionState::Paused;
        self.control.send_replace(Control::Paused);
        info!("scan paused");
        Ok(())
    }

    /// Resume dispatch from the durable cursor.
    pub fn resume(&self) -> Result<(), StateError> {
        let mut state = self.state.lock().expect("state lock poisoned");
        if *state != SessionState::Paused {
            return Err(StateError {
                action: "resume",
                state: *state,
            });
        }
        *state = SessionState::Running;
        self.control.send_replace(Control::Running);
        info!("scan resumed");
        Ok(())
    }

    /// Stop dispatch. In-flight probes drain within the session's grace
    /// period; the state becomes `Cancelled` once the session finalizes.
    pub fn cancel(&self) -> Result<(), StateError> {
        let mut state = self.state.lock().expect("state lock poisoned");
        match *state {
            SessionState::Idle => {
                // Nothing running; cancellation is immediate.
                *state = SessionState::Cancelled;
                Ok(())
            }
            SessionState::Running | SessionState::Paused => {
                self.control.send_replace(Control::Cancelled);
                info!("scan cancel requested; draining in-flight probes");
                Ok(())
            }
            terminal => Err(StateError {
                action: "cancel",
                state: terminal,
            }),
        }
    }
}

/// The aggregate root of one scan.
pub struct ScanSession {
    id: ScanId,
    config: ScanConfig,
    state: Arc<Mutex<SessionState>>,
    control: Arc<watch::Sender<Control>>,
    enumerator: Arc<Mutex<AddressEnumerator>>,
    aggregator: Arc<ResultAggregator>,
    counters: Arc<SessionCounters>,
    scheduler: Option<ProbeScheduler>,
    flusher: Option<JoinHandle<()>>,
    started_at: Arc<OnceLock<Instant>>,
}

impl ScanSession {
    /// Create a session with an in-memory aggregator.
    pub fn new(config: ScanConfig) -> ConfigResult<Self> {
        let record_type = config.record_type;
        Self::with_aggregator(config, Arc::new(ResultAggregator::in_memory(record_type)))
    }

    /// Create a session recording into the given aggregator.
    ///
    /// Validates the configuration; a [`ConfigError`] here means nothing was
    /// dispatched and no network activity occurred.
    pub fn with_aggregator(
        config: ScanConfig,
        aggregator: Arc<ResultAggregator>,
    ) -> ConfigResult<Self> {
        config.validate()?;
        let enumerator = AddressEnumerator::new(config.ranges.clone(), config.host_policy);
        let (control, _) = watch::channel(Control::Running);

        Ok(Self {
            id: ScanId::new(),
            config,
            state: Arc::new(Mutex::new(SessionState::Idle)),
            control: Arc::new(control),
            enumerator: Arc::new(Mutex::new(enumerator)),
            aggregator,
            counters: Arc::new(SessionCounters::default()),
            scheduler: None,
            flusher: None,
            started_at: Arc::new(OnceLock::new()),
        })
    }

    /// Override the generated scan ID, e.g. to pre-allocate storage paths
    /// keyed by it.
    pub fn with_id(mut self, id: ScanId) -> Self {
        self.id = id;
        self
    }

    pub fn id(&self) -> ScanId {
        self.id
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().expect("state lock poisoned")
    }

    /// A cloneable control-and-observation surface.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            state: Arc::clone(&self.state),
            control: Arc::clone(&self.control),
            counters: Arc::clone(&self.counters),
            aggregator: Arc::clone(&self.aggregator),
            total_candidates: self.total_candidates(),
            started_at: Arc::clone(&self.started_at),
        }
    }

    /// The enumeration frontier: everything before it has been dispatched.
    pub fn cursor(&self) -> Cursor {
        self.enumerator
            .lock()
            .expect("enumerator lock poisoned")
            .cursor()
    }

    /// Candidates the whole scan will offer under the configured policy.
    pub fn total_candidates(&self) -> u64 {
        self.config.ranges.candidate_count(self.config.host_policy)
    }

    /// Current progress, cheap enough to poll from an observer.
    pub fn progress(&self) -> Progress {
        self.handle().progress()
    }

    /// Full results view, in completion order.
    pub fn results(&self) -> ScanSnapshot {
        self.aggregator.snapshot()
    }

    /// Start dispatching probes. Must be called within a tokio runtime.
    pub fn start(&mut self, prober: Arc<dyn DnsProber>) -> Result<(), StateError> {
        {
            let mut state = self.state.lock().expect("state lock poisoned");
            if *state != SessionState::Idle {
                return Err(StateError {
                    action: "start",
                    state: *state,
                });
            }
            *state = SessionState::Running;
        }

        self.control.send_replace(Control::Running);
        let _ = self.started_at.set(Instant::now());

        let ctx = Arc::new(SchedulerContext {
            enumerator: Arc::clone(&self.enumerator),
            aggregator: Arc::clone(&self.aggregator),
            prober,
            counters: Arc::clone(&self.counters),
            domain: self.config.domain.clone(),
            record_type: self.config.record_type,
            random_label: self.config.random_label,
            probe_timeout: self.config.probe_timeout,
            rate_limiter: (self.config.rate_limit > 0)
                .then(|| RateLimiter::new(self.config.rate_limit)),
        });

        info!(
            scan_id = %self.id.short(),
            domain = %self.config.domain,
            record_type = %self.config.record_type,
            concurrency = self.config.concurrency,
            candidates = self.total_candidates(),
            "scan started"
        );

        self.scheduler = Some(ProbeScheduler::spawn(
            self.config.concurrency,
            &self.control,
            ctx,
        ));
        self.flusher = Some(spawn_flusher(
            Arc::clone(&self.aggregator),
            Arc::clone(&self.control),
        ));
        Ok(())
    }

    /// Delegates to [`SessionHandle::pause`].
    pub fn pause(&self) -> Result<(), StateError> {
        self.handle().pause()
    }

    /// Delegates to [`SessionHandle::resume`].
    pub fn resume(&self) -> Result<(), StateError> {
        self.handle().resume()
    }

    /// Delegates to [`SessionHandle::cancel`].
    pub fn cancel(&self) -> Result<(), StateError> {
        self.handle().cancel()
    }

    /// Drive the session to a terminal state and return it.
    ///
    /// Returns when the enumerator is exhausted and all in-flight probes
    /// have settled, or, after a cancel, when the drain grace elapses.
    /// A paused session stays here until resumed or cancelled.
    pub async fn wait(&mut self) -> SessionState {
        let Some(mut scheduler) = self.scheduler.take() else {
            return self.state();
        };
        let mut control = self.control.subscribe();

        loop {
            if *control.borrow_and_update() == Control::Cancelled {
                scheduler.drain(self.config.drain_grace).await;
                break;
            }
            tokio::select! {
                () = scheduler.join_all() => break,
                changed = control.changed() => {
                    if changed.is_err() {
                        scheduler.join_all().await;
                        break;
                    }
                    // Loop re-checks the control value.
                }
            }
        }

        if let Some(flusher) = self.flusher.take() {
            flusher.abort();
        }
        if let Err(err) = self.aggregator.flush() {
            warn!(error = %err, "final flush failed");
        }

        let cancelled = *self.control.borrow() == Control::Cancelled;
        let final_state = if self.aggregator.flush_exhausted() {
            error!("durable writes failed repeatedly; scan marked failed");
            SessionState::Failed
        } else if cancelled {
            SessionState::Cancelled
        } else {
            SessionState::Completed
        };

        {
            let mut state = self.state.lock().expect("state lock poisoned");
            *state = final_state;
        }

        let progress = self.progress();
        info!(
            scan_id = %self.id.short(),
            state = %final_state,
            completed = progress.completed,
            found = progress.found,
            "scan finished"
        );
        final_state
    }
}

/// Periodic incremental flush. Isolated failures are warnings; exhausted
/// retries cancel dispatch so the session can finalize as `Failed`.
fn spawn_flusher(
    aggregator: Arc<ResultAggregator>,
    control: Arc<watch::Sender<Control>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(FLUSH_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(err) = aggregator.flush() {
                warn!(error = %err, "incremental flush failed; results kept in memory");
                if aggregator.flush_exhausted() {
                    error!("flush retries exhausted; stopping dispatch");
                    control.send_replace(Control::Cancelled);
                    break;
                }
            }
        }
    })
}
