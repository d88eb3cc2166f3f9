//! Bounded-concurrency probe scheduling.
//!
//! A fixed pool of `concurrency` workers drives the scan. Each worker loops:
//! control gate → optional rate-limit wait → pull ONE candidate from the
//! shared enumerator → probe → record. Pulling a candidate advances the
//! cursor and IS the dispatch, so the cursor is always the exact frontier
//! between offered and unoffered addresses, and pause/resume can never
//! re-dispatch a completed address or skip an undispatched one.
//!
//! Pause and cancel are cooperative: workers check the control channel
//! between units of work, never mid-probe. An in-flight probe is allowed to
//! reach its own timeout; on cancel, stragglers past the drain grace are
//! aborted.

mod rate_limit;

pub use rate_limit::RateLimiter;

use std::net::IpAddr;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::aggregate::ResultAggregator;
use crate::enumerate::AddressEnumerator;
use crate::resolver::{randomized_query_name, DnsProber, Probe};
use crate::session::SessionCounters;
use crate::types::RecordType;

/// Dispatch control signal shared by all workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Dispatch freely.
    Running,
    /// Stop issuing new probes; in-flight probes finish naturally.
    Paused,
    /// Stop dispatch and wind down.
    Cancelled,
}

/// Everything a worker needs to turn candidates into recorded outcomes.
pub(crate) struct SchedulerContext {
    pub enumerator: Arc<Mutex<AddressEnumerator>>,
    pub aggregator: Arc<ResultAggregator>,
    pub prober: Arc<dyn DnsProber>,
    pub counters: Arc<SessionCounters>,
    pub domain: String,
    pub record_type: RecordType,
    pub random_label: bool,
    pub probe_timeout: Duration,
    pub rate_limiter: Option<RateLimiter>,
}

/// Handle over the running worker pool.
pub struct ProbeScheduler {
    workers: JoinSet<()>,
}

impl ProbeScheduler {
    /// Spawn `concurrency` workers against the shared context.
    pub(crate) fn spawn(
        concurrency: usize,
        control: &watch::Sender<Control>,
        ctx: Arc<SchedulerContext>,
    ) -> Self {
        let mut workers = JoinSet::new();
        for _ in 0..concurrency {
            let ctx = Arc::clone(&ctx);
            let rx = control.subscribe();
            workers.spawn(worker_loop(ctx, rx));
        }
        Self { workers }
    }

    /// Await every worker. Returns when the enumerator is exhausted and all
    /// in-flight probes have settled (or all workers exited on cancel).
    pub async fn join_all(&mut self) {
        while let Some(result) = self.workers.join_next().await {
            if let Err(err) = result {
                if !err.is_cancelled() {
                    warn!(error = %err, "scan worker terminated abnormally");
                }
            }
        }
    }

    /// Let in-flight probes drain for at most `grace`, then abort the rest.
    ///
    /// Returns whether the pool drained cleanly within the grace period.
    pub async fn drain(&mut self, grace: Duration) -> bool {
        if tokio::time::timeout(grace, self.join_all()).await.is_ok() {
            return true;
        }
        warn!(grace_ms = grace.as_millis() as u64, "drain grace elapsed; aborting in-flight probes");
        self.workers.abort_all();
        self.join_all().await;
        false
    }
}

async fn worker_loop(ctx: Arc<SchedulerContext>, mut control: watch::Receiver<Control>) {
    loop {
        if gate(&mut control).await == Control::Cancelled {
            break;
        }

        if let Some(limiter) = &ctx.rate_limiter {
            limiter.wait().await;
        }

        // Pull-one == dispatch: the cursor moves exactly when a worker
        // commits to probing the candidate.
        let candidate = {
            let mut enumerator = ctx.enumerator.lock().expect("enumerator lock poisoned");
            enumerator.next_candidate()
        };
        let Some(address) = candidate else {
            break;
        };
        ctx.counters.dispatched.fetch_add(1, Ordering::Relaxed);

        let query_name = if ctx.random_label {
            randomized_query_name(&ctx.domain)
        } else {
            ctx.domain.clone()
        };

        let probe = Probe {
            address: IpAddr::V4(address),
            query_name,
            record_type: ctx.record_type,
            timeout: ctx.probe_timeout,
        };

        let outcome = ctx.prober.probe(&probe).await;
        if outcome.status.is_found() {
            debug!(address = %outcome.address, latency_ms = outcome.latency.as_millis() as u64, "resolver found");
        }
        ctx.aggregator.record(&outcome);
        ctx.counters.completed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Wait out a pause. Resolves to the first non-paused control value.
async fn gate(control: &mut watch::Receiver<Control>) -> Control {
    loop {
        let current = *control.borrow_and_update();
        match current {
            Control::Paused => {
                if control.changed().await.is_err() {
                    // Sender gone: treat as cancellation.
                    return Control::Cancelled;
                }
            }
            other => return other,
        }
    }
}
