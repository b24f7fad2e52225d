//! Recast job controller: runs the boot-delay / mute / recast / restore
//! sequence for one device, at most one attempt at a time.
//!
//! ```text
//! Idle → Checking → (BootDelay) → (Muting) → Casting → (Restoring) → Idle
//! ```
//!
//! Starting an attempt cancels the running one and waits for it to stop
//! before spawning the new job. A cancelled job aborts its current sleep and
//! issues no further device-control calls; a mute it already applied is left
//! for the next job to deal with.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use castkeeper_domain::config::DeviceConfig;
use castkeeper_domain::entity::EntitySnapshot;
use castkeeper_domain::error::CastkeeperError;
use castkeeper_domain::predicate::{is_casting, should_cast};

use crate::device_memory::DeviceMemory;
use crate::ports::{DeviceControl, KeyValueStore, StateReader};

/// Wait between casting and restoring the volume.
pub const RESTORE_SETTLE_DELAY: Duration = Duration::from_secs(3);

/// Where the controller currently is in the recast sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecastPhase {
    #[default]
    Idle,
    Checking,
    BootDelay,
    Muting,
    Casting,
    Restoring,
}

/// How a recast attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecastOutcome {
    /// The guard refused: casting not allowed, or already casting.
    Skipped,
    Completed,
    /// A newer attempt (or shutdown) superseded this one.
    Cancelled,
    /// A device-control or storage call failed; not retried.
    Failed,
}

/// What the host currently says about a device, as far as recasting goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readiness {
    pub should_cast: bool,
    pub casting: bool,
}

impl Readiness {
    /// Evaluate both predicates against the host's current states.
    pub fn read<S: StateReader>(config: &DeviceConfig, states: &S) -> Self {
        let device = states.snapshot(&config.entity_id);
        let gate = config
            .enable_switch
            .as_ref()
            .and_then(|switch| states.state(switch));
        Self {
            should_cast: should_cast(config, device.as_ref().map(|d| &d.state), gate.as_ref()),
            casting: is_casting(device.as_ref().and_then(EntitySnapshot::app_name)),
        }
    }

    /// Whether a recast should go ahead.
    #[must_use]
    pub fn allows_recast(self) -> bool {
        self.should_cast && !self.casting
    }
}

struct RecastJob {
    token: CancellationToken,
    handle: JoinHandle<RecastOutcome>,
    outcome: watch::Receiver<Option<RecastOutcome>>,
}

impl Drop for RecastJob {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// The steps of one attempt, shared with the spawned job tasks.
struct Sequence<S, C, K> {
    config: Arc<DeviceConfig>,
    states: Arc<S>,
    control: Arc<C>,
    memory: Arc<DeviceMemory<K>>,
    phase: watch::Sender<RecastPhase>,
}

/// Single-flight recast orchestrator for one device.
pub struct RecastController<S, C, K> {
    sequence: Arc<Sequence<S, C, K>>,
    job: Mutex<Option<RecastJob>>,
    closed: CancellationToken,
}

impl<S, C, K> RecastController<S, C, K>
where
    S: StateReader + 'static,
    C: DeviceControl + 'static,
    K: KeyValueStore + 'static,
{
    /// Create an idle controller.
    pub fn new(
        config: Arc<DeviceConfig>,
        states: Arc<S>,
        control: Arc<C>,
        memory: Arc<DeviceMemory<K>>,
    ) -> Self {
        let (phase, _) = watch::channel(RecastPhase::Idle);
        Self {
            sequence: Arc::new(Sequence {
                config,
                states,
                control,
                memory,
                phase,
            }),
            job: Mutex::new(None),
            closed: CancellationToken::new(),
        }
    }

    /// Start a new attempt, cancelling and awaiting the previous one first.
    ///
    /// Returns once the new job is spawned; use [`wait`](Self::wait) to
    /// await its outcome. Does nothing once the controller is
    /// [closed](Self::close).
    #[tracing::instrument(skip(self), fields(entity_id = %self.sequence.config.entity_id))]
    pub async fn attempt_recast(&self) {
        let mut slot = self.job.lock().await;
        if self.closed.is_cancelled() {
            tracing::debug!("controller closed, ignoring recast attempt");
            return;
        }
        if let Some(previous) = slot.take() {
            tracing::debug!("cancelling previous recast attempt");
            stop(previous).await;
        }

        let token = CancellationToken::new();
        let (done, outcome) = watch::channel(None);
        let sequence = Arc::clone(&self.sequence);
        let handle = tokio::spawn({
            let token = token.clone();
            async move {
                let outcome = sequence.run(&token).await;
                done.send_replace(Some(outcome));
                outcome
            }
        });
        *slot = Some(RecastJob {
            token,
            handle,
            outcome,
        });
    }

    /// Wait for the current job to finish and return its outcome.
    ///
    /// The job slot is not held while waiting, so a newer attempt can still
    /// supersede the job; its outcome is then [`RecastOutcome::Cancelled`].
    /// Returns `None` when no job was started since the last wait.
    pub async fn wait(&self) -> Option<RecastOutcome> {
        let mut outcome = self.job.lock().await.as_ref()?.outcome.clone();
        let result = outcome
            .wait_for(Option::is_some)
            .await
            .ok()
            .and_then(|value| *value)
            .unwrap_or(RecastOutcome::Failed);

        let mut slot = self.job.lock().await;
        if slot
            .as_ref()
            .is_some_and(|job| job.outcome.same_channel(&outcome))
        {
            slot.take();
        }
        Some(result)
    }

    /// Cancel the current job, if any, and wait for it to stop.
    pub async fn cancel(&self) {
        if let Some(job) = self.job.lock().await.take() {
            stop(job).await;
        }
    }

    /// Refuse every further attempt, then cancel the current job.
    pub async fn close(&self) {
        self.closed.cancel();
        self.cancel().await;
    }

    /// Subscribe to phase changes.
    #[must_use]
    pub fn phase(&self) -> watch::Receiver<RecastPhase> {
        self.sequence.phase.subscribe()
    }
}

async fn stop(mut job: RecastJob) {
    job.token.cancel();
    if let Err(err) = (&mut job.handle).await {
        tracing::warn!(%err, "recast job ended abnormally");
    }
}

impl<S, C, K> Sequence<S, C, K>
where
    S: StateReader,
    C: DeviceControl,
    K: KeyValueStore,
{
    async fn run(&self, token: &CancellationToken) -> RecastOutcome {
        let entity_id = &self.config.entity_id;
        let outcome = match self.steps(token).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(%entity_id, %err, source = ?std::error::Error::source(&err), "recast failed");
                RecastOutcome::Failed
            }
        };
        self.phase.send_replace(RecastPhase::Idle);
        tracing::debug!(%entity_id, ?outcome, "recast attempt finished");
        outcome
    }

    async fn steps(&self, token: &CancellationToken) -> Result<RecastOutcome, CastkeeperError> {
        let config = &*self.config;
        let entity_id = &config.entity_id;

        self.enter(RecastPhase::Checking);
        if !Readiness::read(config, &*self.states).allows_recast() {
            return Ok(RecastOutcome::Skipped);
        }

        if self.memory.take_unavailable().await? {
            tracing::info!(
                %entity_id,
                delay_secs = config.boot_delay.as_secs(),
                "device was unavailable, waiting for it to boot"
            );
            self.enter(RecastPhase::BootDelay);
            if !pause(token, config.boot_delay).await {
                return Ok(RecastOutcome::Cancelled);
            }
        }

        let mut restore_level = None;
        if config.mute_before_recast {
            self.enter(RecastPhase::Muting);
            let level = self.memory.stored_volume().await?;
            if token.is_cancelled() {
                return Ok(RecastOutcome::Cancelled);
            }
            self.control.volume_set(entity_id, 0.0).await?;
            restore_level = Some(level);
        }

        if token.is_cancelled() {
            return Ok(RecastOutcome::Cancelled);
        }
        self.enter(RecastPhase::Casting);
        tracing::info!(%entity_id, url = %config.dashboard_url, "recasting dashboard");
        self.control
            .load_url(entity_id, &config.dashboard_url, true)
            .await?;

        if let Some(level) = restore_level.filter(|_| config.restore_volume_level) {
            self.enter(RecastPhase::Restoring);
            if !pause(token, RESTORE_SETTLE_DELAY).await {
                return Ok(RecastOutcome::Cancelled);
            }
            self.control.volume_set(entity_id, level).await?;
        }

        Ok(RecastOutcome::Completed)
    }

    fn enter(&self, phase: RecastPhase) {
        tracing::trace!(entity_id = %self.config.entity_id, ?phase, "recast phase");
        self.phase.send_replace(phase);
    }
}

/// Sleep for `duration`; `false` if cancelled first.
async fn pause(token: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        biased;
        () = token.cancelled() => false,
        () = tokio::time::sleep(duration) => true,
    }
}
