//! Mode-switch orchestration
//!
//! One run walks Idle → CheckingConnectivity → Cooling → AwaitingKeyRelease →
//! Dispatching → Persisting → Done. Any phase may end the run early with a
//! failure; infrastructure errors abort it with a [`SwitchError`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::bluetooth::{DeviceInventory, InventoryError};
use crate::hotkey::{KeyProbe, ProbeError, DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT};
use crate::mode::{Mode, ModePair};
use crate::notify::{Failure, NotificationPresenter, StatusSink};
use crate::storage::{PersistentModeState, StoreError};
use crate::voice::VoiceChannel;

/// Minimum spacing between two dispatched commands
pub const MIN_COMMAND_INTERVAL: Duration = Duration::from_millis(2500);

/// Source of wall-clock time in epoch milliseconds
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Phases of one orchestration run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    CheckingConnectivity,
    Cooling,
    AwaitingKeyRelease,
    Dispatching,
    Persisting,
    Done,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Idle => write!(f, "Idle"),
            Phase::CheckingConnectivity => write!(f, "CheckingConnectivity"),
            Phase::Cooling => write!(f, "Cooling"),
            Phase::AwaitingKeyRelease => write!(f, "AwaitingKeyRelease"),
            Phase::Dispatching => write!(f, "Dispatching"),
            Phase::Persisting => write!(f, "Persisting"),
            Phase::Done => write!(f, "Done"),
        }
    }
}

/// Terminal, user-facing reasons a run did not activate the mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// No AirPods connected
    NotConnected,
    /// Modifier keys were still held when the probe timed out
    ModifierKeysHeld,
    /// The voice-command channel refused or failed
    Channel(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure(FailureReason),
}

/// How a run raced against a shutdown signal ended
#[derive(Debug)]
pub enum Interruptible<T, S> {
    /// The run finished before any signal
    Completed(T),
    /// The signal arrived before dispatching; the run was dropped
    Abandoned(S),
    /// The signal arrived while the voice command was in flight and the run
    /// was allowed to finish
    Drained { result: T, signal: S },
}

/// Infrastructure errors that abort a run
#[derive(Debug, thiserror::Error)]
pub enum SwitchError {
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Probe(#[from] ProbeError),
}

/// Record of one activation request; never persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestrationAttempt {
    pub mode: Mode,
    pub phase: Phase,
    pub connected: Option<bool>,
    /// Time spent waiting out the cooldown
    pub cooldown: Duration,
    pub keys_released: Option<bool>,
    pub outcome: Option<Outcome>,
}

impl OrchestrationAttempt {
    fn new(mode: Mode) -> Self {
        Self {
            mode,
            phase: Phase::Idle,
            connected: None,
            cooldown: Duration::ZERO,
            keys_released: None,
            outcome: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Some(Outcome::Success)
    }

    fn transition_to(&mut self, phase: Phase) {
        info!(from = %self.phase, to = %phase, mode = %self.mode, "orchestration transition");
        self.phase = phase;
    }

    fn finish(mut self, outcome: Outcome) -> Self {
        self.transition_to(Phase::Done);
        debug!(?outcome, "orchestration finished");
        self.outcome = Some(outcome);
        self
    }
}

/// Time still to wait before the next command may be dispatched
///
/// A timestamp in the future counts as "just executed".
pub fn cooldown_remaining(now_ms: i64, last_executed_ms: i64, min_interval: Duration) -> Duration {
    let elapsed = Duration::from_millis(now_ms.saturating_sub(last_executed_ms).max(0) as u64);
    min_interval.saturating_sub(elapsed)
}

/// Timing knobs of the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub min_interval: Duration,
    pub key_release_timeout: Duration,
    pub key_poll_interval: Duration,
    /// Extra message attached to success notifications
    pub success_detail: Option<String>,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            min_interval: MIN_COMMAND_INTERVAL,
            key_release_timeout: DEFAULT_TIMEOUT,
            key_poll_interval: DEFAULT_POLL_INTERVAL,
            success_detail: None,
        }
    }
}

/// Publishes `Idle` when a run ends, including when it is dropped
struct IdleOnDrop<'a>(&'a watch::Sender<Phase>);

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        self.0.send_replace(Phase::Idle);
    }
}

/// Decides whether a switch may proceed and drives it to completion
pub struct ModeSwitchOrchestrator {
    inventory: DeviceInventory,
    state: PersistentModeState,
    probe: Arc<dyn KeyProbe>,
    voice: Arc<dyn VoiceChannel>,
    sink: Arc<dyn StatusSink>,
    clock: Arc<dyn Clock>,
    pair: ModePair,
    settings: OrchestratorSettings,
    /// Serializes runs so toggle read-modify-write cannot interleave
    run_lock: Mutex<()>,
    /// Phase of the run in progress, `Idle` between runs
    phase: watch::Sender<Phase>,
}

impl ModeSwitchOrchestrator {
    pub fn new(
        inventory: DeviceInventory,
        state: PersistentModeState,
        probe: Arc<dyn KeyProbe>,
        voice: Arc<dyn VoiceChannel>,
        sink: Arc<dyn StatusSink>,
        pair: ModePair,
    ) -> Self {
        Self {
            inventory,
            state,
            probe,
            voice,
            sink,
            clock: Arc::new(SystemClock),
            pair,
            settings: OrchestratorSettings::default(),
            run_lock: Mutex::new(()),
            phase: watch::Sender::new(Phase::Idle),
        }
    }

    pub fn with_settings(mut self, settings: OrchestratorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Whether the run in progress has started talking to the voice channel
    pub fn is_dispatching(&self) -> bool {
        matches!(*self.phase.borrow(), Phase::Dispatching | Phase::Persisting)
    }

    /// Drive `run` until `shutdown` resolves
    ///
    /// A run still gating (connectivity, cooldown, key release) is dropped on
    /// shutdown. Once it is dispatching, it runs to completion so the voice
    /// channel can restore the desktop.
    pub async fn until_shutdown<R, S>(&self, run: R, shutdown: S) -> Interruptible<R::Output, S::Output>
    where
        R: Future,
        S: Future,
    {
        tokio::pin!(run);
        tokio::select! {
            result = &mut run => Interruptible::Completed(result),
            signal = shutdown => {
                if self.is_dispatching() {
                    warn!("shutdown requested mid-dispatch, finishing the voice command first");
                    Interruptible::Drained { result: run.await, signal }
                } else {
                    Interruptible::Abandoned(signal)
                }
            }
        }
    }

    /// Toggle to the stored next mode
    ///
    /// The toggle pointer advances before activation, so a failed activation
    /// still moves it on.
    pub async fn switch_mode(&self) -> Result<OrchestrationAttempt, SwitchError> {
        let _guard = self.run_lock.lock().await;

        let current = self.state.next_mode().await?.unwrap_or(self.pair.mode_one);
        let next = self.pair.other(current).unwrap_or(self.pair.mode_one);
        self.state.set_next_mode(next).await?;
        info!(%current, %next, "toggle pointer advanced");

        self.activate(current).await
    }

    /// Activate one specific mode
    pub async fn set_mode(&self, mode: Mode) -> Result<OrchestrationAttempt, SwitchError> {
        let _guard = self.run_lock.lock().await;
        self.activate(mode).await
    }

    async fn activate(&self, mode: Mode) -> Result<OrchestrationAttempt, SwitchError> {
        let mut presenter = NotificationPresenter::new(Arc::clone(&self.sink));
        let _idle = IdleOnDrop(&self.phase);

        let result = self.run(mode, &mut presenter).await;
        if let Err(e) = &result {
            warn!(?e, %mode, "mode switch aborted");
            presenter.fail(Failure::Unexpected(&e.to_string()));
        }
        result
    }

    fn enter(&self, attempt: &mut OrchestrationAttempt, phase: Phase) {
        attempt.transition_to(phase);
        self.phase.send_replace(phase);
    }

    async fn run(
        &self,
        mode: Mode,
        presenter: &mut NotificationPresenter,
    ) -> Result<OrchestrationAttempt, SwitchError> {
        let mut attempt = OrchestrationAttempt::new(mode);

        self.enter(&mut attempt, Phase::CheckingConnectivity);
        let connected = self.inventory.is_any_device_connected().await?;
        attempt.connected = Some(connected);
        if !connected {
            presenter.fail(Failure::NotConnected);
            return Ok(attempt.finish(Outcome::Failure(FailureReason::NotConnected)));
        }

        presenter.begin(mode);

        self.enter(&mut attempt, Phase::Cooling);
        if let Some(last) = self.state.last_executed_at().await? {
            let remaining = cooldown_remaining(self.clock.now_ms(), last, self.settings.min_interval);
            if !remaining.is_zero() {
                debug!(remaining_ms = remaining.as_millis() as u64, "waiting out cooldown");
                tokio::time::sleep(remaining).await;
            }
            attempt.cooldown = remaining;
        }

        self.enter(&mut attempt, Phase::AwaitingKeyRelease);
        let released = self
            .probe
            .wait_for_release(self.settings.key_release_timeout, self.settings.key_poll_interval)
            .await?;
        attempt.keys_released = Some(released);
        if !released {
            presenter.fail(Failure::ModifierKeysHeld);
            return Ok(attempt.finish(Outcome::Failure(FailureReason::ModifierKeysHeld)));
        }

        self.enter(&mut attempt, Phase::Dispatching);
        if let Err(e) = self.voice.activate(mode.prompt()).await {
            let message = e.to_string();
            warn!(%mode, error = %message, "voice command failed");
            presenter.fail(Failure::Channel(&message));
            return Ok(attempt.finish(Outcome::Failure(FailureReason::Channel(message))));
        }

        self.enter(&mut attempt, Phase::Persisting);
        self.state.set_last_executed_at(self.clock.now_ms()).await?;
        if let Some(next) = self.pair.other(mode) {
            self.state.set_next_mode(next).await?;
        }

        presenter.succeed(self.settings.success_detail.as_deref());
        Ok(attempt.finish(Outcome::Success))
    }
}
