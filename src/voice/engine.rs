//! Single-slot asynchronous job engine backing the `voice_*` command family.
//!
//! Exactly one [`VoiceTestEngine`] exists per process; it owns one job slot.
//! A `voice_start_test` command moves the slot to `Running` and spawns a
//! worker task; the worker's completion is observed only through polling
//! (`has_result`) and consumed once (`consume`) — it is never pushed back
//! through the session that started it.
//!
//! The slot fields `{exe_id, state, result}` are updated as one unit behind a
//! single mutex, so readers never observe a torn intermediate state. A start
//! that supersedes a still-running job wins the slot: the superseded worker
//! compares its own execution id against the slot before publishing and
//! discards its result when it lost.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::voice::synth::synthesize_result;
use crate::{AppError, Result};

/// Lifecycle state of the job slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// No job started, or the last result was consumed.
    Idle,
    /// A worker is running; the result is not ready yet.
    Running,
    /// The worker published its result; `consume` will return it.
    Completed,
}

/// The process-wide job slot. Guarded as a whole by one mutex.
#[derive(Debug)]
struct JobSlot {
    exe_id: String,
    state: JobState,
    result: String,
    /// Parent token for in-flight workers; cancelled and replaced on release.
    cancel: CancellationToken,
}

impl JobSlot {
    fn new() -> Self {
        Self {
            exe_id: String::new(),
            state: JobState::Idle,
            result: String::new(),
            cancel: CancellationToken::new(),
        }
    }
}

/// One consistent snapshot of engine state, serialized for
/// `voice_get_status`. Wire field names are fixed by the protocol
/// (`hasResult`, `currentExeID`, `testCount`).
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EngineStatus {
    /// Whether the engine has been initialized.
    pub initialized: bool,
    /// Whether a completed result is waiting to be consumed.
    #[serde(rename = "hasResult")]
    pub has_result: bool,
    /// Execution id of the job currently occupying the slot.
    #[serde(rename = "currentExeID")]
    pub current_exe_id: String,
    /// Total number of tests started since process start.
    #[serde(rename = "testCount")]
    pub test_count: u64,
    /// Snapshot time in epoch milliseconds.
    pub timestamp: i64,
}

/// Single-slot voice test engine.
pub struct VoiceTestEngine {
    initialized: AtomicBool,
    init_delay: Duration,
    slot: Mutex<JobSlot>,
    test_counter: AtomicU64,
}

impl VoiceTestEngine {
    /// Create an uninitialized engine with the given simulated init delay.
    #[must_use]
    pub fn new(init_delay: Duration) -> Self {
        Self {
            initialized: AtomicBool::new(false),
            init_delay,
            slot: Mutex::new(JobSlot::new()),
            test_counter: AtomicU64::new(0),
        }
    }

    /// Initialize the engine after the simulated delay.
    ///
    /// Every command handler reads the resulting flag as a precondition
    /// gate. Calling `init` again after a `release` re-arms the engine.
    pub async fn init(&self) {
        info!("initializing voice test engine");
        tokio::time::sleep(self.init_delay).await;
        self.initialized.store(true, Ordering::SeqCst);
        info!("voice test engine initialized");
    }

    /// Non-blocking read of the initialization gate.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Total tests started since process start.
    #[must_use]
    pub fn test_count(&self) -> u64 {
        self.test_counter.load(Ordering::SeqCst)
    }

    /// Start a test run, overwriting any job still occupying the slot.
    ///
    /// Returns immediately; the worker publishes its result after a
    /// randomized 2–5 s delay. The generated execution id is unique for the
    /// process lifetime (monotonic counter plus timestamp).
    ///
    /// # Errors
    ///
    /// Returns `AppError::VoiceTest` when the engine is not initialized.
    pub async fn start(self: &Arc<Self>, title: &str, area: &str) -> Result<String> {
        if !self.is_initialized() {
            warn!("start requested while engine is uninitialized");
            return Err(AppError::VoiceTest("engine is not initialized".into()));
        }

        let seq = self.test_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let exe_id = format!("VOICE_TEST_{seq}_{}", Utc::now().timestamp_millis());

        let cancel = {
            let mut slot = self.slot.lock().await;
            if slot.state == JobState::Running {
                warn!(
                    superseded = %slot.exe_id,
                    "new test started while a job was still running; slot overwritten"
                );
            }
            slot.exe_id.clone_from(&exe_id);
            slot.result.clear();
            slot.state = JobState::Running;
            slot.cancel.child_token()
        };

        info!(exe_id = %exe_id, title, area, "voice test started");

        let engine = Arc::clone(self);
        let worker_exe_id = exe_id.clone();
        let title = title.to_owned();
        let area = area.to_owned();
        tokio::spawn(async move {
            engine.run_worker(worker_exe_id, title, area, cancel).await;
        });

        Ok(exe_id)
    }

    /// Worker body: simulated work delay, then a single guarded publication.
    async fn run_worker(
        &self,
        exe_id: String,
        title: String,
        area: String,
        cancel: CancellationToken,
    ) {
        let work_millis: u64 = rand::thread_rng().gen_range(2000..5000);

        tokio::select! {
            () = cancel.cancelled() => {
                // Only `release` cancels workers, and it clears the slot, so
                // an interrupted run has nothing to publish.
                warn!(exe_id = %exe_id, "voice test worker interrupted");
                return;
            }
            () = tokio::time::sleep(Duration::from_millis(work_millis)) => {}
        }

        let result = synthesize_result(&title, &area);

        // Publication point. A superseding start owns the slot now; a stale
        // worker must not overwrite the newer job's fields.
        let mut slot = self.slot.lock().await;
        if slot.exe_id == exe_id {
            slot.result = result;
            slot.state = JobState::Completed;
            info!(exe_id = %exe_id, result = %slot.result, "voice test completed");
        } else {
            debug!(exe_id = %exe_id, current = %slot.exe_id, "stale worker result discarded");
        }
    }

    /// Non-mutating readiness peek.
    pub async fn has_result(&self) -> bool {
        self.slot.lock().await.state == JobState::Completed
    }

    /// Consume the completed result, resetting the slot to idle.
    ///
    /// The first caller after completion wins; a second caller sees `None`
    /// until another job completes.
    pub async fn consume(&self) -> Option<(String, String)> {
        let mut slot = self.slot.lock().await;
        if slot.state != JobState::Completed {
            return None;
        }
        let result = std::mem::take(&mut slot.result);
        let exe_id = std::mem::take(&mut slot.exe_id);
        slot.state = JobState::Idle;
        info!(exe_id = %exe_id, "voice test result consumed");
        Some((result, exe_id))
    }

    /// One consistent snapshot of initialization gate and job slot.
    pub async fn status(&self) -> EngineStatus {
        let slot = self.slot.lock().await;
        EngineStatus {
            initialized: self.is_initialized(),
            has_result: slot.state == JobState::Completed,
            current_exe_id: slot.exe_id.clone(),
            test_count: self.test_count(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// Tear the engine down at process shutdown.
    ///
    /// Clears the initialization gate, cancels in-flight workers, and resets
    /// the slot. Future starts fail until `init` runs again.
    pub async fn release(&self) {
        info!("releasing voice test engine");
        self.initialized.store(false, Ordering::SeqCst);
        let mut slot = self.slot.lock().await;
        slot.cancel.cancel();
        *slot = JobSlot::new();
    }
}

impl std::fmt::Debug for VoiceTestEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceTestEngine")
            .field("initialized", &self.is_initialized())
            .field("test_count", &self.test_count())
            .finish_non_exhaustive()
    }
}
