// ── Frame poller ──
//
// One tokio task per streaming camera, keyed by camera id. Each task is
// bound to the stream epoch it was spawned for and owns a child of the
// session's cancellation token. The supervisor watches the store's
// streaming set and reconciles the task registry against it.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use strum::Display;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::model::CameraId;
use crate::service::DetectionService;
use crate::store::{FrameInstall, StreamStore};

/// Per-camera poll loop state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum PollerState {
    Idle,
    Polling,
}

/// Cadence and logging knobs for the poll loops.
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    /// Warn on the first failure of a run, then every N consecutive
    /// failures. Zero warns on the first failure only.
    pub failure_log_every: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: crate::config::DEFAULT_POLL_INTERVAL,
            failure_log_every: 50,
        }
    }
}

struct PollTask {
    epoch: u64,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

struct PollerInner<S: DetectionService> {
    service: Arc<S>,
    store: Arc<StreamStore>,
    settings: PollSettings,
    cancel: CancellationToken,
    tasks: DashMap<CameraId, PollTask>,
}

/// Registry of per-camera poll loops.
pub struct FramePoller<S: DetectionService> {
    inner: Arc<PollerInner<S>>,
}

impl<S: DetectionService> Clone for FramePoller<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: DetectionService> FramePoller<S> {
    /// `cancel` is the session token; every loop runs under a child of it.
    pub fn new(
        service: Arc<S>,
        store: Arc<StreamStore>,
        settings: PollSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(PollerInner {
                service,
                store,
                settings,
                cancel,
                tasks: DashMap::new(),
            }),
        }
    }

    /// Spawn the task that keeps loops in line with the streaming set.
    /// Must be called from within a tokio runtime.
    pub fn spawn_supervisor(&self) -> JoinHandle<()> {
        let poller = self.clone();
        let mut streaming = self.inner.store.streaming_set();
        let cancel = self.inner.cancel.clone();

        tokio::spawn(async move {
            loop {
                let set = streaming.borrow_and_update().clone();
                poller.reconcile_with(&set);

                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    changed = streaming.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
            debug!("frame poller supervisor stopped");
        })
    }

    /// Bring the loop registry in line with the store right now.
    pub fn reconcile(&self) {
        let set = self.inner.store.streaming_set().borrow().clone();
        self.reconcile_with(&set);
    }

    pub fn state(&self, id: &CameraId) -> PollerState {
        match self.inner.tasks.get(id) {
            Some(task) if !task.handle.is_finished() => PollerState::Polling,
            _ => PollerState::Idle,
        }
    }

    /// Cameras with a live poll loop.
    pub fn active(&self) -> Vec<CameraId> {
        let mut ids: Vec<CameraId> = self
            .inner
            .tasks
            .iter()
            .filter(|task| !task.handle.is_finished())
            .map(|task| task.key().clone())
            .collect();
        ids.sort();
        ids
    }

    /// Stop every loop without waiting for in-flight fetches, then release
    /// every frame the store still holds.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
        self.inner.tasks.retain(|_, task| {
            task.cancel.cancel();
            task.handle.abort();
            false
        });
        let released = self.inner.store.release_all_frames();
        debug!(frames = released.len(), "frame poller shut down");
    }

    // ── Private helpers ─────────────────────────────────────────────

    fn reconcile_with(&self, set: &BTreeMap<CameraId, u64>) {
        if self.inner.cancel.is_cancelled() {
            return;
        }

        self.inner.tasks.retain(|id, task| {
            let current = set.get(id) == Some(&task.epoch) && !task.handle.is_finished();
            if !current {
                trace!(camera = %id, epoch = task.epoch, "cancelling poll loop");
                task.cancel.cancel();
            }
            current
        });

        for (id, epoch) in set {
            if let Entry::Vacant(slot) = self.inner.tasks.entry(id.clone()) {
                let cancel = self.inner.cancel.child_token();
                let handle = tokio::spawn(poll_camera(
                    Arc::clone(&self.inner.service),
                    Arc::clone(&self.inner.store),
                    id.clone(),
                    *epoch,
                    self.inner.settings,
                    cancel.clone(),
                ));
                slot.insert(PollTask {
                    epoch: *epoch,
                    cancel,
                    handle,
                });
            }
        }
    }
}

/// Poll one camera until its run ends or the loop is cancelled.
async fn poll_camera<S: DetectionService>(
    service: Arc<S>,
    store: Arc<StreamStore>,
    id: CameraId,
    epoch: u64,
    settings: PollSettings,
    cancel: CancellationToken,
) {
    debug!(camera = %id, epoch, "poll loop started");
    let mut interval = tokio::time::interval(settings.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }

        let current = store
            .camera(&id)
            .is_some_and(|c| c.is_streaming && c.stream_epoch() == epoch);
        if !current {
            break;
        }

        // The fetch races the token so a stop never waits on the network.
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = service.fetch_frame(&id) => result,
        };

        match result {
            Ok(bytes) => {
                let frame = store.frame_ledger().register(id.clone(), bytes);
                match store.install_frame(&id, epoch, frame) {
                    FrameInstall::Installed(previous) => drop(previous),
                    FrameInstall::Stale => break,
                }
            }
            Err(e) => {
                let Some(failures) = store.record_frame_failure(&id, epoch) else {
                    break;
                };
                if should_warn(failures, settings.failure_log_every) {
                    warn!(camera = %id, failures, error = %e, "frame fetch failed");
                } else {
                    debug!(camera = %id, failures, error = %e, "frame fetch failed");
                }
            }
        }
    }

    drop(store.release_frame(&id, epoch));
    debug!(camera = %id, epoch, "poll loop stopped");
}

fn should_warn(failures: u32, every: u32) -> bool {
    failures == 1 || (every > 0 && failures % every == 0)
}
