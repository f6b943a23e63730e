// ── Stream state store ──
//
// The single shared mutable structure of a session. Per-camera entries
// live in a `DashMap`, so every mutator holds exactly one shard lock and
// cameras never contend with each other. Two `watch` channels fan the
// state out: a full snapshot for renderers and the streaming set
// (camera -> stream epoch) that drives the frame poller.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::watch;

use crate::error::{CoreError, InvariantViolation};
use crate::model::{Camera, CameraFault, CameraId, DetectionModel, FrameHandle, FrameLedger};
use crate::stream::CameraStream;

/// Cameras currently streaming, with the epoch of their current run.
pub type StreamingSet = Arc<BTreeMap<CameraId, u64>>;

/// Outcome of handing a fetched frame to the store.
#[derive(Debug)]
pub(crate) enum FrameInstall {
    /// Installed. Carries the superseded frame so the caller releases it
    /// after the new one is visible.
    Installed(Option<FrameHandle>),
    /// The camera stopped, or restarted under a newer epoch, before the
    /// frame arrived. The frame was dropped.
    Stale,
}

struct Slot {
    ordinal: u64,
    camera: Arc<Camera>,
}

/// In-memory table of per-camera runtime state.
pub struct StreamStore {
    cameras: DashMap<CameraId, Slot>,
    next_ordinal: AtomicU64,
    selected_model: watch::Sender<DetectionModel>,
    snapshot: watch::Sender<Arc<Vec<Arc<Camera>>>>,
    streaming: watch::Sender<StreamingSet>,
    // Serializes rebuild-and-send so an older view never overwrites a newer one.
    publish_lock: Mutex<()>,
    ledger: FrameLedger,
}

impl StreamStore {
    pub fn new(default_model: DetectionModel) -> Self {
        let (selected_model, _) = watch::channel(default_model);
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        let (streaming, _) = watch::channel(Arc::new(BTreeMap::new()));

        Self {
            cameras: DashMap::new(),
            next_ordinal: AtomicU64::new(0),
            selected_model,
            snapshot,
            streaming,
            publish_lock: Mutex::new(()),
            ledger: FrameLedger::new(),
        }
    }

    // ── Mutations ───────────────────────────────────────────────────

    /// Insert a camera, or refresh the identity of an existing entry.
    ///
    /// New entries always start idle; stream state is only ever set
    /// through `set_streaming`. Returns `true` if the camera was new.
    pub fn upsert(&self, camera: Camera) -> bool {
        let is_new = match self.cameras.entry(camera.id.clone()) {
            Entry::Occupied(mut slot) => {
                Arc::make_mut(&mut slot.get_mut().camera).merge_identity(&camera);
                false
            }
            Entry::Vacant(vacant) => {
                let mut fresh = Camera::new(camera.id, camera.source_name, camera.stream_kind);
                fresh.location = camera.location;
                vacant.insert(Slot {
                    ordinal: self.next_ordinal.fetch_add(1, Ordering::Relaxed),
                    camera: Arc::new(fresh),
                });
                true
            }
        };
        self.publish();
        is_new
    }

    /// Flip a camera's streaming flag. Returns the camera's stream epoch
    /// after the change.
    ///
    /// Entering the streaming state bumps the epoch and records `model` as
    /// the running model. Leaving it clears the frame, the running model
    /// and the failure counter in the same step.
    pub(crate) fn set_streaming(
        &self,
        id: &CameraId,
        streaming: bool,
        model: Option<DetectionModel>,
    ) -> Result<u64, CoreError> {
        let (epoch, released) = {
            let mut slot = self.cameras.get_mut(id).ok_or_else(|| not_found(id))?;
            let camera = Arc::make_mut(&mut slot.camera);
            let mut released = None;
            if streaming {
                if !camera.is_streaming {
                    camera.is_streaming = true;
                    camera.stream_epoch += 1;
                    camera.consecutive_frame_failures = 0;
                }
                if model.is_some() {
                    camera.active_model = model;
                }
            } else {
                camera.is_streaming = false;
                camera.active_model = None;
                camera.consecutive_frame_failures = 0;
                released = camera.frame.take();
            }
            (camera.stream_epoch, released)
        };
        self.publish();
        drop(released);
        Ok(epoch)
    }

    /// Install a freshly fetched frame for the run identified by `epoch`.
    pub(crate) fn install_frame(&self, id: &CameraId, epoch: u64, frame: FrameHandle) -> FrameInstall {
        let previous = {
            let Some(mut slot) = self.cameras.get_mut(id) else {
                return FrameInstall::Stale;
            };
            if !slot.camera.is_streaming || slot.camera.stream_epoch != epoch {
                return FrameInstall::Stale;
            }
            let camera = Arc::make_mut(&mut slot.camera);
            camera.frames_received += 1;
            camera.consecutive_frame_failures = 0;
            camera.last_frame_at = Some(frame.fetched_at());
            camera.frame.replace(frame)
        };
        self.publish();
        FrameInstall::Installed(previous)
    }

    /// Take the frame held for the run identified by `epoch`.
    pub(crate) fn release_frame(&self, id: &CameraId, epoch: u64) -> Option<FrameHandle> {
        let taken = {
            let mut slot = self.cameras.get_mut(id)?;
            if slot.camera.stream_epoch != epoch || slot.camera.frame.is_none() {
                return None;
            }
            Arc::make_mut(&mut slot.camera).frame.take()
        };
        self.publish();
        taken
    }

    /// Take every held frame. Used when a session is torn down.
    pub(crate) fn release_all_frames(&self) -> Vec<FrameHandle> {
        let taken: Vec<FrameHandle> = self
            .cameras
            .iter_mut()
            .filter_map(|mut slot| {
                if slot.camera.frame.is_none() {
                    return None;
                }
                Arc::make_mut(&mut slot.camera).frame.take()
            })
            .collect();
        if !taken.is_empty() {
            self.publish();
        }
        taken
    }

    /// Count a failed poll tick. Returns the new consecutive failure count,
    /// or `None` if the run is no longer current.
    pub(crate) fn record_frame_failure(&self, id: &CameraId, epoch: u64) -> Option<u32> {
        let failures = {
            let mut slot = self.cameras.get_mut(id)?;
            if !slot.camera.is_streaming || slot.camera.stream_epoch != epoch {
                return None;
            }
            let camera = Arc::make_mut(&mut slot.camera);
            camera.consecutive_frame_failures = camera.consecutive_frame_failures.saturating_add(1);
            camera.consecutive_frame_failures
        };
        self.publish();
        Some(failures)
    }

    /// Remember the latest start/stop failure for a camera.
    pub fn record_fault(&self, id: &CameraId, fault: CameraFault) {
        let Some(mut slot) = self.cameras.get_mut(id) else {
            return;
        };
        Arc::make_mut(&mut slot.camera).last_error = Some(fault);
        drop(slot);
        self.publish();
    }

    pub fn clear_fault(&self, id: &CameraId) {
        let cleared = self.cameras.get_mut(id).is_some_and(|mut slot| {
            if slot.camera.last_error.is_none() {
                return false;
            }
            Arc::make_mut(&mut slot.camera).last_error = None;
            true
        });
        if cleared {
            self.publish();
        }
    }

    /// Choose the model applied to streams started from now on.
    pub fn select_model(&self, model: DetectionModel) {
        self.selected_model.send_replace(model);
    }

    // ── Reads ───────────────────────────────────────────────────────

    pub fn selected_model(&self) -> DetectionModel {
        *self.selected_model.borrow()
    }

    pub fn camera(&self, id: &CameraId) -> Option<Arc<Camera>> {
        self.cameras.get(id).map(|slot| Arc::clone(&slot.camera))
    }

    pub fn contains(&self, id: &CameraId) -> bool {
        self.cameras.contains_key(id)
    }

    /// Every camera, in directory order (cheap `Arc` clone).
    pub fn snapshot(&self) -> Arc<Vec<Arc<Camera>>> {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> CameraStream {
        CameraStream::new(self.snapshot.subscribe())
    }

    /// Receiver for the streaming set, which changes only when a camera
    /// starts, stops, or restarts.
    pub fn streaming_set(&self) -> watch::Receiver<StreamingSet> {
        self.streaming.subscribe()
    }

    /// `true` iff at least one camera is streaming. Always derived from
    /// the per-camera flags.
    pub fn is_any_streaming(&self) -> bool {
        self.cameras.iter().any(|slot| slot.camera.is_streaming)
    }

    pub fn streaming_ids(&self) -> Vec<CameraId> {
        self.snapshot()
            .iter()
            .filter(|c| c.is_streaming)
            .map(|c| c.id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }

    /// Allocation counters for every frame this store has seen.
    pub fn frame_ledger(&self) -> &FrameLedger {
        &self.ledger
    }

    /// Verify the coupling between stream state and held resources.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        for slot in &self.cameras {
            let camera = &slot.camera;
            if camera.is_streaming {
                continue;
            }
            if let Some(frame) = &camera.frame {
                return Err(InvariantViolation::IdleCameraHoldsFrame {
                    camera: camera.id.clone(),
                    frame_seq: frame.seq(),
                });
            }
            if camera.active_model.is_some() {
                return Err(InvariantViolation::IdleCameraHasModel {
                    camera: camera.id.clone(),
                });
            }
        }
        Ok(())
    }

    // ── Private helpers ─────────────────────────────────────────────

    /// Rebuild both broadcast views from the map. Must be called with no
    /// shard guard held.
    ///
    /// The walk and both sends happen under `publish_lock`: whichever call
    /// takes the lock last reads the map last, so the published views
    /// always reflect the newest mutation.
    fn publish(&self) {
        let _guard = self.publish_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut slots: Vec<(u64, Arc<Camera>)> = self
            .cameras
            .iter()
            .map(|slot| (slot.ordinal, Arc::clone(&slot.camera)))
            .collect();
        slots.sort_unstable_by_key(|(ordinal, _)| *ordinal);

        let streaming: BTreeMap<CameraId, u64> = slots
            .iter()
            .filter(|(_, c)| c.is_streaming)
            .map(|(_, c)| (c.id.clone(), c.stream_epoch))
            .collect();
        let cameras: Vec<Arc<Camera>> = slots.into_iter().map(|(_, c)| c).collect();

        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(cameras));
        self.streaming.send_if_modified(|current| {
            if **current == streaming {
                false
            } else {
                *current = Arc::new(streaming);
                true
            }
        });
    }
}

impl Default for StreamStore {
    fn default() -> Self {
        Self::new(DetectionModel::default())
    }
}

fn not_found(id: &CameraId) -> CoreError {
    CoreError::CameraNotFound {
        identifier: id.to_string(),
    }
}
