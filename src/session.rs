//! BodyTracker – the controlling thread's handle on a tracking session.
//!
//! ## Threads
//!
//! ```text
//! caller ── start ──▶ spawn "body-frame-worker" ── loop { poll → process → deliver }
//! caller ── stop  ──▶ clear callback → join worker → drop reader
//! ```
//!
//! The only state crossing threads is [`Shared`], always behind one
//! `parking_lot::Mutex`, plus the lock-free [`SessionCounters`].  The
//! callback is cloned out under the lock and invoked after releasing it, so
//! user code never runs while the lock is held.
//!
//! `start` and `stop` serialise on a second lock that owns the device and
//! the worker handle.  `stop` holds it across the join, so the worker must
//! never take it: every query the callback may make reads [`Shared`], and
//! `start`/`stop` called on the worker thread return before touching it.

use crate::pipeline::FramePipeline;
use crate::serializer::{Notifier, SilentNotifier};
use crate::source::{SensorDevice, SourceError};
use crate::settings::SessionOptions;
use crate::types::TrackingConfig;
use crate::worker;
use log::{error, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use thiserror::Error;

/// Receives one rendered frame.  Runs on the worker thread; the text is
/// only valid for the duration of the call.
pub type FrameCallback = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("body tracking is already running")]
    AlreadyRunning,
    #[error("could not open body frame reader: {0}")]
    Source(#[from] SourceError),
    #[error("failed to spawn body frame worker: {0}")]
    Spawn(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

pub(crate) struct Shared {
    /// `None` is the stop signal.
    pub(crate) callback: Option<FrameCallback>,
    pub(crate) config: TrackingConfig,
    pub(crate) armed: bool,
    pub(crate) camera_height: Option<f32>,
    /// True from a successful `start` until `stop` has joined the worker.
    pub(crate) running: bool,
    /// Set by the worker itself when it starts.
    pub(crate) worker_thread: Option<ThreadId>,
}

impl Shared {
    fn new() -> Self {
        Self {
            callback: None,
            config: TrackingConfig::default(),
            armed: false,
            camera_height: None,
            running: false,
            worker_thread: None,
        }
    }

    fn on_worker(&self) -> bool {
        self.worker_thread == Some(thread::current().id())
    }
}

#[derive(Debug, Default)]
pub(crate) struct SessionCounters {
    pub(crate) frames_processed: AtomicU64,
    pub(crate) frames_delivered: AtomicU64,
    pub(crate) empty_polls: AtomicU64,
    pub(crate) source_errors: AtomicU64,
    pub(crate) skipped_cycles: AtomicU64,
    pub(crate) capacity_overflows: AtomicU64,
}

impl SessionCounters {
    fn reset(&self) {
        for c in [
            &self.frames_processed,
            &self.frames_delivered,
            &self.empty_polls,
            &self.source_errors,
            &self.skipped_cycles,
            &self.capacity_overflows,
        ] {
            c.store(0, Ordering::Relaxed);
        }
    }

    fn snapshot(&self) -> SessionStats {
        SessionStats {
            frames_processed: self.frames_processed.load(Ordering::Relaxed),
            frames_delivered: self.frames_delivered.load(Ordering::Relaxed),
            empty_polls: self.empty_polls.load(Ordering::Relaxed),
            source_errors: self.source_errors.load(Ordering::Relaxed),
            skipped_cycles: self.skipped_cycles.load(Ordering::Relaxed),
            capacity_overflows: self.capacity_overflows.load(Ordering::Relaxed),
        }
    }
}

/// Counters for the current (or most recent) session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Frames acquired from the reader and run through the pipeline.
    pub frames_processed: u64,
    /// Records handed to the callback.
    pub frames_delivered: u64,
    /// Polls that returned no new frame.
    pub empty_polls: u64,
    /// Polls where the reader itself failed.
    pub source_errors: u64,
    /// Cycles dropped because a frame-level read failed.
    pub skipped_cycles: u64,
    /// Cycles aborted because the record did not fit the output buffer.
    pub capacity_overflows: u64,
}

// ---------------------------------------------------------------------------
// BodyTracker
// ---------------------------------------------------------------------------

struct Control<D: SensorDevice> {
    device: D,
    worker: Option<JoinHandle<D::Reader>>,
}

/// Owns a sensor device and runs at most one tracking session on it at a
/// time.  All methods take `&self`; share it behind an `Arc` to stop from
/// another thread.
pub struct BodyTracker<D: SensorDevice> {
    control: Mutex<Control<D>>,
    shared: Arc<Mutex<Shared>>,
    counters: Arc<SessionCounters>,
    options: SessionOptions,
    notifier: Arc<dyn Notifier>,
}

impl<D: SensorDevice> BodyTracker<D> {
    pub fn new(device: D) -> Self {
        Self::with_options(device, SessionOptions::default())
    }

    pub fn with_options(device: D, options: SessionOptions) -> Self {
        Self {
            control: Mutex::new(Control {
                device,
                worker: None,
            }),
            shared: Arc::new(Mutex::new(Shared::new())),
            counters: Arc::new(SessionCounters::default()),
            options,
            notifier: Arc::new(SilentNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Open a reader and start delivering frames to `callback`.
    pub fn start<F>(&self, config: TrackingConfig, callback: F) -> Result<(), SessionError>
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        if self.shared.lock().on_worker() {
            return Err(SessionError::AlreadyRunning);
        }

        let mut control = self.control.lock();
        if let Some(handle) = control.worker.take() {
            if self.shared.lock().callback.is_some() {
                control.worker = Some(handle);
                return Err(SessionError::AlreadyRunning);
            }
            // Stopped from its own callback and not joined yet.
            self.join_worker(handle);
        }

        let reader = control.device.open_body_reader()?;
        let callback: FrameCallback = Arc::new(callback);

        {
            let mut shared = self.shared.lock();
            shared.callback = Some(callback);
            shared.config = config;
            shared.armed = false;
            shared.camera_height = None;
            shared.running = true;
            shared.worker_thread = None;
        }
        self.counters.reset();

        let pipeline = FramePipeline::new(
            config,
            self.options.output_capacity,
            self.notifier.clone(),
        );
        let shared = self.shared.clone();
        let counters = self.counters.clone();
        let idle = self.options.idle_poll_interval();

        let spawned = thread::Builder::new()
            .name("body-frame-worker".into())
            .spawn(move || worker::run(reader, pipeline, shared, counters, idle));

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                let mut shared = self.shared.lock();
                shared.callback = None;
                shared.running = false;
                return Err(SessionError::Spawn(e));
            }
        };

        control.worker = Some(handle);

        info!("Body tracking started ({})", config);
        Ok(())
    }

    /// Stop the session and wait for the worker to exit.  No callback fires
    /// after this returns.  Calling it when nothing runs is a no-op.
    ///
    /// From inside the callback this only signals: the worker exits once the
    /// callback returns, and the join is left to the next `stop`, `start` or
    /// `Drop` on another thread.
    pub fn stop(&self) {
        {
            let mut shared = self.shared.lock();
            if shared.on_worker() {
                shared.callback = None;
                warn!("stop() called from the frame callback; worker will exit without a join");
                return;
            }
        }

        let mut control = self.control.lock();

        // Signal first so the worker falls out on its next check.
        self.shared.lock().callback = None;

        let Some(handle) = control.worker.take() else {
            return;
        };
        self.join_worker(handle);

        let stats = self.counters.snapshot();
        info!(
            "Body tracking stopped ({} frames processed, {} delivered)",
            stats.frames_processed, stats.frames_delivered
        );
    }

    /// Wait for a signalled worker and release the reader it hands back.
    fn join_worker(&self, handle: JoinHandle<D::Reader>) {
        match handle.join() {
            Ok(reader) => drop(reader),
            Err(_) => error!("Body frame worker panicked"),
        }

        let mut shared = self.shared.lock();
        shared.worker_thread = None;
        shared.running = false;
    }

    /// True from `start` until `stop` has joined the worker.
    pub fn is_running(&self) -> bool {
        self.shared.lock().running
    }

    /// True once any body has qualified in the current session.
    pub fn is_armed(&self) -> bool {
        self.shared.lock().armed
    }

    /// Camera height above the floor, once the sensor has reported one.
    pub fn camera_height(&self) -> Option<f32> {
        self.shared.lock().camera_height
    }

    pub fn config(&self) -> TrackingConfig {
        self.shared.lock().config
    }

    pub fn stats(&self) -> SessionStats {
        self.counters.snapshot()
    }
}

impl<D: SensorDevice> Drop for BodyTracker<D> {
    fn drop(&mut self) {
        self.stop();
    }
}
