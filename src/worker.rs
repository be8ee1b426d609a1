//! Worker loop – the body of the `body-frame-worker` thread.

use crate::pipeline::{CycleError, FramePipeline};
use crate::session::{SessionCounters, Shared};
use crate::source::BodyFrameReader;
use log::{debug, error};
use parking_lot::Mutex;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Poll `reader` until the callback is cleared, then hand the reader back
/// so the controlling thread can release it after the join.
///
/// The stop signal is checked at the top of every iteration and again
/// immediately before delivery.  A poll already in flight completes first.
pub(crate) fn run<R: BodyFrameReader>(
    mut reader: R,
    mut pipeline: FramePipeline,
    shared: Arc<Mutex<Shared>>,
    counters: Arc<SessionCounters>,
    idle: Duration,
) -> R {
    shared.lock().worker_thread = Some(thread::current().id());

    loop {
        if shared.lock().callback.is_none() {
            break;
        }

        let frame = match reader.acquire_latest_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                counters.empty_polls.fetch_add(1, Ordering::Relaxed);
                if !idle.is_zero() {
                    thread::sleep(idle);
                }
                continue;
            }
            Err(e) => {
                debug!("Frame acquisition failed: {}", e);
                counters.source_errors.fetch_add(1, Ordering::Relaxed);
                if !idle.is_zero() {
                    thread::sleep(idle);
                }
                continue;
            }
        };

        counters.frames_processed.fetch_add(1, Ordering::Relaxed);

        let outcome = pipeline.process(&frame).map(|record| record.is_some());

        // Publish derived state and re-check the stop signal in one short
        // critical section; the callback itself runs unlocked.
        let callback = {
            let mut s = shared.lock();
            s.armed = pipeline.is_armed();
            if s.camera_height.is_none() {
                s.camera_height = pipeline.camera_height();
            }
            s.callback.clone()
        };

        match outcome {
            Ok(true) => {
                if let Some(callback) = callback {
                    callback(pipeline.record());
                    counters.frames_delivered.fetch_add(1, Ordering::Relaxed);
                }
            }
            Ok(false) => {}
            Err(CycleError::Read(e)) => {
                debug!("Skipping frame: {}", e);
                counters.skipped_cycles.fetch_add(1, Ordering::Relaxed);
            }
            Err(CycleError::Serialize(e)) => {
                error!("Dropping frame {}: {}", pipeline.frame(), e);
                counters.capacity_overflows.fetch_add(1, Ordering::Relaxed);
            }
        }

        drop(frame);
    }

    debug!("Body frame worker exiting");
    reader
}
