//! BodyTracker session tests

#![cfg(feature = "runtime")]

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use skeleton_json::replay::{ScriptedBody, ScriptedFrame, ScriptedSensor, SyntheticSensor};
    use skeleton_json::{
        BodyTracker, FrameRecord, SessionError, SessionOptions, SourceError, TrackingConfig, Vec4,
    };
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{mpsc, Arc, Weak};
    use std::thread;
    use std::time::{Duration, Instant};

    const PLANE: Vec4 = Vec4 {
        x: 0.0,
        y: 0.9,
        z: 0.3,
        w: 1.0,
    };

    fn always_on() -> TrackingConfig {
        TrackingConfig {
            mirror: true,
            gate_on_pose: false,
            world_space: false,
        }
    }

    fn fast() -> SessionOptions {
        SessionOptions {
            idle_poll_ms: 1,
            ..SessionOptions::default()
        }
    }

    fn body_frame(id: u64) -> ScriptedFrame {
        ScriptedFrame::new(PLANE).with_body(ScriptedBody::standing(id))
    }

    fn wait_until(what: &str, mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done() {
            assert!(Instant::now() < deadline, "timed out waiting for {}", what);
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn collector() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) + Send + Sync + 'static) {
        let records = Arc::new(Mutex::new(Vec::new()));
        let sink = records.clone();
        (records, move |record: &str| sink.lock().push(record.to_owned()))
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    #[test]
    fn start_delivers_records() {
        let sensor = ScriptedSensor::new([body_frame(42), body_frame(42)]);
        let tracker = BodyTracker::with_options(sensor.clone(), fast());
        let (records, callback) = collector();

        tracker.start(always_on(), callback).unwrap();
        assert!(tracker.is_running());
        wait_until("two records", || records.lock().len() == 2);
        tracker.stop();

        let records = records.lock();
        let first = FrameRecord::parse(&records[0]).unwrap();
        let second = FrameRecord::parse(&records[1]).unwrap();
        assert_eq!(first.frame, 1);
        assert_eq!(second.frame, 2);
        assert_eq!(first.body_ids(), vec![42]);

        assert!(tracker.is_armed());
        assert_eq!(tracker.camera_height(), Some(1.0));
        assert_eq!(tracker.config(), always_on());
    }

    #[test]
    fn start_while_running_is_rejected() {
        let sensor = ScriptedSensor::default();
        let tracker = BodyTracker::with_options(sensor.clone(), fast());

        tracker.start(always_on(), |_| {}).unwrap();
        let err = tracker.start(always_on(), |_| {}).unwrap_err();
        assert!(matches!(err, SessionError::AlreadyRunning));
        assert_eq!(sensor.readers_opened(), 1);

        tracker.stop();
    }

    #[test]
    fn stop_is_idempotent() {
        let tracker = BodyTracker::with_options(ScriptedSensor::default(), fast());
        tracker.stop();

        tracker.start(always_on(), |_| {}).unwrap();
        tracker.stop();
        tracker.stop();
        assert!(!tracker.is_running());
    }

    #[test]
    fn stop_releases_reader() {
        let sensor = ScriptedSensor::default();
        let tracker = BodyTracker::with_options(sensor.clone(), fast());

        tracker.start(always_on(), |_| {}).unwrap();
        assert_eq!(sensor.readers_live(), 1);
        tracker.stop();
        assert_eq!(sensor.readers_live(), 0);
    }

    #[test]
    fn drop_stops_session() {
        let sensor = ScriptedSensor::default();
        {
            let tracker = BodyTracker::with_options(sensor.clone(), fast());
            tracker.start(always_on(), |_| {}).unwrap();
        }
        assert_eq!(sensor.readers_live(), 0);
    }

    #[test]
    fn no_callback_after_stop() {
        let sensor = ScriptedSensor::new((0..5000).map(|_| body_frame(1)));
        let tracker = BodyTracker::with_options(sensor.clone(), fast());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        tracker
            .start(always_on(), move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        wait_until("first record", || calls.load(Ordering::SeqCst) > 0);
        tracker.stop();

        let after_stop = calls.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(calls.load(Ordering::SeqCst), after_stop);
        assert_eq!(tracker.stats().frames_delivered as usize, after_stop);
    }

    #[test]
    fn restart_resets_session_state() {
        let sensor = ScriptedSensor::new([body_frame(1)]);
        let tracker = BodyTracker::with_options(sensor.clone(), fast());
        let (records, callback) = collector();

        tracker.start(always_on(), callback).unwrap();
        wait_until("first session", || records.lock().len() == 1);
        tracker.stop();
        assert!(tracker.is_armed());

        let gated = TrackingConfig::default();
        sensor.push(body_frame(1));
        let (gated_records, callback) = collector();
        tracker.start(gated, callback).unwrap();
        assert!(!tracker.is_armed());

        wait_until("frame consumed", || tracker.stats().frames_processed == 1);
        tracker.stop();

        assert!(!tracker.is_armed());
        assert!(gated_records.lock().is_empty());
        assert_eq!(tracker.camera_height(), Some(1.0));
        assert_eq!(tracker.stats().frames_delivered, 0);
        assert_eq!(sensor.readers_opened(), 2);
    }

    #[test]
    fn unavailable_sensor_fails_start() {
        let tracker = BodyTracker::new(ScriptedSensor::unavailable());
        let err = tracker.start(always_on(), |_| {}).unwrap_err();

        assert!(matches!(
            err,
            SessionError::Source(SourceError::ReaderUnavailable(_))
        ));
        assert!(!tracker.is_running());
    }

    #[test]
    fn stop_from_callback_ends_session_after_callback() {
        let sensor = ScriptedSensor::new([body_frame(1), body_frame(1)]);
        let tracker = Arc::new(BodyTracker::with_options(sensor.clone(), fast()));
        let handle: Weak<BodyTracker<ScriptedSensor>> = Arc::downgrade(&tracker);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        tracker
            .start(always_on(), move |_| {
                if let Some(tracker) = handle.upgrade() {
                    tracker.stop();
                    assert!(tracker.start(always_on(), |_| {}).is_err());
                }
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        wait_until("first record", || calls.load(Ordering::SeqCst) == 1);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(sensor.remaining(), 1);

        // Not joined yet; the next stop on this thread does it.
        assert!(tracker.is_running());
        tracker.stop();
        assert!(!tracker.is_running());
        assert_eq!(sensor.readers_live(), 0);
    }

    #[test]
    fn start_after_callback_stop_joins_old_worker() {
        let sensor = ScriptedSensor::new([body_frame(1)]);
        let tracker = Arc::new(BodyTracker::with_options(sensor.clone(), fast()));
        let handle = Arc::downgrade(&tracker);

        tracker
            .start(always_on(), move |_| {
                if let Some(tracker) = handle.upgrade() {
                    tracker.stop();
                }
            })
            .unwrap();
        wait_until("first session", || tracker.stats().frames_delivered == 1);

        let (records, callback) = collector();
        sensor.push(body_frame(2));
        tracker.start(always_on(), callback).unwrap();
        wait_until("second session", || records.lock().len() == 1);
        tracker.stop();

        assert_eq!(sensor.readers_opened(), 2);
        assert_eq!(sensor.readers_live(), 0);
    }

    #[test]
    fn callback_can_query_while_stopping() {
        let sensor = ScriptedSensor::new((0..5000).map(|_| body_frame(1)));
        let tracker = Arc::new(BodyTracker::with_options(sensor.clone(), fast()));
        let handle = Arc::downgrade(&tracker);
        let entered = Arc::new(AtomicBool::new(false));
        let seen_running = Arc::new(AtomicBool::new(false));
        let (entered_flag, seen) = (entered.clone(), seen_running.clone());

        tracker
            .start(always_on(), move |_| {
                if entered_flag.swap(true, Ordering::SeqCst) {
                    return;
                }
                // Give the other thread time to get into stop().
                thread::sleep(Duration::from_millis(100));
                if let Some(tracker) = handle.upgrade() {
                    seen.store(tracker.is_running(), Ordering::SeqCst);
                    let _ = tracker.is_armed();
                    let _ = tracker.camera_height();
                }
            })
            .unwrap();
        wait_until("callback entered", || entered.load(Ordering::SeqCst));

        let (done_tx, done_rx) = mpsc::channel();
        let stopper = tracker.clone();
        thread::spawn(move || {
            stopper.stop();
            let _ = done_tx.send(());
        });

        assert!(
            done_rx.recv_timeout(Duration::from_secs(5)).is_ok(),
            "stop() did not return while the callback queried the tracker"
        );
        assert!(seen_running.load(Ordering::SeqCst));
        assert!(!tracker.is_running());
        assert_eq!(sensor.readers_live(), 0);
    }

    #[test]
    fn drop_on_worker_thread_still_ends_session() {
        let sensor = ScriptedSensor::new((0..5000).map(|_| body_frame(1)));
        let tracker = Arc::new(BodyTracker::with_options(sensor.clone(), fast()));
        let handle = Arc::downgrade(&tracker);
        let entered = Arc::new(AtomicBool::new(false));
        let released = Arc::new(AtomicBool::new(false));
        let calls = Arc::new(AtomicUsize::new(0));
        let (entered_flag, release, counter) = (entered.clone(), released.clone(), calls.clone());

        tracker
            .start(always_on(), move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                if let Some(tracker) = handle.upgrade() {
                    entered_flag.store(true, Ordering::SeqCst);
                    while !release.load(Ordering::SeqCst) {
                        thread::sleep(Duration::from_millis(1));
                    }
                    // Last strong reference: the tracker drops on this thread.
                    drop(tracker);
                }
            })
            .unwrap();

        wait_until("callback entered", || entered.load(Ordering::SeqCst));
        drop(tracker);
        released.store(true, Ordering::SeqCst);

        wait_until("reader released", || sensor.readers_live() == 0);
        let after = calls.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(calls.load(Ordering::SeqCst), after);
        assert_eq!(after, 1);
    }

    // -----------------------------------------------------------------------
    // Stats
    // -----------------------------------------------------------------------

    #[test]
    fn stats_count_polls_and_deliveries() {
        let sensor = ScriptedSensor::new([
            body_frame(1),
            ScriptedFrame::new(PLANE),
            body_frame(1).failing_clip_plane(),
        ]);
        let tracker = BodyTracker::with_options(sensor.clone(), fast());

        tracker.start(always_on(), |_| {}).unwrap();
        wait_until("queue drained", || {
            sensor.remaining() == 0 && tracker.stats().empty_polls > 0
        });
        tracker.stop();

        let stats = tracker.stats();
        assert_eq!(stats.frames_processed, 3);
        assert_eq!(stats.frames_delivered, 1);
        assert_eq!(stats.skipped_cycles, 1);
        assert_eq!(stats.capacity_overflows, 0);
    }

    #[test]
    fn overflow_delivers_nothing() {
        let sensor = ScriptedSensor::new([body_frame(1)]);
        let options = SessionOptions {
            idle_poll_ms: 1,
            output_capacity: 512,
        };
        let tracker = BodyTracker::with_options(sensor.clone(), options);
        let (records, callback) = collector();

        tracker.start(always_on(), callback).unwrap();
        wait_until("overflow", || tracker.stats().capacity_overflows == 1);
        tracker.stop();

        assert!(records.lock().is_empty());
        assert_eq!(tracker.stats().frames_delivered, 0);
    }

    // -----------------------------------------------------------------------
    // Synthetic sensor
    // -----------------------------------------------------------------------

    #[test]
    fn synthetic_bodies_qualify_by_pose() {
        let mut sensor = SyntheticSensor::new(2, 3);
        sensor.frame_interval = Duration::from_millis(1);
        let tracker = BodyTracker::with_options(sensor, fast());
        let (records, callback) = collector();

        tracker.start(TrackingConfig::default(), callback).unwrap();
        wait_until("synthetic records", || records.lock().len() >= 3);
        tracker.stop();

        assert!(tracker.is_armed());
        let records = records.lock();
        let first = FrameRecord::parse(&records[0]).unwrap();
        assert_eq!(first.frame, 1);
        assert_eq!(first.bodies.len(), 2);
        assert_eq!(first.floor_clip_plane.w, 1.05);
    }
}
