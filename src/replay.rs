//! Replay sources: a scripted sensor that plays back queued frames, and a
//! synthetic sensor that animates bodies at the device's ~30 Hz cadence.
//!
//! Both implement the [`source`](crate::source) traits, so they stand in
//! for a real driver in tests and in the console binary.

use crate::source::{BodyFrame, BodyFrameReader, ReadError, SensorDevice, SourceError, TrackedBody};
use crate::types::{
    HandSide, HandState, JointSample, JointType, Quaternion, TrackingState, Vec3, Vec4,
    JOINT_COUNT, MAX_BODIES,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Camera-space positions of a person standing 2.5m in front of a sensor
/// mounted about 1m above the floor, arms down.
const STANDING_POSE: [(f32, f32, f32); JOINT_COUNT] = [
    (0.00, -0.10, 2.50), // SpineBase
    (0.00, 0.20, 2.50),  // SpineMid
    (0.00, 0.45, 2.50),  // Neck
    (0.00, 0.60, 2.50),  // Head
    (-0.18, 0.38, 2.50), // ShoulderLeft
    (-0.22, 0.10, 2.50), // ElbowLeft
    (-0.24, -0.12, 2.50),
    (-0.24, -0.18, 2.50),
    (0.18, 0.38, 2.50), // ShoulderRight
    (0.22, 0.10, 2.50),
    (0.24, -0.12, 2.50),
    (0.24, -0.18, 2.50),
    (-0.09, -0.15, 2.50), // HipLeft
    (-0.10, -0.55, 2.50),
    (-0.10, -0.92, 2.50),
    (-0.10, -0.98, 2.40),
    (0.09, -0.15, 2.50), // HipRight
    (0.10, -0.55, 2.50),
    (0.10, -0.92, 2.50),
    (0.10, -0.98, 2.40),
    (0.00, 0.38, 2.50), // SpineShoulder
    (-0.24, -0.26, 2.50), // HandTipLeft
    (-0.21, -0.20, 2.50),
    (0.24, -0.26, 2.50), // HandTipRight
    (0.21, -0.20, 2.50),
];

/// Arm joints moved by [`ScriptedBody::with_hands_raised`].
const RAISED_ARMS: [(JointType, f32, f32); 10] = [
    (JointType::ElbowLeft, -0.26, 0.55),
    (JointType::WristLeft, -0.30, 0.75),
    (JointType::HandLeft, -0.30, 0.80),
    (JointType::HandTipLeft, -0.30, 0.88),
    (JointType::ThumbLeft, -0.27, 0.80),
    (JointType::ElbowRight, 0.26, 0.55),
    (JointType::WristRight, 0.30, 0.75),
    (JointType::HandRight, 0.30, 0.80),
    (JointType::HandTipRight, 0.30, 0.88),
    (JointType::ThumbRight, 0.27, 0.80),
];

// ---------------------------------------------------------------------------
// Scripted body
// ---------------------------------------------------------------------------

/// Which read a [`ScriptedBody`] should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyRead {
    TrackingId,
    Joints,
    Orientations,
    HandState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedBody {
    pub id: u64,
    pub tracked: bool,
    pub joints: [JointSample; JOINT_COUNT],
    pub orientations: [Quaternion; JOINT_COUNT],
    pub left_hand: HandState,
    pub right_hand: HandState,
    pub failing: Option<BodyRead>,
}

impl ScriptedBody {
    /// A fully tracked body standing with its arms down.
    pub fn standing(id: u64) -> Self {
        Self {
            id,
            tracked: true,
            joints: std::array::from_fn(|i| {
                let (x, y, z) = STANDING_POSE[i];
                JointSample::new(TrackingState::Tracked, Vec3::new(x, y, z))
            }),
            orientations: [Quaternion::identity(); JOINT_COUNT],
            left_hand: HandState::Unknown,
            right_hand: HandState::Unknown,
            failing: None,
        }
    }

    /// An empty sensor slot.
    pub fn untracked() -> Self {
        Self {
            tracked: false,
            ..Self::standing(0)
        }
    }

    /// Both arms up, hand tips above the shoulders.
    pub fn with_hands_raised(mut self) -> Self {
        for (kind, x, y) in RAISED_ARMS {
            let joint = &mut self.joints[kind.index()];
            joint.position.x = x;
            joint.position.y = y;
        }
        self
    }

    pub fn with_hands(mut self, left: HandState, right: HandState) -> Self {
        self.left_hand = left;
        self.right_hand = right;
        self
    }

    pub fn with_position(mut self, kind: JointType, position: Vec3) -> Self {
        self.joints[kind.index()].position = position;
        self
    }

    pub fn with_height(mut self, kind: JointType, y: f32) -> Self {
        self.joints[kind.index()].position.y = y;
        self
    }

    pub fn with_state(mut self, kind: JointType, state: TrackingState) -> Self {
        self.joints[kind.index()].state = state;
        self
    }

    pub fn with_orientation(mut self, kind: JointType, orientation: Quaternion) -> Self {
        self.orientations[kind.index()] = orientation;
        self
    }

    /// Move every joint by `(dx, dy, dz)`.
    pub fn shifted(mut self, dx: f32, dy: f32, dz: f32) -> Self {
        for joint in &mut self.joints {
            joint.position.x += dx;
            joint.position.y += dy;
            joint.position.z += dz;
        }
        self
    }

    pub fn failing(mut self, read: BodyRead) -> Self {
        self.failing = Some(read);
        self
    }

    fn check(&self, read: BodyRead, what: &'static str) -> Result<(), ReadError> {
        if self.failing == Some(read) {
            return Err(ReadError::failed(what, "scripted failure"));
        }
        Ok(())
    }
}

impl TrackedBody for ScriptedBody {
    fn is_tracked(&self) -> Result<bool, ReadError> {
        Ok(self.tracked)
    }

    fn tracking_id(&self) -> Result<u64, ReadError> {
        self.check(BodyRead::TrackingId, "tracking id")?;
        Ok(self.id)
    }

    fn joints(&self) -> Result<[JointSample; JOINT_COUNT], ReadError> {
        self.check(BodyRead::Joints, "joints")?;
        Ok(self.joints)
    }

    fn joint_orientations(&self) -> Result<[Quaternion; JOINT_COUNT], ReadError> {
        self.check(BodyRead::Orientations, "joint orientations")?;
        Ok(self.orientations)
    }

    fn hand_state(&self, side: HandSide) -> Result<HandState, ReadError> {
        self.check(BodyRead::HandState, "hand state")?;
        Ok(match side {
            HandSide::Left => self.left_hand,
            HandSide::Right => self.right_hand,
        })
    }
}

// ---------------------------------------------------------------------------
// Scripted frame
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedFrame {
    pub clip_plane: Vec4,
    pub bodies: Vec<ScriptedBody>,
    pub fail_clip_plane: bool,
}

impl ScriptedFrame {
    pub fn new(clip_plane: Vec4) -> Self {
        Self {
            clip_plane,
            bodies: Vec::new(),
            fail_clip_plane: false,
        }
    }

    pub fn with_body(mut self, body: ScriptedBody) -> Self {
        self.bodies.push(body);
        self
    }

    pub fn failing_clip_plane(mut self) -> Self {
        self.fail_clip_plane = true;
        self
    }
}

impl BodyFrame for ScriptedFrame {
    type Body = ScriptedBody;

    fn floor_clip_plane(&self) -> Result<Vec4, ReadError> {
        if self.fail_clip_plane {
            return Err(ReadError::failed("floor clip plane", "scripted failure"));
        }
        Ok(self.clip_plane)
    }

    fn bodies(&self) -> Result<&[ScriptedBody], ReadError> {
        Ok(&self.bodies)
    }
}

// ---------------------------------------------------------------------------
// Scripted sensor
// ---------------------------------------------------------------------------

/// Plays back queued frames, then reports "no new frame" forever.
///
/// Clones share the same queue, so a test can keep a handle to push more
/// frames or inspect reader bookkeeping after handing the sensor to a
/// tracker.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSensor {
    queue: Arc<Mutex<VecDeque<ScriptedFrame>>>,
    readers_opened: Arc<AtomicUsize>,
    readers_live: Arc<AtomicUsize>,
    refuse_open: bool,
}

impl ScriptedSensor {
    pub fn new(frames: impl IntoIterator<Item = ScriptedFrame>) -> Self {
        Self {
            queue: Arc::new(Mutex::new(frames.into_iter().collect())),
            ..Self::default()
        }
    }

    /// A sensor whose reader cannot be opened.
    pub fn unavailable() -> Self {
        Self {
            refuse_open: true,
            ..Self::default()
        }
    }

    pub fn push(&self, frame: ScriptedFrame) {
        self.queue.lock().push_back(frame);
    }

    pub fn remaining(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn readers_opened(&self) -> usize {
        self.readers_opened.load(Ordering::SeqCst)
    }

    /// Readers opened and not yet dropped.
    pub fn readers_live(&self) -> usize {
        self.readers_live.load(Ordering::SeqCst)
    }
}

impl SensorDevice for ScriptedSensor {
    type Reader = ScriptedReader;

    fn open_body_reader(&mut self) -> Result<ScriptedReader, SourceError> {
        if self.refuse_open {
            return Err(SourceError::ReaderUnavailable("scripted sensor offline".into()));
        }
        self.readers_opened.fetch_add(1, Ordering::SeqCst);
        self.readers_live.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedReader {
            queue: self.queue.clone(),
            live: self.readers_live.clone(),
        })
    }
}

pub struct ScriptedReader {
    queue: Arc<Mutex<VecDeque<ScriptedFrame>>>,
    live: Arc<AtomicUsize>,
}

impl BodyFrameReader for ScriptedReader {
    type Frame = ScriptedFrame;

    fn acquire_latest_frame(&mut self) -> Result<Option<ScriptedFrame>, SourceError> {
        Ok(self.queue.lock().pop_front())
    }
}

impl Drop for ScriptedReader {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Synthetic sensor
// ---------------------------------------------------------------------------

/// Floor plane of a sensor 1.05m up, pitched slightly downwards.
pub const SYNTHETIC_CLIP_PLANE: Vec4 = Vec4 {
    x: 0.0,
    y: 0.97,
    z: 0.243,
    w: 1.05,
};

/// Animates `bodies` people swaying in front of the sensor.  Each raises
/// both hands for half a second starting at `raise_at` frames, then lowers
/// them again.
#[derive(Debug, Clone)]
pub struct SyntheticSensor {
    pub bodies: usize,
    pub raise_at: u64,
    pub frame_interval: Duration,
}

impl SyntheticSensor {
    pub fn new(bodies: usize, raise_at: u64) -> Self {
        Self {
            bodies,
            raise_at,
            frame_interval: Duration::from_micros(33_333),
        }
    }
}

impl SensorDevice for SyntheticSensor {
    type Reader = SyntheticReader;

    fn open_body_reader(&mut self) -> Result<SyntheticReader, SourceError> {
        Ok(SyntheticReader {
            bodies: self.bodies.min(MAX_BODIES),
            raise_at: self.raise_at,
            interval: self.frame_interval,
            next_due: Instant::now(),
            tick: 0,
        })
    }
}

pub struct SyntheticReader {
    bodies: usize,
    raise_at: u64,
    interval: Duration,
    next_due: Instant,
    tick: u64,
}

impl SyntheticReader {
    fn body(&self, slot: usize) -> ScriptedBody {
        let t = self.tick as f32 / 30.0;
        let spacing = 0.8 * slot as f32 - 0.4 * (self.bodies as f32 - 1.0);
        let sway = 0.05 * (t + slot as f32).sin();

        let mut body = ScriptedBody::standing(0x0100_0000_0000_0000 + slot as u64)
            .shifted(spacing + sway, 0.0, 0.3 * slot as f32)
            .with_hands(HandState::Open, HandState::Open);

        if (self.raise_at..self.raise_at + 15).contains(&self.tick) {
            let x_offset = spacing + sway;
            for (kind, x, y) in RAISED_ARMS {
                let depth = 2.5 + 0.3 * slot as f32;
                body = body.with_position(kind, Vec3::new(x + x_offset, y, depth));
            }
            body = body.with_hands(HandState::Closed, HandState::Lasso);
        }

        body
    }
}

impl BodyFrameReader for SyntheticReader {
    type Frame = ScriptedFrame;

    /// Blocks until the next frame is due, like a device paced at 30 Hz.
    fn acquire_latest_frame(&mut self) -> Result<Option<ScriptedFrame>, SourceError> {
        let now = Instant::now();
        if now < self.next_due {
            std::thread::sleep(self.next_due - now);
        }
        self.next_due += self.interval;

        let frame = (0..self.bodies).fold(ScriptedFrame::new(SYNTHETIC_CLIP_PLANE), |f, slot| {
            f.with_body(self.body(slot))
        });
        self.tick += 1;
        Ok(Some(frame))
    }
}
