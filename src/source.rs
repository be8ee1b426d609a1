//! Frame source interface: the traits a sensor driver implements to feed
//! the pipeline, and the conversion from a raw body into an [`Entity`].
//!
//! ```text
//! SensorDevice ──open_body_reader──▶ BodyFrameReader
//!                                       └─acquire_latest_frame─▶ BodyFrame
//!                                                                  └─bodies─▶ [TrackedBody]
//! ```
//!
//! Readers and frames release their driver resources on `Drop`.

use crate::types::{
    Entity, HandSide, HandState, Joint, JointSample, JointType, Quaternion, Vec4, JOINT_COUNT,
};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A single read against a frame or body failed.  Transient: the affected
/// body (or cycle) is skipped and the next frame is tried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    #[error("sensor read of {what} failed: {reason}")]
    Failed { what: &'static str, reason: String },
    #[error("sensor returned a non-finite value for {what}")]
    NonFinite { what: &'static str },
}

impl ReadError {
    pub fn failed(what: &'static str, reason: impl Into<String>) -> Self {
        ReadError::Failed {
            what,
            reason: reason.into(),
        }
    }
}

/// The device or reader itself failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("sensor is not open")]
    NotOpen,
    #[error("body frame reader unavailable: {0}")]
    ReaderUnavailable(String),
    #[error("frame acquisition failed: {0}")]
    Acquire(String),
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// An opened sensor able to hand out body frame readers.
pub trait SensorDevice: Send + 'static {
    type Reader: BodyFrameReader;

    fn open_body_reader(&mut self) -> Result<Self::Reader, SourceError>;
}

/// Polled by the worker thread once per cycle.
pub trait BodyFrameReader: Send + 'static {
    type Frame: BodyFrame;

    /// Return the newest frame, or `Ok(None)` when nothing new has arrived
    /// since the previous call.
    fn acquire_latest_frame(&mut self) -> Result<Option<Self::Frame>, SourceError>;
}

pub trait BodyFrame {
    type Body: TrackedBody;

    fn floor_clip_plane(&self) -> Result<Vec4, ReadError>;
    fn bodies(&self) -> Result<&[Self::Body], ReadError>;
}

pub trait TrackedBody {
    fn is_tracked(&self) -> Result<bool, ReadError>;
    fn tracking_id(&self) -> Result<u64, ReadError>;
    fn joints(&self) -> Result<[JointSample; JOINT_COUNT], ReadError>;
    fn joint_orientations(&self) -> Result<[Quaternion; JOINT_COUNT], ReadError>;
    fn hand_state(&self, side: HandSide) -> Result<HandState, ReadError>;
}

// ---------------------------------------------------------------------------
// Body → Entity
// ---------------------------------------------------------------------------

/// Read every field of `body` into an [`Entity`].
///
/// Returns `Ok(None)` for a slot the sensor is not currently tracking.  Any
/// failed or non-finite read fails the whole body so no partial record is
/// ever built.
pub fn read_entity<B: TrackedBody>(body: &B) -> Result<Option<Entity>, ReadError> {
    if !body.is_tracked()? {
        return Ok(None);
    }

    let id = body.tracking_id()?;
    let samples = body.joints()?;
    let orientations = body.joint_orientations()?;
    let left_hand = body.hand_state(HandSide::Left)?;
    let right_hand = body.hand_state(HandSide::Right)?;

    if samples.iter().any(|s| !s.position.is_finite()) {
        return Err(ReadError::NonFinite {
            what: "joint position",
        });
    }
    if orientations.iter().any(|q| !q.is_finite()) {
        return Err(ReadError::NonFinite {
            what: "joint orientation",
        });
    }

    let joints = std::array::from_fn(|i| Joint {
        kind: JointType::ALL[i],
        state: samples[i].state,
        position: samples[i].position,
        orientation: orientations[i],
    });

    Ok(Some(Entity {
        id,
        joints,
        left_hand,
        right_hand,
    }))
}
