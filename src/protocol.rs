//! Frame record wire format.
//!
//! The worker renders records by hand (see [`serializer`](crate::serializer));
//! this module is the consumer-side view of the same document, for Rust
//! callers that want typed access to a record they received.
//!
//! ## Record shape
//!
//! | Key              | Type                                   |
//! |------------------|----------------------------------------|
//! | `floorClipPlane` | `{x, y, z, w}`                         |
//! | `cameraHeight`   | metres, `-1.0` until first observed    |
//! | `frame`          | counter, `1` on the first armed frame  |
//! | `bodies`         | `[BodyRecord]`, only qualified bodies  |
//!
//! ## Design rules
//!
//! 1. Field names and nesting are a compatibility contract; keys are camelCase.
//! 2. Every body carries all 25 joints keyed by joint name.
//! 3. Track and hand states are human-readable strings (`"Not Tracked"`, …).

use crate::types::{HandState, JointType, Quaternion, TrackingState, Vec3, Vec4};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameRecord {
    pub floor_clip_plane: Vec4,
    pub camera_height: f32,
    pub frame: u64,
    pub bodies: Vec<BodyRecord>,
}

impl FrameRecord {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn body(&self, id: u64) -> Option<&BodyRecord> {
        self.bodies.iter().find(|b| b.id == id)
    }

    pub fn body_ids(&self) -> Vec<u64> {
        self.bodies.iter().map(|b| b.id).collect()
    }
}

// ---------------------------------------------------------------------------
// Bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyRecord {
    pub id: u64,
    pub joints: HashMap<String, JointRecord>,
    pub hands: HandsRecord,
}

impl BodyRecord {
    pub fn joint(&self, kind: JointType) -> Option<&JointRecord> {
        self.joints.get(kind.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JointRecord {
    pub state: TrackingState,
    pub location: Vec3,
    pub rotation: Quaternion,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct HandsRecord {
    pub left: HandState,
    pub right: HandState,
}
