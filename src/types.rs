//! Core body-tracking types shared across all modules.

use serde::{Deserialize, Serialize};

/// Joints reported per body, in sensor order.
pub const JOINT_COUNT: usize = 25;

/// Maximum number of bodies the sensor tracks simultaneously.
pub const MAX_BODIES: usize = 6;

/// Default capacity of the reusable output buffer, in bytes.
///
/// Six fully rendered bodies come to roughly 20 KiB, so this leaves headroom
/// for wide coordinate values without ever growing the buffer.
pub const OUTPUT_CAPACITY: usize = 32 * 1024;

// ---------------------------------------------------------------------------
// Basic math
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl std::fmt::Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

/// Four-component vector.  Used for the floor clip plane in `ax + by + cz + d`
/// form, where `w` is the camera's height above the floor.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vec4 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Vec4 {
    pub fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.w.is_finite()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quaternion {
    pub fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    pub fn identity() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.w.is_finite()
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

// ---------------------------------------------------------------------------
// Joints
// ---------------------------------------------------------------------------

/// The 25 joints of a tracked skeleton, numbered in the order the sensor
/// reports them.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum JointType {
    SpineBase = 0,
    SpineMid = 1,
    Neck = 2,
    Head = 3,
    ShoulderLeft = 4,
    ElbowLeft = 5,
    WristLeft = 6,
    HandLeft = 7,
    ShoulderRight = 8,
    ElbowRight = 9,
    WristRight = 10,
    HandRight = 11,
    HipLeft = 12,
    KneeLeft = 13,
    AnkleLeft = 14,
    FootLeft = 15,
    HipRight = 16,
    KneeRight = 17,
    AnkleRight = 18,
    FootRight = 19,
    SpineShoulder = 20,
    HandTipLeft = 21,
    ThumbLeft = 22,
    HandTipRight = 23,
    ThumbRight = 24,
}

impl JointType {
    pub const ALL: [JointType; JOINT_COUNT] = [
        JointType::SpineBase,
        JointType::SpineMid,
        JointType::Neck,
        JointType::Head,
        JointType::ShoulderLeft,
        JointType::ElbowLeft,
        JointType::WristLeft,
        JointType::HandLeft,
        JointType::ShoulderRight,
        JointType::ElbowRight,
        JointType::WristRight,
        JointType::HandRight,
        JointType::HipLeft,
        JointType::KneeLeft,
        JointType::AnkleLeft,
        JointType::FootLeft,
        JointType::HipRight,
        JointType::KneeRight,
        JointType::AnkleRight,
        JointType::FootRight,
        JointType::SpineShoulder,
        JointType::HandTipLeft,
        JointType::ThumbLeft,
        JointType::HandTipRight,
        JointType::ThumbRight,
    ];

    /// The root joint every skeleton is re-centred on.
    pub const ROOT: JointType = JointType::SpineBase;

    pub fn index(self) -> usize {
        self as usize
    }

    /// Name used as the key in the serialized record.
    pub fn as_str(self) -> &'static str {
        match self {
            JointType::SpineBase => "SpineBase",
            JointType::SpineMid => "SpineMid",
            JointType::Neck => "Neck",
            JointType::Head => "Head",
            JointType::ShoulderLeft => "ShoulderLeft",
            JointType::ElbowLeft => "ElbowLeft",
            JointType::WristLeft => "WristLeft",
            JointType::HandLeft => "HandLeft",
            JointType::ShoulderRight => "ShoulderRight",
            JointType::ElbowRight => "ElbowRight",
            JointType::WristRight => "WristRight",
            JointType::HandRight => "HandRight",
            JointType::HipLeft => "HipLeft",
            JointType::KneeLeft => "KneeLeft",
            JointType::AnkleLeft => "AnkleLeft",
            JointType::FootLeft => "FootLeft",
            JointType::HipRight => "HipRight",
            JointType::KneeRight => "KneeRight",
            JointType::AnkleRight => "AnkleRight",
            JointType::FootRight => "FootRight",
            JointType::SpineShoulder => "SpineShoulder",
            JointType::HandTipLeft => "HandTipLeft",
            JointType::ThumbLeft => "ThumbLeft",
            JointType::HandTipRight => "HandTipRight",
            JointType::ThumbRight => "ThumbRight",
        }
    }
}

impl std::fmt::Display for JointType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum TrackingState {
    #[default]
    #[serde(rename = "Not Tracked")]
    NotTracked,
    Inferred,
    Tracked,
}

impl TrackingState {
    pub fn as_str(self) -> &'static str {
        match self {
            TrackingState::NotTracked => "Not Tracked",
            TrackingState::Inferred => "Inferred",
            TrackingState::Tracked => "Tracked",
        }
    }
}

/// Raw joint reading as delivered by the sensor, before orientation is
/// attached.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JointSample {
    pub state: TrackingState,
    pub position: Vec3,
}

impl JointSample {
    pub fn new(state: TrackingState, position: Vec3) -> Self {
        Self { state, position }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Joint {
    pub kind: JointType,
    pub state: TrackingState,
    pub position: Vec3,
    pub orientation: Quaternion,
}

// ---------------------------------------------------------------------------
// Hands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum HandSide {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum HandState {
    #[default]
    Unknown,
    #[serde(rename = "Not Tracked")]
    NotTracked,
    Open,
    Closed,
    Lasso,
}

impl HandState {
    pub fn as_str(self) -> &'static str {
        match self {
            HandState::Unknown => "Unknown",
            HandState::NotTracked => "Not Tracked",
            HandState::Open => "Open",
            HandState::Closed => "Closed",
            HandState::Lasso => "Lasso",
        }
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// One tracked body for the duration of a single cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: u64,
    pub joints: [Joint; JOINT_COUNT],
    pub left_hand: HandState,
    pub right_hand: HandState,
}

impl Entity {
    pub fn joint(&self, kind: JointType) -> &Joint {
        &self.joints[kind.index()]
    }

    /// True when no joint is lost and the root joint is fully tracked
    /// (not merely inferred).
    pub fn is_complete(&self) -> bool {
        self.joint(JointType::ROOT).state == TrackingState::Tracked
            && self
                .joints
                .iter()
                .all(|j| j.state != TrackingState::NotTracked)
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Per-session tracking parameters.  Fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Report sides as seen in a mirror.  When false, X (and the matching
    /// rotation components) are flipped so left/right match the subject.
    pub mirror: bool,
    /// Only emit a body after it has raised both hands to shoulder height.
    pub gate_on_pose: bool,
    /// Level coordinates against the detected floor plane.
    pub world_space: bool,
}

impl TrackingConfig {
    /// Decode the single-character start parameters used by foreign callers:
    /// any non-zero `pose_start` enables gating, `facing` of `b'F'` means
    /// forward (anything else mirrors) and `space` of `b'W'` selects world
    /// space (anything else keeps camera space).
    pub fn from_flags(pose_start: u8, facing: u8, space: u8) -> Self {
        Self {
            mirror: facing != b'F',
            gate_on_pose: pose_start != 0,
            world_space: space == b'W',
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            mirror: false,
            gate_on_pose: true,
            world_space: false,
        }
    }
}

impl std::fmt::Display for TrackingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "mirror={}, pose_start={}, world_space={}",
            self.mirror, self.gate_on_pose, self.world_space
        )
    }
}
