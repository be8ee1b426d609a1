//! Skeleton JSON
//!
//! Turns body-tracking sensor frames into self-contained JSON records, one
//! per frame, delivered to an application callback from a worker thread.
//!
//! ## Architecture
//!
//! ```text
//! BodyTracker  (session.rs)   ← start / stop / is_armed, shared state
//!   └── worker::run  (worker.rs)  ← poll → process → guarded delivery
//!         └── FramePipeline  (pipeline.rs)
//!               ├── EntryGate        (gate.rs)       ← ready-pose gating
//!               ├── FloorReference   (transform.rs)  ← mirror / level / re-centre
//!               └── FrameSerializer  (serializer.rs) ← bounded JSON, body-count cue
//! ```
//!
//! Frames come from any driver implementing the [`source`] traits; the
//! [`replay`] module provides scripted and synthetic sensors.

// Pipeline pieces are always available (no runtime feature needed).
pub mod gate;
pub mod pipeline;
pub mod protocol;
pub mod serializer;
pub mod settings;
pub mod source;
pub mod transform;
pub mod types;

// The threaded session and replay sensors require the `runtime` feature.
#[cfg(feature = "runtime")]
pub mod replay;
#[cfg(feature = "runtime")]
pub mod session;
#[cfg(feature = "runtime")]
mod worker;

// Convenience re-exports (runtime only)
#[cfg(feature = "runtime")]
pub use session::{BodyTracker, FrameCallback, SessionError, SessionStats};

pub use gate::{Admission, EntryGate, GateMode, QualifiedSet};
pub use pipeline::{CycleError, FramePipeline};
pub use protocol::FrameRecord;
pub use serializer::{Cue, FrameSerializer, Notifier, SerializeError, SilentNotifier};
pub use settings::{SessionOptions, Settings};
pub use source::{BodyFrame, BodyFrameReader, ReadError, SensorDevice, SourceError, TrackedBody};
pub use transform::FloorReference;
pub use types::{
    Entity, HandState, Joint, JointType, Quaternion, TrackingConfig, TrackingState, Vec3, Vec4,
};
