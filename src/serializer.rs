//! Bounded JSON rendering of one frame into a reusable buffer.
//!
//! Records are written by hand with `core::fmt::Write` so the field order
//! stays fixed and the hot path never allocates.  The buffer refuses to grow:
//! a record that does not fit is an error, never a truncated document.

use crate::types::{Entity, Quaternion, Vec3, Vec4};
use log::debug;
use std::fmt::{self, Write};
use thiserror::Error;

/// Rendered in place of the camera height until one has been observed.
pub const CAMERA_HEIGHT_UNSET: f32 = -1.0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerializeError {
    #[error("rendered frame exceeds the {capacity}-byte output buffer")]
    CapacityExceeded { capacity: usize },
}

// ---------------------------------------------------------------------------
// Bounded buffer
// ---------------------------------------------------------------------------

/// Fixed-capacity text buffer.  Storage is allocated once; `clear` keeps it.
#[derive(Debug)]
pub struct BoundedBuffer {
    text: String,
    capacity: usize,
}

impl BoundedBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            text: String::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl Write for BoundedBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.text.len() + s.len() > self.capacity {
            return Err(fmt::Error);
        }
        self.text.push_str(s);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// Events worth an audible cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    /// The number of fully tracked bodies changed since the previous cycle.
    BodyCountChanged { complete: usize },
    /// A body performed the ready gesture and is now emitted.
    EntityQualified { id: u64 },
}

/// External single-tone notification capability.
pub trait Notifier: Send + Sync {
    fn notify(&self, cue: Cue);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn notify(&self, _cue: Cue) {}
}

// ---------------------------------------------------------------------------
// Frame header
// ---------------------------------------------------------------------------

/// Per-frame values rendered ahead of the bodies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameHeader {
    pub clip_plane: Vec4,
    pub camera_height: Option<f32>,
    pub frame: u64,
}

// ---------------------------------------------------------------------------
// Serializer
// ---------------------------------------------------------------------------

pub struct FrameSerializer {
    buffer: BoundedBuffer,
    complete_bodies: usize,
}

impl FrameSerializer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: BoundedBuffer::with_capacity(capacity),
            complete_bodies: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    pub fn as_str(&self) -> &str {
        self.buffer.as_str()
    }

    /// Number of complete bodies seen in the most recent cycle.
    pub fn complete_bodies(&self) -> usize {
        self.complete_bodies
    }

    /// Count complete bodies and cue `notifier` when the count moved.
    pub fn tally(&mut self, bodies: &[Entity], notifier: &dyn Notifier) -> usize {
        let complete = bodies.iter().filter(|b| b.is_complete()).count();
        if complete != self.complete_bodies {
            debug!("Complete bodies {} -> {}", self.complete_bodies, complete);
            self.complete_bodies = complete;
            notifier.notify(Cue::BodyCountChanged { complete });
        }
        complete
    }

    /// Render `header` and `bodies` into the buffer.
    ///
    /// Returns `Ok(None)` without touching the buffer when there are no
    /// bodies to emit.
    pub fn render(
        &mut self,
        header: &FrameHeader,
        bodies: &[Entity],
    ) -> Result<Option<&str>, SerializeError> {
        if bodies.is_empty() {
            return Ok(None);
        }

        self.buffer.clear();
        if write_frame(&mut self.buffer, header, bodies).is_err() {
            let capacity = self.buffer.capacity();
            self.buffer.clear();
            return Err(SerializeError::CapacityExceeded { capacity });
        }

        Ok(Some(self.buffer.as_str()))
    }
}

fn write_frame<W: Write>(out: &mut W, header: &FrameHeader, bodies: &[Entity]) -> fmt::Result {
    out.write_str("{\n\"floorClipPlane\": ")?;
    write_vec4(out, header.clip_plane)?;
    write!(
        out,
        ", \"cameraHeight\": {:.3}",
        header.camera_height.unwrap_or(CAMERA_HEIGHT_UNSET)
    )?;
    write!(out, ",\n\"frame\": {}", header.frame)?;
    out.write_str(",\n\"bodies\": [")?;

    for (i, body) in bodies.iter().enumerate() {
        if i > 0 {
            out.write_char(',')?;
        }
        write_body(out, body)?;
    }

    out.write_str("\n]\n}\n")
}

fn write_body<W: Write>(out: &mut W, body: &Entity) -> fmt::Result {
    write!(out, "\n\t{{\"id\": {},", body.id)?;
    out.write_str("\n\t\"joints\": {")?;

    for (i, joint) in body.joints.iter().enumerate() {
        if i > 0 {
            out.write_char(',')?;
        }
        write!(
            out,
            "\n\t\t\"{}\": {{\"state\": \"{}\", \"location\": ",
            joint.kind.as_str(),
            joint.state.as_str()
        )?;
        write_vec3(out, joint.position)?;
        out.write_str(", \"rotation\": ")?;
        write_quaternion(out, joint.orientation)?;
        out.write_char('}')?;
    }

    out.write_str("\n\t},")?;
    write!(
        out,
        "\n\t\"hands\": {{\"left\": \"{}\", \"right\": \"{}\"}}}}",
        body.left_hand.as_str(),
        body.right_hand.as_str()
    )
}

fn write_vec3<W: Write>(out: &mut W, v: Vec3) -> fmt::Result {
    write!(out, "{{\"x\":{:.3},\"y\":{:.3},\"z\":{:.3}}}", v.x, v.y, v.z)
}

fn write_vec4<W: Write>(out: &mut W, v: Vec4) -> fmt::Result {
    write!(
        out,
        "{{\"x\":{:.3},\"y\":{:.3},\"z\":{:.3},\"w\":{:.3}}}",
        v.x, v.y, v.z, v.w
    )
}

fn write_quaternion<W: Write>(out: &mut W, q: Quaternion) -> fmt::Result {
    write!(
        out,
        "{{\"x\":{:.3},\"y\":{:.3},\"z\":{:.3},\"w\":{:.3}}}",
        q.x, q.y, q.z, q.w
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_rejects_write_past_capacity() {
        let mut buf = BoundedBuffer::with_capacity(8);
        assert!(buf.write_str("12345678").is_ok());
        assert!(buf.write_str("9").is_err());
        assert_eq!(buf.as_str(), "12345678");
    }

    #[test]
    fn buffer_clear_keeps_capacity() {
        let mut buf = BoundedBuffer::with_capacity(16);
        write!(buf, "{:.3}", 1.5f32).unwrap();
        assert_eq!(buf.as_str(), "1.500");
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), 16);
    }

    #[test]
    fn vectors_render_three_decimals() {
        let mut buf = BoundedBuffer::with_capacity(128);
        write_vec3(&mut buf, Vec3::new(1.0, -0.25, 2.0 / 3.0)).unwrap();
        assert_eq!(buf.as_str(), "{\"x\":1.000,\"y\":-0.250,\"z\":0.667}");
    }
}
