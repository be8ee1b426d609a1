//! Coordinate normalisation: mirroring, floor-plane leveling and
//! re-centring on the first captured root joint.

use crate::types::{Quaternion, TrackingConfig, Vec3, Vec4};
use log::debug;

// ---------------------------------------------------------------------------
// Camera tilt
// ---------------------------------------------------------------------------

/// Camera pitch derived from the floor clip plane, computed once per cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraTilt {
    pub angle: f32,
    pub cos: f32,
    pub sin: f32,
}

impl CameraTilt {
    pub fn from_clip_plane(plane: Vec4) -> Self {
        let angle = plane.z.atan2(plane.y);
        Self {
            angle,
            cos: angle.cos(),
            sin: angle.sin(),
        }
    }

    pub fn level() -> Self {
        Self {
            angle: 0.0,
            cos: 1.0,
            sin: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Floor reference
// ---------------------------------------------------------------------------

/// Session-scoped floor/camera reference.
///
/// `clip_plane` and `tilt` are refreshed every cycle; `camera_height` and
/// `root_basis` are each captured once and then frozen for the session.
#[derive(Debug, Clone, PartialEq)]
pub struct FloorReference {
    clip_plane: Vec4,
    tilt: CameraTilt,
    camera_height: Option<f32>,
    root_basis: Option<(f32, f32)>,
}

impl FloorReference {
    pub fn new() -> Self {
        Self {
            clip_plane: Vec4::default(),
            tilt: CameraTilt::level(),
            camera_height: None,
            root_basis: None,
        }
    }

    /// Take this cycle's clip plane.  The first non-zero height term is
    /// recorded as the camera height.
    pub fn observe(&mut self, plane: Vec4) {
        self.clip_plane = plane;
        self.tilt = CameraTilt::from_clip_plane(plane);

        if self.camera_height.is_none() && plane.w != 0.0 {
            debug!("Camera height {:.3}m above floor", plane.w);
            self.camera_height = Some(plane.w);
        }
    }

    pub fn clip_plane(&self) -> Vec4 {
        self.clip_plane
    }

    pub fn tilt(&self) -> CameraTilt {
        self.tilt
    }

    pub fn camera_height(&self) -> Option<f32> {
        self.camera_height
    }

    pub fn root_basis(&self) -> Option<(f32, f32)> {
        self.root_basis
    }

    /// Subtract the root basis from `position`, capturing it from this very
    /// position if none has been captured yet.
    pub fn apply_root_basis(&mut self, position: Vec3) -> Vec3 {
        let (bx, bz) = *self.root_basis.get_or_insert_with(|| {
            debug!("Root basis captured at x={:.3}, z={:.3}", position.x, position.z);
            (position.x, position.z)
        });
        Vec3::new(position.x - bx, position.y, position.z - bz)
    }
}

impl Default for FloorReference {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Transforms
// ---------------------------------------------------------------------------

/// Flip handedness: negate X of the position and Y/Z of the rotation.
/// Applying it twice restores the input.
pub fn mirror(position: Vec3, orientation: Quaternion) -> (Vec3, Quaternion) {
    (
        Vec3::new(-position.x, position.y, position.z),
        Quaternion::new(orientation.x, -orientation.y, -orientation.z, orientation.w),
    )
}

/// Rotate out the camera pitch and express Y as height above the floor.
///
/// The Z term reflects the rotation's effect back onto the raw depth
/// (`z + (z - rotated_z)`); this is an empirically tuned correction, not a
/// full camera-to-world decomposition.
pub fn level_to_floor(position: Vec3, plane: Vec4, tilt: CameraTilt) -> Vec3 {
    let rotated_y = position.y * tilt.cos + position.z * tilt.sin;
    let rotated_z = position.z * tilt.cos - position.y * tilt.sin;

    Vec3::new(
        position.x,
        plane.w + rotated_y,
        position.z + (position.z - rotated_z),
    )
}

/// Map one raw joint into output space.
///
/// The first call of a session fixes the root basis, so callers must feed
/// the root joint of the first emitted body first.
pub fn transform_joint(
    position: Vec3,
    orientation: Quaternion,
    floor: &mut FloorReference,
    config: &TrackingConfig,
) -> (Vec3, Quaternion) {
    let (mut position, orientation) = if config.mirror {
        (position, orientation)
    } else {
        mirror(position, orientation)
    };

    if config.world_space {
        position = level_to_floor(position, floor.clip_plane(), floor.tilt());
    }

    (floor.apply_root_basis(position), orientation)
}
