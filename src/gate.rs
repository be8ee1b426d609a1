//! Entry gate: decides which bodies are eligible for output.
//!
//! Per id the gate is a one-way `Unqualified → Qualified` machine.  In
//! pose-gated mode an id qualifies the first frame it holds the ready
//! gesture (both hand tips at or above their shoulders); in always-on mode
//! every body is eligible on sight.  The first qualification arms the
//! session, which starts the frame counter.

use crate::types::{Entity, JointType, TrackingConfig, MAX_BODIES};
use log::{info, warn};

// ---------------------------------------------------------------------------
// Qualified id set
// ---------------------------------------------------------------------------

/// Capacity-bounded, insert-only set of tracking ids.
///
/// Every id value is legal, including 0; occupancy is tracked by `len`.
#[derive(Debug, Clone)]
pub struct QualifiedSet {
    ids: [u64; MAX_BODIES],
    len: usize,
}

impl QualifiedSet {
    pub fn new() -> Self {
        Self {
            ids: [0; MAX_BODIES],
            len: 0,
        }
    }

    pub fn contains(&self, id: u64) -> bool {
        self.ids[..self.len].contains(&id)
    }

    /// Insert `id`.  Returns `false` only when the set is full and `id` is
    /// not already present.
    pub fn insert(&mut self, id: u64) -> bool {
        if self.contains(id) {
            return true;
        }
        if self.len == MAX_BODIES {
            return false;
        }
        self.ids[self.len] = id;
        self.len += 1;
        true
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == MAX_BODIES
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.ids[..self.len].iter().copied()
    }
}

impl Default for QualifiedSet {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Gate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateMode {
    AlwaysOn,
    PoseGated,
}

impl GateMode {
    pub fn from_config(config: &TrackingConfig) -> Self {
        if config.gate_on_pose {
            GateMode::PoseGated
        } else {
            GateMode::AlwaysOn
        }
    }
}

/// Outcome of presenting one body to the gate for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Gating disabled; every body passes.
    AlwaysOn,
    /// Qualified on an earlier frame.
    Known,
    /// Qualified on this frame.
    Qualified,
    /// Has not yet shown the ready gesture.
    Rejected,
    /// Showed the gesture but the qualified set is already full.
    SetFull,
}

impl Admission {
    pub fn is_eligible(self) -> bool {
        matches!(
            self,
            Admission::AlwaysOn | Admission::Known | Admission::Qualified
        )
    }
}

#[derive(Debug, Clone)]
pub struct EntryGate {
    mode: GateMode,
    qualified: QualifiedSet,
    armed: bool,
}

impl EntryGate {
    pub fn new(mode: GateMode) -> Self {
        Self {
            mode,
            qualified: QualifiedSet::new(),
            armed: false,
        }
    }

    pub fn mode(&self) -> GateMode {
        self.mode
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn is_qualified(&self, id: u64) -> bool {
        self.qualified.contains(id)
    }

    pub fn qualified_count(&self) -> usize {
        self.qualified.len()
    }

    pub fn admit(&mut self, entity: &Entity) -> Admission {
        if self.mode == GateMode::AlwaysOn {
            self.armed = true;
            return Admission::AlwaysOn;
        }

        if self.qualified.contains(entity.id) {
            return Admission::Known;
        }

        if !is_ready_pose(entity) {
            return Admission::Rejected;
        }

        if !self.qualified.insert(entity.id) {
            warn!(
                "Body {} showed the ready pose but {} bodies are already qualified; ignoring",
                entity.id, MAX_BODIES
            );
            return Admission::SetFull;
        }

        info!(
            "Body {} qualified - shoulderLeft: {:.3}, shoulderRight: {:.3}, handTipLeft: {:.3}, handTipRight: {:.3}",
            entity.id,
            entity.joint(JointType::ShoulderLeft).position.y,
            entity.joint(JointType::ShoulderRight).position.y,
            entity.joint(JointType::HandTipLeft).position.y,
            entity.joint(JointType::HandTipRight).position.y,
        );
        self.armed = true;
        Admission::Qualified
    }
}

/// Both hand tips at or above the matching shoulder, in raw sensor heights.
pub fn is_ready_pose(entity: &Entity) -> bool {
    let y = |kind: JointType| entity.joint(kind).position.y;

    y(JointType::HandTipLeft) >= y(JointType::ShoulderLeft)
        && y(JointType::HandTipRight) >= y(JointType::ShoulderRight)
}
