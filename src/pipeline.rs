//! FramePipeline – one processing cycle: read → gate → count → transform →
//! serialise.

use crate::gate::{Admission, EntryGate, GateMode};
use crate::serializer::{Cue, FrameHeader, FrameSerializer, Notifier, SerializeError};
use crate::source::{read_entity, BodyFrame, ReadError};
use crate::transform::{transform_joint, FloorReference};
use crate::types::{Entity, TrackingConfig, MAX_BODIES};
use log::debug;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CycleError {
    /// Frame-level read failed; the cycle is skipped.
    #[error(transparent)]
    Read(#[from] ReadError),
    /// The record did not fit; the cycle is aborted.
    #[error(transparent)]
    Serialize(#[from] SerializeError),
}

/// Session-scoped processing state, owned by the worker thread.
pub struct FramePipeline {
    config: TrackingConfig,
    floor: FloorReference,
    gate: EntryGate,
    serializer: FrameSerializer,
    notifier: Arc<dyn Notifier>,
    /// Reused every cycle; holds at most `MAX_BODIES` entities.
    entities: Vec<Entity>,
    frame: u64,
}

impl FramePipeline {
    pub fn new(config: TrackingConfig, capacity: usize, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            config,
            floor: FloorReference::new(),
            gate: EntryGate::new(GateMode::from_config(&config)),
            serializer: FrameSerializer::new(capacity),
            notifier,
            entities: Vec::with_capacity(MAX_BODIES),
            frame: 0,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.gate.is_armed()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn camera_height(&self) -> Option<f32> {
        self.floor.camera_height()
    }

    pub fn floor(&self) -> &FloorReference {
        &self.floor
    }

    pub fn gate(&self) -> &EntryGate {
        &self.gate
    }

    /// The most recently rendered record.  Only meaningful right after
    /// [`process`](Self::process) returned `Some`.
    pub fn record(&self) -> &str {
        self.serializer.as_str()
    }

    /// Run one cycle over `frame`.
    ///
    /// Returns the rendered record, or `None` when no body was eligible.
    pub fn process<F: BodyFrame>(&mut self, frame: &F) -> Result<Option<&str>, CycleError> {
        let plane = frame.floor_clip_plane()?;
        if !plane.is_finite() {
            return Err(ReadError::NonFinite {
                what: "floor clip plane",
            }
            .into());
        }
        self.floor.observe(plane);

        let bodies = frame.bodies()?;
        if bodies.len() > MAX_BODIES {
            debug!(
                "Source reported {} bodies; only the first {} are read",
                bodies.len(),
                MAX_BODIES
            );
        }

        self.entities.clear();
        for body in bodies.iter().take(MAX_BODIES) {
            let entity = match read_entity(body) {
                Ok(Some(entity)) => entity,
                Ok(None) => continue,
                Err(e) => {
                    debug!("Skipping body this frame: {}", e);
                    continue;
                }
            };

            match self.gate.admit(&entity) {
                Admission::Qualified => {
                    self.notifier.notify(Cue::EntityQualified { id: entity.id });
                    self.entities.push(entity);
                }
                admission if admission.is_eligible() => self.entities.push(entity),
                _ => {}
            }
        }

        if self.gate.is_armed() {
            self.frame += 1;
        }

        self.serializer.tally(&self.entities, self.notifier.as_ref());

        for entity in &mut self.entities {
            for joint in &mut entity.joints {
                let (position, orientation) = transform_joint(
                    joint.position,
                    joint.orientation,
                    &mut self.floor,
                    &self.config,
                );
                joint.position = position;
                joint.orientation = orientation;
            }
        }

        let header = FrameHeader {
            clip_plane: self.floor.clip_plane(),
            camera_height: self.floor.camera_height(),
            frame: self.frame,
        };

        Ok(self.serializer.render(&header, &self.entities)?)
    }
}
