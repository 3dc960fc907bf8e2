//! Upstream world state.
//!
//! The physics/rendering layer owns entity positions. The LOD manager reads
//! them through [`PositionSource`] and never writes back. The same particle
//! payload that feeds the compute scheduler can be turned into positions with
//! [`positions_from_payload`].

use crate::compute::{ValidationError, PARTICLE_STRIDE};
use crate::lod::{EntityId, Vec3};

/// Index of the particle id within one stride.
const PARTICLE_ID_OFFSET: usize = 9;

/// One entity's position as reported upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityPosition {
    pub id: EntityId,
    pub entity_type: String,
    pub position: Vec3,
}

impl EntityPosition {
    pub fn new(id: EntityId, entity_type: impl Into<String>, position: Vec3) -> Self {
        Self {
            id,
            entity_type: entity_type.into(),
            position,
        }
    }
}

/// A snapshot provider of entity positions.
pub trait PositionSource: Send + Sync {
    fn snapshot(&self) -> Vec<EntityPosition>;
}

impl PositionSource for Vec<EntityPosition> {
    fn snapshot(&self) -> Vec<EntityPosition> {
        self.clone()
    }
}

impl PositionSource for [EntityPosition] {
    fn snapshot(&self) -> Vec<EntityPosition> {
        self.to_vec()
    }
}

/// Extract positions from a particle payload.
///
/// Each particle's id (offset 9) becomes its [`EntityId`]; the first three
/// values are its position.
pub fn positions_from_payload(
    payload: &[f32],
    stride: usize,
    entity_type: &str,
) -> Result<Vec<EntityPosition>, ValidationError> {
    if stride == 0 {
        return Err(ValidationError::ZeroStride);
    }
    if stride < PARTICLE_STRIDE {
        return Err(ValidationError::StrideTooSmall {
            stride,
            required: PARTICLE_STRIDE,
        });
    }
    if payload.len() % stride != 0 {
        return Err(ValidationError::MisalignedPayload {
            len: payload.len(),
            stride,
        });
    }

    Ok(payload
        .chunks_exact(stride)
        .map(|p| EntityPosition {
            id: EntityId(p[PARTICLE_ID_OFFSET].max(0.0) as u64),
            entity_type: entity_type.to_string(),
            position: Vec3::new(p[0], p[1], p[2]),
        })
        .collect())
}
