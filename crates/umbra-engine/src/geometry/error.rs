use thiserror::Error;

use super::PrimitiveKind;

/// Allocation past a buffer's fixed capacity.
///
/// Capacity is a deployment-time decision; callers are expected to treat this
/// as fatal rather than retry.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Error)]
pub enum CapacityError {
    #[error("{kind} buffer is full: all {capacity} slots are allocated")]
    Slots { kind: PrimitiveKind, capacity: u32 },

    #[error("shadow buffer is full: all {max_lights} light blocks are allocated")]
    Lights { max_lights: u32 },
}
