// Player-visible simulation events.
//
// `SimEvent`s are the narrative output of `SimState::step()`: what moved,
// what arrived, which doors finished swinging, what was rebuilt. The sim
// never reads them back; they exist for the UI and for tests.
//
// See also: `sim.rs` which emits them, `movement.rs` for the per-entity
// `MovementEvent`s most of these are derived from.
//
// **Critical constraint: determinism.** Events are emitted in processing
// order: commands first, then doors by id, then entities by id.

use crate::types::*;
use serde::{Deserialize, Serialize};

/// A narrative event emitted during a step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimEvent {
    pub tick: u64,
    pub kind: SimEventKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SimEventKind {
    EntitySpawned { entity: EntityId, node: NodeId },
    /// The entity now counts as standing on `to`.
    EntityMoved {
        entity: EntityId,
        from: NodeId,
        to: NodeId,
    },
    NewPath { entity: EntityId, target: NodeId },
    TargetReached { entity: EntityId, target: NodeId },
    MovementStopped { entity: EntityId },
    DoorOpened { door: DoorId },
    DoorClosed { door: DoorId },
    /// Terrain, climbables, or surface around `node` changed.
    WorldChanged { node: NodeId },
}
