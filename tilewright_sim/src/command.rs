// Commands that mutate simulation state.
//
// All external mutations go through `SimCommand`. The sim is a function
// `(state, commands) -> (new_state, events)`; commands are the input. Each
// command names the tick it applies on and a `SimAction`.
//
// Actions fall into two groups:
// - entity orders: `MoveTo`, `Stop`, `Pause`, `Unpause`, `SetOverrides`,
//   `SpawnEntity`
// - world edits: `BuildClimbable`, `RemoveClimbable`, `ToggleDoor`,
//   `SetSurface`
//
// A command that refers to something missing, or that the target cannot
// carry out (ordering a chest to move), is ignored with a debug log. It
// never aborts the step.
//
// See also: `sim.rs` for `apply_command()` which dispatches these.
//
// **Critical constraint: determinism.** Commands are the sole external input
// to the sim and are applied in slice order within a tick.

use crate::cost::CapabilityOverrides;
use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimCommand {
    pub tick: u64,
    pub action: SimAction,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SimAction {
    /// Plan a path and start moving.
    MoveTo { entity: EntityId, target: NodeId },
    Stop { entity: EntityId },
    Pause { entity: EntityId },
    Unpause { entity: EntityId },
    /// Replace all capability override slots of a mover.
    SetOverrides {
        entity: EntityId,
        overrides: CapabilityOverrides,
    },
    SpawnEntity {
        def_name: String,
        node: NodeId,
        observer: Option<ActorId>,
    },
    BuildClimbable {
        node: NodeId,
        side: Direction,
        climbable: String,
    },
    RemoveClimbable { node: NodeId, side: Direction },
    ToggleDoor { door: DoorId },
    SetSurface { node: NodeId, surface: String },
}
