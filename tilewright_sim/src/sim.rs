// Core simulation state and fixed-tick loop.
//
// `SimState` owns everything: the def registry, the tile world (and through
// it the nav graph and doors), the entity table, and the vision queue. The
// sim is a pure function `(state, commands) -> (new_state, events)`.
//
// Each tick runs the same phases in the same order:
//   1. Apply the commands due at this tick, in slice order.
//   2. Advance door swings (`TileWorld::tick`), rebuilding transitions
//      around doors that finished opening.
//   3. Advance every entity's movement, in `EntityId` order. Origin changes
//      schedule a vision recompute rather than running it inline.
//   4. Flush the vision queue, so position updates always land before
//      exploration is recomputed.
//
// Invalid commands (unknown entity, immobile entity, bad world edit) are
// silent no-ops with a debug log. Unreachable move targets stop the entity.
//
// See also: `command.rs` for the inputs, `event.rs` for the outputs,
// `movement.rs` for per-entity execution, `world.rs` for world edits,
// `vision.rs` for the deferred exploration pass.
//
// **Critical constraint: determinism.** The entity table is a `BTreeMap`,
// entity ids are sequential, and nothing reads wall-clock time or OS
// entropy. Two sims fed the same commands produce the same events.

use crate::command::{SimAction, SimCommand};
use crate::defs::DefRegistry;
use crate::entity::{Entity, EntityError};
use crate::event::{SimEvent, SimEventKind};
use crate::movement::{Movement, MovementEvent, MovementSink};
use crate::nav::NavGraph;
use crate::types::*;
use crate::vision::VisionQueue;
use crate::world::{DoorChange, TileWorld, WorldError};
use std::collections::BTreeMap;

/// Output of a `step()` call.
#[derive(Clone, Debug, Default)]
pub struct StepResult {
    /// Narrative events emitted during this step, in processing order.
    pub events: Vec<SimEvent>,
}

#[derive(Debug)]
pub struct SimState {
    /// Current simulation tick.
    pub tick: u64,
    pub defs: DefRegistry,
    pub world: TileWorld,
    pub entities: BTreeMap<EntityId, Entity>,
    next_entity_id: u32,
    vision: VisionQueue,
}

/// Routes movement events into sim events and the vision queue.
struct TickSink<'a> {
    tick: u64,
    events: &'a mut Vec<SimEvent>,
    vision: &'a mut VisionQueue,
}

impl MovementSink for TickSink<'_> {
    fn on_movement_event(&mut self, entity: EntityId, event: &MovementEvent) {
        let kind = match *event {
            MovementEvent::NewPath { target } => SimEventKind::NewPath { entity, target },
            MovementEvent::OriginChanged { from, to } => {
                self.vision.schedule(entity);
                SimEventKind::EntityMoved { entity, from, to }
            }
            MovementEvent::TargetReached { target } => SimEventKind::TargetReached { entity, target },
            MovementEvent::Stopped => SimEventKind::MovementStopped { entity },
        };
        self.events.push(SimEvent {
            tick: self.tick,
            kind,
        });
    }
}

impl SimState {
    pub fn new(defs: DefRegistry, world: TileWorld) -> Self {
        Self {
            tick: 0,
            defs,
            world,
            entities: BTreeMap::new(),
            next_entity_id: 0,
            vision: VisionQueue::new(),
        }
    }

    /// A sim on a flat `width` x `depth` grass field with the default defs.
    pub fn flat(width: i32, depth: i32) -> Self {
        let defs = DefRegistry::default();
        let world = TileWorld::flat(&defs, width, depth, 0);
        Self::new(defs, world)
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// The movement component of `id`, if it is a mover.
    pub fn movement(&self, id: EntityId) -> Option<&Movement> {
        self.entities.get(&id).and_then(|e| e.movement())
    }

    pub fn movement_mut(&mut self, id: EntityId) -> Option<&mut Movement> {
        self.entities.get_mut(&id).and_then(|e| e.movement_mut())
    }

    /// Spawn an entity now. Its surroundings are explored at the next flush.
    pub fn spawn_entity(
        &mut self,
        def_name: &str,
        node: NodeId,
        observer: Option<ActorId>,
    ) -> Result<EntityId, EntityError> {
        let id = EntityId(self.next_entity_id);
        let entity = Entity::spawn(&self.defs, self.world.graph(), id, def_name, node, observer)?;
        self.next_entity_id += 1;
        self.entities.insert(id, entity);
        self.vision.schedule(id);
        Ok(id)
    }

    /// Advance the simulation to `target_tick`, applying `commands` at their
    /// ticks. `commands` must be sorted by tick.
    pub fn step(&mut self, commands: &[SimCommand], target_tick: u64) -> StepResult {
        let mut events = Vec::new();
        let mut cmd_idx = 0;

        while self.tick < target_tick {
            self.tick += 1;

            while cmd_idx < commands.len() && commands[cmd_idx].tick <= self.tick {
                let cmd = &commands[cmd_idx];
                cmd_idx += 1;
                self.apply_command(cmd, &mut events);
            }

            for change in self.world.tick(&self.defs) {
                let kind = match change {
                    DoorChange::Opened(door) => SimEventKind::DoorOpened { door },
                    DoorChange::Closed(door) => SimEventKind::DoorClosed { door },
                };
                events.push(SimEvent {
                    tick: self.tick,
                    kind,
                });
            }

            let graph = self.world.graph();
            let mut sink = TickSink {
                tick: self.tick,
                events: &mut events,
                vision: &mut self.vision,
            };
            for entity in self.entities.values_mut() {
                if let Some(movement) = entity.movement_mut() {
                    movement.tick(graph, &mut sink);
                }
            }

            self.vision.flush(&mut self.world, &self.entities);
        }

        StepResult { events }
    }

    /// Apply a single command to the simulation.
    fn apply_command(&mut self, cmd: &SimCommand, events: &mut Vec<SimEvent>) {
        let tick = self.tick;
        match &cmd.action {
            SimAction::MoveTo { entity, target } => {
                self.order(*entity, events, |m, graph, sink| {
                    m.move_to(graph, *target, sink);
                });
            }
            SimAction::Stop { entity } => {
                self.order(*entity, events, |m, _, sink| m.stop(sink));
            }
            SimAction::Pause { entity } => {
                self.order(*entity, events, |m, _, _| m.pause());
            }
            SimAction::Unpause { entity } => {
                self.order(*entity, events, |m, _, _| m.unpause());
            }
            SimAction::SetOverrides { entity, overrides } => {
                self.order(*entity, events, |m, _, _| {
                    m.set_overrides(*overrides);
                });
            }
            SimAction::SpawnEntity {
                def_name,
                node,
                observer,
            } => match self.spawn_entity(def_name, *node, *observer) {
                Ok(entity) => events.push(SimEvent {
                    tick,
                    kind: SimEventKind::EntitySpawned {
                        entity,
                        node: *node,
                    },
                }),
                Err(e) => log::debug!("tick {tick}: spawn failed: {e}"),
            },
            SimAction::BuildClimbable {
                node,
                side,
                climbable,
            } => {
                let result = self
                    .world
                    .build_climbable(&self.defs, *node, *side, climbable)
                    .map(|_| ());
                self.world_edited(*node, result, events);
            }
            SimAction::RemoveClimbable { node, side } => {
                let result = self
                    .world
                    .remove_climbable(&self.defs, *node, *side)
                    .map(|_| ());
                self.world_edited(*node, result, events);
            }
            SimAction::SetSurface { node, surface } => {
                let result = self.world.set_surface(&self.defs, *node, surface);
                self.world_edited(*node, result, events);
            }
            SimAction::ToggleDoor { door } => {
                if let Err(e) = self.world.toggle_door(&self.defs, *door) {
                    log::debug!("tick {tick}: ignoring door toggle: {e}");
                }
            }
        }
    }

    /// Run `f` on the movement component of `id`, routing its events into
    /// `events`. Orders to missing or immobile entities are dropped.
    fn order(
        &mut self,
        id: EntityId,
        events: &mut Vec<SimEvent>,
        f: impl FnOnce(&mut Movement, &NavGraph, &mut dyn MovementSink),
    ) {
        let Some(movement) = self.entities.get_mut(&id).and_then(|e| e.movement_mut()) else {
            log::debug!("tick {}: ignoring order for non-mover {id}", self.tick);
            return;
        };
        let mut sink = TickSink {
            tick: self.tick,
            events,
            vision: &mut self.vision,
        };
        f(movement, self.world.graph(), &mut sink);
    }

    fn world_edited(
        &self,
        node: NodeId,
        result: Result<(), WorldError>,
        events: &mut Vec<SimEvent>,
    ) {
        match result {
            Ok(()) => events.push(SimEvent {
                tick: self.tick,
                kind: SimEventKind::WorldChanged { node },
            }),
            Err(e) => log::debug!("tick {}: ignoring world edit: {e}", self.tick),
        }
    }
}
