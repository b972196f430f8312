// tilewright_sim: tile world navigation and movement library.
//
// This crate turns a stacked tile world (ground and air cells, slopes,
// fences, walls, ladders, doors, water) into a navigation graph, answers
// least-cost path and reachability queries over it, and drives entities
// along paths tick by tick with climbing, swimming, and replanning when the
// world changes under them. It has no rendering, no I/O beyond config
// parsing, and can be tested, benchmarked, and run headless.
//
// Module overview:
// - `sim.rs`:         Top-level SimState, fixed-tick loop, command/event processing.
// - `world.rs`:       TileWorld: owner of the nav graph; terrain, climbable, and door edits.
// - `nav.rs`:         Nodes, transitions, and transition generation.
// - `cost.rs`:        MoverCaps, capability overrides, pass predicate and cost function.
// - `path.rs`:        NavigationPath: chained transition sequences.
// - `pathfinding.rs`: Dijkstra pathfinding with search filters.
// - `range.rs`:       Bounded reachability queries (single, set, batch).
// - `movement.rs`:    Movement executor, listeners, movement events.
// - `entity.rs`:      Entities as compositions with an optional movement component.
// - `vision.rs`:      Deferred, batched exploration updates.
// - `command.rs`:     SimCommand / SimAction: all sim mutations.
// - `event.rs`:       Narrative SimEvents.
// - `config.rs`:      GameConfig: surfaces, climbables, entity defs, constants.
// - `defs.rs`:        DefRegistry: the validated, indexed config.
// - `types.rs`:       Coordinates, directions, corners, climb skills, IDs.
//
// Library code logs through the `log` facade and never installs a logger.
//
// **Critical constraint: determinism.** The simulation is a pure function:
// `(state, commands) -> (new_state, events)`. No `HashMap` iteration, no
// system time, no OS entropy. Use `BTreeMap` for ordered collections.

pub mod command;
pub mod config;
pub mod cost;
pub mod defs;
pub mod entity;
pub mod event;
pub mod movement;
pub mod nav;
pub mod path;
pub mod pathfinding;
pub mod range;
pub mod sim;
pub mod types;
pub mod vision;
pub mod world;
