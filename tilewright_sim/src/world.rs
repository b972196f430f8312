// The tile world: owner of the navigation graph and everything that changes
// it.
//
// `TileWorld` is the only place the `NavGraph` is mutated after
// construction. Every mutation edits node data and then calls
// `NavGraph::rebuild_around()` for the touched nodes, which re-derives the
// transitions that may depend on them and retires the ones that changed.
// Movement and search code therefore never sees a half-updated graph, and an
// entity holding a changed transition's id finds it retired.
//
// Mutations:
// - terrain: add ground/air nodes, change altitude, surface, passability
// - climbables: build/remove fences, walls, ladders on a node side
// - doors: place, toggle, and advance their swing each tick
// - exploration: mark nodes as explored by an observer (no rebuild; the
//   explored set only gates searches, not transitions)
//
// Doors swing over `door_duration_ticks` ticks. A door side is passable only
// while the door is fully open: closing makes it impassable at once, opening
// makes it passable when the swing completes.
//
// See also: `nav.rs` for transition generation, `vision.rs` which calls
// `explore_around()`, `sim.rs` which applies world commands and ticks doors.
//
// **Critical constraint: determinism.** Doors live in a `BTreeMap` keyed by
// `DoorId` and tick in id order.

use crate::config::MAX_VISION_RANGE;
use crate::defs::DefRegistry;
use crate::nav::{DoorSlot, NavGraph, Node, NodeKind};
use crate::types::*;
use std::collections::BTreeMap;
use thiserror::Error;

/// A world mutation that refers to something that does not exist or does
/// not fit.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum WorldError {
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    #[error("unknown door {0}")]
    UnknownDoor(DoorId),
    #[error("unknown surface `{0}`")]
    UnknownSurface(String),
    #[error("unknown climbable `{0}`")]
    UnknownClimbable(String),
    #[error("climbables and doors go on cardinal sides, not {0:?}")]
    DiagonalSide(Direction),
    #[error("side {side:?} of {node} is already occupied")]
    SideOccupied { node: NodeId, side: Direction },
    #[error("column {0} already has a ground node")]
    GroundExists(CellCoord),
    #[error("new node overlaps {existing} in column {coord}")]
    Overlap { coord: CellCoord, existing: NodeId },
    #[error("{0} already has a door")]
    DoorExists(NodeId),
}

/// A door on one side of a node.
#[derive(Clone, Debug, PartialEq)]
pub struct Door {
    pub id: DoorId,
    pub node: NodeId,
    pub side: Direction,
    open_target: bool,
    /// Ticks of swing completed, `0..=duration`. Zero is fully closed.
    openness: u32,
    duration: u32,
}

impl Door {
    /// Swing progress from 0 (closed) to 1 (open).
    pub fn progress(&self) -> f32 {
        self.openness as f32 / self.duration as f32
    }

    pub fn is_opening(&self) -> bool {
        self.open_target && self.openness < self.duration
    }

    pub fn is_fully_open(&self) -> bool {
        self.open_target && self.openness == self.duration
    }

    pub fn is_fully_closed(&self) -> bool {
        self.openness == 0
    }
}

/// A door that finished swinging this tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DoorChange {
    Opened(DoorId),
    Closed(DoorId),
}

#[derive(Clone, Debug, Default)]
pub struct TileWorld {
    graph: NavGraph,
    doors: BTreeMap<DoorId, Door>,
    next_door_id: u32,
}

impl TileWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// A `width` x `depth` grid of flat ground nodes at `altitude`, on the
    /// default surface, with transitions derived.
    pub fn flat(defs: &DefRegistry, width: i32, depth: i32, altitude: i32) -> Self {
        let mut graph = NavGraph::new();
        for z in 0..depth {
            for x in 0..width {
                graph.add_node(
                    NodeKind::Ground,
                    CellCoord::new(x, z),
                    [altitude; 4],
                    defs.default_surface(),
                );
            }
        }
        graph.rebuild_all(defs);
        Self {
            graph,
            ..Self::default()
        }
    }

    pub fn graph(&self) -> &NavGraph {
        &self.graph
    }

    pub fn door(&self, id: DoorId) -> Option<&Door> {
        self.doors.get(&id)
    }

    pub fn doors(&self) -> impl Iterator<Item = &Door> {
        self.doors.values()
    }

    fn check_node(&self, node: NodeId) -> Result<&Node, WorldError> {
        self.graph
            .get_node(node)
            .ok_or(WorldError::UnknownNode(node))
    }

    fn resolve_surface(defs: &DefRegistry, surface: Option<&str>) -> Result<SurfaceId, WorldError> {
        match surface {
            None => Ok(defs.default_surface()),
            Some(name) => defs
                .surface_id(name)
                .ok_or_else(|| WorldError::UnknownSurface(name.to_string())),
        }
    }

    /// Add the terrain node of a column. A column has at most one.
    pub fn add_ground_node(
        &mut self,
        defs: &DefRegistry,
        coord: CellCoord,
        altitude: [i32; 4],
        surface: Option<&str>,
    ) -> Result<NodeId, WorldError> {
        if self.graph.ground_node_at(coord).is_some() {
            return Err(WorldError::GroundExists(coord));
        }
        let surface = Self::resolve_surface(defs, surface)?;
        let id = self.graph.add_node(NodeKind::Ground, coord, altitude, surface);
        self.graph.rebuild_around(defs, &[id]);
        Ok(id)
    }

    /// Add a platform or bridge node. Its altitude band may not overlap any
    /// other node in the column.
    pub fn add_air_node(
        &mut self,
        defs: &DefRegistry,
        coord: CellCoord,
        altitude: [i32; 4],
        surface: Option<&str>,
    ) -> Result<NodeId, WorldError> {
        let lo = altitude.iter().copied().min().unwrap_or(0);
        let hi = altitude.iter().copied().max().unwrap_or(0);
        for &existing in self.graph.column(coord) {
            let n = self.graph.node(existing);
            if n.min_altitude() <= hi && lo <= n.max_altitude() {
                return Err(WorldError::Overlap { coord, existing });
            }
        }
        let surface = Self::resolve_surface(defs, surface)?;
        let id = self.graph.add_node(NodeKind::Air, coord, altitude, surface);
        self.graph.rebuild_around(defs, &[id]);
        Ok(id)
    }

    pub fn set_surface(&mut self, defs: &DefRegistry, node: NodeId, surface: &str) -> Result<(), WorldError> {
        self.check_node(node)?;
        let surface = Self::resolve_surface(defs, Some(surface))?;
        self.graph.node_mut(node).surface = surface;
        self.graph.rebuild_around(defs, &[node]);
        Ok(())
    }

    pub fn set_altitude(&mut self, defs: &DefRegistry, node: NodeId, altitude: [i32; 4]) -> Result<(), WorldError> {
        let coord = self.check_node(node)?.coord;
        self.graph.node_mut(node).altitude = altitude;
        self.graph.refresh_column(coord);
        self.graph.rebuild_around(defs, &[node]);
        Ok(())
    }

    pub fn set_passable(&mut self, defs: &DefRegistry, node: NodeId, passable: bool) -> Result<(), WorldError> {
        self.check_node(node)?;
        self.graph.node_mut(node).passable = passable;
        self.graph.rebuild_around(defs, &[node]);
        Ok(())
    }

    fn check_free_side(&self, node: NodeId, side: Direction) -> Result<(), WorldError> {
        let n = self.check_node(node)?;
        if side.is_diagonal() {
            return Err(WorldError::DiagonalSide(side));
        }
        if n.climbable_on(side).is_some() || n.door_on(side).is_some() {
            return Err(WorldError::SideOccupied { node, side });
        }
        Ok(())
    }

    /// Attach a fence, wall, or ladder (by def name) to one side of a node.
    pub fn build_climbable(
        &mut self,
        defs: &DefRegistry,
        node: NodeId,
        side: Direction,
        climbable: &str,
    ) -> Result<ClimbableId, WorldError> {
        self.check_free_side(node, side)?;
        let id = defs
            .climbable_id(climbable)
            .ok_or_else(|| WorldError::UnknownClimbable(climbable.to_string()))?;
        self.graph.node_mut(node).climbables.push((side, id));
        self.graph.rebuild_around(defs, &[node]);
        log::debug!("built {climbable} on {side:?} side of {node}");
        Ok(id)
    }

    /// Remove whatever climbable is on `side`. Returns it, or `None` if the
    /// side was bare.
    pub fn remove_climbable(
        &mut self,
        defs: &DefRegistry,
        node: NodeId,
        side: Direction,
    ) -> Result<Option<ClimbableId>, WorldError> {
        let n = self.check_node(node)?;
        let Some(pos) = n.climbables.iter().position(|(s, _)| *s == side) else {
            return Ok(None);
        };
        let (_, id) = self.graph.node_mut(node).climbables.remove(pos);
        self.graph.rebuild_around(defs, &[node]);
        Ok(Some(id))
    }

    /// Place a closed door on one side of a node.
    pub fn add_door(&mut self, defs: &DefRegistry, node: NodeId, side: Direction) -> Result<DoorId, WorldError> {
        self.check_free_side(node, side)?;
        if self.graph.node(node).door.is_some() {
            return Err(WorldError::DoorExists(node));
        }
        let id = DoorId(self.next_door_id);
        self.next_door_id += 1;
        self.doors.insert(
            id,
            Door {
                id,
                node,
                side,
                open_target: false,
                openness: 0,
                duration: defs.config().door_duration_ticks,
            },
        );
        self.graph.node_mut(node).door = Some(DoorSlot {
            door: id,
            side,
            passable: false,
        });
        self.graph.rebuild_around(defs, &[node]);
        Ok(id)
    }

    /// Start opening a closed (or closing) door, or start closing an open
    /// (or opening) one. Closing takes effect on passability immediately.
    pub fn toggle_door(&mut self, defs: &DefRegistry, id: DoorId) -> Result<(), WorldError> {
        let door = self.doors.get_mut(&id).ok_or(WorldError::UnknownDoor(id))?;
        door.open_target = !door.open_target;
        // Re-opening a door that never left the fully-open position.
        let (node, passable) = (door.node, door.is_fully_open());
        self.set_door_passable(defs, node, passable);
        Ok(())
    }

    fn set_door_passable(&mut self, defs: &DefRegistry, node: NodeId, passable: bool) {
        let changed = match &mut self.graph.node_mut(node).door {
            Some(slot) if slot.passable != passable => {
                slot.passable = passable;
                true
            }
            _ => false,
        };
        if changed {
            self.graph.rebuild_around(defs, &[node]);
        }
    }

    /// Advance every swinging door by one tick. Returns the doors that
    /// finished opening or closing.
    pub fn tick(&mut self, defs: &DefRegistry) -> Vec<DoorChange> {
        let mut changes = Vec::new();
        for door in self.doors.values_mut() {
            if door.open_target && door.openness < door.duration {
                door.openness += 1;
                if door.openness == door.duration {
                    changes.push((door.node, DoorChange::Opened(door.id)));
                }
            } else if !door.open_target && door.openness > 0 {
                door.openness -= 1;
                if door.openness == 0 {
                    changes.push((door.node, DoorChange::Closed(door.id)));
                }
            }
        }
        for &(node, change) in &changes {
            if let DoorChange::Opened(_) = change {
                self.set_door_passable(defs, node, true);
            }
        }
        changes.into_iter().map(|(_, c)| c).collect()
    }

    pub fn mark_explored(&mut self, node: NodeId, actor: ActorId) -> Result<(), WorldError> {
        self.check_node(node)?;
        self.graph.node_mut(node).explored_by.insert(actor);
        Ok(())
    }

    /// Mark every node whose column lies within `range` cells of `center`'s
    /// column as explored by `actor`. Returns how many were newly explored.
    /// `range` is capped at `MAX_VISION_RANGE`.
    pub fn explore_around(&mut self, center: NodeId, range: f32, actor: ActorId) -> usize {
        let Some(c) = self.graph.get_node(center).map(|n| n.coord) else {
            return 0;
        };
        if range.is_nan() || range < 0.0 {
            return 0;
        }
        let range = range.min(MAX_VISION_RANGE);
        let r = range.floor() as i32;
        let mut targets = Vec::new();
        for dz in -r..=r {
            for dx in -r..=r {
                let coord = CellCoord::new(c.x + dx, c.z + dz);
                if c.distance(coord) <= range {
                    targets.extend_from_slice(self.graph.column(coord));
                }
            }
        }
        targets
            .into_iter()
            .filter(|&id| self.graph.node_mut(id).explored_by.insert(actor))
            .count()
    }
}
