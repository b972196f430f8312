// Navigation graph: nodes and transitions.
//
// A `Node` is one walkable cell top in the world: a column coordinate, four
// corner altitudes (a flat or sloped surface), a surface material, a
// passability flag, climbables attached to its sides, and an optional door.
// Ground nodes sit on the terrain; air nodes are platforms and bridges
// stacked above it. A column may hold several nodes, sorted by altitude.
//
// A `Transition` is a directed edge from a node to a node in one of the eight
// neighbouring columns. Its kind says how it is crossed:
// - `Walk`: the shared edge (or corner, for diagonals) lines up exactly.
// - `Hop`: a single step up or down of a few altitude steps.
// - `Climb`: over a fence/wall on the shared side, or up/down a ladder.
// Transitions carry everything the cost evaluator needs (distance, surface
// modifier, water, hop height, climb phases, clearance), so `cost.rs` never
// has to look at the world.
//
// Storage is `Vec` indexed by `NodeId`/`TransitionId` for O(1) lookup and
// deterministic iteration order. Columns are a `BTreeMap` keyed by
// `CellCoord`.
//
// Transitions are never edited in place. When the world changes around a
// node, `rebuild_around()` re-derives the outgoing transitions of the nodes
// in the surrounding 3x3 columns. A transition that comes out identical
// keeps its id; one that changed or vanished is retired, and its
// replacement gets a new id. A retired transition stays in storage and is
// permanently impassable, which is how a moving entity notices that the
// world changed under its path.
//
// See also: `world.rs` for the mutations that trigger rebuilds, `cost.rs`
// for the pass predicate and cost function, `pathfinding.rs` and `range.rs`
// for the searches over this graph.
//
// **Critical constraint: determinism.** Node and transition IDs are
// sequential integers assigned in a fixed order: nodes in creation order,
// new transitions by source node id, then `Direction::ALL` order, then
// destination column order.

use crate::config::ClimbableKind;
use crate::defs::DefRegistry;
use crate::types::*;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use std::collections::{BTreeMap, BTreeSet};

/// Whether a node is part of the terrain or built above it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Ground,
    Air,
}

/// A door occupying one side of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DoorSlot {
    pub door: DoorId,
    pub side: Direction,
    /// True only while the door is fully open.
    pub passable: bool,
}

/// A node in the navigation graph: a cell top an entity can stand on.
#[derive(Clone, Debug)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub coord: CellCoord,
    /// Corner altitudes in altitude steps, indexed by `Corner`.
    pub altitude: [i32; 4],
    pub surface: SurfaceId,
    pub passable: bool,
    /// At most one climbable per side.
    pub climbables: SmallVec<[(Direction, ClimbableId); 2]>,
    pub door: Option<DoorSlot>,
    /// Free altitude steps above this node's highest corner before the next
    /// node up the column. `None` means open sky.
    pub headspace: Option<i32>,
    pub(crate) explored_by: FxHashSet<ActorId>,
    outgoing: Vec<TransitionId>,
}

impl Node {
    pub fn altitude_at(&self, corner: Corner) -> i32 {
        self.altitude[corner.index()]
    }

    pub fn min_altitude(&self) -> i32 {
        self.altitude.iter().copied().min().unwrap_or(0)
    }

    pub fn max_altitude(&self) -> i32 {
        self.altitude.iter().copied().max().unwrap_or(0)
    }

    /// Mean corner altitude, used for entity placement.
    pub fn center_altitude(&self) -> f32 {
        self.altitude.iter().sum::<i32>() as f32 / 4.0
    }

    pub fn climbable_on(&self, side: Direction) -> Option<ClimbableId> {
        self.climbables
            .iter()
            .find(|(s, _)| *s == side)
            .map(|&(_, id)| id)
    }

    pub fn door_on(&self, side: Direction) -> Option<DoorSlot> {
        self.door.filter(|d| d.side == side)
    }

    pub fn is_explored_by(&self, actor: ActorId) -> bool {
        self.explored_by.contains(&actor)
    }

    /// Highest altitude of the edge (or corner) facing `dir`.
    fn edge_top(&self, dir: Direction, use_dest_corner: bool) -> i32 {
        dir.shared_corners()
            .iter()
            .map(|&(a, b)| self.altitude_at(if use_dest_corner { b } else { a }))
            .max()
            .unwrap_or(0)
    }
}

/// Direction of travel during a climb phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClimbDirection {
    Up,
    Down,
}

/// One vertical leg of a climb transition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClimbPhase {
    pub climbable: ClimbableId,
    pub direction: ClimbDirection,
    /// Altitude steps covered by this phase. Always positive.
    pub height: i32,
    pub skill_required: ClimbSkill,
    /// Cost per cell of height (the climbable's `cost_up` or `cost_down`).
    pub cost_per_cell: f32,
    pub speed_factor: f32,
}

impl ClimbPhase {
    pub fn cost(&self) -> f32 {
        self.height as f32 / ALTITUDE_STEPS_PER_CELL as f32 * self.cost_per_cell
    }
}

/// How a transition is crossed.
#[derive(Clone, Debug, PartialEq)]
pub enum TransitionKind {
    Walk,
    /// Positive `height` hops up, negative hops down.
    Hop { height: i32, cost_per_step: f32 },
    /// The entity's origin moves to the destination when phase
    /// `crossing_phase` starts; `crossing_phase == phases.len()` means on
    /// completion.
    Climb {
        phases: SmallVec<[ClimbPhase; 2]>,
        crossing_phase: usize,
    },
}

/// A directed edge in the navigation graph.
#[derive(Clone, Debug)]
pub struct Transition {
    pub id: TransitionId,
    pub from: NodeId,
    pub to: NodeId,
    pub direction: Direction,
    pub kind: TransitionKind,
    /// Horizontal distance in cells (1 or the diagonal cost).
    pub distance: f32,
    /// Speed modifier of the destination surface.
    pub speed_modifier: f32,
    /// The destination is water, or a diagonal passes a water corner.
    pub enters_water: bool,
    /// Destination edge altitude minus origin edge altitude, in steps.
    pub height_delta: i32,
    /// Smallest headspace of both ends and, for diagonals, of the two
    /// corner nodes. `None` means unbounded.
    pub clearance: Option<i32>,
    pub(crate) retired: bool,
}

impl Transition {
    /// Retired transitions were replaced after a world change and can never
    /// be used again.
    pub fn is_retired(&self) -> bool {
        self.retired
    }

    pub fn is_climb(&self) -> bool {
        matches!(self.kind, TransitionKind::Climb { .. })
    }

    /// Same endpoints and same crossing data, ignoring id and retirement.
    fn same_crossing(&self, other: &Transition) -> bool {
        self.from == other.from
            && self.to == other.to
            && self.direction == other.direction
            && self.kind == other.kind
            && self.distance == other.distance
            && self.speed_modifier == other.speed_modifier
            && self.enters_water == other.enters_water
            && self.height_delta == other.height_delta
            && self.clearance == other.clearance
    }
}

/// The navigation graph container.
#[derive(Clone, Debug, Default)]
pub struct NavGraph {
    nodes: Vec<Node>,
    transitions: Vec<Transition>,
    columns: BTreeMap<CellCoord, SmallVec<[NodeId; 2]>>,
}

/// Result of planning one candidate transition.
struct Plan {
    kind: TransitionKind,
    height_delta: i32,
    /// Diagonals only: what the two orthogonal bridge nodes add.
    corner: Option<CornerBridge>,
}

/// Water and headspace a diagonal squeezes past. A mover may take the
/// diagonal only if it could take both orthogonal routes.
#[derive(Clone, Copy, Debug)]
struct CornerBridge {
    water: bool,
    clearance: Option<i32>,
}

fn min_clearance(x: Option<i32>, y: Option<i32>) -> Option<i32> {
    match (x, y) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (x, y) => x.or(y),
    }
}

impl NavGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. Returns its ID. Transitions are not derived until
    /// `rebuild_around()` or `rebuild_all()` runs.
    pub fn add_node(
        &mut self,
        kind: NodeKind,
        coord: CellCoord,
        altitude: [i32; 4],
        surface: SurfaceId,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            id,
            kind,
            coord,
            altitude,
            surface,
            passable: true,
            climbables: SmallVec::new(),
            door: None,
            headspace: None,
            explored_by: FxHashSet::default(),
            outgoing: Vec::new(),
        });
        self.columns.entry(coord).or_default().push(id);
        self.refresh_column(coord);
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0 as usize]
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn transition(&self, id: TransitionId) -> &Transition {
        &self.transitions[id.0 as usize]
    }

    pub fn get_transition(&self, id: TransitionId) -> Option<&Transition> {
        self.transitions.get(id.0 as usize)
    }

    /// Active (non-retired) transitions leaving `node`, in derivation order.
    pub fn outgoing(&self, node: NodeId) -> impl Iterator<Item = &Transition> {
        self.node(node)
            .outgoing
            .iter()
            .map(|&id| self.transition(id))
    }

    /// The first active transition from `from` to `to`, if any.
    pub fn transition_between(&self, from: NodeId, to: NodeId) -> Option<&Transition> {
        self.outgoing(from).find(|t| t.to == to)
    }

    /// Number of transitions that have not been retired.
    pub fn active_transition_count(&self) -> usize {
        self.transitions.iter().filter(|t| !t.retired).count()
    }

    /// Number of transitions ever derived, retired ones included.
    pub fn stored_transition_count(&self) -> usize {
        self.transitions.len()
    }

    /// Nodes in a column, lowest first.
    pub fn column(&self, coord: CellCoord) -> &[NodeId] {
        self.columns.get(&coord).map(|c| c.as_slice()).unwrap_or(&[])
    }

    pub fn ground_node_at(&self, coord: CellCoord) -> Option<NodeId> {
        self.column(coord)
            .iter()
            .copied()
            .find(|&id| self.node(id).kind == NodeKind::Ground)
    }

    /// Find the nearest node to a column (by straight-line distance, lowest
    /// node id on ties). Returns `None` if the graph is empty.
    pub fn find_nearest_node(&self, coord: CellCoord) -> Option<NodeId> {
        self.nodes
            .iter()
            .min_by(|a, b| {
                a.coord
                    .distance(coord)
                    .total_cmp(&b.coord.distance(coord))
                    .then(a.id.cmp(&b.id))
            })
            .map(|n| n.id)
    }

    /// Re-sort a column by altitude and recompute headspace for its nodes.
    pub(crate) fn refresh_column(&mut self, coord: CellCoord) {
        let Some(mut ids) = self.columns.get(&coord).cloned() else {
            return;
        };
        ids.sort_by_key(|&id| (self.node(id).min_altitude(), id));
        for (i, &id) in ids.iter().enumerate() {
            let headspace = ids
                .get(i + 1)
                .map(|&above| self.node(above).min_altitude() - self.node(id).max_altitude());
            self.node_mut(id).headspace = headspace;
        }
        self.columns.insert(coord, ids);
    }

    /// Re-derive every transition in the graph.
    pub fn rebuild_all(&mut self, defs: &DefRegistry) {
        let all: Vec<NodeId> = self.nodes.iter().map(|n| n.id).collect();
        for &id in &all {
            self.rederive_outgoing(defs, id);
        }
        log::debug!(
            "nav graph rebuilt: {} nodes, {} transitions",
            self.nodes.len(),
            self.active_transition_count()
        );
    }

    /// Re-derive the transitions that can depend on the touched nodes: every
    /// outgoing transition of every node in the 3x3 columns around each one.
    /// Diagonals check both orthogonal columns, so a change in one column can
    /// affect any transition whose source is adjacent to it.
    pub fn rebuild_around(&mut self, defs: &DefRegistry, touched: &[NodeId]) {
        let mut affected = BTreeSet::new();
        for &id in touched {
            let c = self.node(id).coord;
            for dx in -1..=1 {
                for dz in -1..=1 {
                    affected.extend(self.column(CellCoord::new(c.x + dx, c.z + dz)).iter().copied());
                }
            }
        }
        let before = self.transitions.len();
        for &id in &affected {
            self.rederive_outgoing(defs, id);
        }
        log::trace!(
            "rebuilt transitions for {} nodes, {} replaced",
            affected.len(),
            self.transitions.len() - before
        );
    }

    /// Derive the outgoing transitions of `from` again. One that comes out
    /// identical keeps its id; the rest of the old set is retired.
    fn rederive_outgoing(&mut self, defs: &DefRegistry, from: NodeId) {
        let old = std::mem::take(&mut self.node_mut(from).outgoing);
        let a = self.node(from);
        let mut plans = Vec::new();
        for dir in Direction::ALL {
            for &to in self.column(a.coord.step(dir)) {
                let b = self.node(to);
                if let Some(plan) = plan_transition(self, defs, a, b, dir) {
                    plans.push((to, dir, plan));
                }
            }
        }

        let mut outgoing = Vec::with_capacity(plans.len());
        for (to, dir, plan) in plans {
            let fresh = self.describe(defs, from, to, dir, plan);
            let kept = old
                .iter()
                .copied()
                .find(|&id| self.transition(id).same_crossing(&fresh));
            let id = match kept {
                Some(id) => id,
                None => {
                    let id = TransitionId(self.transitions.len() as u32);
                    self.transitions.push(Transition { id, ..fresh });
                    id
                }
            };
            outgoing.push(id);
        }
        for id in old {
            if !outgoing.contains(&id) {
                self.transitions[id.0 as usize].retired = true;
            }
        }
        self.node_mut(from).outgoing = outgoing;
    }

    /// The transition `plan` describes, not yet stored.
    fn describe(
        &self,
        defs: &DefRegistry,
        from: NodeId,
        to: NodeId,
        direction: Direction,
        plan: Plan,
    ) -> Transition {
        let a = self.node(from);
        let b = self.node(to);
        let surface = defs.surface(b.surface);
        let mut clearance = min_clearance(a.headspace, b.headspace);
        let mut enters_water = surface.is_water;
        if let Some(corner) = plan.corner {
            clearance = min_clearance(clearance, corner.clearance);
            enters_water |= corner.water;
        }
        let distance = if direction.is_diagonal() {
            defs.config().diagonal_cost
        } else {
            1.0
        };
        Transition {
            id: TransitionId(u32::MAX),
            from,
            to,
            direction,
            kind: plan.kind,
            distance,
            speed_modifier: surface.speed_modifier,
            enters_water,
            height_delta: plan.height_delta,
            clearance,
            retired: false,
        }
    }
}

fn side_has_closed_door(node: &Node, side: Direction) -> bool {
    node.door_on(side).is_some_and(|d| !d.passable)
}

/// Decide whether `a -> b` (b in the column next to a in `dir`) is a
/// transition, and of which kind.
fn plan_transition(
    graph: &NavGraph,
    defs: &DefRegistry,
    a: &Node,
    b: &Node,
    dir: Direction,
) -> Option<Plan> {
    if !a.passable || !b.passable {
        return None;
    }
    if dir.is_diagonal() {
        return plan_diagonal(graph, defs, a, b, dir);
    }
    if side_has_closed_door(a, dir) || side_has_closed_door(b, dir.opposite()) {
        return None;
    }

    let rises: SmallVec<[i32; 2]> = dir
        .shared_corners()
        .iter()
        .map(|&(ca, cb)| b.altitude_at(cb) - a.altitude_at(ca))
        .collect();
    let rise_min = rises.iter().copied().min().unwrap_or(0);
    let rise_max = rises.iter().copied().max().unwrap_or(0);
    let a_top = a.edge_top(dir, false);
    let b_top = b.edge_top(dir, true);
    let max_step = defs.config().max_step_generation;

    // Ladder standing on `a`, leaning against the higher column `b`.
    if let Some(cid) = a.climbable_on(dir) {
        let def = defs.climbable(cid);
        if def.kind == ClimbableKind::Ladder && rise_min > 0 {
            if rise_max > def.height {
                return None;
            }
            return Some(Plan {
                kind: TransitionKind::Climb {
                    phases: smallvec::smallvec![ClimbPhase {
                        climbable: cid,
                        direction: ClimbDirection::Up,
                        height: rise_max,
                        skill_required: def.skill_required,
                        cost_per_cell: def.cost_up,
                        speed_factor: def.climb_speed_factor,
                    }],
                    crossing_phase: 1,
                },
                height_delta: b_top - a_top,
                corner: None,
            });
        }
    }

    // The same ladder, climbed down from the top.
    if let Some(cid) = b.climbable_on(dir.opposite()) {
        let def = defs.climbable(cid);
        if def.kind == ClimbableKind::Ladder && rise_max < 0 {
            let drop = -rise_min;
            if drop > def.height {
                return None;
            }
            return Some(Plan {
                kind: TransitionKind::Climb {
                    phases: smallvec::smallvec![ClimbPhase {
                        climbable: cid,
                        direction: ClimbDirection::Down,
                        height: drop,
                        skill_required: def.skill_required,
                        cost_per_cell: def.cost_down,
                        speed_factor: def.climb_speed_factor,
                    }],
                    crossing_phase: 1,
                },
                height_delta: b_top - a_top,
                corner: None,
            });
        }
    }

    if rise_min.abs().max(rise_max.abs()) > max_step {
        return None;
    }

    // Fences on either side of the shared edge. The taller top wins.
    let fence_top = |node: &Node, side: Direction, top: i32| {
        node.climbable_on(side)
            .filter(|&cid| defs.climbable(cid).kind == ClimbableKind::Fence)
            .map(|cid| (cid, top + defs.climbable(cid).height))
    };
    let fence = match (
        fence_top(a, dir, a_top),
        fence_top(b, dir.opposite(), b_top),
    ) {
        (Some(fa), Some(fb)) => Some(if fb.1 > fa.1 { fb } else { fa }),
        (fa, fb) => fa.or(fb),
    };
    if let Some((cid, top)) = fence {
        let def = defs.climbable(cid);
        let mut phases = SmallVec::new();
        let up = top - a_top;
        let down = top - b_top;
        if up > 0 {
            phases.push(ClimbPhase {
                climbable: cid,
                direction: ClimbDirection::Up,
                height: up,
                skill_required: def.skill_required,
                cost_per_cell: def.cost_up,
                speed_factor: def.climb_speed_factor,
            });
        }
        let crossing_phase = phases.len();
        if down > 0 {
            phases.push(ClimbPhase {
                climbable: cid,
                direction: ClimbDirection::Down,
                height: down,
                skill_required: def.skill_required,
                cost_per_cell: def.cost_down,
                speed_factor: def.climb_speed_factor,
            });
        }
        return Some(Plan {
            kind: TransitionKind::Climb {
                phases,
                crossing_phase,
            },
            height_delta: b_top - a_top,
            corner: None,
        });
    }

    if rise_min == 0 && rise_max == 0 {
        return Some(Plan {
            kind: TransitionKind::Walk,
            height_delta: 0,
            corner: None,
        });
    }

    let height = if rise_max.abs() >= rise_min.abs() {
        rise_max
    } else {
        rise_min
    };
    Some(Plan {
        kind: TransitionKind::Hop {
            height,
            cost_per_step: defs.config().hop_cost_per_step,
        },
        height_delta: height,
        corner: None,
    })
}

/// Diagonals are walk-only: the shared corner must line up, no climbable or
/// door may touch that corner, and both orthogonal columns must offer a
/// walkable node connecting the two ends. No corner cutting.
fn plan_diagonal(
    graph: &NavGraph,
    defs: &DefRegistry,
    a: &Node,
    b: &Node,
    dir: Direction,
) -> Option<Plan> {
    let (c1, c2) = dir.components()?;
    for side in [c1, c2] {
        if a.climbable_on(side).is_some() || a.door_on(side).is_some() {
            return None;
        }
        if b.climbable_on(side.opposite()).is_some() || b.door_on(side.opposite()).is_some() {
            return None;
        }
    }
    let &(ca, cb) = dir.shared_corners().first()?;
    if a.altitude_at(ca) != b.altitude_at(cb) {
        return None;
    }

    let walks = |from: &Node, to: &Node, d: Direction| {
        matches!(
            plan_transition(graph, defs, from, to, d),
            Some(Plan {
                kind: TransitionKind::Walk,
                ..
            })
        )
    };
    let mut corner = CornerBridge {
        water: false,
        clearance: None,
    };
    for (first, second) in [(c1, c2), (c2, c1)] {
        let mid = graph
            .column(a.coord.step(first))
            .iter()
            .map(|&id| graph.node(id))
            .find(|&mid| walks(a, mid, first) && walks(mid, b, second))?;
        corner.water |= defs.surface(mid.surface).is_water;
        corner.clearance = min_clearance(corner.clearance, mid.headspace);
    }

    Some(Plan {
        kind: TransitionKind::Walk,
        height_delta: 0,
        corner: Some(corner),
    })
}
