// Least-cost pathfinding over the navigation graph.
//
// Uniform-cost search (Dijkstra) using a `BinaryHeap` as a min-heap via
// reversed ordering. Distances and came-from data live in `Vec`s indexed by
// `NodeId`, allocated per call, so concurrent searches on a shared graph
// never interfere.
//
// Every transition goes through `cost::can_pass()` and
// `cost::transition_cost()`, the same functions the range evaluator and the
// movement executor use. `SearchOptions` further restricts which nodes may be
// entered: forbidden regions, and nodes the observing actor has not explored.
// The start node is exempt from those filters since the mover already
// stands on it; the goal is not.
//
// See also: `nav.rs` for the graph being searched, `range.rs` for bounded
// reachability queries built on the same heap entry, `movement.rs` which
// calls `find_path()` on `move_to` and when replanning.
//
// **Critical constraint: determinism.** Search is a pure function of graph
// state, caps, endpoints, and options. Heap ties break on the lower node id
// and neighbours are relaxed in transition-id order, so equal-cost
// alternatives always resolve the same way.

use crate::cost::{MoverCaps, can_pass, evaluate, transition_cost};
use crate::nav::{NavGraph, Node};
use crate::path::NavigationPath;
use crate::types::{ActorId, NodeId, Region, TransitionId};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Node filters applied during a search.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchOptions {
    /// The actor whose exploration state gates unexplored nodes.
    pub observer: Option<ActorId>,
    /// When false, nodes `observer` has not explored are never entered.
    pub consider_unexplored: bool,
    /// Nodes inside any of these regions are never entered.
    pub forbidden: Vec<Region>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            observer: None,
            consider_unexplored: true,
            forbidden: Vec::new(),
        }
    }
}

impl SearchOptions {
    /// Options that only enter nodes `observer` has explored.
    pub fn explored_only(observer: ActorId) -> Self {
        Self {
            observer: Some(observer),
            consider_unexplored: false,
            forbidden: Vec::new(),
        }
    }

    pub fn forbid(mut self, region: Region) -> Self {
        self.forbidden.push(region);
        self
    }

    /// Whether a search with these options may never enter `node`.
    pub fn excludes(&self, node: &Node) -> bool {
        if self.forbidden.iter().any(|r| r.contains(node.coord)) {
            return true;
        }
        match self.observer {
            Some(actor) if !self.consider_unexplored => !node.is_explored_by(actor),
            _ => false,
        }
    }
}

/// Entry in the open set (min-heap via reversed ordering).
pub(crate) struct OpenEntry {
    pub node: NodeId,
    pub cost: f32,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cost.total_cmp(&other.cost) == Ordering::Equal && self.node == other.node
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap: smallest cost is "greatest".
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.0.cmp(&self.node.0))
    }
}

/// Find the least-cost path from `start` to `goal` for a mover with `caps`.
///
/// Returns an empty path when `start == goal`, and `None` when the goal is
/// unreachable, impassable, excluded by `opts`, or either id is unknown.
pub fn find_path(
    graph: &NavGraph,
    caps: &MoverCaps,
    start: NodeId,
    goal: NodeId,
    opts: &SearchOptions,
) -> Option<NavigationPath> {
    let n = graph.node_count();
    let goal_node = graph.get_node(goal)?;
    graph.get_node(start)?;
    if !goal_node.passable || opts.excludes(goal_node) {
        return None;
    }
    if start == goal {
        return Some(NavigationPath::at(start));
    }

    // dist[node] = cost of the cheapest known path from start to node.
    let mut dist = vec![f32::INFINITY; n];
    // came_from[node] = (previous node, transition used to get there).
    let mut came_from: Vec<Option<(NodeId, TransitionId)>> = vec![None; n];
    let mut closed = vec![false; n];

    dist[start.0 as usize] = 0.0;
    let mut open = BinaryHeap::new();
    open.push(OpenEntry {
        node: start,
        cost: 0.0,
    });

    while let Some(current) = open.pop() {
        let ci = current.node.0 as usize;
        if closed[ci] {
            continue;
        }
        closed[ci] = true;

        if current.node == goal {
            return Some(reconstruct_path(&came_from, start, goal, dist[ci]));
        }

        for t in graph.outgoing(current.node) {
            let ni = t.to.0 as usize;
            if closed[ni] || !can_pass(t, caps) || opts.excludes(graph.node(t.to)) {
                continue;
            }
            let tentative = dist[ci] + transition_cost(t, caps);
            if tentative < dist[ni] {
                dist[ni] = tentative;
                came_from[ni] = Some((current.node, t.id));
                open.push(OpenEntry {
                    node: t.to,
                    cost: tentative,
                });
            }
        }
    }

    None
}

fn reconstruct_path(
    came_from: &[Option<(NodeId, TransitionId)>],
    start: NodeId,
    goal: NodeId,
    total_cost: f32,
) -> NavigationPath {
    let mut nodes = vec![goal];
    let mut transitions = Vec::new();
    let mut current = goal;

    while current != start {
        match came_from[current.0 as usize] {
            Some((prev, t)) => {
                nodes.push(prev);
                transitions.push(t);
                current = prev;
            }
            None => break,
        }
    }

    nodes.reverse();
    transitions.reverse();
    NavigationPath::from_parts(nodes, transitions, total_cost)
}

/// Current cost of following `path` for a mover with `caps`, or `None` if
/// any of its transitions has become impassable.
pub fn path_cost(graph: &NavGraph, caps: &MoverCaps, path: &NavigationPath) -> Option<f32> {
    path.transitions()
        .map(|id| evaluate(graph.transition(id), caps))
        .sum()
}
