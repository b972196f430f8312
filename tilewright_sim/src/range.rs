// Range evaluation: is a node reachable within a cost budget?
//
// `in_range()` answers a single yes/no question cheaply. Every transition
// costs at least its horizontal distance (see `cost.rs`), so if the straight
// line between the two columns is already longer than the budget the answer
// is no without searching. Otherwise a bounded Dijkstra runs from the start
// and exits as soon as the target is settled, or as soon as the cheapest
// open entry exceeds the budget.
//
// `reachable_within()` returns the whole reachability set (node -> cheapest
// cost) for AI and UI queries such as "where can this unit get this turn".
// `in_range_batch()` checks many targets against one start in parallel with
// rayon over a shared `&NavGraph`.
//
// See also: `pathfinding.rs` for the heap entry and the unbounded search.
//
// **Critical constraint: determinism.** The answers are pure functions of
// the graph, caps, and endpoints. The batch variant returns results in input
// order.

use crate::cost::{MoverCaps, can_pass, transition_cost};
use crate::nav::NavGraph;
use crate::pathfinding::OpenEntry;
use crate::types::NodeId;
use rayon::prelude::*;
use std::collections::{BTreeMap, BinaryHeap};

/// Slack for float error in the straight-line pre-filter.
const PREFILTER_TOLERANCE: f32 = 1e-4;

/// Whether `target` is reachable from `start` at a total cost of at most
/// `max_cost`.
pub fn in_range(
    graph: &NavGraph,
    caps: &MoverCaps,
    start: NodeId,
    target: NodeId,
    max_cost: f32,
) -> bool {
    let (Some(s), Some(t)) = (graph.get_node(start), graph.get_node(target)) else {
        return false;
    };
    if !t.passable {
        return false;
    }
    if start == target {
        return max_cost >= 0.0;
    }
    if s.coord.distance(t.coord) > max_cost + PREFILTER_TOLERANCE {
        return false;
    }
    bounded_search(graph, caps, start, max_cost, Some(target)).0
}

/// Every node reachable from `start` within `max_cost`, with its cheapest
/// cost. Includes `start` at cost 0 unless it is impassable.
pub fn reachable_within(
    graph: &NavGraph,
    caps: &MoverCaps,
    start: NodeId,
    max_cost: f32,
) -> BTreeMap<NodeId, f32> {
    if graph.get_node(start).is_none() || max_cost < 0.0 {
        return BTreeMap::new();
    }
    bounded_search(graph, caps, start, max_cost, None).1
}

/// `in_range()` for many targets at once, evaluated in parallel. Results are
/// in the same order as `targets`.
pub fn in_range_batch(
    graph: &NavGraph,
    caps: &MoverCaps,
    start: NodeId,
    targets: &[NodeId],
    max_cost: f32,
) -> Vec<bool> {
    targets
        .par_iter()
        .map(|&target| in_range(graph, caps, start, target, max_cost))
        .collect()
}

/// Dijkstra from `start`, never settling anything costlier than `max_cost`.
/// With a `target`, stops when it settles and reports whether it did.
fn bounded_search(
    graph: &NavGraph,
    caps: &MoverCaps,
    start: NodeId,
    max_cost: f32,
    target: Option<NodeId>,
) -> (bool, BTreeMap<NodeId, f32>) {
    let n = graph.node_count();
    let mut dist = vec![f32::INFINITY; n];
    let mut closed = vec![false; n];
    let mut settled = BTreeMap::new();

    dist[start.0 as usize] = 0.0;
    let mut open = BinaryHeap::new();
    open.push(OpenEntry {
        node: start,
        cost: 0.0,
    });

    while let Some(current) = open.pop() {
        if current.cost > max_cost {
            break;
        }
        let ci = current.node.0 as usize;
        if closed[ci] {
            continue;
        }
        closed[ci] = true;
        if target == Some(current.node) {
            return (true, settled);
        }
        if target.is_none() && graph.node(current.node).passable {
            settled.insert(current.node, current.cost);
        }

        for t in graph.outgoing(current.node) {
            let ni = t.to.0 as usize;
            if closed[ni] || !can_pass(t, caps) {
                continue;
            }
            let tentative = current.cost + transition_cost(t, caps);
            if tentative <= max_cost && tentative < dist[ni] {
                dist[ni] = tentative;
                open.push(OpenEntry {
                    node: t.to,
                    cost: tentative,
                });
            }
        }
    }

    (false, settled)
}
