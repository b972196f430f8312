// Navigation paths.
//
// A `NavigationPath` is an ordered, chained sequence of transitions from an
// origin node to a target node: the `to` of each transition is the `from` of
// the next. An empty path means the origin already is the target.
//
// Paths are consumed from the front as the movement executor crosses each
// transition, and can grow at the front when a caller prepends a transition
// to reach the path's origin.
//
// See also: `pathfinding.rs` which builds paths, `movement.rs` which
// consumes them.

use crate::nav::NavGraph;
use crate::types::{NodeId, TransitionId};
use std::collections::VecDeque;

#[derive(Clone, Debug, PartialEq)]
pub struct NavigationPath {
    /// Visited nodes: origin first, target last. Always one longer than
    /// `transitions`.
    nodes: VecDeque<NodeId>,
    transitions: VecDeque<TransitionId>,
    total_cost: f32,
}

/// Error for a transition sequence that does not chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("transition {transition} does not start at node {expected}")]
pub struct BrokenChain {
    pub transition: TransitionId,
    pub expected: NodeId,
}

impl NavigationPath {
    /// The empty path standing at `node`.
    pub fn at(node: NodeId) -> Self {
        Self {
            nodes: VecDeque::from([node]),
            transitions: VecDeque::new(),
            total_cost: 0.0,
        }
    }

    /// Assemble a path from already-validated parts. Used by the search,
    /// which only ever produces chained sequences.
    pub(crate) fn from_parts(nodes: Vec<NodeId>, transitions: Vec<TransitionId>, total_cost: f32) -> Self {
        debug_assert_eq!(nodes.len(), transitions.len() + 1);
        Self {
            nodes: nodes.into(),
            transitions: transitions.into(),
            total_cost,
        }
    }

    /// A path of exactly one transition.
    pub fn single(graph: &NavGraph, transition: TransitionId) -> Self {
        let t = graph.transition(transition);
        Self {
            nodes: VecDeque::from([t.from, t.to]),
            transitions: VecDeque::from([transition]),
            total_cost: 0.0,
        }
    }

    /// Build a path from a sequence of transitions, checking that they chain.
    /// `total_cost` is left at zero; callers that need it use
    /// `pathfinding::path_cost()`.
    pub fn from_transitions(
        graph: &NavGraph,
        origin: NodeId,
        transitions: &[TransitionId],
    ) -> Result<Self, BrokenChain> {
        let mut path = Self::at(origin);
        for &id in transitions {
            let t = graph.transition(id);
            if t.from != path.target() {
                return Err(BrokenChain {
                    transition: id,
                    expected: path.target(),
                });
            }
            path.transitions.push_back(id);
            path.nodes.push_back(t.to);
        }
        Ok(path)
    }

    /// Number of transitions left.
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn origin(&self) -> NodeId {
        self.nodes[0]
    }

    pub fn target(&self) -> NodeId {
        self.nodes[self.nodes.len() - 1]
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().copied()
    }

    pub fn transitions(&self) -> impl Iterator<Item = TransitionId> + '_ {
        self.transitions.iter().copied()
    }

    pub fn next_transition(&self) -> Option<TransitionId> {
        self.transitions.front().copied()
    }

    /// Sum of transition costs at search time.
    pub fn total_cost(&self) -> f32 {
        self.total_cost
    }

    /// Remove and return the first transition. The path's origin becomes
    /// that transition's destination.
    pub fn pop_front(&mut self) -> Option<TransitionId> {
        let id = self.transitions.pop_front()?;
        self.nodes.pop_front();
        Some(id)
    }

    /// Insert a transition before the current origin. Fails unless the
    /// transition ends at the origin.
    pub fn prepend(&mut self, graph: &NavGraph, transition: TransitionId) -> Result<(), BrokenChain> {
        let t = graph.transition(transition);
        if t.to != self.origin() {
            return Err(BrokenChain {
                transition,
                expected: self.origin(),
            });
        }
        self.transitions.push_front(transition);
        self.nodes.push_front(t.from);
        Ok(())
    }

    /// Whether every transition chains into the next and the node list
    /// matches.
    pub fn is_chained(&self, graph: &NavGraph) -> bool {
        self.transitions.iter().enumerate().all(|(i, &id)| {
            let t = graph.transition(id);
            t.from == self.nodes[i] && t.to == self.nodes[i + 1]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::DefRegistry;
    use crate::nav::NodeKind;
    use crate::types::*;

    fn line(n: i32) -> (NavGraph, Vec<NodeId>) {
        let defs = DefRegistry::default();
        let mut graph = NavGraph::new();
        let nodes: Vec<_> = (0..n)
            .map(|x| graph.add_node(NodeKind::Ground, CellCoord::new(x, 0), [0; 4], SurfaceId(0)))
            .collect();
        graph.rebuild_all(&defs);
        (graph, nodes)
    }

    #[test]
    fn from_transitions_checks_chain() {
        let (graph, n) = line(3);
        let t01 = graph.transition_between(n[0], n[1]).unwrap().id;
        let t12 = graph.transition_between(n[1], n[2]).unwrap().id;

        let path = NavigationPath::from_transitions(&graph, n[0], &[t01, t12]).unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(path.origin(), n[0]);
        assert_eq!(path.target(), n[2]);
        assert!(path.is_chained(&graph));

        let err = NavigationPath::from_transitions(&graph, n[0], &[t12]).unwrap_err();
        assert_eq!(err.expected, n[0]);
    }

    #[test]
    fn pop_and_prepend() {
        let (graph, n) = line(3);
        let t01 = graph.transition_between(n[0], n[1]).unwrap().id;
        let t12 = graph.transition_between(n[1], n[2]).unwrap().id;

        let mut path = NavigationPath::single(&graph, t12);
        assert!(path.prepend(&graph, t12).is_err());
        path.prepend(&graph, t01).unwrap();
        assert_eq!(path.origin(), n[0]);
        assert_eq!(path.nodes().collect::<Vec<_>>(), n);

        assert_eq!(path.pop_front(), Some(t01));
        assert_eq!(path.origin(), n[1]);
        assert_eq!(path.pop_front(), Some(t12));
        assert!(path.is_empty());
        assert_eq!(path.origin(), n[2]);
        assert_eq!(path.target(), n[2]);
        assert_eq!(path.pop_front(), None);
    }

    #[test]
    fn empty_path_is_at_target() {
        let path = NavigationPath::at(NodeId(7));
        assert!(path.is_empty());
        assert_eq!(path.origin(), path.target());
        assert_eq!(path.total_cost(), 0.0);
    }
}
