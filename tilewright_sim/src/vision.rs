// Deferred vision updates.
//
// Moving entities change what their observer has explored. Recomputing that
// on every origin change would do redundant work when several entities move
// in the same tick, so the sim only schedules a recompute here and flushes
// the queue once per tick, after all movement has run.
//
// See also: `sim.rs` which schedules on `OriginChanged` and flushes at the
// end of each tick, `world.rs` for `explore_around()`.
//
// **Critical constraint: determinism.** Pending entities are kept in a
// `BTreeSet` and flushed in `EntityId` order.

use crate::entity::Entity;
use crate::types::EntityId;
use crate::world::TileWorld;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Debug, Default)]
pub struct VisionQueue {
    pending: BTreeSet<EntityId>,
}

impl VisionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a vision recompute for `entity` at the next flush. Repeated
    /// requests within a tick collapse into one.
    pub fn schedule(&mut self, entity: EntityId) {
        self.pending.insert(entity);
    }

    pub fn is_pending(&self, entity: EntityId) -> bool {
        self.pending.contains(&entity)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Explore around every scheduled entity that has an observer. Returns
    /// the number of nodes newly explored.
    pub fn flush(&mut self, world: &mut TileWorld, entities: &BTreeMap<EntityId, Entity>) -> usize {
        let mut explored = 0;
        for id in std::mem::take(&mut self.pending) {
            let Some(entity) = entities.get(&id) else {
                continue;
            };
            if let Some(observer) = entity.observer {
                explored += world.explore_around(entity.node(), entity.vision_range, observer);
            }
        }
        if explored > 0 {
            log::trace!("vision flush explored {explored} nodes");
        }
        explored
    }
}
