// Entities: things placed on the navigation graph.
//
// An entity is a composition, not a type hierarchy. Every entity has an id,
// the name of its def, and a node. Entities whose def carries `caps` also
// get a `Movement` component and can be ordered around; the rest (chests,
// signposts) never move. Entities with an observer explore the world around
// them through `vision.rs`.
//
// Spawning validates the def against what the movement engine supports and
// fails with `EntityError` otherwise. This is the only place an entity def's
// capabilities are checked, so nothing downstream re-validates them.
//
// See also: `movement.rs` for the component, `config.rs` for `EntityDef`,
// `sim.rs` which owns the entity table.

use crate::defs::DefRegistry;
use crate::movement::Movement;
use crate::nav::NavGraph;
use crate::types::{ActorId, ClimbSkill, EntityId, NodeId};
use thiserror::Error;

/// An entity def that cannot be instantiated.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum EntityError {
    #[error("unknown entity def `{0}`")]
    UnknownDef(String),
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    #[error("entity def `{def}` has footprint {footprint:?}; only 1x1 is supported")]
    UnsupportedFootprint { def: String, footprint: (u32, u32) },
    #[error("entity def `{def}` has non-positive height {height}")]
    InvalidHeight { def: String, height: i32 },
    #[error("entity def `{def}` has non-positive speed {speed}")]
    InvalidSpeed { def: String, speed: f32 },
    #[error("entity def `{def}` has a negative hop limit")]
    InvalidHop { def: String },
    #[error("entity def `{def}` uses `Unclimbable` as a climbing skill")]
    UnclimbableSkill { def: String },
}

#[derive(Debug)]
pub struct Entity {
    pub id: EntityId,
    pub def_name: String,
    /// The actor this entity explores for, if any.
    pub observer: Option<ActorId>,
    pub vision_range: f32,
    /// Placement of an entity without a movement component.
    node: NodeId,
    movement: Option<Movement>,
}

impl Entity {
    /// Instantiate `def_name` on `node`.
    pub fn spawn(
        defs: &DefRegistry,
        graph: &NavGraph,
        id: EntityId,
        def_name: &str,
        node: NodeId,
        observer: Option<ActorId>,
    ) -> Result<Self, EntityError> {
        let def = defs
            .entity_def(def_name)
            .ok_or_else(|| EntityError::UnknownDef(def_name.to_string()))?;
        if graph.get_node(node).is_none() {
            return Err(EntityError::UnknownNode(node));
        }
        if def.footprint != (1, 1) {
            return Err(EntityError::UnsupportedFootprint {
                def: def_name.to_string(),
                footprint: def.footprint,
            });
        }

        let movement = match def.caps {
            None => None,
            Some(caps) => {
                let def = def_name.to_string();
                if caps.speed.is_nan() || caps.speed <= 0.0 {
                    return Err(EntityError::InvalidSpeed {
                        def,
                        speed: caps.speed,
                    });
                }
                if caps.height <= 0 {
                    return Err(EntityError::InvalidHeight {
                        def,
                        height: caps.height,
                    });
                }
                if caps.max_hop_up < 0 || caps.max_hop_down < 0 {
                    return Err(EntityError::InvalidHop { def });
                }
                if caps.climb_skill == ClimbSkill::Unclimbable {
                    return Err(EntityError::UnclimbableSkill { def });
                }
                Some(Movement::new(id, caps, node))
            }
        };

        log::debug!("spawned {id} ({def_name}) at {node}");
        Ok(Self {
            id,
            def_name: def_name.to_string(),
            observer,
            vision_range: def.vision_range,
            node,
            movement,
        })
    }

    /// The node the entity stands on.
    pub fn node(&self) -> NodeId {
        self.movement
            .as_ref()
            .map(|m| m.origin())
            .unwrap_or(self.node)
    }

    pub fn movement(&self) -> Option<&Movement> {
        self.movement.as_ref()
    }

    pub fn movement_mut(&mut self) -> Option<&mut Movement> {
        self.movement.as_mut()
    }

    pub fn is_mobile(&self) -> bool {
        self.movement.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::cost::MoverCaps;
    use crate::world::TileWorld;

    #[test]
    fn movers_get_a_movement_component() {
        let defs = DefRegistry::default();
        let world = TileWorld::flat(&defs, 2, 2, 0);
        let human = Entity::spawn(&defs, world.graph(), EntityId(0), "human", NodeId(0), Some(ActorId(0)))
            .unwrap();
        assert!(human.is_mobile());
        assert_eq!(human.node(), NodeId(0));
        assert_eq!(human.vision_range, 6.0);

        let chest = Entity::spawn(&defs, world.graph(), EntityId(1), "chest", NodeId(3), None).unwrap();
        assert!(!chest.is_mobile());
        assert_eq!(chest.node(), NodeId(3));
    }

    #[test]
    fn unknown_def_and_node_are_rejected() {
        let defs = DefRegistry::default();
        let world = TileWorld::flat(&defs, 1, 1, 0);
        assert_eq!(
            Entity::spawn(&defs, world.graph(), EntityId(0), "dragon", NodeId(0), None).unwrap_err(),
            EntityError::UnknownDef("dragon".into())
        );
        assert_eq!(
            Entity::spawn(&defs, world.graph(), EntityId(0), "dog", NodeId(5), None).unwrap_err(),
            EntityError::UnknownNode(NodeId(5))
        );
    }

    #[test]
    fn invalid_defs_fail_at_spawn() {
        let mut config = GameConfig::default();
        let base = MoverCaps::default();
        let wide = config.entities["dog"].clone();
        config.entities.insert(
            "cart".into(),
            crate::config::EntityDef {
                footprint: (2, 1),
                ..wide
            },
        );
        let mut bad = config.entities["dog"].clone();
        bad.caps = Some(MoverCaps { height: 0, ..base });
        config.entities.insert("flat".into(), bad.clone());
        bad.caps = Some(MoverCaps { speed: 0.0, ..base });
        config.entities.insert("stuck".into(), bad.clone());
        bad.caps = Some(MoverCaps {
            climb_skill: ClimbSkill::Unclimbable,
            ..base
        });
        config.entities.insert("spider".into(), bad);

        let defs = DefRegistry::from_config(config).unwrap();
        let world = TileWorld::flat(&defs, 1, 1, 0);
        let spawn = |name: &str| Entity::spawn(&defs, world.graph(), EntityId(0), name, NodeId(0), None);
        assert!(matches!(spawn("cart"), Err(EntityError::UnsupportedFootprint { .. })));
        assert!(matches!(spawn("flat"), Err(EntityError::InvalidHeight { .. })));
        assert!(matches!(spawn("stuck"), Err(EntityError::InvalidSpeed { .. })));
        assert!(matches!(spawn("spider"), Err(EntityError::UnclimbableSkill { .. })));
    }
}
