// Def registry: the validated, indexed form of `GameConfig`.
//
// Built once at startup and passed by reference to whatever needs lookups
// (nav graph generation, world mutation, entity spawning). Nothing here is
// global: tests build their own registries from hand-tuned configs.
//
// Surface and climbable defs are addressed by compact `SurfaceId` /
// `ClimbableId` indices assigned in `BTreeMap` name order, so the same config
// always yields the same ids.
//
// See also: `config.rs` for the raw defs and validation rules, `nav.rs`
// which reads surface and climbable data while generating transitions.

use crate::config::{ClimbableDef, ConfigError, EntityDef, GameConfig, SurfaceDef};
use crate::types::{ClimbableId, SurfaceId};
use std::collections::BTreeMap;

#[derive(Clone, Debug)]
pub struct DefRegistry {
    config: GameConfig,
    surfaces: Vec<(String, SurfaceDef)>,
    surface_ids: BTreeMap<String, SurfaceId>,
    climbables: Vec<(String, ClimbableDef)>,
    climbable_ids: BTreeMap<String, ClimbableId>,
    default_surface: SurfaceId,
}

impl DefRegistry {
    /// Validate `config` and index its defs.
    pub fn from_config(config: GameConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut surfaces = Vec::new();
        let mut surface_ids = BTreeMap::new();
        for (name, def) in &config.surfaces {
            surface_ids.insert(name.clone(), SurfaceId(surfaces.len() as u32));
            surfaces.push((name.clone(), def.clone()));
        }

        let mut climbables = Vec::new();
        let mut climbable_ids = BTreeMap::new();
        for (name, def) in &config.climbables {
            climbable_ids.insert(name.clone(), ClimbableId(climbables.len() as u32));
            climbables.push((name.clone(), def.clone()));
        }

        let default_surface = *surface_ids
            .get(&config.default_surface)
            .ok_or_else(|| ConfigError::UnknownSurface(config.default_surface.clone()))?;

        Ok(Self {
            config,
            surfaces,
            surface_ids,
            climbables,
            climbable_ids,
            default_surface,
        })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn surface(&self, id: SurfaceId) -> &SurfaceDef {
        &self.surfaces[id.0 as usize].1
    }

    pub fn surface_name(&self, id: SurfaceId) -> &str {
        &self.surfaces[id.0 as usize].0
    }

    pub fn surface_id(&self, name: &str) -> Option<SurfaceId> {
        self.surface_ids.get(name).copied()
    }

    pub fn default_surface(&self) -> SurfaceId {
        self.default_surface
    }

    pub fn climbable(&self, id: ClimbableId) -> &ClimbableDef {
        &self.climbables[id.0 as usize].1
    }

    pub fn climbable_name(&self, id: ClimbableId) -> &str {
        &self.climbables[id.0 as usize].0
    }

    pub fn climbable_id(&self, name: &str) -> Option<ClimbableId> {
        self.climbable_ids.get(name).copied()
    }

    pub fn entity_def(&self, name: &str) -> Option<&EntityDef> {
        self.config.entities.get(name)
    }
}

impl Default for DefRegistry {
    fn default() -> Self {
        Self::from_config(GameConfig::default()).expect("default config is valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_follow_name_order() {
        let defs = DefRegistry::default();
        // BTreeMap order: grass, mud, sand, stone, water.
        assert_eq!(defs.surface_id("grass"), Some(SurfaceId(0)));
        assert_eq!(defs.surface_id("water"), Some(SurfaceId(4)));
        assert_eq!(defs.surface_name(SurfaceId(1)), "mud");
        assert_eq!(defs.default_surface(), SurfaceId(0));
        assert_eq!(defs.climbable_name(defs.climbable_id("wall").unwrap()), "wall");
        assert_eq!(defs.surface_id("lava"), None);
    }

    #[test]
    fn from_config_rejects_invalid() {
        let mut config = GameConfig::default();
        config.surfaces.get_mut("grass").unwrap().speed_modifier = 2.0;
        assert!(DefRegistry::from_config(config).is_err());
    }

    #[test]
    fn entity_defs_are_reachable() {
        let defs = DefRegistry::default();
        assert!(defs.entity_def("human").unwrap().caps.is_some());
        assert!(defs.entity_def("chest").unwrap().caps.is_none());
        assert!(defs.entity_def("dragon").is_none());
    }
}
