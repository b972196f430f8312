// Data-driven game configuration.
//
// All tunable navigation parameters live here in `GameConfig`, loaded from
// JSON at startup: surface materials (speed modifier, water), climbable
// obstacles (fences, walls, ladders), entity defs (mover capabilities,
// footprint, vision), and the transition-generation constants. The sim never
// uses magic numbers for these; it reads them from the config.
//
// A config must pass `validate()` before anything is built from it. The
// checks here guard search correctness, not just tidiness: a speed modifier
// above 1 (or a diagonal cost below sqrt 2) would let a transition cost less
// than the horizontal distance it covers, which breaks the straight-line
// pre-filter in `range.rs` and makes reachability answers wrong.
//
// See also: `defs.rs` which indexes a validated config into the
// `DefRegistry`, `cost.rs` for `MoverCaps`, `entity.rs` for the init-time
// checks on entity defs.

use crate::cost::MoverCaps;
use crate::types::ClimbSkill;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Largest vision radius, in cells, an entity def may declare.
pub const MAX_VISION_RANGE: f32 = 256.0;

/// A config that cannot be used. Raised at startup, never at query time.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("surface `{surface}` has speed modifier {value}; it must be in (0, 1]")]
    SpeedModifierOutOfRange { surface: String, value: f32 },
    #[error("climbable `{climbable}` has {which} cost {value}; it must be at least 1")]
    ClimbCostTooLow {
        climbable: String,
        which: &'static str,
        value: f32,
    },
    #[error("climbable `{climbable}` has non-positive climb speed factor {value}")]
    ClimbSpeedNotPositive { climbable: String, value: f32 },
    #[error("climbable `{climbable}` has non-positive height {height}")]
    ClimbableHeightNotPositive { climbable: String, height: i32 },
    #[error("climbable `{climbable}` has no render style")]
    MissingRenderStyle { climbable: String },
    #[error("unknown surface `{0}`")]
    UnknownSurface(String),
    #[error("diagonal cost {0} is below sqrt(2)")]
    DiagonalCostTooLow(f32),
    #[error("hop cost per step {0} is negative")]
    NegativeHopCost(f32),
    #[error("max step generation {0} is negative")]
    NegativeStepGeneration(i32),
    #[error("door duration must be at least one tick")]
    ZeroDoorDuration,
    #[error("entity `{entity}` has vision range {value}; it must be in [0, 256]")]
    InvalidVisionRange { entity: String, value: f32 },
}

/// A walkable surface material.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SurfaceDef {
    /// Fraction of full speed movers keep on this surface, in (0, 1].
    /// Traversal cost is `distance / speed_modifier`.
    pub speed_modifier: f32,

    /// Entering a water node requires the mover to be able to swim.
    #[serde(default)]
    pub is_water: bool,
}

/// How a climbable obstacle is crossed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClimbableKind {
    /// A vertical obstacle on a node side (fence, wall). Crossing it means
    /// climbing up one face and down the other.
    Fence,
    /// Leans against the higher neighbour column; lets movers climb a cliff
    /// too tall to hop.
    Ladder,
}

/// How the presentation layer draws a climbable. Required on every
/// climbable def even though this crate never renders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClimbRenderStyle {
    Fence,
    Wall,
    Ladder,
}

/// A climbable obstacle attached to one side of a node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClimbableDef {
    pub kind: ClimbableKind,

    /// Fence height above the node edge, or the longest climb a ladder
    /// reaches, in altitude steps.
    pub height: i32,

    /// Minimum climbing skill a mover needs.
    pub skill_required: ClimbSkill,

    /// Cost per cell of height climbed upward.
    pub cost_up: f32,

    /// Cost per cell of height climbed downward.
    pub cost_down: f32,

    /// Climbing speed relative to the mover's walking speed.
    pub climb_speed_factor: f32,

    #[serde(default)]
    pub render_style: Option<ClimbRenderStyle>,
}

/// An entity type. Entities without `caps` never move.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityDef {
    #[serde(default)]
    pub caps: Option<MoverCaps>,

    /// Footprint in cells (width, depth).
    #[serde(default = "default_footprint")]
    pub footprint: (u32, u32),

    /// Radius, in cells, of the area this entity explores around itself.
    #[serde(default)]
    pub vision_range: f32,
}

fn default_footprint() -> (u32, u32) {
    (1, 1)
}

/// Top-level configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameConfig {
    /// Length of one sim tick in milliseconds (presentation only).
    pub tick_duration_ms: u32,

    /// Distance of a diagonal step, in cells.
    pub diagonal_cost: f32,

    /// Extra cost per altitude step of a hop.
    pub hop_cost_per_step: f32,

    /// Largest altitude difference, in steps, for which hop and fence
    /// transitions are generated. Taller drops need a ladder.
    pub max_step_generation: i32,

    /// Ticks a door takes to swing fully open.
    pub door_duration_ticks: u32,

    /// Surface given to nodes created without an explicit one.
    pub default_surface: String,

    pub surfaces: BTreeMap<String, SurfaceDef>,
    pub climbables: BTreeMap<String, ClimbableDef>,
    pub entities: BTreeMap<String, EntityDef>,
}

impl GameConfig {
    /// Parse a config from JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject any config that would break search correctness.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.diagonal_cost < std::f32::consts::SQRT_2 {
            return Err(ConfigError::DiagonalCostTooLow(self.diagonal_cost));
        }
        if self.hop_cost_per_step < 0.0 {
            return Err(ConfigError::NegativeHopCost(self.hop_cost_per_step));
        }
        if self.max_step_generation < 0 {
            return Err(ConfigError::NegativeStepGeneration(
                self.max_step_generation,
            ));
        }
        if self.door_duration_ticks == 0 {
            return Err(ConfigError::ZeroDoorDuration);
        }
        if !self.surfaces.contains_key(&self.default_surface) {
            return Err(ConfigError::UnknownSurface(self.default_surface.clone()));
        }

        for (name, surface) in &self.surfaces {
            let m = surface.speed_modifier;
            if m.is_nan() || m <= 0.0 || m > 1.0 {
                return Err(ConfigError::SpeedModifierOutOfRange {
                    surface: name.clone(),
                    value: m,
                });
            }
        }

        for (name, climbable) in &self.climbables {
            if climbable.height <= 0 {
                return Err(ConfigError::ClimbableHeightNotPositive {
                    climbable: name.clone(),
                    height: climbable.height,
                });
            }
            for (which, value) in [("up", climbable.cost_up), ("down", climbable.cost_down)] {
                if value.is_nan() || value < 1.0 {
                    return Err(ConfigError::ClimbCostTooLow {
                        climbable: name.clone(),
                        which,
                        value,
                    });
                }
            }
            if climbable.climb_speed_factor.is_nan() || climbable.climb_speed_factor <= 0.0 {
                return Err(ConfigError::ClimbSpeedNotPositive {
                    climbable: name.clone(),
                    value: climbable.climb_speed_factor,
                });
            }
            if climbable.render_style.is_none() {
                return Err(ConfigError::MissingRenderStyle {
                    climbable: name.clone(),
                });
            }
        }

        for (name, entity) in &self.entities {
            let v = entity.vision_range;
            if !(0.0..=MAX_VISION_RANGE).contains(&v) {
                return Err(ConfigError::InvalidVisionRange {
                    entity: name.clone(),
                    value: v,
                });
            }
        }

        Ok(())
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        let mut surfaces = BTreeMap::new();
        surfaces.insert(
            "grass".to_string(),
            SurfaceDef {
                speed_modifier: 1.0,
                is_water: false,
            },
        );
        surfaces.insert(
            "stone".to_string(),
            SurfaceDef {
                speed_modifier: 1.0,
                is_water: false,
            },
        );
        surfaces.insert(
            "sand".to_string(),
            SurfaceDef {
                speed_modifier: 0.8,
                is_water: false,
            },
        );
        surfaces.insert(
            "mud".to_string(),
            SurfaceDef {
                speed_modifier: 0.5,
                is_water: false,
            },
        );
        surfaces.insert(
            "water".to_string(),
            SurfaceDef {
                speed_modifier: 0.5,
                is_water: true,
            },
        );

        let mut climbables = BTreeMap::new();
        climbables.insert(
            "fence".to_string(),
            ClimbableDef {
                kind: ClimbableKind::Fence,
                height: 5,
                skill_required: ClimbSkill::Basic,
                cost_up: 2.0,
                cost_down: 1.5,
                climb_speed_factor: 0.5,
                render_style: Some(ClimbRenderStyle::Fence),
            },
        );
        climbables.insert(
            "wall".to_string(),
            ClimbableDef {
                kind: ClimbableKind::Fence,
                height: 12,
                skill_required: ClimbSkill::Advanced,
                cost_up: 4.0,
                cost_down: 3.0,
                climb_speed_factor: 0.25,
                render_style: Some(ClimbRenderStyle::Wall),
            },
        );
        climbables.insert(
            "ladder".to_string(),
            ClimbableDef {
                kind: ClimbableKind::Ladder,
                height: 40,
                skill_required: ClimbSkill::None,
                cost_up: 1.5,
                cost_down: 1.2,
                climb_speed_factor: 0.6,
                render_style: Some(ClimbRenderStyle::Ladder),
            },
        );

        let mut entities = BTreeMap::new();
        entities.insert(
            "human".to_string(),
            EntityDef {
                caps: Some(MoverCaps {
                    speed: 0.2,
                    can_swim: true,
                    climb_skill: ClimbSkill::Intermediate,
                    max_hop_up: 5,
                    max_hop_down: 10,
                    height: 15,
                    can_move_diagonally: true,
                }),
                footprint: (1, 1),
                vision_range: 6.0,
            },
        );
        entities.insert(
            "dog".to_string(),
            EntityDef {
                caps: Some(MoverCaps {
                    speed: 0.3,
                    can_swim: true,
                    climb_skill: ClimbSkill::None,
                    max_hop_up: 3,
                    max_hop_down: 6,
                    height: 6,
                    can_move_diagonally: true,
                }),
                footprint: (1, 1),
                vision_range: 8.0,
            },
        );
        entities.insert(
            "chest".to_string(),
            EntityDef {
                caps: None,
                footprint: (1, 1),
                vision_range: 0.0,
            },
        );

        Self {
            tick_duration_ms: 50,
            diagonal_cost: std::f32::consts::SQRT_2,
            hop_cost_per_step: 0.05,
            max_step_generation: 10,
            door_duration_ticks: 10,
            default_surface: "grass".to_string(),
            surfaces,
            climbables,
            entities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        GameConfig::default().validate().unwrap();
    }

    #[test]
    fn default_config_serializes() {
        let config = GameConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let restored = GameConfig::from_json(&json).unwrap();
        assert_eq!(config.diagonal_cost, restored.diagonal_cost);
        assert_eq!(config.surfaces, restored.surfaces);
        assert_eq!(config.climbables, restored.climbables);
        assert_eq!(config.entities, restored.entities);
    }

    #[test]
    fn config_loads_from_json_string() {
        let json = r#"{
            "tick_duration_ms": 100,
            "diagonal_cost": 1.5,
            "hop_cost_per_step": 0.1,
            "max_step_generation": 8,
            "door_duration_ticks": 4,
            "default_surface": "dirt",
            "surfaces": {
                "dirt": { "speed_modifier": 1.0 },
                "river": { "speed_modifier": 0.4, "is_water": true }
            },
            "climbables": {
                "hedge": {
                    "kind": "Fence",
                    "height": 6,
                    "skill_required": "Basic",
                    "cost_up": 2.0,
                    "cost_down": 2.0,
                    "climb_speed_factor": 0.3,
                    "render_style": "Fence"
                }
            },
            "entities": {
                "goat": {
                    "caps": {
                        "speed": 0.25,
                        "can_swim": false,
                        "climb_skill": "Advanced",
                        "max_hop_up": 8,
                        "max_hop_down": 8,
                        "height": 8
                    },
                    "vision_range": 5.0
                }
            }
        }"#;
        let config = GameConfig::from_json(json).unwrap();
        assert_eq!(config.max_step_generation, 8);
        assert!(config.surfaces["river"].is_water);
        let goat = &config.entities["goat"];
        assert_eq!(goat.footprint, (1, 1));
        let caps = goat.caps.unwrap();
        assert_eq!(caps.climb_skill, ClimbSkill::Advanced);
        // Omitted in the JSON; defaults on.
        assert!(caps.can_move_diagonally);
    }

    #[test]
    fn rejects_speed_modifier_above_one() {
        let mut config = GameConfig::default();
        config.surfaces.get_mut("sand").unwrap().speed_modifier = 1.5;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::SpeedModifierOutOfRange { ref surface, .. } if surface == "sand"));
    }

    #[test]
    fn rejects_zero_speed_modifier() {
        let mut config = GameConfig::default();
        config.surfaces.get_mut("mud").unwrap().speed_modifier = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_missing_render_style() {
        let mut config = GameConfig::default();
        config.climbables.get_mut("ladder").unwrap().render_style = None;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingRenderStyle { .. }));
    }

    #[test]
    fn rejects_cheap_climb() {
        let mut config = GameConfig::default();
        config.climbables.get_mut("fence").unwrap().cost_down = 0.5;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::ClimbCostTooLow { which: "down", .. }));
    }

    #[test]
    fn rejects_short_diagonal() {
        let config = GameConfig {
            diagonal_cost: 1.0,
            ..GameConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DiagonalCostTooLow(_))
        ));
    }

    #[test]
    fn rejects_unknown_default_surface() {
        let config = GameConfig {
            default_surface: "lava".to_string(),
            ..GameConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownSurface(ref s)) if s == "lava"
        ));
    }

    #[test]
    fn rejects_bad_vision_range() {
        for value in [-1.0, f32::NAN, f32::INFINITY, 1e30] {
            let mut config = GameConfig::default();
            config.entities.get_mut("dog").unwrap().vision_range = value;
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidVisionRange { ref entity, .. }) if entity == "dog"
            ));
        }
    }

    #[test]
    fn from_json_rejects_invalid_json() {
        assert!(matches!(
            GameConfig::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
