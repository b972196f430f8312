// Cost evaluator: what a mover can cross and what it costs.
//
// `MoverCaps` describes one mover (speed, swimming, climbing skill, hop
// limits, body height, diagonal movement). `CapabilityOverrides` is a set of
// per-entity temporary replacements layered over the def's base caps, each
// individually enabled or disabled (a potion of swimming, a broken leg).
//
// `can_pass()` and `transition_cost()` are pure functions of a transition and
// resolved caps. The pathfinder, the range evaluator, and the movement
// executor all go through them, so a search result and the movement that
// follows it always agree.
//
// Costs are in "cell-equivalents at full speed": a flat full-speed step costs
// 1, a diagonal costs `diagonal_cost`. Surface modifiers divide (a 0.5
// modifier doubles the cost), and hops add a per-step surcharge. A climb
// costs the sum of its phase costs instead of the flat move. Every cost is
// at least the transition's horizontal distance and never below
// `COST_EPSILON`, which keeps Dijkstra correct and makes the straight-line
// pre-filter in `range.rs` sound.
//
// The mover's `speed` does not enter the cost. Path choice is a property of
// the terrain and the mover's abilities; speed only changes how long the
// chosen path takes in `movement.rs`.
//
// See also: `nav.rs` for the transition data read here, `pathfinding.rs` and
// `range.rs` for the searches that call these functions.

use crate::nav::{Transition, TransitionKind};
use crate::types::ClimbSkill;
use serde::{Deserialize, Serialize};

/// Floor for any transition cost.
pub const COST_EPSILON: f32 = 0.001;

fn default_true() -> bool {
    true
}

/// The movement capabilities of a mover.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MoverCaps {
    /// Cells per tick at full speed on a 1.0 surface.
    pub speed: f32,
    pub can_swim: bool,
    pub climb_skill: ClimbSkill,
    /// Largest hop up, in altitude steps.
    pub max_hop_up: i32,
    /// Largest hop down, in altitude steps.
    pub max_hop_down: i32,
    /// Body height in altitude steps. Transitions with less clearance are
    /// impassable.
    pub height: i32,
    #[serde(default = "default_true")]
    pub can_move_diagonally: bool,
}

impl Default for MoverCaps {
    fn default() -> Self {
        Self {
            speed: 0.2,
            can_swim: false,
            climb_skill: ClimbSkill::None,
            max_hop_up: 5,
            max_hop_down: 5,
            height: 10,
            can_move_diagonally: true,
        }
    }
}

/// One overridable capability, with the value to use while enabled.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum CapabilityOverride {
    Speed(f32),
    CanSwim(bool),
    ClimbSkill(ClimbSkill),
    MaxHopUp(i32),
    MaxHopDown(i32),
}

impl CapabilityOverride {
    pub fn capability(&self) -> Capability {
        match self {
            CapabilityOverride::Speed(_) => Capability::Speed,
            CapabilityOverride::CanSwim(_) => Capability::CanSwim,
            CapabilityOverride::ClimbSkill(_) => Capability::ClimbSkill,
            CapabilityOverride::MaxHopUp(_) => Capability::MaxHopUp,
            CapabilityOverride::MaxHopDown(_) => Capability::MaxHopDown,
        }
    }
}

/// Names an overridable capability without a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Capability {
    Speed,
    CanSwim,
    ClimbSkill,
    MaxHopUp,
    MaxHopDown,
}

/// Temporary capability replacements. Each slot is either disabled (`None`,
/// the base capability applies) or enabled with its own value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CapabilityOverrides {
    pub speed: Option<f32>,
    pub can_swim: Option<bool>,
    pub climb_skill: Option<ClimbSkill>,
    pub max_hop_up: Option<i32>,
    pub max_hop_down: Option<i32>,
}

impl CapabilityOverrides {
    /// Enable one override, replacing any previous value for the same
    /// capability.
    pub fn enable(&mut self, value: CapabilityOverride) {
        match value {
            CapabilityOverride::Speed(v) => self.speed = Some(v),
            CapabilityOverride::CanSwim(v) => self.can_swim = Some(v),
            CapabilityOverride::ClimbSkill(v) => self.climb_skill = Some(v),
            CapabilityOverride::MaxHopUp(v) => self.max_hop_up = Some(v),
            CapabilityOverride::MaxHopDown(v) => self.max_hop_down = Some(v),
        }
    }

    pub fn disable(&mut self, capability: Capability) {
        match capability {
            Capability::Speed => self.speed = None,
            Capability::CanSwim => self.can_swim = None,
            Capability::ClimbSkill => self.climb_skill = None,
            Capability::MaxHopUp => self.max_hop_up = None,
            Capability::MaxHopDown => self.max_hop_down = None,
        }
    }

    pub fn is_enabled(&self, capability: Capability) -> bool {
        match capability {
            Capability::Speed => self.speed.is_some(),
            Capability::CanSwim => self.can_swim.is_some(),
            Capability::ClimbSkill => self.climb_skill.is_some(),
            Capability::MaxHopUp => self.max_hop_up.is_some(),
            Capability::MaxHopDown => self.max_hop_down.is_some(),
        }
    }

    /// The effective caps: base values with every enabled override applied.
    pub fn resolve(&self, base: &MoverCaps) -> MoverCaps {
        MoverCaps {
            speed: self.speed.unwrap_or(base.speed),
            can_swim: self.can_swim.unwrap_or(base.can_swim),
            climb_skill: self.climb_skill.unwrap_or(base.climb_skill),
            max_hop_up: self.max_hop_up.unwrap_or(base.max_hop_up),
            max_hop_down: self.max_hop_down.unwrap_or(base.max_hop_down),
            ..*base
        }
    }
}

/// Whether a mover with `caps` may use `t` at all.
pub fn can_pass(t: &Transition, caps: &MoverCaps) -> bool {
    if t.is_retired() {
        return false;
    }
    if t.direction.is_diagonal() && !caps.can_move_diagonally {
        return false;
    }
    if t.clearance.is_some_and(|c| c < caps.height) {
        return false;
    }
    if t.enters_water && !caps.can_swim {
        return false;
    }
    match &t.kind {
        TransitionKind::Walk => true,
        TransitionKind::Hop { height, .. } => {
            if *height > 0 {
                *height <= caps.max_hop_up
            } else {
                -*height <= caps.max_hop_down
            }
        }
        TransitionKind::Climb { phases, .. } => phases.iter().all(|p| {
            p.skill_required != ClimbSkill::Unclimbable && p.skill_required <= caps.climb_skill
        }),
    }
}

/// Cost of traversing `t`. Only meaningful when `can_pass(t, caps)` holds.
pub fn transition_cost(t: &Transition, _caps: &MoverCaps) -> f32 {
    let base = t.distance / t.speed_modifier;
    let cost = match &t.kind {
        TransitionKind::Walk => base,
        TransitionKind::Hop {
            height,
            cost_per_step,
        } => base + height.abs() as f32 * cost_per_step,
        TransitionKind::Climb { phases, .. } => {
            let climbed: f32 = phases.iter().map(|p| p.cost()).sum();
            climbed.max(t.distance)
        }
    };
    cost.max(COST_EPSILON)
}

/// `Some(cost)` if the mover can pass, `None` otherwise.
pub fn evaluate(t: &Transition, caps: &MoverCaps) -> Option<f32> {
    can_pass(t, caps).then(|| transition_cost(t, caps))
}
