// Movement executor: drives one entity along a navigation path, tick by tick.
//
// A `Movement` is the component an entity carries when it can move. It owns
// the mover's base capabilities and overrides, the node the entity counts as
// standing on (`origin`), the transition currently being crossed, and the
// rest of the path.
//
// State machine:
//   Idle --move_to/move_along--> Moving(transition | climb phase i)
//   Moving --last transition completes--> Idle (TargetReached)
//   Moving --stop / failed replan--> Idle (Stopped)
// `pause()` freezes progress without leaving Moving.
//
// Crossing a transition:
// - Walk and hop: progress advances by `speed * surface_modifier / distance`
//   per tick. The origin switches to the destination when progress passes
//   the halfway point.
// - Climb: phases run in order at `speed * climb_speed_factor` cells of
//   height per tick, leftover time carrying into the next phase. The origin
//   switches when the transition's crossing phase starts (or on completion
//   for ladders).
// Time left in a tick after a transition completes carries into the next
// one, so a mover covers `speed` cells per tick on flat full-speed ground.
//
// When a transition completes, the next one is re-checked with
// `cost::can_pass()`. If the world changed (a retired transition) or the
// mover's caps changed (an override expired), the executor silently replans
// from where it stands to the same target: no `NewPath` event, only a bump
// of `path_revision`. If no path remains, the entity stops. A transition in
// progress always completes; its cost is not refunded.
//
// Notifications go to two places, in order: the entity's own listener list
// (synchronous closures, removable by `ListenerId`) and the `MovementSink`
// the caller passes in. The sim's sink turns them into `SimEvent`s and
// schedules vision updates.
//
// See also: `pathfinding.rs` for `find_path()`, `cost.rs` for the pass
// predicate and `MoverCaps`, `entity.rs` which owns the component, `sim.rs`
// which ticks it.
//
// **Critical constraint: determinism.** Movement is a pure function of the
// graph, the commands received, and the tick count. Progress arithmetic is
// plain f32 with no wall-clock input.

use crate::cost::{Capability, CapabilityOverride, CapabilityOverrides, MoverCaps, can_pass};
use crate::nav::{NavGraph, Transition, TransitionKind};
use crate::path::NavigationPath;
use crate::pathfinding::{SearchOptions, find_path};
use crate::types::{ALTITUDE_STEPS_PER_CELL, EntityId, NodeId, TransitionId};
use std::fmt;

/// Something that happened to a moving entity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MovementEvent {
    /// A new path was adopted by `move_to` or `move_along`.
    NewPath { target: NodeId },
    /// The entity now counts as standing on `to`.
    OriginChanged { from: NodeId, to: NodeId },
    TargetReached { target: NodeId },
    Stopped,
}

/// Receives movement events. Implemented by the sim to turn them into sim
/// events and vision updates.
pub trait MovementSink {
    fn on_movement_event(&mut self, entity: EntityId, event: &MovementEvent);
}

impl MovementSink for () {
    fn on_movement_event(&mut self, _entity: EntityId, _event: &MovementEvent) {}
}

impl MovementSink for Vec<(EntityId, MovementEvent)> {
    fn on_movement_event(&mut self, entity: EntityId, event: &MovementEvent) {
        self.push((entity, event.clone()));
    }
}

/// Handle for removing a listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

type Listener = Box<dyn FnMut(EntityId, &MovementEvent)>;

/// Ordered list of movement listeners, notified in registration order.
#[derive(Default)]
pub struct Listeners {
    next_id: u64,
    entries: Vec<(ListenerId, Listener)>,
}

impl Listeners {
    pub fn add(&mut self, listener: impl FnMut(EntityId, &MovementEvent) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, Box::new(listener)));
        id
    }

    /// Returns whether the listener was registered.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(lid, _)| *lid != id);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn notify(&mut self, entity: EntityId, event: &MovementEvent) {
        for (_, listener) in &mut self.entries {
            listener(entity, event);
        }
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(id, _)| id))
            .finish()
    }
}

/// Sub-progress through a climb transition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClimbProgress {
    /// Index of the phase being climbed. Equal to the phase count once done.
    pub phase: usize,
    /// Altitude steps climbed within the current phase.
    pub climbed: f32,
}

/// The transition an entity is crossing right now.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActiveTransition {
    pub transition: TransitionId,
    /// Fraction of a walk or hop completed, 0 to 1. Unused for climbs.
    pub progress: f32,
    pub climb: Option<ClimbProgress>,
    /// Whether the origin has already switched to the destination.
    pub crossed: bool,
}

/// Outcome of one slice of progress.
struct Advance {
    crossed_now: bool,
    done: bool,
    /// Unused part of the time slice once the transition completed.
    leftover: f32,
}

impl ActiveTransition {
    fn new(transition: TransitionId) -> Self {
        Self {
            transition,
            progress: 0.0,
            climb: None,
            crossed: false,
        }
    }

    /// Advance by `time` ticks (at most one).
    fn advance(&mut self, t: &Transition, caps: &MoverCaps, time: f32) -> Advance {
        let (reached_crossing, done, leftover) = match &t.kind {
            TransitionKind::Walk | TransitionKind::Hop { .. } => {
                let rate = caps.speed * t.speed_modifier / t.distance;
                let needed = (1.0 - self.progress) / rate;
                let leftover = if needed <= time {
                    self.progress = 1.0;
                    time - needed
                } else {
                    self.progress += rate * time;
                    0.0
                };
                (self.progress >= 0.5, self.progress >= 1.0, leftover)
            }
            TransitionKind::Climb {
                phases,
                crossing_phase,
            } => {
                let cp = self.climb.get_or_insert(ClimbProgress {
                    phase: 0,
                    climbed: 0.0,
                });
                let mut time_left = time;
                while time_left > 0.0 {
                    let Some(phase) = phases.get(cp.phase) else {
                        break;
                    };
                    let rate = caps.speed * phase.speed_factor * ALTITUDE_STEPS_PER_CELL as f32;
                    let needed = (phase.height as f32 - cp.climbed) / rate;
                    if needed <= time_left {
                        time_left -= needed;
                        cp.phase += 1;
                        cp.climbed = 0.0;
                    } else {
                        cp.climbed += time_left * rate;
                        time_left = 0.0;
                    }
                }
                let done = cp.phase >= phases.len();
                (cp.phase >= *crossing_phase || done, done, time_left)
            }
        };
        let crossed_now = !self.crossed && (reached_crossing || done);
        self.crossed |= crossed_now;
        Advance {
            crossed_now,
            done,
            leftover: if done { leftover } else { 0.0 },
        }
    }
}

/// The movement component of an entity.
#[derive(Debug)]
pub struct Movement {
    owner: EntityId,
    base: MoverCaps,
    overrides: CapabilityOverrides,
    origin: NodeId,
    current: Option<ActiveTransition>,
    /// Transitions after `current`; its origin is `current`'s destination.
    /// `Some` exactly while moving.
    path: Option<NavigationPath>,
    paused: bool,
    path_revision: u64,
    search: SearchOptions,
    listeners: Listeners,
}

impl Movement {
    pub fn new(owner: EntityId, base: MoverCaps, origin: NodeId) -> Self {
        Self {
            owner,
            base,
            overrides: CapabilityOverrides::default(),
            origin,
            current: None,
            path: None,
            paused: false,
            path_revision: 0,
            search: SearchOptions::default(),
            listeners: Listeners::default(),
        }
    }

    pub fn owner(&self) -> EntityId {
        self.owner
    }

    /// The node the entity counts as standing on.
    pub fn origin(&self) -> NodeId {
        self.origin
    }

    pub fn is_moving(&self) -> bool {
        self.current.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn current_target(&self) -> Option<NodeId> {
        self.path.as_ref().map(|p| p.target())
    }

    pub fn current_transition(&self) -> Option<&ActiveTransition> {
        self.current.as_ref()
    }

    /// Transitions still to cross after the current one.
    pub fn remaining_path(&self) -> Option<&NavigationPath> {
        self.path.as_ref()
    }

    /// Changes every time the path is replaced, including silent replans.
    pub fn path_revision(&self) -> u64 {
        self.path_revision
    }

    pub fn base_caps(&self) -> &MoverCaps {
        &self.base
    }

    pub fn overrides(&self) -> &CapabilityOverrides {
        &self.overrides
    }

    /// Effective capabilities: base caps with enabled overrides applied.
    pub fn caps(&self) -> MoverCaps {
        self.overrides.resolve(&self.base)
    }

    pub fn search_options(&self) -> &SearchOptions {
        &self.search
    }

    pub fn set_search_options(&mut self, search: SearchOptions) {
        self.search = search;
    }

    pub fn add_listener(
        &mut self,
        listener: impl FnMut(EntityId, &MovementEvent) + 'static,
    ) -> ListenerId {
        self.listeners.add(listener)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Enable a capability override. A non-positive speed is rejected.
    pub fn enable_override(&mut self, value: CapabilityOverride) -> bool {
        if matches!(value, CapabilityOverride::Speed(s) if s.is_nan() || s <= 0.0) {
            log::warn!("{}: rejected override {value:?}", self.owner);
            return false;
        }
        self.overrides.enable(value);
        true
    }

    pub fn disable_override(&mut self, capability: Capability) {
        self.overrides.disable(capability);
    }

    /// Replace every override slot at once, as a `SetOverrides` command does.
    pub fn set_overrides(&mut self, overrides: CapabilityOverrides) -> bool {
        if overrides.speed.is_some_and(|s| s.is_nan() || s <= 0.0) {
            log::warn!("{}: rejected override set with bad speed", self.owner);
            return false;
        }
        self.overrides = overrides;
        true
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn unpause(&mut self) {
        self.paused = false;
    }

    /// Where a new path has to start: the end of the transition in progress,
    /// or the origin when idle.
    fn planning_origin(&self, graph: &NavGraph) -> NodeId {
        self.current
            .map(|a| graph.transition(a.transition).to)
            .unwrap_or(self.origin)
    }

    fn emit(&mut self, sink: &mut dyn MovementSink, event: MovementEvent) {
        self.listeners.notify(self.owner, &event);
        sink.on_movement_event(self.owner, &event);
    }

    /// Adopt `path`: its first transition starts now if idle, otherwise it
    /// follows the transition in progress.
    fn adopt(&mut self, mut path: NavigationPath) {
        if self.current.is_none() {
            self.current = path.pop_front().map(ActiveTransition::new);
        }
        self.path = Some(path);
        self.path_revision += 1;
    }

    /// Plan a path to `target` and start following it. Returns false (and
    /// stops) if there is none. Asking for the node the entity stands on
    /// reports `TargetReached` at once.
    pub fn move_to(&mut self, graph: &NavGraph, target: NodeId, sink: &mut dyn MovementSink) -> bool {
        let from = self.planning_origin(graph);
        let Some(path) = find_path(graph, &self.caps(), from, target, &self.search) else {
            log::debug!("{}: no path from {from} to {target}", self.owner);
            self.stop(sink);
            return false;
        };
        if path.is_empty() && self.current.is_none() {
            self.emit(sink, MovementEvent::TargetReached { target });
            return true;
        }
        self.adopt(path);
        self.emit(sink, MovementEvent::NewPath { target });
        true
    }

    /// Follow a caller-supplied path. It must start where a new path would
    /// start (see `move_to`), chain correctly, and, when idle, have a
    /// passable first transition.
    pub fn move_along(&mut self, graph: &NavGraph, path: NavigationPath, sink: &mut dyn MovementSink) -> bool {
        if path.origin() != self.planning_origin(graph) || !path.is_chained(graph) {
            return false;
        }
        let caps = self.caps();
        let first_blocked = self.current.is_none()
            && path
                .next_transition()
                .is_some_and(|first| !can_pass(graph.transition(first), &caps));
        if first_blocked {
            return false;
        }
        let target = path.target();
        if path.is_empty() && self.current.is_none() {
            self.emit(sink, MovementEvent::TargetReached { target });
            return true;
        }
        self.adopt(path);
        self.emit(sink, MovementEvent::NewPath { target });
        true
    }

    /// Halt. The entity stays on its origin. Does nothing when idle.
    pub fn stop(&mut self, sink: &mut dyn MovementSink) {
        if self.current.is_none() && self.path.is_none() {
            return;
        }
        self.current = None;
        self.path = None;
        self.path_revision += 1;
        self.emit(sink, MovementEvent::Stopped);
    }

    /// Advance one tick.
    pub fn tick(&mut self, graph: &NavGraph, sink: &mut dyn MovementSink) {
        if self.paused {
            return;
        }
        let caps = self.caps();
        let mut time = 1.0f32;
        while time > 0.0 {
            let Some(active) = self.current.as_mut() else {
                return;
            };
            let t = graph.transition(active.transition);
            let step = active.advance(t, &caps, time);

            if step.crossed_now {
                let from = self.origin;
                self.origin = t.to;
                self.emit(sink, MovementEvent::OriginChanged { from, to: t.to });
            }
            if !step.done {
                return;
            }
            self.current = None;
            self.continue_path(graph, &caps, sink);
            time = step.leftover;
        }
    }

    /// Pick up the next transition after one completes.
    fn continue_path(&mut self, graph: &NavGraph, caps: &MoverCaps, sink: &mut dyn MovementSink) {
        let Some(path) = self.path.as_mut() else {
            return;
        };
        let target = path.target();
        let Some(next) = path.pop_front() else {
            self.path = None;
            self.emit(sink, MovementEvent::TargetReached { target });
            return;
        };
        if can_pass(graph.transition(next), caps) {
            self.current = Some(ActiveTransition::new(next));
            return;
        }

        log::debug!(
            "{}: {} no longer passable at {}, replanning to {target}",
            self.owner,
            next,
            self.origin
        );
        match find_path(graph, caps, self.origin, target, &self.search) {
            Some(path) if path.is_empty() => {
                self.path = None;
                self.emit(sink, MovementEvent::TargetReached { target });
            }
            Some(path) => self.adopt(path),
            None => {
                log::debug!("{}: replan failed, stopping", self.owner);
                self.path = None;
                self.path_revision += 1;
                self.emit(sink, MovementEvent::Stopped);
            }
        }
    }
}
