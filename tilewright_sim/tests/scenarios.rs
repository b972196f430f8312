//! End-to-end movement scenarios: grids, water, climbing, invalidation, and
//! the sim command loop.

mod common;

use common::{at, init_logging};
use tilewright_sim::command::{SimAction, SimCommand};
use tilewright_sim::config::{EntityDef, GameConfig};
use tilewright_sim::cost::{CapabilityOverrides, MoverCaps};
use tilewright_sim::defs::DefRegistry;
use tilewright_sim::event::{SimEvent, SimEventKind};
use tilewright_sim::movement::{Movement, MovementEvent};
use tilewright_sim::pathfinding::{SearchOptions, find_path};
use tilewright_sim::sim::SimState;
use tilewright_sim::types::{CellCoord, ClimbSkill, Direction, EntityId};
use tilewright_sim::world::TileWorld;

type Recorded = Vec<(EntityId, MovementEvent)>;

fn events_of(recorded: &Recorded) -> Vec<MovementEvent> {
    recorded.iter().map(|(_, e)| e.clone()).collect()
}

#[test]
fn three_by_three_without_diagonals() {
    let defs = DefRegistry::default();
    let world = TileWorld::flat(&defs, 3, 3, 0);
    let caps = MoverCaps {
        can_move_diagonally: false,
        ..MoverCaps::default()
    };
    let path = find_path(
        world.graph(),
        &caps,
        at(&world, 0, 0),
        at(&world, 2, 2),
        &SearchOptions::default(),
    )
    .unwrap();
    assert_eq!(path.len(), 4);
    assert_eq!(path.total_cost(), 4.0);
    for t in path.transitions() {
        assert!(!world.graph().transition(t).direction.is_diagonal());
    }

    let diagonal = find_path(
        world.graph(),
        &MoverCaps::default(),
        at(&world, 0, 0),
        at(&world, 2, 2),
        &SearchOptions::default(),
    )
    .unwrap();
    assert_eq!(diagonal.len(), 2);
}

/// A 5 x 3 field with a river down column x = 2.
fn river(defs: &DefRegistry) -> TileWorld {
    let mut world = TileWorld::flat(defs, 5, 3, 0);
    for z in 0..3 {
        let node = at(&world, 2, z);
        world.set_surface(defs, node, "water").unwrap();
    }
    world
}

#[test]
fn river_needs_swimming() {
    let defs = DefRegistry::default();
    let world = river(&defs);
    let (start, goal) = (at(&world, 0, 1), at(&world, 4, 1));
    let walker = MoverCaps {
        can_move_diagonally: false,
        ..MoverCaps::default()
    };
    let opts = SearchOptions::default();
    assert!(find_path(world.graph(), &walker, start, goal, &opts).is_none());

    let swimmer = MoverCaps {
        can_swim: true,
        ..walker
    };
    let path = find_path(world.graph(), &swimmer, start, goal, &opts).unwrap();
    // Land, water at half speed, land, land.
    assert_eq!(path.total_cost(), 5.0);
}

#[test]
fn land_bridge_beats_swimming_when_cheaper() {
    let defs = DefRegistry::default();
    let mut world = river(&defs);
    let bridge = at(&world, 2, 0);
    world.set_surface(&defs, bridge, "stone").unwrap();
    let walker = MoverCaps::default();
    let path = find_path(
        world.graph(),
        &walker,
        at(&world, 0, 0),
        at(&world, 4, 0),
        &SearchOptions::default(),
    )
    .unwrap();
    assert!(path.nodes().any(|n| n == bridge));
    assert_eq!(path.total_cost(), 4.0);
}

#[test]
fn fence_needs_basic_and_wall_needs_advanced() {
    let defs = DefRegistry::default();
    let mut world = TileWorld::flat(&defs, 2, 1, 0);
    let (a, b) = (at(&world, 0, 0), at(&world, 1, 0));
    world.build_climbable(&defs, a, Direction::E, "fence").unwrap();
    let opts = SearchOptions::default();

    let mut caps = MoverCaps::default();
    assert!(find_path(world.graph(), &caps, a, b, &opts).is_none());
    caps.climb_skill = ClimbSkill::Basic;
    assert!(find_path(world.graph(), &caps, a, b, &opts).is_some());

    world.remove_climbable(&defs, a, Direction::E).unwrap();
    world.build_climbable(&defs, a, Direction::E, "wall").unwrap();
    caps.climb_skill = ClimbSkill::Intermediate;
    assert!(find_path(world.graph(), &caps, a, b, &opts).is_none());
    caps.climb_skill = ClimbSkill::Advanced;
    assert!(find_path(world.graph(), &caps, a, b, &opts).is_some());
}

#[test]
fn fence_climb_switches_origin_at_the_top() {
    init_logging();
    let defs = DefRegistry::default();
    let mut world = TileWorld::flat(&defs, 2, 1, 0);
    let (a, b) = (at(&world, 0, 0), at(&world, 1, 0));
    world.build_climbable(&defs, a, Direction::E, "fence").unwrap();
    let caps = MoverCaps {
        speed: 0.25,
        climb_skill: ClimbSkill::Basic,
        ..MoverCaps::default()
    };
    let mut m = Movement::new(EntityId(0), caps, a);
    let mut sink = Recorded::new();
    assert!(m.move_to(world.graph(), b, &mut sink));

    // 0.25 * 0.5 climb factor = 1.25 steps per tick; 5 up then 5 down.
    for _ in 0..3 {
        m.tick(world.graph(), &mut sink);
    }
    assert_eq!(m.origin(), a);
    m.tick(world.graph(), &mut sink);
    assert_eq!(m.origin(), b);
    assert!(m.is_moving());
    for _ in 0..4 {
        m.tick(world.graph(), &mut sink);
    }
    assert!(!m.is_moving());
    assert_eq!(
        events_of(&sink),
        vec![
            MovementEvent::NewPath { target: b },
            MovementEvent::OriginChanged { from: a, to: b },
            MovementEvent::TargetReached { target: b },
        ]
    );
}

#[test]
fn ladder_origin_changes_only_on_completion() {
    let defs = DefRegistry::default();
    let mut world = TileWorld::flat(&defs, 2, 1, 0);
    let (low, high) = (at(&world, 0, 0), at(&world, 1, 0));
    world.set_altitude(&defs, high, [30; 4]).unwrap();
    let opts = SearchOptions::default();
    let dog = MoverCaps {
        speed: 0.25,
        ..MoverCaps::default()
    };
    assert!(find_path(world.graph(), &dog, low, high, &opts).is_none());

    world.build_climbable(&defs, low, Direction::E, "ladder").unwrap();
    assert!(find_path(world.graph(), &dog, high, low, &opts).is_some());

    let mut m = Movement::new(EntityId(0), dog, low);
    m.move_to(world.graph(), high, &mut ());
    // About 1.5 steps per tick over 30 steps.
    for _ in 0..19 {
        m.tick(world.graph(), &mut ());
        assert_eq!(m.origin(), low);
    }
    for _ in 0..2 {
        m.tick(world.graph(), &mut ());
    }
    assert_eq!(m.origin(), high);
    assert!(!m.is_moving());
}

#[test]
fn blocked_path_is_replanned_without_new_path_event() {
    init_logging();
    let mut sim = SimState::flat(6, 3);
    let start = at(&sim.world, 0, 1);
    let goal = at(&sim.world, 5, 1);
    let dog = sim.spawn_entity("dog", start, None).unwrap();
    sim.step(
        &[SimCommand {
            tick: 1,
            action: SimAction::MoveTo {
                entity: dog,
                target: goal,
            },
        }],
        2,
    );
    let revision = sim.movement(dog).unwrap().path_revision();

    // Wall off column x = 3 except its top cell.
    for z in 0..2 {
        let node = at(&sim.world, 3, z);
        sim.world.set_passable(&sim.defs, node, false).unwrap();
    }
    let result = sim.step(&[], 200);

    let moved_through: Vec<_> = result
        .events
        .iter()
        .filter_map(|e| match e.kind {
            SimEventKind::EntityMoved { to, .. } => Some(to),
            _ => None,
        })
        .collect();
    assert!(moved_through.contains(&at(&sim.world, 3, 2)));
    assert!(!moved_through.contains(&at(&sim.world, 3, 1)));
    assert!(!result.events.iter().any(|e| matches!(e.kind, SimEventKind::NewPath { .. })));
    assert_eq!(sim.entity(dog).unwrap().node(), goal);
    assert!(sim.movement(dog).unwrap().path_revision() > revision);
}

#[test]
fn replan_failure_stops_the_entity() {
    let mut sim = SimState::flat(5, 1);
    let start = at(&sim.world, 0, 0);
    let goal = at(&sim.world, 4, 0);
    let dog = sim.spawn_entity("dog", start, None).unwrap();
    sim.step(
        &[SimCommand {
            tick: 1,
            action: SimAction::MoveTo {
                entity: dog,
                target: goal,
            },
        }],
        1,
    );
    let wall = at(&sim.world, 3, 0);
    sim.world.set_passable(&sim.defs, wall, false).unwrap();
    let result = sim.step(&[], 100);

    let stops = result
        .events
        .iter()
        .filter(|e| e.kind == SimEventKind::MovementStopped { entity: dog })
        .count();
    assert_eq!(stops, 1);
    let movement = sim.movement(dog).unwrap();
    assert!(!movement.is_moving());
    assert_eq!(movement.origin(), at(&sim.world, 2, 0));
}

#[test]
fn stop_twice_emits_one_stopped_event() {
    let mut sim = SimState::flat(8, 1);
    let dog = sim.spawn_entity("dog", at(&sim.world, 0, 0), None).unwrap();
    let goal = at(&sim.world, 7, 0);
    let commands = [
        SimCommand {
            tick: 1,
            action: SimAction::Stop { entity: dog },
        },
        SimCommand {
            tick: 2,
            action: SimAction::MoveTo {
                entity: dog,
                target: goal,
            },
        },
        SimCommand {
            tick: 5,
            action: SimAction::Stop { entity: dog },
        },
        SimCommand {
            tick: 5,
            action: SimAction::Stop { entity: dog },
        },
    ];
    let result = sim.step(&commands, 30);
    let stops: Vec<_> = result
        .events
        .iter()
        .filter(|e| matches!(e.kind, SimEventKind::MovementStopped { .. }))
        .collect();
    assert_eq!(stops.len(), 1);
    assert_eq!(stops[0].tick, 5);
    assert!(!sim.movement(dog).unwrap().is_moving());
    assert_ne!(sim.entity(dog).unwrap().node(), goal);
}

/// The default defs plus a land-bound "walker".
fn defs_with_walker() -> DefRegistry {
    let mut config = GameConfig::default();
    config.entities.insert(
        "walker".to_string(),
        EntityDef {
            caps: Some(MoverCaps {
                speed: 0.3,
                ..MoverCaps::default()
            }),
            footprint: (1, 1),
            vision_range: 0.0,
        },
    );
    DefRegistry::from_config(config).unwrap()
}

fn order(tick: u64, action: SimAction) -> SimCommand {
    SimCommand { tick, action }
}

fn new_paths(events: &[SimEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e.kind, SimEventKind::NewPath { .. }))
        .count()
}

#[test]
fn override_lets_a_walker_swim_until_disabled() {
    let defs = defs_with_walker();
    let world = river(&defs);
    let mut sim = SimState::new(defs, world);
    let start = at(&sim.world, 0, 1);
    let goal = at(&sim.world, 4, 1);
    let walker = sim.spawn_entity("walker", start, None).unwrap();
    let swim = CapabilityOverrides {
        can_swim: Some(true),
        ..CapabilityOverrides::default()
    };

    // On its own the walker cannot cross the river.
    let result = sim.step(&[order(1, SimAction::MoveTo { entity: walker, target: goal })], 5);
    assert_eq!(new_paths(&result.events), 0);

    let result = sim.step(
        &[
            order(6, SimAction::SetOverrides { entity: walker, overrides: swim }),
            order(6, SimAction::MoveTo { entity: walker, target: goal }),
        ],
        200,
    );
    assert_eq!(new_paths(&result.events), 1);
    assert_eq!(sim.entity(walker).unwrap().node(), goal);

    // Clearing the override strands it on the far bank.
    let result = sim.step(
        &[
            order(201, SimAction::SetOverrides {
                entity: walker,
                overrides: CapabilityOverrides::default(),
            }),
            order(201, SimAction::MoveTo { entity: walker, target: start }),
        ],
        400,
    );
    assert_eq!(new_paths(&result.events), 0);
    assert!(!sim.movement(walker).unwrap().caps().can_swim);
    assert_eq!(sim.entity(walker).unwrap().node(), goal);
}

#[test]
fn diagonal_never_squeezes_between_water_corners() {
    let defs = DefRegistry::default();
    let mut world = TileWorld::flat(&defs, 3, 3, 0);
    for (x, z) in [(0, 2), (1, 1), (2, 0)] {
        let node = at(&world, x, z);
        world.set_surface(&defs, node, "water").unwrap();
    }
    let (start, goal) = (at(&world, 0, 0), at(&world, 2, 2));
    let opts = SearchOptions::default();
    let walker = MoverCaps::default();
    assert!(find_path(world.graph(), &walker, start, goal, &opts).is_none());
    assert!(!tilewright_sim::range::in_range(world.graph(), &walker, start, goal, 100.0));

    let swimmer = MoverCaps {
        can_swim: true,
        ..walker
    };
    assert!(find_path(world.graph(), &swimmer, start, goal, &opts).is_some());
}

#[test]
fn diagonal_respects_low_ceilings_on_both_corners() {
    let defs = DefRegistry::default();
    let mut world = TileWorld::flat(&defs, 2, 2, 0);
    for (x, z) in [(1, 0), (0, 1)] {
        world
            .add_air_node(&defs, CellCoord::new(x, z), [8; 4], None)
            .unwrap();
    }
    let (start, goal) = (at(&world, 0, 0), at(&world, 1, 1));
    let opts = SearchOptions::default();
    assert!(find_path(world.graph(), &MoverCaps::default(), start, goal, &opts).is_none());

    let short = MoverCaps {
        height: 6,
        ..MoverCaps::default()
    };
    let path = find_path(world.graph(), &short, start, goal, &opts).unwrap();
    assert_eq!(path.len(), 1);
}

#[test]
fn vision_follows_the_mover() {
    let mut sim = SimState::flat(30, 1);
    let observer = tilewright_sim::types::ActorId(5);
    let dog = sim
        .spawn_entity("dog", at(&sim.world, 0, 0), Some(observer))
        .unwrap();
    let far = at(&sim.world, 20, 0);
    sim.step(&[], 1);
    assert!(!sim.world.graph().node(far).is_explored_by(observer));

    sim.step(
        &[SimCommand {
            tick: 2,
            action: SimAction::MoveTo {
                entity: dog,
                target: at(&sim.world, 15, 0),
            },
        }],
        200,
    );
    assert!(sim.world.graph().node(far).is_explored_by(observer));
    let edge = sim.world.graph().ground_node_at(CellCoord::new(29, 0)).unwrap();
    assert!(!sim.world.graph().node(edge).is_explored_by(observer));

    // Explored-only searches now reach the far node but not the edge.
    let caps = *sim.movement(dog).unwrap().base_caps();
    let opts = SearchOptions::explored_only(observer);
    let here = sim.entity(dog).unwrap().node();
    assert!(find_path(sim.world.graph(), &caps, here, far, &opts).is_some());
    assert!(find_path(sim.world.graph(), &caps, here, edge, &opts).is_none());
}
