//! Shared world builders and a reference search for integration tests.

use tilewright_sim::cost::{MoverCaps, can_pass, transition_cost};
use tilewright_sim::defs::DefRegistry;
use tilewright_sim::nav::NavGraph;
use tilewright_sim::types::{CellCoord, Direction, NodeId};
use tilewright_sim::world::TileWorld;

/// Enable log output for `-- --nocapture` runs without failing if another
/// test already initialised logging.
#[allow(dead_code)]
pub fn init_logging() {
    let _logging_initialised = env_logger::builder().is_test(true).try_init().is_ok();
}

/// The ground node of a column. Panics if there is none.
#[allow(dead_code)]
pub fn at(world: &TileWorld, x: i32, z: i32) -> NodeId {
    world
        .graph()
        .ground_node_at(CellCoord::new(x, z))
        .unwrap_or_else(|| panic!("no ground node at ({x}, {z})"))
}

/// A `side` x `side` world with seeded random altitudes (some too tall to
/// hop), surfaces (including water), fences, walls, and ladders.
#[allow(dead_code)]
pub fn random_world(defs: &DefRegistry, side: i32, seed: u64) -> TileWorld {
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut world = TileWorld::flat(defs, side, side, 0);
    let surfaces = ["grass", "sand", "mud", "water", "stone"];
    let climbables = ["fence", "wall", "ladder"];

    for z in 0..side {
        for x in 0..side {
            let node = at(&world, x, z);
            let alt = [0, 0, 0, 2, 4, 8, 20][rng.usize(..7)];
            if alt != 0 {
                world.set_altitude(defs, node, [alt; 4]).unwrap();
            }
            if rng.u8(..4) == 0 {
                let surface = surfaces[rng.usize(..surfaces.len())];
                world.set_surface(defs, node, surface).unwrap();
            }
            if rng.u8(..6) == 0 {
                let side = Direction::CARDINALS[rng.usize(..4)];
                let climbable = climbables[rng.usize(..climbables.len())];
                world.build_climbable(defs, node, side, climbable).unwrap();
            }
        }
    }
    world
}

/// Mover profiles covering the capability space.
#[allow(dead_code)]
pub fn mover_profiles() -> Vec<MoverCaps> {
    let base = MoverCaps::default();
    vec![
        base,
        MoverCaps {
            can_swim: true,
            climb_skill: tilewright_sim::types::ClimbSkill::Advanced,
            max_hop_up: 8,
            max_hop_down: 10,
            ..base
        },
        MoverCaps {
            can_move_diagonally: false,
            max_hop_up: 2,
            max_hop_down: 2,
            ..base
        },
        MoverCaps {
            climb_skill: tilewright_sim::types::ClimbSkill::Basic,
            height: 30,
            ..base
        },
    ]
}

/// Cheapest cost from `start` to every node, by relaxing every transition
/// until nothing changes. Slow and obviously correct.
#[allow(dead_code)]
pub fn reference_costs(graph: &NavGraph, caps: &MoverCaps, start: NodeId) -> Vec<f32> {
    let mut dist = vec![f32::INFINITY; graph.node_count()];
    dist[start.0 as usize] = 0.0;
    loop {
        let mut changed = false;
        for node in graph.nodes() {
            let here = dist[node.id.0 as usize];
            if here.is_infinite() {
                continue;
            }
            for t in graph.outgoing(node.id) {
                if !can_pass(t, caps) {
                    continue;
                }
                let cost = here + transition_cost(t, caps);
                if cost < dist[t.to.0 as usize] - 1e-6 {
                    dist[t.to.0 as usize] = cost;
                    changed = true;
                }
            }
        }
        if !changed {
            return dist;
        }
    }
}
