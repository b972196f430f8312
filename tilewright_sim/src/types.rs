// Core types shared across the simulation.
//
// Defines cell coordinates (`CellCoord`), compass directions and node
// corners, the climbing skill ladder, and the compact integer identifiers
// used by the nav graph, the def registry, and the entity table.
//
// Altitudes are integers measured in altitude steps. `ALTITUDE_STEPS_PER_CELL`
// steps make up one cell of height, so a fence of height 5 is half a cell
// tall. Horizontal distances are measured in cells.
//
// **Critical constraint: determinism.** IDs are sequential integers assigned
// in a fixed order. Everything here is `Ord` so it can key a `BTreeMap`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of altitude steps that make up the height of one cell.
pub const ALTITUDE_STEPS_PER_CELL: i32 = 10;

// ---------------------------------------------------------------------------
// Spatial types
// ---------------------------------------------------------------------------

/// The horizontal coordinate of a world column.
///
/// - X: east  (positive) / west  (negative)
/// - Z: north (positive) / south (negative)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    pub x: i32,
    pub z: i32,
}

impl CellCoord {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The neighbouring column in the given direction.
    pub fn step(self, dir: Direction) -> Self {
        let (dx, dz) = dir.offset();
        Self::new(self.x + dx, self.z + dz)
    }

    /// Straight-line distance between two column centres, in cells.
    pub fn distance(self, other: Self) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dz = (self.z - other.z) as f32;
        (dx * dx + dz * dz).sqrt()
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// An inclusive, axis-aligned rectangle of columns. Used to forbid areas
/// during path searches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub min: CellCoord,
    pub max: CellCoord,
}

impl Region {
    /// The region spanning both corners, in any order.
    pub fn new(a: CellCoord, b: CellCoord) -> Self {
        Self {
            min: CellCoord::new(a.x.min(b.x), a.z.min(b.z)),
            max: CellCoord::new(a.x.max(b.x), a.z.max(b.z)),
        }
    }

    pub fn contains(&self, c: CellCoord) -> bool {
        (self.min.x..=self.max.x).contains(&c.x) && (self.min.z..=self.max.z).contains(&c.z)
    }
}

/// The eight compass directions a transition can point in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl Direction {
    /// All directions, in the fixed order transitions are generated.
    pub const ALL: [Direction; 8] = [
        Direction::N,
        Direction::NE,
        Direction::E,
        Direction::SE,
        Direction::S,
        Direction::SW,
        Direction::W,
        Direction::NW,
    ];

    pub const CARDINALS: [Direction; 4] = [Direction::N, Direction::E, Direction::S, Direction::W];

    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::N => (0, 1),
            Direction::NE => (1, 1),
            Direction::E => (1, 0),
            Direction::SE => (1, -1),
            Direction::S => (0, -1),
            Direction::SW => (-1, -1),
            Direction::W => (-1, 0),
            Direction::NW => (-1, 1),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::N => Direction::S,
            Direction::NE => Direction::SW,
            Direction::E => Direction::W,
            Direction::SE => Direction::NW,
            Direction::S => Direction::N,
            Direction::SW => Direction::NE,
            Direction::W => Direction::E,
            Direction::NW => Direction::SE,
        }
    }

    pub fn is_diagonal(self) -> bool {
        matches!(
            self,
            Direction::NE | Direction::SE | Direction::SW | Direction::NW
        )
    }

    /// The two cardinal directions a diagonal is made of. `None` for cardinals.
    pub fn components(self) -> Option<(Direction, Direction)> {
        match self {
            Direction::NE => Some((Direction::N, Direction::E)),
            Direction::SE => Some((Direction::S, Direction::E)),
            Direction::SW => Some((Direction::S, Direction::W)),
            Direction::NW => Some((Direction::N, Direction::W)),
            _ => None,
        }
    }

    /// Corner pairs that coincide in space when stepping in this direction:
    /// `(corner of the origin node, corner of the destination node)`.
    /// Two pairs for cardinals (the shared edge), one for diagonals.
    pub fn shared_corners(self) -> &'static [(Corner, Corner)] {
        use Corner::*;
        match self {
            Direction::N => &[(NE, SE), (NW, SW)],
            Direction::E => &[(NE, NW), (SE, SW)],
            Direction::S => &[(SE, NE), (SW, NW)],
            Direction::W => &[(NW, NE), (SW, SE)],
            Direction::NE => &[(NE, SW)],
            Direction::SE => &[(SE, NW)],
            Direction::SW => &[(SW, NE)],
            Direction::NW => &[(NW, SE)],
        }
    }
}

/// One of the four top corners of a node. The discriminant is the index into
/// `Node::altitude`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Corner {
    NE = 0,
    SE = 1,
    SW = 2,
    NW = 3,
}

impl Corner {
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Ordinal climbing aptitude. Movers carry one of `None..=Advanced`;
/// obstacles are rated with the minimum a mover needs, and `Unclimbable`
/// obstacles can never be climbed.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum ClimbSkill {
    #[default]
    None,
    Basic,
    Intermediate,
    Advanced,
    Unclimbable,
}

// ---------------------------------------------------------------------------
// Compact integer IDs
// ---------------------------------------------------------------------------

macro_rules! compact_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

compact_id!(/// Identifier for a navigation graph node.
NodeId);
compact_id!(/// Identifier for a navigation graph transition. Never reused.
TransitionId);
compact_id!(/// Identifier for a simulated entity.
EntityId);
compact_id!(/// Identifier for an observer (a player or faction) that explores the world.
ActorId);
compact_id!(/// Index of a surface def in the `DefRegistry`.
SurfaceId);
compact_id!(/// Index of a climbable (fence, wall, ladder) def in the `DefRegistry`.
ClimbableId);
compact_id!(/// Identifier for a door placed in the world.
DoorId);
