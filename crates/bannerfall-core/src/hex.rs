//! Hex coordinate system using offset coordinates (q, r).
//!
//! The board is stored in "odd-r" offset coordinates: each row `r` is a
//! horizontal strip and odd rows are shifted half a hex to the right. Offset
//! coordinates map directly onto the row-based board layout, while distance
//! and line math is done by converting to cube coordinates first.
//!
//! Because the shift depends on the row, neighbor offsets differ between even
//! and odd rows. Both tables are kept explicitly in [`HexCoord::neighbors`].

use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::str::FromStr;

/// Neighbor offsets for hexes on even rows, clockwise from East.
const EVEN_ROW_NEIGHBORS: [(i32, i32); 6] = [
    (1, 0),   // East
    (0, -1),  // NorthEast
    (-1, -1), // NorthWest
    (-1, 0),  // West
    (-1, 1),  // SouthWest
    (0, 1),   // SouthEast
];

/// Neighbor offsets for hexes on odd rows, clockwise from East.
const ODD_ROW_NEIGHBORS: [(i32, i32); 6] = [
    (1, 0),  // East
    (1, -1), // NorthEast
    (0, -1), // NorthWest
    (-1, 0), // West
    (0, 1),  // SouthWest
    (1, 1),  // SouthEast
];

/// Offset coordinate for a hex on the board.
///
/// - `q` is the column within the row
/// - `r` is the row, increasing downwards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct HexCoord {
    /// Column
    pub q: i32,
    /// Row
    pub r: i32,
}

/// Cube coordinate, used internally for distance and interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cube {
    q: i32,
    r: i32,
    s: i32,
}

impl Cube {
    fn to_offset(self) -> HexCoord {
        HexCoord::new(self.q + self.r.div_euclid(2), self.r)
    }

    /// Round fractional cube components to the nearest valid hex, fixing up
    /// whichever component drifted the furthest.
    fn round(q: f64, r: f64, s: f64) -> Cube {
        // Half-up rounding keeps ties stable regardless of sign.
        let round_half_up = |x: f64| (x + 0.5).floor();

        let mut rq = round_half_up(q);
        let mut rr = round_half_up(r);
        let mut rs = round_half_up(s);

        let q_diff = (rq - q).abs();
        let r_diff = (rr - r).abs();
        let s_diff = (rs - s).abs();

        if q_diff > r_diff && q_diff > s_diff {
            rq = -rr - rs;
        } else if r_diff > s_diff {
            rr = -rq - rs;
        } else {
            rs = -rq - rr;
        }

        Cube {
            q: rq as i32,
            r: rr as i32,
            s: rs as i32,
        }
    }
}

impl HexCoord {
    /// Create a new hex coordinate
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    fn to_cube(self) -> Cube {
        let q = self.q - self.r.div_euclid(2);
        let r = self.r;
        Cube { q, r, s: -q - r }
    }

    /// Distance to another hex (in hex steps)
    pub fn distance_to(&self, other: &HexCoord) -> i32 {
        let a = self.to_cube();
        let b = other.to_cube();
        ((a.q - b.q).abs() + (a.r - b.r).abs() + (a.s - b.s).abs()) / 2
    }

    /// The six neighboring hexes in clockwise order starting from East.
    ///
    /// The order is stable and is relied on wherever "the first free
    /// neighbor" is picked.
    pub fn neighbors(&self) -> [HexCoord; 6] {
        let table = if self.r.rem_euclid(2) == 0 {
            &EVEN_ROW_NEIGHBORS
        } else {
            &ODD_ROW_NEIGHBORS
        };
        table.map(|(dq, dr)| HexCoord::new(self.q + dq, self.r + dr))
    }

    /// Check whether two hexes share an edge
    pub fn is_adjacent(&self, other: &HexCoord) -> bool {
        self.neighbors().contains(other)
    }

    /// All hexes within `range` steps of this one, including itself.
    ///
    /// Hexes come out column-major from the bounding box scan, which gives
    /// callers a deterministic iteration order.
    pub fn hexes_in_range(&self, range: i32) -> Vec<HexCoord> {
        let range = range.max(0);
        let mut results = Vec::new();

        for q in (self.q - range)..=(self.q + range) {
            for r in (self.r - range)..=(self.r + range) {
                let coord = HexCoord::new(q, r);
                if self.distance_to(&coord) <= range {
                    results.push(coord);
                }
            }
        }

        results
    }

    /// Hexes on the straight line to `end`, excluding both endpoints.
    pub fn line_to(&self, end: &HexCoord) -> Vec<HexCoord> {
        let a = self.to_cube();
        let b = end.to_cube();
        let distance = self.distance_to(end);

        (1..distance)
            .map(|i| {
                let t = f64::from(i) / f64::from(distance);
                let lerp = |from: i32, to: i32| f64::from(from) + f64::from(to - from) * t;
                Cube::round(lerp(a.q, b.q), lerp(a.r, b.r), lerp(a.s, b.s)).to_offset()
            })
            .collect()
    }

    /// String key in the form `"q,r"`
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for HexCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.q, self.r)
    }
}

/// Error returned when a `"q,r"` key cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid hex key: {0:?}")]
pub struct ParseHexError(String);

impl FromStr for HexCoord {
    type Err = ParseHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (q, r) = s
            .split_once(',')
            .ok_or_else(|| ParseHexError(s.to_string()))?;
        let q = q.trim().parse().map_err(|_| ParseHexError(s.to_string()))?;
        let r = r.trim().parse().map_err(|_| ParseHexError(s.to_string()))?;
        Ok(HexCoord::new(q, r))
    }
}

/// Breadth-first reachability check bounded by beeline distance.
///
/// Returns true if `end` can be reached from `start` through adjacent hexes
/// that are each within `max_distance` of `start` and not blocked. The `end`
/// hex itself counts as reached even when `is_blocked` reports it, so an
/// occupied target can still be attacked or swapped into.
pub fn has_path_within_range<F>(
    start: HexCoord,
    end: HexCoord,
    max_distance: i32,
    is_blocked: F,
) -> bool
where
    F: Fn(&HexCoord) -> bool,
{
    let distance = start.distance_to(&end);
    if distance > max_distance {
        return false;
    }
    if distance == 0 {
        return true;
    }

    let mut queue = VecDeque::from([start]);
    let mut visited = HashSet::from([start]);

    while let Some(current) = queue.pop_front() {
        for neighbor in current.neighbors() {
            if visited.contains(&neighbor) {
                continue;
            }
            if start.distance_to(&neighbor) > max_distance {
                continue;
            }
            visited.insert(neighbor);

            if neighbor == end {
                return true;
            }
            if is_blocked(&neighbor) {
                continue;
            }
            queue.push_back(neighbor);
        }
    }

    false
}
