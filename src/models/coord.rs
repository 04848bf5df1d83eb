use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A cell address in the search grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Coord {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Returns the neighbouring cell one unit step away in `direction`.
    pub fn step(self, direction: Direction) -> Self {
        let (dx, dy, dz) = direction.offset();
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Iterates the 26 cells of the surrounding 3x3x3 block, excluding `self`.
    pub fn neighbourhood(self) -> impl Iterator<Item = Coord> {
        (-1..=1).flat_map(move |dx| {
            (-1..=1).flat_map(move |dy| {
                (-1..=1).filter_map(move |dz| {
                    if dx == 0 && dy == 0 && dz == 0 {
                        None
                    } else {
                        Some(Coord::new(self.x + dx, self.y + dy, self.z + dz))
                    }
                })
            })
        })
    }

    pub fn manhattan(self, other: Coord) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs() + (self.z - other.z).abs()
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{},{}]", self.x, self.y, self.z)
    }
}

/// One of the six axis-aligned unit moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    East,
    West,
    North,
    South,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::East,
        Direction::West,
        Direction::North,
        Direction::South,
        Direction::Up,
        Direction::Down,
    ];

    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }

    fn offset(self) -> (i32, i32, i32) {
        match self {
            Direction::East => (1, 0, 0),
            Direction::West => (-1, 0, 0),
            Direction::North => (0, 1, 0),
            Direction::South => (0, -1, 0),
            Direction::Up => (0, 0, 1),
            Direction::Down => (0, 0, -1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn it_steps_one_unit_along_each_axis() {
        let origin = Coord::new(2, 2, 2);

        for direction in Direction::ALL {
            assert_eq!(origin.step(direction).manhattan(origin), 1);
        }
    }

    #[test]
    fn it_yields_twenty_six_distinct_neighbours() {
        let centre = Coord::new(0, 0, 0);
        let neighbours: HashSet<Coord> = centre.neighbourhood().collect();

        assert_eq!(neighbours.len(), 26);
        assert!(!neighbours.contains(&centre));
        assert!(neighbours.contains(&Coord::new(-1, -1, -1)));
        assert!(neighbours.contains(&Coord::new(1, 1, 1)));
    }
}
