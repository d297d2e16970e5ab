use serde::{Deserialize, Serialize};
use std::fmt;

/// Grid coordinate. `y` grows downwards, so North is `y - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub x: i32,
    pub y: i32,
}

impl Location {
    pub const UNSET: Location = Location { x: -1, y: -1 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn is_unset(&self) -> bool {
        *self == Self::UNSET
    }

    /// Euclidean distance.
    pub fn distance_to(&self, other: Location) -> f32 {
        let dx = (other.x - self.x) as f32;
        let dy = (other.y - self.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }

    /// The adjacent coordinate in `dir`, without any bounds or wall check.
    pub fn step(&self, dir: Direction) -> Location {
        let (dx, dy) = dir.offset();
        Location::new(self.x + dx, self.y + dy)
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::UNSET
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    North,
    East,
    South,
    West,
}

impl Direction {
    /// Canonical scan order. Look reactions break ties by the first match in
    /// this order, so it must not depend on declaration order.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    pub fn clockwise(self) -> Direction {
        match self {
            Direction::North => Direction::East,
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
        }
    }

    pub fn counter_clockwise(self) -> Direction {
        match self {
            Direction::North => Direction::West,
            Direction::West => Direction::South,
            Direction::South => Direction::East,
            Direction::East => Direction::North,
        }
    }

    pub fn rotate(self, turn: Turn) -> Direction {
        match turn {
            Turn::Left => self.counter_clockwise(),
            Turn::Right => self.clockwise(),
        }
    }

    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::North => "North",
            Direction::East => "East",
            Direction::South => "South",
            Direction::West => "West",
        };
        f.write_str(name)
    }
}

/// Turn relative to the current heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Turn {
    /// Counter-clockwise.
    Left,
    /// Clockwise.
    Right,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_cycles_clockwise() {
        let mut d = Direction::North;
        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(d);
            d = d.clockwise();
        }
        assert_eq!(seen, Direction::ALL.to_vec());
        assert_eq!(d, Direction::North);
    }

    #[test]
    fn left_and_right_are_inverse() {
        for d in Direction::ALL {
            assert_eq!(d.rotate(Turn::Left).rotate(Turn::Right), d);
            assert_eq!(d.clockwise().clockwise(), d.opposite());
        }
        assert_eq!(Direction::North.rotate(Turn::Left), Direction::West);
        assert_eq!(Direction::South.rotate(Turn::Right), Direction::West);
    }

    #[test]
    fn step_follows_screen_axes() {
        let origin = Location::new(3, 3);
        assert_eq!(origin.step(Direction::North), Location::new(3, 2));
        assert_eq!(origin.step(Direction::East), Location::new(4, 3));
        assert_eq!(origin.step(Direction::South), Location::new(3, 4));
        assert_eq!(origin.step(Direction::West), Location::new(2, 3));
    }

    #[test]
    fn distance_is_euclidean() {
        let a = Location::new(1, 1);
        assert!((a.distance_to(Location::new(4, 5)) - 5.0).abs() < 1e-6);
        assert_eq!(a.distance_to(a), 0.0);
        assert!(Location::default().is_unset());
    }
}
