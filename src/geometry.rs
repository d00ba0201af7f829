//! Grid coordinates, directions and axis-aligned rectangles.

use serde::{Deserialize, Serialize};

/// A cell in grid coordinates.
///
/// Coordinates are signed so a head that stepped off the playfield can still be
/// represented and reported as a wall collision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Neighbouring cell one step in `direction`
    #[inline]
    pub fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.offset();
        Self::new(self.x + dx, self.y + dy)
    }

    #[inline]
    pub fn manhattan(self, other: Cell) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    #[inline]
    pub fn chebyshev(self, other: Cell) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    /// True when the two cells share an edge
    #[inline]
    pub fn is_adjacent(self, other: Cell) -> bool {
        self.manhattan(other) == 1
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One of the four movement directions. `Up` decreases `y`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    #[inline]
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    #[inline]
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Numeric code used by remote agents (0=left, 1=up, 2=right, 3=down)
    pub fn code(self) -> u8 {
        match self {
            Direction::Left => 0,
            Direction::Up => 1,
            Direction::Right => 2,
            Direction::Down => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Direction> {
        match code {
            0 => Some(Direction::Left),
            1 => Some(Direction::Up),
            2 => Some(Direction::Right),
            3 => Some(Direction::Down),
            _ => None,
        }
    }
}

/// Inclusive axis-aligned rectangle in grid coordinates
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bounds {
    pub x_min: i32,
    pub y_min: i32,
    pub x_max: i32,
    pub y_max: i32,
}

impl Bounds {
    pub const fn new(x_min: i32, y_min: i32, x_max: i32, y_max: i32) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Rectangle covering a whole `columns` x `rows` playfield
    pub fn full(columns: i32, rows: i32) -> Self {
        Self::new(0, 0, columns - 1, rows - 1)
    }

    #[inline]
    pub fn width(&self) -> i32 {
        (self.x_max - self.x_min + 1).max(0)
    }

    #[inline]
    pub fn height(&self) -> i32 {
        (self.y_max - self.y_min + 1).max(0)
    }

    #[inline]
    pub fn area(&self) -> i64 {
        self.width() as i64 * self.height() as i64
    }

    #[inline]
    pub fn contains(&self, cell: Cell) -> bool {
        cell.x >= self.x_min && cell.x <= self.x_max && cell.y >= self.y_min && cell.y <= self.y_max
    }

    /// True when `other` lies entirely inside `self`
    pub fn encloses(&self, other: &Bounds) -> bool {
        other.x_min >= self.x_min
            && other.x_max <= self.x_max
            && other.y_min >= self.y_min
            && other.y_max <= self.y_max
    }
}

impl std::fmt::Display for Bounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({},{})-({},{}) [{}x{}]",
            self.x_min,
            self.y_min,
            self.x_max,
            self.y_max,
            self.width(),
            self.height()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distances() {
        let a = Cell::new(2, 3);
        let b = Cell::new(5, -1);
        assert_eq!(a.manhattan(b), 7);
        assert_eq!(a.chebyshev(b), 4);
        assert!(a.is_adjacent(Cell::new(2, 4)));
        assert!(!a.is_adjacent(Cell::new(3, 4)));
    }

    #[test]
    fn test_direction_codes() {
        for dir in Direction::ALL {
            assert_eq!(Direction::from_code(dir.code()), Some(dir));
            assert_eq!(dir.opposite().opposite(), dir);
        }
        assert_eq!(Direction::from_code(7), None);
        assert_eq!(Cell::new(0, 0).step(Direction::Up), Cell::new(0, -1));
    }

    #[test]
    fn test_bounds() {
        let full = Bounds::full(40, 30);
        assert_eq!(full.width(), 40);
        assert_eq!(full.height(), 30);
        assert_eq!(full.area(), 1200);
        assert!(full.contains(Cell::new(39, 29)));
        assert!(!full.contains(Cell::new(40, 0)));
        assert!(full.encloses(&Bounds::new(3, 2, 36, 27)));
    }
}
