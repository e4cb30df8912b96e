/// Grid coordinates, cardinal directions, and the playable rectangle.
///
/// The playable area is `[1, width] x [1, height]`. Row 1 is the top of
/// the screen, so `Up` decreases `y`. Column/row 0 and `width + 1` /
/// `height + 1` form an implicit border that is always out of bounds.

use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub const fn new(x: i32, y: i32) -> Self {
        GridPos { x, y }
    }

    /// The neighbouring cell one step in `dir`.
    #[inline]
    pub fn offset(self, dir: Direction) -> GridPos {
        let (dx, dy) = dir.delta();
        GridPos { x: self.x + dx, y: self.y + dy }
    }

    /// The neighbouring cell on the trailing side of a move in `dir`.
    #[inline]
    pub fn behind(self, dir: Direction) -> GridPos {
        self.offset(dir.opposite())
    }

    /// The four orthogonal neighbours, in `Direction::ALL` order.
    pub fn neighbours(self) -> [GridPos; 4] {
        Direction::ALL.map(|d| self.offset(d))
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A single discrete move. Diagonals are not representable.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Input priority order: when several keys fire in one frame,
    /// the first one in this list wins.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up    => (0, -1),
            Direction::Down  => (0, 1),
            Direction::Left  => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up    => Direction::Down,
            Direction::Down  => Direction::Up,
            Direction::Left  => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Pick the highest-priority direction among those reported active.
    pub fn first_active(active: impl Fn(Direction) -> bool) -> Option<Direction> {
        Direction::ALL.into_iter().find(|&d| active(d))
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        };
        f.write_str(name)
    }
}

/// The playable rectangle. Fixed once a level is loaded.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Bounds {
    pub width: i32,
    pub height: i32,
}

impl Bounds {
    pub fn new(width: i32, height: i32) -> Self {
        Bounds { width, height }
    }

    /// Strict interior test: `1 <= x <= width && 1 <= y <= height`.
    #[inline]
    pub fn contains(&self, pos: GridPos) -> bool {
        pos.x >= 1 && pos.x <= self.width && pos.y >= 1 && pos.y <= self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_interior_only() {
        let b = Bounds::new(10, 10);
        assert!(b.contains(GridPos::new(1, 1)));
        assert!(b.contains(GridPos::new(10, 10)));
        assert!(!b.contains(GridPos::new(0, 5)));
        assert!(!b.contains(GridPos::new(5, 0)));
        assert!(!b.contains(GridPos::new(11, 5)));
        assert!(!b.contains(GridPos::new(5, 11)));
    }

    #[test]
    fn empty_bounds_contain_nothing() {
        let b = Bounds::new(0, 0);
        assert!(!b.contains(GridPos::new(0, 0)));
        assert!(!b.contains(GridPos::new(1, 1)));
    }

    #[test]
    fn up_is_toward_row_one() {
        let p = GridPos::new(3, 3);
        assert_eq!(p.offset(Direction::Up), GridPos::new(3, 2));
        assert_eq!(p.offset(Direction::Down), GridPos::new(3, 4));
        assert_eq!(p.offset(Direction::Left), GridPos::new(2, 3));
        assert_eq!(p.offset(Direction::Right), GridPos::new(4, 3));
    }

    #[test]
    fn behind_is_opposite_offset() {
        let p = GridPos::new(5, 5);
        assert_eq!(p.behind(Direction::Right), GridPos::new(4, 5));
        assert_eq!(p.behind(Direction::Up), GridPos::new(5, 6));
    }

    #[test]
    fn first_active_follows_priority() {
        // Down and Right both held: Down wins.
        let held = |d: Direction| matches!(d, Direction::Down | Direction::Right);
        assert_eq!(Direction::first_active(held), Some(Direction::Down));
        assert_eq!(Direction::first_active(|_| false), None);
        assert_eq!(Direction::first_active(|_| true), Some(Direction::Up));
    }
}
