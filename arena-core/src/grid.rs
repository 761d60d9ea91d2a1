//! The arena board: bounds, occupancy and greedy Manhattan pathing.

use crate::fighter::Side;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A tile coordinate. Serialized as an `[x, y]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "(i32, i32)", into = "(i32, i32)")]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for Position {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl From<Position> for (i32, i32) {
    fn from(p: Position) -> Self {
        (p.x, p.y)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Manhattan distance; the only distance metric on the board.
pub fn distance(a: Position, b: Position) -> u32 {
    a.x.abs_diff(b.x) + a.y.abs_diff(b.y)
}

/// W x H board, 0-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    pub width: u32,
    pub height: u32,
}

impl Grid {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn tiles(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn in_bounds(&self, p: Position) -> bool {
        p.x >= 0 && p.y >= 0 && (p.x as u32) < self.width && (p.y as u32) < self.height
    }

    /// Pull a position back onto the board.
    pub fn clamp(&self, p: Position) -> Position {
        Position::new(
            p.x.clamp(0, last_index(self.width)),
            p.y.clamp(0, last_index(self.height)),
        )
    }

    /// Spawn column for a side: team 0 on the left edge, team 1 on the right.
    pub fn spawn_column(&self, side: Side) -> i32 {
        match side {
            Side::Home => 0,
            Side::Away => last_index(self.width),
        }
    }

    /// Rows spread outward from the middle: mid, mid-1, mid+1, mid-2, ...
    pub fn spread_rows(&self, count: usize) -> Vec<i32> {
        let height = self.height.max(1) as i32;
        let mid = (height - 1) / 2;
        let mut rows = Vec::with_capacity(count);
        let mut offset = 0;
        while rows.len() < count {
            let up = mid - offset;
            let down = mid + offset;
            if up >= 0 {
                rows.push(up);
            }
            if offset != 0 && down < height && rows.len() < count {
                rows.push(down);
            }
            offset += 1;
            if offset > height {
                // Column is full; extra fighters stack on the last row and
                // get pushed out by collision resolution.
                while rows.len() < count {
                    rows.push(height - 1);
                }
            }
        }
        rows.truncate(count);
        rows
    }

    /// The closest free in-bounds tile to `start`, searching expanding
    /// Manhattan rings (row-major within a ring).
    pub fn nearest_free(&self, start: Position, occupancy: &Occupancy) -> Option<Position> {
        let start = self.clamp(start);
        if occupancy.is_free(self, start) {
            return Some(start);
        }
        let max_radius = i32::try_from(self.width.saturating_add(self.height)).unwrap_or(i32::MAX);
        for radius in 1..=max_radius {
            let mut ring = Vec::new();
            for dy in -radius..=radius {
                let rem = radius - dy.abs();
                for dx in [-rem, rem] {
                    ring.push(Position::new(start.x + dx, start.y + dy));
                    if rem == 0 {
                        break;
                    }
                }
            }
            ring.sort_by_key(|p| (p.y, p.x));
            if let Some(p) = ring.into_iter().find(|p| occupancy.is_free(self, *p)) {
                return Some(p);
            }
        }
        None
    }
}

/// Highest coordinate along an axis of `len` tiles.
fn last_index(len: u32) -> i32 {
    i32::try_from(len.saturating_sub(1)).unwrap_or(i32::MAX)
}

/// Which living fighter stands on which tile.
#[derive(Debug, Clone, Default)]
pub struct Occupancy {
    tiles: BTreeMap<Position, usize>,
}

impl Occupancy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(index, position, alive)` triples.
    pub fn from_fighters<I>(fighters: I) -> Self
    where
        I: IntoIterator<Item = (usize, Position, bool)>,
    {
        let mut occ = Self::new();
        for (index, pos, alive) in fighters {
            if alive {
                occ.tiles.insert(pos, index);
            }
        }
        occ
    }

    pub fn occupant(&self, p: Position) -> Option<usize> {
        self.tiles.get(&p).copied()
    }

    /// In bounds and not held by a living fighter.
    pub fn is_free(&self, grid: &Grid, p: Position) -> bool {
        grid.in_bounds(p) && !self.tiles.contains_key(&p)
    }

    pub fn insert(&mut self, p: Position, index: usize) {
        self.tiles.insert(p, index);
    }

    pub fn remove(&mut self, p: Position) {
        self.tiles.remove(&p);
    }

    /// Move `index` from one tile to another.
    pub fn relocate(&mut self, from: Position, to: Position, index: usize) {
        if self.tiles.get(&from) == Some(&index) {
            self.tiles.remove(&from);
        }
        self.tiles.insert(to, index);
    }
}

/// Outcome of one greedy step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Already on the target tile.
    Arrived,
    Moved(Position),
    /// Neither axis could advance; `tile` is the preferred destination.
    Blocked { tile: Position },
}

/// One greedy step from `from` toward `to`.
///
/// Reduces the larger of |dx| and |dy| first (ties take x), then tries the
/// other axis if the first choice is not free.
pub fn next_step<F>(from: Position, to: Position, is_free: F) -> Step
where
    F: Fn(Position) -> bool,
{
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    if dx == 0 && dy == 0 {
        return Step::Arrived;
    }

    let x_step = Position::new(from.x + dx.signum(), from.y);
    let y_step = Position::new(from.x, from.y + dy.signum());
    let (primary, secondary) = if dx.abs() >= dy.abs() {
        (x_step, (dy != 0).then_some(y_step))
    } else {
        (y_step, (dx != 0).then_some(x_step))
    };

    if is_free(primary) {
        return Step::Moved(primary);
    }
    match secondary {
        Some(alt) if is_free(alt) => Step::Moved(alt),
        _ => Step::Blocked { tile: primary },
    }
}
