//! Core types for the grid traffic simulation
//!
//! Coordinates, continuous positions and the small enums shared by every
//! other module.

use std::fmt;

/// Default duration of one simulation tick in seconds (25 ticks per second)
pub const DEFAULT_TICK_SECS: f64 = 1.0 / 25.0;

/// Real-world length of one grid cell in meters
pub const METERS_PER_CELL: f64 = 5.0;

/// Conversion factor from m/s to km/h
pub const MS_TO_KMH: f64 = 3.6;

/// A unique identifier for a vehicle, assigned in roster order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VehicleId(pub usize);

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A grid coordinate. Row 0 is the bottom line of the road map file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    pub row: i32,
    pub col: i32,
}

impl Cell {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// The cell `d_row`/`d_col` away, or `None` past the coordinate range
    pub fn offset(&self, d_row: i32, d_col: i32) -> Option<Cell> {
        Some(Cell::new(self.row.checked_add(d_row)?, self.col.checked_add(d_col)?))
    }

    /// The orthogonal neighbours in expansion order: Up, Down, Left, Right
    pub fn neighbors(&self) -> impl Iterator<Item = Cell> {
        let cell = *self;
        [(-1, 0), (1, 0), (0, -1), (0, 1)]
            .into_iter()
            .filter_map(move |(d_row, d_col)| cell.offset(d_row, d_col))
    }

    pub fn manhattan(&self, other: &Cell) -> u32 {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }

    pub fn center(&self) -> Position {
        Position::new(self.row as f64, self.col as f64)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// A continuous position measured in cells
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub row: f64,
    pub col: f64,
}

impl Position {
    pub fn new(row: f64, col: f64) -> Self {
        Self { row, col }
    }

    pub fn distance(&self, other: &Position) -> f64 {
        let d_row = self.row - other.row;
        let d_col = self.col - other.col;
        (d_row * d_row + d_col * d_col).sqrt()
    }

    pub fn lerp(&self, other: &Position, t: f64) -> Position {
        Position {
            row: self.row + (other.row - self.row) * t,
            col: self.col + (other.col - self.col) * t,
        }
    }

    /// The cell this position currently counts as occupying
    pub fn cell(&self) -> Cell {
        Cell::new(self.row.round() as i32, self.col.round() as i32)
    }
}

/// Movement direction between two orthogonally adjacent cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    /// No movement; treated as a hold
    Stationary,
}

impl Direction {
    /// Direction of travel from `from` to `to`, judged by the sign of the
    /// row delta first and the column delta second.
    pub fn between(from: Cell, to: Cell) -> Direction {
        if to.row < from.row {
            Direction::Up
        } else if to.row > from.row {
            Direction::Down
        } else if to.col < from.col {
            Direction::Left
        } else if to.col > from.col {
            Direction::Right
        } else {
            Direction::Stationary
        }
    }

    /// Parse the single-letter rule file code (`U`, `D`, `L`, `R`, `S`)
    pub fn from_code(code: &str) -> Option<Direction> {
        match code.trim().to_ascii_uppercase().as_str() {
            "U" => Some(Direction::Up),
            "D" => Some(Direction::Down),
            "L" => Some(Direction::Left),
            "R" => Some(Direction::Right),
            "S" => Some(Direction::Stationary),
            _ => None,
        }
    }

    pub fn code(&self) -> char {
        match self {
            Direction::Up => 'U',
            Direction::Down => 'D',
            Direction::Left => 'L',
            Direction::Right => 'R',
            Direction::Stationary => 'S',
        }
    }
}

/// Kind of a grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    Road,
    Roundabout,
    Building,
    Empty,
}

impl CellKind {
    /// Decode a road map character. Both the ASCII and the block-glyph map
    /// alphabets are accepted.
    pub fn from_char(c: char) -> CellKind {
        match c {
            'R' | '▧' => CellKind::Road,
            'C' | '▩' => CellKind::Roundabout,
            'B' | '▣' => CellKind::Building,
            _ => CellKind::Empty,
        }
    }

    pub fn is_traversable(&self) -> bool {
        matches!(self, CellKind::Road | CellKind::Roundabout)
    }

    pub fn glyph(&self) -> char {
        match self {
            CellKind::Road => '.',
            CellKind::Roundabout => 'o',
            CellKind::Building => '#',
            CellKind::Empty => ' ',
        }
    }
}

/// Whether the lane-change rule is enforced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LaneChangePolicy {
    /// The lane-change table is loaded and reported but never blocks a move.
    #[default]
    Ignore,
    /// Hold when the entry cell forbids lane changes and the vehicle's lane
    /// does not exist there.
    Strict,
}

/// Tunable simulation parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimConfig {
    pub tick_secs: f64,
    pub meters_per_cell: f64,
    pub lane_change_policy: LaneChangePolicy,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_secs: DEFAULT_TICK_SECS,
            meters_per_cell: METERS_PER_CELL,
            lane_change_policy: LaneChangePolicy::Ignore,
        }
    }
}
