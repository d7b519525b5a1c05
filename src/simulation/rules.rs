//! Per-cell rule tables
//!
//! Every table is a sparse map plus one documented default. Lookups never
//! fail: an absent key reads as the default.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::hash::Hash;

use super::types::{Cell, Direction};

/// Default vehicle capacity of a cell (congestion reporting only)
pub const DEFAULT_CAPACITY: i32 = 1;

/// Default number of lanes in a cell
pub const DEFAULT_LANE_COUNT: u32 = 1;

/// Lane changes are allowed unless a cell says otherwise
pub const DEFAULT_LANE_CHANGE_ALLOWED: bool = true;

/// A sparse key -> value table with a fallback for absent keys
#[derive(Debug, Clone)]
pub struct SparseTable<K, V> {
    entries: HashMap<K, V>,
    fallback: V,
}

impl<K: Eq + Hash, V: Copy> SparseTable<K, V> {
    pub fn new(fallback: V) -> Self {
        Self {
            entries: HashMap::new(),
            fallback,
        }
    }

    pub fn get(&self, key: &K) -> V {
        self.entries.get(key).copied().unwrap_or(self.fallback)
    }

    /// Later entries for the same key replace earlier ones
    pub fn insert(&mut self, key: K, value: V) {
        self.entries.insert(key, value);
    }

    pub fn fallback(&self) -> V {
        self.fallback
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// All rule overlays attached to the grid
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub capacity: SparseTable<Cell, i32>,
    pub lane_count: SparseTable<Cell, u32>,
    pub lane_change_allowed: SparseTable<Cell, bool>,
    /// cell -> direction -> lanes permitted to make that move into the cell
    pub turn_rules: HashMap<Cell, HashMap<Direction, BTreeSet<u32>>>,
    /// (cell, lane) -> speed limit in km/h
    pub speed_limits: HashMap<(Cell, u32), f64>,
    pub closed_cells: HashSet<Cell>,
    pub stop_lines: HashSet<Cell>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            capacity: SparseTable::new(DEFAULT_CAPACITY),
            lane_count: SparseTable::new(DEFAULT_LANE_COUNT),
            lane_change_allowed: SparseTable::new(DEFAULT_LANE_CHANGE_ALLOWED),
            turn_rules: HashMap::new(),
            speed_limits: HashMap::new(),
            closed_cells: HashSet::new(),
            stop_lines: HashSet::new(),
        }
    }
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capacity(&self, cell: Cell) -> i32 {
        self.capacity.get(&cell)
    }

    pub fn lane_count(&self, cell: Cell) -> u32 {
        self.lane_count.get(&cell)
    }

    pub fn lane_change_allowed(&self, cell: Cell) -> bool {
        self.lane_change_allowed.get(&cell)
    }

    /// Add lanes to the set permitted to enter `cell` moving `direction`.
    /// Repeated lines for the same cell and direction accumulate.
    pub fn allow_turn(&mut self, cell: Cell, direction: Direction, lanes: impl IntoIterator<Item = u32>) {
        self.turn_rules
            .entry(cell)
            .or_default()
            .entry(direction)
            .or_default()
            .extend(lanes);
    }

    /// Whether `lane` may enter `cell` moving `direction`.
    /// With no rule for that direction, the vehicle's own lane is the
    /// permitted set, so the move is unrestricted.
    pub fn turn_allowed(&self, cell: Cell, direction: Direction, lane: u32) -> bool {
        match self.turn_rules.get(&cell).and_then(|by_dir| by_dir.get(&direction)) {
            Some(lanes) => lanes.contains(&lane),
            None => true,
        }
    }

    pub fn set_speed_limit(&mut self, cell: Cell, lane: u32, limit_kmh: f64) {
        self.speed_limits.insert((cell, lane), limit_kmh);
    }

    /// Speed limit for a lane of a cell, defaulting to the vehicle's own
    /// desired speed
    pub fn speed_limit(&self, cell: Cell, lane: u32, own_speed_kmh: f64) -> f64 {
        self.speed_limits
            .get(&(cell, lane))
            .copied()
            .unwrap_or(own_speed_kmh)
    }

    pub fn is_closed(&self, cell: Cell) -> bool {
        self.closed_cells.contains(&cell)
    }

    pub fn is_stop_line(&self, cell: Cell) -> bool {
        self.stop_lines.contains(&cell)
    }
}
