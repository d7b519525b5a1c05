//! Static grid layout and rule overlays
//!
//! The grid never changes after construction. Traversable, non-closed cells
//! are also kept in a petgraph adjacency map so the planner can walk roads
//! without re-deriving neighbours from the cell matrix.

use log::debug;
use petgraph::graphmap::DiGraphMap;
use std::collections::BTreeMap;

use super::loader::parse_road_map;
use super::rules::RuleSet;
use super::types::{Cell, CellKind};

/// Immutable road layout plus its rule tables
#[derive(Debug, Clone)]
pub struct GridModel {
    /// Row-major cell kinds, every row padded to `cols`
    cells: Vec<Vec<CellKind>>,

    rows: i32,

    cols: i32,

    rules: RuleSet,

    /// Directed adjacency between open road cells. Out-edges of each cell
    /// are inserted Up, Down, Left, Right so neighbour iteration follows
    /// that order.
    road_graph: DiGraphMap<Cell, ()>,
}

impl Default for GridModel {
    fn default() -> Self {
        Self::new(Vec::new(), RuleSet::default())
    }
}

impl GridModel {
    /// Build a grid from row-major cell kinds (row 0 first). Ragged rows are
    /// padded with `CellKind::Empty`.
    pub fn new(mut cells: Vec<Vec<CellKind>>, rules: RuleSet) -> Self {
        let cols = cells.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut cells {
            row.resize(cols, CellKind::Empty);
        }

        let mut grid = Self {
            rows: cells.len() as i32,
            cols: cols as i32,
            cells,
            rules,
            road_graph: DiGraphMap::new(),
        };
        grid.rebuild_road_graph();
        grid
    }

    /// Build a grid from road map text (bottom line = row 0)
    pub fn from_map_text(text: &str, rules: RuleSet) -> Self {
        Self::new(parse_road_map(text), rules)
    }

    fn rebuild_road_graph(&mut self) {
        let mut graph = DiGraphMap::new();

        for cell in self.open_road_cells() {
            graph.add_node(cell);
        }

        for cell in self.open_road_cells() {
            for neighbor in cell.neighbors() {
                if self.is_open_road(neighbor) {
                    graph.add_edge(cell, neighbor, ());
                }
            }
        }

        debug!(
            "Road graph built: {} open cells, {} links",
            graph.node_count(),
            graph.edge_count()
        );
        self.road_graph = graph;
    }

    fn open_road_cells(&self) -> Vec<Cell> {
        self.all_cells()
            .filter(|cell| self.is_open_road(*cell))
            .collect()
    }

    fn is_open_road(&self, cell: Cell) -> bool {
        self.is_traversable(cell) && !self.rules.is_closed(cell)
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    pub fn cols(&self) -> i32 {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.row >= 0 && cell.row < self.rows && cell.col >= 0 && cell.col < self.cols
    }

    /// Kind of a cell; anything off the grid reads as empty
    pub fn kind(&self, cell: Cell) -> CellKind {
        if !self.in_bounds(cell) {
            return CellKind::Empty;
        }
        self.cells[cell.row as usize][cell.col as usize]
    }

    pub fn is_traversable(&self, cell: Cell) -> bool {
        self.kind(cell).is_traversable()
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Open road neighbours of `cell` in Up, Down, Left, Right order
    pub fn road_neighbors(&self, cell: Cell) -> impl Iterator<Item = Cell> + '_ {
        self.road_graph.neighbors(cell)
    }

    /// Whether the cell takes part in routing (traversable and not closed)
    pub fn is_routable(&self, cell: Cell) -> bool {
        self.road_graph.contains_node(cell)
    }

    /// Every coordinate in row-major order
    pub fn all_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.cols).map(move |col| Cell::new(row, col)))
    }

    pub fn traversable_cells(&self) -> Vec<Cell> {
        self.all_cells()
            .filter(|cell| self.is_traversable(*cell))
            .collect()
    }

    /// Mean occupancy / capacity ratio over occupied cells.
    ///
    /// `occupied` yields the current cell of every vehicle still on the road.
    /// Cells whose capacity is zero or negative are left out of the mean; with
    /// nothing occupied the result is 0.
    pub fn congestion(&self, occupied: impl IntoIterator<Item = Cell>) -> f64 {
        let mut counts: BTreeMap<Cell, u32> = BTreeMap::new();
        for cell in occupied {
            *counts.entry(cell).or_default() += 1;
        }

        let ratios: Vec<f64> = counts
            .iter()
            .filter_map(|(cell, count)| {
                let capacity = self.rules.capacity(*cell);
                (capacity > 0).then(|| *count as f64 / capacity as f64)
            })
            .collect();

        if ratios.is_empty() {
            0.0
        } else {
            ratios.iter().sum::<f64>() / ratios.len() as f64
        }
    }
}
