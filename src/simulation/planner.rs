//! Route planning over the road grid
//!
//! Vehicles call the planner through the [`PathPlanner`] trait, so a
//! memoising or incremental planner can replace the breadth-first search
//! without touching the movement gates.

use std::collections::{HashMap, VecDeque};

use super::grid::GridModel;
use super::types::Cell;

/// Produces a route between two cells
pub trait PathPlanner {
    /// Ordered cells from `start` to `goal`, both included. Empty when either
    /// endpoint cannot be routed through or no route exists.
    fn find_path(&self, grid: &GridModel, start: Cell, goal: Cell) -> Vec<Cell>;
}

/// Unweighted shortest path by breadth-first search.
///
/// Neighbours expand Up, Down, Left, Right, which fixes the tie-break between
/// equally short routes. Closed cells are not part of the road graph and so
/// are never routed through.
#[derive(Debug, Clone, Copy, Default)]
pub struct BfsPlanner;

impl PathPlanner for BfsPlanner {
    fn find_path(&self, grid: &GridModel, start: Cell, goal: Cell) -> Vec<Cell> {
        if !grid.is_routable(start) || !grid.is_routable(goal) {
            return Vec::new();
        }
        if start == goal {
            return vec![start];
        }

        let mut came_from: HashMap<Cell, Cell> = HashMap::new();
        let mut queue = VecDeque::from([start]);
        came_from.insert(start, start);

        while let Some(current) = queue.pop_front() {
            if current == goal {
                return rebuild_path(&came_from, start, goal);
            }
            for next in grid.road_neighbors(current) {
                if came_from.contains_key(&next) {
                    continue;
                }
                came_from.insert(next, current);
                queue.push_back(next);
            }
        }

        Vec::new()
    }
}

fn rebuild_path(came_from: &HashMap<Cell, Cell>, start: Cell, goal: Cell) -> Vec<Cell> {
    let mut path = vec![goal];
    let mut current = goal;
    while current != start {
        match came_from.get(&current) {
            Some(previous) => {
                current = *previous;
                path.push(current);
            }
            None => return Vec::new(),
        }
    }
    path.reverse();
    path
}
