//! Route planning tests

use grid_traffic_sim::simulation::{BfsPlanner, Cell, GridModel, PathPlanner, RuleSet};

fn open_grid(rows: usize, cols: usize) -> GridModel {
    let line = "R".repeat(cols);
    let text = vec![line; rows].join("\n");
    GridModel::from_map_text(&text, RuleSet::new())
}

fn assert_connected(path: &[Cell]) {
    for pair in path.windows(2) {
        assert_eq!(pair[0].manhattan(&pair[1]), 1, "{} -> {} is not a single step", pair[0], pair[1]);
    }
}

#[test]
fn test_shortest_path_on_open_grid() {
    let grid = open_grid(5, 5);
    let path = BfsPlanner.find_path(&grid, Cell::new(0, 0), Cell::new(4, 4));

    assert_eq!(path.len(), 9);
    assert_eq!(path.first(), Some(&Cell::new(0, 0)));
    assert_eq!(path.last(), Some(&Cell::new(4, 4)));
    assert_connected(&path);
}

#[test]
fn test_tie_break_follows_expansion_order() {
    let grid = open_grid(2, 2);
    let path = BfsPlanner.find_path(&grid, Cell::new(0, 0), Cell::new(1, 1));

    // Down is expanded before Right, so the route goes through (1, 0)
    assert_eq!(path, vec![Cell::new(0, 0), Cell::new(1, 0), Cell::new(1, 1)]);
}

#[test]
fn test_repeated_planning_is_identical() {
    let grid = open_grid(6, 7);
    let first = BfsPlanner.find_path(&grid, Cell::new(5, 0), Cell::new(0, 6));
    for _ in 0..5 {
        assert_eq!(BfsPlanner.find_path(&grid, Cell::new(5, 0), Cell::new(0, 6)), first);
    }
}

#[test]
fn test_same_start_and_goal() {
    let grid = open_grid(3, 3);
    assert_eq!(
        BfsPlanner.find_path(&grid, Cell::new(1, 1), Cell::new(1, 1)),
        vec![Cell::new(1, 1)]
    );
}

#[test]
fn test_unreachable_goal_gives_empty_path() {
    let grid = GridModel::from_map_text("RBR\nRBR\nRBR\n", RuleSet::new());
    assert!(BfsPlanner.find_path(&grid, Cell::new(0, 0), Cell::new(0, 2)).is_empty());
}

#[test]
fn test_non_traversable_endpoints_give_empty_path() {
    let grid = GridModel::from_map_text("RRB\n", RuleSet::new());

    assert!(BfsPlanner.find_path(&grid, Cell::new(0, 0), Cell::new(0, 2)).is_empty());
    assert!(BfsPlanner.find_path(&grid, Cell::new(0, 2), Cell::new(0, 0)).is_empty());
    assert!(BfsPlanner.find_path(&grid, Cell::new(0, 0), Cell::new(5, 5)).is_empty());
}

#[test]
fn test_closed_cells_are_routed_around() {
    let mut rules = RuleSet::new();
    rules.closed_cells.insert(Cell::new(1, 1));
    let grid = GridModel::from_map_text("RRR\nRRR\nRRR\n", rules);

    let path = BfsPlanner.find_path(&grid, Cell::new(1, 0), Cell::new(1, 2));
    assert_eq!(path.len(), 5);
    assert!(!path.contains(&Cell::new(1, 1)));
    assert_connected(&path);
}

#[test]
fn test_closed_goal_is_unreachable() {
    let mut rules = RuleSet::new();
    rules.closed_cells.insert(Cell::new(0, 2));
    let grid = GridModel::from_map_text("RRR\n", rules);

    assert!(BfsPlanner.find_path(&grid, Cell::new(0, 0), Cell::new(0, 2)).is_empty());
}

#[test]
fn test_path_uses_roundabout_cells() {
    let grid = GridModel::from_map_text("RCR\n", RuleSet::new());
    assert_eq!(
        BfsPlanner.find_path(&grid, Cell::new(0, 0), Cell::new(0, 2)),
        vec![Cell::new(0, 0), Cell::new(0, 1), Cell::new(0, 2)]
    );
}
