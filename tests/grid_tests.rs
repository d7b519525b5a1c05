//! Grid layout, rule table and loader tests

use std::fs;

use grid_traffic_sim::simulation::{
    load_grid, load_rules, parse_cell_values, parse_lane_change, parse_road_map,
    parse_speed_limits, parse_turn_rules, parse_vehicle_roster, Cell, CellKind, Direction,
    GridModel, RuleSet, ScenarioPaths, DEFAULT_CAPACITY, DEFAULT_LANE_COUNT,
};

#[test]
fn test_road_map_reads_bottom_to_top() {
    let grid = GridModel::from_map_text("RB\nCR\n", RuleSet::new());

    assert_eq!(grid.rows(), 2);
    assert_eq!(grid.cols(), 2);
    // Last line of the file is row 0
    assert_eq!(grid.kind(Cell::new(0, 0)), CellKind::Roundabout);
    assert_eq!(grid.kind(Cell::new(0, 1)), CellKind::Road);
    assert_eq!(grid.kind(Cell::new(1, 0)), CellKind::Road);
    assert_eq!(grid.kind(Cell::new(1, 1)), CellKind::Building);
}

#[test]
fn test_ragged_rows_are_padded_with_empty() {
    let grid = GridModel::from_map_text("RRR\nR\n", RuleSet::new());

    assert_eq!(grid.cols(), 3);
    assert_eq!(grid.kind(Cell::new(0, 1)), CellKind::Empty);
    assert_eq!(grid.kind(Cell::new(0, 2)), CellKind::Empty);
    assert!(!grid.is_traversable(Cell::new(0, 2)));
    assert!(grid.is_traversable(Cell::new(1, 2)));
}

#[test]
fn test_comments_and_blank_lines_skipped_in_map() {
    let rows = parse_road_map("# header\n\nRR\n# between\nBB\n");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], vec![CellKind::Building, CellKind::Building]);
    assert_eq!(rows[1], vec![CellKind::Road, CellKind::Road]);
}

#[test]
fn test_block_glyph_alphabet() {
    let grid = GridModel::from_map_text("▧▩▣※", RuleSet::new());

    assert_eq!(grid.kind(Cell::new(0, 0)), CellKind::Road);
    assert_eq!(grid.kind(Cell::new(0, 1)), CellKind::Roundabout);
    assert_eq!(grid.kind(Cell::new(0, 2)), CellKind::Building);
    assert_eq!(grid.kind(Cell::new(0, 3)), CellKind::Empty);
}

#[test]
fn test_traversable_only_road_and_roundabout_in_bounds() {
    let grid = GridModel::from_map_text("RCB.", RuleSet::new());

    assert!(grid.is_traversable(Cell::new(0, 0)));
    assert!(grid.is_traversable(Cell::new(0, 1)));
    assert!(!grid.is_traversable(Cell::new(0, 2)));
    assert!(!grid.is_traversable(Cell::new(0, 3)));
    assert!(!grid.is_traversable(Cell::new(0, 4)));
    assert!(!grid.is_traversable(Cell::new(-1, 0)));
    assert!(!grid.is_traversable(Cell::new(1, 0)));
}

#[test]
fn test_rule_defaults_when_absent() {
    let rules = RuleSet::new();
    let cell = Cell::new(3, 4);

    assert_eq!(rules.capacity(cell), DEFAULT_CAPACITY);
    assert_eq!(rules.lane_count(cell), DEFAULT_LANE_COUNT);
    assert!(rules.lane_change_allowed(cell));
    assert!(rules.turn_allowed(cell, Direction::Left, 7));
    assert_eq!(rules.speed_limit(cell, 0, 42.0), 42.0);
    assert!(!rules.is_closed(cell));
    assert!(!rules.is_stop_line(cell));
}

#[test]
fn test_turn_rule_restricts_only_its_direction() {
    let mut rules = RuleSet::new();
    let cell = Cell::new(1, 1);
    rules.allow_turn(cell, Direction::Left, [1]);
    rules.allow_turn(cell, Direction::Left, [2]);

    assert!(!rules.turn_allowed(cell, Direction::Left, 0));
    assert!(rules.turn_allowed(cell, Direction::Left, 1));
    assert!(rules.turn_allowed(cell, Direction::Left, 2));
    assert!(rules.turn_allowed(cell, Direction::Right, 0));
}

#[test]
fn test_malformed_lines_are_skipped() {
    let text = "1, 2, 3\n# comment\n\nx, 1, 2\n1, 2\n4, 5, 6\n";
    let values = parse_cell_values::<i32>(text, "capacity");

    assert_eq!(values, vec![(Cell::new(1, 2), 3), (Cell::new(4, 5), 6)]);
}

#[test]
fn test_lane_change_and_speed_limit_parsing() {
    let lane_change = parse_lane_change("0, 1, 0\n0, 2, 1\n0, 3, maybe\n");
    assert_eq!(lane_change, vec![(Cell::new(0, 1), false), (Cell::new(0, 2), true)]);

    let limits = parse_speed_limits("2, 3, 0, 30\n2, 3, 1, 50.5\n2, 3, 1\n");
    assert_eq!(
        limits,
        vec![(Cell::new(2, 3), 0, 30.0), (Cell::new(2, 3), 1, 50.5)]
    );
}

#[test]
fn test_turn_rule_parsing() {
    let rules = parse_turn_rules("1, 1, L, 0, 1\n1, 1, Q, 0\n1, 1, R\n2, 2, u, 3\n");

    assert_eq!(
        rules,
        vec![
            (Cell::new(1, 1), Direction::Left, vec![0, 1]),
            (Cell::new(2, 2), Direction::Up, vec![3]),
        ]
    );
}

#[test]
fn test_missing_files_degrade_to_empty_grid() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ScenarioPaths::in_dir(dir.path());

    let grid = load_grid(&paths);
    assert_eq!(grid.rows(), 0);
    assert_eq!(grid.cols(), 0);
    assert!(grid.is_empty());
    assert!(grid.rules().closed_cells.is_empty());
    assert!(grid.rules().capacity.is_empty());
}

#[test]
fn test_rule_files_loaded_from_directory() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("road_map.txt"), "RRR\nRRR\n").unwrap();
    fs::write(dir.path().join("capacity_map.txt"), "0, 0, 4\nbad line\n").unwrap();
    fs::write(dir.path().join("lane_count_map.txt"), "0, 1, 2\n").unwrap();
    fs::write(dir.path().join("lane_change_map.txt"), "1, 1, 0\n").unwrap();
    fs::write(dir.path().join("turn_map.txt"), "1, 2, R, 1\n").unwrap();
    fs::write(dir.path().join("speed_limit_map.txt"), "0, 2, 0, 20\n").unwrap();
    fs::write(dir.path().join("closed_cells.txt"), "# closed\n1, 0\n").unwrap();
    fs::write(dir.path().join("stop_line.txt"), "0, 1\n").unwrap();
    let paths = ScenarioPaths::in_dir(dir.path());

    let rules = load_rules(&paths);
    assert_eq!(rules.capacity(Cell::new(0, 0)), 4);
    assert_eq!(rules.lane_count(Cell::new(0, 1)), 2);
    assert!(!rules.lane_change_allowed(Cell::new(1, 1)));
    assert!(!rules.turn_allowed(Cell::new(1, 2), Direction::Right, 0));
    assert_eq!(rules.speed_limit(Cell::new(0, 2), 0, 60.0), 20.0);
    assert!(rules.is_closed(Cell::new(1, 0)));
    assert!(rules.is_stop_line(Cell::new(0, 1)));

    let grid = load_grid(&paths);
    assert_eq!(grid.rows(), 2);
    assert_eq!(grid.cols(), 3);
    // Closed cells stay traversable in kind but drop out of routing
    assert!(grid.is_traversable(Cell::new(1, 0)));
    assert!(!grid.is_routable(Cell::new(1, 0)));
    assert!(grid.is_routable(Cell::new(0, 0)));
}

#[test]
fn test_road_neighbors_follow_up_down_left_right() {
    let grid = GridModel::from_map_text("RRR\nRRR\nRRR\n", RuleSet::new());
    let neighbors: Vec<Cell> = grid.road_neighbors(Cell::new(1, 1)).collect();

    assert_eq!(
        neighbors,
        vec![
            Cell::new(0, 1),
            Cell::new(2, 1),
            Cell::new(1, 0),
            Cell::new(1, 2),
        ]
    );
}

#[test]
fn test_congestion_is_zero_when_nothing_occupied() {
    let grid = GridModel::from_map_text("RRR", RuleSet::new());
    assert_eq!(grid.congestion(Vec::new()), 0.0);
}

#[test]
fn test_congestion_averages_occupied_cells() {
    let mut rules = RuleSet::new();
    rules.capacity.insert(Cell::new(0, 1), 2);
    rules.capacity.insert(Cell::new(0, 2), 0);
    let grid = GridModel::from_map_text("RRR", rules);

    // (0,0): 2 vehicles / capacity 1, (0,1): 1 vehicle / capacity 2,
    // (0,2) has no capacity and is left out
    let occupied = vec![
        Cell::new(0, 0),
        Cell::new(0, 0),
        Cell::new(0, 1),
        Cell::new(0, 2),
    ];
    let congestion = grid.congestion(occupied);
    assert!((congestion - 1.25).abs() < 1e-9, "congestion was {}", congestion);
}

#[test]
fn test_congestion_zero_when_only_untracked_cells_occupied() {
    let mut rules = RuleSet::new();
    rules.capacity.insert(Cell::new(0, 0), 0);
    let grid = GridModel::from_map_text("RR", rules);

    assert_eq!(grid.congestion(vec![Cell::new(0, 0)]), 0.0);
}

#[test]
fn test_non_finite_speed_limits_skipped() {
    let limits = parse_speed_limits("0, 1, 0, NaN\n0, 2, 0, inf\n0, 3, 0, -infinity\n0, 4, 0, 25\n");
    assert_eq!(limits, vec![(Cell::new(0, 4), 0, 25.0)]);
}

#[test]
fn test_roster_skips_non_finite_speeds() {
    let roster = parse_vehicle_roster(
        "0, 2, R, NaN, 0, 4, 0\n0, 3, R, inf, 0, 4, 0\n0, 1, R, 40, 0, 4, 1\n",
    );

    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0].origin(), Cell::new(0, 1));
    assert_eq!(roster[0].speed_kmh(), 40.0);
    assert_eq!(roster[0].lane(), 1);
    assert_eq!(roster[0].heading(), Some(Direction::Right));
}

#[test]
fn test_neighbors_stop_at_coordinate_range() {
    let corner = Cell::new(i32::MAX, i32::MIN);
    let neighbors: Vec<Cell> = corner.neighbors().collect();

    assert_eq!(
        neighbors,
        vec![Cell::new(i32::MAX - 1, i32::MIN), Cell::new(i32::MAX, i32::MIN + 1)]
    );
    assert_eq!(Cell::new(i32::MIN, 0).manhattan(&Cell::new(i32::MAX, 0)), u32::MAX);
}
