//! Text rule file loading
//!
//! All rule files share one shape: one relationship per line, comma
//! separated, with `#` comments and blank lines ignored. Loading is
//! tolerant. A missing file gives an empty table, a malformed line is
//! skipped, and neither stops the simulation from starting.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::grid::GridModel;
use super::rules::RuleSet;
use super::signal::{SignalPhase, SignalScheduler};
use super::types::{Cell, CellKind, Direction, VehicleId};
use super::vehicle::Vehicle;

/// Locations of every scenario input file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioPaths {
    pub road_map: PathBuf,
    pub capacity: PathBuf,
    pub lane_count: PathBuf,
    pub lane_change: PathBuf,
    pub turn_rules: PathBuf,
    pub speed_limits: PathBuf,
    pub closed_cells: PathBuf,
    pub stop_lines: PathBuf,
    pub signal_patterns: PathBuf,
    pub vehicles: PathBuf,
}

impl ScenarioPaths {
    /// The conventional file names inside one scenario directory
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            road_map: dir.join("road_map.txt"),
            capacity: dir.join("capacity_map.txt"),
            lane_count: dir.join("lane_count_map.txt"),
            lane_change: dir.join("lane_change_map.txt"),
            turn_rules: dir.join("turn_map.txt"),
            speed_limits: dir.join("speed_limit_map.txt"),
            closed_cells: dir.join("closed_cells.txt"),
            stop_lines: dir.join("stop_line.txt"),
            signal_patterns: dir.join("signal_patterns.txt"),
            vehicles: dir.join("vehicle_data.txt"),
        }
    }
}

/// Read an optional rule file. `Ok(None)` means the file does not exist.
fn read_optional(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(Some(text))
}

/// Read a rule file, degrading to empty text when it is missing or unreadable
fn read_or_empty(path: &Path, what: &str) -> String {
    match read_optional(path) {
        Ok(Some(text)) => text,
        Ok(None) => {
            info!("{} file not found: {}, using defaults", what, path.display());
            String::new()
        }
        Err(err) => {
            warn!("{:#}; using defaults for {}", err, what);
            String::new()
        }
    }
}

/// Non-comment, non-blank lines with their 1-based line numbers
fn rule_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}

fn fields(line: &str) -> Vec<&str> {
    line.split(',').map(str::trim).collect()
}

fn parse_field<T: FromStr>(fields: &[&str], idx: usize) -> Option<T> {
    fields.get(idx)?.parse().ok()
}

fn parse_cell(fields: &[&str]) -> Option<Cell> {
    Some(Cell::new(parse_field(fields, 0)?, parse_field(fields, 1)?))
}

fn skip(what: &str, line_no: usize, line: &str) {
    debug!("Skipping malformed {} line {}: {:?}", what, line_no, line);
}

/// Decode road map text into row-major cell kinds. The file is written top
/// row first, so the last map line becomes row 0.
pub fn parse_road_map(text: &str) -> Vec<Vec<CellKind>> {
    let mut rows: Vec<Vec<CellKind>> = text
        .lines()
        .map(|line| line.trim_end())
        .filter(|line| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
        .map(|line| line.chars().map(CellKind::from_char).collect())
        .collect();
    rows.reverse();
    rows
}

/// `row, col, value` lines
pub fn parse_cell_values<T: FromStr>(text: &str, what: &str) -> Vec<(Cell, T)> {
    rule_lines(text)
        .filter_map(|(line_no, line)| {
            let f = fields(line);
            let parsed = parse_cell(&f).zip(parse_field::<T>(&f, 2));
            if parsed.is_none() {
                skip(what, line_no, line);
            }
            parsed
        })
        .collect()
}

/// `row, col` lines
pub fn parse_cell_set(text: &str, what: &str) -> Vec<Cell> {
    rule_lines(text)
        .filter_map(|(line_no, line)| {
            let cell = parse_cell(&fields(line));
            if cell.is_none() {
                skip(what, line_no, line);
            }
            cell
        })
        .collect()
}

/// `row, col, allow(0|1)` lines
pub fn parse_lane_change(text: &str) -> Vec<(Cell, bool)> {
    parse_cell_values::<i64>(text, "lane change")
        .into_iter()
        .map(|(cell, allow)| (cell, allow != 0))
        .collect()
}

/// `row, col, direction, lane[, lane...]` lines
pub fn parse_turn_rules(text: &str) -> Vec<(Cell, Direction, Vec<u32>)> {
    rule_lines(text)
        .filter_map(|(line_no, line)| {
            let f = fields(line);
            let parsed = (|| {
                if f.len() < 4 {
                    return None;
                }
                let cell = parse_cell(&f)?;
                let direction = Direction::from_code(f[2])?;
                let lanes = f[3..]
                    .iter()
                    .filter(|lane| !lane.is_empty())
                    .map(|lane| lane.parse::<u32>().ok())
                    .collect::<Option<Vec<u32>>>()?;
                Some((cell, direction, lanes))
            })();
            if parsed.is_none() {
                skip("turn rule", line_no, line);
            }
            parsed
        })
        .collect()
}

/// `row, col, lane, limit` lines
pub fn parse_speed_limits(text: &str) -> Vec<(Cell, u32, f64)> {
    rule_lines(text)
        .filter_map(|(line_no, line)| {
            let f = fields(line);
            let parsed = (|| {
                let cell = parse_cell(&f)?;
                let lane = parse_field::<u32>(&f, 2)?;
                let limit = parse_field::<f64>(&f, 3).filter(|limit| limit.is_finite())?;
                Some((cell, lane, limit))
            })();
            if parsed.is_none() {
                skip("speed limit", line_no, line);
            }
            parsed
        })
        .collect()
}

/// `row, col, phase-string, duration` lines. Consecutive lines for the same
/// coordinate append phases to its cycle in file order.
pub fn parse_signal_patterns(text: &str) -> BTreeMap<Cell, Vec<SignalPhase>> {
    let mut patterns: BTreeMap<Cell, Vec<SignalPhase>> = BTreeMap::new();

    for (line_no, line) in rule_lines(text) {
        let f = fields(line);
        let parsed = (|| {
            if f.len() < 4 {
                return None;
            }
            let cell = parse_cell(&f)?;
            let duration = parse_field::<u32>(&f, 3)?;
            Some((cell, SignalPhase::parse(f[2], duration)))
        })();

        match parsed {
            Some((cell, phase)) => patterns.entry(cell).or_default().push(phase),
            None => skip("signal pattern", line_no, line),
        }
    }

    patterns
}

/// `row, col, direction, speed, target_row, target_col, lane` lines.
/// Vehicles are numbered in the order they appear.
pub fn parse_vehicle_roster(text: &str) -> Vec<Vehicle> {
    let mut vehicles = Vec::new();

    for (line_no, line) in rule_lines(text) {
        let f = fields(line);
        let parsed = (|| {
            if f.len() < 7 {
                return None;
            }
            let origin = parse_cell(&f)?;
            let heading = Direction::from_code(f[2]);
            let speed_kmh = parse_field::<f64>(&f, 3).filter(|speed| speed.is_finite())?;
            let target = Cell::new(parse_field(&f, 4)?, parse_field(&f, 5)?);
            let lane = parse_field::<u32>(&f, 6)?;
            Some((origin, heading, speed_kmh, target, lane))
        })();

        match parsed {
            Some((origin, heading, speed_kmh, target, lane)) => {
                let id = VehicleId(vehicles.len());
                vehicles.push(Vehicle::new(id, origin, target, lane, speed_kmh).with_heading(heading));
            }
            None => skip("vehicle", line_no, line),
        }
    }

    vehicles
}

/// Load every rule overlay. Missing files leave their table at defaults.
pub fn load_rules(paths: &ScenarioPaths) -> RuleSet {
    let mut rules = RuleSet::new();

    for (cell, capacity) in parse_cell_values::<i32>(&read_or_empty(&paths.capacity, "capacity"), "capacity") {
        rules.capacity.insert(cell, capacity);
    }
    for (cell, lanes) in parse_cell_values::<u32>(&read_or_empty(&paths.lane_count, "lane count"), "lane count") {
        rules.lane_count.insert(cell, lanes);
    }
    for (cell, allow) in parse_lane_change(&read_or_empty(&paths.lane_change, "lane change")) {
        rules.lane_change_allowed.insert(cell, allow);
    }
    for (cell, direction, lanes) in parse_turn_rules(&read_or_empty(&paths.turn_rules, "turn rule")) {
        rules.allow_turn(cell, direction, lanes);
    }
    for (cell, lane, limit) in parse_speed_limits(&read_or_empty(&paths.speed_limits, "speed limit")) {
        rules.set_speed_limit(cell, lane, limit);
    }
    rules
        .closed_cells
        .extend(parse_cell_set(&read_or_empty(&paths.closed_cells, "closed cells"), "closed cell"));
    rules
        .stop_lines
        .extend(parse_cell_set(&read_or_empty(&paths.stop_lines, "stop line"), "stop line"));

    rules
}

/// Load the road map and its rule overlays. A missing road map yields an
/// empty 0x0 grid.
pub fn load_grid(paths: &ScenarioPaths) -> GridModel {
    let cells = match read_optional(&paths.road_map) {
        Ok(Some(text)) => parse_road_map(&text),
        Ok(None) => {
            warn!("Road map file not found: {}. Using empty map.", paths.road_map.display());
            Vec::new()
        }
        Err(err) => {
            warn!("{:#}. Using empty map.", err);
            Vec::new()
        }
    };

    let grid = GridModel::new(cells, load_rules(paths));
    info!("Loaded {}x{} grid", grid.rows(), grid.cols());
    grid
}

pub fn load_signals(paths: &ScenarioPaths) -> SignalScheduler {
    let text = read_or_empty(&paths.signal_patterns, "signal patterns");
    SignalScheduler::new(parse_signal_patterns(&text))
}

/// Load the vehicle roster. `None` means there is no roster file at all, as
/// opposed to a roster that parsed to zero vehicles.
pub fn load_roster(paths: &ScenarioPaths) -> Option<Vec<Vehicle>> {
    match read_optional(&paths.vehicles) {
        Ok(Some(text)) => Some(parse_vehicle_roster(&text)),
        Ok(None) => {
            info!("Vehicle data file not found: {}", paths.vehicles.display());
            None
        }
        Err(err) => {
            warn!("{:#}", err);
            None
        }
    }
}
