//! Grid traffic simulation core
//!
//! This module contains the rule-constrained grid traffic engine: the static
//! grid and its rule tables, the signal scheduler, route planning, vehicle
//! movement and the engine that drives them tick by tick. None of it depends
//! on a renderer, so it can be driven headless and tested directly.

mod grid;
mod loader;
mod planner;
mod roster;
mod rules;
mod signal;
mod stats;
mod types;
mod vehicle;
mod world;

pub use grid::GridModel;
pub use loader::{
    load_grid, load_roster, load_rules, load_signals, parse_cell_set, parse_cell_values,
    parse_lane_change, parse_road_map, parse_signal_patterns, parse_speed_limits,
    parse_turn_rules, parse_vehicle_roster, ScenarioPaths,
};
pub use planner::{BfsPlanner, PathPlanner};
pub use roster::{random_roster, RANDOM_SPEED_KMH};
pub use rules::{
    RuleSet, SparseTable, DEFAULT_CAPACITY, DEFAULT_LANE_CHANGE_ALLOWED, DEFAULT_LANE_COUNT,
};
pub use signal::{
    SignalColor, SignalPhase, SignalScheduler, SignalSnapshot, GENERAL_TOKEN, LEFT_TURN_TOKEN,
};
pub use stats::{LiveStats, SimulationResult};
pub use types::{
    Cell, CellKind, Direction, LaneChangePolicy, Position, SimConfig, VehicleId,
    DEFAULT_TICK_SECS, METERS_PER_CELL, MS_TO_KMH,
};
pub use vehicle::{Hold, Occupancy, TickContext, Vehicle, VehicleState, VehicleUpdate};
pub use world::{RenderState, SimEngine, TickSummary, VehicleView};
