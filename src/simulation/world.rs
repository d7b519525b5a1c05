//! Main simulation engine that ties everything together
//!
//! The engine owns the grid, the signal scheduler and the vehicles, and is
//! the only thing that mutates vehicles. Vehicles are updated one at a time
//! in roster order every tick.

use log::{info, warn};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::grid::GridModel;
use super::loader::{self, ScenarioPaths};
use super::planner::{BfsPlanner, PathPlanner};
use super::roster::random_roster;
use super::signal::{SignalColor, SignalScheduler};
use super::stats::{LiveStats, SimulationResult};
use super::types::{Cell, Position, SimConfig, VehicleId};
use super::vehicle::{Occupancy, TickContext, Vehicle, VehicleUpdate};

/// Outcome counts of a single tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickSummary {
    pub moved: usize,
    pub held: usize,
    pub arrived: usize,
}

/// A vehicle as seen by a renderer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleView {
    pub id: VehicleId,
    pub position: Position,
    pub lane: u32,
    pub arrived: bool,
}

/// Everything needed to draw one frame
#[derive(Debug, Clone)]
pub struct RenderState<'a> {
    pub grid: &'a GridModel,
    /// Display projection of signal colours (3x3 block per signal)
    pub signal_colors: BTreeMap<Cell, SignalColor>,
    pub vehicles: Vec<VehicleView>,
}

/// The simulation engine
pub struct SimEngine {
    grid: GridModel,

    signals: SignalScheduler,

    planner: Box<dyn PathPlanner>,

    /// Vehicles in roster order; this is also the update order
    vehicles: Vec<Vehicle>,

    config: SimConfig,

    /// Simulated time in seconds
    time: f64,

    ticks: u64,

    /// Set exactly once, by `stop`
    results: Option<Arc<[SimulationResult]>>,
}

impl SimEngine {
    pub fn new(grid: GridModel, signals: SignalScheduler, vehicles: Vec<Vehicle>, config: SimConfig) -> Self {
        Self {
            grid,
            signals,
            planner: Box::new(BfsPlanner),
            vehicles,
            config,
            time: 0.0,
            ticks: 0,
            results: None,
        }
    }

    /// Load a scenario from rule files. With no roster file the engine starts
    /// with no vehicles; add them with `add_vehicle` or `with_random_vehicles`.
    pub fn load(paths: &ScenarioPaths, config: SimConfig) -> Self {
        let grid = loader::load_grid(paths);
        let signals = loader::load_signals(paths);
        let vehicles = loader::load_roster(paths).unwrap_or_default();
        info!(
            "Scenario loaded: {} signals, {} vehicles",
            signals.signal_cells().count(),
            vehicles.len()
        );
        Self::new(grid, signals, vehicles, config)
    }

    /// Replace the planner used for every vehicle
    pub fn with_planner(mut self, planner: Box<dyn PathPlanner>) -> Self {
        self.planner = planner;
        self
    }

    /// Append `count` seeded random vehicles
    pub fn with_random_vehicles(mut self, count: usize, seed: u64) -> Self {
        for vehicle in random_roster(&self.grid, count, seed) {
            let (origin, target, lane, speed) =
                (vehicle.origin(), vehicle.target(), vehicle.lane(), vehicle.speed_kmh());
            self.add_vehicle(origin, target, lane, speed);
        }
        self
    }

    /// Add a vehicle to the end of the update order
    pub fn add_vehicle(&mut self, origin: Cell, target: Cell, lane: u32, speed_kmh: f64) -> VehicleId {
        let id = VehicleId(self.vehicles.len());
        self.vehicles.push(Vehicle::new(id, origin, target, lane, speed_kmh));
        id
    }

    pub fn grid(&self) -> &GridModel {
        &self.grid
    }

    pub fn signals(&self) -> &SignalScheduler {
        &self.signals
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn vehicle(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.iter().find(|vehicle| vehicle.id() == id)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    pub fn is_stopped(&self) -> bool {
        self.results.is_some()
    }

    pub fn all_arrived(&self) -> bool {
        !self.vehicles.is_empty() && self.vehicles.iter().all(Vehicle::is_arrived)
    }

    /// Advance the simulation by one tick. Does nothing once stopped.
    pub fn tick(&mut self) -> TickSummary {
        let mut summary = TickSummary::default();
        if self.is_stopped() {
            return summary;
        }

        let now = self.time;
        let snapshot = self.signals.snapshot(now);
        let ctx = TickContext {
            grid: &self.grid,
            signals: &snapshot,
            planner: self.planner.as_ref(),
            config: &self.config,
        };
        let mut occupancy = Occupancy::from_vehicles(&self.vehicles);

        for (index, vehicle) in self.vehicles.iter_mut().enumerate() {
            if vehicle.is_arrived() {
                continue;
            }
            match vehicle.update(now, &ctx, &occupancy) {
                VehicleUpdate::Moved => summary.moved += 1,
                VehicleUpdate::Held(_) => summary.held += 1,
                VehicleUpdate::Arrived => summary.arrived += 1,
                VehicleUpdate::Finished => {}
            }
            occupancy.refresh(index, vehicle);
        }

        self.ticks += 1;
        self.time = self.ticks as f64 * self.config.tick_secs;

        if self.all_arrived() {
            info!("All {} vehicles arrived after {:.2}s", self.vehicles.len(), self.time);
            self.stop();
        }

        summary
    }

    /// Run up to `max_ticks` ticks, stopping early once the engine stops.
    /// Returns the number of ticks actually run.
    pub fn run(&mut self, max_ticks: u64) -> u64 {
        let mut ran = 0;
        while ran < max_ticks && !self.is_stopped() {
            self.tick();
            ran += 1;
        }
        ran
    }

    /// Freeze the result snapshot. Later calls are no-ops.
    pub fn stop(&mut self) {
        if self.is_stopped() {
            return;
        }

        let results: Arc<[SimulationResult]> = self
            .vehicles
            .iter()
            .map(SimulationResult::from_vehicle)
            .collect();

        let stalled = results.iter().filter(|result| !result.arrived()).count();
        if stalled > 0 {
            warn!("{} of {} vehicles never reached their target", stalled, results.len());
        }
        info!("Simulation stopped at {:.2}s after {} ticks", self.time, self.ticks);

        self.results = Some(results);
    }

    /// The frozen result snapshot, available after `stop`
    pub fn results(&self) -> Option<Arc<[SimulationResult]>> {
        self.results.clone()
    }

    /// Mean occupancy / capacity ratio over cells holding a vehicle
    pub fn congestion(&self) -> f64 {
        self.grid
            .congestion(self.vehicles.iter().filter_map(Vehicle::occupied_cell))
    }

    pub fn live_stats(&self) -> LiveStats {
        LiveStats::collect(&self.vehicles, self.congestion())
    }

    pub fn render_state(&self) -> RenderState<'_> {
        RenderState {
            grid: &self.grid,
            signal_colors: self.signals.render_projection(self.time),
            vehicles: self
                .vehicles
                .iter()
                .map(|vehicle| VehicleView {
                    id: vehicle.id(),
                    position: vehicle.position(),
                    lane: vehicle.lane(),
                    arrived: vehicle.is_arrived(),
                })
                .collect(),
        }
    }

    /// Draw the grid as text, top row first. Vehicles show as `v` (or `*`
    /// once arrived), closed cells as `x`, signal cells as their colour
    /// initial.
    pub fn draw_map(&self) -> String {
        let mut canvas: Vec<Vec<char>> = (0..self.grid.rows())
            .map(|row| {
                (0..self.grid.cols())
                    .map(|col| {
                        let cell = Cell::new(row, col);
                        if self.grid.rules().is_closed(cell) {
                            'x'
                        } else {
                            self.grid.kind(cell).glyph()
                        }
                    })
                    .collect()
            })
            .collect();

        let mut put = |cell: Cell, glyph: char| {
            if self.grid.in_bounds(cell) {
                canvas[cell.row as usize][cell.col as usize] = glyph;
            }
        };

        for cell in self.signals.signal_cells() {
            let glyph = match self.signals.active_state(cell, self.time) {
                Some(SignalColor::Red) => 'r',
                Some(SignalColor::Yellow) => 'y',
                Some(SignalColor::Green) => 'g',
                None => continue,
            };
            put(cell, glyph);
        }
        for vehicle in &self.vehicles {
            put(vehicle.current_cell(), if vehicle.is_arrived() { '*' } else { 'v' });
        }

        canvas
            .iter()
            .rev()
            .map(|row| row.iter().collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
