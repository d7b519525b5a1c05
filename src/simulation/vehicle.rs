//! Vehicle movement logic for the grid simulation
//!
//! Each tick a vehicle re-derives its route, runs the movement gates in a
//! fixed order and, if every gate passes, advances continuously toward the
//! next cell. A failed gate is a hold: nothing changes and the same checks
//! run again next tick.

use log::{debug, trace};

use super::grid::GridModel;
use super::planner::PathPlanner;
use super::signal::{SignalColor, SignalSnapshot};
use super::types::{Cell, Direction, LaneChangePolicy, Position, SimConfig, VehicleId, MS_TO_KMH};

/// Distance under which a position counts as sitting on a cell centre
const ARRIVAL_EPSILON: f64 = 1e-9;

/// Lifecycle of a vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleState {
    /// Not yet processed by any tick
    Unstarted,
    EnRoute,
    /// Terminal; the vehicle never changes again
    Arrived,
}

/// Why a vehicle did not move this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hold {
    /// The vehicle is standing on a closed cell
    ClosedCell,
    /// No route to the target from the current cell
    NoRoute,
    /// The next cell is the current cell
    Stationary,
    /// Entry cell forbids the lane change the vehicle would need
    LaneChange,
    /// Vehicle's lane may not make this move into the entry cell
    TurnLane,
    /// Left turn without a protected phase while the signal is red
    UnprotectedLeft,
    /// Entry cell is a stop line and its signal is red
    StopLineRed,
    /// Another vehicle is in the entry cell
    Occupied,
    /// Effective speed is zero, negative or not finite
    ZeroSpeed,
}

/// Result of a vehicle update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleUpdate {
    Moved,
    Held(Hold),
    /// Reached the target during this update
    Arrived,
    /// Already arrived earlier; nothing was done
    Finished,
}

/// Everything a vehicle may read during a tick
pub struct TickContext<'a> {
    pub grid: &'a GridModel,
    pub signals: &'a SignalSnapshot<'a>,
    pub planner: &'a dyn PathPlanner,
    pub config: &'a SimConfig,
}

/// Current cells of every vehicle still on the road, in engine order.
///
/// The engine owns this view and refreshes a vehicle's entry right after
/// updating it, so vehicles updated later in a tick see earlier ones at
/// their new cells.
#[derive(Debug, Clone, Default)]
pub struct Occupancy {
    entries: Vec<(VehicleId, Option<Cell>)>,
}

impl Occupancy {
    pub fn from_vehicles(vehicles: &[Vehicle]) -> Self {
        Self {
            entries: vehicles
                .iter()
                .map(|vehicle| (vehicle.id(), vehicle.occupied_cell()))
                .collect(),
        }
    }

    /// Refresh the entry at `index` from the vehicle's current state
    pub fn refresh(&mut self, index: usize, vehicle: &Vehicle) {
        if let Some(entry) = self.entries.get_mut(index) {
            *entry = (vehicle.id(), vehicle.occupied_cell());
        }
    }

    /// Whether a vehicle other than `me` is on `cell`
    pub fn is_taken_by_other(&self, cell: Cell, me: VehicleId) -> bool {
        self.entries
            .iter()
            .any(|(id, occupied)| *id != me && *occupied == Some(cell))
    }

    pub fn occupied_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.entries.iter().filter_map(|(_, cell)| *cell)
    }
}

/// A vehicle travelling from an origin cell to a target cell
#[derive(Debug, Clone)]
pub struct Vehicle {
    id: VehicleId,
    origin: Cell,
    target: Cell,
    lane: u32,
    /// Desired speed in km/h
    speed_kmh: f64,
    /// Initial heading from the roster, informational only
    heading: Option<Direction>,
    position: Position,
    /// Planned route; when non-empty its head is the current cell
    path: Vec<Cell>,
    /// Cells actually passed through, in order, origin first
    route: Vec<Cell>,
    /// Road cells the vehicle has left, in first-visit order
    visited_roads: Vec<Cell>,
    state: VehicleState,
    depart_time: Option<f64>,
    arrive_time: Option<f64>,
    distance_m: f64,
}

impl Vehicle {
    pub fn new(id: VehicleId, origin: Cell, target: Cell, lane: u32, speed_kmh: f64) -> Self {
        Self {
            id,
            origin,
            target,
            lane,
            speed_kmh,
            heading: None,
            position: origin.center(),
            path: Vec::new(),
            route: vec![origin],
            visited_roads: Vec::new(),
            state: VehicleState::Unstarted,
            depart_time: None,
            arrive_time: None,
            distance_m: 0.0,
        }
    }

    pub fn with_heading(mut self, heading: Option<Direction>) -> Self {
        self.heading = heading;
        self
    }

    pub fn id(&self) -> VehicleId {
        self.id
    }

    pub fn origin(&self) -> Cell {
        self.origin
    }

    pub fn target(&self) -> Cell {
        self.target
    }

    pub fn lane(&self) -> u32 {
        self.lane
    }

    pub fn speed_kmh(&self) -> f64 {
        self.speed_kmh
    }

    pub fn heading(&self) -> Option<Direction> {
        self.heading
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn current_cell(&self) -> Cell {
        self.position.cell()
    }

    /// The cell this vehicle blocks, `None` once it has arrived
    pub fn occupied_cell(&self) -> Option<Cell> {
        (!self.is_arrived()).then(|| self.current_cell())
    }

    pub fn state(&self) -> VehicleState {
        self.state
    }

    pub fn is_arrived(&self) -> bool {
        self.state == VehicleState::Arrived
    }

    pub fn path(&self) -> &[Cell] {
        &self.path
    }

    pub fn route(&self) -> &[Cell] {
        &self.route
    }

    pub fn visited_roads(&self) -> &[Cell] {
        &self.visited_roads
    }

    pub fn depart_time(&self) -> Option<f64> {
        self.depart_time
    }

    pub fn arrive_time(&self) -> Option<f64> {
        self.arrive_time
    }

    pub fn distance_m(&self) -> f64 {
        self.distance_m
    }

    /// Elapsed trip time, once arrived
    pub fn trip_secs(&self) -> Option<f64> {
        match (self.depart_time, self.arrive_time) {
            (Some(depart), Some(arrive)) if self.is_arrived() => Some(arrive - depart),
            _ => None,
        }
    }

    /// Average trip speed in km/h; 0 until arrived with a positive trip time
    pub fn avg_speed_kmh(&self) -> f64 {
        match self.trip_secs() {
            Some(secs) if secs > 0.0 => self.distance_m / secs * MS_TO_KMH,
            _ => 0.0,
        }
    }

    /// Advance this vehicle by one tick at simulated time `now`
    pub fn update(&mut self, now: f64, ctx: &TickContext<'_>, occupancy: &Occupancy) -> VehicleUpdate {
        match self.state {
            VehicleState::Arrived => return VehicleUpdate::Finished,
            VehicleState::Unstarted => {
                self.depart_time = Some(now);
                self.state = VehicleState::EnRoute;
                debug!("Vehicle {} departed {} for {} at {:.2}s", self.id, self.origin, self.target, now);
            }
            VehicleState::EnRoute => {}
        }

        let current = self.current_cell();
        if current == self.target {
            self.arrive(now);
            return VehicleUpdate::Arrived;
        }

        match self.try_advance(current, ctx, occupancy) {
            Ok(()) => VehicleUpdate::Moved,
            Err(hold) => {
                trace!("Vehicle {} holding at {}: {:?}", self.id, current, hold);
                VehicleUpdate::Held(hold)
            }
        }
    }

    fn arrive(&mut self, now: f64) {
        self.arrive_time = Some(now);
        self.state = VehicleState::Arrived;
        if !self.visited_roads.contains(&self.target) {
            self.visited_roads.push(self.target);
        }
        if self.route.last() != Some(&self.target) {
            self.route.push(self.target);
        }
        debug!(
            "Vehicle {} arrived at {} at {:.2}s after {:.1} m",
            self.id, self.target, now, self.distance_m
        );
    }

    /// Run the gates in order, then move. The first failing gate is returned.
    fn try_advance(&mut self, current: Cell, ctx: &TickContext<'_>, occupancy: &Occupancy) -> Result<(), Hold> {
        let rules = ctx.grid.rules();

        if rules.is_closed(current) {
            return Err(Hold::ClosedCell);
        }

        if self.path.first() != Some(&current) {
            self.path = ctx.planner.find_path(ctx.grid, current, self.target);
        }
        if self.path.len() < 2 {
            return Err(Hold::NoRoute);
        }

        let next = self.path[1];
        let direction = Direction::between(current, next);
        if direction == Direction::Stationary {
            return Err(Hold::Stationary);
        }

        if ctx.config.lane_change_policy == LaneChangePolicy::Strict
            && !rules.lane_change_allowed(next)
            && self.lane >= rules.lane_count(next)
        {
            return Err(Hold::LaneChange);
        }

        if !rules.turn_allowed(next, direction, self.lane) {
            return Err(Hold::TurnLane);
        }

        if direction == Direction::Left && !ctx.signals.governing_has_protected_left(next) {
            if let Some(color) = ctx.signals.governing_color(next) {
                if !color.permits_entry() {
                    return Err(Hold::UnprotectedLeft);
                }
            }
        }

        if rules.is_stop_line(next) && ctx.signals.governing_color(next) == Some(SignalColor::Red) {
            return Err(Hold::StopLineRed);
        }

        if occupancy.is_taken_by_other(next, self.id) {
            return Err(Hold::Occupied);
        }

        let speed_kmh = self.speed_kmh.min(rules.speed_limit(next, self.lane, self.speed_kmh));
        if !speed_kmh.is_finite() || speed_kmh <= 0.0 {
            return Err(Hold::ZeroSpeed);
        }
        let step_m = speed_kmh / MS_TO_KMH * ctx.config.tick_secs;
        let step_cells = step_m / ctx.config.meters_per_cell;

        let goal = next.center();
        let remaining = self.position.distance(&goal);
        if remaining < ARRIVAL_EPSILON {
            return Err(Hold::Stationary);
        }

        let ratio = (step_cells / remaining).min(1.0);
        self.position = self.position.lerp(&goal, ratio);
        self.distance_m += remaining * ratio * ctx.config.meters_per_cell;

        if !self.visited_roads.contains(&current) {
            self.visited_roads.push(current);
        }
        let reached = self.current_cell();
        if reached != current {
            self.route.push(reached);
        }

        Ok(())
    }
}
