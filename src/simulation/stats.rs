//! Run statistics and the per-vehicle result snapshot

use ordered_float::OrderedFloat;
use sorted_vec::SortedVec;
use std::fmt;

use super::types::{Cell, VehicleId};
use super::vehicle::Vehicle;

/// Frozen outcome of one vehicle, produced when the engine stops
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub id: VehicleId,
    pub start: Cell,
    pub target: Cell,
    pub depart_time: Option<f64>,
    pub arrive_time: Option<f64>,
    /// Trip time in seconds; `None` if the vehicle never arrived
    pub total_time: Option<f64>,
    pub distance_m: f64,
    pub avg_speed_kmh: f64,
    /// Cells the vehicle passed through, origin first
    pub path: Vec<Cell>,
    pub used_roads: Vec<Cell>,
}

impl SimulationResult {
    pub fn from_vehicle(vehicle: &Vehicle) -> Self {
        Self {
            id: vehicle.id(),
            start: vehicle.origin(),
            target: vehicle.target(),
            depart_time: vehicle.depart_time(),
            arrive_time: vehicle.arrive_time(),
            total_time: vehicle.trip_secs(),
            distance_m: vehicle.distance_m(),
            avg_speed_kmh: vehicle.avg_speed_kmh(),
            path: vehicle.route().to_vec(),
            used_roads: vehicle.visited_roads().to_vec(),
        }
    }

    pub fn arrived(&self) -> bool {
        self.total_time.is_some()
    }
}

/// Live metrics over the current vehicle population
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LiveStats {
    pub arrived: usize,
    pub total: usize,
    pub mean_trip_secs: f64,
    pub min_trip_secs: f64,
    pub max_trip_secs: f64,
    pub median_trip_secs: f64,
    /// Mean of the per-vehicle average speeds of arrived vehicles, km/h
    pub mean_speed_kmh: f64,
    pub congestion: f64,
}

impl LiveStats {
    /// Aggregate over `vehicles`; `congestion` comes from the grid
    pub fn collect(vehicles: &[Vehicle], congestion: f64) -> Self {
        let trip_secs: SortedVec<OrderedFloat<f64>> = SortedVec::from_unsorted(
            vehicles
                .iter()
                .filter_map(Vehicle::trip_secs)
                .map(OrderedFloat)
                .collect(),
        );
        let arrived = vehicles.iter().filter(|v| v.is_arrived()).count();

        let (mean, min, max, median) = if trip_secs.is_empty() {
            (0.0, 0.0, 0.0, 0.0)
        } else {
            let sum: f64 = trip_secs.iter().map(|t| t.into_inner()).sum();
            (
                sum / trip_secs.len() as f64,
                trip_secs[0].into_inner(),
                trip_secs[trip_secs.len() - 1].into_inner(),
                median(&trip_secs),
            )
        };

        let speeds: Vec<f64> = vehicles
            .iter()
            .filter(|v| v.trip_secs().is_some_and(|secs| secs > 0.0))
            .map(Vehicle::avg_speed_kmh)
            .collect();
        let mean_speed_kmh = if speeds.is_empty() {
            0.0
        } else {
            speeds.iter().sum::<f64>() / speeds.len() as f64
        };

        Self {
            arrived,
            total: vehicles.len(),
            mean_trip_secs: mean,
            min_trip_secs: min,
            max_trip_secs: max,
            median_trip_secs: median,
            mean_speed_kmh,
            congestion,
        }
    }

    /// Display lines for a stats panel
    pub fn lines(&self) -> Vec<String> {
        vec![
            "[Live Traffic Stats]".to_string(),
            format!("Arrived vehicles: {}/{}", self.arrived, self.total),
            format!("Average travel time: {:.2}s", self.mean_trip_secs),
            format!("Median travel time: {:.2}s", self.median_trip_secs),
            format!("Average speed: {:.2} km/h", self.mean_speed_kmh),
            format!("Min: {:.2}s | Max: {:.2}s", self.min_trip_secs, self.max_trip_secs),
            format!("Average congestion: {:.2}", self.congestion),
        ]
    }
}

impl fmt::Display for LiveStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines().join("\n"))
    }
}

fn median(sorted: &SortedVec<OrderedFloat<f64>>) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1].into_inner() + sorted[mid].into_inner()) / 2.0
    } else {
        sorted[mid].into_inner()
    }
}
