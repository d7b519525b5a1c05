//! Random vehicle rosters
//!
//! Synthetic demand for a map, added on request through
//! `SimEngine::with_random_vehicles`. Loading a scenario without a roster
//! file gives an engine with no vehicles. A seeded RNG makes the roster
//! reproducible.

use log::warn;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::Rng;
use rand::SeedableRng;

use super::grid::GridModel;
use super::planner::{BfsPlanner, PathPlanner};
use super::types::{Cell, VehicleId};
use super::vehicle::Vehicle;

/// Desired speed range for generated vehicles, km/h
pub const RANDOM_SPEED_KMH: std::ops::Range<f64> = 30.0..60.0;

/// Attempts per vehicle before giving up on finding a connected pair
const MAX_PAIR_ATTEMPTS: usize = 32;

/// Generate `count` vehicles with distinct starting cells and reachable
/// targets, all in lane 0. Fewer are returned if the map runs out of free
/// starting cells or connected pairs.
pub fn random_roster(grid: &GridModel, count: usize, seed: u64) -> Vec<Vehicle> {
    let mut rng = StdRng::seed_from_u64(seed);
    let planner = BfsPlanner;
    let roads: Vec<Cell> = grid
        .traversable_cells()
        .into_iter()
        .filter(|cell| grid.is_routable(*cell))
        .collect();

    let mut taken: Vec<Cell> = Vec::new();
    let mut vehicles = Vec::with_capacity(count);

    'vehicles: for _ in 0..count {
        let free: Vec<Cell> = roads.iter().copied().filter(|cell| !taken.contains(cell)).collect();

        for _ in 0..MAX_PAIR_ATTEMPTS {
            let (Some(&start), Some(&goal)) = (free.choose(&mut rng), roads.choose(&mut rng)) else {
                break 'vehicles;
            };
            if start == goal || planner.find_path(grid, start, goal).is_empty() {
                continue;
            }

            let speed_kmh = rng.random_range(RANDOM_SPEED_KMH).round();
            taken.push(start);
            vehicles.push(Vehicle::new(VehicleId(vehicles.len()), start, goal, 0, speed_kmh));
            continue 'vehicles;
        }
    }

    if vehicles.len() < count {
        warn!("Only generated {} of {} random vehicles", vehicles.len(), count);
    }
    vehicles
}
