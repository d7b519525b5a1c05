//! CSV export of the frozen result snapshot
//!
//! One row per vehicle. Coordinate lists are `;`-joined `(row, col)` pairs.

use anyhow::{Context, Result};
use csv::Writer;
use std::io::Write;
use std::path::Path;

use crate::simulation::{Cell, SimulationResult};

pub const RESULT_HEADER: [&str; 12] = [
    "vehicle_id",
    "start_r",
    "start_c",
    "target_r",
    "target_c",
    "depart_time",
    "arrive_time",
    "total_time",
    "distance_m",
    "avg_speed_kmh",
    "path",
    "used_roads",
];

fn join_cells(cells: &[Cell]) -> String {
    cells
        .iter()
        .map(Cell::to_string)
        .collect::<Vec<_>>()
        .join(";")
}

/// Field values of one result row, in header order
pub fn result_record(result: &SimulationResult) -> Vec<String> {
    vec![
        result.id.to_string(),
        result.start.row.to_string(),
        result.start.col.to_string(),
        result.target.row.to_string(),
        result.target.col.to_string(),
        format!("{:.2}", result.depart_time.unwrap_or(0.0)),
        format!("{:.2}", result.arrive_time.unwrap_or(0.0)),
        result
            .total_time
            .map(|secs| format!("{:.2}", secs))
            .unwrap_or_default(),
        format!("{:.2}", result.distance_m),
        format!("{:.2}", result.avg_speed_kmh),
        join_cells(&result.path),
        join_cells(&result.used_roads),
    ]
}

/// Write the header and one row per result to any writer
pub fn write_results<W: Write>(writer: W, results: &[SimulationResult]) -> Result<()> {
    let mut csv = Writer::from_writer(writer);
    csv.write_record(RESULT_HEADER)?;
    for result in results {
        csv.write_record(result_record(result))?;
    }
    csv.flush().context("Failed to flush result export")?;
    Ok(())
}

pub fn write_results_csv(path: &Path, results: &[SimulationResult]) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_results(file, results).with_context(|| format!("Failed to write {}", path.display()))
}
