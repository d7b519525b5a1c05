//! Result export and command line tests

use std::process::Command;

use grid_traffic_sim::export::{result_record, write_results, write_results_csv, RESULT_HEADER};
use grid_traffic_sim::simulation::{Cell, SimulationResult, VehicleId};

fn arrived_result() -> SimulationResult {
    SimulationResult {
        id: VehicleId(3),
        start: Cell::new(0, 0),
        target: Cell::new(0, 2),
        depart_time: Some(0.0),
        arrive_time: Some(0.76),
        total_time: Some(0.76),
        distance_m: 7.6,
        avg_speed_kmh: 36.0,
        path: vec![Cell::new(0, 0), Cell::new(0, 1), Cell::new(0, 2)],
        used_roads: vec![Cell::new(0, 0), Cell::new(0, 1), Cell::new(0, 2)],
    }
}

fn stalled_result() -> SimulationResult {
    SimulationResult {
        id: VehicleId(4),
        start: Cell::new(1, 1),
        target: Cell::new(5, 5),
        depart_time: Some(0.0),
        arrive_time: None,
        total_time: None,
        distance_m: 0.0,
        avg_speed_kmh: 0.0,
        path: vec![Cell::new(1, 1)],
        used_roads: Vec::new(),
    }
}

#[test]
fn test_record_formats_fields() {
    let record = result_record(&arrived_result());

    assert_eq!(record.len(), RESULT_HEADER.len());
    assert_eq!(record[0], "3");
    assert_eq!(&record[1..5], ["0", "0", "0", "2"]);
    assert_eq!(record[6], "0.76");
    assert_eq!(record[7], "0.76");
    assert_eq!(record[10], "(0, 0);(0, 1);(0, 2)");
}

#[test]
fn test_stalled_vehicle_has_empty_total_time() {
    let record = result_record(&stalled_result());

    assert_eq!(record[6], "0.00");
    assert_eq!(record[7], "");
    assert_eq!(record[11], "");
}

#[test]
fn test_written_table_reads_back() {
    let mut buffer = Vec::new();
    write_results(&mut buffer, &[arrived_result(), stalled_result()]).unwrap();

    let mut reader = csv::Reader::from_reader(buffer.as_slice());
    let headers: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
    assert_eq!(headers, RESULT_HEADER);

    let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][10], "(0, 0);(0, 1);(0, 2)");
    assert_eq!(&rows[1][0], "4");
    assert_eq!(&rows[1][7], "");
}

#[test]
fn test_write_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.csv");
    write_results_csv(&path, &[arrived_result()]).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().count(), 2);
    assert!(text.starts_with("vehicle_id,start_r,start_c"));
}

#[test]
fn test_write_to_missing_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("results.csv");

    assert!(write_results_csv(&path, &[arrived_result()]).is_err());
}

/// Test that the binary runs the sample scenario and exports its results
#[test]
fn test_cli_runs_sample_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("out.csv");

    let output = Command::new(env!("CARGO_BIN_EXE_grid_traffic_sim"))
        .args(["--data-dir", concat!(env!("CARGO_MANIFEST_DIR"), "/data")])
        .args(["--ticks", "3000", "--report-every", "0"])
        .arg("--output")
        .arg(&output_path)
        .env("RUST_LOG", "warn,grid_traffic_sim=info")
        .output()
        .expect("Failed to execute simulation");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "Simulation failed. stderr: {}", stderr);
    assert!(
        stderr.contains("SIMULATION COMPLETE"),
        "Simulation did not complete properly. stderr: {}",
        stderr
    );
    assert!(stderr.contains("Arrived vehicles:"), "Missing stats. stderr: {}", stderr);

    let mut reader = csv::Reader::from_path(&output_path).unwrap();
    assert_eq!(reader.records().count(), 6);
}

/// Test that a missing data directory still completes with no vehicles
#[test]
fn test_cli_with_empty_data_dir() {
    let dir = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_grid_traffic_sim"))
        .arg("--data-dir")
        .arg(dir.path())
        .args(["--ticks", "10"])
        .env("RUST_LOG", "info")
        .output()
        .expect("Failed to execute simulation");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "stderr: {}", stderr);
    assert!(stderr.contains("Arrived vehicles: 0/0"), "stderr: {}", stderr);
}
