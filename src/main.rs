use anyhow::Result;
use clap::Parser;
use log::info;
use std::path::PathBuf;

use grid_traffic_sim::export::write_results_csv;
use grid_traffic_sim::simulation::{
    LaneChangePolicy, ScenarioPaths, SimConfig, SimEngine, DEFAULT_TICK_SECS, METERS_PER_CELL,
};

#[derive(Parser)]
#[command(name = "grid_traffic_sim")]
#[command(about = "Rule-constrained grid traffic simulation (headless)")]
struct Cli {
    /// Directory holding road_map.txt and the rule files
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Maximum number of ticks to run
    #[arg(long, default_value = "5000")]
    ticks: u64,

    /// Simulated seconds per tick
    #[arg(long, default_value_t = DEFAULT_TICK_SECS)]
    tick_secs: f64,

    /// Real-world length of one cell in meters
    #[arg(long, default_value_t = METERS_PER_CELL)]
    meters_per_cell: f64,

    /// Enforce the lane-change table instead of only loading it
    #[arg(long)]
    strict_lane_change: bool,

    /// Add this many random vehicles on top of the roster
    #[arg(long, default_value = "0")]
    random_vehicles: usize,

    /// Seed for random vehicles
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Write the result table to this CSV file
    #[arg(long)]
    output: Option<PathBuf>,

    /// Log live stats and the map every N ticks (0 = never)
    #[arg(long, default_value = "250")]
    report_every: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = SimConfig {
        tick_secs: cli.tick_secs,
        meters_per_cell: cli.meters_per_cell,
        lane_change_policy: if cli.strict_lane_change {
            LaneChangePolicy::Strict
        } else {
            LaneChangePolicy::Ignore
        },
    };

    let paths = ScenarioPaths::in_dir(&cli.data_dir);
    let mut engine = SimEngine::load(&paths, config);
    if cli.random_vehicles > 0 {
        engine = engine.with_random_vehicles(cli.random_vehicles, cli.seed);
    }

    info!("Running up to {} ticks of {:.3}s", cli.ticks, config.tick_secs);
    info!("Initial map:\n{}", engine.draw_map());

    while engine.tick_count() < cli.ticks && !engine.is_stopped() {
        engine.tick();
        if cli.report_every > 0 && engine.tick_count() % cli.report_every == 0 {
            info!(
                "--- After tick {} ({:.1}s simulated) ---\n{}\n{}",
                engine.tick_count(),
                engine.time(),
                engine.live_stats(),
                engine.draw_map()
            );
        }
    }
    engine.stop();

    info!("=== SIMULATION COMPLETE ===");
    for line in engine.live_stats().lines() {
        info!("{}", line);
    }

    if let Some(output) = &cli.output {
        let results = engine.results().map(|r| r.to_vec()).unwrap_or_default();
        write_results_csv(output, &results)?;
        info!("Wrote {} results to {}", results.len(), output.display());
    }

    Ok(())
}
