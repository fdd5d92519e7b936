use std::path::PathBuf;

use simulation::SimulationConfig;

fn main() -> Result<(), anyhow::Error> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Optional JSON config as the only argument
    let config = match std::env::args_os().nth(1) {
        Some(path) => SimulationConfig::load(&PathBuf::from(path))?,
        None => SimulationConfig::default(),
    };

    tracing::info!(
        version = simulation::VERSION,
        capacity = config.engine.book_capacity,
        seed = ?config.generator.seed,
        "Starting stock market"
    );

    let report = simulation::run(&config)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
