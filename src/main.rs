use anyhow::{Context, Result};
use chrono::Local;
use std::path::Path;
use tracing::info;

use p3_master::config::DEFAULT_CONFIG_FILE;
use p3_master::logging::init_logging;
use p3_master::{run_master_build, AppConfig};

fn main() -> Result<()> {
    init_logging();
    info!(version = p3_master::VERSION, "p3-master started");

    let config = AppConfig::load_or_default(Path::new(DEFAULT_CONFIG_FILE))
        .context("Failed to load configuration")?;

    info!(
        input = %config.input_folder.display(),
        output = %config.output_file,
        remaining_weeks = config.pipeline.remaining_weeks,
        fake_threshold = config.pipeline.fake_threshold,
        "Configuration"
    );

    // "today" is fixed for the whole run
    let today = Local::now().date_naive();

    let table = run_master_build(&config, today).context("Master build failed")?;

    match table {
        Some(table) => info!(
            records = table.records.len(),
            output = %config.output_path().display(),
            "Done"
        ),
        None => info!("No input, stopped without writing"),
    }

    Ok(())
}
