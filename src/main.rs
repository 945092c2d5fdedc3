use std::path::PathBuf;

use anyhow::{Context, Result};

use hospital_compare::color::{to_hex, ColorMap};
use hospital_compare::config::PipelineConfig;
use hospital_compare::pipeline::columns::{FACILITY_NAME, STATE};
use hospital_compare::pipeline::{self, facet_panels, summarize};

fn main() -> Result<()> {
    env_logger::init();

    // Optional positional argument: path to a JSON config file.
    let config = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => PipelineConfig::load(&path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => {
            let config = PipelineConfig::default();
            config.validate().context("validating default config")?;
            config
        }
    };

    let output = pipeline::run(&config).context("running pipeline")?;
    pipeline::write_outputs(&output, &config).context("writing derived tables")?;

    for summary in summarize(&output.spending_by_state) {
        log::info!(
            "{}: {} facilities, highest spending score {}",
            summary.state,
            summary.facilities,
            summary
                .max_score
                .map_or_else(|| "n/a".to_string(), |s| format!("{s:.2}"))
        );
    }

    let colors = ColorMap::from_config(&config).context("building colour map")?;
    for (hospital, rgb) in colors.legend_entries() {
        log::info!("legend: {hospital} {}", to_hex(rgb));
    }
    log::info!("legend: other hospitals {}", colors.default_color());

    let shown: Vec<String> = output
        .display
        .unique_values(STATE)
        .iter()
        .map(|s| s.to_field())
        .collect();
    log::info!(
        "{} hospitals plotted across states [{}]",
        output.display.unique_values(FACILITY_NAME).len(),
        shown.join(", ")
    );

    let panels = facet_panels(&output.display, &config);
    let empty = panels.iter().filter(|p| p.rows.is_empty()).count();
    log::info!("{} chart panels, {empty} without data", panels.len());
    for panel in panels.iter().filter(|p| !p.rows.is_empty()) {
        log::debug!("{} - {}: {} points", panel.state, panel.measure, panel.rows.len());
    }

    println!("Wrote derived tables to {}", config.output_dir.display());
    Ok(())
}
