use anyhow::Context;
use clap::Parser;
use log::info;
use sleep_stats::chart::render_chart;
use sleep_stats::config::Args;
use sleep_stats::data_loading::read_export_file;
use sleep_stats::output::{print_summary, write_summary_csv};
use sleep_stats::nightly_stats;

fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::init();

    let args = Args::parse();
    args.validate()?;

    let intervals = read_export_file(&args.file, &args.parse_options())
        .with_context(|| format!("Error reading CSV file {}", args.file.display()))?;

    let stats = nightly_stats(intervals, args.boundary, &args.count_stage);
    info!("Aggregated {} nights", stats.len());

    // Chart first: a render failure aborts before anything is printed
    render_chart(&args.chart_output, &stats, &args.chart_options())?;

    if let Some(csv_output) = &args.csv_output {
        write_summary_csv(csv_output, &stats)?;
    }

    print_summary(&stats);

    Ok(())
}
