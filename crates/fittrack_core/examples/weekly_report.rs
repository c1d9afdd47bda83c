use fittrack_core::config::Config;
use fittrack_core::export::{SummaryExport, render_csv};
use fittrack_core::store::{JsonFileStore, RecordStore};
use fittrack_core::summary::records_in_window;
use fittrack_core::utils::local_today;
use fittrack_core::{Period, compute_period_summary, compute_streak_stats};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Example: expects FITTRACK_DATA_PATH pointing at an existing store
    let cfg = Config::from_env()?;
    let Some(path) = cfg.data_path else {
        eprintln!("set FITTRACK_DATA_PATH to a fittrack JSON store");
        return Ok(());
    };
    let store = JsonFileStore::open(&path).await?;
    let records = store.all_records().await?;
    let today = local_today();

    let stats = compute_streak_stats(&records, today);
    println!(
        "streak: {} current, {} longest, {} perfect of {} days",
        stats.current_streak, stats.longest_streak, stats.perfect_days, stats.total_days_considered
    );

    let summary = compute_period_summary(&records, Period::Week, today);
    let window = records_in_window(&records, Period::Week, today);
    print!("{}", render_csv(&SummaryExport::new(summary, window)));
    Ok(())
}
