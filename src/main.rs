use anyhow::{Context, Result};
use clap::Parser;
use sparkify_etl::db::open_database;
use sparkify_etl::log_data::process_log_file;
use sparkify_etl::models::LogFileStats;
use sparkify_etl::pipeline::process_data;
use sparkify_etl::progress::{format_elapsed, set_log_only};
use sparkify_etl::report::{print_reports, run_reports};
use sparkify_etl::schema::{create_tables, reset_tables};
use sparkify_etl::song_data::process_song_file;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sparkify-etl")]
#[command(about = "Load Sparkify song metadata and activity logs into SQLite, then print example reports")]
struct Args {
    /// SQLite database file (created if missing)
    #[arg(long, env = "SPARKIFY_DATABASE", default_value = "sparkifydb.sqlite3")]
    database: PathBuf,

    /// Root of the song-metadata JSON tree
    #[arg(long, default_value = "data/song_data")]
    song_data: PathBuf,

    /// Root of the activity-log JSON tree
    #[arg(long, default_value = "data/log_data")]
    log_data: PathBuf,

    /// Drop and recreate all tables before loading
    #[arg(long)]
    reset: bool,

    /// Skip the example queries after loading
    #[arg(long)]
    skip_report: bool,

    /// Hide progress bars and print plain progress lines
    #[arg(long)]
    log_only: bool,
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {}", e))
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing()?;
    set_log_only(args.log_only);

    let start = Instant::now();

    info!(database = %args.database.display(), "opening database");
    let mut conn = open_database(&args.database).context("Failed to open database")?;

    if args.reset {
        warn!("--reset given, dropping all tables");
        reset_tables(&conn).context("Failed to reset tables")?;
    } else {
        create_tables(&conn).context("Failed to create tables")?;
    }

    let song_files = process_data(&mut conn, &args.song_data, process_song_file)
        .with_context(|| format!("Song load failed under {:?}", args.song_data))?;

    let mut log_stats = LogFileStats::default();
    let log_files = process_data(&mut conn, &args.log_data, |conn, path| {
        let stats = process_log_file(conn, path)?;
        log_stats.add(&stats);
        Ok(())
    })
    .with_context(|| format!("Log load failed under {:?}", args.log_data))?;

    if !args.skip_report {
        let reports = run_reports(&conn).context("Example queries failed")?;
        print_reports(&reports);
    }

    info!(
        song_files,
        log_files,
        plays = log_stats.plays,
        songplays = log_stats.songplays_inserted,
        match_rate = %format!("{:.1}%", log_stats.match_rate()),
        elapsed = %format_elapsed(start.elapsed()),
        "load complete"
    );

    conn.close()
        .map_err(|(_, e)| e)
        .context("Failed to close database")?;
    Ok(())
}
