//! Footprint analyzer entrypoint: reads a JSON array of log records, prints
//! ndjson to stdout (anomaly lines, then the report as one line). With a watch
//! interval it re-analyzes the file until Ctrl+C, serving unchanged snapshots
//! from the cache.

use footprint_analyzer::{
    cache::PipelineCache,
    config::AnalyzerConfig,
    eventlog::RawRecord,
    logging::StructuredLogger,
    pipeline::Pipeline,
};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

const CACHE_CAPACITY: usize = 8;

fn read_records(path: &Path) -> Result<Vec<RawRecord>, Box<dyn std::error::Error + Send + Sync>> {
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

fn run_once(
    config: &AnalyzerConfig,
    pipeline: &Pipeline,
    cache: &PipelineCache,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let run_id = Uuid::new_v4().to_string();
    let records = read_records(&config.input_path)?;
    info!(%run_id, records = records.len(), input = %config.input_path.display(), "analysis run");

    let report = cache.get_or_run(pipeline, &records)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    StructuredLogger::emit_report(&run_id, &config.analysis.anomaly_metric, &report, &mut out)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config_path = std::env::var("FOOTPRINT_CONFIG_PATH")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| std::path::PathBuf::from("config.json"));
    let mut config = AnalyzerConfig::load(&config_path)?;
    if let Some(input) = std::env::args().nth(1) {
        config.input_path = input.into();
    }

    StructuredLogger::init(config.log.json, &config.log.level);
    info!(config = %config_path.display(), "footprint analyzer starting");

    let pipeline = Pipeline::new(config.ingest.clone(), config.analysis.clone())?;
    let cache = PipelineCache::new(CACHE_CAPACITY);

    let interval_secs = config.watch_interval_secs;
    if interval_secs == 0 {
        return run_once(&config, &pipeline, &cache);
    }

    info!(interval_secs, "watch mode (Ctrl+C to stop)");
    static STOP: AtomicBool = AtomicBool::new(false);
    let _ = ctrlc::set_handler(|| {
        STOP.store(true, Ordering::Relaxed);
    });
    let mut cycle: u64 = 0;
    while !STOP.load(Ordering::Relaxed) {
        cycle += 1;
        if let Err(e) = run_once(&config, &pipeline, &cache) {
            warn!(cycle, error = %e, "analysis failed");
        }
        for _ in 0..interval_secs {
            if STOP.load(Ordering::Relaxed) {
                break;
            }
            std::thread::sleep(Duration::from_secs(1));
        }
    }
    info!("footprint analyzer stopping");
    Ok(())
}
