use anyhow::{Context, Result};
use clap::Parser;
use dnsfuzzer::config;
use dnsfuzzer::output::OutputManager;
use dnsfuzzer::progress::ProgressReporter;
use dnsfuzzer::utils::read_wordlist;
use dnsfuzzer::{Args, ResolutionEngine, RunStats};
use log::{error, info, warn};
use std::process;
use std::time::Instant;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        log::LevelFilter::Debug
    } else if args.silent {
        log::LevelFilter::Warn
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new().filter_level(level).parse_default_env().init();

    let mut settings = config::load_config(args.config_path.as_deref()).context("Failed to load configuration")?;
    args.apply_to(&mut settings);

    let run_config = match settings.validate() {
        Ok(run_config) => run_config,
        Err(e) => {
            error!("{}", e);
            process::exit(2);
        }
    };

    let labels = match read_wordlist(&args.wordlist) {
        Ok(labels) => labels,
        Err(e) => {
            error!("[-] {}", e);
            process::exit(1);
        }
    };

    let mut output = OutputManager::new(settings.output_config())?;
    let engine = ResolutionEngine::from_config(run_config)?;

    let token = engine.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted: no new lookups will be dispatched");
            token.cancel();
        }
    });

    let candidates = engine.candidates(labels);
    let reporter = ProgressReporter::new(candidates.len() as u64, args.show_progress());
    let start_time = Instant::now();

    let results = engine
        .run(candidates, |result, progress| {
            if let Err(e) = output.write_result(result, &reporter) {
                error!("Failed to write result for {}: {}", result.name(), e);
            }
            reporter.advance(progress);
        })
        .await;
    reporter.finish();

    let stats = RunStats::from_results(&results, start_time.elapsed());
    output.finish(&stats)?;

    info!(
        "Sweep completed: {} of {} subdomains resolved ({} failed, {} cancelled) in {:.2}s",
        stats.resolved,
        stats.total,
        stats.failed,
        stats.cancelled,
        stats.duration.as_secs_f64()
    );

    Ok(())
}
