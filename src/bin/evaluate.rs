use std::error::Error;
use std::path::PathBuf;

use clap::Parser;

use qpong::logging::init_logging;
use qpong::{DefaultSnapshot, EvaluationConfig, EvaluationHarness};

#[derive(Parser, Debug)]
#[command(about = "Score a saved paddle network with greedy episodes", version, author)]
struct EvaluateArgs {
    /// Checkpoint (.bin) written by the train binary.
    checkpoint: PathBuf,
    #[arg(long, default_value_t = 300.0)]
    width: f64,
    #[arg(long, default_value_t = 200.0)]
    height: f64,
    /// Number of evaluation episodes.
    #[arg(long, default_value_t = 75)]
    episodes: usize,
    /// Hits after which an episode is cut short.
    #[arg(long, default_value_t = 30)]
    hit_cap: usize,
    /// Exploration probability while evaluating.
    #[arg(long, default_value_t = 0.0)]
    epsilon: f64,
    /// Episodes with more hits than this count towards the percentage.
    #[arg(long, default_value_t = 25)]
    hit_threshold: usize,
    #[arg(long, default_value_t = EvaluationConfig::default().seed)]
    seed: u64,
    /// Print one line per episode.
    #[arg(long)]
    verbose: bool,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    init_logging();
    let args = EvaluateArgs::parse();
    let snapshot = DefaultSnapshot::load(&args.checkpoint)?;
    let metadata = snapshot.metadata();
    println!(
        "Loaded {} (hidden={:?}, batches={}, samples={})",
        args.checkpoint.display(),
        metadata.hidden,
        metadata.batches_trained,
        metadata.samples_trained
    );

    let harness = EvaluationHarness::new(EvaluationConfig {
        width: args.width,
        height: args.height,
        episodes: args.episodes,
        hit_cap: args.hit_cap,
        epsilon: args.epsilon,
        hit_threshold: args.hit_threshold,
        seed: args.seed,
    })?;
    let report = harness.run(&snapshot)?;

    if args.verbose {
        for (index, episode) in report.episodes.iter().enumerate() {
            let miss = episode
                .miss_distance
                .map(|distance| format!("{distance:.2}"))
                .unwrap_or_else(|| String::from("--"));
            println!(
                "  episode {:>4}: hits {:>3}  miss {:>7}  steps {}",
                index + 1,
                episode.hits,
                miss,
                episode.steps
            );
        }
    }

    let summary = &report.summary;
    println!("Median hits:        {:.1}", summary.median_hits);
    println!("Mean hits:          {:.3}", summary.mean_hits);
    println!("Min hits:           {}", summary.min_hits);
    println!("Max hits:           {}", summary.max_hits);
    println!(
        "% above {:<3}        {:.2}",
        args.hit_threshold, summary.pct_above_threshold
    );
    println!("Mean miss distance: {:.3}", summary.mean_miss_distance);
    Ok(())
}
