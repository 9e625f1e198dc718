use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use burn_train::logger::{FileMetricLogger, MetricLogger};
use burn_train::metric::MetricEntry;
use clap::Parser;
use plotters::prelude::*;

use qpong::logging::init_logging;
use qpong::ml::{DEFAULT_HIDDEN, DEFAULT_LEARNING_RATE, DefaultApproximator};
use qpong::session::TrainingConfig;
use qpong::{BatchReport, TrainingSession, format_report, report_header};

#[derive(Parser, Debug)]
#[command(
    about = "Train a Q-learning Pong paddle on a left-only board",
    version,
    author
)]
struct TrainArgs {
    /// Board width.
    #[arg(long, default_value_t = 300.0)]
    width: f64,
    /// Board height.
    #[arg(long, default_value_t = 200.0)]
    height: f64,
    /// Total number of training episodes.
    #[arg(long = "episodes", default_value_t = 40_000)]
    max_episodes: usize,
    /// Episodes collected before each commit to the network.
    #[arg(long, default_value_t = 10)]
    episodes_per_batch: usize,
    /// Exploration probability at the start of training.
    #[arg(long, default_value_t = 0.9)]
    max_epsilon: f64,
    /// Exploration probability once annealing is over.
    #[arg(long, default_value_t = 0.0)]
    min_epsilon: f64,
    /// Episodes over which epsilon is annealed.
    #[arg(long, default_value_t = 10_000)]
    epsilon_episodes: usize,
    /// Discount factor.
    #[arg(long, default_value_t = 0.9)]
    gamma: f64,
    /// Hits after which a training episode is cut short.
    #[arg(long, default_value_t = 10)]
    hit_cap: usize,
    /// Optimizer iterations per commit.
    #[arg(long, default_value_t = 1)]
    train_iterations: usize,
    /// Batches between numbered backups (0 disables them).
    #[arg(long, default_value_t = 1_000)]
    backup_every: usize,
    /// Greedy episodes per evaluation.
    #[arg(long, default_value_t = 75)]
    evaluation_episodes: usize,
    /// Hit cap of evaluation episodes.
    #[arg(long, default_value_t = 30)]
    evaluation_hit_cap: usize,
    /// Hidden layer widths of a fresh network.
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_HIDDEN.to_vec())]
    hidden: Vec<usize>,
    /// Learning rate passed to the Adam optimizer.
    #[arg(long, default_value_t = DEFAULT_LEARNING_RATE)]
    learning_rate: f64,
    /// Start from a saved network (.bin) instead of a fresh one.
    #[arg(long)]
    init: Option<PathBuf>,
    /// Directory where checkpoints will be written.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Base name of the checkpoint files.
    #[arg(long, default_value = "qpong")]
    name: String,
    /// Write a PNG learning curve here once training is done.
    #[arg(long)]
    chart: Option<PathBuf>,
    /// Master seed controlling reproducibility.
    #[arg(long, default_value_t = TrainingConfig::default().seed)]
    seed: u64,
}

impl TrainArgs {
    fn config(&self) -> TrainingConfig {
        TrainingConfig {
            width: self.width,
            height: self.height,
            max_episodes: self.max_episodes,
            episodes_per_batch: self.episodes_per_batch,
            max_epsilon: self.max_epsilon,
            min_epsilon: self.min_epsilon,
            epsilon_episodes: self.epsilon_episodes,
            gamma: self.gamma,
            hit_cap: self.hit_cap,
            train_iterations: self.train_iterations,
            backup_every: self.backup_every,
            evaluation_episodes: self.evaluation_episodes,
            evaluation_hit_cap: self.evaluation_hit_cap,
            seed: self.seed,
        }
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    init_logging();
    let args = TrainArgs::parse();
    validate_args(&args)?;
    let config = args.config();

    let output_dir = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from("checkpoints"));
    fs::create_dir_all(&output_dir)?;

    let approximator = match &args.init {
        Some(path) => {
            let approximator = DefaultApproximator::load(path)?;
            println!(
                "Starting from {} (hidden={:?}, batches={})",
                display_path(path),
                approximator.metadata().hidden,
                approximator.metadata().batches_trained
            );
            approximator
        }
        None => DefaultApproximator::new(&args.hidden, args.learning_rate)?,
    };

    // Burn dashboard-compatible metric log next to the checkpoints.
    let log_dir = output_dir.join(format!("{}-run", args.name)).join("train");
    fs::create_dir_all(&log_dir)?;
    let mut logger = FileMetricLogger::new_train(&log_dir);

    let latest_path = output_dir.join(format!("{}.bin", args.name));
    let best_path = output_dir.join(format!("{}_best.bin", args.name));
    let evaluation_episodes = config.evaluation_episodes;

    let mut session = TrainingSession::new(config, approximator)?;
    println!("{}", report_header());
    let outcome = session.run(|report, snapshot| {
        println!("{}", format_report(report));
        snapshot.save(&latest_path)?;
        if report.improved {
            snapshot.save(&best_path)?;
        }
        if report.backup {
            let backup = output_dir.join(format!("{}_batch_{}.bin", args.name, report.batch));
            snapshot.save(&backup)?;
        }
        log_report(&mut logger, report, evaluation_episodes);
        Ok(())
    })?;

    println!();
    println!(
        "Best neural network found in batch {} (saved to {})",
        outcome.best_batch,
        display_path(&best_path)
    );

    if let Some(chart) = &args.chart {
        render_learning_curve(chart, &outcome.history)?;
        println!("Chart written to {}", display_path(chart));
    }
    Ok(())
}

fn validate_args(args: &TrainArgs) -> Result<(), Box<dyn Error>> {
    if args.hidden.is_empty() || args.hidden.contains(&0) {
        return Err("hidden layers must all have at least one unit".into());
    }
    if !args.learning_rate.is_finite() || args.learning_rate <= 0.0 {
        return Err("learning rate must be positive".into());
    }
    if args.name.is_empty() {
        return Err("checkpoint name must not be empty".into());
    }
    Ok(())
}

fn log_report(logger: &mut FileMetricLogger, report: &BatchReport, episodes: usize) {
    let summary = &report.summary;
    let values = [
        ("Loss", report.error),
        ("Mean Miss Distance", summary.mean_miss_distance),
        ("Mean Hits", summary.mean_hits),
        ("Epsilon", report.epsilon),
    ];
    for (name, value) in values {
        if !value.is_finite() {
            continue;
        }
        let entry = MetricEntry::new(
            name.to_string().into(),
            format!("batch {} {value:.6}", report.batch),
            format!("{value:.8},{episodes}"),
        );
        logger.log(&entry);
    }
    logger.end_epoch(report.batch + 1);
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn render_learning_curve(out: &Path, history: &[BatchReport]) -> Result<(), Box<dyn Error>> {
    let last_batch = history.last().map(|report| report.batch).unwrap_or(0) as f64;
    let max_distance = history
        .iter()
        .map(|report| report.summary.mean_miss_distance)
        .filter(|distance| distance.is_finite())
        .fold(0.0_f64, f64::max);

    let root = BitMapBackend::new(out, (1000, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| format!("{e}"))?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Mean miss distance per batch", ("sans-serif", 28).into_font())
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..last_batch.max(1.0), 0.0..(max_distance * 1.1).max(1.0))
        .map_err(|e| format!("{e}"))?;

    chart
        .configure_mesh()
        .x_desc("Batch")
        .y_desc("Mean miss distance")
        .y_label_formatter(&|v| format!("{v:.1}"))
        .draw()
        .map_err(|e| format!("{e}"))?;

    chart
        .draw_series(LineSeries::new(
            history
                .iter()
                .map(|report| (report.batch as f64, report.summary.mean_miss_distance)),
            &BLUE,
        ))
        .map_err(|e| format!("{e}"))?
        .label("evaluation")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));

    chart
        .draw_series(history.iter().filter(|report| report.improved).map(|report| {
            Circle::new(
                (report.batch as f64, report.summary.mean_miss_distance),
                4,
                RED.filled(),
            )
        }))
        .map_err(|e| format!("{e}"))?
        .label("new best")
        .legend(|(x, y)| Circle::new((x + 10, y), 4, RED.filled()));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(|e| format!("{e}"))?;

    root.present().map_err(|e| format!("{e}"))?;
    Ok(())
}
