use anyhow::{anyhow, bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use pose_score::{config::STRICT_MIN_CONFIDENCE, PoseSequence, ScoreResult, Scorer, ScoringConfig};
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::mpsc::channel,
    time::Duration,
};
use structopt::StructOpt;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;

#[derive(structopt::StructOpt)]
struct Opt {
    /// Pose sequence of the reference performance, as JSON.
    reference: PathBuf,

    /// Pose sequences of the recorded attempts to score, as JSON.
    #[structopt(required = true)]
    recorded: Vec<PathBuf>,

    /// TOML file with scoring parameters.
    #[structopt(short, long)]
    config: Option<PathBuf>,

    /// Only use joints detected with confidence above 0.2.
    #[structopt(short, long)]
    strict: bool,

    /// Frames searched on either side of each reference frame.
    #[structopt(short, long)]
    window: Option<usize>,

    /// Angle difference in degrees that is forgiven entirely.
    #[structopt(short = "p", long)]
    angle_padding: Option<f32>,

    #[structopt(short, long, default_value = "info", env = "RUST_LOG")]
    log_level: tracing_subscriber::filter::EnvFilter,

    /// Print results as JSON.
    #[structopt(short, long)]
    json: bool,

    #[structopt(long)]
    show_progress: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    recorded: &'a Path,
    percent: f64,
    #[serde(flatten)]
    result: &'a ScoreResult,
}

fn read_sequence(path: &Path) -> Result<PoseSequence> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read pose sequence {:?}", path))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse pose sequence {:?}", path))
}

fn scoring_config(opt: &Opt) -> Result<ScoringConfig> {
    let mut config = match &opt.config {
        Some(path) => ScoringConfig::load(path).context("failed to load scoring config")?,
        None => ScoringConfig::default(),
    };
    if opt.strict {
        config.min_confidence = STRICT_MIN_CONFIDENCE;
    }
    if let Some(window) = opt.window {
        config.window = window;
    }
    if let Some(angle_padding) = opt.angle_padding {
        config.angle_padding = angle_padding;
    }
    Ok(config)
}

fn format_timestamp(timestamp: Duration) -> String {
    let secs = timestamp.as_secs_f64();
    format!("{:02}:{:05.2}", timestamp.as_secs() / 60, secs % 60.0)
}

fn print_text(path: &Path, result: &ScoreResult) {
    println!(
        "{}: {:.2}% ({} mistakes)",
        path.display(),
        result.percent(),
        result.mistakes.len()
    );
    for mistake in &result.mistakes {
        println!(
            "  {}  {}",
            format_timestamp(mistake.timestamp),
            mistake.feature
        );
    }
}

fn main() -> Result<()> {
    let opt = Opt::from_args();
    let config = scoring_config(&opt)?;

    tracing::subscriber::set_global_default(
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .with(opt.log_level),
    )?;

    let scorer = Scorer::new(config).context("invalid scoring configuration")?;
    let reference = read_sequence(&opt.reference)?;

    info!(
        message = "loaded reference",
        source = reference.source(),
        frames = reference.len(),
        attempts = opt.recorded.len(),
    );

    let pb = if opt.show_progress {
        Some(
            ProgressBar::new(opt.recorded.len() as u64).with_style(
                ProgressStyle::default_spinner()
                    .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
                    .template("{prefix:.bold.dim} {spinner} {pos}/{len} {wide_msg}"),
            ),
        )
    } else {
        None
    };

    let (results_tx, results_rx) = channel();
    let mut results: Vec<Option<Result<ScoreResult>>> =
        std::iter::repeat_with(|| None).take(opt.recorded.len()).collect();

    crossbeam::thread::scope(|scope| {
        for (index, path) in opt.recorded.iter().enumerate() {
            let results_tx = results_tx.clone();
            let scorer = &scorer;
            let reference = &reference;
            scope.spawn(move |_| {
                let result = read_sequence(path).and_then(|recorded| {
                    scorer
                        .score(reference, &recorded)
                        .with_context(|| format!("failed to score {:?}", path))
                });
                results_tx.send((index, result))?;
                Ok::<_, anyhow::Error>(())
            });
        }
        drop(results_tx);

        for (index, result) in results_rx.iter() {
            if let Some(pb) = pb.as_ref() {
                pb.set_message(opt.recorded[index].display().to_string());
                pb.inc(1);
            }
            results[index] = Some(result);
        }
    })
    .map_err(|_| anyhow!("scoring thread panicked"))?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let mut reports = Vec::with_capacity(results.len());
    let mut failed = 0;
    for (path, result) in opt.recorded.iter().zip(&results) {
        match result {
            Some(Ok(result)) => reports.push(Report {
                recorded: path,
                percent: result.percent(),
                result,
            }),
            Some(Err(e)) => {
                error!(message = "failed to score attempt", error = ?e);
                failed += 1;
            }
            None => {
                error!(message = "no result for attempt", path = ?path);
                failed += 1;
            }
        }
    }

    if opt.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            print_text(report.recorded, report.result);
        }
    }

    if failed > 0 {
        bail!("{} of {} attempts could not be scored", failed, results.len());
    }
    Ok(())
}
