use crate::{
    aggregate::ScoreAggregator,
    align::{Mistake, TemporalAligner},
    angles::AngleSeriesExtractor,
    config::ScoringConfig,
    error::Error,
    pose::{constants, JointTriple, PoseSequence, RotationPair, SequenceRole},
};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreResult {
    /// In `[0, 1]`, where 1 is a perfect match.
    pub score: f64,
    pub mistakes: Vec<Mistake>,
}

impl ScoreResult {
    pub fn mistake_timestamps(&self) -> Vec<Duration> {
        self.mistakes.iter().map(|mistake| mistake.timestamp).collect()
    }

    /// The score as a percentage rounded to two decimals. NaN reads as 0.
    pub fn percent(&self) -> f64 {
        if self.score.is_nan() {
            0.0
        } else {
            (self.score * 10_000.0).round() / 100.0
        }
    }
}

/// Clamp a raw aggregate into `[0, 1]`, mapping NaN to 0.
fn sanitize(raw: f64) -> f64 {
    if raw.is_nan() {
        0.0
    } else {
        raw.clamp(0.0, 1.0)
    }
}

/// Compares recorded attempts against a reference performance.
///
/// A `Scorer` holds no per-call state and can be shared between threads.
#[derive(Debug, Clone)]
pub struct Scorer {
    config: ScoringConfig,
    triples: &'static [JointTriple],
    pairs: &'static [RotationPair],
}

impl Scorer {
    pub fn new(config: ScoringConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            config,
            triples: &constants::JOINT_TRIPLES,
            pairs: &constants::ROTATION_PAIRS,
        })
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn score(
        &self,
        reference: &PoseSequence,
        recorded: &PoseSequence,
    ) -> Result<ScoreResult, Error> {
        if reference.is_empty() {
            return Err(Error::EmptySequence(SequenceRole::Reference));
        }
        if recorded.is_empty() {
            return Err(Error::EmptySequence(SequenceRole::Recorded));
        }

        let window = self.config.window;
        if reference.len() <= window || recorded.len() <= window {
            debug!(
                message = "too few frames to align",
                reference_frames = reference.len(),
                recorded_frames = recorded.len(),
                window,
            );
            return Ok(ScoreResult::default());
        }

        let extractor =
            AngleSeriesExtractor::new(self.triples, self.pairs, self.config.min_confidence);
        let reference_series = extractor.extract(reference);
        let recorded_series = extractor.extract(recorded);

        let differences = TemporalAligner::new(&self.config, self.triples)
            .align(&reference_series, &recorded_series);
        let raw = ScoreAggregator::new(&self.config).aggregate(self.triples, &differences);
        let score = sanitize(raw);
        if score.to_bits() != raw.to_bits() {
            warn!(message = "score out of range, clamping", raw, score);
        }

        debug!(
            message = "scored attempt",
            reference = reference.source(),
            recorded = recorded.source(),
            frames = differences.angles.nrows(),
            score,
            mistakes = differences.mistakes.len(),
        );

        Ok(ScoreResult {
            score,
            mistakes: differences.mistakes,
        })
    }
}

/// Score `recorded` against `reference` with the given configuration.
pub fn compute_score(
    reference: &PoseSequence,
    recorded: &PoseSequence,
    config: &ScoringConfig,
) -> Result<ScoreResult, Error> {
    Scorer::new(*config)?.score(reference, recorded)
}
