use crate::{
    align::Differences,
    config::{ClassWeights, ScoringConfig},
    geometry::{MAX_PERCENT_CHANGE, MIN_PERCENT_CHANGE},
    pose::{BodyRegion, JointTriple},
};

/// Largest angle difference the normalization assumes per joint.
pub const MAX_ANGLE_DIFFERENCE: f64 = 180.0;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct RegionTotals {
    arm: f64,
    leg: f64,
    other: f64,
}

impl RegionTotals {
    fn get_mut(&mut self, region: BodyRegion) -> &mut f64 {
        match region {
            BodyRegion::Arm => &mut self.arm,
            BodyRegion::Leg => &mut self.leg,
            BodyRegion::Other => &mut self.other,
        }
    }

    /// Weighted sum of the per-region square roots.
    fn weighted_root(&self, weights: &ClassWeights) -> f64 {
        f64::from(weights.arm) * self.arm.sqrt()
            + f64::from(weights.leg) * self.leg.sqrt()
            + f64::from(weights.other) * self.other.sqrt()
    }
}

/// Running totals for a single scoring call.
#[derive(Debug, Default)]
struct ErrorAccumulator {
    frames: usize,
    rotation_frames: usize,
    angle_error: f64,
    rotation_error: f64,
    present: RegionTotals,
}

impl ErrorAccumulator {
    fn add_frame<'a, I>(&mut self, triples: &[JointTriple], differences: I, weights: &ClassWeights)
    where
        I: IntoIterator<Item = &'a Option<f32>>,
    {
        let mut squares = RegionTotals::default();
        for (triple, difference) in triples.iter().zip(differences) {
            if let Some(difference) = *difference {
                *squares.get_mut(triple.region) += f64::from(difference).powi(2);
                *self.present.get_mut(triple.region) += 1.0;
            }
        }
        self.angle_error += squares.weighted_root(weights);
        self.frames += 1;
    }

    fn add_rotation_frame<'a, I>(&mut self, differences: I, weights: &ClassWeights)
    where
        I: IntoIterator<Item = &'a f32>,
    {
        let multiplier = f64::from(weights.rotation_multiplier);
        let squares = differences
            .into_iter()
            .map(|&difference| (multiplier * f64::from(difference)).powi(2))
            .sum::<f64>();
        self.rotation_error += f64::from(weights.rotation) * squares.sqrt();
        self.rotation_frames += 1;
    }
}

/// Folds per-feature differences into a single score where 1 is a perfect match.
#[derive(Debug, Clone, Copy)]
pub struct ScoreAggregator<'a> {
    config: &'a ScoringConfig,
}

impl<'a> ScoreAggregator<'a> {
    pub fn new(config: &'a ScoringConfig) -> Self {
        Self { config }
    }

    /// Largest padded rotation difference two percent-change values can have.
    fn max_rotation_difference(&self) -> f64 {
        f64::from(MAX_PERCENT_CHANGE - MIN_PERCENT_CHANGE - self.config.rotation_padding).max(0.0)
    }

    /// Unclamped score. NaN when there are no frames or nothing could be
    /// measured, and negative when the error exceeds the assumed worst case.
    pub fn aggregate(&self, triples: &[JointTriple], differences: &Differences) -> f64 {
        let weights = &self.config.weights;
        let mut accumulator = ErrorAccumulator::default();

        for row in differences.angles.rows() {
            accumulator.add_frame(triples, row, weights);
        }
        for row in differences.rotations.rows() {
            accumulator.add_rotation_frame(row, weights);
        }

        if accumulator.present == RegionTotals::default() {
            return f64::NAN;
        }

        let frames = accumulator.frames as f64;
        let squared_max = MAX_ANGLE_DIFFERENCE.powi(2);

        // per-frame worst case: every visible key in a region off by 180 degrees,
        // i.e. sqrt(n * 180^2) with n the region's average visible key count
        let average_present = RegionTotals {
            arm: accumulator.present.arm / frames * squared_max,
            leg: accumulator.present.leg / frames * squared_max,
            other: accumulator.present.other / frames * squared_max,
        };
        let pairs = differences.rotations.ncols() as f64;
        let max_rotation_error = f64::from(weights.rotation)
            * f64::from(weights.rotation_multiplier)
            * self.max_rotation_difference()
            * pairs.sqrt()
            * (accumulator.rotation_frames as f64 / frames);
        let max_error = average_present.weighted_root(weights) + max_rotation_error;

        let mean_error = (accumulator.angle_error + accumulator.rotation_error) / frames;
        (max_error - mean_error) / max_error
    }
}
