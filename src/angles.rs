use crate::{
    geometry::{angle_between, percent_distance_change},
    pose::{constants, JointTriple, PoseFrame, PoseSequence, RotationPair},
};
use ndarray::Array2;
use std::time::Duration;

/// Stored in place of an angle that could not be measured. Lies outside
/// `[0, 360)` so it can never collide with a real angle.
pub const INVALID_ANGLE: f32 = -42.0;

#[inline]
pub fn is_valid_angle(angle: f32) -> bool {
    (0.0..360.0).contains(&angle)
}

/// Per-frame joint angles and rotation proxies for one sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct AngleSeries {
    /// `frames x triples`, in degrees or [`INVALID_ANGLE`].
    pub angles: Array2<f32>,
    /// `(frames - 1) x pairs`; row `i` compares frame `i + 1` with frame `i`.
    pub rotations: Array2<f32>,
    pub timestamps: Vec<Duration>,
}

#[derive(Debug, Clone, Copy)]
pub struct AngleSeriesExtractor<'a> {
    triples: &'a [JointTriple],
    pairs: &'a [RotationPair],
    min_confidence: f32,
}

impl Default for AngleSeriesExtractor<'static> {
    fn default() -> Self {
        Self::new(
            &constants::JOINT_TRIPLES,
            &constants::ROTATION_PAIRS,
            crate::config::DEFAULT_MIN_CONFIDENCE,
        )
    }
}

impl<'a> AngleSeriesExtractor<'a> {
    pub fn new(triples: &'a [JointTriple], pairs: &'a [RotationPair], min_confidence: f32) -> Self {
        Self {
            triples,
            pairs,
            min_confidence,
        }
    }

    fn angle(&self, frame: &PoseFrame, triple: &JointTriple) -> f32 {
        let points = (
            frame.present(triple.a, self.min_confidence),
            frame.present(triple.b, self.min_confidence),
            frame.present(triple.c, self.min_confidence),
        );
        match points {
            (Some(a), Some(b), Some(c)) => {
                let angle = angle_between(a, b, c);
                // coincident joints give NaN
                if is_valid_angle(angle) {
                    angle
                } else {
                    INVALID_ANGLE
                }
            }
            _ => INVALID_ANGLE,
        }
    }

    fn rotation(&self, current: &PoseFrame, previous: &PoseFrame, pair: &RotationPair) -> f32 {
        let points = (
            current.present(pair.p, self.min_confidence),
            current.present(pair.q, self.min_confidence),
            previous.present(pair.p, self.min_confidence),
            previous.present(pair.q, self.min_confidence),
        );
        match points {
            (Some(cp), Some(cq), Some(pp), Some(pq)) => {
                percent_distance_change((cp, cq), (pp, pq))
            }
            _ => 0.0,
        }
    }

    pub fn extract(&self, sequence: &PoseSequence) -> AngleSeries {
        let frames = sequence.frames();
        let angles = Array2::from_shape_fn((frames.len(), self.triples.len()), |(i, k)| {
            self.angle(&frames[i], &self.triples[k])
        });
        let rotations = Array2::from_shape_fn(
            (frames.len().saturating_sub(1), self.pairs.len()),
            |(i, k)| self.rotation(&frames[i + 1], &frames[i], &self.pairs[k]),
        );
        AngleSeries {
            angles,
            rotations,
            timestamps: frames.iter().map(PoseFrame::start).collect(),
        }
    }
}
