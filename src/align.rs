use crate::{
    angles::{is_valid_angle, AngleSeries},
    config::ScoringConfig,
    pose::JointTriple,
};
use ndarray::{Array2, ArrayView2};
use serde::{Serialize, Serializer};
use std::time::Duration;
use tracing::trace;

/// The onset of a stretch where the recorded attempt diverged from the reference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Mistake {
    /// Start time of the offending frame in the recorded sequence.
    #[serde(serialize_with = "serialize_secs")]
    pub timestamp: Duration,
    /// The joint angle that crossed the mistake threshold.
    pub feature: JointTriple,
}

fn serialize_secs<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Per-frame, per-feature differences between two aligned angle series.
#[derive(Debug, Clone, PartialEq)]
pub struct Differences {
    /// `frames x triples`, after padding. `None` when neither sequence shows the angle.
    pub angles: Array2<Option<f32>>,
    /// `frames - 1 x pairs`, after padding.
    pub rotations: Array2<f32>,
    pub mistakes: Vec<Mistake>,
}

/// Matches each reference frame against nearby recorded frames so small
/// timing offsets between the two performances are not counted as error.
#[derive(Debug, Clone, Copy)]
pub struct TemporalAligner<'a> {
    config: &'a ScoringConfig,
    triples: &'a [JointTriple],
}

struct MistakeLog {
    cooldown: Duration,
    mistakes: Vec<Mistake>,
}

impl MistakeLog {
    fn cooled_down(&self, timestamp: Duration) -> bool {
        self.mistakes
            .last()
            .map_or(true, |last| timestamp.saturating_sub(last.timestamp) >= self.cooldown)
    }

    /// Record a mistake unless one was recorded within the cooldown. Returns
    /// whether it was recorded.
    fn record(&mut self, timestamp: Duration, feature: JointTriple) -> bool {
        if !self.cooled_down(timestamp) {
            return false;
        }
        trace!(message = "mistake onset", ?timestamp, %feature);
        self.mistakes.push(Mistake { timestamp, feature });
        true
    }
}

impl<'a> TemporalAligner<'a> {
    pub fn new(config: &'a ScoringConfig, triples: &'a [JointTriple]) -> Self {
        Self { config, triples }
    }

    /// Smallest difference between `reference_angle` and feature `k` of any
    /// recorded frame within the window around `i`.
    fn best_match(
        &self,
        reference_angle: f32,
        recorded: ArrayView2<f32>,
        i: usize,
        k: usize,
        frames: usize,
    ) -> f32 {
        let first = i.saturating_sub(self.config.window);
        let last = (i + self.config.window).min(frames - 1);
        recorded
            .column(k)
            .slice(ndarray::s![first..=last])
            .iter()
            .filter(|&&candidate| is_valid_angle(candidate))
            .map(|&candidate| (reference_angle - candidate).abs())
            .fold(f32::INFINITY, f32::min)
    }

    pub fn align(&self, reference: &AngleSeries, recorded: &AngleSeries) -> Differences {
        let frames = reference.angles.nrows().min(recorded.angles.nrows());
        let features = self.triples.len();
        let mut angles = Array2::from_elem((frames, features), None);
        let mut log = MistakeLog {
            cooldown: self.config.mistake_cooldown(),
            mistakes: Vec::new(),
        };

        for i in 0..frames {
            for (k, triple) in self.triples.iter().enumerate() {
                let reference_angle = reference.angles[(i, k)];
                let recorded_angle = recorded.angles[(i, k)];
                match (
                    is_valid_angle(reference_angle),
                    is_valid_angle(recorded_angle),
                ) {
                    (false, false) => {}
                    (true, false) | (false, true) => {
                        angles[(i, k)] = Some(self.config.missing_joint_penalty);
                    }
                    (true, true) => {
                        let difference =
                            self.best_match(reference_angle, recorded.angles.view(), i, k, frames);
                        angles[(i, k)] = Some((difference - self.config.angle_padding).max(0.0));
                        // the rest of a flagged frame is left unscored
                        if difference > self.config.mistake_threshold
                            && log.record(recorded.timestamps[i], *triple)
                        {
                            break;
                        }
                    }
                }
            }
        }

        let rotation_frames = reference.rotations.nrows().min(recorded.rotations.nrows());
        let pairs = reference.rotations.ncols().min(recorded.rotations.ncols());
        let padding = self.config.rotation_padding;
        let rotations = Array2::from_shape_fn((rotation_frames, pairs), |(i, k)| {
            ((reference.rotations[(i, k)] - recorded.rotations[(i, k)]).abs() - padding).max(0.0)
        });

        Differences {
            angles,
            rotations,
            mistakes: log.mistakes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        angles::AngleSeriesExtractor,
        pose::{constants::JOINT_TRIPLES, testing, JointName, PoseSequence},
    };
    use assert_approx_eq::assert_approx_eq;

    const STEP: Duration = Duration::from_millis(66);

    fn align(
        reference: &PoseSequence,
        recorded: &PoseSequence,
        config: &ScoringConfig,
    ) -> Differences {
        let extractor = AngleSeriesExtractor::default();
        TemporalAligner::new(config, &JOINT_TRIPLES)
            .align(&extractor.extract(reference), &extractor.extract(recorded))
    }

    #[test]
    fn identical_sequences_have_no_difference() {
        let sequence = testing::sequence(&[90.0, 100.0, 120.0, 150.0, 90.0], STEP);
        let differences = align(&sequence, &sequence, &ScoringConfig::default());
        assert!(differences.angles.iter().all(|&d| d == Some(0.0)));
        assert!(differences.rotations.iter().all(|&d| d == 0.0));
        assert!(differences.mistakes.is_empty());
    }

    #[test]
    fn frames_beyond_the_shorter_sequence_are_ignored() {
        let reference = testing::sequence(&[90.0; 8], STEP);
        let recorded = testing::sequence(&[90.0; 5], STEP);
        let differences = align(&reference, &recorded, &ScoringConfig::default());
        assert_eq!(differences.angles.nrows(), 5);
        assert_eq!(differences.rotations.nrows(), 4);
    }

    #[test]
    fn small_differences_are_forgiven() {
        let reference = testing::sequence(&[90.0; 5], STEP);
        let recorded = testing::sequence(&[95.0; 5], STEP);
        let differences = align(&reference, &recorded, &ScoringConfig::default());
        assert!(differences.angles.column(0).iter().all(|&d| d == Some(0.0)));
    }

    #[test]
    fn padding_is_subtracted() {
        let reference = testing::sequence(&[90.0; 5], STEP);
        let recorded = testing::sequence(&[140.0; 5], STEP);
        let differences = align(&reference, &recorded, &ScoringConfig::default());
        for d in differences.angles.column(0) {
            assert_approx_eq!(d.unwrap(), 40.0, 0.01);
        }
    }

    #[test]
    fn window_absorbs_timing_jitter() {
        let reference = testing::sequence(&[90.0; 8], STEP);
        let recorded =
            testing::sequence(&[90.0, 90.0, 90.0, 200.0, 90.0, 90.0, 90.0, 90.0], STEP);
        let differences = align(&reference, &recorded, &ScoringConfig::default());
        assert_eq!(differences.angles[(3, 0)], Some(0.0));
        assert!(differences.mistakes.is_empty());
    }

    #[test]
    fn window_is_bounded() {
        let reference = testing::sequence(&[90.0; 10], STEP);
        let recorded = testing::sequence(
            &[90.0, 90.0, 90.0, 90.0, 90.0, 140.0, 140.0, 140.0, 140.0, 140.0],
            STEP,
        );
        let differences = align(&reference, &recorded, &ScoringConfig::default());
        // frames 5..=7 still see a 90 degree frame within three frames
        for i in 5..8 {
            assert_eq!(differences.angles[(i, 0)], Some(0.0));
        }
        for i in 8..10 {
            assert_approx_eq!(differences.angles[(i, 0)].unwrap(), 40.0, 0.01);
        }
    }

    mod missing_joint_tests {
        use super::*;

        fn with_missing_wrist(sequence: &PoseSequence, frame: usize) -> PoseSequence {
            let mut frames = sequence.frames().to_vec();
            let stripped = testing::without(&frames[frame], JointName::LeftWrist);
            frames[frame] = stripped;
            PoseSequence::new(sequence.source(), frames).unwrap()
        }

        #[test]
        fn missing_in_recorded_is_penalized() {
            let reference = testing::sequence(&[90.0; 5], STEP);
            let recorded = with_missing_wrist(&reference, 2);
            let differences = align(&reference, &recorded, &ScoringConfig::default());
            assert_eq!(differences.angles[(2, 0)], Some(90.0));
            assert_eq!(differences.angles[(1, 0)], Some(0.0));
        }

        #[test]
        fn missing_in_reference_is_penalized() {
            let recorded = testing::sequence(&[90.0; 5], STEP);
            let reference = with_missing_wrist(&recorded, 2);
            let differences = align(&reference, &recorded, &ScoringConfig::default());
            assert_eq!(differences.angles[(2, 0)], Some(90.0));
        }

        #[test]
        fn missing_in_both_is_skipped() {
            let reference = with_missing_wrist(&testing::sequence(&[90.0; 5], STEP), 2);
            let differences = align(&reference, &reference, &ScoringConfig::default());
            assert_eq!(differences.angles[(2, 0)], None);
        }

        #[test]
        fn penalty_is_configurable() {
            let reference = testing::sequence(&[90.0; 5], STEP);
            let recorded = with_missing_wrist(&reference, 2);
            let config = ScoringConfig {
                missing_joint_penalty: 45.0,
                ..Default::default()
            };
            let differences = align(&reference, &recorded, &config);
            assert_eq!(differences.angles[(2, 0)], Some(45.0));
        }
    }

    mod mistake_tests {
        use super::*;

        fn at_millis(millis: &[u64]) -> Vec<Duration> {
            millis.iter().copied().map(Duration::from_millis).collect()
        }

        #[test]
        fn clustered_mistakes_are_merged() {
            let times = at_millis(&[0, 100, 600, 700, 800, 900]);
            let reference = testing::sequence_at(&times, &[90.0; 6]);
            let recorded = testing::sequence_at(&times, &[220.0; 6]);
            let differences = align(&reference, &recorded, &ScoringConfig::default());
            let timestamps = differences
                .mistakes
                .iter()
                .map(|mistake| mistake.timestamp)
                .collect::<Vec<_>>();
            assert_eq!(timestamps, at_millis(&[0, 600]));
            assert!(differences
                .mistakes
                .iter()
                .all(|mistake| mistake.feature == JOINT_TRIPLES[0]));
        }

        #[test]
        fn one_mistake_per_frame() {
            let times = at_millis(&[0, 1000, 2000, 3000, 4000]);
            let reference = testing::sequence_at(&times, &[90.0; 5]);
            let recorded = testing::sequence_at(&times, &[220.0; 5]);
            let config = ScoringConfig {
                mistake_cooldown_secs: 0.0,
                ..Default::default()
            };
            let differences = align(&reference, &recorded, &config);
            assert_eq!(differences.mistakes.len(), 5);
        }

        fn elbow_and_right_wrist_off(times: &[Duration]) -> PoseSequence {
            let frames = testing::sequence_at(times, &vec![220.0; times.len()])
                .frames()
                .iter()
                .map(|frame| testing::moved(frame, JointName::RightWrist, 0.75, 0.3))
                .collect();
            PoseSequence::new("two mistakes per frame", frames).unwrap()
        }

        #[test]
        fn keys_after_a_recorded_mistake_are_skipped() {
            let times = at_millis(&[0, 1000, 2000, 3000, 4000, 5000]);
            let reference = testing::sequence_at(&times, &[90.0; 6]);
            let recorded = elbow_and_right_wrist_off(&times);
            let config = ScoringConfig {
                mistake_cooldown_secs: 0.0,
                ..Default::default()
            };
            let differences = align(&reference, &recorded, &config);

            assert_eq!(differences.mistakes.len(), 6);
            for row in differences.angles.rows() {
                assert_approx_eq!(row[0].unwrap(), 120.0, 0.01);
                assert!(row.iter().skip(1).all(Option::is_none));
            }
        }

        #[test]
        fn keys_after_a_suppressed_trigger_are_scored() {
            let times = at_millis(&[0, 100, 200, 300, 400, 500]);
            let reference = testing::sequence_at(&times, &[90.0; 6]);
            let recorded = elbow_and_right_wrist_off(&times);
            let differences = align(&reference, &recorded, &ScoringConfig::default());

            assert_eq!(differences.mistakes.len(), 1);
            assert_eq!(differences.mistakes[0].timestamp, Duration::ZERO);
            assert_eq!(differences.mistakes[0].feature, JOINT_TRIPLES[0]);
            assert!(differences.angles[(0, 2)].is_none());
            for i in 1..6 {
                assert!(differences.angles.row(i).iter().all(Option::is_some));
                assert!(differences.angles[(i, 2)].unwrap() > 80.0);
            }
        }

        #[test]
        fn difference_below_threshold_is_not_a_mistake() {
            let reference = testing::sequence(&[90.0; 5], STEP);
            let recorded = testing::sequence(&[140.0; 5], STEP);
            let config = ScoringConfig {
                mistake_threshold: 60.0,
                ..Default::default()
            };
            assert!(align(&reference, &recorded, &config).mistakes.is_empty());
        }

        #[test]
        fn missing_joint_is_never_a_mistake() {
            let reference = testing::sequence(&[90.0; 5], STEP);
            let mut frames = reference.frames().to_vec();
            for frame in frames.iter_mut() {
                *frame = testing::without(frame, JointName::LeftWrist);
            }
            let recorded = PoseSequence::new("no wrist", frames).unwrap();
            let config = ScoringConfig {
                mistake_threshold: 10.0,
                ..Default::default()
            };
            assert!(align(&reference, &recorded, &config).mistakes.is_empty());
        }
    }
}
