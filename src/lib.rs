//! Scores a recorded dance or exercise attempt against a reference performance
//! by comparing joint angles from two pose-keypoint sequences.

pub mod aggregate;
pub mod align;
pub mod angles;
pub mod config;
pub mod error;
pub mod geometry;
pub mod point;
pub mod pose;
pub mod scoring;

pub use align::Mistake;
pub use config::{ClassWeights, ScoringConfig};
pub use error::Error;
pub use point::Point;
pub use pose::{JointName, Keypoint, PoseFrame, PoseSequence};
pub use scoring::{compute_score, ScoreResult, Scorer};
