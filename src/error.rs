use crate::pose::{JointName, SequenceRole};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0} pose sequence has no frames")]
    EmptySequence(SequenceRole),

    #[error("frame {index} starts at {current:?}, before the previous frame at {previous:?}")]
    UnorderedFrames {
        index: usize,
        previous: Duration,
        current: Duration,
    },

    #[error("failed to construct NotNan from f32: {1}")]
    ConstructNotNan(#[source] ordered_float::FloatIsNan, f32),

    #[error("failed to convert usize value to joint name: {0}")]
    ConvertUSizeToJointName(usize),

    #[error("failed to convert joint variant to usize: {0:?}")]
    JointVariantToUSize(JointName),

    #[error("frame start time must be a finite, non-negative number of seconds: {0}")]
    InvalidStartTime(f64),

    #[error("invalid scoring configuration for `{0}`: {1}")]
    InvalidConfig(&'static str, String),

    #[error("failed to read config file: {1:?}")]
    ReadConfig(#[source] std::io::Error, std::path::PathBuf),

    #[error("failed to parse config file: {1:?}")]
    ParseConfig(#[source] toml::de::Error, std::path::PathBuf),
}
