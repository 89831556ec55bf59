use crate::{error::Error, point::Point};
use num_traits::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize, Serializer};
use std::{collections::BTreeMap, convert::TryFrom, fmt, time::Duration};

#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    num_derive::FromPrimitive,
    num_derive::ToPrimitive,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum JointName {
    Nose,
    Neck,
    LeftShoulder,
    LeftElbow,
    LeftWrist,
    RightShoulder,
    RightElbow,
    RightWrist,
    Root,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
}

pub const NUM_JOINTS: usize = 19;

impl JointName {
    pub fn idx(self) -> Result<usize, Error> {
        self.to_usize().ok_or(Error::JointVariantToUSize(self))
    }

    pub fn from_idx(index: usize) -> Result<Self, Error> {
        Self::from_usize(index).ok_or(Error::ConvertUSizeToJointName(index))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::Neck => "neck",
            Self::LeftShoulder => "left_shoulder",
            Self::LeftElbow => "left_elbow",
            Self::LeftWrist => "left_wrist",
            Self::RightShoulder => "right_shoulder",
            Self::RightElbow => "right_elbow",
            Self::RightWrist => "right_wrist",
            Self::Root => "root",
            Self::LeftHip => "left_hip",
            Self::RightHip => "right_hip",
            Self::LeftKnee => "left_knee",
            Self::RightKnee => "right_knee",
            Self::LeftAnkle => "left_ankle",
            Self::RightAnkle => "right_ankle",
            Self::LeftEye => "left_eye",
            Self::RightEye => "right_eye",
            Self::LeftEar => "left_ear",
            Self::RightEar => "right_ear",
        }
    }
}

impl fmt::Display for JointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawKeypoint")]
pub struct Keypoint {
    pub point: Point,
    pub confidence: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, confidence: f32) -> Result<Self, Error> {
        Ok(Self {
            point: Point::new(x, y)?,
            confidence,
        })
    }

    /// Whether the detector was confident enough in this keypoint for it to be used.
    ///
    /// The comparison is strict: a keypoint with confidence equal to
    /// `min_confidence` counts as absent.
    pub fn is_present(&self, min_confidence: f32) -> bool {
        self.confidence > min_confidence
    }
}

#[derive(Deserialize)]
struct RawKeypoint {
    x: f32,
    y: f32,
    confidence: f32,
}

impl TryFrom<RawKeypoint> for Keypoint {
    type Error = Error;

    fn try_from(raw: RawKeypoint) -> Result<Self, Self::Error> {
        Self::new(raw.x, raw.y, raw.confidence)
    }
}

pub type Keypoints = [Option<Keypoint>; NUM_JOINTS];

/// A single detected pose. Joints the detector did not report are `None`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawPoseFrame")]
pub struct PoseFrame {
    start: Duration,
    keypoints: Keypoints,
}

impl PoseFrame {
    pub fn new<I>(start: Duration, points: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (JointName, Keypoint)>,
    {
        let mut keypoints: Keypoints = Default::default();
        for (joint, keypoint) in points {
            keypoints[joint.idx()?] = Some(keypoint);
        }
        Ok(Self { start, keypoints })
    }

    pub fn start(&self) -> Duration {
        self.start
    }

    pub fn keypoints(&self) -> &Keypoints {
        &self.keypoints
    }

    pub fn get(&self, joint: JointName) -> Option<&Keypoint> {
        joint
            .idx()
            .ok()
            .and_then(|index| self.keypoints[index].as_ref())
    }

    /// Location of `joint` if it was detected with confidence above `min_confidence`.
    pub fn present(&self, joint: JointName, min_confidence: f32) -> Option<Point> {
        self.get(joint)
            .filter(|keypoint| keypoint.is_present(min_confidence))
            .map(|keypoint| keypoint.point)
    }
}

#[derive(Deserialize)]
struct RawPoseFrame {
    start: f64,
    #[serde(default)]
    keypoints: BTreeMap<JointName, Keypoint>,
}

impl TryFrom<RawPoseFrame> for PoseFrame {
    type Error = Error;

    fn try_from(raw: RawPoseFrame) -> Result<Self, Self::Error> {
        let start =
            Duration::try_from_secs_f64(raw.start).map_err(|_| Error::InvalidStartTime(raw.start))?;
        Self::new(start, raw.keypoints)
    }
}

/// Time-ordered poses detected in one video.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawPoseSequence")]
pub struct PoseSequence {
    source: String,
    frames: Vec<PoseFrame>,
}

impl PoseSequence {
    /// Build a sequence, checking that frame start times never decrease.
    pub fn new<S>(source: S, frames: Vec<PoseFrame>) -> Result<Self, Error>
    where
        S: Into<String>,
    {
        for (index, pair) in frames.windows(2).enumerate() {
            let (previous, current) = (pair[0].start, pair[1].start);
            if current < previous {
                return Err(Error::UnorderedFrames {
                    index: index + 1,
                    previous,
                    current,
                });
            }
        }
        Ok(Self {
            source: source.into(),
            frames,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn frames(&self) -> &[PoseFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[derive(Deserialize)]
struct RawPoseSequence {
    #[serde(default)]
    source: String,
    frames: Vec<PoseFrame>,
}

impl TryFrom<RawPoseSequence> for PoseSequence {
    type Error = Error;

    fn try_from(raw: RawPoseSequence) -> Result<Self, Self::Error> {
        Self::new(raw.source, raw.frames)
    }
}

/// Which side of a comparison a sequence plays.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SequenceRole {
    Reference,
    Recorded,
}

impl fmt::Display for SequenceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Reference => "reference",
            Self::Recorded => "recorded",
        })
    }
}

/// Weight class a joint angle is scored under.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BodyRegion {
    Arm,
    Leg,
    Other,
}

/// An angle measured at `b`, between the rays `b -> a` and `b -> c`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JointTriple {
    pub a: JointName,
    pub b: JointName,
    pub c: JointName,
    pub region: BodyRegion,
}

impl fmt::Display for JointTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.a, self.b, self.c)
    }
}

impl Serialize for JointTriple {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Two joints whose frame-to-frame change in separation approximates rotation
/// of the body about `axis`. The axis only labels the pair; scoring treats all
/// pairs alike.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct RotationPair {
    pub p: JointName,
    pub q: JointName,
    pub axis: &'static str,
}

pub mod constants {
    use crate::pose::{
        BodyRegion::{self, *},
        JointName::{self, *},
        JointTriple, RotationPair,
    };

    const fn triple(a: JointName, b: JointName, c: JointName, region: BodyRegion) -> JointTriple {
        JointTriple { a, b, c, region }
    }

    // right-side triples list their joints mirrored so both sides measure the
    // same anatomical angle
    pub const JOINT_TRIPLES: [JointTriple; 12] = [
        // arms
        triple(LeftShoulder, LeftElbow, LeftWrist, Arm),
        triple(Neck, LeftShoulder, LeftElbow, Arm),
        triple(RightWrist, RightElbow, RightShoulder, Arm),
        triple(RightElbow, RightShoulder, Neck, Arm),
        // legs
        triple(LeftHip, LeftKnee, LeftAnkle, Leg),
        triple(Root, LeftHip, LeftKnee, Leg),
        triple(RightAnkle, RightKnee, RightHip, Leg),
        triple(RightKnee, RightHip, Root, Leg),
        // neck and torso
        triple(LeftShoulder, Neck, Nose, Other),
        triple(Nose, Neck, RightShoulder, Other),
        triple(Neck, Root, LeftHip, Other),
        triple(RightHip, Root, Neck, Other),
    ];

    pub const ROTATION_PAIRS: [RotationPair; 3] = [
        RotationPair {
            p: LeftShoulder,
            q: RightShoulder,
            axis: "y",
        },
        RotationPair {
            p: LeftHip,
            q: RightHip,
            axis: "y",
        },
        RotationPair {
            p: Neck,
            q: Root,
            axis: "x",
        },
    ];
}
