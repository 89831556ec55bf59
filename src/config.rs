use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

pub const DEFAULT_WINDOW: usize = 3;
pub const DEFAULT_ANGLE_PADDING: f32 = 10.0;
pub const DEFAULT_ROTATION_PADDING: f32 = 0.1;
pub const DEFAULT_MISSING_JOINT_PENALTY: f32 = 90.0;
pub const DEFAULT_MISTAKE_THRESHOLD: f32 = 90.0;
pub const DEFAULT_MISTAKE_COOLDOWN_SECS: f64 = 0.5;
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.0;
pub const STRICT_MIN_CONFIDENCE: f32 = 0.2;

/// How much each body region and rotation contributes to the error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassWeights {
    pub arm: f32,
    pub leg: f32,
    pub other: f32,
    pub rotation: f32,
    /// Scales percent-change differences up to the magnitude of angle differences.
    pub rotation_multiplier: f32,
}

impl Default for ClassWeights {
    fn default() -> Self {
        Self {
            arm: 9.0,
            leg: 8.0,
            other: 0.5,
            rotation: 0.25,
            rotation_multiplier: 180.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Frames searched on either side of a reference frame.
    pub window: usize,
    /// Angle difference in degrees forgiven entirely.
    pub angle_padding: f32,
    /// Percent-change difference forgiven entirely.
    pub rotation_padding: f32,
    /// Difference charged when a joint angle is visible in only one sequence.
    pub missing_joint_penalty: f32,
    /// Best-match angle difference above which a frame is a mistake.
    pub mistake_threshold: f32,
    /// Minimum spacing between reported mistakes.
    pub mistake_cooldown_secs: f64,
    /// Keypoints at or below this confidence are treated as absent.
    pub min_confidence: f32,
    pub weights: ClassWeights,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            angle_padding: DEFAULT_ANGLE_PADDING,
            rotation_padding: DEFAULT_ROTATION_PADDING,
            missing_joint_penalty: DEFAULT_MISSING_JOINT_PENALTY,
            mistake_threshold: DEFAULT_MISTAKE_THRESHOLD,
            mistake_cooldown_secs: DEFAULT_MISTAKE_COOLDOWN_SECS,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            weights: ClassWeights::default(),
        }
    }
}

fn check_non_negative(name: &'static str, value: f32) -> Result<(), Error> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidConfig(
            name,
            format!("expected a finite, non-negative value, got {}", value),
        ))
    }
}

impl ScoringConfig {
    /// Defaults with the stricter per-joint confidence requirement.
    pub fn strict() -> Self {
        Self {
            min_confidence: STRICT_MIN_CONFIDENCE,
            ..Self::default()
        }
    }

    /// Read a TOML config file. Fields missing from the file keep their defaults.
    pub fn load<P>(path: P) -> Result<Self, Error>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).map_err(|e| Error::ReadConfig(e, path.to_path_buf()))?;
        let config: Self =
            toml::from_str(&content).map_err(|e| Error::ParseConfig(e, path.to_path_buf()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.window == 0 {
            return Err(Error::InvalidConfig(
                "window",
                "window must be at least one frame".to_owned(),
            ));
        }
        check_non_negative("angle_padding", self.angle_padding)?;
        check_non_negative("rotation_padding", self.rotation_padding)?;
        check_non_negative("missing_joint_penalty", self.missing_joint_penalty)?;
        check_non_negative("mistake_threshold", self.mistake_threshold)?;
        check_non_negative("min_confidence", self.min_confidence)?;
        check_non_negative("weights.arm", self.weights.arm)?;
        check_non_negative("weights.leg", self.weights.leg)?;
        check_non_negative("weights.other", self.weights.other)?;
        check_non_negative("weights.rotation", self.weights.rotation)?;
        check_non_negative(
            "weights.rotation_multiplier",
            self.weights.rotation_multiplier,
        )?;
        Duration::try_from_secs_f64(self.mistake_cooldown_secs)
            .map(|_| ())
            .map_err(|e| Error::InvalidConfig("mistake_cooldown_secs", e.to_string()))
    }

    /// Only meaningful on a validated config; invalid values map to zero.
    pub fn mistake_cooldown(&self) -> Duration {
        Duration::try_from_secs_f64(self.mistake_cooldown_secs).unwrap_or_default()
    }
}
