use serde::{Deserialize, Serialize};

use crate::error::PulseError;
use crate::models::{landmark_index as idx, Landmark, LandmarkSet, PostureResult, PostureStatus};

/// Thresholds and penalty multipliers for the four posture rules
///
/// A rule fires when its measured offset is strictly greater than the
/// threshold. Its penalty is `offset * multiplier`, capped at `max_penalty`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostureThresholds {
    pub shoulder_diff: f64,
    pub shoulder_multiplier: f64,
    pub ear_offset: f64,
    pub ear_multiplier: f64,
    pub spine_offset: f64,
    pub spine_multiplier: f64,
    pub neck_offset: f64,
    pub neck_multiplier: f64,
    pub max_penalty: f64,
}

impl Default for PostureThresholds {
    fn default() -> Self {
        Self {
            shoulder_diff: 0.05,
            shoulder_multiplier: 200.0,
            ear_offset: 0.08,
            ear_multiplier: 150.0,
            spine_offset: 0.06,
            spine_multiplier: 150.0,
            neck_offset: 0.1,
            neck_multiplier: 100.0,
            max_penalty: 25.0,
        }
    }
}

pub const ISSUE_UNEVEN_SHOULDERS: &str = "Uneven shoulders";
pub const ISSUE_HEAD_FORWARD: &str = "Head forward posture";
pub const ISSUE_SPINE_MISALIGNMENT: &str = "Spine misalignment";
pub const ISSUE_NECK_TILT: &str = "Neck tilt detected";

/// The seven keypoints the rules read
struct Keypoints<'a> {
    nose: &'a Landmark,
    left_ear: &'a Landmark,
    right_ear: &'a Landmark,
    left_shoulder: &'a Landmark,
    right_shoulder: &'a Landmark,
    left_hip: &'a Landmark,
    right_hip: &'a Landmark,
}

impl<'a> Keypoints<'a> {
    fn extract(landmarks: &'a LandmarkSet) -> Result<Self, PulseError> {
        if landmarks.is_empty() {
            return Err(PulseError::InsufficientLandmarks("no landmarks in frame".into()));
        }

        for &i in idx::REQUIRED.iter() {
            match landmarks.get(i) {
                None => {
                    return Err(PulseError::InsufficientLandmarks(format!(
                        "missing landmark {} (frame has {})",
                        i,
                        landmarks.len()
                    )))
                }
                Some(p) if !p.x.is_finite() || !p.y.is_finite() => {
                    return Err(PulseError::InsufficientLandmarks(format!(
                        "landmark {} has non-finite coordinates",
                        i
                    )))
                }
                Some(_) => {}
            }
        }

        let at = |i: usize| &landmarks.0[i];
        Ok(Self {
            nose: at(idx::NOSE),
            left_ear: at(idx::LEFT_EAR),
            right_ear: at(idx::RIGHT_EAR),
            left_shoulder: at(idx::LEFT_SHOULDER),
            right_shoulder: at(idx::RIGHT_SHOULDER),
            left_hip: at(idx::LEFT_HIP),
            right_hip: at(idx::RIGHT_HIP),
        })
    }

    fn shoulder_mid_x(&self) -> f64 {
        (self.left_shoulder.x + self.right_shoulder.x) / 2.0
    }
}

/// Scores a single frame of pose landmarks
#[derive(Debug, Clone, Copy, Default)]
pub struct PostureScorer {
    thresholds: PostureThresholds,
}

impl PostureScorer {
    pub fn new(thresholds: PostureThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &PostureThresholds {
        &self.thresholds
    }

    /// Score one frame
    ///
    /// Starts at 100 and subtracts the penalty of every rule that fires:
    /// 1. Shoulder levelness (vertical gap between shoulders)
    /// 2. Head forward (mean ear-to-shoulder horizontal offset)
    /// 3. Spine alignment (shoulder midpoint over hip midpoint)
    /// 4. Neck tilt (nose over shoulder midpoint)
    ///
    /// Issues are listed in that order. The status is taken from the unrounded
    /// score.
    pub fn score(&self, landmarks: &LandmarkSet) -> Result<PostureResult, PulseError> {
        let kp = Keypoints::extract(landmarks)?;
        let t = &self.thresholds;

        let shoulder_diff = (kp.left_shoulder.y - kp.right_shoulder.y).abs();
        let ear_offset = ((kp.left_ear.x - kp.left_shoulder.x).abs()
            + (kp.right_ear.x - kp.right_shoulder.x).abs())
            / 2.0;
        let shoulder_mid_x = kp.shoulder_mid_x();
        let hip_mid_x = (kp.left_hip.x + kp.right_hip.x) / 2.0;
        let spine_offset = (shoulder_mid_x - hip_mid_x).abs();
        let neck_offset = (kp.nose.x - shoulder_mid_x).abs();

        let rules = [
            (shoulder_diff, t.shoulder_diff, t.shoulder_multiplier, ISSUE_UNEVEN_SHOULDERS),
            (ear_offset, t.ear_offset, t.ear_multiplier, ISSUE_HEAD_FORWARD),
            (spine_offset, t.spine_offset, t.spine_multiplier, ISSUE_SPINE_MISALIGNMENT),
            (neck_offset, t.neck_offset, t.neck_multiplier, ISSUE_NECK_TILT),
        ];

        let mut score = 100.0;
        let mut issues = Vec::new();
        for (measured, threshold, multiplier, issue) in rules {
            if measured > threshold {
                score -= (measured * multiplier).min(t.max_penalty);
                issues.push(issue.to_string());
            }
        }

        let status = if score >= 75.0 {
            PostureStatus::Good
        } else if score >= 50.0 {
            PostureStatus::Fair
        } else {
            PostureStatus::Poor
        };

        Ok(PostureResult {
            score: score.round().clamp(0.0, 100.0) as u8,
            issues,
            status,
        })
    }
}

/// Score a frame with the default thresholds
pub fn score_posture(landmarks: &LandmarkSet) -> Result<PostureResult, PulseError> {
    PostureScorer::default().score(landmarks)
}
