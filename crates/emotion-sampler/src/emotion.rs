//! Emotion labels and per-frame detections

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::DetectionError;

/// Supported facial expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happy,
    Sad,
    Angry,
    Neutral,
    /// Reported as "fearful" by most expression nets
    Anxious,
    Surprised,
    Disgusted,
}

impl Emotion {
    pub const COUNT: usize = 7;

    pub const ALL: [Emotion; Emotion::COUNT] = [
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Angry,
        Emotion::Neutral,
        Emotion::Anxious,
        Emotion::Surprised,
        Emotion::Disgusted,
    ];

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Angry => "angry",
            Emotion::Neutral => "neutral",
            Emotion::Anxious => "anxious",
            Emotion::Surprised => "surprised",
            Emotion::Disgusted => "disgusted",
        }
    }

    /// Map a model output label onto the closed set
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "happy" | "happiness" => Some(Emotion::Happy),
            "sad" | "sadness" => Some(Emotion::Sad),
            "angry" | "anger" => Some(Emotion::Angry),
            "neutral" => Some(Emotion::Neutral),
            "anxious" | "fearful" | "fear" => Some(Emotion::Anxious),
            "surprised" | "surprise" => Some(Emotion::Surprised),
            "disgusted" | "disgust" => Some(Emotion::Disgusted),
            _ => None,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = DetectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Emotion::from_label(s).ok_or_else(|| DetectionError::InvalidOutput(format!("unknown emotion label '{}'", s)))
    }
}

/// One value per emotion, missing labels are zero
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EmotionProbabilities([f64; Emotion::COUNT]);

impl EmotionProbabilities {
    pub fn get(&self, emotion: Emotion) -> f64 {
        self.0[emotion.index()]
    }

    pub fn set(&mut self, emotion: Emotion, value: f64) {
        self.0[emotion.index()] = value;
    }

    pub fn add(&mut self, emotion: Emotion, value: f64) {
        self.0[emotion.index()] += value;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Emotion, f64)> + '_ {
        Emotion::ALL.iter().map(move |&e| (e, self.get(e)))
    }

    /// Emotions sorted by descending value; ties keep declaration order
    pub fn ranked(&self) -> Vec<(Emotion, f64)> {
        let mut ranked: Vec<_> = self.iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}

impl FromIterator<(Emotion, f64)> for EmotionProbabilities {
    fn from_iter<I: IntoIterator<Item = (Emotion, f64)>>(iter: I) -> Self {
        let mut probs = Self::default();
        for (emotion, value) in iter {
            probs.set(emotion, value);
        }
        probs
    }
}

/// Untyped model output as produced by a face/expression network
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDetection {
    /// Face detector score
    pub score: f32,
    /// Expression label to probability
    pub expressions: HashMap<String, f32>,
}

impl RawDetection {
    pub fn new(score: f32) -> Self {
        Self {
            score,
            expressions: HashMap::new(),
        }
    }

    pub fn with(mut self, label: &str, probability: f32) -> Self {
        self.expressions.insert(label.to_string(), probability);
        self
    }
}

/// A validated detection for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameDetection {
    /// Face detector confidence in [0, 1]
    pub confidence: f64,
    /// Expression probabilities in [0, 1]
    pub probabilities: EmotionProbabilities,
}

fn check_unit(what: &str, value: f32) -> Result<f64, DetectionError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(f64::from(value))
    } else {
        Err(DetectionError::InvalidOutput(format!("{} {} outside [0, 1]", what, value)))
    }
}

impl TryFrom<RawDetection> for FrameDetection {
    type Error = DetectionError;

    fn try_from(raw: RawDetection) -> Result<Self, Self::Error> {
        let confidence = check_unit("confidence", raw.score)?;

        let mut probabilities = EmotionProbabilities::default();
        let mut seen = HashSet::new();
        for (label, p) in &raw.expressions {
            let emotion: Emotion = label.parse()?;
            if !seen.insert(emotion) {
                return Err(DetectionError::InvalidOutput(format!(
                    "label {} repeats {}",
                    label, emotion
                )));
            }
            probabilities.set(emotion, check_unit(label, *p)?);
        }

        Ok(Self {
            confidence,
            probabilities,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_mapping() {
        assert_eq!(Emotion::from_label("fearful"), Some(Emotion::Anxious));
        assert_eq!(Emotion::from_label(" Happy "), Some(Emotion::Happy));
        assert_eq!(Emotion::from_label("disgust"), Some(Emotion::Disgusted));
        assert_eq!(Emotion::from_label("contempt"), None);
    }

    #[test]
    fn test_raw_detection_validation() {
        let raw = RawDetection::new(0.9).with("happy", 0.7).with("fearful", 0.2);
        let det = FrameDetection::try_from(raw).unwrap();
        assert!((det.confidence - 0.9).abs() < 1e-6);
        assert!((det.probabilities.get(Emotion::Anxious) - 0.2).abs() < 1e-6);
        assert_eq!(det.probabilities.get(Emotion::Sad), 0.0);
    }

    #[test]
    fn test_rejects_unknown_label() {
        let raw = RawDetection::new(0.9).with("contempt", 0.5);
        assert!(matches!(
            FrameDetection::try_from(raw),
            Err(DetectionError::InvalidOutput(_))
        ));
    }

    #[test]
    fn test_rejects_aliased_labels() {
        let raw = RawDetection::new(0.9).with("fearful", 0.6).with("anxious", 0.1);
        assert!(matches!(
            FrameDetection::try_from(raw),
            Err(DetectionError::InvalidOutput(_))
        ));
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(FrameDetection::try_from(RawDetection::new(1.2)).is_err());
        assert!(FrameDetection::try_from(RawDetection::new(f32::NAN)).is_err());
        assert!(FrameDetection::try_from(RawDetection::new(0.5).with("sad", -0.1)).is_err());
    }

    #[test]
    fn test_ranked_ties_keep_order() {
        let probs: EmotionProbabilities =
            [(Emotion::Sad, 0.4), (Emotion::Angry, 0.4), (Emotion::Neutral, 0.1)]
                .into_iter()
                .collect();
        let ranked = probs.ranked();
        assert_eq!(ranked[0].0, Emotion::Sad);
        assert_eq!(ranked[1].0, Emotion::Angry);
        assert_eq!(ranked[2].0, Emotion::Neutral);
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Emotion::Anxious).unwrap(), "\"anxious\"");
    }
}
