//! Confidence-weighted aggregation of frame detections

use serde::{Deserialize, Serialize};

use crate::emotion::{Emotion, EmotionProbabilities, FrameDetection};
use crate::SamplerError;

/// Final output of one sampling session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionEstimate {
    /// Highest weighted-average emotion
    pub primary: Emotion,
    /// Weighted-average probability of the primary emotion
    pub score: f64,
    /// Runner-up emotion
    pub secondary: Emotion,
    /// Mean detector confidence over accepted frames
    pub confidence: f64,
    /// Number of frames folded into the estimate
    pub frames: usize,
    /// Weighted-average probability of every emotion
    pub distribution: EmotionProbabilities,
}

/// Running sums over accepted frames
#[derive(Debug, Clone, Default)]
pub struct FrameAggregator {
    total_weight: f64,
    weighted: EmotionProbabilities,
    frames: usize,
}

impl FrameAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one accepted frame into the running sums
    pub fn push(&mut self, detection: &FrameDetection) {
        let weight = detection.confidence;
        self.total_weight += weight;
        for (emotion, p) in detection.probabilities.iter() {
            self.weighted.add(emotion, p * weight);
        }
        self.frames += 1;
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Discard everything collected so far
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Produce the estimate, or `InsufficientSamples` below `min_frames`
    pub fn finish(&self, min_frames: usize) -> Result<EmotionEstimate, SamplerError> {
        let required = min_frames.max(1);
        if self.frames < required || self.total_weight <= 0.0 {
            return Err(SamplerError::InsufficientSamples {
                accepted: self.frames,
                required,
            });
        }

        let distribution: EmotionProbabilities = self
            .weighted
            .iter()
            .map(|(emotion, sum)| (emotion, sum / self.total_weight))
            .collect();

        let ranked = distribution.ranked();
        let (primary, score) = ranked[0];
        let (secondary, _) = ranked[1];

        Ok(EmotionEstimate {
            primary,
            score,
            secondary,
            confidence: self.total_weight / self.frames as f64,
            frames: self.frames,
            distribution,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn detection(confidence: f64, probs: &[(Emotion, f64)]) -> FrameDetection {
        FrameDetection {
            confidence,
            probabilities: probs.iter().copied().collect(),
        }
    }

    #[test]
    fn test_weighted_average() {
        let mut agg = FrameAggregator::new();
        agg.push(&detection(1.0, &[(Emotion::Happy, 0.8), (Emotion::Sad, 0.2)]));
        agg.push(&detection(0.5, &[(Emotion::Happy, 0.2), (Emotion::Sad, 0.8)]));
        agg.push(&detection(0.5, &[(Emotion::Happy, 0.5), (Emotion::Sad, 0.5)]));
        agg.push(&detection(1.0, &[(Emotion::Happy, 0.6), (Emotion::Neutral, 0.4)]));
        agg.push(&detection(1.0, &[(Emotion::Happy, 0.7), (Emotion::Neutral, 0.3)]));

        let est = agg.finish(5).unwrap();
        // happy: (0.8 + 0.1 + 0.25 + 0.6 + 0.7) / 4.0
        assert!((est.score - 2.45 / 4.0).abs() < 1e-12);
        assert_eq!(est.primary, Emotion::Happy);
        // sad: (0.2 + 0.4 + 0.25) / 4 = 0.2125, neutral: 0.7 / 4 = 0.175
        assert_eq!(est.secondary, Emotion::Sad);
        assert!((est.confidence - 0.8).abs() < 1e-12);
        assert_eq!(est.frames, 5);
    }

    #[test]
    fn test_insufficient_samples() {
        let mut agg = FrameAggregator::new();
        for _ in 0..4 {
            agg.push(&detection(0.9, &[(Emotion::Happy, 1.0)]));
        }
        assert_eq!(
            agg.finish(5),
            Err(SamplerError::InsufficientSamples { accepted: 4, required: 5 })
        );
    }

    #[test]
    fn test_reset() {
        let mut agg = FrameAggregator::new();
        agg.push(&detection(0.9, &[(Emotion::Happy, 1.0)]));
        agg.reset();
        assert_eq!(agg.frames(), 0);
        assert_eq!(agg.total_weight(), 0.0);
    }

    fn frame_strategy() -> impl Strategy<Value = FrameDetection> {
        (0.3f64..=1.0, prop::collection::vec(0.0f64..=1.0, Emotion::COUNT)).prop_map(|(c, ps)| {
            FrameDetection {
                confidence: c,
                probabilities: Emotion::ALL.iter().copied().zip(ps).collect(),
            }
        })
    }

    proptest! {
        #[test]
        fn prop_weighted_average_matches_definition(
            frames in prop::collection::vec(frame_strategy(), 5..60)
        ) {
            let mut agg = FrameAggregator::new();
            for f in &frames {
                agg.push(f);
            }
            let est = agg.finish(5).unwrap();

            let w: f64 = frames.iter().map(|f| f.confidence).sum();
            for emotion in Emotion::ALL {
                let expected: f64 = frames
                    .iter()
                    .map(|f| f.probabilities.get(emotion) * f.confidence)
                    .sum::<f64>() / w;
                prop_assert!((est.distribution.get(emotion) - expected).abs() < 1e-9);
            }
            prop_assert!((est.confidence - w / frames.len() as f64).abs() < 1e-9);
            prop_assert!(est.score >= est.distribution.get(est.secondary));
            prop_assert!(est.primary != est.secondary);
        }

        #[test]
        fn prop_small_sets_never_emit(
            frames in prop::collection::vec(frame_strategy(), 0..5)
        ) {
            let mut agg = FrameAggregator::new();
            for f in &frames {
                agg.push(f);
            }
            let is_insufficient = matches!(
                agg.finish(5),
                Err(SamplerError::InsufficientSamples { .. })
            );
            prop_assert!(is_insufficient);
        }
    }
}
