//! Questionnaire + emotion risk scoring

use std::collections::BTreeMap;

use chrono::Utc;
use emotion_sampler::{Emotion, EmotionEstimate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::questionnaire::{Category, Question, ResponseSet};
use crate::result::{AssessmentResult, CategoryMetric, Improvement, Interpretation, RiskLevel};
use crate::RiskError;

/// Scores are snapped to this many decimal places before classification,
/// so 0.35 and 0.65 land on the documented side of each threshold.
const SCORE_DECIMALS: i32 = 9;

fn snap(score: f64) -> f64 {
    let scale = 10f64.powi(SCORE_DECIMALS);
    (score * scale).round() / scale
}

/// Scoring weights and thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Weight of the questionnaire score (default: 0.8)
    pub questionnaire_weight: f64,
    /// Weight of the emotion modifier (default: 0.2)
    pub emotion_weight: f64,
    /// Risk below this is low (default: 0.35)
    pub low_risk_below: f64,
    /// Risk from this upward is high (default: 0.65)
    pub high_risk_from: f64,
    /// Normalized category score above this is strong (default: 0.7)
    pub strong_above: f64,
    /// Normalized category score above this is moderate (default: 0.4)
    pub moderate_above: f64,
    /// Modifier for missing or unlisted emotions (default: 0.85)
    pub default_modifier: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            questionnaire_weight: 0.8,
            emotion_weight: 0.2,
            low_risk_below: 0.35,
            high_risk_from: 0.65,
            strong_above: 0.7,
            moderate_above: 0.4,
            default_modifier: 0.85,
        }
    }
}

impl RiskConfig {
    /// Half-open: [0, low) low, [low, high) moderate, [high, 1] high
    pub fn risk_level(&self, risk_score: f64) -> RiskLevel {
        if risk_score < self.low_risk_below {
            RiskLevel::Low
        } else if risk_score < self.high_risk_from {
            RiskLevel::Moderate
        } else {
            RiskLevel::High
        }
    }

    pub fn interpretation(&self, normalized: f64) -> Interpretation {
        if normalized > self.strong_above {
            Interpretation::Strong
        } else if normalized > self.moderate_above {
            Interpretation::Moderate
        } else {
            Interpretation::NeedsAttention
        }
    }

    pub fn emotion_modifier(&self, emotion: Option<Emotion>) -> f64 {
        match emotion {
            Some(Emotion::Happy) => 1.0,
            Some(Emotion::Neutral) => 0.95,
            Some(Emotion::Sad) => 0.7,
            Some(Emotion::Anxious) => 0.72,
            Some(Emotion::Angry) => 0.7,
            _ => self.default_modifier,
        }
    }
}

impl RiskLevel {
    /// Classify with the default thresholds
    pub fn from_score(risk_score: f64) -> Self {
        RiskConfig::default().risk_level(risk_score)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RiskAggregator {
    config: RiskConfig,
}

impl RiskAggregator {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Score the active question subset against the responses.
    ///
    /// Every active question must be answered; responses outside the
    /// subset are ignored.
    pub fn assess(
        &self,
        questions: &[Question],
        responses: &ResponseSet,
        emotion: Option<&EmotionEstimate>,
    ) -> Result<AssessmentResult, RiskError> {
        let metrics = self.category_metrics(questions, responses)?;

        let questionnaire_score = metrics.iter().map(|m| m.score).sum::<f64>() / metrics.len() as f64;
        let emotion_modifier = self.config.emotion_modifier(emotion.map(|e| e.primary));
        let overall_score = snap(
            (questionnaire_score * self.config.questionnaire_weight
                + emotion_modifier * self.config.emotion_weight)
                .clamp(0.0, 1.0),
        );
        let risk_score = snap(1.0 - overall_score);
        let risk_level = self.config.risk_level(risk_score);

        info!(
            "Assessment scored: questionnaire {:.3}, modifier {:.2}, combined {:.3}, risk {:.3} ({})",
            questionnaire_score, emotion_modifier, overall_score, risk_score, risk_level
        );

        Ok(AssessmentResult {
            questionnaire_score,
            overall_score,
            risk_score,
            risk_level,
            emotion: emotion.cloned(),
            emotion_modifier,
            metrics,
            created_at: Utc::now(),
            improvement: None,
        })
    }

    /// Score a follow-up round and compare it to the baseline combined score
    pub fn reassess(
        &self,
        questions: &[Question],
        responses: &ResponseSet,
        emotion: Option<&EmotionEstimate>,
        baseline_score: f64,
        activities: &[String],
    ) -> Result<AssessmentResult, RiskError> {
        let mut result = self.assess(questions, responses, emotion)?;
        let improvement = Improvement {
            previous_score: baseline_score,
            current_score: result.overall_score,
            change_percent: result.overall_score - baseline_score,
            activities: activities.to_vec(),
        };
        info!(
            "Follow-up change {:+.3} after {} activities",
            improvement.change_percent,
            improvement.activities.len()
        );
        result.improvement = Some(improvement);
        Ok(result)
    }

    fn category_metrics(
        &self,
        questions: &[Question],
        responses: &ResponseSet,
    ) -> Result<Vec<CategoryMetric>, RiskError> {
        let mut buckets: BTreeMap<Category, Vec<u8>> = BTreeMap::new();
        for question in questions {
            let answer = responses
                .get(&question.id)
                .ok_or_else(|| RiskError::MissingResponse(question.id.clone()))?;
            buckets.entry(question.category).or_default().push(answer.value());
        }

        if buckets.is_empty() {
            return Err(RiskError::EmptyResponseSet);
        }

        let metrics = buckets
            .into_iter()
            .map(|(category, answers)| {
                let average = answers.iter().map(|&a| f64::from(a)).sum::<f64>() / answers.len() as f64;
                let score = (average - 1.0) / 4.0;
                let interpretation = self.config.interpretation(score);

                let mut recommendations = vec![interpretation.recommendation().to_string()];
                if interpretation != Interpretation::Strong {
                    recommendations.push(category.focus_tip().to_string());
                }

                debug!(
                    "Category {}: avg {:.2}, normalized {:.3} ({})",
                    category, average, score, interpretation
                );
                CategoryMetric {
                    category,
                    average,
                    score,
                    interpretation,
                    recommendations,
                }
            })
            .collect();

        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::questionnaire::{Answer, QuestionBank};
    use emotion_sampler::EmotionProbabilities;
    use proptest::prelude::*;

    /// q6..q15: five sleep and five anxiety questions
    fn two_category_round() -> Vec<Question> {
        let ids: Vec<String> = (6..=15).map(|i| format!("q{}", i)).collect();
        QuestionBank::standard().select(&ids).unwrap()
    }

    fn answer_all(questions: &[Question], value: i64) -> ResponseSet {
        questions
            .iter()
            .map(|q| (q.id.clone(), Answer::new(value).unwrap()))
            .collect()
    }

    fn estimate(primary: Emotion) -> EmotionEstimate {
        EmotionEstimate {
            primary,
            score: 0.7,
            secondary: Emotion::Neutral,
            confidence: 0.9,
            frames: 30,
            distribution: EmotionProbabilities::default(),
        }
    }

    #[test]
    fn test_all_fives() {
        let questions = two_category_round();
        let result = RiskAggregator::default()
            .assess(&questions, &answer_all(&questions, 5), None)
            .unwrap();
        assert!(result.metrics.iter().all(|m| (m.score - 1.0).abs() < 1e-12));
        assert!((result.questionnaire_score - 1.0).abs() < 1e-12);
        assert!(result.metrics.iter().all(|m| m.interpretation == Interpretation::Strong));
    }

    #[test]
    fn test_all_ones() {
        let questions = two_category_round();
        let result = RiskAggregator::default()
            .assess(&questions, &answer_all(&questions, 1), None)
            .unwrap();
        assert!(result.questionnaire_score.abs() < 1e-12);
        assert_eq!(result.metrics[0].interpretation, Interpretation::NeedsAttention);
        // 0.85 * 0.2 = 0.17 combined
        assert_eq!(result.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_midscale_without_emotion() {
        let questions = two_category_round();
        let result = RiskAggregator::default()
            .assess(&questions, &answer_all(&questions, 3), None)
            .unwrap();

        assert_eq!(result.metrics.len(), 2);
        assert!(result.metrics.iter().all(|m| (m.score - 0.5).abs() < 1e-12));
        assert!((result.questionnaire_score - 0.5).abs() < 1e-12);
        assert!((result.emotion_modifier - 0.85).abs() < 1e-12);
        assert!((result.overall_score - 0.57).abs() < 1e-9);
        assert!((result.risk_score - 0.43).abs() < 1e-9);
        assert_eq!(result.risk_level, RiskLevel::Moderate);
    }

    #[test]
    fn test_midscale_with_happy_emotion() {
        let questions = two_category_round();
        let happy = estimate(Emotion::Happy);
        let result = RiskAggregator::default()
            .assess(&questions, &answer_all(&questions, 3), Some(&happy))
            .unwrap();

        assert!((result.overall_score - 0.6).abs() < 1e-9);
        assert!((result.risk_score - 0.4).abs() < 1e-9);
        assert_eq!(result.risk_level, RiskLevel::Moderate);
        assert_eq!(result.emotion.as_ref().map(|e| e.primary), Some(Emotion::Happy));
    }

    #[test]
    fn test_risk_level_boundaries() {
        assert_eq!(RiskLevel::from_score(0.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(0.3499), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(0.35), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_score(0.6499), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_score(0.65), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(1.0), RiskLevel::High);
    }

    fn sleep_round(answers: [i64; 4]) -> (Vec<Question>, ResponseSet) {
        let questions = QuestionBank::standard().select(&["q6", "q7", "q8", "q9"]).unwrap();
        let responses = questions
            .iter()
            .zip(answers)
            .map(|(q, a)| (q.id.clone(), Answer::new(a).unwrap()))
            .collect();
        (questions, responses)
    }

    #[test]
    fn test_assessed_risk_on_high_boundary() {
        // normalized 0.1875: 0.15 + 0.2 combined, risk exactly 0.65
        let (questions, responses) = sleep_round([2, 2, 2, 1]);
        let happy = estimate(Emotion::Happy);
        let result = RiskAggregator::default()
            .assess(&questions, &responses, Some(&happy))
            .unwrap();

        assert_eq!(result.risk_score, 0.65);
        assert_eq!(result.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_assessed_risk_on_low_boundary() {
        // normalized 0.5625: 0.45 + 0.2 combined, risk exactly 0.35
        let (questions, responses) = sleep_round([3, 3, 3, 4]);
        let happy = estimate(Emotion::Happy);
        let result = RiskAggregator::default()
            .assess(&questions, &responses, Some(&happy))
            .unwrap();

        assert_eq!(result.risk_score, 0.35);
        assert_eq!(result.risk_level, RiskLevel::Moderate);
    }

    #[test]
    fn test_interpretation_boundaries() {
        let config = RiskConfig::default();
        assert_eq!(config.interpretation(0.7), Interpretation::Moderate);
        assert_eq!(config.interpretation(0.75), Interpretation::Strong);
        assert_eq!(config.interpretation(0.4), Interpretation::NeedsAttention);
        assert_eq!(config.interpretation(0.5), Interpretation::Moderate);
    }

    #[test]
    fn test_emotion_modifiers() {
        let config = RiskConfig::default();
        assert_eq!(config.emotion_modifier(Some(Emotion::Happy)), 1.0);
        assert_eq!(config.emotion_modifier(Some(Emotion::Neutral)), 0.95);
        assert_eq!(config.emotion_modifier(Some(Emotion::Sad)), 0.7);
        assert_eq!(config.emotion_modifier(Some(Emotion::Anxious)), 0.72);
        assert_eq!(config.emotion_modifier(Some(Emotion::Angry)), 0.7);
        assert_eq!(config.emotion_modifier(Some(Emotion::Surprised)), 0.85);
        assert_eq!(config.emotion_modifier(Some(Emotion::Disgusted)), 0.85);
        assert_eq!(config.emotion_modifier(None), 0.85);
    }

    #[test]
    fn test_missing_response() {
        let questions = two_category_round();
        let mut responses = answer_all(&questions, 4);
        responses = responses.iter().filter(|(id, _)| *id != "q9").map(|(id, a)| (id.to_string(), a)).collect();

        assert_eq!(
            RiskAggregator::default().assess(&questions, &responses, None),
            Err(RiskError::MissingResponse("q9".into()))
        );
    }

    #[test]
    fn test_empty_round() {
        assert_eq!(
            RiskAggregator::default().assess(&[], &ResponseSet::new(), None),
            Err(RiskError::EmptyResponseSet)
        );
    }

    #[test]
    fn test_extra_responses_ignored() {
        let questions = two_category_round();
        let mut responses = answer_all(&questions, 3);
        responses.answer("q90", Answer::new(1).unwrap());

        let result = RiskAggregator::default().assess(&questions, &responses, None).unwrap();
        assert!(result.metric(Category::Growth).is_none());
        assert!((result.questionnaire_score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_recommendations_follow_bucket() {
        let questions = two_category_round();
        let mut responses = answer_all(&questions, 5);
        for id in ["q11", "q12", "q13", "q14", "q15"] {
            responses.answer(id, Answer::new(2).unwrap());
        }

        let result = RiskAggregator::default().assess(&questions, &responses, None).unwrap();
        let sleep = result.metric(Category::Sleep).unwrap();
        assert_eq!(sleep.recommendations, vec!["Maintain habits".to_string()]);

        let anxiety = result.metric(Category::Anxiety).unwrap();
        assert_eq!(anxiety.interpretation, Interpretation::NeedsAttention);
        assert_eq!(anxiety.recommendations[0], "Consider professional help");
        assert_eq!(anxiety.recommendations[1], Category::Anxiety.focus_tip());
        assert_eq!(result.recommendations().len(), 3);
    }

    #[test]
    fn test_reassess_improvement() {
        let aggregator = RiskAggregator::default();
        let questions = two_category_round();
        let baseline = aggregator
            .assess(&questions, &answer_all(&questions, 3), None)
            .unwrap();

        let happy = estimate(Emotion::Happy);
        let activities = vec!["Deep Breathing Exercise".to_string(), "Gratitude Practice".to_string()];
        let follow_up = aggregator
            .reassess(
                &questions,
                &answer_all(&questions, 4),
                Some(&happy),
                baseline.overall_score,
                &activities,
            )
            .unwrap();

        let improvement = follow_up.improvement.as_ref().unwrap();
        assert!((improvement.previous_score - 0.57).abs() < 1e-9);
        // 0.75 * 0.8 + 1.0 * 0.2
        assert!((improvement.current_score - 0.8).abs() < 1e-9);
        assert!((improvement.change_percent - 0.23).abs() < 1e-9);
        assert_eq!(improvement.activities, activities);
        assert_eq!(follow_up.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_result_json_shape() {
        let questions = two_category_round();
        let result = RiskAggregator::default()
            .assess(&questions, &answer_all(&questions, 2), None)
            .unwrap();
        let json = serde_json::to_value(&result).unwrap();
        // 0.25 * 0.8 + 0.85 * 0.2 = 0.37
        assert_eq!(json["risk_level"], "moderate");
        assert_eq!(json["metrics"][0]["interpretation"], "Needs Attention");
        assert!(json.get("improvement").is_none());
    }

    fn primary_strategy() -> impl Strategy<Value = Option<Emotion>> {
        prop::option::of(prop::sample::select(Emotion::ALL.to_vec()))
    }

    proptest! {
        #[test]
        fn prop_scores_stay_in_range(
            answers in prop::collection::vec(1i64..=5, 10),
            primary in primary_strategy(),
        ) {
            let bank = QuestionBank::standard();
            let questions: Vec<Question> = bank.questions()[..10].to_vec();
            let responses: ResponseSet = questions
                .iter()
                .zip(&answers)
                .map(|(q, &a)| (q.id.clone(), Answer::new(a).unwrap()))
                .collect();
            let emotion = primary.map(estimate);

            let result = RiskAggregator::default()
                .assess(&questions, &responses, emotion.as_ref())
                .unwrap();

            prop_assert!((0.0..=1.0).contains(&result.questionnaire_score));
            prop_assert!((0.0..=1.0).contains(&result.overall_score));
            prop_assert!((result.overall_score + result.risk_score - 1.0).abs() < 1e-12);
            prop_assert_eq!(result.risk_level, RiskLevel::from_score(result.risk_score));
            for m in &result.metrics {
                prop_assert!((1.0..=5.0).contains(&m.average));
                prop_assert!((m.score - (m.average - 1.0) / 4.0).abs() < 1e-12);
            }
        }
    }
}
