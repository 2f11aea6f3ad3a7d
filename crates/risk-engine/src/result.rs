//! Assessment output types

use std::fmt;

use chrono::{DateTime, Utc};
use emotion_sampler::EmotionEstimate;
use serde::{Deserialize, Serialize};

use crate::questionnaire::Category;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Moderate => "moderate",
            RiskLevel::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Qualitative bucket of a normalized category score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interpretation {
    Strong,
    Moderate,
    #[serde(rename = "Needs Attention")]
    NeedsAttention,
}

impl Interpretation {
    /// Bucket-level recommendation
    pub fn recommendation(&self) -> &'static str {
        match self {
            Interpretation::Strong => "Maintain habits",
            Interpretation::Moderate => "Try targeted activities",
            Interpretation::NeedsAttention => "Consider professional help",
        }
    }
}

impl fmt::Display for Interpretation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Interpretation::Strong => "Strong",
            Interpretation::Moderate => "Moderate",
            Interpretation::NeedsAttention => "Needs Attention",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryMetric {
    pub category: Category,
    /// Mean answer (1-5)
    pub average: f64,
    /// (average - 1) / 4
    pub score: f64,
    pub interpretation: Interpretation,
    pub recommendations: Vec<String>,
}

/// Comparison of a follow-up assessment against its baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Improvement {
    pub previous_score: f64,
    pub current_score: f64,
    /// current - previous, as a fraction of the 0-1 scale
    pub change_percent: f64,
    /// Names of the activities completed in between
    pub activities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    /// Mean normalized category score
    pub questionnaire_score: f64,
    /// Weighted questionnaire + emotion score, clamped to 0-1
    pub overall_score: f64,
    /// 1 - overall_score
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub emotion: Option<EmotionEstimate>,
    pub emotion_modifier: f64,
    pub metrics: Vec<CategoryMetric>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub improvement: Option<Improvement>,
}

impl AssessmentResult {
    /// Every category recommendation, in metric order
    pub fn recommendations(&self) -> Vec<String> {
        self.metrics
            .iter()
            .flat_map(|m| m.recommendations.iter().cloned())
            .collect()
    }

    pub fn metric(&self, category: Category) -> Option<&CategoryMetric> {
        self.metrics.iter().find(|m| m.category == category)
    }
}
