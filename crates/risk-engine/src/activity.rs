//! Wellness activities offered between the two assessments

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::RiskError;

/// Completions needed before the follow-up assessment
pub const REQUIRED_COMPLETIONS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Breathing,
    Mindfulness,
    Stretching,
    Gratitude,
    ProgressiveRelaxation,
}

impl ActivityKind {
    pub const ALL: [ActivityKind; 5] = [
        ActivityKind::Breathing,
        ActivityKind::Mindfulness,
        ActivityKind::Stretching,
        ActivityKind::Gratitude,
        ActivityKind::ProgressiveRelaxation,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            ActivityKind::Breathing => "breathing",
            ActivityKind::Mindfulness => "mindfulness",
            ActivityKind::Stretching => "stretching",
            ActivityKind::Gratitude => "gratitude",
            ActivityKind::ProgressiveRelaxation => "progressive_relaxation",
        }
    }

    pub fn activity(&self) -> &'static WellnessActivity {
        &CATALOG[*self as usize]
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ActivityKind {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActivityKind::ALL
            .iter()
            .copied()
            .find(|k| k.id() == s)
            .ok_or_else(|| RiskError::UnknownActivity(s.to_string()))
    }
}

/// A guided exercise
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WellnessActivity {
    pub kind: ActivityKind,
    pub name: &'static str,
    /// Suggested duration (seconds)
    pub duration_secs: u64,
    pub instructions: &'static [&'static str],
    pub benefits: &'static [&'static str],
}

/// Every available activity, indexed by `ActivityKind`
pub fn catalog() -> &'static [WellnessActivity] {
    &CATALOG
}

static CATALOG: [WellnessActivity; 5] = [
    WellnessActivity {
        kind: ActivityKind::Breathing,
        name: "Deep Breathing Exercise",
        duration_secs: 120,
        instructions: &[
            "Find a comfortable sitting position",
            "Breathe in slowly through your nose for 4 counts",
            "Hold your breath for 4 counts",
            "Exhale slowly through your mouth for 6 counts",
            "Repeat the cycle",
        ],
        benefits: &[
            "Reduces stress and anxiety",
            "Improves focus and clarity",
            "Helps regulate emotions",
            "Promotes relaxation",
        ],
    },
    WellnessActivity {
        kind: ActivityKind::Mindfulness,
        name: "Mindfulness Meditation",
        duration_secs: 120,
        instructions: &[
            "Sit or lie comfortably",
            "Close your eyes and focus on your breath",
            "Notice thoughts without judgment",
            "Gently return focus to breathing when distracted",
            "Continue observing your breath",
        ],
        benefits: &[
            "Reduces anxiety and stress",
            "Improves emotional awareness",
            "Enhances mental clarity",
            "Promotes peace of mind",
        ],
    },
    WellnessActivity {
        kind: ActivityKind::Stretching,
        name: "Gentle Stretching",
        duration_secs: 120,
        instructions: &[
            "Start with neck and shoulder rolls",
            "Stretch arms overhead and side to side",
            "Perform gentle twists while seated",
            "Stretch legs if comfortable",
            "Move slowly and mindfully",
        ],
        benefits: &[
            "Releases physical tension",
            "Improves body awareness",
            "Reduces muscle stress",
            "Promotes relaxation",
        ],
    },
    WellnessActivity {
        kind: ActivityKind::Gratitude,
        name: "Gratitude Practice",
        duration_secs: 120,
        instructions: &[
            "Think of three things you're grateful for",
            "Reflect on why they matter to you",
            "Consider how they impact your life",
            "Express your gratitude mentally",
            "Notice how you feel afterward",
        ],
        benefits: &[
            "Improves mood and outlook",
            "Reduces negative thoughts",
            "Increases happiness",
            "Builds emotional resilience",
        ],
    },
    WellnessActivity {
        kind: ActivityKind::ProgressiveRelaxation,
        name: "Progressive Muscle Relaxation",
        duration_secs: 120,
        instructions: &[
            "Start with your toes and feet",
            "Tense each muscle group for 5 seconds",
            "Release and notice the relaxation",
            "Move upward through your body",
            "End with facial muscles",
        ],
        benefits: &[
            "Reduces physical tension",
            "Promotes body awareness",
            "Helps with anxiety",
            "Improves sleep quality",
        ],
    },
];

/// Activities completed between the baseline and the follow-up assessment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivitySession {
    completed: Vec<ActivityKind>,
}

impl ActivitySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an activity done. Returns false if it was already recorded.
    pub fn complete(&mut self, kind: ActivityKind) -> bool {
        if self.completed.contains(&kind) {
            debug!("Activity {} already completed", kind);
            return false;
        }
        self.completed.push(kind);
        info!(
            "Activity completed: {} ({}/{})",
            kind,
            self.completed.len(),
            REQUIRED_COMPLETIONS
        );
        true
    }

    pub fn completed(&self) -> &[ActivityKind] {
        &self.completed
    }

    pub fn remaining(&self) -> usize {
        REQUIRED_COMPLETIONS.saturating_sub(self.completed.len())
    }

    /// Enough activities for the follow-up assessment
    pub fn is_finished(&self) -> bool {
        self.remaining() == 0
    }

    /// Display names in completion order
    pub fn names(&self) -> Vec<String> {
        self.completed
            .iter()
            .map(|k| k.activity().name.to_string())
            .collect()
    }
}
