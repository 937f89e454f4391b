//! Wellness score classification.
//!
//! Maps a 0-100 score onto Healthy / Unstable / Critical with the static copy
//! the result screen shows. Critical results must be paired with a crisis
//! contact by whoever renders them; the classifier only reports the category.

use serde::{Deserialize, Serialize};

use crate::config::ScoreThresholds;

/// Highest score the assessment produces.
pub const MAX_SCORE: u8 = 100;

/// Coarse band a score falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreCategory {
    Healthy,
    Unstable,
    Critical,
}

impl ScoreCategory {
    /// Crisis resources must be offered alongside this result.
    pub fn requires_escalation(&self) -> bool {
        matches!(self, Self::Critical)
    }

    pub fn primary_message(&self) -> &'static str {
        match self {
            Self::Healthy => "You're in a good place",
            Self::Unstable => "You're carrying a lot right now",
            Self::Critical => "You don't have to go through this alone",
        }
    }

    pub fn secondary_message(&self) -> &'static str {
        match self {
            Self::Healthy => {
                "Keep up the habits that support you. Check in again whenever you like."
            }
            Self::Unstable => {
                "Small steps help. Try a guided exercise or talk to someone you trust."
            }
            Self::Critical => {
                "Please reach out to a crisis counselor now. Support is available any time."
            }
        }
    }
}

impl std::fmt::Display for ScoreCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Healthy => "healthy",
            Self::Unstable => "unstable",
            Self::Critical => "critical",
        };
        write!(f, "{s}")
    }
}

/// Classified score with its display copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreResult {
    pub raw_score: u8,
    pub category: ScoreCategory,
    pub primary_message: &'static str,
    pub secondary_message: &'static str,
    pub escalate: bool,
}

/// Classifier bound to a set of thresholds.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreClassifier {
    thresholds: ScoreThresholds,
}

impl ScoreClassifier {
    pub fn new(thresholds: ScoreThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> ScoreThresholds {
        self.thresholds
    }

    /// Classify a score. Values outside 0-100 are clamped first.
    pub fn classify(&self, raw_score: i32) -> ScoreResult {
        let score = raw_score.clamp(0, i32::from(MAX_SCORE)) as u8;
        if i32::from(score) != raw_score {
            tracing::debug!(raw_score, clamped = score, "Score outside 0-100 clamped");
        }

        let category = if score >= self.thresholds.healthy {
            ScoreCategory::Healthy
        } else if score >= self.thresholds.unstable {
            ScoreCategory::Unstable
        } else {
            ScoreCategory::Critical
        };

        ScoreResult {
            raw_score: score,
            category,
            primary_message: category.primary_message(),
            secondary_message: category.secondary_message(),
            escalate: category.requires_escalation(),
        }
    }
}

/// Classify with the default 70 / 30 thresholds.
pub fn classify(raw_score: i32) -> ScoreResult {
    ScoreClassifier::default().classify(raw_score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries() {
        assert_eq!(classify(100).category, ScoreCategory::Healthy);
        assert_eq!(classify(70).category, ScoreCategory::Healthy);
        assert_eq!(classify(69).category, ScoreCategory::Unstable);
        assert_eq!(classify(30).category, ScoreCategory::Unstable);
        assert_eq!(classify(29).category, ScoreCategory::Critical);
        assert_eq!(classify(0).category, ScoreCategory::Critical);
    }

    #[test]
    fn only_critical_escalates() {
        assert!(classify(10).escalate);
        assert!(!classify(50).escalate);
        assert!(!classify(90).escalate);
        assert!(ScoreCategory::Critical.requires_escalation());
    }

    #[test]
    fn same_score_same_result() {
        for score in 0..=100 {
            assert_eq!(classify(score), classify(score));
        }
    }

    #[test]
    fn out_of_range_is_clamped() {
        let low = classify(-5);
        assert_eq!(low.raw_score, 0);
        assert_eq!(low.category, ScoreCategory::Critical);

        let high = classify(250);
        assert_eq!(high.raw_score, 100);
        assert_eq!(high.category, ScoreCategory::Healthy);
    }

    #[test]
    fn messages_follow_category() {
        let result = classify(45);
        assert_eq!(result.primary_message, ScoreCategory::Unstable.primary_message());
        assert_eq!(
            result.secondary_message,
            ScoreCategory::Unstable.secondary_message()
        );
    }

    #[test]
    fn custom_thresholds() {
        let classifier = ScoreClassifier::new(ScoreThresholds {
            healthy: 80,
            unstable: 40,
        });
        assert_eq!(classifier.classify(79).category, ScoreCategory::Unstable);
        assert_eq!(classifier.classify(39).category, ScoreCategory::Critical);
        assert_eq!(classifier.classify(80).category, ScoreCategory::Healthy);
    }

    #[test]
    fn category_serde_matches_display() {
        for category in [
            ScoreCategory::Healthy,
            ScoreCategory::Unstable,
            ScoreCategory::Critical,
        ] {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{category}\""));
        }
    }
}
