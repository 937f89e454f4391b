//! Password strength scoring for the password-setup screen.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Minimum length that counts towards the score.
pub const MIN_PASSWORD_LENGTH: usize = 8;

const CRITERIA_COUNT: u8 = 5;

static UPPERCASE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Z]").unwrap());
static LOWERCASE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-z]").unwrap());
static DIGIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]").unwrap());
static SPECIAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}\s]").unwrap());

/// Coarse strength band shown under the password field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordTier {
    Weak,
    Medium,
    Strong,
}

impl PasswordTier {
    /// `score <= 2` is Weak, `3` is Medium, anything above is Strong.
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=2 => Self::Weak,
            3 => Self::Medium,
            _ => Self::Strong,
        }
    }
}

impl std::fmt::Display for PasswordTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Weak => "weak",
            Self::Medium => "medium",
            Self::Strong => "strong",
        };
        write!(f, "{s}")
    }
}

/// Which of the five criteria a password meets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordCriteria {
    pub uppercase: bool,
    pub lowercase: bool,
    pub digit: bool,
    pub special: bool,
    pub min_length: bool,
}

impl PasswordCriteria {
    pub fn check(password: &str) -> Self {
        Self {
            uppercase: UPPERCASE.is_match(password),
            lowercase: LOWERCASE.is_match(password),
            digit: DIGIT.is_match(password),
            special: SPECIAL.is_match(password),
            min_length: password.chars().count() >= MIN_PASSWORD_LENGTH,
        }
    }

    /// Number of satisfied criteria (0-5).
    pub fn satisfied(&self) -> u8 {
        [
            self.uppercase,
            self.lowercase,
            self.digit,
            self.special,
            self.min_length,
        ]
        .into_iter()
        .filter(|met| *met)
        .count() as u8
    }
}

/// Result of scoring a password.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PasswordStrength {
    pub score: u8,
    pub tier: PasswordTier,
    /// `score / 5 * 100`.
    pub percentage: f32,
    pub criteria: PasswordCriteria,
    pub message: &'static str,
}

/// Score a password against the five criteria.
pub fn evaluate_password(password: &str) -> PasswordStrength {
    let criteria = PasswordCriteria::check(password);
    let score = criteria.satisfied();
    let tier = PasswordTier::from_score(score);

    let message = if password.is_empty() {
        "Enter a password"
    } else {
        match tier {
            PasswordTier::Weak => "Weak password",
            PasswordTier::Medium => "Medium strength password",
            PasswordTier::Strong => "Strong password",
        }
    };

    PasswordStrength {
        score,
        tier,
        percentage: f32::from(score) * 100.0 / f32::from(CRITERIA_COUNT),
        criteria,
        message,
    }
}

/// The confirmation field matches a non-empty password.
pub fn passwords_match(password: &str, confirmation: &str) -> bool {
    !password.is_empty() && password == confirmation
}
