//! Built-in flows used by the app's onboarding screens.

use serde::{Deserialize, Serialize};

use super::engine::StepFlow;
use super::state::{FieldValue, FieldValues, text_value};
use super::step::{Step, StepCheck};
use crate::error::FlowError;
use crate::validators::{
    PasswordTier, evaluate_password, is_complete_code, is_complete_phone, passwords_match,
};

/// Field keys written by the account-setup screens.
pub mod fields {
    pub const PHONE: &str = "phone";
    pub const OTP: &str = "otp";
    pub const PASSWORD: &str = "password";
    pub const PASSWORD_CONFIRMATION: &str = "password_confirmation";
    pub const VERIFICATION_ENABLED: &str = "verification_enabled";
}

/// Which built-in flow to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    Welcome,
    AccountSetup,
}

impl FlowKind {
    pub fn build(&self, country_code: &str) -> Result<StepFlow, FlowError> {
        match self {
            Self::Welcome => welcome_carousel(),
            Self::AccountSetup => account_setup(country_code),
        }
    }
}

impl std::fmt::Display for FlowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Welcome => "welcome",
            Self::AccountSetup => "account_setup",
        };
        write!(f, "{s}")
    }
}

/// Intro carousel; every page can be skipped.
pub fn welcome_carousel() -> Result<StepFlow, FlowError> {
    StepFlow::new(vec![
        Step::new("welcome", "Welcome to Solace").optional(),
        Step::new("track_mood", "Check in with yourself").optional(),
        Step::new("find_support", "Support when you need it").optional(),
    ])
}

/// Phone, one-time code, password, then an optional verification opt-in.
pub fn account_setup(country_code: &str) -> Result<StepFlow, FlowError> {
    let country_code = country_code.to_string();

    StepFlow::new(vec![
        Step::new("phone", "Your phone number").with_validator(move |values: &FieldValues| {
            StepCheck::require(
                is_complete_phone(text_value(values, fields::PHONE), &country_code),
                "Enter a 10-digit phone number",
            )
        }),
        Step::new("otp", "Verification code").with_validator(|values: &FieldValues| {
            StepCheck::require(
                is_complete_code(text_value(values, fields::OTP)),
                "Enter the 4-digit code we sent you",
            )
        }),
        Step::new("password", "Create a password").with_validator(check_password),
        Step::new("verification", "Extra security")
            .optional()
            .with_validator(|values: &FieldValues| {
                StepCheck::require(
                    matches!(
                        values.get(fields::VERIFICATION_ENABLED),
                        None | Some(FieldValue::Flag(_))
                    ),
                    "Verification choice must be on or off",
                )
            }),
    ])
}

fn check_password(values: &FieldValues) -> StepCheck {
    let password = text_value(values, fields::PASSWORD);
    let strength = evaluate_password(password);
    if strength.tier < PasswordTier::Medium {
        return StepCheck::invalid(strength.message);
    }
    if !passwords_match(password, text_value(values, fields::PASSWORD_CONFIRMATION)) {
        return StepCheck::invalid("Passwords do not match");
    }
    StepCheck::Valid
}
