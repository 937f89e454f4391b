//! Field validators shared by the onboarding screens.
//!
//! Each validator is a pure function (or, for OTP entry, a small value type)
//! that checks or reformats one field. Validators never touch a flow; the
//! caller stores their output into the flow's field values and reports the
//! verdict back to the engine.

pub mod otp;
pub mod password;
pub mod phone;

pub use otp::{OTP_LENGTH, OtpEntry, is_complete_code};
pub use password::{
    MIN_PASSWORD_LENGTH, PasswordCriteria, PasswordStrength, PasswordTier, evaluate_password,
    passwords_match,
};
pub use phone::{
    PHONE_DIGITS, format_phone_number, is_complete_phone, phone_digits, strip_non_digits,
};
