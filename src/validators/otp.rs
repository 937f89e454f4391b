//! One-time-passcode entry across four single-digit slots.

use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// Number of OTP slots.
pub const OTP_LENGTH: usize = 4;

const FIELD: &str = "otp";

/// State of the OTP input boxes: one digit per slot plus the focused slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpEntry {
    slots: [Option<char>; OTP_LENGTH],
    focus: usize,
}

impl OtpEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a keystroke to `slot`.
    ///
    /// A single digit fills the slot and moves focus forward. Empty text
    /// clears the slot; clearing a slot that is already empty moves focus
    /// back instead (backspace on an empty box). Anything else is rejected
    /// and leaves the entry untouched. Returns the focused slot afterwards.
    pub fn input(&mut self, slot: usize, text: &str) -> Result<usize, InputError> {
        if slot >= OTP_LENGTH {
            return Err(InputError::SlotOutOfRange {
                slot,
                len: OTP_LENGTH,
            });
        }

        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (None, _) => {
                if self.slots[slot].is_none() && slot > 0 {
                    self.focus = slot - 1;
                } else {
                    self.slots[slot] = None;
                    self.focus = slot;
                }
            }
            (Some(c), None) if c.is_ascii_digit() => {
                self.slots[slot] = Some(c);
                self.focus = if slot + 1 < OTP_LENGTH { slot + 1 } else { slot };
            }
            (Some(c), None) => {
                return Err(InputError::malformed(
                    FIELD,
                    format!("{c:?} is not a digit"),
                ));
            }
            (Some(_), Some(_)) => {
                return Err(InputError::malformed(
                    FIELD,
                    "each slot holds a single digit",
                ));
            }
        }

        Ok(self.focus)
    }

    /// Fill every slot from a pasted code of exactly four digits.
    pub fn paste(&mut self, text: &str) -> Result<(), InputError> {
        let code = text.trim();
        if code.chars().count() != OTP_LENGTH || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(InputError::malformed(
                FIELD,
                format!("expected {OTP_LENGTH} digits"),
            ));
        }
        for (slot, c) in self.slots.iter_mut().zip(code.chars()) {
            *slot = Some(c);
        }
        self.focus = OTP_LENGTH - 1;
        Ok(())
    }

    /// Empty all slots and focus the first one.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn slot(&self, index: usize) -> Option<char> {
        self.slots.get(index).copied().flatten()
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    /// All four slots hold a digit.
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// The joined code, only once every slot is filled.
    pub fn code(&self) -> Option<String> {
        self.slots.iter().copied().collect()
    }
}

/// Whether a submitted value is a complete four-digit code.
pub fn is_complete_code(value: &str) -> bool {
    value.len() == OTP_LENGTH && value.chars().all(|c| c.is_ascii_digit())
}
