//! Domain validation errors.

use std::fmt;

/// Errors that can occur during domain value object validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided ID is not a positive integer.
    InvalidId(i64),

    /// The provided email address is invalid.
    InvalidEmail(String),

    /// The provided phone number is not exactly 10 digits.
    InvalidPhone(String),

    /// The contact name is empty or longer than 100 characters.
    InvalidName(String),

    /// The address is longer than 255 characters.
    AddressTooLong(usize),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidId(id) => write!(f, "ID must be positive, got {}", id),
            Self::InvalidEmail(email) => write!(f, "Invalid email address: {}", email),
            Self::InvalidPhone(phone) => {
                write!(f, "Invalid phone number (expected 10 digits): {}", phone)
            }
            Self::InvalidName(name) => {
                write!(f, "Invalid name (1-100 characters required): {:?}", name)
            }
            Self::AddressTooLong(len) => {
                write!(f, "Address too long ({} characters, max 255)", len)
            }
        }
    }
}

impl std::error::Error for ValidationError {}
