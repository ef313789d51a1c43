//! EmailAddress value object.

use super::errors::ValidationError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Longest address the store accepts.
pub const MAX_EMAIL_LEN: usize = 100;

/// A validated email address.
///
/// Surrounding whitespace is trimmed; case is preserved as entered.
/// Use [`EmailAddress::normalized`] when comparing addresses.
///
/// # Example
///
/// ```
/// use phonebook_core::domain::EmailAddress;
///
/// let email = EmailAddress::new(" Alice@Example.com ").unwrap();
/// assert_eq!(email.as_str(), "Alice@Example.com");
/// assert_eq!(email.normalized(), "alice@example.com");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Create a new EmailAddress.
    ///
    /// # Validation Rules
    ///
    /// - At most 100 characters after trimming
    /// - Exactly one '@' with a non-empty local part
    /// - Domain with at least one '.' and no empty labels
    /// - No interior whitespace
    pub fn new(email: impl Into<String>) -> Result<Self, ValidationError> {
        let email = email.into();
        let trimmed = email.trim();

        if !Self::is_valid(trimmed) {
            return Err(ValidationError::InvalidEmail(email));
        }

        Ok(Self(trimmed.to_string()))
    }

    fn is_valid(email: &str) -> bool {
        if email.chars().count() > MAX_EMAIL_LEN || email.chars().any(char::is_whitespace) {
            return false;
        }

        let Some((local, domain)) = email.split_once('@') else {
            return false;
        };

        if local.is_empty() || domain.contains('@') || !domain.contains('.') {
            return false;
        }

        domain.split('.').all(|label| !label.is_empty())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// Lowercased form used for case-insensitive comparison and search.
    pub fn normalized(&self) -> String {
        self.0.to_lowercase()
    }
}

impl Serialize for EmailAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for EmailAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        EmailAddress::new(s).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_shape() {
        assert!(EmailAddress::new("xyz@gmail.com").is_ok());
        assert!(EmailAddress::new("first.last+tag@mail.example.org").is_ok());
        assert!(EmailAddress::new("plain").is_err());
        assert!(EmailAddress::new("@example.com").is_err());
        assert!(EmailAddress::new("user@").is_err());
        assert!(EmailAddress::new("user@localhost").is_err());
        assert!(EmailAddress::new("a@b@example.com").is_err());
        assert!(EmailAddress::new("user@example..com").is_err());
        assert!(EmailAddress::new("us er@example.com").is_err());
    }

    #[test]
    fn test_email_length_limit() {
        let local = "a".repeat(MAX_EMAIL_LEN);
        assert!(EmailAddress::new(format!("{}@example.com", local)).is_err());
    }

    #[test]
    fn test_email_trims_and_normalizes() {
        let email = EmailAddress::new("  Bob@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "Bob@Example.COM");
        assert_eq!(email.normalized(), "bob@example.com");
    }

    #[test]
    fn test_email_deserialization_invalid_fails() {
        let result: Result<EmailAddress, _> = serde_json::from_str("\"invalid\"");
        assert!(result.is_err());
    }
}
