//! User model: the owner of an address book.

use crate::domain::{EmailAddress, UserId};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A registered user.
///
/// Credential material is opaque here: hashing and verification belong to
/// the authentication layer, which only hands the store a finished hash.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct User {
    pub id: UserId,
    pub email: EmailAddress,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub totp_secret: Option<String>,
    pub totp_enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Second factor is required only when enabled and a secret is stored.
    pub fn requires_second_factor(&self) -> bool {
        self.totp_enabled && self.totp_secret.is_some()
    }
}

/// Fields for registering a user.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub email: EmailAddress,
    pub password_hash: String,
}
