//! Error types for the phonebook core.
//!
//! This module defines custom error types using `thiserror` for precise error handling.

use crate::domain::{UserId, ValidationError};
use crate::maintenance::{GroupOutcome, RepairFailure};
use thiserror::Error;

/// Errors surfaced by a contact or user store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Create/update would give a user two contacts with the same phone
    #[error("User {user_id} already has a contact with phone {phone}")]
    DuplicatePhone { user_id: UserId, phone: String },

    /// A user with this email is already registered
    #[error("A user with email {0} already exists")]
    DuplicateEmail(String),

    /// Contact or user does not exist (or belongs to another user)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Input failed domain validation
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The uniqueness constraint cannot be installed while duplicates exist
    #[error("{0} uniqueness violation group(s) remain")]
    ViolationsRemain(usize),

    /// Storage engine failure
    #[error("Database error: {0}")]
    Database(String),
}

impl StoreError {
    /// True for errors the caller can fix by changing its input.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::DuplicatePhone { .. }
                | Self::DuplicateEmail(_)
                | Self::NotFound(_)
                | Self::Validation(_)
        )
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

/// Fatal outcomes of a duplicate-resolver run.
///
/// Group repairs are committed one by one, so the install failures carry
/// every group outcome reached before the constraint step.
#[derive(Error, Debug)]
pub enum ResolverError {
    /// Violation groups could not be listed
    #[error("Failed to scan for uniqueness violations: {0}")]
    Detection(#[source] StoreError),

    /// The constraint was rejected because some groups are still duplicated
    #[error("Repair incomplete: {remaining} violation group(s) remain ({} group repair(s) failed)", failed_groups(outcomes))]
    RepairIncomplete {
        remaining: usize,
        outcomes: Vec<GroupOutcome>,
    },

    /// Installing the constraint failed for any other reason
    #[error("Failed to install uniqueness constraint: {source}")]
    ConstraintInstallFailure {
        #[source]
        source: StoreError,
        outcomes: Vec<GroupOutcome>,
    },
}

impl ResolverError {
    /// Group outcomes recorded before the run failed.
    pub fn outcomes(&self) -> &[GroupOutcome] {
        match self {
            Self::Detection(_) => &[],
            Self::RepairIncomplete { outcomes, .. }
            | Self::ConstraintInstallFailure { outcomes, .. } => outcomes,
        }
    }

    /// Groups that could not be repaired.
    pub fn failures(&self) -> impl Iterator<Item = &RepairFailure> {
        self.outcomes().iter().filter_map(|outcome| match outcome {
            GroupOutcome::Failed(failure) => Some(failure),
            GroupOutcome::Repaired { .. } => None,
        })
    }
}

fn failed_groups(outcomes: &[GroupOutcome]) -> usize {
    outcomes
        .iter()
        .filter(|outcome| matches!(outcome, GroupOutcome::Failed(_)))
        .count()
}

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Required environment variable is missing
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    /// Environment variable has invalid value
    #[error("Invalid value for {var}: {reason}")]
    InvalidValue { var: String, reason: String },
}

/// Convenience type alias for Results with StoreError
pub type StoreResult<T> = Result<T, StoreError>;

/// Convenience type alias for Results with ResolverError
pub type ResolverResult<T> = Result<T, ResolverError>;

/// Convenience type alias for Results with ConfigError
pub type ConfigResult<T> = Result<T, ConfigError>;
