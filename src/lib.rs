//! Phonebook core - multi-tenant contact storage, search and duplicate repair.
//!
//! Every contact belongs to exactly one user, and within one user a phone
//! number identifies at most one contact.
//!
//! # Architecture
//!
//! - **domain**: Validated value objects (ids, phone numbers, email addresses)
//! - **models**: Contacts, contact patches and users
//! - **error**: Custom error types for precise error handling
//! - **config**: Configuration management from environment variables
//! - **matching**: Token-set similarity scoring
//! - **search**: Two-tier contact search (substring for short queries, fuzzy otherwise)
//! - **repositories**: Store traits with in-memory and SQLite implementations
//! - **maintenance**: Duplicate phone repair and uniqueness constraint installation
//! - **services**: Request-facing contact operations
//! - **metrics**: Search and repair counters

pub mod config;
pub mod domain;
pub mod error;
pub mod maintenance;
pub mod matching;
pub mod metrics;
pub mod models;
pub mod repositories;
pub mod search;
pub mod services;

// Re-export commonly used types
pub use config::Config;
pub use domain::{ContactId, EmailAddress, PhoneNumber, UserId, ValidationError};
pub use error::{ConfigError, ResolverError, StoreError};
pub use maintenance::{DuplicateResolver, ResolutionReport};
pub use metrics::{Metrics, MetricsSummary};
pub use models::{Contact, ContactPage, ContactPatch, NewContact, NewUser, User};
pub use repositories::{
    ContactRepository, MemoryContactRepository, SqliteContactRepository, UserRepository,
};
pub use search::{SearchEngine, SearchMode, SearchOptions, SearchResult};
pub use services::{ContactService, ContactServiceImpl};
