//! Domain value objects and types.
//!
//! This module contains type-safe wrappers for domain concepts like
//! contact and user IDs, email addresses, and phone numbers. These value
//! objects validate at construction time so invalid data never reaches
//! the store or the search engine.

pub mod contact_id;
pub mod email;
pub mod errors;
pub mod phone;
pub mod user_id;

pub use contact_id::ContactId;
pub use email::EmailAddress;
pub use errors::ValidationError;
pub use phone::PhoneNumber;
pub use user_id::UserId;
