//! Data models for contacts and users.

pub mod contact;
pub mod user;

pub use contact::{Contact, ContactPage, ContactPatch, NewContact, MAX_ADDRESS_CHARS, MAX_NAME_CHARS};
pub use user::{NewUser, User};
