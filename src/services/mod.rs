//! Application service layer.
//!
//! Services contain business logic and orchestrate the repositories and the
//! search engine. They are the boundary the request handlers call into.

mod contact_service;

pub use contact_service::{ContactService, ContactServiceImpl};
