//! Out-of-band maintenance routines run against the contact store.

pub mod duplicate_resolver;

pub use duplicate_resolver::{DuplicateResolver, GroupOutcome, RepairFailure, ResolutionReport};
