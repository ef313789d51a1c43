pub mod failing_contact_repository;

pub use failing_contact_repository::FailingContactRepository;

use chrono::{TimeZone, Utc};
use phonebook_core::{Contact, ContactId, PhoneNumber, UserId};

/// Build a stored contact with a fixed id, for seeding legacy data.
#[allow(dead_code)]
pub fn legacy_contact(id: i64, user: i64, name: &str, phone: &str) -> Contact {
    Contact {
        id: ContactId::new(id).unwrap(),
        user_id: UserId::new(user).unwrap(),
        name: name.to_string(),
        phone: PhoneNumber::new(phone).unwrap(),
        email: None,
        address: None,
        created_at: Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::seconds(id),
    }
}
