//! Contact model: one entry in a user's address book.

use crate::domain::{ContactId, EmailAddress, PhoneNumber, UserId, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Longest contact name, in characters.
pub const MAX_NAME_CHARS: usize = 100;

/// Longest postal address, in characters.
pub const MAX_ADDRESS_CHARS: usize = 255;

/// A stored contact.
///
/// `created_at` is assigned by the store and never changes afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Contact {
    pub id: ContactId,
    pub user_id: UserId,
    pub name: String,
    pub phone: PhoneNumber,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<EmailAddress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Contact {
    /// Composite text scored by fuzzy search: `name phone email`.
    ///
    /// The trailing separator is kept when there is no email so the text
    /// layout does not depend on which optional fields are set.
    pub fn search_text(&self) -> String {
        format!(
            "{} {} {}",
            self.name,
            self.phone,
            self.email.as_ref().map(EmailAddress::as_str).unwrap_or("")
        )
    }
}

/// Check a contact name and return its trimmed form.
pub fn validate_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    let chars = trimmed.chars().count();
    if chars == 0 || chars > MAX_NAME_CHARS {
        return Err(ValidationError::InvalidName(name.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Check an address; blank addresses become `None`.
pub fn validate_address(address: &str) -> Result<Option<String>, ValidationError> {
    let trimmed = address.trim();
    let chars = trimmed.chars().count();
    if chars > MAX_ADDRESS_CHARS {
        return Err(ValidationError::AddressTooLong(chars));
    }
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}

#[derive(Deserialize)]
struct RawNewContact {
    name: String,
    phone: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    address: Option<String>,
}

/// Fields for creating a contact, already validated.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawNewContact")]
pub struct NewContact {
    pub name: String,
    pub phone: PhoneNumber,
    pub email: Option<EmailAddress>,
    pub address: Option<String>,
}

impl NewContact {
    /// Validate raw input into a `NewContact`.
    ///
    /// Blank email/address strings are treated as absent.
    pub fn new(
        name: &str,
        phone: &str,
        email: Option<&str>,
        address: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let email = match email.map(str::trim).filter(|e| !e.is_empty()) {
            Some(e) => Some(EmailAddress::new(e)?),
            None => None,
        };
        let address = match address {
            Some(a) => validate_address(a)?,
            None => None,
        };

        Ok(Self {
            name: validate_name(name)?,
            phone: PhoneNumber::new(phone)?,
            email,
            address,
        })
    }
}

impl TryFrom<RawNewContact> for NewContact {
    type Error = ValidationError;

    fn try_from(raw: RawNewContact) -> Result<Self, Self::Error> {
        NewContact::new(
            &raw.name,
            &raw.phone,
            raw.email.as_deref(),
            raw.address.as_deref(),
        )
    }
}

/// Deserialize a field that distinguishes "absent" from "explicit null".
///
/// Absent fields fall back to `None` through `#[serde(default)]`; a present
/// field (null or not) becomes `Some(..)`.
fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial update of a contact.
///
/// Each field is either absent (`None`, left untouched) or present.
/// For the optional columns, `Some(None)` clears the stored value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContactPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<PhoneNumber>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub email: Option<Option<EmailAddress>>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub address: Option<Option<String>>,
}

impl ContactPatch {
    /// True when no field is supplied.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone.is_none() && self.email.is_none() && self.address.is_none()
    }

    /// Validate the free-text fields and normalise them in place.
    pub fn validate(mut self) -> Result<Self, ValidationError> {
        self.name = self.name.take().map(|n| validate_name(&n)).transpose()?;
        self.address = match self.address.take() {
            Some(Some(address)) => Some(validate_address(&address)?),
            other => other,
        };
        Ok(self)
    }

    /// Apply the supplied fields to `contact`, leaving the rest untouched.
    pub fn apply_to(&self, contact: &mut Contact) {
        if let Some(name) = &self.name {
            contact.name = name.clone();
        }
        if let Some(phone) = &self.phone {
            contact.phone = phone.clone();
        }
        if let Some(email) = &self.email {
            contact.email = email.clone();
        }
        if let Some(address) = &self.address {
            contact.address = address.clone();
        }
    }
}

/// One page of a user's contacts plus the user's total contact count.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ContactPage {
    pub contacts: Vec<Contact>,
    pub total: usize,
}
