use crate::domain::{ContactId, EmailAddress, UserId};
use crate::error::StoreResult;
use crate::models::{Contact, ContactPage, ContactPatch, NewContact, NewUser, User};
use async_trait::async_trait;
use serde::Serialize;

/// Name of the `(user_id, phone)` uniqueness constraint.
pub const USER_PHONE_CONSTRAINT: &str = "uq_user_phone";

/// Contacts of one user that share a phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViolationGroup {
    pub user_id: UserId,
    pub phone: String,
    /// Members in ascending id order (oldest first)
    pub contact_ids: Vec<ContactId>,
}

/// Result of installing the uniqueness constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintStatus {
    /// This call created the constraint
    Installed,
    /// The constraint was already in place
    AlreadyPresent,
}

/// Repository for a user's contacts.
///
/// Every operation is scoped to a user: a contact owned by someone else
/// is reported as `NotFound`. Implementations must guarantee that no two
/// contacts of one user share a phone number after a successful
/// `create`/`update`, failing those calls atomically with
/// `StoreError::DuplicatePhone` instead.
#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// Retrieve a single contact.
    async fn get(&self, user_id: UserId, id: ContactId) -> StoreResult<Contact>;

    /// Retrieve one page of contacts ordered by name, plus the user's total.
    async fn list(&self, user_id: UserId, offset: usize, limit: usize) -> StoreResult<ContactPage>;

    /// Create a new contact.
    async fn create(&self, user_id: UserId, contact: NewContact) -> StoreResult<Contact>;

    /// Apply a partial update; only supplied fields are written.
    async fn update(&self, user_id: UserId, id: ContactId, patch: ContactPatch)
        -> StoreResult<Contact>;

    /// Delete a contact.
    async fn delete(&self, user_id: UserId, id: ContactId) -> StoreResult<()>;

    /// List every `(user_id, phone)` pair held by more than one contact.
    async fn find_uniqueness_violations(&self) -> StoreResult<Vec<ViolationGroup>>;

    /// Atomically delete every contact sharing the group's `(user_id, phone)`
    /// except `survivor`, returning the removed ids.
    ///
    /// Nothing is deleted unless exactly the survivor remains afterwards.
    async fn remove_duplicates(
        &self,
        group: &ViolationGroup,
        survivor: ContactId,
    ) -> StoreResult<Vec<ContactId>>;

    /// Install the `(user_id, phone)` uniqueness constraint.
    ///
    /// Fails with `StoreError::ViolationsRemain` while duplicates exist.
    async fn install_unique_constraint(&self) -> StoreResult<ConstraintStatus>;
}

/// Repository for registered users.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Register a user; emails are unique case-insensitively.
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;

    async fn get_user(&self, id: UserId) -> StoreResult<User>;

    async fn find_user_by_email(&self, email: &EmailAddress) -> StoreResult<Option<User>>;

    /// Store or clear the second-factor secret and toggle enforcement.
    async fn set_two_factor(
        &self,
        id: UserId,
        secret: Option<String>,
        enabled: bool,
    ) -> StoreResult<User>;
}
