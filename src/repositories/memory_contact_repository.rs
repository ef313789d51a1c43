use crate::domain::{ContactId, EmailAddress, PhoneNumber, UserId};
use crate::error::{StoreError, StoreResult};
use crate::models::{Contact, ContactPage, ContactPatch, NewContact, NewUser, User};
use crate::repositories::traits::{
    ConstraintStatus, ContactRepository, UserRepository, ViolationGroup,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct MemoryState {
    contacts: BTreeMap<ContactId, Contact>,
    users: BTreeMap<UserId, User>,
    last_contact_id: i64,
    last_user_id: i64,
    constraint_installed: bool,
}

impl MemoryState {
    fn phone_owner(&self, user_id: UserId, phone: &PhoneNumber) -> Option<ContactId> {
        self.contacts
            .values()
            .find(|c| c.user_id == user_id && c.phone == *phone)
            .map(|c| c.id)
    }

    fn owned(&self, user_id: UserId, id: ContactId) -> StoreResult<&Contact> {
        self.contacts
            .get(&id)
            .filter(|c| c.user_id == user_id)
            .ok_or_else(|| StoreError::NotFound(format!("Contact {} not found", id)))
    }

    fn violation_groups(&self) -> Vec<ViolationGroup> {
        let mut groups: BTreeMap<(UserId, &str), Vec<ContactId>> = BTreeMap::new();
        for contact in self.contacts.values() {
            groups
                .entry((contact.user_id, contact.phone.as_str()))
                .or_default()
                .push(contact.id);
        }

        groups
            .into_iter()
            .filter(|(_, ids)| ids.len() > 1)
            .map(|((user_id, phone), contact_ids)| ViolationGroup {
                user_id,
                phone: phone.to_string(),
                contact_ids,
            })
            .collect()
    }

    fn next_contact_id(&mut self) -> StoreResult<ContactId> {
        self.last_contact_id += 1;
        Ok(ContactId::new(self.last_contact_id)?)
    }

    fn next_user_id(&mut self) -> StoreResult<UserId> {
        self.last_user_id += 1;
        Ok(UserId::new(self.last_user_id)?)
    }
}

/// In-process contact and user store.
///
/// All state sits behind one mutex, so every operation (including a whole
/// duplicate-group repair) is atomic with respect to concurrent callers.
/// Cloning is cheap and clones share the same state.
#[derive(Clone, Default)]
pub struct MemoryContactRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryContactRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Database("contact store lock poisoned".to_string()))
    }

    /// Load pre-existing rows verbatim, keeping their ids and timestamps.
    ///
    /// Before the uniqueness constraint is installed this accepts
    /// duplicate phones, mirroring legacy data; afterwards a colliding row
    /// is rejected with `DuplicatePhone` and nothing is imported. An id that
    /// is already stored (or repeated in `contacts`) is always rejected.
    pub fn import_unchecked(&self, contacts: Vec<Contact>) -> StoreResult<()> {
        let mut state = self.state()?;

        let mut ids: Vec<ContactId> = Vec::with_capacity(contacts.len());
        for contact in &contacts {
            if ids.contains(&contact.id) || state.contacts.contains_key(&contact.id) {
                return Err(StoreError::Database(format!(
                    "Contact id {} already exists",
                    contact.id
                )));
            }
            ids.push(contact.id);
        }

        if state.constraint_installed {
            let mut seen: Vec<(UserId, &PhoneNumber)> = Vec::new();
            for contact in &contacts {
                let key = (contact.user_id, &contact.phone);
                if seen.contains(&key) || state.phone_owner(contact.user_id, &contact.phone).is_some()
                {
                    return Err(StoreError::DuplicatePhone {
                        user_id: contact.user_id,
                        phone: contact.phone.to_string(),
                    });
                }
                seen.push(key);
            }
        }

        for contact in contacts {
            state.last_contact_id = state.last_contact_id.max(contact.id.get());
            state.contacts.insert(contact.id, contact);
        }
        Ok(())
    }

    /// Number of stored contacts across all users.
    pub fn contact_count(&self) -> StoreResult<usize> {
        Ok(self.state()?.contacts.len())
    }

    pub fn constraint_installed(&self) -> StoreResult<bool> {
        Ok(self.state()?.constraint_installed)
    }
}

#[async_trait]
impl ContactRepository for MemoryContactRepository {
    async fn get(&self, user_id: UserId, id: ContactId) -> StoreResult<Contact> {
        let state = self.state()?;
        state.owned(user_id, id).cloned()
    }

    async fn list(&self, user_id: UserId, offset: usize, limit: usize) -> StoreResult<ContactPage> {
        let state = self.state()?;

        let mut owned: Vec<&Contact> = state
            .contacts
            .values()
            .filter(|c| c.user_id == user_id)
            .collect();
        owned.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        Ok(ContactPage {
            total: owned.len(),
            contacts: owned.into_iter().skip(offset).take(limit).cloned().collect(),
        })
    }

    async fn create(&self, user_id: UserId, contact: NewContact) -> StoreResult<Contact> {
        let mut state = self.state()?;

        if state.phone_owner(user_id, &contact.phone).is_some() {
            return Err(StoreError::DuplicatePhone {
                user_id,
                phone: contact.phone.into_inner(),
            });
        }

        let created = Contact {
            id: state.next_contact_id()?,
            user_id,
            name: contact.name,
            phone: contact.phone,
            email: contact.email,
            address: contact.address,
            created_at: Utc::now(),
        };
        state.contacts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(
        &self,
        user_id: UserId,
        id: ContactId,
        patch: ContactPatch,
    ) -> StoreResult<Contact> {
        let patch = patch.validate()?;
        let mut state = self.state()?;

        let mut updated = state.owned(user_id, id)?.clone();
        if let Some(phone) = &patch.phone {
            // Legacy duplicates may share the current phone; keeping it is fine
            if *phone != updated.phone
                && matches!(state.phone_owner(user_id, phone), Some(owner) if owner != id)
            {
                return Err(StoreError::DuplicatePhone {
                    user_id,
                    phone: phone.to_string(),
                });
            }
        }

        patch.apply_to(&mut updated);
        state.contacts.insert(id, updated.clone());
        Ok(updated)
    }

    async fn delete(&self, user_id: UserId, id: ContactId) -> StoreResult<()> {
        let mut state = self.state()?;
        state.owned(user_id, id)?;
        state.contacts.remove(&id);
        Ok(())
    }

    async fn find_uniqueness_violations(&self) -> StoreResult<Vec<ViolationGroup>> {
        Ok(self.state()?.violation_groups())
    }

    async fn remove_duplicates(
        &self,
        group: &ViolationGroup,
        survivor: ContactId,
    ) -> StoreResult<Vec<ContactId>> {
        let mut state = self.state()?;

        let keeps_key = state
            .contacts
            .get(&survivor)
            .map(|c| c.user_id == group.user_id && c.phone.as_str() == group.phone)
            .unwrap_or(false);
        if !keeps_key {
            return Err(StoreError::NotFound(format!(
                "Survivor {} is not in group ({}, {})",
                survivor, group.user_id, group.phone
            )));
        }

        let doomed: Vec<ContactId> = state
            .contacts
            .values()
            .filter(|c| {
                c.user_id == group.user_id && c.phone.as_str() == group.phone && c.id != survivor
            })
            .map(|c| c.id)
            .collect();

        for id in &doomed {
            state.contacts.remove(id);
        }
        Ok(doomed)
    }

    async fn install_unique_constraint(&self) -> StoreResult<ConstraintStatus> {
        let mut state = self.state()?;

        if state.constraint_installed {
            return Ok(ConstraintStatus::AlreadyPresent);
        }

        let remaining = state.violation_groups().len();
        if remaining > 0 {
            return Err(StoreError::ViolationsRemain(remaining));
        }

        state.constraint_installed = true;
        Ok(ConstraintStatus::Installed)
    }
}

#[async_trait]
impl UserRepository for MemoryContactRepository {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut state = self.state()?;

        let normalized = user.email.normalized();
        if state.users.values().any(|u| u.email.normalized() == normalized) {
            return Err(StoreError::DuplicateEmail(user.email.into_inner()));
        }

        let created = User {
            id: state.next_user_id()?,
            email: user.email,
            password_hash: user.password_hash,
            totp_secret: None,
            totp_enabled: false,
            created_at: Utc::now(),
        };
        state.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_user(&self, id: UserId) -> StoreResult<User> {
        self.state()?
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("User {} not found", id)))
    }

    async fn find_user_by_email(&self, email: &EmailAddress) -> StoreResult<Option<User>> {
        let normalized = email.normalized();
        Ok(self
            .state()?
            .users
            .values()
            .find(|u| u.email.normalized() == normalized)
            .cloned())
    }

    async fn set_two_factor(
        &self,
        id: UserId,
        secret: Option<String>,
        enabled: bool,
    ) -> StoreResult<User> {
        let mut state = self.state()?;
        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("User {} not found", id)))?;

        user.totp_secret = secret;
        user.totp_enabled = enabled;
        Ok(user.clone())
    }
}
