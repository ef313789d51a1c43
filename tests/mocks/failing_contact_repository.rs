use async_trait::async_trait;
use phonebook_core::error::{StoreError, StoreResult};
use phonebook_core::repositories::{ConstraintStatus, ViolationGroup};
use phonebook_core::{
    Contact, ContactId, ContactPage, ContactPatch, ContactRepository, MemoryContactRepository,
    NewContact, UserId,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Contact repository that delegates to an in-memory store but can be told
/// to fail specific operations.
///
/// Tracks method calls for verification, the same way the other test
/// doubles do.
#[allow(dead_code)]
#[derive(Clone)]
pub struct FailingContactRepository {
    inner: MemoryContactRepository,
    failing_phones: Arc<Mutex<HashSet<String>>>,
    fail_detection: Arc<Mutex<bool>>,
    install_error: Arc<Mutex<Option<String>>>,
    call_counts: Arc<Mutex<HashMap<String, usize>>>,
}

#[allow(dead_code)]
impl FailingContactRepository {
    pub fn new(inner: MemoryContactRepository) -> Self {
        Self {
            inner,
            failing_phones: Arc::new(Mutex::new(HashSet::new())),
            fail_detection: Arc::new(Mutex::new(false)),
            install_error: Arc::new(Mutex::new(None)),
            call_counts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Make `remove_duplicates` fail for groups with this phone.
    pub fn fail_repair_for(&self, phone: &str) {
        self.failing_phones.lock().unwrap().insert(phone.to_string());
    }

    /// Make `find_uniqueness_violations` fail.
    pub fn fail_detection(&self) {
        *self.fail_detection.lock().unwrap() = true;
    }

    /// Make `install_unique_constraint` fail with a database error.
    pub fn fail_install(&self, message: &str) {
        *self.install_error.lock().unwrap() = Some(message.to_string());
    }

    /// Get the number of times a method was called.
    pub fn get_call_count(&self, method: &str) -> usize {
        let counts = self.call_counts.lock().unwrap();
        *counts.get(method).unwrap_or(&0)
    }

    pub fn inner(&self) -> &MemoryContactRepository {
        &self.inner
    }

    fn track_call(&self, method: &str) {
        let mut counts = self.call_counts.lock().unwrap();
        *counts.entry(method.to_string()).or_insert(0) += 1;
    }
}

#[async_trait]
impl ContactRepository for FailingContactRepository {
    async fn get(&self, user_id: UserId, id: ContactId) -> StoreResult<Contact> {
        self.track_call("get");
        self.inner.get(user_id, id).await
    }

    async fn list(&self, user_id: UserId, offset: usize, limit: usize) -> StoreResult<ContactPage> {
        self.track_call("list");
        self.inner.list(user_id, offset, limit).await
    }

    async fn create(&self, user_id: UserId, contact: NewContact) -> StoreResult<Contact> {
        self.track_call("create");
        self.inner.create(user_id, contact).await
    }

    async fn update(
        &self,
        user_id: UserId,
        id: ContactId,
        patch: ContactPatch,
    ) -> StoreResult<Contact> {
        self.track_call("update");
        self.inner.update(user_id, id, patch).await
    }

    async fn delete(&self, user_id: UserId, id: ContactId) -> StoreResult<()> {
        self.track_call("delete");
        self.inner.delete(user_id, id).await
    }

    async fn find_uniqueness_violations(&self) -> StoreResult<Vec<ViolationGroup>> {
        self.track_call("find_uniqueness_violations");
        if *self.fail_detection.lock().unwrap() {
            return Err(StoreError::Database("scan failed".to_string()));
        }
        self.inner.find_uniqueness_violations().await
    }

    async fn remove_duplicates(
        &self,
        group: &ViolationGroup,
        survivor: ContactId,
    ) -> StoreResult<Vec<ContactId>> {
        self.track_call("remove_duplicates");
        if self.failing_phones.lock().unwrap().contains(&group.phone) {
            return Err(StoreError::Database("database is locked".to_string()));
        }
        self.inner.remove_duplicates(group, survivor).await
    }

    async fn install_unique_constraint(&self) -> StoreResult<ConstraintStatus> {
        self.track_call("install_unique_constraint");
        let install_error = self.install_error.lock().unwrap().clone();
        if let Some(message) = install_error {
            return Err(StoreError::Database(message));
        }
        self.inner.install_unique_constraint().await
    }
}
