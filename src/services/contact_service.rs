//! Contact service layer.
//!
//! Business logic for listing, editing and searching one user's contacts.

use crate::config::Config;
use crate::domain::{ContactId, UserId};
use crate::error::{StoreError, StoreResult};
use crate::metrics::Metrics;
use crate::models::{Contact, ContactPage, ContactPatch, NewContact};
use crate::repositories::ContactRepository;
use crate::search::{SearchEngine, SearchResult};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Contact service trait for business operations.
#[async_trait]
pub trait ContactService: Send + Sync {
    /// One page of the user's contacts, ordered by name.
    ///
    /// `limit` is clamped to the configured maximum page size.
    async fn list_contacts(
        &self,
        user_id: UserId,
        offset: usize,
        limit: usize,
    ) -> StoreResult<ContactPage>;

    async fn get_contact(&self, user_id: UserId, id: ContactId) -> StoreResult<Contact>;

    /// Create a contact; fails with `DuplicatePhone` if the user already
    /// has a contact with this phone number.
    async fn create_contact(&self, user_id: UserId, contact: NewContact) -> StoreResult<Contact>;

    /// Apply a partial update. An empty patch returns the contact unchanged.
    async fn update_contact(
        &self,
        user_id: UserId,
        id: ContactId,
        patch: ContactPatch,
    ) -> StoreResult<Contact>;

    async fn delete_contact(&self, user_id: UserId, id: ContactId) -> StoreResult<()>;

    /// Search the user's contacts with the two-tier engine.
    async fn search_contacts(&self, user_id: UserId, query: &str) -> StoreResult<SearchResult>;
}

/// Default implementation of ContactService.
pub struct ContactServiceImpl {
    repo: Arc<dyn ContactRepository>,
    engine: SearchEngine,
    metrics: Metrics,
    max_fetch: usize,
    max_page_size: usize,
}

impl ContactServiceImpl {
    /// Create a new contact service.
    pub fn new(repo: Arc<dyn ContactRepository>, config: &Config, metrics: Metrics) -> Self {
        Self {
            repo,
            engine: SearchEngine::new(config.search_options()),
            metrics,
            max_fetch: config.search_max_fetch,
            max_page_size: config.list_max_page_size,
        }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    fn log_write_error(action: &str, user_id: UserId, error: &StoreError) {
        match error {
            StoreError::DuplicatePhone { phone, .. } => {
                warn!(%user_id, %phone, action, "Rejected duplicate phone number")
            }
            e if e.is_recoverable() => debug!(%user_id, action, error = %e, "Contact write rejected"),
            e => warn!(%user_id, action, error = %e, "Contact write failed"),
        }
    }
}

#[async_trait]
impl ContactService for ContactServiceImpl {
    async fn list_contacts(
        &self,
        user_id: UserId,
        offset: usize,
        limit: usize,
    ) -> StoreResult<ContactPage> {
        let limit = limit.min(self.max_page_size);
        self.repo.list(user_id, offset, limit).await
    }

    async fn get_contact(&self, user_id: UserId, id: ContactId) -> StoreResult<Contact> {
        self.repo.get(user_id, id).await
    }

    async fn create_contact(&self, user_id: UserId, contact: NewContact) -> StoreResult<Contact> {
        match self.repo.create(user_id, contact).await {
            Ok(created) => {
                info!(%user_id, contact_id = %created.id, "Contact created");
                Ok(created)
            }
            Err(e) => {
                Self::log_write_error("create", user_id, &e);
                Err(e)
            }
        }
    }

    async fn update_contact(
        &self,
        user_id: UserId,
        id: ContactId,
        patch: ContactPatch,
    ) -> StoreResult<Contact> {
        let patch = patch.validate()?;
        if patch.is_empty() {
            return self.repo.get(user_id, id).await;
        }

        match self.repo.update(user_id, id, patch).await {
            Ok(updated) => {
                info!(%user_id, contact_id = %id, "Contact updated");
                Ok(updated)
            }
            Err(e) => {
                Self::log_write_error("update", user_id, &e);
                Err(e)
            }
        }
    }

    async fn delete_contact(&self, user_id: UserId, id: ContactId) -> StoreResult<()> {
        self.repo.delete(user_id, id).await?;
        info!(%user_id, contact_id = %id, "Contact deleted");
        Ok(())
    }

    async fn search_contacts(&self, user_id: UserId, query: &str) -> StoreResult<SearchResult> {
        let page = self.repo.list(user_id, 0, self.max_fetch).await?;
        if page.total > page.contacts.len() {
            debug!(
                %user_id,
                total = page.total,
                fetched = page.contacts.len(),
                "Search limited to the first fetched contacts"
            );
        }

        let result = self.engine.search(&page.contacts, query);
        self.metrics.record_search(result.mode, result.total);
        Ok(result)
    }
}
