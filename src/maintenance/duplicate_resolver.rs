//! Duplicate phone repair and uniqueness-constraint installation.
//!
//! A run has three steps:
//! 1. list every `(user_id, phone)` group with more than one contact
//! 2. per group, keep the oldest contact (smallest id) and delete the rest in
//!    one store transaction; a failed group is recorded and the run moves on
//! 3. install the `(user_id, phone)` uniqueness constraint
//!
//! Running it again finds nothing to repair and reports the constraint as
//! already present.

use crate::domain::{ContactId, UserId};
use crate::error::{ResolverError, ResolverResult, StoreError};
use crate::metrics::Metrics;
use crate::repositories::{ConstraintStatus, ContactRepository, ViolationGroup};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// A group the resolver could not make unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairFailure {
    pub user_id: UserId,
    pub phone: String,
    pub reason: String,
}

/// What happened to one violation group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GroupOutcome {
    Repaired {
        user_id: UserId,
        phone: String,
        survivor: ContactId,
        removed: Vec<ContactId>,
    },
    Failed(RepairFailure),
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionReport {
    /// Violation groups found by the scan
    pub groups_found: usize,

    /// One entry per group, in scan order
    pub outcomes: Vec<GroupOutcome>,

    /// Contacts deleted across all groups
    pub contacts_removed: usize,

    /// State of the uniqueness constraint after the run
    pub constraint: ConstraintStatus,
}

impl ResolutionReport {
    pub fn failures(&self) -> impl Iterator<Item = &RepairFailure> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            GroupOutcome::Failed(failure) => Some(failure),
            GroupOutcome::Repaired { .. } => None,
        })
    }
}

/// Repairs per-user duplicate phones and installs the uniqueness constraint.
///
/// Intended to run with no concurrent writers on the affected keys. Each
/// group is repaired by a single store transaction that also removes rows
/// inserted after the scan, so a racing create cannot leave the group
/// duplicated.
pub struct DuplicateResolver {
    repo: Arc<dyn ContactRepository>,
    metrics: Metrics,
}

impl DuplicateResolver {
    pub fn new(repo: Arc<dyn ContactRepository>) -> Self {
        Self::with_metrics(repo, Metrics::new())
    }

    pub fn with_metrics(repo: Arc<dyn ContactRepository>, metrics: Metrics) -> Self {
        Self { repo, metrics }
    }

    /// The contact kept from a group: the earliest-assigned id.
    pub fn select_survivor(group: &ViolationGroup) -> Option<ContactId> {
        group.contact_ids.iter().min().copied()
    }

    /// Repair every violation group, then install the constraint.
    ///
    /// # Errors
    ///
    /// - `ResolverError::Detection` when the scan itself fails
    /// - `ResolverError::RepairIncomplete` when the store still holds
    ///   duplicates at install time
    /// - `ResolverError::ConstraintInstallFailure` for any other install error
    ///
    /// Both install errors carry every group outcome, including the
    /// repairs that were already committed.
    ///
    /// Individual group failures are not errors; they are listed in the
    /// report (and in `RepairIncomplete` if they block the constraint).
    pub async fn resolve_and_constrain(&self) -> ResolverResult<ResolutionReport> {
        let groups = self
            .repo
            .find_uniqueness_violations()
            .await
            .map_err(ResolverError::Detection)?;

        if groups.is_empty() {
            info!("No duplicate phone numbers found");
        } else {
            warn!(groups = groups.len(), "Found duplicate phone numbers");
        }

        let mut outcomes = Vec::with_capacity(groups.len());
        for group in &groups {
            outcomes.push(self.repair_group(group).await);
        }

        let contacts_removed = outcomes
            .iter()
            .map(|outcome| match outcome {
                GroupOutcome::Repaired { removed, .. } => removed.len(),
                GroupOutcome::Failed(_) => 0,
            })
            .sum();

        let constraint = match self.repo.install_unique_constraint().await {
            Ok(status) => status,
            Err(StoreError::ViolationsRemain(remaining)) => {
                error!(
                    remaining,
                    failed_groups = outcomes
                        .iter()
                        .filter(|outcome| matches!(outcome, GroupOutcome::Failed(_)))
                        .count(),
                    "Cannot install uniqueness constraint: duplicates remain"
                );
                return Err(ResolverError::RepairIncomplete {
                    remaining,
                    outcomes,
                });
            }
            Err(e) => {
                error!(error = %e, "Failed to install uniqueness constraint");
                return Err(ResolverError::ConstraintInstallFailure {
                    source: e,
                    outcomes,
                });
            }
        };

        match constraint {
            ConstraintStatus::Installed => info!("Unique constraint on (user_id, phone) installed"),
            ConstraintStatus::AlreadyPresent => info!("Unique constraint already present"),
        }

        Ok(ResolutionReport {
            groups_found: groups.len(),
            outcomes,
            contacts_removed,
            constraint,
        })
    }

    async fn repair_group(&self, group: &ViolationGroup) -> GroupOutcome {
        let failed = |reason: String| {
            self.metrics.record_repair_failure();
            warn!(
                user_id = %group.user_id,
                phone = %group.phone,
                reason = %reason,
                "Duplicate group repair failed"
            );
            GroupOutcome::Failed(RepairFailure {
                user_id: group.user_id,
                phone: group.phone.clone(),
                reason,
            })
        };

        let Some(survivor) = Self::select_survivor(group) else {
            return failed("group has no members".to_string());
        };

        match self.repo.remove_duplicates(group, survivor).await {
            Ok(removed) => {
                self.metrics.record_duplicates_removed(removed.len());
                info!(
                    user_id = %group.user_id,
                    phone = %group.phone,
                    survivor = %survivor,
                    removed = removed.len(),
                    "Removed duplicate contacts"
                );
                GroupOutcome::Repaired {
                    user_id: group.user_id,
                    phone: group.phone.clone(),
                    survivor,
                    removed,
                }
            }
            Err(e) => failed(e.to_string()),
        }
    }
}
