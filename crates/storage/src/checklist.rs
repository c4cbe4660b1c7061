#![forbid(unsafe_code)]

use crate::records::{Collection, RecordStore, Table};
use crate::support::{new_id, now_rfc3339};
use crate::StoreError;
use qc_core::{
    AccessError, ChecklistEntry, ChecklistItem, MissingField, Principal, ProductionEntry, Role,
    UnlockEntry, authorize, visible_to,
};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ChecklistError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    MissingField(#[from] MissingField),
    #[error("Checklist item not found")]
    NotFound,
    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Checklist lifecycle over the `checklists` collection.
///
/// Every mutation is a full read-modify-write under the collection lock, so
/// save, production save, unlock and clear are atomic with respect to each
/// other. Validation and permission checks run before the collection is
/// touched.
pub struct ChecklistBook {
    table: Table<ChecklistItem>,
}

impl ChecklistBook {
    pub const SAVE_ROLE: Role = Role::Production;
    pub const ADMIN_ROLE: Role = Role::Admin;

    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            table: Table::new(store, Collection::Checklists),
        }
    }

    pub fn save(
        &self,
        principal: Option<&Principal>,
        entry: ChecklistEntry,
    ) -> Result<ChecklistItem, ChecklistError> {
        let acting = authorize(principal, Self::SAVE_ROLE)?;
        let submission = entry.validate()?;
        let header = submission.header.clone();
        let key = header.key();
        let now = now_rfc3339();

        self.table.update(|items| {
            let saved = match items.iter_mut().find(|item| key.matches(item)) {
                Some(existing) => {
                    existing.apply_inspection(submission, acting, &now);
                    tracing::info!(
                        stage = %header.stage,
                        item_number = %header.item_number,
                        wo = %header.wo,
                        "updated checklist item"
                    );
                    existing.clone()
                }
                None => {
                    let item = ChecklistItem::from_inspection(new_id(), submission, acting, &now);
                    items.push(item.clone());
                    tracing::info!(
                        stage = %header.stage,
                        item_number = %header.item_number,
                        wo = %header.wo,
                        "saved checklist item"
                    );
                    item
                }
            };
            Ok(saved)
        })
    }

    /// Writes only the production field group; the lock is left as it is.
    pub fn save_production(
        &self,
        principal: Option<&Principal>,
        entry: ProductionEntry,
    ) -> Result<ChecklistItem, ChecklistError> {
        let acting = authorize(principal, Self::SAVE_ROLE)?;
        let submission = entry.validate()?;
        let header = submission.header.clone();
        let key = header.key();
        let now = now_rfc3339();

        self.table.update(|items| {
            let saved = match items.iter_mut().find(|item| key.matches(item)) {
                Some(existing) => {
                    existing.apply_production(submission, acting, &now);
                    existing.clone()
                }
                None => {
                    let item = ChecklistItem::from_production(new_id(), submission, acting, &now);
                    items.push(item.clone());
                    item
                }
            };
            tracing::info!(
                stage = %header.stage,
                item_number = %header.item_number,
                wo = %header.wo,
                engineer = %acting.name,
                "production work recorded"
            );
            Ok(saved)
        })
    }

    /// Items for `(stage, wo)` in stored order. Customers only see their own.
    pub fn list(
        &self,
        principal: Option<&Principal>,
        stage: &str,
        wo: &str,
    ) -> Result<Vec<ChecklistItem>, ChecklistError> {
        let items = self
            .table
            .read()?
            .into_iter()
            .filter(|item| item.stage == stage && item.wo == wo)
            .filter(|item| visible_to(principal, item.customer_id.as_deref()))
            .collect::<Vec<_>>();
        tracing::debug!(stage, wo, count = items.len(), "loaded checklist items");
        Ok(items)
    }

    pub fn unlock(
        &self,
        principal: Option<&Principal>,
        entry: UnlockEntry,
    ) -> Result<ChecklistItem, ChecklistError> {
        let acting = authorize(principal, Self::ADMIN_ROLE)?;
        let UnlockEntry { key, reason } = entry;
        let now = now_rfc3339();

        self.table.update(|items| {
            let item = items
                .iter_mut()
                .find(|item| key.matches(item))
                .ok_or(ChecklistError::NotFound)?;
            item.unlock(&acting.user_id, reason, &now);
            tracing::info!(
                stage = key.stage(),
                row_id = key.row_id(),
                wo = key.wo(),
                unlocked_by = %acting.user_id,
                reason = item.unlock_audit().map(|audit| audit.unlock_reason.as_str()),
                "unlocked checklist item"
            );
            Ok(item.clone())
        })
    }

    /// Removes every item of `(stage, wo)` regardless of row or lock state.
    /// Irreversible; returns how many items were removed.
    pub fn clear(
        &self,
        principal: Option<&Principal>,
        stage: &str,
        wo: &str,
    ) -> Result<usize, ChecklistError> {
        authorize(principal, Self::ADMIN_ROLE)?;

        self.table.update(|items| {
            let before = items.len();
            items.retain(|item| !(item.stage == stage && item.wo == wo));
            let deleted = before - items.len();
            tracing::warn!(stage, wo, deleted, "cleared checklist items");
            Ok(deleted)
        })
    }
}
