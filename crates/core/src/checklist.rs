#![forbid(unsafe_code)]

//! Checklist line items and their lifecycle.
//!
//! An item is identified by `(wo, stage, row_id)`. The main save locks it;
//! an admin unlock replaces the lock with an audit record; the next save
//! archives that audit into `previous_unlock` and locks again. The production
//! variant writes its own field group and never touches the lock.

use crate::principal::Principal;
use crate::record::ChecklistRecord;
use crate::wire::{lenient_string, non_empty};
use serde::{Deserialize, Serialize};

pub const DEFAULT_UNLOCK_REASON: &str = "No reason provided";
pub const DEFAULT_SHIFT: &str = "Morning";
pub const PRODUCTION_COMPLETED: &str = "completed";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistKey {
    #[serde(default, deserialize_with = "lenient_string")]
    wo: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    stage: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    row_id: Option<String>,
}

impl ChecklistKey {
    pub fn new(wo: impl Into<String>, stage: impl Into<String>, row_id: impl Into<String>) -> Self {
        Self {
            wo: Some(wo.into()),
            stage: Some(stage.into()),
            row_id: Some(row_id.into()),
        }
    }

    pub fn wo(&self) -> &str {
        self.wo.as_deref().unwrap_or("")
    }

    pub fn stage(&self) -> &str {
        self.stage.as_deref().unwrap_or("")
    }

    pub fn row_id(&self) -> &str {
        self.row_id.as_deref().unwrap_or("")
    }

    pub fn matches(&self, item: &ChecklistItem) -> bool {
        item.stage == self.stage() && item.row_id == self.row_id() && item.wo == self.wo()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockAudit {
    pub unlocked_by: String,
    pub unlocked_at: String,
    pub unlock_reason: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LockState {
    Locked { by: String, at: String },
    Unlocked(UnlockAudit),
}

/// Fields written by the main (quality) save.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InspectionRecord {
    pub actual_value: String,
    pub technician: String,
    pub shop_supervisor: String,
    pub qa_supervisor: String,
    pub remark: String,
    pub timestamp: String,
    pub user_id: String,
    pub user_name: String,
    pub user_role: String,
}

/// Fields written by the production save.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProductionRecord {
    pub status: String,
    pub engineer: String,
    pub notes: String,
    pub shift: String,
    pub timestamp: String,
    pub user_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "ChecklistRecord", try_from = "ChecklistRecord")]
pub struct ChecklistItem {
    pub id: String,
    pub wo: String,
    pub stage: String,
    pub row_id: String,
    pub item_number: String,
    pub customer_id: Option<String>,
    pub customer: Option<String>,
    pub inspection: Option<InspectionRecord>,
    pub production: Option<ProductionRecord>,
    pub lock: Option<LockState>,
    pub previous_unlock: Option<UnlockAudit>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl ChecklistItem {
    pub fn key(&self) -> ChecklistKey {
        ChecklistKey::new(&self.wo, &self.stage, &self.row_id)
    }

    pub fn is_locked(&self) -> bool {
        matches!(self.lock, Some(LockState::Locked { .. }))
    }

    pub fn unlock_audit(&self) -> Option<&UnlockAudit> {
        match &self.lock {
            Some(LockState::Unlocked(audit)) => Some(audit),
            _ => None,
        }
    }

    pub fn from_inspection(
        id: String,
        submission: InspectionSubmission,
        acting: &Principal,
        now: &str,
    ) -> Self {
        let InspectionSubmission { header, fields } = submission;
        Self {
            id,
            wo: header.wo,
            stage: header.stage,
            row_id: header.row_id,
            item_number: header.item_number,
            customer_id: header.customer_id,
            customer: header.customer,
            inspection: Some(fields.into_record(acting, now)),
            production: None,
            lock: Some(LockState::Locked {
                by: acting.user_id.clone(),
                at: now.to_string(),
            }),
            previous_unlock: None,
            created_at: now.to_string(),
            updated_at: None,
        }
    }

    /// Overwrites the inspection fields and locks the item. A pending unlock
    /// audit moves into `previous_unlock`; identity, `id` and `created_at`
    /// stay as they are.
    pub fn apply_inspection(
        &mut self,
        submission: InspectionSubmission,
        acting: &Principal,
        now: &str,
    ) {
        if let Some(LockState::Unlocked(audit)) = self.lock.take() {
            self.previous_unlock = Some(audit);
        }
        self.inspection = Some(submission.fields.into_record(acting, now));
        self.lock = Some(LockState::Locked {
            by: acting.user_id.clone(),
            at: now.to_string(),
        });
        self.updated_at = Some(now.to_string());
    }

    pub fn from_production(
        id: String,
        submission: ProductionSubmission,
        acting: &Principal,
        now: &str,
    ) -> Self {
        let ProductionSubmission { header, fields } = submission;
        Self {
            id,
            wo: header.wo,
            stage: header.stage,
            row_id: header.row_id,
            item_number: header.item_number,
            customer_id: header.customer_id,
            customer: header.customer,
            inspection: None,
            production: Some(fields.into_record(acting, now)),
            lock: None,
            previous_unlock: None,
            created_at: now.to_string(),
            updated_at: None,
        }
    }

    pub fn apply_production(
        &mut self,
        submission: ProductionSubmission,
        acting: &Principal,
        now: &str,
    ) {
        self.production = Some(submission.fields.into_record(acting, now));
        self.updated_at = Some(now.to_string());
    }

    /// Drops the lock and records who unlocked it and why.
    pub fn unlock(&mut self, unlocked_by: &str, reason: Option<String>, now: &str) {
        let unlock_reason = non_empty(reason).unwrap_or_else(|| DEFAULT_UNLOCK_REASON.to_string());
        self.lock = Some(LockState::Unlocked(UnlockAudit {
            unlocked_by: unlocked_by.to_string(),
            unlocked_at: now.to_string(),
            unlock_reason,
        }));
        self.updated_at = Some(now.to_string());
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MissingField {
    #[error("Missing required fields")]
    Identity,
    #[error("Actual Value is required")]
    ActualValue,
    #[error("Technician is required")]
    Technician,
}

impl MissingField {
    pub fn field(self) -> &'static str {
        match self {
            MissingField::Identity => "wo/stage/itemNumber/rowId",
            MissingField::ActualValue => "actualValue",
            MissingField::Technician => "technician",
        }
    }
}

/// Identity and customer columns shared by both save variants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemHeader {
    pub wo: String,
    pub stage: String,
    pub row_id: String,
    pub item_number: String,
    pub customer_id: Option<String>,
    pub customer: Option<String>,
}

impl ItemHeader {
    fn validate(
        wo: Option<String>,
        stage: Option<String>,
        item_number: Option<String>,
        row_id: Option<String>,
        customer_id: Option<String>,
        customer: Option<String>,
    ) -> Result<Self, MissingField> {
        match (
            non_empty(wo),
            non_empty(stage),
            non_empty(item_number),
            non_empty(row_id),
        ) {
            (Some(wo), Some(stage), Some(item_number), Some(row_id)) => Ok(Self {
                wo,
                stage,
                row_id,
                item_number,
                customer_id,
                customer,
            }),
            _ => Err(MissingField::Identity),
        }
    }

    pub fn key(&self) -> ChecklistKey {
        ChecklistKey::new(&self.wo, &self.stage, &self.row_id)
    }
}

/// Body of a main save, as received.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistEntry {
    #[serde(default, deserialize_with = "lenient_string")]
    pub wo: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub customer_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub customer: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub stage: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub item_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub row_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub actual_value: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub technician: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub shop_supervisor: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub qa_supervisor: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub remark: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub user_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub user_role: Option<String>,
}

impl ChecklistEntry {
    /// Checks run in order and the first failure wins: identity, then the
    /// actual value (blank after trimming counts as missing), then the
    /// technician.
    pub fn validate(self) -> Result<InspectionSubmission, MissingField> {
        let header = ItemHeader::validate(
            self.wo,
            self.stage,
            self.item_number,
            self.row_id,
            self.customer_id,
            self.customer,
        )?;
        let actual_value = self
            .actual_value
            .filter(|value| !value.trim().is_empty())
            .ok_or(MissingField::ActualValue)?;
        let technician = non_empty(self.technician).ok_or(MissingField::Technician)?;

        Ok(InspectionSubmission {
            header,
            fields: InspectionFields {
                actual_value,
                technician,
                shop_supervisor: self.shop_supervisor,
                qa_supervisor: self.qa_supervisor,
                remark: self.remark,
                timestamp: non_empty(self.timestamp),
                user_id: non_empty(self.user_id),
                user_name: non_empty(self.user_name),
                user_role: non_empty(self.user_role),
            },
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InspectionSubmission {
    pub header: ItemHeader,
    fields: InspectionFields,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct InspectionFields {
    actual_value: String,
    technician: String,
    shop_supervisor: Option<String>,
    qa_supervisor: Option<String>,
    remark: Option<String>,
    timestamp: Option<String>,
    user_id: Option<String>,
    user_name: Option<String>,
    user_role: Option<String>,
}

impl InspectionFields {
    // Explicit user fields in the body win over the acting principal.
    fn into_record(self, acting: &Principal, now: &str) -> InspectionRecord {
        InspectionRecord {
            actual_value: self.actual_value,
            technician: self.technician,
            shop_supervisor: self.shop_supervisor.unwrap_or_default(),
            qa_supervisor: self.qa_supervisor.unwrap_or_default(),
            remark: self.remark.unwrap_or_default(),
            timestamp: self.timestamp.unwrap_or_else(|| now.to_string()),
            user_id: self.user_id.unwrap_or_else(|| acting.user_id.clone()),
            user_name: self.user_name.unwrap_or_else(|| acting.name.clone()),
            user_role: self
                .user_role
                .unwrap_or_else(|| acting.role.as_str().to_string()),
        }
    }
}

/// Body of a production save, as received.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionEntry {
    #[serde(default, deserialize_with = "lenient_string")]
    pub wo: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub customer_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub customer: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub stage: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub item_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub row_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub production_notes: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub shift: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub timestamp: Option<String>,
}

impl ProductionEntry {
    pub fn validate(self) -> Result<ProductionSubmission, MissingField> {
        let header = ItemHeader::validate(
            self.wo,
            self.stage,
            self.item_number,
            self.row_id,
            self.customer_id,
            self.customer,
        )?;
        Ok(ProductionSubmission {
            header,
            fields: ProductionFields {
                notes: self.production_notes,
                shift: non_empty(self.shift),
                timestamp: non_empty(self.timestamp),
            },
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProductionSubmission {
    pub header: ItemHeader,
    fields: ProductionFields,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct ProductionFields {
    notes: Option<String>,
    shift: Option<String>,
    timestamp: Option<String>,
}

impl ProductionFields {
    fn into_record(self, acting: &Principal, now: &str) -> ProductionRecord {
        ProductionRecord {
            status: PRODUCTION_COMPLETED.to_string(),
            engineer: acting.name.clone(),
            notes: self.notes.unwrap_or_default(),
            shift: self.shift.unwrap_or_else(|| DEFAULT_SHIFT.to_string()),
            timestamp: self.timestamp.unwrap_or_else(|| now.to_string()),
            user_id: acting.user_id.clone(),
        }
    }
}

/// Body of an unlock request.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockEntry {
    #[serde(flatten)]
    pub key: ChecklistKey,
    #[serde(default, deserialize_with = "lenient_string")]
    pub reason: Option<String>,
}
