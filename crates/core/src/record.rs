#![forbid(unsafe_code)]

//! Flat JSON shape of a checklist item as stored in the `checklists`
//! collection. Lock and unlock columns are presence-encoded on disk; the
//! conversion into [`ChecklistItem`] turns them into a single [`LockState`].

use crate::checklist::{ChecklistItem, InspectionRecord, LockState, ProductionRecord, UnlockAudit};
use crate::wire::lenient_string;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    wo: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    customer_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    customer: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    stage: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    item_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    row_id: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    actual_value: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    technician: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    shop_supervisor: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    qa_supervisor: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    remark: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    timestamp: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    user_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    user_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    user_role: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    locked: Option<bool>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    locked_by: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    locked_at: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    unlocked_by: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    unlocked_at: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    unlock_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    previous_unlock: Option<UnlockAudit>,

    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    production_status: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    production_engineer: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    production_notes: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    production_shift: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    production_timestamp: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    production_user_id: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    created_at: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    updated_at: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RecordShapeError {
    #[error("checklist record is missing `{0}`")]
    Missing(&'static str),
    #[error("checklist record carries both lock and unlock fields")]
    LockAndUnlock,
    #[error("checklist record is unlocked without an unlock audit")]
    UnlockedWithoutAudit,
}

fn required(value: Option<String>, field: &'static str) -> Result<String, RecordShapeError> {
    value.ok_or(RecordShapeError::Missing(field))
}

impl TryFrom<ChecklistRecord> for ChecklistItem {
    type Error = RecordShapeError;

    fn try_from(record: ChecklistRecord) -> Result<Self, Self::Error> {
        let has_lock_fields = record.locked_by.is_some() || record.locked_at.is_some();
        let has_unlock_fields = record.unlocked_by.is_some()
            || record.unlocked_at.is_some()
            || record.unlock_reason.is_some();

        let mut previous_unlock = record.previous_unlock;
        let lock = match record.locked {
            Some(true) => {
                // Rows relocked by older writers kept the unlock columns beside
                // the lock; they belong in the archive.
                if previous_unlock.is_none()
                    && let Some(unlocked_by) = record.unlocked_by
                {
                    previous_unlock = Some(UnlockAudit {
                        unlocked_by,
                        unlocked_at: record.unlocked_at.unwrap_or_default(),
                        unlock_reason: record.unlock_reason.unwrap_or_default(),
                    });
                }
                Some(LockState::Locked {
                    by: required(record.locked_by, "lockedBy")?,
                    at: required(record.locked_at, "lockedAt")?,
                })
            }
            Some(false) if has_lock_fields => return Err(RecordShapeError::LockAndUnlock),
            Some(false) => match record.unlocked_by {
                Some(unlocked_by) => Some(LockState::Unlocked(UnlockAudit {
                    unlocked_by,
                    unlocked_at: required(record.unlocked_at, "unlockedAt")?,
                    unlock_reason: record.unlock_reason.unwrap_or_default(),
                })),
                None => return Err(RecordShapeError::UnlockedWithoutAudit),
            },
            None if has_lock_fields || has_unlock_fields => {
                return Err(RecordShapeError::Missing("locked"));
            }
            None => None,
        };

        let inspection = record.actual_value.map(|actual_value| InspectionRecord {
            actual_value,
            technician: record.technician.unwrap_or_default(),
            shop_supervisor: record.shop_supervisor.unwrap_or_default(),
            qa_supervisor: record.qa_supervisor.unwrap_or_default(),
            remark: record.remark.unwrap_or_default(),
            timestamp: record.timestamp.unwrap_or_default(),
            user_id: record.user_id.unwrap_or_default(),
            user_name: record.user_name.unwrap_or_default(),
            user_role: record.user_role.unwrap_or_default(),
        });

        let production = record.production_status.map(|status| ProductionRecord {
            status,
            engineer: record.production_engineer.unwrap_or_default(),
            notes: record.production_notes.unwrap_or_default(),
            shift: record.production_shift.unwrap_or_default(),
            timestamp: record.production_timestamp.unwrap_or_default(),
            user_id: record.production_user_id.unwrap_or_default(),
        });

        Ok(ChecklistItem {
            id: required(record.id, "id")?,
            wo: required(record.wo, "wo")?,
            stage: required(record.stage, "stage")?,
            row_id: required(record.row_id, "rowId")?,
            item_number: record.item_number.unwrap_or_default(),
            customer_id: record.customer_id,
            customer: record.customer,
            inspection,
            production,
            lock,
            previous_unlock,
            created_at: record.created_at.unwrap_or_default(),
            updated_at: record.updated_at,
        })
    }
}

impl From<ChecklistItem> for ChecklistRecord {
    fn from(item: ChecklistItem) -> Self {
        let mut record = ChecklistRecord {
            id: Some(item.id),
            wo: Some(item.wo),
            customer_id: item.customer_id,
            customer: item.customer,
            stage: Some(item.stage),
            item_number: Some(item.item_number),
            row_id: Some(item.row_id),
            previous_unlock: item.previous_unlock,
            created_at: Some(item.created_at),
            updated_at: item.updated_at,
            ..ChecklistRecord::default()
        };

        if let Some(inspection) = item.inspection {
            record.actual_value = Some(inspection.actual_value);
            record.technician = Some(inspection.technician);
            record.shop_supervisor = Some(inspection.shop_supervisor);
            record.qa_supervisor = Some(inspection.qa_supervisor);
            record.remark = Some(inspection.remark);
            record.timestamp = Some(inspection.timestamp);
            record.user_id = Some(inspection.user_id);
            record.user_name = Some(inspection.user_name);
            record.user_role = Some(inspection.user_role);
        }

        if let Some(production) = item.production {
            record.production_status = Some(production.status);
            record.production_engineer = Some(production.engineer);
            record.production_notes = Some(production.notes);
            record.production_shift = Some(production.shift);
            record.production_timestamp = Some(production.timestamp);
            record.production_user_id = Some(production.user_id);
        }

        match item.lock {
            Some(LockState::Locked { by, at }) => {
                record.locked = Some(true);
                record.locked_by = Some(by);
                record.locked_at = Some(at);
            }
            Some(LockState::Unlocked(audit)) => {
                record.locked = Some(false);
                record.unlocked_by = Some(audit.unlocked_by);
                record.unlocked_at = Some(audit.unlocked_at);
                record.unlock_reason = Some(audit.unlock_reason);
            }
            None => {}
        }

        record
    }
}
