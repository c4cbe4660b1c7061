#![forbid(unsafe_code)]

pub mod access;
pub mod checklist;
pub mod principal;
pub mod record;
pub mod role;
pub mod wire;

pub use access::{AccessError, authorize};
pub use checklist::{
    ChecklistEntry, ChecklistItem, ChecklistKey, InspectionRecord, InspectionSubmission,
    ItemHeader, LockState, MissingField, ProductionEntry, ProductionRecord, ProductionSubmission,
    UnlockAudit, UnlockEntry,
};
pub use principal::{Principal, visible_to};
pub use record::{ChecklistRecord, RecordShapeError};
pub use role::{Role, UnknownRole};
