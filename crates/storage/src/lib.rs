#![forbid(unsafe_code)]

//! Persistence for the QC tracker: record stores for the five collections and
//! the engines that run over them.

mod attachments;
mod checklist;
mod error;
pub mod records;
pub mod support;
mod transformers;
mod uploads;
mod users;

pub use attachments::{Attachment, AttachmentKind, AttachmentMeta, AttachmentRegistry};
pub use checklist::{ChecklistBook, ChecklistError};
pub use error::StoreError;
pub use records::{Collection, JsonFileStore, RecordStore, SqliteStore, Table};
pub use transformers::{Transformer, TransformerRegistry};
pub use uploads::{DEFAULT_MAX_UPLOAD_BYTES, StoredUpload, UploadError, UploadSink};
pub use users::{CustomerSummary, UserDirectory, UserRecord, default_users};
