#![forbid(unsafe_code)]

use crate::records::{Collection, RecordStore, Table};
use crate::support::{new_id, now_rfc3339};
use crate::uploads::StoredUpload;
use crate::StoreError;
use qc_core::{Principal, visible_to};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttachmentKind {
    Bom,
    Document,
}

impl AttachmentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AttachmentKind::Bom => "bom",
            AttachmentKind::Document => "document",
        }
    }

    fn collection(self) -> Collection {
        match self {
            AttachmentKind::Bom => Collection::Boms,
            AttachmentKind::Document => Collection::Documents,
        }
    }
}

/// Metadata of an uploaded BOM or supporting document. Rows written before
/// digests were recorded lack `storedName`, `size` and `sha256`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    pub filename: String,
    pub filepath: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stored_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    pub uploaded_by: String,
    pub uploaded_at: String,
}

/// Text parts that accompany an upload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AttachmentMeta {
    pub wo: Option<String>,
    pub customer_id: Option<String>,
    pub doc_type: Option<String>,
}

pub struct AttachmentRegistry {
    kind: AttachmentKind,
    table: Table<Attachment>,
}

impl AttachmentRegistry {
    pub fn new(store: Arc<dyn RecordStore>, kind: AttachmentKind) -> Self {
        Self {
            kind,
            table: Table::new(store, kind.collection()),
        }
    }

    pub fn kind(&self) -> AttachmentKind {
        self.kind
    }

    pub fn add(
        &self,
        meta: AttachmentMeta,
        upload: StoredUpload,
        uploaded_by: &Principal,
    ) -> Result<Attachment, StoreError> {
        let attachment = Attachment {
            id: new_id(),
            wo: meta.wo,
            customer_id: meta.customer_id,
            doc_type: match self.kind {
                AttachmentKind::Document => meta.doc_type,
                AttachmentKind::Bom => None,
            },
            filename: upload.original_name,
            filepath: upload.path.to_string_lossy().into_owned(),
            stored_name: Some(upload.stored_name),
            size: Some(upload.size),
            sha256: Some(upload.sha256),
            uploaded_by: uploaded_by.user_id.clone(),
            uploaded_at: now_rfc3339(),
        };
        self.table.update(|rows| {
            rows.push(attachment.clone());
            Ok::<_, StoreError>(())
        })?;
        tracing::info!(
            kind = self.kind.as_str(),
            wo = attachment.wo.as_deref().unwrap_or(""),
            filename = %attachment.filename,
            "attachment uploaded"
        );
        Ok(attachment)
    }

    pub fn list_for_wo(
        &self,
        wo: &str,
        viewer: Option<&Principal>,
    ) -> Result<Vec<Attachment>, StoreError> {
        Ok(self
            .table
            .read()?
            .into_iter()
            .filter(|row| row.wo.as_deref() == Some(wo))
            .filter(|row| visible_to(viewer, row.customer_id.as_deref()))
            .collect())
    }

    /// Drops the record and hands it back so the caller can discard the file.
    pub fn remove(&self, id: &str) -> Result<Option<Attachment>, StoreError> {
        let removed = self.table.update(|rows| {
            let position = rows.iter().position(|row| row.id == id);
            Ok::<_, StoreError>(position.map(|index| rows.remove(index)))
        })?;
        if removed.is_some() {
            tracing::info!(kind = self.kind.as_str(), id, "attachment deleted");
        }
        Ok(removed)
    }
}
