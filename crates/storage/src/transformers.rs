#![forbid(unsafe_code)]

use crate::records::{Collection, RecordStore, Table};
use crate::support::{new_id, now_rfc3339};
use crate::StoreError;
use qc_core::{Principal, visible_to};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

const ID: &str = "id";
const AUDIT_FIELDS: [&str; 4] = ["createdBy", "createdAt", "updatedBy", "updatedAt"];

/// Work-order record. The schema is open: every field the client sends is
/// kept; only `id` and the audit stamps are owned by the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transformer {
    fields: Map<String, Value>,
}

impl Transformer {
    pub fn id(&self) -> Option<&str> {
        self.text(ID)
    }

    pub fn wo(&self) -> Option<&str> {
        self.text("wo")
    }

    pub fn customer_id(&self) -> Option<&str> {
        self.text("customerId")
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }

    fn text(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    fn stamp(&mut self, field: &str, value: &str) {
        self.fields
            .insert(field.to_string(), Value::String(value.to_string()));
    }
}

fn client_fields(mut body: Map<String, Value>) -> Map<String, Value> {
    body.remove(ID);
    for field in AUDIT_FIELDS {
        body.remove(field);
    }
    body
}

pub struct TransformerRegistry {
    table: Table<Transformer>,
}

impl TransformerRegistry {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            table: Table::new(store, Collection::Transformers),
        }
    }

    pub fn list(&self, viewer: Option<&Principal>) -> Result<Vec<Transformer>, StoreError> {
        Ok(self
            .table
            .read()?
            .into_iter()
            .filter(|transformer| visible_to(viewer, transformer.customer_id()))
            .collect())
    }

    pub fn create(
        &self,
        body: Map<String, Value>,
        created_by: &Principal,
    ) -> Result<Transformer, StoreError> {
        let mut transformer = Transformer {
            fields: client_fields(body),
        };
        transformer.stamp(ID, &new_id());
        transformer.stamp("createdBy", &created_by.user_id);
        transformer.stamp("createdAt", &now_rfc3339());

        self.table.update(|rows| {
            rows.push(transformer.clone());
            Ok::<_, StoreError>(())
        })?;
        tracing::info!(wo = transformer.wo().unwrap_or(""), "transformer added");
        Ok(transformer)
    }

    /// Shallow-merges `patch` over the stored record. `None` when no record
    /// has this id.
    pub fn update(
        &self,
        id: &str,
        patch: Map<String, Value>,
        updated_by: &Principal,
    ) -> Result<Option<Transformer>, StoreError> {
        let now = now_rfc3339();
        self.table.update(|rows| {
            let Some(row) = rows.iter_mut().find(|row| row.id() == Some(id)) else {
                return Ok(None);
            };
            row.fields.extend(client_fields(patch));
            row.stamp("updatedBy", &updated_by.user_id);
            row.stamp("updatedAt", &now);
            Ok(Some(row.clone()))
        })
    }

    pub fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let removed = self.table.update(|rows| {
            let before = rows.len();
            rows.retain(|row| row.id() != Some(id));
            Ok::<_, StoreError>(before != rows.len())
        })?;
        if removed {
            tracing::info!(id, "transformer deleted");
        }
        Ok(removed)
    }
}
