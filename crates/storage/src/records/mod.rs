#![forbid(unsafe_code)]

//! Whole-collection record stores.
//!
//! Every collection is a flat, ordered list of JSON records. Backends only
//! know how to load and replace a collection; [`Table`] layers typed decoding
//! and a per-collection write lock on top so read-modify-write cycles never
//! interleave.

mod json_file;
mod sqlite;

pub use json_file::JsonFileStore;
pub use sqlite::SqliteStore;

use crate::StoreError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Transformers,
    Boms,
    Documents,
    Checklists,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Users,
        Collection::Transformers,
        Collection::Boms,
        Collection::Documents,
        Collection::Checklists,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Transformers => "transformers",
            Collection::Boms => "boms",
            Collection::Documents => "documents",
            Collection::Checklists => "checklists",
        }
    }
}

pub trait RecordStore: Send + Sync {
    /// Loads every record of `collection` in stored order. A collection that
    /// was never written is empty.
    fn load_all(&self, collection: Collection) -> Result<Vec<Value>, StoreError>;

    /// Replaces the whole collection.
    fn save_all(&self, collection: Collection, records: &[Value]) -> Result<(), StoreError>;
}

/// Typed view over one collection.
pub struct Table<T> {
    store: Arc<dyn RecordStore>,
    collection: Collection,
    write_lock: Mutex<()>,
    _record: PhantomData<fn() -> T>,
}

impl<T> Table<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(store: Arc<dyn RecordStore>, collection: Collection) -> Self {
        Self {
            store,
            collection,
            write_lock: Mutex::new(()),
            _record: PhantomData,
        }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub fn read(&self) -> Result<Vec<T>, StoreError> {
        let name = self.collection.name();
        self.store
            .load_all(self.collection)?
            .into_iter()
            .enumerate()
            .map(|(index, value)| {
                serde_json::from_value(value)
                    .map_err(|err| StoreError::corrupt(name, format!("record {index}: {err}")))
            })
            .collect()
    }

    /// Runs `mutate` over the full collection while holding the collection's
    /// write lock. The collection is written back only when `mutate` returns
    /// `Ok`.
    pub fn update<R, E>(&self, mutate: impl FnOnce(&mut Vec<T>) -> Result<R, E>) -> Result<R, E>
    where
        E: From<StoreError>,
    {
        // Guards no data; a panicked `mutate` never reached `save_all`.
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let mut rows = self.read()?;
        let out = mutate(&mut rows)?;
        let values = rows
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)?;
        self.store.save_all(self.collection, &values)?;
        Ok(out)
    }
}
