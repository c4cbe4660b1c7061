#![forbid(unsafe_code)]

use super::{Collection, RecordStore};
use crate::StoreError;
use serde_json::Value;
use std::io::Write as _;
use std::path::{Path, PathBuf};

/// One pretty-printed JSON array per collection, `<data_dir>/<name>.json`.
#[derive(Debug)]
pub struct JsonFileStore {
    data_dir: PathBuf,
}

impl JsonFileStore {
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;
        let store = Self { data_dir };
        for collection in Collection::ALL {
            let path = store.path_for(collection);
            if !path.exists() {
                write_atomic(&path, b"[]")?;
                tracing::info!(path = %path.display(), "created collection file");
            }
        }
        Ok(store)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn path_for(&self, collection: Collection) -> PathBuf {
        self.data_dir.join(format!("{}.json", collection.name()))
    }
}

impl RecordStore for JsonFileStore {
    fn load_all(&self, collection: Collection) -> Result<Vec<Value>, StoreError> {
        let bytes = match std::fs::read(self.path_for(collection)) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        let value = serde_json::from_slice::<Value>(&bytes)
            .map_err(|err| StoreError::corrupt(collection.name(), err.to_string()))?;
        match value {
            Value::Array(records) => Ok(records),
            _ => Err(StoreError::corrupt(
                collection.name(),
                "expected a JSON array",
            )),
        }
    }

    fn save_all(&self, collection: Collection, records: &[Value]) -> Result<(), StoreError> {
        let text = serde_json::to_vec_pretty(records)?;
        write_atomic(&self.path_for(collection), &text)?;
        Ok(())
    }
}

// Write-then-rename: readers see either the previous or the new collection,
// never a truncated file.
fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    std::fs::rename(tmp, path)
}
