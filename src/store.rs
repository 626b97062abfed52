use serde_json as json;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store file not found: {0}")]
    NotFound(PathBuf),

    #[error("store file {path} holds invalid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        source: json::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A whole-file JSON key-value store: one JSON document per file, always
/// read and rewritten in full. `update` gives read-merge-write semantics.
#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
    file: String,
}

impl JsonStore {
    pub fn new(dir: impl Into<PathBuf>, file: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            file: file.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file)
    }

    pub fn read(&self) -> Result<json::Value, StoreError> {
        let path = self.path();
        let fh = match std::fs::File::open(&path) {
            Ok(fh) => fh,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(path));
            }
            Err(e) => return Err(e.into()),
        };

        json::from_reader(fh).map_err(|source| StoreError::Corrupt { path, source })
    }

    /// Replaces the file's content with `value`, creating parent directories
    /// as needed. Writes to a temp file in the same directory and renames it
    /// over the target so readers never observe a half-written store.
    pub fn write(&self, value: &json::Value) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        json::to_writer(&mut tmp, value).map_err(std::io::Error::from)?;
        tmp.flush()?;
        tmp.persist(self.path()).map_err(|e| e.error)?;
        Ok(())
    }

    /// Serializes `value` at the end of the file, no merge. Raw log use
    /// only; not part of the metadata path.
    pub fn append(&self, value: &json::Value) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)?;

        let mut fh = std::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(self.path())?;

        json::to_writer(&mut fh, value).map_err(std::io::Error::from)?;
        fh.write_all(b"\n")?;
        Ok(())
    }

    /// Merges the keys of `partial` into the stored JSON object (colliding
    /// keys in `partial` win) and rewrites the file. A missing file starts
    /// from `{}`. If either side is not a JSON object the store is left
    /// untouched and the current content is returned as-is.
    pub fn update(&self, partial: &json::Value) -> Result<json::Value, StoreError> {
        let current = match self.read() {
            Ok(value) => value,
            Err(StoreError::NotFound(_)) => {
                let empty = json::Value::Object(json::Map::new());
                self.write(&empty)?;
                empty
            }
            Err(e) => return Err(e),
        };

        let (json::Value::Object(mut merged), json::Value::Object(additions)) =
            (current.clone(), partial)
        else {
            tracing::warn!(
                path = %self.path().display(),
                "refusing to merge non-object JSON, store left unchanged"
            );
            return Ok(current);
        };

        for (key, value) in additions {
            merged.insert(key.clone(), value.clone());
        }

        let merged = json::Value::Object(merged);
        self.write(&merged)?;
        Ok(merged)
    }
}
