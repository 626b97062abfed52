use crate::query::QuerySignature;
use crate::store::{JsonStore, StoreError};
use serde_json as json;
use std::collections::BTreeMap;
use std::path::Path;

/// Name of the per-directory download history file.
pub const HISTORY_FILE: &str = "._ccmixter_song_downloader_history.json";

/// `{ "<tags>": { "<sort>": { "downloads": n } } }`
pub type HistoryData = BTreeMap<String, BTreeMap<String, SortRecord>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct SortRecord {
    pub downloads: u64,
}

fn history_store(dir: &Path) -> JsonStore {
    JsonStore::new(dir, HISTORY_FILE)
}

fn zeroed(signature: &QuerySignature) -> HistoryData {
    let mut data = HistoryData::new();
    data.insert(
        signature.tags.clone(),
        BTreeMap::from([(signature.sort.clone(), SortRecord::default())]),
    );
    data
}

fn write_history(dir: &Path, data: &HistoryData) -> anyhow::Result<()> {
    history_store(dir).write(&json::to_value(data)?)?;
    Ok(())
}

/// Reads the history file in `dir`, treating a missing or corrupt file as
/// empty. Never writes.
pub fn load(dir: &Path) -> anyhow::Result<HistoryData> {
    let value = match history_store(dir).read() {
        Ok(value) => value,
        Err(StoreError::NotFound(_)) => return Ok(HistoryData::new()),
        Err(e @ StoreError::Corrupt { .. }) => {
            tracing::warn!(error = %e, "ignoring corrupt history file");
            return Ok(HistoryData::new());
        }
        Err(e) => return Err(e.into()),
    };

    match json::from_value(value) {
        Ok(data) => Ok(data),
        Err(e) => {
            tracing::warn!(error = %e, "history file has unexpected shape, treating as empty");
            Ok(HistoryData::new())
        }
    }
}

/// Figures out where a query should resume: the number of songs already
/// downloaded for `signature` in `dir` becomes the next fetch offset.
///
/// A missing history file is initialized to a zeroed entry and persisted; a
/// corrupt one is replaced in memory only (the file is left on disk
/// untouched). An unseen signature inside an existing file gets a zeroed
/// entry which is persisted before returning. Calling this repeatedly with
/// no download in between returns the same `(data, offset)` every time.
pub fn resume_point(signature: &QuerySignature, dir: &Path) -> anyhow::Result<(HistoryData, u64)> {
    let store = history_store(dir);

    let value = match store.read() {
        Ok(value) => value,
        Err(StoreError::NotFound(_)) => {
            let data = zeroed(signature);
            write_history(dir, &data)?;
            tracing::debug!(path = %store.path().display(), "created new history file");
            return Ok((data, 0));
        }
        Err(e @ StoreError::Corrupt { .. }) => {
            tracing::warn!(error = %e, "history file is corrupt, starting from zero");
            return Ok((zeroed(signature), 0));
        }
        Err(e) => return Err(e.into()),
    };

    let mut data: HistoryData = match json::from_value(value) {
        Ok(data) => data,
        Err(e) => {
            tracing::warn!(error = %e, "history file has unexpected shape, starting from zero");
            return Ok((zeroed(signature), 0));
        }
    };

    let existing = data
        .get(&signature.tags)
        .and_then(|sorts| sorts.get(&signature.sort))
        .map(|record| record.downloads);

    if let Some(downloads) = existing {
        return Ok((data, downloads));
    }

    data.entry(signature.tags.clone())
        .or_default()
        .insert(signature.sort.clone(), SortRecord::default());
    write_history(dir, &data)?;

    Ok((data, 0))
}

/// Records that a run against `signature` requested `downloads` songs,
/// rewriting the full history file. Entries for other signatures (including
/// other sort keys under the same tag) are preserved.
pub fn record_downloads(
    signature: &QuerySignature,
    dir: &Path,
    downloads: u64,
    mut data: HistoryData,
) -> anyhow::Result<HistoryData> {
    data.entry(signature.tags.clone())
        .or_default()
        .insert(signature.sort.clone(), SortRecord { downloads });
    write_history(dir, &data)?;
    Ok(data)
}
