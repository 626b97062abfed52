use crate::fetch::{ContentFetcher, ListingFetcher};
use crate::history::{self, HistoryData};
use crate::metadata::{SongMetadata, METADATA_FILE};
use crate::probe::MediaProber;
use crate::query::{ListingQuery, QuerySignature, SortOrder};
use crate::store::{JsonStore, StoreError};
use crate::util::slugify;
use anyhow::Context;
use serde_json as json;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// The full metadata store of a directory: derived file name -> metadata.
pub type SongMap = BTreeMap<String, SongMetadata>;

#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Where songs and both store files land.
    pub dir: PathBuf,
    pub signature: QuerySignature,
    /// How many songs to accept before stopping.
    pub limit: usize,
    pub order: SortOrder,
    pub license: Option<String>,
    /// When set, prior runs for the same signature advance the fetch offset.
    pub skip_previous: bool,
}

/// Drives one query/download pass. The listing and content fetchers and the
/// duration prober are injected so the whole pass can run against fakes.
pub struct Downloader<L, C, P> {
    listing: L,
    content: C,
    prober: P,
}

impl<L, C, P> Downloader<L, C, P>
where
    L: ListingFetcher,
    C: ContentFetcher,
    P: MediaProber,
{
    pub fn new(listing: L, content: C, prober: P) -> Self {
        Self {
            listing,
            content,
            prober,
        }
    }

    /// Runs one pass: resolve the resume offset, fetch a listing page, save
    /// every accepted song plus its metadata, commit the history counters,
    /// and return the directory's full metadata map.
    ///
    /// A failed fetch or probe for any single song aborts the whole run;
    /// already-written files stay on disk. An empty or short listing page is
    /// a warning, not an error.
    pub fn download(&self, opts: &DownloadOptions) -> anyhow::Result<SongMap> {
        let dir = std::path::absolute(&opts.dir)?;
        tracing::info!(dir = %dir.display(), tags = %opts.signature.tags,
            sort = %opts.signature.sort, limit = opts.limit, "download pass starting");

        let (history_data, offset) = if opts.skip_previous {
            history::resume_point(&opts.signature, &dir)?
        } else {
            (history::load(&dir)?, 0)
        };
        tracing::debug!(offset, "resume offset for this query");

        let items = self.listing.fetch(&ListingQuery {
            signature: opts.signature.clone(),
            limit: opts.limit,
            offset,
            order: opts.order,
            license: opts.license.clone(),
        })?;

        let meta_store = JsonStore::new(&dir, METADATA_FILE);
        let mut accepted: usize = 0;

        for item in &items {
            if accepted >= opts.limit {
                tracing::debug!(accepted, limit = opts.limit, "download limit reached");
                break;
            }

            let direct_link = item.direct_link.trim();

            // archive containers are not single songs; skipping one doesn't
            // count against the limit
            if direct_link.ends_with(".zip") {
                tracing::debug!(url = direct_link, "zip file encountered, skipping");
                continue;
            }

            let file_name = storage_name(direct_link)?;
            let save_path = dir.join(&file_name);
            tracing::info!(url = direct_link, path = %save_path.display(), "saving song");

            self.content.fetch_to(direct_link, &save_path)?;

            let length = match self.prober.duration_ms(&save_path)? {
                Some(ms) => Some(ms as f64 / 1000.0),
                None => {
                    tracing::warn!(path = %save_path.display(), "song has unknown duration");
                    None
                }
            };

            let meta = SongMetadata {
                artist: item.artist.clone(),
                name: item.title.clone(),
                length,
                link: item.page_link.clone(),
                direct_link: item.direct_link.clone(),
                license: item.license.clone(),
                license_url: item.license_url.clone(),
            };

            let mut partial = json::Map::new();
            partial.insert(file_name, json::to_value(&meta)?);
            meta_store.update(&json::Value::Object(partial))?;

            accepted += 1;
        }

        if accepted == 0 {
            tracing::warn!(tags = %opts.signature.tags, sort = %opts.signature.sort,
                "no songs found for query");
        } else if accepted < opts.limit {
            tracing::warn!(accepted, limit = opts.limit, "fewer songs available than requested");
        }

        // the counter advances by the requested limit even on a short page;
        // long-standing behavior that existing history files depend on
        history::record_downloads(&opts.signature, &dir, opts.limit as u64, history_data)?;

        read_metadata(&meta_store)
    }
}

/// Derives the on-disk file name for a song: the percent-decoded basename of
/// its direct link, slugified.
fn storage_name(direct_link: &str) -> anyhow::Result<String> {
    let decoded = urlencoding::decode(direct_link)
        .with_context(|| format!("direct link is not valid UTF-8 once decoded: {direct_link}"))?;
    let base = decoded.rsplit('/').next().unwrap_or(&decoded);
    Ok(slugify(base))
}

fn read_metadata(store: &JsonStore) -> anyhow::Result<SongMap> {
    match store.read() {
        Ok(value) => json::from_value(value).context("metadata store has unexpected shape"),
        Err(StoreError::NotFound(_)) => Ok(SongMap::new()),
        Err(e) => Err(e.into()),
    }
}

/// Loads the metadata map previously written to `dir`, without downloading.
pub fn deserialize(dir: &std::path::Path) -> anyhow::Result<SongMap> {
    let dir = std::path::absolute(dir)?;
    read_metadata(&JsonStore::new(dir, METADATA_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_name_decodes_and_slugifies() {
        assert_eq!(
            "someone - A Song.mp3",
            storage_name("http://ccmixter.org/content/someone/someone%20-%20A%20Song.mp3")
                .unwrap()
        );
    }

    #[test]
    fn storage_name_drops_disallowed_characters() {
        assert_eq!(
            "whats up.mp3",
            storage_name("http://host/path/what%27s%20up%3F.mp3").unwrap()
        );
    }
}
