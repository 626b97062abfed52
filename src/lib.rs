//! Download songs from ccMixter's public query API, keeping enough per-query
//! history on disk that repeated runs resume where the last one stopped.
//!
//! The pieces are small and separately usable: [`store::JsonStore`] is a
//! whole-file JSON key-value store, [`history`] plans resume offsets on top
//! of it, and [`download::Downloader`] drives one query/download pass using
//! injected [`fetch`] and [`probe`] implementations.

pub mod download;
pub mod fetch;
pub mod history;
pub mod metadata;
pub mod probe;
pub mod query;
pub mod store;
pub mod util;

pub use download::{DownloadOptions, Downloader, SongMap};
pub use metadata::SongMetadata;
pub use query::{QuerySignature, SortOrder};
