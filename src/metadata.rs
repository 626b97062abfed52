/// Name of the per-directory metadata store file. One JSON object mapping
/// the derived file name of each downloaded song to its [`SongMetadata`].
pub const METADATA_FILE: &str = "_ccmixter_metadata.json";

/// Everything we keep about one downloaded song. Built once, right after
/// the content fetch and duration probe succeed, then merged into the
/// metadata store under the song's file name.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SongMetadata {
    pub artist: String,
    pub name: String,
    /// Seconds. `None` when no duration could be determined (distinct from
    /// a zero-length stream).
    pub length: Option<f64>,
    /// Song page on ccMixter.
    pub link: String,
    /// URL the audio bytes were fetched from.
    pub direct_link: String,
    /// Human-readable license label, e.g. "CC BY 2.5".
    pub license: String,
    pub license_url: String,
}
