use ccmdl::download::{DownloadOptions, Downloader};
use ccmdl::fetch::{ContentFetcher, ListingFetcher, ListingItem};
use ccmdl::history::HISTORY_FILE;
use ccmdl::metadata::METADATA_FILE;
use ccmdl::probe::MediaProber;
use ccmdl::query::{ListingQuery, QuerySignature, SortOrder};
use serde_json::json;
use std::cell::RefCell;
use std::path::{Path, PathBuf};

struct FakeListing {
    items: Vec<ListingItem>,
    queries: RefCell<Vec<ListingQuery>>,
}

impl FakeListing {
    fn new(items: Vec<ListingItem>) -> Self {
        Self {
            items,
            queries: RefCell::new(vec![]),
        }
    }

    fn last_offset(&self) -> u64 {
        self.queries.borrow().last().expect("no query issued").offset
    }
}

impl ListingFetcher for FakeListing {
    fn fetch(&self, query: &ListingQuery) -> anyhow::Result<Vec<ListingItem>> {
        self.queries.borrow_mut().push(query.clone());
        Ok(self.items.clone())
    }
}

/// Writes a fixed payload instead of hitting the network.
struct FakeContent;

impl ContentFetcher for FakeContent {
    fn fetch_to(&self, _url: &str, dest: &Path) -> anyhow::Result<()> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(dest, b"fake mp3 bytes")?;
        Ok(())
    }
}

struct FakeProber(Option<u64>);

impl MediaProber for FakeProber {
    fn duration_ms(&self, _path: &Path) -> anyhow::Result<Option<u64>> {
        Ok(self.0)
    }
}

fn song(artist: &str, title: &str, file: &str) -> ListingItem {
    ListingItem {
        direct_link: format!("http://ccmixter.org/content/{artist}/{file}"),
        page_link: format!("http://ccmixter.org/files/{artist}/1"),
        title: title.to_string(),
        artist: artist.to_string(),
        license: "CC BY 2.5".to_string(),
        license_url: "http://creativecommons.org/licenses/by/2.5/".to_string(),
    }
}

fn opts(dir: &Path, tags: &str, limit: usize) -> DownloadOptions {
    DownloadOptions {
        dir: PathBuf::from(dir),
        signature: QuerySignature::new(tags, "date"),
        limit,
        order: SortOrder::Asc,
        license: Some("by".to_string()),
        skip_previous: true,
    }
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn full_page_downloads_limit_songs_and_advances_counter() {
    let tmp = tempfile::tempdir().unwrap();
    let listing = FakeListing::new(vec![
        song("alice", "First", "first.mp3"),
        song("bob", "Second", "second.mp3"),
        song("carol", "Third", "third.mp3"),
    ]);

    let dl = Downloader::new(listing, FakeContent, FakeProber(Some(120_500)));
    let songs = dl.download(&opts(tmp.path(), "", 3)).unwrap();

    assert_eq!(3, songs.len());
    for (file_name, meta) in &songs {
        assert!(tmp.path().join(file_name).is_file());
        assert_eq!(Some(120.5), meta.length);
        assert_eq!("CC BY 2.5", meta.license);
    }

    let history = read_json(&tmp.path().join(HISTORY_FILE));
    assert_eq!(json!({"": {"date": {"downloads": 3}}}), history);
}

#[test]
fn limit_caps_a_longer_page() {
    let tmp = tempfile::tempdir().unwrap();
    let listing = FakeListing::new(vec![
        song("alice", "First", "first.mp3"),
        song("bob", "Second", "second.mp3"),
        song("carol", "Third", "third.mp3"),
    ]);

    let dl = Downloader::new(listing, FakeContent, FakeProber(Some(1_000)));
    let songs = dl.download(&opts(tmp.path(), "", 2)).unwrap();

    assert_eq!(2, songs.len());
    assert!(songs.contains_key("first.mp3"));
    assert!(songs.contains_key("second.mp3"));
    assert!(!tmp.path().join("third.mp3").exists());
}

#[test]
fn zip_links_are_skipped_without_consuming_the_limit() {
    let tmp = tempfile::tempdir().unwrap();
    let listing = FakeListing::new(vec![
        song("alice", "First", "first.mp3"),
        song("bob", "Remix Pack", "pack.zip"),
        song("carol", "Third", "third.mp3"),
    ]);

    let dl = Downloader::new(listing, FakeContent, FakeProber(Some(1_000)));
    let songs = dl.download(&opts(tmp.path(), "", 2)).unwrap();

    assert_eq!(2, songs.len());
    assert!(songs.contains_key("first.mp3"));
    assert!(songs.contains_key("third.mp3"));
    assert!(!songs.contains_key("pack.zip"));
    assert!(!tmp.path().join("pack.zip").exists());

    // history records the requested limit, skips notwithstanding
    let history = read_json(&tmp.path().join(HISTORY_FILE));
    assert_eq!(json!({"": {"date": {"downloads": 2}}}), history);
}

#[test]
fn empty_listing_completes_with_empty_result() {
    let tmp = tempfile::tempdir().unwrap();
    let dl = Downloader::new(FakeListing::new(vec![]), FakeContent, FakeProber(None));

    let songs = dl.download(&opts(tmp.path(), "nope", 3)).unwrap();
    assert!(songs.is_empty());
    assert!(!tmp.path().join(METADATA_FILE).exists());

    // the requested limit is recorded even when nothing matched
    let history = read_json(&tmp.path().join(HISTORY_FILE));
    assert_eq!(json!({"nope": {"date": {"downloads": 3}}}), history);
}

#[test]
fn two_signatures_keep_separate_history() {
    let tmp = tempfile::tempdir().unwrap();

    let dl = Downloader::new(
        FakeListing::new(vec![
            song("alice", "First", "first.mp3"),
            song("bob", "Second", "second.mp3"),
            song("carol", "Third", "third.mp3"),
        ]),
        FakeContent,
        FakeProber(Some(1_000)),
    );
    dl.download(&opts(tmp.path(), "", 3)).unwrap();

    let dl = Downloader::new(
        FakeListing::new(vec![song("dave", "Rap Song", "rap_song.mp3")]),
        FakeContent,
        FakeProber(Some(1_000)),
    );
    let songs = dl.download(&opts(tmp.path(), "rap", 1)).unwrap();

    // metadata accumulates across runs against the same directory
    assert_eq!(4, songs.len());

    let history = read_json(&tmp.path().join(HISTORY_FILE));
    assert_eq!(
        json!({
            "": {"date": {"downloads": 3}},
            "rap": {"date": {"downloads": 1}},
        }),
        history
    );
}

#[test]
fn second_run_resumes_at_recorded_offset() {
    let tmp = tempfile::tempdir().unwrap();

    let dl = Downloader::new(
        FakeListing::new(vec![song("alice", "First", "first.mp3")]),
        FakeContent,
        FakeProber(Some(1_000)),
    );
    dl.download(&opts(tmp.path(), "", 1)).unwrap();

    let listing = FakeListing::new(vec![song("bob", "Second", "second.mp3")]);
    let dl = Downloader::new(&listing, FakeContent, FakeProber(Some(1_000)));
    dl.download(&opts(tmp.path(), "", 1)).unwrap();
    assert_eq!(1, listing.last_offset());

    // skip_previous = false ignores history entirely
    let listing = FakeListing::new(vec![song("carol", "Third", "third.mp3")]);
    let dl = Downloader::new(&listing, FakeContent, FakeProber(Some(1_000)));
    let mut opts = opts(tmp.path(), "", 1);
    opts.skip_previous = false;
    dl.download(&opts).unwrap();
    assert_eq!(0, listing.last_offset());
}

#[test]
fn unknown_duration_is_recorded_as_null() {
    let tmp = tempfile::tempdir().unwrap();
    let dl = Downloader::new(
        FakeListing::new(vec![song("alice", "First", "first.mp3")]),
        FakeContent,
        FakeProber(None),
    );

    let songs = dl.download(&opts(tmp.path(), "", 1)).unwrap();
    assert_eq!(None, songs["first.mp3"].length);

    let meta = read_json(&tmp.path().join(METADATA_FILE));
    assert!(meta["first.mp3"]["length"].is_null());
}

#[test]
fn metadata_survives_unrelated_updates() {
    let tmp = tempfile::tempdir().unwrap();

    let dl = Downloader::new(
        FakeListing::new(vec![song("alice", "First", "first.mp3")]),
        FakeContent,
        FakeProber(Some(1_000)),
    );
    dl.download(&opts(tmp.path(), "", 1)).unwrap();

    let dl = Downloader::new(
        FakeListing::new(vec![song("bob", "Second", "second.mp3")]),
        FakeContent,
        FakeProber(Some(1_000)),
    );
    let songs = dl.download(&opts(tmp.path(), "other", 1)).unwrap();

    assert_eq!("alice", songs["first.mp3"].artist);
    assert_eq!("bob", songs["second.mp3"].artist);

    // a later cold read sees the same map
    assert_eq!(songs, ccmdl::download::deserialize(tmp.path()).unwrap());
}

#[test]
fn percent_encoded_names_become_safe_file_names() {
    let tmp = tempfile::tempdir().unwrap();
    let mut item = song("alice", "A Song", "placeholder");
    item.direct_link = "http://ccmixter.org/content/alice/alice%20-%20A%20Song%3F.mp3".to_string();

    let dl = Downloader::new(
        FakeListing::new(vec![item]),
        FakeContent,
        FakeProber(Some(1_000)),
    );
    let songs = dl.download(&opts(tmp.path(), "", 1)).unwrap();

    assert!(songs.contains_key("alice - A Song.mp3"));
    assert!(tmp.path().join("alice - A Song.mp3").is_file());
}
