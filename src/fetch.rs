use crate::query::ListingQuery;
use anyhow::Context;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CACHE_CONTROL, PRAGMA};
use scraper::{ElementRef, Html, Selector};
use std::path::Path;
use std::sync::LazyLock;

// valid values documented at http://ccmixter.org/query-api
const QUERY_URL: &str = "http://ccmixter.org/api/query";
const SINCED: &str = "1/1/2003";

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:133.0) Gecko/20100101 Firefox/133.0";
const DEFAULT_HEADERS: &[(HeaderName, &str)] = &[
    (PRAGMA, "no-cache"),
    (CACHE_CONTROL, "no-cache"),
];

/// One candidate song from a listing page, in the order the site returned it.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingItem {
    pub direct_link: String,
    pub page_link: String,
    pub title: String,
    pub artist: String,
    pub license: String,
    pub license_url: String,
}

/// Fetches one page of candidate songs for a query.
pub trait ListingFetcher {
    fn fetch(&self, query: &ListingQuery) -> anyhow::Result<Vec<ListingItem>>;
}

/// Fetches the bytes behind a direct link into a local file.
pub trait ContentFetcher {
    fn fetch_to(&self, url: &str, dest: &Path) -> anyhow::Result<()>;
}

impl<T: ListingFetcher + ?Sized> ListingFetcher for &T {
    fn fetch(&self, query: &ListingQuery) -> anyhow::Result<Vec<ListingItem>> {
        (**self).fetch(query)
    }
}

impl<T: ContentFetcher + ?Sized> ContentFetcher for &T {
    fn fetch_to(&self, url: &str, dest: &Path) -> anyhow::Result<()> {
        (**self).fetch_to(url, dest)
    }
}

struct HtmlSelector {
    text: String,
    selector: Selector,
}

impl HtmlSelector {
    fn try_new(s: &str) -> anyhow::Result<Self> {
        match Selector::parse(s) {
            Ok(sel) => Ok(Self {
                text: s.to_string(),
                selector: sel,
            }),
            Err(e) => {
                anyhow::bail!("failed parsing CSS selector from '{s}': {e}");
            }
        }
    }
}

macro_rules! selector {
    ($name:ident, $s:expr) => {
        static $name: LazyLock<HtmlSelector> =
            LazyLock::new(|| HtmlSelector::try_new($s).expect("invalid CSS selector"));
    };
}

selector!(UPLOAD_INFO, "div.upload_info");
selector!(TITLE_LINK, r#"a[property="dc:title"]"#);
selector!(CREATOR, r#"a[property="dc:creator"]"#);
selector!(LICENSE_LINK, "a.lic_link");

/// Blocking HTTP client against ccMixter: implements both the listing and
/// the content side.
pub struct CcMixter {
    client: Client,
}

impl CcMixter {
    pub fn new() -> Self {
        let headers = HeaderMap::from_iter(
            DEFAULT_HEADERS
                .iter()
                .map(|(name, value)| (name.clone(), HeaderValue::from_static(value))),
        );

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .expect("unreachable!");

        Self { client }
    }

    fn query_url(query: &ListingQuery) -> String {
        format!(
            "{QUERY_URL}?tags={tags}&sort={sort}&limit={limit}&offset={offset}\
             &sinced={SINCED}&ord={ord}&lic={lic}",
            tags = query.signature.tags,
            sort = query.signature.sort,
            limit = query.limit,
            offset = query.offset,
            ord = query.order.as_str(),
            lic = query.license.as_deref().unwrap_or_default(),
        )
    }
}

impl Default for CcMixter {
    fn default() -> Self {
        Self::new()
    }
}

impl ListingFetcher for CcMixter {
    fn fetch(&self, query: &ListingQuery) -> anyhow::Result<Vec<ListingItem>> {
        let url = Self::query_url(query);
        tracing::debug!(%url, "querying listing");

        let html = self
            .client
            .get(&url)
            .send()?
            .error_for_status()
            .with_context(|| format!("listing query failed: {url}"))?
            .text()?;

        parse_listing(&html)
    }
}

impl ContentFetcher for CcMixter {
    fn fetch_to(&self, url: &str, dest: &Path) -> anyhow::Result<()> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut res = self
            .client
            .get(url)
            .send()?
            .error_for_status()
            .with_context(|| format!("content fetch failed: {url}"))?;

        let mut fh = std::fs::File::create(dest)?;
        std::io::copy(&mut res, &mut fh)?;
        Ok(())
    }
}

/// Pulls candidate songs out of a ccMixter query response. Each result sits
/// in a `div.upload_info` whose `about` attribute is the direct media link.
pub fn parse_listing(html: &str) -> anyhow::Result<Vec<ListingItem>> {
    let doc = Html::parse_document(html);
    let mut items = vec![];

    for elem in doc.select(&UPLOAD_INFO.selector) {
        let Some(direct_link) = elem.attr("about") else {
            tracing::debug!("upload_info element without 'about' attribute, skipping");
            continue;
        };

        items.push(parse_item(&elem, direct_link)?);
    }

    tracing::debug!(count = items.len(), "song elements found");
    Ok(items)
}

fn parse_item(elem: &ElementRef<'_>, direct_link: &str) -> anyhow::Result<ListingItem> {
    let title_elem = select_one(elem, &TITLE_LINK)?;
    let page_link = title_elem
        .attr("href")
        .context("song title element has no href")?;
    let title = title_elem.text().collect::<String>();

    let artist = select_one(elem, &CREATOR)?.text().collect::<String>();

    let license_elem = select_one(elem, &LICENSE_LINK)?;
    let license_url = license_elem
        .attr("href")
        .context("license element has no href")?;

    Ok(ListingItem {
        direct_link: direct_link.to_string(),
        page_link: page_link.to_string(),
        title,
        artist,
        license: license_from_url(license_url),
        license_url: license_url.to_string(),
    })
}

fn select_one<'a>(
    elem: &ElementRef<'a>,
    sel: &'static LazyLock<HtmlSelector>,
) -> anyhow::Result<ElementRef<'a>> {
    elem.select(&sel.selector)
        .next()
        .with_context(|| format!("no element matching '{}' in song listing", sel.text))
}

/// `http://creativecommons.org/licenses/by/3.0/` -> `CC BY 3.0`
fn license_from_url(url: &str) -> String {
    let mut parts = url.trim_end_matches('/').rsplit('/');
    let version = parts.next().unwrap_or_default();
    let name = parts.next().unwrap_or_default();
    format!("CC {} {}", name.to_uppercase(), version)
}
