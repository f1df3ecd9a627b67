use crate::resource::ResourceIdentifier;
use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::{event, instrument, Level};
use url::Url;

/// Selector of the element the batch collector watches.
pub const CONTENT_ROOT: &str = r#"main[role="main"]"#;
const UNKNOWN_USER: &str = "unknown_user";

lazy_static! {
    pub(crate) static ref CONTENT_ROOT_SELECTOR: Selector = Selector::parse(CONTENT_ROOT).unwrap();
    /// Grid thumbnails on a media tab link to `/<user>/status/<id>/photo/<n>`.
    static ref GRID_MEDIA_SELECTOR: Selector =
        Selector::parse(r#"a[href*="/photo/"] img[src*="pbs.twimg.com/media"]"#).unwrap();
    pub(crate) static ref MEDIA_SELECTOR: Selector =
        Selector::parse(r#"img[src*="pbs.twimg.com/media"]"#).unwrap();
}

/// Whether the document has the content root the collector observes.
pub fn has_content_root(html_string: &str) -> bool {
    let html_document = Html::parse_document(html_string);
    let found = html_document.select(&CONTENT_ROOT_SELECTOR).next().is_some();
    found
}

/// Gets every full-resolution-eligible media identifier inside the content
/// root of the page. Returns an empty set when the root is missing.
#[instrument(skip(html_string))]
pub fn locate(html_string: &str) -> HashSet<ResourceIdentifier> {
    let html_document = Html::parse_document(html_string);
    let found = match html_document.select(&CONTENT_ROOT_SELECTOR).next() {
        Some(root) => media_in(root, &GRID_MEDIA_SELECTOR),
        None => HashSet::new(),
    };
    event!(Level::DEBUG, "Located {} media items", found.len());
    found
}

pub(crate) fn media_in(root: ElementRef, selector: &Selector) -> HashSet<ResourceIdentifier> {
    root.select(selector)
        .filter_map(|element| element.value().attr("src"))
        .filter_map(|src| {
            let id = ResourceIdentifier::parse(src);
            if id.is_none() {
                tracing::debug!("Skipping non media source {}", src);
            }
            id
        })
        .collect::<_>()
}

/// A media tab, e.g `https://x.com/someone/media`.
pub fn is_media_page(page_url: &Url) -> bool {
    page_url
        .path_segments()
        .map(|mut segments| segments.any(|segment| segment == "media"))
        .unwrap_or(false)
}

/// The profile the page belongs to, taken from the first path segment.
pub fn subject_from_url(page_url: &Url) -> String {
    let first = page_url
        .path_segments()
        .and_then(|mut segments| segments.next())
        .unwrap_or("");
    let valid: String = first
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if valid.is_empty() {
        UNKNOWN_USER.to_string()
    } else {
        valid
    }
}
