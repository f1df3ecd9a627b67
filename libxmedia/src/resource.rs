use std::fmt::{Display, Formatter};
use url::Url;

const MEDIA_HOST: &str = "pbs.twimg.com";
const MEDIA_PATH_PREFIX: &str = "/media/";
const ORIGINAL_QUALITY_QUERY: &str = "format=png&name=orig";

/// A single media item on the image host, normalized to its query-less
/// url. Two identifiers are equal when they point at the same media id,
/// whatever size or format the page happened to request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceIdentifier {
    base: Url,
}

impl ResourceIdentifier {
    /// Parses a raw `src` value. Returns `None` for anything that isn't
    /// hosted media, e.g avatars, emoji or data urls.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut url = Url::parse(raw).ok()?;
        if url.host_str() != Some(MEDIA_HOST) {
            return None;
        }
        let media_id = url.path().strip_prefix(MEDIA_PATH_PREFIX)?;
        if media_id.is_empty() || media_id.contains('/') {
            return None;
        }
        url.set_query(None);
        url.set_fragment(None);
        Some(Self { base: url })
    }

    /// The last path segment, stable for the lifetime of the media item.
    pub fn media_id(&self) -> &str {
        self.base
            .path()
            .rsplit('/')
            .next()
            .unwrap_or_default()
    }

    /// Url requesting the original, uncompressed png variant.
    pub fn original_url(&self) -> Url {
        let mut url = self.base.clone();
        url.set_query(Some(ORIGINAL_QUALITY_QUERY));
        url
    }
}

impl Display for ResourceIdentifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_query_and_keeps_media_id() {
        let id =
            ResourceIdentifier::parse("https://pbs.twimg.com/media/GabcXYZ?format=jpg&name=small")
                .unwrap();
        assert_eq!(id.media_id(), "GabcXYZ");
        assert_eq!(id.to_string(), "https://pbs.twimg.com/media/GabcXYZ");
        assert_eq!(
            id.original_url().as_str(),
            "https://pbs.twimg.com/media/GabcXYZ?format=png&name=orig"
        );
    }

    #[test]
    fn size_variants_are_the_same_resource() {
        let small = ResourceIdentifier::parse("https://pbs.twimg.com/media/A1?name=small");
        let large = ResourceIdentifier::parse("https://pbs.twimg.com/media/A1?name=large");
        assert_eq!(small, large);
    }

    #[test]
    fn rejects_other_hosts_and_paths() {
        assert!(ResourceIdentifier::parse("https://pbs.twimg.com/profile_images/1/a.jpg").is_none());
        assert!(ResourceIdentifier::parse("https://abs.twimg.com/media/A1").is_none());
        assert!(ResourceIdentifier::parse("https://pbs.twimg.com/media/").is_none());
        assert!(ResourceIdentifier::parse("data:image/png;base64,AAAA").is_none());
        assert!(ResourceIdentifier::parse("/media/A1").is_none());
    }
}
