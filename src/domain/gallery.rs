//! Gallery identity and per-request listing types.

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use super::error::DomainError;

// Album page URLs end in `-<digits>.html`; the digits are the gallery id.
static ALBUM_URL_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-(\d+)\.html$").expect("album id pattern"));

/// Numeric gallery identifier, extracted from an album page URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GalleryId(String);

impl GalleryId {
    /// Parse the trailing `-<digits>.html` suffix of an album page URL.
    ///
    /// Rejection happens here, at the boundary; nothing downstream ever sees
    /// an unvalidated id.
    pub fn from_album_url(album_url: &str) -> Result<Self, DomainError> {
        ALBUM_URL_ID
            .captures(album_url)
            .map(|captures| Self(captures[1].to_string()))
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "album URL `{album_url}` has no trailing `-<digits>.html` id"
                ))
            })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GalleryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One image asset as described by gallery metadata.
///
/// `name` is only consulted as an extension fallback when no rendition kind
/// dictates one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDescriptor {
    pub hash: String,
    pub name: Option<String>,
}

impl AssetDescriptor {
    /// File extension of the metadata name, if any.
    pub fn name_extension(&self) -> Option<&str> {
        let name = self.name.as_deref()?;
        let (_, extension) = name.rsplit_once('.')?;
        (!extension.is_empty()).then_some(extension)
    }
}

/// Fully resolved listing for one gallery. Built fresh per request, never
/// cached; only the mapping routine behind it is.
#[derive(Debug, Clone)]
pub struct GalleryInfo {
    pub id: GalleryId,
    pub files: Vec<String>,
    pub tags: String,
    pub headers: BTreeMap<String, String>,
}

/// Flatten structured tag records into `"a, b"` form: empty tags dropped,
/// original order preserved.
pub fn flatten_tags<I, S>(tags: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut flattened = String::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if tag.is_empty() {
            continue;
        }
        if !flattened.is_empty() {
            flattened.push_str(", ");
        }
        flattened.push_str(tag);
    }
    flattened
}
