//! Asset URL derivation.
//!
//! Two pure layers: path construction from the content hash plus the mapping
//! routine's prefix and subpath members, then a subdomain rewrite driven by
//! the routine's shard lookup. No I/O, no mutation; the only failure mode is
//! a malformed hash.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::error::DomainError;
use crate::domain::gallery::AssetDescriptor;
use crate::domain::mapping::{self, MappingRoutine};

/// Host that serves binary assets. Layer 1 always emits the `a.` label;
/// layer 2 rewrites it to the computed shard.
const ASSET_DOMAIN: &str = "gold-usergeneratedcontent.net";

/// Base marker selecting the thumbnail path layout.
pub const THUMBNAIL_BASE: &str = "tn";

// The hash embedded in a derived URL: a 61-hex-char prefix, then the two
// sharding groups the subdomain derivation consumes.
static URL_HASH_SHARD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/[0-9a-f]{61}([0-9a-f]{2})([0-9a-f])").expect("url hash pattern"));

// The 1-2 character subdomain label of either known host suffix.
static HOST_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"//..?\.(?:gold-usergeneratedcontent\.net|hitomi\.la)/").expect("host pattern")
});

/// Derive the final download URL for one asset: path construction followed
/// by the subdomain rewrite. Deterministic for fixed inputs.
pub fn resolve_asset_url(
    descriptor: &AssetDescriptor,
    rendition: &str,
    base: Option<&str>,
    routine: &MappingRoutine,
) -> Result<String, DomainError> {
    let url = build_asset_path(descriptor, rendition, base, routine)?;
    Ok(apply_domain_rewrite(&url, base, rendition, routine))
}

/// Layer 1: the asset path on the default `a.` host.
///
/// Thumbnails shard by the final 3 hex digits rearranged into two path
/// segments (final char first); that grouping is load distribution, not part
/// of the mapping routine. Every other rendition shards through the
/// routine's prefix and subpath members, with `webp`/`avif` folding into the
/// root instead of keeping a rendition directory.
pub fn build_asset_path(
    descriptor: &AssetDescriptor,
    rendition: &str,
    base: Option<&str>,
    routine: &MappingRoutine,
) -> Result<String, DomainError> {
    let hash = &descriptor.hash;
    let suffix = match extension(descriptor, rendition) {
        Some(extension) => format!(".{extension}"),
        None => String::new(),
    };

    if base == Some(THUMBNAIL_BASE) {
        let (two, last) = mapping::shard_digits(hash)?;
        return Ok(format!(
            "https://a.{ASSET_DOMAIN}/{rendition}/{last}/{two}/{hash}{suffix}"
        ));
    }

    let dir = match rendition {
        "webp" | "avif" => String::new(),
        other => format!("{other}/"),
    };
    let subpath = routine.subpath_for(hash)?;
    Ok(format!(
        "https://a.{ASSET_DOMAIN}/{dir}{prefix}{subpath}/{hash}{suffix}",
        prefix = routine.path_prefix()
    ))
}

fn extension<'a>(descriptor: &'a AssetDescriptor, rendition: &'a str) -> Option<&'a str> {
    if rendition.is_empty() {
        descriptor.name_extension()
    } else {
        Some(rendition)
    }
}

/// Layer 2: rewrite the subdomain label to the shard the routine selects.
///
/// The two captured digit groups are reinterpreted in reversed order (final
/// char first) as a hex integer before the lookup; that swap mirrors the
/// upstream addressing scheme bit-for-bit and must not be "corrected". A URL
/// whose hash does not match the pattern is returned unchanged.
pub fn apply_domain_rewrite(
    url: &str,
    base: Option<&str>,
    rendition: &str,
    routine: &MappingRoutine,
) -> String {
    let Some(captures) = URL_HASH_SHARD.captures(url) else {
        return url.to_string();
    };

    let swapped = format!("{}{}", &captures[2], &captures[1]);
    let Ok(value) = u32::from_str_radix(&swapped, 16) else {
        return url.to_string();
    };
    let shard = routine.lookup(value);

    let subdomain = match base {
        Some(base) => {
            let Some(letter) = char::from_u32(u32::from(b'a') + shard) else {
                return url.to_string();
            };
            format!("{letter}{base}")
        }
        None => {
            let prefix = match rendition {
                "webp" => "w",
                "avif" => "a",
                _ => "",
            };
            format!("{prefix}{}", 1 + shard)
        }
    };

    HOST_LABEL
        .replace(url, format!("//{subdomain}.{ASSET_DOMAIN}/"))
        .into_owned()
}
