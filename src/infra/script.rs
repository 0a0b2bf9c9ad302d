//! The script-evaluation boundary.
//!
//! The upstream publishes both the mapping routine and gallery metadata as
//! executable script text, not as data. Instead of embedding a script engine,
//! this adapter parses exactly the members the addressing scheme documents
//! and rejects everything else, keeping the evaluation boundary as narrow as
//! possible. A rotation that changes the script's *shape* (rather than just
//! its data) fails loudly as an eval error instead of deriving wrong URLs.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::mapping::MappingRoutine;

// The three members of the mapping script: `b` (path prefix constant),
// `m` (shard case table), `s` (hash-to-subpath function).
static PATH_PREFIX_MEMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"b:\s*'([^']*)'").expect("path prefix pattern"));
static LOOKUP_MEMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"m:\s*function\s*\(").expect("lookup member pattern"));
static SUBPATH_MEMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"s:\s*function\s*\(").expect("subpath member pattern"));

static SHARD_DEFAULT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"var\s+o\s*=\s*(\d+)").expect("shard default pattern"));
static SHARD_CASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"case\s+(\d+):").expect("shard case pattern"));
static SHARD_ASSIGN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^o\s*=\s*(\d+)").expect("shard assign pattern"));

// The fixed digit-swap body of the `s` member. Anything else means the
// upstream changed the subpath derivation and this adapter must not guess.
const SUBPATH_SHAPE: &str = "(..)(.)$";

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("mapping script is missing required member `{member}`")]
    MissingMember { member: &'static str },
    #[error("mapping script member `{member}` has an unrecognized shape: {detail}")]
    UnrecognizedShape {
        member: &'static str,
        detail: String,
    },
    #[error("document is not a `galleryinfo` assignment")]
    NotGalleryDocument,
    #[error("failed to decode gallery document: {0}")]
    Metadata(#[from] serde_json::Error),
}

impl ScriptError {
    fn missing(member: &'static str) -> Self {
        Self::MissingMember { member }
    }

    fn shape(member: &'static str, detail: impl Into<String>) -> Self {
        Self::UnrecognizedShape {
            member,
            detail: detail.into(),
        }
    }
}

/// Extract a [`MappingRoutine`] from fetched mapping-script text.
///
/// Only the documented members are read; the case table and default are
/// taken verbatim from the script so a data rotation needs no redeploy.
pub fn parse_mapping_script(source: &str) -> Result<MappingRoutine, ScriptError> {
    let path_prefix = PATH_PREFIX_MEMBER
        .captures(source)
        .ok_or_else(|| ScriptError::missing("b"))?[1]
        .to_string();

    if !LOOKUP_MEMBER.is_match(source) {
        return Err(ScriptError::missing("m"));
    }
    if !SUBPATH_MEMBER.is_match(source) {
        return Err(ScriptError::missing("s"));
    }
    if !source.contains(SUBPATH_SHAPE) {
        return Err(ScriptError::shape(
            "s",
            "expected the trailing-3-digit extraction body",
        ));
    }

    let shard_default = match SHARD_DEFAULT.captures(source) {
        Some(captures) => parse_shard_number("m", &captures[1])?,
        None => 0,
    };

    // `case N:` labels accumulate until an `o = V` assignment closes the
    // group; every accumulated key maps to that value.
    let mut shard_map = HashMap::new();
    let mut pending: Vec<u32> = Vec::new();
    for line in source.lines() {
        let line = line.trim();
        for captures in SHARD_CASE.captures_iter(line) {
            pending.push(parse_shard_number("m", &captures[1])?);
        }
        if let Some(captures) = SHARD_ASSIGN.captures(line) {
            let value = parse_shard_number("m", &captures[1])?;
            for key in pending.drain(..) {
                shard_map.insert(key, value);
            }
        }
    }

    Ok(MappingRoutine::new(path_prefix, shard_map, shard_default))
}

fn parse_shard_number(member: &'static str, raw: &str) -> Result<u32, ScriptError> {
    raw.parse::<u32>()
        .map_err(|err| ScriptError::shape(member, format!("numeric literal `{raw}`: {err}")))
}

/// A decoded per-gallery metadata document.
///
/// Both lists tolerate `null` and absence; a gallery without files is
/// legitimately empty, not an error. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct GalleryDocument {
    #[serde(default)]
    files: Option<Vec<FileEntry>>,
    #[serde(default)]
    tags: Option<Vec<TagEntry>>,
}

impl GalleryDocument {
    pub fn files(&self) -> &[FileEntry] {
        self.files.as_deref().unwrap_or_default()
    }

    pub fn tags(&self) -> &[TagEntry] {
        self.tags.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileEntry {
    pub hash: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagEntry {
    #[serde(default)]
    pub tag: String,
}

/// Decode a `var galleryinfo = {...}` document. Everything after the
/// assignment is plain JSON.
pub fn parse_gallery_document(source: &str) -> Result<GalleryDocument, ScriptError> {
    let (lhs, json) = source
        .split_once('=')
        .ok_or(ScriptError::NotGalleryDocument)?;
    if !lhs.contains("galleryinfo") {
        return Err(ScriptError::NotGalleryDocument);
    }

    let json = json.trim().trim_end_matches(';');
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROTATED_SCRIPT: &str = r"var gg = {
m: function(g) {
var o = 0;
switch (g) {
case 1004:
case 2172:
o = 1; break;
case 2391:
o = 2; break;
}
return o;
},
b: '1757569206/',
s: function(h) { var m = /(..)(.)$/.exec(h); return parseInt(m[2]+m[1], 16).toString(10); }
};";

    #[test]
    fn parses_rotated_mapping_script() {
        let routine = parse_mapping_script(ROTATED_SCRIPT).expect("well-formed script");
        assert_eq!(routine.path_prefix(), "1757569206/");
        assert_eq!(routine.lookup(1004), 1);
        assert_eq!(routine.lookup(2172), 1);
        assert_eq!(routine.lookup(2391), 2);
        assert_eq!(routine.lookup(5), 0);
    }

    #[test]
    fn case_labels_sharing_a_line_are_grouped() {
        let source = "var gg = {\nm: function(g) {\nvar o = 1;\nswitch (g) {\ncase 7: case 9:\no = 3; break;\n}\nreturn o;\n},\nb: '10/',\ns: function(h) { var m = /(..)(.)$/.exec(h); return parseInt(m[2]+m[1], 16).toString(10); }\n};";
        let routine = parse_mapping_script(source).expect("well-formed script");
        assert_eq!(routine.lookup(7), 3);
        assert_eq!(routine.lookup(9), 3);
        assert_eq!(routine.lookup(8), 1);
    }

    #[test]
    fn missing_members_are_rejected() {
        let no_prefix = ROTATED_SCRIPT.replace("b: '1757569206/',", "");
        assert!(matches!(
            parse_mapping_script(&no_prefix),
            Err(ScriptError::MissingMember { member: "b" })
        ));

        let no_subpath = ROTATED_SCRIPT.replace("s: function", "t: function");
        assert!(matches!(
            parse_mapping_script(&no_subpath),
            Err(ScriptError::MissingMember { member: "s" })
        ));
    }

    #[test]
    fn changed_subpath_shape_is_rejected() {
        let reshaped = ROTATED_SCRIPT.replace("(..)(.)$", "(...)$");
        assert!(matches!(
            parse_mapping_script(&reshaped),
            Err(ScriptError::UnrecognizedShape { member: "s", .. })
        ));
    }

    #[test]
    fn parses_gallery_document() {
        let source = r#"var galleryinfo = {"id":"123456","files":[{"hash":"aa","name":"01.jpg","hasavif":1}],"tags":[{"tag":"studio","url":"/tag/studio"}]};"#;
        let document = parse_gallery_document(source).expect("well-formed document");
        assert_eq!(document.files().len(), 1);
        assert_eq!(document.files()[0].hash, "aa");
        assert_eq!(document.files()[0].name.as_deref(), Some("01.jpg"));
        assert_eq!(document.tags()[0].tag, "studio");
    }

    #[test]
    fn gallery_document_tolerates_missing_and_null_lists() {
        let missing = parse_gallery_document(r#"var galleryinfo = {"id":"1"}"#).expect("parsed");
        assert!(missing.files().is_empty());

        let null =
            parse_gallery_document(r#"var galleryinfo = {"files":null,"tags":null}"#).expect("parsed");
        assert!(null.files().is_empty());
        assert!(null.tags().is_empty());
    }

    #[test]
    fn non_galleryinfo_documents_are_rejected() {
        assert!(matches!(
            parse_gallery_document("var somethingelse = {}"),
            Err(ScriptError::NotGalleryDocument)
        ));
        assert!(matches!(
            parse_gallery_document("{}"),
            Err(ScriptError::NotGalleryDocument)
        ));
    }
}
