//! Wire types of the search and describe API.
//!
//! Field names follow the JSON the search handler speaks (`blobRef`,
//! `camliType`, `fileName`, ...). Optional and `null` members are tolerated
//! everywhere: a response with holes must still decode so that refresh can
//! drop the incomplete items one by one instead of failing the whole listing.

use std::collections::HashMap;
use std::fmt;
use std::time::SystemTime;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

/// Permanode attribute pointing at the content blob.
pub const CONTENT_ATTR: &str = "camliContent";
/// Permanode attribute pointing at a representative image.
pub const CONTENT_IMAGE_ATTR: &str = "camliContentImage";
/// Permanode attribute listing set members.
pub const MEMBER_ATTR: &str = "camliMember";

/// Reference to a content-addressed blob, e.g. `sha224-4d1f...`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobRef(String);

impl BlobRef {
    /// Parses `<hash>-<hexdigest>`. Returns `None` for anything else.
    pub fn parse(s: &str) -> Option<Self> {
        let (hash, digest) = s.split_once('-')?;
        if hash.is_empty() || !hash.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return None;
        }
        if digest.is_empty() || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self(s.to_string()))
    }

    /// Digest with the hash-name prefix stripped.
    pub fn digest(&self) -> &str {
        self.0.split_once('-').map_or(self.0.as_str(), |(_, digest)| digest)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SearchQuery {
    pub expression: String,
    /// `-1` asks for every match.
    pub limit: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub describe: Option<DescribeRequest>,
}

impl SearchQuery {
    /// Unbounded query for `expression` that also describes the content,
    /// content image and members of each matching permanode.
    pub fn describing_content(expression: &str) -> Self {
        Self {
            expression: expression.to_string(),
            limit: -1,
            describe: Some(DescribeRequest {
                rules: vec![DescribeRule {
                    attrs: vec![
                        CONTENT_ATTR.to_string(),
                        CONTENT_IMAGE_ATTR.to_string(),
                        MEMBER_ATTR.to_string(),
                    ],
                }],
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DescribeRequest {
    pub rules: Vec<DescribeRule>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DescribeRule {
    pub attrs: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SearchResult {
    #[serde(default, deserialize_with = "null_as_default")]
    pub blobs: Vec<SearchResultBlob>,
    #[serde(rename = "description", default)]
    pub describe: Option<DescribeResponse>,
}

impl SearchResult {
    /// Description of `blob`, if the response carries a usable one.
    pub fn meta(&self, blob: &BlobRef) -> Option<DescribedBlob> {
        self.describe.as_ref()?.get(blob)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct SearchResultBlob {
    pub blob: BlobRef,
}

/// Per-blob descriptions, kept undecoded until a hit asks for one so that a
/// single malformed entry only costs the item that points at it.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct DescribeResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub meta: HashMap<String, Value>,
}

impl DescribeResponse {
    /// Decodes the entry keyed by `blob`. The key is the blob ref; an entry
    /// that does not decode counts as missing.
    pub fn get(&self, blob: &BlobRef) -> Option<DescribedBlob> {
        let raw = self.meta.get(blob.as_str())?;
        match DescribedFields::deserialize(raw) {
            Ok(fields) => Some(DescribedBlob {
                blob_ref: blob.clone(),
                camli_type: fields.camli_type,
                permanode: fields.permanode,
                file: fields.file,
                dir: fields.dir,
            }),
            Err(e) => {
                debug!("fs.search: undecodable description of {}: {}", blob, e);
                None
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct DescribedBlob {
    pub blob_ref: BlobRef,
    pub camli_type: Option<String>,
    pub permanode: Option<DescribedPermanode>,
    pub file: Option<FileInfo>,
    pub dir: Option<FileInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribedFields {
    #[serde(default)]
    camli_type: Option<String>,
    #[serde(default)]
    permanode: Option<DescribedPermanode>,
    #[serde(default)]
    file: Option<FileInfo>,
    #[serde(default)]
    dir: Option<FileInfo>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct DescribedPermanode {
    #[serde(default, deserialize_with = "null_as_default")]
    pub attr: HashMap<String, Option<Vec<String>>>,
}

impl DescribedPermanode {
    /// First value of a permanode attribute.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attr.get(key)?.as_ref()?.first().map(String::as_str)
    }
}

/// File or directory schema summary.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    pub file_name: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(rename = "mimeType", default, deserialize_with = "null_as_default")]
    pub mime_type: String,
    /// RFC 3339, kept raw so a malformed value only loses the timestamp.
    #[serde(default)]
    pub time: Option<String>,
}

impl FileInfo {
    /// The file's own timestamp, unless absent, unparsable or zero.
    pub fn mod_time(&self) -> Option<SystemTime> {
        let raw = self.time.as_deref()?;
        let time = DateTime::parse_from_rfc3339(raw).ok()?.with_timezone(&Utc);
        if is_any_zero(&time) {
            return None;
        }
        Some(time.into())
    }
}

/// Both the Unix epoch and year one count as "no time".
fn is_any_zero(time: &DateTime<Utc>) -> bool {
    time.timestamp() == 0 || time.year() <= 1
}

/// Subset of a schema blob, fetched to report what a lookup resolved to.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaMeta {
    pub camli_type: String,
    #[serde(default)]
    pub size: Option<u64>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
