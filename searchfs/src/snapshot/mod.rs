//! Immutable projection of one search response into file names.
//!
//! A [`Snapshot`] is built in one pass over the search hits and never mutated
//! afterwards. Refresh swaps whole snapshots, so readers see either the old
//! listing or the new one.
pub mod shape;

use std::collections::HashMap;
use std::time::SystemTime;

use tracing::debug;

use crate::backend::{BlobRef, SearchResult};
use crate::error::DropReason;
use crate::file::ResultFile;
use shape::{ContentShape, resolve_content};

/// Length of the digest prefix used when a name has to be synthesized.
pub const FALLBACK_NAME_LEN: usize = 10;

#[derive(Debug, Default)]
pub struct Snapshot {
    entries: HashMap<String, ResultFile>,
    names: Vec<String>,
}

impl Snapshot {
    /// Projects `result` into names. `now` stands in for any item without a
    /// timestamp of its own.
    pub fn project(result: &SearchResult, now: SystemTime) -> Self {
        let mut snap = Self::default();
        for hit in &result.blobs {
            let content = match resolve_content(result, &hit.blob) {
                Ok(content) => content,
                Err(reason) => {
                    debug!("fs.search: dropping {}: {:?}", hit.blob, reason);
                    continue;
                }
            };
            let shape = ContentShape::of(&content);
            let (mime_type, mod_time, size) = match shape {
                ContentShape::File {
                    mime_type,
                    mod_time,
                    size,
                    ..
                } => (Some(mime_type), mod_time.unwrap_or(now), size),
                ContentShape::Directory { .. } => (None, now, 0),
                ContentShape::Unresolved => {
                    debug!(
                        "fs.search: dropping {}: {:?}",
                        hit.blob,
                        DropReason::UnsupportedShape
                    );
                    continue;
                }
            };

            let natural = shape.name();
            let name = if usable_name(natural) && !snap.entries.contains_key(natural) {
                natural.to_string()
            } else {
                let fallback = fallback_name(&content.blob_ref, natural, mime_type);
                if !usable_name(&fallback) || snap.entries.contains_key(&fallback) {
                    debug!(
                        "fs.search: dropping {} ({:?}): {:?}",
                        content.blob_ref,
                        fallback,
                        DropReason::NameExhausted
                    );
                    continue;
                }
                fallback
            };

            debug!(
                "fs.search: name {:?} = {} (at {:?})",
                name, content.blob_ref, mod_time
            );
            let file = ResultFile::new(content.blob_ref.clone(), mod_time, size);
            snap.insert(name, file);
        }
        snap
    }

    fn insert(&mut self, name: String, file: ResultFile) {
        self.entries.insert(name.clone(), file);
        self.names.push(name);
    }

    /// Names in search-result order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn get(&self, name: &str) -> Option<&ResultFile> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Names the kernel would reject or misinterpret go through the fallback.
fn usable_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\0'])
}

/// Extension of `name` including the dot, or `""`.
fn extension(name: &str) -> &str {
    name.rfind('.').map_or("", |i| &name[i..])
}

/// `<first 10 digest chars><ext>`, where ext is taken from the natural name
/// and defaults to `.jpg` for JPEG images.
fn fallback_name(blob_ref: &BlobRef, natural: &str, mime_type: Option<&str>) -> String {
    let mut ext = extension(natural);
    if ext.contains('/') {
        ext = "";
    }
    if ext.is_empty() && mime_type.is_some_and(|m| m.ends_with("image/jpeg")) {
        ext = ".jpg";
    }
    let prefix: String = blob_ref
        .digest()
        .chars()
        .take(FALLBACK_NAME_LEN)
        .collect();
    format!("{prefix}{ext}")
}
