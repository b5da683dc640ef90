//! Decoding of a search hit into the content it points at.

use std::time::SystemTime;

use crate::backend::types::CONTENT_ATTR;
use crate::backend::{BlobRef, DescribedBlob, SearchResult};
use crate::error::DropReason;

/// What a described content blob looks like to the filesystem.
#[derive(Clone, Debug, PartialEq)]
pub enum ContentShape<'a> {
    File {
        name: &'a str,
        mime_type: &'a str,
        mod_time: Option<SystemTime>,
        size: u64,
    },
    Directory {
        name: &'a str,
    },
    Unresolved,
}

impl<'a> ContentShape<'a> {
    pub fn of(content: &'a DescribedBlob) -> Self {
        if let Some(file) = &content.file {
            return Self::File {
                name: &file.file_name,
                mime_type: &file.mime_type,
                mod_time: file.mod_time(),
                size: file.size.unwrap_or(0),
            };
        }
        if let Some(dir) = &content.dir {
            return Self::Directory {
                name: &dir.file_name,
            };
        }
        Self::Unresolved
    }

    pub fn name(&self) -> &'a str {
        match self {
            Self::File { name, .. } | Self::Directory { name } => name,
            Self::Unresolved => "",
        }
    }
}

/// Follows `hit` -> permanode -> `camliContent` -> content description.
/// A description that does not decode counts as missing.
pub fn resolve_content(result: &SearchResult, hit: &BlobRef) -> Result<DescribedBlob, DropReason> {
    let meta = result.meta(hit).ok_or(DropReason::MissingDescription)?;
    let permanode = meta.permanode.as_ref().ok_or(DropReason::NotAPermanode)?;
    let content = permanode
        .attr(CONTENT_ATTR)
        .and_then(BlobRef::parse)
        .ok_or(DropReason::MissingContent)?;
    result.meta(&content).ok_or(DropReason::UndescribedContent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ResultBuilder;
    use serde_json::json;

    #[test]
    fn resolves_file_and_dir_shapes() {
        let result = ResultBuilder::new()
            .file("sha224-0001", "sha224-a1", "a.txt", "text/plain", Some("2020-01-02T03:04:05Z"))
            .dir("sha224-0002", "sha224-b2", "photos")
            .build();

        let file = resolve_content(&result, &result.blobs[0].blob).unwrap();
        match ContentShape::of(&file) {
            ContentShape::File {
                name, mime_type, mod_time, ..
            } => {
                assert_eq!(name, "a.txt");
                assert_eq!(mime_type, "text/plain");
                assert!(mod_time.is_some());
            }
            other => panic!("unexpected shape {other:?}"),
        }

        let dir = resolve_content(&result, &result.blobs[1].blob).unwrap();
        assert_eq!(ContentShape::of(&dir), ContentShape::Directory { name: "photos" });
    }

    #[test]
    fn reports_why_a_hit_is_unusable() {
        let result = ResultBuilder::new()
            .hit_without_meta("sha224-0001")
            .non_permanode("sha224-0002")
            .permanode_without_content("sha224-0003")
            .permanode_with_content("sha224-0004", "not-a-ref")
            .permanode_with_content("sha224-0005", "sha224-ee")
            .build();

        let reasons: Vec<_> = result
            .blobs
            .iter()
            .map(|hit| resolve_content(&result, &hit.blob).unwrap_err())
            .collect();
        assert_eq!(
            reasons,
            vec![
                DropReason::MissingDescription,
                DropReason::NotAPermanode,
                DropReason::MissingContent,
                DropReason::MissingContent,
                DropReason::UndescribedContent,
            ]
        );
    }

    #[test]
    fn undecodable_descriptions_count_as_missing() {
        let result = ResultBuilder::new()
            .raw_hit("sha224-0001", json!({ "permanode": { "attr": "oops" } }))
            .permanode_with_content("sha224-0002", "sha224-dd")
            .raw_meta("sha224-dd", json!({ "file": { "fileName": 3 } }))
            .file("sha224-0003", "sha224-a1", "good.txt", "text/plain", None)
            .build();

        let first = resolve_content(&result, &result.blobs[0].blob);
        assert_eq!(first.unwrap_err(), DropReason::MissingDescription);
        let second = resolve_content(&result, &result.blobs[1].blob);
        assert_eq!(second.unwrap_err(), DropReason::UndescribedContent);
        let third = resolve_content(&result, &result.blobs[2].blob).unwrap();
        assert_eq!(ContentShape::of(&third).name(), "good.txt");
    }

    #[test]
    fn neither_file_nor_dir_is_unresolved() {
        let result = ResultBuilder::new()
            .opaque_content("sha224-0001", "sha224-cc")
            .build();
        let content = resolve_content(&result, &result.blobs[0].blob).unwrap();
        assert_eq!(ContentShape::of(&content), ContentShape::Unresolved);
    }
}
