//! Leaf nodes: search result files and the static README.

use std::time::SystemTime;

use crate::backend::BlobRef;

/// Permission bits of a search result file.
pub const RESULT_FILE_MODE: u16 = 0o666;
/// Permission bits of static informational files.
pub const STATIC_FILE_MODE: u16 = 0o444;

/// A file listed in a result directory. Lookups hand out clones of the
/// snapshot's copy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResultFile {
    blob_ref: BlobRef,
    mod_time: SystemTime,
    size: u64,
}

impl ResultFile {
    pub fn new(blob_ref: BlobRef, mod_time: SystemTime, size: u64) -> Self {
        Self {
            blob_ref,
            mod_time,
            size,
        }
    }

    pub fn blob_ref(&self) -> &BlobRef {
        &self.blob_ref
    }

    pub fn mod_time(&self) -> SystemTime {
        self.mod_time
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn mode(&self) -> u16 {
        RESULT_FILE_MODE
    }
}

/// A read-only file with contents fixed at compile time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StaticFile {
    contents: &'static str,
}

impl StaticFile {
    pub const fn new(contents: &'static str) -> Self {
        Self { contents }
    }

    pub fn size(&self) -> u64 {
        self.contents.len() as u64
    }

    /// Bytes in `[offset, offset + size)`, clamped to the contents.
    pub fn read(&self, offset: u64, size: u32) -> &'static [u8] {
        let data = self.contents.as_bytes();
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
        let end = start.saturating_add(size as usize).min(data.len());
        &data[start..end]
    }
}
