use thiserror::Error;

use crate::backend::BackendError;

pub type Result<T> = std::result::Result<T, SearchFsError>;

/// Errors surfaced to the filesystem layer.
#[derive(Error, Debug)]
pub enum SearchFsError {
    /// The search call failed. The cached snapshot is left as it was.
    #[error("search backend unavailable: {0}")]
    BackendUnavailable(#[from] BackendError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("inode {0} is not a directory")]
    NotADirectory(u64),

    #[error("inode {0} is a directory")]
    IsADirectory(u64),

    #[error("unknown inode {0}")]
    UnknownInode(u64),
}

impl SearchFsError {
    pub fn errno(&self) -> libc::c_int {
        match self {
            Self::BackendUnavailable(_) => libc::EIO,
            Self::NotFound(_) | Self::UnknownInode(_) => libc::ENOENT,
            Self::NotADirectory(_) => libc::ENOTDIR,
            Self::IsADirectory(_) => libc::EISDIR,
        }
    }
}

impl From<SearchFsError> for rfuse3::Errno {
    fn from(err: SearchFsError) -> Self {
        err.errno().into()
    }
}

/// Why an individual search hit was left out of a listing. These never reach
/// the caller; the listing just shrinks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// No decodable description for the hit itself.
    MissingDescription,
    /// The hit is described but is not a permanode.
    NotAPermanode,
    /// No parseable `camliContent` attribute.
    MissingContent,
    /// The content blob has no decodable description.
    UndescribedContent,
    /// The content is neither a file nor a directory.
    UnsupportedShape,
    /// Both the natural and the synthesized name are taken.
    NameExhausted,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("server url must not be empty")]
    EmptyServer,

    #[error("server url must start with http:// or https://: {0}")]
    InvalidServer(String),

    #[error("auth must look like user:password")]
    InvalidAuth,

    #[error("mountpoint must not be empty")]
    EmptyMountpoint,
}
