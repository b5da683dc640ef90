//! searchfs: browse content-search results as a FUSE directory.
//!
//! `cd "<expression>"` under the mount root runs the expression against the
//! search server and lists the matching files. Listings are cached per
//! directory for [`dir::SEARCH_REFRESH_INTERVAL`].

pub mod backend;
pub mod cli;
pub mod config;
pub mod dir;
pub mod error;
pub mod file;
pub mod fs;
pub mod snapshot;

#[cfg(test)]
pub(crate) mod test_utils;

pub use backend::{BackendError, SearchBackend};
pub use dir::{QueryDir, QueryEntry, ResultDir};
pub use error::{Result, SearchFsError};
pub use fs::SearchFs;
