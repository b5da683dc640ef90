//! Directory nodes
//!
//! - `query`: the mount root; every name looked up in it is a search.
//! - `result`: one search expression, its cached snapshot and lookups.
pub mod query;
pub mod result;

pub use query::{QueryDir, QueryEntry, README_NAME, ROOT_DIR_MODE};
pub use result::{RESULT_DIR_MODE, ResultDir, SEARCH_REFRESH_INTERVAL};
