use std::sync::Arc;

use tracing::debug;

use super::result::ResultDir;
use crate::backend::SearchBackend;
use crate::file::StaticFile;

/// Permission bits of the mount root.
pub const ROOT_DIR_MODE: u16 = 0o500;

pub const README_NAME: &str = "README.txt";

const README: StaticFile = StaticFile::new(
    r#"
You are in the "search" filesystem. Every directory name you enter here is
run as a search expression, and the matching files are listed inside it.

Usage: cd "<search query>", e.g.:

	cd "after:\"2015-10-01\" and is:image"

Listings are cached for ten seconds.
"#,
);

/// What a name under the root resolves to.
pub enum QueryEntry<B> {
    Readme(StaticFile),
    Results(ResultDir<B>),
}

/// Root of the search mount. Holds no state besides the backend handle.
pub struct QueryDir<B> {
    backend: Arc<B>,
}

impl<B: SearchBackend> QueryDir<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Only the README is listed; searches are reached by name.
    pub fn list(&self) -> Vec<String> {
        vec![README_NAME.to_string()]
    }

    /// Never fails: any name other than the README is taken as an
    /// expression, and a bad expression only shows up when it is listed.
    pub fn lookup_name(&self, name: &str) -> QueryEntry<B> {
        if name == README_NAME {
            return QueryEntry::Readme(README);
        }
        debug!("fs.search: new result dir for {:?}", name);
        QueryEntry::Results(ResultDir::new(Arc::clone(&self.backend), name))
    }
}
