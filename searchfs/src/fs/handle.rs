//! Open directory handles.
//!
//! `opendir` takes the listing once and parks it under a fresh handle; every
//! `readdir` page of that handle is cut from the same listing, so a refresh
//! between pages cannot shift offsets. `releasedir` drops it.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rfuse3::FileType;
use tokio::sync::Mutex;

pub type Listing = Arc<Vec<(String, FileType)>>;

pub struct DirHandles {
    next: AtomicU64,
    open: Mutex<HashMap<u64, Listing>>,
}

impl DirHandles {
    pub fn new() -> Self {
        Self {
            // 0 is what stateless opens report.
            next: AtomicU64::new(1),
            open: Mutex::new(HashMap::new()),
        }
    }

    pub async fn open(&self, listing: Vec<(String, FileType)>) -> u64 {
        let fh = self.next.fetch_add(1, Ordering::Relaxed);
        self.open.lock().await.insert(fh, Arc::new(listing));
        fh
    }

    pub async fn get(&self, fh: u64) -> Option<Listing> {
        self.open.lock().await.get(&fh).cloned()
    }

    pub async fn release(&self, fh: u64) {
        self.open.lock().await.remove(&fh);
    }
}

impl Default for DirHandles {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn handles_are_distinct_and_released() {
        let handles = DirHandles::new();
        let a = handles.open(vec![("a".into(), FileType::RegularFile)]).await;
        let b = handles.open(Vec::new()).await;
        assert_ne!(a, b);
        assert_ne!(a, 0);

        assert_eq!(handles.get(a).await.unwrap()[0].0, "a");
        handles.release(a).await;
        assert!(handles.get(a).await.is_none());
        assert!(handles.get(b).await.unwrap().is_empty());
    }
}
