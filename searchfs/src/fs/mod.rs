//! FUSE adapter
//!
//! Exposes the query root, its README, result directories and result files
//! through `rfuse3`. The mount is read-only; every handler resolves its inode
//! through [`inode::InodeTable`] and delegates to the `dir` nodes.
//!
//! Submodules:
//! - `handle`: listings pinned to open directory handles
//! - `inode`: inode allocation and lookup counting
//! - `mount`: mounting helpers
pub mod handle;
pub mod inode;
pub mod mount;

use std::ffi::{OsStr, OsString};
use std::num::NonZeroU32;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use futures_util::stream::{self, Stream};
use rfuse3::Result as FuseResult;
use rfuse3::raw::Filesystem;
use rfuse3::raw::Request;
use rfuse3::raw::reply::{
    DirectoryEntry, DirectoryEntryPlus, FileAttr, ReplyAttr, ReplyData, ReplyDirectory,
    ReplyEntry, ReplyInit, ReplyOpen, ReplyStatFs,
};
use rfuse3::{FileType, Timestamp};
use tracing::{debug, warn};

use crate::backend::SearchBackend;
use crate::dir::{QueryDir, QueryEntry, RESULT_DIR_MODE, ROOT_DIR_MODE, SEARCH_REFRESH_INTERVAL};
use crate::error::{Result, SearchFsError};
use crate::file::STATIC_FILE_MODE;
use handle::{DirHandles, Listing};
use inode::{InodeTable, Node, ROOT_INO};

/// Kernel-side cache lifetime of attributes and plain entries.
const ATTR_TTL: Duration = Duration::from_secs(1);
/// `d_ino` for directory entries whose inode is only known after lookup.
const UNKNOWN_INO: u64 = 0xffff_ffff;
const MAX_WRITE: u32 = 128 * 1024;

pub struct SearchFs<B> {
    backend: Arc<B>,
    root: QueryDir<B>,
    inodes: InodeTable<B>,
    dir_handles: DirHandles,
    uid: u32,
    gid: u32,
    mounted_at: SystemTime,
}

impl<B: SearchBackend + 'static> SearchFs<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            root: QueryDir::new(Arc::clone(&backend)),
            backend,
            inodes: InodeTable::new(),
            dir_handles: DirHandles::new(),
            uid: nix::unistd::geteuid().as_raw(),
            gid: nix::unistd::getegid().as_raw(),
            mounted_at: SystemTime::now(),
        }
    }

    async fn node(&self, ino: u64) -> Result<Node<B>> {
        self.inodes
            .get(ino)
            .await
            .ok_or(SearchFsError::UnknownInode(ino))
    }

    /// Resolves `name` under `parent`, registers the child and returns its
    /// inode, attributes and how long the kernel may cache the entry.
    pub async fn resolve(&self, parent: u64, name: &str) -> Result<(u64, FileAttr, Duration)> {
        let child = match self.node(parent).await? {
            Node::Root => match self.root.lookup_name(name) {
                QueryEntry::Readme(f) => Node::Readme(f),
                QueryEntry::Results(dir) => Node::Results(Arc::new(dir)),
            },
            Node::Results(dir) => Node::File(dir.lookup_name(name).await?),
            Node::Readme(_) | Node::File(_) => return Err(SearchFsError::NotADirectory(parent)),
        };
        let ttl = match child {
            Node::Results(_) => SEARCH_REFRESH_INTERVAL,
            _ => ATTR_TTL,
        };
        let ino = self.inodes.insert(child.clone()).await;
        Ok((ino, self.attr_of(ino, &child), ttl))
    }

    /// Same as [`Self::resolve`] for a raw kernel name. Names that are not
    /// UTF-8 can be neither an expression nor a listed file.
    pub async fn resolve_os(&self, parent: u64, name: &OsStr) -> Result<(u64, FileAttr, Duration)> {
        let Some(name) = name.to_str() else {
            return Err(SearchFsError::NotFound(name.to_string_lossy().into_owned()));
        };
        self.resolve(parent, name).await
    }

    pub async fn attr(&self, ino: u64) -> Result<FileAttr> {
        let node = self.node(ino).await?;
        Ok(self.attr_of(ino, &node))
    }

    /// Child names and kinds of a directory inode.
    pub async fn children(&self, ino: u64) -> Result<Vec<(String, FileType)>> {
        let names = match self.node(ino).await? {
            Node::Root => self.root.list(),
            Node::Results(dir) => dir.list().await?,
            Node::Readme(_) | Node::File(_) => return Err(SearchFsError::NotADirectory(ino)),
        };
        Ok(names
            .into_iter()
            .map(|n| (n, FileType::RegularFile))
            .collect())
    }

    /// Lists `ino` once and pins the listing to a new directory handle.
    pub async fn open_dir(&self, ino: u64) -> Result<u64> {
        let children = self.children(ino).await?;
        Ok(self.dir_handles.open(children).await)
    }

    /// Listing of an open handle. An unknown handle lists `ino` afresh.
    pub async fn dir_listing(&self, ino: u64, fh: u64) -> Result<Listing> {
        match self.dir_handles.get(fh).await {
            Some(listing) => Ok(listing),
            None => Ok(Arc::new(self.children(ino).await?)),
        }
    }

    pub async fn close_dir(&self, fh: u64) {
        self.dir_handles.release(fh).await;
    }

    pub async fn read_node(&self, ino: u64, offset: u64, size: u32) -> Result<Bytes> {
        match self.node(ino).await? {
            Node::Readme(f) => Ok(Bytes::from_static(f.read(offset, size))),
            Node::File(f) => Ok(self.backend.read_file(f.blob_ref(), offset, size).await?),
            Node::Root | Node::Results(_) => Err(SearchFsError::IsADirectory(ino)),
        }
    }

    pub async fn forget_inode(&self, ino: u64, nlookup: u64) {
        self.inodes.forget(ino, nlookup).await;
    }

    fn attr_of(&self, ino: u64, node: &Node<B>) -> FileAttr {
        let (kind, perm, size, mtime) = match node {
            Node::Root => (FileType::Directory, ROOT_DIR_MODE, 0, self.mounted_at),
            Node::Results(_) => (FileType::Directory, RESULT_DIR_MODE, 0, self.mounted_at),
            Node::Readme(f) => (FileType::RegularFile, STATIC_FILE_MODE, f.size(), self.mounted_at),
            Node::File(f) => (FileType::RegularFile, f.mode(), f.size(), f.mod_time()),
        };
        let mtime = Timestamp::from(mtime);
        FileAttr {
            ino,
            size,
            blocks: size.div_ceil(512),
            atime: mtime,
            mtime,
            ctime: mtime,
            #[cfg(target_os = "macos")]
            crtime: mtime,
            kind,
            perm,
            nlink: if node.is_dir() { 2 } else { 1 },
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            #[cfg(target_os = "macos")]
            flags: 0,
            blksize: 4096,
        }
    }
}

impl<B> Filesystem for SearchFs<B>
where
    B: SearchBackend + 'static,
{
    type DirEntryStream<'a>
        = Pin<Box<dyn Stream<Item = FuseResult<DirectoryEntry>> + Send + 'a>>
    where
        Self: 'a;

    // readdirplus is not implemented; the kernel falls back to readdir.
    type DirEntryPlusStream<'a>
        = Pin<Box<dyn Stream<Item = FuseResult<DirectoryEntryPlus>> + Send + 'a>>
    where
        Self: 'a;

    async fn init(&self, _req: Request) -> FuseResult<ReplyInit> {
        let max_write = NonZeroU32::new(MAX_WRITE).unwrap_or(NonZeroU32::MIN);
        Ok(ReplyInit { max_write })
    }

    async fn destroy(&self, _req: Request) {
        debug!("fs.search: destroy");
    }

    async fn lookup(&self, _req: Request, parent: u64, name: &OsStr) -> FuseResult<ReplyEntry> {
        let (_, attr, ttl) = self.resolve_os(parent, name).await.map_err(|e| {
            if !matches!(e, SearchFsError::NotFound(_)) {
                warn!("fs.search: lookup {:?} under {} failed: {}", name, parent, e);
            }
            e
        })?;
        Ok(ReplyEntry {
            ttl,
            attr,
            generation: 0,
        })
    }

    async fn forget(&self, _req: Request, inode: u64, nlookup: u64) {
        self.forget_inode(inode, nlookup).await;
    }

    async fn batch_forget(&self, _req: Request, inodes: &[(u64, u64)]) {
        for &(inode, nlookup) in inodes {
            self.forget_inode(inode, nlookup).await;
        }
    }

    async fn getattr(
        &self,
        _req: Request,
        inode: u64,
        _fh: Option<u64>,
        _flags: u32,
    ) -> FuseResult<ReplyAttr> {
        Ok(ReplyAttr {
            ttl: ATTR_TTL,
            attr: self.attr(inode).await?,
        })
    }

    async fn open(&self, _req: Request, inode: u64, _flags: u32) -> FuseResult<ReplyOpen> {
        if self.node(inode).await?.is_dir() {
            return Err(libc::EISDIR.into());
        }
        Ok(ReplyOpen { fh: 0, flags: 0 })
    }

    async fn read(
        &self,
        _req: Request,
        inode: u64,
        _fh: u64,
        offset: u64,
        size: u32,
    ) -> FuseResult<ReplyData> {
        let data = self.read_node(inode, offset, size).await.map_err(|e| {
            warn!("fs.search: read of inode {} failed: {}", inode, e);
            e
        })?;
        Ok(ReplyData { data })
    }

    async fn release(
        &self,
        _req: Request,
        _inode: u64,
        _fh: u64,
        _flags: u32,
        _lock_owner: u64,
        _flush: bool,
    ) -> FuseResult<()> {
        Ok(())
    }

    async fn opendir(&self, _req: Request, inode: u64, _flags: u32) -> FuseResult<ReplyOpen> {
        let fh = self.open_dir(inode).await.map_err(|e| {
            if !matches!(e, SearchFsError::NotADirectory(_)) {
                warn!("fs.search: listing inode {} failed: {}", inode, e);
            }
            e
        })?;
        Ok(ReplyOpen { fh, flags: 0 })
    }

    async fn readdir<'a>(
        &'a self,
        _req: Request,
        inode: u64,
        fh: u64,
        offset: i64,
    ) -> FuseResult<ReplyDirectory<Self::DirEntryStream<'a>>> {
        let children = self.dir_listing(inode, fh).await?;

        // "." and ".." first; offset is the position of the last entry the
        // kernel already has.
        let mut all: Vec<DirectoryEntry> = Vec::with_capacity(children.len() + 2);
        all.push(DirectoryEntry {
            inode,
            kind: FileType::Directory,
            name: OsString::from("."),
            offset: 1,
        });
        all.push(DirectoryEntry {
            inode: ROOT_INO,
            kind: FileType::Directory,
            name: OsString::from(".."),
            offset: 2,
        });
        for (i, (name, kind)) in children.iter().enumerate() {
            all.push(DirectoryEntry {
                inode: UNKNOWN_INO,
                kind: *kind,
                name: OsString::from(name),
                offset: (i as i64) + 3,
            });
        }

        let start = usize::try_from(offset.max(0)).unwrap_or(usize::MAX);
        let slice = all.into_iter().skip(start).map(Ok);
        let entries: Self::DirEntryStream<'a> = Box::pin(stream::iter(slice));
        Ok(ReplyDirectory { entries })
    }

    async fn releasedir(
        &self,
        _req: Request,
        _inode: u64,
        fh: u64,
        _flags: u32,
    ) -> FuseResult<()> {
        self.close_dir(fh).await;
        Ok(())
    }

    async fn access(&self, _req: Request, inode: u64, _mask: u32) -> FuseResult<()> {
        self.node(inode).await?;
        Ok(())
    }

    async fn statfs(&self, _req: Request, _inode: u64) -> FuseResult<ReplyStatFs> {
        Ok(ReplyStatFs {
            blocks: 0,
            bfree: 0,
            bavail: 0,
            files: 0,
            ffree: 0,
            bsize: 4096,
            namelen: 255,
            frsize: 4096,
        })
    }
}
