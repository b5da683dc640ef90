//! Mount helpers for starting/stopping FUSE
//!
//! Notes:
//! - Only supported on Linux. Unprivileged mounts go through fusermount3.
//! - These helpers are thin wrappers over rfuse3 raw Session APIs.

use std::path::Path;

use rfuse3::MountOptions;

use super::SearchFs;
use crate::backend::SearchBackend;

/// Read-only mount owned by the calling user.
pub fn default_mount_options() -> MountOptions {
    let mut mo = MountOptions::default();
    mo.fs_name("searchfs")
        .read_only(true)
        .uid(nix::unistd::geteuid().as_raw())
        .gid(nix::unistd::getegid().as_raw());
    mo
}

/// Mounts `fs` on an existing empty directory. Unless `privileged` is set the
/// mount goes through fusermount3, which must be on `PATH`.
#[cfg(target_os = "linux")]
pub async fn mount_search_fs<B>(
    fs: SearchFs<B>,
    mount_point: impl AsRef<Path>,
    privileged: bool,
) -> std::io::Result<rfuse3::raw::MountHandle>
where
    B: SearchBackend + 'static,
{
    let session = rfuse3::raw::Session::new(default_mount_options());
    if privileged {
        session.mount(fs, mount_point).await
    } else {
        session.mount_with_unprivileged(fs, mount_point).await
    }
}

#[cfg(not(target_os = "linux"))]
pub async fn mount_search_fs<B>(
    _fs: SearchFs<B>,
    _mount_point: impl AsRef<Path>,
    _privileged: bool,
) -> std::io::Result<rfuse3::raw::MountHandle>
where
    B: SearchBackend + 'static,
{
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "FUSE mount is only supported on Linux in this build",
    ))
}
