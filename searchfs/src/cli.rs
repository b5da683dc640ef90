use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about = "Mount content-search results as a FUSE directory", long_about = None)]
pub struct Args {
    /// Search/blob server base url
    #[arg(long, env = "SEARCHFS_SERVER", default_value = "http://localhost:3179")]
    pub server: String,

    /// Search query handler, relative to the server
    #[arg(
        long,
        env = "SEARCHFS_SEARCH_PATH",
        default_value = "my-search/camli/search/query"
    )]
    pub search_path: String,

    /// Blob fetch handler, relative to the server
    #[arg(long, env = "SEARCHFS_BLOB_PATH", default_value = "bs/camli")]
    pub blob_path: String,

    /// File download handler, relative to the server
    #[arg(long, env = "SEARCHFS_DOWNLOAD_PATH", default_value = "ui/download")]
    pub download_path: String,

    /// HTTP basic auth as `user:password`
    #[arg(long, env = "SEARCHFS_AUTH")]
    pub auth: Option<String>,

    /// Per-request timeout towards the server
    #[arg(long, env = "SEARCHFS_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Path to mount point
    #[arg(long)]
    pub mountpoint: String,

    /// Use privileged mount instead of fusermount3
    #[arg(long, default_value_t = false)]
    pub privileged: bool,
}
