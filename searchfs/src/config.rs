//! Validated runtime configuration, built from [`Args`](crate::cli::Args).

use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Args;
use crate::error::ConfigError;

pub const DEFAULT_SEARCH_PATH: &str = "my-search/camli/search/query";
pub const DEFAULT_BLOB_PATH: &str = "bs/camli";
pub const DEFAULT_DOWNLOAD_PATH: &str = "ui/download";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server: String,
    pub search_path: String,
    pub blob_path: String,
    pub download_path: String,
    pub auth: Option<Credentials>,
    pub timeout: Duration,
    pub mountpoint: PathBuf,
    pub privileged: bool,
}

impl Config {
    /// Defaults for everything but the server.
    pub fn for_server(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            search_path: DEFAULT_SEARCH_PATH.into(),
            blob_path: DEFAULT_BLOB_PATH.into(),
            download_path: DEFAULT_DOWNLOAD_PATH.into(),
            auth: None,
            timeout: DEFAULT_TIMEOUT,
            mountpoint: PathBuf::new(),
            privileged: false,
        }
    }

    /// Joins a handler path onto the server url.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.server.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl TryFrom<&Args> for Config {
    type Error = ConfigError;

    fn try_from(args: &Args) -> Result<Self, Self::Error> {
        let server = args.server.trim();
        if server.is_empty() {
            return Err(ConfigError::EmptyServer);
        }
        if !(server.starts_with("http://") || server.starts_with("https://")) {
            return Err(ConfigError::InvalidServer(server.to_string()));
        }
        if args.mountpoint.trim().is_empty() {
            return Err(ConfigError::EmptyMountpoint);
        }
        let auth = match args.auth.as_deref() {
            None | Some("") => None,
            Some(raw) => {
                let (user, password) = raw.split_once(':').ok_or(ConfigError::InvalidAuth)?;
                if user.is_empty() {
                    return Err(ConfigError::InvalidAuth);
                }
                Some(Credentials {
                    user: user.to_string(),
                    password: password.to_string(),
                })
            }
        };
        Ok(Self {
            server: server.to_string(),
            search_path: args.search_path.clone(),
            blob_path: args.blob_path.clone(),
            download_path: args.download_path.clone(),
            auth,
            timeout: Duration::from_secs(args.timeout_secs.max(1)),
            mountpoint: PathBuf::from(&args.mountpoint),
            privileged: args.privileged,
        })
    }
}
