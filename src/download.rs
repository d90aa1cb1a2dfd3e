//! File downloads through the proxy rotation

use crate::config::DEFAULT_USER_AGENT;
use crate::error::Result;
use crate::proxy::ProxyManager;
use futures::StreamExt;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, Response};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};
use url::Url;

/// Timeout for a whole download in seconds
const DOWNLOAD_TIMEOUT_SECS: u64 = 20;

/// Name used when the URL path has no last segment
const FALLBACK_FILE_NAME: &str = "downloaded_file";

/// Characters that cannot appear in a file name on common filesystems
static UNSAFE_FILE_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[\\/:*?"<>|\x00-\x1f]"#).expect("Invalid file name regex")
});

/// Downloads URLs into `base_dir/<subdir>/<file name>`
pub struct FileDownloader {
    base_dir: PathBuf,
    user_agent: String,
    timeout: Duration,
    proxies: Option<Arc<ProxyManager>>,
}

impl FileDownloader {
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DOWNLOAD_TIMEOUT_SECS),
            proxies: None,
        }
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Route downloads through the manager's proxy rotation
    pub fn with_proxy_manager(mut self, proxies: Arc<ProxyManager>) -> Self {
        self.proxies = Some(proxies);
        self
    }

    /// Download `url` into `subdir`, returning the written path
    ///
    /// Failures are logged and reported as `None`; nothing is retried.
    pub async fn download(&self, url: &str, subdir: &str) -> Option<PathBuf> {
        match self.try_download(url, subdir).await {
            Ok(path) => Some(path),
            Err(e) => {
                error!("Failed to download {}: {}", url, e);
                None
            }
        }
    }

    async fn try_download(&self, url: &str, subdir: &str) -> Result<PathBuf> {
        let parsed = Url::parse(url)?;
        let out_dir = self.base_dir.join(subdir);
        fs::create_dir_all(&out_dir).await?;
        let dest = out_dir.join(file_name_from_url(url));

        let client = self.create_client()?;
        info!("Downloading {} -> {}", url, dest.display());

        let response = client.get(parsed).send().await?.error_for_status()?;

        // `dest` only ever holds a complete body
        let partial = partial_path(&dest);
        let written = match write_body(response, &partial).await {
            Ok(written) => written,
            Err(e) => {
                if let Err(remove_err) = fs::remove_file(&partial).await {
                    warn!("Could not remove {}: {}", partial.display(), remove_err);
                }
                return Err(e);
            }
        };
        fs::rename(&partial, &dest).await?;

        info!("Saved {} ({} bytes)", dest.display(), written);
        Ok(dest)
    }

    fn create_client(&self) -> Result<Client> {
        let mut builder = Client::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent);

        if let Some(options) = self.proxies.as_ref().and_then(|m| m.connection_options()) {
            builder = options.apply(builder)?;
        }

        Ok(builder.build()?)
    }
}

/// Stream a response body into `path`, returning the byte count
async fn write_body(response: Response, path: &Path) -> Result<u64> {
    let mut file = fs::File::create(path).await?;
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

/// File name for a URL: its last path segment, percent-decoded
///
/// Query strings are ignored and characters a filesystem would reject are
/// replaced with `_`.
pub fn file_name_from_url(url: &str) -> String {
    let last_segment = Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|segments| segments.last().map(str::to_string))
        })
        .unwrap_or_default();

    let decoded = urlencoding::decode(&last_segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| last_segment.clone());

    let name = UNSAFE_FILE_CHARS.replace_all(&decoded, "_").trim().to_string();
    if name.is_empty() || name == "." || name == ".." {
        FALLBACK_FILE_NAME.to_string()
    } else {
        name
    }
}
