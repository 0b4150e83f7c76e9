use std::future::Future;
use std::path::Path;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tracing::debug;
use url::Url;

use crate::error::FetchError;

/// The two network operations the pipeline needs.
pub trait Transport {
    /// GET a page and return its body as text. Non-2xx is an error.
    fn get_text(&self, url: &Url) -> impl Future<Output = Result<String, FetchError>> + Send;

    /// Stream a GET response into `dest`, returning the number of bytes written.
    /// A partially written file is left for the caller's scratch guard to remove.
    fn download(
        &self,
        url: &Url,
        dest: &Path,
        timeout: Option<Duration>,
    ) -> impl Future<Output = Result<u64, FetchError>> + Send;
}

/// reqwest-backed transport used against the real file server.
#[derive(Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        HttpTransport {
            client: reqwest::Client::new(),
        }
    }

    async fn send(
        &self,
        url: &Url,
        timeout: Option<Duration>,
    ) -> Result<reqwest::Response, FetchError> {
        let mut req = self.client.get(url.clone());
        if let Some(t) = timeout {
            req = req.timeout(t);
        }
        let resp = req.send().await.map_err(|e| classify(e, url))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(resp)
    }
}

impl Transport for HttpTransport {
    async fn get_text(&self, url: &Url) -> Result<String, FetchError> {
        let resp = self.send(url, None).await?;
        resp.text().await.map_err(|e| classify(e, url))
    }

    async fn download(
        &self,
        url: &Url,
        dest: &Path,
        timeout: Option<Duration>,
    ) -> Result<u64, FetchError> {
        let mut resp = self.send(url, timeout).await?;
        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;

        while let Some(chunk) = resp.chunk().await.map_err(|e| classify(e, url))? {
            // keep-alive chunks carry nothing
            if chunk.is_empty() {
                continue;
            }
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        debug!(url = %url, bytes = written, "download complete");
        Ok(written)
    }
}

fn classify(e: reqwest::Error, url: &Url) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Http(e)
    }
}

/// Join `path` onto `base` as a directory, the way a browser resolves a
/// relative link found on `base/`.
pub fn join_dir(base: &Url, path: &str) -> Result<Url, FetchError> {
    let mut dir = base.clone();
    if !dir.path().ends_with('/') {
        let p = format!("{}/", dir.path());
        dir.set_path(&p);
    }
    Ok(dir.join(path)?)
}
