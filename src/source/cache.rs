use futures::StreamExt;
use reqwest::header::{HeaderName, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use reqwest::StatusCode;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use url::Url;

use super::{FetchError, SourceLocator};
use crate::config::Config;

/// Last successfully fetched body together with the validators that came with it.
///
/// Always replaced as a unit under the write lock.
#[derive(Debug, Default)]
struct CachedSource {
    data: Vec<u8>,
    etag: String,
    last_modified: String,
}

struct RefreshTask {
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

/// Read-through cache in front of the single upstream feed.
///
/// With a zero refresh interval every [`get`](Self::get) fetches live. With a
/// non-zero interval, [`start`](Self::start) warms the cache and spawns a task
/// that refetches periodically; `get` then serves the cached bytes.
///
/// Concurrent fetches are not de-duplicated: two of them may both reach the
/// upstream and the last one to finish wins. Readers always see either the
/// previous or the new body, never a mix.
pub struct SourceCache {
    config: Arc<Config>,
    client: reqwest::Client,
    state: RwLock<CachedSource>,
    started: AtomicBool,
    refresh: Mutex<Option<RefreshTask>>,
}

impl SourceCache {
    /// Creates an empty cache. Nothing is fetched until `start` or `get`.
    pub fn new(config: Arc<Config>) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            config,
            client,
            state: RwLock::new(CachedSource::default()),
            started: AtomicBool::new(false),
            refresh: Mutex::new(None),
        })
    }

    /// Warms the cache and starts the periodic refresh task.
    ///
    /// No-op when refresh is disabled or the cache was already started. A
    /// failed warm-up is logged; requests then fall back to fetching live
    /// until a refresh succeeds. The task stops once `shutdown` is cancelled.
    pub async fn start(self: &Arc<Self>, shutdown: CancellationToken) {
        if !self.config.refresh_enabled() || self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Err(e) = self.fetch().await {
            tracing::error!(source = %self.config.source, error = %e, "Initial fetch failed");
        }

        let period = self.config.refresh;
        let cache = Arc::clone(self);
        let token = shutdown.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;

                    _ = token.cancelled() => {
                        tracing::debug!("Background refresh stopped");
                        break;
                    }

                    _ = ticker.tick() => {
                        // Runs inside this task, so no request can cancel it.
                        match cache.fetch().await {
                            Ok(bytes) => {
                                tracing::debug!(bytes = bytes.len(), "Background refresh complete");
                            }
                            Err(e) => {
                                tracing::warn!(
                                    source = %cache.config.source,
                                    error = %e,
                                    "Background refresh failed"
                                );
                            }
                        }
                    }
                }
            }
        });

        tracing::info!(interval_secs = period.as_secs_f64(), "Background refresh started");
        *self.refresh.lock().await = Some(RefreshTask { shutdown, handle });
    }

    /// Cancels the refresh task and waits for it to finish.
    pub async fn shutdown(&self) {
        let Some(task) = self.refresh.lock().await.take() else {
            return;
        };
        task.shutdown.cancel();
        if let Err(e) = task.handle.await {
            tracing::warn!(error = %e, "Background refresh task panicked");
        }
    }

    /// Returns the upstream feed bytes.
    ///
    /// The returned buffer is an independent copy; later refreshes never
    /// change it and callers cannot reach the cached state through it.
    pub async fn get(&self) -> Result<Vec<u8>, FetchError> {
        if !self.config.refresh_enabled() {
            return self.fetch().await;
        }

        {
            let state = self.state.read().await;
            if !state.data.is_empty() {
                return Ok(state.data.clone());
            }
        }

        // Cold start or failed warm-up.
        self.fetch().await
    }

    async fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        tracing::info!(source = %self.config.source, "Fetching source feed");
        match SourceLocator::parse(&self.config.source)? {
            SourceLocator::Http(url) => self.fetch_http(url).await,
            SourceLocator::File(path) => self.fetch_file(&path).await,
        }
    }

    async fn fetch_http(&self, url: Url) -> Result<Vec<u8>, FetchError> {
        let mut request = self.client.get(url);
        {
            let state = self.state.read().await;
            if !state.etag.is_empty() {
                request = request.header(IF_NONE_MATCH, state.etag.as_str());
            }
            if !state.last_modified.is_empty() {
                request = request.header(IF_MODIFIED_SINCE, state.last_modified.as_str());
            }
        }

        let response = request.send().await.map_err(FetchError::from_request)?;
        let status = response.status();

        if status == StatusCode::NOT_MODIFIED {
            let state = self.state.read().await;
            if state.data.is_empty() {
                return Err(FetchError::NotModifiedWithoutCache);
            }
            tracing::debug!(source = %self.config.source, "Upstream not modified, reusing cached body");
            return Ok(state.data.clone());
        }

        if !status.is_success() {
            return Err(FetchError::UpstreamStatus(status.as_u16()));
        }

        let etag = header_string(&response, ETAG);
        let last_modified = header_string(&response, LAST_MODIFIED);
        let body = read_limited_bytes(response, self.config.max_feed_bytes).await?;
        tracing::info!(bytes = body.len(), "Successfully read HTTP feed");

        self.replace(body.clone(), etag, last_modified).await;
        Ok(body)
    }

    async fn fetch_file(&self, path: &Path) -> Result<Vec<u8>, FetchError> {
        let body = tokio::fs::read(path).await.map_err(|error| FetchError::Io {
            path: path.display().to_string(),
            error,
        })?;
        tracing::info!(path = %path.display(), bytes = body.len(), "Successfully read local feed");

        // Files carry no validators.
        self.replace(body.clone(), String::new(), String::new()).await;
        Ok(body)
    }

    async fn replace(&self, data: Vec<u8>, etag: String, last_modified: String) {
        let mut state = self.state.write().await;
        *state = CachedSource {
            data,
            etag,
            last_modified,
        };
    }
}

fn header_string(response: &reqwest::Response, name: HeaderName) -> String {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len > limit as u64 {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::from_request)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
