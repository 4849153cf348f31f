//! The asset cache worker
//!
//! Lifecycle follows the platform's install/activate model: install
//! pre-populates the current cache generation with the application shell,
//! activation deletes every stale generation, and a newly installed version
//! waits until told to take over. Fetch handling applies
//! network-first-with-timeout to shell resources and cache-first to static
//! assets.

use crate::{
    AppCommand, AssetCacheError, CacheStorage, Destination, FetchOutcome, FetchRequest,
    FetchResponse, ResponseSource, Result, WorkerEvent, BACKGROUND_SYNC_TAG,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};

/// The worker's view of the network.
#[async_trait]
pub trait NetworkFetch: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse>;
}

/// Worker configuration, fixed at registration time.
#[derive(Clone, Debug)]
pub struct AssetCacheConfig {
    /// Versioned cache name; bumped on every deploy so activation cleans
    /// up the previous generation.
    pub cache_version: String,
    /// Application-shell entry points pre-cached at install.
    pub shell_urls: Vec<String>,
    /// URL of the root document, the final fallback for HTML requests.
    pub root_document: String,
    /// Backend host whose responses are never intercepted or cached.
    pub backend_host: String,
    /// Deadline the network race runs against for shell resources.
    pub network_timeout: Duration,
}

impl Default for AssetCacheConfig {
    fn default() -> Self {
        Self {
            cache_version: "recolha-static-v1".to_string(),
            shell_urls: vec![
                "/".to_string(),
                "/index.html".to_string(),
                "/manifest.json".to_string(),
            ],
            root_document: "/".to_string(),
            backend_host: String::new(),
            network_timeout: Duration::from_millis(3000),
        }
    }
}

impl AssetCacheConfig {
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.cache_version = version.into();
        self
    }

    pub fn with_backend_host(mut self, host: impl Into<String>) -> Self {
        self.backend_host = host.into();
        self
    }
}

/// Lifecycle states of the worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    Installing,
    Installed,
    /// Installed while an older generation is still live; waiting for a
    /// skip-waiting command.
    Waiting,
    Activating,
    Activated,
}

/// Intercepts fetches and manages cache generations.
pub struct AssetCacheWorker<N: NetworkFetch> {
    config: AssetCacheConfig,
    state: RwLock<WorkerState>,
    storage: Arc<CacheStorage>,
    network: Arc<N>,
    events: broadcast::Sender<WorkerEvent>,
}

impl<N: NetworkFetch + 'static> AssetCacheWorker<N> {
    pub fn new(config: AssetCacheConfig, storage: Arc<CacheStorage>, network: Arc<N>) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            config,
            state: RwLock::new(WorkerState::Installing),
            storage,
            network,
            events,
        }
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    /// Subscribe to events broadcast to application clients.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkerEvent> {
        self.events.subscribe()
    }

    /// Pre-populate the current generation with the application shell.
    ///
    /// A resource that fails to cache is logged and skipped; installation
    /// itself never fails. When an older generation exists the worker
    /// parks in `Waiting` and announces the update; otherwise it activates
    /// immediately.
    pub async fn install(&self) {
        *self.state.write().await = WorkerState::Installing;
        tracing::info!(version = %self.config.cache_version, "installing asset cache");

        for url in &self.config.shell_urls {
            let request = FetchRequest::document(url.clone());
            match self.network.fetch(&request).await {
                Ok(response) if response.is_success() => {
                    self.storage
                        .put(&self.config.cache_version, url, response)
                        .await;
                }
                Ok(response) => {
                    tracing::warn!(url, status = response.status, "shell resource not cached");
                }
                Err(error) => {
                    tracing::warn!(url, %error, "failed to pre-cache shell resource");
                }
            }
        }

        *self.state.write().await = WorkerState::Installed;

        let has_older_generation = self
            .storage
            .cache_names()
            .await
            .iter()
            .any(|name| name != &self.config.cache_version);

        if has_older_generation {
            *self.state.write().await = WorkerState::Waiting;
            let _ = self.events.send(WorkerEvent::UpdateAvailable {
                version: self.config.cache_version.clone(),
            });
        } else {
            self.activate().await;
        }
    }

    /// Delete every generation but the current one and take over.
    pub async fn activate(&self) {
        *self.state.write().await = WorkerState::Activating;

        for name in self.storage.cache_names().await {
            if name != self.config.cache_version {
                self.storage.delete_cache(&name).await;
                tracing::info!(cache = %name, "deleted stale cache generation");
            }
        }

        *self.state.write().await = WorkerState::Activated;
        tracing::info!(version = %self.config.cache_version, "asset cache activated");
    }

    /// Handle a command from the application.
    pub async fn handle_command(&self, command: AppCommand) {
        match command {
            AppCommand::SkipWaiting => {
                if self.state().await == WorkerState::Waiting {
                    self.activate().await;
                }
            }
        }
    }

    /// Relay a platform sync event to every open client.
    pub fn handle_sync_event(&self, tag: &str) {
        if tag == BACKGROUND_SYNC_TAG {
            let _ = self.events.send(WorkerEvent::BackgroundSync);
        } else {
            tracing::debug!(tag, "ignoring unknown sync tag");
        }
    }

    /// Serve an intercepted request according to its classification.
    pub async fn handle_fetch(&self, request: &FetchRequest) -> Result<FetchOutcome> {
        if !request.method.is_get() || self.is_backend(request) {
            let response = self.network.fetch(request).await?;
            return Ok(FetchOutcome {
                response,
                source: ResponseSource::Network,
            });
        }

        if self.is_shell(request) {
            self.network_first(request).await
        } else {
            self.cache_first(request).await
        }
    }

    fn is_backend(&self, request: &FetchRequest) -> bool {
        !self.config.backend_host.is_empty() && request.host() == Some(&self.config.backend_host)
    }

    fn is_shell(&self, request: &FetchRequest) -> bool {
        matches!(
            request.destination,
            Destination::Document | Destination::Script | Destination::Style
        ) || request.path() == "/"
    }

    /// Race the network against the configured deadline; fall back to the
    /// cache on timeout or failure. The losing network attempt is
    /// abandoned, not cancelled: it keeps running and still refreshes the
    /// cache when it eventually succeeds.
    async fn network_first(&self, request: &FetchRequest) -> Result<FetchOutcome> {
        let network = Arc::clone(&self.network);
        let storage = Arc::clone(&self.storage);
        let cache_version = self.config.cache_version.clone();
        let background_request = request.clone();

        let attempt = tokio::spawn(async move {
            let response = network.fetch(&background_request).await?;
            if response.is_success() {
                storage
                    .put(&cache_version, &background_request.url, response.clone())
                    .await;
            }
            Ok::<FetchResponse, AssetCacheError>(response)
        });

        let won = tokio::select! {
            joined = attempt => match joined {
                Ok(Ok(response)) => Ok(response),
                Ok(Err(error)) => {
                    tracing::debug!(url = %request.url, %error, "network fetch failed");
                    Err(Some(error))
                }
                Err(_) => Err(None),
            },
            _ = tokio::time::sleep(self.config.network_timeout) => {
                tracing::debug!(url = %request.url, "network race timed out");
                Err(None)
            }
        };

        match won {
            Ok(response) => Ok(FetchOutcome {
                response,
                source: ResponseSource::Network,
            }),
            Err(cause) => self.shell_fallback(request, cause).await,
        }
    }

    /// Cached copy, then the cached root document for HTML navigations.
    /// When neither is available the network failure that started the
    /// fallback is surfaced; a plain timeout reports the URL as unavailable.
    async fn shell_fallback(
        &self,
        request: &FetchRequest,
        cause: Option<AssetCacheError>,
    ) -> Result<FetchOutcome> {
        if let Some(response) = self
            .storage
            .lookup(&self.config.cache_version, &request.url)
            .await
        {
            return Ok(FetchOutcome {
                response,
                source: ResponseSource::Cache,
            });
        }

        if request.accepts_html {
            if let Some(response) = self
                .storage
                .lookup(&self.config.cache_version, &self.config.root_document)
                .await
            {
                return Ok(FetchOutcome {
                    response,
                    source: ResponseSource::Cache,
                });
            }
        }

        Err(cause.unwrap_or_else(|| AssetCacheError::Unavailable(request.url.clone())))
    }

    /// Serve from cache when present; otherwise fetch, cache a 200, and
    /// serve the network response.
    async fn cache_first(&self, request: &FetchRequest) -> Result<FetchOutcome> {
        if let Some(response) = self
            .storage
            .lookup(&self.config.cache_version, &request.url)
            .await
        {
            return Ok(FetchOutcome {
                response,
                source: ResponseSource::Cache,
            });
        }

        let response = self.network.fetch(request).await?;
        if response.status == 200 {
            self.storage
                .put(&self.config.cache_version, &request.url, response.clone())
                .await;
        }

        Ok(FetchOutcome {
            response,
            source: ResponseSource::Network,
        })
    }
}
