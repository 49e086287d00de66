use std::fmt;

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use tracing::{debug, info, warn};

use super::{AssetError, AssetResponse, CacheStorage, Fetcher};

/// Prefix shared by every asset cache version this application creates.
pub const DEFAULT_CACHE_PREFIX: &str = "powercalc-assets-";

/// Everything the application needs to run offline.
pub const DEFAULT_ASSETS: [&str; 8] = [
    "/",
    "/styles.css",
    "/app.js",
    "/manifest.json",
    "/icons/icon-192.png",
    "/icons/icon-512.png",
    "/icons/apple-touch-icon.png",
    "/favicon.png",
];

/// Lifecycle of the newest asset cache version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninstalled,
    Installing,
    /// Populated and waiting for activation
    Installed,
    Active,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LifecycleState::Uninstalled => "uninstalled",
            LifecycleState::Installing => "installing",
            LifecycleState::Installed => "installed",
            LifecycleState::Active => "active",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    pub version: String,
    pub cached: usize,
}

/// A version left active by a previous run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restoration {
    pub version: String,
    pub cached_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    pub version: String,
    pub purged: Vec<String>,
    pub cached_at: Option<DateTime<Utc>>,
}

/// Where a fetched asset came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServedFrom {
    Cache,
    Network,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    pub from: ServedFrom,
    pub response: AssetResponse,
}

/// Versioned offline cache of the application's static assets.
///
/// Lifecycle methods take `&mut self`, so the host can never run two of them
/// at once on the same manager.
pub struct AssetCacheManager<S, F> {
    store: S,
    fetcher: F,
    prefix: String,
    assets: Vec<String>,
    state: LifecycleState,
    /// Version currently answering fetches
    active_version: Option<String>,
    /// Version installed and waiting for activation
    pending_version: Option<String>,
    last_stamp: i64,
}

impl<S: CacheStorage, F: Fetcher> AssetCacheManager<S, F> {
    pub fn new(store: S, fetcher: F) -> Self {
        Self::with_assets(
            store,
            fetcher,
            DEFAULT_CACHE_PREFIX,
            DEFAULT_ASSETS.iter().map(|a| a.to_string()).collect(),
        )
    }

    pub fn with_assets(store: S, fetcher: F, prefix: &str, assets: Vec<String>) -> Self {
        Self {
            store,
            fetcher,
            prefix: prefix.to_string(),
            assets,
            state: LifecycleState::Uninstalled,
            active_version: None,
            pending_version: None,
            last_stamp: 0,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn active_version(&self) -> Option<&str> {
        self.active_version.as_deref()
    }

    pub fn pending_version(&self) -> Option<&str> {
        self.pending_version.as_deref()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Resume serving from the cache a previous run activated.
    ///
    /// Only the version recorded by `activate` is resumed. Versions that were
    /// installed but never activated stay dormant until the next activation
    /// purges them. Only meaningful before the first install; later calls
    /// are rejected.
    pub async fn restore(&mut self) -> Result<Option<Restoration>, AssetError> {
        if self.state != LifecycleState::Uninstalled {
            return Err(AssetError::InvalidTransition {
                state: self.state,
                event: "restore",
            });
        }

        let names = self.store.cache_names().await?;

        // New installs must be named past anything already on disk
        for name in names.iter().filter(|name| name.starts_with(&self.prefix)) {
            self.last_stamp = self.last_stamp.max(self.stamp_of(name));
        }

        let version = match self.store.active().await? {
            Some(version) if version.starts_with(&self.prefix) && names.contains(&version) => {
                version
            }
            Some(version) => {
                warn!(%version, "Recorded asset cache is missing");
                return Ok(None);
            }
            None => {
                debug!("No previous asset cache to restore");
                return Ok(None);
            }
        };

        self.active_version = Some(version.clone());
        self.state = LifecycleState::Active;
        info!(%version, "Restored asset cache");

        Ok(Some(Restoration {
            cached_at: self.active_since().await,
            version,
        }))
    }

    /// Populate a freshly named cache with the asset list.
    ///
    /// A version still waiting for activation is superseded. Every asset is
    /// fetched before anything is written, so a failed fetch leaves the store
    /// untouched and the manager in its previous state.
    pub async fn install(&mut self) -> Result<Installation, AssetError> {
        let previous = self.state;
        self.state = LifecycleState::Installing;

        let version = self.next_version();
        info!(%version, "Installing asset cache");

        match self.populate(&version).await {
            Ok(cached) => {
                if let Some(superseded) = self.pending_version.replace(version.clone()) {
                    info!(%superseded, "Superseded version awaiting activation");
                }
                self.state = LifecycleState::Installed;
                info!(%version, cached, "Asset cache installed");
                Ok(Installation { version, cached })
            }
            Err(e) => {
                self.state = previous;
                warn!(%version, error = %e, "Asset cache install failed");
                Err(e)
            }
        }
    }

    /// Make the installed version current and delete every other version.
    ///
    /// Caches without this application's prefix are left alone. The new
    /// version starts answering fetches immediately.
    pub async fn activate(&mut self) -> Result<Activation, AssetError> {
        let version = match (&self.state, &self.pending_version) {
            (LifecycleState::Installed, Some(version)) => version.clone(),
            _ => {
                return Err(AssetError::InvalidTransition {
                    state: self.state,
                    event: "activate",
                })
            }
        };

        // Recorded before purging, so an interrupted purge still restarts
        // on this version
        self.store.set_active(&version).await?;

        let mut purged = Vec::new();
        for name in self.store.cache_names().await? {
            if name.starts_with(&self.prefix) && name != version {
                if self.store.delete(&name).await? {
                    debug!(cache = %name, "Purged stale asset cache");
                    purged.push(name);
                }
            }
        }

        self.pending_version = None;
        self.active_version = Some(version.clone());
        self.state = LifecycleState::Active;
        info!(%version, purged = purged.len(), "Asset cache activated");

        Ok(Activation {
            cached_at: self.active_since().await,
            version,
            purged,
        })
    }

    /// Answer a request: cached entry first, otherwise the network.
    ///
    /// Network responses are returned untouched and never written back.
    pub async fn fetch(&self, path: &str) -> Result<Served, AssetError> {
        if let Some(ref version) = self.active_version {
            if let Some(hit) = self.store.lookup(version, path).await? {
                debug!(path, %version, "Served from cache");
                return Ok(Served {
                    from: ServedFrom::Cache,
                    response: hit.data,
                });
            }
        }

        let response = self.fetcher.fetch(path).await?;
        Ok(Served {
            from: ServedFrom::Network,
            response,
        })
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// When the active version cached its first asset.
    async fn active_since(&self) -> Option<DateTime<Utc>> {
        let version = self.active_version.as_deref()?;
        let first = self.assets.iter().find(|a| !a.trim().is_empty())?;
        match self.store.lookup(version, first).await {
            Ok(Some(cached)) => Some(cached.cached_at),
            Ok(None) => None,
            Err(e) => {
                debug!(error = %e, "Failed to load cache for age display");
                None
            }
        }
    }

    async fn populate(&self, version: &str) -> Result<usize, AssetError> {
        let paths: Vec<&str> = self
            .assets
            .iter()
            .map(String::as_str)
            .filter(|path| !path.trim().is_empty())
            .collect();

        let fetches = paths.iter().map(|&path| async move {
            let response = self.fetcher.fetch(path).await?;
            if !response.is_success() {
                return Err(AssetError::from_status(path, response.status));
            }
            Ok::<_, AssetError>((path, response))
        });
        let responses = try_join_all(fetches).await?;

        self.store.open(version).await?;
        for (path, response) in responses {
            if let Err(e) = self.store.put(version, path, response).await {
                // Never leave a partly written version behind
                if let Err(cleanup) = self.store.delete(version).await {
                    warn!(%version, error = %cleanup, "Failed to remove partial asset cache");
                }
                return Err(e);
            }
        }
        Ok(paths.len())
    }

    /// Next version name. Strictly increasing even within one millisecond.
    fn next_version(&mut self) -> String {
        let now = Utc::now().timestamp_millis();
        let stamp = if now > self.last_stamp {
            now
        } else {
            self.last_stamp + 1
        };
        self.last_stamp = stamp;
        format!("{}{}", self.prefix, stamp)
    }

    fn stamp_of(&self, version: &str) -> i64 {
        version
            .strip_prefix(&self.prefix)
            .and_then(|rest| rest.parse().ok())
            .unwrap_or(0)
    }
}

// ============================================================================
// Tests
// ============================================================================
