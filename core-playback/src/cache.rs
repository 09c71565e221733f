//! # Asset Cache
//!
//! Memoizes engine asset handles by source URL so the same URL is prepared
//! once, and lets the player prepare the upcoming item while the current one
//! plays.
//!
//! Preparation is asynchronous and may fail after a handle was cached, so the
//! failure status of a handle is re-derived on every lookup instead of being
//! recorded at insertion time.

use bridge_traits::{AssetKey, MediaAsset, MediaEngine};
use core_runtime::logging::loggable_source;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// URL → prepared asset handle.
pub struct AssetCache {
    engine: Arc<dyn MediaEngine>,
    assets: Mutex<HashMap<String, Arc<dyn MediaAsset>>>,
}

impl AssetCache {
    pub fn new(engine: Arc<dyn MediaEngine>) -> Self {
        Self {
            engine,
            assets: Mutex::new(HashMap::new()),
        }
    }

    /// Cached handle for `url`, or a freshly prepared one.
    ///
    /// A cached handle that has failed in the meantime is replaced. Returns
    /// immediately; readiness is reported later by the asset itself.
    pub fn resolve(&self, url: &str) -> Arc<dyn MediaAsset> {
        let mut assets = self.assets.lock();
        if let Some(asset) = assets.get(url) {
            if !asset_has_failed(asset.as_ref()) {
                debug!(url = loggable_source(url), "Asset cache hit");
                return Arc::clone(asset);
            }
            debug!(url = loggable_source(url), "Cached asset failed, preparing again");
        }

        let asset = self.engine.prepare(url);
        assets.insert(url.to_string(), Arc::clone(&asset));
        asset
    }

    /// Resolve `url` and wait until its required keys settled.
    ///
    /// Returns `None` (and drops the entry) when a key failed to load.
    pub async fn prepare(&self, url: &str) -> Option<Arc<dyn MediaAsset>> {
        let asset = self.resolve(url);
        asset.load_values(&AssetKey::REQUIRED).await;

        if required_keys_loaded(asset.as_ref()) {
            return Some(asset);
        }

        warn!(url = loggable_source(url), "Asset preparation failed");
        self.invalidate_if_same(url, &asset);
        None
    }

    /// Fire-and-forget [`prepare`](Self::prepare). The handle may be dropped.
    pub fn preload(self: &Arc<Self>, url: &str) -> JoinHandle<Option<Arc<dyn MediaAsset>>> {
        let cache = Arc::clone(self);
        let url = url.to_string();
        tokio::spawn(async move { cache.prepare(&url).await })
    }

    pub fn invalidate(&self, url: &str) {
        if self.assets.lock().remove(url).is_some() {
            debug!(url = loggable_source(url), "Asset invalidated");
        }
    }

    /// Keep only the entries whose URL is in `urls`.
    pub fn retain_only<'a>(&self, urls: impl IntoIterator<Item = &'a str>) {
        let keep: HashSet<&str> = urls.into_iter().collect();
        let mut assets = self.assets.lock();
        let before = assets.len();
        assets.retain(|url, _| keep.contains(url.as_str()));
        if assets.len() != before {
            debug!(removed = before - assets.len(), "Dropped unreachable assets");
        }
    }

    pub fn clear(&self) {
        self.assets.lock().clear();
    }

    pub fn contains(&self, url: &str) -> bool {
        self.assets.lock().contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.assets.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.lock().is_empty()
    }

    /// Remove `url` only while it still maps to `asset`, so a newer handle
    /// prepared concurrently survives.
    fn invalidate_if_same(&self, url: &str, asset: &Arc<dyn MediaAsset>) {
        let mut assets = self.assets.lock();
        if assets.get(url).is_some_and(|current| same_asset(current, asset)) {
            assets.remove(url);
        }
    }
}

impl std::fmt::Debug for AssetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetCache")
            .field("len", &self.len())
            .finish()
    }
}

fn same_asset(a: &Arc<dyn MediaAsset>, b: &Arc<dyn MediaAsset>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// Any required key failed or was cancelled, or the asset carries an error.
fn asset_has_failed(asset: &dyn MediaAsset) -> bool {
    asset.error().is_some()
        || AssetKey::REQUIRED
            .iter()
            .any(|key| asset.status_of(*key).is_terminal_failure())
}

fn required_keys_loaded(asset: &dyn MediaAsset) -> bool {
    asset.error().is_none()
        && AssetKey::REQUIRED
            .iter()
            .all(|key| asset.status_of(*key) == bridge_traits::AssetKeyStatus::Loaded)
}
