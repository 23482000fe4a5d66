use std::{
    collections::BTreeMap,
    fmt,
    path::Path,
    sync::{Mutex, MutexGuard, PoisonError},
};

use anyhow::{Context, Result};
use serde_json::Value;

use crate::{
    config::{Config, DeferralConfig, DeferralConfigPatch},
    deferral::{
        error::DeferralError,
        ports::DeferralRegistryPort,
        types::{DeferralKey, DeferralSnapshot, Deferred, Settler},
    },
};

struct PendingDeferral<T> {
    future: Deferred<T>,
    settler: Settler<T>,
}

struct RegistryState<T> {
    version: u64,
    config: DeferralConfig,
    by_key: BTreeMap<DeferralKey, PendingDeferral<T>>,
}

/// Named, externally-settleable futures.
///
/// A key maps to at most one pending deferral. Settling a key removes it from
/// the map before any holder is woken, so the first `resolve`/`reject` wins
/// and later ones are no-ops until the key is created again.
pub struct DeferralRegistry<T = Value> {
    state: Mutex<RegistryState<T>>,
}

impl<T> DeferralRegistry<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::with_config(DeferralConfig::default())
    }

    pub fn with_config(config: DeferralConfig) -> Self {
        Self {
            state: Mutex::new(RegistryState {
                version: 0,
                config,
                by_key: BTreeMap::new(),
            }),
        }
    }

    /// Registry seeded from the `deferrals` section of a JSONC config file.
    pub fn from_config_file(config_path: &Path) -> Result<Self> {
        let config = Config::load(config_path).with_context(|| {
            format!(
                "failed to load deferral config from {}",
                config_path.display()
            )
        })?;
        tracing::debug!(
            target: "deferral",
            path = %config_path.display(),
            wait_for_undefined = config.deferrals.wait_for_undefined,
            recreate_on_make = config.deferrals.recreate_on_make,
            "deferral_config_loaded"
        );
        Ok(Self::with_config(config.deferrals))
    }

    /// Shorthand for `create(key, false)`.
    pub fn make(&self, key: &str) -> Deferred<T> {
        self.create(key, false)
    }

    /// Stores a fresh pending deferral under `key` and returns it.
    ///
    /// An existing entry is always replaced. `force_recreate` and
    /// `recreate_on_make` are accepted but do not change that. Holders of a
    /// replaced future observe an `Abandoned` error rather than staying
    /// pending forever; use [`get_or_create`](Self::get_or_create) to join an
    /// existing deferral instead.
    pub fn create(&self, key: &str, force_recreate: bool) -> Deferred<T> {
        let mut guard = self.lock();
        let forced = force_recreate || guard.config.recreate_on_make;
        let (future, superseded) = insert_pending(&mut guard, key, forced);
        drop(guard);

        drop(superseded);
        future
    }

    /// Returns the pending deferral for `key`, creating it only when absent.
    pub fn get_or_create(&self, key: &str) -> Deferred<T> {
        let mut guard = self.lock();
        if let Some(existing) = guard.by_key.get(key) {
            tracing::debug!(target: "deferral", key = %key, "deferral_reused");
            return existing.future.clone();
        }

        let (future, _) = insert_pending(&mut guard, key, false);
        future
    }

    /// Future for `key`. A missing key yields an already-resolved empty
    /// outcome unless `wait_for_undefined` is set, in which case the key is
    /// created and its pending future returned.
    pub fn wait_for(&self, key: &str) -> Deferred<T> {
        let mut guard = self.lock();
        if let Some(existing) = guard.by_key.get(key) {
            return existing.future.clone();
        }

        if !guard.config.wait_for_undefined {
            tracing::trace!(target: "deferral", key = %key, "deferral_wait_missing");
            return Deferred::settled_empty();
        }

        let (future, _) = insert_pending(&mut guard, key, false);
        future
    }

    /// Pending keys in sorted order, as of the call.
    pub fn list(&self) -> Vec<DeferralKey> {
        self.lock().by_key.keys().cloned().collect()
    }

    pub fn snapshot(&self) -> DeferralSnapshot {
        let guard = self.lock();
        DeferralSnapshot {
            version: guard.version,
            keys: guard.by_key.keys().cloned().collect(),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().by_key.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().by_key.is_empty()
    }

    /// Settles `key` with `value`. Returns `false` when nothing was pending.
    pub fn resolve(&self, key: &str, value: impl Into<Option<T>>) -> bool {
        let Some(pending) = self.take(key) else {
            return false;
        };
        pending.settler.resolve(value.into());
        true
    }

    /// Fails `key` with `error`. Returns `false` when nothing was pending.
    ///
    /// The registry does not observe the failure itself: every holder gets the
    /// `Err` outcome, and a holder that drops it without inspection loses it.
    pub fn reject(&self, key: &str, error: impl Into<DeferralError>) -> bool {
        let Some(pending) = self.take(key) else {
            return false;
        };
        pending.settler.reject(error.into());
        true
    }

    /// Drops every pending deferral; their holders observe `Abandoned`.
    pub fn clear(&self) -> usize {
        let mut guard = self.lock();
        let drained = std::mem::take(&mut guard.by_key);
        if !drained.is_empty() {
            guard.version = guard.version.saturating_add(1);
        }
        let version = guard.version;
        drop(guard);

        let cleared = drained.len();
        drop(drained);
        tracing::debug!(target: "deferral", cleared, version, "deferral_registry_cleared");
        cleared
    }

    pub fn set_config(&self, patch: DeferralConfigPatch) {
        let mut guard = self.lock();
        guard.config.apply(patch);
        tracing::debug!(
            target: "deferral",
            wait_for_undefined = guard.config.wait_for_undefined,
            recreate_on_make = guard.config.recreate_on_make,
            "deferral_config_updated"
        );
    }

    pub fn config(&self) -> DeferralConfig {
        self.lock().config
    }

    fn take(&self, key: &str) -> Option<PendingDeferral<T>> {
        let mut guard = self.lock();
        let removed = guard.by_key.remove(key);
        match removed {
            Some(_) => {
                guard.version = guard.version.saturating_add(1);
                tracing::debug!(target: "deferral", key = %key, version = guard.version, "deferral_settled");
            }
            None => {
                tracing::trace!(target: "deferral", key = %key, "deferral_settle_missing");
            }
        }
        removed
    }

    // Every mutation leaves the map consistent, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, RegistryState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn insert_pending<T>(
    state: &mut RegistryState<T>,
    key: &str,
    forced: bool,
) -> (Deferred<T>, Option<PendingDeferral<T>>)
where
    T: Clone + Send + Sync + 'static,
{
    let (settler, future) = Deferred::channel();
    let superseded = state.by_key.insert(
        key.to_string(),
        PendingDeferral {
            future: future.clone(),
            settler,
        },
    );
    state.version = state.version.saturating_add(1);

    if superseded.is_some() {
        tracing::debug!(target: "deferral", key = %key, forced, version = state.version, "deferral_superseded");
    } else {
        tracing::debug!(target: "deferral", key = %key, version = state.version, "deferral_created");
    }

    (future, superseded)
}

impl<T> fmt::Debug for DeferralRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("DeferralRegistry")
            .field("version", &guard.version)
            .field("config", &guard.config)
            .field("pending", &guard.by_key.len())
            .finish_non_exhaustive()
    }
}

impl<T> Default for DeferralRegistry<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DeferralRegistryPort<T> for DeferralRegistry<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn create(&self, key: &str, force_recreate: bool) -> Deferred<T> {
        DeferralRegistry::create(self, key, force_recreate)
    }

    fn wait_for(&self, key: &str) -> Deferred<T> {
        DeferralRegistry::wait_for(self, key)
    }

    fn list(&self) -> Vec<DeferralKey> {
        DeferralRegistry::list(self)
    }

    fn resolve_with(&self, key: &str, value: Option<T>) -> bool {
        self.resolve(key, value)
    }

    fn reject_with(&self, key: &str, error: DeferralError) -> bool {
        self.reject(key, error)
    }

    fn set_config(&self, patch: DeferralConfigPatch) {
        DeferralRegistry::set_config(self, patch)
    }

    fn config(&self) -> DeferralConfig {
        DeferralRegistry::config(self)
    }
}
