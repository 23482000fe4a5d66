use crate::{
    config::{DeferralConfig, DeferralConfigPatch},
    deferral::{
        error::DeferralError,
        types::{DeferralKey, Deferred},
    },
};

/// Object-safe surface of a deferral registry, for components that hold an
/// `Arc<dyn DeferralRegistryPort<T>>` instead of a concrete registry.
pub trait DeferralRegistryPort<T>: Send + Sync {
    fn create(&self, key: &str, force_recreate: bool) -> Deferred<T>;

    fn wait_for(&self, key: &str) -> Deferred<T>;

    fn list(&self) -> Vec<DeferralKey>;

    fn resolve_with(&self, key: &str, value: Option<T>) -> bool;

    fn reject_with(&self, key: &str, error: DeferralError) -> bool;

    fn set_config(&self, patch: DeferralConfigPatch);

    fn config(&self) -> DeferralConfig;
}
