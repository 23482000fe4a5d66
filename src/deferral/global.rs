use std::sync::{Arc, OnceLock};

use crate::deferral::{
    error::{DeferralError, already_installed, not_installed},
    registry::DeferralRegistry,
};

static GLOBAL_REGISTRY: OnceLock<Arc<DeferralRegistry>> = OnceLock::new();

/// Installs the process-wide registry. Only the first call succeeds.
pub fn install_global_registry(registry: Arc<DeferralRegistry>) -> Result<(), DeferralError> {
    GLOBAL_REGISTRY
        .set(registry)
        .map_err(|_| already_installed("process-wide deferral registry is already installed"))?;
    tracing::debug!(target: "deferral", "deferral_global_registry_installed");
    Ok(())
}

pub fn global_registry() -> Result<Arc<DeferralRegistry>, DeferralError> {
    GLOBAL_REGISTRY
        .get()
        .map(Arc::clone)
        .ok_or_else(|| not_installed("process-wide deferral registry is not installed"))
}
