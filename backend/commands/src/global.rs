//! Process-wide registry with an explicit lifecycle.
//!
//! The registry is installed once and then shared as an `Arc<Registry>`.
//! Extension merges replace the shared `Arc` copy-on-write, so callers
//! holding an earlier snapshot keep reading it unchanged.

use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use tracing::info;

use crate::error::RegistryError;
use crate::registry::{MergeSummary, Registry};

static REGISTRY: Lazy<RwLock<Option<Arc<Registry>>>> = Lazy::new(|| RwLock::new(None));

/// Tests touching the process-wide registry hold this lock.
#[cfg(test)]
pub(crate) static TEST_SERIAL: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Install `registry` as the process-wide registry.
pub fn init(registry: Registry) -> Result<Arc<Registry>, RegistryError> {
    let mut slot = REGISTRY.write().unwrap_or_else(|e| e.into_inner());
    if slot.is_some() {
        return Err(RegistryError::AlreadyInitialized);
    }
    let shared = Arc::new(registry);
    info!(
        "[Registry] Initialized with {} templates ({} handlers)",
        shared.len(),
        shared.handler_count()
    );
    *slot = Some(Arc::clone(&shared));
    Ok(shared)
}

/// The installed registry, building it with `load` on first use. `load` runs
/// at most once per successful initialization; a failed load leaves the
/// registry uninitialized.
pub fn get_or_try_init<F, E>(load: F) -> Result<Arc<Registry>, E>
where
    F: FnOnce() -> Result<Registry, E>,
{
    if let Some(existing) = get() {
        return Ok(existing);
    }
    let mut slot = REGISTRY.write().unwrap_or_else(|e| e.into_inner());
    if let Some(existing) = slot.as_ref() {
        return Ok(Arc::clone(existing));
    }
    let shared = Arc::new(load()?);
    *slot = Some(Arc::clone(&shared));
    Ok(shared)
}

pub fn get() -> Option<Arc<Registry>> {
    REGISTRY
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .as_ref()
        .map(Arc::clone)
}

pub fn is_initialized() -> bool {
    get().is_some()
}

/// Merge an extension registry into the installed one.
pub fn merge(extension: Registry) -> Result<MergeSummary, RegistryError> {
    let mut slot = REGISTRY.write().unwrap_or_else(|e| e.into_inner());
    let current = slot.as_mut().ok_or(RegistryError::Uninitialized)?;
    let mut next = Registry::clone(current);
    let summary = next.merge(extension)?;
    *current = Arc::new(next);
    Ok(summary)
}

/// Drop the installed registry so tests can start from scratch.
pub fn reset_for_tests() {
    *REGISTRY.write().unwrap_or_else(|e| e.into_inner()) = None;
}
