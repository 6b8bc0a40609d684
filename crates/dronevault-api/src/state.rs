//! API application state and health tracking.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use dronevault_config::{StatusPolicy, ViewerConfig};
use dronevault_core::{AssetCatalog, AssetId};
use dronevault_fsops::{ConversionWorker, PathGuard, ViewerTarget};
use dronevault_telemetry::Metrics;
use tracing::{info, warn};

pub(crate) struct ApiState {
    pub(crate) catalog: Arc<dyn AssetCatalog>,
    pub(crate) worker: ConversionWorker,
    pub(crate) guard: PathGuard,
    pub(crate) viewer: ViewerConfig,
    pub(crate) viewer_root: PathBuf,
    pub(crate) status_policy: StatusPolicy,
    pub(crate) telemetry: Metrics,
    health_status: Mutex<Vec<String>>,
}

impl ApiState {
    pub(crate) fn new(
        catalog: Arc<dyn AssetCatalog>,
        worker: ConversionWorker,
        guard: PathGuard,
        viewer: ViewerConfig,
        viewer_root: PathBuf,
        status_policy: StatusPolicy,
        telemetry: Metrics,
    ) -> Self {
        Self {
            catalog,
            worker,
            guard,
            viewer,
            viewer_root,
            status_policy,
            telemetry,
            health_status: Mutex::new(Vec::new()),
        }
    }

    /// Output location and public URL for converting `asset`.
    pub(crate) fn viewer_target(&self, asset: AssetId) -> ViewerTarget {
        ViewerTarget::for_asset(
            self.viewer.layout,
            &self.viewer_root,
            &self.viewer.url_prefix,
            asset,
        )
    }

    pub(crate) fn viewer_root(&self) -> &Path {
        &self.viewer_root
    }

    pub(crate) fn add_degraded_component(&self, component: &str) -> bool {
        let mut guard = Self::lock_guard(&self.health_status);
        if guard.iter().any(|entry| entry == component) {
            return false;
        }
        guard.push(component.to_string());
        guard.sort();
        drop(guard);
        warn!(component, "component degraded");
        true
    }

    pub(crate) fn remove_degraded_component(&self, component: &str) -> bool {
        let mut guard = Self::lock_guard(&self.health_status);
        let previous = guard.len();
        guard.retain(|entry| entry != component);
        if guard.len() == previous {
            return false;
        }
        drop(guard);
        info!(component, "component recovered");
        true
    }

    pub(crate) fn set_component_degraded(&self, component: &str, degraded: bool) {
        if degraded {
            self.add_degraded_component(component);
        } else {
            self.remove_degraded_component(component);
        }
    }

    pub(crate) fn current_health_degraded(&self) -> Vec<String> {
        Self::lock_guard(&self.health_status).clone()
    }

    fn lock_guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(|poisoned| {
            warn!("health status lock poisoned; continuing with recovered guard");
            poisoned.into_inner()
        })
    }
}
