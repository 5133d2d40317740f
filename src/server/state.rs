//! Shared application state handed to every handler

use log::warn;
use std::sync::{Arc, Mutex};

use crate::auth::{Authorizer, CapabilityAuthorizer, CredentialStore};
use crate::backup::{BackupStore, Clock, SystemClock};
use crate::catalog::{CatalogStore, MemoryCatalog};
use crate::config::{SharedRuntimeConfig, StartupConfig};
use crate::ledger::{JsonFileStore, KeyValueStore};
use crate::middleware::RateLimiter;
use crate::templates::{TemplateService, TemplateSettings};

/// Static facts reported by the system info endpoint
#[derive(Debug, Clone)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub namespace: String,
    pub active_theme: Option<String>,
    pub theme_count: usize,
    pub require_secure_transport: bool,
    /// Seconds since the Unix epoch
    pub started_at: i64,
}

#[derive(Clone)]
pub struct AppState {
    pub templates: Arc<TemplateService>,
    pub backups: Arc<BackupStore>,
    pub catalog: Option<Arc<dyn CatalogStore>>,
    pub credentials: Arc<CredentialStore>,
    pub authorizer: Arc<dyn Authorizer>,
    pub rate_limiter: Arc<Mutex<RateLimiter>>,
    pub runtime: SharedRuntimeConfig,
    pub info: Arc<ServiceInfo>,
}

impl AppState {
    /// Wires production components from configuration. Nothing touches the
    /// filesystem until the first request.
    pub fn from_config(
        startup: &StartupConfig,
        runtime: SharedRuntimeConfig,
    ) -> Result<Self, regex::Error> {
        let ledger: Arc<dyn KeyValueStore> =
            Arc::new(JsonFileStore::new(startup.ledger_file_path()));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let backups = Arc::new(BackupStore::with_clock(
            startup.backup_root_path(),
            ledger,
            clock.clone(),
        ));

        let settings = TemplateSettings::from_config(startup)?;
        let templates = Arc::new(TemplateService::new(settings, Arc::clone(&backups)));

        let catalog: Option<Arc<dyn CatalogStore>> = if startup.catalog_enabled {
            Some(Arc::new(MemoryCatalog::new()))
        } else {
            None
        };

        let credentials = CredentialStore::from_config(&startup.api_keys);
        if credentials.is_empty() {
            warn!("No API keys configured; every request will be rejected");
        }

        let info = ServiceInfo {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            namespace: startup.api_namespace.clone(),
            active_theme: startup.theme_roots.first().map(|r| r.name.clone()),
            theme_count: startup.theme_roots.len(),
            require_secure_transport: startup.require_secure_transport,
            started_at: clock.now(),
        };

        Ok(Self {
            templates,
            backups,
            catalog,
            credentials: Arc::new(credentials),
            authorizer: Arc::new(CapabilityAuthorizer),
            rate_limiter: Arc::new(Mutex::new(RateLimiter::default())),
            runtime,
            info: Arc::new(info),
        })
    }

    /// Replaces the catalog backend, enabling the bulk endpoint
    pub fn with_catalog(mut self, catalog: Arc<dyn CatalogStore>) -> Self {
        self.catalog = Some(catalog);
        self
    }
}
