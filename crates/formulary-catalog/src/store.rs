//! [`CatalogStore`] -- the process-wide catalog handle.

use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::error::{CatalogError, Result};
use crate::source::{CatalogSource, EmbeddedCatalog};

/// Holds the current catalog and the source it was loaded from.
///
/// Readers take a [`snapshot`](Self::snapshot) and keep using it for the
/// whole request; [`reload`](Self::reload) swaps in a new catalog without
/// touching snapshots already handed out.
pub struct CatalogStore {
    source: Box<dyn CatalogSource>,
    current: ArcSwap<Catalog>,
    /// Serialises reloads.
    reload_lock: Mutex<()>,
}

impl CatalogStore {
    /// Loads the initial catalog from `source`.
    pub fn open(source: impl CatalogSource + 'static) -> Result<Self> {
        let catalog = source.load()?;
        info!(
            source = %source.describe(),
            functions = catalog.len(),
            "catalog loaded"
        );
        Ok(Self {
            source: Box::new(source),
            current: ArcSwap::from_pointee(catalog),
            reload_lock: Mutex::new(()),
        })
    }

    /// Store backed by the bundled catalog.
    pub fn bundled() -> Result<Self> {
        Self::open(EmbeddedCatalog)
    }

    /// The catalog as of now.
    pub fn snapshot(&self) -> Arc<Catalog> {
        self.current.load_full()
    }

    pub fn source(&self) -> String {
        self.source.describe()
    }

    /// Reloads from the source and atomically replaces the current catalog.
    ///
    /// On failure the previous catalog stays in place.
    pub fn reload(&self) -> Result<Arc<Catalog>> {
        let _guard = self
            .reload_lock
            .lock()
            .map_err(|e| CatalogError::Invalid(format!("reload lock poisoned: {e}")))?;

        match self.source.load() {
            Ok(catalog) => {
                let catalog = Arc::new(catalog);
                self.current.store(Arc::clone(&catalog));
                info!(
                    source = %self.source.describe(),
                    functions = catalog.len(),
                    "catalog reloaded"
                );
                Ok(catalog)
            }
            Err(e) => {
                warn!(source = %self.source.describe(), error = %e, "catalog reload failed");
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for CatalogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogStore")
            .field("source", &self.source.describe())
            .field("functions", &self.current.load().len())
            .finish()
    }
}
