//! Application state shared across handlers.

use kh_core::db::DbPool;
use kh_core::Catalog;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool, used directly by health checks.
    pub db: Arc<DbPool>,
    /// Access-controlled operations over the store.
    pub catalog: Arc<Catalog>,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(db: DbPool) -> Self {
        let catalog = Catalog::new(&db);
        Self {
            db: Arc::new(db),
            catalog: Arc::new(catalog),
        }
    }
}
