//! Shelf application library
//!
//! The book catalog module and the wiring that picks its store.

pub mod modules;

use std::sync::Arc;

use shelf_kernel::settings::{DatabaseSettings, StoreBackend};
use sqlx::PgPool;

pub use modules::*;

use modules::books::store::{BookStore, InMemoryBookStore, PostgresBookStore};

/// A book store plus the pool behind it, if any, so it can be closed on shutdown.
pub struct Storage {
    pub store: Arc<dyn BookStore>,
    pub pool: Option<PgPool>,
}

/// Open the configured backend.
pub async fn open_storage(settings: &DatabaseSettings) -> anyhow::Result<Storage> {
    match settings.backend {
        StoreBackend::Postgres => {
            let pool = shelf_db::connect(settings).await?;
            let store = PostgresBookStore::new(pool.clone(), settings.query_timeout());
            Ok(Storage {
                store: Arc::new(store),
                pool: Some(pool),
            })
        }
        StoreBackend::Memory => {
            tracing::warn!("using in-memory book store; data is lost on exit");
            Ok(Storage {
                store: Arc::new(InMemoryBookStore::new()),
                pool: None,
            })
        }
    }
}
