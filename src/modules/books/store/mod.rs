//! Persistence for books.

mod memory;
mod postgres;

pub use memory::InMemoryBookStore;
pub use postgres::PostgresBookStore;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::filters::{Filters, Metadata};
use super::models::Book;

/// Version assigned to freshly inserted rows.
pub const INITIAL_VERSION: i32 = 1;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("edit conflict")]
    EditConflict,

    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Operations the books handlers need from a backing store.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Persist a new book, filling in `id`, `created_at` and `version`.
    async fn insert(&self, book: &mut Book) -> Result<(), StoreError>;

    /// Fetch one book. Ids below 1 are never found.
    async fn get(&self, id: i64) -> Result<Book, StoreError>;

    /// Write `book` only if the stored version still equals `book.version`,
    /// then bump the version and copy it back into `book`.
    async fn update(&self, book: &mut Book) -> Result<(), StoreError>;

    /// Remove a book for good. Ids below 1 are rejected without a round trip.
    async fn delete(&self, id: i64) -> Result<(), StoreError>;

    /// One page of books matching `title` (full-text) and containing every
    /// genre in `genres`, with the filtered total.
    async fn get_all(
        &self,
        title: &str,
        genres: &[String],
        filters: &Filters,
    ) -> Result<(Vec<Book>, Metadata), StoreError>;
}

/// Bound `operation` by `limit`; on expiry the future is dropped, cancelling it.
pub(crate) async fn with_timeout<T, F>(limit: Duration, operation: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(limit)),
    }
}
