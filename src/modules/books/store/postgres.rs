use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;

use super::{with_timeout, BookStore, StoreError};
use crate::modules::books::filters::{Filters, Metadata, SortOrder};
use crate::modules::books::models::Book;

const INSERT_BOOK: &str = r#"
    INSERT INTO books (title, authors, rating, pages, genres, isbn, isbn13, language)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
    RETURNING id, created_at, version"#;

const SELECT_BOOK: &str = r#"
    SELECT id, created_at, title, authors, rating, pages, genres, isbn, isbn13, language, version
    FROM books
    WHERE id = $1"#;

const UPDATE_BOOK: &str = r#"
    UPDATE books
    SET title = $1, authors = $2, rating = $3, pages = $4, genres = $5,
        isbn = $6, isbn13 = $7, language = $8, version = version + 1
    WHERE id = $9 AND version = $10
    RETURNING version"#;

const DELETE_BOOK: &str = "DELETE FROM books WHERE id = $1";

#[derive(Debug, sqlx::FromRow)]
struct BookRow {
    id: i64,
    created_at: OffsetDateTime,
    title: String,
    authors: String,
    rating: f64,
    pages: i32,
    genres: Vec<String>,
    isbn: String,
    isbn13: String,
    language: String,
    version: i32,
}

impl From<BookRow> for Book {
    fn from(row: BookRow) -> Self {
        Self {
            id: row.id,
            created_at: Some(row.created_at),
            title: row.title,
            authors: row.authors,
            rating: row.rating,
            isbn: row.isbn,
            isbn13: row.isbn13,
            language: row.language,
            genres: row.genres,
            pages: row.pages.into(),
            version: row.version,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ListedBookRow {
    total_records: i64,
    #[sqlx(flatten)]
    book: BookRow,
}

/// Build the list query. The ORDER BY fragment comes only from the
/// resolved [`SortOrder`], never from request text.
fn list_query(sort: SortOrder) -> String {
    format!(
        r#"
    SELECT count(*) OVER() AS total_records,
           id, created_at, title, authors, rating, pages, genres, isbn, isbn13, language, version
    FROM books
    WHERE (to_tsvector('simple', title) @@ plainto_tsquery('simple', $1::text) OR $1::text = '')
      AND (genres @> $2::text[] OR cardinality($2::text[]) = 0)
    ORDER BY {} {}, id ASC
    LIMIT $3 OFFSET $4"#,
        sort.column.as_sql(),
        sort.direction.as_sql()
    )
}

/// Books table in PostgreSQL.
#[derive(Clone)]
pub struct PostgresBookStore {
    pool: PgPool,
    timeout: Duration,
}

impl PostgresBookStore {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[async_trait]
impl BookStore for PostgresBookStore {
    async fn insert(&self, book: &mut Book) -> Result<(), StoreError> {
        let (id, created_at, version) = with_timeout(self.timeout, async {
            sqlx::query_as::<_, (i64, OffsetDateTime, i32)>(INSERT_BOOK)
                .bind(&book.title)
                .bind(&book.authors)
                .bind(book.rating)
                .bind(book.pages.get())
                .bind(book.genres.as_slice())
                .bind(&book.isbn)
                .bind(&book.isbn13)
                .bind(&book.language)
                .fetch_one(&self.pool)
                .await
                .map_err(StoreError::from)
        })
        .await?;

        book.id = id;
        book.created_at = Some(created_at);
        book.version = version;

        tracing::debug!(book_id = id, "book inserted");
        Ok(())
    }

    async fn get(&self, id: i64) -> Result<Book, StoreError> {
        if id < 1 {
            return Err(StoreError::NotFound);
        }

        let row = with_timeout(self.timeout, async {
            sqlx::query_as::<_, BookRow>(SELECT_BOOK)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(StoreError::from)
        })
        .await?;

        row.map(Book::from).ok_or(StoreError::NotFound)
    }

    async fn update(&self, book: &mut Book) -> Result<(), StoreError> {
        let new_version = with_timeout(self.timeout, async {
            sqlx::query_scalar::<_, i32>(UPDATE_BOOK)
                .bind(&book.title)
                .bind(&book.authors)
                .bind(book.rating)
                .bind(book.pages.get())
                .bind(book.genres.as_slice())
                .bind(&book.isbn)
                .bind(&book.isbn13)
                .bind(&book.language)
                .bind(book.id)
                .bind(book.version)
                .fetch_optional(&self.pool)
                .await
                .map_err(StoreError::from)
        })
        .await?;

        // No row back means the version moved on or the row is gone.
        let Some(version) = new_version else {
            tracing::debug!(book_id = book.id, version = book.version, "update lost version check");
            return Err(StoreError::EditConflict);
        };

        book.version = version;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        if id < 1 {
            return Err(StoreError::NotFound);
        }

        let result = with_timeout(self.timeout, async {
            sqlx::query(DELETE_BOOK)
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(StoreError::from)
        })
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn get_all(
        &self,
        title: &str,
        genres: &[String],
        filters: &Filters,
    ) -> Result<(Vec<Book>, Metadata), StoreError> {
        let query = list_query(filters.sort);

        let rows = with_timeout(self.timeout, async {
            sqlx::query_as::<_, ListedBookRow>(&query)
                .bind(title)
                .bind(genres)
                .bind(filters.limit())
                .bind(filters.offset())
                .fetch_all(&self.pool)
                .await
                .map_err(StoreError::from)
        })
        .await?;

        let total_records = rows.first().map_or(0, |row| row.total_records);
        let books = rows.into_iter().map(|row| Book::from(row.book)).collect();

        Ok((
            books,
            Metadata::calculate(total_records, filters.page, filters.page_size),
        ))
    }
}
