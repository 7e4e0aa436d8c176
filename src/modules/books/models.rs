use serde::{Deserialize, Serialize};
use shelf_kernel::{validator, Validator};
use time::OffsetDateTime;

use super::pages::Pages;

pub const MAX_TITLE_BYTES: usize = 500;
pub const MAX_GENRES: usize = 5;

/// A catalogued book.
///
/// `id`, `created_at` and `version` are owned by the store and never taken
/// from client input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Book {
    pub id: i64,
    #[serde(skip)]
    pub created_at: Option<OffsetDateTime>,
    pub title: String,
    pub authors: String,
    pub rating: f64,
    #[serde(rename = "ISBN")]
    pub isbn: String,
    #[serde(rename = "ISBN13")]
    pub isbn13: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub language: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,
    pub pages: Pages,
    pub version: i32,
}

/// Request body for creating a book.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateBook {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub authors: String,
    #[serde(default, rename = "ISBN")]
    pub isbn: String,
    #[serde(default, rename = "ISBN13")]
    pub isbn13: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub pages: Pages,
}

impl From<CreateBook> for Book {
    fn from(input: CreateBook) -> Self {
        Self {
            id: 0,
            created_at: None,
            title: input.title,
            authors: input.authors,
            rating: input.rating,
            isbn: input.isbn,
            isbn13: input.isbn13,
            language: input.language,
            genres: input.genres,
            pages: input.pages,
            version: 0,
        }
    }
}

/// Request body for a partial update. `None` means "leave as is"; JSON
/// `null` reads the same as an omitted key.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateBook {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub authors: Option<String>,
    #[serde(default, rename = "ISBN")]
    pub isbn: Option<String>,
    #[serde(default, rename = "ISBN13")]
    pub isbn13: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    /// Replaces the whole genre list when present, even if empty.
    #[serde(default)]
    pub genres: Option<Vec<String>>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub pages: Option<Pages>,
}

impl UpdateBook {
    /// Overwrite every field of `book` that this patch carries.
    pub fn apply(self, book: &mut Book) {
        if let Some(title) = self.title {
            book.title = title;
        }
        if let Some(authors) = self.authors {
            book.authors = authors;
        }
        if let Some(rating) = self.rating {
            book.rating = rating;
        }
        if let Some(isbn) = self.isbn {
            book.isbn = isbn;
        }
        if let Some(isbn13) = self.isbn13 {
            book.isbn13 = isbn13;
        }
        if let Some(language) = self.language {
            book.language = language;
        }
        if let Some(genres) = self.genres {
            book.genres = genres;
        }
        if let Some(pages) = self.pages {
            book.pages = pages;
        }
    }
}

/// Run every book rule against `book`. Each rule is checked on its own, so
/// one field may collect several failures.
pub fn validate_book(v: &mut Validator, book: &Book) {
    v.check(!book.title.is_empty(), "title", "must be provided");
    v.check(
        book.title.len() <= MAX_TITLE_BYTES,
        "title",
        "must not be more than 500 bytes long",
    );

    v.check(!book.authors.is_empty(), "authors", "must be provided");

    v.check(!book.isbn.is_empty(), "ISBN", "must be provided");
    v.check(!book.isbn13.is_empty(), "ISBN13", "must be provided");

    v.check(book.rating != 0.0, "rating", "must be provided");
    v.check(book.rating > 0.0, "rating", "must be greater than 0");
    v.check(book.rating <= 5.0, "rating", "must not be greater than 5");

    v.check(book.pages.get() != 0, "pages", "must be provided");
    v.check(book.pages.get() > 0, "pages", "must be a positive integer");

    v.check(!book.genres.is_empty(), "genres", "must contain at least 1 genre");
    v.check(
        book.genres.len() <= MAX_GENRES,
        "genres",
        "must not contain more than 5 genres",
    );
    v.check(
        validator::unique(&book.genres),
        "genres",
        "must not contain duplicate values",
    );

    v.check(!book.language.is_empty(), "language", "must be provided");
}
