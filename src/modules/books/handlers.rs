use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use shelf_http::{AppError, JsonBody, RecordId};
use shelf_kernel::Validator;

use super::filters::read_list_query;
use super::models::{validate_book, Book, CreateBook, UpdateBook};
use super::store::{BookStore, StoreError};

/// Shared handler state: the store plus the public path books live under.
#[derive(Clone)]
pub struct BooksState {
    pub store: Arc<dyn BookStore>,
    pub base_path: Arc<str>,
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppError::not_found(),
            StoreError::EditConflict => AppError::edit_conflict(),
            other => AppError::Internal(anyhow::Error::new(other)),
        }
    }
}

fn ensure_valid(book: &Book) -> Result<(), AppError> {
    let mut v = Validator::new();
    validate_book(&mut v, book);
    if v.valid() {
        Ok(())
    } else {
        Err(AppError::validation(v.into_errors()))
    }
}

/// POST /books
pub async fn create_book(
    State(state): State<BooksState>,
    JsonBody(input): JsonBody<CreateBook>,
) -> Result<impl IntoResponse, AppError> {
    let mut book = Book::from(input);
    ensure_valid(&book)?;

    state.store.insert(&mut book).await?;
    tracing::info!(book_id = book.id, "book created");

    let location = format!("{}/{}", state.base_path, book.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(json!({ "book": book })),
    ))
}

/// GET /books/{id}
pub async fn show_book(
    State(state): State<BooksState>,
    RecordId(id): RecordId,
) -> Result<Json<Value>, AppError> {
    let book = state.store.get(id).await?;
    Ok(Json(json!({ "book": book })))
}

/// PATCH /books/{id}
///
/// The record is loaded before the body is looked at, so a missing book is
/// a 404 even when the body is malformed.
pub async fn update_book(
    State(state): State<BooksState>,
    RecordId(id): RecordId,
    body: Result<JsonBody<UpdateBook>, AppError>,
) -> Result<Json<Value>, AppError> {
    let mut book = state.store.get(id).await?;

    let JsonBody(patch) = body?;
    patch.apply(&mut book);
    ensure_valid(&book)?;

    state.store.update(&mut book).await?;
    tracing::info!(book_id = book.id, version = book.version, "book updated");

    Ok(Json(json!({ "book": book })))
}

/// DELETE /books/{id}
pub async fn delete_book(
    State(state): State<BooksState>,
    RecordId(id): RecordId,
) -> Result<Json<Value>, AppError> {
    state.store.delete(id).await?;
    tracing::info!(book_id = id, "book deleted");

    Ok(Json(json!({ "message": "book successfully deleted" })))
}

/// GET /books?title=&genres=&page=&page_size=&sort=
pub async fn list_books(
    State(state): State<BooksState>,
    Query(qs): Query<HashMap<String, String>>,
) -> Result<Json<Value>, AppError> {
    let mut v = Validator::new();
    let Some(list) = read_list_query(&qs, &mut v) else {
        return Err(AppError::validation(v.into_errors()));
    };

    let (books, metadata) = state
        .store
        .get_all(&list.title, &list.genres, &list.filters)
        .await?;

    Ok(Json(json!({ "books": books, "metadata": metadata })))
}
