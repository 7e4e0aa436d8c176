pub mod filters;
pub mod handlers;
pub mod models;
pub mod pages;
pub mod store;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{routing::get, Router};
use serde_json::json;
use shelf_kernel::{InitCtx, Module};

use handlers::BooksState;
use store::BookStore;

/// Book catalog: CRUD with optimistic locking plus a searchable listing.
pub struct BooksModule {
    state: BooksState,
}

impl BooksModule {
    /// `api_prefix` is only used to build `Location` headers; mounting is
    /// the router's job.
    pub fn new(store: Arc<dyn BookStore>, api_prefix: &str) -> Self {
        let base_path = format!("{}/books", api_prefix.trim_end_matches('/'));
        Self {
            state: BooksState {
                store,
                base_path: base_path.into(),
            },
        }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            backend = ?ctx.settings.database.backend,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", get(handlers::list_books).post(handlers::create_book))
            .route(
                "/{id}",
                get(handlers::show_book)
                    .patch(handlers::update_book)
                    .delete(handlers::delete_book),
            )
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi_fragment())
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

fn json_content(schema: serde_json::Value) -> serde_json::Value {
    json!({ "content": { "application/json": { "schema": schema } } })
}

fn response(description: &str, schema_ref: &str) -> serde_json::Value {
    let mut body = json_content(json!({ "$ref": format!("#/components/schemas/{}", schema_ref) }));
    body["description"] = json!(description);
    body
}

fn book_input() -> serde_json::Value {
    json_content(json!({ "$ref": "#/components/schemas/BookInput" }))
}

fn id_parameter() -> serde_json::Value {
    json!({
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "integer", "format": "int64", "minimum": 1 }
    })
}

fn openapi_fragment() -> serde_json::Value {
    let not_found = response("Book not found", "ErrorResponse");
    let bad_request = response("Malformed request body", "ErrorResponse");
    let invalid = response("Validation failed", "ValidationErrorResponse");
    let internal = response("Internal server error", "ErrorResponse");

    let query_param = |name: &str, schema: serde_json::Value| {
        json!({ "name": name, "in": "query", "required": false, "schema": schema })
    };

    json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "List books",
                    "tags": ["Books"],
                    "parameters": [
                        query_param("title", json!({ "type": "string" })),
                        query_param("genres", json!({
                            "type": "string",
                            "description": "Comma separated; every genre must be present"
                        })),
                        query_param("page", json!({
                            "type": "integer", "minimum": 1, "maximum": 10_000_000, "default": 1
                        })),
                        query_param("page_size", json!({
                            "type": "integer", "minimum": 1, "maximum": 100, "default": 20
                        })),
                        query_param("sort", json!({
                            "type": "string",
                            "enum": filters::SORT_SAFELIST,
                            "default": filters::DEFAULT_SORT
                        }))
                    ],
                    "responses": {
                        "200": response("A page of books", "BookList"),
                        "422": invalid,
                        "500": internal
                    }
                },
                "post": {
                    "summary": "Create a book",
                    "tags": ["Books"],
                    "requestBody": book_input(),
                    "responses": {
                        "201": response("Book created", "BookEnvelope"),
                        "400": bad_request,
                        "422": invalid,
                        "500": internal
                    }
                }
            },
            "/{id}": {
                "get": {
                    "summary": "Show a book",
                    "tags": ["Books"],
                    "parameters": [id_parameter()],
                    "responses": {
                        "200": response("The book", "BookEnvelope"),
                        "404": not_found,
                        "500": internal
                    }
                },
                "patch": {
                    "summary": "Partially update a book",
                    "tags": ["Books"],
                    "parameters": [id_parameter()],
                    "requestBody": book_input(),
                    "responses": {
                        "200": response("The updated book", "BookEnvelope"),
                        "400": bad_request,
                        "404": not_found,
                        "409": response("Edit conflict", "ErrorResponse"),
                        "422": invalid,
                        "500": internal
                    }
                },
                "delete": {
                    "summary": "Delete a book",
                    "tags": ["Books"],
                    "parameters": [id_parameter()],
                    "responses": {
                        "200": response("Book deleted", "Message"),
                        "404": not_found,
                        "500": internal
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer", "format": "int64" },
                        "title": { "type": "string", "maxLength": 500 },
                        "authors": { "type": "string" },
                        "rating": { "type": "number", "exclusiveMinimum": 0, "maximum": 5 },
                        "ISBN": { "type": "string" },
                        "ISBN13": { "type": "string" },
                        "language": { "type": "string" },
                        "genres": {
                            "type": "array",
                            "items": { "type": "string" },
                            "minItems": 1,
                            "maxItems": 5,
                            "uniqueItems": true
                        },
                        "pages": { "type": "string", "example": "412 pages" },
                        "version": { "type": "integer", "format": "int32" }
                    },
                    "required": [
                        "id", "title", "authors", "rating", "ISBN", "ISBN13", "pages", "version"
                    ]
                },
                "BookInput": {
                    "type": "object",
                    "additionalProperties": false,
                    "properties": {
                        "title": { "type": "string" },
                        "authors": { "type": "string" },
                        "rating": { "type": "number" },
                        "ISBN": { "type": "string" },
                        "ISBN13": { "type": "string" },
                        "language": { "type": "string" },
                        "genres": { "type": "array", "items": { "type": "string" } },
                        "pages": { "type": "string", "pattern": "^[0-9]+ pages$" }
                    }
                },
                "BookEnvelope": {
                    "type": "object",
                    "properties": { "book": { "$ref": "#/components/schemas/Book" } },
                    "required": ["book"]
                },
                "BookList": {
                    "type": "object",
                    "properties": {
                        "books": {
                            "type": "array",
                            "items": { "$ref": "#/components/schemas/Book" }
                        },
                        "metadata": { "$ref": "#/components/schemas/Metadata" }
                    },
                    "required": ["books", "metadata"]
                },
                "Metadata": {
                    "type": "object",
                    "properties": {
                        "current_page": { "type": "integer" },
                        "page_size": { "type": "integer" },
                        "first_page": { "type": "integer" },
                        "last_page": { "type": "integer" },
                        "total_records": { "type": "integer" }
                    }
                },
                "Message": {
                    "type": "object",
                    "properties": { "message": { "type": "string" } },
                    "required": ["message"]
                }
            }
        }
    })
}

/// Create the books module over `store`.
pub fn create_module(store: Arc<dyn BookStore>, api_prefix: &str) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(store, api_prefix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::InMemoryBookStore;

    #[test]
    fn location_base_ignores_trailing_slash() {
        let module = BooksModule::new(Arc::new(InMemoryBookStore::new()), "/v1/");
        assert_eq!(&*module.state.base_path, "/v1/books");
    }

    #[test]
    fn openapi_covers_every_route() {
        let spec = openapi_fragment();
        let paths = spec["paths"].as_object().unwrap();
        assert!(paths["/"].get("get").is_some());
        assert!(paths["/"].get("post").is_some());
        for method in ["get", "patch", "delete"] {
            assert!(paths["/{id}"].get(method).is_some(), "{method}");
        }
        assert_eq!(
            spec["paths"]["/{id}"]["patch"]["responses"]["409"]["content"]["application/json"]
                ["schema"]["$ref"],
            "#/components/schemas/ErrorResponse"
        );
        assert!(spec["components"]["schemas"]["Book"].is_object());
    }
}
