pub mod books;

use std::sync::Arc;

use shelf_kernel::ModuleRegistry;

use books::store::BookStore;

/// Register all project-specific modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, store: Arc<dyn BookStore>, api_prefix: &str) {
    registry.register(books::create_module(store, api_prefix));
}
