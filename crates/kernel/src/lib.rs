//! Core traits, settings, validation and module registry for shelf.

pub mod module;
pub mod registry;
pub mod settings;
pub mod validator;

pub use module::{InitCtx, Module};
pub use registry::ModuleRegistry;
pub use validator::{ValidationErrors, Validator};
