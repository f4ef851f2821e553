mod catalog_service;
mod errors;

pub use catalog_service::{register_title, remove_title, revise_title};
pub use errors::{CatalogError, Result};
