//! CrudService: generic document lifecycle over a [`crate::store::DocumentStore`].

mod crud;
mod validation;
pub use crud::CrudService;
pub use validation::RequestValidator;
