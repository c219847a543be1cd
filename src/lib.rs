//! Tourbook: tour and booking REST backend over a document store, with hosted checkout sessions.

pub mod case;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod migration;
pub mod model;
pub mod payment;
pub mod query;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use config::{Config, StorageKind};
pub use error::{AppError, ConfigError};
pub use migration::apply_migrations;
pub use model::{Document, Models, Schema};
pub use payment::{CheckoutSessionRequest, PaymentProvider, StripeClient};
pub use query::{ApiFeatures, QueryPlan};
pub use routes::{app, common_routes};
pub use service::CrudService;
pub use state::AppState;
pub use store::{DocumentStore, MemoryStore, PgStore};
