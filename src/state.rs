//! Shared application state for all routes.

use crate::model::Models;
use crate::payment::PaymentProvider;
use crate::store::DocumentStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub payments: Arc<dyn PaymentProvider>,
    pub models: Models,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, payments: Arc<dyn PaymentProvider>) -> Self {
        AppState {
            store,
            payments,
            models: Models::new(),
        }
    }
}
