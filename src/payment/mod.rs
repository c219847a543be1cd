//! Hosted checkout sessions. The provider owns the payment flow; we only create the session.

pub mod stripe;

pub use stripe::StripeClient;

use crate::error::AppError;
use async_trait::async_trait;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LineItem {
    pub name: String,
    pub description: Option<String>,
    pub images: Vec<String>,
    /// Smallest currency unit (cents).
    pub amount: i64,
    pub currency: String,
    pub quantity: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CheckoutSessionRequest {
    pub payment_method_types: Vec<String>,
    pub mode: String,
    pub success_url: String,
    pub cancel_url: String,
    pub customer_email: String,
    pub client_reference_id: String,
    pub line_items: Vec<LineItem>,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a checkout session and return the provider's session object as-is.
    async fn create_checkout_session(&self, req: &CheckoutSessionRequest) -> Result<serde_json::Value, AppError>;
}
