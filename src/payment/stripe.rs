//! Stripe Checkout client (`POST /v1/checkout/sessions`, form encoded).

use super::{CheckoutSessionRequest, PaymentProvider};
use crate::error::AppError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    api_base: String,
    /// `None` when payments are not configured; session creation then fails with 502.
    secret_key: Option<String>,
}

#[derive(Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

impl StripeClient {
    pub fn new(api_base: impl Into<String>, secret_key: Option<String>, timeout_seconds: u64) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| AppError::Payment(format!("failed to build HTTP client: {e}")))?;
        let api_base: String = api_base.into();
        Ok(StripeClient {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key,
        })
    }

    /// Flatten the request into Stripe's bracketed form parameters.
    pub fn form_params(req: &CheckoutSessionRequest) -> Vec<(String, String)> {
        let mut out = Vec::new();
        for (i, t) in req.payment_method_types.iter().enumerate() {
            out.push((format!("payment_method_types[{i}]"), t.clone()));
        }
        out.push(("mode".into(), req.mode.clone()));
        out.push(("success_url".into(), req.success_url.clone()));
        out.push(("cancel_url".into(), req.cancel_url.clone()));
        out.push(("customer_email".into(), req.customer_email.clone()));
        out.push(("client_reference_id".into(), req.client_reference_id.clone()));
        for (i, item) in req.line_items.iter().enumerate() {
            let p = format!("line_items[{i}]");
            out.push((format!("{p}[quantity]"), item.quantity.to_string()));
            out.push((format!("{p}[price_data][currency]"), item.currency.clone()));
            out.push((format!("{p}[price_data][unit_amount]"), item.amount.to_string()));
            out.push((format!("{p}[price_data][product_data][name]"), item.name.clone()));
            if let Some(d) = &item.description {
                out.push((format!("{p}[price_data][product_data][description]"), d.clone()));
            }
            for (j, img) in item.images.iter().enumerate() {
                out.push((format!("{p}[price_data][product_data][images][{j}]"), img.clone()));
            }
        }
        out
    }
}

#[async_trait]
impl PaymentProvider for StripeClient {
    async fn create_checkout_session(&self, req: &CheckoutSessionRequest) -> Result<serde_json::Value, AppError> {
        let key = self
            .secret_key
            .as_deref()
            .ok_or_else(|| AppError::Payment("payments are not configured".into()))?;
        let url = format!("{}/v1/checkout/sessions", self.api_base);
        tracing::debug!(client_reference_id = %req.client_reference_id, "creating checkout session");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(key)
            .form(&Self::form_params(req))
            .send()
            .await
            .map_err(|e| AppError::Payment(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp
                .json::<StripeErrorBody>()
                .await
                .ok()
                .and_then(|b| b.error.message)
                .unwrap_or_else(|| format!("HTTP {}", status));
            tracing::warn!(status = %status, message = %message, "checkout session rejected");
            return Err(AppError::Payment(message));
        }
        resp.json::<serde_json::Value>()
            .await
            .map_err(|e| AppError::Payment(format!("invalid response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::LineItem;

    #[test]
    fn form_params_use_bracket_notation() {
        let req = CheckoutSessionRequest {
            payment_method_types: vec!["card".into()],
            mode: "payment".into(),
            success_url: "http://localhost/?tour=1".into(),
            cancel_url: "http://localhost/tour/x".into(),
            customer_email: "a@b.io".into(),
            client_reference_id: "1".into(),
            line_items: vec![LineItem {
                name: "The Forest Hiker Tour".into(),
                description: Some("Breathtaking hike".into()),
                images: vec!["http://localhost/img/tours/a.jpg".into()],
                amount: 39700,
                currency: "usd".into(),
                quantity: 1,
            }],
        };
        let params = StripeClient::form_params(&req);
        let get = |k: &str| params.iter().find(|(key, _)| key == k).map(|(_, v)| v.as_str());
        assert_eq!(get("payment_method_types[0]"), Some("card"));
        assert_eq!(get("line_items[0][price_data][unit_amount]"), Some("39700"));
        assert_eq!(get("line_items[0][price_data][product_data][name]"), Some("The Forest Hiker Tour"));
        assert_eq!(get("line_items[0][price_data][product_data][images][0]"), Some("http://localhost/img/tours/a.jpg"));
    }

    #[tokio::test]
    async fn missing_key_is_payment_error() {
        let client = StripeClient::new(DEFAULT_API_BASE, None, 5).unwrap();
        let req = CheckoutSessionRequest {
            payment_method_types: vec![],
            mode: "payment".into(),
            success_url: String::new(),
            cancel_url: String::new(),
            customer_email: String::new(),
            client_reference_id: String::new(),
            line_items: vec![],
        };
        assert!(matches!(client.create_checkout_session(&req).await, Err(AppError::Payment(_))));
    }
}
