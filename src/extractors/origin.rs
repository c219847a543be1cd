//! Scheme and host the client used to reach us, for building absolute URLs.

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::header, http::request::Parts};

/// `{scheme}://{host}` of the incoming request. Honors `X-Forwarded-Proto`; defaults to `http://localhost`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestOrigin {
    pub scheme: String,
    pub host: String,
}

impl RequestOrigin {
    pub fn url(&self, path: &str) -> String {
        format!("{}://{}{}", self.scheme, self.host, path)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestOrigin
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.split(',').next().unwrap_or(s).trim().to_string())
                .filter(|s| !s.is_empty())
        };
        let scheme = value("X-Forwarded-Proto").unwrap_or_else(|| "http".into());
        let host = value(header::HOST.as_str())
            .or_else(|| parts.uri.authority().map(|a| a.to_string()))
            .unwrap_or_else(|| "localhost".into());
        Ok(RequestOrigin { scheme, host })
    }
}
