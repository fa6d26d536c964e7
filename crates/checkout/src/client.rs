//! HTTP client for the Kasuwa commerce REST API.
//!
//! Implements the collaborator traits in [`crate::services`] against the
//! backend's JSON endpoints. The client is cheaply cloneable via `Arc` and a
//! single instance can serve as all three collaborators.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::ExposeSecret;
use serde::Deserialize;

use crate::config::CommerceApiConfig;
use crate::error::ServiceError;
use crate::services::{AddressService, CartService, OrderService};
use crate::types::{Address, AddressInput, Cart, OrderDraft, OrderReceipt};

/// Client for the Kasuwa commerce API.
#[derive(Clone)]
pub struct CommerceClient {
    inner: Arc<CommerceClientInner>,
}

struct CommerceClientInner {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
    timeout: Duration,
}

impl CommerceClient {
    /// Create a new commerce API client.
    #[must_use]
    pub fn new(config: &CommerceApiConfig) -> Self {
        Self {
            inner: Arc::new(CommerceClientInner {
                client: reqwest::Client::new(),
                base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
                access_token: config.access_token.expose_secret().to_string(),
                timeout: config.timeout,
            }),
        }
    }

    /// Build a request against an API path (no leading slash).
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.inner
            .client
            .request(method, format!("{}/{path}", self.inner.base_url))
            .timeout(self.inner.timeout)
            .bearer_auth(&self.inner.access_token)
            .header("Accept", "application/json")
    }
}

/// Convert a non-success response into a [`ServiceError`].
///
/// Reads the body as text first so validation messages from the backend's
/// problem-details payloads survive into the error.
async fn check_status(response: Response) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ServiceError::Unauthorized);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1);
        return Err(ServiceError::RateLimited(retry_after));
    }

    let body = response.text().await.unwrap_or_default();
    let message = extract_error_message(&body);
    tracing::debug!(status = %status, message = %message, "commerce API error response");

    if status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY {
        return Err(ServiceError::Rejected(message));
    }

    Err(ServiceError::Api {
        status: status.as_u16(),
        message,
    })
}

/// Pull a human-readable message out of an error body.
///
/// The backend returns RFC 7807 problem details (`detail`/`title`) for most
/// failures; older endpoints use a bare `message` field. Falls back to the
/// truncated raw body.
fn extract_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["detail", "message", "title"] {
            if let Some(text) = value.get(key).and_then(serde_json::Value::as_str)
                && !text.is_empty()
            {
                return text.to_string();
            }
        }
    }
    let truncated: String = body.chars().take(200).collect();
    if truncated.is_empty() {
        "(no error details provided)".to_string()
    } else {
        truncated
    }
}

impl CartService for CommerceClient {
    async fn get_cart(&self) -> Result<Cart, ServiceError> {
        let response = self.request(Method::GET, "api/v1/cart").send().await?;
        let response = check_status(response).await?;
        Ok(response.json::<Cart>().await?)
    }

    async fn clear_cart(&self) -> Result<(), ServiceError> {
        let response = self.request(Method::DELETE, "api/v1/cart").send().await?;
        check_status(response).await?;
        Ok(())
    }
}

impl AddressService for CommerceClient {
    async fn get_addresses(&self) -> Result<Vec<Address>, ServiceError> {
        let response = self.request(Method::GET, "api/v1/addresses").send().await?;
        let response = check_status(response).await?;
        Ok(response.json::<Vec<Address>>().await?)
    }

    async fn create_address(&self, input: &AddressInput) -> Result<Address, ServiceError> {
        let response = self
            .request(Method::POST, "api/v1/addresses")
            .json(input)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json::<Address>().await?)
    }
}

impl OrderService for CommerceClient {
    async fn create_order(&self, draft: &OrderDraft) -> Result<OrderReceipt, ServiceError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct CreateOrderResponse {
            order_id: String,
            order_number: String,
        }

        let response = self
            .request(Method::POST, "api/v1/orders")
            .json(draft)
            .send()
            .await?;
        let response = check_status(response).await?;
        let created = response.json::<CreateOrderResponse>().await?;
        tracing::debug!(order_number = %created.order_number, "order created");

        Ok(OrderReceipt {
            order_id: created.order_id,
            order_number: created.order_number,
            placed_at: Utc::now(),
        })
    }
}
