//! Error types for the checkout workflow.
//!
//! Two layers: [`ServiceError`] is produced at the collaborator boundary
//! (transport and API failures), [`CheckoutError`] is what workflow
//! operations return. Every collaborator failure is caught and wrapped; none
//! escapes as a panic. The `Display` string of a [`CheckoutError`] is the
//! banner text a presentation layer shows the shopper.

use kasuwa_core::AddressId;
use thiserror::Error;

/// Errors from a commerce collaborator call.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// HTTP request failed (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be parsed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The collaborator rejected the input (missing required field, etc.).
    #[error("{0}")]
    Rejected(String),

    /// The session is not authenticated with the collaborator.
    #[error("not authenticated")]
    Unauthorized,

    /// Rate limited by the backend.
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Any other non-success API response.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },
}

/// Local precondition failures. These never contact a collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The cart has no items.
    #[error("your cart is empty")]
    EmptyCart,

    /// No shipping address has been selected.
    #[error("select a shipping address to continue")]
    NoShippingAddress,

    /// No payment method has been selected.
    #[error("select a payment method to continue")]
    NoPaymentMethod,

    /// The referenced address is not in the loaded address book.
    #[error("address {0} is not in your address book")]
    UnknownAddress(AddressId),

    /// Confirmation is only reached through a successful order submission.
    #[error("place the order to continue to confirmation")]
    ConfirmationRequiresOrder,

    /// The order is already confirmed; the workflow is terminal.
    #[error("this order has already been placed")]
    AlreadyConfirmed,

    /// Forward jumps are not allowed; only earlier steps can be revisited.
    #[error("can only navigate back to an earlier step")]
    NotAnEarlierStep,
}

/// Workflow-level error taxonomy.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// No authenticated user; checkout requires a signed-in shopper.
    #[error("sign in to check out")]
    Unauthenticated,

    /// An operation ran before `load()` populated the workflow.
    #[error("checkout data has not been loaded")]
    NotLoaded,

    /// The initial cart/address fetch failed. Recoverable: call `load()`
    /// again to retry.
    #[error("could not load your checkout: {0}")]
    Load(#[source] ServiceError),

    /// A local precondition failed. No collaborator was contacted.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A collaborator rejected a submission (address creation or order
    /// placement). Recoverable: the step is unchanged and retry is allowed.
    #[error("submission failed: {0}")]
    Submission(#[source] ServiceError),
}

impl CheckoutError {
    /// Whether retrying the same operation is a sensible user action.
    ///
    /// Validation failures need corrected input rather than a retry;
    /// everything else is transient from the workflow's point of view.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(ValidationError::EmptyCart.to_string(), "your cart is empty");
        assert_eq!(
            ValidationError::UnknownAddress(AddressId::new(9)).to_string(),
            "address 9 is not in your address book"
        );
    }

    #[test]
    fn test_checkout_error_wraps_validation_transparently() {
        let err = CheckoutError::from(ValidationError::NoShippingAddress);
        assert_eq!(err.to_string(), "select a shipping address to continue");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_load_error_is_retryable() {
        let err = CheckoutError::Load(ServiceError::Api {
            status: 502,
            message: "bad gateway".to_string(),
        });
        assert!(err.is_retryable());
        assert_eq!(
            err.to_string(),
            "could not load your checkout: API error (502): bad gateway"
        );
    }

    #[test]
    fn test_rate_limited_display() {
        let err = ServiceError::RateLimited(30);
        assert_eq!(err.to_string(), "rate limited, retry after 30 seconds");
    }
}
