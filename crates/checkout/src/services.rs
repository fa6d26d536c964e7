//! Collaborator traits consumed by the checkout workflow.
//!
//! The cart, address book, and order records are owned by external backend
//! services; the workflow only ever talks to them through these traits so
//! tests can substitute in-memory doubles. [`crate::client::CommerceClient`]
//! is the production implementation.
//!
//! The workflow runs on a single-threaded, event-driven model, so the trait
//! futures are not required to be `Send`.
#![allow(async_fn_in_trait)]

use crate::error::ServiceError;
use crate::types::{Address, AddressInput, Cart, CurrentUser, OrderDraft, OrderReceipt};

/// Read/clear access to the shopper's server-side cart.
pub trait CartService {
    /// Fetch the current cart.
    async fn get_cart(&self) -> Result<Cart, ServiceError>;

    /// Empty the cart. Called best-effort after a successful order.
    async fn clear_cart(&self) -> Result<(), ServiceError>;
}

/// The shopper's saved addresses.
pub trait AddressService {
    /// Fetch all saved addresses, in the collaborator's display order.
    async fn get_addresses(&self) -> Result<Vec<Address>, ServiceError>;

    /// Create a new address and return it with its assigned id.
    async fn create_address(&self, input: &AddressInput) -> Result<Address, ServiceError>;
}

/// Durable order creation.
pub trait OrderService {
    /// Submit an order draft; returns the created order's identifiers.
    async fn create_order(&self, draft: &OrderDraft) -> Result<OrderReceipt, ServiceError>;
}

/// Ambient authentication state, injected rather than read from a global so
/// tests can substitute a double.
pub trait Identity {
    /// The signed-in shopper, if any.
    fn current_user(&self) -> Option<CurrentUser>;

    /// Whether a shopper is signed in.
    fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }
}
