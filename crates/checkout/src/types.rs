//! Domain types for the checkout workflow.
//!
//! These are transient, non-persisted copies of data owned by the backend
//! collaborators. Wire-facing types use camelCase field names to match the
//! commerce API's JSON.

use chrono::{DateTime, Utc};
use kasuwa_core::{AddressId, CartItemId, Money, ProductId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::payment::PaymentMethod;

// =============================================================================
// Cart Types
// =============================================================================

/// A line item in the shopper's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Cart line ID.
    pub id: CartItemId,
    /// The product this line refers to.
    pub product_id: ProductId,
    /// Product display name.
    pub name: String,
    /// Quantity, at least 1 (enforced by the cart collaborator).
    pub quantity: u32,
    /// Price per unit.
    pub unit_price: Money,
    /// Line total (`quantity` x `unit_price`, aggregated server-side).
    pub total_price: Money,
    /// Variant label (e.g., "Size: L"), if the product has variants.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

/// The shopper's cart as reported by the cart collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    /// Line items in display order.
    pub items: Vec<CartItem>,
    /// Aggregate amount across all lines.
    pub total_amount: Money,
    /// Aggregate item quantity across all lines.
    pub total_items: u32,
}

impl Cart {
    /// Whether the cart has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// Address Types
// =============================================================================

/// A saved shipping/billing address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    /// Address ID assigned by the address collaborator.
    pub id: AddressId,
    /// Street address (required).
    pub line1: String,
    /// Apartment, suite, etc.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    /// City.
    pub city: String,
    /// State or province.
    pub state: String,
    /// Postal code.
    pub postal_code: String,
    /// Country.
    pub country: String,
    /// Whether this is the shopper's default address.
    #[serde(default)]
    pub is_default: bool,
}

impl Address {
    /// Format the address as a single line for summaries.
    #[must_use]
    pub fn formatted_single_line(&self) -> String {
        let mut parts = vec![self.line1.clone()];
        if let Some(line2) = &self.line2
            && !line2.is_empty()
        {
            parts.push(line2.clone());
        }
        parts.push(self.city.clone());
        parts.push(self.state.clone());
        parts.push(self.postal_code.clone());
        parts.push(self.country.clone());
        parts.join(", ")
    }
}

/// Input for creating a new address during the shipping step.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
    /// Street address (required by the collaborator).
    pub line1: String,
    /// Apartment, suite, etc.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    /// City.
    pub city: String,
    /// State or province.
    pub state: String,
    /// Postal code.
    pub postal_code: String,
    /// Country.
    pub country: String,
    /// Whether to mark the new address as the default.
    pub is_default: bool,
}

/// The shopper's billing address choice.
///
/// A distinct-but-unselected billing address is unrepresentable: either the
/// shipping address doubles as billing, or a concrete address is named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BillingSelection {
    /// Bill to the selected shipping address.
    #[default]
    SameAsShipping,
    /// Bill to a different saved address.
    Distinct(AddressId),
}

// =============================================================================
// Order Types
// =============================================================================

/// An order ready for submission. Ephemeral: held only until the order
/// collaborator accepts it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    /// Where to ship.
    pub shipping_address_id: AddressId,
    /// Where to bill (equals the shipping address when the shopper chose
    /// [`BillingSelection::SameAsShipping`]).
    pub billing_address_id: AddressId,
    /// Selected payment method.
    pub payment_method: PaymentMethod,
    /// Free-form delivery notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Client-generated key the collaborator may use to deduplicate
    /// submissions.
    pub idempotency_key: Uuid,
}

/// Confirmation data for a successfully placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderReceipt {
    /// Opaque order identifier from the order collaborator.
    pub order_id: String,
    /// Human-readable order number (e.g., "KSW-10042"), shown verbatim.
    pub order_number: String,
    /// When the confirmation was received.
    pub placed_at: DateTime<Utc>,
}

// =============================================================================
// Identity Types
// =============================================================================

/// The authenticated shopper, as exposed by the identity capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    /// User ID.
    pub id: UserId,
    /// Email address.
    pub email: String,
}
