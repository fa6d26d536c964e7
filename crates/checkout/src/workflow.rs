//! The checkout step sequencer.
//!
//! Coordinates cart review, address selection, payment-method selection, and
//! order submission. Steps advance linearly (`CartReview -> Shipping ->
//! Payment -> Confirmation`) behind validation guards; backward navigation is
//! free except out of `Confirmation`, which is terminal and only reachable
//! through a successful [`CheckoutWorkflow::place_order`].
//!
//! The workflow keeps read-through copies of collaborator data and never
//! assumes exclusive access: a server-side conflict surfaces as an ordinary
//! operation failure. Totals are recomputed from the current cart on every
//! call, never cached.
//!
//! Methods take `&self`: the `saving`/`processing` flags make a duplicate
//! concurrent submission a typed no-op, and the state mutex is never held
//! across an await.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::error::{CheckoutError, ValidationError};
use crate::payment::PaymentMethod;
use crate::services::{AddressService, CartService, Identity, OrderService};
use crate::totals::Totals;
use crate::types::{Address, AddressInput, BillingSelection, Cart, OrderDraft, OrderReceipt};
use kasuwa_core::AddressId;

/// One discrete stage of the checkout state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CheckoutStep {
    /// Review cart contents and totals.
    CartReview,
    /// Select or create the shipping (and optionally billing) address.
    Shipping,
    /// Select the payment method and place the order.
    Payment,
    /// Terminal: the order has been placed.
    Confirmation,
}

impl CheckoutStep {
    /// Whether this step ends the workflow.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Confirmation)
    }

    const fn previous(self) -> Option<Self> {
        match self {
            Self::CartReview => None,
            Self::Shipping => Some(Self::CartReview),
            Self::Payment => Some(Self::Shipping),
            Self::Confirmation => Some(Self::Payment),
        }
    }
}

impl fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::CartReview => "Cart review",
            Self::Shipping => "Shipping",
            Self::Payment => "Payment",
            Self::Confirmation => "Confirmation",
        };
        f.write_str(label)
    }
}

/// Result of the initial data load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Cart and addresses are loaded; checkout proceeds at `CartReview`.
    Ready,
    /// The cart has no items; the caller should leave checkout entirely.
    EmptyCart,
}

/// Result of an [`CheckoutWorkflow::add_address`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddAddressOutcome {
    /// The address was created and auto-selected for shipping.
    Added(Address),
    /// A previous submission is still outstanding; this call did nothing.
    AlreadyInFlight,
}

/// Result of a [`CheckoutWorkflow::place_order`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceOrderOutcome {
    /// The order was created.
    Placed(OrderReceipt),
    /// A previous submission is still outstanding; this call did nothing.
    AlreadyInFlight,
}

/// Mutable workflow state behind the mutex.
struct State {
    step: CheckoutStep,
    cart: Option<Cart>,
    address_book: Vec<Address>,
    shipping: Option<AddressId>,
    billing: BillingSelection,
    payment: Option<PaymentMethod>,
    notes: Option<String>,
    receipt: Option<OrderReceipt>,
}

impl State {
    const fn new() -> Self {
        Self {
            step: CheckoutStep::CartReview,
            cart: None,
            address_book: Vec::new(),
            shipping: None,
            billing: BillingSelection::SameAsShipping,
            payment: None,
            notes: None,
            receipt: None,
        }
    }

    fn contains_address(&self, id: AddressId) -> bool {
        self.address_book.iter().any(|a| a.id == id)
    }
}

/// Clears a busy flag when the guarded operation finishes, even on error.
struct FlagGuard<'a>(&'a AtomicBool);

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// The checkout workflow.
///
/// Generic over the injected identity capability and the three collaborator
/// services so tests can substitute doubles. In production all three service
/// parameters are typically the same [`crate::client::CommerceClient`].
pub struct CheckoutWorkflow<I, C, A, O> {
    identity: I,
    carts: C,
    addresses: A,
    orders: O,
    state: Mutex<State>,
    saving: AtomicBool,
    processing: AtomicBool,
}

impl<I, C, A, O> CheckoutWorkflow<I, C, A, O>
where
    I: Identity,
    C: CartService,
    A: AddressService,
    O: OrderService,
{
    /// Create a workflow at `CartReview` with nothing loaded.
    pub const fn new(identity: I, carts: C, addresses: A, orders: O) -> Self {
        Self {
            identity,
            carts,
            addresses,
            orders,
            state: Mutex::new(State::new()),
            saving: AtomicBool::new(false),
            processing: AtomicBool::new(false),
        }
    }

    /// Lock the state. A poisoned lock only means a panicked test thread;
    /// the state itself stays consistent, so recover the guard.
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Snapshots
    // ─────────────────────────────────────────────────────────────────────────

    /// The current step.
    #[must_use]
    pub fn step(&self) -> CheckoutStep {
        self.state().step
    }

    /// The loaded cart, if any.
    #[must_use]
    pub fn cart(&self) -> Option<Cart> {
        self.state().cart.clone()
    }

    /// The loaded address book.
    #[must_use]
    pub fn address_book(&self) -> Vec<Address> {
        self.state().address_book.clone()
    }

    /// The selected shipping address id.
    #[must_use]
    pub fn shipping_address(&self) -> Option<AddressId> {
        self.state().shipping
    }

    /// The billing selection.
    #[must_use]
    pub fn billing(&self) -> BillingSelection {
        self.state().billing
    }

    /// The selected payment method.
    #[must_use]
    pub fn payment_method(&self) -> Option<PaymentMethod> {
        self.state().payment
    }

    /// The confirmation receipt, once the order has been placed.
    #[must_use]
    pub fn receipt(&self) -> Option<OrderReceipt> {
        self.state().receipt.clone()
    }

    /// Display totals derived from the current cart.
    ///
    /// Recomputed on every call; never cached.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::NotLoaded`] before a successful `load()`.
    pub fn totals(&self) -> Result<Totals, CheckoutError> {
        let state = self.state();
        let cart = state.cart.as_ref().ok_or(CheckoutError::NotLoaded)?;
        Ok(Totals::from_subtotal(cart.total_amount))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Loading
    // ─────────────────────────────────────────────────────────────────────────

    /// Load checkout data: the cart and the saved addresses, fetched
    /// concurrently. Pre-selects the default address for shipping (billing
    /// follows through [`BillingSelection::SameAsShipping`]).
    ///
    /// An empty cart yields [`LoadOutcome::EmptyCart`]; the caller should
    /// redirect away rather than show an in-workflow error.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::Unauthenticated`] when no shopper is signed in.
    /// - [`CheckoutError::Load`] when either fetch fails; calling `load()`
    ///   again retries both.
    pub async fn load(&self) -> Result<LoadOutcome, CheckoutError> {
        if !self.identity.is_authenticated() {
            return Err(CheckoutError::Unauthenticated);
        }

        let (cart, book) = tokio::try_join!(self.carts.get_cart(), self.addresses.get_addresses())
            .map_err(CheckoutError::Load)?;

        if cart.is_empty() {
            tracing::debug!("cart is empty, aborting checkout");
            return Ok(LoadOutcome::EmptyCart);
        }

        let mut state = self.state();
        if state.shipping.is_none() {
            state.shipping = book.iter().find(|a| a.is_default).map(|a| a.id);
        }
        state.cart = Some(cart);
        state.address_book = book;
        Ok(LoadOutcome::Ready)
    }

    /// Re-fetch the cart from the cart collaborator.
    ///
    /// The cart may change underneath the workflow (another tab, another
    /// device); callers can refresh before re-rendering totals.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Load`] when the fetch fails; the previous
    /// copy is kept.
    pub async fn refresh_cart(&self) -> Result<(), CheckoutError> {
        let cart = self.carts.get_cart().await.map_err(CheckoutError::Load)?;
        self.state().cart = Some(cart);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Selections
    // ─────────────────────────────────────────────────────────────────────────

    /// Select a saved address for shipping.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownAddress`] if the id is not in the
    /// loaded address book.
    pub fn select_shipping_address(&self, id: AddressId) -> Result<(), CheckoutError> {
        let mut state = self.state();
        if !state.contains_address(id) {
            return Err(ValidationError::UnknownAddress(id).into());
        }
        state.shipping = Some(id);
        Ok(())
    }

    /// Choose how the order is billed.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownAddress`] for a
    /// [`BillingSelection::Distinct`] id not in the loaded address book.
    pub fn set_billing(&self, selection: BillingSelection) -> Result<(), CheckoutError> {
        let mut state = self.state();
        if let BillingSelection::Distinct(id) = selection
            && !state.contains_address(id)
        {
            return Err(ValidationError::UnknownAddress(id).into());
        }
        state.billing = selection;
        Ok(())
    }

    /// Select the payment method.
    pub fn select_payment(&self, method: PaymentMethod) {
        self.state().payment = Some(method);
    }

    /// Set or clear the delivery notes.
    pub fn set_notes(&self, notes: Option<String>) {
        self.state().notes = notes;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Navigation
    // ─────────────────────────────────────────────────────────────────────────

    /// Advance to the next step if its guard passes.
    ///
    /// `Payment -> Confirmation` is not reachable this way: confirmation is
    /// only entered as the side effect of a successful
    /// [`Self::place_order`].
    ///
    /// # Errors
    ///
    /// A failed guard leaves the step unchanged and returns the validation
    /// error whose message the caller shows inline.
    pub fn advance(&self) -> Result<CheckoutStep, CheckoutError> {
        let mut state = self.state();
        let next = match state.step {
            CheckoutStep::CartReview => {
                let cart = state.cart.as_ref().ok_or(CheckoutError::NotLoaded)?;
                if cart.is_empty() {
                    return Err(ValidationError::EmptyCart.into());
                }
                CheckoutStep::Shipping
            }
            CheckoutStep::Shipping => {
                let _shipping = state.shipping.ok_or(ValidationError::NoShippingAddress)?;
                if let BillingSelection::Distinct(id) = state.billing
                    && !state.contains_address(id)
                {
                    return Err(ValidationError::UnknownAddress(id).into());
                }
                CheckoutStep::Payment
            }
            CheckoutStep::Payment => {
                return Err(ValidationError::ConfirmationRequiresOrder.into());
            }
            CheckoutStep::Confirmation => {
                return Err(ValidationError::AlreadyConfirmed.into());
            }
        };
        state.step = next;
        Ok(next)
    }

    /// Step back to the previous step. Selections are preserved.
    ///
    /// # Errors
    ///
    /// Refused at `CartReview` (nothing earlier) and at `Confirmation`
    /// (terminal).
    pub fn back(&self) -> Result<CheckoutStep, CheckoutError> {
        let target = {
            let state = self.state();
            if state.step.is_terminal() {
                return Err(ValidationError::AlreadyConfirmed.into());
            }
            state
                .step
                .previous()
                .ok_or(ValidationError::NotAnEarlierStep)?
        };
        self.go_to(target)
    }

    /// Jump directly to an earlier step. Selections are preserved.
    ///
    /// # Errors
    ///
    /// Refused for non-earlier targets and from `Confirmation`.
    pub fn go_to(&self, target: CheckoutStep) -> Result<CheckoutStep, CheckoutError> {
        let mut state = self.state();
        if state.step.is_terminal() {
            return Err(ValidationError::AlreadyConfirmed.into());
        }
        if target >= state.step {
            return Err(ValidationError::NotAnEarlierStep.into());
        }
        state.step = target;
        Ok(target)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Submissions
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a new address and auto-select it for shipping. When billing is
    /// [`BillingSelection::SameAsShipping`] the new address bills the order
    /// too, by construction.
    ///
    /// A second call while one is outstanding returns
    /// [`AddAddressOutcome::AlreadyInFlight`] without contacting the
    /// collaborator.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Submission`] when the collaborator rejects
    /// the input; selections and the address book are unchanged so the form
    /// stays open for correction.
    pub async fn add_address(
        &self,
        input: &AddressInput,
    ) -> Result<AddAddressOutcome, CheckoutError> {
        if self.saving.swap(true, Ordering::AcqRel) {
            return Ok(AddAddressOutcome::AlreadyInFlight);
        }
        let _guard = FlagGuard(&self.saving);

        let created = self
            .addresses
            .create_address(input)
            .await
            .map_err(CheckoutError::Submission)?;

        let mut state = self.state();
        state.shipping = Some(created.id);
        state.address_book.push(created.clone());
        Ok(AddAddressOutcome::Added(created))
    }

    /// Submit the order.
    ///
    /// Preconditions: loaded non-empty cart, shipping address selected,
    /// payment method selected. On success the workflow records the receipt,
    /// enters `Confirmation`, and then clears the cart best-effort — a
    /// failed clear is logged and swallowed because the order has already
    /// succeeded and must not be rolled back or reported as a failure.
    ///
    /// A second call while one is outstanding returns
    /// [`PlaceOrderOutcome::AlreadyInFlight`]; exactly one order-creation
    /// call reaches the collaborator.
    ///
    /// # Errors
    ///
    /// A validation error leaves everything unchanged; a
    /// [`CheckoutError::Submission`] keeps the workflow at `Payment` and the
    /// shopper may retry.
    pub async fn place_order(&self) -> Result<PlaceOrderOutcome, CheckoutError> {
        if self.processing.swap(true, Ordering::AcqRel) {
            return Ok(PlaceOrderOutcome::AlreadyInFlight);
        }
        let _guard = FlagGuard(&self.processing);

        let draft = {
            let state = self.state();
            if state.receipt.is_some() {
                return Err(ValidationError::AlreadyConfirmed.into());
            }
            let cart = state.cart.as_ref().ok_or(CheckoutError::NotLoaded)?;
            if cart.is_empty() {
                return Err(ValidationError::EmptyCart.into());
            }
            let shipping = state.shipping.ok_or(ValidationError::NoShippingAddress)?;
            let billing = match state.billing {
                BillingSelection::SameAsShipping => shipping,
                BillingSelection::Distinct(id) => {
                    if !state.contains_address(id) {
                        return Err(ValidationError::UnknownAddress(id).into());
                    }
                    id
                }
            };
            let payment = state.payment.ok_or(ValidationError::NoPaymentMethod)?;

            OrderDraft {
                shipping_address_id: shipping,
                billing_address_id: billing,
                payment_method: payment,
                notes: state.notes.clone(),
                idempotency_key: Uuid::new_v4(),
            }
        };

        let receipt = self
            .orders
            .create_order(&draft)
            .await
            .map_err(CheckoutError::Submission)?;

        {
            let mut state = self.state();
            state.receipt = Some(receipt.clone());
            state.step = CheckoutStep::Confirmation;
        }
        tracing::info!(order_number = %receipt.order_number, "order placed");

        // The order has succeeded; a failed clear must not undo it or
        // resurface as an error.
        if let Err(e) = self.carts.clear_cart().await {
            tracing::warn!(error = %e, "failed to clear cart after order placement");
        }

        Ok(PlaceOrderOutcome::Placed(receipt))
    }
}
