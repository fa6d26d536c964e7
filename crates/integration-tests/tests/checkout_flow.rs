//! End-to-end workflow tests against in-memory collaborator doubles.

use kasuwa_checkout::error::{CheckoutError, ValidationError};
use kasuwa_checkout::payment::PaymentMethod;
use kasuwa_checkout::types::{AddressInput, BillingSelection};
use kasuwa_checkout::workflow::{
    AddAddressOutcome, CheckoutStep, CheckoutWorkflow, LoadOutcome, PlaceOrderOutcome,
};
use kasuwa_core::AddressId;
use kasuwa_integration_tests::{
    address, cart_with_subtotal, empty_cart, init_tracing, FakeAddressService, FakeCartService,
    FakeOrderService, StubIdentity,
};

type Workflow = CheckoutWorkflow<StubIdentity, FakeCartService, FakeAddressService, FakeOrderService>;

struct Harness {
    carts: FakeCartService,
    addresses: FakeAddressService,
    orders: FakeOrderService,
    workflow: Workflow,
}

impl Harness {
    /// A signed-in shopper with a two-entry address book (id 2 is default)
    /// and a ₦22,000 cart.
    fn new() -> Self {
        init_tracing();
        let carts = FakeCartService::new(cart_with_subtotal(22_000));
        let addresses = FakeAddressService::new(vec![address(1, false), address(2, true)]);
        let orders = FakeOrderService::new();
        let workflow = CheckoutWorkflow::new(
            StubIdentity::signed_in(),
            carts.clone(),
            addresses.clone(),
            orders.clone(),
        );
        Self {
            carts,
            addresses,
            orders,
            workflow,
        }
    }

    /// Load and walk to the payment step with a payment method chosen.
    async fn at_payment(&self) {
        assert_eq!(self.workflow.load().await.expect("load"), LoadOutcome::Ready);
        self.workflow.advance().expect("to shipping");
        self.workflow.advance().expect("to payment");
        self.workflow.select_payment(PaymentMethod::Card);
    }
}

// =============================================================================
// Loading
// =============================================================================

#[tokio::test]
async fn load_preselects_default_shipping_address() {
    let h = Harness::new();

    assert_eq!(h.workflow.load().await.expect("load"), LoadOutcome::Ready);

    assert_eq!(h.workflow.step(), CheckoutStep::CartReview);
    assert_eq!(h.workflow.shipping_address(), Some(AddressId::new(2)));
    assert_eq!(h.workflow.billing(), BillingSelection::SameAsShipping);
    assert_eq!(h.workflow.address_book().len(), 2);
}

#[tokio::test]
async fn load_without_default_address_selects_nothing() {
    init_tracing();
    let workflow = CheckoutWorkflow::new(
        StubIdentity::signed_in(),
        FakeCartService::new(cart_with_subtotal(5_000)),
        FakeAddressService::new(vec![address(1, false)]),
        FakeOrderService::new(),
    );

    assert_eq!(workflow.load().await.expect("load"), LoadOutcome::Ready);
    assert_eq!(workflow.shipping_address(), None);
}

#[tokio::test]
async fn load_with_empty_cart_aborts_checkout() {
    let h = Harness::new();
    h.carts.set_cart(empty_cart());

    assert_eq!(h.workflow.load().await.expect("load"), LoadOutcome::EmptyCart);

    // Nothing was loaded, so the workflow cannot move off cart review.
    assert_eq!(h.workflow.step(), CheckoutStep::CartReview);
    assert!(matches!(
        h.workflow.advance(),
        Err(CheckoutError::NotLoaded)
    ));
}

#[tokio::test]
async fn load_failure_is_retryable() {
    let h = Harness::new();
    h.carts.set_fail_get(true);

    assert!(matches!(
        h.workflow.load().await,
        Err(CheckoutError::Load(_))
    ));

    h.carts.set_fail_get(false);
    assert_eq!(h.workflow.load().await.expect("retry"), LoadOutcome::Ready);
    assert!(h.workflow.cart().is_some());
}

#[tokio::test]
async fn load_requires_authentication() {
    init_tracing();
    let workflow = CheckoutWorkflow::new(
        StubIdentity::signed_out(),
        FakeCartService::new(cart_with_subtotal(1_000)),
        FakeAddressService::new(vec![]),
        FakeOrderService::new(),
    );

    assert!(matches!(
        workflow.load().await,
        Err(CheckoutError::Unauthenticated)
    ));
}

// =============================================================================
// Step guards and navigation
// =============================================================================

#[tokio::test]
async fn shipping_guard_blocks_without_address() {
    init_tracing();
    let workflow = CheckoutWorkflow::new(
        StubIdentity::signed_in(),
        FakeCartService::new(cart_with_subtotal(5_000)),
        FakeAddressService::new(vec![address(1, false)]),
        FakeOrderService::new(),
    );
    workflow.load().await.expect("load");
    workflow.advance().expect("to shipping");

    let err = workflow.advance().expect_err("guard should block");
    assert_eq!(err.to_string(), "select a shipping address to continue");
    assert_eq!(workflow.step(), CheckoutStep::Shipping);

    workflow
        .select_shipping_address(AddressId::new(1))
        .expect("select");
    assert_eq!(workflow.advance().expect("to payment"), CheckoutStep::Payment);
}

#[tokio::test]
async fn confirmation_is_not_reachable_by_advancing() {
    let h = Harness::new();
    h.at_payment().await;

    assert!(matches!(
        h.workflow.advance(),
        Err(CheckoutError::Validation(
            ValidationError::ConfirmationRequiresOrder
        ))
    ));
    assert_eq!(h.workflow.step(), CheckoutStep::Payment);
}

#[tokio::test]
async fn back_preserves_selections() {
    let h = Harness::new();
    h.at_payment().await;

    assert_eq!(h.workflow.back().expect("back"), CheckoutStep::Shipping);
    assert_eq!(h.workflow.back().expect("back"), CheckoutStep::CartReview);
    assert!(matches!(
        h.workflow.back(),
        Err(CheckoutError::Validation(ValidationError::NotAnEarlierStep))
    ));

    // Selections survive the round trip.
    assert_eq!(h.workflow.shipping_address(), Some(AddressId::new(2)));
    assert_eq!(h.workflow.payment_method(), Some(PaymentMethod::Card));
    assert_eq!(h.workflow.advance().expect("forward"), CheckoutStep::Shipping);
}

#[tokio::test]
async fn go_to_rejects_forward_jumps() {
    let h = Harness::new();
    h.workflow.load().await.expect("load");
    h.workflow.advance().expect("to shipping");

    assert!(matches!(
        h.workflow.go_to(CheckoutStep::Payment),
        Err(CheckoutError::Validation(ValidationError::NotAnEarlierStep))
    ));
    assert!(matches!(
        h.workflow.go_to(CheckoutStep::Shipping),
        Err(CheckoutError::Validation(ValidationError::NotAnEarlierStep))
    ));
    assert_eq!(
        h.workflow.go_to(CheckoutStep::CartReview).expect("earlier"),
        CheckoutStep::CartReview
    );
}

#[tokio::test]
async fn refreshed_empty_cart_blocks_advancing() {
    let h = Harness::new();
    h.workflow.load().await.expect("load");

    // The cart was emptied from another session.
    h.carts.set_cart(empty_cart());
    h.workflow.refresh_cart().await.expect("refresh");

    assert!(matches!(
        h.workflow.advance(),
        Err(CheckoutError::Validation(ValidationError::EmptyCart))
    ));
    assert_eq!(h.workflow.step(), CheckoutStep::CartReview);
}

#[tokio::test]
async fn totals_follow_the_refreshed_cart() {
    let h = Harness::new();
    assert!(matches!(h.workflow.totals(), Err(CheckoutError::NotLoaded)));

    h.workflow.load().await.expect("load");
    assert!(h.workflow.totals().expect("totals").free_shipping());

    // The shopper removed items elsewhere; the smaller cart pays delivery.
    h.carts.set_cart(cart_with_subtotal(9_999));
    h.workflow.refresh_cart().await.expect("refresh");
    let totals = h.workflow.totals().expect("totals");
    assert!(!totals.free_shipping());
    assert_eq!(totals.total.to_string(), "₦12249.00");
}

// =============================================================================
// Selections
// =============================================================================

#[tokio::test]
async fn unknown_addresses_are_rejected() {
    let h = Harness::new();
    h.workflow.load().await.expect("load");

    assert!(matches!(
        h.workflow.select_shipping_address(AddressId::new(99)),
        Err(CheckoutError::Validation(ValidationError::UnknownAddress(_)))
    ));
    assert!(matches!(
        h.workflow.set_billing(BillingSelection::Distinct(AddressId::new(99))),
        Err(CheckoutError::Validation(ValidationError::UnknownAddress(_)))
    ));

    // The previous selections are untouched.
    assert_eq!(h.workflow.shipping_address(), Some(AddressId::new(2)));
    assert_eq!(h.workflow.billing(), BillingSelection::SameAsShipping);
}

#[tokio::test]
async fn distinct_billing_address_lands_in_the_draft() {
    let h = Harness::new();
    h.at_payment().await;
    h.workflow.back().expect("to shipping");
    h.workflow
        .set_billing(BillingSelection::Distinct(AddressId::new(1)))
        .expect("billing");
    h.workflow.advance().expect("to payment");

    let outcome = h.workflow.place_order().await.expect("place");
    assert!(matches!(outcome, PlaceOrderOutcome::Placed(_)));

    let draft = h.orders.last_draft().expect("captured draft");
    assert_eq!(draft.shipping_address_id, AddressId::new(2));
    assert_eq!(draft.billing_address_id, AddressId::new(1));
    assert_eq!(draft.payment_method, PaymentMethod::Card);
}

// =============================================================================
// Adding addresses
// =============================================================================

#[tokio::test]
async fn added_address_is_auto_selected_for_shipping() {
    let h = Harness::new();
    h.workflow.load().await.expect("load");
    h.workflow.advance().expect("to shipping");

    let input = AddressInput {
        line1: "3 Aminu Kano Crescent".to_string(),
        city: "Abuja".to_string(),
        state: "FCT".to_string(),
        postal_code: "900281".to_string(),
        country: "Nigeria".to_string(),
        ..AddressInput::default()
    };
    let outcome = h.workflow.add_address(&input).await.expect("add");
    let AddAddressOutcome::Added(created) = outcome else {
        panic!("expected Added, got {outcome:?}");
    };

    assert_eq!(h.workflow.shipping_address(), Some(created.id));
    assert_eq!(h.workflow.address_book().len(), 3);
    // Billing still follows shipping, so the new address bills too.
    assert_eq!(h.workflow.billing(), BillingSelection::SameAsShipping);
}

#[tokio::test]
async fn rejected_address_leaves_state_unchanged() {
    let h = Harness::new();
    h.workflow.load().await.expect("load");
    h.workflow.advance().expect("to shipping");
    h.addresses.set_fail_create(true);

    let err = h
        .workflow
        .add_address(&AddressInput::default())
        .await
        .expect_err("rejected");
    assert!(matches!(err, CheckoutError::Submission(_)));

    assert_eq!(h.workflow.address_book().len(), 2);
    assert_eq!(h.workflow.shipping_address(), Some(AddressId::new(2)));
    assert_eq!(h.workflow.step(), CheckoutStep::Shipping);

    // The guard flag was released, so a corrected submission goes through.
    h.addresses.set_fail_create(false);
    let input = AddressInput {
        line1: "15 Marian Rd".to_string(),
        city: "Calabar".to_string(),
        state: "Cross River".to_string(),
        postal_code: "540281".to_string(),
        country: "Nigeria".to_string(),
        ..AddressInput::default()
    };
    assert!(matches!(
        h.workflow.add_address(&input).await.expect("retry"),
        AddAddressOutcome::Added(_)
    ));
}

// =============================================================================
// Placing the order
// =============================================================================

#[tokio::test]
async fn place_order_reaches_confirmation_and_clears_the_cart() {
    let h = Harness::new();
    h.at_payment().await;
    h.workflow.set_notes(Some("Call on arrival".to_string()));

    let outcome = h.workflow.place_order().await.expect("place");
    let PlaceOrderOutcome::Placed(receipt) = outcome else {
        panic!("expected Placed, got {outcome:?}");
    };

    assert_eq!(receipt.order_number, "KSW-10042");
    let draft = h.orders.last_draft().expect("captured draft");
    assert_eq!(draft.notes.as_deref(), Some("Call on arrival"));
    assert_eq!(h.workflow.step(), CheckoutStep::Confirmation);
    assert_eq!(h.workflow.receipt().map(|r| r.order_number), Some("KSW-10042".to_string()));
    assert_eq!(h.orders.create_calls(), 1);
    assert_eq!(h.carts.clear_calls(), 1);
}

#[tokio::test]
async fn place_order_requires_a_payment_method() {
    let h = Harness::new();
    h.workflow.load().await.expect("load");
    h.workflow.advance().expect("to shipping");
    h.workflow.advance().expect("to payment");

    assert!(matches!(
        h.workflow.place_order().await,
        Err(CheckoutError::Validation(ValidationError::NoPaymentMethod))
    ));
    assert_eq!(h.orders.create_calls(), 0);
    assert_eq!(h.workflow.step(), CheckoutStep::Payment);
}

#[tokio::test]
async fn failed_submission_keeps_the_payment_step_and_allows_retry() {
    let h = Harness::new();
    h.at_payment().await;
    h.orders.set_fail(true);

    let err = h.workflow.place_order().await.expect_err("declined");
    assert!(matches!(err, CheckoutError::Submission(_)));
    assert_eq!(h.workflow.step(), CheckoutStep::Payment);
    assert!(h.workflow.receipt().is_none());
    assert_eq!(h.carts.clear_calls(), 0);

    h.orders.set_fail(false);
    assert!(matches!(
        h.workflow.place_order().await.expect("retry"),
        PlaceOrderOutcome::Placed(_)
    ));
    assert_eq!(h.orders.create_calls(), 2);
}

#[tokio::test]
async fn failed_cart_clear_does_not_undo_the_order() {
    let h = Harness::new();
    h.at_payment().await;
    h.carts.set_fail_clear(true);

    let outcome = h.workflow.place_order().await.expect("place");
    assert!(matches!(outcome, PlaceOrderOutcome::Placed(_)));

    assert_eq!(h.workflow.step(), CheckoutStep::Confirmation);
    assert!(h.workflow.receipt().is_some());
    assert_eq!(h.carts.clear_calls(), 1);
}

#[tokio::test]
async fn duplicate_place_order_reaches_the_collaborator_once() {
    let h = Harness::new();
    h.at_payment().await;
    h.orders.set_delay_ms(50);

    let (first, second) = tokio::join!(h.workflow.place_order(), h.workflow.place_order());

    let placed = first.expect("first submission");
    assert!(matches!(placed, PlaceOrderOutcome::Placed(_)));
    assert_eq!(second.expect("second submission"), PlaceOrderOutcome::AlreadyInFlight);
    assert_eq!(h.orders.create_calls(), 1);
}

#[tokio::test]
async fn duplicate_add_address_reaches_the_collaborator_once() {
    let h = Harness::new();
    h.workflow.load().await.expect("load");
    h.workflow.advance().expect("to shipping");
    h.addresses.set_delay_ms(50);

    let input = AddressInput {
        line1: "8 Zik Avenue".to_string(),
        city: "Enugu".to_string(),
        state: "Enugu".to_string(),
        postal_code: "400281".to_string(),
        country: "Nigeria".to_string(),
        ..AddressInput::default()
    };
    let (first, second) = tokio::join!(
        h.workflow.add_address(&input),
        h.workflow.add_address(&input)
    );

    let outcomes = [first.expect("first"), second.expect("second")];
    let added = outcomes
        .iter()
        .filter(|o| matches!(o, AddAddressOutcome::Added(_)))
        .count();
    let in_flight = outcomes
        .iter()
        .filter(|o| matches!(o, AddAddressOutcome::AlreadyInFlight))
        .count();
    assert_eq!((added, in_flight), (1, 1));
    assert_eq!(h.addresses.create_calls(), 1);
}

#[tokio::test]
async fn confirmed_checkout_refuses_further_moves() {
    let h = Harness::new();
    h.at_payment().await;
    h.workflow.place_order().await.expect("place");

    assert!(matches!(
        h.workflow.back(),
        Err(CheckoutError::Validation(ValidationError::AlreadyConfirmed))
    ));
    assert!(matches!(
        h.workflow.go_to(CheckoutStep::CartReview),
        Err(CheckoutError::Validation(ValidationError::AlreadyConfirmed))
    ));
    assert!(matches!(
        h.workflow.place_order().await,
        Err(CheckoutError::Validation(ValidationError::AlreadyConfirmed))
    ));
    assert_eq!(h.orders.create_calls(), 1);
}
