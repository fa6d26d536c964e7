//! Test support for workflow-level checkout tests.
//!
//! Provides in-memory doubles for the identity capability and the three
//! commerce collaborators. The doubles are cheaply cloneable (`Arc` inner,
//! like the production client), count the calls they receive, and can be
//! switched into failure modes mid-test.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use kasuwa_checkout::error::ServiceError;
use kasuwa_checkout::services::{AddressService, CartService, Identity, OrderService};
use kasuwa_checkout::types::{Address, AddressInput, Cart, CartItem, CurrentUser, OrderDraft,
    OrderReceipt};
use kasuwa_core::{AddressId, CartItemId, CurrencyCode, Money, ProductId, UserId};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Install a test subscriber once. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A transient backend failure for injection.
fn injected_failure(what: &str) -> ServiceError {
    ServiceError::Api {
        status: 502,
        message: format!("injected {what} failure"),
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// A one-line cart whose subtotal is the given whole-naira amount.
#[must_use]
pub fn cart_with_subtotal(units: i64) -> Cart {
    let amount = Money::from_major(units, CurrencyCode::NGN);
    Cart {
        items: vec![CartItem {
            id: CartItemId::new(1),
            product_id: ProductId::new(101),
            name: "Ankara tote bag".to_string(),
            quantity: 1,
            unit_price: amount,
            total_price: amount,
            variant: None,
        }],
        total_amount: amount,
        total_items: 1,
    }
}

/// A cart with no items.
#[must_use]
pub fn empty_cart() -> Cart {
    Cart {
        items: vec![],
        total_amount: Money::zero(CurrencyCode::NGN),
        total_items: 0,
    }
}

/// A saved address fixture.
#[must_use]
pub fn address(id: i64, is_default: bool) -> Address {
    Address {
        id: AddressId::new(id),
        line1: format!("{id} Allen Avenue"),
        line2: None,
        city: "Ikeja".to_string(),
        state: "Lagos".to_string(),
        postal_code: "100271".to_string(),
        country: "Nigeria".to_string(),
        is_default,
    }
}

// =============================================================================
// Identity double
// =============================================================================

/// Identity capability double.
#[derive(Clone)]
pub struct StubIdentity {
    user: Option<CurrentUser>,
}

impl StubIdentity {
    /// A signed-in shopper.
    #[must_use]
    pub fn signed_in() -> Self {
        Self {
            user: Some(CurrentUser {
                id: UserId::new(7),
                email: "amina@example.com".to_string(),
            }),
        }
    }

    /// No shopper signed in.
    #[must_use]
    pub const fn signed_out() -> Self {
        Self { user: None }
    }
}

impl Identity for StubIdentity {
    fn current_user(&self) -> Option<CurrentUser> {
        self.user.clone()
    }
}

// =============================================================================
// Cart double
// =============================================================================

struct FakeCartInner {
    cart: Mutex<Cart>,
    fail_get: AtomicBool,
    fail_clear: AtomicBool,
    get_calls: AtomicUsize,
    clear_calls: AtomicUsize,
}

/// Cart collaborator double.
#[derive(Clone)]
pub struct FakeCartService {
    inner: Arc<FakeCartInner>,
}

impl FakeCartService {
    #[must_use]
    pub fn new(cart: Cart) -> Self {
        Self {
            inner: Arc::new(FakeCartInner {
                cart: Mutex::new(cart),
                fail_get: AtomicBool::new(false),
                fail_clear: AtomicBool::new(false),
                get_calls: AtomicUsize::new(0),
                clear_calls: AtomicUsize::new(0),
            }),
        }
    }

    /// Replace the served cart (simulates changes from another session).
    pub fn set_cart(&self, cart: Cart) {
        *lock(&self.inner.cart) = cart;
    }

    pub fn set_fail_get(&self, fail: bool) {
        self.inner.fail_get.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_clear(&self, fail: bool) {
        self.inner.fail_clear.store(fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn get_calls(&self) -> usize {
        self.inner.get_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn clear_calls(&self) -> usize {
        self.inner.clear_calls.load(Ordering::SeqCst)
    }
}

impl CartService for FakeCartService {
    async fn get_cart(&self) -> Result<Cart, ServiceError> {
        self.inner.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.fail_get.load(Ordering::SeqCst) {
            return Err(injected_failure("cart fetch"));
        }
        Ok(lock(&self.inner.cart).clone())
    }

    async fn clear_cart(&self) -> Result<(), ServiceError> {
        self.inner.clear_calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.fail_clear.load(Ordering::SeqCst) {
            return Err(injected_failure("cart clear"));
        }
        *lock(&self.inner.cart) = empty_cart();
        Ok(())
    }
}

// =============================================================================
// Address double
// =============================================================================

struct FakeAddressInner {
    book: Mutex<Vec<Address>>,
    fail_get: AtomicBool,
    fail_create: AtomicBool,
    delay_ms: AtomicU64,
    next_id: AtomicI64,
    create_calls: AtomicUsize,
}

/// Address collaborator double.
#[derive(Clone)]
pub struct FakeAddressService {
    inner: Arc<FakeAddressInner>,
}

impl FakeAddressService {
    #[must_use]
    pub fn new(book: Vec<Address>) -> Self {
        let next_id = book.iter().map(|a| a.id.as_i64()).max().unwrap_or(0) + 1;
        Self {
            inner: Arc::new(FakeAddressInner {
                book: Mutex::new(book),
                fail_get: AtomicBool::new(false),
                fail_create: AtomicBool::new(false),
                delay_ms: AtomicU64::new(0),
                next_id: AtomicI64::new(next_id),
                create_calls: AtomicUsize::new(0),
            }),
        }
    }

    pub fn set_fail_get(&self, fail: bool) {
        self.inner.fail_get.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.inner.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Delay each `create_address` so a second caller can observe it in flight.
    pub fn set_delay_ms(&self, ms: u64) {
        self.inner.delay_ms.store(ms, Ordering::SeqCst);
    }

    #[must_use]
    pub fn create_calls(&self) -> usize {
        self.inner.create_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn book(&self) -> Vec<Address> {
        lock(&self.inner.book).clone()
    }
}

impl AddressService for FakeAddressService {
    async fn get_addresses(&self) -> Result<Vec<Address>, ServiceError> {
        if self.inner.fail_get.load(Ordering::SeqCst) {
            return Err(injected_failure("address fetch"));
        }
        Ok(lock(&self.inner.book).clone())
    }

    async fn create_address(&self, input: &AddressInput) -> Result<Address, ServiceError> {
        self.inner.create_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.inner.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.inner.fail_create.load(Ordering::SeqCst) {
            return Err(ServiceError::Rejected("line1 is required".to_string()));
        }
        let created = Address {
            id: AddressId::new(self.inner.next_id.fetch_add(1, Ordering::SeqCst)),
            line1: input.line1.clone(),
            line2: input.line2.clone(),
            city: input.city.clone(),
            state: input.state.clone(),
            postal_code: input.postal_code.clone(),
            country: input.country.clone(),
            is_default: input.is_default,
        };
        lock(&self.inner.book).push(created.clone());
        Ok(created)
    }
}

// =============================================================================
// Order double
// =============================================================================

struct FakeOrderInner {
    fail: AtomicBool,
    delay_ms: AtomicU64,
    create_calls: AtomicUsize,
    last_draft: Mutex<Option<OrderDraft>>,
}

/// Order collaborator double.
#[derive(Clone)]
pub struct FakeOrderService {
    inner: Arc<FakeOrderInner>,
}

impl Default for FakeOrderService {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeOrderService {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(FakeOrderInner {
                fail: AtomicBool::new(false),
                delay_ms: AtomicU64::new(0),
                create_calls: AtomicUsize::new(0),
                last_draft: Mutex::new(None),
            }),
        }
    }

    pub fn set_fail(&self, fail: bool) {
        self.inner.fail.store(fail, Ordering::SeqCst);
    }

    /// Delay each `create_order` so a second caller can observe it in flight.
    pub fn set_delay_ms(&self, ms: u64) {
        self.inner.delay_ms.store(ms, Ordering::SeqCst);
    }

    #[must_use]
    pub fn create_calls(&self) -> usize {
        self.inner.create_calls.load(Ordering::SeqCst)
    }

    /// The most recently submitted draft.
    #[must_use]
    pub fn last_draft(&self) -> Option<OrderDraft> {
        lock(&self.inner.last_draft).clone()
    }
}

impl OrderService for FakeOrderService {
    async fn create_order(&self, draft: &OrderDraft) -> Result<OrderReceipt, ServiceError> {
        self.inner.create_calls.fetch_add(1, Ordering::SeqCst);
        *lock(&self.inner.last_draft) = Some(draft.clone());

        let delay = self.inner.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.inner.fail.load(Ordering::SeqCst) {
            return Err(ServiceError::Rejected("payment was declined".to_string()));
        }

        Ok(OrderReceipt {
            order_id: "ord_9f4e2c".to_string(),
            order_number: "KSW-10042".to_string(),
            placed_at: chrono::Utc::now(),
        })
    }
}
