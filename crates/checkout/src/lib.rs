//! Kasuwa Checkout - the client-side checkout workflow.
//!
//! This crate coordinates cart review, address selection, payment-method
//! selection, and order submission for the Kasuwa marketplace. It owns no
//! durable state: the cart, address book, and order records live with their
//! respective backend collaborators, which this crate consumes through the
//! traits in [`services`].
//!
//! # Architecture
//!
//! - [`workflow`] - the step sequencer (`CartReview -> Shipping -> Payment ->
//!   Confirmation`) with validation-gated transitions
//! - [`totals`] - pure order-total math, recomputed from the current cart on
//!   every evaluation
//! - [`payment`] - the static registry of selectable payment methods
//! - [`services`] - collaborator traits plus the injected identity capability
//! - [`client`] - reqwest-backed implementation of the collaborator traits
//!   against the Kasuwa commerce REST API
//!
//! # Example
//!
//! ```rust,ignore
//! use kasuwa_checkout::client::CommerceClient;
//! use kasuwa_checkout::config::CommerceApiConfig;
//! use kasuwa_checkout::workflow::CheckoutWorkflow;
//!
//! let config = CommerceApiConfig::from_env()?;
//! let client = CommerceClient::new(&config);
//! let workflow = CheckoutWorkflow::new(session, client.clone(), client.clone(), client);
//!
//! workflow.load().await?;
//! workflow.advance()?; // CartReview -> Shipping
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod client;
pub mod config;
pub mod error;
pub mod payment;
pub mod services;
pub mod totals;
pub mod types;
pub mod workflow;

pub use error::{CheckoutError, ServiceError, ValidationError};
pub use workflow::{
    AddAddressOutcome, CheckoutStep, CheckoutWorkflow, LoadOutcome, PlaceOrderOutcome,
};
