//! Static registry of selectable payment methods.
//!
//! The registry feeds the payment step of the workflow. It is in-memory and
//! immutable for the process lifetime; actual payment capture is delegated to
//! the order collaborator and its provider integrations.

use serde::{Deserialize, Serialize};

/// Selectable payment instruments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Debit or credit card.
    Card,
    /// Direct bank transfer.
    BankTransfer,
    /// USSD banking code.
    Ussd,
}

impl PaymentMethod {
    /// Stable wire identifier for the method.
    #[must_use]
    pub const fn id(&self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::BankTransfer => "bank_transfer",
            Self::Ussd => "ussd",
        }
    }
}

/// A selectable payment option shown on the payment step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentMethodOption {
    /// The method this option selects.
    pub method: PaymentMethod,
    /// Display name (e.g., "Debit / Credit Card").
    pub display_name: &'static str,
    /// Short description shown under the name.
    pub description: &'static str,
    /// Provider that captures the payment.
    pub provider: &'static str,
}

const CARD: PaymentMethodOption = PaymentMethodOption {
    method: PaymentMethod::Card,
    display_name: "Debit / Credit Card",
    description: "Pay securely with Visa, Mastercard, or Verve",
    provider: "Paystack",
};

const BANK_TRANSFER: PaymentMethodOption = PaymentMethodOption {
    method: PaymentMethod::BankTransfer,
    display_name: "Bank Transfer",
    description: "Transfer to a dedicated account number",
    provider: "Flutterwave",
};

const USSD: PaymentMethodOption = PaymentMethodOption {
    method: PaymentMethod::Ussd,
    display_name: "USSD",
    description: "Dial a short code from your registered phone",
    provider: "Paystack",
};

/// All selectable payment options, in display order.
pub const PAYMENT_METHOD_OPTIONS: &[PaymentMethodOption] = &[CARD, BANK_TRANSFER, USSD];

/// Look up the registry entry for a method.
#[must_use]
pub const fn option_for(method: PaymentMethod) -> &'static PaymentMethodOption {
    match method {
        PaymentMethod::Card => &CARD,
        PaymentMethod::BankTransfer => &BANK_TRANSFER,
        PaymentMethod::Ussd => &USSD,
    }
}
