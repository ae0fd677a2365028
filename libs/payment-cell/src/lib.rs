//! # Payment Cell
//!
//! Charge, refund and void sequencing against an opaque payment gateway.
//!
//! ```text
//! +-----------------------------------------------------+
//! |                   Payment Cell                      |
//! +-----------------------------------------------------+
//! |  models.rs      |  Gateway results, receipts, errors|
//! |  services/      |                                   |
//! |    gateway.rs   |  PaymentGateway trait             |
//! |    reconciler.rs|  Refund -> void fallback, timeouts|
//! +-----------------------------------------------------+
//! ```
//!
//! The cell never touches storage. Callers persist whatever the reconciler
//! reports back (transaction ids, customer ids, cancellation outcome).

pub mod models;
pub mod services;

pub use models::{
    CustomerProfile, CustomerResolution, GatewayErrorEntry, GatewayFailure, GatewayResult,
    PaymentError, PaymentReceipt, RefundOutcome, Transaction,
};

pub use services::{PaymentGateway, PaymentReconciler, UNSETTLED_REFUND_MESSAGE};
