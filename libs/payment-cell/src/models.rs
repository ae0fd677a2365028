// libs/payment-cell/src/models.rs
use serde::{Deserialize, Serialize};
use std::fmt;

// ==============================================================================
// GATEWAY RESPONSE MODELS
// ==============================================================================

/// One validation or processing error reported by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GatewayErrorEntry {
    pub message: String,
    pub code: String,
    pub attribute: String,
}

/// The failure shape of every gateway operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GatewayFailure {
    pub errors: Vec<GatewayErrorEntry>,
    /// Top-level message summarising the failure.
    pub message: String,
}

impl GatewayFailure {
    pub fn new(message: &str) -> Self {
        Self {
            errors: Vec::new(),
            message: message.to_string(),
        }
    }

    pub fn with_error(mut self, message: &str, code: &str, attribute: &str) -> Self {
        self.errors.push(GatewayErrorEntry {
            message: message.to_string(),
            code: code.to_string(),
            attribute: attribute.to_string(),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayResult<T> {
    Success(T),
    Failure(GatewayFailure),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: String,
    pub amount_minor: i64,
    pub order_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomerProfile {
    pub id: String,
}

/// Everything the gateway needs to refund a previous charge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentReceipt {
    pub transaction_id: String,
    pub amount_minor: i64,
    pub order_id: String,
}

// ==============================================================================
// RECONCILIATION OUTCOMES
// ==============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum RefundOutcome {
    Refunded(Transaction),
    /// The charge had not settled yet and was voided instead.
    Voided(Transaction),
}

impl RefundOutcome {
    pub fn transaction(&self) -> &Transaction {
        match self {
            RefundOutcome::Refunded(tx) | RefundOutcome::Voided(tx) => tx,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CustomerResolution {
    /// The stored customer id is still known to the gateway.
    Existing(String),
    /// A new profile was created and its id must be stored on the user.
    Created(String),
    /// The stored id is unknown to the gateway and must be cleared.
    Missing,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

/// Aggregated gateway failure detail, surfaced verbatim to the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, thiserror::Error)]
#[error("Payment error: {}", .messages.join("; "))]
pub struct PaymentError {
    pub errors: Vec<GatewayErrorEntry>,
    pub messages: Vec<String>,
}

impl PaymentError {
    pub const TRANSPORT_CODE: &'static str = "transport";

    pub fn from_failure(failure: &GatewayFailure) -> Self {
        Self {
            errors: failure.errors.clone(),
            messages: vec![failure.message.clone()],
        }
    }

    /// A single synthetic entry for network faults, timeouts and other
    /// non-gateway failures.
    pub fn transport(operation: &str, message: impl fmt::Display) -> Self {
        let message = format!("{} failed: {}", operation, message);
        Self {
            errors: vec![GatewayErrorEntry {
                message: message.clone(),
                code: Self::TRANSPORT_CODE.to_string(),
                attribute: operation.to_string(),
            }],
            messages: vec![message],
        }
    }

    pub fn message(message: &str) -> Self {
        Self {
            errors: Vec::new(),
            messages: vec![message.to_string()],
        }
    }

    /// Append another report, keeping entry order.
    pub fn merge(mut self, other: PaymentError) -> Self {
        self.errors.extend(other.errors);
        self.messages.extend(other.messages);
        self
    }

    pub fn is_transport(&self) -> bool {
        self.errors.iter().any(|e| e.code == Self::TRANSPORT_CODE)
    }
}
