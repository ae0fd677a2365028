// libs/appointment-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use payment_cell::PaymentError;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    /// Set once the charge for this appointment has gone through.
    pub transaction_id: Option<String>,
    pub refunded: bool,
    pub user_id: Uuid,
    /// Bound at creation, never reassigned.
    pub slot_id: Uuid,
}

impl Appointment {
    pub fn new(user_id: Uuid, slot_id: Uuid, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at,
            status: AppointmentStatus::Created,
            transaction_id: None,
            refunded: false,
            user_id,
            slot_id,
        }
    }

    /// Live appointments hold their slot closed.
    pub fn is_live(&self) -> bool {
        self.status == AppointmentStatus::Created
    }

    pub fn is_paid(&self) -> bool {
        self.transaction_id.is_some()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Created,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Created => "created",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "created" => Some(AppointmentStatus::Created),
            "completed" => Some(AppointmentStatus::Completed),
            "cancelled" => Some(AppointmentStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, thiserror::Error)]
pub enum AppointmentError {
    #[error("Schedule slot not found")]
    SlotNotFound,

    #[error("Schedule slot not available")]
    SlotUnavailable,

    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Appointment cannot be modified in current status: {0}")]
    InvalidTransition(AppointmentStatus),

    #[error("Appointment has already been paid")]
    AlreadyPaid,

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl AppointmentError {
    /// Whether the same call may succeed if repeated unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppointmentError::Payment(_) | AppointmentError::Storage(_))
    }
}
