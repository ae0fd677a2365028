// libs/appointment-cell/src/services/lifecycle.rs
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use doctor_cell::ScheduleSlot;

use crate::models::{Appointment, AppointmentError, AppointmentStatus};

/// Appointment state machine. Operates on in-memory entities only; the
/// booking service decides when the results are persisted.
#[derive(Debug, Default, Clone)]
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: &AppointmentStatus,
        new_status: &AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {:?} to {:?}", current_status, new_status);

        if !self.get_valid_transitions(current_status).contains(new_status) {
            warn!("Invalid status transition attempted: {:?} -> {:?}", current_status, new_status);
            return Err(AppointmentError::InvalidTransition(*current_status));
        }

        Ok(())
    }

    /// Get all valid next statuses for a given current status
    pub fn get_valid_transitions(&self, current_status: &AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Created => vec![
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
            ],
            // Terminal states - no transitions allowed
            AppointmentStatus::Completed => vec![],
            AppointmentStatus::Cancelled => vec![],
        }
    }

    /// Take an open slot for `user_id`. Closes the slot; the caller must hold
    /// the slot's row lock so no other booking observes it open in between.
    pub fn book(
        &self,
        slot: &mut ScheduleSlot,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        if !slot.is_open() {
            debug!("Slot {} is closed, rejecting booking for user {}", slot.id, user_id);
            return Err(AppointmentError::SlotUnavailable);
        }

        let appointment = Appointment::new(user_id, slot.id, now);
        slot.enabled = false;

        info!("Appointment {} created on slot {} for user {}", appointment.id, slot.id, user_id);
        Ok(appointment)
    }

    /// Close out an appointment whose weekly occurrence has elapsed.
    pub fn complete(&self, appointment: &mut Appointment) -> Result<(), AppointmentError> {
        self.validate_status_transition(&appointment.status, &AppointmentStatus::Completed)?;
        appointment.status = AppointmentStatus::Completed;

        info!("Appointment {} completed", appointment.id);
        Ok(())
    }

    /// Checked before any refund is attempted.
    pub fn ensure_cancellable(&self, appointment: &Appointment) -> Result<(), AppointmentError> {
        self.validate_status_transition(&appointment.status, &AppointmentStatus::Cancelled)
    }

    /// Apply a cancellation once the payment side has been settled (refunded,
    /// voided, or nothing was ever charged). Reopens the bound slot.
    pub fn finalize_cancellation(
        &self,
        appointment: &mut Appointment,
        slot: &mut ScheduleSlot,
        refunded: bool,
    ) -> Result<(), AppointmentError> {
        self.ensure_cancellable(appointment)?;

        if slot.id != appointment.slot_id {
            return Err(AppointmentError::SlotNotFound);
        }

        appointment.status = AppointmentStatus::Cancelled;
        appointment.refunded = refunded;
        slot.enabled = true;

        info!(
            "Appointment {} cancelled (refunded: {}), slot {} reopened",
            appointment.id, refunded, slot.id
        );
        Ok(())
    }

    /// Only a live appointment without a prior charge can be paid.
    pub fn ensure_payable(&self, appointment: &Appointment) -> Result<(), AppointmentError> {
        if !appointment.is_live() {
            return Err(AppointmentError::InvalidTransition(appointment.status));
        }
        if appointment.is_paid() {
            return Err(AppointmentError::AlreadyPaid);
        }
        Ok(())
    }

    pub fn bind_transaction(
        &self,
        appointment: &mut Appointment,
        transaction_id: &str,
    ) -> Result<(), AppointmentError> {
        self.ensure_payable(appointment)?;
        appointment.transaction_id = Some(transaction_id.to_string());
        Ok(())
    }
}
