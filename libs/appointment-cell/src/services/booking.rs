// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use doctor_cell::{SlotCalendar, SlotOccurrence};
use payment_cell::{CustomerResolution, PaymentError, PaymentGateway, PaymentReceipt, PaymentReconciler};
use shared_config::AppConfig;

use crate::models::{Appointment, AppointmentError};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::rollover::RolloverService;
use crate::store::{BookingStore, StoreError};

// ==============================================================================
// BOOKING SERVICE
// ==============================================================================

/// Entry point for every booking operation. Each public method is one unit of
/// work: it opens a store transaction, applies the lifecycle change, performs
/// any gateway call while the rows are still locked, and commits only when
/// everything succeeded. An early return drops the transaction, which rolls
/// back.
pub struct BookingService {
    store: Arc<dyn BookingStore>,
    lifecycle: AppointmentLifecycleService,
    calendar: SlotCalendar,
    reconciler: PaymentReconciler,
    rollover: RolloverService,
    appointment_price_minor: i64,
}

impl BookingService {
    pub fn new(config: &AppConfig, store: Arc<dyn BookingStore>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self {
            rollover: RolloverService::new(Arc::clone(&store)),
            store,
            lifecycle: AppointmentLifecycleService::new(),
            calendar: SlotCalendar::new(),
            reconciler: PaymentReconciler::new(gateway, config),
            appointment_price_minor: config.appointment_price_minor,
        }
    }

    // ==========================================================================
    // BOOKING
    // ==========================================================================

    #[instrument(skip(self))]
    pub async fn create_appointment(&self, user_id: Uuid, slot_id: Uuid) -> Result<Appointment, AppointmentError> {
        let mut tx = self.store.begin().await?;

        if tx.find_user(user_id).await?.is_none() {
            return Err(AppointmentError::UserNotFound);
        }

        let mut slot = tx.lock_slot(slot_id).await?.ok_or(AppointmentError::SlotNotFound)?;
        let appointment = self.lifecycle.book(&mut slot, user_id, Utc::now())?;

        tx.save_slot(&slot).await?;
        match tx.insert_appointment(&appointment).await {
            Ok(()) => {}
            Err(StoreError::Conflict(detail)) => {
                debug!("Slot {} already held: {}", slot_id, detail);
                return Err(AppointmentError::SlotUnavailable);
            }
            Err(e) => return Err(e.into()),
        }
        tx.commit().await?;

        Ok(appointment)
    }

    /// Refund (or void) the charge, then cancel and reopen the slot. Nothing
    /// is committed unless the gateway confirmed the money went back.
    #[instrument(skip(self))]
    pub async fn cancel_appointment(&self, appointment_id: Uuid, user_id: Uuid) -> Result<(), AppointmentError> {
        let mut tx = self.store.begin().await?;

        let slot_id = tx
            .find_appointment(appointment_id, user_id)
            .await?
            .ok_or(AppointmentError::AppointmentNotFound)?
            .slot_id;

        // Slot before appointment, same order as rollover.
        let mut slot = tx.lock_slot(slot_id).await?.ok_or(AppointmentError::SlotNotFound)?;
        let mut appointment = tx
            .lock_appointment(appointment_id, user_id)
            .await?
            .ok_or(AppointmentError::AppointmentNotFound)?;

        self.lifecycle.ensure_cancellable(&appointment)?;

        let refunded = match &appointment.transaction_id {
            Some(transaction_id) => {
                let receipt = PaymentReceipt {
                    transaction_id: transaction_id.clone(),
                    amount_minor: self.appointment_price_minor,
                    order_id: appointment.id.to_string(),
                };
                let outcome = self.reconciler.refund_or_void(&receipt).await?;
                debug!("Gateway settled cancellation with transaction {}", outcome.transaction().id);
                true
            }
            None => {
                debug!("Appointment {} was never charged, cancelling without refund", appointment.id);
                false
            }
        };

        self.lifecycle.finalize_cancellation(&mut appointment, &mut slot, refunded)?;
        tx.save_appointment(&appointment).await?;
        tx.save_slot(&slot).await?;

        if let Err(e) = tx.commit().await {
            if refunded {
                error!(
                    "Appointment {} refunded at gateway but cancellation failed to commit: {}",
                    appointment.id, e
                );
            }
            return Err(e.into());
        }

        Ok(())
    }

    // ==========================================================================
    // PAYMENT
    // ==========================================================================

    /// Charge the consultation price and bind the transaction to the appointment.
    #[instrument(skip(self, payment_method_nonce))]
    pub async fn pay_for_appointment(
        &self,
        appointment_id: Uuid,
        user_id: Uuid,
        payment_method_nonce: &str,
    ) -> Result<Appointment, AppointmentError> {
        {
            let mut tx = self.store.begin().await?;
            let appointment = tx
                .find_appointment(appointment_id, user_id)
                .await?
                .ok_or(AppointmentError::AppointmentNotFound)?;
            self.lifecycle.ensure_payable(&appointment)?;
        }

        self.ensure_customer(user_id).await?;

        let mut tx = self.store.begin().await?;
        let mut appointment = tx
            .lock_appointment(appointment_id, user_id)
            .await?
            .ok_or(AppointmentError::AppointmentNotFound)?;
        self.lifecycle.ensure_payable(&appointment)?;

        let transaction = self
            .reconciler
            .charge(payment_method_nonce, self.appointment_price_minor, &appointment.id.to_string())
            .await?;

        self.lifecycle.bind_transaction(&mut appointment, &transaction.id)?;
        tx.save_appointment(&appointment).await?;

        if let Err(e) = tx.commit().await {
            error!(
                "Transaction {} charged for appointment {} but binding failed to commit: {}",
                transaction.id, appointment.id, e
            );
            return Err(e.into());
        }

        info!("Appointment {} paid with transaction {}", appointment.id, transaction.id);
        Ok(appointment)
    }

    /// Client-side token for the user's gateway customer profile.
    #[instrument(skip(self))]
    pub async fn client_token(&self, user_id: Uuid) -> Result<String, AppointmentError> {
        let customer_id = self.ensure_customer(user_id).await?;
        Ok(self.reconciler.client_token(&customer_id).await?)
    }

    /// Resolve the user's customer profile, persisting a freshly created id
    /// or clearing one the gateway no longer knows.
    async fn ensure_customer(&self, user_id: Uuid) -> Result<String, AppointmentError> {
        let mut tx = self.store.begin().await?;
        let user = tx.find_user(user_id).await?.ok_or(AppointmentError::UserNotFound)?;

        match self.reconciler.resolve_customer(&user).await? {
            CustomerResolution::Existing(customer_id) => Ok(customer_id),
            CustomerResolution::Created(customer_id) => {
                tx.set_customer_id(user_id, Some(&customer_id)).await?;
                tx.commit().await?;
                Ok(customer_id)
            }
            CustomerResolution::Missing => {
                warn!("Clearing stale customer profile for user {}", user_id);
                tx.set_customer_id(user_id, None).await?;
                tx.commit().await?;
                Err(PaymentError::message("Customer profile not found at payment gateway").into())
            }
        }
    }

    // ==========================================================================
    // ROLLOVER
    // ==========================================================================

    pub async fn roll_over_elapsed_slots(
        &self,
        doctor_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        self.rollover.roll_over_elapsed_slots(doctor_id, now).await
    }

    pub async fn roll_over_all_doctors(&self, now: DateTime<Utc>) -> Result<Vec<Appointment>, AppointmentError> {
        self.rollover.roll_over_all_doctors(now).await
    }

    // ==========================================================================
    // LISTING
    // ==========================================================================

    pub async fn list_appointments(&self, user_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        let mut tx = self.store.begin().await?;
        Ok(tx.appointments_for_user(user_id).await?)
    }

    /// The doctor's slots in weekly order, each with its next occurrence date.
    pub async fn doctor_schedule(
        &self,
        doctor_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<SlotOccurrence>, AppointmentError> {
        let mut tx = self.store.begin().await?;
        let slots = tx.slots_for_doctor(doctor_id).await?;
        Ok(self.calendar.weekly_schedule(&slots, &now))
    }
}
