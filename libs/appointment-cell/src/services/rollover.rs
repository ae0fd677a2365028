// libs/appointment-cell/src/services/rollover.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use doctor_cell::{ScheduleSlot, SlotCalendar};

use crate::models::{Appointment, AppointmentError};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::store::BookingStore;

/// Reopens elapsed weekly slots and completes the appointments that held
/// them. Needs no payment gateway, so the scheduler binary runs it on its own.
pub struct RolloverService {
    store: Arc<dyn BookingStore>,
    lifecycle: AppointmentLifecycleService,
    calendar: SlotCalendar,
}

impl RolloverService {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self {
            store,
            lifecycle: AppointmentLifecycleService::new(),
            calendar: SlotCalendar::new(),
        }
    }

    /// Each due slot rolls over in its own transaction. A slot that fails is
    /// logged and skipped; the doctor's remaining slots still roll over.
    #[instrument(skip(self))]
    pub async fn roll_over_elapsed_slots(
        &self,
        doctor_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let slots = {
            let mut tx = self.store.begin().await?;
            let slots = tx.slots_for_doctor(doctor_id).await?;
            tx.commit().await?;
            slots
        };

        let due = self.calendar.due_for_rollover(&slots, &now);
        debug!("{} of {} slots due for rollover for doctor {}", due.len(), slots.len(), doctor_id);

        let mut completed = Vec::new();
        for slot in due {
            match self.roll_over_slot(&slot, now).await {
                Ok(mut done) => completed.append(&mut done),
                Err(e) => warn!("Rollover of slot {} failed, skipping: {}", slot.id, e),
            }
        }

        info!("Rollover for doctor {} completed {} appointments", doctor_id, completed.len());
        Ok(completed)
    }

    /// One pass over every doctor that owns slots.
    pub async fn roll_over_all_doctors(&self, now: DateTime<Utc>) -> Result<Vec<Appointment>, AppointmentError> {
        let doctors = self.store.doctors_with_slots().await?;

        let mut completed = Vec::new();
        for doctor_id in doctors {
            match self.roll_over_elapsed_slots(doctor_id, now).await {
                Ok(mut done) => completed.append(&mut done),
                Err(e) => warn!("Rollover for doctor {} failed: {}", doctor_id, e),
            }
        }

        Ok(completed)
    }

    async fn roll_over_slot(
        &self,
        slot: &ScheduleSlot,
        now: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let mut tx = self.store.begin().await?;

        let mut locked = tx.lock_slot(slot.id).await?.ok_or(AppointmentError::SlotNotFound)?;

        let mut completed = Vec::new();
        for mut appointment in tx.live_appointments_for_slot(locked.id).await? {
            self.lifecycle.complete(&mut appointment)?;
            tx.save_appointment(&appointment).await?;
            completed.push(appointment);
        }

        locked.enabled = true;
        tx.save_slot(&locked).await?;
        tx.commit().await?;

        info!(
            "Slot {} reopened for {}",
            locked.id,
            self.calendar.next_occurrence(&locked, &now)
        );
        Ok(completed)
    }
}
