// libs/appointment-cell/src/store/memory.rs
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

use doctor_cell::ScheduleSlot;
use shared_models::User;

use crate::models::Appointment;
use crate::store::{BookingStore, BookingTransaction, StoreError};

#[derive(Debug, Default, Clone)]
struct Tables {
    slots: HashMap<Uuid, ScheduleSlot>,
    appointments: HashMap<Uuid, Appointment>,
    users: HashMap<Uuid, User>,
}

/// Process-local store. A transaction owns the single table lock for its
/// whole lifetime and works on a staged copy, so transactions are fully
/// serialized and an uncommitted one leaves no trace.
#[derive(Debug, Default, Clone)]
pub struct InMemoryBookingStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_slot(&self, slot: ScheduleSlot) {
        self.tables.lock().await.slots.insert(slot.id, slot);
    }

    pub async fn insert_user(&self, user: User) {
        self.tables.lock().await.users.insert(user.id, user);
    }

    pub async fn slot(&self, slot_id: Uuid) -> Option<ScheduleSlot> {
        self.tables.lock().await.slots.get(&slot_id).cloned()
    }

    pub async fn appointment(&self, appointment_id: Uuid) -> Option<Appointment> {
        self.tables.lock().await.appointments.get(&appointment_id).cloned()
    }

    pub async fn user(&self, user_id: Uuid) -> Option<User> {
        self.tables.lock().await.users.get(&user_id).cloned()
    }

    pub async fn appointment_count(&self) -> usize {
        self.tables.lock().await.appointments.len()
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn begin(&self) -> Result<Box<dyn BookingTransaction>, StoreError> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(InMemoryTransaction { guard, staged }))
    }

    async fn doctors_with_slots(&self) -> Result<Vec<Uuid>, StoreError> {
        let tables = self.tables.lock().await;
        let mut doctors: Vec<Uuid> = tables.slots.values().map(|s| s.doctor_id).collect();
        doctors.sort();
        doctors.dedup();
        Ok(doctors)
    }
}

struct InMemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    staged: Tables,
}

#[async_trait]
impl BookingTransaction for InMemoryTransaction {
    async fn lock_slot(&mut self, slot_id: Uuid) -> Result<Option<ScheduleSlot>, StoreError> {
        Ok(self.staged.slots.get(&slot_id).cloned())
    }

    async fn slots_for_doctor(&mut self, doctor_id: Uuid) -> Result<Vec<ScheduleSlot>, StoreError> {
        let mut slots: Vec<ScheduleSlot> = self
            .staged
            .slots
            .values()
            .filter(|s| s.doctor_id == doctor_id)
            .cloned()
            .collect();
        slots.sort_by_key(|s| (s.day_ordinal(), s.start_time));
        Ok(slots)
    }

    async fn save_slot(&mut self, slot: &ScheduleSlot) -> Result<(), StoreError> {
        match self.staged.slots.get_mut(&slot.id) {
            Some(existing) => {
                existing.enabled = slot.enabled;
                Ok(())
            }
            None => Err(StoreError::Missing(format!("schedule slot {}", slot.id))),
        }
    }

    async fn find_appointment(
        &mut self,
        appointment_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Appointment>, StoreError> {
        Ok(self
            .staged
            .appointments
            .get(&appointment_id)
            .filter(|a| a.user_id == user_id)
            .cloned())
    }

    async fn lock_appointment(
        &mut self,
        appointment_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Appointment>, StoreError> {
        self.find_appointment(appointment_id, user_id).await
    }

    async fn live_appointments_for_slot(&mut self, slot_id: Uuid) -> Result<Vec<Appointment>, StoreError> {
        Ok(self
            .staged
            .appointments
            .values()
            .filter(|a| a.slot_id == slot_id && a.is_live())
            .cloned()
            .collect())
    }

    async fn appointments_for_user(&mut self, user_id: Uuid) -> Result<Vec<Appointment>, StoreError> {
        let mut appointments: Vec<Appointment> = self
            .staged
            .appointments
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        appointments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(appointments)
    }

    async fn insert_appointment(&mut self, appointment: &Appointment) -> Result<(), StoreError> {
        if !self.staged.slots.contains_key(&appointment.slot_id) {
            return Err(StoreError::Missing(format!("schedule slot {}", appointment.slot_id)));
        }

        let slot_taken = self
            .staged
            .appointments
            .values()
            .any(|a| a.slot_id == appointment.slot_id && a.is_live());
        if appointment.is_live() && slot_taken {
            return Err(StoreError::Conflict(format!(
                "slot {} already has a live appointment",
                appointment.slot_id
            )));
        }

        self.staged.appointments.insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn save_appointment(&mut self, appointment: &Appointment) -> Result<(), StoreError> {
        match self.staged.appointments.get_mut(&appointment.id) {
            Some(existing) => {
                *existing = appointment.clone();
                Ok(())
            }
            None => Err(StoreError::Missing(format!("appointment {}", appointment.id))),
        }
    }

    async fn find_user(&mut self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.staged.users.get(&user_id).cloned())
    }

    async fn set_customer_id(&mut self, user_id: Uuid, customer_id: Option<&str>) -> Result<(), StoreError> {
        match self.staged.users.get_mut(&user_id) {
            Some(user) => {
                user.customer_id = customer_id.map(str::to_string);
                Ok(())
            }
            None => Err(StoreError::Missing(format!("user {}", user_id))),
        }
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let InMemoryTransaction { mut guard, staged } = *self;
        *guard = staged;
        debug!("In-memory transaction committed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Utc, Weekday};

    fn slot() -> ScheduleSlot {
        ScheduleSlot::new(
            Uuid::new_v4(),
            Weekday::Mon,
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_dropped_transaction_discards_writes() {
        let store = InMemoryBookingStore::new();
        let mut s = slot();
        store.insert_slot(s.clone()).await;

        {
            let mut tx = store.begin().await.unwrap();
            s.enabled = false;
            tx.save_slot(&s).await.unwrap();
        }

        assert!(store.slot(s.id).await.unwrap().enabled);
    }

    #[tokio::test]
    async fn test_committed_transaction_publishes_writes() {
        let store = InMemoryBookingStore::new();
        let mut s = slot();
        store.insert_slot(s.clone()).await;

        let mut tx = store.begin().await.unwrap();
        s.enabled = false;
        tx.save_slot(&s).await.unwrap();
        tx.commit().await.unwrap();

        assert!(!store.slot(s.id).await.unwrap().enabled);
    }

    #[tokio::test]
    async fn test_second_live_appointment_on_slot_conflicts() {
        let store = InMemoryBookingStore::new();
        let s = slot();
        store.insert_slot(s.clone()).await;

        let mut tx = store.begin().await.unwrap();
        tx.insert_appointment(&Appointment::new(Uuid::new_v4(), s.id, Utc::now()))
            .await
            .unwrap();
        let second = tx
            .insert_appointment(&Appointment::new(Uuid::new_v4(), s.id, Utc::now()))
            .await;

        assert!(matches!(second, Err(StoreError::Conflict(_))));
    }
}
