// libs/appointment-cell/src/store/mod.rs
//
// Storage seam for booking state. Every mutation happens inside a
// `BookingTransaction`; dropping one without `commit` discards its writes.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use doctor_cell::ScheduleSlot;
use shared_models::User;

use crate::models::{Appointment, AppointmentError};

pub use memory::InMemoryBookingStore;
pub use postgres::PostgresBookingStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Constraint violated: {0}")]
    Conflict(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Record missing: {0}")]
    Missing(String),
}

impl From<StoreError> for AppointmentError {
    fn from(err: StoreError) -> Self {
        AppointmentError::Storage(err.to_string())
    }
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn BookingTransaction>, StoreError>;

    /// Every doctor that owns at least one schedule slot.
    async fn doctors_with_slots(&self) -> Result<Vec<Uuid>, StoreError>;
}

/// A scoped unit of work. `lock_*` reads hold the row until the transaction
/// ends, so read-modify-write sequences on the same row serialize.
#[async_trait]
pub trait BookingTransaction: Send {
    async fn lock_slot(&mut self, slot_id: Uuid) -> Result<Option<ScheduleSlot>, StoreError>;

    async fn slots_for_doctor(&mut self, doctor_id: Uuid) -> Result<Vec<ScheduleSlot>, StoreError>;

    /// Persists the slot's `enabled` flag.
    async fn save_slot(&mut self, slot: &ScheduleSlot) -> Result<(), StoreError>;

    async fn find_appointment(
        &mut self,
        appointment_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Appointment>, StoreError>;

    async fn lock_appointment(
        &mut self,
        appointment_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Appointment>, StoreError>;

    async fn live_appointments_for_slot(&mut self, slot_id: Uuid) -> Result<Vec<Appointment>, StoreError>;

    async fn appointments_for_user(&mut self, user_id: Uuid) -> Result<Vec<Appointment>, StoreError>;

    /// Fails with `StoreError::Conflict` if the slot already has a live appointment.
    async fn insert_appointment(&mut self, appointment: &Appointment) -> Result<(), StoreError>;

    async fn save_appointment(&mut self, appointment: &Appointment) -> Result<(), StoreError>;

    async fn find_user(&mut self, user_id: Uuid) -> Result<Option<User>, StoreError>;

    async fn set_customer_id(&mut self, user_id: Uuid, customer_id: Option<&str>) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
