// libs/appointment-cell/src/store/postgres.rs
use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use sqlx::{PgPool, Postgres};
use tracing::{debug, info};
use uuid::Uuid;

use doctor_cell::{weekday_from_ordinal, ScheduleSlot};
use shared_config::AppConfig;
use shared_models::User;

use crate::models::{Appointment, AppointmentStatus};
use crate::store::{BookingStore, BookingTransaction, StoreError};

const SLOT_COLUMNS: &str = "id, doctor_id, day_of_week, start_time, end_time, enabled";
const APPOINTMENT_COLUMNS: &str = "id, created_at, status, transaction_id, refunded, user_id, slot_id";

/// Postgres-backed store. Each `BookingTransaction` wraps one database
/// transaction; row locks come from `SELECT ... FOR UPDATE`.
#[derive(Clone)]
pub struct PostgresBookingStore {
    pool: PgPool,
}

impl PostgresBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect using the application config and bring the schema up to date.
    pub async fn connect(config: &AppConfig) -> anyhow::Result<Self> {
        let pool = shared_database::connect(config).await?;
        shared_database::run_migrations(&pool).await?;
        info!("Postgres booking store ready");
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl BookingStore for PostgresBookingStore {
    async fn begin(&self) -> Result<Box<dyn BookingTransaction>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresTransaction { tx }))
    }

    async fn doctors_with_slots(&self) -> Result<Vec<Uuid>, StoreError> {
        let doctors = sqlx::query_scalar::<_, Uuid>(
            "SELECT DISTINCT doctor_id FROM schedule_slots ORDER BY doctor_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(doctors)
    }
}

// ==============================================================================
// ROW MAPPING
// ==============================================================================

#[derive(Debug, sqlx::FromRow)]
struct SlotRow {
    id: Uuid,
    doctor_id: Uuid,
    day_of_week: i16,
    start_time: NaiveTime,
    end_time: NaiveTime,
    enabled: bool,
}

impl TryFrom<SlotRow> for ScheduleSlot {
    type Error = StoreError;

    fn try_from(row: SlotRow) -> Result<Self, Self::Error> {
        let day = weekday_from_ordinal(row.day_of_week).ok_or_else(|| {
            StoreError::Corrupt(format!("slot {} has day_of_week {}", row.id, row.day_of_week))
        })?;

        Ok(ScheduleSlot {
            id: row.id,
            doctor_id: row.doctor_id,
            day,
            start_time: row.start_time,
            end_time: row.end_time,
            enabled: row.enabled,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AppointmentRow {
    id: Uuid,
    created_at: DateTime<Utc>,
    status: String,
    transaction_id: Option<String>,
    refunded: bool,
    user_id: Uuid,
    slot_id: Uuid,
}

impl TryFrom<AppointmentRow> for Appointment {
    type Error = StoreError;

    fn try_from(row: AppointmentRow) -> Result<Self, Self::Error> {
        let status = AppointmentStatus::parse(&row.status).ok_or_else(|| {
            StoreError::Corrupt(format!("appointment {} has status '{}'", row.id, row.status))
        })?;

        Ok(Appointment {
            id: row.id,
            created_at: row.created_at,
            status,
            transaction_id: row.transaction_id,
            refunded: row.refunded,
            user_id: row.user_id,
            slot_id: row.slot_id,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    phone: Option<String>,
    customer_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            customer_id: row.customer_id,
            created_at: row.created_at,
        }
    }
}

fn appointments_from_rows(rows: Vec<AppointmentRow>) -> Result<Vec<Appointment>, StoreError> {
    rows.into_iter().map(Appointment::try_from).collect()
}

fn expect_one_row(affected: u64, what: String) -> Result<(), StoreError> {
    if affected == 0 {
        return Err(StoreError::Missing(what));
    }
    Ok(())
}

// ==============================================================================
// TRANSACTION
// ==============================================================================

struct PostgresTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl BookingTransaction for PostgresTransaction {
    async fn lock_slot(&mut self, slot_id: Uuid) -> Result<Option<ScheduleSlot>, StoreError> {
        let row = sqlx::query_as::<_, SlotRow>(&format!(
            "SELECT {} FROM schedule_slots WHERE id = $1 FOR UPDATE",
            SLOT_COLUMNS
        ))
        .bind(slot_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(ScheduleSlot::try_from).transpose()
    }

    async fn slots_for_doctor(&mut self, doctor_id: Uuid) -> Result<Vec<ScheduleSlot>, StoreError> {
        let rows = sqlx::query_as::<_, SlotRow>(&format!(
            "SELECT {} FROM schedule_slots WHERE doctor_id = $1 ORDER BY day_of_week, start_time",
            SLOT_COLUMNS
        ))
        .bind(doctor_id)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(ScheduleSlot::try_from).collect()
    }

    async fn save_slot(&mut self, slot: &ScheduleSlot) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE schedule_slots SET enabled = $2 WHERE id = $1")
            .bind(slot.id)
            .bind(slot.enabled)
            .execute(&mut *self.tx)
            .await?;

        expect_one_row(result.rows_affected(), format!("schedule slot {}", slot.id))
    }

    async fn find_appointment(
        &mut self,
        appointment_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Appointment>, StoreError> {
        let row = sqlx::query_as::<_, AppointmentRow>(&format!(
            "SELECT {} FROM appointments WHERE id = $1 AND user_id = $2",
            APPOINTMENT_COLUMNS
        ))
        .bind(appointment_id)
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(Appointment::try_from).transpose()
    }

    async fn lock_appointment(
        &mut self,
        appointment_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Appointment>, StoreError> {
        let row = sqlx::query_as::<_, AppointmentRow>(&format!(
            "SELECT {} FROM appointments WHERE id = $1 AND user_id = $2 FOR UPDATE",
            APPOINTMENT_COLUMNS
        ))
        .bind(appointment_id)
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(Appointment::try_from).transpose()
    }

    async fn live_appointments_for_slot(&mut self, slot_id: Uuid) -> Result<Vec<Appointment>, StoreError> {
        let rows = sqlx::query_as::<_, AppointmentRow>(&format!(
            "SELECT {} FROM appointments WHERE slot_id = $1 AND status = $2 FOR UPDATE",
            APPOINTMENT_COLUMNS
        ))
        .bind(slot_id)
        .bind(AppointmentStatus::Created.as_str())
        .fetch_all(&mut *self.tx)
        .await?;

        appointments_from_rows(rows)
    }

    async fn appointments_for_user(&mut self, user_id: Uuid) -> Result<Vec<Appointment>, StoreError> {
        let rows = sqlx::query_as::<_, AppointmentRow>(&format!(
            "SELECT {} FROM appointments WHERE user_id = $1 ORDER BY created_at DESC",
            APPOINTMENT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await?;

        appointments_from_rows(rows)
    }

    async fn insert_appointment(&mut self, appointment: &Appointment) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO appointments (id, created_at, status, transaction_id, refunded, user_id, slot_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(appointment.id)
        .bind(appointment.created_at)
        .bind(appointment.status.as_str())
        .bind(appointment.transaction_id.as_deref())
        .bind(appointment.refunded)
        .bind(appointment.user_id)
        .bind(appointment.slot_id)
        .execute(&mut *self.tx)
        .await;

        match result {
            Ok(_) => {
                debug!("Inserted appointment {}", appointment.id);
                Ok(())
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(StoreError::Conflict(
                format!("slot {} already has a live appointment", appointment.slot_id),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn save_appointment(&mut self, appointment: &Appointment) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE appointments SET status = $2, transaction_id = $3, refunded = $4 WHERE id = $1",
        )
        .bind(appointment.id)
        .bind(appointment.status.as_str())
        .bind(appointment.transaction_id.as_deref())
        .bind(appointment.refunded)
        .execute(&mut *self.tx)
        .await?;

        expect_one_row(result.rows_affected(), format!("appointment {}", appointment.id))
    }

    async fn find_user(&mut self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, first_name, last_name, phone, customer_id, created_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(User::from))
    }

    async fn set_customer_id(&mut self, user_id: Uuid, customer_id: Option<&str>) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET customer_id = $2 WHERE id = $1")
            .bind(user_id)
            .bind(customer_id)
            .execute(&mut *self.tx)
            .await?;

        expect_one_row(result.rows_affected(), format!("user {}", user_id))
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}
