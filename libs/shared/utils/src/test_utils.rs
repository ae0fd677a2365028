use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, TimeZone, Utc, Weekday};
use mockall::mock;
use uuid::Uuid;

use doctor_cell::ScheduleSlot;
use payment_cell::{
    CustomerProfile, GatewayFailure, GatewayResult, PaymentGateway, PaymentReceipt, Transaction,
    UNSETTLED_REFUND_MESSAGE,
};
use shared_config::AppConfig;
use shared_models::User;

pub struct TestConfig {
    pub gateway_timeout_secs: u64,
    pub appointment_price_minor: i64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            gateway_timeout_secs: 5,
            appointment_price_minor: 30_000,
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            database_url: "postgres://localhost:5432/clinic_test".to_string(),
            payment_gateway_timeout_secs: self.gateway_timeout_secs,
            appointment_price_minor: self.appointment_price_minor,
            ..AppConfig::default()
        }
    }

    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_secs)
    }
}

pub struct TestUser;

impl TestUser {
    pub fn patient(email: &str) -> User {
        let mut user = User::new(email);
        user.first_name = Some("Test".to_string());
        user.last_name = Some("Patient".to_string());
        user
    }

    pub fn with_customer(email: &str, customer_id: &str) -> User {
        let mut user = Self::patient(email);
        user.customer_id = Some(customer_id.to_string());
        user
    }
}

pub struct TestSlot;

impl TestSlot {
    /// One-hour slot starting at `hour`; the last slot of the day ends at 23:59:59.
    pub fn open(doctor_id: Uuid, day: Weekday, hour: u32) -> ScheduleSlot {
        let start = NaiveTime::from_hms_opt(hour, 0, 0).unwrap();
        let end = NaiveTime::from_hms_opt(hour + 1, 0, 0)
            .unwrap_or_else(|| NaiveTime::from_hms_opt(23, 59, 59).unwrap());
        ScheduleSlot::new(doctor_id, day, start, end)
    }

    pub fn closed(doctor_id: Uuid, day: Weekday, hour: u32) -> ScheduleSlot {
        let mut slot = Self::open(doctor_id, day, hour);
        slot.enabled = false;
        slot
    }
}

/// Fixed instants with a known weekday, for rollover tests.
pub struct TestClock;

impl TestClock {
    /// 2024-01-03, a Wednesday (ordinal 3).
    pub fn wednesday() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 3, 12, 0, 0).unwrap()
    }

    /// 2024-01-07, a Sunday (ordinal 0).
    pub fn sunday() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 7, 12, 0, 0).unwrap()
    }
}

pub struct GatewayFixtures;

impl GatewayFixtures {
    pub fn transaction(id: &str, amount_minor: i64, order_id: &str) -> Transaction {
        Transaction {
            id: id.to_string(),
            amount_minor,
            order_id: order_id.to_string(),
        }
    }

    pub fn refunded(receipt: &PaymentReceipt) -> GatewayResult<Transaction> {
        GatewayResult::Success(Self::transaction(
            &format!("refund_{}", receipt.transaction_id),
            receipt.amount_minor,
            &receipt.order_id,
        ))
    }

    pub fn voided(transaction_id: &str) -> GatewayResult<Transaction> {
        GatewayResult::Success(Self::transaction(transaction_id, 0, ""))
    }

    pub fn unsettled_refund_failure() -> GatewayResult<Transaction> {
        GatewayResult::Failure(
            GatewayFailure::new(UNSETTLED_REFUND_MESSAGE).with_error(
                UNSETTLED_REFUND_MESSAGE,
                "91506",
                "base",
            ),
        )
    }

    pub fn failure(message: &str, code: &str, attribute: &str) -> GatewayFailure {
        GatewayFailure::new(message).with_error(message, code, attribute)
    }

    pub fn customer(id: &str) -> CustomerProfile {
        CustomerProfile { id: id.to_string() }
    }
}

mock! {
    pub Gateway {}

    #[async_trait]
    impl PaymentGateway for Gateway {
        async fn charge(
            &self,
            payment_method_nonce: &str,
            amount_minor: i64,
            order_id: &str,
        ) -> Result<GatewayResult<Transaction>>;

        async fn refund(&self, receipt: &PaymentReceipt) -> Result<GatewayResult<Transaction>>;

        async fn void(&self, transaction_id: &str) -> Result<GatewayResult<Transaction>>;

        async fn create_customer_profile(&self, user: &User) -> Result<GatewayResult<CustomerProfile>>;

        async fn find_customer_profile(&self, customer_id: &str) -> Result<Option<CustomerProfile>>;

        async fn generate_client_token(&self, customer_id: &str) -> Result<GatewayResult<String>>;
    }
}
