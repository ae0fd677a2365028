// libs/payment-cell/src/services/gateway.rs
use anyhow::Result;
use async_trait::async_trait;

use shared_models::User;

use crate::models::{CustomerProfile, GatewayResult, PaymentReceipt, Transaction};

/// Top-level refund failure message for a charge that has not settled yet.
/// Such charges have to be voided instead.
pub const UNSETTLED_REFUND_MESSAGE: &str = "Cannot refund transaction unless it is settled.";

/// Remote payment gateway. `Err` means the call itself failed (network,
/// serialization); a gateway-side rejection is `Ok(GatewayResult::Failure)`.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
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
