// libs/payment-cell/src/services/reconciler.rs
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, instrument, warn};

use shared_config::AppConfig;
use shared_models::User;

use crate::models::{
    CustomerResolution, GatewayResult, PaymentError, PaymentReceipt, RefundOutcome, Transaction,
};
use crate::services::gateway::{PaymentGateway, UNSETTLED_REFUND_MESSAGE};

/// Sequences charge and refund flows against the gateway and maps every
/// outcome to a typed result. Holds no state besides the gateway handle, so a
/// failed call can be retried by the caller as-is.
pub struct PaymentReconciler {
    gateway: Arc<dyn PaymentGateway>,
    timeout: Duration,
}

impl PaymentReconciler {
    pub fn new(gateway: Arc<dyn PaymentGateway>, config: &AppConfig) -> Self {
        Self::with_timeout(gateway, config.payment_gateway_timeout())
    }

    pub fn with_timeout(gateway: Arc<dyn PaymentGateway>, timeout: Duration) -> Self {
        Self { gateway, timeout }
    }

    /// Charge a payment method. On success the caller binds the returned
    /// transaction id to the appointment; on failure nothing is rolled back here.
    #[instrument(skip(self, payment_method_nonce))]
    pub async fn charge(
        &self,
        payment_method_nonce: &str,
        amount_minor: i64,
        order_id: &str,
    ) -> Result<Transaction, PaymentError> {
        debug!("Charging {} for order {}", amount_minor, order_id);

        let result = self
            .bounded("charge", self.gateway.charge(payment_method_nonce, amount_minor, order_id))
            .await?;

        match result {
            GatewayResult::Success(transaction) => {
                info!("Charge succeeded: transaction {}", transaction.id);
                Ok(transaction)
            }
            GatewayResult::Failure(failure) => {
                warn!("Charge rejected for order {}: {}", order_id, failure.message);
                Err(PaymentError::from_failure(&failure))
            }
        }
    }

    /// Refund a charge, voiding it instead when the gateway reports it as not
    /// yet settled. Any other refund rejection is final and void is not tried.
    #[instrument(skip(self), fields(transaction_id = %receipt.transaction_id))]
    pub async fn refund_or_void(&self, receipt: &PaymentReceipt) -> Result<RefundOutcome, PaymentError> {
        let refund_failure = match self.bounded("refund", self.gateway.refund(receipt)).await? {
            GatewayResult::Success(transaction) => {
                info!("Refund succeeded for transaction {}", receipt.transaction_id);
                return Ok(RefundOutcome::Refunded(transaction));
            }
            GatewayResult::Failure(failure) => failure,
        };

        let refund_error = PaymentError::from_failure(&refund_failure);

        if refund_failure.message != UNSETTLED_REFUND_MESSAGE {
            warn!("Refund rejected for transaction {}: {}", receipt.transaction_id, refund_failure.message);
            return Err(refund_error);
        }

        info!("Transaction {} not settled, attempting void", receipt.transaction_id);

        match self.bounded("void", self.gateway.void(&receipt.transaction_id)).await {
            Ok(GatewayResult::Success(transaction)) => {
                info!("Void succeeded for transaction {}", receipt.transaction_id);
                Ok(RefundOutcome::Voided(transaction))
            }
            Ok(GatewayResult::Failure(void_failure)) => {
                error!(
                    "Refund and void both failed for transaction {}: {}",
                    receipt.transaction_id, void_failure.message
                );
                Err(refund_error.merge(PaymentError::from_failure(&void_failure)))
            }
            Err(void_error) => Err(refund_error.merge(void_error)),
        }
    }

    /// Make sure the user has a usable customer profile at the gateway.
    pub async fn resolve_customer(&self, user: &User) -> Result<CustomerResolution, PaymentError> {
        match &user.customer_id {
            None => {
                debug!("Creating customer profile for {}", user.full_name());
                match self
                    .bounded("create customer profile", self.gateway.create_customer_profile(user))
                    .await?
                {
                    GatewayResult::Success(profile) => {
                        info!("Customer profile {} created for user {}", profile.id, user.id);
                        Ok(CustomerResolution::Created(profile.id))
                    }
                    GatewayResult::Failure(failure) => {
                        warn!("Customer profile creation rejected for user {}: {}", user.id, failure.message);
                        Err(PaymentError::from_failure(&failure))
                    }
                }
            }
            Some(customer_id) => {
                let found = self
                    .bounded("find customer profile", self.gateway.find_customer_profile(customer_id))
                    .await?;

                match found {
                    Some(profile) => Ok(CustomerResolution::Existing(profile.id)),
                    None => {
                        warn!("Customer profile {} unknown to gateway for user {}", customer_id, user.id);
                        Ok(CustomerResolution::Missing)
                    }
                }
            }
        }
    }

    pub async fn client_token(&self, customer_id: &str) -> Result<String, PaymentError> {
        match self
            .bounded("generate client token", self.gateway.generate_client_token(customer_id))
            .await?
        {
            GatewayResult::Success(token) => Ok(token),
            GatewayResult::Failure(failure) => Err(PaymentError::from_failure(&failure)),
        }
    }

    /// Apply the timeout and fold transport faults into a `PaymentError`.
    async fn bounded<T, F>(&self, operation: &str, call: F) -> Result<T, PaymentError>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                error!("Gateway {} transport error: {}", operation, e);
                Err(PaymentError::transport(operation, e))
            }
            Err(_) => {
                error!("Gateway {} timed out after {:?}", operation, self.timeout);
                Err(PaymentError::transport(
                    operation,
                    format!("timed out after {}s", self.timeout.as_secs_f64()),
                ))
            }
        }
    }
}
