use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use assert_matches::assert_matches;
use async_trait::async_trait;

use payment_cell::*;
use shared_models::User;
use shared_utils::test_utils::{GatewayFixtures, MockGateway, TestConfig, TestUser};

fn receipt() -> PaymentReceipt {
    PaymentReceipt {
        transaction_id: "tx_1".to_string(),
        amount_minor: 30_000,
        order_id: "order_1".to_string(),
    }
}

fn reconciler(gateway: MockGateway) -> PaymentReconciler {
    PaymentReconciler::with_timeout(Arc::new(gateway), TestConfig::default().gateway_timeout())
}

#[tokio::test]
async fn test_charge_success_returns_transaction() {
    let mut gateway = MockGateway::new();
    gateway
        .expect_charge()
        .times(1)
        .returning(|_, amount, order| Ok(GatewayResult::Success(GatewayFixtures::transaction("tx_9", amount, order))));

    let transaction = reconciler(gateway)
        .charge("fake-valid-nonce", 30_000, "order_1")
        .await
        .expect("charge should succeed");

    assert_eq!(transaction.id, "tx_9");
    assert_eq!(transaction.amount_minor, 30_000);
    assert_eq!(transaction.order_id, "order_1");
}

#[tokio::test]
async fn test_charge_failure_returns_gateway_entries() {
    let mut gateway = MockGateway::new();
    gateway.expect_charge().times(1).returning(|_, _, _| {
        Ok(GatewayResult::Failure(GatewayFixtures::failure(
            "Payment method nonce is invalid.",
            "91565",
            "paymentMethodNonce",
        )))
    });

    let error = reconciler(gateway)
        .charge("bad-nonce", 30_000, "order_1")
        .await
        .unwrap_err();

    assert_eq!(error.errors.len(), 1);
    assert_eq!(error.errors[0].code, "91565");
    assert_eq!(error.errors[0].attribute, "paymentMethodNonce");
    assert_eq!(error.messages, vec!["Payment method nonce is invalid.".to_string()]);
}

#[tokio::test]
async fn test_refund_success_never_voids() {
    let mut gateway = MockGateway::new();
    gateway
        .expect_refund()
        .times(1)
        .returning(|r| Ok(GatewayFixtures::refunded(r)));
    gateway.expect_void().never();

    let outcome = reconciler(gateway).refund_or_void(&receipt()).await.unwrap();

    assert_matches!(outcome, RefundOutcome::Refunded(_));
    assert_eq!(outcome.transaction().amount_minor, 30_000);
}

#[tokio::test]
async fn test_unsettled_refund_falls_back_to_void() {
    let mut gateway = MockGateway::new();
    gateway
        .expect_refund()
        .times(1)
        .returning(|_| Ok(GatewayFixtures::unsettled_refund_failure()));
    gateway.expect_void().times(1).returning(|transaction_id| {
        assert_eq!(transaction_id.to_string(), "tx_1");
        Ok(GatewayFixtures::voided("tx_1"))
    });

    let outcome = reconciler(gateway).refund_or_void(&receipt()).await.unwrap();

    assert_matches!(outcome, RefundOutcome::Voided(ref tx) if tx.id == "tx_1");
}

#[tokio::test]
async fn test_unsettled_refund_and_failed_void_combines_errors() {
    let mut gateway = MockGateway::new();
    gateway
        .expect_refund()
        .times(1)
        .returning(|_| Ok(GatewayFixtures::unsettled_refund_failure()));
    gateway.expect_void().times(1).returning(|_| {
        Ok(GatewayResult::Failure(GatewayFixtures::failure(
            "Transaction can only be voided if status is authorized or submitted_for_settlement.",
            "91504",
            "base",
        )))
    });

    let error = reconciler(gateway).refund_or_void(&receipt()).await.unwrap_err();

    let codes: Vec<&str> = error.errors.iter().map(|e| e.code.as_str()).collect();
    assert_eq!(codes, vec!["91506", "91504"]);
    assert_eq!(error.messages.len(), 2);
    assert_eq!(error.messages[0], UNSETTLED_REFUND_MESSAGE);
}

#[tokio::test]
async fn test_other_refund_failure_does_not_void() {
    let mut gateway = MockGateway::new();
    gateway.expect_refund().times(1).returning(|_| {
        Ok(GatewayResult::Failure(GatewayFixtures::failure(
            "Transaction has already been completely refunded.",
            "91512",
            "base",
        )))
    });
    gateway.expect_void().never();

    let error = reconciler(gateway).refund_or_void(&receipt()).await.unwrap_err();

    assert_eq!(error.errors.len(), 1);
    assert_eq!(error.errors[0].code, "91512");
    assert!(!error.is_transport());
}

#[tokio::test]
async fn test_refund_transport_error_is_normalized() {
    let mut gateway = MockGateway::new();
    gateway
        .expect_refund()
        .times(1)
        .returning(|_| Err(anyhow!("connection reset by peer")));
    gateway.expect_void().never();

    let error = reconciler(gateway).refund_or_void(&receipt()).await.unwrap_err();

    assert!(error.is_transport());
    assert_eq!(error.errors.len(), 1);
    assert!(error.errors[0].message.contains("connection reset by peer"));
}

#[tokio::test]
async fn test_void_transport_error_keeps_refund_entries() {
    let mut gateway = MockGateway::new();
    gateway
        .expect_refund()
        .times(1)
        .returning(|_| Ok(GatewayFixtures::unsettled_refund_failure()));
    gateway
        .expect_void()
        .times(1)
        .returning(|_| Err(anyhow!("dns lookup failed")));

    let error = reconciler(gateway).refund_or_void(&receipt()).await.unwrap_err();

    assert_eq!(error.errors.len(), 2);
    assert_eq!(error.errors[0].code, "91506");
    assert_eq!(error.errors[1].code, PaymentError::TRANSPORT_CODE);
}

struct StalledGateway;

#[async_trait]
impl PaymentGateway for StalledGateway {
    async fn charge(&self, _nonce: &str, _amount: i64, _order: &str) -> anyhow::Result<GatewayResult<Transaction>> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Err(anyhow!("unreachable"))
    }

    async fn refund(&self, _receipt: &PaymentReceipt) -> anyhow::Result<GatewayResult<Transaction>> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Err(anyhow!("unreachable"))
    }

    async fn void(&self, _transaction_id: &str) -> anyhow::Result<GatewayResult<Transaction>> {
        Err(anyhow!("unreachable"))
    }

    async fn create_customer_profile(&self, _user: &User) -> anyhow::Result<GatewayResult<CustomerProfile>> {
        Err(anyhow!("unreachable"))
    }

    async fn find_customer_profile(&self, _customer_id: &str) -> anyhow::Result<Option<CustomerProfile>> {
        Ok(None)
    }

    async fn generate_client_token(&self, _customer_id: &str) -> anyhow::Result<GatewayResult<String>> {
        Err(anyhow!("unreachable"))
    }
}

#[tokio::test]
async fn test_gateway_timeout_surfaces_as_payment_error() {
    let reconciler = PaymentReconciler::with_timeout(Arc::new(StalledGateway), Duration::from_millis(50));

    let error = reconciler.refund_or_void(&receipt()).await.unwrap_err();
    assert!(error.is_transport());
    assert!(error.messages[0].contains("timed out"));

    let error = reconciler.charge("nonce", 100, "order").await.unwrap_err();
    assert!(error.is_transport());
}

#[tokio::test]
async fn test_resolve_customer_creates_profile_when_missing() {
    let mut gateway = MockGateway::new();
    gateway
        .expect_create_customer_profile()
        .times(1)
        .returning(|_| Ok(GatewayResult::Success(GatewayFixtures::customer("cust_1"))));
    gateway.expect_find_customer_profile().never();

    let user = TestUser::patient("patient@example.com");
    let resolution = reconciler(gateway).resolve_customer(&user).await.unwrap();

    assert_eq!(resolution, CustomerResolution::Created("cust_1".to_string()));
}

#[tokio::test]
async fn test_resolve_customer_reuses_known_profile() {
    let mut gateway = MockGateway::new();
    gateway.expect_create_customer_profile().never();
    gateway
        .expect_find_customer_profile()
        .times(1)
        .returning(|id| Ok(Some(GatewayFixtures::customer(&id.to_string()))));

    let user = TestUser::with_customer("patient@example.com", "cust_7");
    let resolution = reconciler(gateway).resolve_customer(&user).await.unwrap();

    assert_eq!(resolution, CustomerResolution::Existing("cust_7".to_string()));
}

#[tokio::test]
async fn test_resolve_customer_reports_stale_profile() {
    let mut gateway = MockGateway::new();
    gateway
        .expect_find_customer_profile()
        .times(1)
        .returning(|_| Ok(None));

    let user = TestUser::with_customer("patient@example.com", "cust_gone");
    let resolution = reconciler(gateway).resolve_customer(&user).await.unwrap();

    assert_eq!(resolution, CustomerResolution::Missing);
}

#[tokio::test]
async fn test_client_token_failure_is_reported() {
    let mut gateway = MockGateway::new();
    gateway.expect_generate_client_token().times(1).returning(|_| {
        Ok(GatewayResult::Failure(GatewayFixtures::failure(
            "Customer specified by customer_id does not exist",
            "92804",
            "customerId",
        )))
    });

    let error = reconciler(gateway).client_token("cust_1").await.unwrap_err();
    assert_eq!(error.errors[0].attribute, "customerId");
}

#[test]
fn test_payment_error_display_joins_messages() {
    let error = PaymentError::message("refund rejected").merge(PaymentError::message("void rejected"));
    assert_eq!(error.to_string(), "Payment error: refund rejected; void rejected");
}
