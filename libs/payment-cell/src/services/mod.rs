pub mod gateway;
pub mod reconciler;

pub use gateway::{PaymentGateway, UNSETTLED_REFUND_MESSAGE};
pub use reconciler::PaymentReconciler;
