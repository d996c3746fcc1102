//! CreateCheckoutHandler - Command handler for initiating a paid checkout.
//!
//! Creates the pending subscription and assigns the merchant order id that
//! every later gateway notification will carry back. The subscription is
//! persisted BEFORE the customer is sent to the gateway, so a notification
//! can never arrive for an order this service does not know.

use std::sync::Arc;

use rand::Rng;

use crate::domain::billing::{BillingPackage, Subscription};
use crate::domain::foundation::{DomainError, OrderId, SubscriptionId, UserId};
use crate::ports::SubscriptionStore;

/// Command to initiate a checkout.
#[derive(Debug, Clone)]
pub struct CreateCheckoutCommand {
    pub user_id: UserId,
    pub package: BillingPackage,
}

/// Result of a successful checkout initiation.
#[derive(Debug, Clone)]
pub struct CreateCheckoutResult {
    pub subscription: Subscription,
    /// Amount the gateway will charge, in its decimal-string form.
    pub gross_amount: String,
}

/// Handler for initiating checkouts.
pub struct CreateCheckoutHandler {
    store: Arc<dyn SubscriptionStore>,
}

impl CreateCheckoutHandler {
    pub fn new(store: Arc<dyn SubscriptionStore>) -> Self {
        Self { store }
    }

    pub async fn handle(
        &self,
        cmd: CreateCheckoutCommand,
    ) -> Result<CreateCheckoutResult, DomainError> {
        let nonce = rand::thread_rng().gen_range(100..1_000_000);
        let order_id = OrderId::generate(&cmd.user_id, cmd.package.id, nonce);

        let subscription = Subscription::create_pending(
            SubscriptionId::new(),
            cmd.user_id,
            cmd.package.id,
            cmd.package.interval,
            order_id,
        );

        self.store.insert(&subscription).await?;

        tracing::info!(
            order_id = %subscription.order_id,
            user_id = %subscription.user_id,
            package = %cmd.package.name,
            "checkout initiated"
        );

        Ok(CreateCheckoutResult {
            gross_amount: cmd.package.gross_amount_string(),
            subscription,
        })
    }
}
