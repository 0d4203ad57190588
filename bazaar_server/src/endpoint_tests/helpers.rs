use std::sync::Arc;

use actix_web::web::{self, ServiceConfig};
use bazaar_engine::{
    db_types::{Order, OrderId},
    test_utils::{buyer, memory_db, seller},
    traits::{GatewayClientError, PaymentGatewayClient, PaymentIntent, RefundReceipt},
    events::NotificationProducers,
    OrderFlowApi,
    SellerDecision,
    SqliteDatabase,
    WebhookIngestor,
};
use bzr_common::{MinorUnits, Secret};

use crate::{
    config::ServerConfig,
    routes::{
        cancel_order,
        delete_order,
        gateway_webhook,
        get_activity,
        get_order,
        get_payment,
        health,
        place_order,
        restore_order,
        seller_respond,
        toggle_sweeper,
        verify_payment,
    },
    sweepers::SweeperControls,
};

pub const TEST_WEBHOOK_SECRET: &str = "whsec_endpoint_tests";

pub type Api = OrderFlowApi<SqliteDatabase>;

/// A gateway stub for driving the engine into payment states during test setup.
pub struct StubGateway;

impl PaymentGatewayClient for StubGateway {
    async fn create_intent(
        &self,
        order_id: &OrderId,
        amount: MinorUnits,
        currency: &str,
    ) -> Result<PaymentIntent, GatewayClientError> {
        Ok(PaymentIntent { gateway_order_id: format!("gwo_{}", order_id.as_str()), amount, currency: currency.into() })
    }

    async fn refund(
        &self,
        payment_id: &str,
        _amount: MinorUnits,
        _reason: &str,
    ) -> Result<RefundReceipt, GatewayClientError> {
        Ok(RefundReceipt { refund_id: format!("rfnd_{payment_id}") })
    }
}

pub fn test_config() -> ServerConfig {
    ServerConfig { webhook_secret: Secret::new(TEST_WEBHOOK_SECRET.to_string()), ..Default::default() }
}

pub async fn test_api() -> Arc<Api> {
    Arc::new(OrderFlowApi::new(memory_db().await, NotificationProducers::default(), Default::default()))
}

/// Registers the routes under test, minus the two that talk to the live gateway client.
pub fn configure(api: Arc<Api>, config: ServerConfig) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let ingestor = WebhookIngestor::new(Arc::clone(&api), config.webhook_secret.clone());
        let controls = Arc::new(SweeperControls::default());
        cfg.app_data(web::Data::from(api))
            .app_data(web::Data::new(ingestor))
            .app_data(web::Data::new(config))
            .app_data(web::Data::from(controls))
            .service(health)
            .service(place_order)
            .service(get_order)
            .service(get_activity)
            .service(seller_respond)
            .service(cancel_order)
            .service(verify_payment)
            .service(get_payment)
            .service(delete_order)
            .service(restore_order)
            .service(toggle_sweeper)
            .service(gateway_webhook);
    }
}

/// An accepted order with an outstanding payment intent, placed straight through the engine.
pub async fn accepted_order_with_intent(api: &Api) -> Order {
    let order =
        api.place_order(&buyer(), "prod-1", "bob", MinorUnits::from_major(150), None).await.expect("placed");
    api.seller_respond(&order.id, &seller(), SellerDecision::Accept).await.expect("accepted");
    api.initiate_payment(&order.id, &buyer(), &StubGateway).await.expect("intent");
    api.fetch_order(&order.id).await.expect("order")
}
