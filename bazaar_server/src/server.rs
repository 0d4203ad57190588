use std::{sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use bazaar_engine::{
    events::{NotificationChannel, NotificationProducers},
    OrderFlowApi,
    SqliteDatabase,
    WebhookIngestor,
};
use log::*;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    integrations::gateway::LiveGateway,
    routes::{
        cancel_order,
        delete_order,
        gateway_webhook,
        get_activity,
        get_order,
        get_payment,
        health,
        initiate_payment,
        place_order,
        refund_order,
        restore_order,
        seller_respond,
        toggle_sweeper,
        verify_payment,
    },
    sweepers::{start_completion_sweeper, start_expiry_sweeper, SweeperControls},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let producers = start_delivery_log_channel();
    let controls = Arc::new(SweeperControls::default());
    let sweeper_api = Arc::new(OrderFlowApi::new(db.clone(), producers.clone(), config.limits));
    start_expiry_sweeper(
        Arc::clone(&sweeper_api),
        Arc::clone(&controls),
        config.expiry_sweep_interval,
        config.payment_timeout,
    );
    start_completion_sweeper(sweeper_api, Arc::clone(&controls), config.completion_sweep_interval, config.acceptance_window);
    let srv = create_server_instance(config, db, producers, controls)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: NotificationProducers,
    controls: Arc<SweeperControls>,
) -> Result<Server, ServerError> {
    let gateway = LiveGateway::new(config.gateway.clone())?;
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let api = Arc::new(OrderFlowApi::new(db.clone(), producers.clone(), config.limits));
        let ingestor = WebhookIngestor::new(Arc::clone(&api), config.webhook_secret.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("bzr::access_log"))
            .app_data(web::Data::from(api))
            .app_data(web::Data::new(ingestor))
            .app_data(web::Data::new(gateway.clone()))
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::from(Arc::clone(&controls)))
            .service(health)
            .service(place_order)
            .service(get_order)
            .service(get_activity)
            .service(seller_respond)
            .service(cancel_order)
            .service(initiate_payment)
            .service(verify_payment)
            .service(get_payment)
            .service(refund_order)
            .service(delete_order)
            .service(restore_order)
            .service(toggle_sweeper)
            .service(gateway_webhook)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}

/// The default notification transport: a channel whose handler just logs each delivery. Real
/// transports attach the same way.
fn start_delivery_log_channel() -> NotificationProducers {
    let channel = NotificationChannel::new(128, Arc::new(|notification| {
        Box::pin(async move {
            info!("📬️ [{}] {} {}", notification.audience, notification.event, notification.payload);
        })
    }));
    let mut producers = NotificationProducers::default();
    producers.attach(channel.subscribe());
    tokio::spawn(channel.start_handler());
    producers
}
