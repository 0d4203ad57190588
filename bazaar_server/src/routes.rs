//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a screenful MUST go into a separate module. Keep this module neat
//! and tidy 🙏
//!
//! Every lifecycle endpoint funnels into the engine's `OrderFlowApi`; handlers only translate
//! between HTTP and the engine's types. Error mapping to status codes lives on
//! [`ServerError`](crate::errors::ServerError), so handlers end in `?` rather than match blocks.

use actix_web::{delete, get, post, web, HttpRequest, HttpResponse, Responder};
use bazaar_engine::{
    db_types::OrderId,
    OrderFlowApi,
    SellerDecision,
    SqliteDatabase,
    WebhookAck,
    WebhookError,
    WebhookIngestor,
    SIGNATURE_HEADER,
};
use log::*;

use crate::{
    actor::RequestActor,
    config::ServerConfig,
    data_objects::{
        DeleteParams,
        JsonResponse,
        PlaceOrderRequest,
        ReasonRequest,
        SellerResponseRequest,
        SweeperToggleRequest,
        VerifyPaymentRequest,
    },
    errors::ServerError,
    integrations::gateway::LiveGateway,
    sweepers::SweeperControls,
};

type Api = OrderFlowApi<SqliteDatabase>;

#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Orders  ----------------------------------------------------

#[post("/orders")]
pub async fn place_order(
    actor: RequestActor,
    body: web::Json<PlaceOrderRequest>,
    api: web::Data<Api>,
) -> Result<HttpResponse, ServerError> {
    let actor = actor.into_inner();
    let req = body.into_inner();
    debug!("💻️ POST order for product {} by {actor}", req.product_id);
    let order = api.place_order(&actor, &req.product_id, &req.seller_id, req.amount, req.currency).await?;
    Ok(HttpResponse::Created().json(order))
}

#[get("/orders/{id}")]
pub async fn get_order(
    actor: RequestActor,
    path: web::Path<String>,
    api: web::Data<Api>,
) -> Result<HttpResponse, ServerError> {
    let id = OrderId::from(path.into_inner());
    let order = api.order_for(&id, &actor.into_inner()).await?;
    Ok(HttpResponse::Ok().json(order))
}

#[get("/orders/{id}/activity")]
pub async fn get_activity(
    actor: RequestActor,
    path: web::Path<String>,
    api: web::Data<Api>,
) -> Result<HttpResponse, ServerError> {
    let id = OrderId::from(path.into_inner());
    let trail = api.activity_for(&id, &actor.into_inner()).await?;
    Ok(HttpResponse::Ok().json(trail))
}

#[post("/orders/{id}/respond")]
pub async fn seller_respond(
    actor: RequestActor,
    path: web::Path<String>,
    body: web::Json<SellerResponseRequest>,
    api: web::Data<Api>,
) -> Result<HttpResponse, ServerError> {
    let id = OrderId::from(path.into_inner());
    let decision = match body.decision.as_str() {
        "accept" => SellerDecision::Accept,
        "reject" => SellerDecision::Reject,
        other => return Err(ServerError::InvalidRequestBody(format!("unknown decision '{other}'"))),
    };
    debug!("💻️ POST {decision:?} on {id}");
    let order = api.seller_respond(&id, &actor.into_inner(), decision).await?;
    Ok(HttpResponse::Ok().json(order))
}

#[post("/orders/{id}/cancel")]
pub async fn cancel_order(
    actor: RequestActor,
    path: web::Path<String>,
    body: web::Json<ReasonRequest>,
    api: web::Data<Api>,
) -> Result<HttpResponse, ServerError> {
    let id = OrderId::from(path.into_inner());
    debug!("💻️ POST cancel on {id}");
    let order = api.cancel_order(&id, &actor.into_inner(), &body.reason).await?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------   Payments  ----------------------------------------------------

#[post("/orders/{id}/payment")]
pub async fn initiate_payment(
    actor: RequestActor,
    path: web::Path<String>,
    api: web::Data<Api>,
    gateway: web::Data<LiveGateway>,
) -> Result<HttpResponse, ServerError> {
    let id = OrderId::from(path.into_inner());
    debug!("💻️ POST payment intent for {id}");
    let intent = api.initiate_payment(&id, &actor.into_inner(), gateway.get_ref()).await?;
    Ok(HttpResponse::Ok().json(intent))
}

#[post("/orders/{id}/payment/verify")]
pub async fn verify_payment(
    actor: RequestActor,
    path: web::Path<String>,
    body: web::Json<VerifyPaymentRequest>,
    api: web::Data<Api>,
    config: web::Data<ServerConfig>,
) -> Result<HttpResponse, ServerError> {
    let id = OrderId::from(path.into_inner());
    debug!("💻️ POST payment verification for {id}");
    let req = body.into_inner();
    let order = api
        .verify_payment(&id, &actor.into_inner(), &req.payment_id, &req.signature, config.webhook_secret.reveal())
        .await?;
    Ok(HttpResponse::Ok().json(order))
}

#[get("/orders/{id}/payment")]
pub async fn get_payment(
    actor: RequestActor,
    path: web::Path<String>,
    api: web::Data<Api>,
) -> Result<HttpResponse, ServerError> {
    let id = OrderId::from(path.into_inner());
    let order = api.order_for(&id, &actor.into_inner()).await?;
    Ok(HttpResponse::Ok().json(order.payment))
}

#[post("/orders/{id}/refund")]
pub async fn refund_order(
    actor: RequestActor,
    path: web::Path<String>,
    body: web::Json<ReasonRequest>,
    api: web::Data<Api>,
    gateway: web::Data<LiveGateway>,
) -> Result<HttpResponse, ServerError> {
    let id = OrderId::from(path.into_inner());
    debug!("💻️ POST refund for {id}");
    let order = api.refund_order(&id, &actor.into_inner(), &body.reason, gateway.get_ref()).await?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------   Admin  ----------------------------------------------------

#[delete("/orders/{id}")]
pub async fn delete_order(
    actor: RequestActor,
    path: web::Path<String>,
    params: web::Query<DeleteParams>,
    body: web::Json<ReasonRequest>,
    api: web::Data<Api>,
) -> Result<HttpResponse, ServerError> {
    let id = OrderId::from(path.into_inner());
    let actor = actor.into_inner();
    if params.hard {
        warn!("💻️ DELETE (hard) {id} by {actor}");
        api.hard_delete(&id, &actor, &body.reason).await?;
        Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Order {id} permanently removed"))))
    } else {
        debug!("💻️ DELETE (soft) {id} by {actor}");
        let order = api.soft_delete(&id, &actor, &body.reason).await?;
        Ok(HttpResponse::Ok().json(order))
    }
}

#[post("/orders/{id}/restore")]
pub async fn restore_order(
    actor: RequestActor,
    path: web::Path<String>,
    api: web::Data<Api>,
) -> Result<HttpResponse, ServerError> {
    let id = OrderId::from(path.into_inner());
    debug!("💻️ POST restore for {id}");
    let order = api.restore(&id, &actor.into_inner()).await?;
    Ok(HttpResponse::Ok().json(order))
}

#[post("/admin/sweepers/{sweeper}")]
pub async fn toggle_sweeper(
    actor: RequestActor,
    path: web::Path<String>,
    body: web::Json<SweeperToggleRequest>,
    controls: web::Data<SweeperControls>,
) -> Result<HttpResponse, ServerError> {
    let actor = actor.into_inner();
    if !actor.is_admin() {
        return Err(ServerError::OrderFlow(bazaar_engine::OrderFlowError::Forbidden(
            "only an admin may toggle sweepers".into(),
        )));
    }
    let enabled = body.enabled;
    match path.as_str() {
        "completion" => controls.set_completion_enabled(enabled),
        "expiry" => controls.set_expiry_enabled(enabled),
        other => return Err(ServerError::InvalidRequestPath(format!("unknown sweeper '{other}'"))),
    }
    let state = if enabled { "enabled" } else { "paused" };
    info!("💻️ {} sweeper {state} by {actor}", path.as_str());
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("{} sweeper {state}", path.as_str()))))
}

//----------------------------------------------   Webhook  ----------------------------------------------------

/// The gateway delivery endpoint. The body is taken raw because the signature covers the exact
/// bytes sent, not a re-serialisation.
#[post("/webhook/gateway")]
pub async fn gateway_webhook(
    req: HttpRequest,
    body: web::Bytes,
    ingestor: web::Data<WebhookIngestor<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    trace!("🪝️ Received webhook request: {}", req.uri());
    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookError::InvalidSignature)?;
    let ack = ingestor.ingest(&body, signature).await?;
    let message = match ack {
        WebhookAck::Processed => "Event processed",
        WebhookAck::Duplicate => "Event already applied",
        WebhookAck::Ignored => "Event acknowledged without action",
        WebhookAck::UnknownOrder => "Event does not match a known order",
    };
    Ok(HttpResponse::Ok().json(JsonResponse::success(message)))
}
