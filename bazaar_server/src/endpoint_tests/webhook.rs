use std::sync::Arc;

use actix_web::{http::StatusCode, test, test::TestRequest, App};
use bazaar_engine::{db_types::PaymentStatus, helpers::sign_payload, SIGNATURE_HEADER};
use serde_json::json;

use super::helpers::{accepted_order_with_intent, configure, test_api, test_config, TEST_WEBHOOK_SECRET};

fn capture_body(gateway_order_id: &str) -> Vec<u8> {
    json!({
        "event": "payment.captured",
        "payload": { "payment": { "entity": { "id": "pay_1", "order_id": gateway_order_id } } }
    })
    .to_string()
    .into_bytes()
}

#[actix_web::test]
async fn an_unsigned_delivery_is_rejected() {
    let _ = env_logger::try_init().ok();
    let api = test_api().await;
    let order = accepted_order_with_intent(&api).await;
    let app = test::init_service(App::new().configure(configure(Arc::clone(&api), test_config()))).await;

    let body = capture_body(order.payment.gateway_order_id.as_ref().unwrap());
    let req = TestRequest::post().uri("/webhook/gateway").set_payload(body).to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let order = api.fetch_order(&order.id).await.expect("order");
    assert_eq!(order.payment.status, PaymentStatus::Pending);
}

#[actix_web::test]
async fn a_wrongly_signed_delivery_is_rejected() {
    let _ = env_logger::try_init().ok();
    let api = test_api().await;
    let order = accepted_order_with_intent(&api).await;
    let app = test::init_service(App::new().configure(configure(Arc::clone(&api), test_config()))).await;

    let body = capture_body(order.payment.gateway_order_id.as_ref().unwrap());
    let req = TestRequest::post()
        .uri("/webhook/gateway")
        .insert_header((SIGNATURE_HEADER, sign_payload("someone_elses_secret", &body)))
        .set_payload(body)
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn a_signed_capture_is_applied_and_a_replay_is_acked() {
    let _ = env_logger::try_init().ok();
    let api = test_api().await;
    let order = accepted_order_with_intent(&api).await;
    let app = test::init_service(App::new().configure(configure(Arc::clone(&api), test_config()))).await;

    let body = capture_body(order.payment.gateway_order_id.as_ref().unwrap());
    let signature = sign_payload(TEST_WEBHOOK_SECRET, &body);
    let req = TestRequest::post()
        .uri("/webhook/gateway")
        .insert_header((SIGNATURE_HEADER, signature.clone()))
        .set_payload(body.clone())
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let paid = api.fetch_order(&order.id).await.expect("order");
    assert_eq!(paid.payment.status, PaymentStatus::Paid);
    assert_eq!(paid.payment.payment_id.as_deref(), Some("pay_1"));

    // Redelivery of the same bytes: 200, no second application.
    let req = TestRequest::post()
        .uri("/webhook/gateway")
        .insert_header((SIGNATURE_HEADER, signature))
        .set_payload(body)
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let trail = api.activity(&order.id).await.expect("trail");
    assert_eq!(trail.iter().filter(|e| e.action == bazaar_engine::actions::PAYMENT_CAPTURED).count(), 1);
}

#[actix_web::test]
async fn valid_signature_over_garbage_is_a_bad_request() {
    let _ = env_logger::try_init().ok();
    let app = test::init_service(App::new().configure(configure(test_api().await, test_config()))).await;
    let body = b"}{ not json".to_vec();
    let req = TestRequest::post()
        .uri("/webhook/gateway")
        .insert_header((SIGNATURE_HEADER, sign_payload(TEST_WEBHOOK_SECRET, &body)))
        .set_payload(body)
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
