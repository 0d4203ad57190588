use actix_web::{http::StatusCode, test, test::TestRequest, App};
use serde_json::json;

use super::helpers::{configure, test_api, test_config};
use crate::actor::{ACTOR_ID_HEADER, ACTOR_ROLE_HEADER};

#[actix_web::test]
async fn health_check() {
    let _ = env_logger::try_init().ok();
    let app = test::init_service(App::new().configure(configure(test_api().await, test_config()))).await;
    let res = test::call_service(&app, TestRequest::get().uri("/health").to_request()).await;
    assert!(res.status().is_success());
}

#[actix_web::test]
async fn placing_an_order_returns_the_stored_order() {
    let _ = env_logger::try_init().ok();
    let app = test::init_service(App::new().configure(configure(test_api().await, test_config()))).await;
    let req = TestRequest::post()
        .uri("/orders")
        .insert_header((ACTOR_ID_HEADER, "alice"))
        .insert_header((ACTOR_ROLE_HEADER, "buyer"))
        .set_json(json!({ "product_id": "prod-1", "seller_id": "bob", "amount": 15000 }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let order: serde_json::Value = test::read_body_json(res).await;
    assert_eq!(order["status"], "Pending");
    assert_eq!(order["payment"]["status"], "pending");
    assert_eq!(order["buyer_id"], "alice");
}

#[actix_web::test]
async fn requests_without_an_identity_are_rejected() {
    let _ = env_logger::try_init().ok();
    let app = test::init_service(App::new().configure(configure(test_api().await, test_config()))).await;
    let req = TestRequest::post()
        .uri("/orders")
        .set_json(json!({ "product_id": "prod-1", "seller_id": "bob", "amount": 15000 }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn responding_to_an_unknown_order_is_a_404() {
    let _ = env_logger::try_init().ok();
    let app = test::init_service(App::new().configure(configure(test_api().await, test_config()))).await;
    let req = TestRequest::post()
        .uri("/orders/ord_0000000000000000/respond")
        .insert_header((ACTOR_ID_HEADER, "bob"))
        .insert_header((ACTOR_ROLE_HEADER, "seller"))
        .set_json(json!({ "decision": "accept" }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn a_stranger_cannot_respond_to_an_order() {
    let _ = env_logger::try_init().ok();
    let api = test_api().await;
    let order = api
        .place_order(&bazaar_engine::test_utils::buyer(), "prod-1", "bob", bzr_common::MinorUnits::from_major(10), None)
        .await
        .expect("placed");
    let app = test::init_service(App::new().configure(configure(api, test_config()))).await;
    let req = TestRequest::post()
        .uri(&format!("/orders/{}/respond", order.id.as_str()))
        .insert_header((ACTOR_ID_HEADER, "mallory"))
        .insert_header((ACTOR_ROLE_HEADER, "seller"))
        .set_json(json!({ "decision": "accept" }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn order_reads_are_restricted_to_participants_and_admins() {
    let _ = env_logger::try_init().ok();
    let api = test_api().await;
    let order = api
        .place_order(&bazaar_engine::test_utils::buyer(), "prod-1", "bob", bzr_common::MinorUnits::from_major(10), None)
        .await
        .expect("placed");
    let app = test::init_service(App::new().configure(configure(api, test_config()))).await;
    let get_as = |actor: &str, role: &str| {
        TestRequest::get()
            .uri(&format!("/orders/{}", order.id.as_str()))
            .insert_header((ACTOR_ID_HEADER, actor.to_string()))
            .insert_header((ACTOR_ROLE_HEADER, role.to_string()))
            .to_request()
    };
    let res = test::call_service(&app, get_as("mallory", "buyer")).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let res = test::call_service(&app, get_as("alice", "buyer")).await;
    assert_eq!(res.status(), StatusCode::OK);

    // The audit trail is admin territory, even for the buyer.
    let trail = TestRequest::get()
        .uri(&format!("/orders/{}/activity", order.id.as_str()))
        .insert_header((ACTOR_ID_HEADER, "alice"))
        .insert_header((ACTOR_ROLE_HEADER, "buyer"))
        .to_request();
    let res = test::call_service(&app, trail).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let trail = TestRequest::get()
        .uri(&format!("/orders/{}/activity", order.id.as_str()))
        .insert_header((ACTOR_ID_HEADER, "root"))
        .insert_header((ACTOR_ROLE_HEADER, "admin"))
        .to_request();
    let res = test::call_service(&app, trail).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[actix_web::test]
async fn a_repeated_transition_is_a_conflict() {
    let _ = env_logger::try_init().ok();
    let api = test_api().await;
    let order = api
        .place_order(&bazaar_engine::test_utils::buyer(), "prod-1", "bob", bzr_common::MinorUnits::from_major(10), None)
        .await
        .expect("placed");
    let app = test::init_service(App::new().configure(configure(api, test_config()))).await;
    let accept = || {
        TestRequest::post()
            .uri(&format!("/orders/{}/respond", order.id.as_str()))
            .insert_header((ACTOR_ID_HEADER, "bob"))
            .insert_header((ACTOR_ROLE_HEADER, "seller"))
            .set_json(json!({ "decision": "accept" }))
            .to_request()
    };
    let res = test::call_service(&app, accept()).await;
    assert_eq!(res.status(), StatusCode::OK);
    let res = test::call_service(&app, accept()).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn sweeper_toggles_are_admin_only() {
    let _ = env_logger::try_init().ok();
    let app = test::init_service(App::new().configure(configure(test_api().await, test_config()))).await;
    let req = TestRequest::post()
        .uri("/admin/sweepers/completion")
        .insert_header((ACTOR_ID_HEADER, "alice"))
        .insert_header((ACTOR_ROLE_HEADER, "buyer"))
        .set_json(json!({ "enabled": false }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let req = TestRequest::post()
        .uri("/admin/sweepers/completion")
        .insert_header((ACTOR_ID_HEADER, "root"))
        .insert_header((ACTOR_ROLE_HEADER, "admin"))
        .set_json(json!({ "enabled": false }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
}
