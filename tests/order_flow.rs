mod common;

use axum::http::StatusCode;
use serde_json::{Value, json};

use city_style_back::store::Store;
use common::*;

fn hoodie_line(quantity: i32) -> Value {
    json!({ "slug": "hoodie", "name": "Classic Hoodie", "price": 60, "quantity": quantity, "size": "M" })
}

async fn place_order(app: &TestApp, token: &str, body: Value) -> (StatusCode, Value) {
    post("/orders/create").auth(token).json(body).send(&app.router).await
}

fn checkout(items: Value) -> Value {
    json!({
        "items": items,
        "shippingAddress": address(),
        "paymentMethod": "cod"
    })
}

async fn advance(app: &TestApp, order_id: &str, status: &str) -> (StatusCode, Value) {
    let admin = admin();
    let uri = format!("/admin/orders/{}/status", order_id);
    patch(&uri)
        .auth(&admin)
        .json(json!({ "status": status, "trackingNumber": "TRK123" }))
        .send(&app.router)
        .await
}

#[tokio::test]
async fn hoodie_checkout_end_to_end() {
    let app = spawn().await;
    let token = alice();

    post("/cart/sync")
        .auth(&token)
        .json(json!({ "items": [hoodie_line(2)] }))
        .send(&app.router)
        .await;

    let (status, order) = place_order(&app, &token, checkout(json!([hoodie_line(2)]))).await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(order["orderId"].as_str().unwrap().starts_with("ORD-"));
    assert_eq!(money(&order["subtotal"]), 120.0);
    assert_eq!(money(&order["shippingCharges"]), 0.0);
    assert_eq!(money(&order["tax"]), 21.6);
    assert_eq!(money(&order["total"]), 141.6);
    assert_eq!(order["paymentStatus"], "pending");
    assert_eq!(order["orderStatus"], "placed");
    assert_eq!(order["statusHistory"].as_array().unwrap().len(), 1);
    assert_eq!(order["statusHistory"][0]["note"], "Order placed successfully");
    assert_eq!(order["ownerEmail"], "alice@example.com");

    let (_, cart) = get("/cart").auth(&token).send(&app.router).await;
    assert_eq!(cart["items"], json!([]));
}

#[tokio::test]
async fn electronic_payment_is_completed() {
    let app = spawn().await;
    let token = alice();

    let mut body = checkout(json!([hoodie_line(1)]));
    body["paymentMethod"] = json!("upi");
    let (_, order) = place_order(&app, &token, body).await;

    assert_eq!(order["paymentStatus"], "completed");
    // Below the free-shipping threshold
    assert_eq!(money(&order["shippingCharges"]), 10.0);
}

#[tokio::test]
async fn catalog_price_wins_over_client_line_price() {
    let app = spawn().await;
    let token = alice();

    let cheap = json!([{ "slug": "hoodie", "name": "Hoodie", "price": 1, "quantity": 2, "size": "M" }]);
    let (status, order) = place_order(&app, &token, checkout(cheap)).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(money(&order["items"][0]["unitPrice"]), 60.0);
    assert_eq!(money(&order["subtotal"]), 120.0);
}

#[tokio::test]
async fn tampered_client_total_is_rejected() {
    let app = spawn().await;
    let token = alice();

    let mut body = checkout(json!([hoodie_line(2)]));
    body["pricing"] = json!({ "subtotal": 2, "shippingCharges": 0, "tax": 0, "discount": 0, "total": 2 });
    let (status, err) = place_order(&app, &token, body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "pricing_mismatch");

    let (_, orders) = get("/orders").auth(&token).send(&app.router).await;
    assert_eq!(orders, json!([]));
}

#[tokio::test]
async fn override_mode_persists_server_figures() {
    let app = spawn_with(&[("PRICING_MISMATCH", "override")]).await;
    let token = alice();

    let mut body = checkout(json!([hoodie_line(2)]));
    body["pricing"] = json!({ "subtotal": 2, "total": 2 });
    let (status, order) = place_order(&app, &token, body).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(money(&order["total"]), 141.6);
}

#[tokio::test]
async fn matching_client_pricing_is_accepted() {
    let app = spawn().await;
    let token = alice();

    let mut body = checkout(json!([hoodie_line(2)]));
    body["pricing"] = json!({ "subtotal": 120, "shippingCharges": 0, "tax": 21.6, "discount": 0, "total": 141.6 });
    let (status, _) = place_order(&app, &token, body).await;

    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn checkout_validation_names_the_field() {
    let app = spawn().await;
    let token = alice();

    let (status, err) = place_order(&app, &token, checkout(json!([]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(err["message"].as_str().unwrap().contains("items"));

    let body = json!({ "items": [hoodie_line(1)], "paymentMethod": "cod" });
    let (status, err) = place_order(&app, &token, body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(err["message"].as_str().unwrap().contains("shippingAddress"));

    let unknown = json!([{ "slug": "ghost", "name": "Ghost", "price": 1, "quantity": 1, "size": "M" }]);
    let (status, err) = place_order(&app, &token, checkout(unknown)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(err["message"].as_str().unwrap().contains("items[0]"));

    let wrong_size = json!([{ "slug": "hoodie", "name": "Hoodie", "price": 60, "quantity": 1, "size": "XXL" }]);
    let (status, _) = place_order(&app, &token, checkout(wrong_size)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn idempotency_key_replays_the_original_order() {
    let app = spawn().await;
    let token = alice();

    let send = || {
        post("/orders/create")
            .auth(&token)
            .header("idempotency-key", "checkout-7f3a")
            .json(checkout(json!([hoodie_line(1)])))
            .send(&app.router)
    };

    let (first_status, first) = send().await;
    let (second_status, second) = send().await;

    assert_eq!(first_status, StatusCode::CREATED);
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(first["orderId"], second["orderId"]);

    let (_, orders) = get("/orders").auth(&token).send(&app.router).await;
    assert_eq!(orders.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn cart_clear_failure_does_not_undo_the_order() {
    let app = spawn().await;
    let token = alice();
    app.store.fail_cart_clear(true);

    let (status, order) = place_order(&app, &token, checkout(json!([hoodie_line(1)]))).await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = format!("/orders/{}", order["orderId"].as_str().unwrap());
    let (status, _) = get(&uri).auth(&token).send(&app.router).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn other_owners_orders_look_missing() {
    let app = spawn().await;
    let alice = alice();
    let bob = bob();

    let (_, order) = place_order(&app, &alice, checkout(json!([hoodie_line(1)]))).await;
    let uri = format!("/orders/{}", order["orderId"].as_str().unwrap());

    let (bob_status, bob_body) = get(&uri).auth(&bob).send(&app.router).await;
    let (missing_status, missing_body) = get("/orders/ORD-NOPE-00000").auth(&bob).send(&app.router).await;

    assert_eq!(bob_status, StatusCode::NOT_FOUND);
    assert_eq!(bob_body, missing_body);
    assert_eq!(missing_status, StatusCode::NOT_FOUND);

    let cancel_uri = format!("{}/cancel", uri);
    let (status, _) = patch(&cancel_uri).auth(&bob).send(&app.router).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, bob_orders) = get("/orders").auth(&bob).send(&app.router).await;
    assert_eq!(bob_orders, json!([]));
}

#[tokio::test]
async fn cancel_from_placed_records_reason() {
    let app = spawn().await;
    let token = alice();

    let (_, order) = place_order(&app, &token, checkout(json!([hoodie_line(1)]))).await;
    let uri = format!("/orders/{}/cancel", order["orderId"].as_str().unwrap());

    let (status, cancelled) = patch(&uri)
        .auth(&token)
        .json(json!({ "reason": "Ordered the wrong size" }))
        .send(&app.router)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["orderStatus"], "cancelled");
    assert_eq!(cancelled["cancellationReason"], "Ordered the wrong size");
    assert!(cancelled["cancelledAt"].is_string());
    assert_eq!(cancelled["statusHistory"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn cancel_without_body_uses_default_reason() {
    let app = spawn().await;
    let token = alice();

    let (_, order) = place_order(&app, &token, checkout(json!([hoodie_line(1)]))).await;
    let order_id = order["orderId"].as_str().unwrap();
    advance(&app, order_id, "confirmed").await;

    let uri = format!("/orders/{}/cancel", order_id);
    let (status, cancelled) = patch(&uri).auth(&token).send(&app.router).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["cancellationReason"], "Cancelled by user");
}

#[tokio::test]
async fn cancellation_guard_leaves_order_unchanged() {
    let app = spawn().await;
    let token = alice();

    let (_, order) = place_order(&app, &token, checkout(json!([hoodie_line(1)]))).await;
    let order_id = order["orderId"].as_str().unwrap();
    for status in ["confirmed", "packed"] {
        let (code, _) = advance(&app, order_id, status).await;
        assert_eq!(code, StatusCode::OK);
    }

    let uri = format!("/orders/{}", order_id);
    let (_, before) = get(&uri).auth(&token).send(&app.router).await;

    let cancel_uri = format!("{}/cancel", uri);
    let (status, err) = patch(&cancel_uri).auth(&token).send(&app.router).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "invalid_state_transition");

    let (_, after) = get(&uri).auth(&token).send(&app.router).await;
    assert_eq!(before, after);
}

#[tokio::test]
async fn admin_walks_the_state_machine() {
    let app = spawn().await;
    let token = alice();

    let (_, order) = place_order(&app, &token, checkout(json!([hoodie_line(1)]))).await;
    let order_id = order["orderId"].as_str().unwrap();

    let (status, err) = advance(&app, order_id, "shipped").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "invalid_state_transition");

    let mut last = Value::Null;
    for status in ["confirmed", "packed", "shipped", "out_for_delivery", "delivered"] {
        let (code, body) = advance(&app, order_id, status).await;
        assert_eq!(code, StatusCode::OK, "{status}");
        last = body;
    }

    assert_eq!(last["orderStatus"], "delivered");
    assert_eq!(last["trackingNumber"], "TRK123");
    assert!(last["deliveredAt"].is_string());
    assert_eq!(last["statusHistory"].as_array().unwrap().len(), 6);

    let (status, _) = advance(&app, order_id, "cancelled").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn status_updates_require_an_admin() {
    let app = spawn().await;
    let token = alice();

    let (_, order) = place_order(&app, &token, checkout(json!([hoodie_line(1)]))).await;
    let uri = format!("/admin/orders/{}/status", order["orderId"].as_str().unwrap());

    let (status, err) = patch(&uri)
        .auth(&token)
        .json(json!({ "status": "confirmed" }))
        .send(&app.router)
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(err["code"], "forbidden");
}

#[tokio::test]
async fn placed_orders_are_frozen_snapshots() {
    let app = spawn().await;
    let token = alice();

    let (_, saved) = post("/users/addresses")
        .auth(&token)
        .json(address())
        .send(&app.router)
        .await;

    let body = json!({
        "items": [hoodie_line(1)],
        "addressId": saved["id"],
        "paymentMethod": "card"
    });
    let (status, order) = place_order(&app, &token, body).await;
    assert_eq!(status, StatusCode::CREATED);

    // Reprice the product and move house
    app.store.insert_product(product("hoodie", "Classic Hoodie", 99, &["M", "L"])).await;
    let mut moved = address();
    moved["city"] = json!("Mumbai");
    let address_uri = format!("/users/addresses/{}", saved["id"].as_str().unwrap());
    put(&address_uri).auth(&token).json(moved).send(&app.router).await;

    let uri = format!("/orders/{}", order["orderId"].as_str().unwrap());
    let (_, fetched) = get(&uri).auth(&token).send(&app.router).await;

    assert_eq!(fetched["items"], order["items"]);
    assert_eq!(fetched["shippingAddress"], order["shippingAddress"]);
    assert_eq!(fetched["shippingAddress"]["city"], "Bengaluru");
    assert_eq!(money(&fetched["items"][0]["unitPrice"]), 60.0);

    let stored = app.store.find_order(order["orderId"].as_str().unwrap()).await.unwrap().unwrap();
    assert_eq!(stored.items[0].unit_price, rust_decimal::Decimal::from(60));
}

#[tokio::test]
async fn orders_are_listed_newest_first() {
    let app = spawn().await;
    let token = alice();

    let (_, first) = place_order(&app, &token, checkout(json!([hoodie_line(1)]))).await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let (_, second) = place_order(&app, &token, checkout(json!([hoodie_line(2)]))).await;

    let (_, orders) = get("/orders").auth(&token).send(&app.router).await;
    let ids: Vec<&str> = orders
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["orderId"].as_str().unwrap())
        .collect();

    assert_eq!(ids, vec![second["orderId"].as_str().unwrap(), first["orderId"].as_str().unwrap()]);
}
