#![allow(clippy::unwrap_used)]

use crate::catalog::tests::fixture;
use crate::config::Settings;
use crate::control::{configure, cors, SessionMiddlewareFactory};
use crate::seed::{self, SeededCatalog};
use crate::Services;
use actix_web::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, AUTHORIZATION};
use actix_web::http::{Method, StatusCode};
use actix_web::test::{self, TestRequest};
use actix_web::App;
use serde_json::{json, Value};

async fn services() -> (Services, SeededCatalog) {
    let conn = crate::open_in_memory().await.unwrap();
    let settings = Settings {
        seed_on_startup: false,
        ..Default::default()
    };
    let services = Services::start(conn.clone(), &settings).await.unwrap();
    let ids = seed::insert(&conn, fixture()).await.unwrap();
    (services, ids)
}

const PASSWORD: &str = "correct horse";

macro_rules! app {
    ($services:expr) => {
        test::init_service(
            App::new()
                .wrap(SessionMiddlewareFactory {})
                .wrap(cors())
                .configure(|cfg| $services.register(cfg))
                .configure(configure),
        )
        .await
    };
}

macro_rules! send {
    ($app:expr, $req:expr) => {{
        let res = test::call_service(&$app, $req.to_request()).await;
        let status = res.status();
        let body: Value = test::read_body_json(res).await;
        (status, body)
    }};
}

macro_rules! login {
    ($app:expr, $email:expr) => {{
        let (status, body) = send!(
            $app,
            TestRequest::post()
                .uri("/api/login")
                .set_json(json!({"name": "Guest", "email": $email, "password": PASSWORD}))
        );
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]["token"]
            .as_str()
            .map(|t| format!("Bearer {t}"))
            .unwrap()
    }};
}

#[actix_web::test]
async fn index_is_public() {
    let (services, _) = services().await;
    let app = app!(services);
    let res = test::call_service(&app, TestRequest::get().uri("/").to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[actix_web::test]
async fn requests_without_session_are_unauthorized() {
    let (services, _) = services().await;
    let app = app!(services);
    let (status, body) = send!(app, TestRequest::get().uri("/api/cart"));
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = send!(
        app,
        TestRequest::get()
            .uri("/api/categories")
            .insert_header((AUTHORIZATION, "Bearer not-a-session"))
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn logout_invalidates_token() {
    let (services, _) = services().await;
    let app = app!(services);
    let auth = login!(app, "guest@example.com");
    let (status, body) = send!(
        app,
        TestRequest::get()
            .uri("/api/me")
            .insert_header((AUTHORIZATION, auth.clone()))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "guest@example.com");

    let (status, body) = send!(
        app,
        TestRequest::post()
            .uri("/api/logout")
            .insert_header((AUTHORIZATION, auth.clone()))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "logged_out"}));

    let (status, _) = send!(
        app,
        TestRequest::get()
            .uri("/api/me")
            .insert_header((AUTHORIZATION, auth))
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn invalid_login_is_rejected() {
    let (services, _) = services().await;
    let app = app!(services);
    let (status, body) = send!(
        app,
        TestRequest::post()
            .uri("/api/login")
            .set_json(json!({"name": "Guest", "email": "nope", "password": PASSWORD}))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("email"));

    let (status, _) = send!(
        app,
        TestRequest::post()
            .uri("/api/login")
            .set_json(json!({"name": "Guest", "email": "guest@example.com"}))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send!(
        app,
        TestRequest::post()
            .uri("/api/login")
            .set_json(json!({"name": "Guest", "email": "guest@example.com", "password": "short"}))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("password"));
}

#[actix_web::test]
async fn known_email_needs_its_password() {
    let (services, ids) = services().await;
    let app = app!(services);
    let owner = login!(app, "owner@example.com");
    let (_, body) = send!(
        app,
        TestRequest::post()
            .uri("/api/cart")
            .insert_header((AUTHORIZATION, owner))
            .set_json(json!({"itemId": ids.items[0], "shopId": ids.shops[0], "price": 55.0}))
    );
    assert_eq!(body["message"], "added");

    for attempt in [
        json!({"name": "Intruder", "email": "owner@example.com", "password": "guessed password"}),
        json!({"name": "Intruder", "email": "OWNER@example.com ", "password": "guessed password"}),
    ] {
        let (status, body) = send!(
            app,
            TestRequest::post().uri("/api/login").set_json(&attempt)
        );
        assert_eq!(status, StatusCode::BAD_REQUEST, "{attempt}");
        assert!(body["error"].as_str().unwrap().contains("password"));
        assert!(body.get("data").is_none());
    }

    let again = login!(app, "owner@example.com");
    let (_, body) = send!(
        app,
        TestRequest::get()
            .uri("/api/cart")
            .insert_header((AUTHORIZATION, again))
    );
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn bearer_scheme_is_case_insensitive() {
    let (services, _) = services().await;
    let app = app!(services);
    let auth = login!(app, "guest@example.com");
    let token = auth.trim_start_matches("Bearer ").to_string();
    for header in [format!("bearer {token}"), format!("BEARER  {token}")] {
        let (status, _) = send!(
            app,
            TestRequest::get()
                .uri("/api/me")
                .insert_header((AUTHORIZATION, header.clone()))
        );
        assert_eq!(status, StatusCode::OK, "{header}");
    }
    let (status, _) = send!(
        app,
        TestRequest::get()
            .uri("/api/me")
            .insert_header((AUTHORIZATION, format!("Basic {token}")))
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn preflight_is_answered_everywhere() {
    let (services, _) = services().await;
    let app = app!(services);
    for uri in ["/api/cart", "/api/categories", "/api/cart/update", "/api/items/1/shops"] {
        let res = test::call_service(
            &app,
            TestRequest::default()
                .method(Method::OPTIONS)
                .uri(uri)
                .insert_header(("Origin", "http://localhost:3000"))
                .insert_header(("Access-Control-Request-Method", "POST"))
                .insert_header(("Access-Control-Request-Headers", "authorization"))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT, "{uri}");
        assert_eq!(
            res.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*",
            "{uri}"
        );
    }
    let res = test::call_service(&app, TestRequest::get().uri("/nowhere").to_request()).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn catalog_endpoints() {
    let (services, ids) = services().await;
    let app = app!(services);
    let auth = login!(app, "guest@example.com");
    let get = |uri: String| {
        TestRequest::get()
            .uri(&uri)
            .insert_header((AUTHORIZATION, auth.clone()))
    };

    let (status, body) = send!(app, get("/api/categories".to_string()));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "success");
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (_, body) = send!(app, get("/api/items".to_string()));
    assert_eq!(body["data"].as_array().unwrap().len(), 9);

    let (_, body) = send!(app, get("/api/search?q=MILK".to_string()));
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    let (status, body) = send!(app, get("/api/search?q=".to_string()));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
    let (_, body) = send!(app, get("/api/search".to_string()));
    assert_eq!(body["data"], json!([]));

    let milk = ids.items[0];
    let (_, body) = send!(app, get(format!("/api/items/{milk}")));
    assert_eq!(body["data"]["name"], "Milk");

    let (_, body) = send!(app, get(format!("/api/items/{milk}/shops")));
    let shops = body["data"].as_array().unwrap();
    assert_eq!(shops.len(), 3);
    assert_eq!(shops[0]["name"], "Near Store");
    assert_eq!(shops[0]["stock"], 0);
    assert_eq!(shops[0]["price"], 50.0);

    let (_, body) = send!(app, get(format!("/api/items/{milk}/related")));
    let related = body["data"].as_array().unwrap();
    assert_eq!(related.len(), 5);
    assert!(related.iter().all(|i| i["id"] != milk));
}

#[actix_web::test]
async fn unknown_items_are_bad_requests() {
    let (services, _) = services().await;
    let app = app!(services);
    let auth = login!(app, "guest@example.com");
    for uri in ["/api/items/9999", "/api/items/9999/related", "/api/items/abc"] {
        let (status, body) = send!(
            app,
            TestRequest::get()
                .uri(uri)
                .insert_header((AUTHORIZATION, auth.clone()))
        );
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body["error"].is_string(), "{uri}");
    }
    let (_, body) = send!(
        app,
        TestRequest::get()
            .uri("/api/items/9999")
            .insert_header((AUTHORIZATION, auth))
    );
    assert_eq!(body["error"], "Item not found");
}

#[actix_web::test]
async fn cart_lifecycle() {
    let (services, ids) = services().await;
    let app = app!(services);
    let auth = login!(app, "guest@example.com");
    let post = |uri: &str, body: Value| {
        TestRequest::post()
            .uri(uri)
            .insert_header((AUTHORIZATION, auth.clone()))
            .set_json(body)
    };
    let (item, shop) = (ids.items[0], ids.shops[1]);

    let (status, body) = send!(
        app,
        post("/api/cart", json!({"itemId": item, "shopId": shop, "price": 50.0}))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "added", "data": {"itemId": item, "quantity": 1}}));

    let (_, body) = send!(
        app,
        post(
            "/api/cart",
            json!({"itemId": item, "shopId": shop, "price": 999.0, "quantity": 2})
        )
    );
    assert_eq!(body, json!({"message": "updated", "data": {"itemId": item, "quantity": 3}}));

    let (_, body) = send!(
        app,
        TestRequest::get()
            .uri("/api/cart")
            .insert_header((AUTHORIZATION, auth.clone()))
    );
    let lines = body["data"].as_array().unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["price"], 50.0);
    assert_eq!(lines[0]["quantity"], 3);
    assert_eq!(lines[0]["shop_name"], "Near Store");
    let id = lines[0]["id"].as_i64().unwrap();

    let (_, body) = send!(app, post("/api/cart/update", json!({"id": id, "quantity": 5})));
    assert_eq!(body, json!({"message": "updated", "data": {"id": id, "quantity": 5}}));

    let (_, body) = send!(app, post("/api/cart/update", json!({"id": id, "quantity": 0})));
    assert_eq!(body, json!({"message": "deleted", "data": {"id": id}}));

    let (status, body) = send!(app, post("/api/cart/update", json!({"id": id, "quantity": 2})));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (_, body) = send!(app, post("/api/cart/clear", json!({})));
    assert_eq!(body, json!({"message": "cleared"}));
    let (_, body) = send!(
        app,
        TestRequest::get()
            .uri("/api/cart")
            .insert_header((AUTHORIZATION, auth))
    );
    assert_eq!(body["data"], json!([]));
}

#[actix_web::test]
async fn malformed_cart_bodies_are_rejected() {
    let (services, ids) = services().await;
    let app = app!(services);
    let auth = login!(app, "guest@example.com");
    let bodies = [
        json!({"shopId": ids.shops[0], "price": 10.0}),
        json!({"itemId": ids.items[0], "shopId": ids.shops[0], "price": "cheap"}),
        json!({"itemId": ids.items[0], "shopId": ids.shops[0], "price": -1.0}),
        json!({"itemId": ids.items[0], "shopId": ids.shops[0], "price": 10.0, "quantity": 0}),
        json!({"itemId": 9999, "shopId": ids.shops[0], "price": 10.0}),
    ];
    for body in bodies {
        let (status, res) = send!(
            app,
            TestRequest::post()
                .uri("/api/cart")
                .insert_header((AUTHORIZATION, auth.clone()))
                .set_json(&body)
        );
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert!(res["error"].is_string(), "{body}");
    }
}

#[actix_web::test]
async fn carts_are_per_shopper() {
    let (services, ids) = services().await;
    let app = app!(services);
    let a = login!(app, "a@example.com");
    let b = login!(app, "b@example.com");
    let (_, body) = send!(
        app,
        TestRequest::post()
            .uri("/api/cart")
            .insert_header((AUTHORIZATION, a.clone()))
            .set_json(json!({"itemId": ids.items[0], "shopId": ids.shops[0], "price": 55.0}))
    );
    assert_eq!(body["message"], "added");

    let (_, body) = send!(
        app,
        TestRequest::get()
            .uri("/api/cart")
            .insert_header((AUTHORIZATION, b))
    );
    assert_eq!(body["data"], json!([]));
}

#[actix_web::test]
async fn placing_an_order_empties_the_cart() {
    let (services, ids) = services().await;
    let app = app!(services);
    let auth = login!(app, "guest@example.com");

    let (status, body) = send!(
        app,
        TestRequest::post()
            .uri("/api/orders")
            .insert_header((AUTHORIZATION, auth.clone()))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("cart"));

    send!(
        app,
        TestRequest::post()
            .uri("/api/cart")
            .insert_header((AUTHORIZATION, auth.clone()))
            .set_json(json!({"itemId": ids.items[0], "shopId": ids.shops[2], "price": 52.0, "quantity": 2}))
    );
    let (status, body) = send!(
        app,
        TestRequest::post()
            .uri("/api/orders")
            .insert_header((AUTHORIZATION, auth.clone()))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "placed");
    assert_eq!(body["data"]["subtotal"], 104.0);
    assert_eq!(body["data"]["total"], 169.0);
    assert_eq!(body["data"]["payment"], "cash_on_delivery");
    assert!(body["data"]["shopper_id"].is_i64());
    assert_eq!(body["data"]["lines"][0]["shop_name"], "Middle Bazaar");

    let (_, body) = send!(
        app,
        TestRequest::get()
            .uri("/api/cart")
            .insert_header((AUTHORIZATION, auth.clone()))
    );
    assert_eq!(body["data"], json!([]));
    let (_, body) = send!(
        app,
        TestRequest::get()
            .uri("/api/orders")
            .insert_header((AUTHORIZATION, auth))
    );
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}
