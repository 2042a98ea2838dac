//! End-to-end tests against PostgreSQL.
//!
//! Each test creates a throwaway database on the server named by
//! `DATABASE_URL` and runs the migrations into it. Stripe is replaced by a
//! local HTTP server speaking the two Checkout Session endpoints we call.
//! Without `DATABASE_URL` every test returns early.

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{Request, StatusCode, header};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use shared::error::ErrorCode;
use shared::models::{TicketOrder, TicketOrderStatus};
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use tower::ServiceExt;

use trattoria_server::api::create_router;
use trattoria_server::availability::ReservationPolicy;
use trattoria_server::config::Config;
use trattoria_server::db;
use trattoria_server::email::MemoryMailer;
use trattoria_server::otp::{MAX_ATTEMPTS, OtpStore};
use trattoria_server::state::AppState;
use trattoria_server::storage::MemoryImageStore;
use trattoria_server::stripe::sign_webhook_payload;
use trattoria_server::util::{now_millis, snowflake_id};

const WEBHOOK_SECRET: &str = "whsec_dev";

// ── fixtures ──

/// Fresh migrated database, or `None` when no server is configured
async fn test_pool() -> Option<PgPool> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let admin = PgPool::connect(&url).await.unwrap();
    let name = format!("trattoria_test_{}", snowflake_id());
    sqlx::query(&format!("CREATE DATABASE {name}"))
        .execute(&admin)
        .await
        .unwrap();

    let options = PgConnectOptions::from_str(&url).unwrap().database(&name);
    let pool = PgPoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    Some(pool)
}

/// Checkout Session endpoints with recorded requests
#[derive(Clone, Default)]
struct FakeStripe {
    created: Arc<Mutex<Vec<Vec<(String, String)>>>>,
    unpaid: Arc<Mutex<HashSet<String>>>,
}

impl FakeStripe {
    fn last_form(&self) -> Vec<(String, String)> {
        self.created.lock().unwrap().last().cloned().unwrap_or_default()
    }

    fn field(form: &[(String, String)], key: &str) -> Option<String> {
        form.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    }
}

async fn create_session(
    State(fake): State<FakeStripe>,
    Form(form): Form<Vec<(String, String)>>,
) -> Json<Value> {
    let mut created = fake.created.lock().unwrap();
    created.push(form);
    let id = format!("cs_test_{}", created.len());
    Json(json!({
        "id": id,
        "url": format!("https://checkout.stripe.test/{id}"),
        "status": "open",
        "payment_status": "unpaid",
    }))
}

async fn retrieve_session(State(fake): State<FakeStripe>, Path(id): Path<String>) -> Json<Value> {
    let paid = !fake.unpaid.lock().unwrap().contains(&id);
    Json(json!({
        "id": id,
        "status": "complete",
        "payment_status": if paid { "paid" } else { "unpaid" },
    }))
}

async fn spawn_fake_stripe() -> (String, FakeStripe) {
    let fake = FakeStripe::default();
    let app = Router::new()
        .route("/v1/checkout/sessions", post(create_session))
        .route("/v1/checkout/sessions/{id}", get(retrieve_session))
        .with_state(fake.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    (format!("http://{addr}"), fake)
}

/// UTC dining room, open every day 18:00-23:00, four covers, 90 minute seatings
fn small_room() -> ReservationPolicy {
    ReservationPolicy {
        timezone: chrono_tz::UTC,
        open: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        close: NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
        slot_minutes: 30,
        seating_minutes: 90,
        max_covers: 4,
        max_party_size: 4,
        lead_minutes: 60,
        horizon_days: 30,
        closed_weekdays: vec![],
    }
}

struct TestApp {
    router: Router,
    pool: PgPool,
    mailer: Arc<MemoryMailer>,
    stripe: FakeStripe,
}

async fn test_app() -> Option<TestApp> {
    let pool = test_pool().await?;
    let (stripe_base, stripe) = spawn_fake_stripe().await;

    let mut config = Config::development("postgres://unused");
    config.stripe_api_base = stripe_base;
    config.stripe_webhook_secret = WEBHOOK_SECRET.into();
    config.reservation = small_room();

    let mailer = Arc::new(MemoryMailer::new());
    let state = AppState::from_parts(
        &config,
        pool.clone(),
        mailer.clone(),
        Arc::new(MemoryImageStore::new()),
    );
    Some(TestApp {
        router: create_router(state),
        pool,
        mailer,
        stripe,
    })
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body: Bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
    send(router, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn post_json(router: &Router, uri: &str, payload: Value) -> (StatusCode, Value) {
    let req = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", "198.51.100.30")
        .body(Body::from(payload.to_string()))
        .unwrap();
    send(router, req).await
}

async fn post_webhook(router: &Router, event: &Value) -> StatusCode {
    let payload = event.to_string();
    let signature = sign_webhook_payload(payload.as_bytes(), WEBHOOK_SECRET, now_millis() / 1000);
    let req = Request::post("/stripe/webhook")
        .header("stripe-signature", signature)
        .body(Body::from(payload))
        .unwrap();
    router.clone().oneshot(req).await.unwrap().status()
}

fn session_event(event_id: &str, kind: &str, session: Value) -> Value {
    json!({
        "id": event_id,
        "type": kind,
        "data": { "object": session },
    })
}

fn expect_code(body: &Value, code: ErrorCode) {
    assert_eq!(body["code"].as_u64(), Some(u64::from(code.code())), "body: {body}");
}

fn tomorrow() -> NaiveDate {
    Utc::now().date_naive() + Duration::days(1)
}

fn at(date: NaiveDate, hour: u32, minute: u32) -> i64 {
    date.and_hms_opt(hour, minute, 0)
        .unwrap()
        .and_utc()
        .timestamp_millis()
}

async fn mark_verified(pool: &PgPool, email: &str) {
    let now = now_millis();
    db::verification::upsert_verified(pool, email, now, now + 3_600_000)
        .await
        .unwrap();
}

async fn insert_event(pool: &PgPool, starts_at: i64, ends_at: i64, blocks: bool) -> i64 {
    let id = snowflake_id();
    sqlx::query(
        "INSERT INTO events
            (id, title, starts_at, ends_at, price_cents, capacity, blocks_reservations, is_published)
         VALUES ($1, 'Truffle dinner', $2, $3, 4500, 30, $4, TRUE)",
    )
    .bind(id)
    .bind(starts_at)
    .bind(ends_at)
    .bind(blocks)
    .execute(pool)
    .await
    .unwrap();
    id
}

async fn insert_category(pool: &PgPool, active: bool) -> i64 {
    let id = snowflake_id();
    sqlx::query("INSERT INTO menu_categories (id, name, is_active) VALUES ($1, 'Primi', $2)")
        .bind(id)
        .bind(active)
        .execute(pool)
        .await
        .unwrap();
    id
}

async fn insert_item(pool: &PgPool, category_id: i64, name: &str, price_cents: i64, available: bool) -> i64 {
    let id = snowflake_id();
    sqlx::query(
        "INSERT INTO menu_items (id, category_id, name, price_cents, is_available)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(id)
    .bind(category_id)
    .bind(name)
    .bind(price_cents)
    .bind(available)
    .execute(pool)
    .await
    .unwrap();
    id
}

async fn insert_ticket_order(pool: &PgPool, event_id: i64, quantity: i32, session_id: &str) -> i64 {
    let order = TicketOrder {
        id: snowflake_id(),
        event_id,
        name: "Marco".into(),
        email: "marco@example.com".into(),
        quantity,
        unit_price_cents: 4500,
        total_cents: 4500 * i64::from(quantity),
        status: TicketOrderStatus::Pending,
        stripe_session_id: None,
        email_status: "pending".into(),
        created_at: now_millis(),
        paid_at: None,
    };
    db::tickets::insert_order(pool, &order).await.unwrap();
    db::tickets::set_session(pool, order.id, session_id).await.unwrap();
    order.id
}

fn reservation(email: &str, time: &str, party_size: i32) -> Value {
    json!({
        "name": "Anna Rossi",
        "email": email,
        "date": tomorrow().format("%Y-%m-%d").to_string(),
        "time": time,
        "party_size": party_size,
    })
}

// ── reservations ──

#[tokio::test]
async fn test_reservation_requires_verified_email() {
    let Some(app) = test_app().await else { return };

    let (status, body) = post_json(
        &app.router,
        "/api/reservations",
        reservation("stranger@example.com", "19:00", 2),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    expect_code(&body, ErrorCode::EmailNotVerified);
}

#[tokio::test]
async fn test_full_slot_is_rejected_on_recompute() {
    let Some(app) = test_app().await else { return };
    mark_verified(&app.pool, "anna@example.com").await;
    mark_verified(&app.pool, "luca@example.com").await;

    let (status, body) = post_json(
        &app.router,
        "/api/reservations",
        reservation("anna@example.com", "19:00", 3),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["reservation"]["status"], "confirmed");
    assert_eq!(body["reservation"]["starts_at"], at(tomorrow(), 19, 0));

    // 18:00-19:30 and 19:00-20:30 overlap the three seated covers
    for time in ["18:00", "19:00", "20:00"] {
        let (status, body) = post_json(
            &app.router,
            "/api/reservations",
            reservation("luca@example.com", time, 2),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT, "{time}: {body}");
        expect_code(&body, ErrorCode::SlotUnavailable);
        assert_eq!(body["details"]["reason"], "full");
    }

    // Starts when the first seating ends
    let (status, _) = post_json(
        &app.router,
        "/api/reservations",
        reservation("luca@example.com", "20:30", 2),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let uri = format!(
        "/api/reservations/availability?date={}&party_size=2",
        tomorrow().format("%Y-%m-%d")
    );
    let (status, body) = get_json(&app.router, &uri).await;
    assert_eq!(status, StatusCode::OK);
    let slot = |time: &str| {
        body["slots"]
            .as_array()
            .unwrap()
            .iter()
            .find(|s| s["time"] == time)
            .cloned()
            .unwrap()
    };
    assert_eq!(slot("19:00")["reason"], "full");
    assert_eq!(slot("18:00")["available"], false);
    assert_eq!(slot("21:30")["available"], true);
}

#[tokio::test]
async fn test_blocking_event_rejects_overlapping_slots() {
    let Some(app) = test_app().await else { return };
    mark_verified(&app.pool, "anna@example.com").await;
    insert_event(&app.pool, at(tomorrow(), 20, 0), at(tomorrow(), 22, 0), true).await;

    let (status, body) = post_json(
        &app.router,
        "/api/reservations",
        reservation("anna@example.com", "19:00", 2),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["details"]["reason"], "event");

    // 18:30-20:00 ends as the event starts
    let (status, _) = post_json(
        &app.router,
        "/api/reservations",
        reservation("anna@example.com", "18:30", 2),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_cancellation_is_idempotent() {
    let Some(app) = test_app().await else { return };
    mark_verified(&app.pool, "anna@example.com").await;

    let (_, body) = post_json(
        &app.router,
        "/api/reservations",
        reservation("anna@example.com", "19:00", 2),
    )
    .await;
    let id = body["reservation"]["id"].as_i64().unwrap();
    let uri = format!("/api/reservations/{id}/cancel");

    let (status, body) = post_json(&app.router, &uri, json!({ "email": "other@example.com" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    expect_code(&body, ErrorCode::ReservationNotFound);

    for _ in 0..2 {
        let (status, body) =
            post_json(&app.router, &uri, json!({ "email": "Anna@Example.com" })).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["reservation"]["status"], "cancelled");
    }

    let cancellations = app
        .mailer
        .sent()
        .into_iter()
        .filter(|e| e.subject.contains("cancelled"))
        .count();
    assert_eq!(cancellations, 1);

    // The freed covers are bookable again
    let (status, _) = post_json(
        &app.router,
        "/api/reservations",
        reservation("anna@example.com", "19:00", 4),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

// ── orders ──

#[tokio::test]
async fn test_order_is_priced_from_menu() {
    let Some(app) = test_app().await else { return };
    let category = insert_category(&app.pool, true).await;
    let carbonara = insert_item(&app.pool, category, "Carbonara", 1300, true).await;
    let tiramisu = insert_item(&app.pool, category, "Tiramisu", 650, true).await;

    let (status, body) = post_json(
        &app.router,
        "/api/orders",
        json!({
            "customer_name": "Giulia",
            "email": "giulia@example.com",
            "total_cents": 1,
            "items": [
                { "menu_item_id": carbonara, "quantity": 2, "price_cents": 1, "unit_price_cents": 1 },
                { "menu_item_id": tiramisu, "quantity": 1, "name": "Free dessert" },
            ],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["total_cents"], 2 * 1300 + 650);
    assert!(body["checkout_url"].as_str().unwrap().starts_with("https://checkout.stripe.test/"));

    let form = app.stripe.last_form();
    assert_eq!(
        FakeStripe::field(&form, "line_items[0][price_data][unit_amount]").as_deref(),
        Some("1300")
    );
    assert_eq!(
        FakeStripe::field(&form, "line_items[1][price_data][product_data][name]").as_deref(),
        Some("Tiramisu")
    );
    assert_eq!(FakeStripe::field(&form, "metadata[kind]").as_deref(), Some("order"));

    let order_id = body["order_id"].as_i64().unwrap();
    let (status, detail) = get_json(&app.router, &format!("/api/orders/{order_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["status"], "pending_payment");
    assert_eq!(detail["total_cents"], 3250);
    assert_eq!(detail["lines"][0]["unit_price_cents"], 1300);
    assert_eq!(detail["lines"][1]["name"], "Tiramisu");
}

#[tokio::test]
async fn test_unorderable_items_are_rejected() {
    let Some(app) = test_app().await else { return };
    let active = insert_category(&app.pool, true).await;
    let hidden = insert_category(&app.pool, false).await;
    let sold_out = insert_item(&app.pool, active, "Ossobuco", 2200, false).await;
    let off_menu = insert_item(&app.pool, hidden, "Winter special", 1800, true).await;

    for id in [sold_out, off_menu, 999] {
        let (status, body) = post_json(
            &app.router,
            "/api/orders",
            json!({
                "customer_name": "Giulia",
                "email": "giulia@example.com",
                "items": [{ "menu_item_id": id, "quantity": 1 }],
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{id}");
        expect_code(&body, ErrorCode::MenuItemUnavailable);
        assert_eq!(body["details"]["menu_item_id"], id);
    }
    assert!(app.stripe.created.lock().unwrap().is_empty());

    let (status, body) = get_json(&app.router, &format!("/api/menu/items/{off_menu}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    expect_code(&body, ErrorCode::MenuItemNotFound);
}

// ── tickets ──

#[tokio::test]
async fn test_ticket_checkout_and_repeat_confirmation() {
    let Some(app) = test_app().await else { return };
    let event_id = insert_event(
        &app.pool,
        now_millis() + 7 * 86_400_000,
        now_millis() + 7 * 86_400_000 + 3 * 3_600_000,
        false,
    )
    .await;
    mark_verified(&app.pool, "marco@example.com").await;

    let (status, body) = post_json(
        &app.router,
        &format!("/api/events/{event_id}/checkout"),
        json!({ "name": "Marco", "email": "marco@example.com", "quantity": 2 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let session_id = body["checkout_url"]
        .as_str()
        .unwrap()
        .rsplit('/')
        .next()
        .unwrap()
        .to_string();
    let form = app.stripe.last_form();
    assert_eq!(FakeStripe::field(&form, "metadata[kind]").as_deref(), Some("tickets"));
    assert_eq!(
        FakeStripe::field(&form, "line_items[0][price_data][unit_amount]").as_deref(),
        Some("4500")
    );

    let (status, first) =
        post_json(&app.router, "/api/tickets/confirm", json!({ "session_id": session_id })).await;
    assert_eq!(status, StatusCode::OK, "{first}");
    assert_eq!(first["order"]["status"], "paid");
    assert_eq!(first["tickets"].as_array().unwrap().len(), 2);
    assert!(first.get("warning").is_none());

    let (status, second) =
        post_json(&app.router, "/api/tickets/confirm", json!({ "session_id": session_id })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["tickets"], first["tickets"]);

    let ticket_emails = app
        .mailer
        .sent()
        .into_iter()
        .filter(|e| e.to == "marco@example.com")
        .count();
    assert_eq!(ticket_emails, 1);

    let event = db::events::find(&app.pool, event_id).await.unwrap().unwrap();
    assert_eq!(event.tickets_sold, 2);
}

#[tokio::test]
async fn test_unpaid_session_issues_nothing() {
    let Some(app) = test_app().await else { return };
    let event_id = insert_event(&app.pool, now_millis() + 86_400_000, now_millis() + 90_000_000, false).await;
    let order_id = insert_ticket_order(&app.pool, event_id, 1, "cs_unpaid").await;
    app.stripe.unpaid.lock().unwrap().insert("cs_unpaid".into());

    let (status, body) =
        post_json(&app.router, "/api/tickets/confirm", json!({ "session_id": "cs_unpaid" })).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    expect_code(&body, ErrorCode::PaymentNotCompleted);
    assert!(db::tickets::list_tickets(&app.pool, order_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_ticket_email_failure_is_remembered() {
    let Some(app) = test_app().await else { return };
    let event_id = insert_event(&app.pool, now_millis() + 86_400_000, now_millis() + 90_000_000, false).await;
    let order_id = insert_ticket_order(&app.pool, event_id, 3, "cs_mailfail").await;

    app.mailer.set_failing(true);
    let (status, body) =
        post_json(&app.router, "/api/tickets/confirm", json!({ "session_id": "cs_mailfail" })).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["tickets"].as_array().unwrap().len(), 3);
    assert_eq!(body["order"]["email_status"], "failed");
    assert!(body["warning"].is_string());

    app.mailer.set_failing(false);
    let (status, body) =
        post_json(&app.router, "/api/tickets/confirm", json!({ "session_id": "cs_mailfail" })).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["warning"].is_string());
    assert!(app.mailer.sent().is_empty());

    let order = db::tickets::find_order(&app.pool, order_id).await.unwrap().unwrap();
    assert_eq!(order.email_status, "failed");
}

// ── webhook ──

fn order_session(session_id: &str, order_id: i64, payment_status: &str) -> Value {
    json!({
        "id": session_id,
        "status": "complete",
        "payment_status": payment_status,
        "metadata": { "kind": "order", "order_id": order_id.to_string() },
    })
}

async fn pending_order(app: &TestApp) -> i64 {
    let category = insert_category(&app.pool, true).await;
    let item = insert_item(&app.pool, category, "Lasagna", 1500, true).await;
    let (status, body) = post_json(
        &app.router,
        "/api/orders",
        json!({
            "customer_name": "Giulia",
            "email": "giulia@example.com",
            "items": [{ "menu_item_id": item, "quantity": 1 }],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["order_id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_webhook_skips_duplicate_event_ids() {
    let Some(app) = test_app().await else { return };
    let order_id = pending_order(&app).await;

    let expired = session_event(
        "evt_dup",
        "checkout.session.expired",
        order_session("cs_a", order_id, "unpaid"),
    );
    assert_eq!(post_webhook(&app.router, &expired).await, StatusCode::OK);
    let order = db::orders::find(&app.pool, order_id).await.unwrap().unwrap();
    assert_eq!(order.status.as_db(), "expired");

    // Same event id again: acknowledged without handling
    let replay = session_event(
        "evt_dup",
        "checkout.session.completed",
        order_session("cs_a", order_id, "paid"),
    );
    assert_eq!(post_webhook(&app.router, &replay).await, StatusCode::OK);
    let order = db::orders::find(&app.pool, order_id).await.unwrap().unwrap();
    assert_eq!(order.status.as_db(), "expired");
    assert!(app.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_late_payment_on_expired_order_is_honoured() {
    let Some(app) = test_app().await else { return };
    let order_id = pending_order(&app).await;
    assert!(db::orders::expire(&app.pool, order_id).await.unwrap());

    let paid = session_event(
        "evt_late_order",
        "checkout.session.completed",
        order_session("cs_late", order_id, "paid"),
    );
    assert_eq!(post_webhook(&app.router, &paid).await, StatusCode::OK);

    let (_, detail) = get_json(&app.router, &format!("/api/orders/{order_id}")).await;
    assert_eq!(detail["status"], "paid");
    assert!(detail["paid_at"].as_i64().is_some());
    let confirmation = app.mailer.last_to("giulia@example.com").unwrap();
    assert!(confirmation.text.contains("Lasagna"));

    // A redelivery under a new id changes nothing and sends nothing
    let again = session_event(
        "evt_late_order_2",
        "checkout.session.completed",
        order_session("cs_late", order_id, "paid"),
    );
    assert_eq!(post_webhook(&app.router, &again).await, StatusCode::OK);
    assert_eq!(app.mailer.sent().len(), 1);
}

#[tokio::test]
async fn test_late_payment_on_expired_ticket_order_issues_tickets() {
    let Some(app) = test_app().await else { return };
    let event_id = insert_event(&app.pool, now_millis() + 86_400_000, now_millis() + 90_000_000, false).await;
    let order_id = insert_ticket_order(&app.pool, event_id, 2, "cs_late_tickets").await;
    assert!(db::tickets::expire(&app.pool, order_id).await.unwrap());

    let paid = session_event(
        "evt_late_tickets",
        "checkout.session.async_payment_succeeded",
        json!({
            "id": "cs_late_tickets",
            "payment_status": "paid",
            "metadata": { "kind": "tickets", "ticket_order_id": order_id.to_string() },
        }),
    );
    assert_eq!(post_webhook(&app.router, &paid).await, StatusCode::OK);

    let order = db::tickets::find_order(&app.pool, order_id).await.unwrap().unwrap();
    assert_eq!(order.status, TicketOrderStatus::Paid);
    assert_eq!(order.email_status, "sent");
    assert_eq!(db::tickets::list_tickets(&app.pool, order_id).await.unwrap().len(), 2);
}

// ── verification codes ──

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stored_code_lockout_holds_under_concurrency() {
    let Some(pool) = test_pool().await else { return };
    let store = OtpStore::new(pool.clone());
    let now = now_millis();
    let code = store.issue("guest@example.com", now).await.unwrap();

    let handles: Vec<_> = (0..24)
        .map(|i| format!("{:06}", 100_000 + i))
        .filter(|guess| *guess != code)
        .map(|guess| {
            let store = store.clone();
            tokio::spawn(async move { store.verify("guest@example.com", &guess, now).await })
        })
        .collect();

    let mut evaluated = 0;
    for handle in handles {
        let err: shared::error::AppError = handle.await.unwrap().unwrap_err().into();
        match err.code {
            ErrorCode::VerificationCodeInvalid => evaluated += 1,
            ErrorCode::TooManyAttempts => {}
            other => panic!("unexpected error {other:?}"),
        }
    }
    assert_eq!(evaluated, MAX_ATTEMPTS);

    let stored = db::verification::find_code(&pool, "guest@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.attempts, MAX_ATTEMPTS);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stored_code_is_consumed_once() {
    let Some(pool) = test_pool().await else { return };
    let store = OtpStore::new(pool.clone());
    let now = now_millis();
    let code = store.issue("guest@example.com", now).await.unwrap();

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let store = store.clone();
            let code = code.clone();
            tokio::spawn(async move { store.verify("guest@example.com", &code, now).await })
        })
        .collect();
    let mut verified = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            verified += 1;
        }
    }
    assert_eq!(verified, 1);
    assert!(db::verification::find_code(&pool, "guest@example.com")
        .await
        .unwrap()
        .is_none());
    assert!(store.verified_until("guest@example.com", now).await.unwrap().is_some());
}
