use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{NaiveDateTime, Utc};
use tower::ServiceExt;

use notedesk::config::AppConfig;
use notedesk::db;
use notedesk::handlers;
use notedesk::state::AppState;

// ── Helpers ──

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        api_token: "test-token".to_string(),
        cors_origin: None,
    }
}

fn test_state() -> Arc<AppState> {
    let conn = db::init_db(":memory:").unwrap();
    Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: test_config(),
    })
}

fn test_app(state: Arc<AppState>) -> Router {
    handlers::app(state)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("Authorization", "Bearer test-token")
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Authorization", "Bearer test-token")
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(res: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn create_lead(state: &Arc<AppState>, body: serde_json::Value) -> String {
    let res = test_app(state.clone())
        .oneshot(post_json("/api/leads", body))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    body_json(res).await["id"].as_str().unwrap().to_string()
}

// ── Auth ──

#[tokio::test]
async fn test_health_is_public() {
    let res = test_app(test_state())
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["status"], "ok");
}

#[tokio::test]
async fn test_api_requires_auth() {
    let res = test_app(test_state())
        .oneshot(
            Request::builder()
                .uri("/api/leads")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(res).await["error"], "unauthorized");
}

#[tokio::test]
async fn test_api_wrong_token() {
    let res = test_app(test_state())
        .oneshot(
            Request::builder()
                .uri("/api/leads")
                .header("Authorization", "Bearer wrong-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

// ── Note analysis ──

#[tokio::test]
async fn test_analyze_note() {
    let res = test_app(test_state())
        .oneshot(post_json(
            "/api/notes/analyze",
            serde_json::json!({
                "text": "Rappelez-moi le 15 mars pour discuter",
                "now": "2026-01-10T09:00:00"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    let suggestions = json["suggestions"].as_array().unwrap();
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0]["action_type"], "Call");
    assert_eq!(suggestions[0]["scheduled_date"], "2026-03-15T00:00:00");
    assert_eq!(suggestions[0]["confidence"], 90);
    assert_eq!(suggestions[0]["matched_text"], "le 15 mars");
    assert_eq!(suggestions[0]["label"], "Call le 15 mars 2026 à 00:00");
}

#[tokio::test]
async fn test_analyze_blank_note() {
    let res = test_app(test_state())
        .oneshot(post_json(
            "/api/notes/analyze",
            serde_json::json!({ "text": "   " }),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["suggestions"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_analyze_sorts_and_labels() {
    let res = test_app(test_state())
        .oneshot(post_json(
            "/api/notes/analyze",
            serde_json::json!({
                "text": "Visite le 20 août en après-midi. Estimation prévue le 02/08/2025.",
                "now": "2025-07-01T09:00:00"
            }),
        ))
        .await
        .unwrap();

    let json = body_json(res).await;
    let suggestions = json["suggestions"].as_array().unwrap();
    assert_eq!(suggestions.len(), 2);
    assert_eq!(suggestions[0]["scheduled_date"], "2025-08-02T00:00:00");
    assert_eq!(suggestions[1]["scheduled_date"], "2025-08-20T14:00:00");
    assert_eq!(suggestions[1]["label"], "Visites le 20 août 2025 à 14:00");
}

// ── Leads ──

#[tokio::test]
async fn test_create_lead_requires_name() {
    let res = test_app(test_state())
        .oneshot(post_json("/api/leads", serde_json::json!({ "name": "  " })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_lead_rejects_control_characters() {
    let state = test_state();
    for body in [
        serde_json::json!({ "name": "Dupont\r\nDTSTART:19700101T000000" }),
        serde_json::json!({ "name": "Dupont", "city": "Lyon\u{0007}" }),
    ] {
        let res = test_app(state.clone())
            .oneshot(post_json("/api/leads", body))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    let res = test_app(state)
        .oneshot(get("/api/leads"))
        .await
        .unwrap();
    assert_eq!(body_json(res).await.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_create_and_get_lead() {
    let state = test_state();
    let id = create_lead(
        &state,
        serde_json::json!({ "name": "Hélène Lefèvre", "city": "Orléans", "email": "" }),
    )
    .await;

    let res = test_app(state.clone())
        .oneshot(get(&format!("/api/leads/{id}")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["name"], "Hélène Lefèvre");
    assert_eq!(json["stage"], "new");
    assert!(json["email"].is_null());

    let res = test_app(state)
        .oneshot(get("/api/leads/does-not-exist"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_search_leads() {
    let state = test_state();
    create_lead(&state, serde_json::json!({ "name": "Hélène Lefèvre", "city": "Orléans" })).await;
    create_lead(&state, serde_json::json!({ "name": "Paul Girard", "city": "Lyon" })).await;
    create_lead(&state, serde_json::json!({ "name": "Paul Morel", "phone": "06 11 22 33 44" })).await;

    let res = test_app(state.clone())
        .oneshot(get("/api/leads?q=helene"))
        .await
        .unwrap();
    let json = body_json(res).await;
    let hits = json.as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["lead"]["name"], "Hélène Lefèvre");

    let res = test_app(state.clone())
        .oneshot(get("/api/leads?q=paul%20lyon"))
        .await
        .unwrap();
    let json = body_json(res).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["lead"]["name"], "Paul Girard");

    let res = test_app(state)
        .oneshot(get("/api/leads"))
        .await
        .unwrap();
    let json = body_json(res).await;
    assert_eq!(json.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_update_stage() {
    let state = test_state();
    let id = create_lead(&state, serde_json::json!({ "name": "Paul Girard" })).await;

    let res = test_app(state.clone())
        .oneshot(post_json(
            &format!("/api/leads/{id}/stage"),
            serde_json::json!({ "stage": "qualified" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["stage"], "qualified");

    let res = test_app(state)
        .oneshot(post_json(
            "/api/leads/ghost/stage",
            serde_json::json!({ "stage": "won" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_notes_returns_suggestions() {
    let state = test_state();
    let id = create_lead(&state, serde_json::json!({ "name": "Paul Girard" })).await;

    let res = test_app(state.clone())
        .oneshot(post_json(
            &format!("/api/leads/{id}/notes"),
            serde_json::json!({ "notes": "Visite le 12 mars 2099 en matinée" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["lead"]["notes"], "Visite le 12 mars 2099 en matinée");
    assert_eq!(json["suggestions"][0]["action_type"], "Visites");
    assert_eq!(json["suggestions"][0]["label"], "Visites le 12 mars 2099 à 10:00");

    let res = test_app(state)
        .oneshot(get(&format!("/api/leads/{id}/suggestions")))
        .await
        .unwrap();
    let json = body_json(res).await;
    assert_eq!(json["suggestions"].as_array().unwrap().len(), 1);
    assert_eq!(json["suggestions"][0]["scheduled_date"], "2099-03-12T10:00:00");
}

// ── Actions ──

#[tokio::test]
async fn test_accept_suggestion_and_complete() {
    let state = test_state();
    let lead_id = create_lead(&state, serde_json::json!({ "name": "Marie Dupont" })).await;

    let res = test_app(state.clone())
        .oneshot(post_json(
            &format!("/api/leads/{lead_id}/actions"),
            serde_json::json!({
                "action_type": "Follow up",
                "scheduled_date": "2099-04-03T11:30:00",
                "notes": "Suggéré depuis la note : « le 3 avril 2099 en fin de matinée »"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let json = body_json(res).await;
    assert_eq!(json["action_type"], "Follow up");
    assert_eq!(json["label"], "Follow up le 03 avril 2099 à 11:30");
    assert!(json["completed_date"].is_null());
    let action_id = json["id"].as_str().unwrap().to_string();

    let res = test_app(state.clone())
        .oneshot(get(&format!("/api/leads/{lead_id}/actions")))
        .await
        .unwrap();
    let json = body_json(res).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["id"], action_id.as_str());

    let res = test_app(state.clone())
        .oneshot(get("/api/actions/upcoming"))
        .await
        .unwrap();
    let json = body_json(res).await;
    assert_eq!(json.as_array().unwrap().len(), 1);

    let res = test_app(state.clone())
        .oneshot(post_json(
            &format!("/api/actions/{action_id}/complete"),
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let completed = body_json(res).await["completed_date"]
        .as_str()
        .unwrap()
        .to_string();
    let completed = NaiveDateTime::parse_from_str(&completed, "%Y-%m-%dT%H:%M:%S").unwrap();
    let drift = (Utc::now().naive_utc() - completed).num_seconds().abs();
    assert!(drift < 60, "completed_date should be UTC, drift {drift}s");

    let res = test_app(state.clone())
        .oneshot(post_json(
            &format!("/api/actions/{action_id}/complete"),
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = test_app(state)
        .oneshot(get("/api/actions/upcoming"))
        .await
        .unwrap();
    let json = body_json(res).await;
    assert_eq!(json.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_action_for_unknown_lead() {
    let res = test_app(test_state())
        .oneshot(post_json(
            "/api/leads/ghost/actions",
            serde_json::json!({ "scheduled_date": "2099-04-03T11:30:00" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_complete_unknown_action() {
    let res = test_app(test_state())
        .oneshot(post_json(
            "/api/actions/ghost/complete",
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

// ── Calendar ──

#[tokio::test]
async fn test_download_ics() {
    let state = test_state();
    let lead_id = create_lead(&state, serde_json::json!({ "name": "Marie Dupont" })).await;

    let res = test_app(state.clone())
        .oneshot(post_json(
            &format!("/api/leads/{lead_id}/actions"),
            serde_json::json!({
                "action_type": "Visites",
                "scheduled_date": "2099-08-05T14:00:00"
            }),
        ))
        .await
        .unwrap();
    let action_id = body_json(res).await["id"].as_str().unwrap().to_string();

    let res = test_app(state.clone())
        .oneshot(
            Request::builder()
                .uri(format!("/calendar/{action_id}.ics"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers()["content-type"],
        "text/calendar; charset=utf-8"
    );
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let ics = String::from_utf8(body.to_vec()).unwrap();
    assert!(ics.contains("SUMMARY:Visites - Marie Dupont"));
    assert!(ics.contains("DTSTART:20990805T140000"));
    assert!(ics.contains("DESCRIPTION:Aucune note"));

    let res = test_app(state)
        .oneshot(
            Request::builder()
                .uri("/calendar/missing.ics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

// ── Errors ──

#[tokio::test]
async fn test_database_failure_is_internal_error() {
    let state = test_state();
    let lead_id = create_lead(&state, serde_json::json!({ "name": "Marie Dupont" })).await;
    state
        .db
        .lock()
        .unwrap()
        .execute_batch("DROP TABLE actions")
        .unwrap();

    let res = test_app(state)
        .oneshot(get(&format!("/api/leads/{lead_id}/actions")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(res).await;
    assert!(json["error"].as_str().unwrap().starts_with("internal error:"));
}
