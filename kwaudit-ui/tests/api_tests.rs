//! Router tests driven through `tower::ServiceExt::oneshot`
//!
//! Backend-bound routes talk to a mock analysis backend served by axum on an
//! ephemeral port.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use kwaudit_common::config::AppConfig;
use kwaudit_common::db::{self, init_memory_database};
use kwaudit_common::session::Session;
use kwaudit_ui::{build_router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn mock_analyze(headers: axum::http::HeaderMap, Json(body): Json<Value>) -> Response {
    if headers.get("X-Azure-Token").and_then(|v| v.to_str().ok()) == Some(REJECTED_TOKEN_MARKER) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"detail": "bad token"}))).into_response();
    }
    let text = body["text"].as_str().unwrap_or_default().to_string();
    let keywords: Vec<String> = serde_json::from_value(body["keywords"].clone()).unwrap_or_default();
    let matched: Vec<&String> = keywords
        .iter()
        .filter(|k| text.to_lowercase().contains(&k.to_lowercase()))
        .collect();
    let sections: Vec<Value> = matched
        .iter()
        .map(|k| {
            let start = text.to_lowercase().find(&k.to_lowercase()).unwrap_or(0);
            json!({
                "start_index": start,
                "end_index": start + k.len(),
                "matched_text": text,
                "reason": "keyword",
                "confidence": "85%"
            })
        })
        .collect();

    Json(json!({
        "id": format!("id-{}", body["source_id"].as_str().unwrap_or_default()),
        "source_id": body["source_id"],
        "content_type": body["content_type"],
        "original_text": text,
        "keywords_searched": keywords,
        "keywords_matched": matched,
        "highlighted_sections": sections,
        "metadata": body["metadata"]
    }))
    .into_response()
}

/// Token value the mock backend answers with 401
const REJECTED_TOKEN_MARKER: &str = "reject";

async fn mock_full_text(Json(body): Json<Value>) -> Response {
    let original = body["original_text"].as_str().unwrap_or_default();
    Json(json!({
        "alternatives": [format!("{} (revised)", original), {"text": "Fair Access for all"}]
    }))
    .into_response()
}

async fn start_mock_backend() -> String {
    let app = Router::new()
        .route("/api/full-sentence-suggestion", post(mock_full_text))
        .route("/api/analyze", post(mock_analyze))
        .route("/api/keywordsearch", post(mock_analyze));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn test_state(backend_url: &str) -> AppState {
    let pool = init_memory_database().await.unwrap();
    let config = AppConfig {
        backend_url: backend_url.to_string(),
        request_timeout_secs: 5,
        ..AppConfig::default()
    };
    AppState::new(pool, &config).unwrap()
}

fn token(claims: Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.sig", header, payload)
}

async fn send(state: &AppState, request: Request<Body>) -> Response {
    build_router(state.clone()).oneshot(request).await.unwrap()
}

async fn get(state: &AppState, uri: &str) -> Response {
    send(state, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

async fn send_json(state: &AppState, method: &str, uri: &str, body: Value) -> Response {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(state, request).await
}

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

#[tokio::test]
async fn test_health_and_buildinfo() {
    let state = test_state("http://127.0.0.1:9").await;

    let response = get(&state, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "kwaudit-ui");

    let response = get(&state, "/api/buildinfo").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_root_page_served() {
    let state = test_state("http://127.0.0.1:9").await;
    let response = get(&state, "/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains("<title>Keyword Audit</title>"));
    assert!(!html.contains("{{BUILD_INFO}}"));
}

#[tokio::test]
async fn test_keyword_set_crud() {
    let state = test_state("http://127.0.0.1:9").await;

    let response = send_json(&state, "PUT", "/api/keyword-sets/dei", json!({"keywords": ["equity", " bias "]})).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["keywords"], json!(["equity", "bias"]));

    let response = send_json(&state, "PUT", "/api/keyword-sets/dei", json!({"keywords": ["inclusion"]})).await;
    assert_eq!(response.status(), StatusCode::OK);

    let list = body_json(get(&state, "/api/keyword-sets").await).await;
    assert_eq!(list, json!([{"name": "dei", "keywords": ["inclusion"]}]));

    let one = get(&state, "/api/keyword-sets/dei").await;
    assert_eq!(one.status(), StatusCode::OK);

    let request = Request::builder()
        .method("DELETE")
        .uri("/api/keyword-sets/dei")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&state, request).await.status(), StatusCode::NO_CONTENT);
    assert_eq!(get(&state, "/api/keyword-sets/dei").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_keyword_set_blank_name_rejected() {
    let state = test_state("http://127.0.0.1:9").await;
    let response = send_json(&state, "PUT", "/api/keyword-sets/%20%20", json!({"keywords": ["x"]})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_csv_preview_validation() {
    let state = test_state("http://127.0.0.1:9").await;

    let upload = |name: &str, content: &'static str| {
        Request::builder()
            .method("POST")
            .uri(format!("/api/csv/preview?file_name={}", name))
            .body(Body::from(content))
            .unwrap()
    };

    let response = send(&state, upload("notes.txt", "a,b\n1,2\n")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&state, upload("empty.csv", "Title,Description\n")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["message"], "CSV file has no data");

    let response = send(&state, upload("courses.csv", "Course Title,Description\nIntro,covers equity\n")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["file_name"], "courses.csv");
    assert_eq!(body["headers"], json!(["Course Title", "Description"]));
    assert_eq!(body["rows"][0]["row_index"], 1);
    assert_eq!(body["rows"][0]["data"]["course_title"], "Intro");
}

#[tokio::test]
async fn test_audit_validation_errors() {
    let state = test_state("http://127.0.0.1:9").await;

    let response = send_json(&state, "POST", "/api/audits", json!({"keywords": [], "text": "equity"})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send_json(&state, "POST", "/api/audits", json!({"keywords": ["equity"]})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send_json(&state, "POST", "/api/audits", json!({"keywords": ["equity"], "csv": true})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["message"], "No CSV file has been uploaded");
}

#[tokio::test]
async fn test_csv_audit_results_and_export() {
    let url = start_mock_backend().await;
    let state = test_state(&url).await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/csv/preview?file_name=courses.csv")
        .body(Body::from(
            "course_title,description\nIntro to Ethics,\"covers equity, and bias\"\nFinance,budgets\n",
        ))
        .unwrap();
    assert_eq!(send(&state, request).await.status(), StatusCode::OK);

    let response = send_json(
        &state,
        "POST",
        "/api/audits",
        json!({"keywords": ["equity"], "csv": true, "search_type": "keyword"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let outcome = body_json(response).await;
    assert_eq!(outcome["total"], 2);
    assert_eq!(outcome["failed"], 0);
    assert_eq!(outcome["summary"], "Showing 2 of 2 results");

    let page = body_json(get(&state, "/api/results").await).await;
    assert_eq!(page["total"], 2);
    assert_eq!(page["search_type"], "keyword");
    let first = &page["results"][0];
    assert_eq!(first["csv"]["row_index"], 1);
    assert_eq!(first["match_source"], "equity: description");
    assert_eq!(first["confidence"], "85%");
    assert_eq!(page["results"][1]["match_source"], "-");

    // Matched-only hides the row without matches
    let response = send_json(&state, "PUT", "/api/results/view", json!({"filter_text": "", "matched_only": true})).await;
    let page = body_json(response).await;
    assert_eq!(page["visible"], 1);
    assert_eq!(page["summary"], "Showing 1 of 2 results");

    let response = get(&state, "/api/results/export").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"courses_results.csv\""
    );
    let csv_text = String::from_utf8(body_bytes(response).await).unwrap();
    let mut reader = csv::ReaderBuilder::new().from_reader(csv_text.as_bytes());
    let headers: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
    assert_eq!(
        headers,
        vec!["course_title", "description", "Keywords_Matched", "Match_Source", "Confidence_Scores", "Search_Type"]
    );
    let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(records.len(), 1);
    assert_eq!(&records[0][1], "covers equity, and bias");

    // Result IDs are persisted, payloads are not
    let ids = db::load_result_ids(&state.db).await.unwrap();
    assert_eq!(ids.len(), 2);

    let id = ids[0].clone();
    let response = get(&state, &format!("/api/results/{}", id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let detail = body_json(response).await;
    assert_eq!(detail["sources"][0]["keyword"], "equity");
    assert_eq!(detail["sources"][0]["sections"], json!(["description"]));

    // Evidence is relocated inside the text it was reported against
    let original = detail["original_text"].as_str().unwrap();
    assert_eq!(detail["evidence"][0]["start"], 0);
    assert_eq!(detail["evidence"][0]["text"], original);
    let segments = detail["segments"].as_array().unwrap();
    let joined: String = segments.iter().map(|s| s["text"].as_str().unwrap()).collect();
    assert_eq!(joined, original);
    assert!(segments
        .iter()
        .any(|s| s["is_keyword"] == true && s["text"] == "equity"));

    let request = Request::builder()
        .method("DELETE")
        .uri("/api/results")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&state, request).await.status(), StatusCode::NO_CONTENT);
    assert!(db::load_result_ids(&state.db).await.unwrap().is_empty());
    assert_eq!(get(&state, "/api/results/export").await.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sort_routes() {
    let state = test_state("http://127.0.0.1:9").await;

    let response = send(
        &state,
        Request::builder()
            .method("POST")
            .uri("/api/results/sort/matchedKeywords")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_json(response).await;
    assert_eq!(page["view"]["sort"]["field"], "matchedKeywords");
    assert_eq!(page["view"]["sort"]["direction"], "asc");

    let response = send(
        &state,
        Request::builder()
            .method("POST")
            .uri("/api/results/sort/matchedKeywords")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(body_json(response).await["view"]["sort"]["direction"], "desc");

    let response = send(
        &state,
        Request::builder()
            .method("POST")
            .uri("/api/results/sort/bogus")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(get(&state, "/api/results/missing").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_auth_callback_stores_session() {
    let state = test_state("http://backend.test").await;
    let jwt = token(json!({"name": "Ada", "email": "ada@example.edu", "exp": 4_102_444_800i64}));

    let response = get(&state, &format!("/auth/callback?token={}", jwt)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/");

    let body = body_json(get(&state, "/api/session").await).await;
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["session"]["name"], "Ada");
    assert!(body["session"].get("token").is_none());
    assert_eq!(body["login_url"], "http://backend.test/auth/init");

    let response = send(
        &state,
        Request::builder()
            .method("POST")
            .uri("/api/session/logout")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(body_json(response).await["authenticated"], false);
    assert!(db::load_session(&state.db).await.unwrap().is_none());
}

#[tokio::test]
async fn test_expired_token_redirects_to_login() {
    let state = test_state("http://backend.test").await;
    let jwt = token(json!({"name": "Ada", "exp": 10}));

    let response = get(&state, &format!("/auth/callback?token={}", jwt)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["redirect"], "http://backend.test/auth/init");

    assert_eq!(get(&state, "/auth/callback?token=garbage").await.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_expired_stored_session_is_cleared() {
    let state = test_state("http://backend.test").await;
    let session = Session {
        name: "Ada".to_string(),
        email: "ada@example.edu".to_string(),
        token_expiry: 10,
        token: "t".to_string(),
    };
    db::save_session(&state.db, &session).await.unwrap();

    let body = body_json(get(&state, "/api/session").await).await;
    assert_eq!(body["authenticated"], false);
    assert!(db::load_session(&state.db).await.unwrap().is_none());

    db::save_session(&state.db, &session).await.unwrap();
    let response = send_json(&state, "POST", "/api/audits", json!({"keywords": ["equity"], "text": "equity"})).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"]["redirect"], "http://backend.test/auth/init");
}

#[tokio::test]
async fn test_backend_rejection_clears_session() {
    let url = start_mock_backend().await;
    let state = test_state(&url).await;
    let session = Session {
        name: "Ada".to_string(),
        email: "ada@example.edu".to_string(),
        token_expiry: 4_102_444_800,
        token: REJECTED_TOKEN_MARKER.to_string(),
    };
    db::save_session(&state.db, &session).await.unwrap();

    let response = send_json(&state, "POST", "/api/audits", json!({"keywords": ["equity"], "text": "equity"})).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    assert_eq!(body["error"]["redirect"], format!("{}/auth/init", url));
    assert!(body.get("redirect").is_none());
    assert!(db::load_session(&state.db).await.unwrap().is_none());
}

#[tokio::test]
async fn test_full_text_alternatives_are_highlighted() {
    let url = start_mock_backend().await;
    let state = test_state(&url).await;

    let response = send_json(
        &state,
        "POST",
        "/api/suggestions/full-text",
        json!({
            "original_text": "Promotes equity",
            "source_id": "text-input",
            "content_type": "default",
            "keywords": ["equity", "access"]
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["alternatives"], json!(["Promotes equity (revised)", "Fair Access for all"]));

    let second = body["highlighted"][1].as_array().unwrap();
    let hits: Vec<&str> = second
        .iter()
        .filter(|s| s["is_keyword"] == true)
        .map(|s| s["text"].as_str().unwrap())
        .collect();
    assert_eq!(hits, vec!["Access"]);
    assert_eq!(body["highlighted"][0][1]["text"], "equity");
}
