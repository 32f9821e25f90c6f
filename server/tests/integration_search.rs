use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use casefind_core::EngineConfig;
use casefind_server::{build_app, AppOptions};
use http_body_util::BodyExt;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;
use tower::ServiceExt;

const CORPUS: &str = r#"[
    {"id": 1, "title": "Ring laser gyroscope", "description": "Inertial navigation unit", "year": 2021},
    {"id": 2, "title": "Cooking recipe book", "description": "Printed recipes"},
    {"id": 3, "title": "Fiber optic gyroscope", "description": "Gyroscope module for drones"},
    {"id": 4, "title": "Centrifugal pump", "description": "Reactor coolant pump", "purpose": "coolant circulation"}
]"#;

fn write_corpus(dir: &Path, json: &str) -> PathBuf {
    let path = dir.join("corpus.json");
    fs::write(&path, json).unwrap();
    path
}

fn app_with(corpus_path: PathBuf, admin_token: Option<&str>) -> Router {
    build_app(AppOptions {
        corpus_path,
        config: EngineConfig::default(),
        admin_token: admin_token.map(str::to_string),
        cors_origins: None,
    })
    .unwrap()
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Bytes) {
    let req = Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    call(app, req).await
}

async fn call(app: Router, req: Request<Body>) -> (StatusCode, Bytes) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Bytes) {
    call(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

fn json(body: &Bytes) -> Value {
    serde_json::from_slice(body).unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let dir = tempdir().unwrap();
    let app = app_with(write_corpus(dir.path(), CORPUS), None);
    let (status, body) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let dir = tempdir().unwrap();
    let app = app_with(write_corpus(dir.path(), CORPUS), None);

    let (status, body) = get(app, "/search?q=laser%20gyroscope&k=2").await;
    assert_eq!(status, StatusCode::OK);
    let json = json(&body);
    assert_eq!(json["query"], "laser gyroscope");
    assert_eq!(json["total_hits"], 2);
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["document_id"], 1);
    assert_eq!(arr[0]["rank"], 1);
    assert_eq!(arr[0]["title"], "Ring laser gyroscope");
    assert_eq!(arr[1]["document_id"], 3);
    assert_eq!(arr[1]["rank"], 2);
    let s0 = arr[0]["similarity"].as_f64().unwrap();
    let s1 = arr[1]["similarity"].as_f64().unwrap();
    assert!(s0 >= s1 && s1 > 0.0 && s0 <= 1.0);
}

#[tokio::test]
async fn stopword_query_has_no_hits() {
    let dir = tempdir().unwrap();
    let app = app_with(write_corpus(dir.path(), CORPUS), None);
    let (status, body) = get(app, "/search?q=the%20and%20of").await;
    assert_eq!(status, StatusCode::OK);
    let json = json(&body);
    assert_eq!(json["total_hits"], 0);
    assert!(json["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn invalid_k_is_rejected() {
    let dir = tempdir().unwrap();
    let app = app_with(write_corpus(dir.path(), CORPUS), None);

    let (status, body) = get(app.clone(), "/search?q=laser&k=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(String::from_utf8_lossy(&body).contains("greater than zero"));

    let (status, body) = get(app, "/search?q=laser&k=1000").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(String::from_utf8_lossy(&body).contains("exceeds the maximum"));
}

#[tokio::test]
async fn post_search_composes_query_from_fields() {
    let dir = tempdir().unwrap();
    let app = app_with(write_corpus(dir.path(), CORPUS), None);

    let body = serde_json::json!({"title": "centrifugal pump", "purpose": "coolant", "top_n": 3});
    let (status, body) = post_json(app, "/search", body).await;
    assert_eq!(status, StatusCode::OK);
    let json = json(&body);
    assert_eq!(json["query"], "centrifugal pump  coolant ");
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 1);
    assert_eq!(arr[0]["document_id"], 4);
}

#[tokio::test]
async fn post_search_query_overrides_fields() {
    let dir = tempdir().unwrap();
    let app = app_with(write_corpus(dir.path(), CORPUS), None);

    let body = serde_json::json!({"query": "fiber optic", "title": "centrifugal pump"});
    let (status, body) = post_json(app.clone(), "/search", body).await;
    assert_eq!(status, StatusCode::OK);
    let json = json(&body);
    assert_eq!(json["query"], "fiber optic");
    assert_eq!(json["results"][0]["document_id"], 3);

    // a body with neither a query nor any configured field is an empty query
    let (status, body) = post_json(app, "/search", serde_json::json!({"top_n": 2})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(crate::json(&body)["total_hits"], 0);
}

#[tokio::test]
async fn min_similarity_drops_weak_matches() {
    let dir = tempdir().unwrap();
    let app = app_with(write_corpus(dir.path(), CORPUS), None);

    let (_, body) = get(app.clone(), "/search?q=gyroscope%20navigation").await;
    let all = json(&body)["results"].as_array().unwrap().clone();
    assert_eq!(all.len(), 2);
    let top = all[0]["similarity"].as_f64().unwrap();
    let second = all[1]["similarity"].as_f64().unwrap();
    assert!(top > second);

    let cut = (top + second) / 2.0;
    let (status, body) = get(app, &format!("/search?q=gyroscope%20navigation&min_similarity={cut}")).await;
    assert_eq!(status, StatusCode::OK);
    let arr = json(&body)["results"].as_array().unwrap().clone();
    assert_eq!(arr.len(), 1);
    assert_eq!(arr[0]["document_id"], all[0]["document_id"]);
}

#[tokio::test]
async fn doc_lookup() {
    let dir = tempdir().unwrap();
    let app = app_with(write_corpus(dir.path(), CORPUS), None);

    let (status, body) = get(app.clone(), "/doc/1").await;
    assert_eq!(status, StatusCode::OK);
    let json = json(&body);
    assert_eq!(json["id"], 1);
    assert_eq!(json["fields"]["title"], "Ring laser gyroscope");
    assert_eq!(json["fields"]["year"], "2021");

    let (status, _) = get(app, "/doc/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reload_requires_admin_token_and_swaps_corpus() {
    let dir = tempdir().unwrap();
    let path = write_corpus(dir.path(), CORPUS);
    let app = app_with(path, Some("secret"));

    let (status, _) = call(app.clone(), Request::post("/corpus/reload").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::post("/corpus/reload").header("X-ADMIN-TOKEN", "wrong").body(Body::empty()).unwrap();
    let (status, _) = call(app.clone(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // a single-record corpus would give every shared term an IDF of zero
    write_corpus(
        dir.path(),
        r#"[{"id": "new-1", "title": "Hydraulic press"}, {"id": "new-2", "title": "Cooking recipe"}]"#,
    );
    let req = Request::post("/corpus/reload").header("X-ADMIN-TOKEN", "secret").body(Body::empty()).unwrap();
    let (status, body) = call(app.clone(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["documents"], 2);

    let (_, body) = get(app.clone(), "/search?q=hydraulic%20press").await;
    let json_body = json(&body);
    assert_eq!(json_body["total_hits"], 1);
    assert_eq!(json_body["results"][0]["document_id"], "new-1");
    assert_eq!(json_body["results"][0]["title"], "Hydraulic press");
    let (_, body) = get(app, "/search?q=gyroscope").await;
    assert_eq!(json(&body)["total_hits"], 0);
}

#[tokio::test]
async fn failed_reload_keeps_previous_corpus() {
    let dir = tempdir().unwrap();
    let path = write_corpus(dir.path(), CORPUS);
    let app = app_with(path, Some("secret"));

    write_corpus(dir.path(), r#"[{"title": "no id"}]"#);
    let req = Request::post("/corpus/reload").header("X-ADMIN-TOKEN", "secret").body(Body::empty()).unwrap();
    let (status, body) = call(app.clone(), req).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(String::from_utf8_lossy(&body).contains("missing required field `id`"));

    let (_, body) = get(app, "/search?q=gyroscope").await;
    assert_eq!(json(&body)["total_hits"], 2);
}

#[tokio::test]
async fn reload_disabled_without_admin_token() {
    let dir = tempdir().unwrap();
    let app = app_with(write_corpus(dir.path(), CORPUS), None);
    let req = Request::post("/corpus/reload").header("X-ADMIN-TOKEN", "anything").body(Body::empty()).unwrap();
    let (status, body) = call(app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(String::from_utf8_lossy(&body).contains("ADMIN_TOKEN not set"));
}

#[tokio::test]
async fn cors_allows_only_configured_origins() {
    let dir = tempdir().unwrap();
    let app = build_app(AppOptions {
        corpus_path: write_corpus(dir.path(), CORPUS),
        config: EngineConfig::default(),
        admin_token: None,
        cors_origins: Some("https://records.example, https://ops.example".into()),
    })
    .unwrap();

    let req = Request::get("/health").header("origin", "https://ops.example").body(Body::empty()).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.headers()["access-control-allow-origin"], "https://ops.example");

    let req = Request::get("/health").header("origin", "https://elsewhere.example").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert!(resp.headers().get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn cors_defaults_to_any_origin() {
    let dir = tempdir().unwrap();
    let app = app_with(write_corpus(dir.path(), CORPUS), None);
    let req = Request::get("/health").header("origin", "https://elsewhere.example").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_searches_run_off_the_async_workers() {
    let dir = tempdir().unwrap();
    let app = app_with(write_corpus(dir.path(), CORPUS), None);

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let app = app.clone();
            tokio::spawn(async move { get(app, "/search?q=laser%20gyroscope&k=2").await })
        })
        .collect();
    for handle in handles {
        let (status, body) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body)["results"][0]["document_id"], 1);
    }
}
