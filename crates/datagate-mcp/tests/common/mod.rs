//! Offline stand-in for the upstream API, shared by the binary contracts.

#![allow(dead_code)]

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct Seen {
    /// (authorization header, request body) per universal request.
    pub requests: Mutex<Vec<(String, serde_json::Value)>>,
    pub zone_listings: Mutex<Vec<String>>,
    pub created_zones: Mutex<Vec<String>>,
    pub triggers: Mutex<Vec<(String, serde_json::Value)>>,
    pub snapshot_polls: Mutex<u32>,
    pub status_calls: Mutex<u32>,
}

fn bearer(headers: &HeaderMap) -> String {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

pub fn fake_upstream(seen: Arc<Seen>) -> Router {
    Router::new()
        .route(
            "/request",
            post(
                |State(seen): State<Arc<Seen>>,
                 headers: HeaderMap,
                 Json(body): Json<serde_json::Value>| async move {
                    seen.requests
                        .lock()
                        .unwrap()
                        .push((bearer(&headers), body.clone()));
                    let url = body["url"].as_str().unwrap_or("").to_string();
                    if url.contains("fail.example") {
                        return (StatusCode::INTERNAL_SERVER_ERROR, "boom".to_string());
                    }
                    let format = body["data_format"].as_str().unwrap_or("html");
                    (StatusCode::OK, format!("{format} of {url}"))
                },
            ),
        )
        .route(
            "/zone/get_active_zones",
            get(|State(seen): State<Arc<Seen>>, headers: HeaderMap| async move {
                seen.zone_listings.lock().unwrap().push(bearer(&headers));
                Json(serde_json::json!([]))
            }),
        )
        .route(
            "/zone",
            post(
                |State(seen): State<Arc<Seen>>, Json(body): Json<serde_json::Value>| async move {
                    let name = body["zone"]["name"].as_str().unwrap_or("").to_string();
                    seen.created_zones.lock().unwrap().push(name);
                    StatusCode::OK
                },
            ),
        )
        .route(
            "/datasets/v3/trigger",
            post(
                |State(seen): State<Arc<Seen>>,
                 Query(q): Query<HashMap<String, String>>,
                 Json(body): Json<serde_json::Value>| async move {
                    let id = q.get("dataset_id").cloned().unwrap_or_default();
                    seen.triggers.lock().unwrap().push((id, body));
                    Json(serde_json::json!({ "snapshot_id": "s_1" }))
                },
            ),
        )
        .route(
            "/datasets/v3/snapshot/{id}",
            get(
                |State(seen): State<Arc<Seen>>, Path(_id): Path<String>| async move {
                    let n = {
                        let mut polls = seen.snapshot_polls.lock().unwrap();
                        *polls += 1;
                        *polls
                    };
                    if n == 1 {
                        Json(serde_json::json!({ "status": "running" }))
                    } else {
                        Json(serde_json::json!([{ "title": "Desk lamp", "price": "19.99" }]))
                    }
                },
            ),
        )
        .route(
            "/status",
            get(|State(seen): State<Arc<Seen>>| async move {
                *seen.status_calls.lock().unwrap() += 1;
                Json(serde_json::json!({ "customer": "c_1" }))
            }),
        )
        .route(
            "/zone/passwords",
            get(|| async { Json(serde_json::json!({ "passwords": ["pw"] })) }),
        )
        .with_state(seen)
}

pub async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("axum serve");
    });
    addr
}

pub async fn start_upstream() -> (SocketAddr, Arc<Seen>) {
    let seen = Arc::new(Seen::default());
    let addr = serve(fake_upstream(seen.clone())).await;
    (addr, seen)
}

const CLEARED_ENV: &[&str] = &[
    "API_TOKEN",
    "WEB_UNLOCKER_ZONE",
    "BROWSER_ZONE",
    "RATE_LIMIT",
    "DATAGATE_TOOLSET",
    "DATAGATE_API_BASE",
];

/// Environment every spawned `datagate` starts from: no `.env`, no inherited
/// credentials or limits.
pub fn hermetic(cmd: &mut std::process::Command) {
    cmd.env("DATAGATE_DOTENV", "0").env("RUST_LOG", "warn");
    for k in CLEARED_ENV {
        cmd.env_remove(k);
    }
}

pub fn hermetic_async(cmd: &mut tokio::process::Command) {
    cmd.env("DATAGATE_DOTENV", "0").env("RUST_LOG", "warn");
    for k in CLEARED_ENV {
        cmd.env_remove(k);
    }
}

pub fn text_of(r: &rmcp::model::CallToolResult) -> String {
    r.content
        .first()
        .and_then(|c| c.as_text())
        .map(|t| t.text.clone())
        .unwrap_or_default()
}
