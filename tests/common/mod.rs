#![allow(dead_code)]

use reqwest::Client;
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};

pub const BASE_URL: &str = "http://localhost:8000";

/// Build a reqwest client for tests.
pub fn client() -> Client {
    Client::new()
}

/// Generate a unique suffix based on timestamp to avoid collisions.
pub fn unique_suffix() -> String {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}", ts % 1_000_000_000)
}

/// Build a URL for an API endpoint.
pub fn url(path: &str) -> String {
    format!("{}{}", BASE_URL, path)
}

/// Register a fresh account and return its bearer token.
pub async fn register_token(client: &Client) -> String {
    let suffix = unique_suffix();
    let resp = client
        .post(url("/api/auth/register"))
        .json(&json!({
            "email": format!("wp_{suffix}@woodpecker.dev"),
            "password": "testpass123",
        }))
        .send()
        .await
        .expect("Failed to send register request");
    assert_eq!(resp.status(), 200, "Register should succeed");

    let body: Value = resp.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

/// A three-ply flat puzzle: e4 (tick), e5, Nf3 (tick).
pub fn sample_puzzle(id: &str, difficulty: &str) -> Value {
    json!({
        "id": id,
        "difficulty": difficulty,
        "fen": "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        "solution": {
            "lines": [
                { "san": "e4", "isTick": true },
                { "san": "e5" },
                { "san": "Nf3", "isTick": true }
            ]
        },
        "ticks": ["e4", "Nf3"]
    })
}

/// Account the test server lists in `ADMIN_EMAILS`.
pub const ADMIN_EMAIL: &str = "admin@woodpecker.dev";
const ADMIN_PASSWORD: &str = "adminpass123";

/// Bearer token of the admin account, registering it on first use.
pub async fn admin_token(client: &Client) -> String {
    let creds = json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD });

    let resp = client
        .post(url("/api/auth/register"))
        .json(&creds)
        .send()
        .await
        .expect("Failed to send register request");
    let resp = if resp.status() == 409 {
        client
            .post(url("/api/auth/login"))
            .json(&creds)
            .send()
            .await
            .expect("Failed to send login request")
    } else {
        resp
    };
    assert_eq!(resp.status(), 200, "Admin account should be usable");

    let body: Value = resp.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

/// Upload puzzles through the admin endpoint.
pub async fn upload_puzzles(client: &Client, puzzles: Vec<Value>) {
    let token = admin_token(client).await;
    let resp = client
        .post(url("/api/admin/puzzles/upload"))
        .bearer_auth(&token)
        .json(&json!({ "puzzles": puzzles }))
        .send()
        .await
        .expect("Failed to send upload request");
    assert_eq!(resp.status(), 200, "Upload should succeed");
}
