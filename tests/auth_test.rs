//! Integration tests for auth endpoints.
//!
//! Requires the server to be running on localhost:8000.

mod common;

use serde_json::{json, Value};

async fn register_user(client: &reqwest::Client, email: &str, password: &str) -> reqwest::Response {
    client
        .post(common::url("/api/auth/register"))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to send register request")
}

async fn login_user(client: &reqwest::Client, email: &str, password: &str) -> reqwest::Response {
    client
        .post(common::url("/api/auth/login"))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to send login request")
}

async fn get_me(client: &reqwest::Client, token: &str) -> reqwest::Response {
    client
        .get(common::url("/api/auth/me"))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to send me request")
}

/// Full auth flow: register → login → me.
#[tokio::test]
#[ignore = "requires running server on localhost:8000"]
async fn register_login_and_me() {
    let client = common::client();
    let email = format!("auth_{}@woodpecker.dev", common::unique_suffix());
    let password = "testpass123";

    let resp = register_user(&client, &email, password).await;
    assert_eq!(resp.status(), 200, "Register should succeed");
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["user"]["email"], email);
    assert!(body["token"].is_string(), "Should return a JWT token");

    let resp = login_user(&client, &email, password).await;
    assert_eq!(resp.status(), 200, "Login should succeed");
    let body: Value = resp.json().await.unwrap();
    let token = body["token"].as_str().unwrap().to_string();

    let resp = get_me(&client, &token).await;
    assert_eq!(resp.status(), 200);
    let me: Value = resp.json().await.unwrap();
    assert_eq!(me["email"], email);
    assert!(me["createdAt"].is_string());
}

#[tokio::test]
#[ignore = "requires running server on localhost:8000"]
async fn duplicate_email_conflicts() {
    let client = common::client();
    let email = format!("dup_{}@woodpecker.dev", common::unique_suffix());

    assert_eq!(register_user(&client, &email, "testpass123").await.status(), 200);
    let resp = register_user(&client, &email, "testpass123").await;
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["detail"], "Email already registered");
}

#[tokio::test]
#[ignore = "requires running server on localhost:8000"]
async fn concurrent_duplicate_registration_conflicts() {
    let client = common::client();
    let email = format!("race_{}@woodpecker.dev", common::unique_suffix());

    let (a, b) = tokio::join!(
        register_user(&client, &email, "testpass123"),
        register_user(&client, &email, "testpass123"),
    );
    let mut statuses = [a.status().as_u16(), b.status().as_u16()];
    statuses.sort_unstable();
    assert_eq!(statuses, [200, 409]);
}

#[tokio::test]
#[ignore = "requires running server on localhost:8000"]
async fn short_password_rejected() {
    let client = common::client();
    let email = format!("short_{}@woodpecker.dev", common::unique_suffix());

    let resp = register_user(&client, &email, "short").await;
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
#[ignore = "requires running server on localhost:8000"]
async fn wrong_password_and_bad_token() {
    let client = common::client();
    let email = format!("wrong_{}@woodpecker.dev", common::unique_suffix());
    register_user(&client, &email, "testpass123").await;

    let resp = login_user(&client, &email, "not-the-password").await;
    assert_eq!(resp.status(), 400);

    let resp = get_me(&client, "garbage-token").await;
    assert_eq!(resp.status(), 401);
}
