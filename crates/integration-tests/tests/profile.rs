//! Profile updates and password changes over HTTP.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use device_warranty_core::{Email, UserId};
use device_warranty_integration_tests::{TEST_PASSWORD, TestServer, error_code};
use reqwest::StatusCode;
use serde_json::{Value, json};

fn update_body(id: &Value, email: &str, phone: &str) -> Value {
    json!({
        "id": id,
        "fullName": "Renamed User",
        "address": "New Street 2",
        "phone": phone,
        "email": email,
    })
}

#[tokio::test]
async fn test_user_updates_own_profile() {
    let server = TestServer::spawn().await;
    let registered = server.register("a@x.com", "111", "ABC100").await;
    let token = registered["token"].as_str().unwrap();

    let resp = server
        .put("/api/v1/users/update")
        .bearer_auth(token)
        .json(&update_body(&registered["user"]["id"], "new@x.com", "333"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["fullName"], "Renamed User");
    assert_eq!(body["email"], "new@x.com");

    // The existing token stays bound to the account id
    let resp = server
        .get("/api/v1/users/me")
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = server.login("new@x.com", TEST_PASSWORD).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_update_to_taken_email_rejected() {
    let server = TestServer::spawn().await;
    let first = server.register("a@x.com", "111", "ABC100").await;
    server.register("b@x.com", "222", "ABC101").await;

    let resp = server
        .put("/api/v1/users/update")
        .bearer_auth(first["token"].as_str().unwrap())
        .json(&update_body(&first["user"]["id"], "b@x.com", "111"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(resp).await, 1);
}

#[tokio::test]
async fn test_admin_updates_user_but_not_admin() {
    let server = TestServer::spawn().await;
    let user = server.register("a@x.com", "111", "ABC100").await;
    let admin_token = server.admin_token().await;

    let resp = server
        .put("/api/v1/users/update")
        .bearer_auth(&admin_token)
        .json(&update_body(&user["user"]["id"], "a@x.com", "111"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let admin_email = Email::parse("admin@x.com").unwrap();
    let admin = server
        .state
        .users()
        .find_by_email(&admin_email)
        .await
        .unwrap()
        .unwrap()
        .user;
    let resp = server
        .put("/api/v1/users/update")
        .bearer_auth(&admin_token)
        .json(&update_body(&json!(admin.id), "changed@x.com", "998"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(resp).await, 5);

    let unchanged = server.state.accounts().get_user(admin.id).await.unwrap();
    assert_eq!(unchanged, admin);
}

#[tokio::test]
async fn test_change_password() {
    let server = TestServer::spawn().await;
    let registered = server.register("a@x.com", "111", "ABC100").await;
    let token = registered["token"].as_str().unwrap();

    let resp = server
        .put("/api/v1/users/changePassword")
        .bearer_auth(token)
        .json(&json!({ "oldPassword": "WrongPassword", "newPassword": "Password2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(resp).await, 3);
    assert_eq!(
        server.login("a@x.com", TEST_PASSWORD).await.status(),
        StatusCode::OK
    );

    let resp = server
        .put("/api/v1/users/changePassword")
        .bearer_auth(token)
        .header("userId", registered["user"]["id"].to_string())
        .json(&json!({ "oldPassword": TEST_PASSWORD, "newPassword": "Password2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    assert_eq!(
        server.login("a@x.com", TEST_PASSWORD).await.status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        server.login("a@x.com", "Password2").await.status(),
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_change_password_for_someone_else_forbidden() {
    let server = TestServer::spawn().await;
    let registered = server.register("a@x.com", "111", "ABC100").await;
    let other = UserId::new(registered["user"]["id"].as_i64().unwrap() + 100);

    let resp = server
        .put("/api/v1/users/changePassword")
        .bearer_auth(registered["token"].as_str().unwrap())
        .header("userId", other.to_string())
        .json(&json!({ "oldPassword": TEST_PASSWORD, "newPassword": "Password2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_code(resp).await, 7);
}

#[tokio::test]
async fn test_user_listing_is_admin_only_and_skips_admins() {
    let server = TestServer::spawn().await;
    let first = server.register("a@x.com", "111", "ABC100").await;
    server.register("b@x.com", "222", "ABC101").await;
    let admin_token = server.admin_token().await;

    let resp = server
        .get("/api/v1/users")
        .bearer_auth(first["token"].as_str().unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_code(resp).await, 7);

    let resp = server
        .get("/api/v1/users")
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    let emails: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["email"].as_str().unwrap())
        .collect();
    assert_eq!(emails, vec!["a@x.com", "b@x.com"]);
    assert!(body.as_array().unwrap().iter().all(|u| u["role"] == "USER"));
}
