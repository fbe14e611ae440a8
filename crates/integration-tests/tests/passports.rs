//! Passport management and device listing over HTTP.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use device_warranty_integration_tests::{TestServer, error_code};
use reqwest::StatusCode;
use serde_json::{Value, json};

fn passport_body(prefix: &str, from: i64, to: i64) -> Value {
    json!({
        "name": "Kettle",
        "model": "K1",
        "serialPrefix": prefix,
        "fromSerialNumber": from,
        "toSerialNumber": to,
        "warrantyMonths": 12,
    })
}

#[tokio::test]
async fn test_admin_manages_passports() {
    let server = TestServer::spawn().await;
    let admin = server.admin_token().await;

    let resp = server
        .post("/api/v1/passports")
        .bearer_auth(&admin)
        .json(&passport_body("kt", 1, 500))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = resp.json().await.unwrap();
    assert_eq!(created["serialPrefix"], "KT");
    let path = format!("/api/v1/passports/{}", created["id"]);

    let resp = server
        .put(&path)
        .bearer_auth(&admin)
        .json(&passport_body("KT", 1, 1000))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["toSerialNumber"], 1000);

    let resp = server
        .post("/api/v1/passports")
        .bearer_auth(&admin)
        .json(&passport_body("KT", 900, 2000))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(resp).await, 5);

    let resp = server.delete(&path).bearer_auth(&admin).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = server.get(&path).bearer_auth(&admin).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_code(resp).await, 2);
}

#[tokio::test]
async fn test_user_cannot_write_passports() {
    let server = TestServer::spawn().await;
    let registered = server.register("a@x.com", "111", "ABC100").await;
    let token = registered["token"].as_str().unwrap();

    let resp = server
        .post("/api/v1/passports")
        .bearer_auth(token)
        .json(&passport_body("KT", 1, 500))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_code(resp).await, 7);

    let resp = server.get("/api/v1/passports").bearer_auth(token).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let list: Value = resp.json().await.unwrap();
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_passport_with_devices_cannot_be_deleted() {
    let server = TestServer::spawn().await;
    server.register("a@x.com", "111", "ABC100").await;
    let admin = server.admin_token().await;

    let resp = server
        .delete(&format!("/api/v1/passports/{}", server.passport.id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(resp).await, 5);
}

#[tokio::test]
async fn test_my_devices_show_warranty() {
    let server = TestServer::spawn().await;
    let registered = server.register("a@x.com", "111", "ABC100").await;
    server.register("b@x.com", "222", "ABC101").await;

    let resp = server
        .get("/api/v1/devices/mine")
        .bearer_auth(registered["token"].as_str().unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let devices: Value = resp.json().await.unwrap();
    let devices = devices.as_array().unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0]["serialNumber"], "ABC100");
    assert_eq!(devices[0]["purchaseDate"], "2024-01-15");
    assert_eq!(devices[0]["warrantyExpirationDate"], "2026-01-15");
}
