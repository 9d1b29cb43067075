use crate::*;

use std::time::Instant;

use reqwest::multipart;
use reqwest::StatusCode;
use serde_json::{json, Value};

use lanshare_services::PeerKey;

#[tokio::test]
async fn test_identity_round_trip() -> Result<()> {
    let node = Node::start("before").await?;
    let url = node.url("/api/identity");

    let body: Value = client().get(&url).send().await?.json().await?;
    assert_eq!(body["username"], "before");
    assert_eq!(body["server_port"], node.port);

    let resp = client().post(&url).json(&json!({ "username": "  after  " })).send().await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await?;
    assert_eq!(body["message"], "Username updated");
    assert_eq!(body["username"], "after");

    // Both the API and the peer-facing hello see the new name.
    let body: Value = client().get(&url).send().await?.json().await?;
    assert_eq!(body["username"], "after");
    assert!(body["local_ip"].is_string());
    let hello: Value = client().get(node.url("/p2p/hello")).send().await?.json().await?;
    assert_eq!(hello["username"], "after");
    Ok(())
}

#[tokio::test]
async fn test_identity_rejects_bad_input() -> Result<()> {
    let node = Node::start("steady").await?;
    let url = node.url("/api/identity");

    for body in [json!({ "username": "" }), json!({ "username": "   " }), json!({})] {
        let resp = client().post(&url).json(&body).send().await?;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body {body}");
        assert_eq!(error_message(resp).await, "Username is required");
    }

    let resp = client()
        .post(&url)
        .json(&json!({ "username": "x".repeat(65) }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = client()
        .post(&url)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    error_message(resp).await;

    assert_eq!(node.state.identity.get().username, "steady");
    Ok(())
}

#[tokio::test]
async fn test_peers_lists_registry() -> Result<()> {
    let node = Node::start("watcher").await?;

    let peers: Vec<Value> = client().get(node.url("/api/peers")).send().await?.json().await?;
    assert!(peers.is_empty());

    let now = Instant::now();
    node.state
        .peers
        .upsert(PeerKey::new("192.168.1.7".parse()?, 19002), "bob", now);
    node.state
        .peers
        .upsert(PeerKey::new("192.168.1.5".parse()?, 19001), "alice", now);

    let peers: Vec<Value> = client().get(node.url("/api/peers")).send().await?.json().await?;
    assert_eq!(peers.len(), 2);
    assert_eq!(peers[0]["address"], "192.168.1.5");
    assert_eq!(peers[0]["port"], 19001);
    assert_eq!(peers[0]["username"], "alice");
    assert!(peers[0]["last_seen"].as_f64().unwrap() > 1_600_000_000.0);
    assert_eq!(peers[1]["username"], "bob");
    Ok(())
}

#[tokio::test]
async fn test_upload_share_download_unshare() -> Result<()> {
    let node = Node::start("uploader").await?;
    let data = payload(20_000);

    let form = multipart::Form::new()
        .part(
            "file",
            multipart::Part::bytes(data.clone()).file_name("holiday.jpg"),
        )
        .text("password", "pw1");
    let resp = client().post(node.url("/api/shared_files")).multipart(form).send().await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await?;
    assert_eq!(body["message"], "File added successfully");
    assert_eq!(body["name"], "holiday.jpg");
    let id = body["file_id"].as_str().unwrap().to_string();

    // Saved under the uploads dir with a random prefix.
    let saved: Vec<_> = std::fs::read_dir(node.scratch.path().join("uploads"))?
        .filter_map(|e| e.ok())
        .collect();
    assert_eq!(saved.len(), 1);
    let saved_name = saved[0].file_name().to_string_lossy().into_owned();
    assert!(saved_name.ends_with("_holiday.jpg"), "{saved_name}");

    let listed: Vec<Value> = client().get(node.url("/api/shared_files")).send().await?.json().await?;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], id.as_str());
    assert_eq!(listed[0]["size"], 20_000);
    assert_eq!(listed[0]["has_password"], true);

    let resp = client()
        .post(node.url(&format!("/p2p/download_file/{id}")))
        .json(&json!({ "password": "pw1" }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "image/jpeg");
    assert_eq!(resp.bytes().await?.as_ref(), data.as_slice());

    let resp = client()
        .delete(node.url(&format!("/api/shared_files/{id}")))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await?;
    assert_eq!(body["message"], "File unshared successfully");

    let resp = client()
        .delete(node.url(&format!("/api/shared_files/{id}")))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        error_message(resp).await,
        "File not found or could not be unshared"
    );

    let resp = client()
        .post(node.url(&format!("/p2p/download_file/{id}")))
        .json(&json!({ "password": "pw1" }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_upload_without_password_is_open() -> Result<()> {
    let node = Node::start("open-upload").await?;

    let form = multipart::Form::new()
        .part("file", multipart::Part::bytes(b"hello".to_vec()).file_name("hi.txt"))
        .text("password", "");
    let body: Value = client()
        .post(node.url("/api/shared_files"))
        .multipart(form)
        .send()
        .await?
        .json()
        .await?;

    let listed: Vec<Value> = client().get(node.url("/api/shared_files")).send().await?.json().await?;
    assert_eq!(listed[0]["id"], body["file_id"]);
    assert_eq!(listed[0]["has_password"], false);
    Ok(())
}

#[tokio::test]
async fn test_upload_requires_a_file() -> Result<()> {
    let node = Node::start("no-file").await?;

    let form = multipart::Form::new().text("password", "pw");
    let resp = client().post(node.url("/api/shared_files")).multipart(form).send().await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(resp).await, "No file provided");

    let form = multipart::Form::new().part("file", multipart::Part::bytes(b"x".to_vec()).file_name(""));
    let resp = client().post(node.url("/api/shared_files")).multipart(form).send().await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(resp).await, "No file selected");

    assert!(node.state.files.is_empty());
    Ok(())
}
