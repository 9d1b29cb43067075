use crate::*;

use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn test_hello_reports_identity() -> Result<()> {
    let node = Node::start("alice").await?;

    let body: Value = client().get(node.url("/p2p/hello")).send().await?.json().await?;
    assert_eq!(body["message"], "Hello from alice!");
    assert_eq!(body["username"], "alice");
    assert_eq!(body["server_port"], node.port);
    Ok(())
}

#[tokio::test]
async fn test_list_files_describes_shares_without_paths() -> Result<()> {
    let (node, id1, id2) = Node::with_fixtures("lister").await?;

    let resp = client().get(node.url("/p2p/list_files")).send().await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let files: Vec<Value> = resp.json().await?;
    assert_eq!(files.len(), 2);

    let f1 = files.iter().find(|f| f["id"] == id1.as_str()).expect("file 1 listed");
    assert_eq!(f1["name"], FILE1_NAME);
    assert_eq!(f1["size"], 21);
    assert_eq!(f1["has_password"], false);

    let f2 = files.iter().find(|f| f["id"] == id2.as_str()).expect("file 2 listed");
    assert_eq!(f2["name"], FILE2_NAME);
    assert_eq!(f2["size"], 40);
    assert_eq!(f2["has_password"], true);

    for f in &files {
        let keys: Vec<&str> = f.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys.len(), 4, "unexpected fields: {keys:?}");
    }
    Ok(())
}

#[tokio::test]
async fn test_download_open_file() -> Result<()> {
    let (node, id1, _) = Node::with_fixtures("open").await?;

    // No body at all is an attempt without a password.
    let resp = client()
        .post(node.url(&format!("/p2p/download_file/{id1}")))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-length"], "21");
    assert_eq!(resp.headers()["content-type"], "text/plain");
    let disposition = resp.headers()["content-disposition"].to_str()?.to_string();
    assert!(disposition.starts_with("attachment; filename=\"testfile1.txt\""), "{disposition}");
    assert_eq!(resp.bytes().await?.as_ref(), FILE1_BODY.as_bytes());
    Ok(())
}

#[tokio::test]
async fn test_download_protected_file_with_password() -> Result<()> {
    let (node, _, id2) = Node::with_fixtures("locked").await?;

    let resp = client()
        .post(node.url(&format!("/p2p/download_file/{id2}")))
        .json(&json!({ "password": FILE2_PASSWORD }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = resp.bytes().await?;
    assert_eq!(bytes.len(), 40);
    assert_eq!(bytes.as_ref(), FILE2_BODY.as_bytes());
    Ok(())
}

#[tokio::test]
async fn test_download_protected_file_rejects_bad_passwords() -> Result<()> {
    let (node, _, id2) = Node::with_fixtures("refuse").await?;
    let url = node.url(&format!("/p2p/download_file/{id2}"));

    for body in [json!({ "password": "wrong" }), json!({}), json!({ "password": null })] {
        let resp = client().post(&url).json(&body).send().await?;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "body {body}");
        assert_eq!(error_message(resp).await, "Incorrect password");
    }

    let resp = client().post(&url).send().await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn test_download_unknown_id() -> Result<()> {
    let node = Node::start("empty").await?;

    let resp = client()
        .post(node.url("/p2p/download_file/nonexistent_id"))
        .json(&json!({}))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_message(resp).await, "File not found or not shared");
    Ok(())
}

#[tokio::test]
async fn test_vanished_file_is_unshared() -> Result<()> {
    let (node, id1, id2) = Node::with_fixtures("vanish").await?;
    std::fs::remove_file(node.scratch.path().join(FILE2_NAME))?;

    // 410 even without the password: existence is checked first.
    let url = node.url(&format!("/p2p/download_file/{id2}"));
    let resp = client().post(&url).json(&json!({})).send().await?;
    assert_eq!(resp.status(), StatusCode::GONE);
    assert_eq!(error_message(resp).await, "File no longer available on server");

    let files: Vec<Value> = client().get(node.url("/p2p/list_files")).send().await?.json().await?;
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["id"], id1.as_str());

    let resp = client().post(&url).json(&json!({})).send().await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_large_file_streams_intact() -> Result<()> {
    let node = Node::start("bulk").await?;
    let data = payload(300 * 1024 + 17);
    let id = node.share("bulk.bin", &data, None)?;

    let resp = client()
        .post(node.url(&format!("/p2p/download_file/{id}")))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "application/octet-stream");
    assert_eq!(resp.content_length(), Some(data.len() as u64));
    assert_eq!(resp.bytes().await?.as_ref(), data.as_slice());
    Ok(())
}
