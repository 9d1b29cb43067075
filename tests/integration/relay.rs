use crate::*;

use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn test_relay_lists_remote_files() -> Result<()> {
    let a = Node::start("relay-a").await?;
    let (b, id1, id2) = Node::with_fixtures("relay-b").await?;

    let resp = client()
        .get(a.url(&format!("/api/peers/127.0.0.1/{}/files", b.port)))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let files: Vec<Value> = resp.json().await?;
    let ids: Vec<&str> = files.iter().filter_map(|f| f["id"].as_str()).collect();
    assert_eq!(files.len(), 2);
    assert!(ids.contains(&id1.as_str()));
    assert!(ids.contains(&id2.as_str()));
    Ok(())
}

#[tokio::test]
async fn test_relay_download_streams_body_and_headers() -> Result<()> {
    let a = Node::start("stream-a").await?;
    let b = Node::start("stream-b").await?;
    let data = payload(512 * 1024 + 3);
    let id = b.share("archive.zip", &data, Some("zip-pw"))?;

    let resp = client()
        .post(a.url(&format!("/api/peers/127.0.0.1/{}/download/{id}", b.port)))
        .json(&json!({ "password": "zip-pw" }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "application/zip");
    assert!(resp.headers()["content-disposition"]
        .to_str()?
        .contains("filename=\"archive.zip\""));

    let mut received = Vec::with_capacity(data.len());
    let mut resp = resp;
    while let Some(chunk) = resp.chunk().await? {
        received.extend_from_slice(&chunk);
    }
    assert_eq!(received.len(), data.len());
    assert_eq!(received, data);
    Ok(())
}

#[tokio::test]
async fn test_relay_passes_peer_refusals_through() -> Result<()> {
    let a = Node::start("refuse-a").await?;
    let (b, _, id2) = Node::with_fixtures("refuse-b").await?;
    let base = a.url(&format!("/api/peers/127.0.0.1/{}/download", b.port));

    let resp = client()
        .post(format!("{base}/{id2}"))
        .json(&json!({ "password": "wrong" }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_message(resp).await, "Incorrect password");

    let resp = client()
        .post(format!("{base}/no-such-id"))
        .json(&json!({}))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_message(resp).await, "File not found or not shared");

    std::fs::remove_file(b.scratch.path().join(FILE2_NAME))?;
    let resp = client()
        .post(format!("{base}/{id2}"))
        .json(&json!({ "password": FILE2_PASSWORD }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::GONE);
    Ok(())
}

#[tokio::test]
async fn test_relay_to_dead_peer_is_bad_gateway() -> Result<()> {
    let a = Node::start("lonely").await?;
    let dead_port = {
        let l = std::net::TcpListener::bind("127.0.0.1:0")?;
        l.local_addr()?.port()
    };

    let resp = client()
        .get(a.url(&format!("/api/peers/127.0.0.1/{dead_port}/files")))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    assert!(error_message(resp).await.contains(&dead_port.to_string()));

    let resp = client()
        .post(a.url(&format!("/api/peers/127.0.0.1/{dead_port}/download/abc")))
        .json(&json!({}))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    Ok(())
}

#[tokio::test]
async fn test_relay_rejects_bad_targets() -> Result<()> {
    let a = Node::start("picky").await?;

    for path in [
        "/api/peers/127.0.0.1/0/files",
        "/api/peers/127.0.0.1/99999/files",
        "/api/peers/127.0.0.1/http/files",
        "/api/peers/bad%20host/19001/files",
    ] {
        let resp = client().get(a.url(path)).send().await?;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{path}");
        error_message(resp).await;
    }
    Ok(())
}
