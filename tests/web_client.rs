//! `WebClient` over FTP and file URIs.

mod support;

use cenet::{WebClient, WebClientConfig, WebError, WebExceptionStatus};
use std::sync::Arc;
use std::time::Duration;
use support::{FakeServer, Reply};
use url::Url;

fn retr(body: &[u8]) -> (&'static str, Reply) {
    (
        "RETR",
        Reply::Send {
            preliminary: "150 opening data connection",
            body: body.to_vec(),
            completion: "226 done",
        },
    )
}

#[tokio::test]
async fn test_download_string_over_ftp() {
    let server = FakeServer::start(vec![retr(b"from ftp")]).await;
    let client = WebClient::new();
    let text = client.download_string(&server.uri("/pub/a.txt")).await.unwrap();
    assert_eq!(text, "from ftp");
    assert!(!client.is_busy());
}

#[tokio::test]
async fn test_relative_address_uses_base_and_credentials() {
    let server = FakeServer::start(vec![(
        "STOR",
        Reply::Receive {
            preliminary: "150 go ahead",
            completion: "226 stored",
        },
    )])
    .await;

    let config: WebClientConfig = serde_json::from_str(&format!(
        r#"{{"baseAddress":"{}","credentials":{{"userName":"dave","password":"pw"}}}}"#,
        server.uri("/in/")
    ))
    .unwrap();
    let client = WebClient::with_config(config);

    let response = client.upload_string("note.txt", None, "hi").await.unwrap();
    assert_eq!(response.status_description(), Some("226 stored"));
    assert_eq!(response.response_uri().path(), "/in/note.txt");
    assert_eq!(server.uploads(), vec![("STOR note.txt".to_string(), b"hi".to_vec())]);
    assert!(server.commands().contains(&"USER dave".to_string()));
}

#[tokio::test]
async fn test_overlapping_calls_fail_with_concurrent_io() {
    let server = FakeServer::start(vec![
        ("CWD", Reply::Slow(Duration::from_millis(500), "250 ok")),
        retr(b"slow body"),
    ])
    .await;
    let client = Arc::new(WebClient::new());

    let first = client.spawn_download_data(server.uri("/slow/a.txt"));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(client.is_busy());

    let err = client.download_data(&server.uri("/slow/a.txt")).await.unwrap_err();
    assert!(matches!(err, WebError::ConcurrentIo(_)));

    assert_eq!(first.await.unwrap().unwrap(), b"slow body");
    assert!(!client.is_busy());
}

#[tokio::test]
async fn test_cancel_aborts_in_flight_call() {
    let server = FakeServer::start(vec![
        ("CWD", Reply::Slow(Duration::from_secs(3), "250 ok")),
        retr(b"never"),
    ])
    .await;
    let client = Arc::new(WebClient::new());

    let pending = client.spawn_download_data(server.uri("/slow/a.txt"));
    tokio::time::sleep(Duration::from_millis(100)).await;
    client.cancel();

    let err = pending.await.unwrap().unwrap_err();
    assert_eq!(err.status(), WebExceptionStatus::RequestCanceled);
    assert!(!client.is_busy());
}

#[tokio::test]
async fn test_file_upload_and_download() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("source.txt");
    std::fs::write(&source, "file body").unwrap();
    let target = Url::from_file_path(dir.path().join("target.txt"))
        .unwrap()
        .to_string();

    let client = WebClient::new();
    let response = client.upload_file(&target, None, &source).await.unwrap();
    assert_eq!(response.content_length(), Some(9));
    assert_eq!(client.download_data(&target).await.unwrap(), b"file body");
}

#[tokio::test]
async fn test_unsupported_scheme() {
    let client = WebClient::new();
    let err = client.download_data("http://example.com/").await.unwrap_err();
    assert!(matches!(err, WebError::NotSupported(_)));
    assert_eq!(err.status(), WebExceptionStatus::NotSupported);
}
