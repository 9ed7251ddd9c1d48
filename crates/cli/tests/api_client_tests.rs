#[path = "../src/api_client.rs"]
mod api_client;

use httpmock::Method::GET;
use httpmock::MockServer;
use serde_json::json;

#[tokio::test]
async fn queue_status_decodes_the_counts() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/admin/queue");
            then.status(200).json_body(json!({
                "pending": 3,
                "processing": 1,
                "completed": 12,
                "failed": 2,
                "executing": true,
            }));
        })
        .await;

    let status = api_client::queue_status(&server.base_url()).await.unwrap();
    mock.assert_async().await;
    assert_eq!(status.pending, 3);
    assert_eq!(status.processing, 1);
    assert_eq!(status.completed, 12);
    assert_eq!(status.failed, 2);
    assert!(status.executing);
}

#[tokio::test]
async fn trailing_slash_in_the_server_url_is_tolerated() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/admin/queue");
            then.status(200).json_body(json!({
                "pending": 0,
                "processing": 0,
                "completed": 0,
                "failed": 0,
                "executing": false,
            }));
        })
        .await;

    let url = format!("{}/", server.base_url());
    let status = api_client::queue_status(&url).await.unwrap();
    assert_eq!(status.pending, 0);
}

#[tokio::test]
async fn server_errors_are_reported() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/admin/queue");
            then.status(500);
        })
        .await;

    let err = api_client::queue_status(&server.base_url())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("500"));
}
