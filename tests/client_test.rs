use std::io::Write;
use std::time::Duration;
use chrono::{TimeZone, Utc};
use mockito::Matcher;
use serde_json::json;
use extraction_client::api::dto::SummaryQuery;
use extraction_client::core::{ResultKind, SortDirection, SortField, UploadSource};
use extraction_client::{
    ClientError,
    ExtractionBackend,
    ExtractionClient,
    RequestId,
    TaskStatus,
    UploadTaskSettings,
};

fn client(server: &mockito::Server) -> ExtractionClient {
    ExtractionClient::new(&server.url(), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_create_task_sends_multipart() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/v1/data_extraction_tasks/")
        .match_header("content-type", Matcher::Regex("^multipart/form-data; boundary=".to_string()))
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex("name=\"file\"; filename=\"a.pdf\"".to_string()),
            Matcher::Regex("name=\"ocr_enable\"\r\n\r\ntrue\r\n".to_string()),
            Matcher::Regex("name=\"output_format\"\r\n\r\njson\r\n".to_string()),
            Matcher::Regex("name=\"convert_to_pdf_timeout_sec\"\r\n\r\n900\r\n".to_string()),
            Matcher::Regex("hello extraction".to_string()),
        ]))
        .with_status(200)
        .with_body("\"3f2a9c1e-aaaa-bbbb-cccc-0123456789ab\"")
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.pdf");
    std::fs::write(&path, b"hello extraction").unwrap();
    let source = UploadSource {
        path,
        file_name: "a.pdf".to_string(),
        file_size: 16,
    };

    let request_id = client(&server)
        .create_task(&source, &UploadTaskSettings::default())
        .await
        .unwrap();

    assert_eq!(request_id, RequestId::new("3f2a9c1e-aaaa-bbbb-cccc-0123456789ab"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_create_task_language_only_when_set() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/v1/data_extraction_tasks/")
        .match_body(Matcher::Regex("name=\"language\"\r\n\r\neng\r\n".to_string()))
        .with_body("plain-id-42")
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scan.png");
    std::fs::write(&path, b"png").unwrap();
    let source = UploadSource {
        path,
        file_name: "scan.png".to_string(),
        file_size: 3,
    };
    let settings = UploadTaskSettings {
        language: Some("eng".to_string()),
        ..Default::default()
    };

    let request_id = client(&server).create_task(&source, &settings).await.unwrap();
    assert_eq!(request_id.as_str(), "plain-id-42");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_query_request_summary() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/v1/data_extraction_tasks/query_request_summary")
        .match_body(Matcher::Json(json!({
            "request_ids": ["r1", "r2"],
            "request_times": ["2024-03-01T12:00:00Z", "2024-03-01T12:05:00Z"],
            "sort_column": "fileName",
            "sort_order": "asc",
            "page_index": 1,
            "records_on_page": 10
        })))
        .with_header("content-type", "application/json")
        .with_body(json!({
            "request_statuses": [
                {"request_id": "r2", "status": "DONE", "original_file_name": "b.pdf"},
                {"request_id": "r1", "status": "PENDING"}
            ],
            "tasks_pending": 1
        }).to_string())
        .create_async()
        .await;

    let query = SummaryQuery {
        request_ids: vec![RequestId::new("r1"), RequestId::new("r2")],
        request_times: vec![
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 5, 0).unwrap(),
        ],
        sort_column: SortField::FileName,
        sort_order: SortDirection::Asc,
        page_index: 1,
        records_on_page: 10,
    };

    let response = client(&server).query_request_summary(&query).await.unwrap();
    assert_eq!(response.tasks_pending, 1);
    assert_eq!(response.request_statuses.len(), 2);
    assert_eq!(response.request_statuses[0].status, TaskStatus::Done);
    assert_eq!(response.request_statuses[1].original_file_name, None);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_query_request_statuses() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/v1/data_extraction_tasks/query_request_statuses")
        .match_body(Matcher::Json(json!(["r1"])))
        .with_body(r#"{"request_statuses": [{"request_id": "r1", "status": "FAILURE"}]}"#)
        .create_async()
        .await;

    let statuses = client(&server)
        .query_request_statuses(&[RequestId::new("r1")])
        .await
        .unwrap();

    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].status, TaskStatus::Failure);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_non_success_status_is_server_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/v1/data_extraction_tasks/query_request_statuses")
        .with_status(503)
        .with_body("maintenance")
        .create_async()
        .await;

    let err = client(&server)
        .query_request_statuses(&[RequestId::new("r1")])
        .await
        .unwrap_err();

    match err {
        ClientError::ServerError { status_code, message } => {
            assert_eq!(status_code, 503);
            assert_eq!(message, "maintenance");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_unexpected_body_is_malformed() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/v1/data_extraction_tasks/query_request_statuses")
        .with_body("<html>gateway</html>")
        .create_async()
        .await;
    server
        .mock("POST", "/api/v1/data_extraction_tasks/")
        .with_body(r#"{"id": "r1"}"#)
        .create_async()
        .await;

    let client = client(&server);
    let err = client.query_request_statuses(&[RequestId::new("r1")]).await.unwrap_err();
    assert_eq!(err.category(), "malformed_response");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.txt");
    std::fs::write(&path, b"x").unwrap();
    let source = UploadSource {
        path,
        file_name: "a.txt".to_string(),
        file_size: 1,
    };
    let err = client.create_task(&source, &UploadTaskSettings::default()).await.unwrap_err();
    assert!(matches!(err, ClientError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_summary_without_pending_count_is_malformed() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/v1/data_extraction_tasks/query_request_summary")
        .with_body(r#"{"request_statuses": [{"request_id": "r1", "status": "DONE"}]}"#)
        .create_async()
        .await;

    let query = SummaryQuery {
        request_ids: vec![RequestId::new("r1")],
        request_times: vec![Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()],
        sort_column: SortField::Started,
        sort_order: SortDirection::Desc,
        page_index: 0,
        records_on_page: 10,
    };

    let err = client(&server).query_request_summary(&query).await.unwrap_err();
    assert!(matches!(err, ClientError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_request_status_and_download() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/v1/data_extraction_tasks/r9/status.json")
        .with_body(r#"{"request_id": "r9", "status": "DONE", "original_file_name": "report.pdf"}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/api/v1/data_extraction_tasks/r9/results/extracted_plain_text.txt")
        .with_body("extracted words")
        .create_async()
        .await;

    let client = client(&server);
    let record = client.request_status(&RequestId::new("r9")).await.unwrap();
    assert!(record.status.is_done());
    assert_eq!(record.original_file_name.as_deref(), Some("report.pdf"));

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out.txt");
    let written = client
        .download_result(&RequestId::new("r9"), ResultKind::PlainText, &dest)
        .await
        .unwrap();

    assert_eq!(written, 15);
    assert_eq!(std::fs::read_to_string(&dest).unwrap(), "extracted words");
}

#[tokio::test]
async fn test_interrupted_download_keeps_existing_file() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/v1/data_extraction_tasks/r9/results/packed_data.zip")
        .with_chunked_body(|w| {
            w.write_all(b"partial")?;
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection dropped"))
        })
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out.zip");
    std::fs::write(&dest, b"old content").unwrap();

    let result = client(&server)
        .download_result(&RequestId::new("r9"), ResultKind::PackedZip, &dest)
        .await;

    assert!(result.is_err());
    assert_eq!(std::fs::read_to_string(&dest).unwrap(), "old content");

    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .filter(|name| name != "out.zip")
        .collect();
    assert!(leftovers.is_empty(), "temp files left behind: {:?}", leftovers);
}

#[tokio::test]
async fn test_create_task_uses_current_file_size() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/v1/data_extraction_tasks/")
        .match_body(Matcher::Regex("grown since it was picked".to_string()))
        .with_body("\"r1\"")
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, b"grown since it was picked").unwrap();
    // Size recorded before the file changed
    let source = UploadSource {
        path,
        file_name: "notes.txt".to_string(),
        file_size: 5,
    };

    let request_id = client(&server)
        .create_task(&source, &UploadTaskSettings::default())
        .await
        .unwrap();

    assert_eq!(request_id.as_str(), "r1");
    mock.assert_async().await;
}
