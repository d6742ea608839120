use httpmock::prelude::*;
use medibotix_core::conversation::FALLBACK_MESSAGE;
use medibotix_core::upload::NETWORK_ERROR_MESSAGE;
use medibotix_core::{
    AskOutcome, ChatMessage, ConversationController, FileHandle, HttpTransport, Transport,
    UploadController, UploadOutcome, UploadStatus,
};
use serde_json::json;
use std::time::Duration;

fn transport(server: &MockServer) -> HttpTransport {
    HttpTransport::new(&server.base_url(), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn ask_posts_question_as_json_body() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/ask")
            .json_body(json!({ "question": "What is my blood pressure?" }));
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "answer": "1. **Blood pressure**: 120/80" }));
    });

    let reply = transport(&server)
        .ask_question("What is my blood pressure?")
        .await
        .unwrap();

    mock.assert();
    assert_eq!(reply.answer.as_deref(), Some("1. **Blood pressure**: 120/80"));
}

#[tokio::test]
async fn upload_sends_multipart_file_field() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/upload")
            .header_exists("content-type")
            .body_contains("name=\"file\"")
            .body_contains("filename=\"labs.txt\"")
            .body_contains("Ferritin 12 ng/mL");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "message": "uploaded", "filename": "labs.txt" }));
    });

    let reply = transport(&server)
        .upload_document(b"Ferritin 12 ng/mL".to_vec(), "labs.txt")
        .await
        .unwrap();

    mock.assert();
    assert!(!reply.is_error());
    assert_eq!(reply.filename.as_deref(), Some("labs.txt"));
}

#[tokio::test]
async fn non_2xx_surfaces_server_message() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/upload");
        then.status(500)
            .header("content-type", "application/json")
            .json_body(json!({ "message": "Embedding service unavailable" }));
    });

    let err = transport(&server)
        .upload_document(b"x".to_vec(), "report.pdf")
        .await
        .unwrap_err();

    assert_eq!(err.status, Some(500));
    assert_eq!(
        err.server_message.as_deref(),
        Some("Embedding service unavailable")
    );
}

#[tokio::test]
async fn upload_controller_reports_backend_error_payload() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/upload");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "error": "EOF marker not found",
                "message": "Failed to process file: EOF marker not found"
            }));
    });
    let http = transport(&server);

    let mut upload = UploadController::new();
    upload
        .select_file(FileHandle::new("broken.pdf", b"%PDF-1.4".to_vec()))
        .unwrap();
    let outcome = upload.submit(&http).await;

    let expected = "Failed to process file: EOF marker not found".to_string();
    assert_eq!(outcome, Some(UploadOutcome::Failed(expected.clone())));
    assert_eq!(upload.status(), &UploadStatus::Failed(expected));
}

#[tokio::test]
async fn upload_controller_proceeds_on_success() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/upload");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "message": "uploaded", "filename": "report.pdf" }));
    });
    let http = transport(&server);

    let mut upload = UploadController::new();
    upload
        .select_file(FileHandle::new("report.pdf", b"%PDF-1.4".to_vec()))
        .unwrap();

    assert_eq!(upload.submit(&http).await, Some(UploadOutcome::ProceedToChat));
    mock.assert();
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error() {
    // Nothing listens on port 9 locally
    let http = HttpTransport::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();

    let mut upload = UploadController::new();
    upload
        .select_file(FileHandle::new("report.txt", b"text".to_vec()))
        .unwrap();
    assert_eq!(
        upload.submit(&http).await,
        Some(UploadOutcome::Failed(NETWORK_ERROR_MESSAGE.to_string()))
    );

    let mut chat = ConversationController::new();
    assert_eq!(chat.ask(&http, "Anything?").await, Some(AskOutcome::Fallback));
    assert!(!chat.is_loading());
}

#[tokio::test]
async fn ask_timeout_becomes_fallback_message() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/ask");
        then.status(200)
            .delay(Duration::from_secs(2))
            .json_body(json!({ "answer": "too late" }));
    });
    let http = HttpTransport::new(&server.base_url(), Duration::from_millis(200)).unwrap();

    let mut chat = ConversationController::new();
    let outcome = chat.ask(&http, "What is my blood pressure?").await;

    assert_eq!(outcome, Some(AskOutcome::Fallback));
    assert_eq!(
        chat.messages(),
        &[
            ChatMessage::user("What is my blood pressure?"),
            ChatMessage::assistant(FALLBACK_MESSAGE),
        ]
    );
}

#[tokio::test]
async fn ask_error_payload_becomes_fallback_message() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/ask");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "error": "index.faiss not found",
                "message": "Failed to get answer: index.faiss not found"
            }));
    });
    let http = transport(&server);

    let mut chat = ConversationController::new();
    assert_eq!(chat.ask(&http, "Summary?").await, Some(AskOutcome::Fallback));
    assert_eq!(chat.messages()[1], ChatMessage::assistant(FALLBACK_MESSAGE));
}
