//! HTTP boundary with the inference backend.
//!
//! Two operations only: upload a report (`POST /upload`, multipart) and ask a
//! question about it (`POST /ask`, JSON body). Controllers depend on the
//! [`Transport`] trait so tests can swap the network out.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::config::Config;
use crate::error::{ClientError, TransportError};
use crate::upload::mime_type_for;

#[async_trait]
pub trait Transport: Send + Sync {
    async fn upload_document(
        &self,
        bytes: Vec<u8>,
        filename: &str,
    ) -> Result<UploadReply, TransportError>;

    async fn ask_question(&self, question: &str) -> Result<AskReply, TransportError>;
}

/// Body of a 2xx `/upload` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadReply {
    /// `true`/`false`, or the exception text when the backend failed
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

impl UploadReply {
    pub fn ok(filename: &str) -> Self {
        Self {
            error: None,
            message: Some("uploaded".to_string()),
            filename: Some(filename.to_string()),
        }
    }

    pub fn failed(message: Option<&str>) -> Self {
        Self {
            error: Some(Value::Bool(true)),
            message: message.map(str::to_string),
            filename: None,
        }
    }

    /// Whether the backend flagged an application-level failure
    pub fn is_error(&self) -> bool {
        is_truthy(self.error.as_ref())
    }

    /// Convert into the client taxonomy; the message is empty when the
    /// backend gave none.
    pub fn into_result(self) -> Result<UploadReply, ClientError> {
        if !self.is_error() {
            return Ok(self);
        }
        let message = self
            .message
            .or_else(|| match self.error {
                Some(Value::String(text)) => Some(text),
                _ => None,
            })
            .unwrap_or_default();
        Err(ClientError::Application(message))
    }
}

/// Body of a 2xx `/ask` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AskReply {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

impl AskReply {
    pub fn answer(text: &str) -> Self {
        Self {
            answer: Some(text.to_string()),
            ..Self::default()
        }
    }

    /// Extract the answer text. A reply with an error flag or without an
    /// `answer` field is an application failure.
    pub fn into_answer(self) -> Result<String, ClientError> {
        match self.answer {
            Some(answer) if !is_truthy(self.error.as_ref()) => Ok(answer),
            _ => Err(ClientError::Application(
                self.message
                    .unwrap_or_else(|| "Backend reply had no answer".to_string()),
            )),
        }
    }
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(text)) => !text.is_empty(),
        Some(_) => true,
    }
}

#[derive(Serialize)]
struct AskRequest<'a> {
    question: &'a str,
}

/// Error bodies: our backend sends `message`, FastAPI itself sends `detail`
#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    detail: Option<Value>,
}

#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(
            &config.backend_url,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read_json<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, TransportError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::status(
                status.as_u16(),
                server_message(&body),
            ));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| TransportError::decode(e.to_string()))
    }
}

fn server_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    parsed.message.or(match parsed.detail {
        Some(Value::String(text)) => Some(text),
        _ => None,
    })
}

fn send_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::network(format!("Request timed out: {}", err))
    } else {
        TransportError::network(err.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn upload_document(
        &self,
        bytes: Vec<u8>,
        filename: &str,
    ) -> Result<UploadReply, TransportError> {
        let extension = filename.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(mime_type_for(extension))
            .map_err(|e| TransportError::network(e.to_string()))?;
        let form = Form::new().part("file", part);

        tracing::debug!(filename, url = %self.url("/upload"), "Sending upload");

        let response = self
            .client
            .post(self.url("/upload"))
            .multipart(form)
            .send()
            .await
            .map_err(send_error)?;

        Self::read_json(response).await
    }

    async fn ask_question(&self, question: &str) -> Result<AskReply, TransportError> {
        tracing::debug!(url = %self.url("/ask"), "Sending question");

        let response = self
            .client
            .post(self.url("/ask"))
            .json(&AskRequest { question })
            .send()
            .await
            .map_err(send_error)?;

        Self::read_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_reply_error_accepts_text_or_flag() {
        let text: UploadReply =
            serde_json::from_str(r#"{"error":"no text found","message":"Failed to process file: no text found"}"#)
                .unwrap();
        assert!(text.is_error());

        let flag: UploadReply = serde_json::from_str(r#"{"error":false,"message":"uploaded"}"#).unwrap();
        assert!(!flag.is_error());

        let absent: UploadReply =
            serde_json::from_str(r#"{"message":"uploaded","filename":"report.pdf"}"#).unwrap();
        assert!(!absent.is_error());
        assert_eq!(absent.filename.as_deref(), Some("report.pdf"));
    }

    #[test]
    fn upload_reply_error_message_falls_back_to_error_text() {
        let reply: UploadReply = serde_json::from_str(r#"{"error":"bad pdf"}"#).unwrap();
        match reply.into_result() {
            Err(ClientError::Application(msg)) => assert_eq!(msg, "bad pdf"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn ask_reply_without_answer_is_application_error() {
        let reply: AskReply =
            serde_json::from_str(r#"{"error":"boom","message":"Failed to get answer: boom"}"#).unwrap();
        match reply.into_answer() {
            Err(ClientError::Application(msg)) => assert_eq!(msg, "Failed to get answer: boom"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn ask_reply_answer_is_returned_verbatim() {
        let reply: AskReply = serde_json::from_str(r#"{"answer":"1. **BP**: 120/80"}"#).unwrap();
        assert_eq!(reply.into_answer().unwrap(), "1. **BP**: 120/80");
    }

    #[test]
    fn server_message_reads_message_or_detail() {
        assert_eq!(
            server_message(r#"{"message":"too large"}"#).as_deref(),
            Some("too large")
        );
        assert_eq!(
            server_message(r#"{"detail":"Not Found"}"#).as_deref(),
            Some("Not Found")
        );
        assert_eq!(server_message("<html>502</html>"), None);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let transport = HttpTransport::new("http://localhost:8000/", Duration::from_secs(5)).unwrap();
        assert_eq!(transport.base_url(), "http://localhost:8000");
        assert_eq!(transport.url("/ask"), "http://localhost:8000/ask");
    }
}
