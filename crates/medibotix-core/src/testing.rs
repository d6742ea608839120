//! Scripted in-memory transport for controller tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::TransportError;
use crate::transport::{AskReply, Transport, UploadReply};

#[derive(Default)]
pub struct FakeTransport {
    uploads: Mutex<VecDeque<Result<UploadReply, TransportError>>>,
    answers: Mutex<VecDeque<Result<AskReply, TransportError>>>,
    uploaded: Mutex<Vec<String>>,
    asked: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result of the next upload; unscripted uploads succeed
    pub fn push_upload(&self, result: Result<UploadReply, TransportError>) {
        self.uploads.lock().unwrap().push_back(result);
    }

    /// Queue the result of the next question; unscripted questions get a
    /// canned answer
    pub fn push_ask(&self, result: Result<AskReply, TransportError>) {
        self.answers.lock().unwrap().push_back(result);
    }

    pub fn upload_calls(&self) -> usize {
        self.uploaded.lock().unwrap().len()
    }

    pub fn uploaded_names(&self) -> Vec<String> {
        self.uploaded.lock().unwrap().clone()
    }

    pub fn ask_calls(&self) -> usize {
        self.asked.lock().unwrap().len()
    }

    pub fn asked_questions(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn upload_document(
        &self,
        _bytes: Vec<u8>,
        filename: &str,
    ) -> Result<UploadReply, TransportError> {
        self.uploaded.lock().unwrap().push(filename.to_string());
        let scripted = self.uploads.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(UploadReply::ok(filename)))
    }

    async fn ask_question(&self, question: &str) -> Result<AskReply, TransportError> {
        self.asked.lock().unwrap().push(question.to_string());
        let scripted = self.answers.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(AskReply::answer("Everything looks normal.")))
    }
}
