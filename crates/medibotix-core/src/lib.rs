pub mod config;
pub mod conversation;
pub mod error;
pub mod format;
pub mod state;
pub mod transport;
pub mod upload;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use config::Config;
pub use conversation::{
    AskOutcome, ConversationController, PendingQuery, QueryCompletion, SessionState,
    FALLBACK_MESSAGE,
};
pub use error::{ClientError, TransportError};
pub use format::{format_line, format_response, DisplayBlock, Segment};
pub use state::{ChatMessage, ChatRole};
pub use transport::{AskReply, HttpTransport, Transport, UploadReply};
pub use upload::{
    FileHandle, PendingUpload, UploadCompletion, UploadController, UploadOutcome, UploadState,
    UploadStatus,
};
