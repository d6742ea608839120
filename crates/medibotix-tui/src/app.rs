use std::path::PathBuf;
use std::sync::Arc;

use medibotix_core::{
    format_response, ChatRole, ConversationController, FileHandle, QueryCompletion, Transport,
    TransportError, UploadCompletion, UploadController, UploadOutcome,
};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Upload,
    Chat,
}

/// A question running on a background task, tagged with the generation it
/// was issued under
struct QueryTask {
    generation: u64,
    handle: JoinHandle<QueryCompletion>,
}

struct UploadTask {
    attempt: u64,
    handle: JoinHandle<UploadCompletion>,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub screen: Screen,
    pub backend_url: String,

    // Upload screen
    pub upload: UploadController,
    pub path_input: String,
    pub path_cursor: usize, // cursor position in path_input (chars)
    /// Problem reading the file from disk, shown instead of the upload error
    pub path_notice: Option<String>,

    // Chat screen
    pub chat: ConversationController,
    pub query_input: String,
    pub query_cursor: usize,
    pub query_scroll: u16,
    pub query_chat_height: u16, // Height of chat area for scroll calculations
    pub query_chat_width: u16,  // Width of chat area for wrap calculations

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    transport: Arc<dyn Transport>,
    upload_task: Option<UploadTask>,
    // Stale questions stay here until they finish; the controller drops them
    query_tasks: Vec<QueryTask>,
}

impl App {
    pub fn new(transport: Arc<dyn Transport>, backend_url: impl Into<String>) -> Self {
        Self {
            should_quit: false,
            screen: Screen::Upload,
            backend_url: backend_url.into(),
            upload: UploadController::new(),
            path_input: String::new(),
            path_cursor: 0,
            path_notice: None,
            chat: ConversationController::new(),
            query_input: String::new(),
            query_cursor: 0,
            query_scroll: 0,
            query_chat_height: 0,
            query_chat_width: 0,
            animation_frame: 0,
            transport,
            upload_task: None,
            query_tasks: Vec::new(),
        }
    }

    /// Read the typed path and hand it to the upload controller
    pub fn select_path(&mut self) {
        let raw = self.path_input.trim();
        if raw.is_empty() {
            return;
        }
        let path = expand_path(raw);
        self.path_notice = None;

        match FileHandle::from_path(&path) {
            Ok(file) => {
                // Rejections are recorded in the upload state and rendered from there
                if self.upload.select_file(file).is_ok() {
                    self.path_input.clear();
                    self.path_cursor = 0;
                }
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Could not read report");
                self.path_notice = Some(e.to_string());
            }
        }
    }

    pub fn clear_selection(&mut self) {
        self.upload.clear_file();
        self.path_notice = None;
    }

    pub fn start_upload(&mut self) {
        let Some(pending) = self.upload.begin_submit() else {
            return;
        };
        let attempt = pending.attempt();
        let transport = Arc::clone(&self.transport);
        let handle = tokio::spawn(async move { pending.send(transport.as_ref()).await });
        self.upload_task = Some(UploadTask { attempt, handle });
    }

    pub fn start_query(&mut self) {
        let Some(pending) = self.chat.submit_input(&mut self.query_input) else {
            return;
        };
        self.query_cursor = 0;
        let generation = pending.generation();
        let transport = Arc::clone(&self.transport);
        let handle = tokio::spawn(async move { pending.send(transport.as_ref()).await });
        self.query_tasks.push(QueryTask { generation, handle });

        // Scroll to bottom so the waiting indicator is visible
        self.scroll_query_to_bottom();
    }

    /// Collect finished background requests and apply them
    pub async fn poll_tasks(&mut self) {
        if self
            .upload_task
            .as_ref()
            .is_some_and(|task| task.handle.is_finished())
        {
            if let Some(task) = self.upload_task.take() {
                let completion = task.handle.await.unwrap_or_else(|e| {
                    UploadCompletion::failed(task.attempt, TransportError::network(e.to_string()))
                });
                if let Some(outcome) = self.upload.finish_submit(completion) {
                    self.on_upload_outcome(outcome);
                }
            }
        }

        let (finished, running): (Vec<_>, Vec<_>) = std::mem::take(&mut self.query_tasks)
            .into_iter()
            .partition(|task| task.handle.is_finished());
        self.query_tasks = running;

        for task in finished {
            let completion = task.handle.await.unwrap_or_else(|e| {
                QueryCompletion::failed(task.generation, TransportError::network(e.to_string()))
            });
            if self.chat.finish_ask(completion).is_some() {
                self.scroll_query_to_bottom();
            }
        }
    }

    fn on_upload_outcome(&mut self, outcome: UploadOutcome) {
        match outcome {
            UploadOutcome::ProceedToChat => {
                // New document, new conversation
                self.chat.reset();
                self.query_scroll = 0;
                self.screen = Screen::Chat;
            }
            UploadOutcome::Failed(message) => {
                tracing::debug!(%message, "Upload failed, staying on upload screen");
            }
        }
    }

    pub fn reset_conversation(&mut self) {
        self.chat.reset();
        self.query_scroll = 0;
    }

    /// Leave the chat: the session ends and a new report can be picked
    pub fn back_to_upload(&mut self) {
        self.reset_conversation();
        self.upload.clear_file();
        self.screen = Screen::Upload;
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.chat.is_loading() || self.upload.is_uploading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.query_scroll = self.query_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.query_scroll = self
            .query_scroll
            .saturating_add(lines)
            .min(self.chat_line_count());
    }

    /// Scroll chat to bottom so the latest message is visible
    pub fn scroll_query_to_bottom(&mut self) {
        let total_lines = self.chat_line_count();
        let visible_height = if self.query_chat_height > 0 {
            self.query_chat_height
        } else {
            20
        };

        self.query_scroll = total_lines.saturating_sub(visible_height);
    }

    /// Rendered height of the chat log, counting wrapped lines. Clamped to
    /// `u16::MAX` for very long conversations.
    fn chat_line_count(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.query_chat_width > 0 {
            self.query_chat_width as usize
        } else {
            50
        };
        let wrapped = |chars: usize| -> usize { chars / wrap_width + 1 };

        let mut total_lines: usize = 0;
        for msg in self.chat.messages() {
            let body: usize = match msg.role {
                ChatRole::User => msg
                    .content
                    .lines()
                    .map(|line| wrapped(line.chars().count()))
                    .fold(0, usize::saturating_add),
                ChatRole::Assistant => format_response(&msg.content)
                    .iter()
                    .map(|block| wrapped(block.text().chars().count()))
                    .fold(0, usize::saturating_add),
            };
            // Role line and the blank line after the message
            total_lines = total_lines.saturating_add(body).saturating_add(2);
        }

        if self.chat.is_loading() {
            total_lines = total_lines.saturating_add(2); // Role line + waiting indicator
        }
        u16::try_from(total_lines).unwrap_or(u16::MAX)
    }
}

/// Accept `~/...` and quoted paths as dropped by most terminals
fn expand_path(raw: &str) -> PathBuf {
    let unquoted = raw.trim_matches(|c| c == '\'' || c == '"');
    match unquoted.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(unquoted)),
        None => PathBuf::from(unquoted),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_path_strips_quotes() {
        assert_eq!(
            expand_path("'/tmp/my report.pdf'"),
            PathBuf::from("/tmp/my report.pdf")
        );
        assert_eq!(expand_path("\"labs.txt\""), PathBuf::from("labs.txt"));
    }

    #[test]
    fn expand_path_resolves_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_path("~/report.pdf"), home.join("report.pdf"));
        }
    }
}
