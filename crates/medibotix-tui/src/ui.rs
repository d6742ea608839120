use medibotix_core::{format_response, ChatRole, DisplayBlock, UploadStatus};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Screen};

const EMPHASIS: Color = Color::Green;

/// Convert one formatted answer line into a styled terminal line
fn block_to_line(block: DisplayBlock) -> Line<'static> {
    let bold = Style::default().fg(EMPHASIS).add_modifier(Modifier::BOLD);
    match block {
        DisplayBlock::Spacer => Line::default(),
        DisplayBlock::Plain(text) => Line::from(text),
        DisplayBlock::BoldLabel { label, rest } => Line::from(vec![
            Span::styled(label, bold),
            Span::raw(" "),
            Span::raw(rest),
        ]),
        DisplayBlock::MixedRun(segments) => Line::from(
            segments
                .into_iter()
                .filter(|s| !s.text.is_empty())
                .map(|s| {
                    if s.emphasized {
                        Span::styled(s.text, bold)
                    } else {
                        Span::raw(s.text)
                    }
                })
                .collect::<Vec<_>>(),
        ),
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.screen {
        Screen::Upload => render_upload_screen(app, frame, body_area),
        Screen::Chat => render_chat_screen(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" MediBotix ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            "Your Medical AI Assistant ",
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("[{}] ", app.backend_url),
            Style::default().fg(Color::Gray),
        ),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode, hints) = match app.screen {
        Screen::Upload => (
            " UPLOAD ",
            " Enter: select file / upload  Ctrl-U: upload  Ctrl-X: clear  Esc: quit",
        ),
        Screen::Chat => (
            " CHAT ",
            " Enter: send  PgUp/PgDn: scroll  Ctrl-R: new conversation  Esc: back  Ctrl-C: quit",
        ),
    };

    let footer = Line::from(vec![
        Span::styled(mode, Style::default().bg(Color::Blue).fg(Color::White).bold()),
        Span::styled(hints, Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(footer), area);
}

fn render_upload_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [title_area, input_area, file_area, status_area, tip_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Length(4),
        Constraint::Min(3),
        Constraint::Length(3),
    ])
    .areas(area);

    let title = Paragraph::new(vec![
        Line::from(Span::styled(
            "Upload Medical Report",
            Style::default().fg(Color::White).bold(),
        )),
        Line::from(Span::styled(
            "Upload your medical documents to get started (PDF or TXT files only)",
            Style::default().fg(Color::DarkGray),
        )),
    ]);
    frame.render_widget(title, title_area);

    // Path input with horizontal scrolling to keep the cursor visible
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" File path (type or paste) ");
    let inner_width = input_area.width.saturating_sub(2) as usize;
    let scroll_offset = scroll_offset(app.path_cursor, inner_width);
    let visible: String = app
        .path_input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();
    frame.render_widget(
        Paragraph::new(visible)
            .style(Style::default().fg(Color::Cyan))
            .block(input_block),
        input_area,
    );
    frame.set_cursor_position((
        input_area.x + (app.path_cursor - scroll_offset) as u16 + 1,
        input_area.y + 1,
    ));

    // Selected file card
    let file_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green))
        .title(" Selected file ");
    let file_text = match app.upload.selected_file() {
        Some(file) => Text::from(vec![
            Line::from(Span::styled(file.name.clone(), Style::default().fg(Color::Green).bold())),
            Line::from(Span::styled(file.size_label(), Style::default().fg(Color::Green))),
        ]),
        None => Text::from(Span::styled(
            "No file selected",
            Style::default().fg(Color::DarkGray),
        )),
    };
    frame.render_widget(Paragraph::new(file_text).block(file_block), file_area);

    // Status / error panel
    let dots = ".".repeat(app.animation_frame as usize + 1);
    let (status_line, border) = match app.upload.status() {
        UploadStatus::Idle if app.upload.selected_file().is_some() => (
            Line::from("Ready. Press Enter to upload & continue."),
            Color::DarkGray,
        ),
        UploadStatus::Idle => (
            Line::from("Enter the path of a report and press Enter."),
            Color::DarkGray,
        ),
        UploadStatus::Uploading => (
            Line::from(Span::styled(
                format!("Uploading{}", dots),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
            )),
            Color::Yellow,
        ),
        UploadStatus::Succeeded => (
            Line::from(Span::styled("Uploaded", Style::default().fg(Color::Green))),
            Color::Green,
        ),
        UploadStatus::Failed(reason) => (
            Line::from(vec![
                Span::styled("Upload Failed: ", Style::default().fg(Color::Red).bold()),
                Span::styled(reason.clone(), Style::default().fg(Color::Red)),
            ]),
            Color::Red,
        ),
    };

    let mut status_lines = vec![status_line];
    if let Some(notice) = &app.path_notice {
        status_lines.push(Line::from(Span::styled(
            notice.clone(),
            Style::default().fg(Color::Red),
        )));
    }
    let status = Paragraph::new(status_lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border))
                .title(" Status "),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(status, status_area);

    let tip = Paragraph::new(Line::from(vec![
        Span::styled("Tip: ", Style::default().fg(Color::Blue).bold()),
        Span::styled(
            "Your medical reports are processed securely. We support PDF and text files up to 10MB.",
            Style::default().fg(Color::Blue),
        ),
    ]))
    .block(Block::default().borders(Borders::TOP))
    .wrap(Wrap { trim: true });
    frame.render_widget(tip, tip_area);
}

fn render_chat_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(3)]).areas(area);

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.query_chat_height = chat_area.height.saturating_sub(2);
    app.query_chat_width = chat_area.width.saturating_sub(2);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Medical AI Assistant ");

    let messages = app.chat.messages();
    let chat_text = if messages.is_empty() && !app.chat.is_loading() {
        Text::from(vec![
            Line::from(Span::styled(
                "No messages yet",
                Style::default().fg(Color::White).bold(),
            )),
            Line::from(Span::styled(
                "Ask a question about your uploaded medical document",
                Style::default().fg(Color::DarkGray),
            )),
            Line::from(Span::styled(
                "I can only answer health-related questions from your documents",
                Style::default().fg(Color::DarkGray),
            )),
        ])
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in messages {
            match msg.role {
                ChatRole::User => {
                    lines.push(Line::from(Span::styled(
                        format!("{}:", msg.role.display_name()),
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    )));
                    for line in msg.content.lines() {
                        lines.push(Line::from(line.to_string()));
                    }
                }
                ChatRole::Assistant => {
                    lines.push(Line::from(Span::styled(
                        format!("{}:", msg.role.display_name()),
                        Style::default().fg(EMPHASIS).add_modifier(Modifier::BOLD),
                    )));
                    lines.extend(format_response(&msg.content).into_iter().map(block_to_line));
                }
            }
            lines.push(Line::default());
        }

        if app.chat.is_loading() {
            lines.push(Line::from(Span::styled(
                format!("{}:", ChatRole::Assistant.display_name()),
                Style::default().fg(EMPHASIS).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat(app.animation_frame as usize + 1);
            lines.push(Line::from(Span::styled(
                format!("Analyzing your question{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((app.query_scroll, 0));
    frame.render_widget(chat, chat_area);

    let input_title = if app.chat.is_loading() {
        " Sending... "
    } else {
        " Ask about your medical report (Enter to send) "
    };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(input_title);

    let inner_width = input_area.width.saturating_sub(2) as usize;
    let scroll_offset = scroll_offset(app.query_cursor, inner_width);
    let visible_text: String = app
        .query_input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    // Use cyan text to match the "You:" style - visible in both light and dark terminals
    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);
    frame.render_widget(input, input_area);

    frame.set_cursor_position((
        input_area.x + (app.query_cursor - scroll_offset) as u16 + 1,
        input_area.y + 1,
    ));
}

/// Horizontal scroll offset that keeps the cursor inside the input box
fn scroll_offset(cursor: usize, inner_width: usize) -> usize {
    if inner_width == 0 {
        0
    } else if cursor >= inner_width {
        cursor - inner_width + 1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medibotix_core::format_line;

    #[test]
    fn bold_label_renders_emphasized_label() {
        let line = block_to_line(format_line("1. **Diagnosis**: stable"));
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[0].content, "1. Diagnosis:");
        assert!(line.spans[0].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(line.spans[2].content, "stable");
    }

    #[test]
    fn mixed_run_skips_empty_segments() {
        let line = block_to_line(format_line("**Note** take with food"));
        let contents: Vec<&str> = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(contents, vec!["Note", " take with food"]);
    }

    #[test]
    fn unterminated_bold_renders_literally() {
        let line = block_to_line(format_line("dose **500mg"));
        assert_eq!(line.spans.len(), 1);
        assert_eq!(line.spans[0].content, "dose **500mg");
        assert!(!line.spans[0].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn scroll_offset_keeps_cursor_visible() {
        assert_eq!(scroll_offset(3, 10), 0);
        assert_eq!(scroll_offset(10, 10), 1);
        assert_eq!(scroll_offset(25, 10), 16);
        assert_eq!(scroll_offset(5, 0), 0);
    }
}
