//! Turns raw assistant answers into renderer-agnostic display blocks.
//!
//! The backend answers in loosely formatted text: numbered findings such as
//! `1. **Diagnosis**: stable` and inline `**bold**` spans. Each input line maps
//! to exactly one [`DisplayBlock`]; nothing is ever rejected, malformed markup
//! just stays plain text.

use regex::Regex;
use std::sync::OnceLock;

/// A run of text inside a line, emphasized or not
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub emphasized: bool,
}

impl Segment {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            emphasized: false,
        }
    }

    pub fn emphasized(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            emphasized: true,
        }
    }
}

/// One formatted line of an assistant message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayBlock {
    /// Blank input line, kept as vertical space
    Spacer,
    Plain(String),
    /// Numbered heading: `label` is emphasized (`"1. Diagnosis:"`), `rest` is not
    BoldLabel { label: String, rest: String },
    /// Alternating plain/emphasized segments, starting and ending with plain
    MixedRun(Vec<Segment>),
}

impl DisplayBlock {
    /// Visible text of the block with all markup removed
    pub fn text(&self) -> String {
        match self {
            DisplayBlock::Spacer => String::new(),
            DisplayBlock::Plain(text) => text.clone(),
            DisplayBlock::BoldLabel { label, rest } if rest.is_empty() => label.clone(),
            DisplayBlock::BoldLabel { label, rest } => format!("{} {}", label, rest),
            DisplayBlock::MixedRun(segments) => {
                segments.iter().map(|s| s.text.as_str()).collect()
            }
        }
    }

    pub fn is_spacer(&self) -> bool {
        matches!(self, DisplayBlock::Spacer)
    }
}

fn numbered_heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d+\.\s+)\*\*(.*?)\*\*:?\s*(.*)$").expect("numbered heading pattern")
    })
}

fn bold_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*(.*?)\*\*").expect("bold run pattern"))
}

/// Format a whole answer, one block per line in input order
pub fn format_response(content: &str) -> Vec<DisplayBlock> {
    content
        .split('\n')
        .map(|line| format_line(line.strip_suffix('\r').unwrap_or(line)))
        .collect()
}

/// Classify a single line. The numbered heading rule is tried first; the
/// generic bold-run split only applies when it does not match.
pub fn format_line(line: &str) -> DisplayBlock {
    if line.trim().is_empty() {
        return DisplayBlock::Spacer;
    }

    if let Some(caps) = numbered_heading_re().captures(line) {
        return DisplayBlock::BoldLabel {
            label: format!("{}{}:", &caps[1], &caps[2]),
            rest: caps[3].to_string(),
        };
    }

    split_bold_runs(line)
}

fn split_bold_runs(line: &str) -> DisplayBlock {
    let mut segments = Vec::new();
    let mut last = 0;

    for caps in bold_run_re().captures_iter(line) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        segments.push(Segment::plain(&line[last..whole.start()]));
        segments.push(Segment::emphasized(inner.as_str()));
        last = whole.end();
    }

    if segments.is_empty() {
        // No closed pair: any lone `**` stays literal
        return DisplayBlock::Plain(line.to_string());
    }

    segments.push(Segment::plain(&line[last..]));
    DisplayBlock::MixedRun(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbered_heading_becomes_bold_label() {
        let blocks = format_response("1. **Diagnosis**: stable");
        assert_eq!(
            blocks,
            vec![DisplayBlock::BoldLabel {
                label: "1. Diagnosis:".to_string(),
                rest: "stable".to_string(),
            }]
        );
    }

    #[test]
    fn numbered_heading_without_colon_still_gets_one() {
        let block = format_line("12. **Blood pressure** within normal range");
        assert_eq!(
            block,
            DisplayBlock::BoldLabel {
                label: "12. Blood pressure:".to_string(),
                rest: "within normal range".to_string(),
            }
        );
        assert_eq!(block.text(), "12. Blood pressure: within normal range");
    }

    #[test]
    fn heading_rest_keeps_later_markers_literal() {
        let block = format_line("2. **Labs**: see **HbA1c**");
        assert_eq!(
            block,
            DisplayBlock::BoldLabel {
                label: "2. Labs:".to_string(),
                rest: "see **HbA1c**".to_string(),
            }
        );
    }

    #[test]
    fn bold_runs_alternate_with_plain_segments() {
        let block = format_line("Your **glucose** is **high** today");
        assert_eq!(
            block,
            DisplayBlock::MixedRun(vec![
                Segment::plain("Your "),
                Segment::emphasized("glucose"),
                Segment::plain(" is "),
                Segment::emphasized("high"),
                Segment::plain(" today"),
            ])
        );
    }

    #[test]
    fn leading_and_trailing_bold_keep_empty_plain_segments() {
        let block = format_line("**Note**");
        assert_eq!(
            block,
            DisplayBlock::MixedRun(vec![
                Segment::plain(""),
                Segment::emphasized("Note"),
                Segment::plain(""),
            ])
        );
    }

    #[test]
    fn segment_concatenation_strips_only_delimiters() {
        let lines = [
            "a **b** c",
            "**x****y**",
            "start **mid** and ** spaced ** end",
            "tail ** open",
            "no markup here",
            "a * single star",
        ];
        for line in lines {
            let expected = if line == "tail ** open" || !line.contains("**") {
                line.to_string()
            } else {
                line.replace("**", "")
            };
            assert_eq!(format_line(line).text(), expected, "line: {line:?}");
        }
    }

    #[test]
    fn unterminated_delimiter_stays_literal() {
        assert_eq!(
            format_line("this is **not closed"),
            DisplayBlock::Plain("this is **not closed".to_string())
        );

        // One closed pair, then a dangling opener
        let block = format_line("**ok** then **dangling");
        assert_eq!(
            block,
            DisplayBlock::MixedRun(vec![
                Segment::plain(""),
                Segment::emphasized("ok"),
                Segment::plain(" then **dangling"),
            ])
        );
        assert!(block.text().contains("**dangling"));
    }

    #[test]
    fn unterminated_numbered_heading_falls_back_to_plain() {
        assert_eq!(
            format_line("1. **Diagnosis: stable"),
            DisplayBlock::Plain("1. **Diagnosis: stable".to_string())
        );
    }

    #[test]
    fn markers_only_line_is_empty_emphasis() {
        let block = format_line("****");
        assert_eq!(
            block,
            DisplayBlock::MixedRun(vec![
                Segment::plain(""),
                Segment::emphasized(""),
                Segment::plain(""),
            ])
        );
    }

    #[test]
    fn blank_lines_become_separate_spacers() {
        let blocks = format_response("First\n\n   \nLast");
        assert_eq!(
            blocks,
            vec![
                DisplayBlock::Plain("First".to_string()),
                DisplayBlock::Spacer,
                DisplayBlock::Spacer,
                DisplayBlock::Plain("Last".to_string()),
            ]
        );
    }

    #[test]
    fn empty_input_is_single_spacer() {
        assert_eq!(format_response(""), vec![DisplayBlock::Spacer]);
    }

    #[test]
    fn crlf_line_endings_are_stripped() {
        let blocks = format_response("one\r\n**two**\r\n");
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0], DisplayBlock::Plain("one".to_string()));
        assert_eq!(blocks[1].text(), "two");
        assert!(blocks[2].is_spacer());
    }

    #[test]
    fn block_order_matches_line_order() {
        let content = "Summary\n1. **Heart**: normal\n2. **Lungs**: clear\nSee a **doctor**.";
        let texts: Vec<String> = format_response(content).iter().map(|b| b.text()).collect();
        assert_eq!(
            texts,
            vec![
                "Summary",
                "1. Heart: normal",
                "2. Lungs: clear",
                "See a doctor.",
            ]
        );
    }
}
