//! Conversation export: JSON, Markdown, plain text, PDF and the legacy
//! `.doc` text download.

pub mod pdf;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{ChatError, Result};
use crate::state::ChatMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Markdown,
    Text,
    Pdf,
    /// Plain text labelled as a Word document, as the first client offered.
    Doc,
}

impl ExportFormat {
    pub fn all() -> [ExportFormat; 5] {
        [
            ExportFormat::Json,
            ExportFormat::Markdown,
            ExportFormat::Text,
            ExportFormat::Pdf,
            ExportFormat::Doc,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Markdown => "md",
            ExportFormat::Text => "txt",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Doc => "doc",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().into_iter().find(|f| f.as_str() == name)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => ".json",
            ExportFormat::Markdown => ".md",
            ExportFormat::Text => ".txt",
            ExportFormat::Pdf => ".pdf",
            ExportFormat::Doc => ".doc",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Json | ExportFormat::Markdown | ExportFormat::Text => {
                "text/plain;charset=utf-8"
            }
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Doc => "application/msword",
        }
    }
}

/// `HH:MM:SS` in UTC, or the input unchanged when it isn't a timestamp.
pub fn format_time(timestamp: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(timestamp) {
        return dt.with_timezone(&Utc).format("%H:%M:%S").to_string();
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f") {
        return naive.format("%H:%M:%S").to_string();
    }
    timestamp.to_string()
}

fn to_json(messages: &[ChatMessage]) -> String {
    serde_json::to_string_pretty(messages).unwrap_or_else(|e| {
        tracing::error!("serializing conversation: {}", e);
        String::new()
    })
}

fn to_markdown(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|msg| {
            format!(
                "### {} ({})\n\n{}\n\n---\n",
                msg.role.label(),
                format_time(&msg.timestamp),
                msg.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn to_text(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|msg| {
            format!(
                "[{}] {}:\n{}\n\n",
                format_time(&msg.timestamp),
                msg.role.label(),
                msg.content
            )
        })
        .collect()
}

/// Textual form of the conversation. For PDF this is the text that gets
/// laid out on pages.
pub fn format(messages: &[ChatMessage], format: ExportFormat) -> String {
    match format {
        ExportFormat::Json => to_json(messages),
        ExportFormat::Markdown => to_markdown(messages),
        ExportFormat::Text | ExportFormat::Pdf | ExportFormat::Doc => to_text(messages),
    }
}

/// Like [`format`], keyed by format name. Unknown names produce an empty
/// string rather than an error.
pub fn format_named(messages: &[ChatMessage], name: &str) -> String {
    match ExportFormat::from_name(name) {
        Some(f) => format(messages, f),
        None => {
            tracing::debug!(format = name, "unknown export format");
            String::new()
        }
    }
}

/// Extension for a format name, empty when unknown.
pub fn file_extension_named(name: &str) -> &'static str {
    ExportFormat::from_name(name).map_or("", |f| f.extension())
}

/// Download name, e.g. `chat-export-2024-01-01T12-30-45.md`.
pub fn file_name(format: ExportFormat, now: DateTime<Utc>) -> String {
    format!("chat-export-{}{}", now.format("%Y-%m-%dT%H-%M-%S"), format.extension())
}

/// Bytes of the file to write for `format`.
pub fn artifact(messages: &[ChatMessage], format: ExportFormat) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Pdf => pdf::render(messages),
        other => Ok(self::format(messages, other).into_bytes()),
    }
}

/// Write the conversation into `dir` and return the file path.
pub fn export_to_dir(
    messages: &[ChatMessage],
    format: ExportFormat,
    dir: &Path,
    now: DateTime<Utc>,
) -> Result<PathBuf> {
    let bytes = artifact(messages, format)?;

    fs::create_dir_all(dir)
        .map_err(|e| ChatError::export(format!("Cannot create {}: {e}", dir.display())))?;
    let path = dir.join(file_name(format, now));
    fs::write(&path, bytes)
        .map_err(|e| ChatError::export(format!("Cannot write {}: {e}", path.display())))?;

    tracing::debug!(path = %path.display(), format = format.as_str(), messages = messages.len(), "conversation exported");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ChatRole;
    use chrono::TimeZone;

    fn msg(role: ChatRole, content: &str, timestamp: &str, id: &str) -> ChatMessage {
        ChatMessage {
            role,
            content: content.into(),
            timestamp: timestamp.into(),
            id: id.into(),
        }
    }

    fn sample() -> Vec<ChatMessage> {
        vec![
            msg(ChatRole::User, "How do I reverse a Vec?", "2024-03-05T14:02:09.120Z", "a1"),
            msg(
                ChatRole::Assistant,
                "Use `v.reverse()`:\n\n```rust\nlet mut v = vec![1, 2, 3];\nv.reverse();\n```",
                "2024-03-05T14:02:11Z",
                "a2",
            ),
            msg(ChatRole::System, "be brief", "2024-03-05T14:03:00+02:00", "a3"),
        ]
    }

    #[test]
    fn text_example() {
        let messages = vec![msg(ChatRole::User, "hi", "2024-01-01T00:00:00Z", "1")];
        assert_eq!(format(&messages, ExportFormat::Text), "[00:00:00] You:\nhi\n\n");
    }

    #[test]
    fn text_entries_start_with_bracketed_time_and_keep_body() {
        let messages = sample();
        for m in &messages {
            let out = format(std::slice::from_ref(m), ExportFormat::Text);
            assert!(out.starts_with('['), "{out}");
            assert!(out.contains(&m.content));
            assert!(!out.contains("---"));
        }
        let out = format(&messages, ExportFormat::Text);
        assert!(out.contains("[14:02:11] Assistant:\n"));
        // offsets are normalised to UTC
        assert!(out.contains("[12:03:00] You:\n"));
    }

    #[test]
    fn markdown_has_one_heading_and_a_separator_per_entry() {
        for m in sample() {
            let out = format(std::slice::from_ref(&m), ExportFormat::Markdown);
            let headings = out.lines().filter(|l| l.starts_with("### ")).count();
            assert_eq!(headings, 1);
            assert!(out.ends_with("---\n"));
        }

        let out = format(&sample(), ExportFormat::Markdown);
        assert!(out.starts_with("### You (14:02:09)\n\nHow do I reverse a Vec?\n\n---\n\n### Assistant"));
        assert_eq!(out.matches("\n---\n").count(), 3);
    }

    #[test]
    fn json_round_trips() {
        let messages = sample();
        let out = format(&messages, ExportFormat::Json);
        assert!(out.starts_with("[\n  {\n    \"role\": \"user\",\n    \"content\""));

        let parsed: Vec<ChatMessage> = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed, messages);
    }

    #[test]
    fn malformed_timestamp_passes_through() {
        let messages = vec![msg(ChatRole::Assistant, "ok", "yesterday-ish", "x")];
        assert_eq!(format(&messages, ExportFormat::Text), "[yesterday-ish] Assistant:\nok\n\n");
        assert_eq!(format_time("2024-01-01T08:15:30"), "08:15:30");
    }

    #[test]
    fn unknown_format_yields_empty_string() {
        assert_eq!(format_named(&sample(), "docx"), "");
        assert_eq!(file_extension_named("docx"), "");
        assert_eq!(file_extension_named("md"), ".md");
        assert!(!format_named(&sample(), "txt").is_empty());
    }

    #[test]
    fn doc_is_plain_text() {
        let messages = sample();
        assert_eq!(format(&messages, ExportFormat::Doc), format(&messages, ExportFormat::Text));
        assert_eq!(ExportFormat::Doc.mime_type(), "application/msword");
    }

    #[test]
    fn file_names() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(file_name(ExportFormat::Json, now), "chat-export-2024-01-02T03-04-05.json");
        assert_eq!(file_name(ExportFormat::Pdf, now), "chat-export-2024-01-02T03-04-05.pdf");
    }

    #[test]
    fn export_writes_into_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("exports");
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

        let path = export_to_dir(&sample(), ExportFormat::Markdown, &dir, now).unwrap();
        assert_eq!(path, dir.join("chat-export-2024-01-02T03-04-05.md"));
        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, format(&sample(), ExportFormat::Markdown));

        let pdf_path = export_to_dir(&sample(), ExportFormat::Pdf, &dir, now).unwrap();
        assert_eq!(&fs::read(pdf_path).unwrap()[0..4], b"%PDF");
    }

    #[test]
    fn export_into_a_file_path_fails() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let err = export_to_dir(&sample(), ExportFormat::Text, tmp.path(), Utc::now()).unwrap_err();
        assert!(matches!(err, ChatError::Export(_)));
    }
}
