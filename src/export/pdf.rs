//! Paginated PDF export via `printpdf`.
//!
//! Layout is computed first as plain data (positions measured in mm from the
//! top of an A4 page) and only then drawn, so pagination can be checked
//! without parsing PDF output.

use std::io::BufWriter;

use printpdf::{BuiltinFont, Mm, PdfDocument};

use crate::error::{ChatError, Result};
use crate::export::{format, ExportFormat};
use crate::state::ChatMessage;

pub const TITLE: &str = "Chat Export";

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const LEFT_MM: f32 = 15.0;
const TITLE_TOP_MM: f32 = 15.0;
const TITLE_SIZE: f32 = 16.0;
const BODY_SIZE: f32 = 10.0;

/// First body line position on every page.
pub const BODY_TOP_MM: f32 = 20.0;
pub const LINE_HEIGHT_MM: f32 = 5.0;
/// A line placed below this starts a new page instead.
pub const BODY_LIMIT_MM: f32 = 280.0;
/// Roughly 180 mm of 10 pt Helvetica.
pub const WRAP_COLUMNS: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub top_mm: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub lines: Vec<PlacedLine>,
}

/// Word-wrap each line of `text` to `max_chars`, breaking words that don't
/// fit on a line of their own. Blank lines are kept, and a wrapped line keeps
/// its leading indentation on the first fragment.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let paragraph = paragraph.trim_end_matches('\r');
        if paragraph.chars().count() <= max_chars {
            lines.push(paragraph.to_string());
            continue;
        }

        let body = paragraph.trim_start();
        let indent = &paragraph[..paragraph.len() - body.len()];
        let indent_len = indent.chars().count();
        let (mut current, mut current_len) = if indent_len < max_chars {
            (indent.to_string(), indent_len)
        } else {
            (String::new(), 0)
        };
        // false while `current` holds nothing but indentation
        let mut has_word = false;

        for word in body.split_whitespace() {
            let mut rest = word;
            loop {
                let word_len = rest.chars().count();
                let needed = if has_word { current_len + 1 + word_len } else { current_len + word_len };
                if needed <= max_chars {
                    if has_word {
                        current.push(' ');
                        current_len += 1;
                    }
                    current.push_str(rest);
                    current_len += word_len;
                    has_word = true;
                    break;
                }
                if has_word {
                    lines.push(std::mem::take(&mut current));
                    current_len = 0;
                    has_word = false;
                    continue;
                }
                let room = max_chars - current_len;
                let split_at = rest.char_indices().nth(room).map_or(rest.len(), |(i, _)| i);
                current.push_str(&rest[..split_at]);
                lines.push(std::mem::take(&mut current));
                current_len = 0;
                rest = &rest[split_at..];
            }
        }
        if has_word {
            lines.push(current);
        } else {
            lines.push(String::new());
        }
    }
    lines
}

/// Place wrapped lines on pages. Always returns at least one page.
pub fn layout_pages(content: &str) -> Vec<PageLayout> {
    let mut pages = vec![PageLayout::default()];
    let mut y = BODY_TOP_MM;

    for text in wrap_text(content, WRAP_COLUMNS) {
        if y > BODY_LIMIT_MM {
            pages.push(PageLayout::default());
            y = BODY_TOP_MM;
        }
        if let Some(page) = pages.last_mut() {
            page.lines.push(PlacedLine { text, top_mm: y });
        }
        y += LINE_HEIGHT_MM;
    }
    pages
}

/// Builtin fonts only cover a Latin-1 style range.
fn printable(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\t' => ' ',
            c if (c as u32) < 0x20 => ' ',
            c if (c as u32) > 0xFF => '?',
            c => c,
        })
        .collect()
}

/// Render the conversation as PDF bytes.
pub fn render(messages: &[ChatMessage]) -> Result<Vec<u8>> {
    let pages = layout_pages(&format(messages, ExportFormat::Pdf));

    let (doc, page1, layer1) =
        PdfDocument::new(TITLE, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ChatError::export(format!("PDF font error: {e}")))?;

    let mut targets = vec![(page1, layer1)];
    for n in 1..pages.len() {
        targets.push(doc.add_page(
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            format!("Layer {}", n + 1),
        ));
    }

    for (n, (page, (page_idx, layer_idx))) in pages.iter().zip(targets).enumerate() {
        let layer = doc.get_page(page_idx).get_layer(layer_idx);
        if n == 0 {
            layer.use_text(TITLE, TITLE_SIZE, Mm(LEFT_MM), Mm(PAGE_HEIGHT_MM - TITLE_TOP_MM), &font);
        }
        for line in page.lines.iter().filter(|l| !l.text.is_empty()) {
            layer.use_text(
                printable(&line.text),
                BODY_SIZE,
                Mm(LEFT_MM),
                Mm(PAGE_HEIGHT_MM - line.top_mm),
                &font,
            );
        }
    }
    tracing::debug!(pages = pages.len(), "pdf laid out");

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| ChatError::export(format!("PDF save error: {e}")))?;
    buf.into_inner()
        .map_err(|e| ChatError::export(format!("PDF buffer error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ChatRole;

    fn long_conversation(n: usize) -> Vec<ChatMessage> {
        (0..n)
            .map(|i| ChatMessage {
                role: if i % 2 == 0 { ChatRole::User } else { ChatRole::Assistant },
                content: format!("message number {i}"),
                timestamp: "2024-01-01T10:00:00Z".into(),
                id: i.to_string(),
            })
            .collect()
    }

    #[test]
    fn wrap_keeps_short_lines_and_blank_lines() {
        assert_eq!(wrap_text("a\n\nb", 10), ["a", "", "b"]);
    }

    #[test]
    fn wrap_breaks_on_words() {
        let lines = wrap_text("the quick brown fox jumps", 10);
        assert_eq!(lines, ["the quick", "brown fox", "jumps"]);
        assert!(lines.iter().all(|l| l.chars().count() <= 10));
    }

    #[test]
    fn wrap_hard_breaks_long_words() {
        let lines = wrap_text("ab abcdefghijkl", 5);
        assert_eq!(lines, ["ab", "abcde", "fghij", "kl"]);
    }

    #[test]
    fn wrap_keeps_indentation_of_long_code_lines() {
        let line = format!("    let x = {}", "y ".repeat(60));
        let lines = wrap_text(&line, WRAP_COLUMNS);

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("    let x = y y"));
        assert!(!lines[1].starts_with(' '));
        assert!(lines.iter().all(|l| l.chars().count() <= WRAP_COLUMNS));
    }

    #[test]
    fn wrap_hard_breaks_after_indentation() {
        assert_eq!(wrap_text("  abcdefgh", 5), ["  abc", "defgh"]);
    }

    #[test]
    fn wrap_counts_characters_not_bytes() {
        let lines = wrap_text("ééééé ééééé", 5);
        assert_eq!(lines, ["ééééé", "ééééé"]);
    }

    #[test]
    fn single_page_for_short_content() {
        let pages = layout_pages("[10:00:00] You:\nhello\n\n");
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].lines[0].top_mm, BODY_TOP_MM);
        assert_eq!(pages[0].lines[1].top_mm, BODY_TOP_MM + LINE_HEIGHT_MM);
    }

    #[test]
    fn long_content_spills_onto_more_pages() {
        let content = format(&long_conversation(40), ExportFormat::Pdf);
        let pages = layout_pages(&content);

        assert!(pages.len() > 1);
        // 20mm..=280mm in 5mm steps
        assert_eq!(pages[0].lines.len(), 53);
        assert_eq!(pages[1].lines[0].top_mm, BODY_TOP_MM);
        for page in &pages {
            assert!(page.lines.iter().all(|l| l.top_mm <= BODY_LIMIT_MM));
        }
        let total: usize = pages.iter().map(|p| p.lines.len()).sum();
        assert_eq!(total, wrap_text(&content, WRAP_COLUMNS).len());
    }

    #[test]
    fn render_produces_pdf_bytes() {
        let bytes = render(&long_conversation(40)).unwrap();
        assert_eq!(&bytes[0..4], b"%PDF");

        let empty = render(&[]).unwrap();
        assert_eq!(&empty[0..4], b"%PDF");
    }

    #[test]
    fn printable_replaces_unsupported_chars() {
        assert_eq!(printable("tab\there ☃ é"), "tab here ? é");
    }
}
