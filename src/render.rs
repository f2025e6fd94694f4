//! Terminal rendering of message bodies with highlighted code blocks.

use regex::Regex;
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::{as_24_bit_terminal_escaped, LinesWithEndings};

use crate::config::{CodeTheme, Settings};
use crate::state::ChatMessage;

const RESET: &str = "\x1b[0m";

/// Bundled syntect theme used for each code theme. syntect ships seven
/// themes for eight choices, so `Dracula` and `Okaidia` share the mocha
/// palette.
pub fn syntect_theme_name(theme: CodeTheme) -> &'static str {
    match theme {
        CodeTheme::OneDark => "base16-ocean.dark",
        CodeTheme::OneLight => "base16-ocean.light",
        CodeTheme::VscDarkPlus => "base16-eighties.dark",
        CodeTheme::Dracula => "base16-mocha.dark",
        CodeTheme::Okaidia => "base16-mocha.dark",
        CodeTheme::Prism => "InspiredGitHub",
        CodeTheme::SolarizedLight => "Solarized (light)",
        CodeTheme::SolarizedDarkAtom => "Solarized (dark)",
    }
}

pub struct Renderer {
    syntaxes: SyntaxSet,
    themes: ThemeSet,
    fence: Regex,
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
            themes: ThemeSet::load_defaults(),
            fence: Regex::new(r"(?ms)^```([\w+#.-]*)[ \t]*\n(.*?)^```[ \t]*$")
                .expect("valid fence regex"),
        }
    }

    /// Speaker header plus body, as shown in the terminal.
    pub fn render(&self, message: &ChatMessage, settings: &Settings) -> String {
        let time = crate::export::format_time(&message.timestamp);
        format!("[{}] {}:\n{}", time, message.role.label(), self.render_body(&message.content, settings))
    }

    /// Body with fenced code highlighted when markdown is on, verbatim
    /// otherwise.
    pub fn render_body(&self, content: &str, settings: &Settings) -> String {
        if !settings.markdown {
            return content.to_string();
        }
        let Some(theme) = self.themes.themes.get(syntect_theme_name(settings.code_theme)) else {
            tracing::warn!(theme = settings.code_theme.as_str(), "highlight theme not bundled");
            return content.to_string();
        };

        let mut out = String::with_capacity(content.len());
        let mut last = 0;
        for caps in self.fence.captures_iter(content) {
            let (Some(whole), Some(code)) = (caps.get(0), caps.get(2)) else {
                continue;
            };
            let lang = caps.get(1).map_or("", |m| m.as_str());

            out.push_str(&content[last..whole.start()]);
            out.push_str(&format!("```{}\n", lang));
            out.push_str(&self.highlight(code.as_str(), lang, theme));
            out.push_str("```");
            last = whole.end();
        }
        out.push_str(&content[last..]);
        out
    }

    fn highlight(&self, code: &str, lang: &str, theme: &Theme) -> String {
        let syntax = self
            .syntaxes
            .find_syntax_by_token(lang)
            .unwrap_or_else(|| self.syntaxes.find_syntax_plain_text());
        let mut highlighter = HighlightLines::new(syntax, theme);

        let mut out = String::new();
        for line in LinesWithEndings::from(code) {
            match highlighter.highlight_line(line, &self.syntaxes) {
                Ok(ranges) => out.push_str(&as_24_bit_terminal_escaped(&ranges[..], false)),
                Err(e) => {
                    tracing::debug!("highlight failed: {}", e);
                    out.push_str(line);
                }
            }
        }
        out.push_str(RESET);
        out
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}
