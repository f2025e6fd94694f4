use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result, anyhow};

use crate::error::ChatError;

/// Storage key the settings live under.
pub const SETTINGS_KEY: &str = "chat-settings";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "pt-br")]
    PtBr,
    #[serde(rename = "en")]
    En,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ModelType {
    #[serde(rename = "gpt-4o")]
    Gpt4o,
    #[serde(rename = "gpt-4o-mini")]
    Gpt4oMini,
    #[serde(rename = "gpt-4")]
    Gpt4,
    #[serde(rename = "gpt-4-turbo")]
    Gpt4Turbo,
    #[default]
    #[serde(rename = "gpt-3.5-turbo")]
    Gpt35Turbo,
    #[serde(rename = "o1-preview")]
    O1Preview,
    #[serde(rename = "o1-mini")]
    O1Mini,
}

impl ModelType {
    pub fn all() -> [ModelType; 7] {
        [
            ModelType::Gpt4o,
            ModelType::Gpt4oMini,
            ModelType::Gpt4,
            ModelType::Gpt4Turbo,
            ModelType::Gpt35Turbo,
            ModelType::O1Preview,
            ModelType::O1Mini,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::Gpt4o => "gpt-4o",
            ModelType::Gpt4oMini => "gpt-4o-mini",
            ModelType::Gpt4 => "gpt-4",
            ModelType::Gpt4Turbo => "gpt-4-turbo",
            ModelType::Gpt35Turbo => "gpt-3.5-turbo",
            ModelType::O1Preview => "o1-preview",
            ModelType::O1Mini => "o1-mini",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::all().into_iter().find(|m| m.as_str() == s)
    }
}

/// Syntax highlighting themes for code blocks. Names match the stored
/// `codeTheme` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CodeTheme {
    #[default]
    OneDark,
    OneLight,
    VscDarkPlus,
    Dracula,
    Okaidia,
    Prism,
    SolarizedLight,
    SolarizedDarkAtom,
}

impl CodeTheme {
    pub fn all() -> [CodeTheme; 8] {
        [
            CodeTheme::OneDark,
            CodeTheme::OneLight,
            CodeTheme::VscDarkPlus,
            CodeTheme::Dracula,
            CodeTheme::Okaidia,
            CodeTheme::Prism,
            CodeTheme::SolarizedLight,
            CodeTheme::SolarizedDarkAtom,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CodeTheme::OneDark => "oneDark",
            CodeTheme::OneLight => "oneLight",
            CodeTheme::VscDarkPlus => "vscDarkPlus",
            CodeTheme::Dracula => "dracula",
            CodeTheme::Okaidia => "okaidia",
            CodeTheme::Prism => "prism",
            CodeTheme::SolarizedLight => "solarizedlight",
            CodeTheme::SolarizedDarkAtom => "solarizedDarkAtom",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::all().into_iter().find(|t| t.as_str() == s)
    }
}

impl From<String> for CodeTheme {
    fn from(name: String) -> Self {
        Self::from_str(&name).unwrap_or_else(|| {
            tracing::warn!(theme = %name, "unknown code theme, using {}", CodeTheme::default().as_str());
            CodeTheme::default()
        })
    }
}

impl From<CodeTheme> for String {
    fn from(theme: CodeTheme) -> Self {
        theme.as_str().to_string()
    }
}

/// User settings: generation parameters plus display preferences.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub theme: Theme,
    #[serde(rename = "fontSize")]
    pub font_size: u8,
    pub notifications: bool,
    pub sound: bool,
    pub markdown: bool,
    pub model: ModelType,
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: Option<u32>,
    pub presence_penalty: f64,
    pub frequency_penalty: f64,
    pub stream: bool,
    pub language: Language,
    #[serde(rename = "codeTheme")]
    pub code_theme: CodeTheme,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            font_size: 14,
            notifications: true,
            sound: true,
            markdown: true,
            model: ModelType::Gpt35Turbo,
            temperature: 0.7,
            top_p: 1.0,
            max_tokens: None,
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
            stream: true,
            language: Language::PtBr,
            code_theme: CodeTheme::OneDark,
        }
    }
}

const TEMPERATURE_RANGE: (f64, f64) = (0.0, 2.0);
const TOP_P_RANGE: (f64, f64) = (0.0, 1.0);
const PENALTY_RANGE: (f64, f64) = (-2.0, 2.0);
const FONT_SIZE_RANGE: (u8, u8) = (12, 24);

fn check_range(name: &str, value: f64, (lo, hi): (f64, f64)) -> Result<(), ChatError> {
    if value.is_nan() || value < lo || value > hi {
        return Err(ChatError::invalid_setting(format!(
            "{} must be between {} and {}, got {}",
            name, lo, hi, value
        )));
    }
    Ok(())
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ChatError> {
    match value.to_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        _ => Err(ChatError::invalid_setting(format!("{}: expected a boolean, got {:?}", key, value))),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ChatError> {
    value
        .trim()
        .parse()
        .map_err(|_| ChatError::invalid_setting(format!("{}: expected a number, got {:?}", key, value)))
}

impl Settings {
    pub fn validate(&self) -> Result<(), ChatError> {
        check_range("temperature", self.temperature, TEMPERATURE_RANGE)?;
        check_range("top_p", self.top_p, TOP_P_RANGE)?;
        check_range("presence_penalty", self.presence_penalty, PENALTY_RANGE)?;
        check_range("frequency_penalty", self.frequency_penalty, PENALTY_RANGE)?;
        if self.font_size < FONT_SIZE_RANGE.0 || self.font_size > FONT_SIZE_RANGE.1 {
            return Err(ChatError::invalid_setting(format!(
                "fontSize must be between {} and {}, got {}",
                FONT_SIZE_RANGE.0, FONT_SIZE_RANGE.1, self.font_size
            )));
        }
        if self.max_tokens == Some(0) {
            return Err(ChatError::invalid_setting("max_tokens must be positive"));
        }
        Ok(())
    }

    /// Pull out-of-range values back into range. Returns true if anything changed.
    pub fn clamp(&mut self) -> bool {
        let before = self.clone();
        let clamp = |v: f64, (lo, hi): (f64, f64), default: f64| {
            if v.is_nan() { default } else { v.clamp(lo, hi) }
        };
        self.temperature = clamp(self.temperature, TEMPERATURE_RANGE, 0.7);
        self.top_p = clamp(self.top_p, TOP_P_RANGE, 1.0);
        self.presence_penalty = clamp(self.presence_penalty, PENALTY_RANGE, 0.0);
        self.frequency_penalty = clamp(self.frequency_penalty, PENALTY_RANGE, 0.0);
        self.font_size = self.font_size.clamp(FONT_SIZE_RANGE.0, FONT_SIZE_RANGE.1);
        if self.max_tokens == Some(0) {
            self.max_tokens = None;
        }
        *self != before
    }

    /// Set one field from its textual form. Accepts the stored field names
    /// and their snake_case spellings.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ChatError> {
        let mut next = self.clone();
        match key {
            "theme" => {
                next.theme = match value {
                    "light" => Theme::Light,
                    "dark" => Theme::Dark,
                    _ => return Err(ChatError::invalid_setting(format!("theme: unknown value {:?}", value))),
                }
            }
            "fontSize" | "font_size" => next.font_size = parse_number(key, value)?,
            "notifications" => next.notifications = parse_bool(key, value)?,
            "sound" => next.sound = parse_bool(key, value)?,
            "markdown" => next.markdown = parse_bool(key, value)?,
            "model" => {
                next.model = ModelType::from_str(value)
                    .ok_or_else(|| ChatError::invalid_setting(format!("model: unknown value {:?}", value)))?
            }
            "temperature" => next.temperature = parse_number(key, value)?,
            "top_p" | "topP" => next.top_p = parse_number(key, value)?,
            "max_tokens" | "maxTokens" => {
                next.max_tokens = match value.trim() {
                    "" | "none" | "null" | "unset" => None,
                    v => Some(parse_number(key, v)?),
                }
            }
            "presence_penalty" | "presencePenalty" => next.presence_penalty = parse_number(key, value)?,
            "frequency_penalty" | "frequencyPenalty" => next.frequency_penalty = parse_number(key, value)?,
            "stream" => next.stream = parse_bool(key, value)?,
            "language" => {
                next.language = match value {
                    "pt-br" => Language::PtBr,
                    "en" => Language::En,
                    _ => return Err(ChatError::invalid_setting(format!("language: unknown value {:?}", value))),
                }
            }
            "codeTheme" | "code_theme" => {
                next.code_theme = CodeTheme::from_str(value)
                    .ok_or_else(|| ChatError::invalid_setting(format!("codeTheme: unknown value {:?}", value)))?
            }
            _ => return Err(ChatError::invalid_setting(format!("unknown setting {:?}", key))),
        }
        next.validate()?;
        *self = next;
        Ok(())
    }
}

/// File-backed key-value store for [`Settings`].
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the platform config directory.
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(Self::default_path()?))
    }

    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("devchat").join(format!("{}.json", SETTINGS_KEY)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read stored settings. `Ok(None)` when nothing has been saved yet.
    pub fn load(&self) -> Result<Option<Settings>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        let mut settings: Settings = serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        if settings.clamp() {
            tracing::warn!(path = %self.path.display(), "stored settings were out of range and have been clamped");
        }
        Ok(Some(settings))
    }

    /// Stored settings, or the defaults when none exist or they can't be read.
    pub fn load_or_default(&self) -> Settings {
        match self.load() {
            Ok(Some(settings)) => settings,
            Ok(None) => Settings::default(),
            Err(e) => {
                tracing::warn!("ignoring unreadable settings: {:#}", e);
                Settings::default()
            }
        }
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, content)
            .with_context(|| format!("writing {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_first_run() {
        let s = Settings::default();
        assert_eq!(s.model, ModelType::Gpt35Turbo);
        assert_eq!(s.temperature, 0.7);
        assert_eq!(s.max_tokens, None);
        assert_eq!(s.language, Language::PtBr);
        assert_eq!(s.code_theme, CodeTheme::OneDark);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn serialized_field_names() {
        let value = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(value["fontSize"], 14);
        assert_eq!(value["codeTheme"], "oneDark");
        assert_eq!(value["model"], "gpt-3.5-turbo");
        assert_eq!(value["language"], "pt-br");
        assert!(value["max_tokens"].is_null());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let s: Settings = serde_json::from_str(r#"{"temperature": 1.2, "language": "en"}"#).unwrap();
        assert_eq!(s.temperature, 1.2);
        assert_eq!(s.language, Language::En);
        assert_eq!(s.font_size, 14);
    }

    #[test]
    fn unknown_code_theme_falls_back_to_default() {
        let s: Settings = serde_json::from_str(r#"{"codeTheme": "neonPink"}"#).unwrap();
        assert_eq!(s.code_theme, CodeTheme::OneDark);
        let s: Settings = serde_json::from_str(r#"{"codeTheme": "dracula"}"#).unwrap();
        assert_eq!(s.code_theme, CodeTheme::Dracula);
    }

    #[test]
    fn set_parses_and_validates() {
        let mut s = Settings::default();
        s.set("temperature", "1.5").unwrap();
        s.set("max_tokens", "256").unwrap();
        s.set("codeTheme", "okaidia").unwrap();
        s.set("stream", "off").unwrap();
        assert_eq!(s.temperature, 1.5);
        assert_eq!(s.max_tokens, Some(256));
        assert_eq!(s.code_theme, CodeTheme::Okaidia);
        assert!(!s.stream);

        s.set("max_tokens", "none").unwrap();
        assert_eq!(s.max_tokens, None);

        assert!(s.set("temperature", "2.5").is_err());
        assert_eq!(s.temperature, 1.5, "rejected update must not apply");
        assert!(s.set("top_p", "-0.1").is_err());
        assert!(s.set("model", "gpt-5").is_err());
        assert!(s.set("volume", "11").is_err());
    }

    #[test]
    fn clamp_pulls_values_into_range() {
        let mut s = Settings { temperature: 9.0, presence_penalty: -3.0, font_size: 40, ..Settings::default() };
        assert!(s.clamp());
        assert_eq!(s.temperature, 2.0);
        assert_eq!(s.presence_penalty, -2.0);
        assert_eq!(s.font_size, 24);
        assert!(!s.clamp());
    }

    #[test]
    fn store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("nested").join("chat-settings.json"));
        assert!(store.load().unwrap().is_none());

        let mut settings = Settings::default();
        settings.model = ModelType::Gpt4o;
        settings.max_tokens = Some(1024);
        store.save(&settings).unwrap();

        assert_eq!(store.load().unwrap(), Some(settings));
    }

    #[test]
    fn unreadable_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat-settings.json");
        fs::write(&path, "{not json").unwrap();

        let store = SettingsStore::new(&path);
        assert!(store.load().is_err());
        assert_eq!(store.load_or_default(), Settings::default());
    }
}
