/// Upstream providers the legacy `/ask` backend can route to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiProvider {
    #[default]
    OpenAI,
    Gemini,
    Perplexity,
}

impl ApiProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiProvider::OpenAI => "openai",
            ApiProvider::Gemini => "gemini",
            ApiProvider::Perplexity => "perplexity",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Some(ApiProvider::OpenAI),
            "gemini" => Some(ApiProvider::Gemini),
            "perplexity" => Some(ApiProvider::Perplexity),
            _ => None,
        }
    }

    pub fn all() -> Vec<ApiProvider> {
        vec![ApiProvider::OpenAI, ApiProvider::Gemini, ApiProvider::Perplexity]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ApiProvider::OpenAI => "OpenAI",
            ApiProvider::Gemini => "Google Gemini",
            ApiProvider::Perplexity => "Perplexity",
        }
    }

    /// Models offered for this provider, default first.
    pub fn models(&self) -> &'static [&'static str] {
        match self {
            ApiProvider::OpenAI => &[
                "gpt-4o-mini",
                "gpt-4-turbo",
                "gpt-4",
                "gpt-3.5-turbo-0125",
                "gpt-3.5-turbo",
                "o1-preview",
            ],
            ApiProvider::Gemini => &[
                "gemini-1.5-flash",
                "gemini-1.5-pro",
                "gemini-1.0-pro",
                "text-embedding-004",
            ],
            ApiProvider::Perplexity => &[
                "llama-3.1-sonar-small-128k-online",
                "llama-3.1-sonar-large-128k-online",
                "llama-3.1-sonar-huge-128k-online",
                "llama-3.1-sonar-small-128k-chat",
                "llama-3.1-sonar-large-128k-chat",
                "llama-3.1-8b-instruct",
                "llama-3.1-70b-instruct",
            ],
        }
    }

    pub fn default_model(&self) -> &'static str {
        self.models()[0]
    }
}
