use std::env;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use pomo_core::model::Question;

use crate::error::{ConfigError, GenerationError};
use crate::quiz_source::{QuizSource, parse_quiz_payload};

pub const DEFAULT_QUESTION_COUNT: usize = 5;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4_000;

/// Wire protocol spoken by the configured endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Provider {
    /// Any OpenAI-compatible `chat/completions` endpoint.
    OpenAi,
    Anthropic,
}

impl Provider {
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownProvider` for anything but `openai` or `anthropic`.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            _ => Err(ConfigError::UnknownProvider(value.to_owned())),
        }
    }

    fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Anthropic => "https://api.anthropic.com/v1",
        }
    }

    fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o-mini",
            Self::Anthropic => "claude-3-5-sonnet-20240620",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
        })
    }
}

#[derive(Clone, Debug)]
pub struct QuizGeneratorConfig {
    pub provider: Provider,
    pub base_url: Url,
    pub api_key: String,
    pub model: String,
    pub question_count: usize,
    pub timeout: Duration,
}

impl QuizGeneratorConfig {
    /// Read `POMO_AI_*` variables from the process environment.
    ///
    /// Returns `Ok(None)` when no API key is set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a variable is present but unusable.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as `from_env` with an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a variable is present but unusable.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Option<Self>, ConfigError> {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let own_key = var("POMO_AI_API_KEY");
        let anthropic_key = var("ANTHROPIC_API_KEY");
        let provider = match var("POMO_AI_PROVIDER") {
            Some(value) => Provider::parse(&value)?,
            None if own_key.is_none() && anthropic_key.is_some() => Provider::Anthropic,
            None => Provider::OpenAi,
        };
        let api_key = match provider {
            Provider::Anthropic => own_key.or(anthropic_key),
            Provider::OpenAi => own_key,
        };
        let Some(api_key) = api_key else {
            return Ok(None);
        };

        let raw_url =
            var("POMO_AI_BASE_URL").unwrap_or_else(|| provider.default_base_url().to_owned());
        let base_url = Url::parse(&raw_url).map_err(|source| ConfigError::InvalidBaseUrl {
            value: raw_url.clone(),
            source,
        })?;
        let model = var("POMO_AI_MODEL").unwrap_or_else(|| provider.default_model().to_owned());
        let question_count = match var("POMO_AI_QUESTION_COUNT") {
            Some(value) => positive("POMO_AI_QUESTION_COUNT", &value)?,
            None => DEFAULT_QUESTION_COUNT as u64,
        };
        let timeout_secs = match var("POMO_AI_TIMEOUT_SECS") {
            Some(value) => positive("POMO_AI_TIMEOUT_SECS", &value)?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Some(Self {
            provider,
            base_url,
            api_key,
            model,
            question_count: usize::try_from(question_count).unwrap_or(DEFAULT_QUESTION_COUNT),
            timeout: Duration::from_secs(timeout_secs),
        }))
    }

    fn endpoint(&self) -> String {
        let path = match self.provider {
            Provider::OpenAi => "chat/completions",
            Provider::Anthropic => "messages",
        };
        format!("{}/{path}", self.base_url.as_str().trim_end_matches('/'))
    }
}

fn positive(name: &'static str, value: &str) -> Result<u64, ConfigError> {
    value
        .parse::<u64>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| ConfigError::InvalidNumber {
            name,
            value: value.to_owned(),
        })
}

/// Instructions sent alongside the notes.
#[must_use]
pub fn system_prompt(question_count: usize) -> String {
    format!(
        "You are a study assistant. Write {question_count} multiple-choice questions that test \
         understanding of the notes the user provides. Every question has exactly 4 options. \
         Reply with JSON only, no prose, shaped as \
         [{{\"question\": \"...\", \"options\": [\"...\", \"...\", \"...\", \"...\"], \"correctAnswer\": 0}}] \
         where correctAnswer is the zero-based index of the right option."
    )
}

/// LLM-backed `QuizSource`. Without a config every request fails with
/// `GenerationError::Disabled`.
#[derive(Clone)]
pub struct QuizGenerator {
    client: Client,
    config: Option<QuizGeneratorConfig>,
}

impl QuizGenerator {
    /// # Errors
    ///
    /// Returns `ConfigError` when the environment holds unusable values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(QuizGeneratorConfig::from_env()?))
    }

    #[must_use]
    pub fn new(config: Option<QuizGeneratorConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    #[must_use]
    pub fn config(&self) -> Option<&QuizGeneratorConfig> {
        self.config.as_ref()
    }

    async fn complete(
        &self,
        config: &QuizGeneratorConfig,
        notes: &str,
    ) -> Result<String, GenerationError> {
        let system = system_prompt(config.question_count);
        let request = self.client.post(config.endpoint()).timeout(config.timeout);

        let request = match config.provider {
            Provider::OpenAi => request.bearer_auth(&config.api_key).json(&ChatRequest {
                model: &config.model,
                messages: vec![
                    ChatMessage {
                        role: "system",
                        content: &system,
                    },
                    ChatMessage {
                        role: "user",
                        content: notes,
                    },
                ],
                temperature: 0.0,
            }),
            Provider::Anthropic => request
                .header("x-api-key", &config.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&MessagesRequest {
                    model: &config.model,
                    max_tokens: MAX_TOKENS,
                    temperature: 0.0,
                    system: &system,
                    messages: vec![ChatMessage {
                        role: "user",
                        content: notes,
                    }],
                }),
        };

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(GenerationError::HttpStatus(response.status()));
        }

        let content = match config.provider {
            Provider::OpenAi => {
                let body: ChatResponse = response.json().await?;
                body.choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.message.content)
            }
            Provider::Anthropic => {
                let body: MessagesResponse = response.json().await?;
                body.content
                    .into_iter()
                    .find_map(|block| (block.kind == "text").then_some(block.text))
                    .flatten()
            }
        };

        content
            .map(|text| text.trim().to_owned())
            .filter(|text| !text.is_empty())
            .ok_or(GenerationError::EmptyResponse)
    }
}

#[async_trait]
impl QuizSource for QuizGenerator {
    async fn generate_quiz(&self, notes: &str) -> Result<Vec<Question>, GenerationError> {
        let config = self.config.as_ref().ok_or(GenerationError::Disabled)?;
        tracing::debug!(
            provider = %config.provider,
            model = %config.model,
            notes_len = notes.len(),
            "requesting quiz"
        );
        let text = self.complete(config, notes).await?;
        let questions = parse_quiz_payload(&text)?;
        tracing::debug!(questions = questions.len(), "quiz parsed");
        Ok(questions)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}
