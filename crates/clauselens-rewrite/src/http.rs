//! HTTP rewriter: posts `{prompt, model}` to a completion endpoint.
//!
//! Accepts the common response shapes (`output_text`, `text`, `response`,
//! `content`, or OpenAI-style `choices`) and keeps the first non-empty line.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use clauselens_core::rewrite::{BulletRewriter, RewriteRequest};

const DISABLED_PROVIDERS: &[&str] = &["", "none", "off", "disabled"];
const DEFAULT_TIMEOUT_S: f64 = 20.0;

#[derive(Error, Debug)]
pub enum RewriteError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("unsupported rewrite provider: {0:?}")]
    UnsupportedProvider(String),
    #[error("rewrite provider \"http\" needs CLAUSELENS_REWRITE_URL")]
    MissingUrl,
    #[error("invalid rewrite timeout: {0:?}")]
    InvalidTimeout(String),
}

/// Rewrite settings, normally read from `CLAUSELENS_REWRITE_*` variables.
#[derive(Debug, Clone, PartialEq)]
pub struct RewriteConfig {
    pub provider: String,
    pub url: Option<String>,
    pub model: Option<String>,
    pub timeout: Duration,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            provider: "none".into(),
            url: None,
            model: None,
            timeout: Duration::from_secs_f64(DEFAULT_TIMEOUT_S),
        }
    }
}

impl RewriteConfig {
    pub fn from_env() -> Result<Self, RewriteError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, RewriteError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let timeout = match non_empty("CLAUSELENS_REWRITE_TIMEOUT_S") {
            Some(raw) => {
                let secs: f64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| RewriteError::InvalidTimeout(raw.clone()))?;
                if !secs.is_finite() || secs <= 0.0 {
                    return Err(RewriteError::InvalidTimeout(raw));
                }
                Duration::from_secs_f64(secs)
            }
            None => Duration::from_secs_f64(DEFAULT_TIMEOUT_S),
        };
        Ok(Self {
            provider: non_empty("CLAUSELENS_REWRITE_PROVIDER")
                .map(|p| p.trim().to_lowercase())
                .unwrap_or_else(|| "none".into()),
            url: non_empty("CLAUSELENS_REWRITE_URL"),
            model: non_empty("CLAUSELENS_REWRITE_MODEL"),
            timeout,
        })
    }

    pub fn is_enabled(&self) -> bool {
        !DISABLED_PROVIDERS.contains(&self.provider.as_str())
    }
}

#[derive(Serialize)]
struct RewritePayload<'a> {
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

pub struct HttpRewriter {
    client: reqwest::Client,
    url: String,
    model: Option<String>,
}

impl HttpRewriter {
    pub fn new(url: String, model: Option<String>, timeout: Duration) -> Result<Self, RewriteError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url, model })
    }

    /// Rewriter for `config`, or `None` when rewriting is disabled.
    pub fn from_config(config: &RewriteConfig) -> Result<Option<Self>, RewriteError> {
        if !config.is_enabled() {
            return Ok(None);
        }
        if config.provider != "http" {
            return Err(RewriteError::UnsupportedProvider(config.provider.clone()));
        }
        let url = config.url.clone().ok_or(RewriteError::MissingUrl)?;
        info!(url = %url, model = ?config.model, "rewrite provider enabled");
        Ok(Some(Self::new(url, config.model.clone(), config.timeout)?))
    }

    fn prompt(request: &RewriteRequest) -> String {
        format!(
            "You are rewriting contract clauses into ONE short bullet.\n\
             Rules (STRICT):\n\
             - Use ONLY the provided clause text.\n\
             - Do NOT add facts, do NOT infer obligations.\n\
             - Do NOT mention risk, confidence, or analysis.\n\
             - Output ONE line only (no headings, no extra bullets).\n\n\
             Heading: {}\nQuestion: {}\nClause: {}\n\n\
             Return one short bullet sentence.",
            request.heading, request.question, request.clause
        )
    }

    /// Post the prompt and return the first non-empty line of the reply.
    pub async fn request(&self, request: &RewriteRequest) -> Result<Option<String>, RewriteError> {
        let payload = RewritePayload {
            prompt: Self::prompt(request),
            model: self.model.as_deref(),
        };

        debug!(url = %self.url, heading = %request.heading, "requesting rewrite");
        let resp = self.client.post(&self.url).json(&payload).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RewriteError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.text().await?;
        let data = serde_json::from_str::<Value>(&body).unwrap_or(Value::String(body));
        Ok(extract_text_from_response(&data).and_then(|text| {
            text.lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .map(str::to_string)
        }))
    }
}

#[async_trait]
impl BulletRewriter for HttpRewriter {
    fn name(&self) -> &str {
        "http"
    }

    async fn rewrite(&self, request: &RewriteRequest) -> Option<String> {
        match self.request(request).await {
            Ok(candidate) => candidate,
            Err(e) => {
                warn!(error = %e, "rewrite request failed, keeping clause");
                None
            }
        }
    }
}

/// Pull the generated text out of a provider response.
pub fn extract_text_from_response(data: &Value) -> Option<String> {
    let non_empty = |v: &Value| v.as_str().filter(|s| !s.trim().is_empty()).map(str::to_string);

    if let Some(s) = non_empty(data) {
        return Some(s);
    }
    let obj = data.as_object()?;
    for key in ["output_text", "text", "response", "content"] {
        if let Some(s) = obj.get(key).and_then(non_empty) {
            return Some(s);
        }
    }

    let first = obj.get("choices")?.as_array()?.first()?;
    first
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(non_empty)
        .or_else(|| first.get("text").and_then(non_empty))
}
