//! Markdown rendering facade.
//!
//! Renders markdown through a remote API (`POST /markdown`, GitHub compatible).
//! Rendered HTML is cached by fingerprint of text, mode and context.

use serde::Serialize;
use serde_json::json;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use crate::cache::{Fingerprint, TtlCache};
use crate::error::ServiceError;
use crate::http::{HttpClient, RequestSpec};
use crate::observability::metrics;
use crate::registry::ServiceRegistry;
use crate::services::ServiceClient;

/// Service key of the markdown renderer.
pub const MARKDOWN_RENDERER: &str = "markdown-renderer";

/// Rendering dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// GitHub Flavored Markdown; `context` resolves issue and user references.
    #[default]
    Gfm,
    /// Plain markdown, as for README files.
    Markdown,
}

impl RenderMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderMode::Gfm => "gfm",
            RenderMode::Markdown => "markdown",
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RenderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gfm" => Ok(RenderMode::Gfm),
            "markdown" => Ok(RenderMode::Markdown),
            other => Err(format!("unknown render mode '{other}' (expected gfm or markdown)")),
        }
    }
}

/// Output of [`MarkdownRenderer::render_or_fallback`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub html: String,
    /// True when `html` is the local plain-text fallback.
    pub degraded: bool,
    /// User-facing explanation when degraded.
    pub notice: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    client: ServiceClient,
    cache: TtlCache<String>,
}

impl MarkdownRenderer {
    /// Must be called inside a Tokio runtime.
    pub fn new(registry: &ServiceRegistry, http: HttpClient) -> Self {
        let config = registry.config().service(MARKDOWN_RENDERER);
        Self {
            client: ServiceClient::new(MARKDOWN_RENDERER, registry, http),
            cache: TtlCache::new(MARKDOWN_RENDERER, &config.cache),
        }
    }

    pub fn client(&self) -> &ServiceClient {
        &self.client
    }

    /// Render GitHub Flavored Markdown without a repository context.
    pub async fn render(&self, text: &str) -> Result<String, ServiceError> {
        self.render_with(text, RenderMode::Gfm, None).await
    }

    pub async fn render_with(
        &self,
        text: &str,
        mode: RenderMode,
        context: Option<&str>,
    ) -> Result<String, ServiceError> {
        let key = Fingerprint::new(MARKDOWN_RENDERER)
            .part(text)
            .part(mode.as_str())
            .optional(context)
            .finish();

        if let Some(html) = self.cache.get(&key) {
            tracing::debug!(service = MARKDOWN_RENDERER, "Serving rendered markdown from cache");
            metrics::record_request(MARKDOWN_RENDERER, "cache_hit", Instant::now());
            return Ok(html);
        }

        let mut body = json!({ "text": text, "mode": mode.as_str() });
        if let Some(context) = context {
            body["context"] = json!(context);
        }

        let response = self
            .client
            .execute(RequestSpec::post_json("/markdown", body))
            .await?;
        let html = response
            .text()
            .map_err(|e| ServiceError::InvalidResponse {
                service: MARKDOWN_RENDERER.to_string(),
                message: format!("rendered HTML is not UTF-8: {e}"),
            })?;

        self.cache.insert(key, html.clone());
        Ok(html)
    }

    /// Render, or fall back to the escaped source text if the service fails.
    pub async fn render_or_fallback(&self, text: &str) -> Rendered {
        match self.render(text).await {
            Ok(html) => Rendered {
                html,
                degraded: false,
                notice: None,
            },
            Err(e) => {
                tracing::warn!(service = MARKDOWN_RENDERER, error = %e, "Render failed, showing fallback text");
                Rendered {
                    html: fallback_html(text),
                    degraded: true,
                    notice: Some(e.user_message()),
                }
            }
        }
    }

    /// Drop every cached rendering.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

/// Plain-text rendering used when the remote renderer is unavailable.
pub fn fallback_html(text: &str) -> String {
    format!("<pre>{}</pre>", escape_html(text))
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
