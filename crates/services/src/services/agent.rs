//! Browser automation agent.
//!
//! The agent is an opaque, possibly slow, possibly failing collaborator: given
//! a task and a starting URL it produces text or an [`AgentError`]. The
//! production implementation loads the starting page, reduces it to readable
//! text and asks a hosted OpenAI-compatible chat model to carry out the task
//! against that snapshot.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::OnceCell;

use super::{
    config::AgentConfig,
    task_store::{Task, TaskContext},
};

/// Page text beyond this many characters is cut before it reaches the model.
const MAX_PAGE_CHARS: usize = 12_000;
const USER_AGENT: &str = concat!("browser-ai-backend/", env!("CARGO_PKG_VERSION"));

const SYSTEM_PROMPT: &str = "You are a browser automation agent. You receive a task, \
the URL the user is looking at, and a text snapshot of that page. Carry out the task \
using only the page content and report the outcome in plain text. If the page does \
not contain what the task needs, say so explicitly.";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AgentError {
    #[error("Agent not configured: {0}")]
    NotConfigured(String),
    #[error("Failed to load {url}: {message}")]
    Navigation { url: String, message: String },
    #[error("LLM request failed: {0}")]
    RequestFailed(String),
    #[error("LLM API error ({status}): {message}")]
    ApiError { status: u16, message: String },
    #[error("Failed to parse LLM response: {0}")]
    ParseError(String),
    #[error("LLM returned an empty response")]
    EmptyResponse,
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRequest {
    pub task: String,
    pub initial_url: String,
    pub context: TaskContext,
}

impl From<&Task> for AgentRequest {
    fn from(task: &Task) -> Self {
        Self {
            task: task.task.clone(),
            initial_url: task.context.url.clone(),
            context: task.context.clone(),
        }
    }
}

#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &'static str;

    /// Run one task to completion. There is no timeout.
    async fn run(&self, request: &AgentRequest) -> Result<String, AgentError>;
}

pub type SharedAgent = Arc<dyn Agent>;

type AgentFactory = Box<dyn Fn() -> Result<SharedAgent, AgentError> + Send + Sync>;

/// Process-wide agent built on first use.
///
/// A failed construction is not cached; the next call tries again.
pub struct LazyAgent {
    cell: OnceCell<SharedAgent>,
    factory: AgentFactory,
}

impl LazyAgent {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<SharedAgent, AgentError> + Send + Sync + 'static,
    {
        Self {
            cell: OnceCell::new(),
            factory: Box::new(factory),
        }
    }

    pub async fn get(&self) -> Result<SharedAgent, AgentError> {
        self.cell
            .get_or_try_init(|| async {
                let agent = (self.factory)()?;
                tracing::info!("Initialized {} agent", agent.name());
                Ok::<_, AgentError>(agent)
            })
            .await
            .cloned()
    }

}

#[async_trait]
impl Agent for LazyAgent {
    fn name(&self) -> &'static str {
        self.cell.get().map(|agent| agent.name()).unwrap_or("lazy")
    }

    async fn run(&self, request: &AgentRequest) -> Result<String, AgentError> {
        self.get().await?.run(request).await
    }
}

#[derive(Debug, Clone, PartialEq)]
struct PageSnapshot {
    title: Option<String>,
    text: String,
}

/// Text under these elements is never shown to the reader.
const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

fn collapse<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn visible_text<'a>(root: ElementRef<'a>) -> impl Iterator<Item = &'a str> {
    root.descendants()
        .filter(|node| {
            !node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|el| HIDDEN_ELEMENTS.contains(&el.name()))
            })
        })
        .filter_map(|node| node.value().as_text().map(|text| &**text))
}

fn snapshot_from_html(html: &str) -> PageSnapshot {
    let document = Html::parse_document(html);

    let title = Selector::parse("title")
        .ok()
        .and_then(|sel| document.select(&sel).next())
        .map(|el| collapse(el.text()))
        .filter(|t| !t.is_empty());

    let body = Selector::parse("body")
        .ok()
        .and_then(|sel| document.select(&sel).next())
        .unwrap_or_else(|| document.root_element());
    let mut text = collapse(visible_text(body));

    if let Some((cut, _)) = text.char_indices().nth(MAX_PAGE_CHARS) {
        text.truncate(cut);
        text.push_str(" [truncated]");
    }

    PageSnapshot { title, text }
}

/// Agent that reads the starting page over HTTP and lets a chat model act on it.
pub struct LlmBrowseAgent {
    client: Client,
    config: AgentConfig,
}

impl LlmBrowseAgent {
    pub fn new(config: AgentConfig) -> Result<Self, AgentError> {
        if config.api_key.trim().is_empty() {
            return Err(AgentError::NotConfigured("missing API key".to_string()));
        }
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AgentError::NotConfigured(e.to_string()))?;
        Ok(Self { client, config })
    }

    async fn load_page(&self, url: &str) -> Result<PageSnapshot, AgentError> {
        let navigation = |message: String| AgentError::Navigation {
            url: url.to_string(),
            message,
        };

        tracing::debug!("[Agent] Loading {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| navigation(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(navigation(format!("HTTP {}", status.as_u16())));
        }

        let html = response.text().await.map_err(|e| navigation(e.to_string()))?;
        Ok(snapshot_from_html(&html))
    }

    fn build_messages(request: &AgentRequest, page: Option<&PageSnapshot>) -> Vec<serde_json::Value> {
        let mut prompt = format!("Task: {}\n", request.task);
        if !request.initial_url.is_empty() {
            prompt.push_str(&format!("Starting URL: {}\n", request.initial_url));
        }
        let title = page
            .and_then(|p| p.title.clone())
            .filter(|_| request.context.title.is_empty())
            .unwrap_or_else(|| request.context.title.clone());
        if !title.is_empty() {
            prompt.push_str(&format!("Page title: {}\n", title));
        }
        match page {
            Some(page) if !page.text.is_empty() => {
                prompt.push_str(&format!("\nPage content:\n{}\n", page.text));
            }
            Some(_) => prompt.push_str("\nThe page has no readable text.\n"),
            None => prompt.push_str("\nNo page was provided.\n"),
        }

        vec![
            serde_json::json!({ "role": "system", "content": SYSTEM_PROMPT }),
            serde_json::json!({ "role": "user", "content": prompt }),
        ]
    }

    fn parse_response(json: &serde_json::Value) -> Result<String, AgentError> {
        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| AgentError::ParseError("missing choices[0].message.content".to_string()))?
            .trim();
        if content.is_empty() {
            return Err(AgentError::EmptyResponse);
        }
        Ok(content.to_string())
    }
}

#[async_trait]
impl Agent for LlmBrowseAgent {
    fn name(&self) -> &'static str {
        "llm-browse"
    }

    async fn run(&self, request: &AgentRequest) -> Result<String, AgentError> {
        let page = if request.initial_url.is_empty() {
            None
        } else {
            Some(self.load_page(&request.initial_url).await?)
        };

        let payload = serde_json::json!({
            "model": self.config.model,
            "messages": Self::build_messages(request, page.as_ref()),
        });

        tracing::debug!(
            "[Agent] Sending task to model={} url={}",
            self.config.model,
            request.initial_url
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AgentError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AgentError::ParseError(e.to_string()))?;

        Self::parse_response(&json)
    }
}
