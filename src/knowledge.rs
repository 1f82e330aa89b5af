//! General Knowledge Pipeline
//!
//! Answers non-placement questions from the college information text:
//! overlapping character chunks, lexical top-k retrieval, an LLM answer
//! constrained to the retrieved context, and a web search when the model
//! reports the answer is not in the text.

use crate::error::{AssistantError, Result};
use crate::llm::{ChatMessage, CompletionService};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const CHUNK_SIZE: usize = 500;
pub const CHUNK_OVERLAP: usize = 100;
pub const TOP_K: usize = 3;

pub const WEB_PREFIX: &str = "(From web search)\n";
pub const WEB_NOT_FOUND: &str = "Sorry, I couldn't find any information on the web.";

const RAG_SYSTEM_PROMPT: &str = "You are a helpful assistant for a college website. \
The provided context may contain structured data like tables or lists. \
Extract **only factual information** strictly from the context. \
If the answer is not found, respond with: 'Not found in the provided data.'";

const TAVILY_URL: &str = "https://api.tavily.com/search";

/// Anything that can answer a general question about the college
#[async_trait]
pub trait KnowledgePipeline: Send + Sync {
    async fn answer(&self, question: &str) -> Result<String>;
}

/// Web search used when the knowledge text has no answer
#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Content of the top result, if any
    async fn search(&self, query: &str) -> Result<Option<String>>;
}

pub struct TavilySearch {
    api_key: String,
    http: reqwest::Client,
}

impl TavilySearch {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AssistantError::Knowledge(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { api_key, http })
    }
}

#[async_trait]
impl WebSearch for TavilySearch {
    async fn search(&self, query: &str) -> Result<Option<String>> {
        let body = serde_json::json!({
            "api_key": self.api_key,
            "query": query,
            "max_results": 1
        });

        let response: serde_json::Value = self
            .http
            .post(TAVILY_URL)
            .json(&body)
            .send()
            .await
            .map_err(|e| AssistantError::Knowledge(format!("Web search failed: {}", e)))?
            .json()
            .await
            .map_err(|e| AssistantError::Knowledge(format!("Failed to parse web search response: {}", e)))?;

        Ok(response["results"][0]["content"].as_str().map(|s| s.to_string()))
    }
}

/// Split `text` into windows of `size` characters, each starting
/// `size - overlap` characters after the previous one.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let step = size.saturating_sub(overlap).max(1);

    (0..chars.len())
        .step_by(step)
        .map(|start| chars[start..(start + size).min(chars.len())].iter().collect())
        .collect()
}

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
        .map(|w| w.to_lowercase())
        .collect()
}

pub struct KnowledgeBase {
    chunks: Vec<String>,
    llm: Arc<dyn CompletionService>,
    web: Option<Arc<dyn WebSearch>>,
}

impl KnowledgeBase {
    pub fn new(text: &str, llm: Arc<dyn CompletionService>, web: Option<Arc<dyn WebSearch>>) -> Self {
        let chunks = chunk_text(text, CHUNK_SIZE, CHUNK_OVERLAP);
        info!("Knowledge base ready with {} chunks", chunks.len());
        Self { chunks, llm, web }
    }

    pub fn load(path: &Path, llm: Arc<dyn CompletionService>, web: Option<Arc<dyn WebSearch>>) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AssistantError::Knowledge(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Ok(Self::new(&text, llm, web))
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Top `k` chunks by number of shared query terms; earlier chunks win ties.
    pub fn retrieve(&self, question: &str, k: usize) -> Vec<&str> {
        let query_terms = terms(question);
        let mut scored: Vec<(usize, usize)> = self
            .chunks
            .iter()
            .enumerate()
            .map(|(idx, chunk)| (idx, terms(chunk).intersection(&query_terms).count()))
            .collect();
        scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        scored
            .into_iter()
            .take(k)
            .map(|(idx, _)| self.chunks[idx].as_str())
            .collect()
    }

    fn build_prompt(context: &[&str], question: &str) -> String {
        let mut prompt = String::from(
            "The following is a structured list of designations and names. Use it to answer questions.\n\n",
        );
        for (i, chunk) in context.iter().enumerate() {
            prompt.push_str(&format!("Chunk {}:\n{}\n\n", i + 1, chunk));
        }
        prompt.push_str(&format!("Question: {}\nAnswer:", question));
        prompt
    }

    async fn web_fallback(&self, web: &dyn WebSearch, question: &str) -> String {
        match web.search(question).await {
            Ok(Some(content)) => format!("{}{}", WEB_PREFIX, content),
            Ok(None) => format!("{}{}", WEB_PREFIX, WEB_NOT_FOUND),
            Err(e) => {
                warn!("Web search failed: {}", e);
                format!("{}{}", WEB_PREFIX, WEB_NOT_FOUND)
            }
        }
    }
}

/// The model's way of saying the context has no answer
pub fn is_not_found(answer: &str) -> bool {
    let lower = answer.to_lowercase();
    lower.starts_with("not found") || lower.contains("could not find")
}

#[async_trait]
impl KnowledgePipeline for KnowledgeBase {
    async fn answer(&self, question: &str) -> Result<String> {
        let context = self.retrieve(question, TOP_K);
        debug!("Retrieved {} chunk(s) for question", context.len());

        let messages = [
            ChatMessage::system(RAG_SYSTEM_PROMPT),
            ChatMessage::user(Self::build_prompt(&context, question)),
        ];
        let answer = self.llm.complete(&messages).await?.trim().to_string();

        if is_not_found(&answer) {
            if let Some(web) = &self.web {
                info!("Answer not in knowledge text, falling back to web search");
                return Ok(self.web_fallback(web.as_ref(), question).await);
            }
        }

        Ok(answer)
    }
}
