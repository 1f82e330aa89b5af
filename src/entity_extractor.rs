//! Entity Extractor
//!
//! Asks the completion service for the company and department mentioned in a
//! question. Extraction is best-effort: any failure means "no entities".

use crate::llm::{strip_code_fence, ChatMessage, CompletionService};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

pub const ENTITY_PROMPT: &str = r#"
Extract ONLY company and department from the query.
Return JSON:
{
  "company": "...",
  "department": "..."
}
If not present, return null.
"#;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedEntities {
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
}

impl ExtractedEntities {
    pub fn none() -> Self {
        Self::default()
    }
}

pub struct EntityExtractor {
    llm: Arc<dyn CompletionService>,
}

impl EntityExtractor {
    pub fn new(llm: Arc<dyn CompletionService>) -> Self {
        Self { llm }
    }

    /// Extract entities; transport and parse failures yield empty entities.
    pub async fn extract(&self, question: &str) -> ExtractedEntities {
        match self.try_extract(question).await {
            Ok(entities) => {
                debug!("Extracted entities: {:?}", entities);
                entities
            }
            Err(e) => {
                warn!("Entity extraction failed, continuing without entities: {}", e);
                ExtractedEntities::none()
            }
        }
    }

    async fn try_extract(&self, question: &str) -> Result<ExtractedEntities> {
        let prompt = format!("{}\nQuery: {}", ENTITY_PROMPT, question);
        let response = self.llm.complete(&[ChatMessage::user(prompt)]).await?;
        let entities: ExtractedEntities = serde_json::from_str(strip_code_fence(&response))?;
        Ok(entities)
    }
}
