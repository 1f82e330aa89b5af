//! College Assistant
//!
//! Front door for a question: route it, run the chosen pipeline, and turn
//! pipeline failures into a user-facing message.

use crate::config::AppConfig;
use crate::error::Result;
use crate::fuzzy_matcher::FuzzyMatcher;
use crate::ingestion::ensure_store;
use crate::knowledge::{KnowledgeBase, KnowledgePipeline, TavilySearch, WebSearch};
use crate::llm::{CompletionService, LlmClient};
use crate::placement_engine::PlacementEngine;
use crate::router::{route, PipelineChoice};
use crate::store::PlacementStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, info_span, Instrument};

pub const FALLBACK_ANSWER: &str = "Sorry, I couldn't answer that question right now.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
}

pub struct CollegeAssistant {
    placement: PlacementEngine,
    knowledge: Arc<dyn KnowledgePipeline>,
}

impl CollegeAssistant {
    pub fn new(placement: PlacementEngine, knowledge: Arc<dyn KnowledgePipeline>) -> Self {
        Self { placement, knowledge }
    }

    /// Build everything from configuration: make sure the placement store
    /// exists, build the entity lookups once, and load the knowledge text.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let store = PlacementStore::new(&config.db_path);
        ensure_store(&config.csv_path, &store, config.csv_header_row)?;

        let llm: Arc<dyn CompletionService> = Arc::new(LlmClient::from_config(config)?);
        let matcher = FuzzyMatcher::new(config.fuzzy_threshold).with_metric(config.fuzzy_metric);
        let placement = PlacementEngine::from_store(Arc::clone(&llm), matcher, store)?;

        let web: Option<Arc<dyn WebSearch>> = match &config.tavily_api_key {
            Some(key) => Some(Arc::new(TavilySearch::new(key.clone(), config.llm_timeout)?)),
            None => {
                info!("TAVILY_API_KEY not set, web search fallback disabled");
                None
            }
        };
        let knowledge = Arc::new(KnowledgeBase::load(&config.knowledge_path, llm, web)?);

        Ok(Self::new(placement, knowledge))
    }

    pub fn placement(&self) -> &PlacementEngine {
        &self.placement
    }

    /// Answer any question. Never fails; pipeline errors become [`FALLBACK_ANSWER`].
    pub async fn ask(&self, question: &str) -> String {
        let request_id = uuid::Uuid::new_v4();
        let choice = route(question);
        let span = info_span!("ask", %request_id, ?choice);

        async {
            info!("Question: {}", question);
            let result = match choice {
                PipelineChoice::Placement => self.placement.handle_placement_query(question).await,
                PipelineChoice::GenericRag => self.knowledge.answer(question).await,
            };

            match result {
                Ok(answer) => answer,
                Err(e) => {
                    error!("Failed to answer question: {}", e);
                    FALLBACK_ANSWER.to_string()
                }
            }
        }
        .instrument(span)
        .await
    }

    pub async fn handle(&self, request: AskRequest) -> AskResponse {
        AskResponse {
            answer: self.ask(&request.question).await,
        }
    }
}
