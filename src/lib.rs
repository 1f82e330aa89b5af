pub mod answer_formatter;
pub mod assistant;
pub mod config;
pub mod entity_extractor;
pub mod entity_index;
pub mod error;
pub mod fuzzy_matcher;
pub mod http;
pub mod ingestion;
pub mod knowledge;
pub mod llm;
pub mod placement_engine;
pub mod router;
pub mod sql_engine;
pub mod sql_generator;
pub mod store;

pub use assistant::{AskRequest, AskResponse, CollegeAssistant};
pub use config::AppConfig;
pub use error::{AssistantError, Result};
pub use placement_engine::PlacementEngine;
