//! Runtime configuration
//!
//! Everything is read from the process environment (after `.env` has been
//! loaded by the binary). Paths can be overridden from the command line.

use crate::error::{AssistantError, Result};
use crate::fuzzy_matcher::SimilarityMetric;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Completion service API key. Calls fail (softly or hard, per component) when absent.
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    /// Per-request timeout for completion calls
    pub llm_timeout: Duration,

    pub db_path: PathBuf,
    pub csv_path: PathBuf,
    /// Zero-based index of the header row in the placement CSV
    pub csv_header_row: usize,

    pub fuzzy_threshold: f64,
    pub fuzzy_metric: SimilarityMetric,

    pub knowledge_path: PathBuf,
    pub tavily_api_key: Option<String>,

    pub server_addr: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            llm_timeout: Duration::from_secs(30),
            db_path: PathBuf::from("data/students.db"),
            csv_path: PathBuf::from("data/placements.csv"),
            csv_header_row: 3,
            fuzzy_threshold: 0.6,
            fuzzy_metric: SimilarityMetric::SequenceRatio,
            knowledge_path: PathBuf::from("data/college_info.txt"),
            tavily_api_key: None,
            server_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

impl AppConfig {
    /// Build the configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] but reads values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let llm_timeout = match get("LLM_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(parse_value::<u64>("LLM_TIMEOUT_SECS", &v)?),
            None => defaults.llm_timeout,
        };

        let csv_header_row = match get("PLACEMENT_CSV_HEADER_ROW") {
            Some(v) => parse_value::<usize>("PLACEMENT_CSV_HEADER_ROW", &v)?,
            None => defaults.csv_header_row,
        };

        let fuzzy_threshold = match get("FUZZY_THRESHOLD") {
            Some(v) => {
                let threshold = parse_value::<f64>("FUZZY_THRESHOLD", &v)?;
                if !(0.0..=1.0).contains(&threshold) {
                    return Err(AssistantError::Config(format!(
                        "FUZZY_THRESHOLD must be within [0, 1], got {}",
                        threshold
                    )));
                }
                threshold
            }
            None => defaults.fuzzy_threshold,
        };

        let fuzzy_metric = match get("FUZZY_METRIC") {
            Some(v) => v.parse::<SimilarityMetric>()?,
            None => defaults.fuzzy_metric,
        };

        Ok(Self {
            api_key: get("GROQ_API_KEY"),
            api_url: get("LLM_API_URL").unwrap_or(defaults.api_url),
            model: get("LLM_MODEL").unwrap_or(defaults.model),
            llm_timeout,
            db_path: get("PLACEMENT_DB_PATH").map(PathBuf::from).unwrap_or(defaults.db_path),
            csv_path: get("PLACEMENT_CSV_PATH").map(PathBuf::from).unwrap_or(defaults.csv_path),
            csv_header_row,
            fuzzy_threshold,
            fuzzy_metric,
            knowledge_path: get("KNOWLEDGE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.knowledge_path),
            tavily_api_key: get("TAVILY_API_KEY"),
            server_addr: get("SERVER_ADDR").unwrap_or(defaults.server_addr),
        })
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| AssistantError::Config(format!("Invalid value for {}: '{}' ({})", key, raw, e)))
}
