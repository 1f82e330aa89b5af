//! Placement Query Engine
//!
//! extract entities -> fuzzy match company and department -> annotate the
//! question -> generate SQL -> execute -> format.
//!
//! Error policy per stage:
//! - extraction failures degrade to "no entities"
//! - generation failures are returned to the caller
//! - execution failures degrade to an empty result ("No placement data found.")

use crate::answer_formatter::format_answer;
use crate::entity_extractor::EntityExtractor;
use crate::entity_index::EntityLookups;
use crate::error::{AssistantError, Result};
use crate::fuzzy_matcher::FuzzyMatcher;
use crate::llm::CompletionService;
use crate::sql_engine::{SqlExecutor, TabularResult};
use crate::sql_generator::SqlGenerator;
use crate::store::PlacementStore;
use std::sync::Arc;
use tracing::{debug, info};

/// Entities resolved to canonical store values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchedEntities {
    pub company: Option<String>,
    pub department: Option<String>,
}

impl MatchedEntities {
    /// Append the canonical names so the SQL generator filters on real values.
    pub fn annotate(&self, question: &str) -> String {
        let mut rewritten = question.to_string();
        if let Some(company) = &self.company {
            rewritten.push_str(&format!(" (company: {})", company));
        }
        if let Some(department) = &self.department {
            rewritten.push_str(&format!(" (department: {})", department));
        }
        rewritten
    }
}

pub struct PlacementEngine {
    lookups: Arc<EntityLookups>,
    matcher: FuzzyMatcher,
    extractor: EntityExtractor,
    generator: SqlGenerator,
    executor: SqlExecutor,
}

impl PlacementEngine {
    pub fn new(
        llm: Arc<dyn CompletionService>,
        lookups: Arc<EntityLookups>,
        matcher: FuzzyMatcher,
        store: PlacementStore,
    ) -> Self {
        Self {
            lookups,
            matcher,
            extractor: EntityExtractor::new(Arc::clone(&llm)),
            generator: SqlGenerator::new(llm),
            executor: SqlExecutor::new(store),
        }
    }

    /// Build the lookups from `store` and wire up the engine.
    pub fn from_store(llm: Arc<dyn CompletionService>, matcher: FuzzyMatcher, store: PlacementStore) -> Result<Self> {
        let lookups = Arc::new(EntityLookups::build(&store)?);
        Ok(Self::new(llm, lookups, matcher, store))
    }

    pub fn lookups(&self) -> &EntityLookups {
        &self.lookups
    }

    pub async fn match_entities(&self, question: &str) -> MatchedEntities {
        let extracted = self.extractor.extract(question).await;

        let matched = MatchedEntities {
            company: self
                .matcher
                .match_entity(extracted.company.as_deref(), &self.lookups.companies)
                .map(str::to_string),
            department: self
                .matcher
                .match_entity(extracted.department.as_deref(), &self.lookups.departments)
                .map(str::to_string),
        };

        debug!("Matched entities: {:?} (extracted {:?})", matched, extracted);
        matched
    }

    /// Answer a placement question.
    ///
    /// Returns `Err` only when SQL generation fails.
    pub async fn handle_placement_query(&self, question: &str) -> Result<String> {
        info!("Placement query: {}", question);

        let matched = self.match_entities(question).await;
        let rewritten = matched.annotate(question);

        let sql = self.generator.generate(&rewritten).await?;
        let result = self.execute(sql.as_str()).await?;

        Ok(format_answer(
            &result,
            matched.company.as_deref(),
            matched.department.as_deref(),
        ))
    }

    async fn execute(&self, sql: &str) -> Result<TabularResult> {
        let executor = self.executor.clone();
        let sql = sql.to_string();
        tokio::task::spawn_blocking(move || executor.execute(&sql))
            .await
            .map_err(|e| AssistantError::Store(format!("Query task failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity_index::EntityLookup;
    use crate::llm::ScriptedCompletion;
    use crate::store::StudentPlacementRecord;
    use tempfile::TempDir;

    fn store_with(temp_dir: &TempDir, records: &[StudentPlacementRecord]) -> PlacementStore {
        let store = PlacementStore::new(temp_dir.path().join("students.db"));
        store.create(records).unwrap();
        store
    }

    #[test]
    fn test_annotate() {
        let matched = MatchedEntities {
            company: Some("Google".to_string()),
            department: Some("CSE".to_string()),
        };
        assert_eq!(
            matched.annotate("How many?"),
            "How many? (company: Google) (department: CSE)"
        );
        assert_eq!(MatchedEntities::default().annotate("How many?"), "How many?");
    }

    #[tokio::test]
    async fn test_department_count() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_with(
            &temp_dir,
            &[
                StudentPlacementRecord::placed("ECE", "Infosys", "Engineer", 4.5),
                StudentPlacementRecord::placed("ECE", "Wipro", "Engineer", 3.5),
                StudentPlacementRecord::placed("CSE", "Google", "SDE", 32.0),
            ],
        );
        let llm = Arc::new(
            ScriptedCompletion::new()
                .reply(r#"{"company": null, "department": "ece"}"#)
                .reply("SELECT COUNT(*) FROM students WHERE LOWER(Department) LIKE '%ece%' AND Placed = 'Yes'"),
        );

        let engine = PlacementEngine::from_store(llm.clone(), FuzzyMatcher::default(), store).unwrap();
        let answer = engine.handle_placement_query("How many ECE students were placed?").await.unwrap();

        assert_eq!(answer, "2 students were placed from ECE.");
        let requests = llm.requests();
        assert_eq!(
            requests[1][1].content,
            "How many ECE students were placed? (department: ECE)"
        );
    }

    #[tokio::test]
    async fn test_generation_failure_is_returned() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_with(&temp_dir, &[]);
        let llm = Arc::new(ScriptedCompletion::new().fail("down").fail("down"));

        let engine = PlacementEngine::from_store(llm, FuzzyMatcher::default(), store).unwrap();
        let err = engine.handle_placement_query("How many placed?").await.unwrap_err();
        assert!(matches!(err, AssistantError::Llm(_)));
    }

    #[tokio::test]
    async fn test_broken_sql_reads_as_no_data() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_with(&temp_dir, &[StudentPlacementRecord::placed("CSE", "Google", "SDE", 32.0)]);
        let llm = Arc::new(
            ScriptedCompletion::new()
                .reply("not json")
                .reply("SELECT Salary FROM students"),
        );

        let engine = PlacementEngine::from_store(llm, FuzzyMatcher::default(), store).unwrap();
        let answer = engine.handle_placement_query("What is the package?").await.unwrap();
        assert_eq!(answer, "No placement data found.");
    }

    #[tokio::test]
    async fn test_unmatched_company_is_dropped() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_with(&temp_dir, &[StudentPlacementRecord::placed("CSE", "Google", "SDE", 32.0)]);
        let lookups = Arc::new(EntityLookups {
            companies: EntityLookup::from_names(["Google"]),
            departments: EntityLookup::from_names(["CSE"]),
        });
        let llm = Arc::new(
            ScriptedCompletion::new()
                .reply(r#"{"company": "Microsoft", "department": null}"#)
                .reply("SELECT MAX(CTC_LPA) FROM students"),
        );

        let engine = PlacementEngine::new(llm.clone(), lookups, FuzzyMatcher::default(), store);
        let answer = engine
            .handle_placement_query("Highest package at Microsoft?")
            .await
            .unwrap();

        assert_eq!(answer, "The CTC is 32.0 LPA.");
        assert_eq!(llm.requests()[1][1].content, "Highest package at Microsoft?");
    }
}
