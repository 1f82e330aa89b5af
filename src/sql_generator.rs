//! SQL Generator
//!
//! Translates a (possibly entity-annotated) question into one SQLite
//! statement. The statement is trusted as returned: it is neither parsed nor
//! checked to be a SELECT. The executor's read-only connection is the only
//! guard against writes.

use crate::error::Result;
use crate::llm::{strip_code_fence, ChatMessage, CompletionService};
use std::fmt;
use std::sync::Arc;
use tracing::info;

pub const SQL_SYSTEM_PROMPT: &str = r#"
You generate SQLite queries only.

Table: students
Columns: Department, Placed, Company, Designation, CTC_LPA

Rules:
- Use LOWER(column) LIKE '%value%' for filtering
- Use COUNT(*) when counting students
- When asking about CTC or package, use CTC_LPA column
- For highest package use MAX(CTC_LPA)
- For average package use AVG(CTC_LPA)
- Always include Placed='Yes' when counting placements
- Return ONLY SQL query
"#;

/// A single SQL statement, always terminated by ';'
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSql(String);

impl GeneratedSql {
    /// Trim the completion text and make sure it ends with a semicolon.
    pub fn from_completion(text: &str) -> Self {
        let mut sql = strip_code_fence(text).to_string();
        if !sql.ends_with(';') {
            sql.push(';');
        }
        Self(sql)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GeneratedSql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub struct SqlGenerator {
    llm: Arc<dyn CompletionService>,
}

impl SqlGenerator {
    pub fn new(llm: Arc<dyn CompletionService>) -> Self {
        Self { llm }
    }

    /// Generate SQL for `question`. Completion failures are returned, not swallowed.
    pub async fn generate(&self, question: &str) -> Result<GeneratedSql> {
        let messages = [ChatMessage::system(SQL_SYSTEM_PROMPT), ChatMessage::user(question)];
        let response = self.llm.complete(&messages).await?;

        let sql = GeneratedSql::from_completion(&response);
        info!("Generated SQL: {}", sql);
        Ok(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssistantError;
    use crate::llm::ScriptedCompletion;

    #[test]
    fn test_semicolon_is_appended_once() {
        assert_eq!(
            GeneratedSql::from_completion("  SELECT COUNT(*) FROM students  \n").as_str(),
            "SELECT COUNT(*) FROM students;"
        );
        assert_eq!(GeneratedSql::from_completion("SELECT 1;").as_str(), "SELECT 1;");
        assert_eq!(
            GeneratedSql::from_completion("```sql\nSELECT MAX(CTC_LPA) FROM students\n```").as_str(),
            "SELECT MAX(CTC_LPA) FROM students;"
        );
    }

    #[tokio::test]
    async fn test_sends_schema_prompt_and_question() {
        let llm = Arc::new(
            ScriptedCompletion::new().reply("SELECT AVG(CTC_LPA) FROM students WHERE LOWER(Company) LIKE '%infosys%'"),
        );
        let generator = SqlGenerator::new(llm.clone());

        let sql = generator
            .generate("What is the average package at Infosys? (company: Infosys)")
            .await
            .unwrap();
        assert!(sql.as_str().ends_with("'%infosys%';"));

        let requests = llm.requests();
        assert_eq!(requests.len(), 1);
        let messages = &requests[0];
        assert_eq!(messages[0].role, "system");
        assert!(messages[0]
            .content
            .contains("Columns: Department, Placed, Company, Designation, CTC_LPA"));
        assert_eq!(
            messages[1],
            ChatMessage::user("What is the average package at Infosys? (company: Infosys)")
        );
    }

    #[tokio::test]
    async fn test_completion_failure_propagates() {
        let generator = SqlGenerator::new(Arc::new(ScriptedCompletion::new().fail("timeout")));
        let err = generator.generate("How many placed?").await.unwrap_err();
        assert!(matches!(err, AssistantError::Llm(_)));
    }
}
