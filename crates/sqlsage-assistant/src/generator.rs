use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use sqlsage_core::{
    ChatModel, ChatRequest, Message, QuestionSql, SqlGenerator, SqlRunner, SqlSageError,
    TrainingStore,
};

const DEFAULT_N_RESULTS: usize = 10;
const DEFAULT_MAX_PROMPT_CHARS: usize = 56_000;

// ---------------------------------------------------------------------------
// SqlExtractor
// ---------------------------------------------------------------------------

/// Pulls the SQL statement out of a model reply.
pub struct SqlExtractor {
    sql_fence: Regex,
    bare_fence: Regex,
    with_statement: Regex,
    select_statement: Regex,
}

impl SqlExtractor {
    pub fn new() -> Result<Self, SqlSageError> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| SqlSageError::Config(format!("invalid SQL pattern {pattern:?}: {e}")))
        };
        Ok(Self {
            sql_fence: compile(r"(?is)```sql\s*(.*?)```")?,
            bare_fence: compile(r"(?s)```\s*(.*?)```")?,
            with_statement: compile(r"(?s)\bWITH\b\s.*?;")?,
            select_statement: compile(r"(?s)\bSELECT\b.*?;")?,
        })
    }

    /// Extraction order: ```sql fences, bare fences, `WITH ...;`,
    /// `SELECT ...;`, then a reply that is itself a query. Inline
    /// statements must use uppercase keywords so prose like "a query with
    /// the total" is not mistaken for SQL.
    pub fn extract(&self, response: &str) -> Option<String> {
        for fence in [&self.sql_fence, &self.bare_fence] {
            if let Some(sql) = fence
                .captures(response)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim())
                .filter(|s| !s.is_empty())
            {
                return Some(sql.to_string());
            }
        }

        for statement in [&self.with_statement, &self.select_statement] {
            if let Some(m) = statement.find(response) {
                return Some(m.as_str().trim().to_string());
            }
        }

        let trimmed = response.trim();
        let upper = trimmed.to_ascii_uppercase();
        if upper.starts_with("SELECT") || upper.starts_with("WITH") {
            return Some(trimmed.to_string());
        }
        None
    }
}

// ---------------------------------------------------------------------------
// PromptContext
// ---------------------------------------------------------------------------

/// Training data retrieved for one question.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptContext {
    pub examples: Vec<QuestionSql>,
    pub ddl: Vec<String>,
    pub documentation: Vec<String>,
}

// ---------------------------------------------------------------------------
// LlmSqlGenerator
// ---------------------------------------------------------------------------

/// Retrieval-augmented SQL generation with a chat model.
pub struct LlmSqlGenerator {
    model: Arc<dyn ChatModel>,
    store: Arc<dyn TrainingStore>,
    runner: Option<Arc<dyn SqlRunner>>,
    dialect: Option<String>,
    n_results: usize,
    max_prompt_chars: usize,
    allow_llm_to_see_data: bool,
    extractor: SqlExtractor,
}

impl LlmSqlGenerator {
    pub fn new(
        model: Arc<dyn ChatModel>,
        store: Arc<dyn TrainingStore>,
    ) -> Result<Self, SqlSageError> {
        Ok(Self {
            model,
            store,
            runner: None,
            dialect: None,
            n_results: DEFAULT_N_RESULTS,
            max_prompt_chars: DEFAULT_MAX_PROMPT_CHARS,
            allow_llm_to_see_data: false,
            extractor: SqlExtractor::new()?,
        })
    }

    /// Attach a database, used for the dialect name and intermediate SQL.
    pub fn with_runner(mut self, runner: Arc<dyn SqlRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    pub fn with_dialect(mut self, dialect: impl Into<String>) -> Self {
        self.dialect = Some(dialect.into());
        self
    }

    /// Results fetched per training kind.
    pub fn with_n_results(mut self, n: usize) -> Self {
        self.n_results = n;
        self
    }

    pub fn with_max_prompt_chars(mut self, max: usize) -> Self {
        self.max_prompt_chars = max;
        self
    }

    /// Let the model run intermediate queries and see their results.
    pub fn with_allow_llm_to_see_data(mut self, allow: bool) -> Self {
        self.allow_llm_to_see_data = allow;
        self
    }

    pub fn dialect(&self) -> &str {
        match (&self.dialect, &self.runner) {
            (Some(dialect), _) => dialect,
            (None, Some(runner)) => runner.dialect(),
            (None, None) => "SQL",
        }
    }

    pub async fn gather_context(&self, question: &str) -> Result<PromptContext, SqlSageError> {
        let k = self.n_results;
        let examples = self.store.get_similar_question_sql(question, k).await?;
        let ddl = self.store.get_related_ddl(question, k).await?;
        let documentation = self.store.get_related_documentation(question, k).await?;

        Ok(PromptContext {
            examples: examples.iter().filter_map(|d| d.as_question_sql()).collect(),
            ddl: ddl.iter().map(|d| d.as_text()).collect(),
            documentation: documentation.iter().map(|d| d.as_text()).collect(),
        })
    }

    /// Build the chat messages: system prompt with schema and documentation,
    /// prior question/SQL pairs as turns, then the question.
    ///
    /// Context entries that would push the prompt past `max_prompt_chars`
    /// are left out.
    pub fn build_prompt(&self, question: &str, context: &PromptContext) -> Vec<Message> {
        let dialect = self.dialect();
        let mut budget = self.max_prompt_chars.saturating_sub(question.len());

        let mut system = format!(
            "You are a {dialect} expert. Please help to generate a SQL query to answer the \
             question. Your response should ONLY be based on the given context and follow \
             the response guidelines and format instructions."
        );
        let guidelines = response_guidelines(dialect);
        budget = budget.saturating_sub(system.len() + guidelines.len());

        append_section(&mut system, "\n\n===Tables\n", &context.ddl, &mut budget);
        append_section(
            &mut system,
            "\n\n===Additional Context\n",
            &context.documentation,
            &mut budget,
        );
        system.push_str(&guidelines);

        let mut messages = vec![Message::system(system)];
        for example in &context.examples {
            let cost = example.question.len() + example.sql.len();
            if cost > budget {
                continue;
            }
            budget -= cost;
            messages.push(Message::human(&example.question));
            messages.push(Message::ai(&example.sql));
        }
        messages.push(Message::human(question));
        messages
    }

    async fn complete(&self, messages: Vec<Message>) -> Result<String, SqlSageError> {
        let response = self.model.chat(ChatRequest::new(messages)).await?;
        if let Some(usage) = &response.usage {
            tracing::debug!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "sql generation usage"
            );
        }
        Ok(response.message.content().to_string())
    }

    fn extract(&self, response: &str) -> Result<String, SqlSageError> {
        self.extractor.extract(response).ok_or_else(|| {
            SqlSageError::Generation(format!("no SQL found in model response: {response}"))
        })
    }

    /// Run an intermediate query and describe its result for the model.
    async fn intermediate_context(
        &self,
        runner: &Arc<dyn SqlRunner>,
        sql: &str,
    ) -> Result<String, SqlSageError> {
        let result = runner.run_sql(sql).await?;
        Ok(format!(
            "The following is the result of the intermediate SQL query {sql}:\n\n{}",
            result.to_markdown()
        ))
    }
}

fn append_section(target: &mut String, header: &str, entries: &[String], budget: &mut usize) {
    if entries.is_empty() {
        return;
    }
    target.push_str(header);
    for entry in entries {
        let cost = entry.len() + 2;
        if cost > *budget {
            tracing::debug!(chars = entry.len(), "prompt budget exhausted, dropping context");
            continue;
        }
        *budget -= cost;
        target.push_str(entry);
        target.push_str("\n\n");
    }
}

fn response_guidelines(dialect: &str) -> String {
    format!(
        "\n\n===Response Guidelines\n\
         1. If the provided context is sufficient, generate a valid SQL query for the question without any explanation.\n\
         2. If the context is almost sufficient but a specific string value in a column is unknown, generate an intermediate SQL query that lists the distinct values of that column, starting with a comment saying intermediate_sql.\n\
         3. If the provided context is insufficient, explain why the query cannot be generated.\n\
         4. Use the most relevant table(s).\n\
         5. If the question has been asked and answered before, repeat the earlier answer exactly.\n\
         6. Make sure the SQL is {dialect}-compliant, executable and free of syntax errors.\n"
    )
}

#[async_trait]
impl SqlGenerator for LlmSqlGenerator {
    async fn generate_sql(&self, question: &str) -> Result<String, SqlSageError> {
        let mut context = self.gather_context(question).await?;
        let response = self.complete(self.build_prompt(question, &context)).await?;
        let sql = self.extract(&response)?;

        if !sql.contains("intermediate_sql") {
            return Ok(sql);
        }
        let runner = match (&self.runner, self.allow_llm_to_see_data) {
            (Some(runner), true) => runner,
            _ => {
                tracing::warn!("model asked for intermediate SQL but data access is disabled");
                return Ok(sql);
            }
        };

        tracing::info!(%sql, "running intermediate SQL");
        let observed = self.intermediate_context(runner, &sql).await?;
        context.documentation.push(observed);
        let response = self.complete(self.build_prompt(question, &context)).await?;
        self.extract(&response)
    }

    async fn generate_question(&self, sql: &str) -> Result<String, SqlSageError> {
        let messages = vec![
            Message::system(
                "The user will give you SQL and you will try to guess what the business \
                 question this query is answering. Return just the question without any \
                 additional explanation. Do not reference the table name in the question.",
            ),
            Message::human(sql),
        ];
        let question = self.complete(messages).await?;
        let question = question.trim();
        if question.is_empty() {
            return Err(SqlSageError::Generation(
                "model returned an empty question".to_string(),
            ));
        }
        Ok(question.to_string())
    }
}
