//! Database tool server: `execute_query`, `get_table_schema`, `list_tables`.
//!
//! Every call opens its own connection from the configured [`DatabaseConfig`]
//! and closes it before returning. `execute_query` passes the SQL safety gate
//! before any connection is opened.

use crate::db::{DbConnection, QueryExecutor, SchemaInspector};
use crate::error::{DbError, DbResult, ToolError, ToolResult};
use crate::mcp::registry::{ParamSpec, ParamType, ToolDescriptor, ToolRegistry};
use crate::models::{
    ColumnDefinition, DEFAULT_ROW_LIMIT, DatabaseConfig, DatabaseType, QueryResult,
    apply_row_limit, describe_columns, effective_limit,
};
use crate::tools::format::{OutputFormat, format_as_markdown, format_as_table};
use crate::tools::{ToolOutput, ToolService, parse_input, sql_safety};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue, json};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseTool {
    ExecuteQuery,
    GetTableSchema,
    ListTables,
}

impl DatabaseTool {
    pub const ALL: [Self; 3] = [Self::ExecuteQuery, Self::GetTableSchema, Self::ListTables];

    pub fn name(&self) -> &'static str {
        match self {
            Self::ExecuteQuery => "execute_query",
            Self::GetTableSchema => "get_table_schema",
            Self::ListTables => "list_tables",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    pub fn descriptor(&self) -> ToolDescriptor {
        match self {
            Self::ExecuteQuery => ToolDescriptor::new(
                self.name(),
                "Execute a read-only SQL query (a single SELECT statement). \
                 A LIMIT clause is appended when the query has none.",
            )
            .param(ParamSpec::required(
                "sql",
                ParamType::String,
                "SELECT statement to execute",
            ))
            .param(ParamSpec::optional(
                "limit",
                ParamType::Integer,
                json!(DEFAULT_ROW_LIMIT),
                "Maximum rows to return when the query has no LIMIT clause",
            ))
            .param(
                ParamSpec::optional(
                    "format",
                    ParamType::String,
                    json!("json"),
                    "Output format: json, table or markdown",
                )
                .one_of(OutputFormat::NAMES),
            ),
            Self::GetTableSchema => ToolDescriptor::new(
                self.name(),
                "Get the columns of a table: name, data type, nullability and default.",
            )
            .param(ParamSpec::required(
                "table_name",
                ParamType::String,
                "Table to describe",
            )),
            Self::ListTables => {
                ToolDescriptor::new(self.name(), "List all tables in the database.")
            }
        }
    }
}

fn default_limit() -> u32 {
    DEFAULT_ROW_LIMIT
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteQueryInput {
    pub sql: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub format: OutputFormat,
}

impl ExecuteQueryInput {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            limit: DEFAULT_ROW_LIMIT,
            format: OutputFormat::Json,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryOutput {
    /// Statement actually executed, including any appended LIMIT.
    pub sql: String,
    pub row_count: usize,
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, JsonValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_applied: Option<u32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
    pub execution_time_ms: u64,
}

impl QueryOutput {
    fn new(sql: String, result: QueryResult, limit_applied: Option<u32>) -> Self {
        Self {
            sql,
            row_count: result.row_count(),
            columns: result.columns,
            rows: result.rows,
            limit_applied,
            truncated: result.truncated,
            execution_time_ms: result.execution_time_ms,
        }
    }

    pub fn render(&self, format: OutputFormat) -> ToolResult<ToolOutput> {
        match format {
            OutputFormat::Json => ToolOutput::json(self),
            OutputFormat::Table => Ok(ToolOutput::text(format_as_table(
                &self.columns,
                &self.rows,
                self.execution_time_ms,
            ))),
            OutputFormat::Markdown => {
                Ok(ToolOutput::text(format_as_markdown(&self.columns, &self.rows)))
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetTableSchemaInput {
    pub table_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableSchemaOutput {
    pub table_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub exists: bool,
    pub columns: Vec<ColumnDefinition>,
    /// Readable listing, or a "does not exist" notice.
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListTablesInput {}

#[derive(Debug, Clone, Serialize)]
pub struct ListTablesOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub tables: Vec<String>,
    pub count: usize,
}

pub struct DatabaseService {
    config: DatabaseConfig,
    executor: QueryExecutor,
    registry: ToolRegistry,
}

impl DatabaseService {
    pub fn new(config: DatabaseConfig) -> Self {
        let executor = QueryExecutor::new(config.query_timeout);
        Self {
            config,
            executor,
            registry: ToolRegistry::new(
                DatabaseTool::ALL.iter().map(DatabaseTool::descriptor).collect(),
            ),
        }
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Schema name reported in outputs; SQLite has none.
    fn schema_label(&self) -> Option<String> {
        match self.config.db_type {
            DatabaseType::PostgreSQL => Some(self.config.schema.clone()),
            DatabaseType::SQLite => None,
        }
    }

    /// Run a vetted read query. Rejected SQL never reaches the database.
    pub async fn execute_query(&self, input: ExecuteQueryInput) -> DbResult<QueryOutput> {
        let verdict = sql_safety::check(&input.sql);
        if !verdict.allowed {
            warn!(reason = %verdict.reason, "Rejected query");
            return Err(DbError::query_rejected(verdict.reason));
        }

        let limit = effective_limit(input.limit);
        let (sql, limit_added) = apply_row_limit(&input.sql, limit);
        if limit_added {
            debug!(limit, "Appended LIMIT clause");
        }

        let mut conn = DbConnection::open(&self.config).await?;
        let result = self.executor.fetch(&mut conn, &sql).await;
        conn.close().await;
        let result = result?;

        info!(
            rows = result.row_count(),
            elapsed_ms = result.execution_time_ms,
            "Query executed"
        );
        Ok(QueryOutput::new(sql, result, limit_added.then_some(limit)))
    }

    pub async fn get_table_schema(&self, input: GetTableSchemaInput) -> DbResult<TableSchemaOutput> {
        let mut conn = DbConnection::open(&self.config).await?;
        let columns =
            SchemaInspector::describe_table(&mut conn, &input.table_name, &self.config.schema)
                .await;
        conn.close().await;
        let columns = columns?;

        let exists = !columns.is_empty();
        let description = if exists {
            describe_columns(&input.table_name, &columns)
        } else {
            format!("Table {} does not exist", input.table_name)
        };

        Ok(TableSchemaOutput {
            table_name: input.table_name,
            schema: self.schema_label(),
            exists,
            columns,
            description,
        })
    }

    pub async fn list_tables(&self) -> DbResult<ListTablesOutput> {
        let mut conn = DbConnection::open(&self.config).await?;
        let tables = SchemaInspector::list_tables(&mut conn, &self.config.schema).await;
        conn.close().await;
        let tables = tables?;

        Ok(ListTablesOutput {
            schema: self.schema_label(),
            count: tables.len(),
            tables,
        })
    }
}

/// Resource and policy failures become readable results, not protocol errors.
fn render<T>(
    tool: DatabaseTool,
    result: DbResult<T>,
    ok: impl FnOnce(T) -> ToolResult<ToolOutput>,
) -> ToolResult<ToolOutput> {
    match result {
        Ok(value) => ok(value),
        Err(e) => {
            warn!(tool = tool.name(), error = %e, "Database tool failed");
            Ok(ToolOutput::failure(e.detailed_message(), e.suggestion()))
        }
    }
}

impl ToolService for DatabaseService {
    fn server_name(&self) -> &'static str {
        "database"
    }

    fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    async fn call_tool(&self, name: &str, arguments: Map<String, JsonValue>) -> ToolResult<ToolOutput> {
        let tool = DatabaseTool::from_name(name).ok_or_else(|| ToolError::unknown_tool(name))?;
        match tool {
            DatabaseTool::ExecuteQuery => {
                let input: ExecuteQueryInput = parse_input(arguments)?;
                let format = input.format;
                render(tool, self.execute_query(input).await, |out| out.render(format))
            }
            DatabaseTool::GetTableSchema => {
                let input: GetTableSchemaInput = parse_input(arguments)?;
                render(tool, self.get_table_schema(input).await, |out| {
                    ToolOutput::json(&out)
                })
            }
            DatabaseTool::ListTables => {
                let _: ListTablesInput = parse_input(arguments)?;
                render(tool, self.list_tables().await, |out| ToolOutput::json(&out))
            }
        }
    }
}
