//! Knowledge tool server: `search` over a small built-in document set.

use crate::error::{ToolError, ToolResult};
use crate::mcp::registry::{ParamSpec, ParamType, ToolDescriptor, ToolRegistry};
use crate::tools::{ToolOutput, ToolService, parse_input};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnowledgeTool {
    Search,
}

impl KnowledgeTool {
    pub const ALL: [Self; 1] = [Self::Search];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Search => "search",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    pub fn descriptor(&self) -> ToolDescriptor {
        match self {
            Self::Search => ToolDescriptor::new(
                self.name(),
                "Search the knowledge base for documents related to a query.",
            )
            .param(ParamSpec::required(
                "query",
                ParamType::String,
                "Search terms, separated by whitespace",
            )),
        }
    }
}

/// A knowledge base entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub category: String,
    pub title: String,
    pub content: String,
}

impl Document {
    pub fn new(
        category: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            title: title.into(),
            content: content.into(),
        }
    }

    fn haystack(&self) -> String {
        format!("{}\n{}\n{}", self.category, self.title, self.content).to_lowercase()
    }
}

fn builtin_documents() -> Vec<Document> {
    vec![
        Document::new(
            "Meeting notes",
            "2024-11-25 weekly meeting",
            "- Discussed Q4 sales targets\n- Set the launch date for the new product",
        ),
        Document::new(
            "Project document",
            "API specification v2.0",
            "- Updated the user authentication endpoints\n- Added a data export feature",
        ),
        Document::new(
            "Technical plan",
            "Database migration guide",
            "- Describes the steps for migrating from MySQL to PostgreSQL",
        ),
    ]
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchInput {
    pub query: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub document: Document,
    /// Distinct query terms found in the document.
    pub score: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchOutput {
    pub query: String,
    pub results: Vec<SearchHit>,
    pub count: usize,
}

pub struct KnowledgeService {
    documents: Vec<Document>,
    registry: ToolRegistry,
}

impl Default for KnowledgeService {
    fn default() -> Self {
        Self::new()
    }
}

impl KnowledgeService {
    pub fn new() -> Self {
        Self::with_documents(builtin_documents())
    }

    pub fn with_documents(documents: Vec<Document>) -> Self {
        Self {
            documents,
            registry: ToolRegistry::new(
                KnowledgeTool::ALL
                    .iter()
                    .map(KnowledgeTool::descriptor)
                    .collect(),
            ),
        }
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Rank documents by how many distinct query terms they contain.
    /// Ties keep knowledge base order; documents with no terms are left out.
    pub fn search(&self, input: SearchInput) -> ToolResult<SearchOutput> {
        let mut terms: Vec<String> = input
            .query
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();
        terms.sort();
        terms.dedup();
        if terms.is_empty() {
            return Err(ToolError::invalid_argument("query", "must not be empty"));
        }

        let mut results: Vec<SearchHit> = self
            .documents
            .iter()
            .filter_map(|doc| {
                let haystack = doc.haystack();
                let score = terms.iter().filter(|t| haystack.contains(t.as_str())).count();
                (score > 0).then(|| SearchHit {
                    document: doc.clone(),
                    score,
                })
            })
            .collect();
        results.sort_by(|a, b| b.score.cmp(&a.score));

        debug!(terms = terms.len(), hits = results.len(), "Knowledge search");
        Ok(SearchOutput {
            query: input.query,
            count: results.len(),
            results,
        })
    }
}

impl ToolService for KnowledgeService {
    fn server_name(&self) -> &'static str {
        "knowledge"
    }

    fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> ToolResult<ToolOutput> {
        match KnowledgeTool::from_name(name) {
            Some(KnowledgeTool::Search) => ToolOutput::json(&self.search(parse_input(arguments)?)?),
            None => Err(ToolError::unknown_tool(name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search(query: &str) -> ToolResult<SearchOutput> {
        KnowledgeService::new().search(SearchInput {
            query: query.to_string(),
        })
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let output = search("POSTGRESQL").unwrap();
        assert_eq!(output.count, 1);
        assert_eq!(output.results[0].document.title, "Database migration guide");
    }

    #[test]
    fn test_search_ranks_by_distinct_terms() {
        let output = search("api data data").unwrap();
        // "data" matches the API document and the migration guide; "api" only the former.
        assert_eq!(output.results[0].document.title, "API specification v2.0");
        assert_eq!(output.results[0].score, 2);
        assert_eq!(output.results[1].score, 1);
    }

    #[test]
    fn test_search_without_matches_is_empty() {
        let output = search("kubernetes").unwrap();
        assert_eq!(output.count, 0);
        assert!(output.results.is_empty());
    }

    #[test]
    fn test_blank_query_is_usage_error() {
        assert!(search("   ").unwrap_err().is_usage_error());
    }

    #[tokio::test]
    async fn test_call_tool_renders_json() {
        let args = serde_json::json!({"query": "sales"});
        let output = KnowledgeService::new()
            .call_tool("search", args.as_object().cloned().unwrap())
            .await
            .unwrap();
        assert!(!output.is_error);
        let body: Value = serde_json::from_str(&output.text).unwrap();
        assert_eq!(body["results"][0]["category"], "Meeting notes");
        assert_eq!(body["results"][0]["score"], 1);
    }
}
