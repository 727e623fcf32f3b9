//! Schema-related data models.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable,
            default_value: None,
        }
    }

    pub fn with_default(mut self, default_value: Option<String>) -> Self {
        self.default_value = default_value;
        self
    }

    /// One line of the readable schema listing, e.g. `- id: integer (NOT NULL)`.
    pub fn summary_line(&self) -> String {
        let nullability = if self.nullable { "" } else { " (NOT NULL)" };
        format!("- {}: {}{}", self.name, self.data_type, nullability)
    }
}

/// Render the readable form of a table's columns.
pub fn describe_columns(table_name: &str, columns: &[ColumnDefinition]) -> String {
    let mut out = format!("Table {} columns:\n", table_name);
    for column in columns {
        out.push_str(&column.summary_line());
        out.push('\n');
    }
    out
}
