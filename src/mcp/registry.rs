//! Tool descriptors and the per-server registry.
//!
//! A [`ToolDescriptor`] is the single source of truth for a tool: it renders the
//! `tools/list` entry (with a JSON Schema `inputSchema`) and validates incoming
//! arguments before they are handed to the typed handler.

use crate::error::{ToolError, ToolResult};
use serde_json::{Map, Value, json};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Integer,
    Boolean,
}

impl ParamType {
    /// JSON Schema type name.
    pub fn schema_name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
        }
    }

    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamType,
    pub required: bool,
    pub default: Option<Value>,
    pub description: &'static str,
    /// Closed set of accepted string values, rendered as a schema `enum`.
    pub allowed: Option<&'static [&'static str]>,
}

impl ParamSpec {
    pub fn required(name: &'static str, kind: ParamType, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            default: None,
            description,
            allowed: None,
        }
    }

    pub fn optional(
        name: &'static str,
        kind: ParamType,
        default: Value,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            kind,
            required: false,
            default: Some(default),
            description,
            allowed: None,
        }
    }

    pub fn one_of(mut self, allowed: &'static [&'static str]) -> Self {
        self.allowed = Some(allowed);
        self
    }

    fn schema(&self) -> Value {
        let mut schema = json!({
            "type": self.kind.schema_name(),
            "description": self.description,
        });
        if let Some(default) = &self.default {
            schema["default"] = default.clone();
        }
        if let Some(allowed) = self.allowed {
            schema["enum"] = json!(allowed);
        }
        schema
    }

    fn check(&self, value: &Value) -> ToolResult<()> {
        if !self.kind.accepts(value) {
            return Err(ToolError::invalid_argument(
                self.name,
                format!("expected {}", self.kind.schema_name()),
            ));
        }
        if let (Some(allowed), Some(s)) = (self.allowed, value.as_str()) {
            if !allowed.contains(&s) {
                return Err(ToolError::invalid_argument(
                    self.name,
                    format!("must be one of: {}", allowed.join(", ")),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub params: Vec<ParamSpec>,
}

impl ToolDescriptor {
    pub fn new(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            params: Vec::new(),
        }
    }

    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    /// JSON Schema object describing the arguments, properties in declaration order.
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for spec in &self.params {
            properties.insert(spec.name.to_string(), spec.schema());
        }
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// The `tools/list` entry for this tool.
    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema(),
        })
    }

    /// Validate arguments against the parameter schema and fill in defaults.
    ///
    /// Unknown argument names are rejected. A `null` value counts as absent.
    pub fn validate(&self, mut arguments: Map<String, Value>) -> ToolResult<Map<String, Value>> {
        if let Some(unknown) = arguments
            .keys()
            .find(|key| !self.params.iter().any(|p| p.name == key.as_str()))
        {
            return Err(ToolError::unexpected_argument(unknown.clone()));
        }

        for spec in &self.params {
            if let Some(value) = arguments.get(spec.name).filter(|v| !v.is_null()) {
                spec.check(value)?;
                continue;
            }
            match &spec.default {
                Some(default) => {
                    arguments.insert(spec.name.to_string(), default.clone());
                }
                None if spec.required => return Err(ToolError::missing_argument(spec.name)),
                None => {
                    arguments.remove(spec.name);
                }
            }
        }

        Ok(arguments)
    }
}

/// Immutable name → descriptor table for one server.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
    index: HashMap<&'static str, usize>,
}

impl ToolRegistry {
    /// Build a registry. Tool names must be unique.
    pub fn new(tools: Vec<ToolDescriptor>) -> Self {
        let mut index = HashMap::with_capacity(tools.len());
        for (position, tool) in tools.iter().enumerate() {
            let previous = index.insert(tool.name, position);
            assert!(previous.is_none(), "duplicate tool name: {}", tool.name);
        }
        Self { tools, index }
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter()
    }

    /// The `tools/list` result, in registration order.
    pub fn list_result(&self) -> Value {
        json!({ "tools": self.tools.iter().map(ToolDescriptor::to_json).collect::<Vec<_>>() })
    }
}
