//! MCP tool implementations.
//!
//! Every tool maps onto one Bybit v5 endpoint. Tools are declared as data
//! ([`ExchangeTool`]): the argument table drives the JSON Schema shown to the
//! model, validation, and the snake_case to camelCase mapping onto Bybit's
//! wire parameters.

mod account;
mod asset;
mod market;
mod position;
mod trading;

use std::sync::Arc;

use serde_json::{Map, Value, json};

use crate::client::BybitClient;
use crate::error::{ToolError, ToolResult};
use crate::formatters;

/// Tool execution context.
pub struct ToolContext {
    /// API client.
    pub client: Arc<BybitClient>,
}

impl ToolContext {
    /// Create a new tool context.
    #[must_use]
    pub fn new(client: Arc<BybitClient>) -> Self {
        Self { client }
    }
}

/// Trait for MCP tools.
#[async_trait::async_trait]
pub trait McpTool: Send + Sync {
    /// Tool name (e.g., "get_tickers").
    fn name(&self) -> &'static str;

    /// Tool description for LLM.
    fn description(&self) -> &'static str;

    /// JSON Schema for input parameters.
    fn input_schema(&self) -> serde_json::Value;

    /// Execute the tool with given input.
    async fn execute(&self, ctx: &ToolContext, input: serde_json::Value) -> ToolResult<String>;
}

/// HTTP method of a Bybit endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// JSON type of a tool argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
    Boolean,
    /// Array of objects, passed through unchanged.
    Array,
}

impl ParamKind {
    const fn schema_type(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array => "array",
        }
    }
}

/// Value used when an optional argument is omitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    Str(&'static str),
    Int(i64),
    Bool(bool),
    /// A fresh random UUID per call.
    Uuid,
}

impl DefaultValue {
    fn to_value(self) -> Value {
        match self {
            Self::Str(s) => json!(s),
            Self::Int(n) => json!(n),
            Self::Bool(b) => json!(b),
            Self::Uuid => json!(uuid::Uuid::new_v4().to_string()),
        }
    }
}

/// One tool argument and the Bybit parameter it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    pub name: &'static str,
    pub wire: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub default: Option<DefaultValue>,
    pub description: &'static str,
}

impl Param {
    const fn new(
        name: &'static str,
        wire: &'static str,
        kind: ParamKind,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            wire,
            kind,
            required: false,
            default: None,
            description,
        }
    }

    /// String argument sent under `wire`.
    pub const fn string(name: &'static str, wire: &'static str, description: &'static str) -> Self {
        Self::new(name, wire, ParamKind::String, description)
    }

    pub const fn integer(
        name: &'static str,
        wire: &'static str,
        description: &'static str,
    ) -> Self {
        Self::new(name, wire, ParamKind::Integer, description)
    }

    pub const fn boolean(
        name: &'static str,
        wire: &'static str,
        description: &'static str,
    ) -> Self {
        Self::new(name, wire, ParamKind::Boolean, description)
    }

    pub const fn array(name: &'static str, wire: &'static str, description: &'static str) -> Self {
        Self::new(name, wire, ParamKind::Array, description)
    }

    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub const fn or(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    fn schema(&self) -> Value {
        let mut schema = json!({
            "type": self.kind.schema_type(),
            "description": self.description
        });
        if self.kind == ParamKind::Array {
            schema["items"] = json!({ "type": "object" });
        }
        match self.default {
            Some(DefaultValue::Uuid) | None => {}
            Some(default) => schema["default"] = default.to_value(),
        }
        schema
    }

    /// Coerce a supplied argument to this parameter's wire type.
    fn coerce(&self, value: &Value) -> ToolResult<Value> {
        let expected = self.kind.schema_type();
        let invalid = || ToolError::validation(self.name, format!("expected {expected}"));

        match (self.kind, value) {
            (ParamKind::String, Value::String(_)) => Ok(value.clone()),
            (ParamKind::String, Value::Number(n)) => Ok(json!(n.to_string())),
            (ParamKind::Integer, Value::Number(n)) if n.is_i64() => Ok(value.clone()),
            (ParamKind::Integer, Value::String(s)) => match s.trim().parse::<i64>() {
                Ok(n) => Ok(json!(n)),
                Err(_) => Err(invalid()),
            },
            (ParamKind::Boolean, Value::Bool(_)) => Ok(value.clone()),
            (ParamKind::Array, Value::Array(_)) => Ok(value.clone()),
            _ => Err(invalid()),
        }
    }
}

/// A tool backed by a single Bybit REST endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeTool {
    pub name: &'static str,
    pub description: &'static str,
    pub method: Method,
    pub path: &'static str,
    /// Private endpoint requiring a signed request.
    pub signed: bool,
    pub params: Vec<Param>,
}

impl ExchangeTool {
    /// Public market-data endpoint.
    #[must_use]
    pub fn public(name: &'static str, path: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            method: Method::Get,
            path,
            signed: false,
            params: Vec::new(),
        }
    }

    /// Signed endpoint.
    #[must_use]
    pub fn private(
        name: &'static str,
        method: Method,
        path: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            description,
            method,
            path,
            signed: true,
            params: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_params(mut self, params: impl IntoIterator<Item = Param>) -> Self {
        self.params.extend(params);
        self
    }

    /// Validate `input` and map it onto Bybit parameter names.
    ///
    /// Omitted, `null` and empty-string arguments are dropped unless a default
    /// applies. Unknown arguments are ignored.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a missing required argument or a value
    /// of the wrong type.
    pub fn build_request(&self, input: &Value) -> ToolResult<Map<String, Value>> {
        let args = match input {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            _ => return Err(ToolError::validation("arguments", "expected an object")),
        };

        let mut wire = Map::new();
        for param in &self.params {
            let supplied = args.get(param.name).filter(|v| !is_blank(v));
            match (supplied, param.default) {
                (Some(value), _) => {
                    wire.insert(param.wire.to_string(), param.coerce(value)?);
                }
                (None, _) if param.required => {
                    return Err(ToolError::validation(param.name, "is required"));
                }
                (None, Some(default)) => {
                    wire.insert(param.wire.to_string(), default.to_value());
                }
                (None, None) => {}
            }
        }
        Ok(wire)
    }
}

#[async_trait::async_trait]
impl McpTool for ExchangeTool {
    fn name(&self) -> &'static str {
        self.name
    }

    fn description(&self) -> &'static str {
        self.description
    }

    fn input_schema(&self) -> serde_json::Value {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| (p.name.to_string(), p.schema()))
            .collect();
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: serde_json::Value) -> ToolResult<String> {
        let wire = self.build_request(&input)?;

        let result = match self.method {
            Method::Get => {
                let query: Vec<(String, String)> = wire
                    .into_iter()
                    .map(|(k, v)| (k, query_value(&v)))
                    .collect();
                ctx.client.get(self.path, &query, self.signed).await?
            }
            Method::Post => {
                let body = Value::Object(wire);
                ctx.client.post(self.path, &body, self.signed).await?
            }
        };

        Ok(formatters::to_text(&result))
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Render a wire value as a query-string value.
fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Register all tools.
#[must_use]
pub fn register_all_tools() -> Vec<Box<dyn McpTool>> {
    market::tools()
        .into_iter()
        .chain(trading::tools())
        .chain(account::tools())
        .chain(position::tools())
        .chain(asset::tools())
        .map(|tool| Box::new(tool) as Box<dyn McpTool>)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ExchangeTool {
        ExchangeTool::public("sample", "/v5/sample", "Sample").with_params([
            Param::string("symbol", "symbol", "Pair").required(),
            Param::string("category", "category", "Product").or(DefaultValue::Str("linear")),
            Param::integer("limit", "limit", "Page size").or(DefaultValue::Int(200)),
            Param::integer("start_time", "startTime", "Start ms"),
            Param::boolean("reduce_only", "reduceOnly", "Reduce only"),
        ])
    }

    #[test]
    fn test_build_request_maps_and_defaults() {
        let wire = sample()
            .build_request(&json!({ "symbol": "BTCUSDT", "start_time": 1700000000000_i64 }))
            .unwrap();
        assert_eq!(wire["symbol"], "BTCUSDT");
        assert_eq!(wire["category"], "linear");
        assert_eq!(wire["limit"], 200);
        assert_eq!(wire["startTime"], 1_700_000_000_000_i64);
        assert!(!wire.contains_key("start_time"));
        assert!(!wire.contains_key("reduceOnly"));
    }

    #[test]
    fn test_build_request_requires_arguments() {
        let err = sample().build_request(&json!({})).unwrap_err();
        assert!(matches!(err, ToolError::Validation { ref field, .. } if field == "symbol"));

        let input = json!({ "symbol": "" });
        let err = sample().build_request(&input).unwrap_err();
        assert!(matches!(err, ToolError::Validation { .. }));
    }

    #[test]
    fn test_build_request_coerces_types() {
        let input = json!({ "symbol": "BTCUSDT", "limit": "50" });
        let wire = sample().build_request(&input).unwrap();
        assert_eq!(wire["limit"], 50);

        let err = sample().build_request(&json!({ "symbol": "BTCUSDT", "limit": "many" }));
        assert!(err.is_err());
        let err = sample().build_request(&json!({ "symbol": "BTCUSDT", "reduce_only": "yes" }));
        assert!(err.is_err());
        let not_object = json!(["not", "an", "object"]);
        assert!(sample().build_request(&not_object).is_err());
    }

    #[test]
    fn test_input_schema() {
        let schema = sample().input_schema();
        assert_eq!(schema["required"], json!(["symbol"]));
        assert_eq!(schema["properties"]["limit"]["default"], 200);
        assert_eq!(schema["properties"]["start_time"]["type"], "integer");
    }

    #[test]
    fn test_uuid_default_is_fresh() {
        let transfer_id = Param::string("transfer_id", "transferId", "id").or(DefaultValue::Uuid);
        let tool = ExchangeTool::public("t", "/t", "t").with_params([transfer_id]);
        let a = tool.build_request(&json!({})).unwrap();
        let b = tool.build_request(&json!({})).unwrap();
        assert_ne!(a["transferId"], b["transferId"]);
        let schema = tool.input_schema();
        assert_eq!(schema["properties"]["transfer_id"].get("default"), None);
    }

    #[test]
    fn test_registry_names_unique() {
        let tools = register_all_tools();
        let mut names: Vec<&str> = tools.iter().map(|t| t.name()).collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
        assert_eq!(total, 31);
    }
}
