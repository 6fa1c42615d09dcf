/// Core workflow type definitions
///
/// Defines workflows, nodes and edges. Nodes persist as loosely-typed JSON
/// (`{ id, type, config }`) but are decoded into a strongly-typed
/// [`NodeConfig`] the moment they cross the serde boundary, so the engine
/// never inspects raw config maps.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A complete workflow definition containing nodes and their connections
///
/// Workflows are stored as JSON in SQLite and ordered into a DAG for
/// execution. Nodes with no incoming edges are the entry points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    /// Unique workflow identifier (e.g., "wf-onboarding")
    pub id: String,
    /// Human-readable workflow name
    pub name: String,
    /// List of nodes in this workflow
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// List of edges connecting nodes
    #[serde(default)]
    pub edges: Vec<Edge>,
}

/// A single node in the workflow graph
///
/// Immutable for the duration of a run. `position` is editor state and is
/// carried through persistence untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawNode", into = "RawNode")]
pub struct Node {
    /// Unique node identifier within the workflow (e.g., "n1", "check-score")
    pub id: String,
    /// Typed configuration; the variant determines which handler runs the node
    pub config: NodeConfig,
    /// Canvas position, ignored by the engine
    pub position: Option<Position>,
    /// Per-node override of the engine's handler timeout
    pub timeout_ms: Option<u64>,
}

impl Node {
    pub fn new(id: impl Into<String>, config: NodeConfig) -> Self {
        Self {
            id: id.into(),
            config,
            position: None,
            timeout_ms: None,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn node_type(&self) -> NodeType {
        self.config.node_type()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Persisted shape of a node, exactly as the editor writes it
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawNode {
    id: String,
    #[serde(rename = "type")]
    node_type: String,
    #[serde(default)]
    config: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeout_ms: Option<u64>,
}

impl TryFrom<RawNode> for Node {
    type Error = String;

    fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
        let config = NodeConfig::decode(&raw.node_type, raw.config)
            .map_err(|e| format!("Invalid config for node '{}': {}", raw.id, e))?;

        Ok(Node {
            id: raw.id,
            config,
            position: raw.position,
            timeout_ms: raw.timeout_ms,
        })
    }
}

impl From<Node> for RawNode {
    fn from(node: Node) -> Self {
        let node_type = node.node_type().to_string();
        RawNode {
            id: node.id,
            node_type,
            config: node.config.encode(),
            position: node.position,
            timeout_ms: node.timeout_ms,
        }
    }
}

/// Node kinds known to the engine, used as the handler registry key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeType {
    Trigger,
    Condition,
    Switch,
    HttpRequest,
    Script,
    SetVariable,
    Transform,
    Email,
    Spreadsheet,
    TextGeneration,
    /// Provider-defined type with no built-in config schema
    Custom(String),
}

impl NodeType {
    pub fn as_str(&self) -> &str {
        match self {
            NodeType::Trigger => "trigger",
            NodeType::Condition => "condition",
            NodeType::Switch => "switch",
            NodeType::HttpRequest => "http_request",
            NodeType::Script => "script",
            NodeType::SetVariable => "set_variable",
            NodeType::Transform => "transform",
            NodeType::Email => "email",
            NodeType::Spreadsheet => "spreadsheet",
            NodeType::TextGeneration => "text_generation",
            NodeType::Custom(name) => name,
        }
    }

    pub fn parse(name: &str) -> Self {
        match name {
            "trigger" => NodeType::Trigger,
            "condition" => NodeType::Condition,
            "switch" => NodeType::Switch,
            "http_request" => NodeType::HttpRequest,
            "script" => NodeType::Script,
            "set_variable" => NodeType::SetVariable,
            "transform" => NodeType::Transform,
            "email" => NodeType::Email,
            "spreadsheet" => NodeType::Spreadsheet,
            "text_generation" => NodeType::TextGeneration,
            other => NodeType::Custom(other.to_string()),
        }
    }

    /// Branching types select live outgoing handles from their output
    pub fn is_branching(&self) -> bool {
        matches!(self, NodeType::Condition | NodeType::Switch)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strongly-typed node configuration, one variant per node type
#[derive(Debug, Clone, PartialEq)]
pub enum NodeConfig {
    /// Entry point; emits the run payload
    Trigger(TriggerConfig),
    /// Binary branch with "true"/"false" handles
    Condition(ConditionConfig),
    /// Multi-way branch with arbitrary labelled handles
    Switch(SwitchConfig),
    HttpRequest(HttpRequestConfig),
    /// Embedded Lua chunk
    Script(ScriptConfig),
    SetVariable(SetVariableConfig),
    Transform(TransformConfig),
    Email(EmailConfig),
    Spreadsheet(SpreadsheetConfig),
    TextGeneration(TextGenerationConfig),
    Custom { node_type: String, config: Value },
}

impl NodeConfig {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeConfig::Trigger(_) => NodeType::Trigger,
            NodeConfig::Condition(_) => NodeType::Condition,
            NodeConfig::Switch(_) => NodeType::Switch,
            NodeConfig::HttpRequest(_) => NodeType::HttpRequest,
            NodeConfig::Script(_) => NodeType::Script,
            NodeConfig::SetVariable(_) => NodeType::SetVariable,
            NodeConfig::Transform(_) => NodeType::Transform,
            NodeConfig::Email(_) => NodeType::Email,
            NodeConfig::Spreadsheet(_) => NodeType::Spreadsheet,
            NodeConfig::TextGeneration(_) => NodeType::TextGeneration,
            // A custom entry spelled like a built-in type still keys as that type
            NodeConfig::Custom { node_type, .. } => NodeType::parse(node_type),
        }
    }

    /// Decode the persisted `(type, config)` pair into a typed variant
    ///
    /// Unknown type names are kept as [`NodeConfig::Custom`]; they only fail
    /// at dispatch if no provider registered a handler for them.
    pub fn decode(node_type: &str, config: Value) -> Result<Self, serde_json::Error> {
        // Editors emit `null` for nodes with nothing configured
        let config = if config.is_null() { Value::Object(Default::default()) } else { config };

        Ok(match NodeType::parse(node_type) {
            NodeType::Trigger => NodeConfig::Trigger(serde_json::from_value(config)?),
            NodeType::Condition => NodeConfig::Condition(serde_json::from_value(config)?),
            NodeType::Switch => NodeConfig::Switch(serde_json::from_value(config)?),
            NodeType::HttpRequest => NodeConfig::HttpRequest(serde_json::from_value(config)?),
            NodeType::Script => NodeConfig::Script(serde_json::from_value(config)?),
            NodeType::SetVariable => NodeConfig::SetVariable(serde_json::from_value(config)?),
            NodeType::Transform => NodeConfig::Transform(serde_json::from_value(config)?),
            NodeType::Email => NodeConfig::Email(serde_json::from_value(config)?),
            NodeType::Spreadsheet => NodeConfig::Spreadsheet(serde_json::from_value(config)?),
            NodeType::TextGeneration => NodeConfig::TextGeneration(serde_json::from_value(config)?),
            NodeType::Custom(name) => NodeConfig::Custom { node_type: name, config },
        })
    }

    /// Encode back into the opaque persisted form
    pub fn encode(&self) -> Value {
        let encoded = match self {
            NodeConfig::Trigger(c) => serde_json::to_value(c),
            NodeConfig::Condition(c) => serde_json::to_value(c),
            NodeConfig::Switch(c) => serde_json::to_value(c),
            NodeConfig::HttpRequest(c) => serde_json::to_value(c),
            NodeConfig::Script(c) => serde_json::to_value(c),
            NodeConfig::SetVariable(c) => serde_json::to_value(c),
            NodeConfig::Transform(c) => serde_json::to_value(c),
            NodeConfig::Email(c) => serde_json::to_value(c),
            NodeConfig::Spreadsheet(c) => serde_json::to_value(c),
            NodeConfig::TextGeneration(c) => serde_json::to_value(c),
            NodeConfig::Custom { config, .. } => Ok(config.clone()),
        };
        // Plain structs of strings and JSON values always serialize
        encoded.unwrap_or(Value::Null)
    }
}

/// Trigger node configuration
/// Expected config: { "kind": { "webhook": { "path": "/signup" } }, "data": {...} }
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TriggerConfig {
    #[serde(default)]
    pub kind: TriggerKind,
    /// Static payload used when the run carries none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    #[default]
    Manual,
    Webhook { path: String },
    /// Cron expression evaluated by the external job transport
    Schedule { cron: String },
}

/// Condition node configuration
/// Expected config: { "conditions": [{ "left": "{{n1.score}}", "operator": "greater_than", "right": 70 }] }
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionConfig {
    pub conditions: Vec<ConditionRule>,
    #[serde(default)]
    pub combinator: Combinator,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionRule {
    pub left: Value,
    pub operator: Operator,
    #[serde(default)]
    pub right: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Combinator {
    #[default]
    All,
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    IsEmpty,
    IsNotEmpty,
    IsTrue,
    IsFalse,
}

/// Switch node configuration
/// Expected config: { "value": "{{n1.tier}}", "cases": [{ "handle": "gold", "equals": "gold" }], "default_handle": "other" }
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchConfig {
    pub value: Value,
    pub cases: Vec<SwitchCase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_handle: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    pub handle: String,
    pub equals: Value,
}

/// HTTP client configuration for external API calls
/// Expected config: { "url": "https://api.example.com/data", "method": "POST", "headers": {...}, "body": {...} }
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpRequestConfig {
    pub url: String,
    #[serde(default = "default_http_method")]
    pub method: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

fn default_http_method() -> String {
    "GET".to_string()
}

/// Embedded Lua script
/// Expected config: { "source": "return { total = inputs.n1.a + inputs.n1.b }" }
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptConfig {
    pub source: String,
}

/// Expected config: { "name": "customer", "value": "{{n1.customer}}" }
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetVariableConfig {
    pub name: String,
    pub value: Value,
}

/// Expected config: { "output": { "greeting": "Hello {{n1.name}}" } }
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformConfig {
    pub output: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailConfig {
    pub to: String,
    pub subject: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadsheetConfig {
    pub spreadsheet_id: String,
    pub range: String,
    #[serde(default)]
    pub values: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextGenerationConfig {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Directed dependency between two nodes
///
/// The target runs only after the source completed; for branching sources
/// the edge is live only when `source_handle` matches a selected handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    #[serde(alias = "from")]
    pub source: String,
    #[serde(alias = "to")]
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

impl Edge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
        }
    }

    pub fn with_source_handle(mut self, handle: impl Into<String>) -> Self {
        self.source_handle = Some(handle.into());
        self
    }
}
