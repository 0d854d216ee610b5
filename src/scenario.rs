//! The immutable `Scenario` input and the canonical, post-normalization
//! `Assertion` tagged union evaluators consume.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::message::ToolDefinition;

/// A query operator a path-query assertion applies to the value resolved by
/// its expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
    Regex,
    Exists,
}

/// How a tool-sequence assertion's expected names must relate to the tool
/// calls actually made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceMode {
    Exact,
    InOrder,
    AnyOrder,
}

/// One named dimension the judge scores, with its relative weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Criterion {
    pub name: String,
    pub description: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

/// The canonical, tagged-variant form of an assertion. Produced by
/// [`crate::evaluation::normalizer::normalize_assertion`] from whatever
/// shorthand the scenario loader supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Assertion {
    PathQuery {
        expression: String,
        operator: Operator,
        #[serde(default)]
        value: Option<Value>,
        #[serde(default = "default_weight")]
        weight: f64,
        #[serde(default)]
        required: bool,
    },
    ToolSequence {
        mode: SequenceMode,
        sequence: Vec<String>,
        #[serde(default = "default_weight")]
        weight: f64,
        #[serde(default)]
        required: bool,
    },
    CostLimit {
        max_usd: f64,
        #[serde(default = "default_weight")]
        weight: f64,
        #[serde(default)]
        required: bool,
    },
    LatencyLimit {
        max_seconds: f64,
        #[serde(default = "default_weight")]
        weight: f64,
        #[serde(default)]
        required: bool,
    },
    Judge {
        criteria: Vec<Criterion>,
        #[serde(default)]
        threshold: Option<f64>,
        #[serde(default)]
        k: Option<u32>,
        #[serde(default)]
        judge_model: Option<String>,
        #[serde(default)]
        judge_adapter: Option<String>,
        #[serde(default)]
        custom_prompt: Option<String>,
        #[serde(default)]
        include_system_prompt: bool,
        #[serde(default = "default_weight")]
        weight: f64,
        #[serde(default)]
        required: bool,
    },
}

impl Assertion {
    pub fn kind(&self) -> &'static str {
        match self {
            Assertion::PathQuery { .. } => "path_query",
            Assertion::ToolSequence { .. } => "tool_sequence",
            Assertion::CostLimit { .. } => "cost_limit",
            Assertion::LatencyLimit { .. } => "latency_limit",
            Assertion::Judge { .. } => "judge",
        }
    }

    pub fn weight(&self) -> f64 {
        match self {
            Assertion::PathQuery { weight, .. }
            | Assertion::ToolSequence { weight, .. }
            | Assertion::CostLimit { weight, .. }
            | Assertion::LatencyLimit { weight, .. }
            | Assertion::Judge { weight, .. } => *weight,
        }
    }

    pub fn required(&self) -> bool {
        match self {
            Assertion::PathQuery { required, .. }
            | Assertion::ToolSequence { required, .. }
            | Assertion::CostLimit { required, .. }
            | Assertion::LatencyLimit { required, .. }
            | Assertion::Judge { required, .. } => *required,
        }
    }
}

/// A raw, possibly-shorthand assertion record as handed down by the (external)
/// scenario loader. Represented as a bare JSON object since the shorthand
/// shapes vary (`{path, contains}`, `{tool_called: "name"}`, an already
/// canonical `{kind: "path_query", ...}`, and so on) — normalization operates
/// directly on the object, the same way the reference implementation does.
pub type RawAssertion = Map<String, Value>;

/// The immutable, declarative description of one conversation to drive and
/// how to judge it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub model: String,
    #[serde(default = "default_adapter")]
    pub adapter: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    pub user_prompt: String,
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
    #[serde(default)]
    pub assertions: Vec<RawAssertion>,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub seed: Option<i64>,
    #[serde(default)]
    pub extras: Map<String, Value>,
}

fn default_adapter() -> String {
    "openai".to_string()
}

fn default_threshold() -> f64 {
    0.8
}

fn default_max_turns() -> u32 {
    10
}

impl Scenario {
    /// Canonical JSON serialization used to derive the scenario hash: sorted
    /// map keys (guaranteed by `serde_json::Map`'s `BTreeMap` backing unless
    /// the `preserve_order` feature is enabled) and no extraneous whitespace.
    pub fn canonical_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
