/// Condition and switch nodes
///
/// Both render their operands through the template grammar and compare with
/// loose typing: numbers compare numerically regardless of representation,
/// numeric strings compare with numbers, and "true"/"false" strings compare
/// with booleans.

use crate::runtime::context::HandlerContext;
use crate::runtime::error::NodeError;
use crate::runtime::handler::NodeHandler;
use crate::runtime::template::stringify;
use crate::workflow::types::{Combinator, ConditionRule, Node, NodeConfig, Operator};
use async_trait::async_trait;
use serde_json::{json, Value};

/// Evaluates its rules and selects the "true" or "false" handle
pub struct ConditionHandler;

#[async_trait]
impl NodeHandler for ConditionHandler {
    async fn execute(&self, node: &Node, ctx: &mut HandlerContext<'_>) -> Result<Value, NodeError> {
        let NodeConfig::Condition(config) = &node.config else {
            return Err(NodeError::config(format!("Node '{}' is not a condition node", node.id)));
        };

        let mut results = Vec::with_capacity(config.conditions.len());
        for rule in &config.conditions {
            results.push(evaluate_rule(rule, ctx)?);
        }

        let result = match config.combinator {
            Combinator::All => results.iter().all(|r| *r),
            Combinator::Any => results.iter().any(|r| *r),
        };

        tracing::debug!("🔀 Condition '{}' evaluated {:?} → {}", node.id, results, result);
        Ok(json!({ "result": result }))
    }
}

/// Selects every case whose value matches, or the default handle
pub struct SwitchHandler;

#[async_trait]
impl NodeHandler for SwitchHandler {
    async fn execute(&self, node: &Node, ctx: &mut HandlerContext<'_>) -> Result<Value, NodeError> {
        let NodeConfig::Switch(config) = &node.config else {
            return Err(NodeError::config(format!("Node '{}' is not a switch node", node.id)));
        };

        let value = ctx.render_value(&config.value)?;
        let mut handles: Vec<String> = Vec::new();
        for case in &config.cases {
            let expected = ctx.render_value(&case.equals)?;
            if loose_equals(&value, &expected) && !handles.contains(&case.handle) {
                handles.push(case.handle.clone());
            }
        }

        if handles.is_empty() {
            if let Some(default) = &config.default_handle {
                handles.push(default.clone());
            }
        }

        tracing::debug!("🔀 Switch '{}' on {} selected {:?}", node.id, value, handles);
        Ok(json!({ "value": value, "handles": handles }))
    }
}

fn evaluate_rule(rule: &ConditionRule, ctx: &HandlerContext<'_>) -> Result<bool, NodeError> {
    let left = ctx.render_value(&rule.left)?;
    let right = ctx.render_value(&rule.right)?;
    evaluate(&left, rule.operator, &right)
}

/// Apply a comparison operator to two resolved operands
pub fn evaluate(left: &Value, operator: Operator, right: &Value) -> Result<bool, NodeError> {
    Ok(match operator {
        Operator::Equals => loose_equals(left, right),
        Operator::NotEquals => !loose_equals(left, right),
        Operator::GreaterThan => to_f64(left)? > to_f64(right)?,
        Operator::GreaterOrEqual => to_f64(left)? >= to_f64(right)?,
        Operator::LessThan => to_f64(left)? < to_f64(right)?,
        Operator::LessOrEqual => to_f64(left)? <= to_f64(right)?,
        Operator::Contains => contains(left, right),
        Operator::NotContains => !contains(left, right),
        Operator::StartsWith => stringify(left).starts_with(&stringify(right)),
        Operator::EndsWith => stringify(left).ends_with(&stringify(right)),
        Operator::IsEmpty => is_empty(left),
        Operator::IsNotEmpty => !is_empty(left),
        Operator::IsTrue => loose_equals(left, &Value::Bool(true)),
        Operator::IsFalse => loose_equals(left, &Value::Bool(false)),
    })
}

pub fn loose_equals(left: &Value, right: &Value) -> bool {
    if left == right {
        return true;
    }

    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::String(s), Value::Number(n)) | (Value::Number(n), Value::String(s)) => {
            s.trim().parse::<f64>().ok() == n.as_f64()
        }
        (Value::Bool(b), Value::String(s)) | (Value::String(s), Value::Bool(b)) => {
            match s.to_lowercase().as_str() {
                "true" => *b,
                "false" => !*b,
                _ => false,
            }
        }
        _ => false,
    }
}

fn contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::String(s) => s.contains(stringify(needle).as_str()),
        Value::Array(items) => items.iter().any(|item| loose_equals(item, needle)),
        Value::Object(map) => needle.as_str().is_some_and(|key| map.contains_key(key)),
        _ => false,
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn to_f64(value: &Value) -> Result<f64, NodeError> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| NodeError::config(format!("Cannot convert {} to a number", n))),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| NodeError::config(format!("Cannot convert '{}' to a number", s))),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        other => Err(NodeError::config(format!("Cannot convert {} to a number", other))),
    }
}
