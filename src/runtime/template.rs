/// `{{ref}}` interpolation inside string configuration fields
///
/// Grammar:
/// - `{{ ref }}`: surrounding whitespace inside the braces is ignored
/// - `ref` is `nodeId[.path]`, `$vars.name[.path]`, `$payload[.path]` or `$run_id`
/// - path segments are object keys or array indices (`items.0.sku`)
/// - `\{{` produces a literal `{{`
///
/// Strings are substituted raw, any other value as compact JSON. Tokens are
/// replaced in a single left-to-right pass and substituted text is never
/// scanned again. A reference that cannot be resolved is a configuration
/// error rather than an empty string.

use crate::runtime::context::HandlerContext;
use crate::runtime::error::NodeError;
use serde_json::Value;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Render all tokens in `text`
pub fn render(text: &str, ctx: &HandlerContext<'_>) -> Result<String, NodeError> {
    let mut rendered = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(OPEN) {
        if rest[..start].ends_with('\\') {
            rendered.push_str(&rest[..start - 1]);
            rendered.push_str(OPEN);
            rest = &rest[start + OPEN.len()..];
            continue;
        }

        rendered.push_str(&rest[..start]);
        let after = &rest[start + OPEN.len()..];
        let end = after
            .find(CLOSE)
            .ok_or_else(|| NodeError::config(format!("Unterminated '{{{{' in template: {}", text)))?;

        let value = resolve(parse_reference(&after[..end])?, ctx)?;
        rendered.push_str(&stringify(&value));
        rest = &after[end + CLOSE.len()..];
    }

    rendered.push_str(rest);
    Ok(rendered)
}

/// Render every string in a JSON value tree
///
/// A string consisting of exactly one token is replaced by the referenced
/// value itself, so `"{{fetch.body}}"` yields an object, not its JSON text.
pub fn render_value(value: &Value, ctx: &HandlerContext<'_>) -> Result<Value, NodeError> {
    match value {
        Value::String(text) => match single_token(text) {
            Some(reference) => resolve(parse_reference(reference)?, ctx),
            None => render(text, ctx).map(Value::String),
        },
        Value::Array(items) => items
            .iter()
            .map(|item| render_value(item, ctx))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut rendered = serde_json::Map::with_capacity(map.len());
            for (key, item) in map {
                rendered.insert(key.clone(), render_value(item, ctx)?);
            }
            Ok(Value::Object(rendered))
        }
        other => Ok(other.clone()),
    }
}

/// Text form used when a value is spliced into a string
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The reference when `text` is exactly one token, using the same scan as [`render`]
fn single_token(text: &str) -> Option<&str> {
    let after = text.strip_prefix(OPEN)?;
    let end = after.find(CLOSE)?;
    let inner = &after[..end];
    if end + CLOSE.len() != after.len() || inner.contains(OPEN) {
        return None;
    }
    Some(inner)
}

fn parse_reference(raw: &str) -> Result<&str, NodeError> {
    if raw.contains(OPEN) {
        return Err(NodeError::config(format!("Nested '{{{{' in reference: {}", raw)));
    }
    let reference = raw.trim();
    if reference.is_empty() {
        return Err(NodeError::config("Empty template reference '{{}}'"));
    }
    Ok(reference)
}

fn resolve(reference: &str, ctx: &HandlerContext<'_>) -> Result<Value, NodeError> {
    if reference == "$run_id" {
        return Ok(Value::String(ctx.run_id().to_string()));
    }

    if let Some(path) = strip_root(reference, "$payload") {
        return lookup(ctx.payload(), path, reference);
    }

    if let Some(path) = strip_root(reference, "$vars") {
        let (name, path) = path.split_once('.').unwrap_or((path, ""));
        let value = ctx
            .variable(name)
            .ok_or_else(|| NodeError::config(format!("Unknown variable '{}' in {{{{{}}}}}", name, reference)))?;
        return lookup(value, path, reference);
    }

    // Longest dotted prefix that names a visible output wins, so ids may contain dots
    let mut split = reference.len();
    loop {
        let (node_id, path) = (&reference[..split], reference.get(split + 1..).unwrap_or(""));
        if let Some(output) = ctx.output(node_id) {
            return lookup(output, path, reference);
        }
        match reference[..split].rfind('.') {
            Some(dot) => split = dot,
            None => break,
        }
    }

    Err(NodeError::config(format!(
        "Unresolved reference {{{{{}}}}}: no output available for that node",
        reference
    )))
}

/// `"$vars.a.b"` with root `"$vars"` gives `Some("a.b")`; `"$varsx"` gives `None`
fn strip_root<'r>(reference: &'r str, root: &str) -> Option<&'r str> {
    let rest = reference.strip_prefix(root)?;
    if rest.is_empty() {
        Some("")
    } else {
        rest.strip_prefix('.')
    }
}

fn lookup(root: &Value, path: &str, reference: &str) -> Result<Value, NodeError> {
    let mut current = root;
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        current = next.ok_or_else(|| {
            NodeError::config(format!("Path segment '{}' not found for {{{{{}}}}}", segment, reference))
        })?;
    }
    Ok(current.clone())
}
