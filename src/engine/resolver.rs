// Expression resolver - turns raw step configs into concrete args

//! # Expression Resolver
//!
//! Transforms a `BrickConfig.config` (raw, possibly expression-laden) into
//! a plain argument object ready for schema validation and brick
//! invocation. Resolution is a **pure projection**: the source config is
//! never mutated, literals are structurally copied so nothing aliases back
//! into the stored definition, and resolving twice against an unchanged
//! context yields the same result.
//!
//! Per entry:
//! - literal -> copied through unchanged (recursing into nested
//!   objects/arrays, which may embed expressions at any depth)
//! - `var` -> looked up in the context's variable table; a `?`-suffixed
//!   segment null-coalesces instead of failing
//! - `nunjucks` -> rendered against the sigil-less template table
//! - `pipeline` -> NOT resolved; passed through still wrapped so
//!   control-flow bricks can run it themselves with narrowed context
//! - `defer` -> passed through still wrapped; consuming bricks unwrap one
//!   level via [`resolve_deferred`] when they actually need the value

use serde_json::{Map, Value};

use crate::models::expression::{is_expression, Expression};
use crate::models::{BrickPosition, ExecutionContext};
use crate::{BrickRuntimeError, Result};

/// Resolve a full config map into the argument object for one step.
///
/// `position` is the step's position; entry errors are attributed to
/// `position.config.<key>`.
pub fn resolve_config(
    config: &Map<String, Value>,
    ctxt: &ExecutionContext,
    position: &BrickPosition,
) -> Result<Value> {
    let base = position.push_field("config");
    let mut resolved = Map::new();
    for (key, value) in config {
        resolved.insert(key.clone(), resolve_value(value, ctxt, &base.push_field(key))?);
    }
    Ok(Value::Object(resolved))
}

/// Resolve a single config value.
pub fn resolve_value(
    value: &Value,
    ctxt: &ExecutionContext,
    position: &BrickPosition,
) -> Result<Value> {
    if is_expression(value) {
        let expression = Expression::from_value(value).map_err(|reason| {
            BrickRuntimeError::MalformedExpression {
                position: position.clone(),
                reason,
            }
        })?;
        return match expression {
            Expression::Var(path) => resolve_var_path(&path, &ctxt.variable_table()),
            Expression::Nunjucks(template) => {
                Ok(Value::String(render_template(&template, ctxt)?))
            }
            // Still-wrapped: the consuming brick drives these
            Expression::Pipeline(_) | Expression::Defer(_) => Ok(value.clone()),
        };
    }

    match value {
        Value::Object(entries) => {
            let mut resolved = Map::new();
            for (key, entry) in entries {
                resolved.insert(
                    key.clone(),
                    resolve_value(entry, ctxt, &position.push_field(key))?,
                );
            }
            Ok(Value::Object(resolved))
        }
        Value::Array(items) => {
            let mut resolved = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                resolved.push(resolve_value(item, ctxt, &position.push_index(index))?);
            }
            Ok(Value::Array(resolved))
        }
        scalar => Ok(scalar.clone()),
    }
}

/// Resolve a `var` path like `@input.rows.0.name` against a variable
/// table.
///
/// The first segment (including the `@` sigil) names the variable; the
/// remaining segments traverse objects by key and arrays by index. A
/// segment with a trailing `?` resolves the whole path to `null` when the
/// segment cannot be read; without it, an untraversable segment is a
/// path-resolution error naming the segment and the full path.
pub fn resolve_var_path(path: &str, table: &Map<String, Value>) -> Result<Value> {
    let mut current = Value::Object(table.clone());
    for raw_segment in path.split('.') {
        let (segment, coalesce) = match raw_segment.strip_suffix('?') {
            Some(stripped) => (stripped, true),
            None => (raw_segment, false),
        };

        let next = match &current {
            Value::Object(entries) => entries.get(segment).cloned(),
            Value::Array(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get(index))
                .cloned(),
            _ => None,
        };

        match next {
            Some(value) => current = value,
            None if coalesce => return Ok(Value::Null),
            None => {
                return Err(BrickRuntimeError::PathResolution {
                    path: path.to_string(),
                    segment: segment.to_string(),
                })
            }
        }
    }
    Ok(current)
}

/// Render a template expression against the context.
///
/// Template identifiers cannot start with `@`, so templates address the
/// variable table without the sigil: `{{ input.x }}`, `{{ options.mode }}`,
/// `{{ myOutputKey.field }}`. Escaping is the template engine's concern,
/// not the resolver's.
pub fn render_template(template: &str, ctxt: &ExecutionContext) -> Result<String> {
    let env = minijinja::Environment::new();
    env.render_str(
        template,
        minijinja::value::Value::from_serialize(&ctxt.template_table()),
    )
    .map_err(|error| BrickRuntimeError::Template(error.to_string()))
}

/// Unwrap a `defer` expression one level and resolve its payload now.
///
/// Bricks that accept deferred sub-trees (e.g. per-element templates in a
/// loop) call this once per logical use, with whatever narrowed context
/// they built. Non-deferred values resolve as usual, so callers do not
/// need to branch.
pub fn resolve_deferred(
    value: &Value,
    ctxt: &ExecutionContext,
    position: &BrickPosition,
) -> Result<Value> {
    if crate::models::is_defer_expression(value) {
        let expression = Expression::from_value(value).map_err(|reason| {
            BrickRuntimeError::MalformedExpression {
                position: position.clone(),
                reason,
            }
        })?;
        match expression {
            Expression::Defer(inner) => {
                resolve_value(&inner, ctxt, &position.push_field("__value__"))
            }
            _ => unreachable!("guarded by is_defer_expression"),
        }
    } else {
        resolve_value(value, ctxt, position)
    }
}

/// Condition coercion for `if` gates.
///
/// Falsy: `null`, `false`, `0`, the empty string, `"0"`, and `"false"`
/// (case-insensitive). Everything else - including empty arrays and
/// objects - is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map(|n| n != 0.0).unwrap_or(true),
        Value::String(text) => {
            !(text.is_empty() || text == "0" || text.eq_ignore_ascii_case("false"))
        }
        Value::Array(_) | Value::Object(_) => true,
    }
}
