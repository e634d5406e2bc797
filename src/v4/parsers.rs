/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */
use crate::v4::errors::BynderError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// Parses `expires_in` which the token endpoint sends either as number or string
pub fn from_expires_in<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v: Option<Value> = Deserialize::deserialize(deserializer)?;
    Ok(match v {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

// Parses ids that may come back as numbers or strings into strings
pub fn from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v: Value = Deserialize::deserialize(deserializer)?;
    match v {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, found {}",
            other
        ))),
    }
}

// True when a poll status field carries at least one item
pub fn is_non_empty(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(_)) => true,
    }
}

/// Flattens a serializable filter struct into query/form pairs, skipping nulls
pub fn to_params<T: Serialize>(data: &T) -> Result<Vec<(String, String)>, BynderError> {
    let value = serde_json::to_value(data)?;
    let obj = match value {
        Value::Object(obj) => obj,
        Value::Null => return Ok(Vec::new()),
        _ => {
            return Err(BynderError::InvalidArgument(
                "Parameters must serialize to an object".to_string(),
            ));
        }
    };
    let mut params = Vec::with_capacity(obj.len());
    for (k, v) in obj {
        match v {
            Value::Null => (),
            Value::String(s) => params.push((k, s)),
            Value::Array(items) => {
                let joined = items
                    .iter()
                    .map(scalar_to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                params.push((k, joined));
            }
            other => params.push((k, scalar_to_string(&other))),
        }
    }
    Ok(params)
}

fn scalar_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
