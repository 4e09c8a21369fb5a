use super::{string_arg, FunctionRegistry};
use crate::value::Value;
use anyhow::Context;
use base64::{engine::general_purpose::STANDARD, Engine};

pub(super) fn register(registry: &mut FunctionRegistry) {
    registry.register("jsonencode", |arguments| {
        let Some(value) = arguments.first() else {
            return Ok(Value::Null);
        };
        Ok(serde_json::to_string(value).ok().into())
    });

    registry.register("jsondecode", |arguments| {
        let Some(text) = string_arg(arguments, 0) else {
            return Ok(Value::Null);
        };
        match serde_json::from_str::<serde_json::Value>(text) {
            Ok(json) => Ok(json.into()),
            Err(error) => {
                tracing::debug!(%error, "jsondecode: invalid json");
                Ok(Value::Null)
            }
        }
    });

    registry.register("base64encode", |arguments| {
        Ok(string_arg(arguments, 0)
            .map(|text| STANDARD.encode(text.as_bytes()))
            .into())
    });

    registry.register("base64decode", |arguments| {
        let Some(text) = string_arg(arguments, 0) else {
            return Ok(Value::Null);
        };
        let bytes = STANDARD
            .decode(text)
            .context("base64decode: input is not valid base64")?;
        Ok(String::from_utf8_lossy(&bytes).into_owned().into())
    });

    registry.register("textencodebase64", |arguments| {
        let (Some(text), Some(charset)) = (string_arg(arguments, 0), string_arg(arguments, 1)) else {
            return Ok(Value::Null);
        };
        if !is_utf8(charset) {
            tracing::debug!(charset, "textencodebase64: unsupported charset");
            return Ok(Value::Null);
        }
        Ok(STANDARD.encode(text.as_bytes()).into())
    });

    registry.register("textdecodebase64", |arguments| {
        let (Some(text), Some(charset)) = (string_arg(arguments, 0), string_arg(arguments, 1)) else {
            return Ok(Value::Null);
        };
        if !is_utf8(charset) {
            tracing::debug!(charset, "textdecodebase64: unsupported charset");
            return Ok(Value::Null);
        }
        Ok(STANDARD
            .decode(text)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .into())
    });

    registry.register("tostring", |arguments| {
        Ok(match arguments.first() {
            Some(value @ (Value::String(_) | Value::Number(_) | Value::Bool(_))) => {
                value.to_string().into()
            }
            _ => Value::Null,
        })
    });
}

/// Only UTF-8 text is supported
fn is_utf8(charset: &str) -> bool {
    matches!(charset.to_ascii_lowercase().as_str(), "utf-8" | "utf8")
}
