use super::{list_arg, number_arg, string_arg, FunctionRegistry};
use crate::value::{Map, Value};

pub(super) fn register(registry: &mut FunctionRegistry) {
    registry.register("contains", |arguments| {
        let (Some(list), Some(needle)) = (list_arg(arguments, 0), arguments.get(1)) else {
            return Ok(Value::Null);
        };
        Ok(list.contains(needle).into())
    });

    registry.register("element", |arguments| {
        let (Some(list), Some(index)) = (list_arg(arguments, 0), number_arg(arguments, 1)) else {
            return Ok(Value::Null);
        };
        if list.is_empty() || index < 0.0 {
            return Ok(Value::Null);
        }
        // wraps around like terraform does
        Ok(list[index as usize % list.len()].clone())
    });

    registry.register("length", |arguments| {
        Ok(match arguments.first() {
            Some(Value::List(list)) => Value::from(list.len() as f64),
            Some(Value::Map(map)) => Value::from(map.len() as f64),
            Some(Value::String(text)) => Value::from(text.chars().count() as f64),
            _ => Value::Null,
        })
    });

    registry.register("index", |arguments| {
        let (Some(list), Some(needle)) = (list_arg(arguments, 0), arguments.get(1)) else {
            return Ok(Value::Null);
        };
        Ok(list
            .iter()
            .position(|element| element == needle)
            .map(|position| position as f64)
            .into())
    });

    registry.register("one", |arguments| {
        Ok(list_arg(arguments, 0)
            .and_then(|list| list.first())
            .cloned()
            .unwrap_or_default())
    });

    registry.register("alltrue", |arguments| {
        Ok(list_arg(arguments, 0)
            .map(|list| list.iter().all(is_true))
            .unwrap_or(true)
            .into())
    });

    registry.register("anytrue", |arguments| {
        Ok(list_arg(arguments, 0)
            .map(|list| list.iter().any(is_true))
            .unwrap_or(false)
            .into())
    });

    registry.register("lookup", |arguments| {
        let (Some(Value::Map(map)), Some(key)) = (arguments.first(), string_arg(arguments, 1))
        else {
            return Ok(Value::Null);
        };
        Ok(match map.get(key) {
            Some(value) if !value.is_null() => value.clone(),
            _ => arguments.get(2).cloned().unwrap_or_default(),
        })
    });

    registry.register("flatten", |arguments| {
        let Some(list) = list_arg(arguments, 0) else {
            return Ok(Value::Null);
        };
        let mut flattened = vec![];
        flatten(&mut flattened, list);
        Ok(Value::List(flattened))
    });

    registry.register("keys", |arguments| {
        Ok(match arguments.first() {
            Some(Value::Map(map)) => map.keys().map(|key| Value::from(key.as_str())).collect::<Vec<_>>().into(),
            _ => Value::Null,
        })
    });

    registry.register("values", |arguments| {
        Ok(match arguments.first() {
            Some(Value::Map(map)) => Value::List(map.values().cloned().collect()),
            _ => Value::Null,
        })
    });

    registry.register("merge", |arguments| {
        let mut merged = Map::new();
        for argument in arguments {
            match argument {
                Value::Map(map) => merged.extend(map.iter().map(|(k, v)| (k.clone(), v.clone()))),
                Value::Null => {}
                _ => return Ok(Value::Null),
            }
        }
        Ok(Value::Map(merged))
    });

    registry.register("concat", |arguments| {
        let mut concatenated = vec![];
        for argument in arguments {
            let Value::List(list) = argument else {
                return Ok(Value::Null);
            };
            concatenated.extend(list.iter().cloned());
        }
        Ok(Value::List(concatenated))
    });
}

/// `true` or the string `"true"`
fn is_true(value: &Value) -> bool {
    matches!(value, Value::Bool(true)) || value.as_str() == Some("true")
}

fn flatten(flattened: &mut Vec<Value>, elements: &[Value]) {
    for element in elements {
        match element {
            Value::List(nested) => flatten(flattened, nested),
            other => flattened.push(other.clone()),
        }
    }
}
