use super::{list_arg, number_arg, string_arg, FunctionRegistry};
use crate::value::Value;

pub(super) fn register(registry: &mut FunctionRegistry) {
    registry.register("upper", |arguments| {
        Ok(match arguments.first() {
            Some(Value::Null) | None => Value::Null,
            Some(value) => value.to_string().to_uppercase().into(),
        })
    });

    registry.register("lower", |arguments| {
        Ok(match arguments.first() {
            Some(Value::Null) | None => Value::Null,
            Some(value) => value.to_string().to_lowercase().into(),
        })
    });

    registry.register("format", |arguments| {
        Ok(string_arg(arguments, 0)
            .map(|spec| format(spec, &arguments[1..]))
            .into())
    });

    registry.register("trimspace", |arguments| {
        Ok(string_arg(arguments, 0).map(str::trim).into())
    });

    registry.register("trim", |arguments| {
        let (Some(value), Some(cutset)) = (string_arg(arguments, 0), string_arg(arguments, 1))
        else {
            return Ok(Value::Null);
        };
        Ok(value.trim_matches(|c: char| cutset.contains(c)).into())
    });

    registry.register("trimprefix", |arguments| {
        let (Some(value), Some(prefix)) = (string_arg(arguments, 0), string_arg(arguments, 1))
        else {
            return Ok(Value::Null);
        };
        Ok(value.strip_prefix(prefix).unwrap_or(value).into())
    });

    registry.register("trimsuffix", |arguments| {
        let (Some(value), Some(suffix)) = (string_arg(arguments, 0), string_arg(arguments, 1))
        else {
            return Ok(Value::Null);
        };
        Ok(value.strip_suffix(suffix).unwrap_or(value).into())
    });

    registry.register("strrev", |arguments| {
        Ok(string_arg(arguments, 0)
            .map(|value| value.chars().rev().collect::<String>())
            .into())
    });

    registry.register("regexall", |arguments| {
        let Some(pattern) = string_arg(arguments, 0) else {
            return Ok(Value::Null);
        };
        let Ok(regex) = regex::Regex::new(pattern) else {
            tracing::debug!(pattern, "invalid regular expression");
            return Ok(Value::Null);
        };
        let haystack = string_arg(arguments, 1).unwrap_or_default();
        Ok(regex
            .find_iter(haystack)
            .map(|found| Value::from(found.as_str()))
            .collect::<Vec<_>>()
            .into())
    });

    registry.register("split", |arguments| {
        let (Some(separator), Some(value)) = (string_arg(arguments, 0), string_arg(arguments, 1))
        else {
            return Ok(Value::Null);
        };
        Ok(value.split(separator).map(Value::from).collect::<Vec<_>>().into())
    });

    registry.register("join", |arguments| {
        let (Some(separator), Some(list)) = (string_arg(arguments, 0), list_arg(arguments, 1))
        else {
            return Ok(Value::Null);
        };
        let parts: Vec<String> = list.iter().map(ToString::to_string).collect();
        Ok(parts.join(separator).into())
    });

    registry.register("startswith", |arguments| {
        let (Some(value), Some(prefix)) = (string_arg(arguments, 0), string_arg(arguments, 1))
        else {
            return Ok(Value::Null);
        };
        Ok(value.starts_with(prefix).into())
    });

    registry.register("endswith", |arguments| {
        let (Some(value), Some(suffix)) = (string_arg(arguments, 0), string_arg(arguments, 1))
        else {
            return Ok(Value::Null);
        };
        Ok(value.ends_with(suffix).into())
    });

    registry.register("substr", |arguments| {
        let (Some(value), Some(offset), Some(length)) = (
            string_arg(arguments, 0),
            number_arg(arguments, 1),
            number_arg(arguments, 2),
        ) else {
            return Ok(Value::Null);
        };
        Ok(substr(value, offset as i64, length as i64).into())
    });

    registry.register("replace", |arguments| {
        let (Some(value), Some(search), Some(replacement)) = (
            string_arg(arguments, 0),
            string_arg(arguments, 1),
            string_arg(arguments, 2),
        ) else {
            return Ok(Value::Null);
        };
        Ok(value.replace(search, replacement).into())
    });

    registry.register("try", |arguments| {
        Ok(first_present(arguments).cloned().unwrap_or_default())
    });

    registry.register("coalesce", |arguments| {
        Ok(arguments
            .iter()
            .find(|argument| !argument.is_null() && argument.as_str() != Some(""))
            .cloned()
            .unwrap_or_default())
    });

    registry.register("uuid", |_| Ok(uuid::Uuid::new_v4().to_string().into()));

    registry.register("timestamp", |_| {
        Ok(chrono::Utc::now()
            .to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
            .into())
    });
}

fn first_present(arguments: &[Value]) -> Option<&Value> {
    arguments
        .iter()
        .find(|argument| !argument.is_null() && !argument.is_unresolved())
}

/// Character based substring; a negative offset counts from the end, a negative length means "until the end"
fn substr(value: &str, offset: i64, length: i64) -> String {
    let chars: Vec<char> = value.chars().collect();
    let count = chars.len() as i64;

    let start = if offset < 0 { count + offset } else { offset }.clamp(0, count);
    let end = if length < 0 {
        count
    } else {
        (start + length).min(count)
    };

    chars[start as usize..end as usize].iter().collect()
}

/// printf style formatting with the verbs `%s %d %v %f %q` and `%%`
fn format(spec: &str, arguments: &[Value]) -> String {
    let mut output = String::with_capacity(spec.len());
    let mut arguments = arguments.iter();
    let mut chars = spec.chars();

    while let Some(c) = chars.next() {
        if c != '%' {
            output.push(c);
            continue;
        }

        match chars.next() {
            Some('%') => output.push('%'),
            Some(verb @ ('s' | 'v' | 'd' | 'f' | 'q')) => {
                let Some(argument) = arguments.next() else {
                    output.push('%');
                    output.push(verb);
                    continue;
                };
                match (verb, argument) {
                    ('d', Value::Number(number)) => output.push_str(&(number.trunc() as i64).to_string()),
                    ('f', Value::Number(number)) => output.push_str(&format!("{number:.6}")),
                    ('q', value) => output.push_str(&format!("{:?}", value.to_string())),
                    (_, value) => output.push_str(&value.to_string()),
                }
            }
            Some(other) => {
                output.push('%');
                output.push(other);
            }
            None => output.push('%'),
        }
    }

    output
}

#[cfg(test)]
mod test {
    use crate::functions::test::call;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    #[test]
    fn case() {
        assert_eq!(call("upper", vec!["abc".into()]), Value::from("ABC"));
        assert_eq!(call("lower", vec!["AbC".into()]), Value::from("abc"));
        assert_eq!(call("upper", vec![]), Value::Null);
    }

    #[test]
    fn format() {
        assert_eq!(
            call("format", vec!["%s-%d (%q) %%".into(), "web".into(), 3.0.into(), "x".into()]),
            Value::from("web-3 (\"x\") %")
        );
        assert_eq!(call("format", vec![Value::Null]), Value::Null);
    }

    #[test]
    fn trimming() {
        assert_eq!(call("trimspace", vec!["  a b \n".into()]), Value::from("a b"));
        assert_eq!(call("trim", vec!["?!hello?!".into(), "!?".into()]), Value::from("hello"));
        assert_eq!(call("trimprefix", vec!["helloworld".into(), "hello".into()]), Value::from("world"));
        assert_eq!(call("trimsuffix", vec!["helloworld".into(), "world".into()]), Value::from("hello"));
    }

    #[test]
    fn split_and_join() {
        let parts = call("split", vec![",".into(), "a,b,c".into()]);
        assert_eq!(parts, Value::from(vec!["a", "b", "c"]));
        assert_eq!(call("join", vec!["-".into(), parts]), Value::from("a-b-c"));
        assert_eq!(call("split", vec![",".into()]), Value::Null);
    }

    #[test]
    fn substr() {
        assert_eq!(call("substr", vec!["hello world".into(), 1.0.into(), 4.0.into()]), Value::from("ello"));
        assert_eq!(call("substr", vec!["hello world".into(), (-5.0).into(), (-1.0).into()]), Value::from("world"));
        assert_eq!(call("substr", vec!["abc".into(), 1.0.into(), 10.0.into()]), Value::from("bc"));
    }

    #[test]
    fn regexall() {
        assert_eq!(
            call("regexall", vec!["[a-z]+".into(), "1234abcd5678efgh9".into()]),
            Value::from(vec!["abcd", "efgh"])
        );
        assert_eq!(call("regexall", vec!["(".into(), "x".into()]), Value::Null);
    }

    #[test]
    fn misc() {
        assert_eq!(call("strrev", vec!["abc".into()]), Value::from("cba"));
        assert_eq!(call("replace", vec!["a-b-c".into(), "-".into(), "+".into()]), Value::from("a+b+c"));
        assert_eq!(call("startswith", vec!["hello".into(), "he".into()]), Value::Bool(true));
        assert_eq!(call("endswith", vec!["hello".into(), "he".into()]), Value::Bool(false));
        assert_eq!(call("try", vec![Value::Null, "b".into()]), Value::from("b"));
        assert_eq!(call("coalesce", vec!["".into(), Value::Null, "c".into()]), Value::from("c"));
        assert_eq!(call("uuid", vec![]).as_str().map(str::len), Some(36));
        assert!(call("timestamp", vec![]).as_str().is_some_and(|ts| ts.ends_with('Z')));
    }
}
