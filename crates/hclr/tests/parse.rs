//! End to end behaviour of [hclr::Parser]

use hclr::{Map, Parser, Value};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Register an `echo` data lookup that returns its properties and counts its calls
fn counting_echo(parser: &mut Parser) -> Arc<AtomicUsize> {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    parser.register_data_lookup("echo", move |properties| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(properties.clone())
    });
    calls
}

#[test]
fn literals() {
    let document = Parser::new()
        .parse("a = \"x\"\nb = 5\nc = true\nd = null\n")
        .unwrap();

    let expected: Map = [
        ("a".to_string(), Value::from("x")),
        ("b".to_string(), Value::Number(5.0)),
        ("c".to_string(), Value::Bool(true)),
        ("d".to_string(), Value::Null),
    ]
    .into_iter()
    .collect();
    assert_eq!(document, expected);
}

#[test]
fn repeated_blocks() {
    let parser = Parser::new();
    let block = "resource \"x\" \"y\" {\n  n = 1\n}\n";

    let twice = parser.parse(&block.repeat(2)).unwrap();
    let instances = Value::Map(twice);
    assert_eq!(
        instances.pointer(["resource", "x", "y"]).and_then(Value::as_list).map(Vec::len),
        Some(2)
    );

    let thrice = Value::Map(parser.parse(&block.repeat(3)).unwrap());
    assert_eq!(
        thrice.pointer(["resource", "x", "y"]).and_then(Value::as_list).map(Vec::len),
        Some(3)
    );
}

#[test]
fn ternary_skips_the_other_branch() {
    let mut parser = Parser::new();
    let calls = counting_echo(&mut parser);

    let document = parser
        .parse(
            r#"
            data "echo" "skipped" {
              value = "no"
            }
            data "echo" "taken" {
              value = "yes"
            }
            result = false ? data.echo.skipped.value : data.echo.taken.value
            "#,
        )
        .unwrap();

    assert_eq!(document.get("result"), Some(&Value::from("yes")));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn no_operator_precedence() {
    let document = Parser::new().parse("x = 1 + 2 * 3").unwrap();
    assert_eq!(document.get("x"), Some(&Value::Number(9.0)));
}

#[test]
fn variable_defaults() {
    let source = r#"
        variable "region" {
          default = "eu"
        }
        region = var.region
    "#;

    let document = Parser::new().parse(source).unwrap();
    assert_eq!(document.get("region"), Some(&Value::from("eu")));

    let mut parser = Parser::new();
    parser.set_variable("region", "us");
    let document = parser.parse(source).unwrap();
    assert_eq!(document.get("region"), Some(&Value::from("us")));
}

#[test]
fn namespace_resolution() {
    let mut parser = Parser::new();
    parser.set_variable("who", "var");
    counting_echo(&mut parser);

    let document = parser
        .parse(
            r#"
            locals {
              who = "local"
            }
            data "echo" "me" {
              who = "data"
            }
            settings {
              who = "document"
            }
            from_local    = local.who
            from_var      = var.who
            from_data     = data.echo.me.who
            from_document = settings.who
            "#,
        )
        .unwrap();

    for (key, expected) in [
        ("from_local", "local"),
        ("from_var", "var"),
        ("from_data", "data"),
        ("from_document", "document"),
    ] {
        assert_eq!(document.get(key), Some(&Value::from(expected)), "{key}");
    }
}

#[test]
fn unknown_function_is_null() {
    let document = Parser::new()
        .parse(
            r#"
            x = no_such_function(1, 2)
            y = "a" + nope(1)
            z = 1 + 1
            "#,
        )
        .unwrap();

    assert_eq!(document.get("x"), Some(&Value::Null));
    assert_eq!(document.get("y"), Some(&Value::from("a")));
    assert_eq!(document.get("z"), Some(&Value::Number(2.0)));
}

#[test]
fn attributes_are_evaluated_once() {
    let mut parser = Parser::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    parser.register_function("tick", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Value::Number(1.0))
    });

    // every local references the next one twice
    let mut source = String::from("locals {\n");
    for level in 0..16 {
        source.push_str(&format!("  a{level} = local.a{next} + local.a{next}\n", next = level + 1));
    }
    source.push_str("  a16 = tick()\n}\nfirst = second + second\nsecond = tick()\n");

    let document = Value::Map(parser.parse(&source).unwrap());
    assert_eq!(document.pointer(["locals", "a0"]), Some(&Value::Number(65536.0)));
    assert_eq!(document.pointer(["first"]), Some(&Value::Number(2.0)));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn data_lookups_are_cached() {
    let mut parser = Parser::new();
    let calls = counting_echo(&mut parser);

    let document = parser
        .parse(
            r#"
            data "echo" "one" {
              id = 1
            }
            first  = data.echo.one.id
            second = data.echo.one.id + 1
            "#,
        )
        .unwrap();

    assert_eq!(document.get("first"), Some(&Value::Number(1.0)));
    assert_eq!(document.get("second"), Some(&Value::Number(2.0)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn cache_is_per_parse() {
    let mut parser = Parser::new();
    let calls = counting_echo(&mut parser);
    let source = "data \"echo\" \"one\" {}\nx = data.echo.one\n";

    parser.parse(source).unwrap();
    parser.parse(source).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn unresolved_references_are_kept() {
    let document = Parser::new().parse("x = local.missing").unwrap();
    let x = document.get("x").unwrap();

    assert!(x.is_unresolved());
    assert_eq!(serde_json::to_string(x).unwrap(), r#""${local.missing}""#);
}

#[test]
fn cyclic_references_fail() {
    let error = Parser::new()
        .parse("locals {\n  a = local.b\n  b = local.a\n}\n")
        .unwrap_err();
    assert!(matches!(error, hclr::Error::CyclicReference(_)));
}

#[test]
fn blocks_through_values_fail() {
    let error = Parser::new().parse("a = 1\na \"b\" {}\n").unwrap_err();
    assert!(matches!(error, hclr::Error::BlockTraversesValue { ref path, .. } if path == "a"));
    assert!(error
        .to_string()
        .starts_with("Block scope `a` traverses an object value"));
}
