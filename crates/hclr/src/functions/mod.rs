//! function registry
//!
//! Functions receive their already evaluated arguments. A call to a name that is not registered evaluates to
//! `null`, so documents using functions we do not know still parse.
//!
//! The built-ins mirror the common terraform functions. They are lenient: wrong argument counts or types return
//! `null` instead of an error.
mod collections;
mod encoding;
mod numeric;
mod strings;

use crate::value::Value;
use std::sync::Arc;

pub type Function = Arc<dyn Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync>;

#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: indexmap::IndexMap<String, Function>,
}

impl FunctionRegistry {
    /// Registry with all built-in functions
    pub fn with_builtins() -> Self {
        let mut registry = Self::default();
        strings::register(&mut registry);
        numeric::register(&mut registry);
        collections::register(&mut registry);
        encoding::register(&mut registry);
        registry
    }

    /// Add a function, replacing any existing function with the same name
    pub fn register<F>(&mut self, name: impl Into<String>, function: F)
    where
        F: Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(function));
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

/// Argument at `index` if it is a string
fn string_arg(arguments: &[Value], index: usize) -> Option<&str> {
    arguments.get(index).and_then(Value::as_str)
}

/// Argument at `index` if it is a number
fn number_arg(arguments: &[Value], index: usize) -> Option<f64> {
    arguments.get(index).and_then(Value::as_number)
}

/// Argument at `index` if it is a list
fn list_arg(arguments: &[Value], index: usize) -> Option<&Vec<Value>> {
    arguments.get(index).and_then(Value::as_list)
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Call a built-in function
    pub(crate) fn call(name: &str, arguments: Vec<Value>) -> Value {
        let registry = FunctionRegistry::with_builtins();
        let function = registry.get(name).expect("function must be registered");
        function(&arguments).expect("function must not fail")
    }

    #[test]
    fn register_replaces() {
        let mut registry = FunctionRegistry::with_builtins();
        registry.register("upper", |_| Ok(Value::from("replaced")));

        let upper = registry.get("upper").unwrap();
        assert_eq!(upper(&[Value::from("a")]).unwrap(), Value::from("replaced"));
    }

    #[test]
    fn empty_registry() {
        let registry = FunctionRegistry::default();
        assert!(!registry.contains("upper"));
        assert_eq!(registry.names().count(), 0);
    }
}
