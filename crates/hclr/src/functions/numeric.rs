use super::{number_arg, FunctionRegistry};
use crate::value::Value;

pub(super) fn register(registry: &mut FunctionRegistry) {
    registry.register("max", |arguments| {
        Ok(numbers(arguments).reduce(f64::max).into())
    });

    registry.register("min", |arguments| {
        Ok(numbers(arguments).reduce(f64::min).into())
    });

    registry.register("tonumber", |arguments| {
        Ok(match arguments.first() {
            Some(Value::Number(number)) => Value::Number(*number),
            Some(Value::String(text)) => text.trim().parse::<f64>().ok().into(),
            _ => Value::Null,
        })
    });

    registry.register("abs", |arguments| {
        Ok(number_arg(arguments, 0).map(f64::abs).into())
    });

    registry.register("ceil", |arguments| {
        Ok(number_arg(arguments, 0).map(f64::ceil).into())
    });

    registry.register("floor", |arguments| {
        Ok(number_arg(arguments, 0).map(f64::floor).into())
    });
}

/// Numeric arguments, other values are ignored
fn numbers(arguments: &[Value]) -> impl Iterator<Item = f64> + '_ {
    arguments.iter().filter_map(Value::as_number)
}

#[cfg(test)]
mod test {
    use crate::functions::test::call;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    #[test]
    fn min_max() {
        let arguments = vec![3.0.into(), "skip".into(), 7.0.into(), (-1.0).into()];
        assert_eq!(call("max", arguments.clone()), Value::Number(7.0));
        assert_eq!(call("min", arguments), Value::Number(-1.0));
        assert_eq!(call("max", vec![]), Value::Null);
    }

    #[test]
    fn tonumber() {
        assert_eq!(call("tonumber", vec!["42".into()]), Value::Number(42.0));
        assert_eq!(call("tonumber", vec![1.5.into()]), Value::Number(1.5));
        assert_eq!(call("tonumber", vec!["nope".into()]), Value::Null);
    }

    #[test]
    fn rounding() {
        assert_eq!(call("abs", vec![(-2.5).into()]), Value::Number(2.5));
        assert_eq!(call("ceil", vec![2.1.into()]), Value::Number(3.0));
        assert_eq!(call("floor", vec![2.9.into()]), Value::Number(2.0));
        assert_eq!(call("floor", vec!["2.9".into()]), Value::Null);
    }
}
