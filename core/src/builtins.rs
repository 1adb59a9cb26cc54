//! The builtin table installed in every root environment.
//!
//! Arithmetic folds left to right. Comparisons chain across all of their
//! arguments. The list functions operate on pairs ending in `nil` and reject
//! improper lists.

use crate::environment::Environment;
use crate::error::{CarlaeError, Result};
use crate::interner::Name;
use crate::interpreter::apply;
use crate::language::{Builtin, NativeFn, Value, pair};
use crate::numeric::Number;

const BUILTINS: &[(&str, NativeFn)] = &[
    ("+", add),
    ("-", subtract),
    ("*", multiply),
    ("/", divide),
    ("=?", equal),
    (">", greater),
    (">=", greater_equal),
    ("<", less),
    ("<=", less_equal),
    ("not", not),
    ("pair", make_pair),
    ("head", head),
    ("tail", tail),
    ("list", list),
    ("list?", is_list),
    ("length", length),
    ("nth", nth),
    ("get-nth", get_nth),
    ("concat", concat),
    ("map", map),
    ("filter", filter),
    ("reduce", reduce),
    ("begin", begin),
];

/// Install the builtin functions and constants into `env`.
pub fn register_builtins(env: &Environment) {
    for &(name, func) in BUILTINS {
        env.define(Name::new(name), Value::Builtin(Builtin { name, func }));
    }
    env.define(Name::new("@t"), Value::Bool(true));
    env.define(Name::new("@f"), Value::Bool(false));
}

// ============================================================================
// Argument Helpers
// ============================================================================

pub fn check_arity_exact(name: &str, args: &[Value], expected: usize) -> Result<()> {
    if args.len() != expected {
        return Err(CarlaeError::arity(name, expected, args.len()));
    }
    Ok(())
}

fn check_arity_min(name: &str, args: &[Value], min: usize) -> Result<()> {
    if args.len() < min {
        return Err(CarlaeError::arity(name, format!("at least {min}"), args.len()));
    }
    Ok(())
}

fn numbers(name: &str, args: &[Value]) -> Result<Vec<Number>> {
    args.iter().map(|arg| arg.as_number(name)).collect()
}

fn callable<'a>(name: &str, value: &'a Value) -> Result<&'a Value> {
    if value.is_callable() {
        Ok(value)
    } else {
        Err(CarlaeError::evaluation(format!(
            "{name}: expected a function, got {}",
            value.type_name()
        )))
    }
}

fn proper_list(name: &str, value: &Value) -> Result<Vec<Value>> {
    value
        .list_to_vec()
        .map_err(|_| CarlaeError::evaluation(format!("{name}: expected a list, got {value}")))
}

// ============================================================================
// Arithmetic
// ============================================================================

fn add(args: &[Value], _env: &Environment) -> Result<Value> {
    let nums = numbers("+", args)?;
    Ok(nums.iter().fold(Number::Int(0), |acc, n| acc.add(n)).into())
}

fn subtract(args: &[Value], _env: &Environment) -> Result<Value> {
    check_arity_min("-", args, 1)?;
    let nums = numbers("-", args)?;
    if let [only] = nums.as_slice() {
        return Ok(only.neg().into());
    }
    Ok(nums[1..].iter().fold(nums[0], |acc, n| acc.sub(n)).into())
}

fn multiply(args: &[Value], _env: &Environment) -> Result<Value> {
    let nums = numbers("*", args)?;
    Ok(nums.iter().fold(Number::Int(1), |acc, n| acc.mul(n)).into())
}

fn divide(args: &[Value], _env: &Environment) -> Result<Value> {
    check_arity_min("/", args, 1)?;
    let nums = numbers("/", args)?;
    if let [only] = nums.as_slice() {
        return Ok(Number::Int(1).div(only)?.into());
    }
    let mut quotient = nums[0];
    for n in &nums[1..] {
        quotient = quotient.div(n)?;
    }
    Ok(quotient.into())
}

// ============================================================================
// Comparison
// ============================================================================

fn equal(args: &[Value], _env: &Environment) -> Result<Value> {
    Ok(args.windows(2).all(|w| w[0] == w[1]).into())
}

fn chain(name: &str, args: &[Value], holds: fn(&Number, &Number) -> bool) -> Result<Value> {
    let nums = numbers(name, args)?;
    Ok(nums.windows(2).all(|w| holds(&w[0], &w[1])).into())
}

fn greater(args: &[Value], _env: &Environment) -> Result<Value> {
    chain(">", args, |a, b| a > b)
}

fn greater_equal(args: &[Value], _env: &Environment) -> Result<Value> {
    chain(">=", args, |a, b| a >= b)
}

fn less(args: &[Value], _env: &Environment) -> Result<Value> {
    chain("<", args, |a, b| a < b)
}

fn less_equal(args: &[Value], _env: &Environment) -> Result<Value> {
    chain("<=", args, |a, b| a <= b)
}

fn not(args: &[Value], _env: &Environment) -> Result<Value> {
    check_arity_exact("not", args, 1)?;
    Ok((!args[0].is_truthy()).into())
}

// ============================================================================
// Pairs and Lists
// ============================================================================

fn make_pair(args: &[Value], _env: &Environment) -> Result<Value> {
    check_arity_exact("pair", args, 2)?;
    Ok(pair(args[0].clone(), args[1].clone()))
}

fn head(args: &[Value], _env: &Environment) -> Result<Value> {
    check_arity_exact("head", args, 1)?;
    Ok(args[0].as_pair("head")?.head())
}

fn tail(args: &[Value], _env: &Environment) -> Result<Value> {
    check_arity_exact("tail", args, 1)?;
    Ok(args[0].as_pair("tail")?.tail())
}

fn list(args: &[Value], _env: &Environment) -> Result<Value> {
    Ok(Value::from_vec(args.to_vec()))
}

fn is_list(args: &[Value], _env: &Environment) -> Result<Value> {
    check_arity_exact("list?", args, 1)?;
    Ok(args[0].is_list().into())
}

fn length(args: &[Value], _env: &Environment) -> Result<Value> {
    check_arity_exact("length", args, 1)?;
    let items = proper_list("length", &args[0])?;
    Ok(Value::int(items.len() as i64))
}

/// Walk `index` tail steps from `list`, returning the pair reached.
fn cell_at(name: &str, list: &Value, index: &Value) -> Result<Value> {
    let steps = index.as_number(name)?.as_index().ok_or_else(|| {
        CarlaeError::evaluation(format!("{name}: index must be a non-negative integer"))
    })?;
    let mut current = list.clone();
    for _ in 0..steps {
        let next = current.as_pair(name)?.tail();
        current = next;
    }
    current.as_pair(name).map_err(|_| {
        CarlaeError::evaluation(format!("{name}: index {steps} is out of range"))
    })?;
    Ok(current)
}

fn nth(args: &[Value], _env: &Environment) -> Result<Value> {
    check_arity_exact("nth", args, 2)?;
    let cell = cell_at("nth", &args[0], &args[1])?;
    Ok(cell.as_pair("nth")?.head())
}

fn get_nth(args: &[Value], _env: &Environment) -> Result<Value> {
    check_arity_exact("get-nth", args, 2)?;
    cell_at("get-nth", &args[0], &args[1])
}

/// Join lists end to end. Every argument but the last is copied; the last
/// becomes the shared tail of the result.
fn concat(args: &[Value], _env: &Environment) -> Result<Value> {
    let mut items = Vec::new();
    for list in args {
        items.extend(proper_list("concat", list)?);
    }
    Ok(Value::from_vec(items))
}

fn map(args: &[Value], env: &Environment) -> Result<Value> {
    check_arity_exact("map", args, 2)?;
    let func = callable("map", &args[0])?;
    let items = proper_list("map", &args[1])?;
    let mapped = items
        .into_iter()
        .map(|item| apply(func, &[item], env))
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::from_vec(mapped))
}

fn filter(args: &[Value], env: &Environment) -> Result<Value> {
    check_arity_exact("filter", args, 2)?;
    let func = callable("filter", &args[0])?;
    let mut kept = Vec::new();
    for item in proper_list("filter", &args[1])? {
        if apply(func, std::slice::from_ref(&item), env)?.is_truthy() {
            kept.push(item);
        }
    }
    Ok(Value::from_vec(kept))
}

fn reduce(args: &[Value], env: &Environment) -> Result<Value> {
    check_arity_exact("reduce", args, 3)?;
    let func = callable("reduce", &args[0])?;
    let items = proper_list("reduce", &args[1])?;
    items
        .into_iter()
        .try_fold(args[2].clone(), |acc, item| apply(func, &[acc, item], env))
}

fn begin(args: &[Value], _env: &Environment) -> Result<Value> {
    Ok(args.last().cloned().unwrap_or(Value::Nil))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::EvalLimits;

    fn env() -> Environment {
        let root = Environment::root(EvalLimits::default());
        register_builtins(&root);
        root.extend()
    }

    fn call(name: &str, args: &[Value]) -> Result<Value> {
        let env = env();
        let func = env.lookup(Name::new(name)).unwrap();
        apply(&func, args, &env)
    }

    fn ints(values: &[i64]) -> Value {
        Value::from_vec(values.iter().map(|n| Value::int(*n)).collect())
    }

    #[test]
    fn test_arithmetic_folds_left() {
        assert_eq!(call("+", &[]).unwrap(), Value::int(0));
        assert_eq!(call("*", &[]).unwrap(), Value::int(1));
        assert_eq!(
            call("-", &[Value::int(10), Value::int(3), Value::int(2)]).unwrap(),
            Value::int(5)
        );
        assert_eq!(call("-", &[Value::int(4)]).unwrap(), Value::int(-4));
        assert_eq!(
            call("/", &[Value::int(12), Value::int(2), Value::int(3)]).unwrap(),
            Value::int(2)
        );
        assert_eq!(
            call("/", &[Value::int(2)]).unwrap().to_string(),
            "0.5"
        );
        assert!(call("-", &[]).unwrap_err().is_evaluation());
        assert!(call("+", &[Value::int(1), Value::Nil]).unwrap_err().is_evaluation());
    }

    #[test]
    fn test_comparisons_chain() {
        let args = [Value::int(3), Value::int(2), Value::int(1)];
        assert_eq!(call(">", &args).unwrap(), Value::Bool(true));
        assert_eq!(call("<", &args).unwrap(), Value::Bool(false));
        assert_eq!(
            call(">=", &[Value::int(2), Value::int(2), Value::int(1)]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            call("=?", &[Value::int(2), Value::int(2), Value::int(2)]).unwrap(),
            Value::Bool(true)
        );
        assert!(call("<", &[Value::int(1), Value::Bool(true)]).is_err());
    }

    #[test]
    fn test_head_tail() {
        let p = call("pair", &[Value::int(1), Value::int(2)]).unwrap();
        assert_eq!(call("head", &[p.clone()]).unwrap(), Value::int(1));
        assert_eq!(call("tail", &[p]).unwrap(), Value::int(2));
        assert!(call("head", &[Value::int(5)]).unwrap_err().is_evaluation());
        assert!(call("pair", &[Value::int(5)]).unwrap_err().is_evaluation());
    }

    #[test]
    fn test_length_rejects_improper_lists() {
        assert_eq!(call("length", &[ints(&[1, 2, 3])]).unwrap(), Value::int(3));
        assert_eq!(call("length", &[Value::Nil]).unwrap(), Value::int(0));
        let improper = pair(Value::int(1), Value::int(2));
        assert!(call("length", &[improper]).unwrap_err().is_evaluation());
        assert!(call("length", &[Value::int(1)]).is_err());
    }

    #[test]
    fn test_nth_and_get_nth() {
        let list = ints(&[10, 20, 30]);
        assert_eq!(call("nth", &[list.clone(), Value::int(1)]).unwrap(), Value::int(20));
        let cell = call("get-nth", &[list.clone(), Value::int(2)]).unwrap();
        assert_eq!(cell.to_string(), "(30)");
        assert!(call("nth", &[list.clone(), Value::int(3)]).is_err());
        assert!(call("nth", &[list, Value::int(-1)]).is_err());
        assert!(call("nth", &[Value::Nil, Value::int(0)]).is_err());
    }

    #[test]
    fn test_concat_copies_every_list() {
        let first = ints(&[1, 2]);
        let last = ints(&[3]);
        let joined = call("concat", &[first.clone(), Value::Nil, last.clone()]).unwrap();
        assert_eq!(joined.to_string(), "(1 2 3)");
        let tail = call("get-nth", &[joined, Value::int(2)]).unwrap();
        assert_ne!(tail, last);

        let copy = call("concat", &[first.clone()]).unwrap();
        assert_eq!(copy.to_string(), "(1 2)");
        assert_ne!(copy, first);

        assert_eq!(call("concat", &[]).unwrap(), Value::Nil);
        let improper = pair(Value::int(1), Value::int(2));
        assert!(call("concat", &[improper, Value::Nil]).is_err());
        assert!(call("concat", &[ints(&[1]), Value::int(5)]).is_err());
    }

    #[test]
    fn test_begin_returns_last() {
        assert_eq!(call("begin", &[Value::int(1), Value::int(2)]).unwrap(), Value::int(2));
        assert_eq!(call("begin", &[]).unwrap(), Value::Nil);
    }

    #[test]
    fn test_list_predicates() {
        assert_eq!(call("list?", &[Value::Nil]).unwrap(), Value::Bool(true));
        assert_eq!(call("list?", &[ints(&[1])]).unwrap(), Value::Bool(true));
        assert_eq!(
            call("list?", &[pair(Value::int(1), Value::int(2))]).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(call("list?", &[Value::int(3)]).unwrap(), Value::Bool(false));
    }
}
