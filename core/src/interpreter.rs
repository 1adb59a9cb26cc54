use std::cell::Cell;
use std::rc::Rc;

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::environment::{Environment, EvalLimits};
use crate::error::{CarlaeError, Result};
use crate::interner::Name;
use crate::language::{Function, Value};
use crate::parser::Expression;

// ============================================================================
// Special Forms
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpecialForm {
    Define,
    Function,
    If,
    And,
    Or,
    Let,
    Set,
    Del,
}

static SPECIAL_FORMS: Lazy<FxHashMap<Name, SpecialForm>> = Lazy::new(|| {
    [
        (":=", SpecialForm::Define),
        ("function", SpecialForm::Function),
        ("if", SpecialForm::If),
        ("and", SpecialForm::And),
        ("or", SpecialForm::Or),
        ("let", SpecialForm::Let),
        ("set!", SpecialForm::Set),
        ("del", SpecialForm::Del),
    ]
    .into_iter()
    .map(|(keyword, form)| (Name::new(keyword), form))
    .collect()
});

static NIL: Lazy<Name> = Lazy::new(|| Name::new("nil"));

impl SpecialForm {
    fn of(expr: &Expression) -> Option<SpecialForm> {
        expr.as_symbol()
            .and_then(|name| SPECIAL_FORMS.get(&name).copied())
    }
}

// ============================================================================
// Recursion Depth
// ============================================================================

// Below this much remaining stack, `evaluate` continues on a fresh segment.
const STACK_RED_ZONE: usize = 128 * 1024;
const STACK_SEGMENT: usize = 4 * 1024 * 1024;

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Counts one level of `evaluate` nesting for as long as it is alive.
struct DepthGuard;

impl DepthGuard {
    fn enter(limits: EvalLimits) -> Result<DepthGuard> {
        DEPTH.with(|depth| {
            let current = depth.get();
            if current >= limits.max_depth {
                return Err(CarlaeError::evaluation(format!(
                    "maximum recursion depth exceeded ({})",
                    limits.max_depth
                )));
            }
            depth.set(current + 1);
            Ok(DepthGuard)
        })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

// ============================================================================
// Evaluator
// ============================================================================

pub fn evaluate(expr: &Expression, env: &Environment) -> Result<Value> {
    let _depth = DepthGuard::enter(env.limits())?;
    stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, || evaluate_inner(expr, env))
}

fn evaluate_inner(expr: &Expression, env: &Environment) -> Result<Value> {
    match expr {
        // Self-evaluating forms
        Expression::Number(n) => Ok(Value::Number(*n)),
        Expression::Symbol(name) if *name == *NIL => Ok(Value::Nil),

        // Symbol lookup
        Expression::Symbol(name) => env.lookup(*name),

        Expression::Compound(items) => {
            let Some((operator, operands)) = items.split_first() else {
                return Err(CarlaeError::evaluation("cannot evaluate an empty expression"));
            };

            if let Some(form) = SpecialForm::of(operator) {
                return eval_special(form, operands, env);
            }

            // Function application: operator first, then operands, left to right
            let func = evaluate(operator, env)?;
            let args = operands
                .iter()
                .map(|operand| evaluate(operand, env))
                .collect::<Result<Vec<_>>>()?;
            apply(&func, &args, env)
        }
    }
}

/// Apply a callable to already-evaluated arguments.
pub fn apply(func: &Value, args: &[Value], env: &Environment) -> Result<Value> {
    match func {
        Value::Builtin(builtin) => (builtin.func)(args, env),
        Value::Function(function) => call_function(function, args),
        other => Err(CarlaeError::evaluation(format!(
            "cannot apply non-function: {other}"
        ))),
    }
}

fn call_function(function: &Function, args: &[Value]) -> Result<Value> {
    if args.len() != function.params.len() {
        return Err(CarlaeError::arity(
            "function",
            function.params.len(),
            args.len(),
        ));
    }

    // The new frame hangs off the defining environment, not the caller's.
    let frame = function.env.extend();
    for (param, arg) in function.params.iter().zip(args) {
        frame.define(*param, arg.clone());
    }
    trace!(arity = args.len(), body = %function.body, "applying function");
    evaluate(&function.body, &frame)
}

fn eval_special(form: SpecialForm, operands: &[Expression], env: &Environment) -> Result<Value> {
    match form {
        SpecialForm::Define => eval_define(operands, env),
        SpecialForm::Function => eval_function(operands, env),
        SpecialForm::If => eval_if(operands, env),
        SpecialForm::And => {
            for operand in operands {
                if !evaluate(operand, env)?.is_truthy() {
                    return Ok(Value::Bool(false));
                }
            }
            Ok(Value::Bool(true))
        }
        SpecialForm::Or => {
            for operand in operands {
                if evaluate(operand, env)?.is_truthy() {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        SpecialForm::Let => eval_let(operands, env),
        SpecialForm::Set => {
            let [target, value_expr] = operands else {
                return Err(CarlaeError::evaluation("set!: expected (set! name expr)"));
            };
            let name = symbol("set!", target)?;
            let value = evaluate(value_expr, env)?;
            env.assign_existing(name, value.clone())?;
            Ok(value)
        }
        SpecialForm::Del => {
            let [target] = operands else {
                return Err(CarlaeError::evaluation("del: expected (del name)"));
            };
            env.remove_local(symbol("del", target)?)
        }
    }
}

fn symbol(form: &str, expr: &Expression) -> Result<Name> {
    let name = expr.as_symbol().ok_or_else(|| {
        CarlaeError::evaluation(format!("{form}: expected a name, got {expr}"))
    })?;
    bindable(form, name)
}

/// `nil` is a literal, never a variable.
fn bindable(form: &str, name: Name) -> Result<Name> {
    if name == *NIL {
        return Err(CarlaeError::evaluation(format!("{form}: cannot bind nil")));
    }
    Ok(name)
}

fn parameters(form: &str, expr: &Expression) -> Result<Vec<Name>> {
    let items = expr.as_compound().ok_or_else(|| {
        CarlaeError::evaluation(format!("{form}: expected a parameter list, got {expr}"))
    })?;
    items.iter().map(|item| symbol(form, item)).collect()
}

fn make_function(params: Vec<Name>, body: &Expression, env: &Environment) -> Value {
    Value::Function(Rc::new(Function {
        params,
        body: body.clone(),
        env: env.clone(),
    }))
}

fn eval_define(operands: &[Expression], env: &Environment) -> Result<Value> {
    let [target, body] = operands else {
        return Err(CarlaeError::evaluation(
            ":=: expected (:= name expr) or (:= (name params...) body)",
        ));
    };

    let (name, value) = match target {
        Expression::Symbol(name) => (bindable(":=", *name)?, evaluate(body, env)?),
        Expression::Compound(_) => {
            let mut signature = parameters(":=", target)?;
            if signature.is_empty() {
                return Err(CarlaeError::evaluation(":=: missing function name"));
            }
            let name = signature.remove(0);
            (name, make_function(signature, body, env))
        }
        Expression::Number(n) => {
            return Err(CarlaeError::evaluation(format!(
                ":=: cannot bind a number ({n})"
            )));
        }
    };

    env.define(name, value.clone());
    Ok(value)
}

fn eval_function(operands: &[Expression], env: &Environment) -> Result<Value> {
    let [params, body] = operands else {
        return Err(CarlaeError::evaluation(
            "function: expected (function (params...) body)",
        ));
    };
    Ok(make_function(parameters("function", params)?, body, env))
}

fn eval_if(operands: &[Expression], env: &Environment) -> Result<Value> {
    let [condition, consequent, alternative] = operands else {
        return Err(CarlaeError::evaluation(format!(
            "if: expected 3 operands, got {}",
            operands.len()
        )));
    };

    if evaluate(condition, env)?.is_truthy() {
        evaluate(consequent, env)
    } else {
        evaluate(alternative, env)
    }
}

fn eval_let(operands: &[Expression], env: &Environment) -> Result<Value> {
    let [bindings, body] = operands else {
        return Err(CarlaeError::evaluation("let: expected (let ((name expr)...) body)"));
    };
    let bindings = bindings.as_compound().ok_or_else(|| {
        CarlaeError::evaluation(format!("let: expected a binding list, got {bindings}"))
    })?;

    // Values see the outer environment only, never each other.
    let frame = env.extend();
    for binding in bindings.iter() {
        let Some([name, value_expr]) = binding.as_compound() else {
            return Err(CarlaeError::evaluation(format!(
                "let: malformed binding {binding}"
            )));
        };
        let name = symbol("let", name)?;
        frame.define(name, evaluate(value_expr, env)?);
    }
    trace!(bindings = bindings.len(), "entering let frame");
    evaluate(body, &frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::register_builtins;
    use crate::parser::parse_source;

    fn global() -> Environment {
        let root = Environment::root(EvalLimits::default());
        register_builtins(&root);
        root.extend()
    }

    fn run(source: &str, env: &Environment) -> Result<Value> {
        evaluate(&parse_source(source).unwrap(), env)
    }

    #[test]
    fn test_numbers_self_evaluate() {
        let env = global();
        assert_eq!(run("42", &env).unwrap(), Value::int(42));
    }

    #[test]
    fn test_define_and_lookup() {
        let env = global();
        assert_eq!(run("(:= x 3)", &env).unwrap(), Value::int(3));
        assert_eq!(run("x", &env).unwrap(), Value::int(3));
        assert!(run("y", &env).unwrap_err().is_name());
    }

    #[test]
    fn test_define_function_shorthand() {
        let env = global();
        run("(:= (sq x) (* x x))", &env).unwrap();
        assert_eq!(run("(sq 5)", &env).unwrap(), Value::int(25));
    }

    #[test]
    fn test_if_only_evaluates_taken_branch() {
        let env = global();
        assert_eq!(run("(if (> 3 2) 1 undefined-name)", &env).unwrap(), Value::int(1));
        assert_eq!(run("(if (> 2 3) undefined-name 0)", &env).unwrap(), Value::int(0));
        assert!(run("(if @t 1)", &env).unwrap_err().is_evaluation());
    }

    #[test]
    fn test_and_or_short_circuit() {
        let env = global();
        assert_eq!(run("(and @t @f undefined-name)", &env).unwrap(), Value::Bool(false));
        assert_eq!(run("(or @f @t undefined-name)", &env).unwrap(), Value::Bool(true));
        assert_eq!(run("(and)", &env).unwrap(), Value::Bool(true));
        assert_eq!(run("(or)", &env).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_let_values_use_outer_scope() {
        let env = global();
        run("(:= x 1)", &env).unwrap();
        assert_eq!(
            run("(let ((x 10) (y x)) (+ x y))", &env).unwrap(),
            Value::int(11)
        );
        assert_eq!(run("x", &env).unwrap(), Value::int(1));
    }

    #[test]
    fn test_set_mutates_enclosing_binding() {
        let env = global();
        run("(:= counter 0)", &env).unwrap();
        run("(:= (bump) (set! counter (+ counter 1)))", &env).unwrap();
        run("(bump)", &env).unwrap();
        assert_eq!(run("(bump)", &env).unwrap(), Value::int(2));
        assert_eq!(run("counter", &env).unwrap(), Value::int(2));
        assert!(run("(set! missing 1)", &env).unwrap_err().is_name());
    }

    #[test]
    fn test_del_is_local() {
        let env = global();
        run("(:= x 5)", &env).unwrap();
        assert_eq!(run("(del x)", &env).unwrap(), Value::int(5));
        assert!(run("x", &env).unwrap_err().is_name());
        assert!(run("(del x)", &env).unwrap_err().is_name());
        // Builtins live in the root frame, not the global frame.
        assert!(run("(del +)", &env).unwrap_err().is_name());
    }

    #[test]
    fn test_non_callable_operator() {
        let env = global();
        assert!(run("(1 2 3)", &env).unwrap_err().is_evaluation());
        assert!(run("((pair 1 2) 3)", &env).unwrap_err().is_evaluation());
        assert!(run("()", &env).unwrap_err().is_evaluation());
    }

    #[test]
    fn test_arity_is_enforced() {
        let env = global();
        run("(:= (f a b) a)", &env).unwrap();
        assert!(run("(f 1)", &env).unwrap_err().is_evaluation());
        assert!(run("(f 1 2 3)", &env).unwrap_err().is_evaluation());
        assert_eq!(run("(f 1 2)", &env).unwrap(), Value::int(1));
    }

    #[test]
    fn test_malformed_special_forms() {
        let env = global();
        for source in [
            "(:= x)",
            "(:= 3 4)",
            "(:= () 4)",
            "(function x x)",
            "(function (1) x)",
            "(let (x 1) x)",
            "(let ((x)) x)",
            "(set! 1 2)",
            "(del)",
        ] {
            assert!(run(source, &env).unwrap_err().is_evaluation(), "{source}");
        }
    }

    #[test]
    fn test_nil_is_a_literal() {
        let env = global();
        assert_eq!(run("nil", &env).unwrap(), Value::Nil);
        for source in [
            "(:= nil 3)",
            "(:= (nil x) x)",
            "(set! nil 3)",
            "(del nil)",
            "(let ((nil 1)) nil)",
            "(function (nil) 1)",
        ] {
            assert!(run(source, &env).unwrap_err().is_evaluation(), "{source}");
        }
        assert_eq!(run("(pair 1 nil)", &env).unwrap().to_string(), "(1)");
    }

    #[test]
    fn test_depth_limit() {
        let root = Environment::root(EvalLimits { max_depth: 50 });
        register_builtins(&root);
        let env = root.extend();
        run("(:= (loop n) (loop (+ n 1)))", &env).unwrap();
        let err = run("(loop 0)", &env).unwrap_err();
        assert!(err.is_evaluation());
        assert!(err.message.contains("recursion depth"));
        // The counter unwinds after the failure.
        assert_eq!(run("(+ 1 2)", &env).unwrap(), Value::int(3));
    }
}
