use std::collections::HashMap;
use std::sync::{LazyLock, Mutex};
use crate::Result;
use crate::expr::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FunctionKind {
    Scalar,
    Aggregate,
    Generator,
    Window,
}

pub type FunctionBuilder = dyn Fn(Vec<Expr>) -> Result<Expr> + Send + Sync;

struct FunctionEntry {
    kind: FunctionKind,
    builder: Box<FunctionBuilder>,
}

struct FunctionRegistry {
    expressions: HashMap<String, FunctionEntry>,
}

impl FunctionRegistry {
    pub fn lookup_function(&self, name: &str, args: Vec<Expr>) -> Result<Expr> {
        let entry = self.expressions.get(name);
        match entry {
            Some(entry) => match (entry.builder)(args) {
                Ok(expr) => Ok(expr),
                Err(e) => Err(format!("invalid arguments for function {}: {}.", name, e)),
            },
            None => Err(format!("undefined function {}", name)),
        }
    }

    pub fn register_function(&mut self, name: &str, kind: FunctionKind, builder: Box<FunctionBuilder>) -> Result<()> {
        self.expressions.insert(name.to_string(), FunctionEntry { kind, builder });
        Ok(())
    }
}

static FUNCTION_REGISTRY: LazyLock<Mutex<FunctionRegistry>> = LazyLock::new(|| {
    Mutex::new(builtin_function_registry())
});

pub fn register_function(name: &str, kind: FunctionKind, builder: Box<FunctionBuilder>) -> Result<()> {
    let mut registry = FUNCTION_REGISTRY.lock().unwrap();
    registry.register_function(name, kind, builder)
}

pub fn lookup_function(name: &str, args: Vec<Expr>) -> Result<Expr> {
    let registry = FUNCTION_REGISTRY.lock().unwrap();
    registry.lookup_function(name, args)
}

pub fn is_registered(name: &str) -> bool {
    let registry = FUNCTION_REGISTRY.lock().unwrap();
    registry.expressions.contains_key(name)
}

pub fn is_aggregate_function(name: &str) -> bool {
    let registry = FUNCTION_REGISTRY.lock().unwrap();
    registry.expressions.get(name).map(|e| e.kind == FunctionKind::Aggregate).unwrap_or(false)
}

/// Registry lookup plus the DISTINCT rules: aggregates take the flag, except
/// max/min where it changes nothing and is dropped, and aggregates that
/// declare no support where it is an error. DISTINCT on anything else is an
/// error.
pub fn resolve_function(name: &str, args: Vec<Expr>, is_distinct: bool) -> Result<Expr> {
    let expr = lookup_function(name, args)?;
    if !is_distinct {
        return Ok(expr);
    }
    match expr {
        Expr::AggregateExpression(agg) => {
            match agg.func.name() {
                "max" | "min" => Ok(Expr::AggregateExpression(agg)),
                _ if !agg.func.supports_distinct() =>
                    Err(format!("{} does not support DISTINCT keyword", name)),
                _ => Ok(Expr::AggregateExpression(agg.with_distinct(true))),
            }
        },
        _ => Err(format!("{} does not support DISTINCT keyword", name)),
    }
}

macro_rules! register_builtins {
    ($map:expr, $kind:expr, $($($names:literal)|+ => $ty:ident),* $(,)?) => {
        $(
            $(
                $map.insert(
                    $names.to_string(),
                    FunctionEntry { kind: $kind, builder: Box::new(|args| $ty::create_function_expr(args)) },
                );
            )+
        )*
    };
}

fn builtin_function_registry() -> FunctionRegistry {
    let mut expressions: HashMap<String, FunctionEntry> = HashMap::new();
    register_builtins!(expressions, FunctionKind::Scalar,
        // str
        "length" => Length,
        "substring" | "substr" => Substring,
        "concat" => Concat,
        "upper" => Upper,
        "lower" => Lower,
        "if" => If,
        "coalesce" | "nvl" => Coalesce,
        "rand" => Rand,
        "get_array_item" => GetArrayItem,
    );
    register_builtins!(expressions, FunctionKind::Aggregate,
        "sum" => Sum,
        "count" => Count,
        "min" => Min,
        "max" => Max,
        "avg" => Average,
        "first" => First,
        "last" => Last,
    );
    register_builtins!(expressions, FunctionKind::Generator,
        "explode" => Explode,
        "posexplode" => PosExplode,
    );
    for wf in [WindowFunction::RowNumber, WindowFunction::Rank, WindowFunction::DenseRank] {
        expressions.insert(
            wf.name().to_string(),
            FunctionEntry {
                kind: FunctionKind::Window,
                builder: Box::new(move |args| {
                    if !args.is_empty() {
                        return Err(format!("{} requires 0 arguments, found:{}", wf.name(), args.len()));
                    }
                    Ok(Expr::WindowFunction(wf))
                }),
            },
        );
    }
    FunctionRegistry { expressions }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;

    #[test]
    fn test_lookup_function() {
        let registry = FUNCTION_REGISTRY.lock().unwrap();
        for (k, _v) in registry.expressions.iter() {
            println!("{}", k)
        }
        assert!(registry.expressions.contains_key("sum"));
        assert!(registry.expressions.contains_key("substr"));
    }

    #[test]
    fn test_resolve_function_distinct() {
        let arg = Expr::AttributeReference(AttributeReference::new("x", DataType::Int));

        let sum = resolve_function("sum", vec![arg.clone()], true).unwrap();
        match sum {
            Expr::AggregateExpression(agg) => assert!(agg.is_distinct),
            e => panic!("expected aggregate, got {:?}", e),
        }

        // DISTINCT changes nothing for max and is silently dropped
        let max = resolve_function("max", vec![arg.clone()], true).unwrap();
        match max {
            Expr::AggregateExpression(agg) => assert!(!agg.is_distinct),
            e => panic!("expected aggregate, got {:?}", e),
        }

        assert!(resolve_function("first", vec![arg.clone()], true).is_err());
        assert!(resolve_function("length", vec![Expr::string_lit("a")], true).is_err());
        assert!(resolve_function("missing_fn", vec![], false).is_err());
    }
}
