use std::any::Any;
use std::cmp::Ordering;
use std::fmt::Debug;
use std::hash::Hash;
use itertools::Itertools;
use crate::Result;
use crate::expr::Expr;
use crate::types::{AbstractDataType, DataType};

/// Declares how an aggregate is evaluated; the analyzer always produces
/// `Complete`, the physical planner splits it later.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Hash, Debug)]
pub enum AggregateMode {
    Partial,
    Final,
    Complete,
}

/// An aggregate function call as it appears in a resolved plan.
#[derive(Clone, Hash, Debug)]
pub struct AggregateExpression {
    pub func: Box<dyn AggregateFunction>,
    pub mode: AggregateMode,
    pub is_distinct: bool,
}

impl PartialEq for AggregateExpression {
    fn eq(&self, other: &Self) -> bool {
        PartialEq::eq(&self.func, &other.func)
            && self.mode == other.mode
            && self.is_distinct == other.is_distinct
    }
}

impl Eq for AggregateExpression {}

impl PartialOrd for AggregateExpression {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match PartialOrd::partial_cmp(&self.func, &other.func) {
            Some(Ordering::Equal) => {}
            ord => return ord,
        }
        match self.mode.partial_cmp(&other.mode) {
            Some(Ordering::Equal) => {}
            ord => return ord,
        }
        self.is_distinct.partial_cmp(&other.is_distinct)
    }
}

impl AggregateExpression {
    pub fn new(func: Box<dyn AggregateFunction>) -> Self {
        Self { func, mode: AggregateMode::Complete, is_distinct: false }
    }

    pub fn with_distinct(mut self, is_distinct: bool) -> Self {
        self.is_distinct = is_distinct;
        self
    }
}

pub trait AggregateFunction: Debug + Send + Sync + CreateAggregateFunction + ExtendAggregateFunction {
    fn name(&self) -> &str;

    fn data_type(&self) -> &DataType;

    fn nullable(&self) -> bool {
        true
    }

    fn args(&self) -> Vec<&Expr>;

    /// Whether `DISTINCT` makes sense for this function. `max`/`min` are
    /// handled separately (DISTINCT is dropped there, it changes nothing).
    fn supports_distinct(&self) -> bool {
        true
    }

    fn expects_input_types(&self) -> Option<Vec<AbstractDataType>> {
        None
    }

    fn check_input_data_types(&self) -> Result<()> {
        match self.expects_input_types() {
            None => {
                Ok(())
            },
            Some(input_types) => {
                let mut mismatches = Vec::new();
                for (i, (tp, input_type)) in self.args().into_iter().zip(input_types.iter()).enumerate() {
                    if !input_type.accepts_type(tp.data_type()) {
                        mismatches.push(format!("{} argument {} requires {:?}, but get {}", self.name(), i + 1, input_type, tp.data_type()));
                    }
                }
                if mismatches.is_empty() {
                    Ok(())
                } else {
                    Err(mismatches.into_iter().join(" "))
                }
            },
        }
    }
}

pub trait CreateAggregateFunction {
    fn from_args(args: Vec<Expr>) -> Result<Box<dyn AggregateFunction>> where Self: Sized;

    fn create_function_expr(args: Vec<Expr>) -> Result<Expr> where Self: Sized {
        Ok(Expr::AggregateExpression(AggregateExpression::new(Self::from_args(args)?)))
    }
}

pub trait ExtendAggregateFunction {
    fn clone_box(&self) -> Box<dyn AggregateFunction>;
    fn as_any(&self) -> &dyn Any;
    fn rewrite_args(&self, args: Vec<Expr>) -> Box<dyn AggregateFunction>;
}

impl<T: AggregateFunction + CreateAggregateFunction + Clone + 'static> ExtendAggregateFunction for T {
    fn clone_box(&self) -> Box<dyn AggregateFunction> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn rewrite_args(&self, args: Vec<Expr>) -> Box<dyn AggregateFunction> {
        Self::from_args(args).unwrap()
    }
}

impl Clone for Box<dyn AggregateFunction> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl PartialEq for Box<dyn AggregateFunction> {
    fn eq(&self, other: &Self) -> bool {
        if self.as_any().type_id() != other.as_any().type_id() {
            return false;
        }
        let args1 = self.args();
        let args2 = other.args();
        if args1.len() != args2.len() {
            return false;
        };
        args1.iter().zip(args2.iter()).all(|(a, b)| a == b)
    }
}

impl Eq for Box<dyn AggregateFunction> {}

impl PartialOrd for Box<dyn AggregateFunction> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        let args1 = self.args();
        let args2 = other.args();
        if args1.len() != args2.len() {
            return None;
        };
        for i in 0..args1.len() {
            match args1[i].partial_cmp(args2[i]) {
                None => return None,
                Some(Ordering::Equal) => continue,
                Some(ord) => return Some(ord),
            }
        }
        Some(Ordering::Equal)
    }
}

impl Hash for Box<dyn AggregateFunction> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        for x in self.args() {
            x.hash(state);
        }
    }
}
