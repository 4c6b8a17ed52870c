use std::any::Any;
use std::cmp::Ordering;
use std::fmt::Debug;
use std::hash::Hash;
use itertools::Itertools;
use crate::Result;
use crate::expr::Expr;
use crate::types::{AbstractDataType, DataType};

pub trait ScalarFunction: Debug + Send + Sync + CreateScalarFunction + ExtendScalarFunction {
    fn name(&self) -> &str;

    fn foldable(&self) -> bool {
        self.args().iter().all(|arg| arg.foldable())
    }

    /// False for functions whose value may differ between two evaluations over
    /// the same input, e.g. `rand()`.
    fn deterministic(&self) -> bool {
        true
    }

    fn nullable(&self) -> bool {
        true
    }

    fn data_type(&self) -> &DataType;

    fn args(&self) -> Vec<&Expr>;

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

pub trait CreateScalarFunction {
    fn from_args(args: Vec<Expr>) -> Result<Box<dyn ScalarFunction>> where Self: Sized;

    fn create_function_expr(args: Vec<Expr>) -> Result<Expr> where Self: Sized {
        Ok(Expr::ScalarFunction(Self::from_args(args)?))
    }
}

pub trait ExtendScalarFunction {
    fn clone_box(&self) -> Box<dyn ScalarFunction>;
    fn as_any(&self) -> &dyn Any;
    fn rewrite_args(&self, args: Vec<Expr>) -> Box<dyn ScalarFunction>;
}

impl<T: ScalarFunction + CreateScalarFunction + Clone + 'static> ExtendScalarFunction for T {
    fn clone_box(&self) -> Box<dyn ScalarFunction> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn rewrite_args(&self, args: Vec<Expr>) -> Box<dyn ScalarFunction> {
        Self::from_args(args).unwrap()
    }
}

impl Clone for Box<dyn ScalarFunction> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl PartialEq for Box<dyn ScalarFunction> {
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

impl Eq for Box<dyn ScalarFunction> {}

impl PartialOrd for Box<dyn ScalarFunction> {
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

impl Hash for Box<dyn ScalarFunction> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        for x in self.args() {
            x.hash(state);
        }
    }
}
