use crate::Result;
use crate::expr::Expr;
use crate::expr::aggregate::{AggregateFunction, CreateAggregateFunction};
use crate::types::DataType;

#[derive(Clone, PartialEq, Debug)]
pub struct Count {
    children: Vec<Expr>,
}

impl Count {
    pub fn new(children: Vec<Expr>) -> Self {
        Self { children }
    }
}

impl CreateAggregateFunction for Count {
    fn from_args(args: Vec<Expr>) -> Result<Box<dyn AggregateFunction>> {
        if args.is_empty() {
            return Err("requires at least 1 argument, found:0".to_string());
        }
        Ok(Box::new(Self::new(args)))
    }
}

impl AggregateFunction for Count {
    fn name(&self) -> &str {
        "count"
    }

    fn data_type(&self) -> &DataType {
        DataType::long_type()
    }

    fn nullable(&self) -> bool {
        false
    }

    fn args(&self) -> Vec<&Expr> {
        self.children.iter().collect()
    }
}
