use crate::Result;
use crate::expr::Expr;
use crate::expr::aggregate::{AggregateFunction, CreateAggregateFunction};
use crate::types::DataType;

#[derive(Clone, PartialEq, Debug)]
pub struct First {
    child: Box<Expr>,
    data_type: DataType,
}

impl First {
    pub fn new(child: Box<Expr>) -> Self {
        let data_type = if child.resolved() {
            child.data_type().clone()
        } else {
            DataType::Null
        };
        Self { child, data_type }
    }
}

impl CreateAggregateFunction for First {
    fn from_args(args: Vec<Expr>) -> Result<Box<dyn AggregateFunction>> {
        if args.len() != 1 {
            return Err(format!("requires 1 argument, found:{}", args.len()));
        }
        let mut iter = args.into_iter();
        let child = iter.next().unwrap();
        Ok(Box::new(Self::new(Box::new(child))))
    }
}

impl AggregateFunction for First {
    fn name(&self) -> &str {
        "first"
    }

    fn data_type(&self) -> &DataType {
        &self.data_type
    }

    fn args(&self) -> Vec<&Expr> {
        vec![&self.child]
    }

    fn supports_distinct(&self) -> bool {
        false
    }
}
