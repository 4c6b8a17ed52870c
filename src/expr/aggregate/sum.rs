use crate::Result;
use crate::expr::Expr;
use crate::expr::aggregate::{AggregateFunction, CreateAggregateFunction};
use crate::types::{AbstractDataType, DataType};

#[derive(Clone, PartialEq, Debug)]
pub struct Sum {
    child: Box<Expr>,
    result_type: DataType,
}

impl Sum {
    pub fn new(child: Box<Expr>) -> Self {
        let result_type = if child.resolved() {
            match child.data_type() {
                DataType::Int | DataType::Long => DataType::Long,
                _ => DataType::Double,
            }
        } else {
            DataType::Null
        };
        Self { child, result_type }
    }
}

impl CreateAggregateFunction for Sum {
    fn from_args(args: Vec<Expr>) -> Result<Box<dyn AggregateFunction>> {
        if args.len() != 1 {
            return Err(format!("requires 1 argument, found:{}", args.len()));
        }
        let mut iter = args.into_iter();
        let child = iter.next().unwrap();
        Ok(Box::new(Self::new(Box::new(child))))
    }
}

impl AggregateFunction for Sum {
    fn name(&self) -> &str {
        "sum"
    }

    fn data_type(&self) -> &DataType {
        &self.result_type
    }

    fn args(&self) -> Vec<&Expr> {
        vec![&self.child]
    }

    fn expects_input_types(&self) -> Option<Vec<AbstractDataType>> {
        Some(vec![AbstractDataType::Numeric])
    }
}
