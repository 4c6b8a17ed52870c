use crate::Result;
use crate::expr::Expr;
use crate::expr::aggregate::{AggregateFunction, CreateAggregateFunction};
use crate::types::{AbstractDataType, DataType};

#[derive(Clone, PartialEq, Debug)]
pub struct Average {
    child: Box<Expr>,
}

impl Average {
    pub fn new(child: Box<Expr>) -> Self {
        Self { child }
    }
}

impl CreateAggregateFunction for Average {
    fn from_args(args: Vec<Expr>) -> Result<Box<dyn AggregateFunction>> {
        if args.len() != 1 {
            return Err(format!("requires 1 argument, found:{}", args.len()));
        }
        let mut iter = args.into_iter();
        let child = iter.next().unwrap();
        Ok(Box::new(Self::new(Box::new(child))))
    }
}

impl AggregateFunction for Average {
    fn name(&self) -> &str {
        "avg"
    }

    fn data_type(&self) -> &DataType {
        DataType::double_type()
    }

    fn args(&self) -> Vec<&Expr> {
        vec![&self.child]
    }

    fn expects_input_types(&self) -> Option<Vec<AbstractDataType>> {
        Some(vec![AbstractDataType::Numeric])
    }
}
