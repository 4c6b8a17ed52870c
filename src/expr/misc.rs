use rand::Rng;
use crate::Result;
use crate::data::Value;
use crate::expr::{Expr, Literal};
use crate::expr::scalar::{CreateScalarFunction, ScalarFunction};
use crate::types::DataType;

/// `rand()` / `rand(seed)`. When no seed is given one is drawn at
/// construction, matching the usual engine behavior; the expression stays
/// nondeterministic either way because every row draws a new value.
#[derive(Debug, Clone)]
pub struct Rand {
    pub seed: Box<Expr>,
}

impl Rand {
    pub fn new(seed: Box<Expr>) -> Self {
        Self { seed }
    }
}

impl CreateScalarFunction for Rand {
    fn from_args(args: Vec<Expr>) -> Result<Box<dyn ScalarFunction>> {
        match args.len() {
            0 => {
                let seed = rand::rng().random::<i64>();
                Ok(Box::new(Self::new(Box::new(Expr::long_lit(seed)))))
            },
            1 => {
                let mut iter = args.into_iter();
                let seed = iter.next().unwrap();
                match &seed {
                    Expr::Literal(Literal{data_type, ..}) if matches!(data_type, DataType::Int | DataType::Long) =>
                        Ok(Box::new(Self::new(Box::new(seed)))),
                    e => Err(format!("seed must be an integer literal, found:{:?}", e)),
                }
            },
            n => Err(format!("requires 0 or 1 argument, found:{}", n)),
        }
    }
}

impl ScalarFunction for Rand {
    fn name(&self) -> &str {
        "rand"
    }

    fn foldable(&self) -> bool {
        false
    }

    fn deterministic(&self) -> bool {
        false
    }

    fn nullable(&self) -> bool {
        false
    }

    fn data_type(&self) -> &DataType {
        DataType::double_type()
    }

    fn args(&self) -> Vec<&Expr> {
        vec![&self.seed]
    }
}
