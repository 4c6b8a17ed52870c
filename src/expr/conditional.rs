use crate::Result;
use crate::expr::Expr;
use crate::expr::scalar::{CreateScalarFunction, ScalarFunction};
use crate::types::DataType;

#[derive(Debug, Clone)]
pub struct If {
    pub predicate: Box<Expr>,
    pub true_value: Box<Expr>,
    pub false_value: Box<Expr>,
}

impl If {
    pub fn new(predicate: Box<Expr>, true_value: Box<Expr>, false_value: Box<Expr>) -> Self {
        Self { predicate, true_value, false_value }
    }
}

impl CreateScalarFunction for If {
    fn from_args(args: Vec<Expr>) -> Result<Box<dyn ScalarFunction>> {
        if args.len() != 3 {
            return Err(format!("requires 3 arguments, found:{}", args.len()));
        }
        let mut iter = args.into_iter();
        let predicate = iter.next().unwrap();
        let true_value = iter.next().unwrap();
        let false_value = iter.next().unwrap();
        Ok(Box::new(Self::new(Box::new(predicate), Box::new(true_value), Box::new(false_value))))
    }
}

impl ScalarFunction for If {
    fn name(&self) -> &str {
        "if"
    }

    fn data_type(&self) -> &DataType {
        self.true_value.data_type()
    }

    fn args(&self) -> Vec<&Expr> {
        vec![&self.predicate, &self.true_value, &self.false_value]
    }

    fn check_input_data_types(&self) -> Result<()> {
        if self.predicate.data_type() != DataType::boolean_type() {
            Err(format!("if predicate requires boolean type, not {}", self.predicate.data_type()))
        } else if self.true_value.data_type() != self.false_value.data_type() {
            Err(format!("differing types in if branches: {} and {}",
                self.true_value.data_type(), self.false_value.data_type()))
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone)]
pub struct Coalesce {
    pub children: Vec<Expr>,
}

impl Coalesce {
    pub fn new(children: Vec<Expr>) -> Self {
        Self { children }
    }
}

impl CreateScalarFunction for Coalesce {
    fn from_args(args: Vec<Expr>) -> Result<Box<dyn ScalarFunction>> {
        if args.is_empty() {
            return Err("requires at least 1 argument, found:0".to_string());
        }
        Ok(Box::new(Self::new(args)))
    }
}

impl ScalarFunction for Coalesce {
    fn name(&self) -> &str {
        "coalesce"
    }

    fn data_type(&self) -> &DataType {
        self.children[0].data_type()
    }

    fn args(&self) -> Vec<&Expr> {
        self.children.iter().collect()
    }

    fn check_input_data_types(&self) -> Result<()> {
        if self.children.iter().any(|e| e.data_type() != self.children[0].data_type()) {
            Err(format!("coalesce requires all arguments to share a type, found:{:?}",
                self.children.iter().map(|e| e.data_type().to_string()).collect::<Vec<_>>()))
        } else {
            Ok(())
        }
    }
}
