use crate::Result;
use crate::expr::Expr;
use crate::expr::scalar::{CreateScalarFunction, ScalarFunction};
use crate::types::{AbstractDataType, DataType};

#[derive(Debug, Clone)]
pub struct Length {
    pub child: Box<Expr>,
}

impl Length {
    pub fn new(child: Box<Expr>) -> Self {
        Self { child }
    }
}

impl CreateScalarFunction for Length {
    fn from_args(args: Vec<Expr>) -> Result<Box<dyn ScalarFunction>> {
        if args.len() != 1 {
            return Err(format!("requires 1 argument, found:{}", args.len()));
        }
        let mut iter = args.into_iter();
        let child = iter.next().unwrap();
        Ok(Box::new(Self::new(Box::new(child))))
    }
}

impl ScalarFunction for Length {
    fn name(&self) -> &str {
        "length"
    }

    fn data_type(&self) -> &DataType {
        DataType::int_type()
    }

    fn args(&self) -> Vec<&Expr> {
        vec![&self.child]
    }

    fn expects_input_types(&self) -> Option<Vec<AbstractDataType>> {
        Some(vec![AbstractDataType::Type(DataType::String)])
    }
}

#[derive(Debug, Clone)]
pub struct Substring {
    pub str: Box<Expr>,
    pub pos: Box<Expr>,
    pub len: Box<Expr>,
}

impl Substring {
    pub fn new(str: Box<Expr>, pos: Box<Expr>, len: Box<Expr>) -> Self {
        Self { str, pos, len }
    }
}

impl CreateScalarFunction for Substring {
    fn from_args(args: Vec<Expr>) -> Result<Box<dyn ScalarFunction>> {
        if args.len() != 2 && args.len() != 3 {
            return Err(format!("requires 2 or 3 arguments, found:{}", args.len()));
        }
        let mut iter = args.into_iter();
        let str = iter.next().unwrap();
        let pos = iter.next().unwrap();
        let len = iter.next().unwrap_or(Expr::int_lit(i32::MAX));
        Ok(Box::new(Self::new(Box::new(str), Box::new(pos), Box::new(len))))
    }
}

impl ScalarFunction for Substring {
    fn name(&self) -> &str {
        "substring"
    }

    fn data_type(&self) -> &DataType {
        DataType::string_type()
    }

    fn args(&self) -> Vec<&Expr> {
        vec![&self.str, &self.pos, &self.len]
    }

    fn expects_input_types(&self) -> Option<Vec<AbstractDataType>> {
        Some(vec![
            AbstractDataType::Type(DataType::String),
            AbstractDataType::Type(DataType::Int),
            AbstractDataType::Type(DataType::Int),
        ])
    }
}

#[derive(Debug, Clone)]
pub struct Concat {
    pub children: Vec<Expr>,
}

impl Concat {
    pub fn new(children: Vec<Expr>) -> Self {
        Self { children }
    }
}

impl CreateScalarFunction for Concat {
    fn from_args(args: Vec<Expr>) -> Result<Box<dyn ScalarFunction>> {
        Ok(Box::new(Self::new(args)))
    }
}

impl ScalarFunction for Concat {
    fn name(&self) -> &str {
        "concat"
    }

    fn data_type(&self) -> &DataType {
        DataType::string_type()
    }

    fn args(&self) -> Vec<&Expr> {
        self.children.iter().collect()
    }

    fn expects_input_types(&self) -> Option<Vec<AbstractDataType>> {
        Some(vec![AbstractDataType::Type(DataType::String); self.children.len()])
    }
}

#[derive(Debug, Clone)]
pub struct Upper {
    pub child: Box<Expr>,
}

impl Upper {
    pub fn new(child: Box<Expr>) -> Self {
        Self { child }
    }
}

impl CreateScalarFunction for Upper {
    fn from_args(args: Vec<Expr>) -> Result<Box<dyn ScalarFunction>> {
        if args.len() != 1 {
            return Err(format!("requires 1 argument, found:{}", args.len()));
        }
        let mut iter = args.into_iter();
        let child = iter.next().unwrap();
        Ok(Box::new(Self::new(Box::new(child))))
    }
}

impl ScalarFunction for Upper {
    fn name(&self) -> &str {
        "upper"
    }

    fn data_type(&self) -> &DataType {
        DataType::string_type()
    }

    fn args(&self) -> Vec<&Expr> {
        vec![&self.child]
    }

    fn expects_input_types(&self) -> Option<Vec<AbstractDataType>> {
        Some(vec![AbstractDataType::Type(DataType::String)])
    }
}

#[derive(Debug, Clone)]
pub struct Lower {
    pub child: Box<Expr>,
}

impl Lower {
    pub fn new(child: Box<Expr>) -> Self {
        Self { child }
    }
}

impl CreateScalarFunction for Lower {
    fn from_args(args: Vec<Expr>) -> Result<Box<dyn ScalarFunction>> {
        if args.len() != 1 {
            return Err(format!("requires 1 argument, found:{}", args.len()));
        }
        let mut iter = args.into_iter();
        let child = iter.next().unwrap();
        Ok(Box::new(Self::new(Box::new(child))))
    }
}

impl ScalarFunction for Lower {
    fn name(&self) -> &str {
        "lower"
    }

    fn data_type(&self) -> &DataType {
        DataType::string_type()
    }

    fn args(&self) -> Vec<&Expr> {
        vec![&self.child]
    }

    fn expects_input_types(&self) -> Option<Vec<AbstractDataType>> {
        Some(vec![AbstractDataType::Type(DataType::String)])
    }
}
