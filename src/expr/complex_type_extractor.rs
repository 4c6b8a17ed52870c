use itertools::Itertools;
use crate::Result;
use crate::analysis::Resolver;
use crate::expr::{Expr, GetArrayStructFields, GetStructField, Literal};
use crate::expr::scalar::{CreateScalarFunction, ScalarFunction};
use crate::types::DataType;

/// Nested field access on a resolved expression: `child.part` where `child`
/// is a struct or an array of structs.
pub fn extract_field(child: Expr, part: &str, resolver: Resolver) -> Result<Expr> {
    match child.data_type().clone() {
        DataType::Struct(fields) => {
            match fields.0.iter().find_position(|f| resolver(&f.name, part)) {
                Some((ordinal, field)) => Ok(Expr::GetStructField(GetStructField::new(child, field.clone(), ordinal))),
                None => Err(format!("No such struct field {} in {}",
                    part, fields.0.iter().map(|f| f.name.as_str()).join(", "))),
            }
        },
        DataType::Array(tp) => match tp.as_ref() {
            DataType::Struct(fields) => {
                match fields.0.iter().find_position(|f| resolver(&f.name, part)) {
                    Some((ordinal, field)) => Ok(Expr::GetArrayStructFields(GetArrayStructFields::new(child, field.clone(), ordinal))),
                    None => Err(format!("No such struct field {} in {}",
                        part, fields.0.iter().map(|f| f.name.as_str()).join(", "))),
                }
            },
            _ => Err(format!("Can't extract value from {}", child)),
        },
        _ => Err(format!("Can't extract value from {}", child)),
    }
}

/// `a.b` / `a["b"]` / `a[0]` once `a` is resolved. String extraction digs into
/// structs, integer extraction indexes arrays.
pub fn extract_value(child: Expr, extraction: &Expr, resolver: Resolver) -> Result<Expr> {
    match extraction {
        Expr::Literal(Literal{value, data_type}) if data_type == DataType::string_type() => {
            extract_field(child, value.get_string(), resolver)
        },
        e if matches!(child.data_type(), DataType::Array(_))
            && matches!(e.data_type(), DataType::Int | DataType::Long) => {
            Ok(Expr::ScalarFunction(Box::new(GetArrayItem::new(
                Box::new(child), Box::new(e.clone())))))
        },
        e => Err(format!("Can't extract value from {}, {}", child, e)),
    }
}

#[derive(Debug, Clone)]
pub struct GetArrayItem {
    pub child: Box<Expr>,
    pub ordinal: Box<Expr>,
}

impl GetArrayItem {
    pub fn new(child: Box<Expr>, ordinal: Box<Expr>) -> GetArrayItem {
        GetArrayItem { child, ordinal }
    }
}

impl CreateScalarFunction for GetArrayItem {
    fn from_args(args: Vec<Expr>) -> Result<Box<dyn ScalarFunction>> {
        if args.len() != 2 {
            return Err(format!("requires 2 argument, found:{}", args.len()));
        }

        let child = args[0].clone();
        let ordinal = args[1].clone();

        Ok(Box::new(GetArrayItem::new(
            Box::new(child),
            Box::new(ordinal),
        )))
    }
}

impl ScalarFunction for GetArrayItem {
    fn name(&self) -> &str {
        "get_array_item"
    }

    fn data_type(&self) -> &DataType {
        if let DataType::Array(data_type) = self.child.data_type() {
            data_type.as_ref()
        } else {
            DataType::null_type()
        }
    }

    fn args(&self) -> Vec<&Expr> {
        vec![&self.child, &self.ordinal]
    }

    fn check_input_data_types(&self) -> Result<()> {
        if !matches!(self.child.data_type(), DataType::Array(_)) {
            Err(format!("first arg requires array type, not {}", self.child.data_type()))
        } else if !matches!(self.ordinal.data_type(), DataType::Int | DataType::Long) {
            Err(format!("second arg requires int type, not {}", self.ordinal.data_type()))
        } else {
            Ok(())
        }
    }
}
