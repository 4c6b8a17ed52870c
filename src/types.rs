use std::fmt::{Display, Formatter};
use itertools::Itertools;
use crate::expr::AttributeReference;

#[derive(Clone, PartialEq, Eq, PartialOrd, Hash, Debug)]
pub enum DataType {
    Null,
    Int,
    Long,
    Float,
    Double,
    String,
    Boolean,
    Binary,
    Timestamp,
    Struct(Fields),
    Array(Box<DataType>),
}

impl DataType {
    pub fn null_type() -> &'static DataType {
        static NULL: DataType = DataType::Null;
        &NULL
    }

    pub fn int_type() -> &'static DataType {
        static INT: DataType = DataType::Int;
        &INT
    }

    pub fn long_type() -> &'static DataType {
        static LONG: DataType = DataType::Long;
        &LONG
    }

    pub fn double_type() -> &'static DataType {
        static DOUBLE: DataType = DataType::Double;
        &DOUBLE
    }

    pub fn string_type() -> &'static DataType {
        static STRING: DataType = DataType::String;
        &STRING
    }

    pub fn boolean_type() -> &'static DataType {
        static BOOLEAN: DataType = DataType::Boolean;
        &BOOLEAN
    }

    pub fn is_numeric_type(&self) -> bool {
        matches!(self, DataType::Int | DataType::Long | DataType::Float | DataType::Double)
    }

    pub fn is_atomic_type(&self) -> bool {
        !matches!(self, DataType::Null | DataType::Struct(_) | DataType::Array(_))
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DataType::Null => write!(f, "null"),
            DataType::Int => write!(f, "int"),
            DataType::Long => write!(f, "long"),
            DataType::Float => write!(f, "float"),
            DataType::Double => write!(f, "double"),
            DataType::String => write!(f, "string"),
            DataType::Boolean => write!(f, "boolean"),
            DataType::Binary => write!(f, "binary"),
            DataType::Timestamp => write!(f, "timestamp"),
            DataType::Struct(fields) => {
                write!(f, "struct<{}>", fields.0.iter().map(|x| format!("{}:{}", x.name, x.data_type)).join(","))
            },
            DataType::Array(data_type) => write!(f, "array<{}>", data_type),
        }
    }
}

/// Abstract types accepted by function signatures, checked by the type-coercion rules.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum AbstractDataType {
    Any,
    Numeric,
    Type(DataType),
    Collection(Vec<AbstractDataType>),
}

impl AbstractDataType {
    pub fn accepts_type(&self, data_type: &DataType) -> bool {
        match self {
            AbstractDataType::Any => true,
            AbstractDataType::Numeric => data_type.is_numeric_type(),
            AbstractDataType::Type(tp) => tp == data_type,
            AbstractDataType::Collection(tps) => tps.iter().any(|tp| tp.accepts_type(data_type)),
        }
    }

    pub fn is_numeric_type(&self) -> bool {
        match self {
            AbstractDataType::Numeric => true,
            AbstractDataType::Type(tp) => tp.is_numeric_type(),
            _ => false,
        }
    }

    pub fn default_concrete_type(&self) -> DataType {
        match self {
            AbstractDataType::Any => DataType::String,
            AbstractDataType::Numeric => DataType::Double,
            AbstractDataType::Type(tp) => tp.clone(),
            AbstractDataType::Collection(tps) => tps[0].default_concrete_type(),
        }
    }
}

#[derive(Clone, PartialEq, Eq, PartialOrd, Hash, Debug)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Field {
        Field { name: name.into(), data_type, }
    }
}

#[derive(Clone, PartialEq, Eq, PartialOrd, Hash, Debug)]
pub struct Fields(pub Vec<Field>);

#[derive(Clone, PartialEq, Eq, PartialOrd, Hash, Debug)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Schema {
        Schema { fields }
    }

    pub fn to_struct_type(&self) -> DataType {
        DataType::Struct(Fields(self.fields.clone()))
    }

    pub fn to_attributes(&self) -> Vec<AttributeReference> {
        self.fields.iter().map(|f| AttributeReference::new(f.name.clone(), f.data_type.clone())).collect()
    }

    pub fn from_attributes(attributes: Vec<AttributeReference>) -> Schema {
        Schema::new(attributes.into_iter().map(|a| Field::new(a.name, a.data_type)).collect())
    }
}

impl Display for Schema {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "root")?;
        for field in &self.fields {
            writeln!(f, " |-- {}: {}", field.name, field.data_type)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_types() {
        let fields = vec![Field::new("id", DataType::Int), Field::new("name", DataType::String)];
        let schema = Schema { fields: fields.clone() };
        println!("{:?}", schema);
        let struct_type = DataType::Struct(Fields(fields.clone()));
        println!("{}", struct_type);
        assert_eq!(struct_type.to_string(), "struct<id:int,name:string>");
        assert!(DataType::Long.is_numeric_type());
        assert!(!DataType::Array(Box::new(DataType::Int)).is_atomic_type());
    }
}
