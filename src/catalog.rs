use std::collections::HashMap;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;
use crate::Result;
use crate::logical_plan::{LocalRelation, LogicalPlan, SubqueryAlias};
use crate::types::Schema;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Hash)]
pub struct TableIdentifier {
    pub database: Option<String>,
    pub table: String,
}

impl TableIdentifier {
    pub fn new(table: impl Into<String>) -> Self {
        Self { database: None, table: table.into() }
    }

    pub fn with_database(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self { database: Some(database.into()), table: table.into() }
    }

    pub fn from_parts(parts: &[String]) -> Self {
        match parts {
            [table] => Self::new(table.clone()),
            [database, table] => Self::with_database(database.clone(), table.clone()),
            _ => Self::new(parts.last().cloned().unwrap_or_default()),
        }
    }
}

impl Display for TableIdentifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.database {
            Some(db) => write!(f, "{}.{}", db, self.table),
            None => write!(f, "{}", self.table),
        }
    }
}

/// The analyzer's read-only view of table metadata. Lookups during one
/// analysis must see one consistent snapshot; the analyzer asks nothing else
/// of implementations.
pub trait Catalog: Debug + Send + Sync {
    fn lookup_relation(&self, ident: &TableIdentifier, alias: Option<&str>) -> Result<LogicalPlan>;
}

/// Registered temp views backed by a plain map. Lookups hand out the same
/// relation (same `ExprId`s) every time, which is exactly what makes
/// self-joins interesting.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    tables: HashMap<String, LogicalPlan>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self { tables: HashMap::new() }
    }

    pub fn register_table(&mut self, name: impl Into<String>, schema: &Schema) {
        let name = name.into();
        let relation = LocalRelation::new(name.clone(), schema.to_attributes());
        self.tables.insert(name, LogicalPlan::LocalRelation(relation));
    }

    pub fn register_plan(&mut self, name: impl Into<String>, plan: LogicalPlan) {
        self.tables.insert(name.into(), plan);
    }
}

impl Catalog for MemoryCatalog {
    fn lookup_relation(&self, ident: &TableIdentifier, alias: Option<&str>) -> Result<LogicalPlan> {
        match self.tables.get(&ident.table) {
            Some(plan) => {
                let identifier = alias.unwrap_or(&ident.table).to_string();
                Ok(LogicalPlan::SubqueryAlias(SubqueryAlias::new(identifier, Arc::new(plan.clone()))))
            },
            None => Err(format!("Table not found: {}", ident)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataType, Field};

    #[test]
    fn test_lookup_relation() {
        let schema = Schema::new(vec![
            Field::new("id", DataType::Int),
            Field::new("name", DataType::String),
        ]);
        let mut catalog = MemoryCatalog::new();
        catalog.register_table("tbl", &schema);

        let plan = catalog.lookup_relation(&TableIdentifier::new("tbl"), None).unwrap();
        let output = plan.output();
        assert_eq!(output.len(), 2);
        assert_eq!(output[0].qualifier.as_deref(), Some("tbl"));

        let aliased = catalog.lookup_relation(&TableIdentifier::new("tbl"), Some("t")).unwrap();
        assert_eq!(aliased.output()[0].qualifier.as_deref(), Some("t"));
        // Same underlying relation: ids are shared between lookups.
        assert_eq!(plan.output()[0].expr_id, aliased.output()[0].expr_id);

        assert!(catalog.lookup_relation(&TableIdentifier::new("missing"), None).is_err());
    }
}
