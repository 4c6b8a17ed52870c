use std::sync::Arc;
use itertools::Itertools;
use crate::Result;
use crate::analysis::Resolver;
use crate::expr::{
    extract_field, AttributeReference, AttributeSet, Expr, ExprId, WindowSpecDefinition,
};
use crate::tree_node::{Transformed, TreeNode, TreeNodeContainer, TreeNodeRecursion};
use crate::types::DataType;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Hash)]
pub enum LogicalPlan {
    UnresolvedRelation(UnresolvedRelation),
    LocalRelation(LocalRelation),
    OneRowRelation,
    SubqueryAlias(SubqueryAlias),
    Project(Project),
    Filter(Filter),
    Sort(Sort),
    Aggregate(Aggregate),
    Join(Join),
    Generate(Generate),
    Window(Window),
    Expand(Expand),
    With(With),
    WithWindowDefinition(WithWindowDefinition),
    InsertIntoTable(InsertIntoTable),
    Cube(Cube),
    Rollup(Rollup),
    GroupingSets(GroupingSets),
    ScriptTransformation(ScriptTransformation),
}

impl LogicalPlan {
    pub fn children(&self) -> Vec<&LogicalPlan> {
        match self {
            LogicalPlan::UnresolvedRelation(_)
             | LogicalPlan::LocalRelation(_)
             | LogicalPlan::OneRowRelation => vec![],
            LogicalPlan::SubqueryAlias(SubqueryAlias{child, ..})
             | LogicalPlan::Project(Project{child, ..})
             | LogicalPlan::Filter(Filter{child, ..})
             | LogicalPlan::Sort(Sort{child, ..})
             | LogicalPlan::Aggregate(Aggregate{child, ..})
             | LogicalPlan::Generate(Generate{child, ..})
             | LogicalPlan::Window(Window{child, ..})
             | LogicalPlan::Expand(Expand{child, ..})
             | LogicalPlan::With(With{child, ..})
             | LogicalPlan::WithWindowDefinition(WithWindowDefinition{child, ..})
             | LogicalPlan::InsertIntoTable(InsertIntoTable{child, ..})
             | LogicalPlan::Cube(Cube{child, ..})
             | LogicalPlan::Rollup(Rollup{child, ..})
             | LogicalPlan::GroupingSets(GroupingSets{child, ..})
             | LogicalPlan::ScriptTransformation(ScriptTransformation{child, ..}) => vec![child.as_ref()],
            LogicalPlan::Join(Join{left, right, ..}) => vec![left.as_ref(), right.as_ref()],
        }
    }

    pub fn expressions(&self) -> Vec<&Expr> {
        match self {
            LogicalPlan::UnresolvedRelation(_)
             | LogicalPlan::LocalRelation(_)
             | LogicalPlan::OneRowRelation
             | LogicalPlan::SubqueryAlias(_)
             | LogicalPlan::With(_)
             | LogicalPlan::WithWindowDefinition(_)
             | LogicalPlan::InsertIntoTable(_)
             | LogicalPlan::Expand(_) => vec![],
            LogicalPlan::Project(Project{project_list, ..}) => project_list.iter().collect(),
            LogicalPlan::Filter(Filter{condition, ..}) => vec![condition],
            LogicalPlan::Sort(Sort{order, ..}) => order.iter().collect(),
            LogicalPlan::Aggregate(Aggregate{grouping_exprs, aggregate_exprs, ..}) => {
                grouping_exprs.iter().chain(aggregate_exprs.iter()).collect()
            },
            LogicalPlan::Join(Join{condition, ..}) => condition.iter().collect(),
            LogicalPlan::Generate(g) => {
                let mut exprs = Vec::new();
                exprs.push(&g.generator);
                for e in &g.generator_output {
                    exprs.push(e);
                }
                exprs
            },
            LogicalPlan::Window(Window{window_exprs, ..}) => window_exprs.iter().collect(),
            LogicalPlan::Cube(Cube{group_by_exprs, aggregations, ..})
             | LogicalPlan::Rollup(Rollup{group_by_exprs, aggregations, ..})
             | LogicalPlan::GroupingSets(GroupingSets{group_by_exprs, aggregations, ..}) => {
                group_by_exprs.iter().chain(aggregations.iter()).collect()
            },
            LogicalPlan::ScriptTransformation(ScriptTransformation{input, ..}) => input.iter().collect(),
        }
    }

    pub fn resolved(&self) -> bool {
        match self {
            LogicalPlan::UnresolvedRelation(_) => false,
            // These only exist to be lowered away by the substitution and
            // grouping-analytics rules.
            LogicalPlan::With(_)
             | LogicalPlan::WithWindowDefinition(_)
             | LogicalPlan::Cube(_)
             | LogicalPlan::Rollup(_)
             | LogicalPlan::GroupingSets(_) => false,
            LogicalPlan::Generate(g) => g.resolved(),
            LogicalPlan::Join(j) =>
                self.expressions().iter().all(|e| e.resolved())
                    && self.children_resolved()
                    && j.self_join_resolved(),
            LogicalPlan::InsertIntoTable(i) => i.table.resolved() && i.child.resolved(),
            _ => self.expressions().iter().all(|e| e.resolved()) && self.children_resolved(),
        }
    }

    pub fn children_resolved(&self) -> bool {
        self.children().iter().all(|c| c.resolved())
    }

    pub fn output(&self) -> Vec<AttributeReference> {
        match self {
            LogicalPlan::UnresolvedRelation(_)
             | LogicalPlan::OneRowRelation
             | LogicalPlan::InsertIntoTable(_)
             | LogicalPlan::Cube(_)
             | LogicalPlan::Rollup(_)
             | LogicalPlan::GroupingSets(_) => vec![],
            LogicalPlan::LocalRelation(LocalRelation{output, ..}) => output.clone(),
            LogicalPlan::SubqueryAlias(subquery_alias) => subquery_alias.output(),
            LogicalPlan::Project(Project{project_list, ..}) => named_exprs_to_attributes(project_list),
            LogicalPlan::Filter(Filter{child, ..})
             | LogicalPlan::Sort(Sort{child, ..})
             | LogicalPlan::With(With{child, ..})
             | LogicalPlan::WithWindowDefinition(WithWindowDefinition{child, ..}) => child.output(),
            LogicalPlan::Aggregate(Aggregate{aggregate_exprs, ..}) => named_exprs_to_attributes(aggregate_exprs),
            LogicalPlan::Join(j) => j.output(),
            LogicalPlan::Generate(g) => g.output(),
            LogicalPlan::Window(w) => w.output(),
            LogicalPlan::Expand(e) => e.output(),
            LogicalPlan::ScriptTransformation(ScriptTransformation{output, ..}) => output.clone(),
        }
    }

    pub fn output_set(&self) -> AttributeSet {
        AttributeSet::from_attributes(self.output().iter())
    }

    pub fn child_attributes(&self) -> Vec<AttributeReference> {
        self.children().into_iter().flat_map(|p| p.output().into_iter()).collect()
    }

    /// Resolve a multipart name against the outputs of this node's children.
    /// `Ok(None)` means "not found yet"; ambiguity and bad field accesses are
    /// hard errors.
    pub fn resolve_children(&self, name_parts: &[String], resolver: Resolver) -> Result<Option<Expr>> {
        resolve_against(&self.child_attributes(), name_parts, resolver)
    }

    /// Resolve a multipart name against this node's own output.
    pub fn resolve(&self, name_parts: &[String], resolver: Resolver) -> Result<Option<Expr>> {
        resolve_against(&self.output(), name_parts, resolver)
    }

    /// Rebuild this node with the given children, in order.
    pub fn with_new_children(self, children: Vec<LogicalPlan>) -> LogicalPlan {
        let mut iter = children.into_iter();
        self.map_children(|_| Ok(Transformed::yes(iter.next().unwrap())))
            .unwrap()
            .data
    }
}

/// The attributes an output-expression list advertises.
pub fn named_exprs_to_attributes(exprs: &[Expr]) -> Vec<AttributeReference> {
    exprs.iter().map(|e| {
        match e.to_attribute() {
            Some(a) => a,
            // Not named yet; advertise a placeholder so diagnostics can still
            // print a schema.
            None => AttributeReference::new_with_expr_id(format!("{}", e), DataType::Null, ExprId::placeholder()),
        }
    }).collect()
}

/// Resolve `name_parts` against `input`: first as `qualifier.name`, then as a
/// bare column name; any remaining parts become nested field accesses.
pub fn resolve_against(
    input: &[AttributeReference],
    name_parts: &[String],
    resolver: Resolver,
) -> Result<Option<Expr>> {
    if name_parts.is_empty() {
        return Ok(None);
    }
    let mut candidates: Vec<(&AttributeReference, &[String])> = Vec::new();
    for a in input {
        if name_parts.len() >= 2 {
            if let Some(q) = &a.qualifier {
                if resolver(q, &name_parts[0]) && resolver(&a.name, &name_parts[1]) {
                    candidates.push((a, &name_parts[2..]));
                }
            }
        }
        if resolver(&a.name, &name_parts[0]) {
            candidates.push((a, &name_parts[1..]));
        }
    }
    // The same attribute reached through its qualifier and through its bare
    // name is one candidate, same for duplicated attributes pre self-join
    // deconfliction.
    let mut distinct: Vec<(&AttributeReference, &[String])> = Vec::new();
    for (a, rest) in candidates {
        if !distinct.iter().any(|(d, drest)| d.expr_id == a.expr_id && drest.len() == rest.len()) {
            distinct.push((a, rest));
        }
    }
    match distinct.len() {
        0 => Ok(None),
        1 => {
            let (attr, rest) = distinct[0];
            let mut expr = Expr::AttributeReference(attr.clone());
            for part in rest {
                expr = extract_field(expr, part, resolver)?;
            }
            Ok(Some(expr))
        },
        _ => Err(format!(
            "Reference '{}' is ambiguous, could be: {}",
            name_parts.iter().join("."),
            distinct.iter().map(|(a, _)| a.name.as_str()).join(", "),
        )),
    }
}

impl<'a> TreeNodeContainer<'a, Self> for LogicalPlan {
    fn apply_elements<F: FnMut(&'a Self) -> Result<TreeNodeRecursion>>(
        &'a self,
        mut f: F,
    ) -> Result<TreeNodeRecursion> {
        f(self)
    }

    fn map_elements<F: FnMut(Self) -> Result<Transformed<Self>>>(
        self,
        mut f: F,
    ) -> Result<Transformed<Self>> {
        f(self)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Hash)]
pub struct UnresolvedRelation {
    pub name_parts: Vec<String>,
    pub alias: Option<String>,
}

impl UnresolvedRelation {
    pub fn new(name_parts: Vec<String>, alias: Option<String>) -> Self {
        Self { name_parts, alias }
    }

    /// Only the final identifier segment; database qualifiers do not take part
    /// in CTE matching.
    pub fn table_name(&self) -> &str {
        self.name_parts.last().map(|s| s.as_str()).unwrap_or("")
    }
}

/// A relation whose schema is already known, the shape every catalog lookup
/// resolves to.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Hash)]
pub struct LocalRelation {
    pub name: String,
    pub output: Vec<AttributeReference>,
}

impl LocalRelation {
    pub fn new(name: String, output: Vec<AttributeReference>) -> Self {
        Self { name, output }
    }

    /// Fresh `ExprId`s for every output attribute; used to break self-joins.
    pub fn new_instance(&self) -> Self {
        LocalRelation {
            name: self.name.clone(),
            output: self.output.iter().map(|a| a.new_instance()).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Hash)]
pub struct SubqueryAlias {
    pub identifier: String,
    pub child: Arc<LogicalPlan>,
}

impl SubqueryAlias {
    pub fn new(identifier: String, child: Arc<LogicalPlan>) -> Self {
        Self { identifier, child }
    }

    pub fn output(&self) -> Vec<AttributeReference> {
        self.child.output().into_iter().map(|a| a.with_qualifier(self.identifier.clone())).collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Hash)]
pub struct Project {
    pub project_list: Vec<Expr>,
    pub child: Arc<LogicalPlan>,
}

impl Project {
    pub fn new(project_list: Vec<Expr>, child: Arc<LogicalPlan>) -> Self {
        Self { project_list, child }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Hash)]
pub struct Filter {
    pub condition: Expr,
    pub child: Arc<LogicalPlan>,
}

impl Filter {
    pub fn new(condition: Expr, child: Arc<LogicalPlan>) -> Self {
        Self { condition, child }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Hash)]
pub struct Sort {
    /// `Expr::SortOrder` entries.
    pub order: Vec<Expr>,
    pub child: Arc<LogicalPlan>,
}

impl Sort {
    pub fn new(order: Vec<Expr>, child: Arc<LogicalPlan>) -> Self {
        Self { order, child }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Hash)]
pub struct Aggregate {
    pub grouping_exprs: Vec<Expr>,
    pub aggregate_exprs: Vec<Expr>,
    pub child: Arc<LogicalPlan>,
}

impl Aggregate {
    pub fn new(grouping_exprs: Vec<Expr>, aggregate_exprs: Vec<Expr>, child: Arc<LogicalPlan>) -> Self {
        Self { grouping_exprs, aggregate_exprs, child }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Hash)]
pub enum JoinType {
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
    LeftSemi,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Hash)]
pub struct Join {
    pub left: Arc<LogicalPlan>,
    pub right: Arc<LogicalPlan>,
    pub join_type: JoinType,
    pub condition: Option<Expr>,
}

impl Join {
    pub fn new(left: Arc<LogicalPlan>, right: Arc<LogicalPlan>, join_type: JoinType, condition: Option<Expr>) -> Self {
        Self { left, right, join_type, condition }
    }

    pub fn output(&self) -> Vec<AttributeReference> {
        match self.join_type {
            JoinType::Inner => {
                self.left.output().into_iter().chain(self.right.output()).collect()
            },
            JoinType::LeftOuter => {
                self.left.output().into_iter()
                    .chain(self.right.output().into_iter().map(|a| a.with_nullability(true)))
                    .collect()
            },
            JoinType::RightOuter => {
                self.left.output().into_iter().map(|a| a.with_nullability(true))
                    .chain(self.right.output())
                    .collect()
            },
            JoinType::FullOuter => {
                self.left.output().into_iter().map(|a| a.with_nullability(true))
                    .chain(self.right.output().into_iter().map(|a| a.with_nullability(true)))
                    .collect()
            },
            JoinType::LeftSemi => self.left.output(),
        }
    }

    /// A plan joined with a copy of itself aliases `ExprId`s between the two
    /// sides; the join stays unresolved until the right side is freshened.
    pub fn self_join_resolved(&self) -> bool {
        !self.left.output_set().intersects(&self.right.output_set())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Hash)]
pub struct Generate {
    pub generator: Expr,
    /// When true the generator output is appended to the child's columns
    /// (LATERAL VIEW); otherwise only the generated columns survive.
    pub join: bool,
    pub outer: bool,
    pub qualifier: Option<String>,
    pub generator_output: Vec<Expr>,
    pub child: Arc<LogicalPlan>,
}

impl Generate {
    pub fn new(
        generator: Expr,
        join: bool,
        outer: bool,
        qualifier: Option<String>,
        generator_output: Vec<Expr>,
        child: Arc<LogicalPlan>,
    ) -> Self {
        Self { generator, join, outer, qualifier, generator_output, child }
    }

    pub fn resolved(&self) -> bool {
        self.generator.resolved()
            && self.generator_output.iter().all(|e| e.resolved())
            && self.child.resolved()
            && self.generator_output_check()
    }

    pub fn generator_output_check(&self) -> bool {
        if let Expr::Generator(g) = &self.generator {
            g.element_schema().fields.len() == self.generator_output.len()
        } else {
            false
        }
    }

    pub fn output(&self) -> Vec<AttributeReference> {
        if self.join {
            let mut output = self.child.output();
            for e in self.qualified_generator_output() {
                output.push(e);
            }
            output
        } else {
            self.qualified_generator_output()
        }
    }

    fn qualified_generator_output(&self) -> Vec<AttributeReference> {
        self.generator_output.iter().map(|e| {
            match e {
                Expr::AttributeReference(a) => a.clone(),
                e => AttributeReference::new_with_expr_id(format!("{}", e), DataType::Null, ExprId::placeholder()),
            }
        }).map(|a| {
            if let Some(qualifier) = &self.qualifier {
                a.with_qualifier(qualifier.clone())
            } else {
                a
            }
        }).collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Hash)]
pub struct Window {
    /// The child attributes passed through untouched.
    pub project_list: Vec<AttributeReference>,
    /// Aliased `WindowExpression`s, all sharing `spec`.
    pub window_exprs: Vec<Expr>,
    pub spec: WindowSpecDefinition,
    pub child: Arc<LogicalPlan>,
}

impl Window {
    pub fn new(
        project_list: Vec<AttributeReference>,
        window_exprs: Vec<Expr>,
        spec: WindowSpecDefinition,
        child: Arc<LogicalPlan>,
    ) -> Self {
        Self { project_list, window_exprs, spec, child }
    }

    pub fn output(&self) -> Vec<AttributeReference> {
        let mut output = self.project_list.clone();
        for e in &self.window_exprs {
            match e.to_attribute() {
                Some(a) => output.push(a),
                None => output.push(AttributeReference::new_with_expr_id(
                    format!("{}", e), DataType::Null, ExprId::placeholder())),
            }
        }
        output
    }
}

/// Emits each input row once per bitmask, nulling the group-by columns the
/// mask excludes and tagging the copy with the grouping id.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Hash)]
pub struct Expand {
    pub bitmasks: Vec<i64>,
    pub group_by_attrs: Vec<AttributeReference>,
    pub gid: AttributeReference,
    pub child: Arc<LogicalPlan>,
}

impl Expand {
    pub fn new(
        bitmasks: Vec<i64>,
        group_by_attrs: Vec<AttributeReference>,
        gid: AttributeReference,
        child: Arc<LogicalPlan>,
    ) -> Self {
        Self { bitmasks, group_by_attrs, gid, child }
    }

    pub fn output(&self) -> Vec<AttributeReference> {
        let grouped = AttributeSet::from_attributes(self.group_by_attrs.iter());
        let mut output: Vec<AttributeReference> = self.child.output().into_iter().map(|a| {
            // Nulled-out copies make every grouped column nullable.
            if grouped.contains(&a) { a.with_nullability(true) } else { a }
        }).collect();
        output.push(self.gid.clone());
        output
    }
}

/// Binds CTE names to their plans until `CTESubstitution` inlines them.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Hash)]
pub struct With {
    pub child: Arc<LogicalPlan>,
    pub cte_relations: Vec<(String, LogicalPlan)>,
}

impl With {
    pub fn new(child: Arc<LogicalPlan>, cte_relations: Vec<(String, LogicalPlan)>) -> Self {
        Self { child, cte_relations }
    }
}

/// Binds WINDOW-clause specification names until `WindowsSubstitution`
/// inlines them.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Hash)]
pub struct WithWindowDefinition {
    pub window_definitions: Vec<(String, WindowSpecDefinition)>,
    pub child: Arc<LogicalPlan>,
}

impl WithWindowDefinition {
    pub fn new(window_definitions: Vec<(String, WindowSpecDefinition)>, child: Arc<LogicalPlan>) -> Self {
        Self { window_definitions, child }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Hash)]
pub struct InsertIntoTable {
    pub table: Arc<LogicalPlan>,
    pub child: Arc<LogicalPlan>,
    pub overwrite: bool,
}

impl InsertIntoTable {
    pub fn new(table: Arc<LogicalPlan>, child: Arc<LogicalPlan>, overwrite: bool) -> Self {
        Self { table, child, overwrite }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Hash)]
pub struct Cube {
    pub group_by_exprs: Vec<Expr>,
    pub aggregations: Vec<Expr>,
    pub child: Arc<LogicalPlan>,
}

impl Cube {
    pub fn new(group_by_exprs: Vec<Expr>, aggregations: Vec<Expr>, child: Arc<LogicalPlan>) -> Self {
        Self { group_by_exprs, aggregations, child }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Hash)]
pub struct Rollup {
    pub group_by_exprs: Vec<Expr>,
    pub aggregations: Vec<Expr>,
    pub child: Arc<LogicalPlan>,
}

impl Rollup {
    pub fn new(group_by_exprs: Vec<Expr>, aggregations: Vec<Expr>, child: Arc<LogicalPlan>) -> Self {
        Self { group_by_exprs, aggregations, child }
    }
}

/// The explicit form CUBE and ROLLUP desugar into: one bitmask per grouping
/// set, bit i covering `group_by_exprs[i]`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Hash)]
pub struct GroupingSets {
    pub bitmasks: Vec<i64>,
    pub group_by_exprs: Vec<Expr>,
    pub aggregations: Vec<Expr>,
    pub child: Arc<LogicalPlan>,
}

impl GroupingSets {
    pub fn new(bitmasks: Vec<i64>, group_by_exprs: Vec<Expr>, aggregations: Vec<Expr>, child: Arc<LogicalPlan>) -> Self {
        Self { bitmasks, group_by_exprs, aggregations, child }
    }
}

/// `TRANSFORM (...) USING 'script'`; the output schema is declared, not
/// inferred.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Hash)]
pub struct ScriptTransformation {
    pub input: Vec<Expr>,
    pub script: String,
    pub output: Vec<AttributeReference>,
    pub child: Arc<LogicalPlan>,
}

impl ScriptTransformation {
    pub fn new(input: Vec<Expr>, script: String, output: Vec<AttributeReference>, child: Arc<LogicalPlan>) -> Self {
        Self { input, script, output, child }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::case_insensitive_resolution;
    use crate::types::{DataType, Field, Fields};

    fn relation() -> LogicalPlan {
        LogicalPlan::LocalRelation(LocalRelation::new("t".to_string(), vec![
            AttributeReference::new("a", DataType::Int),
            AttributeReference::new("b", DataType::String),
        ]))
    }

    #[test]
    fn test_subquery_alias_qualifies_output() {
        let plan = LogicalPlan::SubqueryAlias(SubqueryAlias::new("q".to_string(), Arc::new(relation())));
        let output = plan.output();
        assert!(output.iter().all(|a| a.qualifier.as_deref() == Some("q")));
        // qualified and bare lookups hit the same attribute
        let by_name = plan.resolve(&["a".to_string()], case_insensitive_resolution).unwrap().unwrap();
        let qualified = plan.resolve(&["q".to_string(), "a".to_string()], case_insensitive_resolution).unwrap().unwrap();
        assert_eq!(by_name.to_attribute().unwrap().expr_id, qualified.to_attribute().unwrap().expr_id);
    }

    #[test]
    fn test_resolve_ambiguous_reference() {
        let left = relation();
        let right = LogicalPlan::LocalRelation(LocalRelation::new("u".to_string(), vec![
            AttributeReference::new("a", DataType::Int),
        ]));
        let join = LogicalPlan::Join(Join::new(Arc::new(left), Arc::new(right), JoinType::Inner, None));
        let err = resolve_against(&join.output(), &["a".to_string()], case_insensitive_resolution).unwrap_err();
        assert!(err.contains("ambiguous"), "{}", err);
    }

    #[test]
    fn test_resolve_nested_field() {
        let s = AttributeReference::new("s", DataType::Struct(Fields(vec![
            Field::new("f1", DataType::Int),
        ])));
        let resolved = resolve_against(
            &[s], &["s".to_string(), "f1".to_string()], case_insensitive_resolution,
        ).unwrap().unwrap();
        assert!(matches!(resolved, Expr::GetStructField(_)));
        assert_eq!(resolved.data_type(), &DataType::Int);
    }

    #[test]
    fn test_with_new_children() {
        let filter = LogicalPlan::Filter(Filter::new(
            Expr::boolean_lit(true),
            Arc::new(relation()),
        ));
        let other = LogicalPlan::LocalRelation(LocalRelation::new("o".to_string(), vec![
            AttributeReference::new("z", DataType::Long),
        ]));
        let rebuilt = filter.with_new_children(vec![other.clone()]);
        assert_eq!(rebuilt.children(), vec![&other]);
    }

    #[test]
    fn test_join_nullability() {
        let left = relation();
        let right = LogicalPlan::LocalRelation(LocalRelation::new("u".to_string(), vec![
            AttributeReference::new("c", DataType::Int).with_nullability(false),
        ]));
        let join = Join::new(Arc::new(left), Arc::new(right), JoinType::LeftOuter, None);
        let output = join.output();
        assert!(output.last().unwrap().nullable, "left outer join makes right columns nullable");
    }
}
