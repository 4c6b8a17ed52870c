use std::sync::Arc;
use log::{debug, trace};
use crate::Result;
use crate::analysis::check::check_analysis;
use crate::analysis::grouping::ResolveGroupingAnalytics;
use crate::analysis::rule::*;
use crate::analysis::type_coercion::type_coercion_rules;
use crate::analysis::window::ExtractWindowExpressions;
use crate::catalog::Catalog;
use crate::logical_plan::LogicalPlan;

/// String equality used for every name comparison in the analyzer.
pub type Resolver = fn(&str, &str) -> bool;

pub fn case_sensitive_resolution(a: &str, b: &str) -> bool {
    a == b
}

pub fn case_insensitive_resolution(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

#[derive(Clone, Copy, Debug)]
pub struct AnalyzerConfig {
    pub case_sensitive: bool,
    pub max_iterations: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self { case_sensitive: false, max_iterations: 100 }
    }
}

impl AnalyzerConfig {
    pub fn resolver(&self) -> Resolver {
        if self.case_sensitive {
            case_sensitive_resolution
        } else {
            case_insensitive_resolution
        }
    }
}

/// How a batch of rules runs: a single pass, or repeated passes until the
/// plan stops changing (bounded by `max_iterations`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    Once,
    FixedPoint,
}

pub struct Batch {
    pub name: &'static str,
    pub strategy: Strategy,
    pub rules: Vec<Arc<dyn AnalyzerRule>>,
}

impl Batch {
    pub fn new(name: &'static str, strategy: Strategy, rules: Vec<Arc<dyn AnalyzerRule>>) -> Self {
        Self { name, strategy, rules }
    }
}

/// Turns parsed-but-unresolved logical plans into resolved ones by running
/// rule batches to fixed point, then checking the result.
pub struct Analyzer {
    catalog: Arc<dyn Catalog>,
    config: AnalyzerConfig,
    /// Appended to the Resolution batch; the injection point for callers that
    /// bring their own rules.
    pub extended_resolution_rules: Vec<Arc<dyn AnalyzerRule>>,
}

impl Analyzer {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self::with_config(catalog, AnalyzerConfig::default())
    }

    pub fn with_config(catalog: Arc<dyn Catalog>, config: AnalyzerConfig) -> Self {
        Self { catalog, config, extended_resolution_rules: Vec::new() }
    }

    pub fn add_resolution_rule(&mut self, rule: Arc<dyn AnalyzerRule>) {
        self.extended_resolution_rules.push(rule);
    }

    fn batches(&self) -> Vec<Batch> {
        let resolver = self.config.resolver();
        let mut resolution: Vec<Arc<dyn AnalyzerRule>> = vec![
            Arc::new(ResolveRelations::new(self.catalog.clone())),
            Arc::new(ResolveReferences::new(resolver)),
            Arc::new(ResolveGroupingAnalytics),
            Arc::new(ResolveSortReferences::new(resolver)),
            Arc::new(ResolveGenerate),
            Arc::new(ResolveFunctions),
            Arc::new(ResolveAliases),
            Arc::new(ExtractWindowExpressions),
            Arc::new(GlobalAggregates),
            Arc::new(UnresolvedHavingClauseAttributes::new(resolver)),
        ];
        resolution.extend(type_coercion_rules());
        for rule in &self.extended_resolution_rules {
            resolution.push(rule.clone());
        }
        vec![
            Batch::new("Substitution", Strategy::FixedPoint, vec![
                Arc::new(CTESubstitution::new(self.config.resolver())),
                Arc::new(WindowsSubstitution::new(self.config.resolver())),
            ]),
            Batch::new("Resolution", Strategy::FixedPoint, resolution),
            Batch::new("Nondeterministic", Strategy::Once, vec![
                Arc::new(PullOutNondeterministic),
            ]),
        ]
    }

    /// Run every batch, then fail on anything left unresolved.
    pub fn analyze(&self, plan: LogicalPlan) -> Result<LogicalPlan> {
        let mut plan = plan;
        for batch in self.batches() {
            plan = self.execute_batch(&batch, plan)?;
        }
        check_analysis(&plan)?;
        Ok(plan)
    }

    fn execute_batch(&self, batch: &Batch, plan: LogicalPlan) -> Result<LogicalPlan> {
        let mut plan = plan;
        let mut iteration = 0;
        loop {
            iteration += 1;
            let before = plan.clone();
            let mut last_changing_rule = "";
            for rule in &batch.rules {
                let result = rule.analyze(plan)?;
                if result.transformed {
                    trace!("batch {} rule {} rewrote the plan to:\n{:?}", batch.name, rule.name(), result.data);
                    last_changing_rule = rule.name();
                }
                plan = result.data;
            }
            if batch.strategy == Strategy::Once {
                return Ok(plan);
            }
            // Termination is decided by structural equality, not by what the
            // rules claim they did.
            if plan == before {
                debug!("batch {} reached fixed point after {} iteration(s)", batch.name, iteration);
                return Ok(plan);
            }
            if iteration >= self.config.max_iterations {
                return Err(format!(
                    "Max iterations ({}) reached for batch {}, latest changing rule {}",
                    self.config.max_iterations, batch.name, last_changing_rule,
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::analysis::GROUPING_ID_NAME;
    use crate::catalog::MemoryCatalog;
    use crate::expr::*;
    use crate::logical_plan::*;
    use crate::tree_node::{TreeNode, TreeNodeRecursion};
    use crate::types::{DataType, Field, Fields, Schema};

    fn catalog() -> Arc<MemoryCatalog> {
        let mut catalog = MemoryCatalog::new();
        catalog.register_table("r", &Schema::new(vec![
            Field::new("a", DataType::Int),
            Field::new("b", DataType::String),
        ]));
        catalog.register_table("t", &Schema::new(vec![
            Field::new("x", DataType::Int),
        ]));
        catalog.register_table("t2", &Schema::new(vec![
            Field::new("a", DataType::Int),
            Field::new("x", DataType::Int),
        ]));
        catalog.register_table("n", &Schema::new(vec![
            Field::new("id", DataType::Int),
            Field::new("s", DataType::Struct(Fields(vec![
                Field::new("f1", DataType::Int),
                Field::new("f2", DataType::String),
            ]))),
            Field::new("xs", DataType::Array(Box::new(DataType::Int))),
        ]));
        catalog.register_table("c", &Schema::new(vec![
            Field::new("z", DataType::Int),
        ]));
        Arc::new(catalog)
    }

    fn analyzer() -> Analyzer {
        Analyzer::new(catalog())
    }

    fn table(name: &str) -> LogicalPlan {
        LogicalPlan::UnresolvedRelation(UnresolvedRelation::new(vec![name.to_string()], None))
    }

    fn ua(name: &str) -> Expr {
        Expr::unresolved_attribute(name)
    }

    fn uf(name: &str, args: Vec<Expr>) -> Expr {
        Expr::UnresolvedFunction(UnresolvedFunction::new(name, args, false))
    }

    fn assert_fully_resolved(plan: &LogicalPlan) {
        assert!(plan.resolved(), "plan not resolved:\n{:?}", plan);
        plan.apply(|p| {
            assert!(!matches!(p, LogicalPlan::UnresolvedRelation(_)), "unresolved relation left in {:?}", p);
            for e in p.expressions() {
                e.apply(|x| {
                    assert!(!matches!(x,
                        Expr::UnresolvedAttribute(_) | Expr::UnresolvedFunction(_) | Expr::UnresolvedAlias(_)
                        | Expr::UnresolvedExtractValue(_) | Expr::UnresolvedWindowExpression(_)
                        | Expr::Star(_) | Expr::MultiAlias(_)), "unresolved expression {:?}", x);
                    Ok(TreeNodeRecursion::Continue)
                }).unwrap();
            }
            Ok(TreeNodeRecursion::Continue)
        }).unwrap();
    }

    #[test]
    fn test_project_over_subquery() {
        // SELECT a, b FROM (SELECT * FROM r) q
        let plan = LogicalPlan::Project(Project::new(
            vec![ua("a"), ua("b")],
            Arc::new(LogicalPlan::SubqueryAlias(SubqueryAlias::new(
                "q".to_string(),
                Arc::new(LogicalPlan::Project(Project::new(
                    vec![Expr::Star(Star::new(None))],
                    Arc::new(table("r")),
                ))),
            ))),
        ));
        let analyzed = analyzer().analyze(plan).unwrap();
        assert_fully_resolved(&analyzed);
        let output = analyzed.output();
        assert_eq!(output.iter().map(|a| a.name.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(output[0].data_type, DataType::Int);
        assert_eq!(output[1].data_type, DataType::String);

        // SELECT * FROM r keeps the relation's schema in order
        let star = LogicalPlan::Project(Project::new(vec![Expr::Star(Star::new(None))], Arc::new(table("r"))));
        let star = analyzer().analyze(star).unwrap();
        let stripped = eliminate_subquery_aliases(star);
        let names: Vec<_> = stripped.output().into_iter().map(|a| (a.name, a.data_type)).collect();
        assert_eq!(names, vec![("a".to_string(), DataType::Int), ("b".to_string(), DataType::String)]);
    }

    #[test]
    fn test_order_by_column_missing_from_select() {
        // SELECT a FROM r ORDER BY b
        let plan = LogicalPlan::Sort(Sort::new(
            vec![ua("b").asc()],
            Arc::new(LogicalPlan::Project(Project::new(vec![ua("a")], Arc::new(table("r"))))),
        ));
        let analyzed = analyzer().analyze(plan).unwrap();
        assert_fully_resolved(&analyzed);
        // Project[a] over Sort[b] over Project[a, b]
        let LogicalPlan::Project(outer) = &analyzed else { panic!("expected project, got {:?}", analyzed) };
        assert_eq!(analyzed.output().iter().map(|a| a.name.as_str()).collect::<Vec<_>>(), vec!["a"]);
        let LogicalPlan::Sort(sort) = outer.child.as_ref() else { panic!("expected sort") };
        let LogicalPlan::Project(inner) = sort.child.as_ref() else { panic!("expected inner project") };
        assert_eq!(inner.project_list.len(), 2);
        let sorted_by = collect_attributes(&sort.order[0]);
        assert_eq!(sorted_by.len(), 1);
        assert_eq!(sorted_by[0].name, "b");
    }

    #[test]
    fn test_having_lifts_condition_into_aggregate() {
        // SELECT SUM(x) sum FROM t HAVING SUM(x) > 10
        let plan = LogicalPlan::Filter(Filter::new(
            uf("sum", vec![ua("x")]).gt(Expr::int_lit(10)),
            Arc::new(LogicalPlan::Aggregate(Aggregate::new(
                vec![],
                vec![uf("sum", vec![ua("x")]).alias("sum")],
                Arc::new(table("t")),
            ))),
        ));
        let analyzed = analyzer().analyze(plan).unwrap();
        assert_fully_resolved(&analyzed);
        assert_eq!(analyzed.output().iter().map(|a| a.name.as_str()).collect::<Vec<_>>(), vec!["sum"]);
        let LogicalPlan::Project(outer) = &analyzed else { panic!("expected project") };
        let LogicalPlan::Filter(filter) = outer.child.as_ref() else { panic!("expected filter") };
        let Expr::AttributeReference(cond) = &filter.condition else { panic!("expected attribute condition") };
        assert_eq!(cond.name, "havingCondition");
        assert_eq!(cond.data_type, DataType::Boolean);
        let LogicalPlan::Aggregate(agg) = filter.child.as_ref() else { panic!("expected aggregate") };
        assert_eq!(agg.aggregate_exprs.len(), 2);
        assert_eq!(agg.aggregate_exprs[0].name(), Some("havingCondition"));
        assert_eq!(agg.aggregate_exprs[1].name(), Some("sum"));
    }

    #[test]
    fn test_rollup_lowering() {
        // SELECT a, b FROM r GROUP BY a, b WITH ROLLUP
        let plan = LogicalPlan::Rollup(Rollup::new(
            vec![ua("a"), ua("b")],
            vec![Expr::UnresolvedAlias(UnresolvedAlias::new(ua("a"))),
                 Expr::UnresolvedAlias(UnresolvedAlias::new(ua("b")))],
            Arc::new(table("r")),
        ));
        let analyzed = analyzer().analyze(plan).unwrap();
        assert_fully_resolved(&analyzed);
        let LogicalPlan::Aggregate(agg) = &analyzed else { panic!("expected aggregate, got {:?}", analyzed) };
        assert_eq!(agg.grouping_exprs.len(), 3);
        let gid = agg.grouping_exprs[2].to_attribute().unwrap();
        assert_eq!(gid.name, GROUPING_ID_NAME);
        assert_eq!(gid.data_type, DataType::Int);
        assert!(!gid.nullable);
        assert_eq!(agg.aggregate_exprs.len(), 2);
        let LogicalPlan::Expand(expand) = agg.child.as_ref() else { panic!("expected expand") };
        assert_eq!(expand.bitmasks, vec![0, 1, 3]);
        assert_eq!(expand.group_by_attrs.len(), 2);
        assert_eq!(expand.gid.expr_id, gid.expr_id);
    }

    #[test]
    fn test_cube_lowering() {
        let plan = LogicalPlan::Cube(Cube::new(
            vec![ua("a"), ua("b")],
            vec![Expr::UnresolvedAlias(UnresolvedAlias::new(ua("a"))),
                 Expr::UnresolvedAlias(UnresolvedAlias::new(uf("count", vec![ua("b")])))],
            Arc::new(table("r")),
        ));
        let analyzed = analyzer().analyze(plan).unwrap();
        assert_fully_resolved(&analyzed);
        let LogicalPlan::Aggregate(agg) = &analyzed else { panic!("expected aggregate") };
        let LogicalPlan::Expand(expand) = agg.child.as_ref() else { panic!("expected expand") };
        assert_eq!(expand.bitmasks, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_rank_window() {
        // SELECT rank() OVER (PARTITION BY a ORDER BY b) FROM r
        let spec = WindowSpecDefinition::new(vec![ua("a")], vec![ua("b").asc()]);
        let plan = LogicalPlan::Project(Project::new(
            vec![Expr::UnresolvedAlias(UnresolvedAlias::new(
                Expr::WindowExpression(WindowExpression::new(uf("rank", vec![]), spec)),
            ))],
            Arc::new(table("r")),
        ));
        let analyzed = analyzer().analyze(plan).unwrap();
        assert_fully_resolved(&analyzed);
        assert_eq!(analyzed.output().len(), 1);
        let LogicalPlan::Project(outer) = &analyzed else { panic!("expected project") };
        let LogicalPlan::Project(mid) = outer.child.as_ref() else { panic!("expected mid project") };
        let LogicalPlan::Window(window) = mid.child.as_ref() else { panic!("expected window") };
        assert_eq!(window.window_exprs.len(), 1);
        assert!(matches!(&window.window_exprs[0], Expr::Alias(a)
            if matches!(a.child.as_ref(), Expr::WindowExpression(_))));
        assert_eq!(window.spec.partition_spec.len(), 1);
        assert_eq!(window.spec.order_spec.len(), 1);
        let LogicalPlan::Project(input) = window.child.as_ref() else { panic!("expected input project") };
        let names: Vec<_> = input.project_list.iter().filter_map(|e| e.name()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_windowed_aggregate_over_group_by() {
        // SELECT a, sum(x) s, rank() OVER (ORDER BY a) rk FROM t2 GROUP BY a
        let spec = WindowSpecDefinition::new(vec![], vec![ua("a").asc()]);
        let plan = LogicalPlan::Aggregate(Aggregate::new(
            vec![ua("a")],
            vec![
                Expr::UnresolvedAlias(UnresolvedAlias::new(ua("a"))),
                uf("sum", vec![ua("x")]).alias("s"),
                Expr::WindowExpression(WindowExpression::new(uf("rank", vec![]), spec)).alias("rk"),
            ],
            Arc::new(table("t2")),
        ));
        let analyzed = analyzer().analyze(plan).unwrap();
        assert_fully_resolved(&analyzed);
        assert_eq!(analyzed.output().iter().map(|a| a.name.as_str()).collect::<Vec<_>>(), vec!["a", "s", "rk"]);
        let LogicalPlan::Project(outer) = &analyzed else { panic!("expected project") };
        let LogicalPlan::Project(mid) = outer.child.as_ref() else { panic!("expected project under project") };
        let LogicalPlan::Window(window) = mid.child.as_ref() else { panic!("expected window") };
        let LogicalPlan::Aggregate(agg) = window.child.as_ref() else { panic!("expected aggregate under window") };
        assert_eq!(agg.grouping_exprs.len(), 1);
    }

    #[test]
    fn test_missing_window_definition_is_fatal() {
        let plan = LogicalPlan::WithWindowDefinition(WithWindowDefinition::new(
            vec![("w1".to_string(), WindowSpecDefinition::new(vec![ua("a")], vec![]))],
            Arc::new(LogicalPlan::Project(Project::new(
                vec![Expr::UnresolvedAlias(UnresolvedAlias::new(
                    Expr::UnresolvedWindowExpression(UnresolvedWindowExpression::new(
                        uf("rank", vec![]),
                        WindowSpecReference("w2".to_string()),
                    )),
                ))],
                Arc::new(table("r")),
            ))),
        ));
        let err = analyzer().analyze(plan).unwrap_err();
        assert!(err.contains("Window specification w2 is not defined"), "{}", err);
    }

    #[test]
    fn test_named_window_definition() {
        let plan = LogicalPlan::WithWindowDefinition(WithWindowDefinition::new(
            vec![("w1".to_string(), WindowSpecDefinition::new(vec![ua("a")], vec![ua("b").asc()]))],
            Arc::new(LogicalPlan::Project(Project::new(
                vec![Expr::UnresolvedAlias(UnresolvedAlias::new(
                    Expr::UnresolvedWindowExpression(UnresolvedWindowExpression::new(
                        uf("row_number", vec![]),
                        WindowSpecReference("w1".to_string()),
                    )),
                ))],
                Arc::new(table("r")),
            ))),
        ));
        let analyzed = analyzer().analyze(plan).unwrap();
        assert_fully_resolved(&analyzed);
    }

    #[test]
    fn test_self_join_gets_fresh_expr_ids() {
        // SELECT * FROM r JOIN r (no ON clause)
        let plan = LogicalPlan::Join(Join::new(
            Arc::new(table("r")),
            Arc::new(table("r")),
            JoinType::Inner,
            None,
        ));
        let analyzed = analyzer().analyze(plan).unwrap();
        assert_fully_resolved(&analyzed);
        let output = analyzed.output();
        assert_eq!(output.len(), 4);
        let mut ids: Vec<_> = output.iter().map(|a| a.expr_id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 4, "expr ids must be disjoint across the two sides");
        let LogicalPlan::Join(join) = &analyzed else { panic!("expected join") };
        assert!(join.self_join_resolved());
        // names survive the freshening
        assert_eq!(output.iter().map(|a| a.name.as_str()).collect::<Vec<_>>(), vec!["a", "b", "a", "b"]);
    }

    #[test]
    fn test_self_join_with_prebound_condition() {
        let relation = catalog().lookup_relation(&crate::catalog::TableIdentifier::new("r"), None).unwrap();
        let a = relation.output()[0].clone();
        let plan = LogicalPlan::Join(Join::new(
            Arc::new(relation.clone()),
            Arc::new(relation),
            JoinType::Inner,
            Some(Expr::AttributeReference(a.clone()).eq(Expr::AttributeReference(a))),
        ));
        let analyzed = analyzer().analyze(plan).unwrap();
        assert_fully_resolved(&analyzed);
        assert_eq!(analyzed.output().len(), 4);
    }

    #[test]
    fn test_cte_shadows_catalog_table() {
        // WITH c AS (SELECT a FROM r) SELECT * FROM c; the catalog also has a
        // table named c with a different schema.
        let cte = LogicalPlan::Project(Project::new(
            vec![Expr::UnresolvedAlias(UnresolvedAlias::new(ua("a")))],
            Arc::new(table("r")),
        ));
        let plan = LogicalPlan::With(With::new(
            Arc::new(LogicalPlan::Project(Project::new(
                vec![Expr::Star(Star::new(None))],
                Arc::new(table("c")),
            ))),
            vec![("c".to_string(), cte)],
        ));
        let analyzed = analyzer().analyze(plan).unwrap();
        assert_fully_resolved(&analyzed);
        let output = analyzed.output();
        assert_eq!(output.len(), 1);
        assert_eq!(output[0].name, "a");
        assert_eq!(output[0].data_type, DataType::Int);
    }

    #[test]
    fn test_lateral_view_explode() {
        // SELECT id, data FROM n LATERAL VIEW explode(xs) v AS data
        let plan = LogicalPlan::Project(Project::new(
            vec![ua("id"), ua("data")],
            Arc::new(LogicalPlan::Generate(Generate::new(
                uf("explode", vec![ua("xs")]),
                true,
                false,
                Some("v".to_string()),
                vec![ua("data")],
                Arc::new(table("n")),
            ))),
        ));
        let analyzed = analyzer().analyze(plan).unwrap();
        assert_fully_resolved(&analyzed);
        let output = analyzed.output();
        assert_eq!(output.iter().map(|a| a.name.as_str()).collect::<Vec<_>>(), vec!["id", "data"]);
        assert_eq!(output[1].data_type, DataType::Int);
    }

    #[test]
    fn test_generator_in_select_list() {
        // SELECT explode(xs) AS data FROM n
        let plan = LogicalPlan::Project(Project::new(
            vec![uf("explode", vec![ua("xs")]).alias("data")],
            Arc::new(table("n")),
        ));
        let analyzed = analyzer().analyze(plan).unwrap();
        assert_fully_resolved(&analyzed);
        let LogicalPlan::Project(p) = &analyzed else { panic!("expected project") };
        let LogicalPlan::Generate(generate) = p.child.as_ref() else { panic!("expected generate, got {:?}", p.child) };
        assert!(!generate.join);
        assert!(!generate.outer);
        assert_eq!(analyzed.output().iter().map(|a| a.name.as_str()).collect::<Vec<_>>(), vec!["data"]);
    }

    #[test]
    fn test_two_generators_fail() {
        let plan = LogicalPlan::Project(Project::new(
            vec![
                uf("explode", vec![ua("xs")]).alias("d1"),
                uf("explode", vec![ua("xs")]).alias("d2"),
            ],
            Arc::new(table("n")),
        ));
        let err = analyzer().analyze(plan).unwrap_err();
        assert!(err.contains("Only one generator allowed"), "{}", err);
        assert!(err.contains("explode"), "{}", err);
    }

    #[test]
    fn test_single_name_over_multi_column_generator_fails() {
        let plan = LogicalPlan::Project(Project::new(
            vec![uf("posexplode", vec![ua("xs")]).alias("p")],
            Arc::new(table("n")),
        ));
        let err = analyzer().analyze(plan).unwrap_err();
        assert!(err.contains("Expect multiple names"), "{}", err);
    }

    #[test]
    fn test_generator_alias_count_mismatch_fails() {
        let plan = LogicalPlan::Project(Project::new(
            vec![Expr::MultiAlias(MultiAlias::new(
                uf("posexplode", vec![ua("xs")]),
                vec!["p1".to_string(), "p2".to_string(), "p3".to_string()],
            ))],
            Arc::new(table("n")),
        ));
        let err = analyzer().analyze(plan).unwrap_err();
        assert!(err.contains("number of aliases"), "{}", err);
    }

    #[test]
    fn test_multi_alias_generator() {
        let plan = LogicalPlan::Project(Project::new(
            vec![Expr::MultiAlias(MultiAlias::new(
                uf("posexplode", vec![ua("xs")]),
                vec!["p".to_string(), "item".to_string()],
            ))],
            Arc::new(table("n")),
        ));
        let analyzed = analyzer().analyze(plan).unwrap();
        assert_fully_resolved(&analyzed);
        assert_eq!(analyzed.output().iter().map(|a| a.name.as_str()).collect::<Vec<_>>(), vec!["p", "item"]);
    }

    #[test]
    fn test_global_aggregate() {
        // SELECT sum(x) FROM t
        let plan = LogicalPlan::Project(Project::new(
            vec![Expr::UnresolvedAlias(UnresolvedAlias::new(uf("sum", vec![ua("x")])))],
            Arc::new(table("t")),
        ));
        let analyzed = analyzer().analyze(plan).unwrap();
        assert_fully_resolved(&analyzed);
        let LogicalPlan::Aggregate(agg) = &analyzed else { panic!("expected aggregate, got {:?}", analyzed) };
        assert!(agg.grouping_exprs.is_empty());
        assert_eq!(analyzed.output()[0].data_type, DataType::Long);
    }

    #[test]
    fn test_order_by_aggregate_reuses_existing_column() {
        // SELECT a, sum(x) s FROM t2 GROUP BY a ORDER BY sum(x)
        let plan = LogicalPlan::Sort(Sort::new(
            vec![uf("sum", vec![ua("x")]).asc()],
            Arc::new(LogicalPlan::Aggregate(Aggregate::new(
                vec![ua("a")],
                vec![Expr::UnresolvedAlias(UnresolvedAlias::new(ua("a"))),
                     uf("sum", vec![ua("x")]).alias("s")],
                Arc::new(table("t2")),
            ))),
        ));
        let analyzed = analyzer().analyze(plan).unwrap();
        assert_fully_resolved(&analyzed);
        let LogicalPlan::Project(outer) = &analyzed else { panic!("expected project") };
        assert_eq!(analyzed.output().iter().map(|a| a.name.as_str()).collect::<Vec<_>>(), vec!["a", "s"]);
        let LogicalPlan::Sort(sort) = outer.child.as_ref() else { panic!("expected sort") };
        let LogicalPlan::Aggregate(agg) = sort.child.as_ref() else { panic!("expected aggregate") };
        // sum(x) was already computed as s; no extra column needed
        assert_eq!(agg.aggregate_exprs.len(), 2);
        let sorted_by = collect_attributes(&sort.order[0]);
        assert_eq!(sorted_by.len(), 1);
        assert_eq!(sorted_by[0].name, "s");
    }

    #[test]
    fn test_order_by_aggregate_lifts_fresh_aggregate() {
        // SELECT a FROM t2 GROUP BY a ORDER BY min(x)
        let plan = LogicalPlan::Sort(Sort::new(
            vec![uf("min", vec![ua("x")]).asc()],
            Arc::new(LogicalPlan::Aggregate(Aggregate::new(
                vec![ua("a")],
                vec![Expr::UnresolvedAlias(UnresolvedAlias::new(ua("a")))],
                Arc::new(table("t2")),
            ))),
        ));
        let analyzed = analyzer().analyze(plan).unwrap();
        assert_fully_resolved(&analyzed);
        assert_eq!(analyzed.output().iter().map(|a| a.name.as_str()).collect::<Vec<_>>(), vec!["a"]);
        let LogicalPlan::Project(outer) = &analyzed else { panic!("expected project") };
        let LogicalPlan::Sort(sort) = outer.child.as_ref() else { panic!("expected sort") };
        let LogicalPlan::Aggregate(agg) = sort.child.as_ref() else { panic!("expected aggregate") };
        assert_eq!(agg.aggregate_exprs.len(), 2);
        assert_eq!(agg.aggregate_exprs[1].name(), Some("_aggOrdering"));
    }

    #[test]
    fn test_struct_field_access() {
        // SELECT s.f1 FROM n
        let plan = LogicalPlan::Project(Project::new(
            vec![Expr::UnresolvedAlias(UnresolvedAlias::new(ua("s.f1")))],
            Arc::new(table("n")),
        ));
        let analyzed = analyzer().analyze(plan).unwrap();
        assert_fully_resolved(&analyzed);
        let output = analyzed.output();
        assert_eq!(output[0].name, "f1");
        assert_eq!(output[0].data_type, DataType::Int);
    }

    #[test]
    fn test_extract_value_by_index() {
        // SELECT xs[0] FROM n
        let plan = LogicalPlan::Project(Project::new(
            vec![Expr::UnresolvedAlias(UnresolvedAlias::new(
                Expr::UnresolvedExtractValue(UnresolvedExtractValue::new(ua("xs"), Expr::int_lit(0))),
            ))],
            Arc::new(table("n")),
        ));
        let analyzed = analyzer().analyze(plan).unwrap();
        assert_fully_resolved(&analyzed);
        assert_eq!(analyzed.output()[0].data_type, DataType::Int);
    }

    #[test]
    fn test_having_over_ungrouped_column_fails() {
        // SELECT a FROM r GROUP BY a HAVING b > 10
        let plan = LogicalPlan::Filter(Filter::new(
            ua("b").gt(Expr::int_lit(10)),
            Arc::new(LogicalPlan::Aggregate(Aggregate::new(
                vec![ua("a")],
                vec![Expr::UnresolvedAlias(UnresolvedAlias::new(ua("a")))],
                Arc::new(table("r")),
            ))),
        ));
        let err = analyzer().analyze(plan).unwrap_err();
        assert!(err.contains("cannot resolve 'b'"), "{}", err);
    }

    #[test]
    fn test_ungrouped_column_in_aggregate_fails() {
        let plan = LogicalPlan::Aggregate(Aggregate::new(
            vec![ua("a")],
            vec![Expr::UnresolvedAlias(UnresolvedAlias::new(ua("a"))),
                 Expr::UnresolvedAlias(UnresolvedAlias::new(ua("b")))],
            Arc::new(table("r")),
        ));
        let err = analyzer().analyze(plan).unwrap_err();
        assert!(err.contains("neither present in the group by"), "{}", err);
    }

    #[test]
    fn test_unknown_table_fails() {
        let plan = LogicalPlan::Project(Project::new(vec![ua("a")], Arc::new(table("missing"))));
        let err = analyzer().analyze(plan).unwrap_err();
        assert!(err.contains("Table not found"), "{}", err);
    }

    #[test]
    fn test_unknown_function_fails_in_check() {
        let plan = LogicalPlan::Project(Project::new(
            vec![Expr::UnresolvedAlias(UnresolvedAlias::new(uf("frobnicate", vec![ua("a")])))],
            Arc::new(table("r")),
        ));
        let err = analyzer().analyze(plan).unwrap_err();
        assert!(err.contains("undefined function frobnicate"), "{}", err);
    }

    #[test]
    fn test_unknown_column_fails_with_input_columns() {
        let plan = LogicalPlan::Project(Project::new(vec![ua("bogus")], Arc::new(table("r"))));
        let err = analyzer().analyze(plan).unwrap_err();
        assert!(err.contains("cannot resolve 'bogus'"), "{}", err);
        assert!(err.contains("[a, b]"), "{}", err);
    }

    #[test]
    fn test_case_sensitivity() {
        let plan = LogicalPlan::Project(Project::new(vec![ua("A")], Arc::new(table("r"))));
        // default resolution is case-insensitive
        assert!(analyzer().analyze(plan.clone()).is_ok());

        let config = AnalyzerConfig { case_sensitive: true, ..AnalyzerConfig::default() };
        let sensitive = Analyzer::with_config(catalog(), config);
        assert!(sensitive.analyze(plan).is_err());
    }

    #[test]
    fn test_nondeterministic_sort_is_pulled_out() {
        // SELECT a FROM r ORDER BY rand(5)
        let plan = LogicalPlan::Sort(Sort::new(
            vec![uf("rand", vec![Expr::int_lit(5)]).asc()],
            Arc::new(LogicalPlan::Project(Project::new(vec![ua("a")], Arc::new(table("r"))))),
        ));
        let analyzed = analyzer().analyze(plan).unwrap();
        assert_fully_resolved(&analyzed);
        assert_eq!(analyzed.output().iter().map(|a| a.name.as_str()).collect::<Vec<_>>(), vec!["a"]);
        let LogicalPlan::Project(outer) = &analyzed else { panic!("expected project, got {:?}", analyzed) };
        let LogicalPlan::Sort(sort) = outer.child.as_ref() else { panic!("expected sort") };
        // the ordering now references a precomputed column
        let refs = collect_attributes(&sort.order[0]);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].name, "_nondeterministic");
        let LogicalPlan::Project(inner) = sort.child.as_ref() else { panic!("expected inner project") };
        assert!(inner.project_list.iter().any(|e| e.name() == Some("_nondeterministic")));
    }

    #[test]
    fn test_type_coercion_inserts_casts() {
        // WHERE a > 'text' style comparisons and int/long widening
        let plan = LogicalPlan::Filter(Filter::new(
            ua("a").gt(Expr::long_lit(1)),
            Arc::new(table("r")),
        ));
        let analyzed = analyzer().analyze(plan).unwrap();
        assert_fully_resolved(&analyzed);
        let LogicalPlan::Filter(f) = &analyzed else { panic!("expected filter") };
        let Expr::BinaryOperator(b) = &f.condition else { panic!("expected binary operator") };
        assert_eq!(b.left.data_type(), &DataType::Long);
    }

    #[test]
    fn test_analyze_is_idempotent() {
        let plans = vec![
            LogicalPlan::Sort(Sort::new(
                vec![ua("b").asc()],
                Arc::new(LogicalPlan::Project(Project::new(vec![ua("a")], Arc::new(table("r"))))),
            )),
            LogicalPlan::Rollup(Rollup::new(
                vec![ua("a"), ua("b")],
                vec![Expr::UnresolvedAlias(UnresolvedAlias::new(ua("a"))),
                     Expr::UnresolvedAlias(UnresolvedAlias::new(ua("b")))],
                Arc::new(table("r")),
            )),
            LogicalPlan::Filter(Filter::new(
                uf("sum", vec![ua("x")]).gt(Expr::int_lit(10)),
                Arc::new(LogicalPlan::Aggregate(Aggregate::new(
                    vec![],
                    vec![uf("sum", vec![ua("x")]).alias("sum")],
                    Arc::new(table("t")),
                ))),
            )),
        ];
        for plan in plans {
            let analyzer = analyzer();
            let once = analyzer.analyze(plan).unwrap();
            let twice = analyzer.analyze(once.clone()).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_eliminate_subquery_aliases_commutes() {
        let plan = LogicalPlan::Project(Project::new(
            vec![ua("a")],
            Arc::new(LogicalPlan::SubqueryAlias(SubqueryAlias::new(
                "q".to_string(),
                Arc::new(table("r")),
            ))),
        ));
        let analyzed_then_stripped = eliminate_subquery_aliases(analyzer().analyze(plan.clone()).unwrap());
        // Stripping first still analyzes to the same shape with the same names
        let stripped_then_analyzed = analyzer().analyze(eliminate_subquery_aliases(plan)).unwrap();
        let names = |p: &LogicalPlan| p.output().iter().map(|a| a.name.clone()).collect::<Vec<_>>();
        assert_eq!(names(&analyzed_then_stripped), names(&stripped_then_analyzed));
    }

    #[test]
    fn test_insert_into_resolves_and_unwraps_target() {
        let plan = LogicalPlan::InsertIntoTable(InsertIntoTable::new(
            Arc::new(table("t")),
            Arc::new(LogicalPlan::Project(Project::new(vec![ua("a")], Arc::new(table("r"))))),
            false,
        ));
        let analyzed = analyzer().analyze(plan).unwrap();
        let LogicalPlan::InsertIntoTable(insert) = &analyzed else { panic!("expected insert") };
        assert!(matches!(insert.table.as_ref(), LogicalPlan::LocalRelation(_)),
            "expected bare relation target, got {:?}", insert.table);
        assert!(insert.child.resolved());
    }

    #[test]
    fn test_max_iterations_is_fatal() {
        #[derive(Debug)]
        struct FlipFlop;
        impl AnalyzerRule for FlipFlop {
            fn analyze(&self, plan: LogicalPlan) -> crate::Result<crate::tree_node::Transformed<LogicalPlan>> {
                // Grows the plan forever; the executor must give up.
                Ok(crate::tree_node::Transformed::yes(LogicalPlan::SubqueryAlias(
                    SubqueryAlias::new("loop".to_string(), Arc::new(plan)))))
            }
            fn name(&self) -> &str {
                "FlipFlop"
            }
        }
        let mut analyzer = Analyzer::with_config(catalog(), AnalyzerConfig { case_sensitive: false, max_iterations: 5 });
        analyzer.add_resolution_rule(Arc::new(FlipFlop));
        let plan = LogicalPlan::Project(Project::new(vec![ua("a")], Arc::new(table("r"))));
        let err = analyzer.analyze(plan).unwrap_err();
        assert!(err.contains("Max iterations (5) reached for batch Resolution"), "{}", err);
        assert!(err.contains("FlipFlop"), "{}", err);
    }

    #[test]
    fn test_script_transformation_star_expansion() {
        let out = vec![AttributeReference::new("line", DataType::String)];
        let plan = LogicalPlan::ScriptTransformation(ScriptTransformation::new(
            vec![Expr::Star(Star::new(None))],
            "/bin/cat".to_string(),
            out,
            Arc::new(table("r")),
        ));
        let analyzed = analyzer().analyze(plan).unwrap();
        assert_fully_resolved(&analyzed);
        let LogicalPlan::ScriptTransformation(script) = &analyzed else { panic!("expected script transformation") };
        assert_eq!(script.input.len(), 2);
        assert_eq!(analyzed.output().iter().map(|a| a.name.as_str()).collect::<Vec<_>>(), vec!["line"]);
    }

    #[test]
    fn test_star_inside_function_arguments() {
        // SELECT count(*) FROM r
        let plan = LogicalPlan::Project(Project::new(
            vec![Expr::UnresolvedAlias(UnresolvedAlias::new(uf("count", vec![Expr::Star(Star::new(None))])))],
            Arc::new(table("r")),
        ));
        let analyzed = analyzer().analyze(plan).unwrap();
        assert_fully_resolved(&analyzed);
        assert_eq!(analyzed.output()[0].data_type, DataType::Long);
    }
}
